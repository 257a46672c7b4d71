use std::sync::atomic::{AtomicU32, Ordering};

/// Runs an action at most once per generation, with the option to start a new generation.
///
/// This is a leaner, non-blocking relative of [`std::sync::Once`]:
///
/// * Only the first caller of [`call_once()`][Self::call_once] in a generation runs the action.
///   Every other caller returns immediately, **without waiting** for the winning caller to
///   finish the action. If you need to observe the effects of the action, synchronize on
///   them separately.
/// * Calling [`call_once()`][Self::call_once] again from inside the action is harmless: the
///   nested call sees the gate as fired and returns immediately.
/// * [`reset()`][Self::reset] opens the gate again so the next [`call_once()`][Self::call_once]
///   fires once more.
///
/// If the action panics, the generation still counts as fired.
///
/// # Reset races
///
/// [`reset()`][Self::reset] is not synchronized with in-flight calls to
/// [`call_once()`][Self::call_once]. If the two overlap, the action may run again before the
/// in-flight one finishes, or a call made just after the reset may still see the old generation.
/// Callers that need "exactly once per generation" to hold strictly must serialize resets against
/// calls themselves.
///
/// # Example
///
/// ```
/// use scratch_pool::ResettableOnce;
///
/// let gate = ResettableOnce::new();
/// let mut runs = 0;
///
/// gate.call_once(|| runs += 1);
/// gate.call_once(|| runs += 1);
/// assert_eq!(runs, 1);
///
/// gate.reset();
/// gate.call_once(|| runs += 1);
/// assert_eq!(runs, 2);
/// ```
#[derive(Debug, Default)]
pub struct ResettableOnce {
    // 0 means the gate is open. Every caller that gets past the fast-path check increments this,
    // so the caller that observes the 0 -> 1 transition is the one that runs the action.
    fired: AtomicU32,
}

impl ResettableOnce {
    /// Creates a gate that has not fired yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fired: AtomicU32::new(0),
        }
    }

    /// Runs `action` if this is the first call since construction or since the last
    /// [`reset()`][Self::reset].
    ///
    /// Callers that lose the race return immediately, possibly before the winner's
    /// `action` has completed.
    pub fn call_once<F>(&self, action: F)
    where
        F: FnOnce(),
    {
        // Acquire pairs with the Release in reset() so a caller that sees the gate open also
        // sees everything that happened before the reset.
        if self.fired.load(Ordering::Acquire) > 0 {
            return;
        }

        // Only threads racing on an open gate get this far, so the counter stays tiny.
        if self.fired.fetch_add(1, Ordering::AcqRel) == 0 {
            action();
        }
    }

    /// Opens the gate again so that the next [`call_once()`][Self::call_once] runs its action.
    ///
    /// Not synchronized against in-flight [`call_once()`][Self::call_once] calls; see the
    /// type-level documentation.
    pub fn reset(&self) {
        self.fired.store(0, Ordering::Release);
    }

    /// Whether the action has been claimed in the current generation.
    ///
    /// This is a snapshot and may be stale by the time the caller looks at it.
    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire) > 0
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::Cell;
    use std::num::NonZero;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::atomic::AtomicUsize;

    use new_zealand::nz;
    use static_assertions::assert_impl_all;
    use testing::run_in_lockstep;

    use super::*;

    assert_impl_all!(ResettableOnce: Send, Sync);

    #[test]
    fn runs_action_on_first_call_only() {
        let gate = ResettableOnce::new();
        let runs = Cell::new(0);

        gate.call_once(|| runs.set(runs.get() + 1));
        gate.call_once(|| runs.set(runs.get() + 1));
        gate.call_once(|| runs.set(runs.get() + 1));

        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn only_first_action_runs_even_if_actions_differ() {
        let gate = ResettableOnce::new();
        let which = Cell::new(0);

        gate.call_once(|| which.set(1));
        gate.call_once(|| which.set(2));

        assert_eq!(which.get(), 1);
    }

    #[test]
    fn reset_starts_new_generation() {
        let gate = ResettableOnce::new();
        let runs = Cell::new(0);

        gate.call_once(|| runs.set(runs.get() + 1));
        gate.reset();
        gate.call_once(|| runs.set(runs.get() + 1));
        gate.call_once(|| runs.set(runs.get() + 1));

        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn reset_before_first_call_is_harmless() {
        let gate = ResettableOnce::new();
        let runs = Cell::new(0);

        gate.reset();
        gate.call_once(|| runs.set(runs.get() + 1));

        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn has_fired_tracks_generation() {
        let gate = ResettableOnce::default();
        assert!(!gate.has_fired());

        gate.call_once(|| {});
        assert!(gate.has_fired());

        gate.reset();
        assert!(!gate.has_fired());
    }

    #[test]
    fn reentrant_call_does_not_deadlock_or_rerun() {
        let gate = ResettableOnce::new();
        let outer_runs = Cell::new(0);
        let inner_runs = Cell::new(0);

        gate.call_once(|| {
            outer_runs.set(outer_runs.get() + 1);
            gate.call_once(|| inner_runs.set(inner_runs.get() + 1));
        });

        assert_eq!(outer_runs.get(), 1);
        assert_eq!(inner_runs.get(), 0);
    }

    #[test]
    fn panicking_action_still_counts_as_fired() {
        let gate = ResettableOnce::new();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            gate.call_once(|| panic!("intentional panic"));
        }));
        assert!(result.is_err());

        let runs = Cell::new(0);
        gate.call_once(|| runs.set(runs.get() + 1));
        assert_eq!(runs.get(), 0);
        assert!(gate.has_fired());
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn concurrent_callers_run_action_exactly_once_per_generation() {
        const THREADS: NonZero<usize> = nz!(16);

        let gate = ResettableOnce::new();
        let runs = AtomicUsize::new(0);

        for generation in 1..=10 {
            run_in_lockstep(THREADS, |_| {
                gate.call_once(|| {
                    runs.fetch_add(1, Ordering::Relaxed);
                });
            });

            assert_eq!(runs.load(Ordering::Relaxed), generation);

            gate.reset();
        }
    }
}
