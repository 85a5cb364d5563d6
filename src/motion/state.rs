// Per-servo in-motion tracking shared between the gait sequencer and the
// driver's completion context.
//
// One atomic word holds one flag per actuator. The dispatcher sets a flag
// when it issues a move; the driver's completion notification clears it.
// Both run on different threads and may interleave anywhere, so every
// set/clear is a single read-modify-write on the shared word.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// A set of actuator indices, one bit per actuator.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct ActuatorMask(u32);

impl ActuatorMask {
    pub const EMPTY: ActuatorMask = ActuatorMask(0);

    /// Mask with only `actuator` set.
    pub const fn bit(actuator: usize) -> ActuatorMask {
        assert!(actuator < MotionState::MAX_ACTUATORS);
        ActuatorMask(1 << actuator)
    }

    pub const fn from_bits(bits: u32) -> ActuatorMask {
        ActuatorMask(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, actuator: usize) -> bool {
        actuator < MotionState::MAX_ACTUATORS && self.0 & (1 << actuator) != 0
    }

    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Set indices in ascending order.
    pub fn iter(self) -> impl Iterator<Item = usize> {
        (0..MotionState::MAX_ACTUATORS).filter(move |&i| self.contains(i))
    }
}

impl std::ops::BitOr for ActuatorMask {
    type Output = ActuatorMask;

    fn bitor(self, rhs: ActuatorMask) -> ActuatorMask {
        ActuatorMask(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for ActuatorMask {
    fn bitor_assign(&mut self, rhs: ActuatorMask) {
        self.0 |= rhs.0;
    }
}

impl FromIterator<usize> for ActuatorMask {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        iter.into_iter()
            .fold(ActuatorMask::EMPTY, |mask, i| mask | ActuatorMask::bit(i))
    }
}

impl fmt::Debug for ActuatorMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActuatorMask({:#014b})", self.0)
    }
}

/// What a wait primitive does between two polls of the shared state.
///
/// The waits themselves are unconditional busy-polls with no timeout; the
/// policy only decides how the polling thread behaves between iterations,
/// so a test harness can swap in a scheduler-friendly variant without
/// touching caller code.
pub trait WaitPolicy: Send + Sync {
    fn relax(&self);
}

/// Spin-hint polling. The tightest loop; hot on a general-purpose host.
pub struct SpinWait;

impl WaitPolicy for SpinWait {
    fn relax(&self) {
        std::hint::spin_loop();
    }
}

/// Yield the thread between polls. The default for tests.
pub struct YieldWait;

impl WaitPolicy for YieldWait {
    fn relax(&self) {
        std::thread::yield_now();
    }
}

/// Sleep a fixed interval between polls. The production default: servo
/// moves take tens of milliseconds, so a 1 ms poll granularity is
/// invisible to the gaits and keeps the control thread off the CPU.
pub struct SleepWait(pub Duration);

impl Default for SleepWait {
    fn default() -> Self {
        SleepWait(Duration::from_millis(1))
    }
}

impl WaitPolicy for SleepWait {
    fn relax(&self) {
        std::thread::sleep(self.0);
    }
}

/// The in-motion flag table.
///
/// Exactly two actors mutate it: the dispatcher (`set_in_motion`, before a
/// move command reaches the driver) and the completion notification
/// (`clear_in_motion`, exactly once per finished move). Everyone else only
/// reads. An actuator that was never commanded reads as idle, so waiting on
/// it returns immediately.
pub struct MotionState {
    flags: AtomicU32,
    policy: Box<dyn WaitPolicy>,
}

impl MotionState {
    /// Upper bound on addressable actuators (one bit each in the flag word).
    pub const MAX_ACTUATORS: usize = 32;

    pub fn new() -> Self {
        Self::with_policy(SleepWait::default())
    }

    pub fn with_policy(policy: impl WaitPolicy + 'static) -> Self {
        MotionState {
            flags: AtomicU32::new(0),
            policy: Box::new(policy),
        }
    }

    /// Flag `actuator` as moving. Must happen before the move command is
    /// handed to the driver: a completion that races ahead of the flag
    /// would leave the waiter hanging on a move that already finished.
    pub fn set_in_motion(&self, actuator: usize) {
        debug_assert!(actuator < Self::MAX_ACTUATORS);
        self.flags
            .fetch_or(ActuatorMask::bit(actuator).bits(), Ordering::AcqRel);
    }

    /// Flag `actuator` as idle. Called once per completed move, from the
    /// driver's notification context.
    pub fn clear_in_motion(&self, actuator: usize) {
        debug_assert!(actuator < Self::MAX_ACTUATORS);
        self.flags
            .fetch_and(!ActuatorMask::bit(actuator).bits(), Ordering::AcqRel);
    }

    pub fn in_motion(&self, actuator: usize) -> bool {
        self.snapshot().contains(actuator)
    }

    /// All currently moving actuators, from a single load of the flag word.
    pub fn snapshot(&self) -> ActuatorMask {
        ActuatorMask::from_bits(self.flags.load(Ordering::Acquire))
    }

    /// Poll until `actuator` is idle. No timeout: a move whose completion
    /// never arrives stalls the caller.
    pub fn wait_one(&self, actuator: usize) {
        while self.in_motion(actuator) {
            self.policy.relax();
        }
    }

    /// Poll until every actuator in `mask` is idle at once. The whole mask
    /// is re-checked against a fresh load on every iteration, so
    /// completions landing in any order are picked up and a re-flagged
    /// actuator keeps the wait alive.
    pub fn wait_all(&self, mask: ActuatorMask) {
        while self.flags.load(Ordering::Acquire) & mask.bits() != 0 {
            self.policy.relax();
        }
    }
}

impl Default for MotionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;
    use std::thread;
    use std::time::Duration;

    fn tracker() -> Arc<MotionState> {
        Arc::new(MotionState::with_policy(YieldWait))
    }

    /// Spawn a waiter thread and return (done-flag, join handle).
    fn spawn_waiter(
        tracker: &Arc<MotionState>,
        wait: impl Fn(&MotionState) + Send + 'static,
    ) -> (Arc<AtomicBool>, thread::JoinHandle<()>) {
        let done = Arc::new(AtomicBool::new(false));
        let handle = {
            let tracker = tracker.clone();
            let done = done.clone();
            thread::spawn(move || {
                wait(&tracker);
                done.store(true, Ordering::SeqCst);
            })
        };
        (done, handle)
    }

    fn settle() {
        thread::sleep(Duration::from_millis(50));
    }

    #[test]
    fn starts_all_idle() {
        let t = tracker();
        assert!(t.snapshot().is_empty());
        for i in 0..MotionState::MAX_ACTUATORS {
            assert!(!t.in_motion(i));
        }
    }

    #[test]
    fn flags_are_independent_per_actuator() {
        let t = tracker();
        t.set_in_motion(3);
        t.set_in_motion(7);
        assert!(t.in_motion(3));
        assert!(t.in_motion(7));
        assert!(!t.in_motion(4));

        t.clear_in_motion(3);
        assert!(!t.in_motion(3));
        assert!(t.in_motion(7), "clearing 3 must not touch 7");
    }

    #[test]
    fn waiting_on_never_commanded_actuator_returns_immediately() {
        let t = tracker();
        t.wait_one(5);
        t.wait_all(ActuatorMask::bit(0) | ActuatorMask::bit(31));
        t.wait_all(ActuatorMask::EMPTY);
    }

    #[test]
    fn wait_one_blocks_until_completion_clears_the_flag() {
        let t = tracker();
        t.set_in_motion(2);

        let (done, handle) = spawn_waiter(&t, |t| t.wait_one(2));
        settle();
        assert!(!done.load(Ordering::SeqCst), "waiter ran before completion");

        t.clear_in_motion(2);
        handle.join().unwrap();
        assert!(done.load(Ordering::SeqCst));
    }

    #[test]
    fn wait_all_reevaluates_the_full_mask_every_poll() {
        let t = tracker();
        t.set_in_motion(0);
        t.set_in_motion(1);

        let mask = ActuatorMask::bit(0) | ActuatorMask::bit(1);
        let (done, handle) = spawn_waiter(&t, move |t| t.wait_all(mask));

        settle();
        assert!(!done.load(Ordering::SeqCst));

        // 0 completes but is re-flagged before 1 completes; the waiter must
        // notice the fresh flag rather than act on a stale snapshot.
        t.clear_in_motion(0);
        t.set_in_motion(0);
        t.clear_in_motion(1);
        settle();
        assert!(
            !done.load(Ordering::SeqCst),
            "wait_all returned while a masked actuator was moving"
        );

        t.clear_in_motion(0);
        handle.join().unwrap();
    }

    #[test]
    fn completions_arrive_in_any_order() {
        let t = tracker();
        for i in [0, 1, 2] {
            t.set_in_motion(i);
        }
        let mask: ActuatorMask = [0usize, 1, 2].into_iter().collect();
        let (done, handle) = spawn_waiter(&t, move |t| t.wait_all(mask));

        t.clear_in_motion(2);
        t.clear_in_motion(0);
        settle();
        assert!(!done.load(Ordering::SeqCst), "one actuator still moving");

        t.clear_in_motion(1);
        handle.join().unwrap();
    }

    #[test]
    fn mask_iterates_ascending() {
        let mask: ActuatorMask = [9usize, 1, 5].into_iter().collect();
        assert_eq!(mask.iter().collect::<Vec<_>>(), vec![1, 5, 9]);
        assert_eq!(mask.len(), 3);
    }

    #[test]
    fn mask_union_and_contains() {
        let a = ActuatorMask::bit(0) | ActuatorMask::bit(4);
        assert!(a.contains(0));
        assert!(a.contains(4));
        assert!(!a.contains(2));
        assert!(!ActuatorMask::EMPTY.contains(0));

        let mut b = ActuatorMask::EMPTY;
        b |= ActuatorMask::bit(11);
        assert_eq!(b.bits(), 1 << 11);
    }
}
