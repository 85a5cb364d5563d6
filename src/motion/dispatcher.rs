// Issues servo moves and pairs each one with its completion token.
//
// The sequencing rule is minimal on purpose: a move on an actuator waits
// for that actuator's previous move only. Moves on different actuators are
// issued back to back and run concurrently; any broader ordering is the
// gait's job, expressed through explicit waits.

use std::sync::Arc;

use crate::motion::state::{ActuatorMask, MotionState};
use crate::servo::ServoDriver;

/// One-shot handle the driver fires when a commanded move has finished.
///
/// Consuming `complete` makes double-completion unrepresentable. A token
/// that is dropped instead of completed leaves its actuator flagged as
/// moving forever, which stalls the next wait on it; drivers must hold the
/// token until the move's duration has elapsed and then complete it.
#[must_use = "an uncompleted token leaves its actuator in motion forever"]
pub struct Completion {
    state: Arc<MotionState>,
    actuator: usize,
}

impl Completion {
    pub fn new(state: Arc<MotionState>, actuator: usize) -> Self {
        Completion { state, actuator }
    }

    pub fn actuator(&self) -> usize {
        self.actuator
    }

    /// Mark the move finished and release any waiter on this actuator.
    pub fn complete(self) {
        self.state.clear_in_motion(self.actuator);
    }
}

/// Front door for commanding moves: flags the actuator, then hands the
/// driver the target and the completion token for it.
#[derive(Clone)]
pub struct MotionDispatcher {
    state: Arc<MotionState>,
    driver: Arc<dyn ServoDriver>,
}

impl MotionDispatcher {
    pub fn new(state: Arc<MotionState>, driver: Arc<dyn ServoDriver>) -> Self {
        MotionDispatcher { state, driver }
    }

    /// Command one actuator to `target_cdeg` (centidegrees from center).
    ///
    /// Blocks until the actuator's previous move, if any, has completed,
    /// then flags it and issues the command. Returns as soon as the
    /// command is issued; the motion itself is still in flight.
    pub fn move_one(&self, actuator: usize, target_cdeg: i32) {
        self.state.wait_one(actuator);
        self.state.set_in_motion(actuator);
        self.driver.move_to(
            actuator,
            target_cdeg,
            Completion::new(self.state.clone(), actuator),
        );
    }

    /// Command every actuator in `mask` to the same target, in ascending
    /// index order. Each issue applies the same single-actuator gate as
    /// `move_one`; the group is not synchronized beyond that.
    pub fn move_all(&self, mask: ActuatorMask, target_cdeg: i32) {
        for actuator in mask.iter() {
            self.move_one(actuator, target_cdeg);
        }
    }

    /// Block until `actuator` is idle.
    pub fn wait_one(&self, actuator: usize) {
        self.state.wait_one(actuator);
    }

    /// Block until every actuator in `mask` is idle at once.
    pub fn wait_all(&self, mask: ActuatorMask) {
        self.state.wait_all(mask);
    }

    pub fn state(&self) -> &Arc<MotionState> {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::state::YieldWait;
    use crate::servo::mock::{InstantServo, ManualServo};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    fn dispatcher_with<D: ServoDriver + 'static>(driver: Arc<D>) -> MotionDispatcher {
        let state = Arc::new(MotionState::with_policy(YieldWait));
        MotionDispatcher::new(state, driver)
    }

    #[test]
    fn move_one_flags_then_issues() {
        let servo = Arc::new(ManualServo::new());
        let d = dispatcher_with(servo.clone());

        d.move_one(4, 250);
        assert!(d.state().in_motion(4), "flag must be set while in flight");
        assert_eq!(servo.issued(), vec![(4, 250)]);

        assert!(servo.release_next_for(4));
        assert!(!d.state().in_motion(4));
    }

    #[test]
    fn second_move_on_same_actuator_waits_for_first() {
        let servo = Arc::new(ManualServo::new());
        let d = dispatcher_with(servo.clone());

        d.move_one(2, 100);

        let issued_second = Arc::new(AtomicBool::new(false));
        let handle = {
            let d = d.clone();
            let issued_second = issued_second.clone();
            thread::spawn(move || {
                d.move_one(2, -100);
                issued_second.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(
            !issued_second.load(Ordering::SeqCst),
            "re-entrant move must hold until the first completes"
        );
        assert_eq!(servo.issued().len(), 1);

        assert!(servo.release_next_for(2));
        handle.join().unwrap();
        assert_eq!(servo.issued(), vec![(2, 100), (2, -100)]);
    }

    #[test]
    fn moves_on_distinct_actuators_do_not_serialize() {
        let servo = Arc::new(ManualServo::new());
        let d = dispatcher_with(servo.clone());

        // Neither completion is released, yet all three commands go out.
        d.move_one(0, 450);
        d.move_one(1, 450);
        d.move_one(2, 450);
        assert_eq!(servo.issued(), vec![(0, 450), (1, 450), (2, 450)]);
        assert_eq!(servo.pending_len(), 3);
    }

    #[test]
    fn move_all_issues_in_ascending_index_order() {
        let servo = Arc::new(InstantServo::new());
        let d = dispatcher_with(servo.clone());

        let mask: ActuatorMask = [5usize, 1, 3].into_iter().collect();
        d.move_all(mask, -50);
        assert_eq!(servo.issued(), vec![(1, -50), (3, -50), (5, -50)]);
    }

    #[test]
    fn completion_unblocks_wait_all() {
        let servo = Arc::new(ManualServo::new());
        let d = dispatcher_with(servo.clone());

        d.move_one(0, 450);
        d.move_one(1, 450);

        let done = Arc::new(AtomicBool::new(false));
        let handle = {
            let d = d.clone();
            let done = done.clone();
            thread::spawn(move || {
                d.wait_all([0usize, 1].into_iter().collect());
                done.store(true, Ordering::SeqCst);
            })
        };

        assert!(servo.release_next_for(1));
        thread::sleep(Duration::from_millis(50));
        assert!(!done.load(Ordering::SeqCst), "actuator 0 still moving");

        assert!(servo.release_next_for(0));
        handle.join().unwrap();
    }
}
