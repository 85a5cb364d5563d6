// Test doubles for the driver trait.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::motion::Completion;
use crate::servo::{PulseCalibration, Result, ServoChannel, ServoDriver};

/// Completes every move the instant it is issued, recording the order.
pub(crate) struct InstantServo {
    log: Mutex<Vec<(usize, i32)>>,
}

impl InstantServo {
    pub(crate) fn new() -> InstantServo {
        InstantServo {
            log: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn issued(&self) -> Vec<(usize, i32)> {
        self.log.lock().unwrap().clone()
    }
}

impl ServoDriver for InstantServo {
    fn configure(&mut self, _actuator: usize, _channel: ServoChannel) -> Result<()> {
        Ok(())
    }

    fn set_motion_rate(&mut self, _actuator: usize, _deg_per_s: u32) -> Result<()> {
        Ok(())
    }

    fn calibrate(&mut self, _actuator: usize, _cal: PulseCalibration) -> Result<()> {
        Ok(())
    }

    fn move_to(&self, actuator: usize, target_cdeg: i32, done: Completion) {
        self.log.lock().unwrap().push((actuator, target_cdeg));
        done.complete();
    }

    fn read_battery_mv(&self) -> Result<u32> {
        Ok(7_000)
    }
}

struct ManualInner {
    log: Vec<(usize, i32)>,
    pending: VecDeque<Completion>,
}

/// Records every move and holds its completion until the test releases
/// it, so tests can pin down exactly which waits a sequence performs.
/// Log and pending queue share one lock: once a move is visible in the
/// log its token is visible too.
pub(crate) struct ManualServo {
    inner: Mutex<ManualInner>,
}

impl ManualServo {
    pub(crate) fn new() -> ManualServo {
        ManualServo {
            inner: Mutex::new(ManualInner {
                log: Vec::new(),
                pending: VecDeque::new(),
            }),
        }
    }

    pub(crate) fn issued(&self) -> Vec<(usize, i32)> {
        self.inner.lock().unwrap().log.clone()
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.inner.lock().unwrap().pending.len()
    }

    /// Complete the oldest held move for `actuator`. False if none held.
    pub(crate) fn release_next_for(&self, actuator: usize) -> bool {
        let token = {
            let mut inner = self.inner.lock().unwrap();
            match inner.pending.iter().position(|c| c.actuator() == actuator) {
                Some(at) => inner.pending.remove(at),
                None => None,
            }
        };
        match token {
            Some(done) => {
                done.complete();
                true
            }
            None => false,
        }
    }

    /// Complete every held move, oldest first. Returns how many fired.
    pub(crate) fn release_all(&self) -> usize {
        let drained: Vec<Completion> = {
            let mut inner = self.inner.lock().unwrap();
            inner.pending.drain(..).collect()
        };
        let fired = drained.len();
        for done in drained {
            done.complete();
        }
        fired
    }
}

impl ServoDriver for ManualServo {
    fn configure(&mut self, _actuator: usize, _channel: ServoChannel) -> Result<()> {
        Ok(())
    }

    fn set_motion_rate(&mut self, _actuator: usize, _deg_per_s: u32) -> Result<()> {
        Ok(())
    }

    fn calibrate(&mut self, _actuator: usize, _cal: PulseCalibration) -> Result<()> {
        Ok(())
    }

    fn move_to(&self, actuator: usize, target_cdeg: i32, done: Completion) {
        let mut inner = self.inner.lock().unwrap();
        inner.log.push((actuator, target_cdeg));
        inner.pending.push_back(done);
    }

    fn read_battery_mv(&self) -> Result<u32> {
        Ok(7_000)
    }
}
