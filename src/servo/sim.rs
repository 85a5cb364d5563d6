// Simulated servo driver. Models per-channel position and ramp rate so
// the gaits run with realistic timing on a bench machine with no
// controller attached.

use std::sync::Mutex;

use tracing::{debug, error};

use crate::motion::Completion;
use crate::servo::schedule::CompletionScheduler;
use crate::servo::{
    move_duration, DriverError, PulseCalibration, Result, ServoChannel, ServoDriver,
    DEFAULT_RATE_DEG_S,
};

/// Battery reading the simulator reports, millivolts (a healthy 2S pack).
pub const SIM_BATTERY_MV: u32 = 7_400;

struct SimChannel {
    pin: u8,
    rate_deg_s: u32,
    position_cdeg: i32,
}

/// Drop-in stand-in for the serial controller. Each move completes on the
/// shared scheduler after `|delta| / rate`, the same window the hardware
/// ramp would take.
pub struct SimServo {
    channels: Mutex<Vec<Option<SimChannel>>>,
    scheduler: CompletionScheduler,
}

impl SimServo {
    pub fn new() -> SimServo {
        SimServo {
            channels: Mutex::new(Vec::new()),
            scheduler: CompletionScheduler::new(),
        }
    }

    /// Last commanded position, for bench assertions.
    pub fn position_cdeg(&self, actuator: usize) -> Option<i32> {
        self.channels
            .lock()
            .unwrap()
            .get(actuator)
            .and_then(|c| c.as_ref())
            .map(|c| c.position_cdeg)
    }
}

impl Default for SimServo {
    fn default() -> Self {
        Self::new()
    }
}

impl ServoDriver for SimServo {
    fn configure(&mut self, actuator: usize, channel: ServoChannel) -> Result<()> {
        let mut channels = self.channels.lock().unwrap();
        if channels.len() <= actuator {
            channels.resize_with(actuator + 1, || None);
        }
        channels[actuator] = Some(SimChannel {
            pin: channel.pin(),
            rate_deg_s: DEFAULT_RATE_DEG_S,
            position_cdeg: 0,
        });
        debug!("sim actuator {} on pin {}", actuator, channel.pin());
        Ok(())
    }

    fn set_motion_rate(&mut self, actuator: usize, deg_per_s: u32) -> Result<()> {
        if deg_per_s == 0 {
            return Err(DriverError::ZeroMotionRate);
        }
        let mut channels = self.channels.lock().unwrap();
        let channel = channels
            .get_mut(actuator)
            .and_then(|c| c.as_mut())
            .ok_or(DriverError::NotConfigured { actuator })?;
        channel.rate_deg_s = deg_per_s;
        Ok(())
    }

    fn calibrate(&mut self, actuator: usize, _cal: PulseCalibration) -> Result<()> {
        // the simulator works in centi-degrees end to end; pulse width
        // never enters the model
        let channels = self.channels.lock().unwrap();
        match channels.get(actuator).and_then(|c| c.as_ref()) {
            Some(_) => Ok(()),
            None => Err(DriverError::NotConfigured { actuator }),
        }
    }

    fn move_to(&self, actuator: usize, target_cdeg: i32, done: Completion) {
        let mut channels = self.channels.lock().unwrap();
        let Some(channel) = channels.get_mut(actuator).and_then(|c| c.as_mut()) else {
            error!("move for unconfigured actuator {}", actuator);
            done.complete();
            return;
        };

        let delta = target_cdeg.abs_diff(channel.position_cdeg);
        let travel = move_duration(delta, channel.rate_deg_s);
        channel.position_cdeg = target_cdeg;
        debug!(
            "sim pin {} -> {} cdeg over {} ms",
            channel.pin,
            target_cdeg,
            travel.as_millis()
        );
        drop(channels);

        self.scheduler.defer(travel, done);
    }

    fn read_battery_mv(&self) -> Result<u32> {
        Ok(SIM_BATTERY_MV)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::{MotionState, YieldWait};
    use crate::servo::TimerHalf;
    use std::sync::Arc;

    fn channel() -> ServoChannel {
        ServoChannel {
            bank: 0,
            half: TimerHalf::A,
        }
    }

    #[test]
    fn move_completes_after_the_travel_window() {
        let state = Arc::new(MotionState::with_policy(YieldWait));
        let mut servo = SimServo::new();
        servo.configure(0, channel()).unwrap();
        servo.set_motion_rate(0, 9000).unwrap();

        state.set_in_motion(0);
        servo.move_to(0, 500, Completion::new(state.clone(), 0));
        state.wait_one(0);
        assert_eq!(servo.position_cdeg(0), Some(500));
    }

    #[test]
    fn unconfigured_move_still_completes() {
        let state = Arc::new(MotionState::with_policy(YieldWait));
        let servo = SimServo::new();

        state.set_in_motion(7);
        servo.move_to(7, 100, Completion::new(state.clone(), 7));
        state.wait_one(7);
    }

    #[test]
    fn setup_rejects_bad_arguments() {
        let mut servo = SimServo::new();
        assert!(matches!(
            servo.set_motion_rate(0, 140),
            Err(DriverError::NotConfigured { actuator: 0 })
        ));

        servo.configure(0, channel()).unwrap();
        assert!(matches!(
            servo.set_motion_rate(0, 0),
            Err(DriverError::ZeroMotionRate)
        ));
    }
}
