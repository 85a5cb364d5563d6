// Actuator driver interface and implementations.
//
// The motion layer hands a driver a target and a completion token; the
// driver owns pulse generation and ramping and fires the token when the
// move is done. Setup calls are fallible and fatal to startup; the
// steady-state move path never fails into the caller.

use std::time::Duration;

use crate::motion::Completion;

pub(crate) mod schedule;
pub mod sim;
pub mod ssc32;

#[cfg(test)]
pub(crate) mod mock;

pub use sim::SimServo;
pub use ssc32::Ssc32Servo;

/// Which output half of which pulse bank a servo is wired to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TimerHalf {
    A,
    B,
}

/// Physical address of a servo output: two outputs per pulse bank.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ServoChannel {
    pub bank: u8,
    pub half: TimerHalf,
}

impl ServoChannel {
    /// Controller pin for this channel, half A on the even pin.
    pub const fn pin(self) -> u8 {
        self.bank * 2
            + match self.half {
                TimerHalf::A => 0,
                TimerHalf::B => 1,
            }
    }
}

/// Full mechanical swing on either side of center, centi-degrees.
pub const FULL_SWING_CDEG: i32 = 9000;

/// Ramp rate a channel runs at until `set_motion_rate` overrides it.
pub(crate) const DEFAULT_RATE_DEG_S: u32 = 140;

/// Pulse-width end-points for one servo. `pulse_for` maps the signed
/// centi-degree range linearly onto `[min_us, max_us]`; `invert` flips
/// direction for servos mounted mirror-image across the chassis.
#[derive(Clone, Copy, Debug)]
pub struct PulseCalibration {
    pub min_us: u32,
    pub max_us: u32,
    pub invert: bool,
}

impl Default for PulseCalibration {
    fn default() -> Self {
        PulseCalibration {
            min_us: 1000,
            max_us: 2000,
            invert: false,
        }
    }
}

impl PulseCalibration {
    /// Pulse width in microseconds for `target_cdeg`. Targets beyond the
    /// mechanical swing clamp to the calibrated end-points.
    pub fn pulse_for(self, target_cdeg: i32) -> u32 {
        let cdeg = if self.invert {
            -target_cdeg
        } else {
            target_cdeg
        };
        let cdeg = cdeg.clamp(-FULL_SWING_CDEG, FULL_SWING_CDEG);
        let center = (self.min_us + self.max_us) as i64 / 2;
        let span = (self.max_us - self.min_us) as i64;
        let offset = cdeg as i64 * span / (2 * FULL_SWING_CDEG as i64);
        (center + offset) as u32
    }
}

/// How long a move of `delta_cdeg` takes at `rate_deg_s`. A zero rate is
/// clamped to one rather than dividing by zero.
pub(crate) fn move_duration(delta_cdeg: u32, rate_deg_s: u32) -> Duration {
    Duration::from_millis(delta_cdeg as u64 * 10 / rate_deg_s.max(1) as u64)
}

/// Error types for servo driver setup and telemetry
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Channel pin {pin} is beyond the controller's outputs")]
    ChannelOutOfRange { pin: u8 },

    #[error("Actuator {actuator} has no configured channel")]
    NotConfigured { actuator: usize },

    #[error("Controller probe failed: {reason}")]
    Probe { reason: String },

    #[error("Motion rate must be nonzero")]
    ZeroMotionRate,
}

pub type Result<T> = std::result::Result<T, DriverError>;

/// The narrow interface the motion layer drives actuators through.
///
/// `configure`, `set_motion_rate` and `calibrate` run once at startup;
/// any failure there aborts bring-up. `move_to` is the steady-state path
/// and never fails into the caller: implementations log transport trouble
/// and still fire the completion when the move window elapses, so the
/// sequencer degrades instead of deadlocking on a noisy link.
pub trait ServoDriver: Send + Sync {
    /// Bind `actuator` to a physical output. Must precede every other
    /// call for that actuator.
    fn configure(&mut self, actuator: usize, channel: ServoChannel) -> Result<()>;

    /// Ramp rate for subsequent moves of `actuator`, degrees per second.
    fn set_motion_rate(&mut self, actuator: usize, deg_per_s: u32) -> Result<()>;

    /// Pulse end-points for `actuator`.
    fn calibrate(&mut self, actuator: usize, cal: PulseCalibration) -> Result<()>;

    /// Start a move to `target_cdeg`. Returns once the command is issued;
    /// `done` fires exactly once, asynchronously, when the move finishes.
    fn move_to(&self, actuator: usize, target_cdeg: i32, done: Completion);

    /// Battery bus voltage in millivolts.
    fn read_battery_mv(&self) -> Result<u32>;
}
