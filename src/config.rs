// Timeouts, topics, servo configuration
use std::time::Duration;

use crate::servo::{PulseCalibration, ServoChannel, TimerHalf};

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;

// How often battery telemetry is read and published
pub const BATTERY_PERIOD: Duration = Duration::from_secs(2);

// Zenoh topics
pub const TOPIC_CMD_GAIT: &str = "hexwalk/cmd/gait"; // gait commands
pub const TOPIC_HEALTH: &str = "hexwalk/state/health"; // health status
pub const TOPIC_BATTERY: &str = "hexwalk/state/battery"; // battery telemetry

// Servo controller configuration
// Serial port for the servo controller board
pub const SERVO_PORT: &str = "/dev/ttyUSB0";

// Drive the real controller (set to false to run against the simulator)
pub const HARDWARE_ENABLED: bool = false;

// Ramp rate every servo is configured with, degrees per second
pub const MOTION_RATE_DEG_S: u32 = 140;

// Foot servos sit in a linkage that reverses their sense and narrows the
// usable pulse band
pub const FOOT_CALIBRATION: PulseCalibration = PulseCalibration {
    min_us: 1000,
    max_us: 1800,
    invert: true,
};

const fn ch(bank: u8, half: TimerHalf) -> ServoChannel {
    ServoChannel { bank, half }
}

// Output wiring, indexed by actuator. Hip and foot of each leg share a
// pulse bank; banks are ordered by harness reach, not by leg.
pub const SERVO_CHANNELS: [ServoChannel; 12] = [
    ch(4, TimerHalf::A), // hip A1
    ch(4, TimerHalf::B), // foot A1
    ch(2, TimerHalf::A), // hip B1
    ch(2, TimerHalf::B), // foot B1
    ch(3, TimerHalf::A), // hip A2
    ch(3, TimerHalf::B), // foot A2
    ch(5, TimerHalf::A), // hip B2
    ch(5, TimerHalf::B), // foot B2
    ch(1, TimerHalf::A), // hip A3
    ch(1, TimerHalf::B), // foot A3
    ch(0, TimerHalf::A), // hip B3
    ch(0, TimerHalf::B), // foot B3
];
