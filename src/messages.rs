// Define message types for the runtime

use serde::{Deserialize, Serialize};

// Command from teleop/scripts -> runtime. Tagged JSON so a console can
// write {"gait":"tripod","cycles":5} by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "gait", rename_all = "snake_case")]
pub enum GaitCommand {
    Tripod { cycles: u32 },
    Sway { cycles: u32 },
    Bob { cycles: u32 },
    Ripple { cycles: u32 },
    HipsLeft,
    HipsRight,
    HipsCenter,
    FeetUp,
    FeetUpHigh,
    FeetDown,
    FeetIn,
    Neutral,
    Showcase,
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Idle,
    Walking,
}

/// Battery telemetry published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BatteryTelemetry {
    pub battery_mv: u32,
}
