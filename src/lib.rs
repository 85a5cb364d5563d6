// hexwalk: asynchronous gait coordination for a twelve-servo hexapod.

pub mod config;
pub mod gait;
pub mod messages;
pub mod motion;
pub mod runtime;
pub mod servo;
