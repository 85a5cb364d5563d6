// Gait sequencing: the actuator layout table and the library of walking
// gaits and poses built on the motion dispatcher.

mod layout;
mod sequences;

pub use layout::{ActuatorSpec, Layout, LegGroup, Role, Swing, HEXAPOD};
pub use sequences::Legs;
