// Asynchronous motion coordination: per-actuator in-motion flags, wait
// primitives, and the dispatcher that pairs every move with a completion.

mod dispatcher;
mod state;

pub use dispatcher::{Completion, MotionDispatcher};
pub use state::{ActuatorMask, MotionState, SleepWait, SpinWait, WaitPolicy, YieldWait};
