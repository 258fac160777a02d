//! Foundation utilities shared across engine subsystems

pub mod logging;
pub mod run_state;
pub mod time;

pub use run_state::RunState;
pub use time::{Clock, ManualClock, SystemClock, Timestamp};
