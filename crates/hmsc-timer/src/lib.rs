//! Named one-shot and periodic timers, with bulk cancellation by name
//! prefix and an irreversible shutdown latch.

pub mod controller;
pub mod error;

pub use controller::{TimerController, TimerStats};
pub use error::TimerError;
