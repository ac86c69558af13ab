use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error("a timer named {0:?} is already scheduled")]
    AlreadyScheduled(String),

    #[error("the timer controller has been shut down")]
    ShutDown,
}
