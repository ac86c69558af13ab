use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("session {0} does not exist")]
    NotFound(String),

    #[error("session {0} already exists")]
    AlreadyExists(String),
}
