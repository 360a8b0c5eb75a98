use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngtrackError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type EngtrackResult<T> = Result<T, EngtrackError>;
