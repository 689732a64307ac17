use thiserror::Error;

#[derive(Error, Debug)]
pub enum RaftError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Worker for node {node} panicked: {reason}")]
    WorkerPanicked { node: String, reason: String },
}

impl From<serde_json::Error> for RaftError {
    fn from(e: serde_json::Error) -> Self {
        RaftError::SerializationError(e.to_string())
    }
}
