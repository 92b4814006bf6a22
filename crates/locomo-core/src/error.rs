use thiserror::Error;

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("collaborator error: {0}")]
    Collaborator(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type BenchResult<T> = Result<T, BenchError>;
