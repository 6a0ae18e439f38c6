// Error types for promptboard
// Variants follow the failure classes the engine distinguishes

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A relocation reached the disk but left some representation stale.
    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Persistence queue error: {0}")]
    Queue(String),
}

pub type Result<T> = std::result::Result<T, Error>;
