use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("unknown scenario: {0}")]
    UnknownScenario(String),
    #[error("invalid parameter {key}: {reason}")]
    InvalidParameter { key: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("invalid snapshot JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("snapshot is missing required key {0}")]
    MissingKey(&'static str),
    #[error(transparent)]
    Invalid(#[from] EngineError),
    #[error("snapshot file error: {0}")]
    Io(#[from] std::io::Error),
}
