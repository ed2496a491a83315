use thiserror::Error;

/// Rejected store operations. State is left untouched whenever one of these
/// is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("at least one prediction must remain")]
    LastPrediction,

    #[error("unknown prediction: {0}")]
    UnknownPrediction(String),

    #[error("the base milestone cannot be removed")]
    BaseMilestone,

    #[error("no milestone at market cap {0}")]
    UnknownMilestone(f64),

    #[error("index {index} out of range for {len} entries")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("invalid milestone: {0}")]
    InvalidMilestone(String),

    #[error("invalid base position: {0}")]
    InvalidBase(String),

    #[error("base reset proposal is stale: {0}")]
    StaleProposal(String),

    #[error(transparent)]
    Import(#[from] ImportError),
}

/// Reasons an imported or restored collection is refused.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImportError {
    #[error("invalid predictions JSON: {0}")]
    Parse(String),

    #[error("import must contain at least one prediction")]
    Empty,

    #[error("duplicate prediction id: {0}")]
    DuplicateId(String),
}

impl From<serde_json::Error> for ImportError {
    fn from(value: serde_json::Error) -> Self {
        ImportError::Parse(value.to_string())
    }
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures surfaced by the command-line entry points.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    InvalidArgs(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
