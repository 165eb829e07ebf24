//! Domain-level error taxonomy for MarkGuard.

/// Mark records that cannot start an analysis.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{role} mark is missing its identifier")]
    MissingIdentifier { role: &'static str },

    #[error("{role} mark {id} has neither a name nor an image")]
    NothingToCompare { role: &'static str, id: String },

    #[error("{role} mark {id} has a non-finite image vector component")]
    NonFiniteVector { role: &'static str, id: String },
}

/// Anchor tables that cannot drive interpolation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalibrationError {
    #[error("anchor table is empty")]
    EmptyTable,

    #[error("anchor {index} is not finite")]
    NonFiniteAnchor { index: usize },

    #[error("anchor {index} breaks ordering (raw {raw} after {previous_raw})")]
    Unordered {
        index: usize,
        raw: f64,
        previous_raw: f64,
    },

    #[error("anchor {index} lowers the calibrated value")]
    Decreasing { index: usize },

    #[error("raw score {0} is not finite")]
    NonFiniteScore(f64),
}

/// MarkGuard domain errors.
#[derive(Debug, thiserror::Error)]
pub enum MarkGuardError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("calibration error: {0}")]
    Calibration(#[from] CalibrationError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("capability error: {0}")]
    Capability(#[from] markguard_llm::LlmError),

    #[error("storage error: {0}")]
    Storage(#[from] markguard_store::StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for MarkGuard domain operations.
pub type Result<T> = std::result::Result<T, MarkGuardError>;
