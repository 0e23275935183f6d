//! Engine error taxonomy.
//!
//! Validation and risk rejections are surfaced to the caller verbatim and are
//! never retried. Adapter failures mark the operation failed; retrying is the
//! caller's decision. Invariant violations indicate a usage bug and fail fast.

/// Top-level error type for quantdesk.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("validation failed: {reason}")]
    Validation { reason: String },

    #[error("risk limit breached ({limit}): {reason}")]
    RiskRejected { limit: String, reason: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("adapter error: {reason}")]
    Adapter { reason: String },

    #[error("invariant violated: {reason}")]
    Invariant { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("insufficient data for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn validation(reason: impl Into<String>) -> Self {
        EngineError::Validation {
            reason: reason.into(),
        }
    }

    pub fn adapter(reason: impl Into<String>) -> Self {
        EngineError::Adapter {
            reason: reason.into(),
        }
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

impl From<&EngineError> for std::process::ExitCode {
    fn from(err: &EngineError) -> Self {
        let code: u8 = match err {
            EngineError::Io(_) => 1,
            EngineError::ConfigParse { .. }
            | EngineError::ConfigMissing { .. }
            | EngineError::ConfigInvalid { .. } => 2,
            EngineError::Data { .. } | EngineError::InsufficientData { .. } => 3,
            EngineError::Validation { .. } | EngineError::RiskRejected { .. } => 4,
            EngineError::NotFound { .. } => 5,
            EngineError::Adapter { .. } => 6,
            EngineError::Invariant { .. } => 7,
        };
        std::process::ExitCode::from(code)
    }
}
