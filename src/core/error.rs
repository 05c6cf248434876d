use thiserror::Error;

/// Errors that escape the engine
///
/// Provider failures never appear here; they are absorbed as
/// `TravelTime::Unreachable` samples or empty venue lists.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<validator::ValidationErrors> for EngineError {
    fn from(errors: validator::ValidationErrors) -> Self {
        EngineError::InvalidInput(errors.to_string())
    }
}
