use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalculationError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Reference integrity: holding {holding} references unknown {missing}")]
    ReferenceIntegrity { holding: String, missing: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for CalculationError {
    fn from(e: serde_json::Error) -> Self {
        CalculationError::SerializationError(e.to_string())
    }
}
