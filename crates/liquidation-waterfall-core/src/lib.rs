pub mod error;
pub mod types;

#[cfg(feature = "liquidation")]
pub mod liquidation;

pub use error::CalculationError;
pub use types::*;

/// Standard result type for all waterfall operations
pub type CalculationResult<T> = Result<T, CalculationError>;
