pub mod assumptions;
pub mod averages;
pub mod dcf;
pub mod error;
pub mod projection;
pub mod rollforward;
pub mod scenario;
pub mod statements;
pub mod types;

pub use error::ValuationError;
pub use types::*;

/// Standard result type for all valuation operations
pub type ValuationResult<T> = Result<T, ValuationError>;
