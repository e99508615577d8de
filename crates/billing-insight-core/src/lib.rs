pub mod classify;
pub mod config;
pub mod error;
pub mod ingest;
pub mod normalize;
pub mod types;

#[cfg(feature = "aggregate")]
pub mod aggregate;

#[cfg(feature = "ranking")]
pub mod ranking;

pub use error::BillingInsightError;
pub use types::*;

/// Standard result type for all billing-insight operations
pub type BillingInsightResult<T> = Result<T, BillingInsightError>;
