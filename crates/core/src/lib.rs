//! # CineMatch Core
//!
//! Shared building blocks for the CineMatch recommendation backend.
//!
//! This crate provides the domain types, error taxonomy, validation,
//! configuration loading, and backoff utilities used by the engine crate.
//!
//! ## Modules
//!
//! - `types`: interaction and recommendation domain types
//! - `error`: error types and handling
//! - `validation`: id and argument validation
//! - `config`: engine configuration loading from the environment
//! - `retry`: exponential backoff delay policy

pub mod config;
pub mod error;
pub mod retry;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use config::{load_dotenv, ConfigLoader, EngineConfig};
pub use error::CineMatchError;
pub use retry::RetryPolicy;
pub use types::{
    Interaction, ItemId, Recommendation, ReductionPolicy, SimilarityMetric, SimilarityMode, UserId,
};
pub use validation::{validate_item_id, validate_top_n, validate_user_id};

/// Result type alias for CineMatch operations
pub type Result<T> = std::result::Result<T, CineMatchError>;
