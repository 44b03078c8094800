//! Engine configuration loading
//!
//! Configuration comes from environment variables with the `CINEMATCH_`
//! prefix, with `.env` file support via dotenvy. Override hierarchy:
//! defaults < .env < environment.
//!
//! # Environment Variables
//!
//! - `CINEMATCH_METRIC`: cosine | pearson | jaccard (default: cosine)
//! - `CINEMATCH_SIMILARITY_MODE`: user | item (default: user)
//! - `CINEMATCH_REDUCTION_POLICY`: sum_weights | latest_wins (default: sum_weights)
//! - `CINEMATCH_REQUIRE_POSITIVE_WEIGHTS`: true | false (default: true)
//! - `CINEMATCH_MIN_CO_RATED`: minimum co-rated overlap for a scored pair (default: 2)
//! - `CINEMATCH_TOP_K_NEIGHBORS`: neighbors retained per entity (default: 50)
//! - `CINEMATCH_RECOMPUTE_INTERVAL_SECS`: seconds between scheduled rebuilds (default: 900)
//! - `CINEMATCH_STALENESS_THRESHOLD`: new interactions that force an early rebuild (default: 500)

use std::time::Duration;

use crate::error::CineMatchError;
use crate::types::{ReductionPolicy, SimilarityMetric, SimilarityMode};

/// Load a `.env` file if one is present. Missing files are not an error.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Configuration loader trait
///
/// Standardized loading and validation of configuration from environment
/// variables.
pub trait ConfigLoader: Sized {
    /// Load configuration from environment variables, with defaults for
    /// missing optional values.
    fn from_env() -> Result<Self, CineMatchError>;

    /// Validate configuration values against acceptable ranges.
    fn validate(&self) -> Result<(), CineMatchError>;
}

/// Recommendation engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Similarity metric for neighbor scoring
    pub metric: SimilarityMetric,
    /// Whether neighbors are users or items
    pub mode: SimilarityMode,
    /// Duplicate (user, item) reduction policy
    pub reduction: ReductionPolicy,
    /// Drop interactions with weight <= 0 during a build
    pub require_positive_weights: bool,
    /// Pairs sharing fewer co-rated counterparts are not scored at all
    pub min_co_rated: usize,
    /// Neighbors retained per entity after scoring
    pub top_k_neighbors: usize,
    /// Fixed interval between scheduled rebuilds
    pub recompute_interval: Duration,
    /// New interactions since the last build that force an early rebuild
    pub staleness_threshold: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            metric: SimilarityMetric::Cosine,
            mode: SimilarityMode::UserBased,
            reduction: ReductionPolicy::SumWeights,
            require_positive_weights: true,
            min_co_rated: 2,
            top_k_neighbors: 50,
            recompute_interval: Duration::from_secs(900),
            staleness_threshold: 500,
        }
    }
}

impl ConfigLoader for EngineConfig {
    fn from_env() -> Result<Self, CineMatchError> {
        let defaults = Self::default();

        let metric = match std::env::var("CINEMATCH_METRIC") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.metric,
        };
        let mode = match std::env::var("CINEMATCH_SIMILARITY_MODE") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.mode,
        };
        let reduction = match std::env::var("CINEMATCH_REDUCTION_POLICY") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.reduction,
        };

        let config = Self {
            metric,
            mode,
            reduction,
            require_positive_weights: parse_env_bool(
                "CINEMATCH_REQUIRE_POSITIVE_WEIGHTS",
                defaults.require_positive_weights,
            )?,
            min_co_rated: parse_env_number("CINEMATCH_MIN_CO_RATED", defaults.min_co_rated)?,
            top_k_neighbors: parse_env_number(
                "CINEMATCH_TOP_K_NEIGHBORS",
                defaults.top_k_neighbors,
            )?,
            recompute_interval: Duration::from_secs(parse_env_number(
                "CINEMATCH_RECOMPUTE_INTERVAL_SECS",
                defaults.recompute_interval.as_secs(),
            )?),
            staleness_threshold: parse_env_number(
                "CINEMATCH_STALENESS_THRESHOLD",
                defaults.staleness_threshold,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), CineMatchError> {
        if self.min_co_rated == 0 {
            return Err(CineMatchError::configuration(
                "min_co_rated must be at least 1",
            ));
        }
        if self.top_k_neighbors == 0 {
            return Err(CineMatchError::configuration(
                "top_k_neighbors must be at least 1",
            ));
        }
        if self.recompute_interval < Duration::from_secs(1) {
            return Err(CineMatchError::configuration(
                "recompute_interval must be at least one second",
            ));
        }
        if self.staleness_threshold == 0 {
            return Err(CineMatchError::configuration(
                "staleness_threshold must be at least 1",
            ));
        }
        Ok(())
    }
}

fn parse_env_number<T>(name: &str, default: T) -> Result<T, CineMatchError>
where
    T: std::str::FromStr,
{
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            CineMatchError::configuration(format!("{name} must be a non-negative integer: '{raw}'"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_env_bool(name: &str, default: bool) -> Result<bool, CineMatchError> {
    match std::env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(CineMatchError::configuration(format!(
                "{name} must be a boolean: '{raw}'"
            ))),
        },
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.metric, SimilarityMetric::Cosine);
        assert_eq!(config.mode, SimilarityMode::UserBased);
        assert_eq!(config.top_k_neighbors, 50);
    }

    #[test]
    fn test_validate_rejects_zero_top_k() {
        let config = EngineConfig {
            top_k_neighbors: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_min_co_rated() {
        let config = EngineConfig {
            min_co_rated: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_subsecond_interval() {
        let config = EngineConfig {
            recompute_interval: Duration::from_millis(100),
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    // Environment-variable loading is covered in a single test to avoid
    // cross-test races on process-global env state.
    #[test]
    fn test_from_env_overrides_and_errors() {
        std::env::set_var("CINEMATCH_METRIC", "pearson");
        std::env::set_var("CINEMATCH_SIMILARITY_MODE", "item");
        std::env::set_var("CINEMATCH_REDUCTION_POLICY", "latest_wins");
        std::env::set_var("CINEMATCH_MIN_CO_RATED", "3");
        std::env::set_var("CINEMATCH_TOP_K_NEIGHBORS", "25");
        std::env::set_var("CINEMATCH_RECOMPUTE_INTERVAL_SECS", "60");
        std::env::set_var("CINEMATCH_STALENESS_THRESHOLD", "100");

        let config = EngineConfig::from_env().unwrap();
        assert_eq!(config.metric, SimilarityMetric::Pearson);
        assert_eq!(config.mode, SimilarityMode::ItemBased);
        assert_eq!(config.reduction, ReductionPolicy::LatestWins);
        assert_eq!(config.min_co_rated, 3);
        assert_eq!(config.top_k_neighbors, 25);
        assert_eq!(config.recompute_interval, Duration::from_secs(60));
        assert_eq!(config.staleness_threshold, 100);

        std::env::set_var("CINEMATCH_METRIC", "manhattan");
        assert!(EngineConfig::from_env().is_err());

        for name in [
            "CINEMATCH_METRIC",
            "CINEMATCH_SIMILARITY_MODE",
            "CINEMATCH_REDUCTION_POLICY",
            "CINEMATCH_MIN_CO_RATED",
            "CINEMATCH_TOP_K_NEIGHBORS",
            "CINEMATCH_RECOMPUTE_INTERVAL_SECS",
            "CINEMATCH_STALENESS_THRESHOLD",
        ] {
            std::env::remove_var(name);
        }
    }
}
