//! Pipeline configuration.
//!
//! One serializable structure controls both halves of the pipeline: the
//! latent-state model (state count, EM iteration budget, convergence
//! tolerance) and the risk classifier (forest size, tree bounds, evaluation
//! splits). Configurations load from and save to TOML, validate at
//! construction time, and fall back to defaults tuned on the reference
//! corpus (500 employees, 12 months of history).
//!
//! # Example
//!
//! ```rust
//! use turnover_predict_rs::config::PipelineConfig;
//!
//! // Defaults
//! let config = PipelineConfig::default();
//! assert!(config.validate().is_ok());
//!
//! // Builder
//! let config = PipelineConfig::builder()
//!     .n_states(4)
//!     .n_trees(100)
//!     .seed(7)
//!     .build();
//! assert_eq!(config.n_states, 4);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{PipelineError, PipelineResult};

/// Main configuration for the turnover prediction pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of latent behavioral states learned from survey sequences.
    ///
    /// Three states (engaged / neutral / at-risk) work well for monthly
    /// Likert-scale surveys. Range: 2-8.
    #[serde(default = "default_n_states")]
    pub n_states: usize,

    /// Iteration cap for expectation-maximization.
    #[serde(default = "default_em_iterations")]
    pub em_iterations: usize,

    /// Log-likelihood improvement below which EM is considered converged.
    #[serde(default = "default_em_tolerance")]
    pub em_tolerance: f64,

    /// Regularization added to each covariance diagonal after every M-step.
    ///
    /// Keeps per-state covariance positive definite when a state collapses
    /// onto few observations.
    #[serde(default = "default_covariance_reg")]
    pub covariance_reg: f64,

    /// Seed for state initialization, bootstrap sampling, and splits.
    ///
    /// Two runs with the same seed and the same input produce identical
    /// state assignments and classifier parameters.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Number of trees in the risk classifier forest.
    #[serde(default = "default_n_trees")]
    pub n_trees: usize,

    /// Maximum tree depth.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Minimum samples required to split an internal node.
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,

    /// Minimum samples required in each leaf.
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,

    /// Fraction of entities held out for final evaluation.
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,

    /// Folds for cross-validated AUC on the train partition.
    ///
    /// Capped at the minority-class count when that count is smaller.
    #[serde(default = "default_cv_folds")]
    pub cv_folds: usize,

    /// Whether a malformed observation aborts the whole batch.
    ///
    /// When `false` (default), the offending entity is rejected with a
    /// warning and the remaining entities proceed.
    #[serde(default)]
    pub abort_on_malformed: bool,

    /// Probability boundaries separating the three risk tiers.
    #[serde(default)]
    pub tier_boundaries: TierBoundaries,
}

// Default value functions for serde
fn default_n_states() -> usize {
    3
}
fn default_em_iterations() -> usize {
    100
}
fn default_em_tolerance() -> f64 {
    1e-3
}
fn default_covariance_reg() -> f64 {
    1e-6
}
fn default_seed() -> u64 {
    42
}
fn default_n_trees() -> usize {
    200
}
fn default_max_depth() -> usize {
    12
}
fn default_min_samples_split() -> usize {
    5
}
fn default_min_samples_leaf() -> usize {
    2
}
fn default_test_fraction() -> f64 {
    0.2
}
fn default_cv_folds() -> usize {
    5
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            n_states: default_n_states(),
            em_iterations: default_em_iterations(),
            em_tolerance: default_em_tolerance(),
            covariance_reg: default_covariance_reg(),
            seed: default_seed(),
            n_trees: default_n_trees(),
            max_depth: default_max_depth(),
            min_samples_split: default_min_samples_split(),
            min_samples_leaf: default_min_samples_leaf(),
            test_fraction: default_test_fraction(),
            cv_folds: default_cv_folds(),
            abort_on_malformed: false,
            tier_boundaries: TierBoundaries::default(),
        }
    }
}

impl PipelineConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ConfigError`] if the file cannot be read or
    /// parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| PipelineError::ConfigError {
                detail: format!("failed to read config file: {e}"),
            })?;

        let config: Self = toml::from_str(&content).map_err(|e| PipelineError::ConfigError {
            detail: format!("failed to parse config: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ConfigError`] if serialization or writing
    /// fails.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> PipelineResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| PipelineError::ConfigError {
            detail: format!("failed to serialize config: {e}"),
        })?;

        std::fs::write(path.as_ref(), content).map_err(|e| PipelineError::ConfigError {
            detail: format!("failed to write config file: {e}"),
        })
    }

    /// Validates parameter ranges and cross-parameter consistency.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ConfigError`] describing the first violation.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.n_states < 2 {
            return Err(PipelineError::ConfigError {
                detail: "n_states must be >= 2".to_string(),
            });
        }
        if self.em_iterations == 0 {
            return Err(PipelineError::ConfigError {
                detail: "em_iterations must be > 0".to_string(),
            });
        }
        if self.em_tolerance <= 0.0 || !self.em_tolerance.is_finite() {
            return Err(PipelineError::ConfigError {
                detail: "em_tolerance must be a positive finite value".to_string(),
            });
        }
        if self.n_trees == 0 {
            return Err(PipelineError::ConfigError {
                detail: "n_trees must be > 0".to_string(),
            });
        }
        if self.max_depth == 0 {
            return Err(PipelineError::ConfigError {
                detail: "max_depth must be > 0".to_string(),
            });
        }
        if self.min_samples_leaf == 0 {
            return Err(PipelineError::ConfigError {
                detail: "min_samples_leaf must be > 0".to_string(),
            });
        }
        if self.test_fraction <= 0.0 || self.test_fraction >= 1.0 {
            return Err(PipelineError::ConfigError {
                detail: "test_fraction must be in (0, 1)".to_string(),
            });
        }
        if self.cv_folds < 2 {
            return Err(PipelineError::ConfigError {
                detail: "cv_folds must be >= 2".to_string(),
            });
        }
        self.tier_boundaries.validate()
    }
}

/// Probability boundaries between risk tiers.
///
/// Both boundaries are inclusive at the lower edge of the upper tier: a
/// probability exactly at `medium` is Medium risk, exactly at `high` is High
/// risk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TierBoundaries {
    /// Probabilities at or above this value (and below `high`) are Medium.
    #[serde(default = "default_medium_boundary")]
    pub medium: f64,

    /// Probabilities at or above this value are High.
    #[serde(default = "default_high_boundary")]
    pub high: f64,
}

fn default_medium_boundary() -> f64 {
    0.3
}
fn default_high_boundary() -> f64 {
    0.6
}

impl Default for TierBoundaries {
    fn default() -> Self {
        Self {
            medium: default_medium_boundary(),
            high: default_high_boundary(),
        }
    }
}

impl TierBoundaries {
    fn validate(&self) -> PipelineResult<()> {
        let ordered = 0.0 < self.medium && self.medium < self.high && self.high <= 1.0;
        if !ordered {
            return Err(PipelineError::ConfigError {
                detail: format!(
                    "tier boundaries must satisfy 0 < medium < high <= 1 (got {} / {})",
                    self.medium, self.high
                ),
            });
        }
        Ok(())
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    n_states: Option<usize>,
    em_iterations: Option<usize>,
    em_tolerance: Option<f64>,
    seed: Option<u64>,
    n_trees: Option<usize>,
    max_depth: Option<usize>,
    min_samples_split: Option<usize>,
    min_samples_leaf: Option<usize>,
    test_fraction: Option<f64>,
    cv_folds: Option<usize>,
    abort_on_malformed: Option<bool>,
    tier_boundaries: Option<TierBoundaries>,
}

impl PipelineConfigBuilder {
    /// Sets the number of latent states.
    #[must_use]
    pub fn n_states(mut self, n: usize) -> Self {
        self.n_states = Some(n);
        self
    }

    /// Sets the EM iteration cap.
    #[must_use]
    pub fn em_iterations(mut self, n: usize) -> Self {
        self.em_iterations = Some(n);
        self
    }

    /// Sets the EM convergence tolerance.
    #[must_use]
    pub fn em_tolerance(mut self, tol: f64) -> Self {
        self.em_tolerance = Some(tol);
        self
    }

    /// Sets the random seed.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the forest size.
    #[must_use]
    pub fn n_trees(mut self, n: usize) -> Self {
        self.n_trees = Some(n);
        self
    }

    /// Sets the maximum tree depth.
    #[must_use]
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Sets the minimum samples to split a node.
    #[must_use]
    pub fn min_samples_split(mut self, n: usize) -> Self {
        self.min_samples_split = Some(n);
        self
    }

    /// Sets the minimum samples per leaf.
    #[must_use]
    pub fn min_samples_leaf(mut self, n: usize) -> Self {
        self.min_samples_leaf = Some(n);
        self
    }

    /// Sets the holdout fraction.
    #[must_use]
    pub fn test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = Some(fraction);
        self
    }

    /// Sets the cross-validation fold count.
    #[must_use]
    pub fn cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = Some(folds);
        self
    }

    /// Sets whether malformed observations abort the batch.
    #[must_use]
    pub fn abort_on_malformed(mut self, abort: bool) -> Self {
        self.abort_on_malformed = Some(abort);
        self
    }

    /// Sets the risk tier boundaries.
    #[must_use]
    pub fn tier_boundaries(mut self, boundaries: TierBoundaries) -> Self {
        self.tier_boundaries = Some(boundaries);
        self
    }

    /// Builds the configuration with defaults for unset values.
    #[must_use]
    pub fn build(self) -> PipelineConfig {
        PipelineConfig {
            n_states: self.n_states.unwrap_or_else(default_n_states),
            em_iterations: self.em_iterations.unwrap_or_else(default_em_iterations),
            em_tolerance: self.em_tolerance.unwrap_or_else(default_em_tolerance),
            covariance_reg: default_covariance_reg(),
            seed: self.seed.unwrap_or_else(default_seed),
            n_trees: self.n_trees.unwrap_or_else(default_n_trees),
            max_depth: self.max_depth.unwrap_or_else(default_max_depth),
            min_samples_split: self
                .min_samples_split
                .unwrap_or_else(default_min_samples_split),
            min_samples_leaf: self
                .min_samples_leaf
                .unwrap_or_else(default_min_samples_leaf),
            test_fraction: self.test_fraction.unwrap_or_else(default_test_fraction),
            cv_folds: self.cv_folds.unwrap_or_else(default_cv_folds),
            abort_on_malformed: self.abort_on_malformed.unwrap_or(false),
            tier_boundaries: self.tier_boundaries.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = PipelineConfig::builder()
            .n_states(4)
            .n_trees(50)
            .seed(7)
            .build();

        assert_eq!(config.n_states, 4);
        assert_eq!(config.n_trees, 50);
        assert_eq!(config.seed, 7);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = PipelineConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: PipelineConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.n_states, parsed.n_states);
        assert_eq!(config.n_trees, parsed.n_trees);
        assert!((config.tier_boundaries.medium - parsed.tier_boundaries.medium).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_state_count() {
        let config = PipelineConfig {
            n_states: 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_tier_boundaries_rejected() {
        let config = PipelineConfig {
            tier_boundaries: TierBoundaries {
                medium: 0.7,
                high: 0.4,
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::ConfigError { .. })
        ));
    }
}
