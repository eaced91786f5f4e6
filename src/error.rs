//! Error types for the turnover prediction pipeline.
//!
//! Every failure mode a caller can hit is a distinct, matchable variant so
//! the surrounding service can map each one to its own user-facing response.
//! Two situations are deliberately *not* errors and never appear here:
//! a category value unseen at training time (encoded as a sentinel) and an
//! entity with no survey history (assigned the neutral cold-start state).
//!
//! # Error Categories
//!
//! - **Input errors**: malformed observations, missing training labels
//! - **Model errors**: degenerate fits, empty sequences, untrained access
//! - **Artifact errors**: persistence failures, missing stored artifact
//! - **Configuration errors**: invalid parameter combinations

use thiserror::Error;

/// The main error type for the prediction pipeline.
///
/// Each variant carries enough context to identify the offending entity or
/// parameter without a debugger.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An observation did not expose a score under the canonical key or any
    /// of its declared aliases.
    ///
    /// By default the offending entity is rejected and the batch proceeds;
    /// `abort_on_malformed` in the configuration turns this into a fail-fast
    /// error for the whole call.
    #[error("malformed observation for employee {employee_id} (month {month}): no key resolves score field `{field}`")]
    MalformedObservation {
        /// The entity whose observation could not be read.
        employee_id: u64,
        /// Month index of the offending observation.
        month: u32,
        /// Canonical name of the unresolvable score field.
        field: &'static str,
    },

    /// A training record carried no attrition label.
    #[error("employee {employee_id} has no attrition label; training requires labeled records")]
    MissingLabel {
        /// The unlabeled entity.
        employee_id: u64,
    },

    /// The latent-state model could not be fitted.
    ///
    /// Raised when the pooled corpus is smaller than the state count, when a
    /// score dimension has zero variance, or when the per-state covariance
    /// cannot be kept positive definite.
    #[error("latent state model fit failed: {detail}")]
    ModelFitError {
        /// Description of the degenerate condition.
        detail: String,
    },

    /// A sequence with zero observations reached the decoder.
    #[error("cannot decode an empty observation sequence for employee {employee_id}")]
    EmptySequence {
        /// The entity with the empty sequence.
        employee_id: u64,
    },

    /// Training labels contained a single class.
    ///
    /// Stratified splitting and cross-validation are undefined with one
    /// class; training aborts before any model mutation.
    #[error("degenerate labels: all {n_entities} training entities share class `{class}`")]
    DegenerateLabels {
        /// Number of entities in the training set.
        n_entities: usize,
        /// The single observed class (0 = stayed, 1 = left).
        class: u8,
    },

    /// `predict` or `feature_importance` was called before any artifact
    /// existed.
    #[error("no trained model artifact available; call train() first")]
    ModelNotTrained,

    /// Artifact persistence failed (I/O or serialization).
    #[error("artifact store error: {detail}")]
    ArtifactError {
        /// Description of the persistence failure.
        detail: String,
    },

    /// The store holds no artifact.
    ///
    /// Distinct from [`PipelineError::ArtifactError`] so startup code can
    /// treat a cold store as normal rather than as a fault.
    #[error("no artifact found in store")]
    ArtifactNotFound,

    /// The stored artifact was written by an incompatible crate version.
    #[error("incompatible artifact version {found} (expected {expected})")]
    ArtifactVersionMismatch {
        /// Version found in the stored artifact.
        found: u32,
        /// Version this build reads and writes.
        expected: u32,
    },

    /// Invalid configuration value or combination.
    #[error("configuration error: {detail}")]
    ConfigError {
        /// Description of the invalid setting.
        detail: String,
    },
}

/// Crate-wide result alias.
pub type PipelineResult<T> = Result<T, PipelineError>;
