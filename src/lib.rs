//! # turnover-predict-rs
//!
//! Temporal latent-state inference and attrition risk scoring for employee
//! survey histories.
//!
//! ## Overview
//!
//! The pipeline couples an unsupervised sequence model with a supervised
//! risk classifier. Monthly survey histories are normalized into fixed-order
//! numeric sequences, a K-state full-covariance Gaussian model is fitted
//! over the pooled corpus (without leaking information across employees),
//! and the decoded behavioral state joins demographic and aggregate survey
//! features in one canonical feature vector consumed by a random-forest
//! classifier. The output is a calibrated attrition probability with a
//! discrete risk tier.
//!
//! ```text
//! records ──▶ sequence ──▶ latent (fit / decode) ──▶ features ──▶ classifier
//!                                                                    │
//!                                        probability + tier ◀────────┘
//! ```
//!
//! ## Training status
//!
//! Training replaces the model artifact wholesale and atomically:
//!
//! ```text
//! UNTRAINED ──(train)──▶ TRAINING ──(success)──▶ TRAINED ──(retrain)──▶ TRAINING
//!                           │
//!                           └──(failure)──▶ ERROR   (last good artifact stays usable)
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use turnover_predict_rs::prelude::*;
//! use turnover_predict_rs::synthetic::generate_dataset;
//!
//! let pipeline = TurnoverPipeline::new(PipelineConfig::default())?;
//!
//! let records = generate_dataset(500, 12, 42);
//! let report = pipeline.train(&records)?;
//! println!("holdout AUC: {:.3}", report.holdout_auc);
//!
//! let predictions = pipeline.predict(&records[..10])?;
//! for p in predictions {
//!     println!("{}: {:.2} ({})", p.employee_id, p.probability, p.tier.name());
//! }
//! # Ok::<(), turnover_predict_rs::error::PipelineError>(())
//! ```
//!
//! ## Architecture
//!
//! - [`config`] - Pipeline configuration and serialization
//! - [`error`] - Typed error taxonomy
//! - [`dataset`] - Employee records and survey observations
//! - [`sequence`] - Alias-resolving sequence builder
//! - [`latent`] - K-state Gaussian sequence model (EM, Viterbi)
//! - [`features`] - Categorical encoders and the canonical feature vector
//! - [`classifier`] - Random forest, evaluation protocol, risk tiers
//! - [`metrics`] - ROC AUC and classification reports
//! - [`artifact`] - Model artifact bundle and persistence
//! - [`synthetic`] - Seeded synthetic corpus generation

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]
// Allow precision loss casts - acceptable in ML numerical code
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]

pub mod artifact;
pub mod classifier;
pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod latent;
pub mod metrics;
pub mod sequence;
pub mod synthetic;

pub use artifact::{ArtifactStore, FileArtifactStore, ModelArtifact};
pub use classifier::{ClassifierEvaluation, RandomForest, RiskTier};
pub use config::{PipelineConfig, TierBoundaries};
pub use dataset::{EmployeeRecord, SurveyObservation};
pub use error::{PipelineError, PipelineResult};
pub use latent::GaussianStateModel;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::features::{FeatureAssembler, LatentSummary};
use crate::sequence::{build_corpus, build_sequence, N_SCORE_DIMS};

/// Visible pipeline status, pollable without blocking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingStatus {
    /// No artifact has ever been produced.
    Untrained,
    /// A training run is in progress.
    Training,
    /// The current artifact was produced by a successful run.
    Trained,
    /// The most recent training run failed. The last good artifact, if any,
    /// remains usable for prediction.
    Error,
}

/// Result of one successful training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainReport {
    /// Pipeline status after the run.
    pub status: TrainingStatus,

    /// AUC on the held-out test partition.
    pub holdout_auc: f64,

    /// Mean cross-validated AUC on the train partition.
    pub cv_auc_mean: f64,

    /// Standard deviation of the per-fold AUCs.
    pub cv_auc_std: f64,

    /// Entities the models were trained on (after rejections).
    pub n_entities: usize,

    /// Entities rejected as malformed.
    pub n_rejected: usize,

    /// Observed turnover rate of the training set.
    pub turnover_rate: f64,

    /// Number of latent states in the fitted model.
    pub n_states: usize,

    /// Completion timestamp (RFC 3339).
    pub trained_at: String,
}

/// Risk assessment for one entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskPrediction {
    /// The assessed entity.
    pub employee_id: u64,

    /// Probability of attrition in [0, 1].
    pub probability: f64,

    /// Discrete risk bucket.
    pub tier: RiskTier,

    /// Distance of the probability from 0.5, scaled to [0, 1].
    pub confidence: f64,
}

/// The pipeline orchestrator.
///
/// Holds the current model artifact behind a read-write lock: any number of
/// concurrent `predict` calls read one consistent artifact snapshot, while
/// `train` builds the replacement completely off to the side and swaps it in
/// only on full success. A failed retrain never touches the previous
/// artifact.
pub struct TurnoverPipeline {
    config: PipelineConfig,
    artifact: RwLock<Option<Arc<ModelArtifact>>>,
    status: RwLock<TrainingStatus>,
    store: Option<Box<dyn ArtifactStore>>,
    /// Serializes training runs; prediction is never blocked by this.
    train_guard: Mutex<()>,
}

impl TurnoverPipeline {
    /// Creates a pipeline with no persistence.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ConfigError`] for an invalid configuration.
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            artifact: RwLock::new(None),
            status: RwLock::new(TrainingStatus::Untrained),
            store: None,
            train_guard: Mutex::new(()),
        })
    }

    /// Creates a pipeline backed by an artifact store, loading any
    /// previously persisted artifact so predictions survive restart.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ConfigError`] for an invalid configuration,
    /// or the store's error if a stored artifact exists but cannot be read.
    /// A cold store ([`PipelineError::ArtifactNotFound`]) is not an error.
    pub fn with_store(
        config: PipelineConfig,
        store: Box<dyn ArtifactStore>,
    ) -> PipelineResult<Self> {
        config.validate()?;

        let (artifact, status) = match store.load() {
            Ok(artifact) => {
                tracing::info!(created_at = %artifact.created_at, "loaded persisted artifact");
                (Some(Arc::new(artifact)), TrainingStatus::Trained)
            }
            Err(PipelineError::ArtifactNotFound) => (None, TrainingStatus::Untrained),
            Err(err) => return Err(err),
        };

        Ok(Self {
            config,
            artifact: RwLock::new(artifact),
            status: RwLock::new(status),
            store: Some(store),
            train_guard: Mutex::new(()),
        })
    }

    /// Current pipeline status.
    #[must_use]
    pub fn status(&self) -> TrainingStatus {
        *self.status.read()
    }

    /// A snapshot of the current artifact, if one exists.
    #[must_use]
    pub fn artifact(&self) -> Option<Arc<ModelArtifact>> {
        self.artifact.read().clone()
    }

    /// Trains both models on labeled records and atomically swaps in the
    /// resulting artifact.
    ///
    /// The full sequence is: sequence building → latent-state fit and decode
    /// → feature assembly (fit mode) → classifier training with stratified
    /// evaluation → artifact persistence → swap. Any failure leaves the
    /// previous artifact untouched and sets the status to
    /// [`TrainingStatus::Error`].
    ///
    /// # Errors
    ///
    /// Propagates every error of the underlying stages; see
    /// [`PipelineError`].
    pub fn train(&self, records: &[EmployeeRecord]) -> PipelineResult<TrainReport> {
        let _guard = self.train_guard.lock();
        *self.status.write() = TrainingStatus::Training;

        match self.run_training(records) {
            Ok((artifact, report)) => {
                let artifact = Arc::new(artifact);
                *self.artifact.write() = Some(artifact);
                *self.status.write() = TrainingStatus::Trained;
                Ok(report)
            }
            Err(err) => {
                tracing::warn!(%err, "training failed; previous artifact retained");
                *self.status.write() = TrainingStatus::Error;
                Err(err)
            }
        }
    }

    fn run_training(
        &self,
        records: &[EmployeeRecord],
    ) -> PipelineResult<(ModelArtifact, TrainReport)> {
        let config = &self.config;
        let k = config.n_states;

        let build = build_corpus(records, config.abort_on_malformed)?;
        let rejected: HashSet<usize> = build.rejected.iter().copied().collect();

        // Per-record sequences, empty for no-history entities.
        let mut sequences: Vec<Vec<[f64; N_SCORE_DIMS]>> = vec![Vec::new(); records.len()];
        {
            let segments = build.corpus.segments();
            for (segment, &record_idx) in segments.iter().zip(&build.included) {
                sequences[record_idx] = segment.to_vec();
            }
        }

        let state_model = GaussianStateModel::fit(&build.corpus, config)?;
        let paths = state_model.decode(&build.corpus)?;

        // Latent summaries: decoded for entities with history, the neutral
        // cold-start fallback for the rest.
        let mut latents: Vec<LatentSummary> =
            (0..records.len()).map(|_| LatentSummary::neutral(k)).collect();
        for (path, &record_idx) in paths.iter().zip(&build.included) {
            let last_row = sequences[record_idx]
                .last()
                .expect("included entities have at least one observation");
            latents[record_idx] = LatentSummary {
                current_state: *path.last().expect("decoded path is non-empty"),
                distribution: state_model.state_distribution(last_row)?,
            };
        }

        let kept: Vec<usize> = (0..records.len())
            .filter(|i| !rejected.contains(i))
            .collect();
        let kept_records: Vec<EmployeeRecord> =
            kept.iter().map(|&i| records[i].clone()).collect();

        let mut labels = Vec::with_capacity(kept.len());
        for record in &kept_records {
            labels.push(record.left.ok_or(PipelineError::MissingLabel {
                employee_id: record.employee_id,
            })?);
        }

        let assembler = FeatureAssembler::fit(&kept_records, k);
        let x: Vec<Vec<f64>> = kept
            .iter()
            .map(|&i| assembler.assemble(&records[i], &sequences[i], &latents[i]))
            .collect();

        let (forest, evaluation) = classifier::train_classifier(&x, &labels, config)?;

        let rate = dataset::turnover_rate(&kept_records);
        let artifact = artifact::new_artifact(
            config.clone(),
            state_model,
            forest,
            assembler,
            evaluation.clone(),
            kept.len(),
            rate,
        );

        // Persist before the swap: a failed save fails the run and leaves
        // the previous artifact (in memory and on disk) untouched.
        if let Some(store) = &self.store {
            store.save(&artifact)?;
        }

        let report = TrainReport {
            status: TrainingStatus::Trained,
            holdout_auc: evaluation.holdout_auc,
            cv_auc_mean: evaluation.cv_auc_mean,
            cv_auc_std: evaluation.cv_auc_std,
            n_entities: kept.len(),
            n_rejected: rejected.len(),
            turnover_rate: rate,
            n_states: k,
            trained_at: artifact.created_at.clone(),
        };
        Ok((artifact, report))
    }

    /// Scores a batch of entities against the current artifact.
    ///
    /// Entities with history are decoded through the latent model; entities
    /// with no history receive the documented cold-start fallback (current
    /// state 0, uniform state distribution) instead of failing. Results
    /// preserve the caller's entity order; malformed entities are rejected
    /// individually unless `abort_on_malformed` is set.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ModelNotTrained`] when no artifact exists.
    pub fn predict(&self, records: &[EmployeeRecord]) -> PipelineResult<Vec<RiskPrediction>> {
        let artifact = self.artifact().ok_or(PipelineError::ModelNotTrained)?;
        let k = artifact.assembler.n_states();

        let mut predictions = Vec::with_capacity(records.len());
        for record in records {
            let sequence = match build_sequence(record) {
                Ok(sequence) => sequence,
                Err(err) if !self.config.abort_on_malformed => {
                    tracing::warn!(
                        employee_id = record.employee_id,
                        %err,
                        "rejecting malformed entity from prediction batch"
                    );
                    continue;
                }
                Err(err) => return Err(err),
            };

            let latent = if sequence.is_empty() {
                LatentSummary::neutral(k)
            } else {
                let path = artifact
                    .state_model
                    .decode_sequence(record.employee_id, &sequence)?;
                let last_row = sequence.last().expect("non-empty sequence");
                LatentSummary {
                    current_state: *path.last().expect("non-empty path"),
                    distribution: artifact.state_model.state_distribution(last_row)?,
                }
            };

            let features = artifact.assembler.assemble(record, &sequence, &latent);
            let probability = artifact.classifier.predict_proba(&features);
            predictions.push(RiskPrediction {
                employee_id: record.employee_id,
                probability,
                tier: RiskTier::from_probability(probability, &artifact.tier_boundaries),
                confidence: (probability - 0.5).abs() * 2.0,
            });
        }
        Ok(predictions)
    }

    /// Ranked `(feature name, importance)` pairs from the current artifact,
    /// descending, truncated to `top_n`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ModelNotTrained`] when no artifact exists.
    pub fn feature_importance(&self, top_n: usize) -> PipelineResult<Vec<(String, f64)>> {
        let artifact = self.artifact().ok_or(PipelineError::ModelNotTrained)?;
        Ok(artifact.feature_importance(top_n))
    }
}

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```
/// use turnover_predict_rs::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        ArtifactStore, EmployeeRecord, FileArtifactStore, ModelArtifact, PipelineConfig,
        PipelineError, PipelineResult, RiskPrediction, RiskTier, SurveyObservation, TrainReport,
        TrainingStatus, TurnoverPipeline,
    };
}
