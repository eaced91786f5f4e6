//! Model artifact bundle and persistence.
//!
//! One training run produces one immutable [`ModelArtifact`]: the fitted
//! latent-state parameters, the classifier forest, the categorical encoders,
//! the canonical feature-name list, and the risk-tier boundaries. Everything
//! `predict` needs travels together, so a reader can never pair a new
//! classifier with an old feature contract.
//!
//! Persistence is JSON through buffered readers/writers with a version field
//! checked on load. Saves are atomic: the artifact is written to a temporary
//! sibling file and renamed into place, so a crashed save never corrupts the
//! last good artifact.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crate::classifier::{ClassifierEvaluation, RandomForest};
use crate::config::{PipelineConfig, TierBoundaries};
use crate::error::{PipelineError, PipelineResult};
use crate::features::FeatureAssembler;
use crate::latent::GaussianStateModel;

/// Current artifact format version.
const ARTIFACT_VERSION: u32 = 1;

/// The complete, immutable bundle produced by one training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Artifact format version, checked on load.
    pub version: u32,

    /// Creation timestamp (RFC 3339).
    pub created_at: String,

    /// Configuration snapshot the artifact was trained under.
    pub config: PipelineConfig,

    /// Fitted latent-state model.
    pub state_model: GaussianStateModel,

    /// Fitted risk classifier.
    pub classifier: RandomForest,

    /// Fitted encoders and the canonical feature-name list.
    pub assembler: FeatureAssembler,

    /// Risk-tier boundaries frozen at training time.
    pub tier_boundaries: TierBoundaries,

    /// Evaluation recorded at training time.
    pub evaluation: ClassifierEvaluation,

    /// Number of entities the artifact was trained on.
    pub n_entities: usize,

    /// Observed turnover rate of the training set.
    pub turnover_rate: f64,
}

impl ModelArtifact {
    /// Ranked `(feature name, importance)` pairs, descending, truncated to
    /// `top_n`.
    #[must_use]
    pub fn feature_importance(&self, top_n: usize) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> = self
            .assembler
            .feature_names()
            .iter()
            .cloned()
            .zip(self.classifier.importances().iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(top_n);
        ranked
    }
}

/// Opaque persist/load of artifact bundles.
///
/// The pipeline requires exactly these two operations; anything beyond
/// (retention, replication, listing) belongs to the implementation.
pub trait ArtifactStore: Send + Sync {
    /// Persists the artifact, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ArtifactError`] on I/O or serialization
    /// failure. A failed save must leave any previously stored artifact
    /// intact.
    fn save(&self, artifact: &ModelArtifact) -> PipelineResult<()>;

    /// Loads the stored artifact.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ArtifactNotFound`] when nothing is stored,
    /// [`PipelineError::ArtifactVersionMismatch`] for an incompatible
    /// format, and [`PipelineError::ArtifactError`] for I/O or
    /// deserialization failures.
    fn load(&self) -> PipelineResult<ModelArtifact>;
}

/// File-backed artifact store.
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    path: PathBuf,
}

impl FileArtifactStore {
    /// Creates a store persisting to `path`.
    #[must_use]
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// The path this store persists to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ArtifactStore for FileArtifactStore {
    fn save(&self, artifact: &ModelArtifact) -> PipelineResult<()> {
        let tmp_path = self.path.with_extension("tmp");

        let file = File::create(&tmp_path).map_err(|e| PipelineError::ArtifactError {
            detail: format!("failed to create artifact file: {e}"),
        })?;
        let writer = BufWriter::new(file);
        serde_json::to_writer(writer, artifact).map_err(|e| PipelineError::ArtifactError {
            detail: format!("failed to serialize artifact: {e}"),
        })?;

        // Rename over the previous artifact only once the new one is fully
        // written; a crash mid-save leaves the old artifact untouched.
        std::fs::rename(&tmp_path, &self.path).map_err(|e| PipelineError::ArtifactError {
            detail: format!("failed to replace artifact: {e}"),
        })?;

        tracing::info!(path = %self.path.display(), "model artifact persisted");
        Ok(())
    }

    fn load(&self) -> PipelineResult<ModelArtifact> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PipelineError::ArtifactNotFound);
            }
            Err(e) => {
                return Err(PipelineError::ArtifactError {
                    detail: format!("failed to open artifact file: {e}"),
                });
            }
        };

        let reader = BufReader::new(file);
        let artifact: ModelArtifact =
            serde_json::from_reader(reader).map_err(|e| PipelineError::ArtifactError {
                detail: format!("failed to deserialize artifact: {e}"),
            })?;

        if artifact.version != ARTIFACT_VERSION {
            return Err(PipelineError::ArtifactVersionMismatch {
                found: artifact.version,
                expected: ARTIFACT_VERSION,
            });
        }
        Ok(artifact)
    }
}

/// Stamps a new artifact with the current version and timestamp.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub(crate) fn new_artifact(
    config: PipelineConfig,
    state_model: GaussianStateModel,
    classifier: RandomForest,
    assembler: FeatureAssembler,
    evaluation: ClassifierEvaluation,
    n_entities: usize,
    turnover_rate: f64,
) -> ModelArtifact {
    let tier_boundaries = config.tier_boundaries;
    ModelArtifact {
        version: ARTIFACT_VERSION,
        created_at: chrono::Utc::now().to_rfc3339(),
        config,
        state_model,
        classifier,
        assembler,
        tier_boundaries,
        evaluation,
        n_entities,
        turnover_rate,
    }
}
