//! Feature assembly: one canonical vector for training and inference.
//!
//! The classifier's feature contract must stay bit-for-bit identical between
//! the two paths: same names, same order, same encoding, for the lifetime of
//! one model artifact. The assembler is fitted once at training time (where
//! it learns the categorical code maps and records the canonical name list)
//! and then applied, unchanged, to every inference request.
//!
//! Fallback policies (both are normal paths, not errors):
//! - A category value absent from the stored mapping encodes as the sentinel
//!   `-1`.
//! - Missing or non-finite scalars become `0.0`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::dataset::EmployeeRecord;
use crate::sequence::{N_SCORE_DIMS, SCORE_FIELDS};

/// Code assigned to category values not seen at fit time.
pub const UNSEEN_CATEGORY_CODE: i64 = -1;

/// Categorical attributes encoded into the feature vector, in order.
pub const CATEGORICAL_ATTRIBUTES: [&str; 4] = ["department", "level", "salary_band", "work_location"];

/// Latent-state summary for one entity, as consumed by the assembler.
///
/// For entities with history this comes from the latent model; for
/// no-history entities the orchestrator substitutes the neutral fallback
/// (state 0, uniform distribution).
#[derive(Debug, Clone)]
pub struct LatentSummary {
    /// Most likely current state (last element of the decoded path).
    pub current_state: usize,

    /// Probability over the K states, summing to 1.
    pub distribution: Vec<f64>,
}

impl LatentSummary {
    /// The neutral cold-start summary: state 0 and a uniform distribution.
    #[must_use]
    pub fn neutral(n_states: usize) -> Self {
        Self {
            current_state: 0,
            distribution: vec![1.0 / n_states as f64; n_states],
        }
    }
}

/// A value-to-dense-code mapping for one categorical attribute.
///
/// Codes are assigned over the sorted distinct values seen at fit time, so
/// the mapping is independent of input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryEncoder {
    mapping: BTreeMap<String, i64>,
}

impl CategoryEncoder {
    /// Learns the mapping from the distinct values in `values`.
    #[must_use]
    pub fn fit<'a, I: IntoIterator<Item = &'a str>>(values: I) -> Self {
        let distinct: std::collections::BTreeSet<&str> = values.into_iter().collect();
        let mapping = distinct
            .into_iter()
            .enumerate()
            .map(|(code, value)| (value.to_string(), code as i64))
            .collect();
        Self { mapping }
    }

    /// Encodes a value, returning [`UNSEEN_CATEGORY_CODE`] for values absent
    /// from the fitted mapping.
    #[must_use]
    pub fn encode(&self, value: &str) -> i64 {
        self.mapping
            .get(value)
            .copied()
            .unwrap_or(UNSEEN_CATEGORY_CODE)
    }

    /// Number of distinct values seen at fit time.
    #[must_use]
    pub fn n_categories(&self) -> usize {
        self.mapping.len()
    }
}

/// Fitted feature assembler: categorical encoders plus the canonical
/// feature-name list. Persisted inside the model artifact and reused
/// verbatim at inference time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureAssembler {
    encoders: BTreeMap<String, CategoryEncoder>,
    feature_names: Vec<String>,
    n_states: usize,
}

impl FeatureAssembler {
    /// Fits encoders over the training records and freezes the canonical
    /// feature-name list for `n_states` latent states.
    #[must_use]
    pub fn fit(records: &[EmployeeRecord], n_states: usize) -> Self {
        let mut encoders = BTreeMap::new();
        for attr in CATEGORICAL_ATTRIBUTES {
            let encoder = CategoryEncoder::fit(
                records.iter().map(|r| categorical_value(r, attr)),
            );
            encoders.insert(attr.to_string(), encoder);
        }

        let mut feature_names: Vec<String> = vec![
            "age".to_string(),
            "tenure_months".to_string(),
            "promoted".to_string(),
            "salary_increase_pct".to_string(),
            "manager_changed".to_string(),
            "trainings".to_string(),
            "performance_score".to_string(),
        ];
        for field in &SCORE_FIELDS {
            feature_names.push(format!("avg_{}", field.canonical));
        }
        feature_names.push("current_state".to_string());
        for attr in CATEGORICAL_ATTRIBUTES {
            feature_names.push(format!("{attr}_code"));
        }
        for state in 0..n_states {
            feature_names.push(format!("state_prob_{state}"));
        }

        Self {
            encoders,
            feature_names,
            n_states,
        }
    }

    /// Assembles the canonical vector for one entity.
    ///
    /// `sequence` is the entity's built observation matrix (possibly empty);
    /// survey-score means are computed from it when present, falling back to
    /// the record's precomputed means, then to 0.
    #[must_use]
    pub fn assemble(
        &self,
        record: &EmployeeRecord,
        sequence: &[[f64; N_SCORE_DIMS]],
        latent: &LatentSummary,
    ) -> Vec<f64> {
        let mut features = Vec::with_capacity(self.feature_names.len());

        features.push(fill(f64::from(record.age)));
        features.push(fill(f64::from(record.tenure_months)));
        features.push(f64::from(u8::from(record.promoted)));
        features.push(fill(record.salary_increase_pct));
        features.push(f64::from(u8::from(record.manager_changed)));
        features.push(fill(f64::from(record.trainings)));
        features.push(fill(record.performance_score));

        let means = survey_means(record, sequence);
        features.extend(means.iter().map(|&m| fill(m)));

        features.push(latent.current_state as f64);

        for attr in CATEGORICAL_ATTRIBUTES {
            let code = self.encoders[attr].encode(categorical_value(record, attr));
            features.push(code as f64);
        }

        // State-distribution columns: absent entries fill with 0 so the
        // vector keeps its width even when no distribution was computed.
        for state in 0..self.n_states {
            features.push(fill(latent.distribution.get(state).copied().unwrap_or(0.0)));
        }

        debug_assert_eq!(features.len(), self.feature_names.len());
        features
    }

    /// Assembles vectors for a batch, preserving input order.
    #[must_use]
    pub fn assemble_batch(
        &self,
        records: &[EmployeeRecord],
        sequences: &[Vec<[f64; N_SCORE_DIMS]>],
        latents: &[LatentSummary],
    ) -> Vec<Vec<f64>> {
        records
            .iter()
            .zip(sequences)
            .zip(latents)
            .map(|((record, sequence), latent)| self.assemble(record, sequence, latent))
            .collect()
    }

    /// The canonical, ordered feature-name list.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Number of latent states the vector was shaped for.
    #[must_use]
    pub fn n_states(&self) -> usize {
        self.n_states
    }
}

fn categorical_value<'a>(record: &'a EmployeeRecord, attr: &str) -> &'a str {
    match attr {
        "department" => &record.department,
        "level" => &record.level,
        "salary_band" => &record.salary_band,
        _ => &record.work_location,
    }
}

/// Survey-score means in canonical dimension order: history-derived when the
/// sequence is non-empty, the record's precomputed means otherwise, 0 as the
/// last resort.
fn survey_means(record: &EmployeeRecord, sequence: &[[f64; N_SCORE_DIMS]]) -> [f64; N_SCORE_DIMS] {
    if sequence.is_empty() {
        return record
            .survey_means
            .map_or([0.0; N_SCORE_DIMS], |m| m.as_array());
    }
    let mut means = [0.0; N_SCORE_DIMS];
    for row in sequence {
        for (dim, &v) in row.iter().enumerate() {
            means[dim] += v;
        }
    }
    for m in &mut means {
        *m /= sequence.len() as f64;
    }
    means
}

/// Explicit fill policy: non-finite scalars become 0 rather than propagating.
fn fill(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::SurveyMeans;

    fn record(id: u64, department: &str) -> EmployeeRecord {
        EmployeeRecord {
            employee_id: id,
            age: 35,
            tenure_months: 48,
            department: department.to_string(),
            level: "Senior".to_string(),
            salary_band: "Mid".to_string(),
            work_location: "Hybrid".to_string(),
            promoted: true,
            salary_increase_pct: 5.0,
            manager_changed: false,
            trainings: 3,
            performance_score: 4.2,
            survey_means: None,
            observations: Vec::new(),
            left: Some(false),
        }
    }

    #[test]
    fn test_encoder_codes_are_order_independent() {
        let a = CategoryEncoder::fit(["Sales", "HR", "Engineering"]);
        let b = CategoryEncoder::fit(["Engineering", "Sales", "HR"]);
        for value in ["Sales", "HR", "Engineering"] {
            assert_eq!(a.encode(value), b.encode(value));
        }
        assert_eq!(a.n_categories(), 3);
    }

    #[test]
    fn test_unseen_category_encodes_as_sentinel() {
        let encoder = CategoryEncoder::fit(["Sales", "HR"]);
        assert_eq!(encoder.encode("Legal"), UNSEEN_CATEGORY_CODE);
    }

    #[test]
    fn test_vector_length_matches_name_list() {
        let records = vec![record(1, "Sales"), record(2, "HR")];
        let assembler = FeatureAssembler::fit(&records, 3);
        let latent = LatentSummary::neutral(3);

        let vector = assembler.assemble(&records[0], &[], &latent);
        assert_eq!(vector.len(), assembler.feature_names().len());
        // 7 numerics + 6 means + state + 4 codes + 3 probs
        assert_eq!(vector.len(), 21);
    }

    #[test]
    fn test_same_shape_for_fit_and_apply_paths() {
        let train = vec![record(1, "Sales"), record(2, "HR")];
        let assembler = FeatureAssembler::fit(&train, 3);

        let unseen = record(3, "Legal");
        let latent = LatentSummary::neutral(3);
        let vector = assembler.assemble(&unseen, &[], &latent);

        assert_eq!(vector.len(), assembler.feature_names().len());
        let dept_idx = assembler
            .feature_names()
            .iter()
            .position(|n| n == "department_code")
            .unwrap();
        assert!((vector[dept_idx] - UNSEEN_CATEGORY_CODE as f64).abs() < 1e-12);
    }

    #[test]
    fn test_history_means_win_over_provided_aggregates() {
        let mut r = record(1, "Sales");
        r.survey_means = Some(SurveyMeans {
            engagement: 1.0,
            ..Default::default()
        });
        let assembler = FeatureAssembler::fit(std::slice::from_ref(&r), 2);
        let latent = LatentSummary::neutral(2);

        let sequence = vec![[4.0; N_SCORE_DIMS], [2.0; N_SCORE_DIMS]];
        let vector = assembler.assemble(&r, &sequence, &latent);
        let eng_idx = assembler
            .feature_names()
            .iter()
            .position(|n| n == "avg_engagement")
            .unwrap();
        assert!((vector[eng_idx] - 3.0).abs() < 1e-12);

        // Without history the provided aggregate is used.
        let vector = assembler.assemble(&r, &[], &latent);
        assert!((vector[eng_idx] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_scalars_fill_with_zero() {
        let mut r = record(1, "Sales");
        r.performance_score = f64::NAN;
        let assembler = FeatureAssembler::fit(std::slice::from_ref(&r), 2);
        let vector = assembler.assemble(&r, &[], &LatentSummary::neutral(2));
        let idx = assembler
            .feature_names()
            .iter()
            .position(|n| n == "performance_score")
            .unwrap();
        assert!((vector[idx]).abs() < 1e-12);
    }

    #[test]
    fn test_short_distribution_pads_with_zero() {
        let r = record(1, "Sales");
        let assembler = FeatureAssembler::fit(std::slice::from_ref(&r), 3);
        let latent = LatentSummary {
            current_state: 1,
            distribution: vec![0.4, 0.6], // one column short
        };
        let vector = assembler.assemble(&r, &[], &latent);
        assert_eq!(vector.len(), assembler.feature_names().len());
        assert!((vector.last().unwrap()).abs() < 1e-12);
    }
}
