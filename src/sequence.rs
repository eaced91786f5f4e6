//! Sequence builder: raw observation histories to fixed-width matrices.
//!
//! Upstream survey tools disagree on field names, so each canonical score
//! dimension carries a declared alias list resolved in a fixed preference
//! order: canonical key first, then each alias in declaration order. An
//! observation that resolves under no key for some dimension is malformed.
//!
//! The builder is a pure transformation. Scores are clamped to the [1, 5]
//! Likert range; non-finite values are treated as malformed rather than
//! silently propagated.

use crate::dataset::EmployeeRecord;
use crate::error::{PipelineError, PipelineResult};

/// Number of canonical score dimensions per observation.
pub const N_SCORE_DIMS: usize = 6;

/// Canonical score dimensions with their accepted aliases, in column order.
///
/// The first entry of each alias list is the canonical key. Order is part of
/// the contract: the resulting matrix columns follow this declaration, and
/// alias resolution tries keys left to right.
pub const SCORE_FIELDS: [ScoreField; N_SCORE_DIMS] = [
    ScoreField {
        canonical: "engagement",
        aliases: &["engagement_score", "eng_score"],
    },
    ScoreField {
        canonical: "satisfaction",
        aliases: &["satisfaction_score", "sat_score"],
    },
    ScoreField {
        canonical: "recognition",
        aliases: &["recognition_score"],
    },
    ScoreField {
        canonical: "growth",
        aliases: &["growth_score", "career_growth"],
    },
    ScoreField {
        canonical: "manager_rel",
        aliases: &["manager_relationship", "manager_rel_score"],
    },
    ScoreField {
        canonical: "work_life",
        aliases: &["work_life_balance", "wlb_score"],
    },
];

/// One canonical score dimension and the keys it resolves from.
#[derive(Debug, Clone, Copy)]
pub struct ScoreField {
    /// Canonical field name, tried first.
    pub canonical: &'static str,

    /// Accepted aliases, tried in order after the canonical key.
    pub aliases: &'static [&'static str],
}

/// Pooled observation rows for a collection of entities.
///
/// Rows from one entity are contiguous and never interleaved with another
/// entity's; `lengths` records the per-entity segment sizes in input order.
/// Invariant: `lengths.iter().sum::<usize>() == rows.len()`.
#[derive(Debug, Clone)]
pub struct SequenceCorpus {
    /// All observation vectors, concatenated in entity order.
    pub rows: Vec<[f64; N_SCORE_DIMS]>,

    /// Per-entity sequence lengths, in the order entities were provided.
    pub lengths: Vec<usize>,
}

impl SequenceCorpus {
    /// Total number of observation rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Splits the pooled rows back into per-entity segments.
    #[must_use]
    pub fn segments(&self) -> Vec<&[[f64; N_SCORE_DIMS]]> {
        let mut out = Vec::with_capacity(self.lengths.len());
        let mut start = 0;
        for &len in &self.lengths {
            out.push(&self.rows[start..start + len]);
            start += len;
        }
        out
    }
}

/// Converts one entity's history into a fixed-order numeric sequence.
///
/// Returns one row per observation with columns in [`SCORE_FIELDS`] order,
/// clamped to [1, 5]. An entity with no observations yields an empty
/// sequence (handled downstream as the no-history case).
///
/// # Errors
///
/// Returns [`PipelineError::MalformedObservation`] when a dimension resolves
/// under no declared key, or resolves to a non-finite value.
pub fn build_sequence(record: &EmployeeRecord) -> PipelineResult<Vec<[f64; N_SCORE_DIMS]>> {
    let mut rows = Vec::with_capacity(record.observations.len());
    for obs in &record.observations {
        let mut row = [0.0; N_SCORE_DIMS];
        for (dim, field) in SCORE_FIELDS.iter().enumerate() {
            let value = resolve(&obs.scores, field).ok_or(PipelineError::MalformedObservation {
                employee_id: record.employee_id,
                month: obs.month,
                field: field.canonical,
            })?;
            if !value.is_finite() {
                return Err(PipelineError::MalformedObservation {
                    employee_id: record.employee_id,
                    month: obs.month,
                    field: field.canonical,
                });
            }
            row[dim] = value.clamp(1.0, 5.0);
        }
        rows.push(row);
    }
    Ok(rows)
}

fn resolve(scores: &std::collections::BTreeMap<String, f64>, field: &ScoreField) -> Option<f64> {
    if let Some(&v) = scores.get(field.canonical) {
        return Some(v);
    }
    for alias in field.aliases {
        if let Some(&v) = scores.get(*alias) {
            return Some(v);
        }
    }
    None
}

/// Outcome of building a corpus from a batch of entities.
#[derive(Debug, Clone)]
pub struct CorpusBuild {
    /// Pooled rows and lengths for entities with at least one observation.
    pub corpus: SequenceCorpus,

    /// Indices (into the input slice) of the entities included in `corpus`,
    /// in input order. Zero-observation entities are excluded here and
    /// handled by the orchestrator's cold-start policy.
    pub included: Vec<usize>,

    /// Indices of entities rejected as malformed (empty unless
    /// `abort_on_malformed` is off and some entity failed).
    pub rejected: Vec<usize>,
}

/// Builds the pooled corpus for a collection of entities.
///
/// Entities with zero observations are excluded from the corpus (they have
/// no rows to contribute). Malformed entities are rejected and recorded,
/// unless `abort_on_malformed` is set, in which case the first malformed
/// entity fails the whole call.
///
/// # Errors
///
/// Propagates the first [`PipelineError::MalformedObservation`] when
/// `abort_on_malformed` is `true`.
pub fn build_corpus(
    records: &[EmployeeRecord],
    abort_on_malformed: bool,
) -> PipelineResult<CorpusBuild> {
    let mut rows = Vec::new();
    let mut lengths = Vec::new();
    let mut included = Vec::new();
    let mut rejected = Vec::new();

    for (idx, record) in records.iter().enumerate() {
        if record.observations.is_empty() {
            continue;
        }
        match build_sequence(record) {
            Ok(seq) => {
                lengths.push(seq.len());
                rows.extend(seq);
                included.push(idx);
            }
            Err(err) if !abort_on_malformed => {
                tracing::warn!(employee_id = record.employee_id, %err, "rejecting malformed entity");
                rejected.push(idx);
            }
            Err(err) => return Err(err),
        }
    }

    debug_assert_eq!(lengths.iter().sum::<usize>(), rows.len());

    Ok(CorpusBuild {
        corpus: SequenceCorpus { rows, lengths },
        included,
        rejected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::SurveyObservation;
    use std::collections::BTreeMap;

    fn record_with_scores(id: u64, keyed: &[(&str, f64)]) -> EmployeeRecord {
        let scores: BTreeMap<String, f64> =
            keyed.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        EmployeeRecord {
            employee_id: id,
            age: 30,
            tenure_months: 12,
            department: "Sales".to_string(),
            level: "Junior".to_string(),
            salary_band: "Entry".to_string(),
            work_location: "Onsite".to_string(),
            promoted: false,
            salary_increase_pct: 2.0,
            manager_changed: false,
            trainings: 1,
            performance_score: 3.5,
            survey_means: None,
            observations: vec![SurveyObservation::new(1, scores)],
            left: None,
        }
    }

    fn full_scores() -> Vec<(&'static str, f64)> {
        vec![
            ("engagement", 3.0),
            ("satisfaction", 3.5),
            ("recognition", 2.8),
            ("growth", 3.1),
            ("manager_rel", 4.0),
            ("work_life", 3.3),
        ]
    }

    #[test]
    fn test_canonical_keys_resolve_in_column_order() {
        let record = record_with_scores(1, &full_scores());
        let seq = build_sequence(&record).unwrap();
        assert_eq!(seq.len(), 1);
        assert_eq!(seq[0], [3.0, 3.5, 2.8, 3.1, 4.0, 3.3]);
    }

    #[test]
    fn test_alias_resolution_prefers_canonical() {
        let mut keyed = full_scores();
        keyed.push(("engagement_score", 1.0)); // alias should lose to canonical
        let record = record_with_scores(1, &keyed);
        let seq = build_sequence(&record).unwrap();
        assert!((seq[0][0] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_alias_resolves_when_canonical_absent() {
        let keyed: Vec<(&str, f64)> = vec![
            ("engagement_score", 2.0),
            ("satisfaction", 3.5),
            ("recognition", 2.8),
            ("growth", 3.1),
            ("manager_relationship", 4.0),
            ("work_life_balance", 3.3),
        ];
        let record = record_with_scores(1, &keyed);
        let seq = build_sequence(&record).unwrap();
        assert!((seq[0][0] - 2.0).abs() < 1e-12);
        assert!((seq[0][4] - 4.0).abs() < 1e-12);
        assert!((seq[0][5] - 3.3).abs() < 1e-12);
    }

    #[test]
    fn test_unresolvable_field_is_malformed() {
        let keyed: Vec<(&str, f64)> = full_scores()
            .into_iter()
            .filter(|(k, _)| *k != "growth")
            .collect();
        let record = record_with_scores(9, &keyed);
        let err = build_sequence(&record).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MalformedObservation {
                employee_id: 9,
                field: "growth",
                ..
            }
        ));
    }

    #[test]
    fn test_scores_clamped_to_likert_range() {
        let mut keyed = full_scores();
        keyed[0].1 = 9.0;
        keyed[1].1 = -2.0;
        let record = record_with_scores(1, &keyed);
        let seq = build_sequence(&record).unwrap();
        assert!((seq[0][0] - 5.0).abs() < 1e-12);
        assert!((seq[0][1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_nan_score_is_malformed() {
        let mut keyed = full_scores();
        keyed[2].1 = f64::NAN;
        let record = record_with_scores(1, &keyed);
        assert!(build_sequence(&record).is_err());
    }

    #[test]
    fn test_corpus_length_invariant() {
        let mut a = record_with_scores(1, &full_scores());
        a.observations.push(a.observations[0].clone());
        a.observations.push(a.observations[0].clone());
        let b = record_with_scores(2, &full_scores());
        let mut empty = record_with_scores(3, &full_scores());
        empty.observations.clear();

        let build = build_corpus(&[a, b, empty], true).unwrap();
        assert_eq!(build.corpus.lengths, vec![3, 1]);
        assert_eq!(
            build.corpus.lengths.iter().sum::<usize>(),
            build.corpus.n_rows()
        );
        assert_eq!(build.included, vec![0, 1]);
    }

    #[test]
    fn test_malformed_entity_skipped_not_fatal() {
        let good = record_with_scores(1, &full_scores());
        let bad = record_with_scores(2, &full_scores()[..3].to_vec());

        let build = build_corpus(&[good.clone(), bad.clone()], false).unwrap();
        assert_eq!(build.included, vec![0]);
        assert_eq!(build.rejected, vec![1]);

        // Abort-on-first-error configuration fails the batch instead.
        assert!(build_corpus(&[good, bad], true).is_err());
    }

    #[test]
    fn test_segments_respect_entity_boundaries() {
        let mut a = record_with_scores(1, &full_scores());
        a.observations.push(a.observations[0].clone());
        let b = record_with_scores(2, &full_scores());

        let build = build_corpus(&[a, b], true).unwrap();
        let segments = build.corpus.segments();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].len(), 2);
        assert_eq!(segments[1].len(), 1);
    }
}
