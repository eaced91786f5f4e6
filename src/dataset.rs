//! Employee records and survey observations.
//!
//! The pipeline consumes materialized per-employee histories: static
//! demographic and contract attributes plus an ordered list of monthly
//! survey snapshots. Survey scores arrive under loosely-controlled keys
//! (upstream systems disagree on field names), so each observation keeps its
//! scores as a raw key/value map and the sequence builder resolves canonical
//! dimensions through a declared alias table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One monthly survey snapshot.
///
/// Scores are Likert-scale values semantically bounded to [1, 5]; keys are
/// whatever the upstream survey tool emitted. Resolution to the six
/// canonical dimensions happens in [`crate::sequence`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyObservation {
    /// One-based month index within the survey period.
    pub month: u32,

    /// Raw score fields, keyed by upstream field name.
    #[serde(flatten)]
    pub scores: BTreeMap<String, f64>,
}

impl SurveyObservation {
    /// Creates an observation from canonical-keyed scores.
    #[must_use]
    pub fn new(month: u32, scores: BTreeMap<String, f64>) -> Self {
        Self { month, scores }
    }
}

/// Precomputed survey-score means, supplied for entities whose raw history
/// is unavailable (e.g. scoring payloads that only carry aggregates).
///
/// When an entity has observations, means computed from the history take
/// precedence over these fields.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SurveyMeans {
    /// Mean engagement score.
    pub engagement: f64,
    /// Mean satisfaction score.
    pub satisfaction: f64,
    /// Mean recognition score.
    pub recognition: f64,
    /// Mean growth score.
    pub growth: f64,
    /// Mean manager-relationship score.
    pub manager_rel: f64,
    /// Mean work-life-balance score.
    pub work_life: f64,
}

impl SurveyMeans {
    /// Returns the means in canonical dimension order.
    #[must_use]
    pub fn as_array(&self) -> [f64; 6] {
        [
            self.engagement,
            self.satisfaction,
            self.recognition,
            self.growth,
            self.manager_rel,
            self.work_life,
        ]
    }
}

/// One employee: static attributes plus an ordered observation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeRecord {
    /// Stable entity identifier.
    pub employee_id: u64,

    /// Age in years.
    pub age: u32,

    /// Tenure in months.
    pub tenure_months: u32,

    /// Department name.
    pub department: String,

    /// Seniority level.
    pub level: String,

    /// Salary band.
    pub salary_band: String,

    /// Work location arrangement.
    pub work_location: String,

    /// Whether the employee was promoted during the period.
    pub promoted: bool,

    /// Most recent salary increase, in percent.
    pub salary_increase_pct: f64,

    /// Whether the employee's manager changed during the period.
    pub manager_changed: bool,

    /// Number of trainings completed.
    pub trainings: u32,

    /// Latest performance review score.
    pub performance_score: f64,

    /// Aggregate survey means for entities without raw history.
    #[serde(default)]
    pub survey_means: Option<SurveyMeans>,

    /// Ordered monthly survey history; may be empty.
    #[serde(default)]
    pub observations: Vec<SurveyObservation>,

    /// Attrition outcome: `Some(true)` if the employee left. Required for
    /// training, ignored at inference.
    #[serde(default)]
    pub left: Option<bool>,
}

impl EmployeeRecord {
    /// Whether this entity carries any survey history.
    #[must_use]
    pub fn has_history(&self) -> bool {
        !self.observations.is_empty()
    }
}

/// Fraction of labeled entities marked as having left.
///
/// Unlabeled entities are ignored; returns 0 for an all-unlabeled slice.
#[must_use]
pub fn turnover_rate(records: &[EmployeeRecord]) -> f64 {
    let labeled: Vec<bool> = records.iter().filter_map(|r| r.left).collect();
    if labeled.is_empty() {
        return 0.0;
    }
    labeled.iter().filter(|&&l| l).count() as f64 / labeled.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, left: Option<bool>) -> EmployeeRecord {
        EmployeeRecord {
            employee_id: id,
            age: 30,
            tenure_months: 24,
            department: "Engineering".to_string(),
            level: "Senior".to_string(),
            salary_band: "Mid".to_string(),
            work_location: "Remote".to_string(),
            promoted: false,
            salary_increase_pct: 3.0,
            manager_changed: false,
            trainings: 2,
            performance_score: 4.0,
            survey_means: None,
            observations: Vec::new(),
            left,
        }
    }

    #[test]
    fn test_turnover_rate_ignores_unlabeled() {
        let records = vec![
            record(0, Some(true)),
            record(1, Some(false)),
            record(2, None),
            record(3, Some(false)),
        ];
        let rate = turnover_rate(&records);
        assert!((rate - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_observation_scores_roundtrip_flattened() {
        let mut scores = BTreeMap::new();
        scores.insert("engagement".to_string(), 3.5);
        scores.insert("satisfaction".to_string(), 4.0);
        let obs = SurveyObservation::new(1, scores);

        let json = serde_json::to_string(&obs).unwrap();
        assert!(json.contains("\"engagement\":3.5"));

        let parsed: SurveyObservation = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.month, 1);
        assert_eq!(parsed.scores.get("satisfaction"), Some(&4.0));
    }
}
