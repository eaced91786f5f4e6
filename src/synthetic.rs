//! Seeded synthetic employee corpus for experimentation and smoke tests.
//!
//! Pure sampling, no inference. Attrition risk accumulates from observable
//! factors (short tenure, stalled promotion, flat raises, manager churn, low
//! performance) on top of a base rate, and at-risk employees draw depressed
//! engagement/satisfaction/growth scores, so a trained pipeline has real
//! signal to find. Employees who leave do so in the final three months of
//! the period, truncating their survey history at the month they left.
//!
//! A slice of employees reports scores under alias field names rather than
//! canonical ones, reproducing the field-name drift the sequence builder has
//! to absorb.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use std::collections::BTreeMap;

use crate::dataset::{EmployeeRecord, SurveyMeans, SurveyObservation};

const DEPARTMENTS: [&str; 5] = ["Sales", "Engineering", "HR", "Marketing", "Finance"];
const LEVELS: [&str; 3] = ["Junior", "Mid", "Senior"];
const SALARY_BANDS: [&str; 3] = ["Entry", "Mid", "Upper"];
const LOCATIONS: [&str; 3] = ["Remote", "Hybrid", "Onsite"];

/// Generates a labeled synthetic corpus of `n_employees` entities with up to
/// `n_months` of survey history each.
#[must_use]
pub fn generate_dataset(n_employees: usize, n_months: u32, seed: u64) -> Vec<EmployeeRecord> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n_employees)
        .map(|id| generate_employee(id as u64, n_months, &mut rng))
        .collect()
}

fn generate_employee(id: u64, n_months: u32, rng: &mut ChaCha8Rng) -> EmployeeRecord {
    let age = rng.gen_range(22..65);
    let tenure_months = rng.gen_range(3..240);
    let department = DEPARTMENTS[rng.gen_range(0..DEPARTMENTS.len())];
    let level = LEVELS[rng.gen_range(0..LEVELS.len())];
    let salary_band = SALARY_BANDS[rng.gen_range(0..SALARY_BANDS.len())];
    let work_location = LOCATIONS[rng.gen_range(0..LOCATIONS.len())];

    let promoted = rng.gen_bool(0.1);
    let salary_increase_pct = rng.gen_range(0.0..15.0);
    let manager_changed = rng.gen_bool(0.15);
    let trainings = rng.gen_range(0..5);
    let performance_score = rng.gen_range(2.5..5.0);

    // Risk factors accumulate on the base rate.
    let mut attrition_prob: f64 = 0.15;
    if tenure_months < 6 {
        attrition_prob += 0.1;
    }
    if !promoted && tenure_months > 24 {
        attrition_prob += 0.05;
    }
    if salary_increase_pct < 3.0 {
        attrition_prob += 0.05;
    }
    if manager_changed {
        attrition_prob += 0.08;
    }
    if performance_score < 3.0 {
        attrition_prob += 0.1;
    }
    if work_location == "Onsite" && rng.gen_bool(0.3) {
        attrition_prob += 0.03;
    }
    let attrition_prob = attrition_prob.min(0.8);
    let at_risk = attrition_prob >= 0.3;

    // Score drift: some survey tools emit alias keys instead of canonical.
    let use_aliases = id % 7 == 3;

    let mut observations = Vec::new();
    let mut left = false;
    for month in 1..=n_months {
        let engagement = score(rng, if at_risk { 2.5 } else { 3.5 }, 0.8);
        let satisfaction = score(rng, if at_risk { 2.3 } else { 3.5 }, 0.9);
        let recognition = score(rng, 3.2, 0.9);
        let growth = score(rng, if at_risk { 2.2 } else { 3.0 }, 1.0);
        let manager_rel = score(rng, 3.6, 0.8);
        let work_life = score(rng, 3.3, 1.0);

        let mut scores = BTreeMap::new();
        if use_aliases {
            scores.insert("engagement_score".to_string(), engagement);
            scores.insert("manager_relationship".to_string(), manager_rel);
        } else {
            scores.insert("engagement".to_string(), engagement);
            scores.insert("manager_rel".to_string(), manager_rel);
        }
        scores.insert("satisfaction".to_string(), satisfaction);
        scores.insert("recognition".to_string(), recognition);
        scores.insert("growth".to_string(), growth);
        scores.insert("work_life".to_string(), work_life);
        observations.push(SurveyObservation::new(month, scores));

        // Attrition is decided in the final three months, the per-employee
        // probability spread across them; leaving truncates the remaining
        // history.
        if month + 3 > n_months && rng.gen_bool(attrition_prob / 3.0) {
            left = true;
            break;
        }
    }

    let survey_means = mean_scores(&observations);

    EmployeeRecord {
        employee_id: id,
        age,
        tenure_months,
        department: department.to_string(),
        level: level.to_string(),
        salary_band: salary_band.to_string(),
        work_location: work_location.to_string(),
        promoted,
        salary_increase_pct,
        manager_changed,
        trainings,
        performance_score,
        survey_means: Some(survey_means),
        observations,
        left: Some(left),
    }
}

fn score(rng: &mut ChaCha8Rng, mean: f64, sd: f64) -> f64 {
    let z: f64 = StandardNormal.sample(rng);
    (mean + sd * z).clamp(1.0, 5.0)
}

fn mean_scores(observations: &[SurveyObservation]) -> SurveyMeans {
    let n = observations.len().max(1) as f64;
    let mut sums = [0.0; 6];
    for obs in observations {
        for (dim, keys) in [
            ["engagement", "engagement_score"],
            ["satisfaction", "satisfaction"],
            ["recognition", "recognition"],
            ["growth", "growth"],
            ["manager_rel", "manager_relationship"],
            ["work_life", "work_life"],
        ]
        .iter()
        .enumerate()
        {
            let value = keys.iter().find_map(|k| obs.scores.get(*k)).copied();
            sums[dim] += value.unwrap_or(0.0);
        }
    }
    SurveyMeans {
        engagement: sums[0] / n,
        satisfaction: sums[1] / n,
        recognition: sums[2] / n,
        growth: sums[3] / n,
        manager_rel: sums[4] / n,
        work_life: sums[5] / n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::turnover_rate;

    #[test]
    fn test_generation_is_deterministic() {
        let a = generate_dataset(50, 12, 42);
        let b = generate_dataset(50, 12, 42);
        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
    }

    #[test]
    fn test_turnover_rate_in_expected_band() {
        let records = generate_dataset(500, 12, 42);
        let rate = turnover_rate(&records);
        assert!(
            (0.10..=0.45).contains(&rate),
            "turnover rate {rate} outside expected band"
        );
    }

    #[test]
    fn test_scores_respect_likert_bounds() {
        let records = generate_dataset(100, 12, 7);
        for record in &records {
            for obs in &record.observations {
                for value in obs.scores.values() {
                    assert!((1.0..=5.0).contains(value));
                }
            }
        }
    }

    #[test]
    fn test_leavers_have_truncated_history() {
        let records = generate_dataset(300, 12, 3);
        assert!(records
            .iter()
            .filter(|r| r.left == Some(true))
            .all(|r| r.observations.len() >= 10 && r.observations.len() <= 12));
        // Stayers always have the full period.
        assert!(records
            .iter()
            .filter(|r| r.left == Some(false))
            .all(|r| r.observations.len() == 12));
    }

    #[test]
    fn test_some_records_use_alias_keys() {
        let records = generate_dataset(30, 6, 1);
        let aliased = records.iter().any(|r| {
            r.observations
                .first()
                .is_some_and(|o| o.scores.contains_key("engagement_score"))
        });
        assert!(aliased);
    }
}
