//! Evaluation metrics for the risk classifier.

use serde::{Deserialize, Serialize};

/// Area under the ROC curve via the rank-statistic formulation, with tied
/// scores receiving their average rank.
///
/// Returns 0.5 when either class is absent (no ranking is possible).
#[must_use]
pub fn roc_auc(labels: &[bool], scores: &[f64]) -> f64 {
    debug_assert_eq!(labels.len(), scores.len());

    let n_pos = labels.iter().filter(|&&l| l).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    // Average ranks over tie groups, then sum ranks of the positive class.
    let mut rank_sum_pos = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let average_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            if labels[idx] {
                rank_sum_pos += average_rank;
            }
        }
        i = j + 1;
    }

    let n_pos_f = n_pos as f64;
    (rank_sum_pos - n_pos_f * (n_pos_f + 1.0) / 2.0) / (n_pos_f * n_neg as f64)
}

/// Precision, recall, F1, and support for one class.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClassMetrics {
    /// Fraction of predicted members that belong to the class.
    pub precision: f64,
    /// Fraction of class members that were predicted.
    pub recall: f64,
    /// Harmonic mean of precision and recall.
    pub f1: f64,
    /// Number of true members of the class.
    pub support: usize,
}

/// Per-class metrics at the 0.5 decision threshold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClassificationReport {
    /// Metrics for the negative ("stayed") class.
    pub stayed: ClassMetrics,
    /// Metrics for the positive ("left") class.
    pub left: ClassMetrics,
    /// Overall accuracy.
    pub accuracy: f64,
}

/// Builds the classification report for probability scores against labels.
#[must_use]
pub fn classification_report(labels: &[bool], scores: &[f64]) -> ClassificationReport {
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut tn = 0usize;
    let mut fn_ = 0usize;
    for (&label, &score) in labels.iter().zip(scores) {
        match (label, score >= 0.5) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (false, false) => tn += 1,
            (true, false) => fn_ += 1,
        }
    }

    let total = labels.len().max(1);
    ClassificationReport {
        stayed: class_metrics(tn, fn_, fp, tn + fp),
        left: class_metrics(tp, fp, fn_, tp + fn_),
        accuracy: (tp + tn) as f64 / total as f64,
    }
}

fn class_metrics(
    true_hits: usize,
    false_hits: usize,
    misses: usize,
    support: usize,
) -> ClassMetrics {
    let precision = ratio(true_hits, true_hits + false_hits);
    let recall = ratio(true_hits, true_hits + misses);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    ClassMetrics {
        precision,
        recall,
        f1,
        support,
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
