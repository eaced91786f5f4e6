//! Attrition risk classifier: a random forest over the assembled features.
//!
//! The forest is built from CART trees using Gini impurity with balanced
//! class weights, so the minority "left" class is not drowned out by the
//! majority. Each tree trains on a bootstrap sample with sqrt-feature
//! subsampling at every split; per-tree seeds derive from the run seed, so
//! training is deterministic end to end.
//!
//! Evaluation follows the reference protocol: a stratified holdout split,
//! stratified k-fold cross-validation on the train partition for an
//! unbiased AUC estimate, then a final fit and holdout evaluation.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::{PipelineConfig, TierBoundaries};
use crate::error::{PipelineError, PipelineResult};
use crate::metrics::{classification_report, roc_auc, ClassificationReport};

/// Discrete risk bucket derived from the attrition probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTier {
    /// Probability in `[0, medium)`.
    Low,
    /// Probability in `[medium, high)`.
    Medium,
    /// Probability in `[high, 1]`.
    High,
}

impl RiskTier {
    /// Maps a probability to its tier. Boundaries are inclusive at the lower
    /// edge of the upper tier: exactly `medium` is Medium, exactly `high` is
    /// High.
    #[must_use]
    pub fn from_probability(probability: f64, boundaries: &TierBoundaries) -> Self {
        if probability >= boundaries.high {
            RiskTier::High
        } else if probability >= boundaries.medium {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }

    /// Human-readable tier name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
        }
    }
}

/// One node of a fitted decision tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        probability: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, features: &[f64]) -> f64 {
        match self {
            Node::Leaf { probability } => *probability,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if features[*feature] <= *threshold {
                    left.predict(features)
                } else {
                    right.predict(features)
                }
            }
        }
    }
}

/// A fitted forest plus its accumulated feature importances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<Node>,
    importances: Vec<f64>,
    n_features: usize,
}

impl RandomForest {
    /// Fits the forest on the given rows and labels.
    ///
    /// `x` is row-major: one feature vector per entity. Balanced class
    /// weights are computed from `y` so each class contributes equal total
    /// weight to the impurity criterion.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DegenerateLabels`] when `y` holds a single
    /// class.
    pub fn fit(x: &[Vec<f64>], y: &[bool], config: &PipelineConfig) -> PipelineResult<Self> {
        check_both_classes(y)?;
        let n = x.len();
        let n_features = x[0].len();

        // class_weight="balanced": n / (2 * class_count)
        let n_pos = y.iter().filter(|&&l| l).count();
        let w_pos = n as f64 / (2.0 * n_pos as f64);
        let w_neg = n as f64 / (2.0 * (n - n_pos) as f64);
        let weights: Vec<f64> = y.iter().map(|&l| if l { w_pos } else { w_neg }).collect();

        let params = TreeParams {
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            min_samples_leaf: config.min_samples_leaf,
            n_subsample_features: (n_features as f64).sqrt().ceil() as usize,
        };

        let mut trees = Vec::with_capacity(config.n_trees);
        let mut importances = vec![0.0; n_features];
        for tree_index in 0..config.n_trees {
            let mut rng = ChaCha8Rng::seed_from_u64(derive_seed(config.seed, tree_index as u64));
            let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let total_weight: f64 = sample.iter().map(|&i| weights[i]).sum();
            let tree = build_tree(
                x,
                y,
                &weights,
                sample,
                0,
                &params,
                &mut rng,
                &mut importances,
                total_weight,
            );
            trees.push(tree);
        }

        // Normalize importances across the forest.
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }

        Ok(Self {
            trees,
            importances,
            n_features,
        })
    }

    /// Attrition probability for one feature vector, averaged over trees.
    #[must_use]
    pub fn predict_proba(&self, features: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.predict(features)).sum();
        total / self.trees.len() as f64
    }

    /// Probabilities for a batch of rows, preserving order.
    #[must_use]
    pub fn predict_proba_batch(&self, x: &[Vec<f64>]) -> Vec<f64> {
        x.iter().map(|row| self.predict_proba(row)).collect()
    }

    /// Normalized mean-impurity-decrease importance per feature column.
    #[must_use]
    pub fn importances(&self) -> &[f64] {
        &self.importances
    }

    /// Number of feature columns the forest was fitted on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

/// Evaluation produced while training the classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierEvaluation {
    /// Mean cross-validated AUC on the train partition.
    pub cv_auc_mean: f64,
    /// Standard deviation of the per-fold AUCs.
    pub cv_auc_std: f64,
    /// Folds actually used (capped at the minority-class count).
    pub cv_folds_used: usize,
    /// AUC on the held-out test partition.
    pub holdout_auc: f64,
    /// Per-class precision/recall/F1 on the holdout at threshold 0.5.
    pub report: ClassificationReport,
}

/// Trains the forest with the full evaluation protocol: stratified holdout
/// split, stratified k-fold CV on the train partition, final fit, holdout
/// scoring.
///
/// # Errors
///
/// Returns [`PipelineError::DegenerateLabels`] before any model work when
/// `y` holds a single class.
pub fn train_classifier(
    x: &[Vec<f64>],
    y: &[bool],
    config: &PipelineConfig,
) -> PipelineResult<(RandomForest, ClassifierEvaluation)> {
    check_both_classes(y)?;

    let (train_idx, test_idx) = stratified_split(y, config.test_fraction, config.seed);
    let train_x: Vec<Vec<f64>> = train_idx.iter().map(|&i| x[i].clone()).collect();
    let train_y: Vec<bool> = train_idx.iter().map(|&i| y[i]).collect();

    // Cross-validate on the train partition only; the holdout stays unseen.
    let minority = train_y
        .iter()
        .filter(|&&l| l)
        .count()
        .min(train_y.iter().filter(|&&l| !l).count());
    let folds_used = config.cv_folds.min(minority).max(2);
    let folds = stratified_folds(&train_y, folds_used, config.seed);

    let mut fold_aucs = Vec::with_capacity(folds_used);
    for (fold_index, fold) in folds.iter().enumerate() {
        let in_fold: std::collections::HashSet<usize> = fold.iter().copied().collect();
        let fit_x: Vec<Vec<f64>> = (0..train_x.len())
            .filter(|i| !in_fold.contains(i))
            .map(|i| train_x[i].clone())
            .collect();
        let fit_y: Vec<bool> = (0..train_y.len())
            .filter(|i| !in_fold.contains(i))
            .map(|i| train_y[i])
            .collect();

        // A fold can strip a very small minority class from its training
        // part; such folds are unscoreable and skipped.
        if fit_y.iter().all(|&l| l) || fit_y.iter().all(|&l| !l) {
            tracing::warn!(fold = fold_index, "skipping single-class fold");
            continue;
        }

        let fold_config = PipelineConfig {
            seed: derive_seed(config.seed, 0xCF00 + fold_index as u64),
            ..config.clone()
        };
        let forest = RandomForest::fit(&fit_x, &fit_y, &fold_config)?;

        let eval_y: Vec<bool> = fold.iter().map(|&i| train_y[i]).collect();
        let eval_scores: Vec<f64> = fold.iter().map(|&i| forest.predict_proba(&train_x[i])).collect();
        let auc = roc_auc(&eval_y, &eval_scores);
        tracing::debug!(fold = fold_index, auc, "cross-validation fold scored");
        fold_aucs.push(auc);
    }

    let (cv_auc_mean, cv_auc_std) = if fold_aucs.is_empty() {
        (0.5, 0.0)
    } else {
        let mean = fold_aucs.iter().sum::<f64>() / fold_aucs.len() as f64;
        let std = (fold_aucs
            .iter()
            .map(|a| (a - mean).powi(2))
            .sum::<f64>()
            / fold_aucs.len() as f64)
            .sqrt();
        (mean, std)
    };

    let forest = RandomForest::fit(&train_x, &train_y, config)?;

    let test_y: Vec<bool> = test_idx.iter().map(|&i| y[i]).collect();
    let test_scores: Vec<f64> = test_idx.iter().map(|&i| forest.predict_proba(&x[i])).collect();
    let holdout_auc = roc_auc(&test_y, &test_scores);
    let report = classification_report(&test_y, &test_scores);

    tracing::info!(
        cv_auc_mean,
        cv_auc_std,
        holdout_auc,
        n_train = train_idx.len(),
        n_test = test_idx.len(),
        "risk classifier trained"
    );

    Ok((
        forest,
        ClassifierEvaluation {
            cv_auc_mean,
            cv_auc_std,
            cv_folds_used: folds_used,
            holdout_auc,
            report,
        },
    ))
}

fn check_both_classes(y: &[bool]) -> PipelineResult<()> {
    let n_pos = y.iter().filter(|&&l| l).count();
    if n_pos == 0 || n_pos == y.len() {
        return Err(PipelineError::DegenerateLabels {
            n_entities: y.len(),
            class: u8::from(n_pos > 0),
        });
    }
    Ok(())
}

/// Splits indices into train/test partitions, preserving class proportions.
/// Every class with at least two entities contributes at least one test
/// entity; a singleton class stays in the train partition.
#[must_use]
pub fn stratified_split(y: &[bool], test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut rng = ChaCha8Rng::seed_from_u64(derive_seed(seed, 0x5B17));
    let mut train = Vec::new();
    let mut test = Vec::new();

    for class in [false, true] {
        let mut class_idx: Vec<usize> = (0..y.len()).filter(|&i| y[i] == class).collect();
        shuffle(&mut class_idx, &mut rng);
        let n_test = if class_idx.len() < 2 {
            0
        } else {
            ((class_idx.len() as f64 * test_fraction).round() as usize)
                .clamp(1, class_idx.len() - 1)
        };
        test.extend_from_slice(&class_idx[..n_test]);
        train.extend_from_slice(&class_idx[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

/// Assigns indices into `k` folds, each preserving class proportions.
fn stratified_folds(y: &[bool], k: usize, seed: u64) -> Vec<Vec<usize>> {
    let mut rng = ChaCha8Rng::seed_from_u64(derive_seed(seed, 0xF01D));
    let mut folds = vec![Vec::new(); k];

    for class in [false, true] {
        let mut class_idx: Vec<usize> = (0..y.len()).filter(|&i| y[i] == class).collect();
        shuffle(&mut class_idx, &mut rng);
        for (position, idx) in class_idx.into_iter().enumerate() {
            folds[position % k].push(idx);
        }
    }
    folds
}

struct TreeParams {
    max_depth: usize,
    min_samples_split: usize,
    min_samples_leaf: usize,
    n_subsample_features: usize,
}

#[allow(clippy::too_many_arguments)]
fn build_tree(
    x: &[Vec<f64>],
    y: &[bool],
    weights: &[f64],
    indices: Vec<usize>,
    depth: usize,
    params: &TreeParams,
    rng: &mut ChaCha8Rng,
    importances: &mut [f64],
    total_weight: f64,
) -> Node {
    let node_weight: f64 = indices.iter().map(|&i| weights[i]).sum();
    let pos_weight: f64 = indices.iter().filter(|&&i| y[i]).map(|&i| weights[i]).sum();
    let probability = pos_weight / node_weight;

    let pure = probability <= f64::EPSILON || probability >= 1.0 - f64::EPSILON;
    if pure || depth >= params.max_depth || indices.len() < params.min_samples_split {
        return Node::Leaf { probability };
    }

    let node_gini = gini(pos_weight, node_weight);
    let Some(split) = best_split(x, y, weights, &indices, params, rng, node_gini) else {
        return Node::Leaf { probability };
    };

    importances[split.feature] += (node_weight / total_weight) * split.decrease;

    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
        .into_iter()
        .partition(|&i| x[i][split.feature] <= split.threshold);

    let left = build_tree(
        x,
        y,
        weights,
        left_idx,
        depth + 1,
        params,
        rng,
        importances,
        total_weight,
    );
    let right = build_tree(
        x,
        y,
        weights,
        right_idx,
        depth + 1,
        params,
        rng,
        importances,
        total_weight,
    );

    Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left: Box::new(left),
        right: Box::new(right),
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    decrease: f64,
}

fn best_split(
    x: &[Vec<f64>],
    y: &[bool],
    weights: &[f64],
    indices: &[usize],
    params: &TreeParams,
    rng: &mut ChaCha8Rng,
    node_gini: f64,
) -> Option<SplitCandidate> {
    let n_features = x[0].len();
    let candidates = sample_features(n_features, params.n_subsample_features, rng);

    let node_weight: f64 = indices.iter().map(|&i| weights[i]).sum();
    let node_pos: f64 = indices.iter().filter(|&&i| y[i]).map(|&i| weights[i]).sum();

    let mut best: Option<SplitCandidate> = None;
    let mut sorted = indices.to_vec();

    for feature in candidates {
        sorted.sort_unstable_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let mut left_weight = 0.0;
        let mut left_pos = 0.0;
        for position in 1..sorted.len() {
            let prev = sorted[position - 1];
            left_weight += weights[prev];
            if y[prev] {
                left_pos += weights[prev];
            }

            let prev_value = x[prev][feature];
            let value = x[sorted[position]][feature];
            if value <= prev_value {
                continue; // no boundary between equal values
            }
            if position < params.min_samples_leaf
                || sorted.len() - position < params.min_samples_leaf
            {
                continue;
            }

            let right_weight = node_weight - left_weight;
            let right_pos = node_pos - left_pos;
            let weighted = (left_weight * gini(left_pos, left_weight)
                + right_weight * gini(right_pos, right_weight))
                / node_weight;
            let decrease = node_gini - weighted;

            if decrease > 1e-12
                && best.as_ref().map_or(true, |b| decrease > b.decrease)
            {
                best = Some(SplitCandidate {
                    feature,
                    threshold: (prev_value + value) / 2.0,
                    decrease,
                });
            }
        }
    }
    best
}

fn gini(pos_weight: f64, total_weight: f64) -> f64 {
    if total_weight <= 0.0 {
        return 0.0;
    }
    let p = pos_weight / total_weight;
    2.0 * p * (1.0 - p)
}

/// Samples `amount` distinct feature indices via a seeded partial shuffle.
fn sample_features(n_features: usize, amount: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
    let amount = amount.min(n_features);
    let mut all: Vec<usize> = (0..n_features).collect();
    for i in 0..amount {
        let j = rng.gen_range(i..n_features);
        all.swap(i, j);
    }
    all.truncate(amount);
    all
}

fn shuffle(indices: &mut [usize], rng: &mut ChaCha8Rng) {
    for i in (1..indices.len()).rev() {
        let j = rng.gen_range(0..=i);
        indices.swap(i, j);
    }
}

/// Mixes a stream index into the base seed so each tree, fold, and split
/// draws from an independent deterministic stream.
fn derive_seed(seed: u64, stream: u64) -> u64 {
    seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}
