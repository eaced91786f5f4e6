//! Latent behavioral state model over survey sequences.
//!
//! An unsupervised K-state sequence model with full-covariance Gaussian
//! emissions, trained by expectation-maximization over the pooled corpus.
//! The forward-backward recursions are segmented by the per-entity length
//! list, so responsibility mass never flows across entity boundaries: the
//! model is trained jointly across all employees without leaking one
//! employee's history into another's.
//!
//! # Determinism
//!
//! The seed controls state initialization only (which observation rows seed
//! the state means); EM itself is deterministic given an initialization, so
//! two fits with the same seed and corpus produce identical parameters.
//!
//! # Numerical notes
//!
//! Emission densities are evaluated in log space and shifted per time step
//! before the scaled forward-backward pass, which keeps the recursion stable
//! for arbitrarily unlikely observations. Covariances are regularized on the
//! diagonal after every M-step and Cholesky factorization retries with
//! escalating jitter before giving up.

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::sequence::{SequenceCorpus, N_SCORE_DIMS};

const LN_2PI: f64 = 1.837_877_066_409_345_3;

/// Probability floor applied to initial and transition mass so no state or
/// transition is ever assigned exactly zero probability.
const PROB_FLOOR: f64 = 1e-10;

/// Responsibility mass below which a state is considered starved and keeps
/// its previous parameters for the iteration.
const STARVED_STATE_MASS: f64 = 1e-8;

/// A fitted K-state Gaussian sequence model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianStateModel {
    n_states: usize,
    /// Initial state distribution.
    initial: Vec<f64>,
    /// Row-stochastic transition matrix, `transition[from][to]`.
    transition: Vec<Vec<f64>>,
    /// Per-state emission means.
    means: Vec<DVector<f64>>,
    /// Per-state full emission covariances.
    covariances: Vec<DMatrix<f64>>,
    /// Diagonal regularization used during fitting and factorization.
    covariance_reg: f64,
    /// Total corpus log-likelihood at the final EM iteration.
    log_likelihood: f64,
    /// EM iterations actually run.
    iterations_run: usize,
}

/// Per-state Cholesky factors, rebuilt from the covariances on demand.
struct Emissions {
    factors: Vec<Cholesky<f64, Dyn>>,
    log_dets: Vec<f64>,
}

/// Sufficient statistics accumulated across all segments in one E-step.
struct SufficientStats {
    gamma_sum: Vec<f64>,
    gamma_obs: Vec<DVector<f64>>,
    gamma_obs_sq: Vec<DMatrix<f64>>,
    xi_sum: Vec<Vec<f64>>,
    xi_denom: Vec<f64>,
    init_sum: Vec<f64>,
    n_segments: usize,
}

impl SufficientStats {
    fn zeros(k: usize, d: usize) -> Self {
        Self {
            gamma_sum: vec![0.0; k],
            gamma_obs: vec![DVector::zeros(d); k],
            gamma_obs_sq: vec![DMatrix::zeros(d, d); k],
            xi_sum: vec![vec![0.0; k]; k],
            xi_denom: vec![0.0; k],
            init_sum: vec![0.0; k],
            n_segments: 0,
        }
    }
}

impl GaussianStateModel {
    /// Fits the model to a pooled, length-segmented corpus.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ModelFitError`] when the corpus holds fewer
    /// rows than states, when a score dimension has zero variance, or when a
    /// state covariance cannot be kept positive definite.
    pub fn fit(corpus: &SequenceCorpus, config: &PipelineConfig) -> PipelineResult<Self> {
        let k = config.n_states;
        let d = N_SCORE_DIMS;
        let n = corpus.n_rows();

        if n < k {
            return Err(PipelineError::ModelFitError {
                detail: format!("{n} observations cannot support {k} states"),
            });
        }
        if corpus.lengths.contains(&0) {
            return Err(PipelineError::ModelFitError {
                detail: "corpus contains a zero-length segment".to_string(),
            });
        }
        check_dimension_variance(corpus)?;

        let mut model = Self::initialize(corpus, config);
        let mut previous_ll = f64::NEG_INFINITY;
        let mut iterations_run = 0;

        for iter in 0..config.em_iterations {
            let (ll, stats) = model.e_step(corpus)?;
            iterations_run = iter + 1;
            model.log_likelihood = ll;

            if iter > 0 && (ll - previous_ll).abs() < config.em_tolerance {
                tracing::debug!(iteration = iter, log_likelihood = ll, "EM converged");
                break;
            }
            previous_ll = ll;

            model.m_step(&stats, d, config.covariance_reg);
        }

        model.iterations_run = iterations_run;
        tracing::info!(
            states = k,
            rows = n,
            iterations = iterations_run,
            log_likelihood = model.log_likelihood,
            "latent state model fitted"
        );
        Ok(model)
    }

    /// Seeded initialization: a randomly chosen observation row seeds the
    /// first state mean and each further mean is the row farthest from the
    /// means chosen so far (ties broken by index, so the procedure is
    /// deterministic given the seed). Every state starts from the pooled
    /// corpus covariance; initial and transition mass start uniform.
    fn initialize(corpus: &SequenceCorpus, config: &PipelineConfig) -> Self {
        let k = config.n_states;
        let d = N_SCORE_DIMS;
        let n = corpus.n_rows();

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let mut chosen: Vec<usize> = vec![rng.gen_range(0..n)];
        while chosen.len() < k {
            let mut best_idx = 0;
            let mut best_dist = -1.0;
            for (i, row) in corpus.rows.iter().enumerate() {
                let nearest = chosen
                    .iter()
                    .map(|&c| squared_distance(row, &corpus.rows[c]))
                    .fold(f64::INFINITY, f64::min);
                if nearest > best_dist {
                    best_dist = nearest;
                    best_idx = i;
                }
            }
            chosen.push(best_idx);
        }

        let means: Vec<DVector<f64>> = chosen
            .iter()
            .map(|&i| DVector::from_row_slice(&corpus.rows[i]))
            .collect();

        let pooled = pooled_covariance(corpus, config.covariance_reg);
        let covariances = vec![pooled; k];

        let uniform = 1.0 / k as f64;
        Self {
            n_states: k,
            initial: vec![uniform; k],
            transition: vec![vec![uniform; k]; k],
            means,
            covariances,
            covariance_reg: config.covariance_reg,
            log_likelihood: f64::NEG_INFINITY,
            iterations_run: 0,
        }
    }

    /// One expectation step: scaled forward-backward per segment,
    /// accumulating sufficient statistics. Returns the corpus
    /// log-likelihood under the current parameters.
    fn e_step(&self, corpus: &SequenceCorpus) -> PipelineResult<(f64, SufficientStats)> {
        let k = self.n_states;
        let d = N_SCORE_DIMS;
        let emissions = self.emissions()?;

        let mut stats = SufficientStats::zeros(k, d);
        let mut total_ll = 0.0;

        let mut start = 0;
        for &len in &corpus.lengths {
            let segment = &corpus.rows[start..start + len];
            start += len;
            stats.n_segments += 1;

            // Per-step log emissions, shifted so the largest entry is 0
            // before exponentiation.
            let log_b: Vec<Vec<f64>> = segment
                .iter()
                .map(|row| self.log_emission_row(&emissions, row))
                .collect();
            let shifts: Vec<f64> = log_b
                .iter()
                .map(|lb| lb.iter().cloned().fold(f64::NEG_INFINITY, f64::max))
                .collect();
            let e: Vec<Vec<f64>> = log_b
                .iter()
                .zip(&shifts)
                .map(|(lb, &m)| lb.iter().map(|&v| (v - m).exp()).collect())
                .collect();

            // Scaled forward pass.
            let t_len = segment.len();
            let mut alpha = vec![vec![0.0; k]; t_len];
            let mut scale = vec![0.0; t_len];

            for s in 0..k {
                alpha[0][s] = self.initial[s] * e[0][s];
            }
            scale[0] = normalize_in_place(&mut alpha[0]);

            for t in 1..t_len {
                for s in 0..k {
                    let mut mass = 0.0;
                    for j in 0..k {
                        mass += alpha[t - 1][j] * self.transition[j][s];
                    }
                    alpha[t][s] = mass * e[t][s];
                }
                scale[t] = normalize_in_place(&mut alpha[t]);
            }

            total_ll += scale.iter().map(|&c| c.ln()).sum::<f64>()
                + shifts.iter().sum::<f64>();

            // Scaled backward pass, sharing the forward scaling factors.
            let mut beta = vec![vec![1.0; k]; t_len];
            for t in (0..t_len - 1).rev() {
                for j in 0..k {
                    let mut mass = 0.0;
                    for s in 0..k {
                        mass += self.transition[j][s] * e[t + 1][s] * beta[t + 1][s];
                    }
                    beta[t][j] = mass / scale[t + 1];
                }
            }

            // Accumulate responsibilities and transition counts.
            for t in 0..t_len {
                let mut gamma: Vec<f64> = (0..k).map(|s| alpha[t][s] * beta[t][s]).collect();
                normalize_in_place(&mut gamma);

                if t == 0 {
                    for s in 0..k {
                        stats.init_sum[s] += gamma[s];
                    }
                }

                let x = DVector::from_row_slice(&segment[t]);
                for s in 0..k {
                    let g = gamma[s];
                    stats.gamma_sum[s] += g;
                    stats.gamma_obs[s].axpy(g, &x, 1.0);
                    stats.gamma_obs_sq[s].ger(g, &x, &x, 1.0);
                    if t + 1 < t_len {
                        stats.xi_denom[s] += g;
                    }
                }

                if t + 1 < t_len {
                    for j in 0..k {
                        for s in 0..k {
                            stats.xi_sum[j][s] += alpha[t][j]
                                * self.transition[j][s]
                                * e[t + 1][s]
                                * beta[t + 1][s]
                                / scale[t + 1];
                        }
                    }
                }
            }
        }

        Ok((total_ll, stats))
    }

    /// One maximization step: re-estimate initial, transition, mean, and
    /// covariance parameters from the accumulated statistics.
    fn m_step(&mut self, stats: &SufficientStats, d: usize, reg: f64) {
        let k = self.n_states;

        for s in 0..k {
            self.initial[s] = (stats.init_sum[s] / stats.n_segments as f64).max(PROB_FLOOR);
        }
        let init_total: f64 = self.initial.iter().sum();
        for p in &mut self.initial {
            *p /= init_total;
        }

        for j in 0..k {
            if stats.xi_denom[j] > 0.0 {
                for s in 0..k {
                    self.transition[j][s] =
                        (stats.xi_sum[j][s] / stats.xi_denom[j]).max(PROB_FLOOR);
                }
            } else {
                // State never observed before a transition; keep it open.
                for s in 0..k {
                    self.transition[j][s] = 1.0 / k as f64;
                }
            }
            let row_total: f64 = self.transition[j].iter().sum();
            for s in 0..k {
                self.transition[j][s] /= row_total;
            }
        }

        for s in 0..k {
            let mass = stats.gamma_sum[s];
            if mass < STARVED_STATE_MASS {
                continue;
            }
            let mean = &stats.gamma_obs[s] / mass;
            let mut cov = &stats.gamma_obs_sq[s] / mass - &mean * mean.transpose();
            // Symmetrize against accumulated rounding, then regularize.
            cov = (cov.clone() + cov.transpose()) * 0.5;
            for i in 0..d {
                cov[(i, i)] += reg;
            }
            self.means[s] = mean;
            self.covariances[s] = cov;
        }
    }

    /// Most likely state path per entity (Viterbi over the pooled corpus,
    /// split back into per-entity segments).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ModelFitError`] if the covariances cannot be
    /// factored (only possible with a hand-edited artifact).
    pub fn decode(&self, corpus: &SequenceCorpus) -> PipelineResult<Vec<Vec<usize>>> {
        let emissions = self.emissions()?;
        let mut paths = Vec::with_capacity(corpus.lengths.len());
        let mut start = 0;
        for &len in &corpus.lengths {
            let segment = &corpus.rows[start..start + len];
            start += len;
            paths.push(self.viterbi(&emissions, segment));
        }
        Ok(paths)
    }

    /// Most likely state path for a single entity's sequence.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptySequence`] for a zero-length sequence.
    pub fn decode_sequence(
        &self,
        employee_id: u64,
        sequence: &[[f64; N_SCORE_DIMS]],
    ) -> PipelineResult<Vec<usize>> {
        if sequence.is_empty() {
            return Err(PipelineError::EmptySequence { employee_id });
        }
        let emissions = self.emissions()?;
        Ok(self.viterbi(&emissions, sequence))
    }

    fn viterbi(&self, emissions: &Emissions, segment: &[[f64; N_SCORE_DIMS]]) -> Vec<usize> {
        let k = self.n_states;
        let t_len = segment.len();
        if t_len == 0 {
            return Vec::new();
        }

        let log_init: Vec<f64> = self.initial.iter().map(|&p| p.max(PROB_FLOOR).ln()).collect();
        let log_trans: Vec<Vec<f64>> = self
            .transition
            .iter()
            .map(|row| row.iter().map(|&p| p.max(PROB_FLOOR).ln()).collect())
            .collect();

        let mut delta: Vec<Vec<f64>> = vec![vec![0.0; k]; t_len];
        let mut backpointer: Vec<Vec<usize>> = vec![vec![0; k]; t_len];

        let first = self.log_emission_row(emissions, &segment[0]);
        for s in 0..k {
            delta[0][s] = log_init[s] + first[s];
        }

        for t in 1..t_len {
            let log_b = self.log_emission_row(emissions, &segment[t]);
            for s in 0..k {
                let mut best_j = 0;
                let mut best = f64::NEG_INFINITY;
                for j in 0..k {
                    let score = delta[t - 1][j] + log_trans[j][s];
                    if score > best {
                        best = score;
                        best_j = j;
                    }
                }
                delta[t][s] = best + log_b[s];
                backpointer[t][s] = best_j;
            }
        }

        let mut path = vec![0; t_len];
        path[t_len - 1] = argmax(&delta[t_len - 1]);
        for t in (0..t_len - 1).rev() {
            path[t] = backpointer[t + 1][path[t + 1]];
        }
        path
    }

    /// State distribution for an entity's most recent observation.
    ///
    /// Computed from the emission likelihood alone under each state's
    /// learned Gaussian, normalized to sum to 1. The transition-prior
    /// contribution of a full forward-filtered posterior is intentionally
    /// omitted; the output contract is a K-vector summing to 1.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ModelFitError`] if the covariances cannot be
    /// factored.
    pub fn state_distribution(&self, observation: &[f64; N_SCORE_DIMS]) -> PipelineResult<Vec<f64>> {
        let emissions = self.emissions()?;
        let log_b = self.log_emission_row(&emissions, observation);
        let shift = log_b.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mut probs: Vec<f64> = log_b.iter().map(|&v| (v - shift).exp()).collect();
        normalize_in_place(&mut probs);
        Ok(probs)
    }

    /// Number of latent states.
    #[must_use]
    pub fn n_states(&self) -> usize {
        self.n_states
    }

    /// Corpus log-likelihood at the final EM iteration.
    #[must_use]
    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// EM iterations run before convergence or the cap.
    #[must_use]
    pub fn iterations_run(&self) -> usize {
        self.iterations_run
    }

    /// Per-state emission means, for inspection.
    #[must_use]
    pub fn state_means(&self) -> &[DVector<f64>] {
        &self.means
    }

    fn emissions(&self) -> PipelineResult<Emissions> {
        let mut factors = Vec::with_capacity(self.n_states);
        let mut log_dets = Vec::with_capacity(self.n_states);
        for cov in &self.covariances {
            let chol = cholesky_with_jitter(cov, self.covariance_reg)?;
            let l = chol.l();
            let log_det: f64 = (0..l.nrows()).map(|i| l[(i, i)].ln()).sum::<f64>() * 2.0;
            factors.push(chol);
            log_dets.push(log_det);
        }
        Ok(Emissions { factors, log_dets })
    }

    fn log_emission_row(&self, emissions: &Emissions, row: &[f64; N_SCORE_DIMS]) -> Vec<f64> {
        let x = DVector::from_row_slice(row);
        (0..self.n_states)
            .map(|s| {
                let centered = &x - &self.means[s];
                let solved = emissions.factors[s].solve(&centered);
                let quad_form = centered.dot(&solved);
                -0.5 * (N_SCORE_DIMS as f64 * LN_2PI + emissions.log_dets[s] + quad_form)
            })
            .collect()
    }
}

/// Normalizes a probability vector in place, returning the pre-normalization
/// mass. Falls back to uniform on underflow, the same recovery the posterior
/// update needs when every state is implausible.
fn normalize_in_place(probs: &mut [f64]) -> f64 {
    let total: f64 = probs.iter().sum();
    if total > 0.0 && total.is_finite() {
        for p in probs.iter_mut() {
            *p /= total;
        }
        total
    } else {
        let uniform = 1.0 / probs.len() as f64;
        for p in probs.iter_mut() {
            *p = uniform;
        }
        f64::MIN_POSITIVE
    }
}

fn squared_distance(a: &[f64; N_SCORE_DIMS], b: &[f64; N_SCORE_DIMS]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

fn pooled_covariance(corpus: &SequenceCorpus, reg: f64) -> DMatrix<f64> {
    let d = N_SCORE_DIMS;
    let n = corpus.n_rows() as f64;
    let mut mean = DVector::zeros(d);
    for row in &corpus.rows {
        mean.axpy(1.0, &DVector::from_row_slice(row), 1.0);
    }
    mean /= n;

    let mut cov = DMatrix::zeros(d, d);
    for row in &corpus.rows {
        let centered = DVector::from_row_slice(row) - &mean;
        cov.ger(1.0, &centered, &centered, 1.0);
    }
    cov /= n;
    for i in 0..d {
        cov[(i, i)] += reg;
    }
    cov
}

fn check_dimension_variance(corpus: &SequenceCorpus) -> PipelineResult<()> {
    let n = corpus.n_rows() as f64;
    for dim in 0..N_SCORE_DIMS {
        let mean: f64 = corpus.rows.iter().map(|r| r[dim]).sum::<f64>() / n;
        let var: f64 = corpus
            .rows
            .iter()
            .map(|r| (r[dim] - mean).powi(2))
            .sum::<f64>()
            / n;
        if var < 1e-12 {
            return Err(PipelineError::ModelFitError {
                detail: format!("score dimension {dim} has zero variance across the corpus"),
            });
        }
    }
    Ok(())
}

/// Factors a covariance, retrying with escalating diagonal jitter before
/// reporting the matrix as degenerate.
fn cholesky_with_jitter(cov: &DMatrix<f64>, reg: f64) -> PipelineResult<Cholesky<f64, Dyn>> {
    let mut jitter = 0.0;
    for _ in 0..6 {
        let mut candidate = cov.clone();
        if jitter > 0.0 {
            for i in 0..candidate.nrows() {
                candidate[(i, i)] += jitter;
            }
        }
        if let Some(chol) = Cholesky::new(candidate) {
            return Ok(chol);
        }
        jitter = if jitter == 0.0 { reg.max(1e-9) } else { jitter * 10.0 };
    }
    Err(PipelineError::ModelFitError {
        detail: "state covariance is not positive definite".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    /// Two well-separated clusters of 6-dim observations, alternating
    /// segments, so a 2-state model has an easy optimum.
    fn two_cluster_corpus(seed: u64) -> SequenceCorpus {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut rows = Vec::new();
        let mut lengths = Vec::new();
        for entity in 0..40 {
            let center = if entity % 2 == 0 { 2.0 } else { 4.0 };
            let len = 6 + (entity % 3);
            for _ in 0..len {
                let mut row = [0.0; N_SCORE_DIMS];
                for v in &mut row {
                    *v = center + rng.gen_range(-0.3..0.3);
                }
                rows.push(row);
            }
            lengths.push(len);
        }
        SequenceCorpus { rows, lengths }
    }

    fn config(n_states: usize, seed: u64) -> PipelineConfig {
        PipelineConfig::builder()
            .n_states(n_states)
            .em_iterations(40)
            .seed(seed)
            .build()
    }

    #[test]
    fn test_fit_is_deterministic_for_fixed_seed() {
        let corpus = two_cluster_corpus(3);
        let cfg = config(2, 11);
        let a = GaussianStateModel::fit(&corpus, &cfg).unwrap();
        let b = GaussianStateModel::fit(&corpus, &cfg).unwrap();

        assert_eq!(a.decode(&corpus).unwrap(), b.decode(&corpus).unwrap());
        assert!((a.log_likelihood() - b.log_likelihood()).abs() < 1e-9);
    }

    #[test]
    fn test_decode_separates_clusters() {
        let corpus = two_cluster_corpus(5);
        let cfg = config(2, 7);
        let model = GaussianStateModel::fit(&corpus, &cfg).unwrap();
        let paths = model.decode(&corpus).unwrap();

        assert_eq!(paths.len(), corpus.lengths.len());
        // Each entity's observations come from one cluster; its decoded
        // path should be constant.
        for path in &paths {
            assert!(path.iter().all(|&s| s == path[0]));
        }
        // And the two clusters should land in different states.
        assert_ne!(paths[0][0], paths[1][0]);
    }

    #[test]
    fn test_state_distribution_sums_to_one() {
        let corpus = two_cluster_corpus(9);
        let cfg = config(3, 1);
        let model = GaussianStateModel::fit(&corpus, &cfg).unwrap();

        for row in corpus.rows.iter().step_by(17) {
            let dist = model.state_distribution(row).unwrap();
            assert_eq!(dist.len(), 3);
            let total: f64 = dist.iter().sum();
            assert!((total - 1.0).abs() < 1e-6);
            assert!(dist.iter().all(|&p| p >= 0.0));
        }
    }

    #[test]
    fn test_fit_rejects_tiny_corpus() {
        let corpus = SequenceCorpus {
            rows: vec![[3.0; N_SCORE_DIMS], [3.1; N_SCORE_DIMS]],
            lengths: vec![2],
        };
        let err = GaussianStateModel::fit(&corpus, &config(3, 1)).unwrap_err();
        assert!(matches!(err, PipelineError::ModelFitError { .. }));
    }

    #[test]
    fn test_fit_rejects_zero_variance_dimension() {
        let mut corpus = two_cluster_corpus(2);
        for row in &mut corpus.rows {
            row[4] = 3.0;
        }
        let err = GaussianStateModel::fit(&corpus, &config(2, 1)).unwrap_err();
        assert!(matches!(err, PipelineError::ModelFitError { .. }));
    }

    #[test]
    fn test_decode_empty_sequence_rejected() {
        let corpus = two_cluster_corpus(4);
        let model = GaussianStateModel::fit(&corpus, &config(2, 1)).unwrap();
        let err = model.decode_sequence(77, &[]).unwrap_err();
        assert!(matches!(err, PipelineError::EmptySequence { employee_id: 77 }));
    }

    #[test]
    fn test_serde_roundtrip_preserves_decoding() {
        let corpus = two_cluster_corpus(6);
        let model = GaussianStateModel::fit(&corpus, &config(2, 3)).unwrap();

        let json = serde_json::to_string(&model).unwrap();
        let restored: GaussianStateModel = serde_json::from_str(&json).unwrap();

        assert_eq!(
            model.decode(&corpus).unwrap(),
            restored.decode(&corpus).unwrap()
        );
    }

    #[test]
    fn test_single_observation_segments_fit() {
        // Length-1 segments contribute no transition counts but must not
        // break the recursion.
        let mut corpus = two_cluster_corpus(8);
        corpus.rows.push([2.5; N_SCORE_DIMS]);
        corpus.lengths.push(1);
        let model = GaussianStateModel::fit(&corpus, &config(2, 5)).unwrap();
        let paths = model.decode(&corpus).unwrap();
        assert_eq!(paths.last().unwrap().len(), 1);
    }
}
