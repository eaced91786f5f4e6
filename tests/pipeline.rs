//! End-to-end integration tests for turnover-predict-rs.

use std::collections::BTreeMap;

use turnover_predict_rs::features::LatentSummary;
use turnover_predict_rs::prelude::*;
use turnover_predict_rs::sequence::build_corpus;
use turnover_predict_rs::synthetic::generate_dataset;

fn test_config() -> PipelineConfig {
    PipelineConfig::builder()
        .n_trees(120)
        .max_depth(10)
        .em_iterations(50)
        .cv_folds(3)
        .seed(42)
        .build()
}

#[test]
fn test_end_to_end_learns_signal() {
    let records = generate_dataset(500, 12, 42);
    let rate = records.iter().filter(|r| r.left == Some(true)).count() as f64 / 500.0;
    assert!(
        (0.10..=0.40).contains(&rate),
        "synthetic base rate {rate} out of band"
    );

    let pipeline = TurnoverPipeline::new(test_config()).unwrap();
    let report = pipeline.train(&records).unwrap();

    assert_eq!(report.status, TrainingStatus::Trained);
    assert_eq!(report.n_entities, 500);
    assert!(
        report.holdout_auc > 0.6,
        "holdout AUC {} not above chance",
        report.holdout_auc
    );
    assert!(report.cv_auc_mean > 0.55);
}

#[test]
fn test_training_is_deterministic_for_fixed_seed() {
    let records = generate_dataset(150, 8, 9);
    let config = PipelineConfig::builder()
        .n_trees(40)
        .em_iterations(25)
        .cv_folds(2)
        .seed(7)
        .build();

    let a = TurnoverPipeline::new(config.clone()).unwrap();
    let b = TurnoverPipeline::new(config).unwrap();
    a.train(&records).unwrap();
    b.train(&records).unwrap();

    let pa = a.predict(&records).unwrap();
    let pb = b.predict(&records).unwrap();
    assert_eq!(pa.len(), pb.len());
    for (x, y) in pa.iter().zip(&pb) {
        assert_eq!(x.employee_id, y.employee_id);
        assert_eq!(x.probability.to_bits(), y.probability.to_bits());
        assert_eq!(x.tier, y.tier);
    }

    assert_eq!(
        a.feature_importance(10).unwrap(),
        b.feature_importance(10).unwrap()
    );
}

#[test]
fn test_save_load_predict_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    let records = generate_dataset(120, 8, 17);
    let config = PipelineConfig::builder()
        .n_trees(40)
        .em_iterations(25)
        .cv_folds(2)
        .seed(11)
        .build();

    let trained = TurnoverPipeline::with_store(
        config.clone(),
        Box::new(FileArtifactStore::new(path.clone())),
    )
    .unwrap();
    assert_eq!(trained.status(), TrainingStatus::Untrained);
    trained.train(&records).unwrap();
    let direct = trained.predict(&records).unwrap();

    // A fresh pipeline restored from the store must predict identically.
    let restored =
        TurnoverPipeline::with_store(config, Box::new(FileArtifactStore::new(path))).unwrap();
    assert_eq!(restored.status(), TrainingStatus::Trained);
    let reloaded = restored.predict(&records).unwrap();

    assert_eq!(direct.len(), reloaded.len());
    for (x, y) in direct.iter().zip(&reloaded) {
        assert_eq!(x.probability.to_bits(), y.probability.to_bits());
        assert_eq!(x.tier, y.tier);
    }
}

#[test]
fn test_state_distribution_sums_to_one_for_every_entity() {
    let records = generate_dataset(100, 8, 5);
    let pipeline = TurnoverPipeline::new(
        PipelineConfig::builder()
            .n_trees(30)
            .em_iterations(25)
            .cv_folds(2)
            .seed(3)
            .build(),
    )
    .unwrap();
    pipeline.train(&records).unwrap();
    let artifact = pipeline.artifact().unwrap();

    let build = build_corpus(&records, true).unwrap();
    for segment in build.corpus.segments() {
        let dist = artifact
            .state_model
            .state_distribution(segment.last().unwrap())
            .unwrap();
        let total: f64 = dist.iter().sum();
        assert!((total - 1.0).abs() < 1e-6, "distribution sums to {total}");
    }
}

#[test]
fn test_unseen_category_degrades_gracefully() {
    let records = generate_dataset(100, 8, 21);
    let pipeline = TurnoverPipeline::new(
        PipelineConfig::builder()
            .n_trees(30)
            .em_iterations(20)
            .cv_folds(2)
            .seed(5)
            .build(),
    )
    .unwrap();
    pipeline.train(&records).unwrap();

    let mut novel = records[0].clone();
    novel.employee_id = 9_999;
    novel.department = "Quantum Synergy".to_string();
    novel.work_location = "Houseboat".to_string();

    let predictions = pipeline.predict(&[novel]).unwrap();
    assert_eq!(predictions.len(), 1);
    assert!((0.0..=1.0).contains(&predictions[0].probability));
}

#[test]
fn test_no_history_entity_uses_cold_start_fallback() {
    let records = generate_dataset(100, 8, 13);
    let config = PipelineConfig::builder()
        .n_trees(30)
        .em_iterations(20)
        .cv_folds(2)
        .seed(5)
        .build();
    let n_states = config.n_states;
    let pipeline = TurnoverPipeline::new(config).unwrap();
    pipeline.train(&records).unwrap();

    // The documented fallback: state 0 and a uniform distribution.
    let neutral = LatentSummary::neutral(n_states);
    assert_eq!(neutral.current_state, 0);
    for p in &neutral.distribution {
        assert!((p - 1.0 / n_states as f64).abs() < 1e-12);
    }

    let mut cold = records[0].clone();
    cold.employee_id = 7_777;
    cold.observations.clear();

    let predictions = pipeline.predict(&[cold]).unwrap();
    assert_eq!(predictions.len(), 1);
    assert!((0.0..=1.0).contains(&predictions[0].probability));
    assert!((0.0..=1.0).contains(&predictions[0].confidence));
}

#[test]
fn test_malformed_entity_rejected_without_failing_batch() {
    let records = generate_dataset(100, 8, 29);
    let pipeline = TurnoverPipeline::new(
        PipelineConfig::builder()
            .n_trees(30)
            .em_iterations(20)
            .cv_folds(2)
            .seed(5)
            .build(),
    )
    .unwrap();
    pipeline.train(&records).unwrap();

    let mut broken = records[1].clone();
    broken.employee_id = 5_555;
    for obs in &mut broken.observations {
        obs.scores = BTreeMap::from([("vibes".to_string(), 3.0)]);
    }

    let batch = vec![records[0].clone(), broken, records[2].clone()];
    let predictions = pipeline.predict(&batch).unwrap();

    // The malformed entity is dropped; the others keep their order.
    let ids: Vec<u64> = predictions.iter().map(|p| p.employee_id).collect();
    assert_eq!(
        ids,
        vec![records[0].employee_id, records[2].employee_id]
    );
}

#[test]
fn test_feature_importance_is_ranked_and_truncated() {
    let records = generate_dataset(150, 8, 31);
    let pipeline = TurnoverPipeline::new(
        PipelineConfig::builder()
            .n_trees(40)
            .em_iterations(20)
            .cv_folds(2)
            .seed(2)
            .build(),
    )
    .unwrap();
    pipeline.train(&records).unwrap();

    let ranked = pipeline.feature_importance(5).unwrap();
    assert_eq!(ranked.len(), 5);
    for window in ranked.windows(2) {
        assert!(window[0].1 >= window[1].1);
    }
}
