//! End-to-end pipeline runs: generation through served predictions.

use gravida_ml::algorithms::ClassifierKind;
use gravida_ml::data::GenerationPolicy;
use gravida_ml::training::TrimesterStrategy;
use gravida_ml::{
    GravidaError, Pipeline, PipelineConfig, PregnancyStatus, SchemaVariant, Trimester,
};
use pretty_assertions::assert_eq;

fn reference_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.generation.policy = GenerationPolicy::Reference;
    config.generation.samples = 100;
    config
}

#[test]
fn reference_pipeline_matches_labelled_rows() {
    let pipeline = Pipeline::fit(reference_config()).unwrap();

    let record = pipeline
        .predict(&[1, 1, 1, 1, 1, 1, 0, 1, 1, 1, 0, 0, 1])
        .unwrap();
    assert_eq!(record.pregnancy_status, PregnancyStatus::Pregnant);
    assert_eq!(record.trimester, Trimester::First);
    assert_eq!(record.trimester.to_string(), "1st Trimester");
    assert!(record.confidence.unwrap() > 0.5);

    let record = pipeline.predict(&[0; 13]).unwrap();
    assert_eq!(record.pregnancy_status, PregnancyStatus::NotPregnant);
    assert_eq!(record.trimester, Trimester::NotApplicable);
    assert_eq!(record.trimester.to_string(), "N/A");

    let err = pipeline.predict(&[1; 10]).unwrap_err();
    assert!(matches!(
        err,
        GravidaError::DimensionMismatch {
            expected: 13,
            actual: 10
        }
    ));
}

#[test]
fn reference_rows_are_separable_by_every_candidate() {
    let pipeline = Pipeline::fit(reference_config()).unwrap();
    let report = pipeline.report().unwrap();
    for result in &report.pregnancy.results {
        assert_eq!(result.accuracy, 1.0, "{}", result.predictor);
    }
    // Ties keep the first registered candidate.
    assert_eq!(report.pregnancy.selected, "random_forest");
}

#[test]
fn reference_rows_have_a_constant_feature() {
    let pipeline = Pipeline::fit(reference_config()).unwrap();
    assert_eq!(pipeline.report().unwrap().degenerate_features, vec![11]);

    let mut strict = reference_config();
    strict.training.strict_variance = true;
    assert!(matches!(
        Pipeline::fit(strict),
        Err(GravidaError::DegenerateFeature(_))
    ));
}

#[test]
fn rule_derived_pipeline_trains_both_tasks() {
    let pipeline = Pipeline::fit(PipelineConfig::default()).unwrap();
    let report = pipeline.report().unwrap();

    assert_eq!(report.dataset.total, 1000);
    assert_eq!(report.dataset.train + report.dataset.test, 1000);
    assert_eq!(report.pregnancy.results.len(), 3);
    let trimester = report.trimester.as_ref().unwrap();
    assert_eq!(trimester.results.len(), 3);
    assert!(trimester.selected_result().is_some());
    assert!(
        trimester.results[0]
            .confusion_matrix
            .labels
            .iter()
            .all(|l| (1..=3).contains(l))
    );

    let record = pipeline.predict(&[0; 13]).unwrap();
    assert_eq!(record.pregnancy_status, PregnancyStatus::NotPregnant);
    assert_eq!(record.trimester, Trimester::NotApplicable);

    let service = pipeline.service().unwrap();
    assert_eq!(service.pregnancy_predictor(), report.pregnancy.selected);
    assert_eq!(service.trimester_predictor(), Some(trimester.selected.as_str()));
}

#[test]
fn fixed_seed_runs_are_identical() {
    let mut config = PipelineConfig::default();
    config.generation.samples = 400;

    let a = Pipeline::fit(config.clone()).unwrap();
    let b = Pipeline::fit(config).unwrap();
    assert_eq!(a.report().unwrap(), b.report().unwrap());

    for answers in [[1; 13], [0; 13], [1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1]] {
        assert_eq!(a.predict(&answers).unwrap(), b.predict(&answers).unwrap());
    }
}

#[test]
fn weighted_policy_is_single_task() {
    let mut config = PipelineConfig::default();
    config.schema = SchemaVariant::Extended;
    config.generation.policy = GenerationPolicy::WeightedResample;
    config.generation.samples = 500;
    let pipeline = Pipeline::fit(config).unwrap();

    let report = pipeline.report().unwrap();
    assert!(report.trimester.is_none());
    assert!(pipeline.service().unwrap().trimester_predictor().is_none());

    let record = pipeline.predict(&[1; 16]).unwrap();
    assert_eq!(record.pregnancy_status, PregnancyStatus::Pregnant);
    assert_eq!(record.trimester, Trimester::NotApplicable);
    assert!(record.confidence.unwrap() > 0.5);

    assert!(matches!(
        pipeline.predict(&[1; 13]),
        Err(GravidaError::DimensionMismatch {
            expected: 16,
            actual: 13
        })
    ));
}

#[test]
fn all_classes_strategy_includes_not_applicable() {
    let mut config = PipelineConfig::default();
    config.generation.samples = 500;
    config.training.trimester_strategy = TrimesterStrategy::AllClasses;
    config.training.candidates = vec![ClassifierKind::logistic_regression()];
    let pipeline = Pipeline::fit(config).unwrap();

    let trimester = pipeline.report().unwrap().trimester.clone().unwrap();
    assert_eq!(trimester.results[0].confusion_matrix.labels[0], 0);
    assert_eq!(trimester.selected, "logistic_regression");
}

#[test]
fn trained_service_is_shared_across_threads() {
    let mut config = PipelineConfig::default();
    config.generation.samples = 300;
    let pipeline = Pipeline::fit(config).unwrap();
    let service = pipeline.service().unwrap();

    let inputs: Vec<Vec<i64>> = (0..8u32)
        .map(|i| (0..13).map(|j| i64::from((i >> (j % 3)) & 1)).collect())
        .collect();
    let sequential: Vec<_> = inputs.iter().map(|v| service.predict(v).unwrap()).collect();

    let concurrent: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = inputs
            .iter()
            .map(|v| s.spawn(move || service.predict(v).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(sequential, concurrent);
}

#[test]
fn duplicate_families_report_the_winning_candidate() {
    let mut config = PipelineConfig::default();
    config.generation.samples = 400;
    config.training.candidates = vec![
        ClassifierKind::KNearestNeighbors { k: 1 },
        ClassifierKind::KNearestNeighbors { k: 25 },
    ];
    let pipeline = Pipeline::fit(config).unwrap();
    let report = pipeline.report().unwrap();

    let tasks = std::iter::once(&report.pregnancy).chain(report.trimester.as_ref());
    for task in tasks {
        let best = task
            .results
            .iter()
            .map(|r| r.accuracy)
            .fold(f64::NEG_INFINITY, f64::max);
        let first_best = task.results.iter().position(|r| r.accuracy == best).unwrap();
        assert_eq!(task.selected_index, first_best);
        assert_eq!(task.selected_result().unwrap().accuracy, best);
        assert_eq!(task.selected, "k_nearest_neighbors");
        assert!(task.is_selected(first_best));
        assert!(!task.is_selected(1 - first_best));
    }
}

#[test]
fn mlp_candidate_learns_reference_rows() {
    let mut config = reference_config();
    config.training.candidates = vec![ClassifierKind::Mlp {
        hidden_layers: vec![16],
        learning_rate: 0.05,
        epochs: 300,
        batch_size: 16,
        l2: 0.0,
    }];
    let pipeline = Pipeline::fit(config).unwrap();
    assert_eq!(pipeline.report().unwrap().pregnancy.selected, "mlp");

    let record = pipeline
        .predict(&[1, 1, 1, 1, 1, 1, 0, 1, 1, 1, 0, 0, 1])
        .unwrap();
    assert_eq!(record.pregnancy_status, PregnancyStatus::Pregnant);
    assert_eq!(record.trimester, Trimester::First);

    let record = pipeline.predict(&[0; 13]).unwrap();
    assert_eq!(record.pregnancy_status, PregnancyStatus::NotPregnant);
}
