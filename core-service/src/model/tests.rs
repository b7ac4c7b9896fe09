//! Ensemble scoring tests, with deterministic in-process classifiers.

use proptest::prelude::*;

use crate::features::{feature_index, FeatureVector, FEATURE_COUNT};
use super::classifier::{Classifier, ModelKind, ModelLoadError, ScoringError};
use super::policy::{Confidence, EnsembleWeights, ScoringPolicy, Status};
use super::scaler::{ScalerParams, StandardScaler};
use super::scorer::EnsembleScorer;

// ============================================================================
// TEST CLASSIFIERS
// ============================================================================

/// Always returns the same probability
pub(crate) struct FixedClassifier {
    pub kind: ModelKind,
    pub probability: f64,
}

impl Classifier for FixedClassifier {
    fn kind(&self) -> ModelKind {
        self.kind
    }

    fn predict_proba(&self, _scaled: &[f64; FEATURE_COUNT]) -> Result<f64, ScoringError> {
        Ok(self.probability)
    }
}

/// Reads its probability straight out of one scaled feature
pub(crate) struct FeatureClassifier {
    pub kind: ModelKind,
    pub index: usize,
}

impl Classifier for FeatureClassifier {
    fn kind(&self) -> ModelKind {
        self.kind
    }

    fn predict_proba(&self, scaled: &[f64; FEATURE_COUNT]) -> Result<f64, ScoringError> {
        Ok(scaled[self.index])
    }
}

pub(crate) struct FailingClassifier(pub ModelKind);

impl Classifier for FailingClassifier {
    fn kind(&self) -> ModelKind {
        self.0
    }

    fn predict_proba(&self, _scaled: &[f64; FEATURE_COUNT]) -> Result<f64, ScoringError> {
        Err(ScoringError::Classifier { model: self.0, message: "session poisoned".to_string() })
    }
}

pub(crate) fn fixed_scorer(tabular: f64, sequence: f64, residual: f64) -> EnsembleScorer {
    EnsembleScorer::new(
        Box::new(StandardScaler::identity()),
        Box::new(FixedClassifier { kind: ModelKind::Tabular, probability: tabular }),
        Box::new(FixedClassifier { kind: ModelKind::Sequence, probability: sequence }),
        Box::new(FixedClassifier { kind: ModelKind::Residual, probability: residual }),
        ScoringPolicy::default(),
    )
}

/// Every member echoes the SYN Flag Count feature, so a record's
/// `SYN_Flag_Count` field is its ensemble score.
pub(crate) fn syn_echo_scorer() -> EnsembleScorer {
    let index = feature_index("SYN Flag Count").unwrap();
    EnsembleScorer::new(
        Box::new(StandardScaler::identity()),
        Box::new(FeatureClassifier { kind: ModelKind::Tabular, index }),
        Box::new(FeatureClassifier { kind: ModelKind::Sequence, index }),
        Box::new(FeatureClassifier { kind: ModelKind::Residual, index }),
        ScoringPolicy::default(),
    )
}

#[test]
fn test_uniform_high_scores() {
    let result = fixed_scorer(0.9, 0.9, 0.9).score(&FeatureVector::zeroed()).unwrap();

    assert_eq!(result.ensemble_score, 0.9);
    assert_eq!(result.confidence, Confidence::High);
    assert!(result.is_anomaly);
    assert_eq!(result.status, Status::Anomaly);
}

#[test]
fn test_weighted_combination() {
    let result = fixed_scorer(0.2, 1.0, 0.0).score(&FeatureVector::zeroed()).unwrap();

    // 0.5 * 0.2 + 0.2 * 1.0 + 0.3 * 0.0
    assert_eq!(result.ensemble_score, 0.3);
    assert_eq!(result.tabular_score, 0.2);
    assert_eq!(result.sequence_score, 1.0);
    assert!(!result.is_anomaly);
    assert_eq!(result.status, Status::Normal);
    assert_eq!(result.confidence, Confidence::Low);
}

#[test]
fn test_decision_uses_full_precision() {
    let result = fixed_scorer(0.349996, 0.349996, 0.349996)
        .score(&FeatureVector::zeroed())
        .unwrap();

    // Presented as 0.35, still below the threshold
    assert_eq!(result.ensemble_score, 0.35);
    assert!(!result.is_anomaly);
}

#[test]
fn test_scaler_is_applied() {
    let index = feature_index("SYN Flag Count").unwrap();
    let scaler = StandardScaler::from_params(ScalerParams {
        mean: vec![0.0; FEATURE_COUNT],
        scale: vec![10.0; FEATURE_COUNT],
    }).unwrap();
    let scorer = EnsembleScorer::new(
        Box::new(scaler),
        Box::new(FeatureClassifier { kind: ModelKind::Tabular, index }),
        Box::new(FixedClassifier { kind: ModelKind::Sequence, probability: 0.0 }),
        Box::new(FixedClassifier { kind: ModelKind::Residual, probability: 0.0 }),
        ScoringPolicy::default(),
    );

    let mut values = [0.0; FEATURE_COUNT];
    values[index] = 8.0;
    let result = scorer.score(&FeatureVector::from_values(values)).unwrap();
    assert_eq!(result.tabular_score, 0.8);
    assert_eq!(result.ensemble_score, 0.4);
}

#[test]
fn test_invalid_probability_is_failure() {
    let err = fixed_scorer(0.5, f64::NAN, 0.5).score(&FeatureVector::zeroed()).unwrap_err();
    assert!(matches!(err, ScoringError::InvalidProbability { model: ModelKind::Sequence, .. }));

    let err = fixed_scorer(0.5, 0.5, 1.5).score(&FeatureVector::zeroed()).unwrap_err();
    assert!(matches!(err, ScoringError::InvalidProbability { model: ModelKind::Residual, .. }));
}

#[test]
fn test_classifier_error_propagates() {
    let scorer = EnsembleScorer::new(
        Box::new(StandardScaler::identity()),
        Box::new(FailingClassifier(ModelKind::Tabular)),
        Box::new(FixedClassifier { kind: ModelKind::Sequence, probability: 0.1 }),
        Box::new(FixedClassifier { kind: ModelKind::Residual, probability: 0.1 }),
        ScoringPolicy::default(),
    );
    let err = scorer.score(&FeatureVector::zeroed()).unwrap_err();
    assert_eq!(err.to_string(), "tabular classifier failed: session poisoned");
}

#[test]
fn test_foreign_layout_rejected() {
    let mut vector = FeatureVector::zeroed();
    vector.layout_hash ^= 0xFFFF;
    let err = fixed_scorer(0.1, 0.1, 0.1).score(&vector).unwrap_err();
    assert!(matches!(err, ScoringError::Layout(_)));
}

#[test]
fn test_custom_policy_threshold() {
    let policy = ScoringPolicy::new(
        EnsembleWeights { tabular: 1.0, sequence: 0.0, residual: 0.0 },
        0.9,
    ).unwrap();
    let scorer = EnsembleScorer::new(
        Box::new(StandardScaler::identity()),
        Box::new(FixedClassifier { kind: ModelKind::Tabular, probability: 0.88 }),
        Box::new(FixedClassifier { kind: ModelKind::Sequence, probability: 1.0 }),
        Box::new(FixedClassifier { kind: ModelKind::Residual, probability: 1.0 }),
        policy,
    );
    let result = scorer.score(&FeatureVector::zeroed()).unwrap();
    assert!(!result.is_anomaly);
    // Band still follows the fixed breakpoints
    assert_eq!(result.confidence, Confidence::High);
}

#[test]
fn test_scoring_is_deterministic() {
    let scorer = syn_echo_scorer();
    let mut values = [3.0; FEATURE_COUNT];
    values[feature_index("SYN Flag Count").unwrap()] = 0.42;
    let vector = FeatureVector::from_values(values);
    assert_eq!(scorer.score(&vector).unwrap(), scorer.score(&vector).unwrap());
}

#[test]
fn test_load_missing_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = crate::config::ModelArtifacts::from_dir(dir.path());
    let result = EnsembleScorer::load(&artifacts, ScoringPolicy::default());
    assert!(matches!(result, Err(ModelLoadError::NotFound(_))));
}

proptest! {
    #[test]
    fn prop_ensemble_score_in_unit_interval(
        a in 0.0f64..=1.0,
        b in 0.0f64..=1.0,
        c in 0.0f64..=1.0,
    ) {
        let result = fixed_scorer(a, b, c).score(&FeatureVector::zeroed()).unwrap();
        prop_assert!((0.0..=1.0).contains(&result.ensemble_score));
    }

    #[test]
    fn prop_anomaly_monotonic_in_each_member(
        base in prop::array::uniform3(0.0f64..=1.0),
        member in 0usize..3,
        bump in 0.0f64..=1.0,
    ) {
        let mut raised = base;
        raised[member] = (raised[member] + bump).min(1.0);

        let low = fixed_scorer(base[0], base[1], base[2]).score(&FeatureVector::zeroed()).unwrap();
        let high = fixed_scorer(raised[0], raised[1], raised[2]).score(&FeatureVector::zeroed()).unwrap();

        prop_assert!(!low.is_anomaly || high.is_anomaly);
    }

    #[test]
    fn prop_confidence_is_step_function(a in 0.0f64..=1.0) {
        let result = fixed_scorer(a, a, a).score(&FeatureVector::zeroed()).unwrap();
        let expected = Confidence::from_score(0.5 * a + 0.2 * a + 0.3 * a);
        prop_assert_eq!(result.confidence, expected);
    }
}
