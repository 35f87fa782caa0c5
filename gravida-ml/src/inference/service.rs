//! Inference facade: validate, scale, score pregnancy, then (only if
//! pregnant) score trimester.

use serde::{Deserialize, Serialize};

use crate::algorithms::Classifier;
use crate::error::{GravidaError, Result};
use crate::features::FittedScaler;
use crate::schema::SymptomSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PregnancyStatus {
    #[serde(rename = "Pregnant")]
    Pregnant,
    #[serde(rename = "Not Pregnant")]
    NotPregnant,
}

impl std::fmt::Display for PregnancyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pregnant => write!(f, "Pregnant"),
            Self::NotPregnant => write!(f, "Not Pregnant"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trimester {
    #[serde(rename = "1st")]
    First,
    #[serde(rename = "2nd")]
    Second,
    #[serde(rename = "3rd")]
    Third,
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl Trimester {
    /// Map a raw trimester prediction; anything outside 1..=3 is not applicable.
    pub fn from_label(label: u8) -> Self {
        match label {
            1 => Self::First,
            2 => Self::Second,
            3 => Self::Third,
            _ => Self::NotApplicable,
        }
    }

    pub fn short(&self) -> &'static str {
        match self {
            Self::First => "1st",
            Self::Second => "2nd",
            Self::Third => "3rd",
            Self::NotApplicable => "N/A",
        }
    }
}

impl std::fmt::Display for Trimester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotApplicable => write!(f, "N/A"),
            other => write!(f, "{} Trimester", other.short()),
        }
    }
}

/// Result of one inference call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub pregnancy_status: PregnancyStatus,
    pub trimester: Trimester,
    /// Positive-class probability from the pregnancy predictor.
    pub confidence: Option<f64>,
}

impl PredictionRecord {
    pub fn is_pregnant(&self) -> bool {
        self.pregnancy_status == PregnancyStatus::Pregnant
    }
}

/// Read-only bundle of everything inference needs.
///
/// Safe to share between threads once built; nothing here mutates.
pub struct PredictionService {
    schema: SymptomSchema,
    scaler: FittedScaler,
    pregnancy: Box<dyn Classifier>,
    trimester: Option<Box<dyn Classifier>>,
}

impl PredictionService {
    pub fn new(
        schema: SymptomSchema,
        scaler: FittedScaler,
        pregnancy: Box<dyn Classifier>,
        trimester: Option<Box<dyn Classifier>>,
    ) -> Result<Self> {
        if scaler.n_features() != schema.len() {
            return Err(GravidaError::dimension_mismatch(
                schema.len(),
                scaler.n_features(),
            ));
        }
        Ok(Self {
            schema,
            scaler,
            pregnancy,
            trimester,
        })
    }

    pub fn schema(&self) -> &SymptomSchema {
        &self.schema
    }

    pub fn pregnancy_predictor(&self) -> &str {
        self.pregnancy.name()
    }

    pub fn trimester_predictor(&self) -> Option<&str> {
        self.trimester.as_deref().map(|t| t.name())
    }

    pub fn predict(&self, answers: &[i64]) -> Result<PredictionRecord> {
        let symptoms = self.schema.validate(answers)?;
        tracing::trace!(score = symptoms.score(), "Input validated");

        let row = self.scaler.transform(&symptoms.to_features())?;
        tracing::trace!("Input scaled");

        let proba = self.pregnancy.predict_proba(&row)?;
        let pregnant = proba.argmax() == 1;
        let confidence = proba.get(1);
        tracing::debug!(
            predictor = self.pregnancy.name(),
            pregnant,
            confidence,
            "Pregnancy scored"
        );

        let trimester = match (&self.trimester, pregnant) {
            (Some(model), true) => {
                let label = model.predict(&row)?;
                tracing::debug!(predictor = model.name(), label, "Trimester scored");
                Trimester::from_label(label)
            }
            (None, true) => {
                tracing::debug!("No trimester predictor; trimester not reported");
                Trimester::NotApplicable
            }
            (_, false) => {
                tracing::trace!("Not pregnant; trimester skipped");
                Trimester::NotApplicable
            }
        };

        Ok(PredictionRecord {
            pregnancy_status: if pregnant {
                PregnancyStatus::Pregnant
            } else {
                PregnancyStatus::NotPregnant
            },
            trimester,
            confidence: Some(confidence),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::Probabilities;
    use crate::features::FeatureScaler;

    struct Fixed {
        classes: Vec<u8>,
        values: Vec<f64>,
    }

    impl Classifier for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn fit(&mut self, _rows: &[Vec<f64>], _labels: &[u8]) -> Result<()> {
            Ok(())
        }

        fn predict_proba(&self, _row: &[f64]) -> Result<Probabilities> {
            Ok(Probabilities::new(self.classes.clone(), self.values.clone()))
        }
    }

    fn service(pregnant_probability: f64, trimester: u8) -> PredictionService {
        let schema = SymptomSchema::standard();
        let rows = vec![vec![0.0; 13], vec![1.0; 13]];
        let scaler = FeatureScaler::new().fit(&rows, 13).unwrap();
        let pregnancy = Fixed {
            classes: vec![0, 1],
            values: vec![1.0 - pregnant_probability, pregnant_probability],
        };
        let trimester = Fixed {
            classes: vec![0, 1, 2, 3],
            values: (0..4).map(|i| if i == trimester { 1.0 } else { 0.0 }).collect(),
        };
        PredictionService::new(schema, scaler, Box::new(pregnancy), Some(Box::new(trimester)))
            .unwrap()
    }

    #[test]
    fn test_pregnant_reports_trimester() {
        let record = service(0.9, 2).predict(&[1; 13]).unwrap();
        assert_eq!(record.pregnancy_status, PregnancyStatus::Pregnant);
        assert_eq!(record.trimester, Trimester::Second);
        assert_eq!(record.confidence, Some(0.9));
    }

    #[test]
    fn test_not_pregnant_gates_trimester() {
        let record = service(0.2, 3).predict(&[0; 13]).unwrap();
        assert_eq!(record.pregnancy_status, PregnancyStatus::NotPregnant);
        assert_eq!(record.trimester, Trimester::NotApplicable);
    }

    #[test]
    fn test_dimension_mismatch_is_terminal() {
        let svc = service(0.9, 1);
        for len in [0, 10, 14] {
            assert!(matches!(
                svc.predict(&vec![0; len]),
                Err(GravidaError::DimensionMismatch { expected: 13, .. })
            ));
        }
    }

    #[test]
    fn test_invalid_value_is_rejected() {
        let mut answers = vec![0; 13];
        answers[0] = -1;
        assert!(matches!(
            service(0.9, 1).predict(&answers),
            Err(GravidaError::InvalidSymptomValue { index: 0, value: -1 })
        ));
    }

    #[test]
    fn test_trimester_labels() {
        assert_eq!(Trimester::from_label(1).to_string(), "1st Trimester");
        assert_eq!(Trimester::from_label(3).to_string(), "3rd Trimester");
        assert_eq!(Trimester::from_label(0).to_string(), "N/A");
        assert_eq!(Trimester::Second.short(), "2nd");
        assert_eq!(PregnancyStatus::NotPregnant.to_string(), "Not Pregnant");
    }

    #[test]
    fn test_scaler_must_match_schema() {
        let scaler = FeatureScaler::new()
            .fit(&[vec![0.0; 16], vec![1.0; 16]], 16)
            .unwrap();
        let pregnancy = Fixed {
            classes: vec![0, 1],
            values: vec![0.5, 0.5],
        };
        assert!(
            PredictionService::new(SymptomSchema::standard(), scaler, Box::new(pregnancy), None)
                .is_err()
        );
    }
}
