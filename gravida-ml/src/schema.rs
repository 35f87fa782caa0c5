//! Symptom checklist and the binary feature-vector contract derived from it.
//!
//! Every vector that enters or leaves the pipeline has exactly one entry per
//! question, each 0 or 1, in checklist order.

use serde::{Deserialize, Serialize};

use crate::error::{GravidaError, Result};

const STANDARD_QUESTIONS: [&str; 13] = [
    "Missed period (7+ days late)?",
    "Nausea or vomiting (especially morning)?",
    "Increased sensitivity to smells?",
    "Unusual fatigue or sleepiness?",
    "Breast changes (soreness/fullness/darkened areolas)?",
    "Food cravings or aversions?",
    "Light spotting or implantation bleeding?",
    "Abdominal pressure or bloating?",
    "Frequent urination?",
    "Mood swings or emotional sensitivity?",
    "Dizziness or lightheadedness?",
    "Low-grade fever (~99°F / 37.2°C)?",
    "Metallic taste in mouth?",
];

const EXTENDED_QUESTIONS: [&str; 3] = ["Headaches?", "Sleep disturbances?", "Back or pelvic pain?"];

/// Which checklist a run uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaVariant {
    /// The 13-question checklist served by the inference endpoint.
    #[default]
    Standard,
    /// The 13 standard questions followed by headache, sleep and back pain.
    Extended,
}

impl std::fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Extended => write!(f, "extended"),
        }
    }
}

impl std::str::FromStr for SchemaVariant {
    type Err = GravidaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "extended" => Ok(Self::Extended),
            other => Err(GravidaError::config(format!(
                "unknown schema variant '{other}' (expected 'standard' or 'extended')"
            ))),
        }
    }
}

/// Checklist positions read by the rule-derived labelling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleIndices {
    pub fatigue: usize,
    pub breast: usize,
    pub back_pain: usize,
    pub headache: usize,
    pub sleep_disturbance: usize,
}

/// Ordered list of symptom questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymptomSchema {
    variant: SchemaVariant,
    questions: Vec<String>,
}

impl SymptomSchema {
    pub fn new(variant: SchemaVariant) -> Self {
        let mut questions: Vec<String> = STANDARD_QUESTIONS.iter().map(|q| q.to_string()).collect();
        if variant == SchemaVariant::Extended {
            questions.extend(EXTENDED_QUESTIONS.iter().map(|q| q.to_string()));
        }
        Self { variant, questions }
    }

    pub fn standard() -> Self {
        Self::new(SchemaVariant::Standard)
    }

    pub fn extended() -> Self {
        Self::new(SchemaVariant::Extended)
    }

    pub fn variant(&self) -> SchemaVariant {
        self.variant
    }

    /// Number of questions, i.e. the length of every feature vector.
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    pub fn question(&self, index: usize) -> Option<&str> {
        self.questions.get(index).map(String::as_str)
    }

    /// Positions consulted by the rule-derived policy.
    ///
    /// The standard checklist has no headache, sleep or back pain question, so
    /// dizziness, fatigue and abdominal pressure stand in for them.
    pub fn rule_indices(&self) -> RuleIndices {
        match self.variant {
            SchemaVariant::Standard => RuleIndices {
                fatigue: 3,
                breast: 4,
                back_pain: 7,
                headache: 10,
                sleep_disturbance: 3,
            },
            SchemaVariant::Extended => RuleIndices {
                fatigue: 3,
                breast: 4,
                back_pain: 15,
                headache: 13,
                sleep_disturbance: 14,
            },
        }
    }

    /// Check length first, then that every answer is 0 or 1.
    pub fn validate(&self, answers: &[i64]) -> Result<SymptomVector> {
        if answers.len() != self.len() {
            return Err(GravidaError::dimension_mismatch(self.len(), answers.len()));
        }
        let bits = answers
            .iter()
            .enumerate()
            .map(|(index, &value)| match value {
                0 => Ok(false),
                1 => Ok(true),
                _ => Err(GravidaError::InvalidSymptomValue { index, value }),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(SymptomVector(bits))
    }
}

/// A validated answer vector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymptomVector(Vec<bool>);

impl SymptomVector {
    pub fn from_bits(bits: Vec<bool>) -> Self {
        Self(bits)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> bool {
        self.0.get(index).copied().unwrap_or(false)
    }

    /// Number of symptoms answered "yes".
    pub fn score(&self) -> usize {
        self.0.iter().filter(|b| **b).count()
    }

    pub fn bits(&self) -> &[bool] {
        &self.0
    }

    pub fn to_features(&self) -> Vec<f64> {
        self.0.iter().map(|&b| if b { 1.0 } else { 0.0 }).collect()
    }
}
