//! Pipeline configuration.
//!
//! Uses `figment` for layered configuration: defaults -> user config ->
//! workspace config -> explicit file -> environment. CLI flags are applied
//! on top by the caller.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::algorithms::ClassifierKind;
use crate::data::{GenerationPolicy, SymptomWeights};
use crate::error::{GravidaError, Result};
use crate::schema::{SchemaVariant, SymptomSchema};
use crate::training::TrimesterStrategy;

/// Everything a pipeline run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Global seed; every random draw in a run derives from it.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Which symptom checklist to use.
    #[serde(default)]
    pub schema: SchemaVariant,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub split: SplitConfig,
    #[serde(default)]
    pub training: TrainingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            schema: SchemaVariant::default(),
            generation: GenerationConfig::default(),
            split: SplitConfig::default(),
            training: TrainingConfig::default(),
        }
    }
}

fn default_seed() -> u64 {
    42
}

/// Synthetic data settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub policy: GenerationPolicy,
    /// Number of examples to generate.
    #[serde(default = "default_samples")]
    pub samples: usize,
    /// Redraws allowed when a generated dataset cannot be stratified.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// Per-class weight tables for the weighted policy (built-in tables if unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<SymptomWeights>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            policy: GenerationPolicy::default(),
            samples: default_samples(),
            max_attempts: default_max_attempts(),
            weights: None,
        }
    }
}

fn default_samples() -> usize {
    1000
}

fn default_max_attempts() -> usize {
    5
}

/// Train/test partitioning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Share of each label held out for evaluation.
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: default_test_fraction(),
        }
    }
}

fn default_test_fraction() -> f64 {
    0.2
}

/// Predictor training settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default)]
    pub trimester_strategy: TrimesterStrategy,
    /// Predictor families to train and compare, in selection-priority order.
    #[serde(default = "default_candidates")]
    pub candidates: Vec<ClassifierKind>,
    /// Fail on zero-variance features instead of scaling them by 1.
    #[serde(default)]
    pub strict_variance: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            trimester_strategy: TrimesterStrategy::default(),
            candidates: default_candidates(),
            strict_variance: false,
        }
    }
}

fn default_candidates() -> Vec<ClassifierKind> {
    vec![
        ClassifierKind::random_forest(),
        ClassifierKind::logistic_regression(),
        ClassifierKind::k_nearest_neighbors(),
    ]
}

impl PipelineConfig {
    pub fn schema(&self) -> SymptomSchema {
        SymptomSchema::new(self.schema)
    }

    /// Reject settings that can never produce a usable run.
    pub fn validate(&self) -> Result<()> {
        if self.generation.samples == 0 {
            return Err(GravidaError::config("generation.samples must be at least 1"));
        }
        if self.generation.max_attempts == 0 {
            return Err(GravidaError::config(
                "generation.max_attempts must be at least 1",
            ));
        }
        let fraction = self.split.test_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(GravidaError::config(format!(
                "split.test_fraction must be in (0, 1), got {fraction}"
            )));
        }
        if self.training.candidates.is_empty() {
            return Err(GravidaError::config(
                "training.candidates must name at least one predictor",
            ));
        }
        for kind in &self.training.candidates {
            kind.validate()?;
        }
        if let Some(weights) = &self.generation.weights {
            weights.validate(self.schema().len())?;
        }
        if self.generation.policy == GenerationPolicy::Reference
            && self.schema != SchemaVariant::Standard
        {
            return Err(GravidaError::config(
                "the reference policy requires the standard schema",
            ));
        }
        Ok(())
    }
}

/// User-level config file, e.g. `~/.config/gravida/config.toml`.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "gravida", "gravida")
        .map(|d| d.config_dir().join("config.toml"))
}

/// Sources for a layered configuration load.
///
/// Priority (highest to lowest):
/// 1. Environment variables (`GRAVIDA_SEED`, `GRAVIDA_GENERATION__SAMPLES`, ...)
/// 2. An explicit config file
/// 3. Workspace-local config (`.gravida/config.toml`)
/// 4. User config
/// 5. Built-in defaults
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    user_config: Option<PathBuf>,
    workspace: Option<PathBuf>,
    file: Option<PathBuf>,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self {
            user_config: user_config_path(),
            workspace: None,
            file: None,
            env_prefix: Some("GRAVIDA_".to_string()),
        }
    }
}

impl ConfigLoader {
    /// Reads the user config file and `GRAVIDA_*` variables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads only what is set explicitly; no user file, no environment.
    pub fn isolated() -> Self {
        Self {
            user_config: None,
            workspace: None,
            file: None,
            env_prefix: None,
        }
    }

    pub fn user_config(mut self, path: Option<PathBuf>) -> Self {
        self.user_config = path;
        self
    }

    pub fn workspace(mut self, dir: Option<&Path>) -> Self {
        self.workspace = dir.map(Path::to_path_buf);
        self
    }

    pub fn file(mut self, path: Option<&Path>) -> Self {
        self.file = path.map(Path::to_path_buf);
        self
    }

    pub fn env_prefix(mut self, prefix: Option<&str>) -> Self {
        self.env_prefix = prefix.map(str::to_string);
        self
    }

    pub fn load(&self) -> Result<PipelineConfig> {
        let mut figment = Figment::from(Serialized::defaults(PipelineConfig::default()));

        if let Some(user_config) = &self.user_config {
            if user_config.exists() {
                figment = figment.merge(Toml::file(user_config));
            }
        }

        if let Some(ws) = &self.workspace {
            let ws_config = ws.join(".gravida").join("config.toml");
            if ws_config.exists() {
                figment = figment.merge(Toml::file(&ws_config));
            }
        }

        if let Some(path) = &self.file {
            if !path.exists() {
                return Err(GravidaError::config(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }

        if let Some(prefix) = &self.env_prefix {
            figment = figment.merge(Env::prefixed(prefix).split("__"));
        }

        let config: PipelineConfig = figment
            .extract()
            .map_err(|e| GravidaError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

/// Load configuration from the user file, `workspace`, `file` and the
/// environment. See [`ConfigLoader`] for the priority order.
pub fn load_config(workspace: Option<&Path>, file: Option<&Path>) -> Result<PipelineConfig> {
    ConfigLoader::new().workspace(workspace).file(file).load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.generation.samples, 1000);
        assert_eq!(config.training.candidates.len(), 3);
        assert_eq!(config.training.trimester_strategy, TrimesterStrategy::PregnantOnly);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: PipelineConfig = toml_from_str(
            r#"
            seed = 7
            schema = "extended"

            [generation]
            policy = "weighted_resample"

            [[training.candidates]]
            type = "k_nearest_neighbors"
            k = 3
            "#,
        );
        assert_eq!(config.seed, 7);
        assert_eq!(config.schema, SchemaVariant::Extended);
        assert_eq!(config.generation.policy, GenerationPolicy::WeightedResample);
        assert_eq!(config.generation.samples, 1000);
        assert_eq!(
            config.training.candidates,
            vec![ClassifierKind::KNearestNeighbors { k: 3 }]
        );
    }

    fn toml_from_str(s: &str) -> PipelineConfig {
        Figment::from(Serialized::defaults(PipelineConfig::default()))
            .merge(Toml::string(s))
            .extract()
            .unwrap()
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = PipelineConfig::default();
        config.generation.samples = 0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.split.test_fraction = 0.0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.training.candidates.clear();
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.schema = SchemaVariant::Extended;
        config.generation.policy = GenerationPolicy::Reference;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_checks_weight_length() {
        let mut config = PipelineConfig::default();
        config.generation.weights = Some(SymptomWeights::defaults_for(&SymptomSchema::extended()));
        assert!(matches!(
            config.validate(),
            Err(GravidaError::DimensionMismatch {
                expected: 13,
                actual: 16
            })
        ));
    }

    #[test]
    fn test_load_config_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gravida.toml");
        std::fs::write(&path, "seed = 99\n[split]\ntest_fraction = 0.25\n").unwrap();
        let config = ConfigLoader::isolated().file(Some(&path)).load().unwrap();
        assert_eq!(config.seed, 99);
        assert_eq!(config.split.test_fraction, 0.25);
    }

    #[test]
    fn test_workspace_config_is_layered() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".gravida")).unwrap();
        std::fs::write(
            dir.path().join(".gravida").join("config.toml"),
            "[generation]\nsamples = 250\n",
        )
        .unwrap();
        let config = ConfigLoader::isolated()
            .workspace(Some(dir.path()))
            .load()
            .unwrap();
        assert_eq!(config.generation.samples, 250);
    }

    #[test]
    fn test_isolated_loader_ignores_user_file() {
        let dir = tempfile::tempdir().unwrap();
        let user = dir.path().join("user.toml");
        std::fs::write(&user, "seed = 5\n").unwrap();

        let config = ConfigLoader::isolated().load().unwrap();
        assert_eq!(config, PipelineConfig::default());

        let config = ConfigLoader::isolated()
            .user_config(Some(user))
            .load()
            .unwrap();
        assert_eq!(config.seed, 5);
    }

    #[test]
    fn test_later_layers_win() {
        let dir = tempfile::tempdir().unwrap();
        let user = dir.path().join("user.toml");
        std::fs::write(&user, "seed = 5\n[split]\ntest_fraction = 0.3\n").unwrap();
        let explicit = dir.path().join("run.toml");
        std::fs::write(&explicit, "seed = 6\n").unwrap();

        let config = ConfigLoader::isolated()
            .user_config(Some(user))
            .file(Some(&explicit))
            .load()
            .unwrap();
        assert_eq!(config.seed, 6);
        assert_eq!(config.split.test_fraction, 0.3);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            load_config(None, Some(&missing)),
            Err(GravidaError::Config(_))
        ));
    }
}
