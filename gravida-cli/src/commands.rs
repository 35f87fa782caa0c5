//! CLI subcommand handlers.

use anyhow::Context;
use gravida_ml::{ConfigLoader, Pipeline, PipelineConfig, PredictionRecord};
use std::path::Path;

use crate::{Commands, ConfigAction, Overrides};

/// Handle a CLI subcommand.
pub fn handle_command(command: Commands, overrides: &Overrides) -> anyhow::Result<()> {
    match command {
        Commands::Predict { answers, verdict } => handle_predict(&answers, verdict, overrides),
        Commands::Check => {
            let pipeline = train(overrides)?;
            crate::interactive::run_check(&pipeline)
        }
        Commands::Report { json } => handle_report(json, overrides),
        Commands::Config { action } => handle_config(action, overrides),
    }
}

/// Layered config plus command-line overrides, validated once more after
/// the overrides land.
pub fn effective_config(overrides: &Overrides) -> anyhow::Result<PipelineConfig> {
    effective_config_with(ConfigLoader::new(), overrides)
}

fn effective_config_with(
    loader: ConfigLoader,
    overrides: &Overrides,
) -> anyhow::Result<PipelineConfig> {
    let mut config = loader
        .workspace(Some(overrides.workspace.as_path()))
        .file(overrides.config.as_deref())
        .load()
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    if let Some(seed) = overrides.seed {
        config.seed = seed;
    }
    if let Some(schema) = overrides.schema {
        config.schema = schema;
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    Ok(config)
}

fn train(overrides: &Overrides) -> anyhow::Result<Pipeline> {
    let config = effective_config(overrides)?;
    fit(config)
}

fn fit(config: PipelineConfig) -> anyhow::Result<Pipeline> {
    Pipeline::fit(config).map_err(|e| anyhow::anyhow!("Training failed: {}", e))
}

/// Parse a JSON array of integers. Range and length are checked by the schema.
pub fn parse_answers(input: &str) -> anyhow::Result<Vec<i64>> {
    serde_json::from_str(input.trim())
        .with_context(|| format!("expected a JSON array of 0/1 integers, got '{input}'"))
}

/// Output lines for one prediction: the trimester line, or status and
/// confidence when `verdict` is set.
pub fn prediction_lines(record: &PredictionRecord, verdict: bool) -> Vec<String> {
    if !verdict {
        return vec![record.trimester.to_string()];
    }
    let mut lines = vec![record.pregnancy_status.to_string()];
    if let Some(confidence) = record.confidence {
        lines.push(format!("Confidence: {:.2}%", confidence * 100.0));
    }
    lines
}

fn handle_predict(answers: &str, verdict: bool, overrides: &Overrides) -> anyhow::Result<()> {
    let config = effective_config(overrides)?;
    for line in predict_lines(answers, verdict, config)? {
        println!("{line}");
    }
    Ok(())
}

/// Parse and validate `answers` against the configured checklist, then
/// train and predict. Malformed input fails before any training work.
fn predict_lines(
    answers: &str,
    verdict: bool,
    config: PipelineConfig,
) -> anyhow::Result<Vec<String>> {
    let answers = parse_answers(answers)?;
    config.schema().validate(&answers)?;
    let pipeline = fit(config)?;
    let record = pipeline.predict(&answers)?;
    Ok(prediction_lines(&record, verdict))
}

fn handle_report(json: bool, overrides: &Overrides) -> anyhow::Result<()> {
    let pipeline = train(overrides)?;
    let report = pipeline.report()?;
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", crate::report::render(report));
    }
    Ok(())
}

fn handle_config(action: ConfigAction, overrides: &Overrides) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => init_config(&overrides.workspace),
        ConfigAction::Show => {
            let config = effective_config(overrides)?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}

fn init_config(workspace: &Path) -> anyhow::Result<()> {
    let config_dir = workspace.join(".gravida");
    std::fs::create_dir_all(&config_dir)?;

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        println!(
            "Configuration file already exists at: {}",
            config_path.display()
        );
        return Ok(());
    }

    let toml_str = toml::to_string_pretty(&PipelineConfig::default())?;
    std::fs::write(&config_path, &toml_str)?;
    println!(
        "Created default configuration at: {}",
        config_path.display()
    );
    Ok(())
}
