//! Interactive questionnaire.

use dialoguer::Input;
use gravida_ml::{Pipeline, PredictionRecord};

/// Map a yes/no reply to an answer bit.
pub fn parse_reply(reply: &str) -> Option<i64> {
    match reply.trim().to_ascii_lowercase().as_str() {
        "yes" => Some(1),
        "no" => Some(0),
        _ => None,
    }
}

/// Boxed summary printed after the questionnaire.
pub fn render_verdict(record: &PredictionRecord) -> String {
    let mut lines = vec![format!("Result: {}", record.pregnancy_status)];
    if record.is_pregnant() {
        lines.push(format!("Trimester: {}", record.trimester));
    }
    if let Some(confidence) = record.confidence {
        lines.push(format!("Confidence: {:.2}%", confidence * 100.0));
    }
    lines.push("This is an estimate, not a diagnosis.".to_string());

    let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let border = format!("+{}+", "-".repeat(width + 2));
    let mut out = String::new();
    out.push_str(&border);
    out.push('\n');
    for line in &lines {
        out.push_str(&format!("| {line:<width$} |\n"));
    }
    out.push_str(&border);
    out.push('\n');
    out
}

pub fn run_check(pipeline: &Pipeline) -> anyhow::Result<()> {
    let schema = pipeline.schema();
    println!(
        "\n  Answer each question with 'yes' or 'no' ({} questions).\n",
        schema.len()
    );

    let mut answers = Vec::with_capacity(schema.len());
    for (i, question) in schema.questions().iter().enumerate() {
        let reply: String = Input::new()
            .with_prompt(format!("{:>2}. {}", i + 1, question))
            .validate_with(|input: &String| -> Result<(), &str> {
                parse_reply(input)
                    .map(|_| ())
                    .ok_or("please answer 'yes' or 'no'")
            })
            .interact_text()?;
        // Validation above guarantees a mapping.
        answers.push(parse_reply(&reply).unwrap_or(0));
    }

    let record = pipeline.predict(&answers)?;
    tracing::debug!(status = %record.pregnancy_status, trimester = %record.trimester, "Interactive check complete");
    println!();
    print!("{}", render_verdict(&record));
    Ok(())
}
