//! Plain-text rendering of a training report.

use gravida_ml::eval::{ConfusionMatrix, EvaluationResult};
use gravida_ml::{TaskReport, TrainingReport};
use std::fmt::Write;

fn label_name(task: &str, label: u8) -> String {
    match (task, label) {
        ("pregnancy", 0) => "not pregnant".to_string(),
        ("pregnancy", 1) => "pregnant".to_string(),
        (_, 0) => "n/a".to_string(),
        (_, 1) => "1st".to_string(),
        (_, 2) => "2nd".to_string(),
        (_, 3) => "3rd".to_string(),
        (_, other) => other.to_string(),
    }
}

fn render_matrix(out: &mut String, task: &str, cm: &ConfusionMatrix) {
    let names: Vec<String> = cm.labels.iter().map(|&l| label_name(task, l)).collect();
    let width = names.iter().map(|n| n.len()).max().unwrap_or(0).max(6);

    let _ = write!(out, "    {:>width$}", "actual");
    for name in &names {
        let _ = write!(out, " {name:>width$}");
    }
    out.push('\n');
    for (name, row) in names.iter().zip(&cm.counts) {
        let _ = write!(out, "    {name:>width$}");
        for count in row {
            let _ = write!(out, " {count:>width$}");
        }
        out.push('\n');
    }
}

fn render_result(out: &mut String, task: &str, result: &EvaluationResult, selected: bool) {
    let marker = if selected { " (selected)" } else { "" };
    let _ = writeln!(
        out,
        "  {}{}: accuracy {:.2}%",
        result.predictor,
        marker,
        result.accuracy * 100.0
    );
    let _ = writeln!(
        out,
        "    {:>14} {:>9} {:>9} {:>9} {:>9}",
        "class", "precision", "recall", "f1", "support"
    );
    for class in &result.per_class {
        let _ = writeln!(
            out,
            "    {:>14} {:>9.3} {:>9.3} {:>9.3} {:>9}",
            label_name(task, class.label),
            class.precision,
            class.recall,
            class.f1,
            class.support
        );
    }
    let _ = writeln!(
        out,
        "    {:>14} {:>9.3} {:>9.3} {:>9.3}",
        "macro avg", result.macro_precision, result.macro_recall, result.macro_f1
    );
    out.push('\n');
    render_matrix(out, task, &result.confusion_matrix);
    out.push('\n');
}

fn render_task(out: &mut String, task: &str, report: &TaskReport) {
    let _ = writeln!(out, "== {task} ==");
    for (i, result) in report.results.iter().enumerate() {
        render_result(out, task, result, report.is_selected(i));
    }
}

pub fn render(report: &TrainingReport) -> String {
    let mut out = String::new();
    let stats = &report.dataset;
    let _ = writeln!(
        out,
        "seed {} | schema {} | policy {:?} | trimester strategy {:?}",
        report.seed, report.schema, report.policy, report.trimester_strategy
    );
    let _ = writeln!(
        out,
        "dataset: {} examples ({} train / {} test), {} pregnant, {} not pregnant",
        stats.total, stats.train, stats.test, stats.pregnant, stats.not_pregnant
    );
    if !report.degenerate_features.is_empty() {
        let _ = writeln!(
            out,
            "constant features (scaled by 1): {:?}",
            report.degenerate_features
        );
    }
    out.push('\n');

    render_task(&mut out, "pregnancy", &report.pregnancy);
    match &report.trimester {
        Some(trimester) => render_task(&mut out, "trimester", trimester),
        None => out.push_str("== trimester ==\n  not trained: dataset has no trimester labels\n"),
    }
    out
}
