//! Text and JSON rendering of evaluation reports.

use gc_optimizer::EvaluationReport;
use gc_types::GcResult;
use std::fmt::Write;

/// Render the ranking as an aligned text table, ranking metric first.
pub fn render_table(report: &EvaluationReport) -> String {
    let ranking = &report.ranking;

    let mut metrics = vec![ranking.metric.clone()];
    if let Some(first) = ranking.entries.first() {
        metrics.extend(
            first
                .result
                .means
                .keys()
                .filter(|name| **name != ranking.metric)
                .cloned(),
        );
    }

    let mut header = vec!["rank".to_string(), "configuration".to_string()];
    header.extend(metrics.iter().cloned());
    header.push("failed".to_string());

    let rows: Vec<Vec<String>> = ranking
        .iter()
        .map(|entry| {
            let mut row = vec![entry.rank.to_string(), entry.configuration.to_string()];
            row.extend(metrics.iter().map(|m| match entry.score(m) {
                Some(value) => format!("{value:.4}"),
                None => "-".to_string(),
            }));
            row.push(format!("{}/{}", entry.result.failed_folds, report.folds));
            row
        })
        .collect();

    let widths: Vec<usize> = (0..header.len())
        .map(|col| {
            rows.iter()
                .map(|row| row[col].len())
                .chain(std::iter::once(header[col].len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Experiment '{}' ({}, {} by {}): {} configurations x {} folds, {} tasks failed",
        report.status.name,
        report.status.id,
        ranking.mode,
        ranking.metric,
        ranking.len(),
        report.folds,
        report.status.tasks_failed
    );
    for line in std::iter::once(&header).chain(rows.iter()) {
        let cells: Vec<String> = line
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(col, (cell, width))| {
                // configuration column is left aligned, numbers right aligned
                if col == 1 {
                    format!("{cell:<width$}")
                } else {
                    format!("{cell:>width$}")
                }
            })
            .collect();
        let _ = writeln!(out, "{}", cells.join("  ").trim_end());
    }
    out
}

pub fn render_json(report: &EvaluationReport) -> GcResult<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
