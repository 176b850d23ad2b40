//! Output surfaces: terminal text, pretty JSON, CSV.

use anyhow::{Context, Result};
use clap::ValueEnum;
use loot_core::summary::{count, money};
use loot_core::{FieldValue, FileSummary};
use loot_ingest::FileOutcome;
use serde::Serialize;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

pub fn render(outcomes: &[FileOutcome], format: OutputFormat, show_raw: bool) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(outcomes, show_raw)),
        OutputFormat::Json => render_json(outcomes),
        OutputFormat::Csv => render_csv(outcomes),
    }
}

fn write_raw_fields(out: &mut String, summary: &FileSummary) {
    let _ = writeln!(out, "  Fields:");
    for field in summary.raw_fields.values() {
        match &field.value {
            FieldValue::Table(t) => {
                let _ = writeln!(out, "    {}: table, {} rows [{}]", field.name, t.len(), t.columns().join(", "));
            }
            value => {
                let _ = writeln!(out, "    {}: {} ({:.2})", field.name, value.display(), field.confidence);
            }
        }
    }
}

fn write_tables(out: &mut String, summary: &FileSummary) {
    let _ = writeln!(out, "  Tables:");
    for t in &summary.tables {
        let _ = writeln!(
            out,
            "    {} ({:?}): {} balance samples, avg {}, deposits {} totaling {}",
            t.name,
            t.role,
            t.balance_samples,
            money(t.average_balance),
            count(t.deposit_count),
            money(t.total_deposits)
        );
    }
}

pub fn render_text(outcomes: &[FileOutcome], show_raw: bool) -> String {
    let mut out = String::new();
    for outcome in outcomes {
        let _ = writeln!(out, "== {} ==", outcome.file_name());
        match outcome {
            FileOutcome::Summary(s) => {
                let _ = writeln!(out, "  Template: {}", s.template);
                for (label, value) in s.metric_rows() {
                    let _ = writeln!(out, "  {:<24} {}", label, value);
                }
                if !s.tables.is_empty() {
                    write_tables(&mut out, s);
                }
                for note in &s.notes {
                    let _ = writeln!(out, "  note: {}", note);
                }
                if show_raw {
                    write_raw_fields(&mut out, s);
                }
            }
            FileOutcome::Failed(f) => {
                let _ = writeln!(out, "  FAILED ({:?}): {}", f.kind, f.message);
            }
        }
        out.push('\n');
    }

    let failed = outcomes.iter().filter(|o| o.summary().is_none()).count();
    let _ = writeln!(out, "{} file(s), {} failed", outcomes.len(), failed);
    out
}

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    files: &'a [FileOutcome],
}

pub fn render_json(outcomes: &[FileOutcome]) -> Result<String> {
    let report = JsonReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        files: outcomes,
    };
    serde_json::to_string_pretty(&report).context("serialize JSON report")
}

#[derive(Serialize)]
struct CsvRow<'a> {
    file_name: &'a str,
    status: &'static str,
    template: Option<&'a str>,
    total_deposits: Option<f64>,
    deposit_count: Option<u32>,
    total_balance: Option<f64>,
    average_balance: Option<f64>,
    negative_days: Option<u32>,
    negative_day_pct: Option<f64>,
    notes: String,
    error: Option<&'a str>,
}

impl<'a> From<&'a FileOutcome> for CsvRow<'a> {
    fn from(outcome: &'a FileOutcome) -> Self {
        match outcome {
            FileOutcome::Summary(s) => CsvRow {
                file_name: &s.file_name,
                status: "summary",
                template: Some(&s.template),
                total_deposits: s.total_deposits,
                deposit_count: s.deposit_count,
                total_balance: s.total_balance,
                average_balance: s.average_balance,
                negative_days: s.negative_days,
                negative_day_pct: s.negative_day_pct,
                notes: s.notes.join("; "),
                error: None,
            },
            FileOutcome::Failed(f) => CsvRow {
                file_name: &f.file_name,
                status: "failed",
                template: None,
                total_deposits: None,
                deposit_count: None,
                total_balance: None,
                average_balance: None,
                negative_days: None,
                negative_day_pct: None,
                notes: String::new(),
                error: Some(&f.message),
            },
        }
    }
}

pub fn render_csv(outcomes: &[FileOutcome]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for outcome in outcomes {
        wtr.serialize(CsvRow::from(outcome)).context("write CSV row")?;
    }
    let bytes = wtr.into_inner().context("flush CSV")?;
    String::from_utf8(bytes).context("CSV is not UTF-8")
}
