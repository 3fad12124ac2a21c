use std::fmt;

use chrono::{NaiveDate, SecondsFormat, Utc};
use serde::Serialize;

use crate::core::{SimulatorInputs, TimelineRow};

pub const CSV_HEADER: [&str; 12] = [
    "year",
    "applicant_age",
    "spouse_age",
    "income",
    "public_pension_applicant",
    "public_pension_spouse",
    "private_annuity",
    "spending",
    "child_cost",
    "mortgage",
    "net_cash_flow",
    "end_balance",
];

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ExportKind {
    Csv,
    Json,
}

impl ExportKind {
    pub fn content_type(self) -> &'static str {
        match self {
            ExportKind::Csv => "text/csv; charset=utf-8",
            ExportKind::Json => "application/json",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportEnvelope<'a> {
    inputs: &'a SimulatorInputs,
    timeline: &'a [TimelineRow],
    exported_at: String,
}

// Header plus one line per row, joined with `\n` and no trailing newline.
pub fn to_csv(timeline: &[TimelineRow]) -> String {
    let mut lines = Vec::with_capacity(timeline.len() + 1);
    lines.push(CSV_HEADER.join(","));
    lines.extend(timeline.iter().map(|row| CsvRow(row).to_string()));
    lines.join("\n")
}

struct CsvRow<'a>(&'a TimelineRow);

impl fmt::Display for CsvRow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let row = self.0;
        write!(f, "{},{},", row.year, row.age_primary)?;
        if let Some(age) = row.age_spouse {
            write!(f, "{age}")?;
        }
        write!(
            f,
            ",{},{},{},{},{},{},{},{},{}",
            row.income,
            row.pensions_public,
            row.pensions_public_spouse,
            row.annuities_private,
            row.spending,
            row.child_cost,
            row.mortgage,
            row.net_cash_flow,
            row.end_balance
        )
    }
}

pub fn to_json(
    timeline: &[TimelineRow],
    inputs: &SimulatorInputs,
) -> Result<String, serde_json::Error> {
    let envelope = ExportEnvelope {
        inputs,
        timeline,
        exported_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    };
    serde_json::to_string_pretty(&envelope)
}

pub fn export_file_name(kind: ExportKind, date: NaiveDate) -> String {
    let stamp = date.format("%Y-%m-%d");
    match kind {
        ExportKind::Csv => format!("pension-timeline-{stamp}.csv"),
        ExportKind::Json => format!("pension-data-{stamp}.json"),
    }
}
