//! Per-row outcome table for the --report flag

use prettytable::{format, Cell, Row, Table};
use std::path::Path;

use crate::card::{CardOutcome, CardResult, SkipReason};
use crate::utils::format_duration;

/// One line of the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub row: String,
    pub name: String,
    pub output: String,
    pub status: String,
    pub profile: String,
    pub time: String,
}

impl ReportEntry {
    pub fn from_result(result: &CardResult) -> Self {
        let (status, profile) = match &result.outcome {
            Ok(CardOutcome::Rendered {
                has_profile,
                face_found,
                saved,
            }) => {
                let status = if *saved { "Written" } else { "Dry run" };
                let profile = match (has_profile, face_found) {
                    (false, _) => "none",
                    (true, true) => "face",
                    (true, false) => "centered",
                };
                (status.to_string(), profile.to_string())
            }
            Ok(CardOutcome::Skipped(SkipReason::OutputExists)) => ("Skipped (exists)".to_string(), "-".to_string()),
            Err(e) => (format!("Failed: {}", root_cause(e)), "-".to_string()),
        };

        Self {
            row: result.row.to_string(),
            name: result.name.clone(),
            output: file_name(&result.output_path),
            status,
            profile,
            time: format_duration(result.duration),
        }
    }
}

fn root_cause(e: &anyhow::Error) -> String {
    e.root_cause().to_string()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("-")
        .to_string()
}

/// Complete batch report
#[derive(Debug, Default)]
pub struct BatchReport {
    pub entries: Vec<ReportEntry>,
}

impl BatchReport {
    pub fn new(results: &[CardResult]) -> Self {
        Self {
            entries: results.iter().map(ReportEntry::from_result).collect(),
        }
    }

    pub fn table(&self) -> Table {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BOX_CHARS);

        table.add_row(Row::new(vec![
            Cell::new("Row"),
            Cell::new("Name"),
            Cell::new("Output"),
            Cell::new("Status"),
            Cell::new("Profile"),
            Cell::new("Time"),
        ]));

        for entry in &self.entries {
            table.add_row(Row::new(vec![
                Cell::new(&entry.row),
                Cell::new(&entry.name),
                Cell::new(&entry.output),
                Cell::new(&entry.status),
                Cell::new(&entry.profile),
                Cell::new(&entry.time),
            ]));
        }

        table
    }

    /// Print the report as a formatted table
    pub fn print(&self) {
        println!("\nCARDS ({} rows)\n", self.entries.len());
        self.table().printstd();
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    fn result(row: usize, outcome: anyhow::Result<CardOutcome>) -> CardResult {
        CardResult {
            row,
            name: "Jane Doe".to_string(),
            output_path: PathBuf::from("cards/Jane_Doe_card.png"),
            duration: Duration::from_millis(5),
            outcome,
        }
    }

    #[test]
    fn test_entries() {
        let results = vec![
            result(
                1,
                Ok(CardOutcome::Rendered {
                    has_profile: true,
                    face_found: true,
                    saved: true,
                }),
            ),
            result(
                2,
                Ok(CardOutcome::Rendered {
                    has_profile: false,
                    face_found: false,
                    saved: false,
                }),
            ),
            result(3, Ok(CardOutcome::Skipped(SkipReason::OutputExists))),
            result(4, Err(anyhow::anyhow!("too long").context("Row 4"))),
        ];

        let report = BatchReport::new(&results);

        assert_eq!(report.entries[0].status, "Written");
        assert_eq!(report.entries[0].profile, "face");
        assert_eq!(report.entries[0].output, "Jane_Doe_card.png");
        assert_eq!(report.entries[1].status, "Dry run");
        assert_eq!(report.entries[1].profile, "none");
        assert_eq!(report.entries[2].status, "Skipped (exists)");
        assert_eq!(report.entries[3].status, "Failed: too long");
        assert_eq!(report.entries[3].time, "5ms");
    }

    #[test]
    fn test_table_has_header_and_rows() {
        let results = vec![result(1, Err(anyhow::anyhow!("bad row")))];
        let table = BatchReport::new(&results).table();
        assert_eq!(table.len(), 2);
    }
}
