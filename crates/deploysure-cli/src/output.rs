//! Rendering and export of result tables

use anyhow::Result;
use chrono::NaiveDateTime;
use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use deploysure_core::ResultTable;
use deploysure_engine::ResultKind;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned columns with a banner
    Table,
    Json,
    Csv,
}

/// Prints result tables and writes them to the export directory
pub struct Printer {
    pub format: OutputFormat,
    pub export_dir: Option<PathBuf>,
    /// One timestamp per invocation, shared by every exported file
    pub exported_at: NaiveDateTime,
}

impl Printer {
    /// Banners, notices and summaries only appear in table format
    pub fn is_human(&self) -> bool {
        self.format == OutputFormat::Table
    }

    pub fn banner(&self, title: &str) {
        if !self.is_human() {
            return;
        }
        println!("\n{}", "=".repeat(60).bright_blue());
        println!("{}", title.bold().bright_blue());
        println!("{}", "=".repeat(60).bright_blue());
    }

    pub fn note(&self, line: impl std::fmt::Display) {
        if self.is_human() {
            println!("{}", line);
        }
    }

    /// Print a table; with an export directory, also write it as CSV
    pub fn emit(&self, kind: Option<ResultKind>, table: &ResultTable) -> Result<()> {
        match self.format {
            OutputFormat::Table => print_table(table),
            OutputFormat::Json => println!("{}", table.to_json()?),
            OutputFormat::Csv => print!("{}", table.to_csv()?),
        }

        if let (Some(kind), Some(dir)) = (kind, &self.export_dir) {
            let path = table.write_csv(dir, kind.export_prefix(), &self.exported_at)?;
            tracing::info!(path = %path.display(), "Exported");
            if self.is_human() {
                println!("{} {}", "Exported to:".green(), path.display());
            }
        }

        Ok(())
    }
}

/// Width of each column: the longest of header and cells, in characters
pub fn column_widths(table: &ResultTable) -> Vec<usize> {
    let mut widths: Vec<usize> = table.columns.iter().map(|c| c.chars().count()).collect();
    for row in &table.rows {
        for (idx, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(idx) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }
    widths
}

fn pad(cell: &str, width: usize) -> String {
    format!("{:<width$}", cell, width = width)
}

/// Colour status cells; padding is applied first so columns stay aligned
fn paint(cell: &str, padded: String) -> ColoredString {
    match cell {
        "PASS" | "Pass" | "Match" | "Success" | "Good" => padded.green(),
        "FAIL" | "Fail" | "Mismatch" | "Poor" => padded.red().bold(),
        "ERROR" | "Partial" | "Warning" => padded.yellow().bold(),
        _ if cell.starts_with("ERROR") || cell.starts_with("Scan error") => padded.yellow(),
        _ => padded.normal(),
    }
}

fn print_table(table: &ResultTable) {
    println!();
    println!("{}", table.title.bold());

    if table.is_empty() {
        println!("  {}", "(no rows)".dimmed());
        return;
    }

    let widths = column_widths(table);

    let header: Vec<String> = table
        .columns
        .iter()
        .zip(&widths)
        .map(|(name, width)| pad(name, *width))
        .collect();
    println!("  {}", header.join("  ").bold());

    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    println!("  {}", rule.join("  ").dimmed());

    for row in &table.rows {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| paint(cell, pad(cell, *width)).to_string())
            .collect();
        println!("  {}", cells.join("  "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn table() -> ResultTable {
        let mut table = ResultTable::new(
            "KPI Results",
            vec!["KPI".to_string(), "Status".to_string()],
        );
        table.push_row(vec!["Order Count".to_string(), "Match".to_string()]);
        table.push_row(vec!["Revenue".to_string(), "Mismatch".to_string()]);
        table
    }

    #[test]
    fn widths_cover_headers_and_cells() {
        assert_eq!(column_widths(&table()), vec![11, 8]);
    }

    #[test]
    fn export_uses_kind_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let printer = Printer {
            format: OutputFormat::Csv,
            export_dir: Some(dir.path().to_path_buf()),
            exported_at: NaiveDate::from_ymd_opt(2024, 12, 31)
                .unwrap()
                .and_hms_opt(23, 59, 1)
                .unwrap(),
        };

        printer.emit(Some(ResultKind::KpiResults), &table()).unwrap();
        printer.emit(None, &table()).unwrap();

        let files: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(files, vec!["kpi_results_20241231_235901.csv"]);
    }
}
