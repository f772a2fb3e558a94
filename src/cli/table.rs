//! Table formatting utilities for CLI list commands
//!
//! Rows are built from typed cells so each output format can render the
//! same data: aligned and colored for terminals (tsv), markdown via
//! `tabled`, or bare ids for piping.

use chrono::{DateTime, Local, NaiveDate, Utc};
use console::style;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::truncate_str;
use crate::cli::OutputFormat;
use crate::entities::action::ActionStatus;

/// Configuration for table output
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// Show summary line after table (e.g., "5 action(s) found")
    pub show_summary: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self { show_summary: true }
    }
}

impl TableConfig {
    /// Create config optimized for piping (no summary)
    pub fn for_pipe() -> Self {
        Self {
            show_summary: false,
        }
    }
}

/// A typed cell value with semantic meaning for formatting
#[derive(Debug, Clone)]
pub enum CellValue {
    /// Record ID (truncated, cyan colored)
    Id(String),
    /// Plain text, truncated to the column width
    Text(String),
    /// Action status with color coding
    Status(ActionStatus),
    /// Free-form state label (needs_review, recurrence, ...)
    Label(String),
    /// Similarity score with color coding
    Score(f64),
    /// DateTime displayed as date only
    Date(DateTime<Utc>),
    /// Due date, red when overdue
    Due(Option<NaiveDate>, bool),
    /// Numeric value
    Number(i64),
    /// Empty/placeholder
    Empty,
}

impl CellValue {
    /// Format for TSV output (with colors if terminal)
    pub fn format_tsv(&self, width: usize) -> String {
        match self {
            CellValue::Id(id) => {
                let display = if id.len() > 16 {
                    format!("{}...", &id[..13])
                } else {
                    id.clone()
                };
                format!("{:<width$}", style(&display).cyan(), width = width)
            }
            CellValue::Text(s) => {
                let truncated = truncate_str(s, width.saturating_sub(2));
                format!("{:<width$}", truncated, width = width)
            }
            CellValue::Status(status) => {
                let s = status.to_string();
                let styled = match status {
                    ActionStatus::Open => style(&s).white(),
                    ActionStatus::InProgress => style(&s).yellow(),
                    ActionStatus::EvidenceSubmitted => style(&s).cyan(),
                    ActionStatus::Verified => style(&s).green(),
                    ActionStatus::Rejected => style(&s).red().bold(),
                };
                format!("{:<width$}", styled, width = width)
            }
            CellValue::Label(s) => {
                let styled = match s.as_str() {
                    "needs_review" | "recurrence" => style(s).yellow(),
                    "extracted" => style(s).green(),
                    _ => style(s).dim(),
                };
                format!("{:<width$}", styled, width = width)
            }
            CellValue::Score(score) => {
                let s = format!("{:.2}", score);
                let styled = if *score >= 0.6 {
                    style(s).red().bold()
                } else if *score >= 0.3 {
                    style(s).yellow()
                } else {
                    style(s).dim()
                };
                format!("{:>width$}", styled, width = width)
            }
            CellValue::Date(dt) => {
                let local: DateTime<Local> = dt.with_timezone(&Local);
                format!("{:<width$}", local.format("%Y-%m-%d"), width = width)
            }
            CellValue::Due(due, overdue) => match due {
                Some(date) if *overdue => {
                    format!("{:<width$}", style(date).red().bold(), width = width)
                }
                Some(date) => format!("{:<width$}", date, width = width),
                None => format!("{:<width$}", style("-").dim(), width = width),
            },
            CellValue::Number(n) => {
                format!("{:>width$}", n, width = width)
            }
            CellValue::Empty => format!("{:<width$}", "-", width = width),
        }
    }

    /// Get raw string value (no formatting, for markdown and IDs)
    pub fn raw(&self) -> String {
        match self {
            CellValue::Id(id) => id.clone(),
            CellValue::Text(s) | CellValue::Label(s) => s.clone(),
            CellValue::Status(status) => status.to_string(),
            CellValue::Score(score) => format!("{:.2}", score),
            CellValue::Date(dt) => {
                let local: DateTime<Local> = dt.with_timezone(&Local);
                local.format("%Y-%m-%d").to_string()
            }
            CellValue::Due(due, _) => due.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
            CellValue::Number(n) => n.to_string(),
            CellValue::Empty => "-".to_string(),
        }
    }

    /// Get the display width of this cell's content (for dynamic column sizing)
    pub fn display_width(&self) -> usize {
        match self {
            CellValue::Id(id) => id.len().min(16), // IDs are truncated to 16
            CellValue::Text(s) | CellValue::Label(s) => s.chars().count(),
            CellValue::Status(status) => status.to_string().len(),
            CellValue::Score(_) => 4,
            CellValue::Date(_) => 10, // "YYYY-MM-DD"
            CellValue::Due(due, _) => due.map_or(1, |_| 10),
            CellValue::Number(n) => n.to_string().len(),
            CellValue::Empty => 1,
        }
    }
}

/// Column definition with header label and maximum width
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub key: &'static str,
    pub header: &'static str,
    pub width: usize,
}

impl ColumnDef {
    pub const fn new(key: &'static str, header: &'static str, width: usize) -> Self {
        Self { key, header, width }
    }
}

/// A row of cell values for table output
pub struct TableRow {
    pub full_id: String,
    pub cells: Vec<(&'static str, CellValue)>,
}

impl TableRow {
    pub fn new(full_id: String) -> Self {
        Self {
            full_id,
            cells: Vec::new(),
        }
    }

    pub fn cell(mut self, key: &'static str, value: CellValue) -> Self {
        self.cells.push((key, value));
        self
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.cells.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }
}

/// Table formatter that outputs rows in various formats
pub struct TableFormatter<'a> {
    columns: &'a [ColumnDef],
    entity_name: &'static str,
    config: TableConfig,
}

impl<'a> TableFormatter<'a> {
    pub fn new(columns: &'a [ColumnDef], entity_name: &'static str) -> Self {
        Self {
            columns,
            entity_name,
            config: TableConfig::default(),
        }
    }

    /// Configure the formatter with custom settings
    pub fn with_config(mut self, config: TableConfig) -> Self {
        self.config = config;
        self
    }

    /// Output rows in the specified format
    pub fn output<I>(&self, rows: I, format: OutputFormat)
    where
        I: IntoIterator<Item = TableRow>,
    {
        let rows: Vec<TableRow> = rows.into_iter().collect();

        match format {
            OutputFormat::Md => self.output_md(&rows),
            OutputFormat::Id => self.output_ids(&rows),
            _ => self.output_tsv(&rows),
        }
    }

    /// Calculate dynamic column widths based on actual content
    fn calculate_widths(&self, rows: &[TableRow]) -> Vec<usize> {
        self.columns
            .iter()
            .map(|col| {
                let max_content = rows
                    .iter()
                    .filter_map(|r| r.get(col.key))
                    .map(|v| v.display_width())
                    .max()
                    .unwrap_or(0);
                // +2 for the truncation buffer, capped at the defined width
                col.header.len().max(max_content + 2).min(col.width)
            })
            .collect()
    }

    fn output_tsv(&self, rows: &[TableRow]) {
        let widths = self.calculate_widths(rows);

        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(col, w)| format!("{:<width$}", style(col.header).bold(), width = w))
            .collect();
        println!("{}", header.join(" "));

        let total_width: usize = widths.iter().sum::<usize>() + widths.len().saturating_sub(1);
        println!("{}", "-".repeat(total_width));

        for row in rows {
            let parts: Vec<String> = self
                .columns
                .iter()
                .zip(&widths)
                .map(|(col, w)| match row.get(col.key) {
                    Some(value) => value.format_tsv(*w),
                    None => format!("{:<width$}", "-", width = w),
                })
                .collect();
            println!("{}", parts.join(" "));
        }

        if self.config.show_summary {
            println!();
            println!("{} {}(s) found.", style(rows.len()).cyan(), self.entity_name);
        }
    }

    fn output_md(&self, rows: &[TableRow]) {
        let mut builder = Builder::default();
        builder.push_record(self.columns.iter().map(|c| c.header.to_string()));
        for row in rows {
            builder.push_record(self.columns.iter().map(|col| {
                row.get(col.key)
                    .map(|v| v.raw().replace('|', "\\|"))
                    .unwrap_or_else(|| "-".to_string())
            }));
        }
        println!("{}", builder.build().with(Style::markdown()));
    }

    fn output_ids(&self, rows: &[TableRow]) {
        for row in rows {
            println!("{}", row.full_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_values() {
        assert_eq!(CellValue::Score(0.4045).raw(), "0.40");
        assert_eq!(CellValue::Due(None, false).raw(), "-");
        assert_eq!(
            CellValue::Due(NaiveDate::from_ymd_opt(2026, 2, 8), true).raw(),
            "2026-02-08"
        );
        assert_eq!(CellValue::Status(ActionStatus::InProgress).raw(), "in_progress");
    }

    #[test]
    fn test_widths_follow_content() {
        const COLUMNS: &[ColumnDef] = &[
            ColumnDef::new("id", "ID", 17),
            ColumnDef::new("description", "DESCRIPTION", 40),
        ];
        let formatter = TableFormatter::new(COLUMNS, "action");
        let rows = vec![TableRow::new("ACT-1".to_string())
            .cell("id", CellValue::Id("ACT-1".to_string()))
            .cell("description", CellValue::Text("x".repeat(60)))];

        assert_eq!(formatter.calculate_widths(&rows), vec![7, 40]);
        assert_eq!(formatter.calculate_widths(&[]), vec![2, 11]);
    }
}
