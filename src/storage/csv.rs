//! CSV export for workflow history.

use std::io::Write;
use std::path::Path;

use crate::HistoryError;
use crate::core::WorkflowRecord;

/// CSV column headers, in store field order.
pub const CSV_HEADERS: &[&str] = &[
    "workflow_name",
    "date",
    "duration_seconds",
    "timestamp",
    "status",
    "error_message",
];

/// CSV exporter for workflow records.
///
/// One row per record; multi-line error messages are quoted by the writer.
#[derive(Debug, Clone, Default)]
pub struct CsvExporter;

impl CsvExporter {
    pub fn new() -> Self {
        CsvExporter
    }

    /// Export records to a CSV file, creating parent directories as needed.
    pub fn export(&self, records: &[WorkflowRecord], output: &Path) -> Result<(), HistoryError> {
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    HistoryError::Message(format!("failed to create directory: {e}"))
                })?;
            }
        }

        let file = std::fs::File::create(output)
            .map_err(|e| HistoryError::Message(format!("failed to create file: {e}")))?;

        self.export_to_writer(records, file)
    }

    /// Export records to stdout.
    pub fn export_to_stdout(&self, records: &[WorkflowRecord]) -> Result<(), HistoryError> {
        let stdout = std::io::stdout();
        let handle = stdout.lock();
        self.export_to_writer(records, handle)
    }

    /// Export records to any writer implementing Write.
    pub fn export_to_writer<W: Write>(
        &self,
        records: &[WorkflowRecord],
        writer: W,
    ) -> Result<(), HistoryError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer
            .write_record(CSV_HEADERS)
            .map_err(|e| HistoryError::Message(format!("failed to write CSV headers: {e}")))?;

        for record in records {
            let row = self.record_to_row(record);
            csv_writer
                .write_record(&row)
                .map_err(|e| HistoryError::Message(format!("failed to write CSV row: {e}")))?;
        }

        csv_writer
            .flush()
            .map_err(|e| HistoryError::Message(format!("failed to flush CSV writer: {e}")))?;

        Ok(())
    }

    fn record_to_row(&self, record: &WorkflowRecord) -> Vec<String> {
        vec![
            record.workflow_name.clone(),
            record.date_string(),
            format!("{:.3}", record.duration_seconds),
            record.timestamp_string(),
            record.status.as_str().to_string(),
            record.error_message.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn make_failure(message: &str) -> WorkflowRecord {
        WorkflowRecord::failure(
            "Load",
            date!(2024 - 01 - 15),
            42.25,
            datetime!(2024-01-15 02:10:00 UTC),
            message,
        )
    }

    #[test]
    fn test_record_to_row_length() {
        let exporter = CsvExporter::new();
        let row = exporter.record_to_row(&make_failure("disk full"));
        assert_eq!(row.len(), CSV_HEADERS.len());
        assert_eq!(
            row,
            vec![
                "Load",
                "2024-01-15",
                "42.250",
                "2024-01-15T02:10:00Z",
                "error",
                "disk full"
            ]
        );
    }

    #[test]
    fn test_export_to_writer_quotes_multiline_messages() {
        let exporter = CsvExporter::new();
        let mut buffer = Vec::new();
        exporter
            .export_to_writer(&[make_failure("disk full\nretry failed")], &mut buffer)
            .unwrap();

        let csv_str = String::from_utf8(buffer).unwrap();
        assert!(csv_str.starts_with("workflow_name,date,duration_seconds"));
        assert!(csv_str.contains("\"disk full\nretry failed\""));
    }

    #[test]
    fn test_export_empty_records() {
        let exporter = CsvExporter::new();

        let mut buffer = Vec::new();
        exporter.export_to_writer(&[], &mut buffer).unwrap();

        let csv_str = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = csv_str.lines().collect();
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_export_to_file_creates_parent() {
        let exporter = CsvExporter::new();
        let dir = tempfile::tempdir().unwrap();
        let output_path = dir.path().join("nested").join("history.csv");

        exporter.export(&[make_failure("boom")], &output_path).unwrap();

        let contents = std::fs::read_to_string(&output_path).unwrap();
        assert!(contents.contains("Load"));
        assert!(contents.contains("boom"));
    }
}
