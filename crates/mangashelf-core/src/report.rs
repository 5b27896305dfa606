//! Batch input and report output (CSV).
//!
//! Input is one title (or identifier) per record with no header. The report
//! is a two-column CSV, optionally headed, flushed after every row, so rows
//! already written survive an aborted run.

use anyhow::{Context, Result};
use std::io::{Read, Write};

/// Read single-field records. Any record with a different field count fails
/// the whole batch.
pub fn read_single_column<R: Read>(input: R) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input);

    let mut records = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.context("error reading csv input")?;
        if record.len() != 1 {
            anyhow::bail!(
                "expected row of length 1, got {} (record {})",
                record.len(),
                i + 1
            );
        }
        records.push(record[0].to_string());
    }
    Ok(records)
}

/// Two-column report writer.
pub struct ReportWriter<W: Write> {
    inner: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    /// Create a writer, emitting `header` as the first row when given.
    pub fn new(output: W, header: Option<[&str; 2]>) -> Result<Self> {
        let mut w = ReportWriter {
            inner: csv::Writer::from_writer(output),
        };
        if let Some([first, second]) = header {
            w.write_record(first, second)
                .context("error writing header")?;
        }
        Ok(w)
    }

    /// Write one `(title, status)` row and flush it.
    pub fn write_row(&mut self, title: &str, status: &str) -> Result<()> {
        self.write_record(title, status)
            .context("error writing CSV row")
    }

    /// Flush and return the underlying writer.
    pub fn finish(self) -> Result<W> {
        self.inner
            .into_inner()
            .map_err(|e| anyhow::anyhow!("error flushing csv writer: {}", e.error()))
    }

    fn write_record(&mut self, first: &str, second: &str) -> Result<()> {
        self.inner.write_record([first, second])?;
        self.inner.flush()?;
        Ok(())
    }
}
