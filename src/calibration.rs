use std::fs::File;
use std::path::Path;

use csv::{ReaderBuilder, Writer};
use log::info;

use crate::error::{Error, Result};
use crate::units::{FieldRatio, Frequency};

// ---------------------------------------------------------------------------
// Ratio scale of the source table
// ---------------------------------------------------------------------------

/// Unit scale of the ratio column in a calibration CSV.
///
/// Normalization happens exactly once, at load; lookups always return the
/// canonical mT/mV scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatioScale {
    /// Canonical scale: mT/mV, stored verbatim.
    MilliteslaPerMillivolt,
    /// Legacy MC90R sheets: mG/mV, divided by 10^4 at load.
    MilligaussPerMillivolt,
}

// ---------------------------------------------------------------------------
// CalibrationTable
// ---------------------------------------------------------------------------

/// One (frequency, response-ratio) row of a calibration table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationRow {
    pub frequency: Frequency,
    pub ratio: FieldRatio,
}

/// An empirically determined, frequency-indexed table of sensor response
/// ratios. Immutable after load; rows are unique and sorted ascending by
/// frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationTable {
    rows: Vec<CalibrationRow>,
}

impl CalibrationTable {
    /// Build a table from rows, sorting them ascending and rejecting
    /// duplicate frequencies.
    pub fn from_rows(mut rows: Vec<CalibrationRow>) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::CalibrationFormat(
                "table has no data rows".to_string(),
            ));
        }
        rows.sort_by(|a, b| a.frequency.khz().total_cmp(&b.frequency.khz()));
        for pair in rows.windows(2) {
            if pair[0].frequency == pair[1].frequency {
                return Err(Error::CalibrationFormat(format!(
                    "duplicate frequency {}",
                    pair[0].frequency
                )));
            }
        }
        Ok(CalibrationTable { rows })
    }

    /// Load a calibration CSV: a header row, then exactly two columns
    /// (frequency in kHz, field-per-volt ratio in `scale` units).
    pub fn from_csv_path(path: &Path, scale: RatioScale) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);

        let headers = reader
            .headers()
            .map_err(|e| Error::CalibrationFormat(format!("unreadable header row: {e}")))?;
        if headers.len() != 2 {
            return Err(Error::CalibrationFormat(format!(
                "expected 2 columns (frequency, ratio), found {}",
                headers.len()
            )));
        }

        let mut rows = Vec::new();
        for (row_no, result) in reader.records().enumerate() {
            let record = result
                .map_err(|e| Error::CalibrationFormat(format!("row {}: {e}", row_no + 2)))?;
            let frequency = parse_column(&record, 0, row_no, "frequency")?;
            let raw_ratio = parse_column(&record, 1, row_no, "ratio")?;
            let ratio = match scale {
                RatioScale::MilliteslaPerMillivolt => FieldRatio(raw_ratio),
                RatioScale::MilligaussPerMillivolt => {
                    FieldRatio::from_legacy_milligauss(raw_ratio)
                }
            };
            rows.push(CalibrationRow {
                frequency: Frequency::from_khz(frequency),
                ratio,
            });
        }

        let table = Self::from_rows(rows)?;
        info!(
            "loaded {} calibration rows from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Look up the response ratio at exactly `target`.
    ///
    /// Exact-match only: a target that merely falls between two table rows
    /// fails, even when it is numerically close to one of them.
    // TODO: linear interpolation between the bracketing rows.
    pub fn lookup(&self, target: Frequency) -> Result<FieldRatio> {
        self.rows
            .iter()
            .find(|row| row.frequency == target)
            .map(|row| row.ratio)
            .ok_or(Error::CalibrationLookup { frequency: target })
    }

    /// Re-export the table in canonical units with the canonical header,
    /// so a legacy sheet can be converted once and reused.
    pub fn write_csv_path(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        self.write_rows(file)
            .map_err(|e| Error::CalibrationFormat(format!("writing {}: {e}", path.display())))?;
        info!("wrote {} calibration rows to {}", self.len(), path.display());
        Ok(())
    }

    fn write_rows<W: std::io::Write>(&self, out: W) -> csv::Result<()> {
        let mut writer = Writer::from_writer(out);
        writer.write_record(["Freq (kHz)", "Field/Vo (mT/mV)"])?;
        for row in &self.rows {
            writer.write_record([
                row.frequency.khz().to_string(),
                row.ratio.0.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn rows(&self) -> &[CalibrationRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn parse_column(record: &csv::StringRecord, col: usize, row_no: usize, name: &str) -> Result<f64> {
    let cell = record.get(col).ok_or_else(|| {
        Error::CalibrationFormat(format!("row {}: missing {name} column", row_no + 2))
    })?;
    cell.trim().parse::<f64>().map_err(|_| {
        Error::CalibrationFormat(format!(
            "row {}: {name} {cell:?} is not a number",
            row_no + 2
        ))
    })
}
