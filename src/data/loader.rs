use std::fs::File;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use log::{debug, info};

use crate::config::TraceFormat;
use crate::error::{Error, Result};
use crate::units::Volts;

use super::model::{Channel, RawTrace, SpectrumTrace};

// Fixed cell positions in TDS2022B-style headerless exports (0-based).
// Spreadsheet cell B10 holds the vertical offset.
const POSITIONAL_OFFSET_ROW: usize = 9;
const POSITIONAL_OFFSET_COL: usize = 1;
const POSITIONAL_TIME_COL: usize = 3;
const POSITIONAL_VOLTS_COL: usize = 4;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a scope export into a [`RawTrace`]. Dispatch by the explicitly
/// selected layout; file content is never sniffed.
pub fn load_trace(path: &Path, format: &TraceFormat) -> Result<RawTrace> {
    let trace = match *format {
        TraceFormat::Delimited { skip_rows } => load_delimited(path, skip_rows),
        TraceFormat::Positional { read_offset } => load_positional(path, read_offset),
    }?;
    info!(
        "loaded {} samples x {} channel(s) from {}",
        trace.len(),
        trace.channels.len(),
        path.display()
    );
    Ok(trace)
}

/// Load an SR770 spectrum-analyzer sweep: headerless two-column CSV of
/// (frequency Hz, voltage V).
pub fn load_spectrum(path: &Path) -> Result<SpectrumTrace> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .from_reader(open(path)?);

    let mut frequency = Vec::new();
    let mut volts = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|e| record_error(row_no + 1, e))?;
        if record.len() != 2 {
            return Err(Error::format(
                "2 columns (frequency, voltage)",
                format!("{} columns (row {})", record.len(), row_no + 1),
            ));
        }
        frequency.push(parse_cell(&record, 0, row_no + 1, "frequency")?);
        volts.push(parse_cell(&record, 1, row_no + 1, "voltage")?);
    }
    let trace = SpectrumTrace::new(frequency, volts)?;
    info!("loaded {} sweep points from {}", trace.len(), path.display());
    Ok(trace)
}

// ---------------------------------------------------------------------------
// Delimited layout (Tektronix MSO24 "ALL" export)
// ---------------------------------------------------------------------------

/// Skip `skip_rows` instrument-metadata records, then read a header row
/// naming a `TIME` column and `CH<n>` channel columns, then the samples.
///
/// Columns that are neither `TIME` nor `CH<n>` are dropped here, each with
/// a log line; they are never propagated downstream.
fn load_delimited(path: &Path, skip_rows: usize) -> Result<RawTrace> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(open(path)?);

    let mut records = reader.records();
    for skipped in 0..skip_rows {
        match records.next() {
            Some(result) => {
                result.map_err(|e| record_error(skipped + 1, e))?;
            }
            None => {
                return Err(Error::format(
                    format!("{skip_rows} metadata rows before the header"),
                    format!("end of file after {skipped} rows"),
                ));
            }
        }
    }

    let header = match records.next() {
        Some(result) => result.map_err(|e| record_error(skip_rows + 1, e))?,
        None => {
            return Err(Error::format(
                "a header row after the metadata block",
                "end of file",
            ));
        }
    };

    // Identify and canonicalize columns: TIME → t, CH<n> → V<n>.
    let mut time_col: Option<usize> = None;
    let mut channel_cols: Vec<(usize, u8)> = Vec::new();
    for (col, name) in header.iter().enumerate() {
        let name = name.trim();
        if name.eq_ignore_ascii_case("TIME") {
            if time_col.is_some() {
                return Err(Error::format(
                    "a single TIME column",
                    "more than one TIME column",
                ));
            }
            time_col = Some(col);
        } else if let Some(index) = channel_number(name) {
            if channel_cols.iter().any(|&(_, seen)| seen == index) {
                return Err(Error::format(
                    "unique channel columns",
                    format!("column CH{index} twice"),
                ));
            }
            channel_cols.push((col, index));
        } else {
            debug!("dropping unrecognized column {name:?}");
        }
    }

    let time_col = time_col.ok_or_else(|| {
        Error::format("a TIME column", format!("header {:?}", join_header(&header)))
    })?;
    if channel_cols.is_empty() {
        return Err(Error::format(
            "at least one CH<n> column",
            format!("header {:?}", join_header(&header)),
        ));
    }

    let mut time = Vec::new();
    let mut channels: Vec<Channel> = channel_cols
        .iter()
        .map(|&(_, index)| Channel {
            index,
            volts: Vec::new(),
        })
        .collect();
    let labels: Vec<String> = channels.iter().map(Channel::label).collect();

    for (data_row, result) in records.enumerate() {
        // 1-based line number in the file, past the preamble and header.
        let row_no = skip_rows + 2 + data_row;
        let record = result.map_err(|e| record_error(row_no, e))?;
        time.push(parse_cell(&record, time_col, row_no, "t")?);
        for (i, &(col, _)) in channel_cols.iter().enumerate() {
            let value = parse_cell(&record, col, row_no, &labels[i])?;
            channels[i].volts.push(value);
        }
    }

    // The MSO24 export carries no vertical-offset metadata; the config
    // value applies instead.
    RawTrace::new(time, channels, None)
}

/// Match a `CH<n>` channel label and extract its scope number.
fn channel_number(name: &str) -> Option<u8> {
    name.strip_prefix("CH")
        .and_then(|rest| rest.parse::<u8>().ok())
}

// ---------------------------------------------------------------------------
// Positional layout (Tektronix TDS2022B headerless export)
// ---------------------------------------------------------------------------

/// No header row; metadata lives in the leading cells of column 1 while
/// columns 3 and 4 carry time and voltage on every row. With `read_offset`
/// the vertical-offset cell (row 9, column 1) is extracted as well.
fn load_positional(path: &Path, read_offset: bool) -> Result<RawTrace> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(open(path)?);

    let mut time = Vec::new();
    let mut volts = Vec::new();
    let mut offset: Option<Volts> = None;

    for (row, result) in reader.records().enumerate() {
        let record = result.map_err(|e| record_error(row + 1, e))?;
        if record.len() <= POSITIONAL_VOLTS_COL {
            return Err(Error::format(
                format!("at least {} columns", POSITIONAL_VOLTS_COL + 1),
                format!("{} columns (row {})", record.len(), row + 1),
            ));
        }
        time.push(parse_cell(&record, POSITIONAL_TIME_COL, row + 1, "t")?);
        volts.push(parse_cell(&record, POSITIONAL_VOLTS_COL, row + 1, "V1")?);
        if read_offset && row == POSITIONAL_OFFSET_ROW {
            offset = Some(Volts(parse_cell(
                &record,
                POSITIONAL_OFFSET_COL,
                row + 1,
                "vertical offset",
            )?));
        }
    }

    if read_offset && offset.is_none() {
        return Err(Error::format(
            format!(
                "an offset cell at row {}, column {}",
                POSITIONAL_OFFSET_ROW + 1,
                POSITIONAL_OFFSET_COL + 1
            ),
            format!("only {} rows", time.len()),
        ));
    }

    RawTrace::new(time, vec![Channel { index: 1, volts }], offset)
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| Error::io(path, e))
}

fn parse_cell(record: &StringRecord, col: usize, row_no: usize, name: &str) -> Result<f64> {
    let cell = record.get(col).ok_or_else(|| {
        Error::format(
            format!("a {name} value in column {}", col + 1),
            format!("{} columns (row {row_no})", record.len()),
        )
    })?;
    cell.trim().parse::<f64>().map_err(|_| {
        Error::format(
            format!("a numeric {name} value"),
            format!("{cell:?} (row {row_no})"),
        )
    })
}

fn record_error(row_no: usize, err: csv::Error) -> Error {
    Error::format("a well-formed CSV record", format!("row {row_no}: {err}"))
}

fn join_header(header: &StringRecord) -> String {
    header.iter().collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn write_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    /// A minimal MSO24-style export: 13 metadata rows, header, samples.
    fn mso24_export() -> String {
        let mut text = String::new();
        for i in 0..13 {
            text.push_str(&format!("Model,MSO24,meta{i}\n"));
        }
        text.push_str("TIME,CH1,CH2,Peak Detect\n");
        text.push_str("0.0,0.10,10.0,x\n");
        text.push_str("1.0e-3,0.20,20.0,y\n");
        text.push_str("2.0e-3,0.30,30.0,z\n");
        text
    }

    #[test]
    fn delimited_parses_channels_and_drops_extras() {
        let file = write_file(&mso24_export());
        let trace = load_trace(
            file.path(),
            &TraceFormat::Delimited { skip_rows: 13 },
        )
        .unwrap();

        assert_eq!(trace.time, vec![0.0, 1.0e-3, 2.0e-3]);
        assert_eq!(trace.channel_indices(), vec![1, 2]);
        assert_eq!(trace.channel(2).unwrap().volts, vec![10.0, 20.0, 30.0]);
        // The MSO24 layout never carries an offset.
        assert_eq!(trace.vertical_offset, None);
    }

    #[test]
    fn delimited_rejects_missing_time_column() {
        let text = "a,b\n".repeat(2) + "CH1,CH2\n1.0,2.0\n";
        let file = write_file(&text);
        let err = load_trace(file.path(), &TraceFormat::Delimited { skip_rows: 2 }).unwrap_err();
        assert!(matches!(err, Error::Format { .. }), "{err}");
    }

    #[test]
    fn delimited_rejects_non_numeric_cell() {
        let text = "meta\nTIME,CH1\n0.0,garbage\n";
        let file = write_file(text);
        let err = load_trace(file.path(), &TraceFormat::Delimited { skip_rows: 1 }).unwrap_err();
        match err {
            Error::Format { found, .. } => assert!(found.contains("garbage")),
            other => panic!("expected Format error, got {other}"),
        }
    }

    #[test]
    fn delimited_rejects_short_row() {
        let text = "meta\nTIME,CH1,CH2\n0.0,1.0,2.0\n1.0,1.5\n";
        let file = write_file(text);
        let err = load_trace(file.path(), &TraceFormat::Delimited { skip_rows: 1 }).unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
    }

    #[test]
    fn delimited_rejects_empty_data_section() {
        let text = "meta\nTIME,CH1\n";
        let file = write_file(text);
        let err = load_trace(file.path(), &TraceFormat::Delimited { skip_rows: 1 }).unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
    }

    #[test]
    fn delimited_rejects_truncated_preamble() {
        let text = "meta\nmeta\n";
        let file = write_file(text);
        let err = load_trace(file.path(), &TraceFormat::Delimited { skip_rows: 13 }).unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_trace(
            Path::new("/nonexistent/trace.csv"),
            &TraceFormat::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    /// A TDS2022B-style export: metadata in columns 0-1, samples in 3-4.
    fn tds_export(rows: usize, offset: f64) -> String {
        let mut text = String::new();
        for row in 0..rows {
            let meta_value = if row == POSITIONAL_OFFSET_ROW {
                offset.to_string()
            } else {
                format!("{row}")
            };
            text.push_str(&format!(
                "Meta{row},{meta_value},,{},{},\n",
                row as f64 * 1.0e-3,
                0.5 + row as f64 * 0.1
            ));
        }
        text
    }

    #[test]
    fn positional_reads_offset_cell() {
        let file = write_file(&tds_export(12, 0.25));
        let trace = load_trace(
            file.path(),
            &TraceFormat::Positional { read_offset: true },
        )
        .unwrap();

        assert_eq!(trace.len(), 12);
        assert_eq!(trace.vertical_offset, Some(Volts(0.25)));
        assert_eq!(trace.channel_indices(), vec![1]);
        assert_eq!(trace.channel(1).unwrap().volts[0], 0.5);
        assert_eq!(trace.time[1], 1.0e-3);
    }

    #[test]
    fn positional_without_offset_request_leaves_none() {
        let file = write_file(&tds_export(12, 0.25));
        let trace = load_trace(
            file.path(),
            &TraceFormat::Positional { read_offset: false },
        )
        .unwrap();
        assert_eq!(trace.vertical_offset, None);
    }

    #[test]
    fn positional_rejects_file_too_short_for_offset_cell() {
        let file = write_file(&tds_export(5, 0.25));
        let err = load_trace(
            file.path(),
            &TraceFormat::Positional { read_offset: true },
        )
        .unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
    }

    #[test]
    fn spectrum_loads_two_column_sweep() {
        let file = write_file("10.0,1.0e-3\n20.0,2.0e-3\n");
        let sweep = load_spectrum(file.path()).unwrap();
        assert_eq!(sweep.frequency_hz, vec![10.0, 20.0]);
        assert_eq!(sweep.volts, vec![1.0e-3, 2.0e-3]);
    }

    #[test]
    fn spectrum_rejects_extra_columns() {
        let file = write_file("10.0,1.0e-3,junk\n");
        let err = load_spectrum(file.path()).unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
    }
}
