use std::fs::File;
use std::path::Path;

use csv::{ReaderBuilder, Writer};
use log::info;

use crate::config::ModelSpec;
use crate::error::{Error, Result};
use crate::units::{FieldTransferGain, Frequency, Ohms, VoltageGain, Volts};

use super::model::CalibratedTrace;

// Metadata keys stamped into the leading rows of every output file, so a
// conversion can be reproduced from the output alone.
const KEY_MODEL: &str = "model";
const KEY_R_SHUNT: &str = "R_shunt (Ohms)";
const KEY_GAIN: &str = "G (V/V)";
const KEY_FIELD_GAIN: &str = "Gfg (mA/mT)";
const KEY_CALIBRATION: &str = "calibration";
const KEY_TARGET_FREQ: &str = "target freq (kHz)";
const KEY_ATTENUATION: &str = "attenuation";
const KEY_OFFSET: &str = "vertical offset (V)";

const MODEL_FIXED_GAIN: &str = "fixed-gain";
const MODEL_TABLE: &str = "calibration-table";

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Persist a calibrated trace: the metadata block in fixed leading rows,
/// then a `t,B<i>,...` header, then one row per sample.
///
/// Scalars are written in Rust's shortest round-trip form, so re-parsing
/// the block reproduces them exactly.
pub fn write_csv_path(path: &Path, trace: &CalibratedTrace) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    write_csv(file, trace).map_err(|e| match e.into_kind() {
        csv::ErrorKind::Io(source) => Error::io(path, source),
        other => Error::format(
            "a writable output file",
            format!("{}: {other:?}", path.display()),
        ),
    })?;
    info!(
        "wrote {} samples x {} channel(s) to {}",
        trace.len(),
        trace.channels.len(),
        path.display()
    );
    Ok(())
}

fn write_csv<W: std::io::Write>(out: W, trace: &CalibratedTrace) -> csv::Result<()> {
    let mut writer = Writer::from_writer(out);

    match &trace.config.model {
        ModelSpec::FixedGain {
            r_shunt,
            gain,
            field_gain,
        } => {
            writer.write_record([KEY_MODEL.to_string(), MODEL_FIXED_GAIN.to_string()])?;
            writer.write_record([KEY_R_SHUNT.to_string(), r_shunt.0.to_string()])?;
            writer.write_record([KEY_GAIN.to_string(), gain.0.to_string()])?;
            writer.write_record([KEY_FIELD_GAIN.to_string(), field_gain.0.to_string()])?;
        }
        ModelSpec::CalibrationTable {
            path,
            target_frequency,
            ..
        } => {
            writer.write_record([KEY_MODEL.to_string(), MODEL_TABLE.to_string()])?;
            writer.write_record([KEY_CALIBRATION.to_string(), path.display().to_string()])?;
            writer.write_record([
                KEY_TARGET_FREQ.to_string(),
                target_frequency.khz().to_string(),
            ])?;
        }
    }
    writer.write_record([
        KEY_ATTENUATION.to_string(),
        trace.config.attenuation.to_string(),
    ])?;
    writer.write_record([
        KEY_OFFSET.to_string(),
        trace.config.vertical_offset.0.to_string(),
    ])?;

    let mut header = vec!["t".to_string()];
    header.extend(trace.channels.iter().map(|c| c.label()));
    writer.write_record(&header)?;

    for (i, t) in trace.time.iter().enumerate() {
        let mut row = vec![t.to_string()];
        row.extend(trace.channels.iter().map(|c| c.tesla[i].to_string()));
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Re-parsing the metadata block
// ---------------------------------------------------------------------------

/// The transfer model recorded in an output file's metadata block.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputModel {
    FixedGain {
        r_shunt: Ohms,
        gain: VoltageGain,
        field_gain: FieldTransferGain,
    },
    CalibrationTable {
        calibration: String,
        target_frequency: Frequency,
    },
}

/// The scalar parameters recovered from an output file, sufficient to
/// reproduce the conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputMetadata {
    pub model: OutputModel,
    pub attenuation: f64,
    pub vertical_offset: Volts,
}

/// Read back the metadata block of a file produced by [`write_csv_path`].
pub fn read_metadata_path(path: &Path) -> Result<OutputMetadata> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);
    let mut records = reader.records();

    let mut next_pair = |key: &str| -> Result<String> {
        let record = match records.next() {
            Some(result) => result
                .map_err(|e| Error::format("a metadata row", format!("read failure: {e}")))?,
            None => {
                return Err(Error::format(
                    format!("a {key:?} metadata row"),
                    "end of file",
                ));
            }
        };
        if record.get(0) != Some(key) {
            return Err(Error::format(
                format!("a {key:?} metadata row"),
                format!("{:?}", record.get(0).unwrap_or_default()),
            ));
        }
        match record.get(1) {
            Some(value) => Ok(value.to_string()),
            None => Err(Error::format(
                format!("a value next to {key:?}"),
                "a single-cell row",
            )),
        }
    };

    let model = match next_pair(KEY_MODEL)?.as_str() {
        MODEL_FIXED_GAIN => OutputModel::FixedGain {
            r_shunt: Ohms(parse_scalar(&next_pair(KEY_R_SHUNT)?, KEY_R_SHUNT)?),
            gain: VoltageGain(parse_scalar(&next_pair(KEY_GAIN)?, KEY_GAIN)?),
            field_gain: FieldTransferGain(parse_scalar(
                &next_pair(KEY_FIELD_GAIN)?,
                KEY_FIELD_GAIN,
            )?),
        },
        MODEL_TABLE => OutputModel::CalibrationTable {
            calibration: next_pair(KEY_CALIBRATION)?,
            target_frequency: Frequency::from_khz(parse_scalar(
                &next_pair(KEY_TARGET_FREQ)?,
                KEY_TARGET_FREQ,
            )?),
        },
        other => {
            return Err(Error::format(
                format!("model {MODEL_FIXED_GAIN:?} or {MODEL_TABLE:?}"),
                format!("{other:?}"),
            ));
        }
    };

    Ok(OutputMetadata {
        model,
        attenuation: parse_scalar(&next_pair(KEY_ATTENUATION)?, KEY_ATTENUATION)?,
        vertical_offset: Volts(parse_scalar(&next_pair(KEY_OFFSET)?, KEY_OFFSET)?),
    })
}

fn parse_scalar(value: &str, key: &str) -> Result<f64> {
    value.trim().parse::<f64>().map_err(|_| {
        Error::format(
            format!("a numeric value for {key:?}"),
            format!("{value:?}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tempfile::tempdir;

    use crate::config::SensorConfig;
    use crate::data::model::FieldChannel;

    use super::*;

    fn fixed_gain_trace() -> CalibratedTrace {
        let mut config = SensorConfig::new(ModelSpec::FixedGain {
            r_shunt: Ohms(100.0),
            gain: VoltageGain(4.0),
            field_gain: FieldTransferGain(12.2),
        });
        config.attenuation = 10.0;
        config.vertical_offset = Volts(0.1 + 0.2); // deliberately inexact
        CalibratedTrace {
            time: vec![0.0, 1.0e-3],
            channels: vec![FieldChannel {
                index: 2,
                tesla: vec![1.0 / 3.0, 2.0 / 3.0],
            }],
            config,
        }
    }

    #[test]
    fn metadata_round_trips_exactly() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("OUT_trace.csv");

        let trace = fixed_gain_trace();
        write_csv_path(&path, &trace).unwrap();

        let metadata = read_metadata_path(&path).unwrap();
        assert_eq!(metadata.attenuation, 10.0);
        // Bit-exact even for values with no short decimal form.
        assert_eq!(metadata.vertical_offset, Volts(0.1 + 0.2));
        assert_eq!(
            metadata.model,
            OutputModel::FixedGain {
                r_shunt: Ohms(100.0),
                gain: VoltageGain(4.0),
                field_gain: FieldTransferGain(12.2),
            }
        );
    }

    #[test]
    fn table_metadata_records_the_table_identity() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("OUT_trace.csv");

        let config = SensorConfig::new(ModelSpec::CalibrationTable {
            path: PathBuf::from("mc90r_calibration_teslas.csv"),
            target_frequency: Frequency::from_khz(2.0),
            legacy_milligauss: false,
        });
        let trace = CalibratedTrace {
            time: vec![0.0],
            channels: vec![FieldChannel {
                index: 1,
                tesla: vec![5.0],
            }],
            config,
        };
        write_csv_path(&path, &trace).unwrap();

        let metadata = read_metadata_path(&path).unwrap();
        assert_eq!(
            metadata.model,
            OutputModel::CalibrationTable {
                calibration: "mc90r_calibration_teslas.csv".to_string(),
                target_frequency: Frequency::from_khz(2.0),
            }
        );
    }

    #[test]
    fn data_section_follows_the_block() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("OUT_trace.csv");
        write_csv_path(&path, &fixed_gain_trace()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "model,fixed-gain");
        assert_eq!(lines[6], "t,B2");
        assert_eq!(lines.len(), 7 + 2);
        assert!(lines[7].starts_with("0,"));
    }

    #[test]
    fn reading_a_foreign_file_fails_with_format_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("foreign.csv");
        std::fs::write(&path, "TIME,CH1\n0.0,1.0\n").unwrap();

        let err = read_metadata_path(&path).unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
    }
}
