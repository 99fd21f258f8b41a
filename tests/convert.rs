//! End-to-end tests: scope export on disk → convert → write → re-read.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use fieldtrace::calibration::{CalibrationTable, RatioScale};
use fieldtrace::config::{ChannelSelect, ModelSpec, SensorConfig};
use fieldtrace::data::writer::{self, OutputModel};
use fieldtrace::pipeline;
use fieldtrace::units::{FieldTransferGain, Frequency, Ohms, VoltageGain};
use fieldtrace::Error;

/// A small MSO24-style "ALL" export with two channels.
fn write_scope_export(dir: &Path) -> PathBuf {
    let mut text = String::new();
    for i in 0..13 {
        text.push_str(&format!("Record Length,{i}\n"));
    }
    text.push_str("TIME,CH1,CH2\n");
    text.push_str("0.0,1.0,0.010\n");
    text.push_str("1.0e-3,2.0,0.020\n");
    text.push_str("2.0e-3,3.0,0.030\n");

    let path = dir.join("Tek000_ALL.csv");
    fs::write(&path, text).unwrap();
    path
}

fn write_calibration(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("calibration.csv");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn fixed_gain_conversion_round_trips_through_the_output_file() {
    let dir = TempDir::new().unwrap();
    let input = write_scope_export(dir.path());
    let output = dir.path().join("OUT_Tek000_ALL.csv");

    let mut config = SensorConfig::new(ModelSpec::FixedGain {
        r_shunt: Ohms(100.0),
        gain: VoltageGain(4.0),
        field_gain: FieldTransferGain(12.2),
    });
    config.channels = ChannelSelect::Channel(2);
    config.attenuation = 10.0;

    let trace = pipeline::convert(&input, &config).unwrap();
    let denominator = 100.0 * 4.0 * 12.2;
    assert_eq!(trace.channels.len(), 1);
    assert_eq!(trace.channels[0].tesla, vec![
        (0.010 / 10.0) / denominator,
        (0.020 / 10.0) / denominator,
        (0.030 / 10.0) / denominator,
    ]);

    writer::write_csv_path(&output, &trace).unwrap();

    // The output file alone reproduces the run's scalar parameters.
    let metadata = writer::read_metadata_path(&output).unwrap();
    assert_eq!(metadata.attenuation, 10.0);
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
fn table_conversion_applies_the_looked_up_ratio() {
    let dir = TempDir::new().unwrap();
    let input = write_scope_export(dir.path());
    let calibration = write_calibration(
        dir.path(),
        "Freq (kHz),Field/Vo (mT/mV)\n1.0,9.9\n2.0,5.0\n",
    );

    let mut config = SensorConfig::new(ModelSpec::CalibrationTable {
        path: calibration,
        target_frequency: Frequency::from_khz(2.0),
        legacy_milligauss: false,
    });
    config.channels = ChannelSelect::Channel(1);

    let trace = pipeline::convert(&input, &config).unwrap();
    assert_eq!(trace.channels[0].tesla, vec![5.0, 10.0, 15.0]);
}

#[test]
fn table_conversion_fails_between_table_rows() {
    let dir = TempDir::new().unwrap();
    let input = write_scope_export(dir.path());
    let calibration = write_calibration(
        dir.path(),
        "Freq (kHz),Field/Vo (mT/mV)\n1.0,9.9\n2.0,5.0\n",
    );

    let config = SensorConfig::new(ModelSpec::CalibrationTable {
        path: calibration,
        target_frequency: Frequency::from_khz(1.5),
        legacy_milligauss: false,
    });

    let err = pipeline::convert(&input, &config).unwrap_err();
    assert!(matches!(err, Error::CalibrationLookup { .. }));
}

#[test]
fn duplicate_calibration_rows_abort_before_conversion() {
    let dir = TempDir::new().unwrap();
    let input = write_scope_export(dir.path());
    let calibration = write_calibration(
        dir.path(),
        "Freq (kHz),Field/Vo (mT/mV)\n2.0,5.0\n2.0,6.0\n",
    );

    let config = SensorConfig::new(ModelSpec::CalibrationTable {
        path: calibration,
        target_frequency: Frequency::from_khz(2.0),
        legacy_milligauss: false,
    });

    let err = pipeline::convert(&input, &config).unwrap_err();
    assert!(matches!(err, Error::CalibrationFormat(_)));
}

#[test]
fn legacy_table_converted_on_disk_matches_direct_canonical_load() {
    let dir = TempDir::new().unwrap();
    let legacy = write_calibration(
        dir.path(),
        "Freq (kHz),Field/Vo (mG/mV)\n2.0,50000.0\n4.0,20000.0\n",
    );
    let converted = dir.path().join("calibration_teslas.csv");

    // Convert once, then reload in canonical units.
    let table =
        CalibrationTable::from_csv_path(&legacy, RatioScale::MilligaussPerMillivolt).unwrap();
    table.write_csv_path(&converted).unwrap();
    let reloaded =
        CalibrationTable::from_csv_path(&converted, RatioScale::MilliteslaPerMillivolt)
            .unwrap();

    assert_eq!(reloaded, table);
    assert_eq!(
        reloaded.lookup(Frequency::from_khz(2.0)).unwrap().0,
        5.0
    );
}

#[test]
fn json_config_file_drives_a_conversion() {
    let dir = TempDir::new().unwrap();
    let input = write_scope_export(dir.path());

    let config_path = dir.path().join("run.json");
    fs::write(
        &config_path,
        r#"{
            "model": "fixed-gain",
            "r_shunt": 100.0,
            "gain": 4.0,
            "field_gain": 12.2,
            "channels": { "channel": 2 }
        }"#,
    )
    .unwrap();

    let config = SensorConfig::from_json_path(&config_path).unwrap();
    let trace = pipeline::convert(&input, &config).unwrap();

    let denominator = 100.0 * 4.0 * 12.2;
    assert_eq!(trace.channels[0].tesla[0], 0.010 / denominator);
}

#[test]
fn unreadable_input_propagates_as_io_error() {
    let config = SensorConfig::new(ModelSpec::FixedGain {
        r_shunt: Ohms(100.0),
        gain: VoltageGain(4.0),
        field_gain: FieldTransferGain(12.2),
    });
    let err = pipeline::convert(Path::new("/nonexistent/trace.csv"), &config).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}
