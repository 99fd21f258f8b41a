//! Converts raw oscilloscope voltage traces captured from magnetic-field
//! sensors into calibrated magnetic-field values.
//!
//! Two sensor families are supported: DRV425EVM fluxgate boards, converted
//! with the fixed-gain datasheet formula, and MC90R probes, converted with
//! an empirically determined frequency-indexed calibration table. The
//! pipeline is one pure pass: file path in, [`data::model::CalibratedTrace`]
//! out.
//!
//! ```no_run
//! use std::path::Path;
//!
//! use fieldtrace::config::{ModelSpec, SensorConfig};
//! use fieldtrace::units::{FieldTransferGain, Ohms, VoltageGain};
//!
//! let config = SensorConfig::new(ModelSpec::FixedGain {
//!     r_shunt: Ohms(100.0),
//!     gain: VoltageGain(4.0),
//!     field_gain: FieldTransferGain(12.2),
//! });
//! let trace = fieldtrace::pipeline::convert(Path::new("Tek000_ALL.csv"), &config)?;
//! fieldtrace::data::writer::write_csv_path(Path::new("OUT_Tek000_ALL.csv"), &trace)?;
//! # Ok::<(), fieldtrace::Error>(())
//! ```

pub mod calibration;
pub mod config;
pub mod data;
pub mod error;
pub mod paths;
pub mod pipeline;
pub mod transfer;
pub mod units;

pub use config::{ChannelSelect, ModelSpec, SensorConfig, TraceFormat};
pub use error::{Error, Result};
