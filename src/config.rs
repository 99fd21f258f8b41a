use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::units::{FieldTransferGain, Frequency, Ohms, VoltageGain, Volts};

// ---------------------------------------------------------------------------
// Transfer model selection
// ---------------------------------------------------------------------------

/// Which transfer model a run uses, with its scalar parameters.
///
/// The table variant references its calibration file by path; the table
/// itself is loaded by the pipeline when the model is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "kebab-case")]
pub enum ModelSpec {
    /// Algebraic model for the DRV425EVM fluxgate family:
    /// `B = V / (R_shunt * G * Gfg)`.
    FixedGain {
        r_shunt: Ohms,
        gain: VoltageGain,
        field_gain: FieldTransferGain,
    },
    /// Frequency-indexed calibration-table model for the MC90R probe
    /// family. `legacy_milligauss` marks tables still in the mG/mV scale,
    /// normalized once at load.
    CalibrationTable {
        path: PathBuf,
        target_frequency: Frequency,
        #[serde(default)]
        legacy_milligauss: bool,
    },
}

// ---------------------------------------------------------------------------
// Channel selection and input format
// ---------------------------------------------------------------------------

/// Which scope channels the pipeline converts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelSelect {
    /// Convert every channel present in the trace.
    #[default]
    All,
    /// Convert a single channel by its scope number (CH2 → 2).
    Channel(u8),
}

/// The on-disk layout of a scope export, always chosen explicitly by the
/// caller, never sniffed from file content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "layout", rename_all = "kebab-case")]
pub enum TraceFormat {
    /// MSO24-style "ALL" export: `skip_rows` metadata records, then a
    /// header row naming TIME and CH<n> columns.
    Delimited { skip_rows: usize },
    /// TDS2022B-style headerless export with fixed column positions;
    /// `read_offset` additionally extracts the vertical-offset cell.
    Positional { read_offset: bool },
}

impl Default for TraceFormat {
    fn default() -> Self {
        TraceFormat::Delimited { skip_rows: 13 }
    }
}

// ---------------------------------------------------------------------------
// SensorConfig
// ---------------------------------------------------------------------------

fn default_attenuation() -> f64 {
    1.0
}

/// Immutable parameters for one conversion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    #[serde(flatten)]
    pub model: ModelSpec,

    /// Probe/attenuator divisor applied to raw voltage before anything
    /// else. Dimensionless; 1 means no attenuation.
    #[serde(default = "default_attenuation")]
    pub attenuation: f64,

    /// Vertical offset subtracted by the table model, used only when the
    /// trace file itself carries no offset metadata.
    #[serde(default)]
    pub vertical_offset: Volts,

    #[serde(default)]
    pub channels: ChannelSelect,

    #[serde(default)]
    pub format: TraceFormat,
}

impl SensorConfig {
    /// Convenience constructor with the defaults a bare run uses:
    /// attenuation 1, offset 0, all channels, 13-row delimited export.
    pub fn new(model: ModelSpec) -> Self {
        SensorConfig {
            model,
            attenuation: default_attenuation(),
            vertical_offset: Volts::default(),
            channels: ChannelSelect::default(),
            format: TraceFormat::default(),
        }
    }

    /// Load a config from a JSON file.
    pub fn from_json_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config: SensorConfig = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject parameter combinations the transfer models cannot evaluate.
    pub fn validate(&self) -> Result<()> {
        if !self.attenuation.is_finite() || self.attenuation <= 0.0 {
            return Err(Error::Config(format!(
                "attenuation must be a positive finite divisor, got {}",
                self.attenuation
            )));
        }
        if !self.vertical_offset.0.is_finite() {
            return Err(Error::Config(format!(
                "vertical offset must be finite, got {}",
                self.vertical_offset.0
            )));
        }
        if let ChannelSelect::Channel(0) = self.channels {
            return Err(Error::Config(
                "scope channels are numbered from 1".to_string(),
            ));
        }
        match &self.model {
            ModelSpec::FixedGain {
                r_shunt,
                gain,
                field_gain,
            } => {
                // All three sit in the denominator of the field formula.
                for (name, value) in [
                    ("R_shunt", r_shunt.0),
                    ("G", gain.0),
                    ("Gfg", field_gain.0),
                ] {
                    if !value.is_finite() || value <= 0.0 {
                        return Err(Error::Config(format!(
                            "{name} must be positive and finite, got {value}"
                        )));
                    }
                }
            }
            ModelSpec::CalibrationTable {
                target_frequency, ..
            } => {
                if !target_frequency.is_finite() || target_frequency.khz() < 0.0 {
                    return Err(Error::Config(format!(
                        "target frequency must be finite and non-negative, got {target_frequency}"
                    )));
                }
            }
        }
        Ok(())
    }
}
