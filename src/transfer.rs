use crate::calibration::{CalibrationTable, RatioScale};
use crate::config::ModelSpec;
use crate::error::Result;
use crate::units::{FieldTransferGain, Frequency, Ohms, VoltageGain, Volts};

// ---------------------------------------------------------------------------
// Corrections applied ahead of the model-specific transform
// ---------------------------------------------------------------------------

/// Signal-path corrections shared by both models.
///
/// The order is fixed: attenuation first (`V_eff = V_raw / attenuation`),
/// then the vertical offset (table model only), then the transform.
/// Swapping attenuation and offset changes the result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corrections {
    /// Probe/attenuator divisor; 1 means none.
    pub attenuation: f64,
    /// Vertical offset subtracted by the table model, already resolved
    /// (trace-embedded value wins over the configured one).
    pub vertical_offset: Volts,
}

impl Default for Corrections {
    fn default() -> Self {
        Corrections {
            attenuation: 1.0,
            vertical_offset: Volts(0.0),
        }
    }
}

// ---------------------------------------------------------------------------
// TransferModel – the two interchangeable voltage→field strategies
// ---------------------------------------------------------------------------

/// Scalar parameters of the fixed-gain model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedGainParams {
    pub r_shunt: Ohms,
    pub gain: VoltageGain,
    pub field_gain: FieldTransferGain,
}

impl FixedGainParams {
    /// The shared denominator of the DRV425EVM field formula.
    fn denominator(&self) -> f64 {
        self.r_shunt.0 * self.gain.0 * self.field_gain.0
    }
}

/// A transfer model ready to run: the table variant has already loaded its
/// calibration file.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferModel {
    /// `B = V / (R_shunt * G * Gfg)`, elementwise, frequency-independent
    /// (DRV425EVM datasheet formula 1; assumes the reference voltage was
    /// already subtracted from the output voltage).
    FixedGain(FixedGainParams),
    /// Offset-corrected voltage times the table ratio at one dominant
    /// excitation frequency (MC90R). No per-sample spectral decomposition.
    Table {
        table: CalibrationTable,
        target_frequency: Frequency,
    },
}

impl TransferModel {
    /// Build a runnable model from its config description, loading the
    /// calibration table when one is referenced.
    pub fn from_spec(spec: &ModelSpec) -> Result<Self> {
        match spec {
            ModelSpec::FixedGain {
                r_shunt,
                gain,
                field_gain,
            } => Ok(TransferModel::FixedGain(FixedGainParams {
                r_shunt: *r_shunt,
                gain: *gain,
                field_gain: *field_gain,
            })),
            ModelSpec::CalibrationTable {
                path,
                target_frequency,
                legacy_milligauss,
            } => {
                let scale = if *legacy_milligauss {
                    RatioScale::MilligaussPerMillivolt
                } else {
                    RatioScale::MilliteslaPerMillivolt
                };
                Ok(TransferModel::Table {
                    table: CalibrationTable::from_csv_path(path, scale)?,
                    target_frequency: *target_frequency,
                })
            }
        }
    }

    /// Map one raw voltage channel to field values in tesla.
    ///
    /// Pure and elementwise; applying the model to channels in any order
    /// yields the same per-channel result.
    pub fn apply(&self, volts: &[f64], corrections: &Corrections) -> Result<Vec<f64>> {
        match self {
            TransferModel::FixedGain(params) => {
                let denominator = params.denominator();
                Ok(volts
                    .iter()
                    .map(|v| (v / corrections.attenuation) / denominator)
                    .collect())
            }
            TransferModel::Table {
                table,
                target_frequency,
            } => {
                let ratio = table.lookup(*target_frequency)?;
                let offset = corrections.vertical_offset.0;
                Ok(volts
                    .iter()
                    .map(|v| (v / corrections.attenuation - offset) * ratio.0)
                    .collect())
            }
        }
    }
}
