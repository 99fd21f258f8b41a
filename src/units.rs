use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Unit constants
// ---------------------------------------------------------------------------

/// 1 mT = 10^4 mG (1 G = 10^-4 T at every metric prefix).
///
/// Legacy MC90R calibration sheets quote field-per-volt ratios in mG/mV;
/// dividing by this constant once at load yields the canonical mT/mV scale.
pub const MILLIGAUSS_PER_MILLITESLA: f64 = 1.0e4;

// ---------------------------------------------------------------------------
// Scalar quantities
// ---------------------------------------------------------------------------

/// A voltage in volts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Volts(pub f64);

/// A resistance in ohms (the shunt resistor in the fixed-gain formula).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ohms(pub f64);

/// A dimensionless voltage gain (V/V).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoltageGain(pub f64);

/// A field-transfer gain in mA/mT, relating drive current to field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldTransferGain(pub f64);

/// A sensor response ratio in field-per-volt (canonically mT/mV).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldRatio(pub f64);

impl FieldRatio {
    /// Normalize a legacy milligauss-based ratio (mG/mV) to the canonical
    /// millitesla-based scale.
    pub fn from_legacy_milligauss(ratio: f64) -> Self {
        FieldRatio(ratio / MILLIGAUSS_PER_MILLITESLA)
    }
}

/// An excitation frequency, stored in kHz to match calibration sheets.
///
/// Equality is verbatim `f64` equality: calibration lookup intentionally
/// matches only frequencies present bit-for-bit in the table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frequency(f64);

impl Frequency {
    pub fn from_khz(khz: f64) -> Self {
        Frequency(khz)
    }

    pub fn from_hz(hz: f64) -> Self {
        Frequency(hz / 1_000.0)
    }

    pub fn khz(self) -> f64 {
        self.0
    }

    pub fn hz(self) -> f64 {
        self.0 * 1_000.0
    }

    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }
}

// -- Display impls used by the writer's metadata block and by errors --

impl fmt::Display for Volts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} V", self.0)
    }
}

impl fmt::Display for Ohms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Ohms", self.0)
    }
}

impl fmt::Display for VoltageGain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} V/V", self.0)
    }
}

impl fmt::Display for FieldTransferGain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mA/mT", self.0)
    }
}

impl fmt::Display for FieldRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mT/mV", self.0)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} kHz", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_ratio_normalizes_by_ten_thousand() {
        let ratio = FieldRatio::from_legacy_milligauss(5.0e4);
        assert_eq!(ratio, FieldRatio(5.0));
    }

    #[test]
    fn frequency_hz_khz_round_trip() {
        let f = Frequency::from_hz(2_000.0);
        assert_eq!(f, Frequency::from_khz(2.0));
        assert_eq!(f.hz(), 2_000.0);
    }

    #[test]
    fn frequency_equality_is_exact() {
        // 2.0 and 2.0 + 1 ulp are different frequencies as far as
        // calibration lookup is concerned.
        let close = f64::from_bits(2.0f64.to_bits() + 1);
        assert_ne!(Frequency::from_khz(2.0), Frequency::from_khz(close));
    }
}
