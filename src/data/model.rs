use crate::config::SensorConfig;
use crate::error::{Error, Result};
use crate::units::Volts;

// ---------------------------------------------------------------------------
// RawTrace – one scope export in canonical form
// ---------------------------------------------------------------------------

/// One raw voltage channel, tagged with its scope channel number
/// (CH2 → index 2, canonical identifier `V2`).
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub index: u8,
    /// Raw samples in volts, aligned with the trace's time axis.
    pub volts: Vec<f64>,
}

impl Channel {
    /// Canonical column identifier (`V1`, `V2`, ...).
    pub fn label(&self) -> String {
        format!("V{}", self.index)
    }
}

/// A parsed scope export: one time axis plus 1–3 voltage channels.
///
/// Constructor-enforced invariant: every channel has exactly as many
/// samples as the time axis, the axis is non-empty, and channel numbers
/// are unique.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTrace {
    /// Time axis in seconds.
    pub time: Vec<f64>,
    pub channels: Vec<Channel>,
    /// Vertical offset in volts, present only when the source layout
    /// embeds it (TDS2022B-style positional exports).
    pub vertical_offset: Option<Volts>,
}

impl RawTrace {
    pub fn new(
        time: Vec<f64>,
        channels: Vec<Channel>,
        vertical_offset: Option<Volts>,
    ) -> Result<Self> {
        if time.is_empty() {
            return Err(Error::format("at least one sample row", "an empty trace"));
        }
        if channels.is_empty() {
            return Err(Error::format(
                "at least one voltage channel",
                "a trace with no channels",
            ));
        }
        for ch in &channels {
            if ch.volts.len() != time.len() {
                return Err(Error::format(
                    format!("{} samples in {}", time.len(), ch.label()),
                    format!("{} samples", ch.volts.len()),
                ));
            }
        }
        for (i, ch) in channels.iter().enumerate() {
            if channels[..i].iter().any(|seen| seen.index == ch.index) {
                return Err(Error::format(
                    "unique channel numbers",
                    format!("channel {} twice", ch.label()),
                ));
            }
        }
        Ok(RawTrace {
            time,
            channels,
            vertical_offset,
        })
    }

    /// Number of samples per channel.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Find a channel by its scope number.
    pub fn channel(&self, index: u8) -> Option<&Channel> {
        self.channels.iter().find(|c| c.index == index)
    }

    /// The scope numbers present, for error reporting.
    pub fn channel_indices(&self) -> Vec<u8> {
        self.channels.iter().map(|c| c.index).collect()
    }
}

// ---------------------------------------------------------------------------
// CalibratedTrace – the pipeline's output record
// ---------------------------------------------------------------------------

/// One calibrated field channel in tesla, keeping its source channel number.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChannel {
    pub index: u8,
    /// Field samples in tesla, aligned with the trace's time axis.
    pub tesla: Vec<f64>,
}

impl FieldChannel {
    /// Output column identifier (`B1`, `B2`, ...).
    pub fn label(&self) -> String {
        format!("B{}", self.index)
    }
}

/// The pipeline output: time axis, one field channel per converted input
/// channel, and the exact configuration that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibratedTrace {
    /// Time axis in seconds, shared by every field channel.
    pub time: Vec<f64>,
    pub channels: Vec<FieldChannel>,
    /// Snapshot of the run parameters, reproduced in the output header so
    /// a conversion can be audited from the output file alone.
    pub config: SensorConfig,
}

impl CalibratedTrace {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

// ---------------------------------------------------------------------------
// SpectrumTrace – SR770 spectrum-analyzer export
// ---------------------------------------------------------------------------

/// A spectrum-analyzer sweep: voltage against frequency rather than time.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumTrace {
    /// Frequency axis in Hz.
    pub frequency_hz: Vec<f64>,
    /// Response in volts, aligned with the frequency axis.
    pub volts: Vec<f64>,
}

impl SpectrumTrace {
    pub fn new(frequency_hz: Vec<f64>, volts: Vec<f64>) -> Result<Self> {
        if frequency_hz.is_empty() {
            return Err(Error::format(
                "at least one sweep point",
                "an empty spectrum",
            ));
        }
        if frequency_hz.len() != volts.len() {
            return Err(Error::format(
                format!("{} voltage samples", frequency_hz.len()),
                format!("{}", volts.len()),
            ));
        }
        Ok(SpectrumTrace {
            frequency_hz,
            volts,
        })
    }

    pub fn len(&self) -> usize {
        self.frequency_hz.len()
    }
}
