use std::path::Path;

use log::info;

use crate::config::{ChannelSelect, SensorConfig};
use crate::data::loader;
use crate::data::model::{CalibratedTrace, Channel, FieldChannel};
use crate::error::{Error, Result};
use crate::transfer::{Corrections, TransferModel};

// ---------------------------------------------------------------------------
// Conversion pipeline
// ---------------------------------------------------------------------------

/// Run one complete conversion: load the scope export at `path`, build the
/// transfer model described by `config`, and convert the selected channels
/// to field values.
///
/// Synchronous, no partial results: any failure aborts the run and the
/// typed error propagates untouched. Each call owns its trace and table
/// exclusively; nothing is retained between runs, so callers may convert
/// many files in parallel.
pub fn convert(path: &Path, config: &SensorConfig) -> Result<CalibratedTrace> {
    config.validate()?;

    let trace = loader::load_trace(path, &config.format)?;
    let model = TransferModel::from_spec(&config.model)?;

    // A trace-embedded offset (positional exports) wins over the config.
    let corrections = Corrections {
        attenuation: config.attenuation,
        vertical_offset: trace.vertical_offset.unwrap_or(config.vertical_offset),
    };

    let selected: Vec<&Channel> = match config.channels {
        ChannelSelect::All => trace.channels.iter().collect(),
        ChannelSelect::Channel(index) => {
            let channel = trace.channel(index).ok_or_else(|| {
                Error::Config(format!(
                    "channel {index} not present; trace has channels {:?}",
                    trace.channel_indices()
                ))
            })?;
            vec![channel]
        }
    };

    let mut channels = Vec::with_capacity(selected.len());
    for channel in selected {
        channels.push(FieldChannel {
            index: channel.index,
            tesla: model.apply(&channel.volts, &corrections)?,
        });
    }

    info!(
        "converted {} channel(s) x {} samples from {}",
        channels.len(),
        trace.len(),
        path.display()
    );

    Ok(CalibratedTrace {
        time: trace.time,
        channels,
        config: config.clone(),
    })
}
