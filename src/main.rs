use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use fieldtrace::calibration::{CalibrationTable, RatioScale};
use fieldtrace::config::{ChannelSelect, ModelSpec, SensorConfig, TraceFormat};
use fieldtrace::data::{loader, writer};
use fieldtrace::units::{FieldTransferGain, Frequency, Ohms, VoltageGain, Volts};
use fieldtrace::{paths, pipeline};

/// fieldtrace - oscilloscope trace to magnetic field converter
#[derive(Parser)]
#[command(name = "fieldtrace")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every trace conversion.
#[derive(Args)]
struct TraceArgs {
    /// Input scope export; opens a file dialog when omitted
    input: Option<PathBuf>,

    /// Output path; defaults to an OUT_-prefixed sibling of the input
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Scope channel to convert; all channels when omitted
    #[arg(short, long)]
    channel: Option<u8>,

    /// Probe/attenuator divisor applied to raw voltage
    #[arg(long, default_value_t = 1.0)]
    attenuation: f64,

    /// Vertical offset in volts (superseded by an offset embedded in the
    /// trace file)
    #[arg(long, default_value_t = 0.0)]
    offset: f64,

    /// Metadata rows before the header in delimited exports
    #[arg(long, default_value_t = 13)]
    skip_rows: usize,

    /// Treat the input as a headerless positional export (TDS2022B-style),
    /// reading the vertical-offset cell
    #[arg(long)]
    positional: bool,
}

impl TraceArgs {
    fn build_config(&self, model: ModelSpec) -> SensorConfig {
        let mut config = SensorConfig::new(model);
        config.attenuation = self.attenuation;
        config.vertical_offset = Volts(self.offset);
        config.channels = match self.channel {
            Some(index) => ChannelSelect::Channel(index),
            None => ChannelSelect::All,
        };
        config.format = if self.positional {
            TraceFormat::Positional { read_offset: true }
        } else {
            TraceFormat::Delimited {
                skip_rows: self.skip_rows,
            }
        };
        config
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a DRV425EVM trace with the fixed-gain datasheet formula
    FixedGain {
        #[command(flatten)]
        trace: TraceArgs,

        /// Shunt resistor value in ohms
        #[arg(long, default_value_t = 100.0)]
        r_shunt: f64,

        /// Board voltage gain in V/V
        #[arg(long, default_value_t = 4.0)]
        gain: f64,

        /// Field-transfer gain in mA/mT
        #[arg(long, default_value_t = 12.2)]
        field_gain: f64,
    },

    /// Convert an MC90R trace with a frequency-indexed calibration table
    Table {
        #[command(flatten)]
        trace: TraceArgs,

        /// Calibration CSV (frequency kHz, field-per-volt ratio)
        #[arg(long)]
        calibration: PathBuf,

        /// Excitation frequency in kHz; must match a table row exactly
        #[arg(long)]
        frequency: f64,

        /// The table is still in the legacy mG/mV scale
        #[arg(long)]
        legacy_milligauss: bool,
    },

    /// Convert using a JSON sensor-config file
    Run {
        /// JSON SensorConfig file
        #[arg(long)]
        config: PathBuf,

        /// Input scope export; opens a file dialog when omitted
        input: Option<PathBuf>,

        /// Output path; defaults to an OUT_-prefixed sibling of the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Re-export a legacy milligauss calibration table in millitesla units
    ConvertCalibration {
        /// Legacy calibration CSV; opens a file dialog when omitted
        input: Option<PathBuf>,

        /// Output path; defaults to a _teslas-suffixed sibling of the input
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the shape of a trace without converting it
    Info {
        /// Input export; opens a file dialog when omitted
        input: Option<PathBuf>,

        /// Metadata rows before the header in delimited exports
        #[arg(long, default_value_t = 13)]
        skip_rows: usize,

        /// Treat the input as a headerless positional export
        #[arg(long)]
        positional: bool,

        /// Treat the input as an SR770 spectrum-analyzer sweep
        #[arg(long)]
        spectrum: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::FixedGain {
            trace,
            r_shunt,
            gain,
            field_gain,
        } => {
            let config = trace.build_config(ModelSpec::FixedGain {
                r_shunt: Ohms(r_shunt),
                gain: VoltageGain(gain),
                field_gain: FieldTransferGain(field_gain),
            });
            run_conversion(trace.input, trace.output, config)
        }
        Commands::Table {
            trace,
            calibration,
            frequency,
            legacy_milligauss,
        } => {
            let config = trace.build_config(ModelSpec::CalibrationTable {
                path: paths::normalize(&calibration),
                target_frequency: Frequency::from_khz(frequency),
                legacy_milligauss,
            });
            run_conversion(trace.input, trace.output, config)
        }
        Commands::Run {
            config,
            input,
            output,
        } => {
            let config = SensorConfig::from_json_path(&paths::normalize(&config))
                .context("loading sensor config")?;
            run_conversion(input, output, config)
        }
        Commands::ConvertCalibration { input, output } => {
            let input = resolve_input(input)?;
            let output = output.unwrap_or_else(|| calibration_output(&input));
            let table =
                CalibrationTable::from_csv_path(&input, RatioScale::MilligaussPerMillivolt)
                    .context("loading legacy calibration table")?;
            table
                .write_csv_path(&output)
                .context("writing converted calibration table")?;
            println!(
                "Converted {} calibration rows to {}",
                table.len(),
                output.display()
            );
            Ok(())
        }
        Commands::Info {
            input,
            skip_rows,
            positional,
            spectrum,
        } => {
            let input = resolve_input(input)?;
            if spectrum {
                print_spectrum_info(&input)
            } else {
                let format = if positional {
                    TraceFormat::Positional { read_offset: true }
                } else {
                    TraceFormat::Delimited { skip_rows }
                };
                print_trace_info(&input, &format)
            }
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

// ---------------------------------------------------------------------------
// Command bodies
// ---------------------------------------------------------------------------

fn run_conversion(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    config: SensorConfig,
) -> Result<()> {
    let input = resolve_input(input)?;
    let output = output.map_or_else(|| paths::default_output(&input), |o| paths::normalize(&o));

    let trace = pipeline::convert(&input, &config).context("converting trace")?;
    writer::write_csv_path(&output, &trace).context("writing calibrated trace")?;

    println!(
        "Converted {} samples x {} channel(s) to {}",
        trace.len(),
        trace.channels.len(),
        output.display()
    );
    Ok(())
}

fn print_trace_info(input: &Path, format: &TraceFormat) -> Result<()> {
    let trace = loader::load_trace(input, format).context("loading trace")?;

    println!("{}", input.display());
    println!(
        "  {} samples, t = {} .. {} s",
        trace.len(),
        trace.time[0],
        trace.time[trace.len() - 1]
    );
    if let Some(offset) = trace.vertical_offset {
        println!("  vertical offset: {offset}");
    }
    for channel in &trace.channels {
        let (min, max) = min_max(&channel.volts);
        println!("  {}: {min} .. {max} V", channel.label());
    }
    Ok(())
}

fn print_spectrum_info(input: &Path) -> Result<()> {
    let sweep = loader::load_spectrum(input).context("loading spectrum")?;

    let (f_min, f_max) = min_max(&sweep.frequency_hz);
    let (v_min, v_max) = min_max(&sweep.volts);
    println!("{}", input.display());
    println!("  {} sweep points, {f_min} .. {f_max} Hz", sweep.len());
    println!("  response: {v_min} .. {v_max} V");
    Ok(())
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY),
        |(min, max), &v| (min.min(v), max.max(v)),
    )
}

// ---------------------------------------------------------------------------
// Path resolution
// ---------------------------------------------------------------------------

/// Resolve the input path, falling back to an open-file dialog when the
/// caller gave none (mirrors the bench workflow of picking a scope export
/// interactively).
fn resolve_input(input: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = input {
        return Ok(paths::normalize(&path));
    }
    let Some(path) = rfd::FileDialog::new()
        .add_filter("CSV files", &["csv", "CSV"])
        .pick_file()
    else {
        bail!("no input file selected");
    };
    println!("Reading data from {}", path.display());
    Ok(path)
}

/// Default output for a converted calibration table:
/// `mc90r_calibration.csv` → `mc90r_calibration_teslas.csv`.
fn calibration_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "calibration".to_string());
    let extension = input
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "csv".to_string());
    input.with_file_name(format!("{stem}_teslas.{extension}"))
}
