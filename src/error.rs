use std::path::PathBuf;

use crate::units::Frequency;

// ---------------------------------------------------------------------------
// Crate-wide error taxonomy
// ---------------------------------------------------------------------------

/// Everything that can go wrong in a single conversion run.
///
/// All variants are fatal to the run that raised them; the pipeline never
/// writes partial output or substitutes defaults for missing values.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The file at `path` could not be opened or read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A trace file did not match the expected shape.
    #[error("trace format mismatch: expected {expected}, found {found}")]
    Format { expected: String, found: String },

    /// A calibration table was malformed (wrong columns, bad cells,
    /// duplicate frequencies).
    #[error("malformed calibration table: {0}")]
    CalibrationFormat(String),

    /// No table row carries exactly the requested frequency.
    #[error("no calibration entry at {frequency}")]
    CalibrationLookup { frequency: Frequency },

    /// The sensor configuration is invalid for this run.
    #[error("invalid sensor config: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build an [`Error::Io`] tagging the offending path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Build an [`Error::Format`] from expected/found descriptions.
    pub fn format(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Error::Format {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_error_names_both_shapes() {
        let err = Error::format("4 columns", "3 columns (row 17)");
        let msg = err.to_string();
        assert!(msg.contains("4 columns"));
        assert!(msg.contains("3 columns (row 17)"));
    }

    #[test]
    fn lookup_error_names_the_frequency() {
        let err = Error::CalibrationLookup {
            frequency: Frequency::from_khz(3.0),
        };
        assert_eq!(err.to_string(), "no calibration entry at 3 kHz");
    }
}
