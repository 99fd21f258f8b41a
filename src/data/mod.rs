/// Data layer: canonical trace types, loading, and calibrated output.
///
/// Architecture:
/// ```text
///  scope export (.csv)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → RawTrace
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ RawTrace  │  time axis + V1..V3 channels
///   └──────────┘
///        │  (transfer model, see crate::pipeline)
///        ▼
///   ┌────────────────┐
///   │ CalibratedTrace │  time axis + B channels + config snapshot
///   └────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  writer   │  metadata block + samples → output .csv
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod writer;
