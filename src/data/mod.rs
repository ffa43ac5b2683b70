/// Data layer: core types, loading, validation, and artifact output.
///
/// Architecture:
/// ```text
///  .csv / .txt
///       │
///       ▼
///  ┌──────────┐
///  │  loader   │  parse file → WaferDataset
///  └──────────┘
///       │
///       ▼
///  ┌──────────────┐
///  │ WaferDataset  │  Vec<Sample>, column names
///  └──────────────┘
///       │
///       ▼
///  ┌──────────┐      ┌──────────┐
///  │ validate  │      │  writer   │  per-round artifact → .csv
///  └──────────┘      └──────────┘
/// ```
pub mod loader;
pub mod model;
pub mod validate;
pub mod writer;
