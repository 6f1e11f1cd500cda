/// Data layer: record types, loading and writing.
///
/// Architecture:
/// ```text
///  .npy / .json / .csv / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → SpectralCube / WavelengthGrid / records
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  model    │  PixelRecord, GoodPixelRecord, SpectralCube, ...
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  writer   │  records → .csv / .json / .parquet, mask → .npy
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod writer;
