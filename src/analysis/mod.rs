/// Analysis core: pure functions over in-memory cubes and record collections.
///
/// Architecture:
/// ```text
///   SpectralCube (rows × cols × bands)
///        │                         │
///        ▼                         ▼
///   ┌──────────┐             ┌──────────┐
///   │  reduce   │ mean/pixel  │   band    │ mu + k·sigma window
///   └──────────┘             └──────────┘
///        │ Vec<PixelRecord>        │ mask + Vec<GoodPixelRecord>
///        ▼                         ▼
///   ┌──────────┐             ┌─────────────┐
///   │ quartile  │ Q1, Q3, IQR │ interpolate  │ source grid → model grid
///   └──────────┘             └─────────────┘
///        │                         │
///        ▼                         ▼
///   ┌──────────┐               classify
///   │  filter   │ Tukey fences
///   └──────────┘
/// ```

pub mod band;
pub mod filter;
pub mod interpolate;
pub mod quartile;
pub mod reduce;
