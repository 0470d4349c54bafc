/// Catalog layer: tabular inputs and outputs around the fluxing core.
///
/// Architecture:
/// ```text
///  .parquet / .json / .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → records
///   └──────────┘
///        │
///        ├──► ModelSpectrum      → HighresSed
///        └──► PhotometryCatalog  → BroadbandSed (per object, via FilterBank)
/// ```

pub mod loader;
pub mod model;

pub use loader::{load_models, load_photometry, write_broadband_csv};
pub use model::{BandFlux, MetadataValue, ModelSpectrum, PhotometryCatalog, PhotometryRow};
