/// Fluxing core: filter curves, SEDs and the convolution between them.
///
/// Architecture:
/// ```text
///   filter name ──► alias ──► filter file (.dat)
///                               │
///                               ▼
///                        ┌────────────┐
///                        │   Filter   │  ν-normalised curve, pivot λ
///                        └────────────┘
///                               │ convolve (grid: merge + log interp)
///                               ▼
///   HighresSed ──to_broadband──► BroadbandSed ──k_correct──► rest-frame SED
/// ```
pub mod alias;
pub mod bank;
pub mod filter;
pub mod grid;
pub mod sed;

pub use bank::FilterBank;
pub use filter::{DerivedScalar, DetectorType, Filter};
pub use sed::{
    BroadbandSed, FilterRef, FluxError, HighresSed, SedData, SedKind, SpectralEnergyDistribution,
};
