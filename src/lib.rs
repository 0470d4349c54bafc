//! Broadband photometry from spectral energy distributions.
//!
//! Filters are read from transmission-curve files and normalised in
//! frequency space; spectra are convolved through them on a merged sample
//! grid with log-space interpolation. On top of that sit broadband SEDs,
//! K-corrections and loaders for model libraries and photometry catalogs.

pub mod catalog;
pub mod config;
pub mod error;
pub mod fluxing;

pub use config::FluxingConfig;
pub use error::{FluxingError, Result};
pub use fluxing::{
    BroadbandSed, DetectorType, Filter, FilterBank, FilterRef, FluxError, HighresSed,
    SpectralEnergyDistribution,
};
