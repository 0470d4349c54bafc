use std::collections::BTreeMap;
use std::fmt;

use log::{debug, warn};

use crate::error::Result;
use crate::fluxing::{BroadbandSed, FilterBank, FluxError, HighresSed};

// ---------------------------------------------------------------------------
// MetadataValue – a single cell of a non-flux column
// ---------------------------------------------------------------------------

/// A dynamically-typed table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => write!(f, "{s}"),
            MetadataValue::Integer(i) => write!(f, "{i}"),
            MetadataValue::Float(v) => write!(f, "{v}"),
            MetadataValue::Bool(b) => write!(f, "{b}"),
            MetadataValue::Null => write!(f, "<null>"),
        }
    }
}

impl MetadataValue {
    /// Numeric view of the cell; `Null` and text are `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Float(v) => Some(*v),
            MetadataValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ModelSpectrum – one row of a model library
// ---------------------------------------------------------------------------

/// A model spectrum as stored in a library file.
#[derive(Debug, Clone)]
pub struct ModelSpectrum {
    /// Wavelengths in micron.
    pub wavelengths: Vec<f64>,
    /// `F_ν` in Jy, same length as `wavelengths`.
    pub fnu: Vec<f64>,
    /// Every other column: column_name → value.
    pub metadata: BTreeMap<String, MetadataValue>,
}

impl ModelSpectrum {
    pub fn to_sed(&self) -> Result<HighresSed> {
        HighresSed::new(self.wavelengths.clone(), self.fnu.clone())
    }

    /// Row label: the `id` column when present, else `fallback`.
    pub fn label(&self, fallback: usize) -> String {
        match self.metadata.get("id") {
            Some(MetadataValue::Null) | None => fallback.to_string(),
            Some(id) => id.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Photometry catalog
// ---------------------------------------------------------------------------

/// Flux and optional error of one object in one band, in Jy.
#[derive(Debug, Clone, PartialEq)]
pub struct BandFlux {
    pub band: String,
    pub flux: Option<f64>,
    pub error: Option<f64>,
}

/// One object of a photometry catalog.
#[derive(Debug, Clone)]
pub struct PhotometryRow {
    pub id: MetadataValue,
    /// One entry per catalog band, in catalog order.
    pub bands: Vec<BandFlux>,
    pub metadata: BTreeMap<String, MetadataValue>,
}

impl PhotometryRow {
    /// Broadband SED from the bands measured for this object.
    ///
    /// Bands without a flux are skipped. Errors are attached only when every
    /// measured band has one.
    pub fn to_broadband(&self, bank: &FilterBank) -> Result<BroadbandSed> {
        let measured: Vec<&BandFlux> = self.bands.iter().filter(|b| b.flux.is_some()).collect();
        for missing in self.bands.iter().filter(|b| b.flux.is_none()) {
            warn!("object {}: no flux in band '{}', skipped", self.id, missing.band);
        }

        let names: Vec<&str> = measured.iter().map(|b| b.band.as_str()).collect();
        let filters = bank.get_many(&names)?;
        let fnu = measured.iter().filter_map(|b| b.flux).collect();
        let errors: Option<Vec<f64>> = measured.iter().map(|b| b.error).collect();
        if errors.is_none() && measured.iter().any(|b| b.error.is_some()) {
            debug!("object {}: incomplete flux errors dropped", self.id);
        }

        BroadbandSed::from_filters(filters, fnu, errors.map(FluxError::Symmetric))
    }

    /// Numeric metadata such as a redshift column.
    pub fn value(&self, column: &str) -> Option<f64> {
        self.metadata.get(column).and_then(MetadataValue::as_f64)
    }
}

/// A table of per-object fluxes keyed by band name.
#[derive(Debug, Clone)]
pub struct PhotometryCatalog {
    /// Band column names; each usable as a filter name or alias.
    pub bands: Vec<String>,
    pub rows: Vec<PhotometryRow>,
}

impl PhotometryCatalog {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
