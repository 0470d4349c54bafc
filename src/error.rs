use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the fluxing core.
///
/// Every variant is a hard failure: nothing in the core retries or falls back
/// to a degraded result.
#[derive(Error, Debug)]
pub enum FluxingError {
    #[error("filter '{name}' was not found")]
    FilterNotFound { name: String },

    #[error("grids are incompatible: [{a_min}, {a_max}] does not overlap [{b_min}, {b_max}]")]
    IncompatibleGrids {
        a_min: f64,
        a_max: f64,
        b_min: f64,
        b_max: f64,
    },

    #[error("flux errors must be one row (symmetric) or two rows (lower, upper), got {rows} rows")]
    ShapeMismatch { rows: usize },

    #[error("model SED must be high resolution, got a {found} SED")]
    WrongSedType { found: &'static str },

    #[error("{what}: expected {expected} values, found {found}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{what} has no samples")]
    EmptyGrid { what: &'static str },

    #[error("redshift must be greater than -1, got {0}")]
    InvalidRedshift(f64),

    #[error("model broadband flux in band '{band}' is zero or not finite")]
    DegenerateModel { band: String },

    #[error("{}:{line}: {reason}", .path.display())]
    MalformedFilterFile {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, FluxingError>;

impl FluxingError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FluxingError::Io {
            path: path.into(),
            source,
        }
    }
}
