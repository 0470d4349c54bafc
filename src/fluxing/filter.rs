use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use log::debug;

use super::alias::AliasTable;
use super::grid::{log_interpolate, merge_grids, trapz};
use crate::config::FluxingConfig;
use crate::error::{FluxingError, Result};

/// Speed of light in micron per second.
pub const SPEED_OF_LIGHT_UM: f64 = 2.99792458e14;

/// Speed of light in metre per second.
pub const SPEED_OF_LIGHT: f64 = 2.99792458e8;

const ANGSTROM_PER_MICRON: f64 = 1e4;

/// `∫F_λ T dλ / ∫c T/λ² dλ` with `F_λ` in W/nm/m², `λ` in micron and `c` in
/// m/s comes out in units of 1e-3 W/m²/Hz; this takes it to Jy.
const FLAMBDA_RATIO_TO_JY: f64 = 1e23;

// ---------------------------------------------------------------------------
// DetectorType
// ---------------------------------------------------------------------------

/// How the detector behind a transmission curve responds to light.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorType {
    /// Counts photons: the curve is multiplied by wavelength to express the
    /// response per unit energy.
    Photon,
    /// Measures energy directly.
    Bolometer,
}

impl DetectorType {
    /// Recognise a header tag. `None` when the text is not a detector keyword.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "photon" => Some(DetectorType::Photon),
            "energy" | "bolometer" => Some(DetectorType::Bolometer),
            _ => None,
        }
    }

    /// Detector type from the header comment lines (marker already stripped).
    ///
    /// The tag lives on the first comment line. Files that put the filter name
    /// there carry the tag on the second line instead. Anything unrecognised is
    /// a bolometer.
    fn from_header(comments: &[&str]) -> Self {
        comments
            .iter()
            .take(2)
            .find_map(|c| DetectorType::from_tag(c))
            .unwrap_or(DetectorType::Bolometer)
    }
}

// ---------------------------------------------------------------------------
// Derived scalars
// ---------------------------------------------------------------------------

/// Scalars computed from a filter's curve on first use and cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedScalar {
    EffectiveWavelength,
    PivotWavelength,
}

impl DerivedScalar {
    const COUNT: usize = 2;

    fn slot(self) -> usize {
        match self {
            DerivedScalar::EffectiveWavelength => 0,
            DerivedScalar::PivotWavelength => 1,
        }
    }

    fn compute(self, filter: &Filter) -> f64 {
        let wl = &filter.wavelengths;
        let t = &filter.trans_lambda;
        match self {
            DerivedScalar::EffectiveWavelength => {
                let weighted: Vec<f64> = t.iter().zip(wl).map(|(t, l)| t * l).collect();
                trapz(wl, &weighted) / trapz(wl, t)
            }
            DerivedScalar::PivotWavelength => {
                let per_l2: Vec<f64> = t.iter().zip(wl).map(|(t, l)| t / (l * l)).collect();
                (trapz(wl, t) / trapz(wl, &per_l2)).sqrt()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// A broadband transmission curve.
///
/// Two views of the curve are kept:
/// * `transmission` on ascending `frequencies` (Hz), scaled so its trapezoidal
///   integral over frequency is one;
/// * `trans_lambda` on ascending `wavelengths` (micron), unnormalised.
///
/// Photon-counting curves are multiplied by wavelength before either view is
/// built. Filters are immutable once parsed. The derived-scalar cache is a
/// set of `OnceLock`s, so concurrent first reads of the same scalar wait for
/// one computation instead of racing.
#[derive(Debug, Clone)]
pub struct Filter {
    name: String,
    path: PathBuf,
    detector: DetectorType,
    wavelengths: Vec<f64>,
    frequencies: Vec<f64>,
    transmission: Vec<f64>,
    trans_lambda: Vec<f64>,
    cache: [OnceLock<f64>; DerivedScalar::COUNT],
}

impl Filter {
    /// Load a filter by name from the directory configured in the environment.
    pub fn new(name: &str) -> Result<Self> {
        Self::load(name, &FluxingConfig::from_env()?)
    }

    /// Load a filter by name from `config.filter_dir`.
    pub fn load(name: &str, config: &FluxingConfig) -> Result<Self> {
        let path = resolve_filter_file(name, config, &AliasTable::default())?;
        Self::from_file_named(name, &path)
    }

    /// Load a filter file directly, naming the filter after the file stem.
    pub fn from_file(path: &Path) -> Result<Self> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        Self::from_file_named(&name, path)
    }

    pub(crate) fn from_file_named(name: &str, path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| FluxingError::io(path, e))?;
        Self::parse(name, path, &text)
    }

    /// Parse the text of a filter file.
    ///
    /// Layout: a block of `#` comment lines (the detector tag first), then two
    /// whitespace-separated columns `wavelength[Å] transmission`, wavelengths
    /// strictly ascending.
    pub fn parse(name: &str, source: &Path, text: &str) -> Result<Self> {
        let malformed = |line: usize, reason: String| FluxingError::MalformedFilterFile {
            path: source.to_path_buf(),
            line,
            reason,
        };

        let mut comments: Vec<&str> = Vec::new();
        let mut wavelengths: Vec<f64> = Vec::new();
        let mut trans_lambda: Vec<f64> = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            if wavelengths.is_empty() {
                if let Some(comment) = raw.strip_prefix('#') {
                    comments.push(comment.trim());
                    continue;
                }
            }
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() != 2 {
                return Err(malformed(line_no, format!("expected 2 columns, found {}", cols.len())));
            }
            let parse = |s: &str| {
                s.parse::<f64>()
                    .map_err(|_| malformed(line_no, format!("'{s}' is not a number")))
            };
            let wl = parse(cols[0])? / ANGSTROM_PER_MICRON;
            let t = parse(cols[1])?;

            if let Some(&prev) = wavelengths.last() {
                if wl <= prev {
                    return Err(malformed(line_no, "wavelengths must be strictly ascending".into()));
                }
            }
            wavelengths.push(wl);
            trans_lambda.push(t);
        }

        if wavelengths.len() < 2 {
            return Err(malformed(
                text.lines().count(),
                format!("need at least 2 samples, found {}", wavelengths.len()),
            ));
        }

        let detector = DetectorType::from_header(&comments);
        if detector == DetectorType::Photon {
            for (t, wl) in trans_lambda.iter_mut().zip(&wavelengths) {
                *t *= wl;
            }
        }

        let frequencies: Vec<f64> = wavelengths
            .iter()
            .rev()
            .map(|wl| SPEED_OF_LIGHT_UM / wl)
            .collect();
        let mut transmission: Vec<f64> = trans_lambda.iter().rev().copied().collect();
        let area = trapz(&frequencies, &transmission);
        if !(area.is_finite() && area > 0.0) {
            return Err(malformed(
                text.lines().count(),
                format!("transmission integrates to {area}"),
            ));
        }
        for t in &mut transmission {
            *t /= area;
        }

        debug!(
            "parsed filter '{name}' from {} ({detector:?}, {} samples, {:.4}-{:.4} micron)",
            source.display(),
            wavelengths.len(),
            wavelengths[0],
            wavelengths[wavelengths.len() - 1],
        );

        Ok(Filter {
            name: name.to_string(),
            path: source.to_path_buf(),
            detector,
            wavelengths,
            frequencies,
            transmission,
            trans_lambda,
            cache: Default::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn detector(&self) -> DetectorType {
        self.detector
    }

    /// Ascending wavelengths in micron.
    pub fn wavelengths(&self) -> &[f64] {
        &self.wavelengths
    }

    /// Ascending frequencies in Hz.
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// Frequency-space transmission, normalised to unit integral.
    pub fn transmission(&self) -> &[f64] {
        &self.transmission
    }

    /// Wavelength-space transmission, unnormalised.
    pub fn transmission_lambda(&self) -> &[f64] {
        &self.trans_lambda
    }

    /// Broadband flux density (Jy) of an SED given as `F_ν` in Jy on
    /// wavelengths in micron.
    ///
    /// A flux array with no positive value is an attenuation spectrum: it is
    /// convolved with its sign flipped and the sign restored on the result.
    /// An all-zero spectrum takes the same path and yields zero.
    pub fn convolve(&self, sed_wavelengths: &[f64], sed_fnu: &[f64]) -> Result<f64> {
        check_sed(sed_wavelengths, sed_fnu)?;

        let sign = if sed_fnu.iter().all(|f| *f <= 0.0) {
            debug!("'{}': non-positive SED treated as attenuation", self.name);
            -1.0
        } else {
            1.0
        };

        let (freqs, fnu) = sorted_pairs(
            sed_wavelengths.iter().map(|wl| SPEED_OF_LIGHT_UM / wl),
            sed_fnu.iter().map(|f| sign * f),
        );
        let grid = self.merged(&freqs, &self.frequencies)?;

        let flux = log_interpolate(&grid, &freqs, &fnu, true, true)?;
        let trans = log_interpolate(&grid, &self.frequencies, &self.transmission, true, false)?;
        let weighted: Vec<f64> = flux.iter().zip(&trans).map(|(f, t)| f * t).collect();

        // Renormalise on the merged grid, which is finer than the filter's.
        let norm = self.overlap_area(&grid, &trans, &freqs, &self.frequencies)?;
        Ok(sign * trapz(&grid, &weighted) / norm)
    }

    /// Broadband flux density (Jy) of an SED given as `F_λ` in W/nm/m² on
    /// wavelengths in micron.
    ///
    /// Works on the unnormalised wavelength-space curve and divides by its
    /// frequency integral written in wavelength (`∫ c T/λ² dλ`), so the
    /// frequency-space normalisation plays no part.
    pub fn convolve_lambda(&self, sed_wavelengths: &[f64], sed_flambda: &[f64]) -> Result<f64> {
        check_sed(sed_wavelengths, sed_flambda)?;

        let (wls, flambda) = sorted_pairs(
            sed_wavelengths.iter().copied(),
            sed_flambda.iter().copied(),
        );
        let grid = self.merged(&wls, &self.wavelengths)?;

        let flux = log_interpolate(&grid, &wls, &flambda, true, true)?;
        let trans = log_interpolate(&grid, &self.wavelengths, &self.trans_lambda, true, false)?;

        let weighted: Vec<f64> = flux.iter().zip(&trans).map(|(f, t)| f * t).collect();
        let per_freq: Vec<f64> = trans
            .iter()
            .zip(&grid)
            .map(|(t, l)| SPEED_OF_LIGHT * t / (l * l))
            .collect();
        let norm = self.overlap_area(&grid, &per_freq, &wls, &self.wavelengths)?;
        Ok(FLAMBDA_RATIO_TO_JY * trapz(&grid, &weighted) / norm)
    }

    /// `∫λ T dλ / ∫T dλ` over the wavelength-space curve, in micron.
    pub fn effective_wavelength(&self) -> f64 {
        self.derived(DerivedScalar::EffectiveWavelength)
    }

    /// `sqrt(∫T dλ / ∫T/λ² dλ)`, in micron.
    pub fn pivot_wavelength(&self) -> f64 {
        self.derived(DerivedScalar::PivotWavelength)
    }

    pub fn derived(&self, which: DerivedScalar) -> f64 {
        *self.cache[which.slot()].get_or_init(|| which.compute(self))
    }

    pub fn is_cached(&self, which: DerivedScalar) -> bool {
        self.cache[which.slot()].get().is_some()
    }

    fn merged(&self, sed_grid: &[f64], own_grid: &[f64]) -> Result<Vec<f64>> {
        let grid = merge_grids(sed_grid, own_grid)?;
        if grid.len() < 2 {
            return Err(incompatible(sed_grid, own_grid));
        }
        Ok(grid)
    }

    /// Denominator of a convolution; zero when the SED only covers a part of
    /// the curve without transmission.
    fn overlap_area(
        &self,
        grid: &[f64],
        y: &[f64],
        sed_grid: &[f64],
        own_grid: &[f64],
    ) -> Result<f64> {
        let area = trapz(grid, y);
        if area > 0.0 && area.is_finite() {
            Ok(area)
        } else {
            debug!("'{}': no transmission inside the SED's range", self.name);
            Err(incompatible(sed_grid, own_grid))
        }
    }
}

fn check_sed(wavelengths: &[f64], flux: &[f64]) -> Result<()> {
    if wavelengths.len() != flux.len() {
        return Err(FluxingError::LengthMismatch {
            what: "SED flux",
            expected: wavelengths.len(),
            found: flux.len(),
        });
    }
    if wavelengths.is_empty() {
        return Err(FluxingError::EmptyGrid { what: "SED" });
    }
    Ok(())
}

/// Pair up abscissae and values and sort them by abscissa.
fn sorted_pairs(
    x: impl Iterator<Item = f64>,
    y: impl Iterator<Item = f64>,
) -> (Vec<f64>, Vec<f64>) {
    let mut pairs: Vec<(f64, f64)> = x.zip(y).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    pairs.into_iter().unzip()
}

fn incompatible(a: &[f64], b: &[f64]) -> FluxingError {
    FluxingError::IncompatibleGrids {
        a_min: a[0],
        a_max: a[a.len() - 1],
        b_min: b[0],
        b_max: b[b.len() - 1],
    }
}

// ---------------------------------------------------------------------------
// Name resolution
// ---------------------------------------------------------------------------

/// Find the file in `config.filter_dir` that `name` refers to.
///
/// Exact aliases from the configuration are tried first, then `table`. File
/// stems are compared case-insensitively; when several files share a stem the
/// lexicographically first path wins.
pub fn resolve_filter_file(
    name: &str,
    config: &FluxingConfig,
    table: &AliasTable,
) -> Result<PathBuf> {
    let not_found = || FluxingError::FilterNotFound {
        name: name.to_string(),
    };

    let stem = match config.alias(name) {
        Some(stem) => stem.to_lowercase(),
        None => table.resolve(name).ok_or_else(not_found)?,
    };

    let dir = &config.filter_dir;
    let entries = std::fs::read_dir(dir).map_err(|e| FluxingError::io(dir, e))?;
    let mut matches = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| FluxingError::io(dir, e))?.path();
        if !path.is_file() {
            continue;
        }
        let file_stem = path.file_stem().and_then(|s| s.to_str()).map(str::to_lowercase);
        if file_stem.as_deref() == Some(stem.as_str()) {
            matches.push(path);
        }
    }
    matches.sort();

    let path = matches.into_iter().next().ok_or_else(not_found)?;
    debug!("filter '{name}' resolved to {}", path.display());
    Ok(path)
}
