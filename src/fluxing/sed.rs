use std::ops::{Div, Mul};
use std::sync::Arc;

use log::{debug, info};

use super::filter::{Filter, SPEED_OF_LIGHT};
use crate::error::{FluxingError, Result};

/// Model-library column holding `F_ν` in mJy.
pub const FNU_COLUMN: &str = "Fnu";

// ---------------------------------------------------------------------------
// Flux errors
// ---------------------------------------------------------------------------

/// Uncertainty on the flux density of every sample.
#[derive(Debug, Clone, PartialEq)]
pub enum FluxError {
    Symmetric(Vec<f64>),
    Asymmetric { lower: Vec<f64>, upper: Vec<f64> },
}

impl FluxError {
    /// Error bars given as rows of a 2-D table: exactly two rows, lower then
    /// upper.
    pub fn from_rows(mut rows: Vec<Vec<f64>>) -> Result<Self> {
        if rows.len() != 2 {
            return Err(FluxingError::ShapeMismatch { rows: rows.len() });
        }
        let upper = rows.pop().unwrap_or_default();
        let lower = rows.pop().unwrap_or_default();
        Ok(FluxError::Asymmetric { lower, upper })
    }

    fn check_len(&self, n: usize) -> Result<()> {
        let rows: Vec<&Vec<f64>> = match self {
            FluxError::Symmetric(err) => vec![err],
            FluxError::Asymmetric { lower, upper } => vec![lower, upper],
        };
        for row in rows {
            if row.len() != n {
                return Err(FluxingError::LengthMismatch {
                    what: "flux errors",
                    expected: n,
                    found: row.len(),
                });
            }
        }
        Ok(())
    }

    fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        let apply = |v: &[f64]| -> Vec<f64> { v.iter().map(|x| f(*x)).collect() };
        match self {
            FluxError::Symmetric(err) => FluxError::Symmetric(apply(err.as_slice())),
            FluxError::Asymmetric { lower, upper } => FluxError::Asymmetric {
                lower: apply(lower.as_slice()),
                upper: apply(upper.as_slice()),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// SedData and the common interface
// ---------------------------------------------------------------------------

/// Samples shared by every SED: wavelength in micron, `F_ν` in Jy.
#[derive(Debug, Clone, PartialEq)]
pub struct SedData {
    pub wavelengths: Vec<f64>,
    pub fnu: Vec<f64>,
    pub ferr: Option<FluxError>,
}

impl SedData {
    pub fn new(wavelengths: Vec<f64>, fnu: Vec<f64>, ferr: Option<FluxError>) -> Result<Self> {
        if fnu.len() != wavelengths.len() {
            return Err(FluxingError::LengthMismatch {
                what: "SED flux",
                expected: wavelengths.len(),
                found: fnu.len(),
            });
        }
        if let Some(err) = &ferr {
            err.check_len(wavelengths.len())?;
        }
        Ok(Self {
            wavelengths,
            fnu,
            ferr,
        })
    }

    fn scaled(&self, factor: f64) -> Self {
        Self {
            wavelengths: self.wavelengths.clone(),
            fnu: self.fnu.iter().map(|f| f * factor).collect(),
            ferr: self.ferr.as_ref().map(|e| e.map(|x| x * factor)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SedKind {
    Highres,
    Broadband,
}

impl SedKind {
    pub fn label(self) -> &'static str {
        match self {
            SedKind::Highres => "high resolution",
            SedKind::Broadband => "broadband",
        }
    }
}

/// Read access common to all SED flavours.
pub trait SpectralEnergyDistribution {
    fn data(&self) -> &SedData;

    fn kind(&self) -> SedKind;

    fn wavelengths(&self) -> &[f64] {
        &self.data().wavelengths
    }

    fn fnu(&self) -> &[f64] {
        &self.data().fnu
    }

    fn ferr(&self) -> Option<&FluxError> {
        self.data().ferr.as_ref()
    }

    fn len(&self) -> usize {
        self.data().wavelengths.len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The high-resolution view, if this is one.
    fn as_highres(&self) -> Option<&HighresSed> {
        None
    }
}

macro_rules! impl_scalar_ops {
    ($ty:ident) => {
        impl Mul<f64> for &$ty {
            type Output = $ty;

            fn mul(self, factor: f64) -> $ty {
                let mut out = self.clone();
                out.data = self.data.scaled(factor);
                out
            }
        }

        impl Mul<f64> for $ty {
            type Output = $ty;

            fn mul(self, factor: f64) -> $ty {
                &self * factor
            }
        }

        impl Div<f64> for &$ty {
            type Output = $ty;

            fn div(self, divisor: f64) -> $ty {
                let mut out = self.clone();
                out.data = self.data.scaled(1.0 / divisor);
                out
            }
        }

        impl Div<f64> for $ty {
            type Output = $ty;

            fn div(self, divisor: f64) -> $ty {
                &self / divisor
            }
        }
    };
}

// ---------------------------------------------------------------------------
// FilterRef
// ---------------------------------------------------------------------------

/// A filter given either by name or already parsed.
///
/// Names are loaded from disk on every use; loops should resolve their
/// filters once (see [`FilterBank`](super::bank::FilterBank)) and pass them
/// as `Arc<Filter>`.
#[derive(Debug, Clone)]
pub enum FilterRef {
    Name(String),
    Loaded(Arc<Filter>),
}

impl FilterRef {
    pub fn into_filter(self) -> Result<Arc<Filter>> {
        match self {
            FilterRef::Name(name) => Ok(Arc::new(Filter::new(&name)?)),
            FilterRef::Loaded(filter) => Ok(filter),
        }
    }
}

impl From<&str> for FilterRef {
    fn from(name: &str) -> Self {
        FilterRef::Name(name.to_string())
    }
}

impl From<String> for FilterRef {
    fn from(name: String) -> Self {
        FilterRef::Name(name)
    }
}

impl From<Filter> for FilterRef {
    fn from(filter: Filter) -> Self {
        FilterRef::Loaded(Arc::new(filter))
    }
}

impl From<Arc<Filter>> for FilterRef {
    fn from(filter: Arc<Filter>) -> Self {
        FilterRef::Loaded(filter)
    }
}

impl From<&Arc<Filter>> for FilterRef {
    fn from(filter: &Arc<Filter>) -> Self {
        FilterRef::Loaded(Arc::clone(filter))
    }
}

fn collect_filters<I>(filters: I) -> Result<Vec<Arc<Filter>>>
where
    I: IntoIterator,
    I::Item: Into<FilterRef>,
{
    filters
        .into_iter()
        .map(|f| Into::<FilterRef>::into(f).into_filter())
        .collect()
}

// ---------------------------------------------------------------------------
// HighresSed
// ---------------------------------------------------------------------------

/// A densely sampled spectrum, typically a model from a fitting library.
#[derive(Debug, Clone, PartialEq)]
pub struct HighresSed {
    data: SedData,
}

impl SpectralEnergyDistribution for HighresSed {
    fn data(&self) -> &SedData {
        &self.data
    }

    fn kind(&self) -> SedKind {
        SedKind::Highres
    }

    fn as_highres(&self) -> Option<&HighresSed> {
        Some(self)
    }
}

impl_scalar_ops!(HighresSed);

impl HighresSed {
    pub fn new(wavelengths: Vec<f64>, fnu: Vec<f64>) -> Result<Self> {
        Self::with_errors(wavelengths, fnu, None)
    }

    pub fn with_errors(
        wavelengths: Vec<f64>,
        fnu: Vec<f64>,
        ferr: Option<FluxError>,
    ) -> Result<Self> {
        Ok(Self {
            data: SedData::new(wavelengths, fnu, ferr)?,
        })
    }

    /// SEDs from the columns of a model library's best-fit table.
    ///
    /// Wavelengths come in nm. The [`FNU_COLUMN`] is in mJy and becomes Jy;
    /// any other column is a per-nm quantity and becomes per-Hz through
    /// `λ² F_λ / c`. Every column is multiplied by `flux_factor` first. With
    /// `combine` the columns are summed into a single SED, otherwise one SED
    /// per column is returned in order.
    pub fn from_model_columns(
        wavelengths_nm: &[f64],
        columns: &[(&str, &[f64])],
        flux_factor: f64,
        combine: bool,
    ) -> Result<Vec<Self>> {
        if columns.is_empty() {
            return Err(FluxingError::EmptyGrid { what: "model columns" });
        }
        let wavelengths: Vec<f64> = wavelengths_nm.iter().map(|nm| nm / 1e3).collect();

        let mut converted = Vec::with_capacity(columns.len());
        for (name, values) in columns {
            if values.len() != wavelengths.len() {
                return Err(FluxingError::LengthMismatch {
                    what: "model column",
                    expected: wavelengths.len(),
                    found: values.len(),
                });
            }
            let fnu: Vec<f64> = if *name == FNU_COLUMN {
                values.iter().map(|v| v * flux_factor / 1e3).collect()
            } else {
                values
                    .iter()
                    .zip(&wavelengths)
                    .map(|(v, wl)| wl * wl * v * flux_factor / (SPEED_OF_LIGHT * 1e3))
                    .collect()
            };
            converted.push(fnu);
        }

        if combine {
            let mut total = vec![0.0; wavelengths.len()];
            for fnu in &converted {
                for (t, f) in total.iter_mut().zip(fnu) {
                    *t += f;
                }
            }
            return Ok(vec![Self::new(wavelengths, total)?]);
        }
        converted
            .into_iter()
            .map(|fnu| Self::new(wavelengths.clone(), fnu))
            .collect()
    }

    /// Broadband photometry of this spectrum through `filters`.
    ///
    /// With `quick` each band takes the sample nearest the filter's pivot
    /// wavelength (the wavelengths must then be ascending) instead of the
    /// full convolution.
    pub fn to_broadband<I>(&self, filters: I, quick: bool) -> Result<BroadbandSed>
    where
        I: IntoIterator,
        I::Item: Into<FilterRef>,
    {
        let filters = collect_filters(filters)?;
        let fnu = filters
            .iter()
            .map(|filter| {
                if quick {
                    self.nearest_fnu(filter.pivot_wavelength())
                } else {
                    filter.convolve(&self.data.wavelengths, &self.data.fnu)
                }
            })
            .collect::<Result<Vec<f64>>>()?;
        BroadbandSed::from_filters(filters, fnu, None)
    }

    fn nearest_fnu(&self, wavelength: f64) -> Result<f64> {
        let wl = &self.data.wavelengths;
        if wl.is_empty() {
            return Err(FluxingError::EmptyGrid { what: "SED" });
        }
        let idx = wl.partition_point(|&w| w < wavelength);
        let best = if idx == 0 {
            0
        } else if idx == wl.len() || wavelength - wl[idx - 1] <= wl[idx] - wavelength {
            idx - 1
        } else {
            idx
        };
        Ok(self.data.fnu[best])
    }

    /// Shift to the rest frame: wavelengths and `F_ν` are divided by `1 + z`,
    /// which conserves `F_ν dν`.
    pub fn blueshift(&mut self, z: f64) -> Result<()> {
        let factor = 1.0 + check_redshift(z)?;
        self.rescale(1.0 / factor);
        Ok(())
    }

    /// Inverse of [`blueshift`](Self::blueshift).
    pub fn redshift(&mut self, z: f64) -> Result<()> {
        let factor = 1.0 + check_redshift(z)?;
        self.rescale(factor);
        Ok(())
    }

    fn rescale(&mut self, factor: f64) {
        for wl in &mut self.data.wavelengths {
            *wl *= factor;
        }
        for f in &mut self.data.fnu {
            *f *= factor;
        }
    }
}

fn check_redshift(z: f64) -> Result<f64> {
    if z > -1.0 && z.is_finite() {
        Ok(z)
    } else {
        Err(FluxingError::InvalidRedshift(z))
    }
}

// ---------------------------------------------------------------------------
// BroadbandSed
// ---------------------------------------------------------------------------

/// Photometry through a list of filters; each sample sits at its filter's
/// pivot wavelength.
#[derive(Debug, Clone)]
pub struct BroadbandSed {
    data: SedData,
    filters: Vec<Arc<Filter>>,
}

impl SpectralEnergyDistribution for BroadbandSed {
    fn data(&self) -> &SedData {
        &self.data
    }

    fn kind(&self) -> SedKind {
        SedKind::Broadband
    }
}

impl_scalar_ops!(BroadbandSed);

impl BroadbandSed {
    /// Photometry from filters given by name or as parsed filters.
    pub fn new<I>(filters: I, fnu: Vec<f64>, ferr: Option<FluxError>) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<FilterRef>,
    {
        Self::from_filters(collect_filters(filters)?, fnu, ferr)
    }

    pub fn from_filters(
        filters: Vec<Arc<Filter>>,
        fnu: Vec<f64>,
        ferr: Option<FluxError>,
    ) -> Result<Self> {
        if fnu.len() != filters.len() {
            return Err(FluxingError::LengthMismatch {
                what: "broadband fluxes",
                expected: filters.len(),
                found: fnu.len(),
            });
        }
        let wavelengths = filters.iter().map(|f| f.pivot_wavelength()).collect();
        Ok(Self {
            data: SedData::new(wavelengths, fnu, ferr)?,
            filters,
        })
    }

    pub fn filters(&self) -> &[Arc<Filter>] {
        &self.filters
    }

    /// Rest-frame photometry assuming `model` has the right spectral shape.
    ///
    /// Each band is handled on its own: the model is scaled to match the
    /// observed flux in that band, shifted to the rest frame and convolved
    /// through the same filter again. `model` must be high resolution and is
    /// taken at the observed redshift. Flux errors are not carried over.
    pub fn k_correct<M>(&self, z: f64, model: &M) -> Result<BroadbandSed>
    where
        M: SpectralEnergyDistribution + ?Sized,
    {
        let model = model.as_highres().ok_or(FluxingError::WrongSedType {
            found: model.kind().label(),
        })?;
        check_redshift(z)?;

        let baseline = model.to_broadband(&self.filters, false)?;
        let mut corrected = Vec::with_capacity(self.filters.len());
        for (i, filter) in self.filters.iter().enumerate() {
            let base = baseline.fnu()[i];
            if base == 0.0 || !base.is_finite() {
                return Err(FluxingError::DegenerateModel {
                    band: filter.name().to_string(),
                });
            }
            let scale = self.data.fnu[i] / base;
            let mut scaled = model * scale;
            scaled.blueshift(z)?;
            let flux = filter.convolve(scaled.wavelengths(), scaled.fnu())?;
            debug!(
                "k-correct '{}': observed {} Jy, scale {scale:.4e}, rest frame {flux} Jy",
                filter.name(),
                self.data.fnu[i]
            );
            corrected.push(flux);
        }
        info!("k-corrected {} bands at z = {z}", corrected.len());
        BroadbandSed::from_filters(self.filters.clone(), corrected, None)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn sed() -> HighresSed {
        HighresSed::new(vec![0.5, 1.0, 2.0, 4.0], vec![1.0, 2.0, 3.0, 4.0]).unwrap()
    }

    #[test]
    fn flux_errors_need_two_rows() {
        let err = FluxError::from_rows(vec![vec![0.1; 4]; 3]).unwrap_err();
        assert!(matches!(err, FluxingError::ShapeMismatch { rows: 3 }));
        let err = FluxError::from_rows(vec![vec![0.1; 4]]).unwrap_err();
        assert!(matches!(err, FluxingError::ShapeMismatch { rows: 1 }));

        let ferr = FluxError::from_rows(vec![vec![0.1; 4], vec![0.2; 4]]).unwrap();
        assert_eq!(
            ferr,
            FluxError::Asymmetric {
                lower: vec![0.1; 4],
                upper: vec![0.2; 4]
            }
        );
    }

    #[test]
    fn flux_errors_must_match_the_samples() {
        let err = HighresSed::with_errors(
            vec![1.0, 2.0],
            vec![1.0, 2.0],
            Some(FluxError::Symmetric(vec![0.1])),
        )
        .unwrap_err();
        assert!(matches!(err, FluxingError::LengthMismatch { .. }));
        assert!(HighresSed::new(vec![1.0, 2.0], vec![1.0]).is_err());
    }

    #[test]
    fn arithmetic_returns_new_scaled_copies() {
        let original = HighresSed::with_errors(
            vec![1.0, 2.0],
            vec![2.0, 4.0],
            Some(FluxError::Symmetric(vec![0.2, 0.4])),
        )
        .unwrap();

        let doubled = &original * 2.0;
        assert_eq!(doubled.fnu(), &[4.0, 8.0]);
        assert_eq!(doubled.ferr(), Some(&FluxError::Symmetric(vec![0.4, 0.8])));
        assert_eq!(original.fnu(), &[2.0, 4.0]);

        let halved = original.clone() / 2.0;
        assert_eq!(halved.fnu(), &[1.0, 2.0]);
        assert_eq!(halved.wavelengths(), original.wavelengths());
    }

    #[test]
    fn redshift_then_blueshift_restores_the_sed() {
        for z in [-0.5, 0.0, 0.3, 2.0, 7.5] {
            let original = sed();
            let mut shifted = original.clone();
            shifted.redshift(z).unwrap();
            shifted.blueshift(z).unwrap();
            for (a, b) in shifted.wavelengths().iter().zip(original.wavelengths()) {
                assert_relative_eq!(*a, *b, max_relative = 1e-12);
            }
            for (a, b) in shifted.fnu().iter().zip(original.fnu()) {
                assert_relative_eq!(*a, *b, max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn redshift_scales_wavelength_and_flux_together() {
        let mut s = sed();
        s.redshift(1.0).unwrap();
        assert_eq!(s.wavelengths(), &[1.0, 2.0, 4.0, 8.0]);
        assert_eq!(s.fnu(), &[2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn redshift_below_minus_one_is_rejected() {
        let mut s = sed();
        assert!(matches!(s.redshift(-1.0), Err(FluxingError::InvalidRedshift(_))));
        assert!(matches!(s.blueshift(-3.0), Err(FluxingError::InvalidRedshift(_))));
        assert_eq!(s, sed());
    }

    #[test]
    fn nearest_sample_picks_the_closest_wavelength() {
        let s = sed();
        assert_eq!(s.nearest_fnu(0.1).unwrap(), 1.0);
        assert_eq!(s.nearest_fnu(0.8).unwrap(), 2.0);
        assert_eq!(s.nearest_fnu(1.4).unwrap(), 2.0);
        assert_eq!(s.nearest_fnu(1.6).unwrap(), 3.0);
        assert_eq!(s.nearest_fnu(100.0).unwrap(), 4.0);
    }

    #[test]
    fn model_columns_convert_units() {
        let wl_nm = [500.0, 1000.0];
        let fnu_mjy = [1000.0, 2000.0];
        let lum = [1.0, 1.0];

        let seds = HighresSed::from_model_columns(
            &wl_nm,
            &[(FNU_COLUMN, &fnu_mjy[..]), ("L_lambda_total", &lum[..])],
            1.0,
            false,
        )
        .unwrap();
        assert_eq!(seds.len(), 2);
        assert_eq!(seds[0].wavelengths(), &[0.5, 1.0]);
        assert_eq!(seds[0].fnu(), &[1.0, 2.0]);
        let expected = 0.25 / (SPEED_OF_LIGHT * 1e3);
        assert_relative_eq!(seds[1].fnu()[0], expected, max_relative = 1e-12);

        let combined = HighresSed::from_model_columns(
            &wl_nm,
            &[(FNU_COLUMN, &fnu_mjy[..]), (FNU_COLUMN, &fnu_mjy[..])],
            1e3,
            true,
        )
        .unwrap();
        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].fnu(), &[2000.0, 4000.0]);
    }
}
