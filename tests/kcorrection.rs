mod common;

use approx::assert_relative_eq;

use sedflux::{
    BroadbandSed, FilterBank, FluxingConfig, FluxingError, HighresSed, SpectralEnergyDistribution,
};

use common::{blackbody_fnu, filter_dir, log_grid};

const BANDS: [&str; 3] = ["GALEX_FUV", "SDSS_u", "WISE_3.4"];

/// Rest-frame template: a warm blackbody plus a cool one.
fn template() -> HighresSed {
    let wavelengths = log_grid(1500);
    let fnu = wavelengths
        .iter()
        .map(|wl| blackbody_fnu(*wl, 8000.0) + 50.0 * blackbody_fnu(*wl, 1500.0))
        .collect();
    HighresSed::new(wavelengths, fnu).unwrap()
}

#[test]
fn zero_redshift_returns_the_observed_fluxes() {
    let dir = filter_dir();
    let bank = FilterBank::new(FluxingConfig::with_filter_dir(dir.path()));
    let filters = bank.get_many(&BANDS).unwrap();

    let observed = BroadbandSed::new(&filters, vec![1.2e-3, 4.5e-3, 2.0e-2], None).unwrap();
    let corrected = observed.k_correct(0.0, &template()).unwrap();

    assert_eq!(corrected.filters().len(), 3);
    for (got, want) in corrected.fnu().iter().zip(observed.fnu()) {
        assert_relative_eq!(*got, *want, max_relative = 1e-9);
    }
}

#[test]
fn correction_recovers_rest_frame_photometry_of_the_template() {
    let dir = filter_dir();
    let bank = FilterBank::new(FluxingConfig::with_filter_dir(dir.path()));
    let filters = bank.get_many(&BANDS).unwrap();
    let z = 0.4;

    let rest = template();
    let mut observed_model = rest.clone();
    observed_model.redshift(z).unwrap();

    // An object three times brighter than the template, observed at z.
    let observed = observed_model.to_broadband(&filters, false).unwrap() * 3.0;
    let corrected = observed.k_correct(z, &observed_model).unwrap();

    let expected = rest.to_broadband(&filters, false).unwrap();
    for (got, want) in corrected.fnu().iter().zip(expected.fnu()) {
        assert_relative_eq!(*got, 3.0 * want, max_relative = 1e-9);
    }

    // The model passed in is left untouched.
    let mut check = rest.clone();
    check.redshift(z).unwrap();
    assert_eq!(observed_model, check);
}

#[test]
fn each_band_is_scaled_on_its_own() {
    let dir = filter_dir();
    let bank = FilterBank::new(FluxingConfig::with_filter_dir(dir.path()));
    let filters = bank.get_many(&BANDS).unwrap();
    let z = 0.25;

    let mut model = template();
    model.redshift(z).unwrap();
    let baseline = model.to_broadband(&filters, false).unwrap();

    let scales = [1.0, 2.0, 0.5];
    let fnu = baseline.fnu().iter().zip(scales).map(|(f, s)| f * s).collect();
    let observed = BroadbandSed::from_filters(filters.clone(), fnu, None).unwrap();
    let corrected = observed.k_correct(z, &model).unwrap();

    let unit = baseline.k_correct(z, &model).unwrap();
    for ((got, unit), s) in corrected.fnu().iter().zip(unit.fnu()).zip(scales) {
        assert_relative_eq!(*got, unit * s, max_relative = 1e-9);
    }
}

#[test]
fn model_must_be_high_resolution() {
    let dir = filter_dir();
    let bank = FilterBank::new(FluxingConfig::with_filter_dir(dir.path()));
    let filters = bank.get_many(&BANDS).unwrap();

    let observed = BroadbandSed::from_filters(filters.clone(), vec![1.0, 1.0, 1.0], None).unwrap();
    let not_a_model = observed.clone();
    assert!(matches!(
        observed.k_correct(0.1, &not_a_model),
        Err(FluxingError::WrongSedType { found: "broadband" })
    ));
}

#[test]
fn empty_model_band_cannot_be_scaled() {
    let dir = filter_dir();
    let bank = FilterBank::new(FluxingConfig::with_filter_dir(dir.path()));
    let filters = bank.get_many(&BANDS).unwrap();

    let wavelengths = log_grid(200);
    let dark = HighresSed::new(wavelengths.clone(), vec![0.0; wavelengths.len()]).unwrap();
    let observed = BroadbandSed::from_filters(filters, vec![1.0, 1.0, 1.0], None).unwrap();
    assert!(matches!(
        observed.k_correct(0.1, &dark),
        Err(FluxingError::DegenerateModel { .. })
    ));
}

#[test]
fn broadband_construction_checks_lengths() {
    let dir = filter_dir();
    let bank = FilterBank::new(FluxingConfig::with_filter_dir(dir.path()));
    let filters = bank.get_many(&BANDS).unwrap();

    assert!(matches!(
        BroadbandSed::from_filters(filters.clone(), vec![1.0], None),
        Err(FluxingError::LengthMismatch { .. })
    ));

    let sed = BroadbandSed::from_filters(filters, vec![1.0, 2.0, 3.0], None).unwrap();
    let halved = &sed / 2.0;
    assert_eq!(halved.fnu(), &[0.5, 1.0, 1.5]);
    assert_eq!(halved.wavelengths(), sed.wavelengths());
}
