mod common;

use approx::assert_relative_eq;

use std::sync::Arc;

use sedflux::fluxing::grid::trapz;
use sedflux::{DetectorType, Filter, FilterBank, FluxingConfig, FluxingError};

use common::{filter_dir, ALL_BANDS};

#[test]
fn every_filter_is_normalised_in_frequency() {
    let dir = filter_dir();
    for band in ALL_BANDS {
        let filter = Filter::from_file(&dir.path().join(band.file)).unwrap();
        let area = trapz(filter.frequencies(), filter.transmission());
        assert_relative_eq!(area, 1.0, max_relative = 1e-12);
    }
}

#[test]
fn survey_names_resolve_case_insensitively() {
    let dir = filter_dir();
    let config = FluxingConfig::with_filter_dir(dir.path());

    let upper = Filter::load("WISE_3.4", &config).unwrap();
    let lower = Filter::load("wise_3.4", &config).unwrap();
    let numbered = Filter::load("WISE_1", &config).unwrap();
    assert_eq!(upper.path(), lower.path());
    assert_eq!(upper.path(), numbered.path());
    assert_eq!(upper.name(), "WISE_3.4");

    let sdss = Filter::load("sdss_u", &config).unwrap();
    let direct = Filter::load("u_prime", &config).unwrap();
    assert_eq!(sdss.path(), direct.path());
    assert_eq!(sdss.wavelengths(), direct.wavelengths());

    let galex = Filter::load("GALEX_FUV", &config).unwrap();
    assert!(galex.path().ends_with("FUV.dat"));

    let spire = Filter::load("SPIRE_250", &config).unwrap();
    assert!(spire.path().ends_with("psw_s.dat"));
    let hipe = Filter::load("PSW_hipe", &config).unwrap();
    assert_eq!(spire.path(), hipe.path());
}

#[test]
fn unknown_names_are_not_found() {
    let dir = filter_dir();
    let config = FluxingConfig::with_filter_dir(dir.path());

    for name in ["wise_5", "SDSS_q", "IRAC_I1"] {
        match Filter::load(name, &config) {
            Err(FluxingError::FilterNotFound { name: missing }) => assert_eq!(missing, name),
            other => panic!("{name}: unexpected {other:?}"),
        }
    }
}

#[test]
fn missing_directory_is_an_io_error() {
    let dir = filter_dir();
    let config = FluxingConfig::with_filter_dir(dir.path().join("nope"));
    assert!(matches!(Filter::load("sdss_u", &config), Err(FluxingError::Io { .. })));
}

#[test]
fn configured_aliases_take_priority() {
    let dir = filter_dir();
    let config_path = dir.path().join("sedflux.json");
    let json = r#"{ "filter_dir": ".", "aliases": { "W1": "wise1", "sdss_u": "fuv" } }"#;
    std::fs::write(&config_path, json).unwrap();
    let config = FluxingConfig::from_file(&config_path).unwrap();

    let w1 = Filter::load("w1", &config).unwrap();
    assert!(w1.path().ends_with("wise1.dat"));

    let remapped = Filter::load("SDSS_u", &config).unwrap();
    assert!(remapped.path().ends_with("FUV.dat"));
}

#[test]
fn detector_types_come_from_the_header() {
    let dir = filter_dir();
    let config = FluxingConfig::with_filter_dir(dir.path());

    assert_eq!(Filter::load("sdss_u", &config).unwrap().detector(), DetectorType::Photon);
    // Tag on the second header line, after the curve name.
    assert_eq!(Filter::load("wise1", &config).unwrap().detector(), DetectorType::Photon);
    assert_eq!(Filter::load("spire_250", &config).unwrap().detector(), DetectorType::Bolometer);
}

#[test]
fn pivot_wavelength_sits_near_the_band_centre() {
    let dir = filter_dir();
    for band in ALL_BANDS {
        let filter = Filter::from_file(&dir.path().join(band.file)).unwrap();
        let centre_um = band.center / 1e4;
        assert_relative_eq!(filter.pivot_wavelength(), centre_um, max_relative = 0.05);
        assert_relative_eq!(filter.effective_wavelength(), centre_um, max_relative = 0.05);
    }
}

#[test]
fn bank_shares_filters_between_aliases() {
    let dir = filter_dir();
    let bank = FilterBank::new(FluxingConfig::with_filter_dir(dir.path()));
    assert!(bank.is_empty());

    let a = bank.get("WISE_3.4").unwrap();
    let b = bank.get("wise_1").unwrap();
    let c = bank.get("sdss_u").unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(bank.len(), 2);

    let many = bank.get_many(&["GALEX_FUV", "sdss_u"]).unwrap();
    assert!(Arc::ptr_eq(&many[1], &c));
    assert_eq!(bank.len(), 3);

    assert!(matches!(bank.get("wise_7"), Err(FluxingError::FilterNotFound { .. })));
}

#[test]
fn concurrent_first_reads_agree() {
    let dir = filter_dir();
    let config = FluxingConfig::with_filter_dir(dir.path());
    let filter = Arc::new(Filter::load("sdss_u", &config).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let filter = Arc::clone(&filter);
            std::thread::spawn(move || filter.pivot_wavelength())
        })
        .collect();
    let pivots: Vec<f64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(pivots.iter().all(|p| *p == pivots[0]));
}
