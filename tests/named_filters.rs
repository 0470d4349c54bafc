//! Filters given by name are resolved through the environment. Kept to a
//! single test so nothing else in this binary races on the variable.

mod common;

use approx::assert_relative_eq;

use sedflux::config::FILTER_DIR_ENV;
use sedflux::{BroadbandSed, Filter, FluxingError, HighresSed, SpectralEnergyDistribution};

use common::{filter_dir, log_grid};

#[test]
fn names_resolve_through_the_environment() {
    let dir = filter_dir();
    std::env::set_var(FILTER_DIR_ENV, dir.path());

    let wise = Filter::new("WISE_3.4").unwrap();
    assert!(wise.path().ends_with("wise1.dat"));
    assert!(matches!(Filter::new("WISE_9"), Err(FluxingError::FilterNotFound { .. })));

    let wavelengths = log_grid(500);
    let fnu: Vec<f64> = wavelengths.iter().map(|wl| 1e-3 * wl.powf(-0.5)).collect();
    let sed = HighresSed::new(wavelengths, fnu).unwrap();

    // Mixed names and parsed filters.
    let by_name = sed.to_broadband(["SDSS_u", "wise_1"], false).unwrap();
    let mixed = sed
        .to_broadband(vec![sedflux::FilterRef::from("SDSS_u"), wise.into()], false)
        .unwrap();
    assert_eq!(by_name.fnu(), mixed.fnu());
    assert_eq!(by_name.filters()[0].name(), "SDSS_u");

    let photometry = BroadbandSed::new(["SPIRE_250", "galex_fuv"], vec![0.1, 0.2], None).unwrap();
    assert_relative_eq!(photometry.wavelengths()[0], 250.0, max_relative = 0.05);
    assert_relative_eq!(photometry.wavelengths()[1], 0.153, max_relative = 0.05);

    assert!(matches!(
        BroadbandSed::new(["pacs_70"], vec![1.0], None),
        Err(FluxingError::FilterNotFound { .. })
    ));

    std::env::remove_var(FILTER_DIR_ENV);
}
