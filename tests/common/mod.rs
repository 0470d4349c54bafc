#![allow(dead_code)]

use std::path::Path;

use tempfile::TempDir;

pub const SPEED_OF_LIGHT_UM: f64 = 2.99792458e14;

/// Synthetic Gaussian band: file stem, header lines, centre and width in Å.
pub struct Band {
    pub file: &'static str,
    pub header: &'static [&'static str],
    pub center: f64,
    pub sigma: f64,
}

pub const FUV: Band = Band {
    file: "FUV.dat",
    header: &["photon", "GALEX FUV (synthetic)"],
    center: 1530.0,
    sigma: 100.0,
};

pub const U_PRIME: Band = Band {
    file: "u_prime.dat",
    header: &["photon", "SDSS u' (synthetic)"],
    center: 3550.0,
    sigma: 250.0,
};

/// Name line first, detector tag second.
pub const WISE1: Band = Band {
    file: "wise1.dat",
    header: &["wise1", "photon", "WISE W1 (synthetic)"],
    center: 34000.0,
    sigma: 3000.0,
};

pub const PSW: Band = Band {
    file: "psw_s.dat",
    header: &["energy", "SPIRE 250 (synthetic)"],
    center: 2_500_000.0,
    sigma: 300_000.0,
};

pub const ALL_BANDS: [&Band; 4] = [&FUV, &U_PRIME, &WISE1, &PSW];

/// Samples per synthetic curve, spread over ±4σ.
pub const SAMPLES: usize = 401;

pub fn gaussian(wl_aa: f64, band: &Band) -> f64 {
    (-(wl_aa - band.center).powi(2) / (2.0 * band.sigma.powi(2))).exp()
}

pub fn band_range_aa(band: &Band) -> (f64, f64) {
    (band.center - 4.0 * band.sigma, band.center + 4.0 * band.sigma)
}

pub fn write_band(dir: &Path, band: &Band) {
    let (lo, hi) = band_range_aa(band);
    let mut text = String::new();
    for line in band.header {
        text.push_str(&format!("# {line}\n"));
    }
    for i in 0..SAMPLES {
        let wl = lo + (hi - lo) * i as f64 / (SAMPLES - 1) as f64;
        text.push_str(&format!("{wl:.4}   {:.10e}\n", gaussian(wl, band)));
    }
    std::fs::write(dir.join(band.file), text).unwrap();
}

/// A temporary filter directory holding every synthetic band.
pub fn filter_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for band in ALL_BANDS {
        write_band(dir.path(), band);
    }
    dir
}

/// `n` log-spaced wavelengths from 0.1 to 1000 micron.
pub fn log_grid(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 10f64.powf(-1.0 + 4.0 * i as f64 / (n - 1) as f64))
        .collect()
}

/// Blackbody `F_ν` in arbitrary units, ~1 at its peak for 10^4 K.
pub fn blackbody_fnu(wl_um: f64, temperature: f64) -> f64 {
    const H_OVER_K: f64 = 6.62607015e-34 / 1.380649e-23;
    let nu = SPEED_OF_LIGHT_UM / wl_um;
    let x = H_OVER_K * nu / temperature;
    (nu / 1e15).powi(3) / x.exp_m1()
}

/// Composite Simpson's rule on a uniform grid over `[a, b]`.
pub fn simpson(f: impl Fn(f64) -> f64, a: f64, b: f64, intervals: usize) -> f64 {
    assert!(intervals % 2 == 0);
    let h = (b - a) / intervals as f64;
    let mut sum = f(a) + f(b);
    for i in 1..intervals {
        let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
        sum += weight * f(a + h * i as f64);
    }
    sum * h / 3.0
}
