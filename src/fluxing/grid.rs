use crate::error::{FluxingError, Result};

/// Log-value substituted for non-positive samples before interpolating in
/// log space. `exp(LOG_FLOOR)` underflows to exactly `0.0` in `f64`.
pub const LOG_FLOOR: f64 = -750.0;

// ---------------------------------------------------------------------------
// Grid merging
// ---------------------------------------------------------------------------

/// Merge two monotonic grids, keeping every point of both inside their overlap.
///
/// The result is sorted ascending and free of duplicates. Points outside
/// `[max(min_a, min_b), min(max_a, max_b)]` are dropped; when the grids touch
/// in a single value the result is that value.
pub fn merge_grids(a: &[f64], b: &[f64]) -> Result<Vec<f64>> {
    let (a_min, a_max) = bounds(a, "first grid")?;
    let (b_min, b_max) = bounds(b, "second grid")?;

    if a_max < b_min || b_max < a_min {
        return Err(FluxingError::IncompatibleGrids {
            a_min,
            a_max,
            b_min,
            b_max,
        });
    }

    let lo = a_min.max(b_min);
    let hi = a_max.min(b_max);

    let mut merged: Vec<f64> = a
        .iter()
        .chain(b.iter())
        .copied()
        .filter(|v| *v >= lo && *v <= hi)
        .collect();
    merged.sort_by(f64::total_cmp);
    merged.dedup();
    Ok(merged)
}

fn bounds(grid: &[f64], what: &'static str) -> Result<(f64, f64)> {
    if grid.is_empty() {
        return Err(FluxingError::EmptyGrid { what });
    }
    Ok(grid
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        }))
}

// ---------------------------------------------------------------------------
// Interpolation
// ---------------------------------------------------------------------------

/// Piecewise-linear interpolation of `(xp, fp)` at every `x`.
///
/// `xp` must be ascending. Queries outside the sampled range take the value of
/// the nearest end sample.
pub fn interp(x: &[f64], xp: &[f64], fp: &[f64]) -> Result<Vec<f64>> {
    if xp.len() != fp.len() {
        return Err(FluxingError::LengthMismatch {
            what: "interpolation samples",
            expected: xp.len(),
            found: fp.len(),
        });
    }
    if xp.is_empty() {
        return Err(FluxingError::EmptyGrid {
            what: "interpolation samples",
        });
    }

    let last = xp.len() - 1;
    Ok(x.iter()
        .map(|&xi| {
            if xi <= xp[0] {
                return fp[0];
            }
            if xi >= xp[last] {
                return fp[last];
            }
            // xp[j - 1] <= xi < xp[j], so the segment has non-zero width.
            let j = xp.partition_point(|&v| v <= xi);
            let (x0, x1) = (xp[j - 1], xp[j]);
            let (y0, y1) = (fp[j - 1], fp[j]);
            y0 + (y1 - y0) * (xi - x0) / (x1 - x0)
        })
        .collect())
}

/// Natural log with non-positive values mapped to [`LOG_FLOOR`].
pub fn floored_ln(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .map(|&v| if v <= 0.0 { LOG_FLOOR } else { v.ln() })
        .collect()
}

/// Linear interpolation carried out in log space.
///
/// With `log_x` the abscissae (`x` and `xp`) are interpolated in `ln`; they
/// must be positive. With `log_y` the ordinates are interpolated in `ln` and
/// the result exponentiated back, so samples `<= 0` in `yp` come out as
/// exactly zero instead of `NaN`.
pub fn log_interpolate(
    x: &[f64],
    xp: &[f64],
    yp: &[f64],
    log_x: bool,
    log_y: bool,
) -> Result<Vec<f64>> {
    let (x, xp): (Vec<f64>, Vec<f64>) = if log_x {
        (
            x.iter().map(|v| v.ln()).collect(),
            xp.iter().map(|v| v.ln()).collect(),
        )
    } else {
        (x.to_vec(), xp.to_vec())
    };

    if log_y {
        let log_yp = floored_ln(yp);
        let values = interp(&x, &xp, &log_yp)?;
        Ok(values.into_iter().map(f64::exp).collect())
    } else {
        interp(&x, &xp, yp)
    }
}

// ---------------------------------------------------------------------------
// Integration
// ---------------------------------------------------------------------------

/// Trapezoidal integral of `y` over the sample points `x`.
///
/// Descending `x` gives a negated integral. Fewer than two samples integrate
/// to zero.
pub fn trapz(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| 0.5 * (xs[1] - xs[0]) * (ys[0] + ys[1]))
        .sum()
}
