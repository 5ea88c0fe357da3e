use crate::{Matrix, Vector};
use ndarray::Axis;

/// Rescale `values` linearly onto `[0, 1]` using their observed min and max.
///
/// Non-finite entries are ignored when finding the range and pass through
/// unchanged. A column whose finite values are all equal maps to 0.
pub fn min_max_scale(values: &Vector) -> Vector {
    let (min, max) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;

    values.mapv(|v| {
        if !v.is_finite() {
            v
        } else if range > 0.0 {
            (v - min) / range
        } else {
            0.0
        }
    })
}

/// Apply [`min_max_scale`] to every column independently.
pub fn min_max_scale_columns(data: &Matrix) -> Matrix {
    let mut result = data.clone();
    for mut column in result.axis_iter_mut(Axis(1)) {
        let scaled = min_max_scale(&column.to_owned());
        column.assign(&scaled);
    }
    result
}
