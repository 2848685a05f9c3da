//! Anatomical saliency weighting.
//!
//! Produces one weight per vertex that emphasizes identity-bearing geometry
//! (nose depth, jawline) and suppresses the expression-prone band around
//! the vertical middle of the face (eyes, mouth). Operates on normalized
//! vertices, with y vertical and z depth.

use ndarray::{Array1, Array2, ArrayView1};

// --- Named constants ---
const NOSE_GAIN: f64 = 3.0;
const JAW_GAIN: f64 = 2.5;
const MID_FACE_GAIN: f64 = 0.5;
/// Variance of the Gaussian centered on mean height.
const MID_FACE_VARIANCE: f64 = 0.1;

/// Lower bound applied to every weight before peak normalization.
pub const WEIGHT_FLOOR: f64 = 0.1;

/// Ranges at or below this are treated as zero. A ratio whose denominator
/// collapses (flat depth, or min height equal to mean height) is 0 for
/// every vertex.
pub const RANGE_EPSILON: f64 = 1e-12;

/// Per-vertex weights aligned with vertex order. Peak value is exactly 1.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightField(Array1<f64>);

impl WeightField {
    pub fn values(&self) -> &Array1<f64> {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Compute the saliency weight field for normalized N×3 vertices.
pub fn weight_field(normalized: &Array2<f64>) -> WeightField {
    let y = normalized.column(1);
    let z = normalized.column(2);

    let (z_min, z_max) = min_max(&z);
    let (y_min, _) = min_max(&y);
    let y_mean = y.mean().unwrap_or(0.0);

    let z_range = z_max - z_min;
    let jaw_range = y_min - y_mean;

    let mut weights = Array1::from_shape_fn(normalized.nrows(), |i| {
        let nose = ratio(z[i] - z_min, z_range);
        let jaw = ratio(y_min - y[i], jaw_range);
        let mid_face = (-(y[i] - y_mean).powi(2) / MID_FACE_VARIANCE).exp();

        let w = NOSE_GAIN * nose + JAW_GAIN * jaw + MID_FACE_GAIN * (1.0 - mid_face);
        w.max(WEIGHT_FLOOR)
    });

    let peak = weights.fold(WEIGHT_FLOOR, |acc, &w| acc.max(w));
    weights /= peak;

    WeightField(weights)
}

fn min_max(col: &ArrayView1<f64>) -> (f64, f64) {
    col.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    })
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator.abs() <= RANGE_EPSILON {
        0.0
    } else {
        numerator / denominator
    }
}
