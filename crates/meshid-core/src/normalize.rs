//! Mesh normalization into a canonical frame.
//!
//! Removes translation by centering vertices on their centroid and removes
//! scale by dividing by the farthest vertex distance, so every vertex lies in
//! the closed unit ball and at least one lies on its surface. Rotation is
//! left untouched.

use crate::mesh::Vertex;
use ndarray::{Array2, Axis};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DegenerateMeshError {
    #[error("mesh has no vertices")]
    Empty,
    #[error("all {vertices} vertices coincide, mesh has zero extent")]
    ZeroExtent { vertices: usize },
    #[error("vertex {vertex} has a non-finite coordinate")]
    NonFinite { vertex: usize },
}

/// Copy vertex positions into an N×3 matrix.
pub(crate) fn to_matrix(vertices: &[Vertex]) -> Array2<f64> {
    Array2::from_shape_fn((vertices.len(), 3), |(i, j)| vertices[i][j])
}

/// Center and scale vertices into the unit ball.
///
/// Returns the normalized N×3 matrix, rows in input vertex order.
pub fn normalize(vertices: &[Vertex]) -> Result<Array2<f64>, DegenerateMeshError> {
    let first = vertices.first().ok_or(DegenerateMeshError::Empty)?;

    if let Some(vertex) = vertices
        .iter()
        .position(|v| v.iter().any(|c| !c.is_finite()))
    {
        return Err(DegenerateMeshError::NonFinite { vertex });
    }

    // Checked on the raw input: the centroid of coincident points can carry
    // rounding error, which would otherwise blow up into a unit-radius mesh.
    if vertices.iter().all(|v| v == first) {
        return Err(DegenerateMeshError::ZeroExtent {
            vertices: vertices.len(),
        });
    }

    // Pre-scale by the largest coordinate magnitude so squared norms cannot
    // overflow (or underflow) for extreme but finite input. Non-zero because
    // the vertices do not all coincide.
    let extent = vertices
        .iter()
        .flatten()
        .fold(0.0f64, |acc, c| acc.max(c.abs()));

    let mut centered = to_matrix(vertices);
    centered /= extent;
    let centroid = centered
        .mean_axis(Axis(0))
        .ok_or(DegenerateMeshError::Empty)?;
    centered -= &centroid;

    let radius = centered
        .rows()
        .into_iter()
        .map(|row| row.dot(&row).sqrt())
        .fold(0.0f64, f64::max);

    if !(radius > 0.0 && radius.is_finite()) {
        return Err(DegenerateMeshError::ZeroExtent {
            vertices: vertices.len(),
        });
    }

    centered /= radius;
    Ok(centered)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TETRAHEDRON: [Vertex; 4] = [
        [1.0, 1.0, 1.0],
        [1.0, -1.0, -1.0],
        [-1.0, 1.0, -1.0],
        [-1.0, -1.0, 1.0],
    ];

    fn max_norm(m: &Array2<f64>) -> f64 {
        m.rows()
            .into_iter()
            .map(|r| r.dot(&r).sqrt())
            .fold(0.0, f64::max)
    }

    fn centroid(m: &Array2<f64>) -> Vec<f64> {
        m.mean_axis(Axis(0)).unwrap().to_vec()
    }

    #[test]
    fn test_tetrahedron_canonical_frame() {
        let m = normalize(&TETRAHEDRON).unwrap();
        assert_eq!(m.shape(), &[4, 3]);
        for c in centroid(&m) {
            assert!(c.abs() < 1e-12, "centroid component {c}");
        }
        assert!((max_norm(&m) - 1.0).abs() < 1e-12);
        // Every tetrahedron vertex is equidistant from the center.
        let expected = 1.0 / 3f64.sqrt();
        assert!((m[[0, 0]] - expected).abs() < 1e-12, "x0 = {}", m[[0, 0]]);
    }

    #[test]
    fn test_translation_removed() {
        let offset = [12.5, -40.0, 7.25];
        let shifted: Vec<Vertex> = TETRAHEDRON
            .iter()
            .map(|v| [v[0] + offset[0], v[1] + offset[1], v[2] + offset[2]])
            .collect();

        let m = normalize(&shifted).unwrap();
        for c in centroid(&m) {
            assert!(c.abs() < 1e-9, "centroid component {c}");
        }

        let reference = normalize(&TETRAHEDRON).unwrap();
        for (a, b) in m.iter().zip(reference.iter()) {
            assert!((a - b).abs() < 1e-9, "{a} vs {b}");
        }
    }

    #[test]
    fn test_scale_removed() {
        let big: Vec<Vertex> = TETRAHEDRON
            .iter()
            .map(|v| [v[0] * 250.0, v[1] * 250.0, v[2] * 250.0])
            .collect();
        let m = normalize(&big).unwrap();
        let reference = normalize(&TETRAHEDRON).unwrap();
        for (a, b) in m.iter().zip(reference.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_huge_coordinates_do_not_overflow() {
        let huge: Vec<Vertex> = TETRAHEDRON
            .iter()
            .map(|v| [v[0] * 1e200, v[1] * 1e200, v[2] * 1e200])
            .collect();
        let m = normalize(&huge).unwrap();
        assert!((max_norm(&m) - 1.0).abs() < 1e-12);
        let reference = normalize(&TETRAHEDRON).unwrap();
        for (a, b) in m.iter().zip(reference.iter()) {
            assert!((a - b).abs() < 1e-12, "{a} vs {b}");
        }

        let skewed = [
            [1e200, 0.0, 0.0],
            [0.0, 1e200, 0.0],
            [0.0, 0.0, 1e200],
            [-1e200, -1e200, 0.0],
        ];
        let m = normalize(&skewed).unwrap();
        assert!((max_norm(&m) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_tiny_coordinates_do_not_underflow() {
        let tiny: Vec<Vertex> = TETRAHEDRON
            .iter()
            .map(|v| [v[0] * 1e-200, v[1] * 1e-200, v[2] * 1e-200])
            .collect();
        let m = normalize(&tiny).unwrap();
        assert!((max_norm(&m) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_all_points_within_unit_ball() {
        let verts: Vec<Vertex> = vec![
            [0.0, 0.0, 0.0],
            [3.0, 0.5, -1.0],
            [-0.5, 2.0, 0.25],
            [0.1, -0.2, 4.0],
        ];
        let m = normalize(&verts).unwrap();
        for row in m.rows() {
            assert!(row.dot(&row).sqrt() <= 1.0 + 1e-12);
        }
        assert!((max_norm(&m) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_mesh() {
        assert_eq!(normalize(&[]).unwrap_err(), DegenerateMeshError::Empty);
    }

    #[test]
    fn test_coincident_vertices() {
        let verts = vec![[0.1, 0.1, 0.1]; 3];
        assert_eq!(
            normalize(&verts).unwrap_err(),
            DegenerateMeshError::ZeroExtent { vertices: 3 }
        );
    }

    #[test]
    fn test_single_vertex() {
        assert_eq!(
            normalize(&[[5.0, 5.0, 5.0]]).unwrap_err(),
            DegenerateMeshError::ZeroExtent { vertices: 1 }
        );
    }

    #[test]
    fn test_non_finite_vertex() {
        let verts = vec![[0.0, 0.0, 0.0], [1.0, f64::NAN, 0.0]];
        assert_eq!(
            normalize(&verts).unwrap_err(),
            DegenerateMeshError::NonFinite { vertex: 1 }
        );
    }
}
