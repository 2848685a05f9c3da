//! Mesh embedding builder.
//!
//! Normalizes a fixed-topology face mesh, weights each vertex by saliency,
//! and flattens the weighted positions into an L2-normalized vector of
//! `3 * N` values. Geometry failures never escape: they collapse into
//! [`Embedding::Degenerate`] and are logged.

use crate::mesh::Vertex;
use crate::normalize::{normalize, DegenerateMeshError};
use crate::saliency::{weight_field, WeightField};
use crate::types::Embedding;
use ndarray::{Array2, Axis};
use thiserror::Error;

/// Vertex count of the FLAME head topology.
pub const FLAME_VERTEX_COUNT: usize = 5023;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingError {
    #[error("expected {expected} vertices (fixed mesh topology), got {actual}")]
    VertexCountMismatch { expected: usize, actual: usize },
}

/// Normalized vertices together with their saliency weights.
#[derive(Debug, Clone)]
pub struct WeightedVertices {
    /// N×3, centered and scaled into the unit ball.
    pub vertices: Array2<f64>,
    pub weights: WeightField,
}

impl WeightedVertices {
    /// Scale each vertex by its weight, flatten vertex-major, and L2-normalize.
    pub fn to_embedding(&self) -> Embedding {
        let column = self.weights.values().view().insert_axis(Axis(1));
        let weighted = &self.vertices * &column;

        let norm = weighted.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm <= 0.0 {
            tracing::warn!(
                vertices = self.vertices.nrows(),
                "weighted mesh has zero norm; returning degenerate embedding"
            );
            return Embedding::Degenerate;
        }

        // `iter` walks in logical row-major order: x0, y0, z0, x1, ...
        let values: Vec<f32> = weighted.iter().map(|v| (v / norm) as f32).collect();
        Embedding::from(values)
    }
}

/// Center, scale, and saliency-weight raw vertices.
pub fn normalize_and_weight(vertices: &[Vertex]) -> Result<WeightedVertices, DegenerateMeshError> {
    let vertices = normalize(vertices)?;
    let weights = weight_field(&vertices);
    Ok(WeightedVertices { vertices, weights })
}

/// Build an embedding without a topology check. Never fails.
pub fn build_embedding(vertices: &[Vertex]) -> Embedding {
    match normalize_and_weight(vertices) {
        Ok(weighted) => weighted.to_embedding(),
        Err(e) => {
            tracing::warn!(
                vertices = vertices.len(),
                error = %e,
                "degenerate mesh; returning degenerate embedding"
            );
            Embedding::Degenerate
        }
    }
}

/// Embedding entry point that enforces the shared vertex topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddingBuilder {
    expected_vertices: Option<usize>,
}

impl EmbeddingBuilder {
    /// Builder that requires exactly `expected_vertices` vertices per mesh.
    pub fn new(expected_vertices: usize) -> Self {
        Self {
            expected_vertices: Some(expected_vertices),
        }
    }

    /// Builder that accepts any vertex count.
    pub fn any_topology() -> Self {
        Self {
            expected_vertices: None,
        }
    }

    pub fn expected_vertices(&self) -> Option<usize> {
        self.expected_vertices
    }

    /// Build an embedding, rejecting meshes of the wrong size.
    ///
    /// Degenerate geometry is not an error here; it yields
    /// [`Embedding::Degenerate`].
    pub fn build(&self, vertices: &[Vertex]) -> Result<Embedding, EmbeddingError> {
        if let Some(expected) = self.expected_vertices {
            if vertices.len() != expected {
                return Err(EmbeddingError::VertexCountMismatch {
                    expected,
                    actual: vertices.len(),
                });
            }
        }
        Ok(build_embedding(vertices))
    }
}

impl Default for EmbeddingBuilder {
    fn default() -> Self {
        Self::new(FLAME_VERTEX_COUNT)
    }
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

    /// A small face-like point cloud: a dome with a protruding tip.
    fn synthetic_face(n: usize, seed: f64) -> Vec<Vertex> {
        (0..n)
            .map(|i| {
                let t = i as f64 / n as f64 * std::f64::consts::TAU;
                let r = 1.0 + 0.1 * (seed * (i as f64 + 1.0)).sin();
                let x = r * t.cos();
                let y = r * t.sin() * 1.3;
                let z = 0.4 * (1.0 - (x * x + y * y) / 2.0) + if i == 0 { 0.6 } else { 0.0 };
                [x, y, z]
            })
            .collect()
    }

    #[test]
    fn test_embedding_is_unit_length() {
        for seed in [0.3, 1.7, 4.2] {
            let e = build_embedding(&synthetic_face(64, seed));
            assert!(!e.is_degenerate());
            assert_eq!(e.dim(), 64 * 3);
            assert!((e.norm() - 1.0).abs() < 1e-5, "norm = {}", e.norm());
        }
    }

    #[test]
    fn test_embedding_layout_is_vertex_major() {
        let weighted = normalize_and_weight(&TETRAHEDRON).unwrap();
        let e = weighted.to_embedding();
        let values = e.values();
        assert_eq!(values.len(), 12);

        // Each triple is the normalized vertex scaled by weight, so its
        // direction matches the normalized vertex.
        for (i, row) in weighted.vertices.rows().into_iter().enumerate() {
            let triple = &values[i * 3..i * 3 + 3];
            let row_norm = row.dot(&row).sqrt();
            let t_norm = triple.iter().map(|&v| f64::from(v).powi(2)).sum::<f64>().sqrt();
            for j in 0..3 {
                let expected = row[j] / row_norm;
                let got = f64::from(triple[j]) / t_norm;
                assert!((got - expected).abs() < 1e-5, "vertex {i} coord {j}");
            }
        }
    }

    #[test]
    fn test_identical_meshes_identical_embeddings() {
        let a = build_embedding(&synthetic_face(32, 0.9));
        let b = build_embedding(&synthetic_face(32, 0.9));
        assert_eq!(a, b);
        assert!((a.similarity(&b).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_translation_does_not_change_embedding() {
        let face = synthetic_face(48, 2.5);
        let moved: Vec<Vertex> = face
            .iter()
            .map(|v| [v[0] + 100.0, v[1] - 35.5, v[2] + 0.125])
            .collect();

        let centered = normalize_and_weight(&moved).unwrap();
        let centroid = centered.vertices.mean_axis(Axis(0)).unwrap();
        for c in centroid.iter() {
            assert!(c.abs() < 1e-9, "centroid component {c}");
        }

        let a = build_embedding(&face);
        let b = build_embedding(&moved);
        for (x, y) in a.values().iter().zip(b.values()) {
            assert!((x - y).abs() < 1e-6, "{x} vs {y}");
        }
    }

    #[test]
    fn test_uniform_scale_does_not_change_embedding() {
        let face = synthetic_face(24, 3.1);
        let scaled: Vec<Vertex> = face.iter().map(|v| [v[0] * 8.0, v[1] * 8.0, v[2] * 8.0]).collect();
        let a = build_embedding(&face);
        let b = build_embedding(&scaled);
        assert!((a.similarity(&b).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_huge_scale_still_embeds() {
        let face = synthetic_face(24, 1.1);
        let huge: Vec<Vertex> = face
            .iter()
            .map(|v| [v[0] * 1e200, v[1] * 1e200, v[2] * 1e200])
            .collect();
        let a = build_embedding(&face);
        let b = build_embedding(&huge);
        assert!(!b.is_degenerate());
        assert!((a.similarity(&b).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_different_meshes_score_below_one() {
        let a = build_embedding(&synthetic_face(40, 0.5));
        let b = build_embedding(&synthetic_face(40, 5.0));
        let sim = a.similarity(&b).unwrap();
        assert!(sim < 1.0 - 1e-4, "sim = {sim}");
    }

    #[test]
    fn test_degenerate_meshes_collapse() {
        assert!(build_embedding(&[]).is_degenerate());
        assert!(build_embedding(&[[2.0, 2.0, 2.0]; 10]).is_degenerate());
        assert!(build_embedding(&[[0.0, 0.0, 0.0], [f64::INFINITY, 0.0, 0.0]]).is_degenerate());
    }

    #[test]
    fn test_normalize_and_weight_reports_degenerate() {
        assert_eq!(
            normalize_and_weight(&[]).unwrap_err(),
            DegenerateMeshError::Empty
        );
    }

    #[test]
    fn test_builder_enforces_vertex_count() {
        let builder = EmbeddingBuilder::new(5);
        let err = builder.build(&TETRAHEDRON).unwrap_err();
        assert_eq!(
            err,
            EmbeddingError::VertexCountMismatch {
                expected: 5,
                actual: 4
            }
        );

        let ok = EmbeddingBuilder::new(4).build(&TETRAHEDRON).unwrap();
        assert_eq!(ok.dim(), 12);
    }

    #[test]
    fn test_builder_degenerate_is_not_an_error() {
        let builder = EmbeddingBuilder::new(3);
        let e = builder.build(&[[1.0, 1.0, 1.0]; 3]).unwrap();
        assert!(e.is_degenerate());
    }

    #[test]
    fn test_builder_defaults_to_flame() {
        assert_eq!(
            EmbeddingBuilder::default().expected_vertices(),
            Some(FLAME_VERTEX_COUNT)
        );
        assert_eq!(EmbeddingBuilder::any_topology().expected_vertices(), None);
        assert!(!EmbeddingBuilder::any_topology()
            .build(&TETRAHEDRON)
            .unwrap()
            .is_degenerate());
    }
}
