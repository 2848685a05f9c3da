//! Triangle mesh model and input parsing.
//!
//! Meshes arrive either as the JSON document returned by the upstream
//! inference service (`{"vertices": [[x, y, z], ...], "faces": [[a, b, c], ...]}`)
//! or as a Wavefront OBJ file. Only vertex positions feed the embedding;
//! faces are carried through and validated. The service may also return a
//! precomputed embedding under `code`, kept by [`InferenceResult`].

use crate::types::Embedding;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// A vertex position `[x, y, z]`. By convention y is vertical and z is depth.
pub type Vertex = [f64; 3];

/// Triangle as three zero-based vertex indices.
pub type Face = [u32; 3];

#[derive(Error, Debug)]
pub enum MeshError {
    #[error("failed to read mesh file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid mesh JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("OBJ line {line}: {message}")]
    Obj { line: usize, message: String },
    #[error("no embedding code in {path}")]
    MissingCode { path: String },
    #[error("face {face} references vertex {index}, but the mesh has {vertices} vertices")]
    FaceIndexOutOfRange {
        face: usize,
        index: u32,
        vertices: usize,
    },
}

/// A triangle mesh sharing the fixed vertex topology.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    #[serde(default)]
    pub faces: Vec<Face>,
}

impl Mesh {
    /// Build a mesh, rejecting faces that reference missing vertices.
    pub fn new(vertices: Vec<Vertex>, faces: Vec<Face>) -> Result<Self, MeshError> {
        let mesh = Self { vertices, faces };
        mesh.validate()?;
        Ok(mesh)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check that every face index is in range.
    pub fn validate(&self) -> Result<(), MeshError> {
        let vertices = self.vertices.len();
        for (face, tri) in self.faces.iter().enumerate() {
            if let Some(&index) = tri.iter().find(|&&i| i as usize >= vertices) {
                return Err(MeshError::FaceIndexOutOfRange {
                    face,
                    index,
                    vertices,
                });
            }
        }
        Ok(())
    }

    /// Parse the inference-service JSON shape. Unknown fields are ignored.
    pub fn from_json(src: &str) -> Result<Self, MeshError> {
        let mesh: Mesh = serde_json::from_str(src)?;
        mesh.validate()?;
        Ok(mesh)
    }

    /// Parse the subset of Wavefront OBJ that carries geometry: `v` and `f`.
    ///
    /// Face indices are 1-based; negative indices count back from the most
    /// recent vertex. `v/vt/vn` forms are accepted and polygons are
    /// fan-triangulated. All other statements are skipped.
    pub fn from_obj(src: &str) -> Result<Self, MeshError> {
        let mut vertices = Vec::new();
        let mut faces = Vec::new();

        for (n, raw) in src.lines().enumerate() {
            let line = n + 1;
            let mut tokens = raw.split_whitespace();
            match tokens.next() {
                Some("v") => {
                    let mut xyz = [0.0f64; 3];
                    for c in xyz.iter_mut() {
                        let tok = tokens.next().ok_or_else(|| MeshError::Obj {
                            line,
                            message: "vertex needs three coordinates".into(),
                        })?;
                        *c = tok.parse().map_err(|_| MeshError::Obj {
                            line,
                            message: format!("bad coordinate {tok:?}"),
                        })?;
                    }
                    vertices.push(xyz);
                }
                Some("f") => {
                    let polygon = tokens
                        .map(|tok| parse_obj_index(tok, vertices.len(), line))
                        .collect::<Result<Vec<_>, _>>()?;
                    if polygon.len() < 3 {
                        return Err(MeshError::Obj {
                            line,
                            message: format!("face needs at least 3 vertices, got {}", polygon.len()),
                        });
                    }
                    for i in 1..polygon.len() - 1 {
                        faces.push([polygon[0], polygon[i], polygon[i + 1]]);
                    }
                }
                _ => {}
            }
        }

        Self::new(vertices, faces)
    }

    /// Load a mesh from disk: `.json` files as inference JSON, anything else as OBJ.
    pub fn load(path: &Path) -> Result<Self, MeshError> {
        let src = std::fs::read_to_string(path).map_err(|source| MeshError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let mesh = if is_json {
            Self::from_json(&src)?
        } else {
            Self::from_obj(&src)?
        };

        tracing::debug!(
            path = %path.display(),
            vertices = mesh.vertex_count(),
            faces = mesh.face_count(),
            "mesh loaded"
        );
        Ok(mesh)
    }
}

/// Full inference-service response: the mesh plus the optional embedding
/// `code` computed upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    #[serde(flatten)]
    pub mesh: Mesh,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Embedding>,
}

impl InferenceResult {
    pub fn from_json(src: &str) -> Result<Self, MeshError> {
        let result: InferenceResult = serde_json::from_str(src)?;
        result.mesh.validate()?;
        Ok(result)
    }
}

/// Either a bare embedding array or a document carrying one under `code`.
#[derive(Deserialize)]
#[serde(untagged)]
enum CodeDocument {
    Bare(Embedding),
    Wrapped { code: Option<Embedding> },
}

/// Parse a precomputed embedding: a JSON array, or any object with a `code`
/// field (such as an inference-service response).
pub fn parse_code(src: &str) -> Result<Option<Embedding>, MeshError> {
    Ok(match serde_json::from_str(src)? {
        CodeDocument::Bare(code) => Some(code),
        CodeDocument::Wrapped { code } => code,
    })
}

/// Load a precomputed embedding from disk. See [`parse_code`].
pub fn load_code(path: &Path) -> Result<Embedding, MeshError> {
    let src = std::fs::read_to_string(path).map_err(|source| MeshError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let code = parse_code(&src)?.ok_or_else(|| MeshError::MissingCode {
        path: path.display().to_string(),
    })?;
    tracing::debug!(path = %path.display(), dim = code.dim(), "embedding code loaded");
    Ok(code)
}

/// Resolve one OBJ face token (`7`, `7/1`, `7//3`, `-1`) to a zero-based index.
fn parse_obj_index(token: &str, seen: usize, line: usize) -> Result<u32, MeshError> {
    let head = token.split('/').next().unwrap_or(token);
    let bad = || MeshError::Obj {
        line,
        message: format!("bad face index {token:?}"),
    };
    let raw: i64 = head.parse().map_err(|_| bad())?;
    let index = match raw {
        0 => return Err(bad()),
        r if r > 0 => r - 1,
        r => seen as i64 + r,
    };
    u32::try_from(index).map_err(|_| bad())
}
