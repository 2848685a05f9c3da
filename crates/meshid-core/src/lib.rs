//! meshid-core — 3D face mesh embedding and identification engine.
//!
//! Converts a fixed-topology face mesh into a unit-length, saliency-weighted
//! embedding and ranks it against a gallery of enrolled identities by cosine
//! similarity. Pure and synchronous: no I/O beyond optional mesh file loading.

pub mod embedding;
pub mod matcher;
pub mod mesh;
pub mod normalize;
pub mod saliency;
pub mod types;

pub use embedding::{
    build_embedding, normalize_and_weight, EmbeddingBuilder, EmbeddingError, WeightedVertices,
    FLAME_VERTEX_COUNT,
};
pub use matcher::{
    identify, verify, CosineMatcher, MatchPolicy, Matcher, DEFAULT_MATCH_THRESHOLD, DEFAULT_TOP_K,
};
pub use mesh::{load_code, parse_code, InferenceResult, Mesh, MeshError, Vertex};
pub use normalize::DegenerateMeshError;
pub use saliency::WeightField;
pub use types::{
    similarity, Candidate, DimensionMismatchError, Embedding, IdentityId, IdentityRecord,
    MatchResult,
};
