use meshid_core::{
    EmbeddingBuilder, MatchPolicy, DEFAULT_MATCH_THRESHOLD, DEFAULT_TOP_K, FLAME_VERTEX_COUNT,
};
use std::path::PathBuf;

/// CLI configuration, loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Path to the SQLite gallery database.
    pub db_path: PathBuf,
    /// Cosine similarity must exceed this for a positive match.
    pub match_threshold: f32,
    /// Number of candidates returned by `identify`.
    pub top_k: usize,
    /// Required vertex count per mesh; `None` accepts any topology.
    pub vertex_count: Option<usize>,
}

impl Config {
    /// Load configuration from `MESHID_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                let home = var("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("meshid");

        let db_path = var("MESHID_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("gallery.db"));

        // 0 disables the topology check.
        let vertex_count = match parsed(&var, "MESHID_VERTEX_COUNT", FLAME_VERTEX_COUNT) {
            0 => None,
            n => Some(n),
        };

        Self {
            db_path,
            match_threshold: parsed(&var, "MESHID_MATCH_THRESHOLD", DEFAULT_MATCH_THRESHOLD),
            top_k: parsed(&var, "MESHID_TOP_K", DEFAULT_TOP_K),
            vertex_count,
        }
    }

    /// Embedding builder enforcing the configured topology.
    pub fn builder(&self) -> EmbeddingBuilder {
        match self.vertex_count {
            Some(n) => EmbeddingBuilder::new(n),
            None => EmbeddingBuilder::any_topology(),
        }
    }

    pub fn policy(&self) -> MatchPolicy {
        MatchPolicy {
            threshold: self.match_threshold,
            top_k: self.top_k,
        }
    }
}

fn parsed<T: std::str::FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match var(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring unparsable setting; using default");
            default
        }),
        None => default,
    }
}
