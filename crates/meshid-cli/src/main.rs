use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use meshid_core::{load_code, CosineMatcher, Embedding, EmbeddingBuilder, Matcher, Mesh};
use meshid_store::GalleryStore;
use serde_json::json;
use std::path::{Path, PathBuf};

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "meshid", about = "3D face mesh identification CLI")]
struct Cli {
    /// Gallery database (overrides MESHID_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the embedding of a mesh as a JSON array
    Embed {
        /// Mesh file (.json from the inference service, or .obj)
        mesh: PathBuf,
    },
    /// Compare two meshes directly
    Compare { a: PathBuf, b: PathBuf },
    /// Enroll a new identity from a mesh
    Register {
        /// Display name for this identity
        #[arg(short, long)]
        name: String,
        mesh: PathBuf,
        /// Read a precomputed embedding code instead of embedding mesh geometry
        #[arg(long)]
        code: bool,
    },
    /// List enrolled identities
    List,
    /// Change an identity's display name
    Rename { id: i64, name: String },
    /// Remove an enrolled identity
    Remove { id: i64 },
    /// Match a mesh against one enrolled identity
    Verify {
        id: i64,
        mesh: PathBuf,
        /// Read a precomputed embedding code instead of embedding mesh geometry
        #[arg(long)]
        code: bool,
    },
    /// Rank enrolled identities against a mesh
    Identify {
        mesh: PathBuf,
        /// Number of candidates to return (overrides MESHID_TOP_K)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Read a precomputed embedding code instead of embedding mesh geometry
        #[arg(long)]
        code: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    tracing::debug!(?config, "configuration loaded");

    let builder = config.builder();
    let matcher = CosineMatcher;

    let output = match cli.command {
        Commands::Embed { mesh } => {
            let embedding = embed_file(&builder, &mesh)?;
            serde_json::to_value(&embedding)?
        }
        Commands::Compare { a, b } => {
            let ea = embed_file(&builder, &a)?;
            let eb = embed_file(&builder, &b)?;
            let result = matcher.verify(&ea, &eb, config.match_threshold)?;
            json!({
                "similarity": result.similarity,
                "match_found": result.matched,
            })
        }
        Commands::Register { name, mesh, code } => {
            let embedding = embed_input(&builder, &mesh, code)?;
            let record = open_store(&config)?.register(&name, &embedding)?;
            json!({
                "id": record.id,
                "name": record.name,
                "created_at": record.created_at,
                "degenerate": record.embedding.is_degenerate(),
            })
        }
        Commands::List => {
            let records = open_store(&config)?.list()?;
            let rows: Vec<_> = records
                .iter()
                .map(|r| {
                    json!({
                        "id": r.id,
                        "name": r.name,
                        "created_at": r.created_at,
                        "dim": r.embedding.dim(),
                    })
                })
                .collect();
            json!(rows)
        }
        Commands::Rename { id, name } => {
            let record = open_store(&config)?.rename(id, &name)?;
            json!({ "id": record.id, "name": record.name })
        }
        Commands::Remove { id } => {
            open_store(&config)?.remove(id)?;
            json!({ "success": true })
        }
        Commands::Verify { id, mesh, code } => {
            let record = open_store(&config)?.get(id)?;
            let probe = embed_input(&builder, &mesh, code)?;
            let result = matcher
                .verify(&probe, &record.embedding, config.match_threshold)
                .with_context(|| format!("comparing against identity {id}"))?;
            json!({
                "similarity": result.similarity,
                "match_found": result.matched,
                "matched_user": result.matched.then_some(record.name),
            })
        }
        Commands::Identify { mesh, top_k, code } => {
            let probe = embed_input(&builder, &mesh, code)?;
            let gallery = open_store(&config)?.list()?;
            let mut policy = config.policy();
            if let Some(k) = top_k {
                policy.top_k = k;
            }
            let matches = matcher.identify(&probe, &gallery, &policy)?;
            tracing::info!(
                gallery = gallery.len(),
                matched = matches.iter().filter(|m| m.matched).count(),
                "identify complete"
            );
            json!({ "matches": matches })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn open_store(config: &Config) -> Result<GalleryStore> {
    GalleryStore::open(&config.db_path)
        .with_context(|| format!("opening gallery {}", config.db_path.display()))
}

/// Load a mesh file and embed it with the configured topology check.
fn embed_file(builder: &EmbeddingBuilder, path: &Path) -> Result<Embedding> {
    let mesh = Mesh::load(path).with_context(|| format!("loading mesh {}", path.display()))?;
    let embedding = builder
        .build(&mesh.vertices)
        .with_context(|| format!("embedding mesh {}", path.display()))?;
    if embedding.is_degenerate() {
        tracing::warn!(path = %path.display(), "mesh produced a degenerate embedding");
    }
    Ok(embedding)
}

/// Embed a mesh file, or with `use_code` read the embedding stored in it
/// (a bare JSON array, or an inference response with a `code` field).
fn embed_input(builder: &EmbeddingBuilder, path: &Path, use_code: bool) -> Result<Embedding> {
    if !use_code {
        return embed_file(builder, path);
    }
    let embedding =
        load_code(path).with_context(|| format!("loading embedding code {}", path.display()))?;
    if embedding.is_degenerate() {
        tracing::warn!(path = %path.display(), "embedding code is degenerate");
    }
    Ok(embedding)
}
