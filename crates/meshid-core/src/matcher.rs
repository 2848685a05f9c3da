//! Gallery matching: pairwise verification and top-K identification.

use crate::types::{Candidate, DimensionMismatchError, Embedding, IdentityRecord, MatchResult};
use std::cmp::Ordering;

/// Similarity must exceed this for a match.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.8;
/// Number of candidates returned by identification.
pub const DEFAULT_TOP_K: usize = 5;

/// Decision parameters for a match operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchPolicy {
    /// Strict lower bound on similarity for `matched`.
    pub threshold: f32,
    pub top_k: usize,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MATCH_THRESHOLD,
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// Strategy for comparing a probe embedding against enrolled identities.
pub trait Matcher {
    /// Compare a probe against one reference embedding.
    fn verify(
        &self,
        probe: &Embedding,
        reference: &Embedding,
        threshold: f32,
    ) -> Result<MatchResult, DimensionMismatchError>;

    /// Rank the gallery against a probe, best first, at most `policy.top_k` entries.
    fn identify(
        &self,
        probe: &Embedding,
        gallery: &[IdentityRecord],
        policy: &MatchPolicy,
    ) -> Result<Vec<Candidate>, DimensionMismatchError>;
}

/// Cosine similarity matcher with an exhaustive gallery scan.
///
/// Every gallery entry is scored; there is no early exit and no index.
/// Ties are ordered by ascending identity id.
pub struct CosineMatcher;

impl Matcher for CosineMatcher {
    fn verify(
        &self,
        probe: &Embedding,
        reference: &Embedding,
        threshold: f32,
    ) -> Result<MatchResult, DimensionMismatchError> {
        let similarity = probe.similarity(reference)?;
        let comparable = !probe.is_degenerate() && !reference.is_degenerate();
        Ok(MatchResult {
            similarity,
            matched: comparable && similarity > threshold,
        })
    }

    fn identify(
        &self,
        probe: &Embedding,
        gallery: &[IdentityRecord],
        policy: &MatchPolicy,
    ) -> Result<Vec<Candidate>, DimensionMismatchError> {
        let mut scored = gallery
            .iter()
            .map(|record| Ok((probe.similarity(&record.embedding)?, record)))
            .collect::<Result<Vec<_>, DimensionMismatchError>>()?;

        scored.sort_by(|(sa, a), (sb, b)| {
            sb.partial_cmp(sa)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        scored.truncate(policy.top_k);

        tracing::debug!(
            gallery = gallery.len(),
            returned = scored.len(),
            best = ?scored.first().map(|(s, _)| *s),
            "identify: gallery scanned"
        );

        Ok(scored
            .into_iter()
            .map(|(similarity, record)| Candidate {
                id: record.id,
                name: record.name.clone(),
                similarity,
                matched: !probe.is_degenerate()
                    && !record.embedding.is_degenerate()
                    && similarity > policy.threshold,
            })
            .collect())
    }
}

/// Pairwise match with [`CosineMatcher`].
pub fn verify(
    probe: &Embedding,
    reference: &Embedding,
    threshold: f32,
) -> Result<MatchResult, DimensionMismatchError> {
    CosineMatcher.verify(probe, reference, threshold)
}

/// Top-`k` identification with [`CosineMatcher`]. An empty gallery yields
/// an empty list.
pub fn identify(
    probe: &Embedding,
    gallery: &[IdentityRecord],
    k: usize,
    threshold: f32,
) -> Result<Vec<Candidate>, DimensionMismatchError> {
    CosineMatcher.identify(probe, gallery, &MatchPolicy { threshold, top_k: k })
}
