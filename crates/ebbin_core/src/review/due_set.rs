//! Due-set selection over reviewable chunks.
//!
//! # Invariants
//! - Mastered or review-ineligible chunks are never selected.
//! - Output is sorted by priority descending; ties put never-reviewed chunks
//!   first, then keep input order.
//! - Output length never exceeds `limit`.

use crate::model::chunk::Chunk;
use crate::review::retention::compute_priority;
use serde::Serialize;
use std::cmp::Ordering;

/// Limit used when callers do not supply one.
pub const DEFAULT_DUE_LIMIT: u32 = 10;

/// Chunk paired with the priority it was ranked by.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedChunk {
    pub chunk: Chunk,
    pub priority: f64,
}

/// Returns at most `limit` due chunks ranked by priority at `now_ms`.
///
/// `limit == 0` and an empty input both yield an empty result.
pub fn select_due<I>(chunks: I, limit: u32, now_ms: i64) -> Vec<RankedChunk>
where
    I: IntoIterator<Item = Chunk>,
{
    if limit == 0 {
        return Vec::new();
    }

    let mut ranked: Vec<RankedChunk> = chunks
        .into_iter()
        .filter(Chunk::is_schedulable)
        .map(|chunk| RankedChunk {
            priority: compute_priority(&chunk, now_ms),
            chunk,
        })
        .collect();

    // `sort_by` is stable, which keeps input order for full ties.
    ranked.sort_by(rank_order);
    ranked.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
    ranked
}

/// Ordering used for due-set ranking.
pub fn rank_order(left: &RankedChunk, right: &RankedChunk) -> Ordering {
    right
        .priority
        .total_cmp(&left.priority)
        .then_with(|| {
            right
                .chunk
                .is_never_reviewed()
                .cmp(&left.chunk.is_never_reviewed())
        })
}
