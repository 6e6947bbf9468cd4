//! Retention model: priority scoring and post-review retention decay.
//!
//! # Responsibility
//! - Compute the always-derived priority used for due-set ranking.
//! - Apply the review side effects to a chunk.
//!
//! # Invariants
//! - `compute_priority` is pure: equal inputs give equal outputs.
//! - Priority is non-decreasing in importance and staleness and
//!   non-increasing in retention.
//! - A never-reviewed chunk is maximally stale and ranks at least as high as
//!   any reviewed chunk of equal importance.
//! - Retention after a review depends only on the new review count; it is
//!   never compounded from the previous score.

use crate::model::chunk::Chunk;

/// Retention lost per review while the count is below `DECAY_REVIEWS`.
pub const RETENTION_STEP: f64 = 0.1;
/// Retention held from the `DECAY_REVIEWS`-th review onward.
pub const RETENTION_FLOOR: f64 = 0.5;
/// Review count at which retention reaches the floor.
pub const DECAY_REVIEWS: u32 = 5;
/// Days since last review after which staleness stops growing.
pub const STALENESS_CAP_DAYS: f64 = 30.0;

const MS_PER_DAY: f64 = 86_400_000.0;

/// Retention score for a chunk that has been reviewed `review_count` times.
///
/// `1.0 - 0.1 * n` for `n < 5`, then `0.5`.
pub fn retention_for_count(review_count: u32) -> f64 {
    if review_count < DECAY_REVIEWS {
        1.0 - RETENTION_STEP * f64::from(review_count)
    } else {
        RETENTION_FLOOR
    }
}

/// Normalized staleness in `[0, 1]`.
///
/// Never-reviewed chunks return `1.0`. A `last_reviewed` in the future
/// counts as just reviewed.
pub fn staleness(chunk: &Chunk, now_ms: i64) -> f64 {
    match chunk.last_reviewed {
        None => 1.0,
        Some(last_reviewed) => {
            let elapsed_days = now_ms.saturating_sub(last_reviewed) as f64 / MS_PER_DAY;
            elapsed_days.clamp(0.0, STALENESS_CAP_DAYS) / STALENESS_CAP_DAYS
        }
    }
}

/// Retention as seen by the priority formula, clamped to
/// `[RETENTION_FLOOR, 1]`.
///
/// Never-reviewed chunks use the floor so that, together with maximal
/// staleness, no reviewed chunk of equal importance can outrank them.
pub fn effective_retention(chunk: &Chunk) -> f64 {
    if chunk.is_never_reviewed() {
        RETENTION_FLOOR
    } else {
        chunk.retention_score.clamp(RETENTION_FLOOR, 1.0)
    }
}

/// Urgency score of `chunk` at `now_ms`. Higher is more urgent.
///
/// `importance * (2 - effective_retention + staleness)`. The factor lies in
/// `[1, 2.5]`, so importance always pushes priority up.
pub fn compute_priority(chunk: &Chunk, now_ms: i64) -> f64 {
    let urgency = 2.0 - effective_retention(chunk) + staleness(chunk, now_ms);
    chunk.user_importance * urgency
}

/// Applies one completed review to `chunk`.
///
/// Sets `last_reviewed = now_ms`, increments `review_count` and recomputes
/// `retention_score` from the new count.
pub fn record_review(chunk: &mut Chunk, now_ms: i64) {
    chunk.last_reviewed = Some(now_ms);
    chunk.review_count = chunk.review_count.saturating_add(1);
    chunk.retention_score = retention_for_count(chunk.review_count);
}
