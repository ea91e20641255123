use crate::model::{ItemResult, Outcome};
use crate::walker::ChunkItem;

/// Error-message signature the platform uses when more than one existing
/// lead matches the upsert's lookup criteria.
///
/// The platform only signals this case through free-text reason messages,
/// so detection is a case-insensitive substring match. Kept behind
/// `is_ambiguous_match` so it can move to a structured error code if the
/// API ever grows one.
const AMBIGUOUS_MATCH_SIGNATURE: &str = "multiple lead match lookup criteria";

/// Reason attached to every position of a chunk whose call failed as a unit.
pub const CHUNK_FAILED_MESSAGE: &str = "request failed";

/// Statuses that mean the platform accepted the lead.
const UPSERTED_STATUSES: [&str; 2] = ["created", "updated"];

pub fn is_ambiguous_match(message: &str) -> bool {
    message.to_lowercase().contains(AMBIGUOUS_MATCH_SIGNATURE)
}

/// Classify one position's chunk item into its outcome. Pure and
/// order-independent across positions.
pub fn classify(item: &ChunkItem) -> Outcome {
    match item {
        ChunkItem::ChunkFailed => Outcome::Failed {
            message: CHUNK_FAILED_MESSAGE.into(),
        },
        ChunkItem::Result(result) => classify_item(result),
    }
}

/// Classify a single item result.
///
/// An empty reasons list behaves like an absent one: the message falls back
/// to the literal status string. A terminal status the engine doesn't
/// recognize fails with that status as the message.
pub fn classify_item(result: &ItemResult) -> Outcome {
    if UPSERTED_STATUSES.contains(&result.status.as_str()) {
        return Outcome::Passed {
            id: result.id,
            note: None,
        };
    }

    if result.status != "skipped" {
        return Outcome::Failed {
            message: result.status.clone(),
        };
    }

    match result.reasons.as_deref().and_then(|r| r.first()) {
        Some(reason) if is_ambiguous_match(&reason.message) => Outcome::Duplicate {
            id: result.id,
            message: reason.message.clone(),
        },
        Some(reason) => Outcome::Failed {
            message: reason.message.clone(),
        },
        None => Outcome::Failed {
            message: result.status.clone(),
        },
    }
}
