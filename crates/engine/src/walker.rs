use crate::model::{BatchResponse, ItemResult};

/// What the response stream said about one input position.
#[derive(Debug)]
pub enum ChunkItem<'a> {
    /// Per-item result from a chunk-success response.
    Result(&'a ItemResult),
    /// The whole chunk's call failed; no per-item results exist.
    ChunkFailed,
}

/// True when the platform rejected the run outright because the requested
/// partition does not exist. Only the first response can carry this; when it
/// does, no per-item results exist anywhere in the sequence.
pub fn partition_rejected(responses: &[BatchResponse]) -> bool {
    responses
        .first()
        .and_then(|r| r.error.as_ref())
        .is_some_and(|e| !e.partition)
}

/// Pair every covered input position with its chunk item, in ascending
/// position order with no gaps and no duplicates.
///
/// The base offset advances by `chunk_size` per response regardless of how
/// many items the response actually carries; item pairing inside a
/// chunk-success uses the real result length, so a short final chunk still
/// lines up. A chunk-failure covers the full `chunk_size` positions, clipped
/// to the input length.
pub fn walk<'a>(
    responses: &'a [BatchResponse],
    lead_count: usize,
    chunk_size: usize,
) -> Vec<(usize, ChunkItem<'a>)> {
    let mut pairs = Vec::with_capacity(lead_count);

    for (chunk_index, response) in responses.iter().enumerate() {
        let base = chunk_index * chunk_size;
        match response.items() {
            Some(items) => {
                for (offset, item) in items.iter().enumerate() {
                    let position = base + offset;
                    if position >= lead_count {
                        break;
                    }
                    pairs.push((position, ChunkItem::Result(item)));
                }
            }
            None => {
                for position in base..(base + chunk_size).min(lead_count) {
                    pairs.push((position, ChunkItem::ChunkFailed));
                }
            }
        }
    }

    pairs
}
