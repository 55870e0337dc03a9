use serde::{Deserialize, Serialize};

/// Balance of row counts across the chunks of one run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkSkew {
    pub total: usize,
    pub chunks: usize,
    pub min: usize,
    pub max: usize,
    pub mean: f64,
    pub max_share: f64,
    pub min_share: f64,
    pub ratio: f64,
    pub per_chunk: Vec<ChunkShare>,
}

/// One chunk's share of the written rows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkShare {
    /// 0-based chunk index.
    pub chunk: usize,
    pub rows: usize,
    pub share: f64,
}

fn share(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// Compute skew metrics from per-chunk row counts (indexed by chunk).
///
/// `per_chunk` is sorted largest first, ties by chunk index.
pub fn chunk_skew(counts: &[usize]) -> Option<ChunkSkew> {
    let min = *counts.iter().min()?;
    let max = *counts.iter().max()?;
    let total: usize = counts.iter().sum();
    let chunks = counts.len();
    let ratio = if min == 0 {
        if max == 0 { 1.0 } else { f64::INFINITY }
    } else {
        max as f64 / min as f64
    };
    let mut per_chunk: Vec<ChunkShare> = counts
        .iter()
        .enumerate()
        .map(|(chunk, &rows)| ChunkShare {
            chunk,
            rows,
            share: share(rows, total),
        })
        .collect();
    per_chunk.sort_by(|a, b| b.rows.cmp(&a.rows).then_with(|| a.chunk.cmp(&b.chunk)));
    Some(ChunkSkew {
        total,
        chunks,
        min,
        max,
        mean: total as f64 / chunks as f64,
        max_share: share(max, total),
        min_share: share(min, total),
        ratio,
        per_chunk,
    })
}
