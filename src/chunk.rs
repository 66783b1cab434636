//! Chunked qualification scoring over distinct description texts.
//!
//! Identical descriptions recur across many adverts, so texts are first
//! normalized and de-duplicated, then split into fixed-size
//! [`DescriptionChunk`]s. Each chunk is a pure function of its input and
//! can be scored on any worker, in any order, or replayed from a
//! checkpoint. Reassembly is keyed by chunk index and by text, never by
//! completion order or list position.

use anyhow::Result;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::checkpoint::CheckpointStore;
use crate::error::PipelineError;
use crate::models::QualificationLevel;
use crate::normalize::normalize;
use crate::progress::{PipelineProgressEvent, PipelineProgressReporter};
use crate::qualification::QualificationMatcher;

/// A contiguous slice of the distinct-text list.
#[derive(Debug, Clone)]
pub struct DescriptionChunk {
    pub index: usize,
    /// Position of the first text in the full distinct list.
    pub start: usize,
    pub texts: Vec<String>,
    /// SHA-256 over the qualification table fingerprint and the chunk's texts.
    pub hash: String,
}

/// A normalized text paired with its extracted level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredText {
    pub text: String,
    pub level: Option<QualificationLevel>,
}

/// Scoring result for one chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkOutput {
    pub index: usize,
    pub hash: String,
    pub scored: Vec<ScoredText>,
}

/// Normalize and de-duplicate descriptions, keeping first-seen order.
pub fn distinct_descriptions<'a>(descriptions: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for raw in descriptions {
        let text = normalize(raw);
        if seen.insert(text.clone()) {
            out.push(text);
        }
    }
    out
}

/// Split texts into chunks of at most `chunk_size` (minimum 1). Returns
/// chunks with contiguous indices starting at 0.
pub fn partition(texts: &[String], chunk_size: usize, table_fingerprint: &str) -> Vec<DescriptionChunk> {
    let size = chunk_size.max(1);
    texts
        .chunks(size)
        .enumerate()
        .map(|(index, slice)| make_chunk(index, index * size, slice, table_fingerprint))
        .collect()
}

fn make_chunk(index: usize, start: usize, texts: &[String], table_fingerprint: &str) -> DescriptionChunk {
    let mut hasher = Sha256::new();
    hasher.update((table_fingerprint.len() as u64).to_le_bytes());
    hasher.update(table_fingerprint.as_bytes());
    for text in texts {
        hasher.update((text.len() as u64).to_le_bytes());
        hasher.update(text.as_bytes());
    }
    let hash = format!("{:x}", hasher.finalize());

    DescriptionChunk {
        index,
        start,
        texts: texts.to_vec(),
        hash,
    }
}

/// Score one chunk. Pure: same chunk and matcher, same output.
pub fn score_chunk(chunk: &DescriptionChunk, matcher: &QualificationMatcher) -> ChunkOutput {
    ChunkOutput {
        index: chunk.index,
        hash: chunk.hash.clone(),
        scored: chunk
            .texts
            .iter()
            .map(|text| ScoredText {
                text: text.clone(),
                level: matcher.level_of(text),
            })
            .collect(),
    }
}

/// Score every chunk, reusing valid checkpoints and writing new ones.
/// Output order follows `chunks`, whatever order workers finish in.
pub fn score_chunks(
    chunks: &[DescriptionChunk],
    matcher: &QualificationMatcher,
    parallel: bool,
    store: Option<&CheckpointStore>,
    reporter: &dyn PipelineProgressReporter,
) -> Result<Vec<ChunkOutput>> {
    let total = chunks.len() as u64;
    let done = AtomicU64::new(0);
    let resumed = AtomicU64::new(0);

    let run = |chunk: &DescriptionChunk| -> Result<ChunkOutput> {
        let output = match store.and_then(|s| s.load(chunk)) {
            Some(cached) => {
                resumed.fetch_add(1, Ordering::Relaxed);
                cached
            }
            None => {
                let output = score_chunk(chunk, matcher);
                if let Some(s) = store {
                    s.save(&output)?;
                }
                output
            }
        };
        let n = done.fetch_add(1, Ordering::Relaxed) + 1;
        reporter.report(PipelineProgressEvent::Scoring { n, total });
        Ok(output)
    };

    let outputs: Vec<ChunkOutput> = if parallel {
        chunks.par_iter().map(run).collect::<Result<Vec<_>>>()?
    } else {
        chunks.iter().map(run).collect::<Result<Vec<_>>>()?
    };

    let resumed = resumed.load(Ordering::Relaxed);
    if resumed > 0 {
        reporter.report(PipelineProgressEvent::Resumed {
            chunks: resumed,
            total,
        });
    }
    Ok(outputs)
}

/// Text-keyed qualification levels for one cohort.
#[derive(Debug, Clone, Default)]
pub struct QualificationLookup {
    levels: HashMap<String, Option<QualificationLevel>>,
}

impl QualificationLookup {
    /// Level for raw description text. Texts that were never scored (for
    /// example outside a sample) are `None`.
    pub fn level_for(&self, raw: &str) -> Option<QualificationLevel> {
        self.level_for_normalized(&normalize(raw))
    }

    pub fn level_for_normalized(&self, normalized: &str) -> Option<QualificationLevel> {
        self.levels.get(normalized).copied().flatten()
    }

    pub fn contains(&self, normalized: &str) -> bool {
        self.levels.contains_key(normalized)
    }

    /// Number of distinct texts scored.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Number of distinct texts with a recognised level.
    pub fn matched(&self) -> usize {
        self.levels.values().filter(|l| l.is_some()).count()
    }
}

/// Reassemble chunk outputs in chunk-index order. Every index in
/// `0..expected` must be present exactly once.
pub fn assemble(
    expected: usize,
    mut outputs: Vec<ChunkOutput>,
) -> Result<QualificationLookup, PipelineError> {
    outputs.sort_by_key(|o| o.index);

    for i in 0..expected.max(outputs.len()) {
        match outputs.get(i) {
            Some(o) if o.index == i && i < expected => {}
            _ => return Err(PipelineError::MissingChunk { index: i, expected }),
        }
    }

    let mut levels = HashMap::new();
    for output in outputs {
        for scored in output.scored {
            levels.entry(scored.text).or_insert(scored.level);
        }
    }
    Ok(QualificationLookup { levels })
}
