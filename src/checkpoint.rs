//! On-disk chunk checkpoints.
//!
//! Each scored chunk is written as `chunk-NNNNN.json` in the checkpoint
//! directory. Writes go to a temporary file first and are renamed into
//! place, so a reader only ever sees complete outputs. A checkpoint is
//! reused only when its stored input hash matches the chunk being scored;
//! anything else (missing, truncated, stale) is recomputed.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::chunk::{ChunkOutput, DescriptionChunk};

#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir).with_context(|| {
            format!("Failed to create checkpoint directory: {}", dir.display())
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, index: usize) -> PathBuf {
        self.dir.join(format!("chunk-{:05}.json", index))
    }

    /// Load a checkpoint for `chunk` if one exists and matches its input.
    pub fn load(&self, chunk: &DescriptionChunk) -> Option<ChunkOutput> {
        let content = std::fs::read_to_string(self.path_for(chunk.index)).ok()?;
        let output: ChunkOutput = serde_json::from_str(&content).ok()?;
        let valid = output.index == chunk.index
            && output.hash == chunk.hash
            && output.scored.len() == chunk.texts.len()
            && output
                .scored
                .iter()
                .zip(&chunk.texts)
                .all(|(s, t)| &s.text == t);
        valid.then_some(output)
    }

    pub fn save(&self, output: &ChunkOutput) -> Result<()> {
        let path = self.path_for(output.index);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string(output)?;
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write checkpoint: {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to finalize checkpoint: {}", path.display()))?;
        Ok(())
    }
}
