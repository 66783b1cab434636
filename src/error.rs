//! Structural pipeline failures.
//!
//! Per-record data problems (a missing salary, an unparseable date, an
//! unknown region) never surface here: they become `None` fields. A
//! [`PipelineError`] means the run itself cannot be trusted and must stop.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// A left join produced more rows than its driving table.
    FanOut {
        table: String,
        before: usize,
        after: usize,
    },
    /// A side table expected to be unique per key was not.
    DuplicateKey { table: String, key: String },
    /// Required reference data is missing or empty.
    MissingReference(String),
    /// A chunk output was lost or produced twice during reassembly.
    MissingChunk { index: usize, expected: usize },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::FanOut {
                table,
                before,
                after,
            } => write!(
                f,
                "join with '{}' fanned out: {} rows before, {} after",
                table, before, after
            ),
            PipelineError::DuplicateKey { table, key } => {
                write!(f, "duplicate key '{}' in side table '{}'", key, table)
            }
            PipelineError::MissingReference(what) => {
                write!(f, "missing required reference data: {}", what)
            }
            PipelineError::MissingChunk { index, expected } => write!(
                f,
                "chunk {} missing or duplicated during reassembly ({} chunks expected)",
                index, expected
            ),
        }
    }
}

impl std::error::Error for PipelineError {}
