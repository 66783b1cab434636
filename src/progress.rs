//! Pipeline progress reporting.
//!
//! Reports what each stage of `eyla run` is doing (rows loaded, rows kept
//! and dropped per stage, chunks scored) so long runs are observable.
//! Progress is emitted on **stderr** so stdout remains parseable for scripts.

use std::fmt;
use std::io::Write;

/// Row-level stages of a run, in execution order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stage {
    Enrich,
    Classify,
    Qualify,
    Deduplicate,
    DateFloor,
    Nation,
    Profession,
    Ceiling,
    Skills,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Enrich => "enrich",
            Stage::Classify => "classify",
            Stage::Qualify => "qualify",
            Stage::Deduplicate => "deduplicate",
            Stage::DateFloor => "date-floor",
            Stage::Nation => "nation",
            Stage::Profession => "profession",
            Stage::Ceiling => "ceiling",
            Stage::Skills => "skills",
        };
        f.write_str(name)
    }
}

/// A single progress event.
#[derive(Clone, Debug)]
pub enum PipelineProgressEvent {
    /// An input table finished loading.
    Loaded { table: String, rows: u64 },
    /// Rows discarded from a side table because their key was already seen.
    Deduplicated { table: String, dropped: u64 },
    /// A stage transformed `rows_in` rows into `rows_out` rows.
    Stage {
        stage: Stage,
        rows_in: u64,
        rows_out: u64,
    },
    /// `n` of `total` description chunks scored.
    Scoring { n: u64, total: u64 },
    /// Chunks taken from checkpoints instead of being rescored.
    Resumed { chunks: u64, total: u64 },
}

/// Reports pipeline progress. Implementations write to stderr (human or JSON).
/// Called from scoring workers, hence `Send + Sync`.
pub trait PipelineProgressReporter: Send + Sync {
    fn report(&self, event: PipelineProgressEvent);
}

/// Human-friendly progress on stderr: "eyla  scoring  12 / 1,204 chunks".
pub struct StderrProgress;

impl PipelineProgressReporter for StderrProgress {
    fn report(&self, event: PipelineProgressEvent) {
        let line = match &event {
            PipelineProgressEvent::Loaded { table, rows } => {
                format!("eyla  loaded  {}  {} rows\n", table, format_number(*rows))
            }
            PipelineProgressEvent::Deduplicated { table, dropped } => format!(
                "eyla  dedup  {}  dropped {} duplicate keys\n",
                table,
                format_number(*dropped)
            ),
            PipelineProgressEvent::Stage {
                stage,
                rows_in,
                rows_out,
            } => format!(
                "eyla  {}  {} -> {} rows\n",
                stage,
                format_number(*rows_in),
                format_number(*rows_out)
            ),
            PipelineProgressEvent::Scoring { n, total } => format!(
                "eyla  scoring  {} / {} chunks\n",
                format_number(*n),
                format_number(*total)
            ),
            PipelineProgressEvent::Resumed { chunks, total } => format!(
                "eyla  resumed  {} / {} chunks from checkpoints\n",
                format_number(*chunks),
                format_number(*total)
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl PipelineProgressReporter for JsonProgress {
    fn report(&self, event: PipelineProgressEvent) {
        let obj = match &event {
            PipelineProgressEvent::Loaded { table, rows } => serde_json::json!({
                "event": "loaded",
                "table": table,
                "rows": rows
            }),
            PipelineProgressEvent::Deduplicated { table, dropped } => serde_json::json!({
                "event": "deduplicated",
                "table": table,
                "dropped": dropped
            }),
            PipelineProgressEvent::Stage {
                stage,
                rows_in,
                rows_out,
            } => serde_json::json!({
                "event": "stage",
                "stage": stage.to_string(),
                "rows_in": rows_in,
                "rows_out": rows_out
            }),
            PipelineProgressEvent::Scoring { n, total } => serde_json::json!({
                "event": "progress",
                "phase": "scoring",
                "n": n,
                "total": total
            }),
            PipelineProgressEvent::Resumed { chunks, total } => serde_json::json!({
                "event": "resumed",
                "chunks": chunks,
                "total": total
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl PipelineProgressReporter for NoProgress {
    fn report(&self, _event: PipelineProgressEvent) {}
}

pub(crate) fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn PipelineProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
