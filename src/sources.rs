use anyhow::Result;
use std::path::Path;

use crate::config::Config;

/// Health of one configured input table.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceStatus {
    pub table: &'static str,
    pub path: String,
    pub status: &'static str,
    pub healthy: bool,
}

fn status_of(table: &'static str, path: &Path) -> SourceStatus {
    let (status, healthy) = match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => ("OK", true),
        Ok(meta) if meta.is_file() => ("EMPTY", false),
        Ok(_) => ("NOT A FILE", false),
        Err(_) => ("MISSING", false),
    };
    SourceStatus {
        table,
        path: path.display().to_string(),
        status,
        healthy,
    }
}

pub fn source_statuses(config: &Config) -> Vec<SourceStatus> {
    config
        .inputs
        .tables()
        .into_iter()
        .map(|(table, path)| status_of(table, path))
        .collect()
}

pub fn list_sources(config: &Config) -> Result<()> {
    println!("{:<14} {:<12} {:<8} PATH", "TABLE", "STATUS", "HEALTHY");
    for s in source_statuses(config) {
        println!("{:<14} {:<12} {:<8} {}", s.table, s.status, s.healthy, s.path);
    }
    Ok(())
}
