use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::clean::CUTOFF_FLOOR;
use crate::enrich::DuplicateKeyPolicy;
use crate::inflation::InflationTable;
use crate::models::Nation;
use crate::qualification::{LevelKeyword, QualificationTable, DEFAULT_TABLE_VERSION};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub inputs: InputsConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub cleaning: CleaningConfig,
    #[serde(default)]
    pub inflation: InflationConfig,
    #[serde(default)]
    pub qualifications: QualificationsConfig,
}

/// Input table locations. Relative paths resolve against the config file.
#[derive(Debug, Deserialize, Clone)]
pub struct InputsConfig {
    pub adverts: PathBuf,
    pub descriptions: PathBuf,
    pub salaries: PathBuf,
    pub locations: PathBuf,
    pub skills: PathBuf,
    pub rural_urban: PathBuf,
}

impl InputsConfig {
    /// `(name, path)` pairs in load order.
    pub fn tables(&self) -> [(&'static str, &Path); 6] {
        [
            ("adverts", self.adverts.as_path()),
            ("descriptions", self.descriptions.as_path()),
            ("salaries", self.salaries.as_path()),
            ("locations", self.locations.as_path()),
            ("skills", self.skills.as_path()),
            ("rural_urban", self.rural_urban.as_path()),
        ]
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BatchConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// `false` scores only the first `sample_size` distinct descriptions.
    #[serde(default = "default_true")]
    pub production: bool,
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    #[serde(default = "default_true")]
    pub parallel: bool,
    #[serde(default)]
    pub checkpoint_dir: Option<PathBuf>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            production: true,
            sample_size: default_sample_size(),
            parallel: true,
            checkpoint_dir: None,
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_sample_size() -> usize {
    10
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct EnrichmentConfig {
    #[serde(default)]
    pub duplicate_keys: DuplicateKeyPolicy,
    /// Professions whose descriptions are scored. Empty means every advert.
    #[serde(default = "default_qualification_professions")]
    pub qualification_professions: Vec<String>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            duplicate_keys: DuplicateKeyPolicy::default(),
            qualification_professions: default_qualification_professions(),
        }
    }
}

fn default_qualification_professions() -> Vec<String> {
    vec!["Early Years Practitioner".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct CleaningConfig {
    #[serde(default = "default_target_nation")]
    pub target_nation: Nation,
    #[serde(default = "default_cutoff")]
    pub cutoff: NaiveDate,
    #[serde(default = "default_professions")]
    pub professions: Vec<String>,
    #[serde(default = "default_profession_aliases")]
    pub profession_aliases: BTreeMap<String, String>,
    #[serde(default = "default_qualification_professions")]
    pub ceiling_professions: Vec<String>,
    #[serde(default = "default_max_qualification_level")]
    pub max_qualification_level: u8,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            target_nation: default_target_nation(),
            cutoff: default_cutoff(),
            professions: default_professions(),
            profession_aliases: default_profession_aliases(),
            ceiling_professions: default_qualification_professions(),
            max_qualification_level: default_max_qualification_level(),
        }
    }
}

fn default_target_nation() -> Nation {
    Nation::England
}
fn default_cutoff() -> NaiveDate {
    CUTOFF_FLOOR
}
fn default_professions() -> Vec<String> {
    [
        "Early Years Practitioner",
        "Primary School Teacher",
        "Secondary School Teacher",
        "Special Needs Teacher",
        "Retail Assistant",
        "Waiter",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}
fn default_profession_aliases() -> BTreeMap<String, String> {
    [
        ("Primary School", "Primary School Teacher"),
        ("Secondary School", "Secondary School Teacher"),
        ("Special Needs", "Special Needs Teacher"),
        ("Retail", "Retail Assistant"),
    ]
    .iter()
    .map(|(from, to)| (from.to_string(), to.to_string()))
    .collect()
}
fn default_max_qualification_level() -> u8 {
    6
}

#[derive(Debug, Deserialize, Clone)]
pub struct InflationConfig {
    #[serde(default = "default_target_year")]
    pub target_year: i32,
    /// Year (as a TOML key) → annual rate.
    #[serde(default = "default_rates")]
    pub rates: BTreeMap<String, f64>,
}

impl Default for InflationConfig {
    fn default() -> Self {
        Self {
            target_year: default_target_year(),
            rates: default_rates(),
        }
    }
}

fn default_target_year() -> i32 {
    2023
}
fn default_rates() -> BTreeMap<String, f64> {
    [
        ("2020", 0.01),
        ("2021", 0.025),
        ("2022", 0.079),
        ("2023", 0.0896667),
    ]
    .iter()
    .map(|(year, rate)| (year.to_string(), *rate))
    .collect()
}

impl InflationConfig {
    pub fn table(&self) -> Result<InflationTable> {
        let mut rates = BTreeMap::new();
        for (year, rate) in &self.rates {
            let parsed: i32 = year
                .trim()
                .parse()
                .with_context(|| format!("inflation.rates key '{}' is not a year", year))?;
            if !rate.is_finite() || *rate <= -1.0 {
                anyhow::bail!("inflation.rates.{} must be a finite rate > -1.0", year);
            }
            rates.insert(parsed, *rate);
        }
        Ok(InflationTable::new(self.target_year, rates))
    }
}

/// Optional override of the built-in qualification table.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct QualificationsConfig {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub numbered: Option<Vec<LevelKeyword>>,
    #[serde(default)]
    pub levels: Option<BTreeMap<String, u8>>,
}

impl QualificationsConfig {
    /// The built-in table, with any configured parts replaced.
    pub fn table(&self) -> Result<QualificationTable> {
        let default = QualificationTable::default();
        if self.version.is_none() && self.numbered.is_none() && self.levels.is_none() {
            return Ok(default);
        }

        let version = self.version.as_deref().unwrap_or(DEFAULT_TABLE_VERSION);
        let numbered = self.numbered.clone().unwrap_or(default.numbered);
        let levels = match &self.levels {
            Some(levels) => levels.clone(),
            None => default
                .levels
                .iter()
                .map(|(token, level)| (token.name().to_string(), level.get()))
                .collect(),
        };
        QualificationTable::new(version, &numbered, &levels)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate batch
    if config.batch.chunk_size == 0 {
        anyhow::bail!("batch.chunk_size must be > 0");
    }
    if !config.batch.production && config.batch.sample_size == 0 {
        anyhow::bail!("batch.sample_size must be > 0 when batch.production is false");
    }

    // Validate cleaning
    if config.cleaning.cutoff < CUTOFF_FLOOR {
        anyhow::bail!(
            "cleaning.cutoff {} is earlier than the {} floor",
            config.cleaning.cutoff,
            CUTOFF_FLOOR
        );
    }
    if config.cleaning.target_nation == Nation::Unknown {
        anyhow::bail!("cleaning.target_nation must name a nation");
    }
    if config.cleaning.professions.is_empty() {
        anyhow::bail!("cleaning.professions must not be empty");
    }
    if crate::models::QualificationLevel::new(config.cleaning.max_qualification_level).is_none() {
        anyhow::bail!("cleaning.max_qualification_level must be in 1..=7");
    }

    // Validate inflation and qualification tables eagerly
    config.inflation.table()?;
    config.qualifications.table()?;

    // Resolve relative paths against the config file's directory
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    config.resolve_paths(base);

    Ok(config)
}

impl Config {
    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.inputs.adverts);
        resolve(&mut self.inputs.descriptions);
        resolve(&mut self.inputs.salaries);
        resolve(&mut self.inputs.locations);
        resolve(&mut self.inputs.skills);
        resolve(&mut self.inputs.rural_urban);
        resolve(&mut self.output.dir);
        if let Some(dir) = self.batch.checkpoint_dir.as_mut() {
            resolve(dir);
        }
    }
}
