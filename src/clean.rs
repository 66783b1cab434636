//! Curation of enriched adverts into the final analysis table.
//!
//! Stages run in a fixed order: de-duplication, date floor, nation,
//! profession allow-list (after aliasing), inflation, qualification
//! ceiling. Each stage reports how many rows it kept.

use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::CleaningConfig;
use crate::enrich::SideTable;
use crate::inflation::InflationTable;
use crate::models::{CuratedAdvert, CuratedSkill, EnrichedAdvert, Nation, QualificationLevel, SkillRecord};
use crate::progress::{PipelineProgressEvent, PipelineProgressReporter, Stage};

/// Adverts created before this date are never analysed; collection was
/// incomplete before it.
pub const CUTOFF_FLOOR: NaiveDate = match NaiveDate::from_ymd_opt(2021, 4, 1) {
    Some(date) => date,
    None => NaiveDate::MIN,
};

/// Filters applied during curation.
#[derive(Debug, Clone)]
pub struct CleaningRules {
    pub cutoff: NaiveDate,
    pub target_nation: Nation,
    pub professions: HashSet<String>,
    pub aliases: HashMap<String, String>,
    pub ceiling_professions: HashSet<String>,
    pub max_level: QualificationLevel,
}

impl CleaningRules {
    pub fn from_config(config: &CleaningConfig) -> Result<Self> {
        let max_level = QualificationLevel::new(config.max_qualification_level).ok_or_else(|| {
            anyhow::anyhow!(
                "cleaning.max_qualification_level {} is outside {}..={}",
                config.max_qualification_level,
                QualificationLevel::MIN,
                QualificationLevel::MAX
            )
        })?;
        Ok(Self {
            cutoff: config.cutoff.max(CUTOFF_FLOOR),
            target_nation: config.target_nation,
            professions: config.professions.iter().cloned().collect(),
            aliases: config
                .profession_aliases
                .iter()
                .map(|(from, to)| (from.clone(), to.clone()))
                .collect(),
            ceiling_professions: config.ceiling_professions.iter().cloned().collect(),
            max_level,
        })
    }

    /// Canonical profession name for a classifier label.
    pub fn canonical_profession<'a>(&'a self, label: &'a str) -> &'a str {
        self.aliases.get(label).map(String::as_str).unwrap_or(label)
    }
}

/// Keep the first advert of every `(job_location_raw, job_title_raw,
/// created)` group, in input order.
pub fn deduplicate(rows: Vec<EnrichedAdvert>) -> Vec<EnrichedAdvert> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|r| seen.insert((r.job_location_raw.clone(), r.job_title_raw.clone(), r.created)))
        .collect()
}

/// Adverts with no creation date are excluded.
pub fn filter_from(rows: Vec<EnrichedAdvert>, cutoff: NaiveDate) -> Vec<EnrichedAdvert> {
    let cutoff = cutoff.max(CUTOFF_FLOOR);
    rows.into_iter()
        .filter(|r| r.created.is_some_and(|d| d >= cutoff))
        .collect()
}

pub fn filter_nation(rows: Vec<EnrichedAdvert>, nation: Nation) -> Vec<EnrichedAdvert> {
    rows.into_iter().filter(|r| r.nation == nation).collect()
}

/// Rename aliased professions, then keep the allow-listed ones. Adverts
/// without a profession are dropped.
pub fn filter_professions(rows: Vec<EnrichedAdvert>, rules: &CleaningRules) -> Vec<EnrichedAdvert> {
    rows.into_iter()
        .filter_map(|mut r| {
            let canonical = rules.canonical_profession(r.profession.as_deref()?).to_string();
            if !rules.professions.contains(&canonical) {
                return None;
            }
            r.profession = Some(canonical);
            Some(r)
        })
        .collect()
}

/// Build the output row, adding inflation-adjusted salaries. Rows must
/// already have passed the date and profession filters.
pub fn to_curated(row: EnrichedAdvert, inflation: &InflationTable) -> Option<CuratedAdvert> {
    let created = row.created?;
    let profession = row.profession?;
    let year = created.year();
    Some(CuratedAdvert {
        id: row.id,
        created,
        year,
        month_year: created.format("%Y-%m").to_string(),
        profession,
        nation: row.nation,
        region_code: row.region_code,
        region_name: row.region_name,
        ruc_code: row.ruc_code,
        ruc_name: row.ruc_name,
        broad_ruc: row.broad_ruc,
        job_title_raw: row.job_title_raw,
        job_location_raw: row.job_location_raw,
        min_annualised_salary: row.min_annualised_salary,
        max_annualised_salary: row.max_annualised_salary,
        inflation_adj_min_salary: inflation.adjust(row.min_annualised_salary, year),
        inflation_adj_max_salary: inflation.adjust(row.max_annualised_salary, year),
        qualification_level: row.qualification_level,
    })
}

/// For ceiling professions keep only rows at or below `max_level`, or with
/// no level at all.
pub fn apply_ceiling(rows: Vec<CuratedAdvert>, rules: &CleaningRules) -> Vec<CuratedAdvert> {
    rows.into_iter()
        .filter(|r| {
            !rules.ceiling_professions.contains(&r.profession)
                || r.qualification_level.map_or(true, |l| l <= rules.max_level)
        })
        .collect()
}

fn report(reporter: &dyn PipelineProgressReporter, stage: Stage, rows_in: usize, rows_out: usize) {
    reporter.report(PipelineProgressEvent::Stage {
        stage,
        rows_in: rows_in as u64,
        rows_out: rows_out as u64,
    });
}

/// Run every curation stage over enriched, classified adverts.
pub fn curate(
    rows: Vec<EnrichedAdvert>,
    rules: &CleaningRules,
    inflation: &InflationTable,
    reporter: &dyn PipelineProgressReporter,
) -> Vec<CuratedAdvert> {
    let n = rows.len();
    let rows = deduplicate(rows);
    report(reporter, Stage::Deduplicate, n, rows.len());

    let n = rows.len();
    let rows = filter_from(rows, rules.cutoff);
    report(reporter, Stage::DateFloor, n, rows.len());

    let n = rows.len();
    let rows = filter_nation(rows, rules.target_nation);
    report(reporter, Stage::Nation, n, rows.len());

    let n = rows.len();
    let rows = filter_professions(rows, rules);
    report(reporter, Stage::Profession, n, rows.len());

    let curated: Vec<CuratedAdvert> = rows
        .into_iter()
        .filter_map(|r| to_curated(r, inflation))
        .collect();

    let n = curated.len();
    let curated = apply_ceiling(curated, rules);
    report(reporter, Stage::Ceiling, n, curated.len());
    curated
}

/// Skill rows for curated adverts, labelled with the advert's profession
/// and nation.
pub fn curate_skills(curated: &[CuratedAdvert], skills: &SideTable<SkillRecord>) -> Vec<CuratedSkill> {
    let mut labels: BTreeMap<i64, (&str, Nation)> = BTreeMap::new();
    for advert in curated {
        labels
            .entry(advert.id)
            .or_insert((advert.profession.as_str(), advert.nation));
    }

    let mut out = Vec::new();
    for (id, (profession, nation)) in labels {
        out.extend(skills.get(&id).iter().map(|s| CuratedSkill {
            id,
            skill_id: s.skill_id.clone(),
            skill_label: s.skill_label.clone(),
            profession: profession.to_string(),
            nation,
        }));
    }
    out
}
