//! Pipeline orchestration.
//!
//! Coordinates a full run: load tables → salary/location enrichment →
//! chunked qualification scoring → geography classification → cleaning
//! and inflation → curated skills → monthly summaries. Structural defects
//! (fan-out, duplicate keys under `reject`, missing reference data, lost
//! chunks) abort the run; per-record gaps become absent values.

use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};

use crate::checkpoint::CheckpointStore;
use crate::chunk::{assemble, distinct_descriptions, partition, score_chunks};
use crate::clean::{curate, curate_skills, CleaningRules};
use crate::config::{Config, InputsConfig};
use crate::enrich::{enrich_adverts, SideTable};
use crate::geography::GeographyReference;
use crate::models::{
    CuratedAdvert, CuratedSkill, EnrichedAdvert, JobAdvert, JobDescription, LocationRecord,
    RuralUrbanRecord, SalaryRecord, SkillRecord,
};
use crate::progress::{PipelineProgressEvent, PipelineProgressReporter, Stage};
use crate::qualification::QualificationMatcher;
use crate::summary::{
    profession_monthly, qualification_monthly, ProfessionMonthly, QualificationMonthly, RunSummary,
};
use crate::tables::{read_descriptions, read_table, write_table};

pub const CURATED_ADVERTS_FILE: &str = "curated_adverts.csv";
pub const CURATED_SKILLS_FILE: &str = "curated_skills.csv";
pub const PROFESSION_MONTHLY_FILE: &str = "profession_monthly.csv";
pub const QUALIFICATION_MONTHLY_FILE: &str = "qualification_monthly.csv";

/// Every table a run consumes, already in memory.
#[derive(Debug, Clone, Default)]
pub struct PipelineInputs {
    pub adverts: Vec<JobAdvert>,
    pub descriptions: Vec<JobDescription>,
    pub salaries: Vec<SalaryRecord>,
    pub locations: Vec<LocationRecord>,
    pub skills: Vec<SkillRecord>,
    pub rural_urban: Vec<RuralUrbanRecord>,
}

impl PipelineInputs {
    pub fn load(inputs: &InputsConfig, reporter: &dyn PipelineProgressReporter) -> Result<Self> {
        let loaded = |table: &str, rows: usize| {
            reporter.report(PipelineProgressEvent::Loaded {
                table: table.to_string(),
                rows: rows as u64,
            })
        };

        let adverts: Vec<JobAdvert> = read_table(&inputs.adverts, "adverts")?;
        loaded("adverts", adverts.len());
        let descriptions = read_descriptions(&inputs.descriptions)?;
        loaded("descriptions", descriptions.len());
        let salaries: Vec<SalaryRecord> = read_table(&inputs.salaries, "salaries")?;
        loaded("salaries", salaries.len());
        let locations: Vec<LocationRecord> = read_table(&inputs.locations, "locations")?;
        loaded("locations", locations.len());
        let skills: Vec<SkillRecord> = read_table(&inputs.skills, "skills")?;
        loaded("skills", skills.len());
        let rural_urban: Vec<RuralUrbanRecord> = read_table(&inputs.rural_urban, "rural_urban")?;
        loaded("rural_urban", rural_urban.len());

        Ok(Self {
            adverts,
            descriptions,
            salaries,
            locations,
            skills,
            rural_urban,
        })
    }
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub curated: Vec<CuratedAdvert>,
    pub skills: Vec<CuratedSkill>,
    pub profession_monthly: Vec<ProfessionMonthly>,
    pub qualification_monthly: Vec<QualificationMonthly>,
    pub summary: RunSummary,
}

fn report_stage(reporter: &dyn PipelineProgressReporter, stage: Stage, rows_in: usize, rows_out: usize) {
    reporter.report(PipelineProgressEvent::Stage {
        stage,
        rows_in: rows_in as u64,
        rows_out: rows_out as u64,
    });
}

fn report_dropped(reporter: &dyn PipelineProgressReporter, table: &str, dropped: usize) {
    if dropped > 0 {
        reporter.report(PipelineProgressEvent::Deduplicated {
            table: table.to_string(),
            dropped: dropped as u64,
        });
    }
}

/// Attach qualification levels to cohort adverts. Adverts outside the
/// cohort, without a description, or outside a sample keep `None`.
fn qualify(
    config: &Config,
    rows: Vec<EnrichedAdvert>,
    descriptions: &[JobDescription],
    matcher: &QualificationMatcher,
    reporter: &dyn PipelineProgressReporter,
    summary: &mut RunSummary,
) -> Result<Vec<EnrichedAdvert>> {
    let cohort_professions: HashSet<&str> = config
        .enrichment
        .qualification_professions
        .iter()
        .map(String::as_str)
        .collect();
    let in_cohort = |row: &EnrichedAdvert| {
        cohort_professions.is_empty()
            || row
                .profession
                .as_deref()
                .is_some_and(|p| cohort_professions.contains(p))
    };

    let mut text_by_id: HashMap<i64, &str> = HashMap::new();
    for d in descriptions {
        text_by_id.entry(d.id).or_insert(d.description.as_str());
    }

    let cohort_texts: Vec<&str> = rows
        .iter()
        .filter(|r| in_cohort(r))
        .filter_map(|r| text_by_id.get(&r.id).copied())
        .collect();
    summary.cohort_adverts = rows.iter().filter(|r| in_cohort(r)).count();

    let mut texts = distinct_descriptions(cohort_texts);
    if !config.batch.production {
        texts.truncate(config.batch.sample_size);
    }
    let chunks = partition(&texts, config.batch.chunk_size, matcher.fingerprint());
    summary.distinct_descriptions = texts.len();
    summary.chunks = chunks.len();

    let store = match &config.batch.checkpoint_dir {
        Some(dir) => Some(CheckpointStore::open(dir)?),
        None => None,
    };
    let outputs = score_chunks(&chunks, matcher, config.batch.parallel, store.as_ref(), reporter)?;
    let lookup = assemble(chunks.len(), outputs)?;
    summary.descriptions_matched = lookup.matched();

    let rows: Vec<EnrichedAdvert> = rows
        .into_iter()
        .map(|mut row| {
            if in_cohort(&row) {
                row.qualification_level = text_by_id
                    .get(&row.id)
                    .and_then(|text| lookup.level_for(text));
            }
            row
        })
        .collect();

    let levelled = rows.iter().filter(|r| r.qualification_level.is_some()).count();
    report_stage(reporter, Stage::Qualify, summary.cohort_adverts, levelled);
    Ok(rows)
}

/// Run the whole pipeline over in-memory inputs.
pub fn run(
    config: &Config,
    inputs: PipelineInputs,
    matcher: &QualificationMatcher,
    reporter: &dyn PipelineProgressReporter,
) -> Result<PipelineOutput> {
    let mut summary = RunSummary {
        adverts_loaded: inputs.adverts.len(),
        descriptions_loaded: inputs.descriptions.len(),
        table_version: matcher.version().to_string(),
        sample: !config.batch.production,
        ..RunSummary::default()
    };

    let policy = config.enrichment.duplicate_keys;
    let salaries = SideTable::unique("salaries", inputs.salaries, policy)?;
    let locations = SideTable::unique("locations", inputs.locations, policy)?;
    let skill_rows = inputs.skills.len();
    let skills = SideTable::grouped("skills", inputs.skills);
    let geography = GeographyReference::build(inputs.rural_urban)?;
    report_dropped(reporter, salaries.name(), salaries.duplicates_dropped());
    report_dropped(reporter, locations.name(), locations.duplicates_dropped());
    report_dropped(reporter, "rural_urban", geography.duplicates_dropped());
    summary.side_duplicates_dropped = salaries.duplicates_dropped() + locations.duplicates_dropped();
    summary.reference_duplicates_dropped = geography.duplicates_dropped();

    let enriched = enrich_adverts(&inputs.adverts, &salaries, &locations)?;
    report_stage(reporter, Stage::Enrich, inputs.adverts.len(), enriched.len());

    let qualified = qualify(config, enriched, &inputs.descriptions, matcher, reporter, &mut summary)?;

    let classified = geography.classify_adverts(&qualified)?;
    report_stage(reporter, Stage::Classify, qualified.len(), classified.len());

    let rules = CleaningRules::from_config(&config.cleaning)?;
    let inflation = config.inflation.table()?;
    let curated = curate(classified, &rules, &inflation, reporter);

    let curated_skills = curate_skills(&curated, &skills);
    report_stage(reporter, Stage::Skills, skill_rows, curated_skills.len());

    summary.curated_adverts = curated.len();
    summary.curated_skills = curated_skills.len();

    Ok(PipelineOutput {
        profession_monthly: profession_monthly(&curated),
        qualification_monthly: qualification_monthly(&curated),
        curated,
        skills: curated_skills,
        summary,
    })
}

/// Load inputs named in `config`, run, and write every output table.
pub fn run_from_files(config: &Config, reporter: &dyn PipelineProgressReporter) -> Result<PipelineOutput> {
    let matcher = QualificationMatcher::new(config.qualifications.table()?)?;
    let inputs = PipelineInputs::load(&config.inputs, reporter)?;
    let output = run(config, inputs, &matcher, reporter)?;

    let dir = &config.output.dir;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    write_table(&dir.join(CURATED_ADVERTS_FILE), &output.curated)?;
    write_table(&dir.join(CURATED_SKILLS_FILE), &output.skills)?;
    write_table(&dir.join(PROFESSION_MONTHLY_FILE), &output.profession_monthly)?;
    write_table(&dir.join(QUALIFICATION_MONTHLY_FILE), &output.qualification_monthly)?;

    Ok(output)
}
