//! Record linkage between adverts and their side tables.
//!
//! Side tables are indexed once into a [`SideTable`] and joined onto the
//! driving advert table with [`left_join`]. Every driving row survives the
//! join; a join that yields more rows than it was given is a structural
//! defect and aborts with [`PipelineError::FanOut`].
//!
//! When a field exists on both sides (the raw location string), the side
//! table's copy is authoritative and the advert's copy is dropped.

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::PipelineError;
use crate::models::{EnrichedAdvert, JobAdvert, LocationRecord, Nation, SalaryRecord, SkillRecord};

/// A row that can be looked up by key.
pub trait Keyed {
    type Key: Eq + Hash + Clone + Debug;
    fn key(&self) -> Self::Key;
}

impl Keyed for SalaryRecord {
    type Key = i64;
    fn key(&self) -> i64 {
        self.id
    }
}

impl Keyed for LocationRecord {
    type Key = i64;
    fn key(&self) -> i64 {
        self.id
    }
}

impl Keyed for SkillRecord {
    type Key = i64;
    fn key(&self) -> i64 {
        self.id
    }
}

/// What to do when a side table that must be unique per key is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKeyPolicy {
    /// Keep the first row per key in input order, drop the rest.
    #[default]
    KeepFirst,
    /// Fail the run.
    Reject,
}

/// Side table indexed by key.
#[derive(Debug, Clone)]
pub struct SideTable<T: Keyed> {
    name: String,
    rows: HashMap<T::Key, Vec<T>>,
    duplicates_dropped: usize,
}

impl<T: Keyed> SideTable<T> {
    /// Index a table that must hold at most one row per key.
    pub fn unique(
        name: &str,
        rows: Vec<T>,
        policy: DuplicateKeyPolicy,
    ) -> Result<Self, PipelineError> {
        let mut index: HashMap<T::Key, Vec<T>> = HashMap::with_capacity(rows.len());
        let mut duplicates_dropped = 0;

        for row in rows {
            let key = row.key();
            if index.contains_key(&key) {
                match policy {
                    DuplicateKeyPolicy::KeepFirst => duplicates_dropped += 1,
                    DuplicateKeyPolicy::Reject => {
                        return Err(PipelineError::DuplicateKey {
                            table: name.to_string(),
                            key: format!("{:?}", key),
                        })
                    }
                }
                continue;
            }
            index.insert(key, vec![row]);
        }

        Ok(Self {
            name: name.to_string(),
            rows: index,
            duplicates_dropped,
        })
    }

    /// Index an association table that may hold many rows per key.
    pub fn grouped(name: &str, rows: Vec<T>) -> Self {
        let mut index: HashMap<T::Key, Vec<T>> = HashMap::new();
        for row in rows {
            index.entry(row.key()).or_default().push(row);
        }
        Self {
            name: name.to_string(),
            rows: index,
            duplicates_dropped: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn duplicates_dropped(&self) -> usize {
        self.duplicates_dropped
    }

    pub fn get(&self, key: &T::Key) -> &[T] {
        self.rows.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Left join `base` against `side`, emitting one row per match or one row
/// with `None` when the key is absent or unmatched.
pub fn left_join<'a, B, T, O>(
    base: &'a [B],
    side: &'a SideTable<T>,
    key_of: impl Fn(&B) -> Option<T::Key>,
    mut merge: impl FnMut(&'a B, Option<&'a T>) -> O,
) -> Result<Vec<O>, PipelineError>
where
    T: Keyed,
{
    let mut out = Vec::with_capacity(base.len());
    for row in base {
        let matches = key_of(row).map(|k| side.get(&k)).unwrap_or(&[]);
        if matches.is_empty() {
            out.push(merge(row, None));
        } else {
            for m in matches {
                out.push(merge(row, Some(m)));
            }
        }
    }

    if out.len() > base.len() {
        return Err(PipelineError::FanOut {
            table: side.name().to_string(),
            before: base.len(),
            after: out.len(),
        });
    }
    Ok(out)
}

fn from_advert(advert: &JobAdvert) -> EnrichedAdvert {
    EnrichedAdvert {
        id: advert.id,
        job_title_raw: advert.job_title_raw.clone(),
        created: advert.created,
        occupation: advert.occupation.clone(),
        profession: advert.profession.clone(),
        job_location_raw: advert.job_location_raw.clone(),
        min_annualised_salary: None,
        max_annualised_salary: None,
        itl_3_code: None,
        itl_3_name: None,
        itl_2_name: None,
        itl_1_code: None,
        qualification_level: None,
        region_code: None,
        region_name: None,
        nation: Nation::Unknown,
        ruc_code: None,
        ruc_name: None,
        broad_ruc: None,
    }
}

/// Attach nominal salary bounds.
pub fn join_salaries(
    rows: &[EnrichedAdvert],
    salaries: &SideTable<SalaryRecord>,
) -> Result<Vec<EnrichedAdvert>, PipelineError> {
    left_join(rows, salaries, |r| Some(r.id), |row, salary| EnrichedAdvert {
        min_annualised_salary: salary.and_then(|s| s.min_annualised_salary),
        max_annualised_salary: salary.and_then(|s| s.max_annualised_salary),
        ..row.clone()
    })
}

/// Attach location fields. The location table's `job_location_raw`
/// replaces the advert's, even when the location row has it empty.
pub fn join_locations(
    rows: &[EnrichedAdvert],
    locations: &SideTable<LocationRecord>,
) -> Result<Vec<EnrichedAdvert>, PipelineError> {
    left_join(rows, locations, |r| Some(r.id), |row, location| EnrichedAdvert {
        job_location_raw: location.and_then(|l| l.job_location_raw.clone()),
        itl_3_code: location.and_then(|l| l.itl_3_code.clone()),
        itl_3_name: location.and_then(|l| l.itl_3_name.clone()),
        itl_2_name: location.and_then(|l| l.itl_2_name.clone()),
        itl_1_code: location.and_then(|l| l.itl_1_code.clone()),
        ..row.clone()
    })
}

/// Salary then location join over raw adverts.
pub fn enrich_adverts(
    adverts: &[JobAdvert],
    salaries: &SideTable<SalaryRecord>,
    locations: &SideTable<LocationRecord>,
) -> Result<Vec<EnrichedAdvert>, PipelineError> {
    let base: Vec<EnrichedAdvert> = adverts.iter().map(from_advert).collect();
    let with_salary = join_salaries(&base, salaries)?;
    join_locations(&with_salary, locations)
}
