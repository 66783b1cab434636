//! Core data models used throughout the pipeline.
//!
//! Input records mirror the CSV tables handed to the pipeline. They are
//! read-only: every stage builds new records ([`EnrichedAdvert`],
//! [`CuratedAdvert`]) instead of mutating what it was given.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::tables::{lenient_date, lenient_f64, lenient_string};

/// Raw job advert as produced by upstream ingestion.
#[derive(Debug, Clone, Deserialize)]
pub struct JobAdvert {
    pub id: i64,
    #[serde(default)]
    pub job_title_raw: String,
    #[serde(default, deserialize_with = "lenient_date")]
    pub created: Option<NaiveDate>,
    /// Raw sector / occupation label from the job board.
    #[serde(default, deserialize_with = "lenient_string")]
    pub occupation: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub job_location_raw: Option<String>,
    /// Label assigned by the external profession classifier.
    #[serde(default, deserialize_with = "lenient_string")]
    pub profession: Option<String>,
}

/// Free-text description of one advert.
#[derive(Debug, Clone)]
pub struct JobDescription {
    pub id: i64,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SalaryRecord {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub min_annualised_salary: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub max_annualised_salary: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationRecord {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub job_location_raw: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub itl_3_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub itl_3_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub itl_2_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub itl_1_code: Option<String>,
}

/// One (advert, skill) association. Many rows per advert id.
#[derive(Debug, Clone, Deserialize)]
pub struct SkillRecord {
    pub id: i64,
    pub skill_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub skill_label: Option<String>,
}

/// Rural/urban reference row keyed by a NUTS3 code.
#[derive(Debug, Clone, Deserialize)]
pub struct RuralUrbanRecord {
    #[serde(rename = "NUTS315CD")]
    pub nuts_code: String,
    #[serde(rename = "NUTS315NM", default, deserialize_with = "lenient_string")]
    pub nuts_name: Option<String>,
    #[serde(rename = "RUC11CD", default, deserialize_with = "lenient_string")]
    pub ruc_code: Option<String>,
    #[serde(rename = "RUC11", default, deserialize_with = "lenient_string")]
    pub ruc_name: Option<String>,
    #[serde(rename = "Broad_RUC11", default, deserialize_with = "lenient_string")]
    pub broad_ruc: Option<String>,
}

/// Ordinal qualification level in 1..=7. Absence is always modelled as
/// `Option::None`, never as a zero level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct QualificationLevel(u8);

impl QualificationLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 7;

    pub fn new(level: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX)
            .contains(&level)
            .then_some(Self(level))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for QualificationLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| {
            format!(
                "qualification level {} outside {}..={}",
                value,
                Self::MIN,
                Self::MAX
            )
        })
    }
}

impl From<QualificationLevel> for u8 {
    fn from(level: QualificationLevel) -> u8 {
        level.0
    }
}

impl fmt::Display for QualificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// UK nation derived from an ITL1 code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Nation {
    England,
    Wales,
    Scotland,
    #[serde(rename = "Northern Ireland")]
    NorthernIreland,
    Unknown,
}

impl fmt::Display for Nation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Nation::England => "England",
            Nation::Wales => "Wales",
            Nation::Scotland => "Scotland",
            Nation::NorthernIreland => "Northern Ireland",
            Nation::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Advert after salary/location joins, qualification extraction and
/// geography classification.
#[derive(Debug, Clone)]
pub struct EnrichedAdvert {
    pub id: i64,
    pub job_title_raw: String,
    pub created: Option<NaiveDate>,
    pub occupation: Option<String>,
    pub profession: Option<String>,
    /// Taken from the location table; the advert's own copy is superseded.
    pub job_location_raw: Option<String>,
    pub min_annualised_salary: Option<f64>,
    pub max_annualised_salary: Option<f64>,
    pub itl_3_code: Option<String>,
    pub itl_3_name: Option<String>,
    pub itl_2_name: Option<String>,
    pub itl_1_code: Option<String>,
    pub qualification_level: Option<QualificationLevel>,
    pub region_code: Option<String>,
    pub region_name: Option<String>,
    pub nation: Nation,
    pub ruc_code: Option<String>,
    pub ruc_name: Option<String>,
    pub broad_ruc: Option<String>,
}

/// One row of the curated advert table handed to downstream reporting.
#[derive(Debug, Clone, Serialize)]
pub struct CuratedAdvert {
    pub id: i64,
    pub created: NaiveDate,
    pub year: i32,
    /// First day of the creation month, `YYYY-MM`.
    pub month_year: String,
    pub profession: String,
    pub nation: Nation,
    pub region_code: Option<String>,
    pub region_name: Option<String>,
    pub ruc_code: Option<String>,
    pub ruc_name: Option<String>,
    pub broad_ruc: Option<String>,
    pub job_title_raw: String,
    pub job_location_raw: Option<String>,
    pub min_annualised_salary: Option<f64>,
    pub max_annualised_salary: Option<f64>,
    pub inflation_adj_min_salary: Option<f64>,
    pub inflation_adj_max_salary: Option<f64>,
    pub qualification_level: Option<QualificationLevel>,
}

/// Skill association restricted to curated adverts, with labels propagated.
#[derive(Debug, Clone, Serialize)]
pub struct CuratedSkill {
    pub id: i64,
    pub skill_id: String,
    pub skill_label: Option<String>,
    pub profession: String,
    pub nation: Nation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_domain_is_one_to_seven() {
        assert!(QualificationLevel::new(0).is_none());
        assert_eq!(QualificationLevel::new(1).map(|l| l.get()), Some(1));
        assert_eq!(QualificationLevel::new(7).map(|l| l.get()), Some(7));
        assert!(QualificationLevel::new(8).is_none());
    }

    #[test]
    fn nation_display_matches_serialized_name() {
        assert_eq!(Nation::NorthernIreland.to_string(), "Northern Ireland");
        let json = serde_json::to_string(&Nation::NorthernIreland).unwrap();
        assert_eq!(json, "\"Northern Ireland\"");
    }
}
