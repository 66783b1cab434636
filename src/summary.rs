//! Monthly summary tables and the end-of-run report.
//!
//! Curated adverts are grouped by month and by profession or qualification
//! level, with advert counts and median nominal salaries. Groups with no
//! rows never appear, and a group whose salaries are all absent gets an
//! absent median rather than zero.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{CuratedAdvert, QualificationLevel};
use crate::progress::format_number;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfessionMonthly {
    pub month_year: String,
    pub profession: String,
    pub count: u64,
    pub median_min_annualised_salary: Option<f64>,
    pub median_max_annualised_salary: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualificationMonthly {
    pub month_year: String,
    pub qualification_level: QualificationLevel,
    pub count: u64,
    pub median_min_annualised_salary: Option<f64>,
    pub median_max_annualised_salary: Option<f64>,
}

#[derive(Default)]
struct Group {
    count: u64,
    min: Vec<f64>,
    max: Vec<f64>,
}

/// Median of the present values; `None` for an empty set.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

fn group_monthly<K: Ord>(
    rows: &[CuratedAdvert],
    key_of: impl Fn(&CuratedAdvert) -> Option<K>,
) -> BTreeMap<(String, K), Group> {
    let mut groups: BTreeMap<(String, K), Group> = BTreeMap::new();
    for row in rows {
        let Some(key) = key_of(row) else { continue };
        let group = groups.entry((row.month_year.clone(), key)).or_default();
        group.count += 1;
        group.min.extend(row.min_annualised_salary);
        group.max.extend(row.max_annualised_salary);
    }
    groups
}

pub fn profession_monthly(rows: &[CuratedAdvert]) -> Vec<ProfessionMonthly> {
    group_monthly(rows, |r| Some(r.profession.clone()))
        .into_iter()
        .map(|((month_year, profession), mut g)| ProfessionMonthly {
            month_year,
            profession,
            count: g.count,
            median_min_annualised_salary: median(&mut g.min),
            median_max_annualised_salary: median(&mut g.max),
        })
        .collect()
}

/// Adverts with no qualification level are left out.
pub fn qualification_monthly(rows: &[CuratedAdvert]) -> Vec<QualificationMonthly> {
    group_monthly(rows, |r| r.qualification_level)
        .into_iter()
        .map(|((month_year, qualification_level), mut g)| QualificationMonthly {
            month_year,
            qualification_level,
            count: g.count,
            median_min_annualised_salary: median(&mut g.min),
            median_max_annualised_salary: median(&mut g.max),
        })
        .collect()
}

/// Counts gathered over one run, printed to stdout at the end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub adverts_loaded: usize,
    pub descriptions_loaded: usize,
    pub cohort_adverts: usize,
    pub distinct_descriptions: usize,
    pub chunks: usize,
    pub descriptions_matched: usize,
    pub reference_duplicates_dropped: usize,
    pub side_duplicates_dropped: usize,
    pub curated_adverts: usize,
    pub curated_skills: usize,
    pub table_version: String,
    pub sample: bool,
}

impl RunSummary {
    pub fn print(&self) {
        println!("eyla run summary");
        println!("================");
        println!();
        println!("  Qualification table:   {}", self.table_version);
        if self.sample {
            println!("  Mode:                  sample");
        }
        println!("  Adverts loaded:        {}", format_number(self.adverts_loaded as u64));
        println!("  Descriptions loaded:   {}", format_number(self.descriptions_loaded as u64));
        println!("  Cohort adverts:        {}", format_number(self.cohort_adverts as u64));
        println!(
            "  Distinct texts:        {} in {} chunks",
            format_number(self.distinct_descriptions as u64),
            format_number(self.chunks as u64)
        );
        println!(
            "  With qualification:    {} ({}%)",
            format_number(self.descriptions_matched as u64),
            if self.distinct_descriptions > 0 {
                (self.descriptions_matched * 100) / self.distinct_descriptions
            } else {
                0
            }
        );
        if self.reference_duplicates_dropped + self.side_duplicates_dropped > 0 {
            println!(
                "  Duplicate keys dropped: {} reference, {} side table",
                self.reference_duplicates_dropped, self.side_duplicates_dropped
            );
        }
        println!("  Curated adverts:       {}", format_number(self.curated_adverts as u64));
        println!("  Curated skills:        {}", format_number(self.curated_skills as u64));
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Nation;
    use chrono::NaiveDate;

    fn advert(id: i64, month: u32, profession: &str, level: Option<u8>, min: Option<f64>) -> CuratedAdvert {
        let created = NaiveDate::from_ymd_opt(2022, month, 15).unwrap();
        CuratedAdvert {
            id,
            created,
            year: 2022,
            month_year: created.format("%Y-%m").to_string(),
            profession: profession.to_string(),
            nation: Nation::England,
            region_code: None,
            region_name: None,
            ruc_code: None,
            ruc_name: None,
            broad_ruc: None,
            job_title_raw: "t".to_string(),
            job_location_raw: None,
            min_annualised_salary: min,
            max_annualised_salary: None,
            inflation_adj_min_salary: None,
            inflation_adj_max_salary: None,
            qualification_level: level.and_then(QualificationLevel::new),
        }
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&mut []), None);
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&mut [4.0, 1.0, 2.0, 3.0]), Some(2.5));
    }

    #[test]
    fn test_profession_monthly() {
        let rows = vec![
            advert(1, 5, "Waiter", None, Some(18000.0)),
            advert(2, 5, "Waiter", None, Some(20000.0)),
            advert(3, 5, "Waiter", None, None),
            advert(4, 6, "Waiter", None, None),
            advert(5, 5, "Early Years Practitioner", Some(3), Some(21000.0)),
        ];
        let out = profession_monthly(&rows);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].profession, "Early Years Practitioner");
        assert_eq!(out[1].month_year, "2022-05");
        assert_eq!(out[1].count, 3);
        assert_eq!(out[1].median_min_annualised_salary, Some(19000.0));
        assert_eq!(out[1].median_max_annualised_salary, None);
        assert_eq!(out[2].count, 1);
        assert_eq!(out[2].median_min_annualised_salary, None);
    }

    #[test]
    fn test_qualification_monthly_skips_absent_levels() {
        let rows = vec![
            advert(1, 5, "Early Years Practitioner", Some(3), Some(21000.0)),
            advert(2, 5, "Early Years Practitioner", None, Some(19000.0)),
            advert(3, 5, "Early Years Practitioner", Some(2), None),
        ];
        let out = qualification_monthly(&rows);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].qualification_level.get(), 2);
        assert_eq!(out[1].median_min_annualised_salary, Some(21000.0));
        assert!(qualification_monthly(&[]).is_empty());
    }
}
