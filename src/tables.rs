//! CSV table I/O.
//!
//! Input cells are read leniently: blank or non-parseable values become
//! `None` rather than failing the whole table, because upstream extracts are
//! noisy. A row whose key column cannot be read is still a hard error.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

use crate::models::JobDescription;

/// Cell values treated as missing.
const MISSING: [&str; 6] = ["", "na", "nan", "n/a", "null", "none"];

fn present(raw: Option<String>) -> Option<String> {
    let raw = raw?;
    let trimmed = raw.trim();
    if MISSING.contains(&trimmed.to_ascii_lowercase().as_str()) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(present(Option::<String>::deserialize(deserializer)?))
}

pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = present(Option::<String>::deserialize(deserializer)?);
    Ok(value
        .and_then(|v| v.replace(',', "").parse::<f64>().ok())
        .filter(|v| v.is_finite()))
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time, or `DD/MM/YYYY`.
pub fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(present(Option::<String>::deserialize(deserializer)?).and_then(|v| parse_date(&v)))
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let head = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(head, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(head, "%d/%m/%Y"))
        .ok()
}

fn reader(path: &Path, name: &str) -> Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_path(path)
        .with_context(|| format!("Failed to open {} table: {}", name, path.display()))
}

/// Read every row of a CSV table into `T`.
pub fn read_table<T: DeserializeOwned>(path: &Path, name: &str) -> Result<Vec<T>> {
    let mut rdr = reader(path, name)?;
    let mut rows = Vec::new();
    for (i, record) in rdr.deserialize().enumerate() {
        // +2: one for the header, one for 1-based line numbers
        let row: T = record.with_context(|| format!("{} table: bad row at line {}", name, i + 2))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Read descriptions, replacing invalid UTF-8 instead of failing.
pub fn read_descriptions(path: &Path) -> Result<Vec<JobDescription>> {
    let mut rdr = reader(path, "descriptions")?;
    let headers = rdr.byte_headers()?.clone();
    let column = |want: &str| {
        headers
            .iter()
            .position(|h| String::from_utf8_lossy(h).trim() == want)
            .with_context(|| format!("descriptions table has no '{}' column", want))
    };
    let id_col = column("id")?;
    let text_col = column("description")?;

    let mut out = Vec::new();
    for (i, record) in rdr.byte_records().enumerate() {
        let record = record.with_context(|| format!("descriptions table: bad row at line {}", i + 2))?;
        let id_raw = record.get(id_col).map(String::from_utf8_lossy).unwrap_or_default();
        let id: i64 = id_raw.trim().parse().with_context(|| {
            format!("descriptions table: bad id '{}' at line {}", id_raw, i + 2)
        })?;
        let description = record
            .get(text_col)
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default();
        out.push(JobDescription { id, description });
    }
    Ok(out)
}

/// Write rows as CSV with a header derived from `T`'s field names.
pub fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in rows {
        wtr.serialize(row)
            .with_context(|| format!("Failed to write row to {}", path.display()))?;
    }
    wtr.flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobAdvert, RuralUrbanRecord, SalaryRecord};
    use tempfile::TempDir;

    fn file(dir: &TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_adverts_lenient_cells() {
        let tmp = TempDir::new().unwrap();
        let path = file(
            &tmp,
            "adverts.csv",
            b"id,job_title_raw,created,occupation,job_location_raw,profession\n\
              1,Nursery Nurse,2021-05-03 10:00:00,Childcare,Leeds,Early Years Practitioner\n\
              2,Teacher,not a date,,NA,\n",
        );
        let adverts: Vec<JobAdvert> = read_table(&path, "adverts").unwrap();
        assert_eq!(adverts.len(), 2);
        assert_eq!(adverts[0].created, NaiveDate::from_ymd_opt(2021, 5, 3));
        assert_eq!(adverts[1].created, None);
        assert_eq!(adverts[1].occupation, None);
        assert_eq!(adverts[1].job_location_raw, None);
        assert_eq!(adverts[1].profession, None);
    }

    #[test]
    fn test_bad_salary_is_absent() {
        let tmp = TempDir::new().unwrap();
        let path = file(
            &tmp,
            "salaries.csv",
            b"id,min_annualised_salary,max_annualised_salary\n1,abc,\"21,000\"\n2,,NaN\n",
        );
        let rows: Vec<SalaryRecord> = read_table(&path, "salaries").unwrap();
        assert_eq!(rows[0].min_annualised_salary, None);
        assert_eq!(rows[0].max_annualised_salary, Some(21000.0));
        assert_eq!(rows[1].min_annualised_salary, None);
        assert_eq!(rows[1].max_annualised_salary, None);
    }

    #[test]
    fn test_bad_id_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = file(&tmp, "salaries.csv", b"id,min_annualised_salary\nx,1\n");
        assert!(read_table::<SalaryRecord>(&path, "salaries").is_err());
    }

    #[test]
    fn test_reference_headers() {
        let tmp = TempDir::new().unwrap();
        let path = file(
            &tmp,
            "ruc.csv",
            b"NUTS315CD,NUTS315NM,RUC11CD,RUC11,Broad_RUC11\nUKC11,Hartlepool,UN1,Urban,Predominantly Urban\n",
        );
        let rows: Vec<RuralUrbanRecord> = read_table(&path, "rural_urban").unwrap();
        assert_eq!(rows[0].nuts_code, "UKC11");
        assert_eq!(rows[0].broad_ruc.as_deref(), Some("Predominantly Urban"));
    }

    #[test]
    fn test_descriptions_invalid_utf8_is_replaced() {
        let tmp = TempDir::new().unwrap();
        let mut content = b"id,description\n1,\"Level 3 \xff required\"\n".to_vec();
        content.extend_from_slice(b"2,QTS\n");
        let path = file(&tmp, "descriptions.csv", &content);
        let rows = read_descriptions(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].description.starts_with("Level 3 "));
        assert!(rows[0].description.contains('\u{FFFD}'));
        assert_eq!(rows[1].description, "QTS");
    }

    #[test]
    fn test_write_table() {
        #[derive(Serialize)]
        struct Row {
            a: i32,
            b: Option<String>,
        }
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.csv");
        write_table(&path, &[Row { a: 1, b: None }, Row { a: 2, b: Some("x".into()) }]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\n1,\n2,x\n");
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2021-04-01"), NaiveDate::from_ymd_opt(2021, 4, 1));
        assert_eq!(parse_date("01/04/2021"), NaiveDate::from_ymd_opt(2021, 4, 1));
        assert_eq!(parse_date("2021-04-01T09:30:00Z"), NaiveDate::from_ymd_opt(2021, 4, 1));
        assert_eq!(parse_date("soon"), None);
    }
}
