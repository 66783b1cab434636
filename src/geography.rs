//! Geography reclassification.
//!
//! Reference data arrives keyed by 2015 NUTS3 codes (`UK...`) while adverts
//! carry ITL codes (`TL...`). Codes are rewritten to the ITL prefix and the
//! 21 Greater London NUTS3 areas collapse onto the single ITL1 London code,
//! so that low-volume London data is analysed as one region.
//!
//! After the collapse several reference rows share a code. The reference is
//! de-duplicated on the coarse code (first row wins) before it is ever used
//! as a join key; otherwise every London advert would be multiplied.

use crate::enrich::{left_join, DuplicateKeyPolicy, Keyed, SideTable};
use crate::error::PipelineError;
use crate::models::{EnrichedAdvert, Nation, RuralUrbanRecord};

pub const LONDON_NUTS3: [&str; 21] = [
    "UKI31", "UKI32", "UKI33", "UKI34", "UKI41", "UKI42", "UKI43", "UKI44", "UKI45", "UKI51",
    "UKI52", "UKI53", "UKI54", "UKI61", "UKI62", "UKI63", "UKI71", "UKI72", "UKI73", "UKI74",
    "UKI75",
];

/// Coarse code every London area collapses to.
pub const LONDON_CODE: &str = "TLI";
pub const LONDON_NAME: &str = "London";

const SOURCE_PREFIX: &str = "UK";
const TARGET_PREFIX: &str = "TL";

const ENGLAND_PREFIXES: [&str; 9] = ["TLC", "TLD", "TLE", "TLF", "TLG", "TLH", "TLI", "TLJ", "TLK"];

fn canonical(code: &str) -> Option<String> {
    let code = code.trim().to_ascii_uppercase();
    if code.is_empty() {
        return None;
    }
    Some(match code.strip_prefix(SOURCE_PREFIX) {
        Some(rest) => format!("{}{}", TARGET_PREFIX, rest),
        None => code,
    })
}

/// True for any Greater London NUTS3 code, in either prefix form.
pub fn is_london(code: &str) -> bool {
    let Some(code) = canonical(code) else {
        return false;
    };
    LONDON_NUTS3
        .iter()
        .any(|nuts| code == format!("{}{}", TARGET_PREFIX, &nuts[SOURCE_PREFIX.len()..]))
}

/// Rewrite a fine-grained code to its coarse analysis code. Blank input
/// yields `None`.
pub fn coarse_code(code: &str) -> Option<String> {
    if is_london(code) {
        return Some(LONDON_CODE.to_string());
    }
    canonical(code)
}

/// Nation of an ITL (or NUTS) code by prefix. Missing or unrecognised
/// codes are [`Nation::Unknown`].
pub fn nation_of(code: Option<&str>) -> Nation {
    let Some(code) = code.and_then(canonical) else {
        return Nation::Unknown;
    };
    if ENGLAND_PREFIXES.iter().any(|p| code.starts_with(p)) {
        Nation::England
    } else if code.starts_with("TLL") {
        Nation::Wales
    } else if code.starts_with("TLM") {
        Nation::Scotland
    } else if code.starts_with("TLN") {
        Nation::NorthernIreland
    } else {
        Nation::Unknown
    }
}

/// Reference classification for one coarse region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionClass {
    pub coarse_code: String,
    pub region_name: Option<String>,
    pub ruc_code: Option<String>,
    pub ruc_name: Option<String>,
    pub broad_ruc: Option<String>,
}

impl Keyed for RegionClass {
    type Key = String;
    fn key(&self) -> String {
        self.coarse_code.clone()
    }
}

/// Result of reclassifying a single code.
#[derive(Debug, Clone, PartialEq)]
pub struct Reclassified {
    pub coarse_code: String,
    pub region_name: Option<String>,
}

/// De-duplicated rural/urban reference keyed by coarse code.
#[derive(Debug, Clone)]
pub struct GeographyReference {
    table: SideTable<RegionClass>,
}

impl GeographyReference {
    pub fn build(rows: Vec<RuralUrbanRecord>) -> Result<Self, PipelineError> {
        if rows.is_empty() {
            return Err(PipelineError::MissingReference(
                "rural/urban geography lookup is empty".to_string(),
            ));
        }

        let classes: Vec<RegionClass> = rows
            .into_iter()
            .filter_map(|row| {
                let coarse = coarse_code(&row.nuts_code)?;
                let region_name = if coarse == LONDON_CODE {
                    Some(LONDON_NAME.to_string())
                } else {
                    row.nuts_name
                };
                Some(RegionClass {
                    coarse_code: coarse,
                    region_name,
                    ruc_code: row.ruc_code,
                    ruc_name: row.ruc_name,
                    broad_ruc: row.broad_ruc,
                })
            })
            .collect();

        let table = SideTable::unique("rural_urban", classes, DuplicateKeyPolicy::KeepFirst)?;
        Ok(Self { table })
    }

    /// Number of distinct coarse regions.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Rows dropped because their coarse code was already present.
    pub fn duplicates_dropped(&self) -> usize {
        self.table.duplicates_dropped()
    }

    pub fn class_of(&self, coarse: &str) -> Option<&RegionClass> {
        self.table.get(&coarse.to_string()).first()
    }

    pub fn reclassify(&self, code: &str) -> Option<Reclassified> {
        let coarse = coarse_code(code)?;
        let region_name = if coarse == LONDON_CODE {
            Some(LONDON_NAME.to_string())
        } else {
            self.class_of(&coarse).and_then(|c| c.region_name.clone())
        };
        Some(Reclassified {
            coarse_code: coarse,
            region_name,
        })
    }

    /// Attach coarse region, rural/urban fields and nation to each advert.
    pub fn classify_adverts(
        &self,
        adverts: &[EnrichedAdvert],
    ) -> Result<Vec<EnrichedAdvert>, PipelineError> {
        left_join(
            adverts,
            &self.table,
            |a| a.itl_3_code.as_deref().and_then(coarse_code),
            |advert, class| {
                let region_code = advert.itl_3_code.as_deref().and_then(coarse_code);
                let region_name = match (&region_code, class) {
                    (Some(code), _) if code == LONDON_CODE => Some(LONDON_NAME.to_string()),
                    (_, Some(c)) if c.region_name.is_some() => c.region_name.clone(),
                    _ => advert.itl_3_name.clone(),
                };
                let nation = match nation_of(advert.itl_1_code.as_deref()) {
                    Nation::Unknown => nation_of(region_code.as_deref()),
                    known => known,
                };
                EnrichedAdvert {
                    region_code,
                    region_name,
                    nation,
                    ruc_code: class.and_then(|c| c.ruc_code.clone()),
                    ruc_name: class.and_then(|c| c.ruc_name.clone()),
                    broad_ruc: class.and_then(|c| c.broad_ruc.clone()),
                    ..advert.clone()
                }
            },
        )
    }
}
