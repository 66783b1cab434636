//! Rule-based qualification level extraction.
//!
//! A [`QualificationTable`] is the versioned configuration artifact that
//! says which surface forms count as qualifications and what level each one
//! implies. [`QualificationMatcher`] compiles a table once into a single
//! regex and is then shared read-only (it is `Send + Sync`) by every
//! worker scoring description chunks.
//!
//! Two kinds of pattern exist:
//!
//! * **numbered** keywords (`level`, `nvq`, `cache`, ...) whose level is
//!   read from the digits that follow, e.g. `nvq level 2 or 3`. Further
//!   numbers only count when joined by `or`, `and`, `to` or `/`, so
//!   `level 3, 2 days a week` reads as level 3;
//! * **fixed** tokens (`qts`, `pgce`, `foundation degree`, ...) whose level
//!   comes from the table. Bare `foundation` is not in the built-in table
//!   and, when configured, never matches `foundation stage` (EYFS).
//!
//! The extracted level is the minimum over every match in the text, since
//! adverts usually state the lowest accepted entry bar as a range.

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::models::QualificationLevel;
use crate::normalize::normalize;

/// Version tag of the built-in table.
pub const DEFAULT_TABLE_VERSION: &str = "2023-06";

/// Keywords followed by a literal level number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelKeyword {
    Level,
    Levels,
    L,
    Nvq,
    Cache,
}

impl LevelKeyword {
    pub const ALL: [LevelKeyword; 5] = [
        LevelKeyword::Level,
        LevelKeyword::Levels,
        LevelKeyword::L,
        LevelKeyword::Nvq,
        LevelKeyword::Cache,
    ];

    pub fn word(self) -> &'static str {
        match self {
            LevelKeyword::Level => "level",
            LevelKeyword::Levels => "levels",
            LevelKeyword::L => "l",
            LevelKeyword::Nvq => "nvq",
            LevelKeyword::Cache => "cache",
        }
    }
}

/// Named qualifications that map to a fixed level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QualificationToken {
    Qts,
    Qtse,
    Eyts,
    Eyps,
    QualifiedTeacherStatus,
    EarlyYearsTeacherStatus,
    EarlyYearsProfessionalStatus,
    Ba,
    Cert,
    Pgce,
    Degree,
    Foundation,
    FoundationDegree,
    Qtls,
    Eye,
    Nneb,
}

impl QualificationToken {
    pub const ALL: [QualificationToken; 16] = [
        QualificationToken::Qts,
        QualificationToken::Qtse,
        QualificationToken::Eyts,
        QualificationToken::Eyps,
        QualificationToken::QualifiedTeacherStatus,
        QualificationToken::EarlyYearsTeacherStatus,
        QualificationToken::EarlyYearsProfessionalStatus,
        QualificationToken::Ba,
        QualificationToken::Cert,
        QualificationToken::Pgce,
        QualificationToken::Degree,
        QualificationToken::Foundation,
        QualificationToken::FoundationDegree,
        QualificationToken::Qtls,
        QualificationToken::Eye,
        QualificationToken::Nneb,
    ];

    /// Configuration key for this token (`[qualifications.levels]`).
    pub fn name(self) -> &'static str {
        match self {
            QualificationToken::Qts => "qts",
            QualificationToken::Qtse => "qtse",
            QualificationToken::Eyts => "eyts",
            QualificationToken::Eyps => "eyps",
            QualificationToken::QualifiedTeacherStatus => "qualified_teacher_status",
            QualificationToken::EarlyYearsTeacherStatus => "early_years_teacher_status",
            QualificationToken::EarlyYearsProfessionalStatus => {
                "early_years_professional_status"
            }
            QualificationToken::Ba => "ba",
            QualificationToken::Cert => "cert",
            QualificationToken::Pgce => "pgce",
            QualificationToken::Degree => "degree",
            QualificationToken::Foundation => "foundation",
            QualificationToken::FoundationDegree => "foundation_degree",
            QualificationToken::Qtls => "qtls",
            QualificationToken::Eye => "eye",
            QualificationToken::Nneb => "nneb",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Words that, directly after a phrase, mean it is not this token.
    fn excluded_followers(self) -> &'static [&'static str] {
        match self {
            QualificationToken::Foundation => &["stage"],
            _ => &[],
        }
    }

    /// Normalized surface phrases recognised for this token.
    pub fn phrases(self) -> &'static [&'static str] {
        match self {
            QualificationToken::Qts => &["qts"],
            QualificationToken::Qtse => &["qtse"],
            QualificationToken::Eyts => &["eyts"],
            QualificationToken::Eyps => &["eyps"],
            QualificationToken::QualifiedTeacherStatus => {
                &["qualified teacher status", "qualified teachers status"]
            }
            QualificationToken::EarlyYearsTeacherStatus => &["early years teacher status"],
            QualificationToken::EarlyYearsProfessionalStatus => {
                &["early years professional status"]
            }
            QualificationToken::Ba => &["ba"],
            QualificationToken::Cert => &["cert"],
            QualificationToken::Pgce => &["pgce"],
            QualificationToken::Degree => &["degree"],
            QualificationToken::Foundation => &["foundation"],
            QualificationToken::FoundationDegree => &["foundation degree"],
            QualificationToken::Qtls => &["qtls"],
            QualificationToken::Eye => &["eye"],
            QualificationToken::Nneb => &["nneb"],
        }
    }
}

/// Versioned pattern → level mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct QualificationTable {
    pub version: String,
    pub numbered: Vec<LevelKeyword>,
    pub levels: BTreeMap<QualificationToken, QualificationLevel>,
}

impl Default for QualificationTable {
    fn default() -> Self {
        let levels = [
            (QualificationToken::Qts, 6),
            (QualificationToken::Qtse, 6),
            (QualificationToken::Eyts, 6),
            (QualificationToken::Eyps, 6),
            (QualificationToken::QualifiedTeacherStatus, 6),
            (QualificationToken::EarlyYearsTeacherStatus, 6),
            (QualificationToken::EarlyYearsProfessionalStatus, 6),
            (QualificationToken::Ba, 6),
            (QualificationToken::Cert, 4),
            (QualificationToken::Pgce, 7),
            (QualificationToken::Degree, 6),
            (QualificationToken::FoundationDegree, 5),
            (QualificationToken::Qtls, 5),
            (QualificationToken::Eye, 3),
            (QualificationToken::Nneb, 3),
        ]
        .into_iter()
        .filter_map(|(token, level)| QualificationLevel::new(level).map(|l| (token, l)))
        .collect();

        Self {
            version: DEFAULT_TABLE_VERSION.to_string(),
            numbered: LevelKeyword::ALL.to_vec(),
            levels,
        }
    }
}

impl QualificationTable {
    /// Stable text form of the whole table: version, numbered keywords and
    /// every token level. Two tables that score differently never share a
    /// fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut numbered: Vec<&str> = self.numbered.iter().map(|k| k.word()).collect();
        numbered.sort_unstable();
        numbered.dedup();
        let levels: Vec<String> = self
            .levels
            .iter()
            .map(|(token, level)| format!("{}={}", token.name(), level.get()))
            .collect();
        format!(
            "{}\n{}\n{}",
            self.version,
            numbered.join(","),
            levels.join(",")
        )
    }

    /// Build a table from configuration values, rejecting unknown token
    /// names and levels outside the valid domain.
    pub fn new(
        version: &str,
        numbered: &[LevelKeyword],
        levels: &BTreeMap<String, u8>,
    ) -> Result<Self> {
        if version.trim().is_empty() {
            bail!("qualifications.version must not be empty");
        }

        let mut mapped = BTreeMap::new();
        for (name, level) in levels {
            let token = QualificationToken::from_name(name).with_context(|| {
                format!("Unknown qualification token in qualifications.levels: '{}'", name)
            })?;
            let level = QualificationLevel::new(*level).with_context(|| {
                format!(
                    "qualifications.levels.{} = {} is outside {}..={}",
                    name,
                    level,
                    QualificationLevel::MIN,
                    QualificationLevel::MAX
                )
            })?;
            mapped.insert(token, level);
        }

        let mut numbered = numbered.to_vec();
        numbered.sort();
        numbered.dedup();

        Ok(Self {
            version: version.to_string(),
            numbered,
            levels: mapped,
        })
    }
}

/// One recognised qualification mention.
#[derive(Debug, Clone, PartialEq)]
pub struct QualificationMatch {
    pub span: String,
    pub levels: Vec<QualificationLevel>,
}

/// Compiled, immutable matcher for one [`QualificationTable`].
#[derive(Debug)]
pub struct QualificationMatcher {
    table: QualificationTable,
    fingerprint: String,
    regex: Option<Regex>,
    phrase_levels: HashMap<&'static str, (QualificationToken, QualificationLevel)>,
}

impl QualificationMatcher {
    pub fn new(table: QualificationTable) -> Result<Self> {
        let mut keywords: Vec<&'static str> = table.numbered.iter().map(|k| k.word()).collect();
        keywords.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));

        let mut phrase_levels = HashMap::new();
        for (token, level) in &table.levels {
            for phrase in token.phrases() {
                phrase_levels.insert(*phrase, (*token, *level));
            }
        }
        let mut phrases: Vec<&'static str> = phrase_levels.keys().copied().collect();
        // Longest first so "foundation degree" wins over "foundation".
        phrases.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));

        let mut alternatives = Vec::new();
        if !keywords.is_empty() {
            alternatives.push(format!(
                r"(?P<kw>{})(?P<nums> [0-9]+(?: (?:or|and|to|/) [0-9]+)*)",
                keywords.join("|")
            ));
        }
        if !phrases.is_empty() {
            let escaped: Vec<String> = phrases.iter().map(|p| regex::escape(p)).collect();
            alternatives.push(format!("(?P<phrase>{})", escaped.join("|")));
        }

        let regex = if alternatives.is_empty() {
            None
        } else {
            let pattern = format!(r"\b(?:{})\b", alternatives.join("|"));
            Some(Regex::new(&pattern).with_context(|| {
                format!("Failed to compile qualification table {}", table.version)
            })?)
        };

        Ok(Self {
            fingerprint: table.fingerprint(),
            table,
            regex,
            phrase_levels,
        })
    }

    pub fn table(&self) -> &QualificationTable {
        &self.table
    }

    pub fn version(&self) -> &str {
        &self.table.version
    }

    /// See [`QualificationTable::fingerprint`].
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// All non-overlapping matches in already-normalized text.
    pub fn matches(&self, normalized: &str) -> Vec<QualificationMatch> {
        let Some(regex) = &self.regex else {
            return Vec::new();
        };

        regex
            .captures_iter(normalized)
            .filter_map(|caps| {
                let span = caps.get(0)?.as_str().to_string();
                let levels: Vec<QualificationLevel> = if let Some(nums) = caps.name("nums") {
                    nums.as_str()
                        .split(' ')
                        .filter_map(|part| part.parse::<u8>().ok())
                        .filter_map(QualificationLevel::new)
                        .collect()
                } else {
                    let phrase = caps.name("phrase")?;
                    let (token, level) = self.phrase_levels.get(phrase.as_str()).copied()?;
                    let next = normalized[phrase.end()..].split(' ').nth(1);
                    if next.is_some_and(|word| token.excluded_followers().contains(&word)) {
                        return None;
                    }
                    vec![level]
                };
                Some(QualificationMatch { span, levels })
            })
            .collect()
    }

    /// Minimum level asserted by normalized text, or `None` if nothing matched.
    pub fn level_of(&self, normalized: &str) -> Option<QualificationLevel> {
        self.matches(normalized)
            .into_iter()
            .flat_map(|m| m.levels)
            .min()
    }

    /// Normalize raw description text and extract its level.
    pub fn extract(&self, raw: &str) -> Option<QualificationLevel> {
        self.level_of(&normalize(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> QualificationMatcher {
        QualificationMatcher::new(QualificationTable::default()).unwrap()
    }

    fn level(raw: &str) -> Option<u8> {
        matcher().extract(raw).map(|l| l.get())
    }

    #[test]
    fn test_reference_scenario() {
        let texts = [
            "requires NVQ 3",
            "must hold a degree",
            "no quals needed",
            "NVQ Level 2 or NVQ Level 3",
        ];
        let levels: Vec<Option<u8>> = texts.iter().map(|t| level(t)).collect();
        assert_eq!(levels, vec![Some(3), Some(6), None, Some(2)]);
    }

    #[test]
    fn test_minimum_of_all_matches() {
        assert_eq!(level("Level 6 preferred, Level 2 accepted"), Some(2));
        assert_eq!(level("Level 2 and Level 6"), Some(2));
        assert_eq!(level("cache level 3 or 4"), Some(3));
        assert_eq!(level("levels 2/3"), Some(2));
    }

    #[test]
    fn test_absent_is_not_zero() {
        assert_eq!(level(""), None);
        assert_eq!(level("level 0 clearance"), None);
        assert_eq!(level("great team, level playing field"), None);
    }

    #[test]
    fn test_out_of_domain_numbers_dropped() {
        assert_eq!(level("level 12 of the car park"), None);
        assert_eq!(level("level 12 or level 3"), Some(3));
    }

    #[test]
    fn test_numbers_across_punctuation_are_not_levels() {
        assert_eq!(level("NVQ Level 3, 2 days per week"), Some(3));
        assert_eq!(level("Level 3. 1 year experience required"), Some(3));
        assert_eq!(level("Level 3; 2 references needed"), Some(3));
        assert_eq!(level("Level 3 (1 year contract)"), Some(3));
        assert_eq!(level("level 2 to 3"), Some(2));
        assert_eq!(level("nvq3/2"), Some(2));
    }

    #[test]
    fn test_eyfs_is_not_a_qualification() {
        assert_eq!(level("Knowledge of the Early Years Foundation Stage"), None);
        assert_eq!(level("Deliver the EYFS (Foundation Stage) curriculum"), None);
        assert_eq!(level("Foundation Degree in Early Years"), Some(5));

        // A configured bare "foundation" still skips the stage.
        let mut levels = BTreeMap::new();
        levels.insert("foundation".to_string(), 5u8);
        let table = QualificationTable::new("custom", &[], &levels).unwrap();
        let m = QualificationMatcher::new(table).unwrap();
        assert_eq!(m.extract("Early Years Foundation Stage"), None);
        assert_eq!(m.extract("Foundation qualification welcome").map(|l| l.get()), Some(5));
    }

    #[test]
    fn test_fingerprint_covers_levels() {
        let default = QualificationTable::default();
        let mut levels: BTreeMap<String, u8> = default
            .levels
            .iter()
            .map(|(token, level)| (token.name().to_string(), level.get()))
            .collect();
        let rebuilt = QualificationTable::new(&default.version, &LevelKeyword::ALL, &levels).unwrap();
        assert_eq!(rebuilt.fingerprint(), default.fingerprint());

        levels.insert("pgce".to_string(), 6);
        let changed = QualificationTable::new(&default.version, &LevelKeyword::ALL, &levels).unwrap();
        assert_eq!(changed.version, default.version);
        assert_ne!(changed.fingerprint(), default.fingerprint());

        let fewer = QualificationTable::new(&default.version, &[LevelKeyword::Nvq], &BTreeMap::new()).unwrap();
        assert_ne!(fewer.fingerprint(), default.fingerprint());
    }

    #[test]
    fn test_longest_phrase_wins() {
        assert_eq!(level("foundation degree in early years"), Some(5));
        assert_eq!(level("Qualified Teachers Status (QTS)"), Some(6));
    }

    #[test]
    fn test_shorthand() {
        assert_eq!(level("Looking for an L3 practitioner"), Some(3));
    }

    #[test]
    fn test_idempotent() {
        let m = matcher();
        let text = "Room leader, NVQ level 3 / PGCE welcome";
        assert_eq!(m.extract(text), m.extract(text));
    }

    #[test]
    fn test_pgce_level_is_table_driven() {
        let mut levels = BTreeMap::new();
        levels.insert("pgce".to_string(), 6u8);
        let older = QualificationTable::new("2023-03", &[], &levels).unwrap();
        let older = QualificationMatcher::new(older).unwrap();
        assert_eq!(older.extract("PGCE required").map(|l| l.get()), Some(6));
        assert_eq!(level("PGCE required"), Some(7));
        // Keywords not listed in the table are not matched.
        assert_eq!(older.extract("level 3"), None);
    }

    #[test]
    fn test_table_rejects_bad_entries() {
        let mut levels = BTreeMap::new();
        levels.insert("phd".to_string(), 8u8);
        assert!(QualificationTable::new("x", &[], &levels).is_err());

        let mut levels = BTreeMap::new();
        levels.insert("pgce".to_string(), 9u8);
        assert!(QualificationTable::new("x", &[], &levels).is_err());

        assert!(QualificationTable::new(" ", &[], &BTreeMap::new()).is_err());
    }

    #[test]
    fn test_empty_table_matches_nothing() {
        let table = QualificationTable::new("empty", &[], &BTreeMap::new()).unwrap();
        let m = QualificationMatcher::new(table).unwrap();
        assert_eq!(m.extract("level 3 qts"), None);
    }

    #[test]
    fn test_token_names_round_trip() {
        for token in QualificationToken::ALL {
            assert_eq!(QualificationToken::from_name(token.name()), Some(token));
        }
    }
}
