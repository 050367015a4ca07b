//! Typed PLO tags and K/S/E/C indicator codes
//!
//! Form fields carrying comma-separated codes are parsed into validated sets at
//! the request boundary. Malformed tokens are rejected with
//! [`Error::InvalidInput`]; the stored text is always the normalized rendering
//! of the set, e.g. `"GE(K)1, CE(K)2"` or `"PLO1, PLO3"`.

use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

static PLO_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^PLO(\d+)$").expect("static regex")
});

static PLO_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(PLO\d+)").expect("static regex")
});

static KSEC_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(GE|CE)\(([KSEC])\)(\d+)$").expect("static regex")
});

/// Indicator type: Knowledge, Skills, Ethics, Character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KsecType {
    Knowledge,
    Skills,
    Ethics,
    Character,
}

impl KsecType {
    pub const ALL: [KsecType; 4] = [
        KsecType::Knowledge,
        KsecType::Skills,
        KsecType::Ethics,
        KsecType::Character,
    ];

    /// Single-letter form stored in the database ("K", "S", "E", "C")
    pub fn letter(self) -> &'static str {
        match self {
            KsecType::Knowledge => "K",
            KsecType::Skills => "S",
            KsecType::Ethics => "E",
            KsecType::Character => "C",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            KsecType::Knowledge => "Knowledge",
            KsecType::Skills => "Skills",
            KsecType::Ethics => "Ethics",
            KsecType::Character => "Character",
        }
    }

    pub fn from_letter(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "K" => Some(KsecType::Knowledge),
            "S" => Some(KsecType::Skills),
            "E" => Some(KsecType::Ethics),
            "C" => Some(KsecType::Character),
            _ => None,
        }
    }
}

impl fmt::Display for KsecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

/// Catalogue grouping of an indicator: general education or core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KsecCategory {
    General,
    Core,
}

impl KsecCategory {
    pub const ALL: [KsecCategory; 2] = [KsecCategory::General, KsecCategory::Core];

    pub fn as_str(self) -> &'static str {
        match self {
            KsecCategory::General => "GE",
            KsecCategory::Core => "CE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GE" => Some(KsecCategory::General),
            "CE" => Some(KsecCategory::Core),
            _ => None,
        }
    }
}

impl fmt::Display for KsecCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single indicator code such as `GE(K)1`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KsecCode {
    pub category: KsecCategory,
    pub ksec_type: KsecType,
    /// 1-based position within the category
    pub number: u32,
}

impl KsecCode {
    pub fn new(category: KsecCategory, ksec_type: KsecType, number: u32) -> Self {
        Self {
            category,
            ksec_type,
            number,
        }
    }
}

impl fmt::Display for KsecCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}){}", self.category, self.ksec_type, self.number)
    }
}

impl FromStr for KsecCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let compact: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase();

        let caps = KSEC_CODE_RE
            .captures(&compact)
            .ok_or_else(|| Error::invalid(format!("Malformed K/S/E/C code '{}'", s.trim())))?;

        let category = KsecCategory::parse(&caps[1])
            .ok_or_else(|| Error::invalid(format!("Unknown category in '{}'", s.trim())))?;
        let ksec_type = KsecType::from_letter(&caps[2])
            .ok_or_else(|| Error::invalid(format!("Unknown type in '{}'", s.trim())))?;
        let number: u32 = caps[3]
            .parse()
            .map_err(|_| Error::invalid(format!("Bad number in '{}'", s.trim())))?;
        if number == 0 {
            return Err(Error::invalid(format!("Code numbers start at 1: '{}'", s.trim())));
        }

        Ok(KsecCode::new(category, ksec_type, number))
    }
}

/// Ordered, duplicate-free set of codes of one indicator type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KsecCodeSet {
    codes: Vec<KsecCode>,
}

impl KsecCodeSet {
    /// Parse comma-separated codes, all of which must be of `ksec_type`
    pub fn parse(ksec_type: KsecType, text: &str) -> Result<Self> {
        let mut set = Self::default();
        for token in text.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let code: KsecCode = token.parse()?;
            if code.ksec_type != ksec_type {
                return Err(Error::invalid(format!(
                    "Code '{}' is not a {} code",
                    code,
                    ksec_type.name()
                )));
            }
            set.insert(code);
        }
        Ok(set)
    }

    /// Parse stored text, dropping tokens that do not parse
    pub fn parse_lenient(ksec_type: KsecType, text: &str) -> Self {
        let mut set = Self::default();
        for token in text.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match token.parse::<KsecCode>() {
                Ok(code) if code.ksec_type == ksec_type => set.insert(code),
                _ => debug!("Ignoring stored {} token '{}'", ksec_type.letter(), token),
            }
        }
        set
    }

    pub fn insert(&mut self, code: KsecCode) {
        if !self.codes.contains(&code) {
            self.codes.push(code);
        }
    }

    pub fn contains(&self, code: &KsecCode) -> bool {
        self.codes.contains(code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &KsecCode> {
        self.codes.iter()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl fmt::Display for KsecCodeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .codes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        f.write_str(&joined)
    }
}

/// A Program Learning Outcome tag such as `PLO3`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PloTag(String);

impl PloTag {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PloTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PloTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_end_matches(':').trim();
        let caps = PLO_TAG_RE
            .captures(trimmed)
            .ok_or_else(|| Error::invalid(format!("Malformed PLO tag '{}'", s.trim())))?;
        Ok(PloTag(format!("PLO{}", &caps[1])))
    }
}

/// Set of PLO tags carried by a course
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PloTagSet {
    tags: Vec<PloTag>,
}

impl PloTagSet {
    /// Parse tags separated by commas, semicolons or whitespace
    pub fn parse(text: &str) -> Result<Self> {
        let mut set = Self::default();
        for token in split_plo_tokens(text) {
            set.insert(token.parse()?);
        }
        Ok(set)
    }

    /// Parse stored text, dropping tokens that do not parse
    pub fn parse_lenient(text: &str) -> Self {
        let mut set = Self::default();
        for token in split_plo_tokens(text) {
            match token.parse::<PloTag>() {
                Ok(tag) => set.insert(tag),
                Err(_) => debug!("Ignoring stored PLO token '{}'", token),
            }
        }
        set
    }

    pub fn insert(&mut self, tag: PloTag) {
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }

    /// Exact tag membership; `PLO1` never matches `PLO10`
    pub fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.0.eq_ignore_ascii_case(tag))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PloTag> {
        self.tags.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl fmt::Display for PloTagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .tags
            .iter()
            .map(PloTag::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        f.write_str(&joined)
    }
}

fn split_plo_tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .map(str::trim)
        .filter(|t| !t.is_empty() && *t != ":")
}

/// Extract the join tag from a PLO credit-row label
///
/// `"PLO1: Apply knowledge"` yields `"PLO1"`. A label without a leading
/// `PLO<digits>` token is returned trimmed and verbatim.
pub fn extract_plo_tag(label: &str) -> String {
    let trimmed = label.trim();
    match PLO_PREFIX_RE.captures(trimmed) {
        Some(caps) => caps[1].to_ascii_uppercase(),
        None => trimmed.to_string(),
    }
}

/// Whether a label starts with a well-formed PLO tag
pub fn has_plo_prefix(label: &str) -> bool {
    PLO_PREFIX_RE.is_match(label.trim())
}

/// Text after the PLO tag of a label, without the separating colon
pub fn plo_description(label: &str) -> String {
    let trimmed = label.trim();
    match PLO_PREFIX_RE.find(trimmed) {
        Some(m) => trimmed[m.end()..]
            .trim_start()
            .trim_start_matches(':')
            .trim()
            .to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ksec_code_parse_and_display() {
        let code: KsecCode = " ge (k) 3 ".parse().unwrap();
        assert_eq!(code, KsecCode::new(KsecCategory::General, KsecType::Knowledge, 3));
        assert_eq!(code.to_string(), "GE(K)3");
    }

    #[test]
    fn test_ksec_code_rejects_malformed() {
        assert!("GE(K)".parse::<KsecCode>().is_err());
        assert!("XX(K)1".parse::<KsecCode>().is_err());
        assert!("GE(K)0".parse::<KsecCode>().is_err());
        assert!("hello".parse::<KsecCode>().is_err());
    }

    #[test]
    fn test_ksec_set_rejects_wrong_type() {
        let err = KsecCodeSet::parse(KsecType::Skills, "GE(S)1, CE(K)2").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_ksec_set_dedupes_and_normalizes() {
        let set = KsecCodeSet::parse(KsecType::Knowledge, "GE(K)1,ge(k)1, CE(K)2,").unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.to_string(), "GE(K)1, CE(K)2");
    }

    #[test]
    fn test_ksec_set_lenient_drops_garbage() {
        let set = KsecCodeSet::parse_lenient(KsecType::Ethics, "GE(E)1, junk, CE(K)1");
        assert_eq!(set.to_string(), "GE(E)1");
    }

    #[test]
    fn test_plo_tag_boundary() {
        let set = PloTagSet::parse("PLO10").unwrap();
        assert!(set.contains("PLO10"));
        assert!(!set.contains("PLO1"));
    }

    #[test]
    fn test_plo_set_parse_variants() {
        let set = PloTagSet::parse("plo1: ; PLO2,PLO3").unwrap();
        assert_eq!(set.to_string(), "PLO1, PLO2, PLO3");
        assert!(PloTagSet::parse("").unwrap().is_empty());
        assert!(PloTagSet::parse("PLO1, P2").is_err());
    }

    #[test]
    fn test_extract_plo_tag() {
        assert_eq!(extract_plo_tag("PLO1: Apply knowledge"), "PLO1");
        assert_eq!(extract_plo_tag("plo12 Design systems"), "PLO12");
        assert_eq!(extract_plo_tag("  Outcome one "), "Outcome one");
    }

    #[test]
    fn test_plo_description() {
        assert_eq!(plo_description("PLO1: Apply knowledge"), "Apply knowledge");
        assert_eq!(plo_description("PLO2"), "");
        assert_eq!(plo_description("Something"), "");
    }
}
