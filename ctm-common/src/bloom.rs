//! Bloom's taxonomy levels used to classify CLOs

use crate::{Error, Result};
use std::str::FromStr;

/// Taxonomy domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BloomDomain {
    Cognitive,
    Affective,
    Psychomotor,
}

impl BloomDomain {
    pub const ALL: [BloomDomain; 3] = [
        BloomDomain::Cognitive,
        BloomDomain::Affective,
        BloomDomain::Psychomotor,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BloomDomain::Cognitive => "Cognitive",
            BloomDomain::Affective => "Affective",
            BloomDomain::Psychomotor => "Psychomotor",
        }
    }

    /// Levels of the domain in ascending score order
    pub fn levels(self) -> impl Iterator<Item = BloomLevel> {
        BloomLevel::ALL.into_iter().filter(move |l| l.domain() == self)
    }
}

/// A level within one of the three domains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BloomLevel {
    Remember,
    Understand,
    Apply,
    Analyze,
    Evaluate,
    Create,
    Receiving,
    Responding,
    Valuing,
    Organization,
    Characterization,
    Imitation,
    Manipulation,
    Precision,
    Articulation,
    Naturalization,
}

impl BloomLevel {
    pub const ALL: [BloomLevel; 16] = [
        BloomLevel::Remember,
        BloomLevel::Understand,
        BloomLevel::Apply,
        BloomLevel::Analyze,
        BloomLevel::Evaluate,
        BloomLevel::Create,
        BloomLevel::Receiving,
        BloomLevel::Responding,
        BloomLevel::Valuing,
        BloomLevel::Organization,
        BloomLevel::Characterization,
        BloomLevel::Imitation,
        BloomLevel::Manipulation,
        BloomLevel::Precision,
        BloomLevel::Articulation,
        BloomLevel::Naturalization,
    ];

    pub fn domain(self) -> BloomDomain {
        use BloomLevel::*;
        match self {
            Remember | Understand | Apply | Analyze | Evaluate | Create => BloomDomain::Cognitive,
            Receiving | Responding | Valuing | Organization | Characterization => {
                BloomDomain::Affective
            }
            Imitation | Manipulation | Precision | Articulation | Naturalization => {
                BloomDomain::Psychomotor
            }
        }
    }

    /// Numeric score within the domain (1-based)
    pub fn score(self) -> u8 {
        use BloomLevel::*;
        match self {
            Remember | Receiving | Imitation => 1,
            Understand | Responding | Manipulation => 2,
            Apply | Valuing | Precision => 3,
            Analyze | Organization | Articulation => 4,
            Evaluate | Characterization | Naturalization => 5,
            Create => 6,
        }
    }

    pub fn name(self) -> &'static str {
        use BloomLevel::*;
        match self {
            Remember => "Remember",
            Understand => "Understand",
            Apply => "Apply",
            Analyze => "Analyze",
            Evaluate => "Evaluate",
            Create => "Create",
            Receiving => "Receiving",
            Responding => "Responding",
            Valuing => "Valuing",
            Organization => "Organization",
            Characterization => "Characterization",
            Imitation => "Imitation",
            Manipulation => "Manipulation",
            Precision => "Precision",
            Articulation => "Articulation",
            Naturalization => "Naturalization",
        }
    }

    /// Sample action verbs shown next to the level in the CLO editor
    pub fn verbs(self) -> &'static str {
        use BloomLevel::*;
        match self {
            Remember => "list, define, recall, identify, label",
            Understand => "summarize, describe, interpret, explain, classify",
            Apply => "use, implement, execute, solve, demonstrate",
            Analyze => "compare, contrast, differentiate, examine",
            Evaluate => "judge, critique, defend, argue, support",
            Create => "design, construct, develop, formulate, invent",
            Receiving => "ask, follow, give, hold, name, point to, reply",
            Responding => "answer, comply, help, present, tell, write",
            Valuing => "complete, demonstrate, express, justify, propose",
            Organization => "compare, defend, integrate, organize, prepare",
            Characterization => "display, influence, perform, revise, verify",
            Imitation => "copy, follow, replicate, repeat, adhere",
            Manipulation => "execute, implement, operate, perform",
            Precision => "demonstrate, calibrate, show, perfect",
            Articulation => "construct, adapt, integrate, refine",
            Naturalization => "design, initiate, create, compose, master",
        }
    }

    /// Parse a level name; empty input means "no level selected"
    pub fn parse_optional(s: &str) -> Result<Option<Self>> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        trimmed.parse().map(Some)
    }
}

impl FromStr for BloomLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        BloomLevel::ALL
            .into_iter()
            .find(|l| l.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| Error::invalid(format!("Unknown Bloom level '{}'", trimmed)))
    }
}

/// Highest score among the given level names (0 when none is recognized)
pub fn max_bloom_score<'a>(levels: impl IntoIterator<Item = &'a str>) -> u8 {
    levels
        .into_iter()
        .filter_map(|s| s.parse::<BloomLevel>().ok())
        .map(BloomLevel::score)
        .max()
        .unwrap_or(0)
}
