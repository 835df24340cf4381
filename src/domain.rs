use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SynthError;

static ORCID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{4}-\d{4}-\d{3}[\dX]$").expect("ORCID pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum SynthesisType {
    #[serde(rename = "Solid Precursor")]
    SolidPrecursor,
    #[serde(rename = "Stock Solution")]
    StockSolution,
    #[serde(rename = "Precursor Solution")]
    PrecursorSolution,
    #[serde(rename = "Thin Film")]
    ThinFilm,
}

impl SynthesisType {
    pub const ALL: [SynthesisType; 4] = [
        SynthesisType::SolidPrecursor,
        SynthesisType::StockSolution,
        SynthesisType::PrecursorSolution,
        SynthesisType::ThinFilm,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SynthesisType::SolidPrecursor => "Solid Precursor",
            SynthesisType::StockSolution => "Stock Solution",
            SynthesisType::PrecursorSolution => "Precursor Solution",
            SynthesisType::ThinFilm => "Thin Film",
        }
    }
}

impl fmt::Display for SynthesisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SynthesisType {
    type Err = SynthError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value
            .trim()
            .to_lowercase()
            .replace(['-', '_'], " ");
        SynthesisType::ALL
            .into_iter()
            .find(|kind| kind.label().to_lowercase() == normalized)
            .ok_or_else(|| SynthError::InvalidSynthesisType(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleId(String);

impl SampleId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetId(String);

impl DatasetId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owner id of a record, normally an ORCID iD such as `0000-0002-1825-0097`.
///
/// The catalog stores owners as free strings, so parsing only requires a
/// non-blank value. Well-formed iDs are stored in canonical upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Orcid(String);

impl Orcid {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id has the `dddd-dddd-dddd-dddX` ORCID shape.
    pub fn is_canonical(&self) -> bool {
        ORCID_RE.is_match(&self.0)
    }

    /// Parses and additionally requires the ORCID shape.
    pub fn parse_canonical(value: &str) -> Result<Self, SynthError> {
        let orcid: Orcid = value.parse()?;
        if !orcid.is_canonical() {
            return Err(SynthError::InvalidOrcid(value.to_string()));
        }
        Ok(orcid)
    }
}

impl fmt::Display for Orcid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Orcid {
    type Err = SynthError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(SynthError::InvalidOrcid(value.to_string()));
        }
        let upper = trimmed.to_uppercase();
        if ORCID_RE.is_match(&upper) {
            return Ok(Self(upper));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// A sample record as held by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub unique_id: SampleId,
    #[serde(rename = "sample_name", default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "owner_orcid", default)]
    pub owner: Option<String>,
    #[serde(rename = "project_id", default)]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<SampleId>,
    #[serde(rename = "creation_date", default)]
    pub created_at: Option<String>,
}

/// One of several batches sharing the requested name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCandidate {
    pub unique_id: SampleId,
    pub sample_name: String,
    pub description: Option<String>,
    pub creation_date: Option<String>,
}

impl From<Sample> for BatchCandidate {
    fn from(sample: Sample) -> Self {
        Self {
            unique_id: sample.unique_id,
            sample_name: sample.name,
            description: sample.description,
            creation_date: sample.created_at,
        }
    }
}

/// How lookups that do not produce exactly one answer are treated.
///
/// `Lenient` swallows errors from the by-id batch lookup and lets rows proceed
/// when a parent reference is ambiguous or missing. `Strict` propagates the
/// lookup error and fails the row on any parent link that was not made.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    #[default]
    Lenient,
    Strict,
}

impl MatchPolicy {
    pub fn is_strict(&self) -> bool {
        matches!(self, MatchPolicy::Strict)
    }
}
