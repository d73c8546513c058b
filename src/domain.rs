use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ProfileDbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Dataset {
    Interacdome,
    Kofam,
}

impl Dataset {
    /// Name used for the function source in contigs databases.
    pub fn source_name(&self) -> &'static str {
        match self {
            Dataset::Interacdome => "InteracDome",
            Dataset::Kofam => "KOfam",
        }
    }

    pub fn command_name(&self) -> &'static str {
        match self {
            Dataset::Interacdome => "interacdome",
            Dataset::Kofam => "kofam",
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source_name())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InteracdomeKind {
    #[default]
    Representable,
    Confident,
}

impl InteracdomeKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            InteracdomeKind::Representable => "representable_interactions.txt",
            InteracdomeKind::Confident => "confident_interactions.txt",
        }
    }
}

impl fmt::Display for InteracdomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InteracdomeKind::Representable => write!(f, "representable"),
            InteracdomeKind::Confident => write!(f, "confident"),
        }
    }
}

/// What a catalog lookup does with an identifier it does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPolicy {
    /// Fail with `UnknownIdentifier`.
    Strict,
    /// Substitute a placeholder definition naming the identifier.
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KoNumber(String);

impl KoNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KoNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for KoNumber {
    type Err = ProfileDbError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_uppercase();
        if !is_prefixed_number(&normalized, "K", 5) {
            return Err(ProfileDbError::InvalidIdentifier(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleId(String);

impl ModuleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ModuleId {
    type Err = ProfileDbError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_uppercase();
        if !is_prefixed_number(&normalized, "M", 5) {
            return Err(ProfileDbError::InvalidIdentifier(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// Pfam family accession without its version suffix (`PF00005.26` -> `PF00005`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PfamAccession(String);

impl PfamAccession {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PfamAccession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PfamAccession {
    type Err = ProfileDbError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let unversioned = trimmed.split('.').next().unwrap_or(trimmed).to_uppercase();
        if !is_prefixed_number(&unversioned, "PF", 5) {
            return Err(ProfileDbError::InvalidIdentifier(value.to_string()));
        }
        Ok(Self(unversioned))
    }
}

fn is_prefixed_number(value: &str, prefix: &str, digits: usize) -> bool {
    value
        .strip_prefix(prefix)
        .map(|rest| rest.len() == digits && rest.chars().all(|ch| ch.is_ascii_digit()))
        .unwrap_or(false)
}
