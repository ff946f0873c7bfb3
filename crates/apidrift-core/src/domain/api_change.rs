//! `ApiChange`: immutable description of one library API change under evaluation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of API change between two library versions.
///
/// Unknown values are kept verbatim in [`ChangeKind::Other`] so that a parsed
/// batch serializes back to exactly what was read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChangeKind {
    Deprecated,
    Signature,
    Added,
    Removed,
    Other(String),
}

impl ChangeKind {
    pub fn as_str(&self) -> &str {
        match self {
            ChangeKind::Deprecated => "deprecated",
            ChangeKind::Signature => "signature",
            ChangeKind::Added => "added",
            ChangeKind::Removed => "removed",
            ChangeKind::Other(raw) => raw,
        }
    }
}

impl From<String> for ChangeKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "deprecated" => ChangeKind::Deprecated,
            "signature" => ChangeKind::Signature,
            "added" => ChangeKind::Added,
            "removed" => ChangeKind::Removed,
            _ => ChangeKind::Other(raw),
        }
    }
}

impl From<ChangeKind> for String {
    fn from(kind: ChangeKind) -> Self {
        match kind {
            ChangeKind::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which kind of program element the change touches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChangeCategory {
    Method,
    Class,
    Field,
    Other(String),
}

impl ChangeCategory {
    pub fn as_str(&self) -> &str {
        match self {
            ChangeCategory::Method => "method",
            ChangeCategory::Class => "class",
            ChangeCategory::Field => "field",
            ChangeCategory::Other(raw) => raw,
        }
    }
}

impl From<String> for ChangeCategory {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "method" => ChangeCategory::Method,
            "class" => ChangeCategory::Class,
            "field" => ChangeCategory::Field,
            _ => ChangeCategory::Other(raw),
        }
    }
}

impl From<ChangeCategory> for String {
    fn from(category: ChangeCategory) -> Self {
        match category {
            ChangeCategory::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ChangeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One API change record from the input batch.
///
/// Equality is structural over every field. The repair loop and the
/// dispatcher both rely on it to reject outcomes reported for a different
/// change than the one under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiChange {
    /// Library the change belongs to.
    pub library: String,

    /// Fully qualified name of the changed element.
    pub name: String,

    /// Library version before the change.
    pub from_version: String,

    /// Library version the generated code must target.
    pub to_version: String,

    #[serde(rename = "type")]
    pub kind: ChangeKind,

    /// Signature of the changed element.
    pub signature: String,

    #[serde(default)]
    pub documentation: Option<String>,

    #[serde(rename = "changetype")]
    pub category: ChangeCategory,

    /// Source of the changed element, when available.
    pub source_code: String,

    /// Natural-language task the generated code has to solve.
    pub query: String,

    /// Signature the generated implementation must expose.
    pub function_signature: String,

    /// Acceptance test compiled against the generated implementation.
    pub test_program: String,
}
