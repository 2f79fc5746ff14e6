use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::types::ContentHash;

/// A named, ordered body of source text. Immutable once loaded; identity is
/// the unit name plus the content hash.
#[derive(Debug, Clone, Serialize)]
pub struct SourceUnit {
    pub name: String,
    pub content_hash: ContentHash,
    #[serde(skip)]
    pub text: String,
}

impl SourceUnit {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        let name = name.into();
        let text = text.into();
        Self {
            content_hash: ContentHash::digest(&text),
            name,
            text,
        }
    }

    /// Load a unit from an explicit path. The engine never walks
    /// directories or expands globs; callers hand it files one by one.
    pub fn from_file(path: &Path) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self::new(path.to_string_lossy().into_owned(), text))
    }

    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.name).extension().and_then(|e| e.to_str())
    }
}

/// Which control constructs count as decision sites
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum BranchKind {
    If,
    Loop,
    Switch,
    ShortCircuit,
}

/// The set of branch kinds enabled for a model-building pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchKinds(Vec<BranchKind>);

impl BranchKinds {
    pub fn all() -> Self {
        Self(vec![
            BranchKind::If,
            BranchKind::Loop,
            BranchKind::Switch,
            BranchKind::ShortCircuit,
        ])
    }

    pub fn new(kinds: Vec<BranchKind>) -> Self {
        Self(kinds)
    }

    pub fn enabled(&self, kind: BranchKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn kinds(&self) -> &[BranchKind] {
        &self.0
    }
}

impl Default for BranchKinds {
    fn default() -> Self {
        Self::all()
    }
}

/// Label of one outcome at a decision site. Labels at a site are mutually
/// exclusive and collectively exhaustive for that decision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum BranchLabel {
    True,
    False,
    Case(u32),
    Default,
}

impl fmt::Display for BranchLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => write!(f, "true"),
            Self::False => write!(f, "false"),
            Self::Case(n) => write!(f, "case-{n}"),
            Self::Default => write!(f, "default"),
        }
    }
}

impl From<BranchLabel> for String {
    fn from(label: BranchLabel) -> String {
        label.to_string()
    }
}

impl TryFrom<String> for BranchLabel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, String> {
        match value.as_str() {
            "true" => Ok(Self::True),
            "false" => Ok(Self::False),
            "default" => Ok(Self::Default),
            other => match other.strip_prefix("case-") {
                Some(n) => n
                    .parse::<u32>()
                    .map(Self::Case)
                    .map_err(|_| format!("invalid branch label: {other}")),
                None => Err(format!("invalid branch label: {other}")),
            },
        }
    }
}

/// An atomic thing the engine measures execution of.
///
/// Identity is structural (unit name + location), never reference-based, so
/// aggregation and counter-map stability checks work across process and
/// serialization boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CountableUnit {
    Line {
        unit: String,
        line: u32,
    },
    Branch {
        unit: String,
        site: u32,
        label: BranchLabel,
        line: u32,
    },
}

impl CountableUnit {
    pub fn line(unit: &str, line: u32) -> Self {
        Self::Line {
            unit: unit.to_string(),
            line,
        }
    }

    pub fn branch(unit: &str, site: u32, label: BranchLabel, line: u32) -> Self {
        Self::Branch {
            unit: unit.to_string(),
            site,
            label,
            line,
        }
    }

    pub fn unit_name(&self) -> &str {
        match self {
            Self::Line { unit, .. } | Self::Branch { unit, .. } => unit,
        }
    }

    pub fn line_number(&self) -> u32 {
        match self {
            Self::Line { line, .. } | Self::Branch { line, .. } => *line,
        }
    }

    pub fn is_line(&self) -> bool {
        matches!(self, Self::Line { .. })
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, Self::Branch { .. })
    }
}

impl fmt::Display for CountableUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line { unit, line } => write!(f, "{unit}:{line}"),
            Self::Branch {
                unit,
                site,
                label,
                line,
            } => write!(f, "{unit}:{line} site {site} [{label}]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countable_unit_identity_is_structural() {
        let a = CountableUnit::branch("lib.sim", 2, BranchLabel::True, 14);
        let b = CountableUnit::branch("lib.sim", 2, BranchLabel::True, 14);
        assert_eq!(a, b);
        assert_ne!(a, CountableUnit::branch("lib.sim", 2, BranchLabel::False, 14));
    }

    #[test]
    fn branch_label_string_round_trip() {
        for label in [
            BranchLabel::True,
            BranchLabel::False,
            BranchLabel::Case(3),
            BranchLabel::Default,
        ] {
            let s: String = label.clone().into();
            assert_eq!(BranchLabel::try_from(s).unwrap(), label);
        }
        assert!(BranchLabel::try_from("case-x".to_string()).is_err());
    }
}
