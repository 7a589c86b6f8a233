//! Lint output decoded from the bundle's JSON formatter.

use serde::{Deserialize, Deserializer, Serialize};

/// Violations reported for one lint run.
pub type Output = Vec<Violation>;

/// A single rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Document the violation was found in. Empty for ruleset-level
    /// problems.
    #[serde(default)]
    pub source: String,
    pub code: String,
    /// JSON path of the offending node. Array indices are given as their
    /// decimal string.
    #[serde(deserialize_with = "deserialize_path")]
    pub path: Vec<String>,
    pub message: String,
    pub severity: Severity,
    pub range: Range,
}

/// Zero-based position in a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

/// Spectral diagnostic severity, serialized as its integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
    Other(i32),
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Information => "info",
            Severity::Hint => "hint",
            Severity::Other(_) => "unknown",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Severity::Error)
    }
}

impl From<i32> for Severity {
    fn from(code: i32) -> Self {
        match code {
            0 => Severity::Error,
            1 => Severity::Warning,
            2 => Severity::Information,
            3 => Severity::Hint,
            other => Severity::Other(other),
        }
    }
}

impl From<Severity> for i32 {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Error => 0,
            Severity::Warning => 1,
            Severity::Information => 2,
            Severity::Hint => 3,
            Severity::Other(code) => code,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Segment {
    Key(String),
    Index(serde_json::Number),
}

fn deserialize_path<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let segments = Vec::<Segment>::deserialize(deserializer)?;
    Ok(segments
        .into_iter()
        .map(|segment| match segment {
            Segment::Key(key) => key,
            Segment::Index(index) => index.to_string(),
        })
        .collect())
}

/// Returns `true` if any violation has error severity.
pub fn has_errors(output: &[Violation]) -> bool {
    output.iter().any(|v| v.severity.is_error())
}
