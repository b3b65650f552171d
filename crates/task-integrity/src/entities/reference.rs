//! Typed and raw dependency references.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::IntegrityError;

/// Numeric identifier of a top-level task (unique within its tag)
pub type TaskId = u32;

/// Numeric identifier of a subtask (unique within its parent)
pub type SubtaskId = u32;

/// Typed pointer to a task or subtask inside one tag.
///
/// Also serves as the identity of an entity: a task is `Task(id)`, a subtask
/// is `Subtask(parent_id, id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Reference {
    Task(TaskId),
    Subtask(TaskId, SubtaskId),
}

impl Reference {
    /// Top-level task that owns this identity (itself for a task).
    pub fn root_task(self) -> TaskId {
        match self {
            Self::Task(id) | Self::Subtask(id, _) => id,
        }
    }

    /// Parent id when this is a subtask reference.
    pub fn parent(self) -> Option<TaskId> {
        match self {
            Self::Task(_) => None,
            Self::Subtask(parent, _) => Some(parent),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task(id) => write!(f, "{id}"),
            Self::Subtask(parent, id) => write!(f, "{parent}.{id}"),
        }
    }
}

impl Serialize for Reference {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parses the fully-qualified spelling: `"5"` or `"5.2"`.
///
/// Context-dependent bare integers are resolved by
/// [`normalize`](crate::engine::normalize), not here.
impl FromStr for Reference {
    type Err = IntegrityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let malformed = |reason: &str| IntegrityError::MalformedReference {
            raw: s.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = trimmed.split('.');
        let first = parts.next().unwrap_or_default();
        let second = parts.next();
        if parts.next().is_some() {
            return Err(malformed("more than one '.' separator"));
        }

        let head = parse_positive(first).ok_or_else(|| malformed("expected a positive integer"))?;
        match second {
            None => Ok(Self::Task(head)),
            Some(sub) => {
                let sub = parse_positive(sub)
                    .ok_or_else(|| malformed("expected a positive subtask id after '.'"))?;
                Ok(Self::Subtask(head, sub))
            }
        }
    }
}

fn parse_positive(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<u32>().ok().filter(|n| *n > 0)
}

/// A dependency entry exactly as stored: a JSON integer or a JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawReference {
    Number(i64),
    Text(String),
}

impl fmt::Display for RawReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "\"{s}\""),
        }
    }
}

impl From<i64> for RawReference {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for RawReference {
    fn from(n: i32) -> Self {
        Self::Number(i64::from(n))
    }
}

impl From<u32> for RawReference {
    fn from(n: u32) -> Self {
        Self::Number(i64::from(n))
    }
}

impl From<&str> for RawReference {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// How a bare integer inside a subtask's dependency list is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BareSubtaskReferences {
    /// `n` means sibling subtask `parent.n`
    #[default]
    Sibling,
    /// `n` means top-level task `n`
    TopLevel,
    /// Bare integers are malformed in subtask context
    Reject,
}

impl fmt::Display for BareSubtaskReferences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sibling => write!(f, "sibling"),
            Self::TopLevel => write!(f, "top-level"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

impl FromStr for BareSubtaskReferences {
    type Err = IntegrityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sibling" => Ok(Self::Sibling),
            "top-level" | "toplevel" | "top_level" => Ok(Self::TopLevel),
            "reject" | "strict" => Ok(Self::Reject),
            _ => Err(IntegrityError::InvalidArgument {
                reason: format!("unknown bare subtask reference policy '{s}'"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_qualified_references() {
        assert_eq!("7".parse::<Reference>().unwrap(), Reference::Task(7));
        assert_eq!(" 3.1 ".parse::<Reference>().unwrap(), Reference::Subtask(3, 1));
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        for bad in ["", "0", "-1", "abc", "1.2.3", "1.", ".2", "1.0", "+4"] {
            assert!(bad.parse::<Reference>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        let reference = Reference::Subtask(12, 4);
        assert_eq!(reference.to_string().parse::<Reference>().unwrap(), reference);
    }

    #[test]
    fn test_raw_reference_serde_untagged() {
        let raw: Vec<RawReference> = serde_json::from_str(r#"[1, "3.1", "4"]"#).unwrap();
        assert_eq!(
            raw,
            vec![
                RawReference::Number(1),
                RawReference::Text("3.1".to_string()),
                RawReference::Text("4".to_string()),
            ]
        );
        assert_eq!(serde_json::to_string(&raw).unwrap(), r#"[1,"3.1","4"]"#);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            "top-level".parse::<BareSubtaskReferences>().unwrap(),
            BareSubtaskReferences::TopLevel
        );
        assert!("whatever".parse::<BareSubtaskReferences>().is_err());
    }
}
