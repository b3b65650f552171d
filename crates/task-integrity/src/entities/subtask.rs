//! Subtask entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::reference::{RawReference, SubtaskId, TaskId};
use super::task::TaskStatus;

/// Subtask structure (nested within tasks)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    /// Numeric ID within parent task
    pub id: SubtaskId,

    /// Declared parent task ID; the containing task is authoritative
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "parentId")]
    pub parent_id: Option<TaskId>,

    /// Brief, descriptive title
    pub title: String,

    /// Concise description
    #[serde(default)]
    pub description: String,

    /// Current status
    #[serde(default)]
    pub status: TaskStatus,

    /// Dependencies (siblings, other subtasks or top-level tasks)
    #[serde(default)]
    pub dependencies: Vec<RawReference>,

    /// Implementation details
    #[serde(default)]
    pub details: String,

    /// Test strategy
    #[serde(default, rename = "testStrategy")]
    pub test_strategy: String,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "createdAt"
    )]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "updatedAt"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Subtask {
    /// Create a new subtask
    pub fn new(id: SubtaskId, title: impl Into<String>) -> Self {
        Self {
            id,
            parent_id: None,
            title: title.into(),
            description: String::new(),
            status: TaskStatus::default(),
            dependencies: Vec::new(),
            details: String::new(),
            test_strategy: String::new(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Builder-style helper for fixtures and callers assembling snapshots
    pub fn with_dependencies<I, R>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<RawReference>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }
}
