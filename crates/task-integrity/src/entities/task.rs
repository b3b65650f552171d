//! Task entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::reference::{RawReference, SubtaskId, TaskId};
use super::Subtask;
use crate::errors::IntegrityError;

/// Task status values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Done,
    Blocked,
    Deferred,
    Cancelled,
    Review,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in-progress"),
            Self::Done => write!(f, "done"),
            Self::Blocked => write!(f, "blocked"),
            Self::Deferred => write!(f, "deferred"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Review => write!(f, "review"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = IntegrityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "in-progress" | "inprogress" | "in_progress" => Ok(Self::InProgress),
            "done" | "completed" => Ok(Self::Done),
            "blocked" => Ok(Self::Blocked),
            "deferred" => Ok(Self::Deferred),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            "review" => Ok(Self::Review),
            _ => Err(IntegrityError::InvalidStatus {
                status: s.to_string(),
            }),
        }
    }
}

/// Task priority levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for TaskPriority {
    type Err = IntegrityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" | "med" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" | "crit" => Ok(Self::Critical),
            _ => Err(IntegrityError::InvalidPriority {
                priority: s.to_string(),
            }),
        }
    }
}

/// Audit record left on a task each time it crosses tags.
///
/// Metadata only; graph algorithms never read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    #[serde(rename = "fromTag")]
    pub from_tag: String,

    #[serde(rename = "toTag")]
    pub to_tag: String,

    #[serde(rename = "movedAt")]
    pub moved_at: DateTime<Utc>,
}

/// Core task structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Positive identifier, unique among the top-level tasks of a tag
    pub id: TaskId,

    /// Brief, descriptive title
    pub title: String,

    /// Concise description of what the task involves
    #[serde(default)]
    pub description: String,

    /// Current task status
    #[serde(default)]
    pub status: TaskStatus,

    /// Task priority level
    #[serde(default)]
    pub priority: TaskPriority,

    /// Prerequisites, kept in their stored encoding
    #[serde(default)]
    pub dependencies: Vec<RawReference>,

    /// In-depth implementation instructions
    #[serde(default)]
    pub details: String,

    /// Verification approach
    #[serde(default, rename = "testStrategy")]
    pub test_strategy: String,

    /// List of subtasks
    #[serde(default)]
    pub subtasks: Vec<Subtask>,

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

    /// Cross-tag move audit trail
    #[serde(default, skip_serializing_if = "Vec::is_empty", rename = "moveHistory")]
    pub move_history: Vec<MoveRecord>,
}

impl Task {
    /// Create a new task with minimal required fields
    pub fn new(id: TaskId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: String::new(),
            status: TaskStatus::default(),
            priority: TaskPriority::default(),
            dependencies: Vec::new(),
            details: String::new(),
            test_strategy: String::new(),
            subtasks: Vec::new(),
            created_at: None,
            updated_at: None,
            move_history: Vec::new(),
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

    /// Builder-style helper appending a subtask
    pub fn with_subtask(mut self, subtask: Subtask) -> Self {
        self.subtasks.push(subtask);
        self
    }

    /// Get subtask by ID
    pub fn get_subtask(&self, subtask_id: SubtaskId) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.id == subtask_id)
    }

    /// Remove a subtask by ID
    pub fn remove_subtask(&mut self, subtask_id: SubtaskId) -> Option<Subtask> {
        let idx = self.subtasks.iter().position(|s| s.id == subtask_id)?;
        Some(self.subtasks.remove(idx))
    }

    /// Insert a subtask before the first sibling with a larger id.
    pub fn insert_subtask_ordered(&mut self, subtask: Subtask) {
        let idx = self
            .subtasks
            .iter()
            .position(|s| s.id > subtask.id)
            .unwrap_or(self.subtasks.len());
        self.subtasks.insert(idx, subtask);
    }

    /// Get next available subtask ID
    pub fn next_subtask_id(&self) -> SubtaskId {
        self.subtasks.iter().map(|s| s.id).max().unwrap_or(0) + 1
    }

    /// Whether at least one subtask can start immediately
    /// (vacuously true without subtasks).
    pub fn has_startable_subtask(&self) -> bool {
        self.subtasks.is_empty() || self.subtasks.iter().any(|s| s.dependencies.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_new() {
        let task = Task::new(1, "Test Task");
        assert_eq!(task.id, 1);
        assert_eq!(task.title, "Test Task");
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert!(task.dependencies.is_empty());
    }

    #[test]
    fn test_task_status_parsing() {
        assert_eq!(
            "pending".parse::<TaskStatus>().unwrap(),
            TaskStatus::Pending
        );
        assert_eq!(
            "in_progress".parse::<TaskStatus>().unwrap(),
            TaskStatus::InProgress
        );
        assert_eq!("completed".parse::<TaskStatus>().unwrap(), TaskStatus::Done);
        assert!("invalid".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_task_deserializes_mixed_dependencies() {
        let json = r#"{
            "id": 4,
            "title": "Wire up API",
            "status": "in-progress",
            "dependencies": [1, "2.3"],
            "subtasks": [{"id": 1, "title": "Sub", "dependencies": [2]}]
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(
            task.dependencies,
            vec![RawReference::Number(1), RawReference::Text("2.3".to_string())]
        );
        assert_eq!(task.subtasks[0].dependencies, vec![RawReference::Number(2)]);
    }

    #[test]
    fn test_move_history_omitted_when_empty() {
        let value = serde_json::to_value(Task::new(1, "Quiet")).unwrap();
        assert!(value.get("moveHistory").is_none());
    }

    #[test]
    fn test_insert_subtask_ordered() {
        let mut task = Task::new(1, "Parent")
            .with_subtask(Subtask::new(1, "one"))
            .with_subtask(Subtask::new(4, "four"));
        task.insert_subtask_ordered(Subtask::new(2, "two"));
        let ids: Vec<_> = task.subtasks.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 4]);
        assert_eq!(task.next_subtask_id(), 5);
    }

    #[test]
    fn test_has_startable_subtask() {
        let mut task = Task::new(1, "Parent").with_subtask(Subtask::new(1, "a").with_dependencies([2]));
        assert!(!task.has_startable_subtask());
        task.subtasks[0].dependencies.clear();
        assert!(task.has_startable_subtask());
        assert!(Task::new(2, "Leaf").has_startable_subtask());
    }
}
