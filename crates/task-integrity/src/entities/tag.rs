//! Tag snapshots and the multi-tag document.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::reference::{Reference, TaskId};
use super::{Subtask, Task};
use crate::errors::{IntegrityError, IntegrityResult};

/// Name of the tag a legacy single-list document is read into
pub const DEFAULT_TAG: &str = "master";

/// One isolated namespace of top-level tasks.
///
/// The name lives in the document key, so it is skipped on the wire and
/// restored by [`TasksDocument`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(skip)]
    pub name: String,

    /// Tasks in declaration order
    #[serde(default)]
    pub tasks: Vec<Task>,

    /// Tag metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TagMetadata>,
}

impl Tag {
    /// Create an empty tag
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tasks: Vec::new(),
            metadata: None,
        }
    }

    /// Create with initial tasks
    pub fn with_tasks(name: impl Into<String>, tasks: Vec<Task>) -> Self {
        Self {
            name: name.into(),
            tasks,
            metadata: None,
        }
    }

    /// Get a top-level task by ID (first occurrence)
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Get a mutable top-level task by ID (first occurrence)
    pub fn task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Index of a top-level task by ID
    pub fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    /// Get a subtask by parent and subtask ID
    pub fn subtask(&self, parent: TaskId, id: u32) -> Option<&Subtask> {
        self.task(parent).and_then(|t| t.get_subtask(id))
    }

    /// Whether the reference resolves to an entity in this tag
    pub fn contains(&self, reference: Reference) -> bool {
        match reference {
            Reference::Task(id) => self.task(id).is_some(),
            Reference::Subtask(parent, id) => self.subtask(parent, id).is_some(),
        }
    }

    /// Insert a task before the first task with a larger id.
    pub fn insert_task_ordered(&mut self, task: Task) {
        let idx = self
            .tasks
            .iter()
            .position(|t| t.id > task.id)
            .unwrap_or(self.tasks.len());
        self.tasks.insert(idx, task);
    }

    /// Get task count
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Get subtask count across all tasks
    pub fn subtask_count(&self) -> usize {
        self.tasks.iter().map(|t| t.subtasks.len()).sum()
    }

    /// Stamp the metadata with an update time (storage side only)
    pub fn touch(&mut self, at: DateTime<Utc>) {
        let metadata = self.metadata.get_or_insert_with(TagMetadata::default);
        metadata.updated_at = Some(at);
    }
}

/// Tag metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TagMetadata {
    /// Creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    /// Last update timestamp
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "updatedAt"
    )]
    pub updated_at: Option<DateTime<Utc>>,

    /// Tag description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Full persisted document keyed by tag name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TasksDocument {
    tags: BTreeMap<String, Tag>,
}

impl TasksDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse either the tagged layout or the legacy `{tasks, metadata}` layout.
    pub fn from_value(value: serde_json::Value) -> IntegrityResult<Self> {
        let serde_json::Value::Object(map) = value else {
            return Err(IntegrityError::JsonParseError {
                reason: "expected a JSON object at the document root".to_string(),
            });
        };

        let is_legacy = map.contains_key("tasks")
            && map.keys().all(|k| k == "tasks" || k == "metadata");

        let mut document = Self::new();
        if is_legacy {
            let mut tag: Tag = serde_json::from_value(serde_json::Value::Object(map))?;
            tag.name = DEFAULT_TAG.to_string();
            document.insert(tag);
        } else {
            for (name, value) in map {
                let mut tag: Tag = serde_json::from_value(value)?;
                tag.name = name;
                document.insert(tag);
            }
        }
        Ok(document)
    }

    /// Serialize to the tagged layout
    pub fn to_value(&self) -> IntegrityResult<serde_json::Value> {
        let mut map = serde_json::Map::new();
        for (name, tag) in &self.tags {
            map.insert(name.clone(), serde_json::to_value(tag)?);
        }
        Ok(serde_json::Value::Object(map))
    }

    /// Tag names in sorted order
    pub fn tag_names(&self) -> Vec<String> {
        self.tags.keys().cloned().collect()
    }

    /// Borrow a tag
    pub fn get(&self, name: &str) -> Option<&Tag> {
        self.tags.get(name)
    }

    /// Clone a tag out of the document
    pub fn snapshot(&self, name: &str) -> IntegrityResult<Tag> {
        self.tags
            .get(name)
            .cloned()
            .ok_or_else(|| IntegrityError::TagNotFound {
                name: name.to_string(),
            })
    }

    /// Insert or replace a tag under its own name
    pub fn insert(&mut self, tag: Tag) {
        self.tags.insert(tag.name.clone(), tag);
    }

    /// Whether the tag exists
    pub fn contains(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_document_round_trip_names() {
        let value = serde_json::json!({
            "master": {"tasks": [{"id": 1, "title": "A"}]},
            "feature": {"tasks": []}
        });
        let document = TasksDocument::from_value(value).unwrap();
        assert_eq!(document.tag_names(), vec!["feature", "master"]);
        assert_eq!(document.get("master").unwrap().name, "master");

        let back = document.to_value().unwrap();
        assert!(back.get("master").unwrap().get("name").is_none());
    }

    #[test]
    fn test_legacy_document_reads_as_master() {
        let value = serde_json::json!({
            "tasks": [{"id": 1, "title": "A"}],
            "metadata": {"description": "old"}
        });
        let document = TasksDocument::from_value(value).unwrap();
        let master = document.snapshot(DEFAULT_TAG).unwrap();
        assert_eq!(master.task_count(), 1);
    }

    #[test]
    fn test_missing_tag_snapshot() {
        let document = TasksDocument::new();
        let err = document.snapshot("nope").unwrap_err();
        assert!(matches!(err, IntegrityError::TagNotFound { .. }));
    }

    #[test]
    fn test_contains_resolves_subtasks() {
        let tag = Tag::with_tasks(
            "master",
            vec![Task::new(3, "Parent").with_subtask(Subtask::new(1, "Child"))],
        );
        assert!(tag.contains(Reference::Task(3)));
        assert!(tag.contains(Reference::Subtask(3, 1)));
        assert!(!tag.contains(Reference::Subtask(3, 2)));
        assert!(!tag.contains(Reference::Task(1)));
    }

    #[test]
    fn test_insert_task_ordered() {
        let mut tag = Tag::with_tasks("master", vec![Task::new(1, "a"), Task::new(5, "e")]);
        tag.insert_task_ordered(Task::new(3, "c"));
        tag.insert_task_ordered(Task::new(9, "i"));
        let ids: Vec<_> = tag.tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 3, 5, 9]);
    }
}
