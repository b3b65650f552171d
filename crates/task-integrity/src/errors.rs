//! Error types for the integrity engine.

use std::fmt;

use thiserror::Error;

use crate::entities::Reference;

/// A dependency edge that blocks a cross-tag move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictingEdge {
    /// Entity that declares the dependency
    pub from: Reference,

    /// Entity it depends on
    pub to: Reference,

    /// Whether `from` is part of the moving set
    pub from_moving: bool,
}

impl fmt::Display for ConflictingEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.from_moving {
            write!(f, "{} (moving) -> {} (staying)", self.from, self.to)
        } else {
            write!(f, "{} (staying) -> {} (moving)", self.from, self.to)
        }
    }
}

fn join_edges(edges: &[ConflictingEdge]) -> String {
    edges
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Error types for integrity operations.
///
/// Validation findings are never errors; they are returned as
/// [`Issue`](crate::engine::Issue) data. Every variant here aborts the
/// mutating call that produced it and leaves the input snapshot untouched.
#[derive(Error, Debug, Clone)]
pub enum IntegrityError {
    // Reference errors
    #[error("Malformed reference '{raw}': {reason}")]
    MalformedReference { raw: String, reason: String },

    #[error("Task '{task_id}' not found in tag '{tag}'")]
    TaskNotFound { tag: String, task_id: u32 },

    #[error("Subtask '{task_id}.{subtask_id}' not found in tag '{tag}'")]
    SubtaskNotFound {
        tag: String,
        task_id: u32,
        subtask_id: u32,
    },

    // Move errors
    #[error("Destination '{destination}' already exists in tag '{tag}'")]
    Conflict { tag: String, destination: Reference },

    #[error("Destination '{destination}' is already referenced by '{owner}' in tag '{tag}'; remove that dependency first")]
    DestinationReferenced {
        tag: String,
        destination: Reference,
        owner: Reference,
    },

    #[error("Cross-tag move blocked by {} dependency edge(s): {}", .edges.len(), join_edges(.edges))]
    CrossTagDependencyConflict { edges: Vec<ConflictingEdge> },

    #[error("Subtask '{reference}' cannot be moved across tags; move its parent task instead")]
    CrossTagSubtaskMove { reference: Reference },

    #[error("Move lists differ in length: {sources} source(s), {destinations} destination(s)")]
    MoveListMismatch { sources: usize, destinations: usize },

    #[error("Invalid move {from} -> {to}: {reason}")]
    InvalidMove {
        from: Reference,
        to: Reference,
        reason: String,
    },

    // Dependency errors
    #[error("'{reference}' cannot depend on itself")]
    SelfDependency { reference: Reference },

    #[error("Circular dependency detected: {}", .cycle.iter().map(ToString::to_string).collect::<Vec<_>>().join(" -> "))]
    CircularDependency { cycle: Vec<Reference> },

    // Entity parsing errors
    #[error("Invalid status: '{status}'")]
    InvalidStatus { status: String },

    #[error("Invalid priority: '{priority}'")]
    InvalidPriority { priority: String },

    // Tag errors
    #[error("Tag '{name}' not found")]
    TagNotFound { name: String },

    // Storage errors
    #[error("Storage error: {reason}")]
    StorageError { reason: String },

    #[error("Failed to read file '{path}': {reason}")]
    FileReadError { path: String, reason: String },

    #[error("Failed to write file '{path}': {reason}")]
    FileWriteError { path: String, reason: String },

    #[error("Failed to parse JSON: {reason}")]
    JsonParseError { reason: String },

    #[error("Project not initialized. Run 'task-integrity init' first.")]
    NotInitialized,

    // General errors
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },
}

impl IntegrityError {
    /// Not-found error for any entity reference.
    pub fn not_found(tag: &str, reference: Reference) -> Self {
        match reference {
            Reference::Task(task_id) => Self::TaskNotFound {
                tag: tag.to_string(),
                task_id,
            },
            Reference::Subtask(task_id, subtask_id) => Self::SubtaskNotFound {
                tag: tag.to_string(),
                task_id,
                subtask_id,
            },
        }
    }
}

impl From<std::io::Error> for IntegrityError {
    fn from(err: std::io::Error) -> Self {
        Self::StorageError {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for IntegrityError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonParseError {
            reason: err.to_string(),
        }
    }
}

/// Result type alias for integrity operations
pub type IntegrityResult<T> = Result<T, IntegrityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IntegrityError::TaskNotFound {
            tag: "master".to_string(),
            task_id: 12,
        };
        assert_eq!(err.to_string(), "Task '12' not found in tag 'master'");
    }

    #[test]
    fn test_circular_dependency_error() {
        let err = IntegrityError::CircularDependency {
            cycle: vec![Reference::Task(1), Reference::Subtask(2, 1), Reference::Task(1)],
        };
        assert_eq!(err.to_string(), "Circular dependency detected: 1 -> 2.1 -> 1");
    }

    #[test]
    fn test_cross_tag_conflict_lists_every_edge() {
        let err = IntegrityError::CrossTagDependencyConflict {
            edges: vec![
                ConflictingEdge {
                    from: Reference::Task(3),
                    to: Reference::Task(1),
                    from_moving: true,
                },
                ConflictingEdge {
                    from: Reference::Subtask(4, 1),
                    to: Reference::Task(3),
                    from_moving: false,
                },
            ],
        };
        let message = err.to_string();
        assert!(message.contains("2 dependency edge(s)"));
        assert!(message.contains("3 (moving) -> 1 (staying)"));
        assert!(message.contains("4.1 (staying) -> 3 (moving)"));
    }

    #[test]
    fn test_not_found_helper() {
        let err = IntegrityError::not_found("feature", Reference::Subtask(7, 2));
        assert!(matches!(
            err,
            IntegrityError::SubtaskNotFound {
                task_id: 7,
                subtask_id: 2,
                ..
            }
        ));
        assert_eq!(err.to_string(), "Subtask '7.2' not found in tag 'feature'");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: IntegrityError = io_err.into();
        assert!(matches!(err, IntegrityError::StorageError { .. }));
    }
}
