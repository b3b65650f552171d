#![warn(clippy::pedantic)]
// Allow common pedantic lints that don't affect correctness
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::similar_names)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_self)]

//! # Task Integrity
//!
//! Dependency-graph and hierarchy integrity for tagged task lists.
//!
//! This crate provides:
//! - Normalization of stored dependency entries into typed references
//! - Read-only validation reporting every integrity issue in a tag
//! - Idempotent repair of everything the validator reports
//! - Task/subtask moves that rewrite every reference atomically
//! - Cross-tag moves with explicit dependency policies
//! - File-based storage in the `.tasks/` directory and a CLI
//!
//! ## Example
//!
//! ```rust,ignore
//! use task_integrity::{FileStorage, IntegrityEngine, Storage};
//!
//! let storage = FileStorage::new(".");
//! let tag = storage.load_tag("master").await?;
//!
//! let engine = IntegrityEngine::default();
//! let report = engine.validate(&tag);
//! if !report.is_valid() {
//!     let repaired = engine.repair(&tag);
//!     storage.save_tags(&[&repaired.tag]).await?;
//! }
//! ```

// Core entities
pub mod entities;

// Error types
pub mod errors;

// Dependency graph
pub mod graph;

// Validation, repair and moves
pub mod engine;

// Storage layer
pub mod storage;

// Domain facades
pub mod domain;

// Terminal UI helpers
pub mod ui;

// Re-export key types for convenience
pub use engine::{
    CrossTagMoveOptions, CrossTagOutcome, DependencyPolicy, IntegrityEngine, Issue, IssueKind,
    MoveOutcome, RepairOutcome, RepairStats, ValidationReport,
};
pub use entities::{
    BareSubtaskReferences, IntegrityConfig, RawReference, Reference, Subtask, Tag, Task,
    TaskPriority, TaskStatus, TasksConfig, TasksDocument,
};
pub use errors::{ConflictingEdge, IntegrityError, IntegrityResult};
pub use storage::{FileStorage, Storage};
