//! Core data structures for tagged task lists.

mod config;
mod reference;
mod subtask;
mod tag;
mod task;

pub use config::{GlobalConfig, IntegrityConfig, TasksConfig};
pub use reference::{BareSubtaskReferences, RawReference, Reference, SubtaskId, TaskId};
pub use subtask::Subtask;
pub use tag::{Tag, TagMetadata, TasksDocument, DEFAULT_TAG};
pub use task::{MoveRecord, Task, TaskPriority, TaskStatus};
