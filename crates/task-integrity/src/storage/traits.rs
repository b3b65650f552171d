//! Storage trait definitions.

use async_trait::async_trait;

use crate::entities::{Tag, TasksDocument};
use crate::errors::IntegrityResult;

/// Storage interface for tag snapshots.
///
/// The engine never calls this; facades load, run the engine, and persist.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize storage (create directories, empty document)
    async fn initialize(&self) -> IntegrityResult<()>;

    /// Get storage type identifier
    fn storage_type(&self) -> &'static str;

    /// Check if storage is initialized
    async fn is_initialized(&self) -> IntegrityResult<bool>;

    /// Load every tag
    async fn load_document(&self) -> IntegrityResult<TasksDocument>;

    /// Load one tag snapshot
    async fn load_tag(&self, name: &str) -> IntegrityResult<Tag>;

    /// Replace the given tags in a single write. Tags not listed are kept.
    async fn save_tags(&self, tags: &[&Tag]) -> IntegrityResult<()>;

    /// Get all available tag names
    async fn get_all_tags(&self) -> IntegrityResult<Vec<String>>;

    /// Check if tag exists
    async fn tag_exists(&self, name: &str) -> IntegrityResult<bool>;
}
