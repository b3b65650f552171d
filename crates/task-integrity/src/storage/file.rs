//! File-based storage implementation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::fs;

use super::traits::Storage;
use crate::entities::{Tag, TagMetadata, TasksDocument, DEFAULT_TAG};
use crate::errors::{IntegrityError, IntegrityResult};

/// File-based storage implementation
pub struct FileStorage {
    /// Project root path
    project_path: PathBuf,

    /// Path to tasks directory (.tasks/)
    tasks_dir: PathBuf,

    /// Path to tasks.json
    tasks_file: PathBuf,
}

impl FileStorage {
    /// Create a new file storage instance
    ///
    /// Uses `.tasks/` directory for project task storage.
    pub fn new(project_path: impl AsRef<Path>) -> Self {
        let project_path = project_path.as_ref().to_path_buf();
        let tasks_dir = project_path.join(".tasks");
        let tasks_file = tasks_dir.join("tasks").join("tasks.json");

        Self {
            project_path,
            tasks_dir,
            tasks_file,
        }
    }

    /// Get the project path
    pub fn project_path(&self) -> &Path {
        &self.project_path
    }

    /// Get the tasks directory path
    pub fn tasks_dir(&self) -> &Path {
        &self.tasks_dir
    }

    /// Get the tasks file path
    pub fn tasks_file(&self) -> &Path {
        &self.tasks_file
    }

    /// Read and parse the tasks file
    async fn read_tasks_file(&self) -> IntegrityResult<Value> {
        match fs::read_to_string(&self.tasks_file).await {
            Ok(content) => {
                let data: Value = serde_json::from_str(&content)?;
                Ok(data)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(IntegrityError::NotInitialized),
            Err(e) => Err(IntegrityError::FileReadError {
                path: self.tasks_file.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Write the tasks file through a sibling temp file so readers never see
    /// a partial document.
    async fn write_tasks_file(&self, data: &Value) -> IntegrityResult<()> {
        if let Some(parent) = self.tasks_file.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(data)?;
        let temp = self.tasks_file.with_extension("json.tmp");
        let write_error = |e: std::io::Error| IntegrityError::FileWriteError {
            path: self.tasks_file.display().to_string(),
            reason: e.to_string(),
        };

        fs::write(&temp, content).await.map_err(write_error)?;
        fs::rename(&temp, &self.tasks_file).await.map_err(write_error)
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn initialize(&self) -> IntegrityResult<()> {
        fs::create_dir_all(self.tasks_dir.join("tasks")).await?;

        if !self.tasks_file.exists() {
            let mut document = TasksDocument::new();
            let mut master = Tag::new(DEFAULT_TAG);
            master.metadata = Some(TagMetadata {
                created: Some(Utc::now()),
                ..Default::default()
            });
            document.insert(master);
            self.write_tasks_file(&document.to_value()?).await?;
            tracing::info!(path = %self.tasks_file.display(), "Initialized task storage");
        }

        Ok(())
    }

    fn storage_type(&self) -> &'static str {
        "file"
    }

    async fn is_initialized(&self) -> IntegrityResult<bool> {
        Ok(self.tasks_dir.exists() && self.tasks_file.exists())
    }

    async fn load_document(&self) -> IntegrityResult<TasksDocument> {
        let data = self.read_tasks_file().await?;
        TasksDocument::from_value(data)
    }

    async fn load_tag(&self, name: &str) -> IntegrityResult<Tag> {
        self.load_document().await?.snapshot(name)
    }

    async fn save_tags(&self, tags: &[&Tag]) -> IntegrityResult<()> {
        if tags.is_empty() {
            return Ok(());
        }

        // A legacy file is rewritten in the tagged layout on first save.
        let mut document = match self.load_document().await {
            Ok(document) => document,
            Err(IntegrityError::NotInitialized) => TasksDocument::new(),
            Err(e) => return Err(e),
        };

        let now = Utc::now();
        for tag in tags {
            let mut tag = (*tag).clone();
            tag.touch(now);
            tracing::debug!(tag = %tag.name, tasks = tag.task_count(), "Saving tag");
            document.insert(tag);
        }

        self.write_tasks_file(&document.to_value()?).await
    }

    async fn get_all_tags(&self) -> IntegrityResult<Vec<String>> {
        Ok(self.load_document().await?.tag_names())
    }

    async fn tag_exists(&self, name: &str) -> IntegrityResult<bool> {
        Ok(self.load_document().await?.contains(name))
    }
}
