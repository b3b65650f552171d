//! Configuration domain facade.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::entities::{GlobalConfig, IntegrityConfig, TasksConfig};
use crate::errors::{IntegrityError, IntegrityResult};

/// Configuration domain facade (`.tasks/config.json`)
pub struct ConfigDomain {
    config_path: PathBuf,
}

impl ConfigDomain {
    /// Create a new config domain
    pub fn new(project_path: impl AsRef<Path>) -> Self {
        Self {
            config_path: project_path.as_ref().join(".tasks/config.json"),
        }
    }

    /// Path of the config file
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Load configuration; a missing file yields defaults
    pub async fn load(&self) -> IntegrityResult<TasksConfig> {
        match fs::read_to_string(&self.config_path).await {
            Ok(content) => {
                let config: TasksConfig = serde_json::from_str(&content)?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(TasksConfig::default()),
            Err(e) => Err(IntegrityError::FileReadError {
                path: self.config_path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Save configuration
    pub async fn save(&self, config: &TasksConfig) -> IntegrityResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            IntegrityError::FileWriteError {
                path: self.config_path.display().to_string(),
                reason: e.to_string(),
            }
        })
    }

    /// Get global settings
    pub async fn get_global_settings(&self) -> IntegrityResult<GlobalConfig> {
        Ok(self.load().await?.global)
    }

    /// Get integrity engine settings
    pub async fn get_integrity_settings(&self) -> IntegrityResult<IntegrityConfig> {
        Ok(self.load().await?.integrity)
    }

    /// Set the tag used when none is given
    pub async fn set_default_tag(&self, tag: impl Into<String>) -> IntegrityResult<()> {
        let mut config = self.load().await?;
        config.global.default_tag = tag.into();
        self.save(&config).await
    }
}
