//! Configuration entities.

use serde::{Deserialize, Serialize};

use super::reference::BareSubtaskReferences;
use super::tag::DEFAULT_TAG;
use crate::engine::DependencyPolicy;

/// Main configuration structure (`.tasks/config.json`)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TasksConfig {
    /// Global settings
    #[serde(default)]
    pub global: GlobalConfig,

    /// Integrity engine settings
    #[serde(default)]
    pub integrity: IntegrityConfig,
}

impl TasksConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }
}

/// Global configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Log level
    #[serde(default = "default_log_level", rename = "logLevel")]
    pub log_level: String,

    /// Tag used by the CLI when `--tag` is omitted
    #[serde(default = "default_tag", rename = "defaultTag")]
    pub default_tag: String,

    /// Project name
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "projectName"
    )]
    pub project_name: Option<String>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_tag() -> String {
    DEFAULT_TAG.to_string()
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            default_tag: default_tag(),
            project_name: None,
        }
    }
}

/// Settings consumed by the integrity engine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct IntegrityConfig {
    /// Meaning of a bare integer in a subtask's dependency list
    #[serde(default, rename = "bareSubtaskReferences")]
    pub bare_subtask_references: BareSubtaskReferences,

    /// Policy applied to cross-tag moves when the caller names none
    #[serde(default, rename = "crossTagPolicy")]
    pub cross_tag_policy: DependencyPolicy,
}
