//! Typed application configuration (`spec.md` §6, "Environment inputs"):
//! a cluster context handle, overlay directory, log level, data
//! directory, and per-class deployment-time SLO overrides.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::weights::PlacementWeights;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub cluster_context: Option<String>,
    pub overlay_dir: PathBuf,
    pub data_dir: PathBuf,
    pub log_level: String,
    pub placement_weights: PlacementWeights,
    /// Per-class deployment-time SLO overrides, in seconds
    /// (`spec.md` §6). Keyed by the lowercase class name.
    pub deployment_timeout_overrides_secs: HashMap<String, u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cluster_context: None,
            overlay_dir: PathBuf::from("./overlay"),
            data_dir: PathBuf::from("./data"),
            log_level: "info".to_owned(),
            placement_weights: PlacementWeights::default(),
            deployment_timeout_overrides_secs: HashMap::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl AppConfig {
    /// Loads from an optional YAML file, then overlays environment
    /// variables, matching the teacher's `CfgSyncConfig::load_from_file`
    /// + environment-override layering.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match mano_env::config_file() {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_env_overrides(&mut self) {
        if let Some(level) = mano_env::log_level() {
            self.log_level = level;
        }
        if let Some(dir) = mano_env::data_dir() {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = mano_env::overlay_dir() {
            self.overlay_dir = PathBuf::from(dir);
        }
        if let Some(ctx) = mano_env::cluster_context() {
            self.cluster_context = Some(ctx);
        }
    }

    #[must_use]
    pub fn deployment_timeout(&self, class: mano_core::SliceClass) -> std::time::Duration {
        let key = class.as_str().to_ascii_lowercase();
        self.deployment_timeout_overrides_secs
            .get(&key)
            .map(|secs| std::time::Duration::from_secs(*secs))
            .unwrap_or_else(|| crate::class_profile::deployment_timeout(class))
    }
}
