// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Transfer configuration.
//!
//! Credentials and dataset identifiers are static configuration rather than
//! invocation parameters. They are loaded once from an optional file and the
//! environment, validated, and then passed into the transfer routine.
//!
//! # Sources
//!
//! Later sources override earlier ones:
//!
//! 1. The configuration file (TOML, JSON or YAML, chosen by extension).
//! 2. Environment variables prefixed with `DARWIN2ROBOFLOW`, using `__` to
//!    separate sections, e.g. `DARWIN2ROBOFLOW_DARWIN__API_KEY`.
//!
//! # Example
//!
//! ```toml
//! [darwin]
//! api_key = "..."
//! dataset_name = "traffic-cams"
//! json_export_name = "json-v1"
//! coco_export_name = "coco-v1"
//!
//! [roboflow]
//! api_key = "..."
//! project_id = "traffic-cams-rf"
//! ```

use crate::Error;
use directories::BaseDirs;
use log::debug;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "DARWIN2ROBOFLOW";

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "darwin2roboflow.toml";

/// Source platform settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DarwinConfig {
    /// Darwin API key with dataset read and export permissions.
    pub api_key: String,
    /// Dataset name as shown in Darwin.
    pub dataset_name: String,
    /// Release created with the Darwin JSON format, used to pull the data.
    pub json_export_name: String,
    /// Release created with the COCO format, used for the annotations.
    pub coco_export_name: String,
    /// Workspace (team) directory inside the cache root. Only needed with
    /// more than one workspace.
    #[serde(default)]
    pub workspace_name: Option<String>,
    /// Local dataset cache, `~/.darwin/datasets` when unset.
    #[serde(default)]
    pub cache_root: Option<PathBuf>,
    #[serde(default = "default_darwin_server")]
    pub server: String,
}

/// Destination platform settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RoboflowConfig {
    /// Roboflow private API key.
    pub api_key: String,
    /// Project ID, which may differ from the project's display name.
    pub project_id: String,
    /// Workspace URL slug, the key's default workspace when unset.
    #[serde(default)]
    pub workspace_name: Option<String>,
    #[serde(default = "default_roboflow_server")]
    pub server: String,
    /// Dataset split assigned to uploaded images.
    #[serde(default = "default_split")]
    pub split: String,
}

/// Complete configuration record for one transfer.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferConfig {
    pub darwin: DarwinConfig,
    pub roboflow: RoboflowConfig,
    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_darwin_server() -> String {
    "https://darwin.v7labs.com".to_string()
}

fn default_roboflow_server() -> String {
    "https://api.roboflow.com".to_string()
}

fn default_split() -> String {
    "train".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl TransferConfig {
    /// Load configuration from `path` (optional unless given explicitly) and
    /// the environment, then validate it.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: TransferConfig = settings.try_deserialize()?;
        config.validate()?;
        debug!(
            "Loaded configuration for Darwin dataset '{}' -> Roboflow project '{}'",
            config.darwin.dataset_name, config.roboflow.project_id
        );
        Ok(config)
    }

    /// Reject empty values and the `YOUR_...` placeholders of the sample
    /// configuration.
    pub fn validate(&self) -> Result<(), Error> {
        let required = [
            ("darwin.api_key", &self.darwin.api_key),
            ("darwin.dataset_name", &self.darwin.dataset_name),
            ("darwin.json_export_name", &self.darwin.json_export_name),
            ("darwin.coco_export_name", &self.darwin.coco_export_name),
            ("darwin.server", &self.darwin.server),
            ("roboflow.api_key", &self.roboflow.api_key),
            ("roboflow.project_id", &self.roboflow.project_id),
            ("roboflow.server", &self.roboflow.server),
            ("roboflow.split", &self.roboflow.split),
        ];

        for (key, value) in required {
            if is_placeholder(value) {
                return Err(Error::ConfigurationError(format!(
                    "{} is missing or still a placeholder",
                    key
                )));
            }
        }

        let optional = [
            ("darwin.workspace_name", &self.darwin.workspace_name),
            ("roboflow.workspace_name", &self.roboflow.workspace_name),
        ];
        for (key, value) in optional {
            if let Some(value) = value
                && is_placeholder(value)
            {
                return Err(Error::ConfigurationError(format!(
                    "{} is set to a placeholder, remove it or set a real name",
                    key
                )));
            }
        }

        if self.timeout_secs == 0 {
            return Err(Error::ConfigurationError(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// The Darwin dataset cache root, defaulting to `~/.darwin/datasets`.
    pub fn cache_root(&self) -> Result<PathBuf, Error> {
        if let Some(root) = &self.darwin.cache_root {
            return Ok(root.clone());
        }

        let dirs = BaseDirs::new().ok_or_else(|| {
            Error::ConfigurationError("could not determine the home directory".to_string())
        })?;
        Ok(dirs.home_dir().join(".darwin").join("datasets"))
    }
}

fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || value.starts_with("YOUR_")
}
