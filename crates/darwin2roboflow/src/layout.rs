// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Local dataset cache layout.
//!
//! Darwin keeps pulled datasets under a cache root (`~/.darwin/datasets` by
//! default) laid out as:
//!
//! ```text
//! <cache_root>/
//! └── <workspace>/
//!     └── <dataset>/
//!         ├── images/
//!         │   ├── *.jpg              (image datasets)
//!         │   └── <video>/           (video datasets, one folder per video)
//!         │       ├── 0000000.png
//!         │       └── coco.json      (written by the partitioner)
//!         └── releases/
//!             └── <release>/
//!                 └── coco.json
//! ```
//!
//! Resolution only inspects the local filesystem.

use crate::Error;
use log::{debug, warn};
use std::path::{Path, PathBuf};

/// Canonical name of an extracted COCO annotation file.
pub const ANNOTATION_FILE_NAME: &str = "coco.json";

/// Resolves the [`DatasetLayout`] of a dataset inside the cache root.
#[derive(Debug, Clone)]
pub struct DatasetLocator {
    cache_root: PathBuf,
    workspace: Option<String>,
}

impl DatasetLocator {
    /// Create a locator for `cache_root`. Without a workspace, the first
    /// workspace directory found under the cache root is used.
    pub fn new(cache_root: impl Into<PathBuf>, workspace: Option<String>) -> Self {
        Self {
            cache_root: cache_root.into(),
            workspace,
        }
    }

    /// Resolve the layout of `dataset`.
    ///
    /// Fails with [`Error::ConfigurationError`] when no workspace was given
    /// and the cache root is missing or holds no workspace directory.
    pub fn resolve(&self, dataset: &str) -> Result<DatasetLayout, Error> {
        let workspace = match &self.workspace {
            Some(workspace) => workspace.clone(),
            None => self.discover_workspace()?,
        };

        let root = self.cache_root.join(&workspace).join(dataset);
        debug!("Resolved dataset '{}' to {:?}", dataset, root);

        Ok(DatasetLayout {
            workspace,
            dataset: dataset.to_string(),
            images_dir: root.join("images"),
            releases_dir: root.join("releases"),
            root,
        })
    }

    fn discover_workspace(&self) -> Result<String, Error> {
        if !self.cache_root.is_dir() {
            return Err(Error::ConfigurationError(format!(
                "dataset cache root {:?} does not exist",
                self.cache_root
            )));
        }

        let workspaces = subdirectories(&self.cache_root)?;
        let first = workspaces.first().ok_or_else(|| {
            Error::ConfigurationError(format!(
                "dataset cache root {:?} contains no workspace",
                self.cache_root
            ))
        })?;

        let name = first
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                Error::ConfigurationError(format!("invalid workspace directory {:?}", first))
            })?;

        if workspaces.len() > 1 {
            warn!(
                "Found {} workspaces under {:?}, using '{}'. Set the workspace name to pick another.",
                workspaces.len(),
                self.cache_root,
                name
            );
        }

        Ok(name)
    }
}

/// Resolved directories of one dataset in the local cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    /// Workspace (team) directory name.
    pub workspace: String,
    /// Dataset directory name.
    pub dataset: String,
    /// `<cache_root>/<workspace>/<dataset>`
    pub root: PathBuf,
    /// `<root>/images`
    pub images_dir: PathBuf,
    /// `<root>/releases`
    pub releases_dir: PathBuf,
}

impl DatasetLayout {
    /// Directory holding the extracted contents of release `name`.
    pub fn release_dir(&self, name: &str) -> PathBuf {
        self.releases_dir.join(name)
    }

    /// Canonical COCO annotation file of release `name`.
    pub fn annotation_path(&self, name: &str) -> PathBuf {
        self.release_dir(name).join(ANNOTATION_FILE_NAME)
    }

    /// One folder per pulled video, sorted by name. Empty when nothing has
    /// been pulled yet.
    pub fn video_folders(&self) -> Result<Vec<PathBuf>, Error> {
        if !self.images_dir.is_dir() {
            return Ok(Vec::new());
        }
        subdirectories(&self.images_dir)
    }

    /// Remove the local release and image caches. Missing directories are
    /// ignored.
    pub fn clear(&self) -> Result<(), Error> {
        for dir in [&self.releases_dir, &self.images_dir] {
            if dir.exists() {
                debug!("Removing {:?}", dir);
                std::fs::remove_dir_all(dir)?;
            }
        }
        Ok(())
    }
}

/// Immediate subdirectories of `dir`, sorted by name.
pub(crate) fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut dirs = Vec::new();
    for entry in walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        }
    }
    Ok(dirs)
}
