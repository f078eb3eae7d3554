// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! The transfer routine.
//!
//! A run walks through fixed phases in order:
//!
//! 1. resolve the local dataset layout
//! 2. optionally clear the local image and release caches
//! 3. sync the dataset images from the Darwin JSON release
//! 4. download and extract the COCO release into `releases/<name>/coco.json`
//! 5. upload, either one folder at a time with per-folder annotations
//!    (video datasets) or the whole image directory at once
//!
//! Extraction failures in phase 4 are logged and the run continues. Any
//! other error ends the run.

use crate::{
    DarwinClient, Error, RoboflowClient,
    archive::extract_release_archive,
    coco::write_folder_annotations,
    config::TransferConfig,
    layout::{DatasetLayout, DatasetLocator},
    platform::{DestinationPlatform, SourceDataset, SourcePlatform, SourceRelease},
    upload::{Progress, UploadOutcome, Uploader},
};
use log::{error, info};
use std::path::PathBuf;
use tokio::sync::mpsc::Sender;

/// Archive name used while downloading a COCO release.
const ARCHIVE_NAME: &str = "dataset.zip";

/// Flags of one transfer run. All default to off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferOptions {
    /// The dataset holds videos; upload them as per-video frame folders.
    pub video: bool,
    /// Delete local files not referenced by the Darwin release.
    pub remove_unannotated: bool,
    /// Replace existing annotations in Roboflow instead of merging.
    pub overwrite: bool,
    /// Remove the local image and release caches before pulling.
    pub clear_cache: bool,
}

/// A configured transfer between a source and a destination platform.
pub struct Transfer<'a, S, D> {
    config: &'a TransferConfig,
    source: &'a S,
    destination: &'a D,
    progress: Option<Sender<Progress>>,
}

impl<'a, S, D> Transfer<'a, S, D>
where
    S: SourcePlatform,
    D: DestinationPlatform,
{
    /// Create a transfer from `source` to `destination` driven by `config`.
    pub fn new(config: &'a TransferConfig, source: &'a S, destination: &'a D) -> Self {
        Self {
            config,
            source,
            destination,
            progress: None,
        }
    }

    /// Forward per-image upload progress to `progress`.
    pub fn with_progress(self, progress: Option<Sender<Progress>>) -> Self {
        Self { progress, ..self }
    }

    /// Resolve where the dataset lives in the local cache.
    pub fn layout(&self) -> Result<DatasetLayout, Error> {
        let locator = DatasetLocator::new(
            self.config.cache_root()?,
            self.config.darwin.workspace_name.clone(),
        );
        locator.resolve(&self.config.darwin.dataset_name)
    }

    /// Run every phase and return the per-image upload outcomes.
    pub async fn run(&self, options: TransferOptions) -> Result<Vec<UploadOutcome>, Error> {
        let darwin = &self.config.darwin;
        let roboflow = &self.config.roboflow;
        let layout = self.layout()?;
        info!("Using local dataset cache {:?}", layout.root);

        if options.clear_cache {
            info!("Clearing local dataset cache");
            layout.clear()?;
        }

        info!(
            "Downloading dataset from V7 Darwin dataset '{}'",
            darwin.dataset_name
        );
        let dataset = self.source.resolve_dataset(&darwin.dataset_name).await?;
        let release = dataset.fetch_release(&darwin.json_export_name).await?;
        release
            .sync(&layout.images_dir, options.remove_unannotated, true)
            .await?;

        info!(
            "Downloading COCO annotations from V7 Darwin dataset '{}'",
            darwin.dataset_name
        );
        let coco_release = dataset.fetch_release(&darwin.coco_export_name).await?;
        let annotation_path = self
            .pull_annotations(&layout, &coco_release, &darwin.coco_export_name)
            .await?;

        info!(
            "Uploading data and annotations to Roboflow project '{}'",
            roboflow.project_id
        );
        let project = self
            .destination
            .resolve_project(roboflow.workspace_name.as_deref(), &roboflow.project_id)
            .await?;
        let uploader = Uploader::new(&project).with_progress(self.progress.clone());

        let outcomes = if options.video {
            let folders = write_folder_annotations(&annotation_path, &layout.images_dir)?;
            let mut outcomes = Vec::new();
            for (folder, folder_annotation) in folders {
                info!("Uploading video folder '{}'", folder);
                let folder_dir = layout.images_dir.join(&folder);
                outcomes.extend(
                    uploader
                        .upload_all(&folder_dir, &folder_annotation, options.overwrite)
                        .await?,
                );
            }
            outcomes
        } else {
            uploader
                .upload_all(&layout.images_dir, &annotation_path, options.overwrite)
                .await?
        };

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        info!(
            "Processed {} images for Roboflow project '{}' ({} failed)",
            outcomes.len(),
            roboflow.project_id,
            failed
        );
        Ok(outcomes)
    }

    /// Fetch the COCO release into a fresh `releases/<name>/` directory.
    ///
    /// Returns the canonical annotation path even when extraction failed, in
    /// which case reading it later surfaces the missing file.
    async fn pull_annotations<R: SourceRelease>(
        &self,
        layout: &DatasetLayout,
        release: &R,
        release_name: &str,
    ) -> Result<PathBuf, Error> {
        let release_dir = layout.release_dir(release_name);
        if release_dir.exists() {
            std::fs::remove_dir_all(&release_dir)?;
        }
        std::fs::create_dir_all(&release_dir)?;

        let archive = release
            .download_archive(&release_dir.join(ARCHIVE_NAME))
            .await?;
        match extract_release_archive(&archive, &release_dir) {
            Ok(path) => info!("COCO annotations stored at {:?}", path),
            Err(err @ Error::ExtractionError(_)) => {
                error!("An error occurred while extracting the COCO annotations: {}", err)
            }
            Err(err) => return Err(err),
        }

        Ok(layout.annotation_path(release_name))
    }
}

/// Run a transfer against the live Darwin and Roboflow APIs described by
/// `config`.
pub async fn run_transfer(
    config: &TransferConfig,
    options: TransferOptions,
    progress: Option<Sender<Progress>>,
) -> Result<Vec<UploadOutcome>, Error> {
    let source = DarwinClient::from_config(&config.darwin, config.timeout_secs)?;
    let destination = RoboflowClient::from_config(&config.roboflow, config.timeout_secs)?;

    Transfer::new(config, &source, &destination)
        .with_progress(progress)
        .run(options)
        .await
}
