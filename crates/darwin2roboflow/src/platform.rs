// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Seams between the transfer routine and the two remote platforms.
//!
//! The source side mirrors how a Darwin dataset is reached: a dataset is
//! resolved by name, a named release of it is fetched, and the release can
//! either be synced into the local image cache or downloaded as an archive.
//! The destination side resolves a project and ingests one image with its
//! annotation file at a time.
//!
//! [`DarwinClient`](crate::DarwinClient) and
//! [`RoboflowClient`](crate::RoboflowClient) are the HTTP implementations;
//! tests substitute in-memory fakes.

use crate::Error;
use futures::StreamExt as _;
use log::{Level, debug, log_enabled, trace};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tokio::io::AsyncWriteExt as _;

/// Source platform entry point.
#[allow(async_fn_in_trait)]
pub trait SourcePlatform {
    type Dataset: SourceDataset;

    /// Look up a remote dataset by name.
    async fn resolve_dataset(&self, name: &str) -> Result<Self::Dataset, Error>;
}

/// A remote dataset on the source platform.
#[allow(async_fn_in_trait)]
pub trait SourceDataset {
    type Release: SourceRelease;

    /// Look up a named export (release) of this dataset.
    async fn fetch_release(&self, release_name: &str) -> Result<Self::Release, Error>;
}

/// A named export of a remote dataset.
#[allow(async_fn_in_trait)]
pub trait SourceRelease {
    /// Bring `images_dir` in line with the release contents.
    ///
    /// With `remove_extra`, local files the release does not reference are
    /// deleted. With `split_video_frames`, video items are stored as one
    /// folder of frames per video.
    async fn sync(
        &self,
        images_dir: &Path,
        remove_extra: bool,
        split_video_frames: bool,
    ) -> Result<(), Error>;

    /// Download the release archive to `destination` and return its path.
    async fn download_archive(&self, destination: &Path) -> Result<PathBuf, Error>;
}

/// Destination platform entry point.
#[allow(async_fn_in_trait)]
pub trait DestinationPlatform {
    type Project: DestinationProject;

    /// Resolve a project, using the account's default workspace when
    /// `workspace` is `None`.
    async fn resolve_project(
        &self,
        workspace: Option<&str>,
        project_id: &str,
    ) -> Result<Self::Project, Error>;
}

/// A project on the destination platform.
#[allow(async_fn_in_trait)]
pub trait DestinationProject {
    /// Upload one image together with an annotation file. With `overwrite`,
    /// existing annotations of the image are replaced instead of merged.
    async fn ingest_single(
        &self,
        image_path: &Path,
        annotation_path: &Path,
        overwrite: bool,
    ) -> Result<IngestResult, Error>;
}

/// Result of ingesting one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestResult {
    /// Identifier assigned by the destination.
    pub image_id: String,
    /// The destination already held this image.
    pub duplicate: bool,
    /// The annotation was accepted.
    pub annotated: bool,
}

impl std::fmt::Display for IngestResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "image {}", self.image_id)?;
        if self.duplicate {
            write!(f, " (duplicate)")?;
        }
        if self.annotated {
            write!(f, " annotated")?;
        }
        Ok(())
    }
}

/// Build the HTTP client shared by the platform adapters.
pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client, Error> {
    let http = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("darwin2roboflow/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(http)
}

/// Map non-success responses to [`Error::ApiError`] carrying the body.
pub(crate) async fn check_status(res: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let body = res.text().await.unwrap_or_default();
    debug!("Request failed with {}: {}", status, body);
    Err(Error::ApiError(status.as_u16(), body))
}

/// Read a JSON body, logging the raw payload when it does not parse.
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    res: reqwest::Response,
) -> Result<T, Error> {
    let body = check_status(res).await?.bytes().await?;

    if log_enabled!(Level::Trace) {
        trace!("Response: {}", String::from_utf8_lossy(&body));
    }

    match serde_json::from_slice(&body) {
        Ok(value) => Ok(value),
        Err(err) => {
            log::error!("Invalid JSON Response: {}", String::from_utf8_lossy(&body));
            Err(err.into())
        }
    }
}

/// Stream a response body into `destination`, creating parent directories.
pub(crate) async fn write_body(res: reqwest::Response, destination: &Path) -> Result<u64, Error> {
    let res = check_status(res).await?;

    if let Some(parent) = destination.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    // Sync treats any existing target as downloaded, so only complete
    // bodies may appear under the final name.
    let mut partial = destination.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    let mut file = tokio::fs::File::create(&partial).await?;
    let mut stream = res.bytes_stream();
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    drop(file);
    tokio::fs::rename(&partial, destination).await?;

    debug!("Wrote {} bytes to {:?}", written, destination);
    Ok(written)
}
