// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! V7 Darwin source adapter.
//!
//! Talks to the Darwin REST API with an API key:
//!
//! - `GET /api/datasets` to resolve a dataset by name or slug
//! - `GET /api/datasets/{id}/exports` to find a named release
//! - the release `download_url` for the export archive
//!
//! Syncing a release reads the Darwin JSON files inside its archive (both
//! the 2.0 `item.slots` layout and the legacy 1.0 `image` section) and
//! downloads every referenced file that is not yet in the local cache.

use crate::{
    Error,
    config::DarwinConfig,
    layout::ANNOTATION_FILE_NAME,
    platform::{
        SourceDataset, SourcePlatform, SourceRelease, http_client, read_json, write_body,
    },
};
use log::{debug, info, warn};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::{Deserialize, de::DeserializeOwned};
use std::{
    collections::HashSet,
    fs::File,
    io::Read as _,
    path::{Component, Path, PathBuf},
};
use url::Url;

/// Darwin API client.
///
/// Cheap to clone; dataset and release handles keep their own copy.
#[derive(Clone)]
pub struct DarwinClient {
    http: reqwest::Client,
    url: Url,
    api_key: String,
}

impl std::fmt::Debug for DarwinClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DarwinClient")
            .field("url", &self.url.as_str())
            .finish()
    }
}

impl DarwinClient {
    /// Create a client for the Darwin instance at `server`.
    pub fn new(server: &str, api_key: &str, timeout_secs: u64) -> Result<Self, Error> {
        Ok(DarwinClient {
            http: http_client(timeout_secs)?,
            url: Url::parse(server)?,
            api_key: api_key.to_string(),
        })
    }

    /// Create a client from the `[darwin]` configuration section.
    pub fn from_config(config: &DarwinConfig, timeout_secs: u64) -> Result<Self, Error> {
        Self::new(&config.server, &config.api_key, timeout_secs)
    }

    async fn get_api<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url.join(&format!("api/{}", path))?;
        debug!("GET {}", url);

        let res = self
            .http
            .get(url)
            .header(AUTHORIZATION, format!("ApiKey {}", self.api_key))
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        read_json(res).await
    }

    /// Download `url` into `destination`. The API key is only attached for
    /// files served by the Darwin instance itself; pre-signed storage URLs
    /// reject a second authorization scheme.
    async fn download_file(&self, url: &str, destination: &Path) -> Result<u64, Error> {
        let url = Url::parse(url)?;
        let same_origin = url.host_str() == self.url.host_str()
            && url.port_or_known_default() == self.url.port_or_known_default();

        let mut req = self.http.get(url);
        if same_origin {
            req = req.header(AUTHORIZATION, format!("ApiKey {}", self.api_key));
        }

        write_body(req.send().await?, destination).await
    }
}

/// Dataset entry returned by `GET /api/datasets`.
#[derive(Debug, Clone, Deserialize)]
pub struct DarwinDatasetInfo {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}

/// Export entry returned by `GET /api/datasets/{id}/exports`.
#[derive(Debug, Clone, Deserialize)]
pub struct DarwinExport {
    pub name: String,
    /// Unset while Darwin is still generating the export.
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
}

/// Handle to a remote Darwin dataset.
#[derive(Debug, Clone)]
pub struct DarwinDataset {
    client: DarwinClient,
    info: DarwinDatasetInfo,
}

impl DarwinDataset {
    pub fn info(&self) -> &DarwinDatasetInfo {
        &self.info
    }
}

/// Handle to one export of a Darwin dataset.
#[derive(Debug, Clone)]
pub struct DarwinRelease {
    client: DarwinClient,
    export: DarwinExport,
}

impl DarwinRelease {
    pub fn export(&self) -> &DarwinExport {
        &self.export
    }

    fn download_url(&self) -> Result<&str, Error> {
        self.export.download_url.as_deref().ok_or_else(|| {
            Error::InvalidResponse(format!(
                "release '{}' has no download URL, it may still be exporting",
                self.export.name
            ))
        })
    }
}

impl SourcePlatform for DarwinClient {
    type Dataset = DarwinDataset;

    async fn resolve_dataset(&self, name: &str) -> Result<DarwinDataset, Error> {
        let datasets: Vec<DarwinDatasetInfo> = self.get_api("datasets").await?;
        let info = datasets
            .into_iter()
            .find(|d| d.name == name || d.slug.as_deref() == Some(name))
            .ok_or_else(|| Error::NotFound(format!("Darwin dataset '{}'", name)))?;

        debug!("Resolved Darwin dataset '{}' to id {}", name, info.id);
        Ok(DarwinDataset {
            client: self.clone(),
            info,
        })
    }
}

impl SourceDataset for DarwinDataset {
    type Release = DarwinRelease;

    async fn fetch_release(&self, release_name: &str) -> Result<DarwinRelease, Error> {
        let exports: Vec<DarwinExport> = self
            .client
            .get_api(&format!("datasets/{}/exports", self.info.id))
            .await?;

        let export = exports
            .into_iter()
            .find(|e| e.name == release_name)
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "release '{}' of Darwin dataset '{}'",
                    release_name, self.info.name
                ))
            })?;

        let release = DarwinRelease {
            client: self.client.clone(),
            export,
        };
        release.download_url()?;
        Ok(release)
    }
}

impl SourceRelease for DarwinRelease {
    async fn sync(
        &self,
        images_dir: &Path,
        remove_extra: bool,
        split_video_frames: bool,
    ) -> Result<(), Error> {
        info!(
            "Syncing release '{}' into {:?}",
            self.export.name, images_dir
        );
        tokio::fs::create_dir_all(images_dir).await?;

        let temp_dir = tempfile::TempDir::new()?;
        let archive = self
            .download_archive(&temp_dir.path().join("release.zip"))
            .await?;
        let items = read_release_items(&archive)?;
        let planned = plan_downloads(&items, images_dir, split_video_frames);

        let mut fetched = 0usize;
        for file in &planned {
            if file.path.exists() {
                continue;
            }
            self.client.download_file(&file.url, &file.path).await?;
            fetched += 1;
        }

        info!(
            "Release '{}': {} items, {} files downloaded, {} already present",
            self.export.name,
            items.len(),
            fetched,
            planned.len() - fetched
        );

        if remove_extra {
            let keep: HashSet<&Path> = planned.iter().map(|f| f.path.as_path()).collect();
            let removed = remove_extra_files(images_dir, &keep)?;
            info!("Removed {} files not referenced by the release", removed);
        }

        Ok(())
    }

    async fn download_archive(&self, destination: &Path) -> Result<PathBuf, Error> {
        let url = self.download_url()?;
        debug!("Downloading release '{}' archive", self.export.name);
        self.client.download_file(url, destination).await?;
        Ok(destination.to_path_buf())
    }
}

/// Darwin JSON item file, either format version.
#[derive(Debug, Deserialize)]
struct ItemFile {
    #[serde(default)]
    item: Option<ItemV2>,
    #[serde(default)]
    image: Option<ImageV1>,
}

#[derive(Debug, Deserialize)]
struct ItemV2 {
    name: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    slots: Vec<SlotV2>,
}

#[derive(Debug, Deserialize)]
struct SlotV2 {
    #[serde(default)]
    source_files: Vec<SourceFileV2>,
    #[serde(default)]
    frame_urls: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct SourceFileV2 {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ImageV1 {
    filename: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    frame_urls: Option<Vec<String>>,
}

/// A remote item referenced by a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RemoteItem {
    pub name: String,
    /// Folder path inside the dataset, `/` for the root.
    pub path: String,
    pub url: Option<String>,
    pub frame_urls: Vec<String>,
}

impl ItemFile {
    fn into_item(self) -> Option<RemoteItem> {
        if let Some(item) = self.item {
            // Multi-slot items are reduced to their first slot.
            let slot = item.slots.into_iter().next();
            let (url, frame_urls) = match slot {
                Some(slot) => (
                    slot.source_files.into_iter().next().map(|f| f.url),
                    slot.frame_urls.unwrap_or_default(),
                ),
                None => (None, Vec::new()),
            };
            return Some(RemoteItem {
                name: item.name,
                path: item.path.unwrap_or_else(|| "/".to_string()),
                url,
                frame_urls,
            });
        }

        self.image.map(|image| RemoteItem {
            name: image.filename,
            path: image.path.unwrap_or_else(|| "/".to_string()),
            url: image.url,
            frame_urls: image.frame_urls.unwrap_or_default(),
        })
    }
}

/// A file to fetch into the image cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlannedFile {
    pub path: PathBuf,
    pub url: String,
}

/// Parse every Darwin JSON item file inside a release archive.
pub(crate) fn read_release_items(archive: &Path) -> Result<Vec<RemoteItem>, Error> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)?;
    let mut items = Vec::new();

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let name = entry.name().to_string();
        if entry.is_dir() || !name.ends_with(".json") {
            continue;
        }

        let mut contents = String::new();
        entry.read_to_string(&mut contents)?;

        match serde_json::from_str::<ItemFile>(&contents) {
            Ok(item_file) => match item_file.into_item() {
                Some(item) => items.push(item),
                None => debug!("Skipping {}: not an item file", name),
            },
            Err(err) => debug!("Skipping {}: {}", name, err),
        }
    }

    Ok(items)
}

/// Map release items to local paths under `images_dir`.
///
/// Video items with frame URLs become `<path>/<stem>/<frame:07>.png` when
/// `split_video_frames` is set; everything else is stored under its own
/// name.
pub(crate) fn plan_downloads(
    items: &[RemoteItem],
    images_dir: &Path,
    split_video_frames: bool,
) -> Vec<PlannedFile> {
    let mut planned = Vec::new();

    for item in items {
        let dir = item_dir(images_dir, &item.path);

        if split_video_frames && !item.frame_urls.is_empty() {
            let stem = Path::new(&item.name)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| item.name.clone());
            let folder = dir.join(stem);
            for (index, url) in item.frame_urls.iter().enumerate() {
                planned.push(PlannedFile {
                    path: folder.join(format!("{:07}.png", index)),
                    url: url.clone(),
                });
            }
        } else if let Some(url) = &item.url {
            planned.push(PlannedFile {
                path: dir.join(&item.name),
                url: url.clone(),
            });
        } else {
            warn!("Item '{}' has no downloadable file, skipping", item.name);
        }
    }

    planned
}

/// Join a Darwin folder path onto `images_dir`, dropping anything that
/// could escape it.
fn item_dir(images_dir: &Path, path: &str) -> PathBuf {
    Path::new(path.trim_start_matches('/'))
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .fold(images_dir.to_path_buf(), |dir, part| dir.join(part))
}

/// Delete files under `images_dir` that are not in `keep`. Partition
/// annotation files are left alone.
fn remove_extra_files(images_dir: &Path, keep: &HashSet<&Path>) -> Result<usize, Error> {
    let mut removed = 0;
    for entry in walkdir::WalkDir::new(images_dir).min_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file()
            || keep.contains(entry.path())
            || entry.file_name() == ANNOTATION_FILE_NAME
        {
            continue;
        }

        debug!("Removing {:?}", entry.path());
        std::fs::remove_file(entry.path())?;
        removed += 1;
    }
    Ok(removed)
}
