// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Roboflow destination adapter.
//!
//! Uses the Roboflow REST API with a private API key passed as the
//! `api_key` query parameter:
//!
//! - `GET /` reports the key's default workspace
//! - `GET /{workspace}/{project}` resolves a project
//! - `POST /dataset/{project}/upload` uploads one image (multipart `file`)
//! - `POST /dataset/{project}/annotate/{image_id}` attaches an annotation
//!   file to an uploaded image
//!
//! Images are uploaded from their absolute path; the working directory of
//! the process is never changed.

use crate::{
    Error,
    config::RoboflowConfig,
    platform::{DestinationPlatform, DestinationProject, IngestResult, http_client, read_json},
};
use log::debug;
use reqwest::{
    Body,
    header::CONTENT_TYPE,
    multipart::{Form, Part},
};
use serde::Deserialize;
use std::path::Path;
use tokio_util::codec::{BytesCodec, FramedRead};
use url::Url;

/// Roboflow API client.
#[derive(Clone)]
pub struct RoboflowClient {
    http: reqwest::Client,
    url: Url,
    api_key: String,
    split: String,
}

impl std::fmt::Debug for RoboflowClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoboflowClient")
            .field("url", &self.url.as_str())
            .field("split", &self.split)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct WorkspaceInfo {
    #[serde(default)]
    workspace: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProjectEnvelope {
    project: ProjectInfo,
}

/// Project description returned by `GET /{workspace}/{project}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectInfo {
    /// `"<workspace>/<project>"`
    pub id: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    duplicate: Option<bool>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

impl RoboflowClient {
    /// Create a client for the Roboflow API at `server`.
    pub fn new(server: &str, api_key: &str, timeout_secs: u64) -> Result<Self, Error> {
        Ok(RoboflowClient {
            http: http_client(timeout_secs)?,
            url: Url::parse(server)?,
            api_key: api_key.to_string(),
            split: "train".to_string(),
        })
    }

    /// Create a client from the `[roboflow]` configuration section.
    pub fn from_config(config: &RoboflowConfig, timeout_secs: u64) -> Result<Self, Error> {
        Ok(Self::new(&config.server, &config.api_key, timeout_secs)?.with_split(&config.split))
    }

    /// Returns a client that assigns uploads to `split`.
    pub fn with_split(self, split: &str) -> Self {
        Self {
            split: split.to_string(),
            ..self
        }
    }

    /// Build an API URL from path segments plus query parameters; the API
    /// key is always appended.
    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, Error> {
        let mut url = self.url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::ConfigurationError(format!("invalid Roboflow server {}", self.url)))?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut()
            .append_pair("api_key", &self.api_key)
            .extend_pairs(query);
        Ok(url)
    }

    async fn default_workspace(&self) -> Result<String, Error> {
        let res = self.http.get(self.endpoint(&[], &[])?).send().await?;
        let info: WorkspaceInfo = read_json(res).await?;
        info.workspace.ok_or_else(|| {
            Error::InvalidResponse("API key is not associated with a workspace".to_string())
        })
    }
}

impl DestinationPlatform for RoboflowClient {
    type Project = RoboflowProject;

    async fn resolve_project(
        &self,
        workspace: Option<&str>,
        project_id: &str,
    ) -> Result<RoboflowProject, Error> {
        let workspace = match workspace {
            Some(workspace) => workspace.to_string(),
            None => self.default_workspace().await?,
        };
        // Accept both "project" and "workspace/project"
        let slug = project_id.rsplit('/').next().unwrap_or(project_id);

        let res = self
            .http
            .get(self.endpoint(&[workspace.as_str(), slug], &[])?)
            .send()
            .await?;
        if res.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!(
                "Roboflow project '{}' in workspace '{}'",
                slug, workspace
            )));
        }
        let envelope: ProjectEnvelope = read_json(res).await?;

        debug!("Resolved Roboflow project {}", envelope.project.id);
        Ok(RoboflowProject {
            client: self.clone(),
            workspace,
            slug: slug.to_string(),
            info: envelope.project,
        })
    }
}

/// Handle to a Roboflow project.
#[derive(Debug, Clone)]
pub struct RoboflowProject {
    client: RoboflowClient,
    workspace: String,
    slug: String,
    info: ProjectInfo,
}

impl RoboflowProject {
    pub fn workspace(&self) -> &str {
        &self.workspace
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn info(&self) -> &ProjectInfo {
        &self.info
    }

    async fn upload_image(&self, image_path: &Path) -> Result<UploadResponse, Error> {
        let name = file_name(image_path)?;
        let mime = infer::get_from_path(image_path)?
            .map(|kind| kind.mime_type())
            .unwrap_or("application/octet-stream");

        let file = tokio::fs::File::open(image_path).await?;
        let length = file.metadata().await?.len();
        let body = Body::wrap_stream(FramedRead::new(file, BytesCodec::new()));
        let part = Part::stream_with_length(body, length)
            .file_name(name.clone())
            .mime_str(mime)?;

        let client = &self.client;
        let url = client.endpoint(
            &["dataset", self.slug.as_str(), "upload"],
            &[("name", name.as_str()), ("split", client.split.as_str())],
        )?;
        let res = client
            .http
            .post(url)
            .multipart(Form::new().part("file", part))
            .send()
            .await?;

        read_json(res).await
    }

    async fn annotate(
        &self,
        image_id: &str,
        annotation_path: &Path,
        overwrite: bool,
    ) -> Result<AnnotateResponse, Error> {
        let name = file_name(annotation_path)?;
        let annotation = tokio::fs::read_to_string(annotation_path).await?;

        let client = &self.client;
        let url = client.endpoint(
            &["dataset", self.slug.as_str(), "annotate", image_id],
            &[
                ("name", name.as_str()),
                ("overwrite", if overwrite { "true" } else { "false" }),
            ],
        )?;
        let res = client
            .http
            .post(url)
            .header(CONTENT_TYPE, "text/plain")
            .body(annotation)
            .send()
            .await?;

        read_json(res).await
    }
}

impl DestinationProject for RoboflowProject {
    async fn ingest_single(
        &self,
        image_path: &Path,
        annotation_path: &Path,
        overwrite: bool,
    ) -> Result<IngestResult, Error> {
        let upload = self.upload_image(image_path).await?;
        if let Some(error) = upload.error {
            return Err(Error::UploadError(image_path.to_path_buf(), error.to_string()));
        }

        let duplicate = upload.duplicate.unwrap_or(false);
        if !duplicate && upload.success == Some(false) {
            return Err(Error::UploadError(
                image_path.to_path_buf(),
                "image upload was rejected".to_string(),
            ));
        }
        let image_id = upload.id.ok_or_else(|| {
            Error::InvalidResponse(format!("no image id returned for {:?}", image_path))
        })?;

        let annotated = self.annotate(&image_id, annotation_path, overwrite).await?;
        if let Some(error) = annotated.error {
            return Err(Error::UploadError(
                image_path.to_path_buf(),
                format!("annotation rejected: {}", error),
            ));
        }

        Ok(IngestResult {
            image_id,
            duplicate,
            annotated: annotated.success.unwrap_or(false),
        })
    }
}

fn file_name(path: &Path) -> Result<String, Error> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| Error::UploadError(path.to_path_buf(), "path has no file name".to_string()))
}
