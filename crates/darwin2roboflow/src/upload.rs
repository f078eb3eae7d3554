// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Directory uploads to a destination project.
//!
//! Only the files directly inside the given directory are considered.
//! Video frame folders are uploaded by separate calls, one per folder.

use crate::{
    Error,
    platform::{DestinationProject, IngestResult},
};
use log::{debug, error, info};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::Sender;

/// File extensions accepted by the destination, compared case-insensitively.
pub const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "tif", "tiff"];

/// Progress information for an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    /// Current number of completed items.
    pub current: usize,
    /// Total number of items to process.
    pub total: usize,
}

/// Outcome of uploading one image.
#[derive(Debug)]
pub struct UploadOutcome {
    /// Absolute path of the image.
    pub image: PathBuf,
    /// Ingestion result, or the [`Error::UploadError`] describing why the
    /// image was not ingested.
    pub result: Result<IngestResult, Error>,
}

impl UploadOutcome {
    /// Returns true when the image was ingested.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Returns true when `path` has an allow-listed image extension.
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}

/// Regular files directly inside `dir` with a supported extension, sorted
/// by file name.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut images = Vec::new();
    for entry in walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_file() && is_supported_image(entry.path()) {
            images.push(entry.into_path());
        } else {
            debug!("Not an image, skipping {:?}", entry.path());
        }
    }
    Ok(images)
}

/// Uploads every image of a directory, paired with one annotation file.
pub struct Uploader<'a, P> {
    project: &'a P,
    progress: Option<Sender<Progress>>,
}

impl<'a, P: DestinationProject> Uploader<'a, P> {
    /// Create an uploader for `project` without progress reporting.
    pub fn new(project: &'a P) -> Self {
        Self {
            project,
            progress: None,
        }
    }

    /// Report one [`Progress`] message per processed image.
    pub fn with_progress(self, progress: Option<Sender<Progress>>) -> Self {
        Self { progress, ..self }
    }

    /// Upload all images in `image_dir` with `annotation_path`.
    ///
    /// Returns one outcome per image. A failed image is logged and recorded
    /// in its outcome; the remaining images are still uploaded. Only a
    /// failure to read `image_dir` itself is returned as an error.
    pub async fn upload_all(
        &self,
        image_dir: &Path,
        annotation_path: &Path,
        overwrite: bool,
    ) -> Result<Vec<UploadOutcome>, Error> {
        let image_dir = std::path::absolute(image_dir)?;
        let annotation_path = std::path::absolute(annotation_path)?;
        let images = list_images(&image_dir)?;
        let total = images.len();

        info!(
            "Uploading {} images from {:?} with {:?}",
            total, image_dir, annotation_path
        );

        let mut outcomes = Vec::with_capacity(total);
        for (index, image) in images.into_iter().enumerate() {
            let result = match self
                .project
                .ingest_single(&image, &annotation_path, overwrite)
                .await
            {
                Ok(result) => {
                    info!("{:?}: {}", image, result);
                    Ok(result)
                }
                Err(err) => {
                    let err = match err {
                        Error::UploadError(..) => err,
                        other => Error::UploadError(image.clone(), other.to_string()),
                    };
                    error!("{}", err);
                    Err(err)
                }
            };
            outcomes.push(UploadOutcome { image, result });

            if let Some(progress) = &self.progress {
                let update = Progress {
                    current: index + 1,
                    total,
                };
                if progress.send(update).await.is_err() {
                    debug!("Progress receiver dropped");
                }
            }
        }

        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records submissions and fails any image whose name contains "bad".
    #[derive(Default)]
    struct RecordingProject {
        submitted: Mutex<Vec<(PathBuf, PathBuf, bool)>>,
    }

    impl DestinationProject for RecordingProject {
        async fn ingest_single(
            &self,
            image_path: &Path,
            annotation_path: &Path,
            overwrite: bool,
        ) -> Result<IngestResult, Error> {
            self.submitted.lock().unwrap().push((
                image_path.to_path_buf(),
                annotation_path.to_path_buf(),
                overwrite,
            ));

            let name = image_path.file_name().unwrap().to_string_lossy();
            if name.contains("bad") {
                return Err(Error::ApiError(400, "corrupt image".to_string()));
            }
            Ok(IngestResult {
                image_id: name.into_owned(),
                duplicate: false,
                annotated: true,
            })
        }
    }

    fn touch(dir: &Path, names: &[&str]) {
        for name in names {
            std::fs::write(dir.join(name), b"data").unwrap();
        }
    }

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_image(Path::new("a.jpg")));
        assert!(is_supported_image(Path::new("a.JPEG")));
        assert!(is_supported_image(Path::new("a.Tiff")));
        assert!(is_supported_image(Path::new("dir/a.bmp")));
        assert!(!is_supported_image(Path::new("coco.json")));
        assert!(!is_supported_image(Path::new("notes.txt")));
        assert!(!is_supported_image(Path::new("jpg")));
        assert!(!is_supported_image(Path::new("clip.mp4")));
    }

    #[test]
    fn test_list_images_filters_and_skips_subdirs() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), &["c.PNG", "a.jpg", "b.txt", "coco.json"]);
        let nested = temp_dir.path().join("video.png");
        std::fs::create_dir(&nested).unwrap();
        touch(&nested, &["0000000.png"]);

        let images = list_images(temp_dir.path()).unwrap();
        assert_eq!(
            images,
            vec![temp_dir.path().join("a.jpg"), temp_dir.path().join("c.PNG")]
        );
    }

    #[tokio::test]
    async fn test_upload_all_continues_after_failure() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), &["a.jpg", "bad.jpg", "c.png", "readme.txt"]);
        let annotation = temp_dir.path().join("coco.json");
        std::fs::write(&annotation, b"{\"images\":[]}").unwrap();

        let project = RecordingProject::default();
        let outcomes = Uploader::new(&project)
            .upload_all(temp_dir.path(), &annotation, true)
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_success());
        assert!(!outcomes[1].is_success());
        assert!(outcomes[2].is_success());
        match &outcomes[1].result {
            Err(Error::UploadError(path, msg)) => {
                assert_eq!(path, &temp_dir.path().join("bad.jpg"));
                assert!(msg.contains("corrupt image"));
            }
            other => panic!("unexpected result {:?}", other),
        }

        let submitted = project.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 3);
        assert!(submitted.iter().all(|(img, ann, overwrite)| {
            img.is_absolute() && ann == &annotation && *overwrite
        }));
    }

    #[tokio::test]
    async fn test_upload_all_reports_progress() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), &["a.jpg", "b.jpg"]);
        let annotation = temp_dir.path().join("coco.json");

        let (tx, mut rx) = tokio::sync::mpsc::channel(8);
        let project = RecordingProject::default();
        Uploader::new(&project)
            .with_progress(Some(tx))
            .upload_all(temp_dir.path(), &annotation, false)
            .await
            .unwrap();

        assert_eq!(rx.recv().await, Some(Progress { current: 1, total: 2 }));
        assert_eq!(rx.recv().await, Some(Progress { current: 2, total: 2 }));
    }

    #[tokio::test]
    async fn test_upload_all_empty_dir() {
        let temp_dir = TempDir::new().unwrap();
        let project = RecordingProject::default();
        let outcomes = Uploader::new(&project)
            .upload_all(temp_dir.path(), &temp_dir.path().join("coco.json"), false)
            .await
            .unwrap();
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_upload_all_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        let project = RecordingProject::default();
        let result = Uploader::new(&project)
            .upload_all(&temp_dir.path().join("nope"), Path::new("coco.json"), false)
            .await;
        assert!(result.is_err());
    }
}
