// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! End-to-end transfer runs against in-memory platforms.

use darwin2roboflow::{
    DarwinConfig, DestinationPlatform, DestinationProject, Error, IngestResult, RoboflowConfig,
    SourceDataset, SourcePlatform, SourceRelease, Transfer, TransferConfig, TransferOptions,
    coco::CocoReader,
};
use serde_json::json;
use std::{
    cell::RefCell,
    io::{Cursor, Write as _},
    path::{Path, PathBuf},
    rc::Rc,
};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

#[ctor::ctor]
fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .is_test(true)
        .try_init();
}

struct SourceState {
    images: Vec<(String, Vec<u8>)>,
    coco_archive: Vec<u8>,
    calls: RefCell<Vec<String>>,
}

#[derive(Clone)]
struct FakeSource {
    state: Rc<SourceState>,
}

struct FakeRelease {
    name: String,
    state: Rc<SourceState>,
}

impl FakeSource {
    fn new(images: &[&str], coco_archive: Vec<u8>) -> Self {
        Self {
            state: Rc::new(SourceState {
                images: images
                    .iter()
                    .map(|name| (name.to_string(), b"pixels".to_vec()))
                    .collect(),
                coco_archive,
                calls: RefCell::new(Vec::new()),
            }),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.state.calls.borrow().clone()
    }
}

impl SourcePlatform for FakeSource {
    type Dataset = FakeSource;

    async fn resolve_dataset(&self, name: &str) -> Result<FakeSource, Error> {
        self.state.calls.borrow_mut().push(format!("dataset:{}", name));
        Ok(self.clone())
    }
}

impl SourceDataset for FakeSource {
    type Release = FakeRelease;

    async fn fetch_release(&self, release_name: &str) -> Result<FakeRelease, Error> {
        self.state
            .calls
            .borrow_mut()
            .push(format!("release:{}", release_name));
        Ok(FakeRelease {
            name: release_name.to_string(),
            state: self.state.clone(),
        })
    }
}

impl SourceRelease for FakeRelease {
    async fn sync(
        &self,
        images_dir: &Path,
        remove_extra: bool,
        split_video_frames: bool,
    ) -> Result<(), Error> {
        self.state.calls.borrow_mut().push(format!(
            "sync:{}:{}:{}",
            self.name, remove_extra, split_video_frames
        ));
        for (name, data) in &self.state.images {
            let path = images_dir.join(name);
            std::fs::create_dir_all(path.parent().unwrap())?;
            std::fs::write(path, data)?;
        }
        Ok(())
    }

    async fn download_archive(&self, destination: &Path) -> Result<PathBuf, Error> {
        self.state
            .calls
            .borrow_mut()
            .push(format!("archive:{}", self.name));
        std::fs::write(destination, &self.state.coco_archive)?;
        Ok(destination.to_path_buf())
    }
}

type Submissions = Rc<RefCell<Vec<(PathBuf, PathBuf, bool)>>>;

#[derive(Default)]
struct FakeDestination {
    submissions: Submissions,
    workspace: RefCell<Option<Option<String>>>,
}

struct FakeProject {
    submissions: Submissions,
}

impl DestinationPlatform for FakeDestination {
    type Project = FakeProject;

    async fn resolve_project(
        &self,
        workspace: Option<&str>,
        _project_id: &str,
    ) -> Result<FakeProject, Error> {
        *self.workspace.borrow_mut() = Some(workspace.map(str::to_string));
        Ok(FakeProject {
            submissions: self.submissions.clone(),
        })
    }
}

impl DestinationProject for FakeProject {
    async fn ingest_single(
        &self,
        image_path: &Path,
        annotation_path: &Path,
        overwrite: bool,
    ) -> Result<IngestResult, Error> {
        self.submissions.borrow_mut().push((
            image_path.to_path_buf(),
            annotation_path.to_path_buf(),
            overwrite,
        ));
        if image_path.to_string_lossy().contains("broken") {
            return Err(Error::ApiError(500, "ingestion failed".to_string()));
        }
        Ok(IngestResult {
            image_id: image_path.file_name().unwrap().to_string_lossy().into_owned(),
            duplicate: false,
            annotated: true,
        })
    }
}

fn config(cache_root: &Path, workspace: Option<&str>) -> TransferConfig {
    TransferConfig {
        darwin: DarwinConfig {
            api_key: "darwin-key".to_string(),
            dataset_name: "traffic".to_string(),
            json_export_name: "json-v1".to_string(),
            coco_export_name: "coco-v1".to_string(),
            workspace_name: workspace.map(str::to_string),
            cache_root: Some(cache_root.to_path_buf()),
            server: "https://darwin.v7labs.com".to_string(),
        },
        roboflow: RoboflowConfig {
            api_key: "rf-key".to_string(),
            project_id: "traffic-rf".to_string(),
            workspace_name: None,
            server: "https://api.roboflow.com".to_string(),
            split: "train".to_string(),
        },
        timeout_secs: 30,
    }
}

fn coco_archive(file_names: &[&str]) -> Vec<u8> {
    let document = json!({
        "info": {"description": "Exported from Darwin"},
        "images": file_names
            .iter()
            .enumerate()
            .map(|(id, name)| json!({"id": id + 1, "file_name": name, "width": 640, "height": 480}))
            .collect::<Vec<_>>(),
        "annotations": [],
        "categories": [{"id": 1, "name": "car"}]
    });

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("traffic-export.json", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(document.to_string().as_bytes()).unwrap();
    zip.finish().unwrap().into_inner()
}

fn dataset_root(cache_root: &Path, workspace: &str) -> PathBuf {
    cache_root.join(workspace).join("traffic")
}

#[tokio::test]
async fn test_image_dataset_transfer() {
    let temp_dir = TempDir::new().unwrap();
    let config = config(temp_dir.path(), Some("acme"));
    let source = FakeSource::new(
        &["a.jpg", "b.PNG", "notes.txt"],
        coco_archive(&["a.jpg", "b.PNG"]),
    );
    let destination = FakeDestination::default();

    let options = TransferOptions {
        overwrite: true,
        ..Default::default()
    };
    let outcomes = Transfer::new(&config, &source, &destination)
        .run(options)
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.is_success()));

    let root = dataset_root(temp_dir.path(), "acme");
    let annotation = root.join("releases").join("coco-v1").join("coco.json");
    assert!(annotation.exists());
    assert!(!root.join("releases").join("coco-v1").join("dataset.zip").exists());

    let submissions = destination.submissions.borrow();
    let images: Vec<_> = submissions.iter().map(|(img, _, _)| img.clone()).collect();
    assert_eq!(
        images,
        vec![root.join("images").join("a.jpg"), root.join("images").join("b.PNG")]
    );
    assert!(submissions.iter().all(|(_, ann, overwrite)| ann == &annotation && *overwrite));

    assert_eq!(
        source.calls(),
        vec![
            "dataset:traffic",
            "release:json-v1",
            "sync:json-v1:false:true",
            "release:coco-v1",
            "archive:coco-v1",
        ]
    );
    assert_eq!(*destination.workspace.borrow(), Some(None));
}

#[tokio::test]
async fn test_video_dataset_transfer() {
    let temp_dir = TempDir::new().unwrap();
    let config = config(temp_dir.path(), Some("acme"));
    let frames = [
        "cam1/0000000.png",
        "cam1/0000001.png",
        "cam2/0000000.png",
        "cam10/0000000.png",
    ];
    let source = FakeSource::new(&frames, coco_archive(&frames));
    let destination = FakeDestination::default();

    let options = TransferOptions {
        video: true,
        remove_unannotated: true,
        ..Default::default()
    };
    let outcomes = Transfer::new(&config, &source, &destination)
        .run(options)
        .await
        .unwrap();
    assert_eq!(outcomes.len(), 4);

    let images_dir = dataset_root(temp_dir.path(), "acme").join("images");
    let reader = CocoReader::new();

    let cam1 = reader.read_json(images_dir.join("cam1").join("coco.json")).unwrap();
    let cam1_names: Vec<_> = cam1.images.iter().map(|i| i.file_name.as_str()).collect();
    // "cam1" is a substring of "cam10", so its frames are claimed too
    assert_eq!(
        cam1_names,
        vec!["cam1/0000000.png", "cam1/0000001.png", "cam10/0000000.png"]
    );
    assert_eq!(cam1.get("categories"), Some(&json!([{"id": 1, "name": "car"}])));

    let cam2 = reader.read_json(images_dir.join("cam2").join("coco.json")).unwrap();
    assert_eq!(cam2.images.len(), 1);
    assert_eq!(cam2.images[0].fields["id"], json!(3));

    // Each folder is uploaded with its own annotation file, never recursively
    let submissions = destination.submissions.borrow();
    for (image, annotation, overwrite) in submissions.iter() {
        assert_eq!(annotation.parent(), image.parent());
        assert!(annotation.ends_with("coco.json"));
        assert!(!overwrite);
    }
    assert!(source.calls().contains(&"sync:json-v1:true:true".to_string()));
}

#[tokio::test]
async fn test_extraction_failure_continues() {
    let temp_dir = TempDir::new().unwrap();
    let config = config(temp_dir.path(), Some("acme"));
    let source = FakeSource::new(&["a.jpg"], b"not a zip archive".to_vec());
    let destination = FakeDestination::default();

    let outcomes = Transfer::new(&config, &source, &destination)
        .run(TransferOptions::default())
        .await
        .unwrap();
    assert_eq!(outcomes.len(), 1);

    let release_dir = dataset_root(temp_dir.path(), "acme")
        .join("releases")
        .join("coco-v1");
    assert!(release_dir.exists());
    assert!(!release_dir.join("coco.json").exists());
}

#[tokio::test]
async fn test_extraction_failure_is_fatal_for_video() {
    let temp_dir = TempDir::new().unwrap();
    let config = config(temp_dir.path(), Some("acme"));
    let source = FakeSource::new(&["cam1/0000000.png"], b"garbage".to_vec());
    let destination = FakeDestination::default();

    let options = TransferOptions {
        video: true,
        ..Default::default()
    };
    let result = Transfer::new(&config, &source, &destination)
        .run(options)
        .await;
    assert!(matches!(result, Err(Error::IoError(_))));
    assert!(destination.submissions.borrow().is_empty());
}

#[tokio::test]
async fn test_upload_failures_do_not_abort() {
    let temp_dir = TempDir::new().unwrap();
    let config = config(temp_dir.path(), Some("acme"));
    let source = FakeSource::new(
        &["a.jpg", "broken.jpg", "c.jpg"],
        coco_archive(&["a.jpg", "broken.jpg", "c.jpg"]),
    );
    let destination = FakeDestination::default();

    let outcomes = Transfer::new(&config, &source, &destination)
        .run(TransferOptions::default())
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 3);
    let failed: Vec<_> = outcomes.iter().filter(|o| !o.is_success()).collect();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].image.ends_with("broken.jpg"));
    assert!(matches!(failed[0].result, Err(Error::UploadError(_, _))));
}

#[tokio::test]
async fn test_clear_cache_removes_stale_files() {
    let temp_dir = TempDir::new().unwrap();
    let config = config(temp_dir.path(), Some("acme"));
    let root = dataset_root(temp_dir.path(), "acme");
    std::fs::create_dir_all(root.join("images")).unwrap();
    std::fs::write(root.join("images").join("stale.jpg"), b"old").unwrap();
    std::fs::create_dir_all(root.join("releases").join("old-release")).unwrap();

    let source = FakeSource::new(&["a.jpg"], coco_archive(&["a.jpg"]));
    let destination = FakeDestination::default();

    let options = TransferOptions {
        clear_cache: true,
        ..Default::default()
    };
    let outcomes = Transfer::new(&config, &source, &destination)
        .run(options)
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].image.ends_with("a.jpg"));
    assert!(!root.join("images").join("stale.jpg").exists());
    assert!(!root.join("releases").join("old-release").exists());
}

#[tokio::test]
async fn test_workspace_discovered_from_cache() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::create_dir(temp_dir.path().join("only-team")).unwrap();
    let config = config(temp_dir.path(), None);
    let source = FakeSource::new(&["a.jpg"], coco_archive(&["a.jpg"]));
    let destination = FakeDestination::default();

    let transfer = Transfer::new(&config, &source, &destination);
    let layout = transfer.layout().unwrap();
    assert_eq!(layout.workspace, "only-team");

    transfer.run(TransferOptions::default()).await.unwrap();
    assert!(
        dataset_root(temp_dir.path(), "only-team")
            .join("releases")
            .join("coco-v1")
            .join("coco.json")
            .exists()
    );
}

#[tokio::test]
async fn test_missing_cache_root_fails_fast() {
    let temp_dir = TempDir::new().unwrap();
    let config = config(&temp_dir.path().join("absent"), None);
    let source = FakeSource::new(&[], Vec::new());
    let destination = FakeDestination::default();

    let result = Transfer::new(&config, &source, &destination)
        .run(TransferOptions::default())
        .await;
    assert!(matches!(result, Err(Error::ConfigurationError(_))));
    assert!(source.calls().is_empty());
}
