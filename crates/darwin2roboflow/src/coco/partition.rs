// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Per-folder partitioning of a combined COCO document.
//!
//! Video items are pulled as one folder of frames per video, while the COCO
//! export covers every video at once. Partitioning produces one document per
//! folder whose `images` only lists the frames whose `file_name` contains
//! the folder name.
//!
//! Matching is a plain case-sensitive substring test, so a folder named
//! `cam1` also claims frames of `cam10`.

use super::{CocoDocument, CocoReader, CocoWriter};
use crate::{Error, layout::ANNOTATION_FILE_NAME};
use log::{debug, info};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

/// Folder name to filtered document.
pub type FolderPartition = BTreeMap<String, CocoDocument>;

/// Split `document` into one document per folder name.
///
/// Each output keeps every top-level field of `document` and the subset of
/// `images`, in original order, whose `file_name` contains the folder name.
/// A folder without matches maps to a document with empty `images`.
pub fn partition<S: AsRef<str>>(document: &CocoDocument, folder_names: &[S]) -> FolderPartition {
    folder_names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            let filtered = document.filter_images(|img| img.file_name.contains(name));
            debug!(
                "Partition '{}' keeps {} of {} images",
                name,
                filtered.images.len(),
                document.images.len()
            );
            (name.to_string(), filtered)
        })
        .collect()
}

/// Partition the annotation file at `annotation_path` by the subfolders of
/// `image_dir` and write each partition to `<image_dir>/<folder>/coco.json`.
///
/// Returns the written files keyed by folder name.
pub fn write_folder_annotations(
    annotation_path: &Path,
    image_dir: &Path,
) -> Result<BTreeMap<String, PathBuf>, Error> {
    let document = CocoReader::new().read_json(annotation_path)?;
    let folders = crate::layout::subdirectories(image_dir)?;
    let names: Vec<String> = folders
        .iter()
        .filter_map(|dir| dir.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect();

    info!(
        "Splitting {} images of {:?} across {} folders",
        document.images.len(),
        annotation_path,
        names.len()
    );

    let writer = CocoWriter::new();
    let mut written = BTreeMap::new();
    for (name, folder_document) in partition(&document, &names) {
        let path = image_dir.join(&name).join(ANNOTATION_FILE_NAME);
        writer.write_json(&folder_document, &path)?;
        written.insert(name, path);
    }

    Ok(written)
}
