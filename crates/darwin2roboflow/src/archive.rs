// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Extraction of downloaded COCO release archives.

use crate::{Error, layout::ANNOTATION_FILE_NAME};
use log::{debug, warn};
use std::{
    fs::File,
    path::{Path, PathBuf},
};

/// Extract `archive` into `release_dir` and rename its top-level JSON file
/// to `coco.json`.
///
/// The archive is deleted afterwards whether or not extraction succeeded.
/// A corrupt archive, or one without a top-level JSON file, yields
/// [`Error::ExtractionError`]; whatever was already extracted stays in
/// `release_dir`.
pub fn extract_release_archive(archive: &Path, release_dir: &Path) -> Result<PathBuf, Error> {
    let extracted = unzip(archive, release_dir);

    if let Err(err) = std::fs::remove_file(archive) {
        warn!("Could not remove archive {:?}: {}", archive, err);
    }
    extracted?;

    let mut candidates = top_level_json(release_dir)?;
    if candidates.is_empty() {
        return Err(Error::ExtractionError(format!(
            "no JSON annotation file in {:?}",
            archive
        )));
    }
    if candidates.len() > 1 {
        warn!(
            "Found {} JSON files in {:?}, using {:?}",
            candidates.len(),
            release_dir,
            candidates[0]
        );
    }

    let source = candidates.swap_remove(0);
    let target = release_dir.join(ANNOTATION_FILE_NAME);
    if source != target {
        debug!("Renaming {:?} to {:?}", source, target);
        std::fs::rename(&source, &target)?;
    }

    Ok(target)
}

fn unzip(archive: &Path, release_dir: &Path) -> Result<(), Error> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| {
        Error::ExtractionError(format!("cannot open {:?}: {}", archive, e))
    })?;
    zip.extract(release_dir).map_err(|e| {
        Error::ExtractionError(format!("cannot extract {:?}: {}", archive, e))
    })?;
    debug!("Extracted {} entries into {:?}", zip.len(), release_dir);
    Ok(())
}

/// Top-level `*.json` files of `dir`, sorted by name.
fn top_level_json(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        let is_json = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if entry.file_type().is_file() && is_json {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}
