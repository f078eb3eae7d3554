// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! COCO JSON reader.

use super::types::CocoDocument;
use crate::Error;
use std::{fs::File, io::BufReader, path::Path};

/// Reader for COCO annotation documents.
///
/// # Example
///
/// ```rust,no_run
/// use darwin2roboflow::coco::CocoReader;
///
/// let reader = CocoReader::new();
/// let document = reader.read_json("releases/coco-export/coco.json")?;
/// println!("Loaded {} images", document.images.len());
/// # Ok::<(), darwin2roboflow::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct CocoReader;

impl CocoReader {
    /// Create a new COCO reader.
    pub fn new() -> Self {
        Self
    }

    /// Read a COCO document from a JSON file.
    ///
    /// Fails if the file is not JSON, has no `images` array, or an image
    /// entry lacks `file_name`.
    pub fn read_json<P: AsRef<Path>>(&self, path: P) -> Result<CocoDocument, Error> {
        let file = File::open(path.as_ref())?;
        let reader = BufReader::with_capacity(64 * 1024, file);
        let document: CocoDocument = serde_json::from_reader(reader)?;
        Ok(document)
    }
}
