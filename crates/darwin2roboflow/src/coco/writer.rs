// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! COCO JSON writer.

use super::types::CocoDocument;
use crate::Error;
use serde::Serialize as _;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::{
    fs::File,
    io::{BufWriter, Write as _},
    path::Path,
};

/// COCO writer for generating JSON files, pretty-printed with four space
/// indentation.
///
/// # Example
///
/// ```rust,no_run
/// use darwin2roboflow::coco::{CocoDocument, CocoWriter};
///
/// let writer = CocoWriter::new();
/// let document = CocoDocument::default();
/// writer.write_json(&document, "images/cam1/coco.json")?;
/// # Ok::<(), darwin2roboflow::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct CocoWriter;

impl CocoWriter {
    /// Create a new COCO writer.
    pub fn new() -> Self {
        Self
    }

    /// Write a COCO document to a JSON file, replacing any existing file.
    pub fn write_json<P: AsRef<Path>>(
        &self,
        document: &CocoDocument,
        path: P,
    ) -> Result<(), Error> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::with_capacity(64 * 1024, file);

        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut serializer = Serializer::with_formatter(&mut writer, formatter);
        document.serialize(&mut serializer)?;

        writer.flush()?;
        Ok(())
    }
}
