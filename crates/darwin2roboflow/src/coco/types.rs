// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! COCO JSON data structures for serde serialization/deserialization.
//!
//! Only the `images` section is modelled. Everything else in a COCO export
//! (`info`, `licenses`, `categories`, `annotations`, and any exporter
//! specific keys) is carried through verbatim, as are unknown fields of the
//! image entries themselves.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Top-level COCO annotation document.
///
/// This is the root structure of an export like `coco.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CocoDocument {
    /// List of images in the document.
    pub images: Vec<CocoImage>,
    /// All other top-level keys, in their original order.
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// Image entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CocoImage {
    /// Filename (relative path within the images folder).
    pub file_name: String,
    /// Every other field, `id` included, exactly as exported.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl CocoDocument {
    /// Returns a copy of this document keeping only the images accepted by
    /// `keep`. Top-level metadata is cloned unchanged.
    pub fn filter_images<F>(&self, mut keep: F) -> CocoDocument
    where
        F: FnMut(&CocoImage) -> bool,
    {
        CocoDocument {
            images: self.images.iter().filter(|img| keep(img)).cloned().collect(),
            metadata: self.metadata.clone(),
        }
    }

    /// Look up a top-level metadata key such as `categories`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }
}

impl CocoImage {
    /// Create an image entry with only a filename.
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            ..Default::default()
        }
    }
}
