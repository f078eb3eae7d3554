// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! # COCO Annotation Support
//!
//! Reading, writing and per-folder partitioning of the COCO exports that
//! Darwin produces and Roboflow ingests.
//!
//! Only `images[].file_name` is interpreted. Every other field, at the top
//! level and inside each image entry, is carried through unchanged and in
//! its original order.
//!
//! ## Example
//!
//! ```rust,no_run
//! use darwin2roboflow::coco::{CocoReader, partition};
//!
//! # fn example() -> Result<(), darwin2roboflow::Error> {
//! let document = CocoReader::new().read_json("releases/coco-export/coco.json")?;
//! let parts = partition(&document, &["intersection_a", "intersection_b"]);
//! for (folder, part) in &parts {
//!     println!("{}: {} frames", folder, part.images.len());
//! }
//! # Ok(())
//! # }
//! ```

mod partition;
mod reader;
mod types;
mod writer;

pub use partition::{FolderPartition, partition, write_folder_annotations};
pub use reader::CocoReader;
pub use types::{CocoDocument, CocoImage};
pub use writer::CocoWriter;
