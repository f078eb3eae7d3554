// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! # darwin2roboflow
//!
//! Moves an annotated image or video dataset from V7 Darwin to Roboflow,
//! keeping its COCO annotations.
//!
//! A transfer pulls the dataset images into Darwin's local cache
//! (`~/.darwin/datasets/<workspace>/<dataset>`), downloads a COCO export of
//! the dataset, optionally splits that export into one annotation file per
//! video, and finally uploads every image with its annotation file to a
//! Roboflow project.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use darwin2roboflow::{TransferConfig, TransferOptions, run_transfer};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), darwin2roboflow::Error> {
//!     let config = TransferConfig::load(None)?;
//!     let options = TransferOptions {
//!         video: true,
//!         ..Default::default()
//!     };
//!
//!     let outcomes = run_transfer(&config, options, None).await?;
//!     println!("Uploaded {} images", outcomes.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`coco`]: COCO document model, reader, writer and per-folder
//!   partitioning
//! - [`layout`]: local dataset cache resolution
//! - [`upload`]: directory uploads
//! - [`platform`]: the traits the transfer routine talks to, implemented by
//!   [`DarwinClient`] and [`RoboflowClient`]

mod archive;
mod config;
mod darwin;
mod error;
mod roboflow;
mod transfer;

pub mod coco;
pub mod layout;
pub mod platform;
pub mod upload;

pub use crate::{
    archive::extract_release_archive,
    config::{DEFAULT_CONFIG_FILE, DarwinConfig, ENV_PREFIX, RoboflowConfig, TransferConfig},
    darwin::{DarwinClient, DarwinDataset, DarwinDatasetInfo, DarwinExport, DarwinRelease},
    error::Error,
    layout::{ANNOTATION_FILE_NAME, DatasetLayout, DatasetLocator},
    platform::{
        DestinationPlatform, DestinationProject, IngestResult, SourceDataset, SourcePlatform,
        SourceRelease,
    },
    roboflow::{ProjectInfo, RoboflowClient, RoboflowProject},
    transfer::{Transfer, TransferOptions, run_transfer},
    upload::{IMAGE_EXTENSIONS, Progress, UploadOutcome, Uploader, list_images},
};
