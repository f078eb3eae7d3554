// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use clap::Parser;
use darwin2roboflow::{
    DatasetLocator, Error, Progress, TransferConfig, TransferOptions, UploadOutcome,
    run_transfer,
};
use log::error;
use std::path::PathBuf;

/// Transfer an annotated V7 Darwin dataset, images and COCO annotations, to
/// a Roboflow project.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (TOML, JSON or YAML). Defaults to
    /// darwin2roboflow.toml in the working directory when present.
    #[clap(long, env = "DARWIN2ROBOFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// The dataset contains videos. Frames are uploaded folder by folder,
    /// each with its own annotation file.
    #[clap(long)]
    video: bool,

    /// Remove local images that are not part of the Darwin release.
    #[clap(long)]
    remove_unannotated: bool,

    /// Replace existing annotations in Roboflow.
    #[clap(long)]
    overwrite: bool,

    /// Delete the local image and release caches before downloading.
    #[clap(long)]
    clear_cache: bool,

    /// Validate the configuration and print the local dataset layout without
    /// contacting either platform.
    #[clap(long)]
    dry_run: bool,
}

impl Args {
    fn options(&self) -> TransferOptions {
        TransferOptions {
            video: self.video,
            remove_unannotated: self.remove_unannotated,
            overwrite: self.overwrite,
            clear_cache: self.clear_cache,
        }
    }
}

fn handle_dry_run(config: &TransferConfig) -> Result<(), Error> {
    let locator = DatasetLocator::new(
        config.cache_root()?,
        config.darwin.workspace_name.clone(),
    );
    let layout = locator.resolve(&config.darwin.dataset_name)?;

    println!("workspace: {}", layout.workspace);
    println!("dataset:   {}", layout.dataset);
    println!("images:    {}", layout.images_dir.display());
    for folder in layout.video_folders()? {
        println!("  video:   {}", folder.display());
    }
    println!(
        "coco:      {}",
        layout
            .annotation_path(&config.darwin.coco_export_name)
            .display()
    );
    println!(
        "roboflow:  {}/{}",
        config
            .roboflow
            .workspace_name
            .as_deref()
            .unwrap_or("<default>"),
        config.roboflow.project_id
    );
    Ok(())
}

async fn handle_transfer(config: &TransferConfig, options: TransferOptions) -> Result<(), Error> {
    use indicatif::{ProgressBar, ProgressStyle};
    use tokio::sync::mpsc;

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise} ETA: {eta}] {msg}: {wide_bar:.yellow} {human_pos}/{human_len}",
        )
        .unwrap()
        .progress_chars("█▇▆▅▄▃▂▁  "),
    );
    bar.set_message("Uploading");

    let (tx, mut rx) = mpsc::channel::<Progress>(1);

    let progress = tokio::spawn(async move {
        while let Some(progress) = rx.recv().await {
            if progress.total > 0 {
                bar.set_length(progress.total as u64);
                bar.set_position(progress.current as u64);
            }
        }
        bar.finish_and_clear();
    });

    let outcomes = run_transfer(config, options, Some(tx)).await?;
    let _ = progress.await;

    report(&outcomes);
    Ok(())
}

fn report(outcomes: &[UploadOutcome]) {
    let failed: Vec<_> = outcomes.iter().filter(|o| !o.is_success()).collect();
    for outcome in &failed {
        println!("failed: {}", outcome.image.display());
    }
    println!(
        "Uploaded {} images, {} failed",
        outcomes.len() - failed.len(),
        failed.len()
    );
}

async fn run(args: Args) -> Result<(), Error> {
    let config = TransferConfig::load(args.config.as_deref())?;

    if args.dry_run {
        return handle_dry_run(&config);
    }

    handle_transfer(&config, args.options()).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(err) = run(args).await {
        error!("{}", err);
        std::process::exit(1);
    }
}
