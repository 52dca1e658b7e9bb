// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! vannot - visual annotation tool
//!
//! Desktop front end for the annotation engines: boxes, polygons, landmarks,
//! freeform strokes and segmentation masks on images, plus keyframed object
//! tracks across video frames.

mod app;
mod ui;

use anyhow::Result;
use app::VannotApp;
use clap::Parser;
use std::path::PathBuf;
use vannot::HostConfig;

#[derive(Parser, Debug)]
#[command(name = "vannot", version, about = "Image and video annotation tool")]
struct Args {
    /// Host configuration (JSON or YAML): tools, labels, brush sizes, fps
    #[arg(long)]
    config: Option<PathBuf>,

    /// Image to open on startup
    #[arg(long)]
    image: Option<PathBuf>,

    /// Saved project to load on startup
    #[arg(long)]
    annotations: Option<PathBuf>,

    /// Save every committed change to this file
    #[arg(long)]
    save_to: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = match args.config.as_deref() {
        Some(path) => HostConfig::load_or_default(path),
        None => HostConfig::default(),
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("vannot"),
        ..Default::default()
    };

    eframe::run_native(
        "vannot",
        options,
        Box::new(move |_cc| Ok(Box::new(VannotApp::new(config, args.image, args.annotations, args.save_to)))),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
