//! Lightbox gallery viewer
//! Built with Rust + egui (eframe)

use std::path::PathBuf;
use std::sync::Arc;

use eframe::egui;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lightbox_viewer::app::GalleryApp;
use lightbox_viewer::image_loader::links_for_paths;
use lightbox_viewer::ViewerOptions;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let paths: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    let links = links_for_paths(&paths);
    let options = Arc::new(ViewerOptions::load());
    info!(links = links.len(), "starting gallery");

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_min_inner_size([320.0, 240.0])
            .with_inner_size([1024.0, 768.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Lightbox Viewer",
        native_options,
        Box::new(move |_cc| Ok(Box::new(GalleryApp::new(options, links)))),
    )
}
