mod app;
mod canvas;
mod markers;
mod viewport;

use std::path::PathBuf;

use eframe::egui;

use crate::app::NavigatorApp;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let initial_image = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) if path.is_file() => Some(path),
        Some(path) => {
            log::warn!("ignoring initial image {}: not a file", path.display());
            None
        }
        None => None,
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Image Navigator")
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([800.0, 600.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Image Navigator",
        options,
        Box::new(move |_cc| Ok(Box::new(NavigatorApp::new(initial_image)))),
    )
    .expect("Failed to run eframe");
}
