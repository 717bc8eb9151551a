mod app;
mod cli;
mod color;
mod config;
mod data;
mod state;
mod ui;

use anyhow::Result;
use app::DashboardApp;
use clap::Parser;
use eframe::egui;

use cli::Args;
use config::DashboardConfig;
use state::AppState;

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = DashboardConfig::load(args.config.as_deref())?;

    // One blocking fetch per session, before the window opens.
    let mut state = AppState::new(config);
    let source = args.source(&state.config);
    state.load(source);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([640.0, 420.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Agri Dash – Employment & Crop Explorer",
        options,
        Box::new(|_cc| Ok(Box::new(DashboardApp::new(state)))),
    )
    .map_err(|e| anyhow::anyhow!("running the dashboard: {e}"))
}
