mod backend_bridge;
mod config;
mod controller;
mod ui;

use clap::Parser;
use crossbeam_channel::bounded;
use tracing::info;

use backend_bridge::commands::BackendCommand;
use controller::events::UiEvent;
use ui::ActivityDeskApp;

#[derive(Parser, Debug)]
#[command(about = "Desktop client for the activity sign-up service")]
struct Args {
    /// Overrides the configured server URL.
    #[arg(long)]
    server_url: Option<String>,
}

fn main() -> Result<(), eframe::Error> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let mut settings = config::load_settings();
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    info!(server_url = %settings.server_url, "starting activity desk");

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(64);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(256);
    backend_bridge::runtime::launch(settings, cmd_rx, ui_tx);

    let app = ActivityDeskApp::new(cmd_tx, ui_rx);
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([920.0, 680.0]),
        ..Default::default()
    };
    eframe::run_native("Activity Desk", options, Box::new(|_cc| Ok(Box::new(app))))
}
