use anyhow::Result;
use clap::Parser;
use eframe::egui;

use rusty_dashboard::app::DashboardApp;
use rusty_dashboard::cli::Args;
use rusty_dashboard::config::AppConfig;
use rusty_dashboard::state::AppState;

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let mut config = AppConfig::load(args.config.as_deref())?;
    config.apply_overrides(args.data_dir, args.seed);
    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }
    log::info!("data directory: {}", config.data_dir.display());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    let page = args.page.into();
    eframe::run_native(
        "Rusty Dashboard",
        options,
        Box::new(move |_cc| Ok(Box::new(DashboardApp::new(AppState::new(config, page))))),
    )
    .map_err(|e| anyhow::anyhow!("running the dashboard: {e}"))
}
