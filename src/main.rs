use log::{error, info, LevelFilter};
use speedlines::app::App;
use speedlines::config::{Settings, DEFAULT_CONFIG_PATH};
use std::error::Error;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn Error>> {
    // --- Logging Setup ---
    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Info)
        .filter_module("speedlines::core::gfx", LevelFilter::Warn)
        .filter_module("speedlines::core::audio", LevelFilter::Info)
        .filter_module("speedlines::intro", LevelFilter::Info)
        .filter_module("speedlines::app", LevelFilter::Info)
        .init();

    info!("Intro starting...");

    // --- Config ---
    let path = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let settings = Settings::load_or_create(&path)?;

    // --- Run ---
    let app = match App::new(settings) {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to initialize intro: {}", e);
            return Err(e);
        }
    };
    if let Err(e) = app.run() {
        error!("Intro exited with error: {}", e);
        return Err(e);
    }

    info!("Intro exited gracefully.");
    Ok(())
}
