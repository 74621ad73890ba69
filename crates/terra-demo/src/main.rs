//! Terra viewer binary: a rotating Earth with clouds, night lights and
//! atmosphere glow, an orbiting Moon and a starfield.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p terra-demo -- --width 1920 --height 1080` to override size.

use clap::Parser;
use terra_config::{CliArgs, Config, default_config_dir};
use tracing::info;

fn main() {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().unwrap_or_else(default_config_dir);

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    terra_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    info!(
        "Starting Terra ({}x{}, textures in {})",
        config.window.width,
        config.window.height,
        config.scene.textures_dir.display()
    );

    terra_app::run_with_config(config);
}
