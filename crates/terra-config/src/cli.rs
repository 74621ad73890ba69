//! Command-line argument parsing.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::{Config, SpinTiming};

/// Command-line spelling of [`SpinTiming`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TimingArg {
    PerFrame,
    PerSecond,
}

impl From<TimingArg> for SpinTiming {
    fn from(arg: TimingArg) -> Self {
        match arg {
            TimingArg::PerFrame => SpinTiming::PerFrame,
            TimingArg::PerSecond => SpinTiming::PerSecond,
        }
    }
}

/// Terra command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "terra", about = "Rotating Earth, Moon and starfield viewer")]
pub struct CliArgs {
    /// Window width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Window height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Start in fullscreen.
    #[arg(long)]
    pub fullscreen: Option<bool>,

    /// Enable or disable vsync.
    #[arg(long)]
    pub vsync: Option<bool>,

    /// Directory containing the Earth and Moon textures.
    #[arg(long)]
    pub textures: Option<PathBuf>,

    /// Number of background stars.
    #[arg(long)]
    pub stars: Option<u32>,

    /// MSAA sample count (1 or 4).
    #[arg(long)]
    pub msaa: Option<u32>,

    /// Rotation timing: fixed per frame, or scaled by elapsed seconds.
    #[arg(long, value_enum)]
    pub timing: Option<TimingArg>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(w) = args.width {
            self.window.width = w;
        }
        if let Some(h) = args.height {
            self.window.height = h;
        }
        if let Some(fs) = args.fullscreen {
            self.window.fullscreen = fs;
        }
        if let Some(vsync) = args.vsync {
            self.window.vsync = vsync;
        }
        if let Some(ref dir) = args.textures {
            self.scene.textures_dir = dir.clone();
        }
        if let Some(stars) = args.stars {
            self.scene.star_count = stars;
        }
        if let Some(samples) = args.msaa {
            self.render.msaa_samples = samples;
        }
        if let Some(timing) = args.timing {
            self.animation.timing = timing.into();
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
