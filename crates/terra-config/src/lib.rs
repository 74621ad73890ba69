//! Configuration for the Terra globe viewer.
//!
//! Settings persist to disk as a RON file and can be overridden from the
//! command line. Every section falls back to defaults field by field, so old
//! config files keep loading after new settings are added.

mod cli;
mod config;
mod error;

pub use cli::{CliArgs, TimingArg};
pub use config::{
    AnimationConfig, CloudsConfig, Config, DebugConfig, FresnelConfig, GlowConfig, MoonConfig,
    RenderConfig, SceneConfig, SpinTiming, SunConfig, ToneMapping, WindowConfig,
    default_config_dir,
};
pub use error::ConfigError;
