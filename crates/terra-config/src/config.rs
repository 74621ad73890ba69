//! Configuration structs with the reference scene's defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Directory name used under the platform config and data directories.
pub const APP_DIR_NAME: &str = "terra";

/// Name of the config file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.ron";

/// Top-level viewer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Window settings.
    pub window: WindowConfig,
    /// Camera and output settings.
    pub render: RenderConfig,
    /// Scene content: textures, bodies, light, starfield.
    pub scene: SceneConfig,
    /// Per-frame motion.
    pub animation: AnimationConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Window configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Window width in logical pixels.
    pub width: u32,
    /// Window height in logical pixels.
    pub height: u32,
    /// Start in borderless fullscreen.
    pub fullscreen: bool,
    /// Enable vsync (PresentMode::Fifo).
    pub vsync: bool,
    /// Window title.
    pub title: String,
}

/// Tone mapping operator applied to lit and textured materials.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ToneMapping {
    /// No tone mapping, values are clamped by the output format.
    None,
    /// ACES filmic curve.
    AcesFilmic,
}

/// Camera and output configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Vertical field of view in degrees.
    pub fov_y_degrees: f32,
    /// Near clip plane distance.
    pub near: f32,
    /// Far clip plane distance.
    pub far: f32,
    /// Camera distance from the origin along +Z.
    pub camera_distance: f32,
    /// MSAA sample count (1 or 4).
    pub msaa_samples: u32,
    /// Tone mapping operator.
    pub tone_mapping: ToneMapping,
    /// Exposure multiplier fed into the tone mapping curve.
    pub exposure: f32,
    /// Linear RGB clear color.
    pub clear_color: [f32; 3],
}

/// Fresnel rim parameters for the atmospheric glow shell.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FresnelConfig {
    /// Rim color as 0xRRGGBB (sRGB).
    pub rim_hex: u32,
    /// Color facing the camera as 0xRRGGBB (sRGB).
    pub facing_hex: u32,
    pub bias: f32,
    pub scale: f32,
    pub power: f32,
}

/// Moon placement, orbit and surface settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MoonConfig {
    /// Angular-rate coefficient passed to the orbit function.
    pub orbit_speed: f64,
    /// Orbital radius.
    pub orbit_distance: f64,
    /// Initial position. Only `y` survives the first orbit update.
    pub start_position: [f32; 3],
    /// Uniform scale relative to the shared unit sphere.
    pub scale: f32,
    pub bump_scale: f32,
    pub map: String,
    pub bump_map: String,
}

/// Directional sun light.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SunConfig {
    /// Light color as 0xRRGGBB (sRGB).
    pub color_hex: u32,
    pub intensity: f32,
    /// World position. The light shines from here toward the origin.
    pub position: [f32; 3],
}

/// Cloud shell settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CloudsConfig {
    pub opacity: f32,
    pub scale: f32,
    pub map: String,
    pub alpha_map: String,
}

/// Atmospheric glow shell settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GlowConfig {
    pub scale: f32,
    pub fresnel: FresnelConfig,
}

/// Scene content configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneConfig {
    /// Directory that texture file names are resolved against.
    pub textures_dir: PathBuf,
    /// Icosahedron detail level of the shared sphere geometry.
    pub sphere_detail: u32,
    /// Axial tilt in degrees, applied as a negative rotation about Z.
    pub axial_tilt_degrees: f32,
    pub earth_map: String,
    pub earth_specular_map: String,
    pub earth_bump_map: String,
    pub earth_bump_scale: f32,
    pub lights_map: String,
    pub clouds: CloudsConfig,
    pub glow: GlowConfig,
    pub moon: MoonConfig,
    pub sun: SunConfig,
    /// Number of background stars.
    pub star_count: u32,
    /// Seed for the deterministic star placement.
    pub star_seed: u64,
    /// World-space size of a star sprite.
    pub star_size: f32,
}

/// How the fixed rotation increments relate to time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SpinTiming {
    /// One fixed increment per displayed frame. Apparent speed follows the
    /// refresh rate.
    PerFrame,
    /// Increments scaled by `delta_seconds * 60`, so a 60 Hz display matches
    /// `PerFrame` and other refresh rates keep the same angular velocity.
    PerSecond,
}

/// Per-frame motion configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnimationConfig {
    /// Radians added per frame to the surface, lights and glow layers.
    pub surface_spin: f64,
    /// Radians added per frame to the cloud layer.
    pub cloud_spin: f64,
    /// Radians subtracted per frame from the starfield.
    pub star_spin: f64,
    pub timing: SpinTiming,
    /// Clock ticks per second of the frame time source. The orbit phase is
    /// `time * speed / clock_units_per_second`.
    pub clock_units_per_second: f64,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Frames between frame-statistics log lines. 0 disables them.
    pub stats_interval_frames: u64,
}

// --- Default implementations ---

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fullscreen: false,
            vsync: true,
            title: "Terra".to_string(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            camera_distance: 5.0,
            msaa_samples: 4,
            tone_mapping: ToneMapping::AcesFilmic,
            exposure: 1.0,
            clear_color: [0.0, 0.0, 0.0],
        }
    }
}

impl Default for FresnelConfig {
    fn default() -> Self {
        Self {
            rim_hex: 0x0088ff,
            facing_hex: 0x000000,
            bias: 0.1,
            scale: 1.0,
            power: 4.0,
        }
    }
}

impl Default for MoonConfig {
    fn default() -> Self {
        Self {
            orbit_speed: 0.5,
            orbit_distance: 3.0,
            start_position: [-3.0, 1.0, 0.0],
            scale: 0.3,
            bump_scale: 0.04,
            map: "moonmap4k.jpg".to_string(),
            bump_map: "moonbump4k.jpg".to_string(),
        }
    }
}

impl Default for SunConfig {
    fn default() -> Self {
        Self {
            color_hex: 0xffffff,
            intensity: 2.0,
            position: [-2.0, 0.5, 1.5],
        }
    }
}

impl Default for CloudsConfig {
    fn default() -> Self {
        Self {
            opacity: 0.8,
            scale: 1.003,
            map: "04_earthcloudmap.jpg".to_string(),
            alpha_map: "05_earthcloudmaptrans.jpg".to_string(),
        }
    }
}

impl Default for GlowConfig {
    fn default() -> Self {
        Self {
            scale: 1.01,
            fresnel: FresnelConfig::default(),
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            textures_dir: PathBuf::from("textures"),
            sphere_detail: 12,
            axial_tilt_degrees: 23.4,
            earth_map: "00_earthmap1k.jpg".to_string(),
            earth_specular_map: "02_earthspec1k.jpg".to_string(),
            earth_bump_map: "01_earthbump1k.jpg".to_string(),
            earth_bump_scale: 0.04,
            lights_map: "03_earthlights1k.jpg".to_string(),
            clouds: CloudsConfig::default(),
            glow: GlowConfig::default(),
            moon: MoonConfig::default(),
            sun: SunConfig::default(),
            star_count: 20_000,
            star_seed: 0x5eed_57a2,
            star_size: 0.2,
        }
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            surface_spin: 0.002,
            cloud_spin: 0.0023,
            star_spin: 0.0002,
            timing: SpinTiming::PerFrame,
            clock_units_per_second: 1000.0,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            stats_interval_frames: 120,
        }
    }
}

/// Platform config directory for the viewer, e.g. `~/.config/terra` on Linux.
///
/// Falls back to `./terra` when the platform reports no config directory.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(4)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }
}

impl SceneConfig {
    /// Resolve a texture file name against `textures_dir`.
    pub fn texture_path(&self, file_name: &str) -> PathBuf {
        self.textures_dir.join(file_name)
    }
}
