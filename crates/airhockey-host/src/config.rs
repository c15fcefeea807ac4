use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use airhockey_core::config::{ConfigError, EngineConfig};

/// Default config file, read from the working directory.
pub const CONFIG_FILE: &str = "airhockey.toml";
/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "AIRHOCKEY_CONFIG";

pub const OUTPUT_IMAGE_WIDTH: u32 = 1200;
pub const OUTPUT_IMAGE_HEIGHT: u32 = 800;
pub const GRAPHICS_TARGET_FRAMERATE: f64 = 30.0;
/// Physics ticks per rendered frame.
pub const PHYSICS_FRAME_RATIO: u32 = 100;
pub const STARTUP_SPLASH_MS: u64 = 3000;

/// Top-level host configuration, loaded from `airhockey.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub engine: EngineConfig,
    pub calibration: CalibrationConfig,
    pub output: OutputConfig,
    pub loops: LoopConfig,
    pub assets: AssetConfig,
    pub detector: DetectorConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Projector-to-table distance in table units. Unset means no range
    /// reading is available and startup fails.
    pub projector_distance: Option<f64>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            projector_distance: Some(1000.0),
        }
    }
}

/// Projected image size in pixels.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: OUTPUT_IMAGE_WIDTH,
            height: OUTPUT_IMAGE_HEIGHT,
        }
    }
}

/// Loop rates and timing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    pub graphics_framerate: f64,
    pub physics_frame_ratio: u32,
    pub sensor_framerate: f64,
    /// How often each loop logs its measured rate.
    pub report_interval_secs: u64,
    pub startup_splash_ms: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            graphics_framerate: GRAPHICS_TARGET_FRAMERATE,
            physics_frame_ratio: PHYSICS_FRAME_RATIO,
            sensor_framerate: 60.0,
            report_interval_secs: 5,
            startup_splash_ms: STARTUP_SPLASH_MS,
        }
    }
}

impl LoopConfig {
    pub fn render_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.graphics_framerate)
    }

    pub fn physics_period(&self) -> Duration {
        Duration::from_secs_f64(
            1.0 / (self.graphics_framerate * f64::from(self.physics_frame_ratio)),
        )
    }

    pub fn sensor_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.sensor_framerate)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }

    pub fn startup_splash(&self) -> Duration {
        Duration::from_millis(self.startup_splash_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub dir: PathBuf,
    /// Skip the startup check for celebration and table images. Only
    /// useful when no image-backed renderer is attached.
    pub skip_check: bool,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("assets"),
            skip_check: false,
        }
    }
}

/// Settings for the built-in simulated marker detector.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub frame_width: f64,
    pub frame_height: f64,
    pub downsample_ratio: f64,
    /// Marker position noise in downsampled pixels.
    pub jitter: f64,
    /// Chance per frame that a marker is not seen.
    pub dropout: f64,
    pub seed: Option<u64>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            frame_width: 640.0,
            frame_height: 480.0,
            downsample_ratio: 2.0,
            jitter: 1.5,
            dropout: 0.05,
            seed: None,
        }
    }
}

fn invalid(field: &'static str, reason: &'static str) -> ConfigError {
    ConfigError { field, reason }
}

impl HostConfig {
    /// Check every section, returning the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;

        if let Some(d) = self.calibration.projector_distance
            && !(d.is_finite() && d > 0.0)
        {
            return Err(invalid("calibration.projector_distance", "must be > 0"));
        }
        if self.output.width == 0 || self.output.height == 0 {
            return Err(invalid("output", "width and height must be > 0"));
        }
        if !(self.loops.graphics_framerate.is_finite() && self.loops.graphics_framerate > 0.0) {
            return Err(invalid("loops.graphics_framerate", "must be > 0"));
        }
        if self.loops.physics_frame_ratio == 0 {
            return Err(invalid("loops.physics_frame_ratio", "must be > 0"));
        }
        if !(self.loops.sensor_framerate.is_finite() && self.loops.sensor_framerate > 0.0) {
            return Err(invalid("loops.sensor_framerate", "must be > 0"));
        }
        if self.loops.report_interval_secs == 0 {
            return Err(invalid("loops.report_interval_secs", "must be > 0"));
        }
        if !(self.detector.frame_width > 0.0 && self.detector.frame_height > 0.0) {
            return Err(invalid("detector", "frame size must be > 0"));
        }
        if !(self.detector.dropout >= 0.0 && self.detector.dropout <= 1.0) {
            return Err(invalid("detector.dropout", "must be in [0, 1]"));
        }
        if !(self.detector.jitter.is_finite() && self.detector.jitter >= 0.0) {
            return Err(invalid("detector.jitter", "must be >= 0"));
        }
        Ok(())
    }

    /// Load config from `AIRHOCKEY_CONFIG` or `airhockey.toml` if present,
    /// then apply environment variable overrides.
    pub fn load() -> Self {
        let path = std::env::var(CONFIG_PATH_ENV)
            .ok()
            .filter(|p| !p.is_empty())
            .map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
        let mut config = Self::load_file(&path);
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Parse `path`, falling back to defaults when it is missing or malformed.
    pub fn load_file(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<HostConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!(path = %path.display(), "Loaded configuration");
                    cfg
                },
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Failed to parse config: {e}, using defaults");
                    HostConfig::default()
                },
            },
            Err(_) => {
                tracing::info!(path = %path.display(), "No config file found, using defaults");
                HostConfig::default()
            },
        }
    }

    /// Apply `AIRHOCKEY_*` overrides, reading variables through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(val) = get("AIRHOCKEY_PROJECTOR_DISTANCE") {
            if val.eq_ignore_ascii_case("none") {
                self.calibration.projector_distance = None;
            } else if let Ok(d) = val.parse::<f64>() {
                self.calibration.projector_distance = Some(d);
            }
        }
        if let Some(dir) = get("AIRHOCKEY_ASSET_DIR") {
            self.assets.dir = PathBuf::from(dir);
        }
        if let Some(val) = get("AIRHOCKEY_SKIP_ASSET_CHECK")
            && let Ok(b) = val.parse::<bool>()
        {
            self.assets.skip_check = b;
        }
        if let Some(val) = get("AIRHOCKEY_WINNING_SCORE")
            && let Ok(n) = val.parse::<u32>()
        {
            self.engine.winning_score = n;
        }
        if let Some(val) = get("AIRHOCKEY_GRAPHICS_FRAMERATE")
            && let Ok(n) = val.parse::<f64>()
        {
            self.loops.graphics_framerate = n;
        }
        if let Some(val) = get("AIRHOCKEY_PHYSICS_FRAME_RATIO")
            && let Ok(n) = val.parse::<u32>()
        {
            self.loops.physics_frame_ratio = n;
        }
        if let Some(val) = get("AIRHOCKEY_SENSOR_FRAMERATE")
            && let Ok(n) = val.parse::<f64>()
        {
            self.loops.sensor_framerate = n;
        }
        if let Some(val) = get("AIRHOCKEY_DETECTOR_SEED")
            && let Ok(n) = val.parse::<u64>()
        {
            self.detector.seed = Some(n);
        }
    }
}
