//! Configuration file handling for textreel.
//!
//! Loads configuration from `~/.config/textreel/config.toml` or a custom path.
//! The same record can be exported to and parsed from flat `key=value` lines.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ascii::{CharSet, PaletteOrder, ToneAdjust, DEFAULT_ASPECT_CORRECTION};
use crate::media::{IngestSettings, LoadOptions, MediaKind};
use crate::raster::RasterSettings;

/// Every tunable parameter of the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Character columns per grid
    pub grid_width: u32,
    pub brightness: f32,
    pub contrast: f32,
    /// Blur radius in grid cells
    pub blur: f32,
    pub charset: String,
    pub palette_order: PaletteOrder,
    /// Row scale compensating for glyphs being taller than wide
    pub aspect_correction: f32,
    pub media_locator: String,
    pub media_kind: MediaKind,
    pub target_fps: u32,
    pub video_frame_limit: u32,
    pub seek_timeout_ms: u64,
    pub max_media_bytes: u64,
    pub debounce_ms: u64,
    pub glyph_color: Rgb,
    pub background_color: Rgb,
    pub glow_intensity: f32,
    pub display_scale: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grid_width: 200,
            brightness: 1.0,
            contrast: 3.0,
            blur: 0.0,
            charset: CharSet::Dense.name().to_string(),
            palette_order: PaletteOrder::LightestFirst,
            aspect_correction: DEFAULT_ASPECT_CORRECTION,
            media_locator: String::new(),
            media_kind: MediaKind::AnimatedImage,
            target_fps: 30,
            video_frame_limit: 120,
            seek_timeout_ms: 5000,
            max_media_bytes: 64 * 1024 * 1024,
            debounce_ms: 200,
            glyph_color: Rgb::new(0x4a, 0xde, 0x80),
            background_color: Rgb::new(0, 0, 0),
            glow_intensity: 20.0,
            display_scale: 0.8,
        }
    }
}

/// How far a configuration change reaches into the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChangeImpact {
    None,
    /// Only how frames are drawn changes.
    Presentation,
    /// The frame cache must be rebuilt from the loaded media.
    Rasterization,
    /// The media source itself must be reloaded.
    MediaIdentity,
}

/// Field names in export order.
pub const FIELDS: [&str; 18] = [
    "grid_width",
    "brightness",
    "contrast",
    "blur",
    "charset",
    "palette_order",
    "aspect_correction",
    "media_locator",
    "media_kind",
    "target_fps",
    "video_frame_limit",
    "seek_timeout_ms",
    "max_media_bytes",
    "debounce_ms",
    "glyph_color",
    "background_color",
    "glow_intensity",
    "display_scale",
];

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed or is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            source: e,
        })?;
        config.validate()?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Write the config as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let body = toml::to_string_pretty(self)?;
        let content = format!("# textreel configuration\n\n{}", body);
        std::fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_width < 1 {
            return Err(ConfigError::invalid("grid_width", "must be at least 1"));
        }
        if self.target_fps < 1 {
            return Err(ConfigError::invalid("target_fps", "must be at least 1"));
        }
        for (field, value) in [
            ("brightness", self.brightness),
            ("contrast", self.contrast),
            ("blur", self.blur),
            ("glow_intensity", self.glow_intensity),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::invalid(field, "must be a non-negative number"));
            }
        }
        for (field, value) in [
            ("display_scale", self.display_scale),
            ("aspect_correction", self.aspect_correction),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::invalid(field, "must be a positive number"));
            }
        }
        if self.video_frame_limit < 1 {
            return Err(ConfigError::invalid("video_frame_limit", "must be at least 1"));
        }
        if self.seek_timeout_ms < 1 {
            return Err(ConfigError::invalid("seek_timeout_ms", "must be at least 1"));
        }
        self.charset()?;
        Ok(())
    }

    pub fn charset(&self) -> Result<CharSet, ConfigError> {
        CharSet::from_name(&self.charset)
            .ok_or_else(|| ConfigError::UnknownCharset(self.charset.clone()))
    }

    /// Snapshot of everything the rasterizer reads.
    pub fn raster_settings(&self) -> Result<RasterSettings, ConfigError> {
        Ok(RasterSettings {
            grid_width: self.grid_width,
            tone: ToneAdjust {
                brightness: self.brightness,
                contrast: self.contrast,
                blur: self.blur,
            },
            palette: self.charset()?.palette(self.palette_order),
            aspect_correction: self.aspect_correction,
        })
    }

    pub fn ingest_settings(&self) -> IngestSettings {
        IngestSettings {
            target_fps: self.target_fps,
            frame_limit: self.video_frame_limit,
            seek_timeout: Duration::from_millis(self.seek_timeout_ms),
        }
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            max_bytes: self.max_media_bytes,
            ..LoadOptions::default()
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Classify what changed between `self` and `next`, returning the
    /// widest impact.
    pub fn impact_of(&self, next: &Config) -> ChangeImpact {
        if self.media_locator != next.media_locator || self.media_kind != next.media_kind {
            return ChangeImpact::MediaIdentity;
        }
        // max_media_bytes only applies at load time
        if self.grid_width != next.grid_width
            || self.brightness != next.brightness
            || self.contrast != next.contrast
            || self.blur != next.blur
            || self.charset != next.charset
            || self.palette_order != next.palette_order
            || self.aspect_correction != next.aspect_correction
            || self.target_fps != next.target_fps
            || self.video_frame_limit != next.video_frame_limit
            || self.seek_timeout_ms != next.seek_timeout_ms
        {
            return ChangeImpact::Rasterization;
        }
        if self != next {
            return ChangeImpact::Presentation;
        }
        ChangeImpact::None
    }

    /// Read one field as its `key=value` text.
    pub fn get_field(&self, key: &str) -> Result<String, ConfigError> {
        let value = match key {
            "grid_width" => self.grid_width.to_string(),
            "brightness" => self.brightness.to_string(),
            "contrast" => self.contrast.to_string(),
            "blur" => self.blur.to_string(),
            "charset" => self.charset.clone(),
            "palette_order" => self.palette_order.name().to_string(),
            "aspect_correction" => self.aspect_correction.to_string(),
            "media_locator" => self.media_locator.clone(),
            "media_kind" => self.media_kind.name().to_string(),
            "target_fps" => self.target_fps.to_string(),
            "video_frame_limit" => self.video_frame_limit.to_string(),
            "seek_timeout_ms" => self.seek_timeout_ms.to_string(),
            "max_media_bytes" => self.max_media_bytes.to_string(),
            "debounce_ms" => self.debounce_ms.to_string(),
            "glyph_color" => self.glyph_color.to_string(),
            "background_color" => self.background_color.to_string(),
            "glow_intensity" => self.glow_intensity.to_string(),
            "display_scale" => self.display_scale.to_string(),
            other => return Err(ConfigError::UnknownField(other.to_string())),
        };
        Ok(value)
    }

    /// Set one field from its text form. Does not validate the whole record.
    pub fn set_field(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match key.trim() {
            "grid_width" => self.grid_width = parse_value(key, value)?,
            "brightness" => self.brightness = parse_value(key, value)?,
            "contrast" => self.contrast = parse_value(key, value)?,
            "blur" => self.blur = parse_value(key, value)?,
            "charset" => self.charset = value.to_string(),
            "palette_order" => {
                self.palette_order = match value {
                    "lightest-first" => PaletteOrder::LightestFirst,
                    "darkest-first" => PaletteOrder::DarkestFirst,
                    _ => {
                        return Err(ConfigError::invalid(
                            "palette_order",
                            "expected lightest-first or darkest-first",
                        ))
                    }
                }
            }
            "aspect_correction" => self.aspect_correction = parse_value(key, value)?,
            "media_locator" => self.media_locator = value.to_string(),
            "media_kind" => {
                self.media_kind = value
                    .parse()
                    .map_err(|e: String| ConfigError::invalid("media_kind", e))?
            }
            "target_fps" => self.target_fps = parse_value(key, value)?,
            "video_frame_limit" => self.video_frame_limit = parse_value(key, value)?,
            "seek_timeout_ms" => self.seek_timeout_ms = parse_value(key, value)?,
            "max_media_bytes" => self.max_media_bytes = parse_value(key, value)?,
            "debounce_ms" => self.debounce_ms = parse_value(key, value)?,
            "glyph_color" => self.glyph_color = parse_value(key, value)?,
            "background_color" => self.background_color = parse_value(key, value)?,
            "glow_intensity" => self.glow_intensity = parse_value(key, value)?,
            "display_scale" => self.display_scale = parse_value(key, value)?,
            other => return Err(ConfigError::UnknownField(other.to_string())),
        }
        Ok(())
    }

    /// Flat diagnostics export: one `key=value` line per field.
    pub fn to_key_values(&self) -> String {
        FIELDS
            .iter()
            .filter_map(|key| self.get_field(key).ok().map(|v| format!("{}={}", key, v)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Parse the export form back. Blank lines and `#` comments are skipped;
    /// fields not mentioned keep their defaults.
    pub fn from_key_values(text: &str) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = split_key_value(line)?;
            config.set_field(key, value)?;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Split a `key=value` line.
pub fn split_key_value(line: &str) -> Result<(&str, &str), ConfigError> {
    line.split_once('=')
        .map(|(k, v)| (k.trim(), v.trim()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| ConfigError::Export(format!("expected key=value, got '{}'", line)))
}

fn parse_value<T>(field: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| ConfigError::invalid(field, format!("'{}': {}", value, e)))
}

/// An opaque RGB color written as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = String;

    /// Accepts `#rrggbb` and `#rgb`, with or without the `#`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        let bad = || format!("invalid color '{}'", s);
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(bad());
        }
        let channel = |h: &str| u8::from_str_radix(h, 16).map_err(|_| bad());
        match hex.len() {
            6 => Ok(Rgb::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let expand = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                Ok(Rgb::new(expand(0)?, expand(1)?, expand(2)?))
            }
            _ => Err(bad()),
        }
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

/// Errors that can occur when loading or editing configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("Unknown charset '{0}'")]
    UnknownCharset(String),

    #[error("Unknown config field '{0}'")]
    UnknownField(String),

    #[error("Malformed key=value text: {0}")]
    Export(String),
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("textreel").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/textreel/config.toml")
        })
}
