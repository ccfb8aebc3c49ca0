//! CLI argument parsing with clap.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use super::enums::{CharacterSet, Kind, LogLevel};
use crate::config::{Config, ConfigError, Rgb};

/// Render images, GIFs and videos as animated text art
#[derive(Parser, Debug)]
#[command(name = "textreel")]
#[command(version, about = "Text-art renderer for images, GIFs and video", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Log verbosity
    #[arg(long, global = true, default_value = "info")]
    pub log_level: LogLevel,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play media in the terminal; type key=value lines to tune live
    Play {
        #[command(flatten)]
        render: RenderArgs,

        /// Hide the status line
        #[arg(long)]
        no_status: bool,
    },
    /// Print rendered frames to stdout
    Render {
        #[command(flatten)]
        render: RenderArgs,

        /// Print only this frame (0-based)
        #[arg(long, conflicts_with = "all")]
        frame: Option<usize>,

        /// Print every frame, separated by form feeds
        #[arg(long)]
        all: bool,
    },
    /// List available character sets
    Charsets,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the configuration as key=value lines
    Export,
}

/// Media and rendering overrides shared by `play` and `render`.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct RenderArgs {
    /// Image path or URL (overrides the config file)
    pub locator: Option<String>,

    /// Declared media kind
    #[arg(long, short)]
    pub kind: Option<Kind>,

    /// Character columns
    #[arg(long, short)]
    pub width: Option<u32>,

    #[arg(long)]
    pub brightness: Option<f32>,

    #[arg(long)]
    pub contrast: Option<f32>,

    /// Blur radius in grid cells
    #[arg(long)]
    pub blur: Option<f32>,

    #[arg(long)]
    pub charset: Option<CharacterSet>,

    /// Playback and video sampling rate
    #[arg(long)]
    pub fps: Option<u32>,

    /// Row scale for glyph aspect (0.5 imagery, 0.45 tight)
    #[arg(long)]
    pub aspect: Option<f32>,

    /// Map dark pixels to the first glyph of the ramp
    #[arg(long)]
    pub darkest_first: bool,

    /// Glyph color (#rrggbb)
    #[arg(long)]
    pub color: Option<Rgb>,

    /// Background color (#rrggbb)
    #[arg(long)]
    pub background: Option<Rgb>,

    #[arg(long)]
    pub glow: Option<f32>,

    /// Most frames sampled from a video
    #[arg(long)]
    pub frame_limit: Option<u32>,
}

impl RenderArgs {
    /// Layer the flags over `config` and validate the result.
    pub fn apply_to(&self, mut config: Config) -> Result<Config, ConfigError> {
        if let Some(locator) = &self.locator {
            config.media_locator = locator.clone();
        }
        if let Some(kind) = self.kind {
            config.media_kind = kind.into();
        }
        if let Some(width) = self.width {
            config.grid_width = width;
        }
        if let Some(brightness) = self.brightness {
            config.brightness = brightness;
        }
        if let Some(contrast) = self.contrast {
            config.contrast = contrast;
        }
        if let Some(blur) = self.blur {
            config.blur = blur;
        }
        if let Some(charset) = self.charset {
            config.charset = crate::ascii::CharSet::from(charset).name().to_string();
        }
        if let Some(fps) = self.fps {
            config.target_fps = fps;
        }
        if let Some(aspect) = self.aspect {
            config.aspect_correction = aspect;
        }
        if self.darkest_first {
            config.palette_order = crate::ascii::PaletteOrder::DarkestFirst;
        }
        if let Some(color) = self.color {
            config.glyph_color = color;
        }
        if let Some(background) = self.background {
            config.background_color = background;
        }
        if let Some(glow) = self.glow {
            config.glow_intensity = glow;
        }
        if let Some(limit) = self.frame_limit {
            config.video_frame_limit = limit;
        }
        config.validate()?;
        Ok(config)
    }
}
