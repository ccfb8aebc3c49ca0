//! Subcommand handlers for play, render, charsets and config actions.

use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncBufReadExt;

use super::args::ConfigAction;
use crate::ascii::{CharSet, PaletteOrder};
use crate::config::{default_path as get_config_path, split_key_value, Config, ConfigError};
use crate::engine::Engine;
use crate::frame_cache::{build_cache, FrameCache};
use crate::media::{self, MediaError};
use crate::pipeline::CancelToken;
use crate::renderer;

/// Errors surfaced by the `play` and `render` subcommands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("No media locator given (pass one or set media_locator in the config)")]
    NoLocator,

    #[error("Frame {index} out of range: media has {count} frames")]
    FrameOutOfRange { index: usize, count: usize },

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// List every charset with its ramp, lightest input first.
pub fn list_charsets() {
    println!("Available character sets:");
    for charset in CharSet::ALL {
        let palette = charset.palette(PaletteOrder::LightestFirst);
        let ramp: String = palette.glyphs().iter().collect();
        println!("  {:<10} [{}] {}", charset.name(), palette.len(), ramp);
    }
    println!();
    println!("Use --charset <name> or charset = \"<name>\" in the config file.");
}

/// Load, ingest and rasterize the configured media in one pass.
pub async fn build_once(config: &Config) -> Result<FrameCache, CommandError> {
    if config.media_locator.trim().is_empty() {
        return Err(CommandError::NoLocator);
    }
    let source = media::load(
        &config.media_locator,
        config.media_kind,
        &config.load_options(),
    )
    .await?;
    let raster = config.raster_settings()?;
    let ingest = config.ingest_settings();
    let cache = tokio::task::spawn_blocking(move || {
        build_cache(&source, &ingest, &raster, &CancelToken::never())
    })
    .await??;
    Ok(cache)
}

/// Print one frame, or every frame separated by form feeds.
pub async fn render<W: Write>(
    config: &Config,
    frame: Option<usize>,
    all: bool,
    out: &mut W,
) -> Result<(), CommandError> {
    let cache = build_once(config).await?;
    if cache.is_empty() {
        log::warn!("No readable frames in {}", config.media_locator);
        return Ok(());
    }

    if all {
        for (i, grid) in cache.grids().iter().enumerate() {
            if i > 0 {
                writeln!(out, "\x0c")?;
            }
            writeln!(out, "{}", grid)?;
        }
    } else {
        let index = frame.unwrap_or(0);
        let grid = cache.get(index).ok_or(CommandError::FrameOutOfRange {
            index,
            count: cache.len(),
        })?;
        writeln!(out, "{}", grid)?;
    }
    out.flush()?;
    Ok(())
}

/// Play in the terminal until Ctrl+C, `q` on stdin, or stdin closing.
///
/// Every other stdin line is read as a `key=value` config edit.
pub async fn play(config: Config, show_status: bool, interrupted: Arc<AtomicBool>) -> Result<(), CommandError> {
    if config.media_locator.trim().is_empty() {
        return Err(CommandError::NoLocator);
    }
    let handle = Engine::spawn(config)?;
    let mut snapshots = handle.snapshots();
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let mut stdout = std::io::stdout();
    renderer::enter_screen(&mut stdout)?;

    let mut poll = tokio::time::interval(Duration::from_millis(100));
    poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let result: Result<(), CommandError> = loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if let Err(e) = renderer::draw(&mut stdout, &snapshot, show_status) {
                    break Err(e.into());
                }
            }

            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line == "q" || line == "quit" {
                        break Ok(());
                    }
                    if !line.is_empty() {
                        match split_key_value(line) {
                            Ok((key, value)) => {
                                handle.set_field(key, value);
                            }
                            Err(e) => log::warn!("Ignoring input: {}", e),
                        }
                    }
                }
                Ok(None) => stdin_open = false,
                Err(e) => {
                    log::warn!("stdin closed: {}", e);
                    stdin_open = false;
                }
            },

            _ = poll.tick() => {
                if interrupted.load(Ordering::SeqCst) {
                    break Ok(());
                }
            }
        }
    };

    renderer::leave_screen(&mut stdout)?;
    handle.shutdown().await;
    result
}

/// Handle config subcommand actions.
pub fn handle_config_action(action: ConfigAction, path: Option<&Path>) {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);
    match action {
        ConfigAction::Show => {
            let config = match Config::load(Some(&config_path)) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            println!("Current configuration:");
            for line in config.to_key_values().lines() {
                println!("  {}", line);
            }
            println!();
            if config_path.exists() {
                println!("Config file: {} (exists)", config_path.display());
            } else {
                println!("Config file: {} (not found)", config_path.display());
            }
        }
        ConfigAction::Init { force } => {
            if config_path.exists() && !force {
                eprintln!("Config file already exists: {}", config_path.display());
                eprintln!("Use 'textreel config show' to view current settings, or --force to overwrite.");
                std::process::exit(1);
            }
            if let Err(e) = Config::default().save(&config_path) {
                eprintln!("Error writing config file: {}", e);
                std::process::exit(1);
            }
            println!("Created config file: {}", config_path.display());
        }
        ConfigAction::Export => match Config::load(Some(&config_path)) {
            Ok(config) => println!("{}", config.to_key_values()),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn write_png(dir: &Path, name: &str, img: &RgbaImage) -> String {
        let path = dir.join(name);
        img.save_with_format(&path, ImageFormat::Png).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_render_prints_frame() {
        let dir = tempfile::tempdir().unwrap();
        let img = RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255]));
        let config = Config {
            media_locator: write_png(dir.path(), "white.png", &img),
            media_kind: crate::media::MediaKind::StillImage,
            grid_width: 4,
            charset: "standard".to_string(),
            ..Config::default()
        };
        let mut out = Vec::new();
        render(&config, None, false, &mut out).await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "@@@@\n@@@@\n");
    }

    #[tokio::test]
    async fn test_render_frame_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let config = Config {
            media_locator: write_png(dir.path(), "black.png", &img),
            media_kind: crate::media::MediaKind::StillImage,
            grid_width: 2,
            ..Config::default()
        };
        let err = render(&config, Some(5), false, &mut Vec::new()).await.unwrap_err();
        assert!(matches!(err, CommandError::FrameOutOfRange { index: 5, count: 1 }));
    }

    #[tokio::test]
    async fn test_build_once_requires_locator() {
        let err = build_once(&Config::default()).await.unwrap_err();
        assert!(matches!(err, CommandError::NoLocator));
    }
}
