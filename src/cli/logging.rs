//! File logging setup.
//!
//! The terminal is owned by the renderer during playback, so logs only ever
//! go to a file.

use std::fs::File;
use std::path::Path;

use log::LevelFilter;
use simplelog::{ConfigBuilder, WriteLogger};

/// Errors that can occur while installing the logger.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to create log file '{}': {source}", .path.display())]
    Create {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("Logger already installed: {0}")]
    AlreadySet(#[from] log::SetLoggerError),
}

/// Install a file logger at `level`. Without a path nothing is installed and
/// every `log` call is a no-op.
pub fn init_logging(path: Option<&Path>, level: LevelFilter) -> Result<(), LoggingError> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = File::create(path).map_err(|e| LoggingError::Create {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config = ConfigBuilder::new()
        .set_thread_level(LevelFilter::Debug)
        .set_target_level(LevelFilter::Debug)
        .build();
    WriteLogger::init(level, config, file)?;
    log::info!("Logging to {} at {}", path.display(), level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_path_is_noop() {
        assert!(init_logging(None, LevelFilter::Info).is_ok());
    }

    #[test]
    fn test_unwritable_path_is_error() {
        let err = init_logging(Some(Path::new("/definitely/missing/dir/log.txt")), LevelFilter::Info)
            .unwrap_err();
        assert!(matches!(err, LoggingError::Create { .. }));
    }
}
