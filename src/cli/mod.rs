//! Command-line interface definitions and helpers.
//!
//! This module contains all CLI argument parsing, enums, logging setup and
//! subcommand handlers.

mod args;
mod commands;
mod enums;
mod logging;

pub use args::{Args, Command, ConfigAction, RenderArgs};
pub use commands::{build_once, handle_config_action, list_charsets, play, render, CommandError};
pub use enums::{CharacterSet, Kind, LogLevel};
pub use logging::{init_logging, LoggingError};
