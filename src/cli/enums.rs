//! CLI enum types for charset, media kind and log level options.

use clap::ValueEnum;

use crate::ascii;
use crate::media::MediaKind;

/// Named glyph ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CharacterSet {
    Galaxy,
    Matrix,
    Full,
    Dense,
    Blocks,
    Standard,
    Cyberpunk,
    Simple,
}

impl From<CharacterSet> for ascii::CharSet {
    fn from(c: CharacterSet) -> Self {
        match c {
            CharacterSet::Galaxy => ascii::CharSet::Galaxy,
            CharacterSet::Matrix => ascii::CharSet::Matrix,
            CharacterSet::Full => ascii::CharSet::Full,
            CharacterSet::Dense => ascii::CharSet::Dense,
            CharacterSet::Blocks => ascii::CharSet::Blocks,
            CharacterSet::Standard => ascii::CharSet::Standard,
            CharacterSet::Cyberpunk => ascii::CharSet::Cyberpunk,
            CharacterSet::Simple => ascii::CharSet::Simple,
        }
    }
}

/// Declared media format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Kind {
    #[value(alias = "still")]
    Image,
    #[value(alias = "animated")]
    Gif,
    Video,
}

impl From<Kind> for MediaKind {
    fn from(k: Kind) -> Self {
        match k {
            Kind::Image => MediaKind::StillImage,
            Kind::Gif => MediaKind::AnimatedImage,
            Kind::Video => MediaKind::Video,
        }
    }
}

/// Verbosity of the log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}
