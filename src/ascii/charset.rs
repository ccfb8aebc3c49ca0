//! Named glyph palettes for text-art rendering.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Heavy-to-light ramp that mixes block shades with ASCII punctuation.
pub const DENSE_CHARSET: &str = "█▓▒░@&#%*+=-:. ";

/// Classic 9-level ASCII ramp.
pub const STANDARD_CHARSET: &str = "@%#*+=:. ";

/// Same ramp as [`STANDARD_CHARSET`]; kept as its own name for presets.
pub const GALAXY_CHARSET: &str = "@%#*+=:. ";

/// Unicode shade blocks only (5 levels).
pub const BLOCKS_CHARSET: &str = "█▓▒░ ";

/// Light-to-heavy ramp. Under the default order this renders as a negative.
pub const SIMPLE_CHARSET: &str = " .:-=+*#%@";

/// Half-width katakana followed by digits, capitals and punctuation.
pub const MATRIX_CHARSET: &str = "ｦｱｳｴｵｶｷｹｺｻｼｽｾｿﾀﾂﾃﾅﾆﾇﾈﾊﾋﾎﾏﾐﾑﾒﾓﾔﾕﾗﾘﾜ0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ$@%#&*+=:;,.<>?/\\|[]{}()\"'`~!^_- ";

/// Every printable ASCII letter, digit and symbol.
pub const FULL_CHARSET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789$@%#&*+=:;,.<>?/\\|[]{}()\"'`~!^_- ";

/// Katakana mixed with box and math symbols.
pub const CYBERPUNK_CHARSET: &str = "ﾊﾐﾋｰｳｼﾅﾓﾆｻﾜﾂｵﾘｱﾎﾃﾏｹﾒｴｶｷﾑﾕﾗｾﾈｽﾀﾇﾍ0123456789Z:・.\"=*+-<>¦｜ç∏ ";

/// Palette identifier used by the configuration and the CLI.
///
/// Every ramp is stored lightest-input first: index 0 is the glyph used for
/// a white cell when the palette order is [`PaletteOrder::LightestFirst`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CharSet {
    Galaxy,
    Matrix,
    Full,
    #[default]
    Dense,
    Blocks,
    Standard,
    Cyberpunk,
    Simple,
}

impl CharSet {
    /// All palettes in display order.
    pub const ALL: [CharSet; 8] = [
        CharSet::Galaxy,
        CharSet::Matrix,
        CharSet::Full,
        CharSet::Dense,
        CharSet::Blocks,
        CharSet::Standard,
        CharSet::Cyberpunk,
        CharSet::Simple,
    ];

    /// The glyph ramp for this palette.
    pub fn chars(&self) -> &'static str {
        match self {
            CharSet::Galaxy => GALAXY_CHARSET,
            CharSet::Matrix => MATRIX_CHARSET,
            CharSet::Full => FULL_CHARSET,
            CharSet::Dense => DENSE_CHARSET,
            CharSet::Blocks => BLOCKS_CHARSET,
            CharSet::Standard => STANDARD_CHARSET,
            CharSet::Cyberpunk => CYBERPUNK_CHARSET,
            CharSet::Simple => SIMPLE_CHARSET,
        }
    }

    /// Cycle to the next palette, wrapping after the last one.
    pub fn next(&self) -> Self {
        let pos = Self::ALL.iter().position(|c| c == self).unwrap_or(0);
        Self::ALL[(pos + 1) % Self::ALL.len()]
    }

    /// Lowercase name as used in config files.
    pub fn name(&self) -> &'static str {
        match self {
            CharSet::Galaxy => "galaxy",
            CharSet::Matrix => "matrix",
            CharSet::Full => "full",
            CharSet::Dense => "dense",
            CharSet::Blocks => "blocks",
            CharSet::Standard => "standard",
            CharSet::Cyberpunk => "cyberpunk",
            CharSet::Simple => "simple",
        }
    }

    /// Look a palette up by name, ignoring case and surrounding whitespace.
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = name.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(wanted))
    }

    /// Build a sampling palette from this ramp.
    pub fn palette(&self, order: PaletteOrder) -> Palette {
        Palette::new(self.chars(), order)
    }
}

impl fmt::Display for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CharSet {
    type Err = UnknownCharSet;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownCharSet(s.to_string()))
    }
}

/// Returned when a palette name is not in the table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown charset '{0}' (expected one of: galaxy, matrix, full, dense, blocks, standard, cyberpunk, simple)")]
pub struct UnknownCharSet(pub String);

/// How a ramp is read against luminance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaletteOrder {
    /// Index 0 is drawn for the brightest input.
    #[default]
    LightestFirst,
    /// Index 0 is drawn for the darkest input.
    DarkestFirst,
}

impl PaletteOrder {
    pub fn name(&self) -> &'static str {
        match self {
            PaletteOrder::LightestFirst => "lightest-first",
            PaletteOrder::DarkestFirst => "darkest-first",
        }
    }
}

/// A glyph ramp ready for sampling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    glyphs: Vec<char>,
    order: PaletteOrder,
}

impl Palette {
    /// Build a palette from a ramp string. An empty ramp falls back to a
    /// single space so sampling never indexes out of bounds.
    pub fn new(ramp: &str, order: PaletteOrder) -> Self {
        let mut glyphs: Vec<char> = ramp.chars().collect();
        if glyphs.is_empty() {
            glyphs.push(' ');
        }
        Self { glyphs, order }
    }

    pub fn glyphs(&self) -> &[char] {
        &self.glyphs
    }

    pub fn order(&self) -> PaletteOrder {
        self.order
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Always false: construction guarantees at least one glyph.
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Glyph drawn for a fully white cell.
    pub fn lightest(&self) -> char {
        self.glyph_for(1.0)
    }

    /// Glyph drawn for a fully black cell.
    pub fn darkest(&self) -> char {
        self.glyph_for(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_is_case_insensitive() {
        assert_eq!(CharSet::from_name("Dense"), Some(CharSet::Dense));
        assert_eq!(CharSet::from_name(" BLOCKS "), Some(CharSet::Blocks));
        assert_eq!(CharSet::from_name("nope"), None);
    }

    #[test]
    fn test_from_str_error_names_the_charset() {
        let err = "sparkles".parse::<CharSet>().unwrap_err();
        assert!(err.to_string().contains("sparkles"));
    }

    #[test]
    fn test_next_cycles_through_all() {
        let mut c = CharSet::Galaxy;
        for _ in 0..CharSet::ALL.len() {
            c = c.next();
        }
        assert_eq!(c, CharSet::Galaxy);
        assert_eq!(CharSet::Simple.next(), CharSet::Galaxy);
    }

    #[test]
    fn test_names_round_trip() {
        for c in CharSet::ALL {
            assert_eq!(c.name().parse::<CharSet>().unwrap(), c);
        }
    }

    #[test]
    fn test_all_ramps_non_empty() {
        for c in CharSet::ALL {
            assert!(!c.chars().is_empty(), "{} has no glyphs", c);
        }
    }

    #[test]
    fn test_empty_ramp_falls_back_to_space() {
        let p = Palette::new("", PaletteOrder::LightestFirst);
        assert_eq!(p.glyphs(), &[' ']);
        assert!(!p.is_empty());
    }

    #[test]
    fn test_lightest_and_darkest_follow_order() {
        let p = CharSet::Blocks.palette(PaletteOrder::LightestFirst);
        assert_eq!(p.lightest(), '█');
        assert_eq!(p.darkest(), ' ');

        let p = CharSet::Blocks.palette(PaletteOrder::DarkestFirst);
        assert_eq!(p.lightest(), ' ');
        assert_eq!(p.darkest(), '█');
    }
}
