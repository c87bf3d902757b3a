//! Transform options shared by every item of a batch.

use crate::error::{Error, ErrorKind};
use derive_more::Display;
use std::str::FromStr;

/// How the source is fitted into the requested box.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Hash)]
pub enum Fit {
    /// Scale to cover the box, then crop the overflow at [`Position`].
    #[default]
    #[display("cover")]
    Cover,
    /// Scale to fit within the box, then pad to the box with the background.
    #[display("contain")]
    Contain,
    /// Stretch to the box, ignoring aspect ratio.
    #[display("fill")]
    Fill,
    /// Scale to fit within the box, no padding.
    #[display("inside")]
    Inside,
    /// Scale so both axes reach the box, no cropping.
    #[display("outside")]
    Outside,
}
impl FromStr for Fit {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cover" => Ok(Fit::Cover),
            "contain" => Ok(Fit::Contain),
            "fill" => Ok(Fit::Fill),
            "inside" => Ok(Fit::Inside),
            "outside" => Ok(Fit::Outside),
            _ => exn::bail!(ErrorKind::InvalidSpec(format!("fit {s:?}"))),
        }
    }
}

/// Gravity used when cropping (`cover`) or padding (`contain`).
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Hash)]
pub enum Position {
    #[default]
    #[display("center")]
    Center,
    #[display("north")]
    North,
    #[display("northeast")]
    NorthEast,
    #[display("east")]
    East,
    #[display("southeast")]
    SouthEast,
    #[display("south")]
    South,
    #[display("southwest")]
    SouthWest,
    #[display("west")]
    West,
    #[display("northwest")]
    NorthWest,
}
impl FromStr for Position {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', '_'], " ");
        let words: Vec<&str> = normalized.split_whitespace().collect();
        let position = match words.as_slice() {
            ["center" | "centre"] => Position::Center,
            ["top" | "north"] => Position::North,
            ["right" | "east"] => Position::East,
            ["bottom" | "south"] => Position::South,
            ["left" | "west"] => Position::West,
            ["northeast"] | ["right", "top"] | ["top", "right"] => Position::NorthEast,
            ["southeast"] | ["right", "bottom"] | ["bottom", "right"] => Position::SouthEast,
            ["southwest"] | ["left", "bottom"] | ["bottom", "left"] => Position::SouthWest,
            ["northwest"] | ["left", "top"] | ["top", "left"] => Position::NorthWest,
            _ => exn::bail!(ErrorKind::InvalidSpec(format!("position {s:?}"))),
        };
        Ok(position)
    }
}
impl Position {
    /// Offset of a `inner` span within an `outer` span along each axis.
    ///
    /// `free_x`/`free_y` are the spare pixels (outer minus inner) on each
    /// axis; the result is how many of them go before the inner span.
    pub(crate) fn offset(self, free_x: u32, free_y: u32) -> (u32, u32) {
        let (h, v) = match self {
            Position::Center => (Align::Middle, Align::Middle),
            Position::North => (Align::Middle, Align::Start),
            Position::NorthEast => (Align::End, Align::Start),
            Position::East => (Align::End, Align::Middle),
            Position::SouthEast => (Align::End, Align::End),
            Position::South => (Align::Middle, Align::End),
            Position::SouthWest => (Align::Start, Align::End),
            Position::West => (Align::Start, Align::Middle),
            Position::NorthWest => (Align::Start, Align::Start),
        };
        (h.apply(free_x), v.apply(free_y))
    }
}

#[derive(Clone, Copy)]
enum Align {
    Start,
    Middle,
    End,
}
impl Align {
    fn apply(self, free: u32) -> u32 {
        match self {
            Align::Start => 0,
            Align::Middle => free / 2,
            Align::End => free,
        }
    }
}

/// Output encoding.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    #[display("jpeg")]
    Jpeg,
    #[display("png")]
    Png,
    #[default]
    #[display("webp")]
    Webp,
    #[display("avif")]
    Avif,
    #[display("gif")]
    Gif,
    /// Re-encode in whatever format the source was decoded from.
    #[display("original")]
    Original,
}
impl FromStr for OutputFormat {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::Webp),
            "avif" => Ok(OutputFormat::Avif),
            "gif" => Ok(OutputFormat::Gif),
            "original" => Ok(OutputFormat::Original),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Lossy encoder quality, `1..=100`.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quality(u8);
impl Quality {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 100;

    pub fn new(value: u32) -> Result<Self, Error> {
        match u8::try_from(value) {
            Ok(value @ Self::MIN..=Self::MAX) => Ok(Self(value)),
            _ => exn::bail!(ErrorKind::InvalidSpec(format!("quality {value} is outside 1..=100"))),
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}
impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

/// Background colour used for `contain` padding and for flattening alpha
/// into formats that have none.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Background(pub [u8; 4]);
impl Default for Background {
    fn default() -> Self {
        Self([0xff, 0xff, 0xff, 0xff])
    }
}
impl FromStr for Background {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ErrorKind::InvalidSpec(format!("background {s:?}"));
        let trimmed = s.trim().to_lowercase();
        match trimmed.as_str() {
            "white" => return Ok(Self([0xff, 0xff, 0xff, 0xff])),
            "black" => return Ok(Self([0, 0, 0, 0xff])),
            "transparent" => return Ok(Self([0, 0, 0, 0])),
            _ => {},
        }
        let hex = trimmed.strip_prefix('#').unwrap_or(&trimmed);
        // `from_str_radix` alone would take a leading `+`.
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            exn::bail!(invalid());
        }
        let nibble = |i: usize| u8::from_str_radix(&hex[i..=i], 16).map(|n| n * 0x11);
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
        let parsed = match hex.len() {
            3 => (nibble(0), nibble(1), nibble(2), Ok(0xff)),
            4 => (nibble(0), nibble(1), nibble(2), nibble(3)),
            6 => (byte(0), byte(2), byte(4), Ok(0xff)),
            8 => (byte(0), byte(2), byte(4), byte(6)),
            _ => exn::bail!(invalid()),
        };
        match parsed {
            (Ok(r), Ok(g), Ok(b), Ok(a)) => Ok(Self([r, g, b, a])),
            _ => exn::bail!(invalid()),
        }
    }
}

/// The full set of rules applied to every item of a batch.
///
/// Built once, validated, then shared read-only between workers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransformSpec {
    /// Target width. `None` (or zero, see [`TransformSpec::with_size`]) leaves it unset.
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fit: Fit,
    pub position: Position,
    pub format: OutputFormat,
    pub quality: Quality,
    pub background: Background,
    pub strip_metadata: bool,
}
impl TransformSpec {
    /// Defaults for a batch: cover, centred, WebP at quality 80 on white,
    /// metadata stripped.
    pub fn new() -> Self {
        Self { strip_metadata: true, ..Default::default() }
    }

    /// Set the requested box. Zero on either axis means "not set".
    pub fn with_size(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.width = width.filter(|w| *w > 0);
        self.height = height.filter(|h| *h > 0);
        self
    }
}
