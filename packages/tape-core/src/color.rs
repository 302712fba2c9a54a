//! Ambient light colors derived from album color tags.
//!
//! Album descriptors carry a free-form color name. [`LedColor`] closes that
//! set; [`LedColor::from_tag`] is total, so every input resolves to a color
//! and unknown names fall back to white.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// RGB triple published on the LED topic as `{"r":..,"g":..,"b":..}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
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

/// Named colors the LED strip understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedColor {
    Red,
    Green,
    Blue,
    Yellow,
    Magenta,
    Cyan,
    #[default]
    White,
    Orange,
    Black,
}

impl LedColor {
    /// All named colors, in table order.
    pub const ALL: [LedColor; 9] = [
        Self::Red,
        Self::Green,
        Self::Blue,
        Self::Yellow,
        Self::Magenta,
        Self::Cyan,
        Self::White,
        Self::Orange,
        Self::Black,
    ];

    /// Resolves a color tag, ignoring case and surrounding whitespace.
    ///
    /// Unknown or empty tags resolve to [`LedColor::White`].
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim();
        Self::ALL
            .into_iter()
            .find(|color| color.name().eq_ignore_ascii_case(tag))
            .unwrap_or_default()
    }

    /// Resolves an optional tag; a missing tag is white.
    #[must_use]
    pub fn from_optional_tag(tag: Option<&str>) -> Self {
        tag.map(Self::from_tag).unwrap_or_default()
    }

    /// Lowercase name as used in descriptors.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Yellow => "yellow",
            Self::Magenta => "magenta",
            Self::Cyan => "cyan",
            Self::White => "white",
            Self::Orange => "orange",
            Self::Black => "black",
        }
    }

    pub const fn rgb(self) -> Rgb {
        match self {
            Self::Red => Rgb::new(255, 0, 0),
            Self::Green => Rgb::new(0, 255, 0),
            Self::Blue => Rgb::new(0, 0, 255),
            Self::Yellow => Rgb::new(255, 255, 0),
            Self::Magenta => Rgb::new(255, 0, 255),
            Self::Cyan => Rgb::new(0, 255, 255),
            Self::White => Rgb::new(255, 255, 255),
            Self::Orange => Rgb::new(255, 165, 0),
            Self::Black => Rgb::new(0, 0, 0),
        }
    }
}

impl FromStr for LedColor {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_tag(s))
    }
}

impl fmt::Display for LedColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
