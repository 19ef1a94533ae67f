//! Server-wide and per-player settings.
//!
//! Both structs load from JSON; every field has a default so partial files
//! are accepted.

use crate::region::RegionType;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smol_str::SmolStr;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid color '{0}'")]
    InvalidColor(String),
}

/// RGBA color, written as `#RRGGBB` or `#RRGGBBAA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: 0xFF }
    }
}

impl FromStr for Color {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| ConfigError::InvalidColor(s.to_string()))?;
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return Err(ConfigError::InvalidColor(s.to_string()));
        }
        let byte = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| ConfigError::InvalidColor(s.to_string()))
        };
        Ok(Color {
            r: byte(0)?,
            g: byte(2)?,
            b: byte(4)?,
            a: if hex.len() == 8 { byte(6)? } else { 0xFF },
        })
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)?;
        if self.a != 0xFF {
            write!(f, "{:02X}", self.a)?;
        }
        Ok(())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Colors used for selection overlays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Colors {
    #[serde(default = "default_region_line_color")]
    pub region_line_color: Color,
    #[serde(default = "default_region_point_color")]
    pub region_point_color: Color,
    #[serde(default = "default_main_hand_color")]
    pub main_hand_color: Color,
    #[serde(default = "default_off_hand_color")]
    pub off_hand_color: Color,
}

fn default_region_line_color() -> Color {
    Color::rgb(0xFF, 0xEC, 0x27)
}
fn default_region_point_color() -> Color {
    Color::rgb(0x10, 0xE4, 0x36)
}
fn default_main_hand_color() -> Color {
    Color::rgb(0xFF, 0x30, 0x40)
}
fn default_off_hand_color() -> Color {
    Color::rgb(0x29, 0xAD, 0xFF)
}

impl Default for Colors {
    fn default() -> Self {
        Colors {
            region_line_color: default_region_line_color(),
            region_point_color: default_region_point_color(),
            main_hand_color: default_main_hand_color(),
            off_hand_color: default_off_hand_color(),
        }
    }
}

/// Per-player settings, copied from `Config::player_default_config` when a
/// session is created and persisted with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_wand")]
    pub wand: SmolStr,
    #[serde(default)]
    pub default_region_type: RegionType,
    /// Minimum ticks between two accepted clicks of the same kind.
    #[serde(default = "default_minimum_response_tick")]
    pub minimum_response_tick: u64,
    #[serde(default = "default_history_length")]
    pub history_length: usize,
}

fn default_wand() -> SmolStr {
    SmolStr::new_inline("minecraft:wooden_axe")
}
fn default_minimum_response_tick() -> u64 {
    3
}
fn default_history_length() -> usize {
    20
}

impl Default for PlayerConfig {
    fn default() -> Self {
        PlayerConfig {
            wand: default_wand(),
            default_region_type: RegionType::default(),
            minimum_response_tick: default_minimum_response_tick(),
            history_length: default_history_length(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub version: i32,
    #[serde(default = "default_maximum_brush_length")]
    pub maximum_brush_length: u32,
    #[serde(default)]
    pub colors: Colors,
    #[serde(default)]
    pub player_default_config: PlayerConfig,
}

fn default_maximum_brush_length() -> u32 {
    2048
}

impl Default for Config {
    fn default() -> Self {
        Config {
            version: 0,
            maximum_brush_length: default_maximum_brush_length(),
            colors: Colors::default(),
            player_default_config: PlayerConfig::default(),
        }
    }
}

impl Config {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
