//! The validated in-memory form of one render job

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::assets::ImagePayload;
use crate::sanitize::{
    self, clean_text, parse_float, parse_int, Rgb, TextRule, BG_SCALE_RANGE, MAIN_SCALE_RANGE,
    OFFSET_RANGE,
};
use crate::{Error, Result};

/// Largest accepted card edge in CSS pixels.
pub const MAX_DIMENSION: i64 = 4096;
/// Largest accepted device-pixel-ratio.
pub const MAX_DPR: f64 = 4.0;

/// Output encoding requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
    Pdf,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "pdf" => Ok(OutputFormat::Pdf),
            other => Err(Error::InvalidInput(format!("unsupported format {other:?}"))),
        }
    }
}

/// Compiled-in cosmetic defaults applied when a field is not supplied.
#[derive(Debug, Clone)]
pub struct CardDefaults {
    pub width: i64,
    pub height: i64,
    pub dpr: f64,
    pub main_scale: i64,
    pub bg_scale: i64,
    pub border_color: String,
    pub border_width: i64,
    pub radius: i64,
    pub bg_blur: i64,
}

impl Default for CardDefaults {
    fn default() -> Self {
        Self {
            width: 384,
            height: 576,
            dpr: 3.0,
            main_scale: 92,
            bg_scale: 100,
            border_color: "#d4af37".to_string(),
            border_width: 12,
            radius: 28,
            bg_blur: 4,
        }
    }
}

/// Raw text fields of a card submission, keyed by form field name.
#[derive(Debug, Clone, Default)]
pub struct CardForm {
    fields: HashMap<String, String>,
}

impl CardForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    fn int(&self, name: &str, default: i64) -> Result<i64> {
        parse_int(name, self.get(name), default)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CardForm {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

const PLAYER_NAME: TextRule = TextRule { fallback: "Invité", max_len: 40, allow_empty: false };
const TEAM_NAME: TextRule = TextRule { fallback: "Équipe", max_len: 28, allow_empty: true };
const CHAMPION_NAME: TextRule = TextRule { fallback: "Champion", max_len: 32, allow_empty: false };
const PLAYSTYLE: TextRule = TextRule { fallback: "Aggresseur", max_len: 16, allow_empty: false };
const SIDE_TAG: TextRule = TextRule { fallback: "Saison Arcade 2025", max_len: 48, allow_empty: true };
const BADGE_TEXT: TextRule = TextRule { fallback: "ARC", max_len: 20, allow_empty: true };
const RATING_TEXT: TextRule = TextRule { fallback: "100", max_len: 8, allow_empty: true };
const CORNER_LABEL: TextRule = TextRule { fallback: "FGC", max_len: 6, allow_empty: true };

/// Clamped styling numerics.
#[derive(Debug, Clone, PartialEq)]
pub struct CardStyle {
    pub accent: Rgb,
    pub border_width: i64,
    pub frame_pad: i64,
    pub radius: i64,
    pub bg_blur: i64,
    /// Unitless ratios, e.g. 0.92
    pub main_scale: f64,
    pub bg_scale: f64,
    pub main_offset: (i64, i64),
    pub bg_offset: (i64, i64),
}

/// Display strings, already truncated and HTML-escaped.
#[derive(Debug, Clone, PartialEq)]
pub struct CardText {
    pub player_name: String,
    pub team_name: String,
    pub champion_name: String,
    pub playstyle_label: String,
    pub side_tag: String,
    pub badge_text: String,
    pub rating_text: String,
    pub corner_label: String,
}

/// A validated render job. Every numeric is clamped and every string escaped.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub width: u32,
    pub height: u32,
    pub dpr: f64,
    pub format: OutputFormat,
    pub transparent: bool,
    pub style: CardStyle,
    pub text: CardText,
    /// Raw playstyle icon key as supplied; resolved against the catalog later
    pub icon_key: Option<String>,
    pub background: ImagePayload,
    pub subject: ImagePayload,
}

impl RenderRequest {
    /// Validate a submission.
    ///
    /// Both images are checked before anything else so a request missing one
    /// fails with [`Error::MissingInput`] regardless of its other fields.
    pub fn from_form(
        form: &CardForm,
        defaults: &CardDefaults,
        background: Option<ImagePayload>,
        subject: Option<ImagePayload>,
    ) -> Result<Self> {
        let (background, subject) = match (background, subject) {
            (Some(bg), Some(main)) => (bg, main),
            _ => {
                return Err(Error::MissingInput(
                    "Both the background image and the character image are required.".into(),
                ))
            }
        };

        let width = dimension("width", form.int("width", defaults.width)?)?;
        let height = dimension("height", form.int("height", defaults.height)?)?;
        let dpr = parse_float("dpr", form.get("dpr"), defaults.dpr)?;
        if dpr <= 0.0 || dpr > MAX_DPR {
            return Err(Error::InvalidInput(format!("dpr must be in (0, {MAX_DPR}], got {dpr}")));
        }
        let format = match form.get("format").map(str::trim).filter(|f| !f.is_empty()) {
            Some(f) => f.parse()?,
            None => OutputFormat::default(),
        };
        let transparent = matches!(form.get("transparent"), Some("on" | "true" | "1"));

        let accent = Rgb::parse_or_fallback(form.get("borderColor").unwrap_or(defaults.border_color.as_str()));
        let border_width = form.int("borderWidth", defaults.border_width)?.max(0);
        let style = CardStyle {
            accent,
            border_width,
            frame_pad: sanitize::frame_padding(border_width),
            radius: form.int("radius", defaults.radius)?.max(0),
            bg_blur: form.int("bgBlur", defaults.bg_blur)?.max(0),
            main_scale: sanitize::scale_ratio(form.int("mainScale", defaults.main_scale)?, MAIN_SCALE_RANGE),
            bg_scale: sanitize::scale_ratio(form.int("bgScale", defaults.bg_scale)?, BG_SCALE_RANGE),
            main_offset: (
                sanitize::clamp(form.int("mainOffsetX", 0)?, OFFSET_RANGE),
                sanitize::clamp(form.int("mainOffsetY", 0)?, OFFSET_RANGE),
            ),
            bg_offset: (
                sanitize::clamp(form.int("bgOffsetX", 0)?, OFFSET_RANGE),
                sanitize::clamp(form.int("bgOffsetY", 0)?, OFFSET_RANGE),
            ),
        };

        let text = CardText {
            player_name: clean_text(form.get("playerName"), &PLAYER_NAME),
            team_name: clean_text(form.get("teamName"), &TEAM_NAME),
            champion_name: clean_text(form.get("favoriteChampion"), &CHAMPION_NAME),
            playstyle_label: clean_text(form.get("playstyle"), &PLAYSTYLE),
            side_tag: clean_text(form.get("sideTag"), &SIDE_TAG),
            badge_text: clean_text(form.get("badgeText"), &BADGE_TEXT),
            rating_text: clean_text(form.get("cardRank"), &RATING_TEXT),
            corner_label: clean_text(form.get("cornerLabel"), &CORNER_LABEL),
        };

        Ok(Self {
            width,
            height,
            dpr,
            format,
            transparent,
            style,
            text,
            icon_key: form.get("playstyleIcon").map(str::to_string),
            background,
            subject,
        })
    }
}

fn dimension(field: &str, value: i64) -> Result<u32> {
    if (1..=MAX_DIMENSION).contains(&value) {
        Ok(value as u32)
    } else {
        Err(Error::InvalidInput(format!("{field} must be between 1 and {MAX_DIMENSION}, got {value}")))
    }
}
