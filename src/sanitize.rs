//! Sanitization of user-controlled scalar inputs
//!
//! Everything here is fail-soft: text and color helpers always return a safe
//! value. Numeric parsing is the one place that can reject input, and it does
//! so with [`Error::InvalidInput`] naming the offending field.

use crate::{Error, Result};

/// Constraints for a single display string.
#[derive(Debug, Clone, Copy)]
pub struct TextRule {
    /// Substituted when the field is missing (or blank without `allow_empty`)
    pub fallback: &'static str,
    /// Maximum length in characters, applied before escaping
    pub max_len: usize,
    /// Blank input yields `""` instead of the fallback
    pub allow_empty: bool,
}

/// Clean one text field: trim, substitute the fallback, truncate, then escape.
///
/// A missing value always yields the fallback. Truncation happens before
/// escaping so entity expansion never counts against `max_len`.
pub fn clean_text(value: Option<&str>, rule: &TextRule) -> String {
    let text = match value {
        None => rule.fallback,
        Some(raw) => {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                trimmed
            } else if rule.allow_empty {
                return String::new();
            } else {
                rule.fallback
            }
        }
    };
    let truncated: String = text.chars().take(rule.max_len).collect();
    escape_html(&truncated)
}

/// Escape `&`, `<`, `>` and both quote characters for markup embedding.
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// An opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Used whenever a supplied color cannot be parsed.
    pub const FALLBACK: Rgb = Rgb { r: 250, g: 188, b: 80 };

    /// Parse `#rgb`, `#rrggbb`, `rgb` or `rrggbb`.
    pub fn parse_hex(value: &str) -> Option<Rgb> {
        let raw = value.trim();
        let raw = raw.strip_prefix('#').unwrap_or(raw);
        if !raw.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let expanded = match raw.len() {
            3 => expand_short_hex(raw),
            6 => raw.to_string(),
            _ => return None,
        };
        let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
        Some(Rgb {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }

    /// Parse, degrading to [`Rgb::FALLBACK`].
    pub fn parse_or_fallback(value: &str) -> Rgb {
        Rgb::parse_hex(value).unwrap_or(Rgb::FALLBACK)
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn to_rgba(self, alpha: f64) -> String {
        format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, alpha)
    }
}

/// Double each digit of a 3-digit hex color: `"abc"` becomes `"aabbcc"`.
pub fn expand_short_hex(raw: &str) -> String {
    raw.chars().flat_map(|c| [c, c]).collect()
}

/// CSS `rgba(...)` for a hex color, or the fallback color at the same alpha.
pub fn hex_to_rgba(value: &str, alpha: f64) -> String {
    Rgb::parse_or_fallback(value).to_rgba(alpha)
}

/// Parse an optional integer field; blank or missing yields `default`.
pub fn parse_int(field: &str, value: Option<&str>, default: i64) -> Result<i64> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(v) => v
            .parse::<i64>()
            .map_err(|_| Error::InvalidInput(format!("{field} must be an integer, got {v:?}"))),
    }
}

/// Parse an optional finite float field; blank or missing yields `default`.
pub fn parse_float(field: &str, value: Option<&str>, default: f64) -> Result<f64> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(v) => v
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| Error::InvalidInput(format!("{field} must be a number, got {v:?}"))),
    }
}

pub const MAIN_SCALE_RANGE: (i64, i64) = (10, 300);
pub const BG_SCALE_RANGE: (i64, i64) = (10, 400);
pub const OFFSET_RANGE: (i64, i64) = (-500, 500);

pub fn clamp(value: i64, (lo, hi): (i64, i64)) -> i64 {
    value.clamp(lo, hi)
}

/// Percentage to unitless ratio: 92 becomes 0.92.
pub fn scale_ratio(percent: i64, range: (i64, i64)) -> f64 {
    clamp(percent, range) as f64 / 100.0
}

/// Padding between the card edge and its frame, derived from the border width.
pub fn frame_padding(border_width: i64) -> i64 {
    let pad = (border_width.max(0) as f64 * 1.6).round() as i64;
    pad.clamp(5, 96)
}
