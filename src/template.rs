//! Card template loading and composition
//!
//! The card markup and stylesheet are maintained outside the crate. The markup
//! carries `$NAME` / `${NAME}` slots; composition fills them in one pass and
//! inlines the stylesheet plus a generated block of CSS custom properties, so
//! the composed document is fully self-contained.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::icons::IconCatalog;
use crate::request::{RenderRequest, OutputFormat};
use crate::{Error, Result};

/// Markup that the composer replaces with the inlined stylesheet.
pub const STYLESHEET_LINK: &str = r#"<link rel="stylesheet" href="card.css">"#;

pub const HTML_FILE: &str = "card.html";
pub const CSS_FILE: &str = "card.css";

/// Location of the card skeleton and stylesheet on disk.
#[derive(Debug, Clone)]
pub struct TemplateSource {
    html_path: PathBuf,
    css_path: PathBuf,
}

impl TemplateSource {
    /// `card.html` and `card.css` inside `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            html_path: dir.join(HTML_FILE),
            css_path: dir.join(CSS_FILE),
        }
    }

    /// Read both files. They are re-read per request so edits apply without a restart.
    pub async fn load(&self) -> Result<CardTemplate> {
        let html = read_asset(&self.html_path).await?;
        let css = read_asset(&self.css_path).await?;
        Ok(CardTemplate { html, css })
    }
}

async fn read_asset(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown file".to_string());
        log::warn!("failed to read card template {}: {}", path.display(), e);
        Error::TemplateUnavailable(name)
    })
}

/// Template skeleton and stylesheet text.
#[derive(Debug, Clone)]
pub struct CardTemplate {
    pub html: String,
    pub css: String,
}

/// Fully resolved markup with inlined styles, ready for the render engine.
#[derive(Debug, Clone)]
pub struct ComposedDocument {
    pub html: String,
}

/// Target geometry and encoding for one render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
    pub format: OutputFormat,
    pub transparent: bool,
}

impl From<&RenderRequest> for RenderOptions {
    fn from(req: &RenderRequest) -> Self {
        Self {
            width: req.width,
            height: req.height,
            device_scale_factor: req.dpr,
            format: req.format,
            transparent: req.transparent,
        }
    }
}

/// Fill `$NAME` and `${NAME}` slots from `values` in a single pass.
///
/// `$$` yields a literal `$`. Unknown slots and stray `$` are copied through
/// untouched. Substituted values are appended verbatim and never rescanned.
pub fn substitute(template: &str, values: &HashMap<&str, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
            continue;
        }

        let (name, consumed) = match after.strip_prefix('{') {
            Some(braced) => match braced.find('}') {
                Some(end) if is_identifier(&braced[..end]) => (&braced[..end], end + 2),
                _ => ("", 0),
            },
            None => {
                let end = identifier_len(after);
                (&after[..end], end)
            }
        };

        match values.get(name) {
            Some(value) if !name.is_empty() => {
                out.push_str(value);
                rest = &after[consumed..];
            }
            _ => {
                out.push('$');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

fn identifier_len(s: &str) -> usize {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, c)) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return 0,
    }
    chars
        .find(|(_, c)| !(*c == '_' || c.is_ascii_alphanumeric()))
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && identifier_len(s) == s.len()
}

/// The `<style>` block carrying every numeric parameter as a custom property.
pub fn dynamic_style(req: &RenderRequest) -> String {
    let style = &req.style;
    format!(
        r#"<style id="card-dynamic-vars">
  .card-root {{
    --card-width-dyn:{width}px;
    --card-height-dyn:{height}px;
    --frame-pad-dyn:{pad}px;
    --card-radius-dyn:{radius}px;
    --accent-color-dyn:{accent};
    --accent-soft-dyn:{soft};
    --bg-blur-dyn:{blur}px;
    --bg-scale-dyn:{bg_scale};
    --bg-offset-x-dyn:{bg_x}px;
    --bg-offset-y-dyn:{bg_y}px;
    --main-scale-dyn:{main_scale};
    --offset-x-dyn:{main_x}px;
    --offset-y-dyn:{main_y}px;
  }}
</style>"#,
        width = req.width,
        height = req.height,
        pad = style.frame_pad,
        radius = style.radius,
        accent = style.accent.to_hex(),
        soft = style.accent.to_rgba(ACCENT_SOFT_ALPHA),
        blur = style.bg_blur,
        bg_scale = style.bg_scale,
        bg_x = style.bg_offset.0,
        bg_y = style.bg_offset.1,
        main_scale = style.main_scale,
        main_x = style.main_offset.0,
        main_y = style.main_offset.1,
    )
}

/// Opacity of the translucent accent derived from the border color.
pub const ACCENT_SOFT_ALPHA: f64 = 0.32;

/// Merge a validated request into the template.
pub fn compose(template: &CardTemplate, req: &RenderRequest, icons: &IconCatalog) -> ComposedDocument {
    let text = &req.text;
    let side_tag_block = if text.side_tag.is_empty() {
        String::new()
    } else {
        format!(r#"<div class="side-tag">{}</div>"#, text.side_tag)
    };

    let slots: HashMap<&str, String> = HashMap::from([
        ("BACKGROUND_URL", req.background.to_data_url()),
        ("MAIN_URL", req.subject.to_data_url()),
        ("RATING_TEXT", text.rating_text.clone()),
        ("CORNER_TEXT", text.corner_label.clone()),
        ("SIDE_TAG_BLOCK", side_tag_block),
        ("TEAM_NAME", text.team_name.clone()),
        ("PLAYER_NAME", text.player_name.clone()),
        ("CHAMPION_NAME", text.champion_name.clone()),
        ("PLAYSTYLE_ICON", icons.resolve(req.icon_key.as_deref()).to_string()),
        ("PLAYSTYLE_LABEL", text.playstyle_label.clone()),
        ("BADGE_TEXT", text.badge_text.clone()),
    ]);

    let markup = substitute(&template.html, &slots);
    let inline_styles = format!("<style>{}</style>{}", template.css, dynamic_style(req));
    ComposedDocument {
        html: markup.replacen(STYLESHEET_LINK, &inline_styles, 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::ImagePayload;
    use crate::request::{CardDefaults, CardForm};

    fn request(form: &CardForm) -> RenderRequest {
        let img = || ImagePayload::new(Some("image/png"), b"img".to_vec());
        RenderRequest::from_form(form, &CardDefaults::default(), img(), img()).unwrap()
    }

    fn template(html: &str) -> CardTemplate {
        CardTemplate { html: html.to_string(), css: ".card-root{color:red}".to_string() }
    }

    #[test]
    fn substitutes_both_slot_forms() {
        let values = HashMap::from([("A", "1".to_string()), ("B", "2".to_string())]);
        assert_eq!(substitute("$A-${B}-$A", &values), "1-2-1");
    }

    #[test]
    fn unknown_slots_and_stray_dollars_pass_through() {
        let values = HashMap::from([("A", "1".to_string())]);
        assert_eq!(substitute("$C ${C} $ $9 ${A", &values), "$C ${C} $ $9 ${A");
        assert_eq!(substitute("cost: $$5 $A$", &values), "cost: $5 1$");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let values = HashMap::from([
            ("A", "$B ${B}".to_string()),
            ("B", "boom".to_string()),
        ]);
        assert_eq!(substitute("<p>$A</p>", &values), "<p>$B ${B}</p>");
    }

    #[test]
    fn identifier_boundaries_are_respected() {
        let values = HashMap::from([("TEAM", "x".to_string()), ("TEAM_NAME", "y".to_string())]);
        assert_eq!(substitute("$TEAM_NAME/$TEAM.", &values), "y/x.");
    }

    #[test]
    fn composes_slots_and_inlines_styles() {
        let form: CardForm = [("playerName", "Tokido"), ("playstyleIcon", "zoning"), ("sideTag", "EVO")]
            .into_iter()
            .collect();
        let req = request(&form);
        let tpl = template(&format!(
            "<html><head>{STYLESHEET_LINK}</head><body><img src=\"$BACKGROUND_URL\">$PLAYER_NAME $SIDE_TAG_BLOCK $PLAYSTYLE_ICON</body></html>"
        ));
        let doc = compose(&tpl, &req, &IconCatalog::builtin());

        assert!(!doc.html.contains(STYLESHEET_LINK));
        assert!(doc.html.contains("<style>.card-root{color:red}</style><style id=\"card-dynamic-vars\">"));
        assert!(doc.html.contains("src=\"data:image/png;base64,aW1n\""));
        assert!(doc.html.contains("Tokido"));
        assert!(doc.html.contains(r#"<div class="side-tag">EVO</div>"#));
        assert!(doc.html.contains("M12 3a9 9 0 1 0 9 9"));
    }

    #[test]
    fn injected_slot_syntax_in_user_text_stays_literal() {
        let form: CardForm = [("playerName", "$MAIN_URL"), ("teamName", "${BADGE_TEXT}")].into_iter().collect();
        let req = request(&form);
        let doc = compose(&template("$PLAYER_NAME|$TEAM_NAME"), &req, &IconCatalog::builtin());
        assert_eq!(doc.html, "$MAIN_URL|${BADGE_TEXT}");
    }

    #[test]
    fn empty_side_tag_produces_no_block() {
        let form: CardForm = [("sideTag", " ")].into_iter().collect();
        let doc = compose(&template("[$SIDE_TAG_BLOCK]"), &request(&form), &IconCatalog::builtin());
        assert_eq!(doc.html, "[]");
    }

    #[test]
    fn unknown_icon_key_uses_default_icon() {
        let form: CardForm = [("playstyleIcon", "turtle")].into_iter().collect();
        let icons = IconCatalog::builtin();
        let doc = compose(&template("$PLAYSTYLE_ICON"), &request(&form), &icons);
        assert_eq!(doc.html, icons.resolve(Some("rushdown")));
    }

    #[test]
    fn dynamic_style_encodes_numeric_parameters() {
        let form: CardForm = [
            ("mainScale", "92"),
            ("bgScale", "150"),
            ("borderColor", "#abc"),
            ("mainOffsetX", "-12"),
        ]
        .into_iter()
        .collect();
        let css = dynamic_style(&request(&form));
        assert!(css.contains("--card-width-dyn:384px;"));
        assert!(css.contains("--card-height-dyn:576px;"));
        assert!(css.contains("--frame-pad-dyn:19px;"));
        assert!(css.contains("--main-scale-dyn:0.92;"));
        assert!(css.contains("--bg-scale-dyn:1.5;"));
        assert!(css.contains("--accent-color-dyn:#aabbcc;"));
        assert!(css.contains("--accent-soft-dyn:rgba(170, 187, 204, 0.32);"));
        assert!(css.contains("--offset-x-dyn:-12px;"));
    }

    #[tokio::test]
    async fn missing_template_files_are_reported_by_name() {
        let source = TemplateSource::from_dir("/nonexistent/card-template");
        match source.load().await {
            Err(Error::TemplateUnavailable(name)) => assert_eq!(name, HTML_FILE),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn shipped_template_has_every_slot() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("card_template");
        let tpl = TemplateSource::from_dir(dir).load().await.unwrap();
        assert!(tpl.html.contains(STYLESHEET_LINK));
        for slot in [
            "BACKGROUND_URL", "MAIN_URL", "RATING_TEXT", "CORNER_TEXT", "SIDE_TAG_BLOCK", "TEAM_NAME",
            "PLAYER_NAME", "CHAMPION_NAME", "PLAYSTYLE_ICON", "PLAYSTYLE_LABEL", "BADGE_TEXT",
        ] {
            assert!(tpl.html.contains(&format!("${slot}")), "{slot}");
        }
    }
}
