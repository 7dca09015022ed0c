//! Inline encoding of uploaded images
//!
//! Uploads are embedded as `data:` URLs so the render engine never has to
//! fetch anything besides the composed document itself.

use base64::Engine as Base64Engine;
use mime_guess::{mime, Mime};

/// Content type assumed when an upload does not declare one.
pub const DEFAULT_IMAGE_TYPE: &str = "image/png";

/// A binary image upload with its declared content type.
///
/// `content_type` is always a bare `image/<subtype>` essence: parameters are
/// stripped and anything that does not parse as an image type is replaced by
/// [`DEFAULT_IMAGE_TYPE`], so the value is safe to splice into markup.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImagePayload {
    /// Wrap an upload; an empty body (a file input left blank) counts as absent.
    pub fn new(content_type: Option<&str>, bytes: Vec<u8>) -> Option<Self> {
        if bytes.is_empty() {
            return None;
        }
        let content_type = content_type
            .and_then(image_essence)
            .unwrap_or_else(|| DEFAULT_IMAGE_TYPE.to_string());
        Some(Self { content_type, bytes })
    }

    /// `data:<type>;base64,<payload>`, usable directly in a `src` attribute.
    pub fn to_data_url(&self) -> String {
        let b64 = base64::engine::general_purpose::STANDARD.encode(&self.bytes);
        format!("data:{};base64,{}", self.content_type, b64)
    }
}

/// Lowercased `type/subtype` of a declared image content type, without parameters.
fn image_essence(declared: &str) -> Option<String> {
    let parsed: Mime = declared.trim().to_ascii_lowercase().parse().ok()?;
    if parsed.type_() != mime::IMAGE {
        return None;
    }
    let essence = parsed.essence_str();
    let token = |c: char| c.is_ascii_alphanumeric() || "!#$&-^_.+".contains(c);
    let (ty, sub) = essence.split_once('/')?;
    if sub.is_empty() || !ty.chars().all(token) || !sub.chars().all(token) {
        return None;
    }
    Some(essence.to_string())
}
