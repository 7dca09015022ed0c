//! Pairing rendered bytes with their media type

use crate::request::OutputFormat;

impl OutputFormat {
    /// MIME type of output produced in this format.
    pub fn media_type(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Pdf => "application/pdf",
        }
    }
}

/// Rendered output, bytes untouched.
#[derive(Debug, Clone)]
pub struct RenderedCard {
    pub format: OutputFormat,
    pub media_type: &'static str,
    pub bytes: Vec<u8>,
}

impl RenderedCard {
    pub fn new(format: OutputFormat, bytes: Vec<u8>) -> Self {
        Self {
            format,
            media_type: format.media_type(),
            bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_types_match_formats() {
        assert_eq!(OutputFormat::Png.media_type(), "image/png");
        assert_eq!(OutputFormat::Jpeg.media_type(), "image/jpeg");
        assert_eq!(OutputFormat::Pdf.media_type(), "application/pdf");
    }

    #[test]
    fn bytes_pass_through_unmodified() {
        let card = RenderedCard::new(OutputFormat::Pdf, b"%PDF-1.7".to_vec());
        assert_eq!(card.media_type, "application/pdf");
        assert_eq!(card.bytes, b"%PDF-1.7");
    }
}
