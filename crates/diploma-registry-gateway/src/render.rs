//! Verification image rendering.
//!
//! Each record gets a scannable image pointing at its public verification
//! page. Encoding the image (QR or otherwise) is left to the renderer.

use bytes::Bytes;

use crate::error::RenderError;

/// Turns a verification target (a URL) into image bytes.
pub trait VerificationRenderer: Send + Sync {
    /// Render `target` into an image payload.
    fn render(&self, target: &str) -> Result<Bytes, RenderError>;
}

/// Renders the target as plain UTF-8 text.
///
/// Stands in for a real image encoder in tests and in deployments where the
/// image is produced downstream.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl VerificationRenderer for TextRenderer {
    fn render(&self, target: &str) -> Result<Bytes, RenderError> {
        if target.is_empty() {
            return Err(RenderError::Failed("empty verification target".into()));
        }
        Ok(Bytes::copy_from_slice(target.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_renderer() {
        let bytes = TextRenderer
            .render("http://localhost:5173/verify/7")
            .unwrap();
        assert_eq!(&bytes[..], b"http://localhost:5173/verify/7");
        assert!(TextRenderer.render("").is_err());
    }
}
