//! Optional character recognition capability.

use deck_core::Result;

/// Recognizes text on a rendered PDF page.
///
/// Nothing in this crate rasterizes pages; an engine receives the whole
/// document and the zero-based page index and does its own rendering.
pub trait OcrEngine {
    fn recognize(&self, document: &[u8], page_idx: usize) -> Result<String>;
}

impl<F> OcrEngine for F
where
    F: Fn(&[u8], usize) -> Result<String>,
{
    fn recognize(&self, document: &[u8], page_idx: usize) -> Result<String> {
        self(document, page_idx)
    }
}
