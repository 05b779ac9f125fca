//! Page signatures: the structural fingerprint the planner matches on.
//!
//! Extraction is the same algorithm for every document kind. The two
//! strategies differ only in the primitives they trust: slides carry explicit
//! placeholders and outline levels, PDF pages only offer positioned glyphs, so
//! PDF signatures are always flagged as medium reliability.

use crate::config::ExtractionConfig;
use crate::content::{DocumentKind, PageContent, SourceDocument, SourcePage};
use crate::types::{PageSize, SourceId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Advisory label attached to a page signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageWarning(String);

impl PageWarning {
    /// PDF structure is inferred, not declared.
    pub const PDF_RELIABILITY_MEDIUM: &'static str = "pdf_reliability_medium";
    /// Text came from character recognition.
    pub const OCR_USED: &'static str = "ocr_used";
    /// Character recognition was attempted and failed.
    pub const OCR_FAILED: &'static str = "ocr_failed";
    /// The page layout could not be interpreted; the signature is empty.
    pub const LAYOUT_EXTRACTION_ERROR: &'static str = "layout_extraction_error";

    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fraction of the page covered by text and by images, each within [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coverage {
    pub text: f64,
    pub image: f64,
}

impl Coverage {
    /// Build a coverage, clamping both values into [0, 1].
    pub fn new(text: f64, image: f64) -> Self {
        Self {
            text: clamp_unit(text),
            image: clamp_unit(image),
        }
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Structural fingerprint of one page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSignature {
    pub title: bool,
    #[serde(rename = "bullets")]
    pub bullet_count: u32,
    /// 1 or 2 when extracted; other values never match a column rule.
    #[serde(rename = "columns")]
    pub column_count: u32,
    #[serde(rename = "images")]
    pub image_count: u32,
    #[serde(rename = "table")]
    pub has_table: bool,
    pub coverage: Coverage,
}

impl Default for PageSignature {
    fn default() -> Self {
        Self {
            title: false,
            bullet_count: 0,
            column_count: 1,
            image_count: 0,
            has_table: false,
            coverage: Coverage::default(),
        }
    }
}

/// Signature and warnings of one source page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageEntry {
    pub idx: usize,
    pub signature: PageSignature,
    #[serde(default)]
    pub warnings: Vec<PageWarning>,
}

/// Everything the planner needs to know about an ingested source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceProfile {
    pub source_id: SourceId,
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    pub pages: Vec<PageEntry>,
}

/// How a page's structure is read, selected by document kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// Explicit placeholders, outline levels and bullet markup.
    SlideNative,
    /// Positioned glyphs only; indentation stands in for outline level.
    PdfHeuristic,
}

impl ExtractionStrategy {
    pub fn for_kind(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::Slide => Self::SlideNative,
            DocumentKind::Pdf => Self::PdfHeuristic,
        }
    }

    fn title_zone(self, config: &ExtractionConfig) -> f64 {
        match self {
            Self::SlideNative => config.slide_title_zone,
            Self::PdfHeuristic => config.pdf_title_zone,
        }
    }

    fn inherent_warning(self) -> Option<PageWarning> {
        match self {
            Self::SlideNative => None,
            Self::PdfHeuristic => Some(PageWarning::new(PageWarning::PDF_RELIABILITY_MEDIUM)),
        }
    }
}

/// Computes page signatures for one document.
#[derive(Debug, Clone)]
pub struct SignatureExtractor<'a> {
    strategy: ExtractionStrategy,
    page_size: PageSize,
    config: &'a ExtractionConfig,
}

impl<'a> SignatureExtractor<'a> {
    pub fn new(strategy: ExtractionStrategy, page_size: PageSize, config: &'a ExtractionConfig) -> Self {
        Self {
            strategy,
            page_size,
            config,
        }
    }

    /// Extractor matching the kind and canvas of `document`.
    pub fn for_document(document: &SourceDocument, config: &'a ExtractionConfig) -> Self {
        Self::new(
            ExtractionStrategy::for_kind(document.kind),
            document.page_size,
            config,
        )
    }

    /// Signatures for every readable page, in page order.
    pub fn extract_document(&self, document: &SourceDocument) -> Vec<PageEntry> {
        document
            .pages
            .iter()
            .map(|page| self.extract_entry(page))
            .collect()
    }

    fn extract_entry(&self, page: &SourcePage) -> PageEntry {
        let (signature, warnings) = self.extract_signature(&page.content);
        log::debug!(
            "page {}: title={} bullets={} columns={} images={} table={}",
            page.idx,
            signature.title,
            signature.bullet_count,
            signature.column_count,
            signature.image_count,
            signature.has_table
        );
        PageEntry {
            idx: page.idx,
            signature,
            warnings,
        }
    }

    /// Signature of a single page plus the warnings that qualify it.
    pub fn extract_signature(&self, page: &PageContent) -> (PageSignature, Vec<PageWarning>) {
        let width = self.page_size.w;
        let height = self.page_size.h;
        let title_limit = height * self.strategy.title_zone(self.config);
        let left_limit = width * self.config.left_column_split;
        let right_limit = width * self.config.right_column_split;

        let mut signature = PageSignature::default();
        let mut max_title_font = 0.0_f64;
        let mut has_left = false;
        let mut has_right = false;
        let mut text_area = 0.0;
        let mut image_area = 0.0;

        for block in &page.text_blocks {
            if !block.rect.is_finite() {
                log::debug!("skipping text block with non-finite geometry");
                continue;
            }
            text_area += block.rect.area();

            if block.rect.y < title_limit {
                if let Some(size) = block.font_size.filter(|s| s.is_finite()) {
                    if size > max_title_font {
                        max_title_font = size;
                        signature.title = true;
                    }
                }
            }

            for paragraph in &block.paragraphs {
                if self.is_bullet(paragraph.level, paragraph.bullet_markup, &paragraph.text) {
                    signature.bullet_count += 1;
                }
            }

            let centroid = block.rect.centroid_x();
            has_left |= centroid < left_limit;
            has_right |= centroid > right_limit;
        }

        for image in &page.images {
            if !image.rect.is_finite() {
                log::debug!("skipping image with non-finite geometry");
                continue;
            }
            signature.image_count += 1;
            image_area += image.rect.area();
        }

        signature.has_table = !page.tables.is_empty();
        if has_left && has_right {
            signature.column_count = 2;
        }

        let page_area = self.page_size.area();
        if page_area > 0.0 {
            signature.coverage = Coverage::new(text_area / page_area, image_area / page_area);
        }

        let mut warnings = page.warnings.clone();
        if let Some(warning) = self.strategy.inherent_warning() {
            if !warnings.contains(&warning) {
                warnings.push(warning);
            }
        }

        (signature, warnings)
    }

    fn is_bullet(&self, level: u32, markup: bool, text: &str) -> bool {
        level > 0
            || markup
            || text
                .trim_start()
                .chars()
                .next()
                .is_some_and(|c| self.config.is_bullet_glyph(c))
    }
}
