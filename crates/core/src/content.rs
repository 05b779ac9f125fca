//! Format-independent page content produced by the document backends.
//!
//! Both the slide reader and the PDF reader lower their input into
//! [`SourceDocument`]; signature extraction and recomposition only ever see
//! this model.

use crate::signature::PageWarning;
use crate::types::{PageSize, Rect};
use serde::{Deserialize, Serialize};

/// Local file header signature every ZIP container starts with.
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Main part of a presentation package. ZIP entry names are stored
/// uncompressed, so the name is visible in the raw bytes.
const PRESENTATION_PART: &[u8] = b"ppt/presentation.xml";

/// The kind of a source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    /// Slide deck (Office Open XML).
    #[serde(rename = "pptx")]
    Slide,
    /// Paginated PDF.
    #[serde(rename = "pdf")]
    Pdf,
}

impl DocumentKind {
    /// Detect kind from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pptx" => Some(Self::Slide),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Detect kind from file magic bytes.
    ///
    /// A ZIP only counts as a slide deck when it carries a presentation part;
    /// other Office packages are not recognized.
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }

        if bytes.starts_with(&ZIP_MAGIC) {
            let is_deck = bytes
                .windows(PRESENTATION_PART.len())
                .any(|window| window == PRESENTATION_PART);
            return is_deck.then_some(Self::Slide);
        }

        if bytes.starts_with(b"%PDF") {
            return Some(Self::Pdf);
        }

        None
    }

    /// Detect kind from content, falling back to the filename extension.
    ///
    /// A ZIP is judged by its content alone, whatever it is named.
    pub fn detect(bytes: &[u8], filename: &str) -> Option<Self> {
        if bytes.starts_with(&ZIP_MAGIC) {
            return Self::from_magic(bytes);
        }
        Self::from_magic(bytes).or_else(|| {
            filename
                .rsplit_once('.')
                .and_then(|(_, ext)| Self::from_extension(ext))
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Slide => "pptx",
            Self::Pdf => "pdf",
        }
    }
}

/// One paragraph (slide) or line (PDF) of a text block.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Paragraph {
    pub text: String,
    /// Outline level; 0 is the top level.
    pub level: u32,
    /// The paragraph carries explicit bullet markup.
    pub bullet_markup: bool,
}

impl Paragraph {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn with_bullet_markup(mut self, bullet: bool) -> Self {
        self.bullet_markup = bullet;
        self
    }
}

/// A positioned region of text.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextBlock {
    pub rect: Rect,
    pub paragraphs: Vec<Paragraph>,
    /// Largest font size observed in the block, in points.
    pub font_size: Option<f64>,
}

impl TextBlock {
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            ..Default::default()
        }
    }

    pub fn with_paragraph(mut self, paragraph: Paragraph) -> Self {
        self.paragraphs.push(paragraph);
        self
    }

    pub fn with_font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size);
        self
    }

    /// Paragraph texts joined by newlines, trimmed.
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

/// An embedded raster or figure.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageRegion {
    pub rect: Rect,
}

/// A table-structured region.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TableRegion {
    pub rect: Rect,
}

/// Everything a backend could read from one page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageContent {
    /// Text blocks in source encounter order.
    pub text_blocks: Vec<TextBlock>,
    pub images: Vec<ImageRegion>,
    pub tables: Vec<TableRegion>,
    /// Warnings raised while reading the page.
    pub warnings: Vec<PageWarning>,
}

impl PageContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_text(&self) -> bool {
        self.text_blocks.iter().any(|b| !b.text().is_empty())
    }
}

/// A readable page of a source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePage {
    /// Zero-based position of the page in the original document.
    pub idx: usize,
    pub content: PageContent,
}

/// A source document lowered to page content.
///
/// Pages that could not be read are absent, so `pages[i].idx` need not be `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub kind: DocumentKind,
    pub page_size: PageSize,
    pub pages: Vec<SourcePage>,
}

impl SourceDocument {
    pub fn new(kind: DocumentKind, page_size: PageSize) -> Self {
        Self {
            kind,
            page_size,
            pages: Vec::new(),
        }
    }

    pub fn add_page(&mut self, idx: usize, content: PageContent) {
        self.pages.push(SourcePage { idx, content });
    }

    /// Look up a page by its original index.
    pub fn page(&self, idx: usize) -> Option<&SourcePage> {
        self.pages.iter().find(|p| p.idx == idx)
    }
}
