//! Reads a PDF into the format-independent page model.

use crate::interpreter::{number, ContentInterpreter, PageFrame};
use crate::ocr::OcrEngine;
use crate::text::normalize_text;
use deck_core::{
    DocumentKind, Error, ExtractionConfig, PageContent, PageWarning, Paragraph, Rect, Result,
    SourceDocument, TextBlock,
};
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};

/// Guard against cyclic `Parent` chains in malformed page trees.
const MAX_TREE_DEPTH: usize = 32;

/// Reads page content from PDF bytes.
pub struct PdfReader<'a> {
    config: &'a ExtractionConfig,
    ocr: Option<&'a dyn OcrEngine>,
}

impl<'a> PdfReader<'a> {
    pub fn new(config: &'a ExtractionConfig) -> Self {
        Self { config, ocr: None }
    }

    /// Run `engine` on pages that yield no text.
    pub fn with_ocr(mut self, engine: &'a dyn OcrEngine) -> Self {
        self.ocr = Some(engine);
        self
    }

    /// Read every page.
    ///
    /// The document canvas is the first page's media box. A page whose
    /// content cannot be interpreted is kept with empty content and a
    /// `layout_extraction_error` warning.
    pub fn read(&self, bytes: &[u8]) -> Result<SourceDocument> {
        let document =
            Document::load_mem(bytes).map_err(|e| Error::PdfError(format!("failed to load: {}", e)))?;

        let pages = document.get_pages();
        let frames: Vec<(ObjectId, PageFrame)> = pages
            .values()
            .map(|&id| (id, page_frame(&document, id)))
            .collect();
        let page_size = frames
            .first()
            .map(|(_, frame)| frame.size())
            .unwrap_or_else(|| PageFrame::default().size());

        log::info!("reading {} PDF pages at {}x{} pt", frames.len(), page_size.w, page_size.h);
        let mut source = SourceDocument::new(DocumentKind::Pdf, page_size);

        for (idx, (page_id, frame)) in frames.into_iter().enumerate() {
            let mut content = match self.interpret(&document, page_id, frame) {
                Ok(content) => content,
                Err(e) => {
                    log::warn!("page {}: layout extraction failed: {}", idx, e);
                    let mut content = PageContent::new();
                    content
                        .warnings
                        .push(PageWarning::new(PageWarning::LAYOUT_EXTRACTION_ERROR));
                    content
                }
            };

            if !content.has_text() {
                if let Some(engine) = self.ocr {
                    self.recognize(engine, bytes, idx, frame, &mut content);
                }
            }
            source.add_page(idx, content);
        }

        Ok(source)
    }

    fn interpret(&self, document: &Document, page_id: ObjectId, frame: PageFrame) -> Result<PageContent> {
        let data = document
            .get_page_content(page_id)
            .map_err(|e| Error::PdfError(e.to_string()))?;
        let content = Content::decode(&data).map_err(|e| Error::PdfError(e.to_string()))?;
        Ok(ContentInterpreter::new(self.config, frame).run(&content.operations))
    }

    fn recognize(
        &self,
        engine: &dyn OcrEngine,
        bytes: &[u8],
        idx: usize,
        frame: PageFrame,
        content: &mut PageContent,
    ) {
        match engine.recognize(bytes, idx) {
            Ok(text) => {
                let text = normalize_text(&text);
                let block = text
                    .lines()
                    .filter(|line| !line.is_empty())
                    .fold(TextBlock::new(Rect::new(0.0, 0.0, frame.width, frame.height)), |block, line| {
                        block.with_paragraph(Paragraph::new(line))
                    });
                if !block.paragraphs.is_empty() {
                    content.text_blocks.push(block);
                }
                content.warnings.push(PageWarning::new(PageWarning::OCR_USED));
            }
            Err(e) => {
                log::warn!("page {}: OCR failed: {}", idx, e);
                content.warnings.push(PageWarning::new(PageWarning::OCR_FAILED));
            }
        }
    }
}

fn resolve<'d>(document: &'d Document, object: &'d Object) -> &'d Object {
    match object {
        Object::Reference(id) => document.get_object(*id).unwrap_or(object),
        _ => object,
    }
}

/// Media box of a page, inherited through the page tree, or US Letter.
fn page_frame(document: &Document, page_id: ObjectId) -> PageFrame {
    let mut current = Some(page_id);
    for _ in 0..MAX_TREE_DEPTH {
        let Some(id) = current else { break };
        let Ok(dict) = document.get_dictionary(id) else { break };

        if let Ok(media_box) = dict.get(b"MediaBox") {
            if let Ok(values) = resolve(document, media_box).as_array() {
                let values: Vec<f64> = values
                    .iter()
                    .filter_map(|v| number(resolve(document, v)))
                    .collect();
                if let [x0, y0, x1, y1] = values[..] {
                    let frame = PageFrame::from_media_box([x0, y0, x1, y1]);
                    if frame.width > 0.0 && frame.height > 0.0 {
                        return frame;
                    }
                }
            }
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    PageFrame::default()
}
