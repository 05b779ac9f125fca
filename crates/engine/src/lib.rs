//! Conversion operations over raw document bytes.
//!
//! Each function here is one step a caller drives: ingest a template, ingest
//! a source, create a plan, override a layout, execute. Document kinds are
//! detected from content and dispatched to the matching backend.

use deck_core::{
    Config, DocumentKind, Error, ExecutionReport, Executor, LayoutId, PageTrace, PlanId, Result,
    SignatureExtractor, SlideMapping, SourceDocument, SourceId, SourceProfile, TemplateId,
    TemplateProfile, TransformationPlan,
};
use deck_pdf::{OcrEngine, PdfReader};
use deck_pptx::{DeckWriter, SlideReader, TemplateDeck, TemplateParser};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Cursor;
use uuid::Uuid;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// SHA-256 of a template's theme and layout catalog, as lowercase hex.
///
/// Two decks with the same layouts get the same id, so a plan can be checked
/// against whatever template bytes it is executed with.
fn template_id(deck: &TemplateDeck) -> Result<TemplateId> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(&deck.theme)?);
    hasher.update(serde_json::to_vec(&deck.catalog)?);
    let digest = hasher.finalize();

    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    Ok(TemplateId::new(out))
}

fn parse_template(bytes: &[u8]) -> Result<TemplateDeck> {
    if DocumentKind::from_magic(bytes) != Some(DocumentKind::Slide) {
        return Err(Error::UnsupportedFormat(
            "template must be a .pptx slide deck".to_string(),
        ));
    }
    TemplateParser::new().parse(Cursor::new(bytes))
}

/// Read the theme and layout catalog of a template deck.
pub fn ingest_template(bytes: &[u8]) -> Result<TemplateProfile> {
    let deck = parse_template(bytes)?;
    let template_id = template_id(&deck)?;
    log::info!("ingested template {} with {} layouts", template_id, deck.catalog.len());
    Ok(TemplateProfile {
        template_id,
        theme_meta: deck.theme,
        layout_catalog: deck.catalog,
    })
}

/// Lower a source document to page content.
///
/// `filename` is only consulted when the content itself is not recognized.
pub fn read_source(
    bytes: &[u8],
    filename: &str,
    config: &Config,
    ocr: Option<&dyn OcrEngine>,
) -> Result<SourceDocument> {
    let kind = DocumentKind::detect(bytes, filename)
        .ok_or_else(|| Error::UnsupportedFormat(format!("could not detect the kind of '{}'", filename)))?;

    match kind {
        DocumentKind::Slide => {
            log::debug!("reading {} as a slide deck", filename);
            SlideReader::new(&config.extraction).read(Cursor::new(bytes))
        }
        DocumentKind::Pdf => {
            log::debug!("reading {} as a PDF", filename);
            let reader = PdfReader::new(&config.extraction);
            match ocr {
                Some(engine) => reader.with_ocr(engine).read(bytes),
                None => reader.read(bytes),
            }
        }
    }
}

/// Compute page signatures for a source document.
pub fn ingest_source(bytes: &[u8], filename: &str, config: &Config) -> Result<SourceProfile> {
    ingest_source_with_ocr(bytes, filename, config, None)
}

/// [`ingest_source`] with a character recognition engine for pages without text.
pub fn ingest_source_with_ocr(
    bytes: &[u8],
    filename: &str,
    config: &Config,
    ocr: Option<&dyn OcrEngine>,
) -> Result<SourceProfile> {
    let document = read_source(bytes, filename, config, ocr)?;
    let pages = SignatureExtractor::for_document(&document, &config.extraction).extract_document(&document);
    log::info!("ingested {} source with {} readable pages", document.kind.as_str(), pages.len());

    Ok(SourceProfile {
        source_id: SourceId::new(new_id()),
        kind: document.kind,
        pages,
    })
}

/// Match every source page against the template's layouts.
pub fn create_plan(
    template: &TemplateProfile,
    source: &SourceProfile,
    config: &Config,
) -> Result<TransformationPlan> {
    let slides = deck_core::plan(&source.pages, &template.layout_catalog, &config.scoring)?;
    Ok(TransformationPlan::new(
        PlanId::new(new_id()),
        template.template_id.clone(),
        source.source_id.clone(),
        slides,
    ))
}

/// Move one page of `plan` onto another layout.
pub fn swap(
    plan: &TransformationPlan,
    template: &TemplateProfile,
    page_idx: usize,
    layout_id: LayoutId,
    config: &Config,
) -> Result<TransformationPlan> {
    plan.swap(template, page_idx, layout_id, &config.scoring)
}

/// Result of [`execute`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutput {
    /// The generated deck.
    #[serde(skip)]
    pub document: Vec<u8>,
    pub report: ExecutionReport,
    /// Plan mappings with the issues execution added.
    pub mappings: Vec<SlideMapping>,
    pub traces: Vec<PageTrace>,
    pub slide_count: usize,
}

/// Recompose the source onto the template following `plan`.
pub fn execute(
    plan: &TransformationPlan,
    template_bytes: &[u8],
    source_bytes: &[u8],
    config: &Config,
) -> Result<ExecutionOutput> {
    execute_with_ocr(plan, template_bytes, source_bytes, config, None)
}

/// [`execute`] reading the source with a character recognition engine.
///
/// Fails with [`Error::CatalogMismatch`] when `template_bytes` is not the
/// template the plan was computed from.
pub fn execute_with_ocr(
    plan: &TransformationPlan,
    template_bytes: &[u8],
    source_bytes: &[u8],
    config: &Config,
    ocr: Option<&dyn OcrEngine>,
) -> Result<ExecutionOutput> {
    let deck = parse_template(template_bytes)?;
    let actual = template_id(&deck)?;
    if actual != plan.template_id {
        return Err(Error::CatalogMismatch {
            expected: plan.template_id.to_string(),
            actual: actual.to_string(),
        });
    }
    let source = read_source(source_bytes, "", config, ocr)?;

    let composition = Executor::new(&deck.catalog, &config.executor).compose(plan, &source)?;
    let document = DeckWriter::new(&deck).write(template_bytes, &composition.slides)?;
    log::info!(
        "plan {}: wrote {} slides, {} green / {} yellow",
        plan.plan_id,
        composition.slides.len(),
        composition.report.greens,
        composition.report.yellows
    );

    Ok(ExecutionOutput {
        document,
        report: composition.report,
        mappings: composition.mappings,
        traces: composition.traces,
        slide_count: composition.slides.len(),
    })
}
