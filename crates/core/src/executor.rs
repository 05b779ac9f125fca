//! Recomposition of source pages into their chosen layouts.
//!
//! The executor decides what text lands in which placeholder and where
//! continuation pages are needed. Writing the resulting slides into an actual
//! deck is left to the format backend.

use crate::config::ExecutorConfig;
use crate::content::{PageContent, SourceDocument};
use crate::plan::{SlideMapping, TransformationPlan};
use crate::report::ExecutionReport;
use crate::types::{Issue, LayoutCatalog, LayoutId, PageSize};
use crate::Result;
use serde::{Deserialize, Serialize};

/// Lifecycle of one mapping during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageState {
    Pending,
    Composed,
    Overflowed,
    ContinuationComposed,
    Done,
}

/// States one mapping went through, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageTrace {
    pub page_idx: usize,
    pub states: Vec<PageState>,
}

impl PageTrace {
    fn new(page_idx: usize) -> Self {
        Self {
            page_idx,
            states: vec![PageState::Pending],
        }
    }

    fn advance(&mut self, state: PageState) {
        log::debug!("page {}: {:?}", self.page_idx, state);
        self.states.push(state);
    }
}

/// One output slide: a layout plus the text for its title and first body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedSlide {
    /// Source page the content came from.
    pub page_idx: usize,
    pub layout_id: LayoutId,
    pub title: Option<String>,
    pub body: Option<String>,
    /// Generated to carry overflow of the previous slide.
    pub continuation: bool,
}

/// Everything an execution decided, ready to be written out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    pub slides: Vec<ComposedSlide>,
    /// Plan mappings with execution issues merged in.
    pub mappings: Vec<SlideMapping>,
    pub traces: Vec<PageTrace>,
    pub report: ExecutionReport,
}

/// Title and body text recovered from a source page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageText {
    pub title: Option<String>,
    pub body: Option<String>,
}

/// Split a page into title and body text.
///
/// The first non-empty block whose top lies in the title zone is the title;
/// every other block joins the body in encounter order.
pub fn page_text(content: &PageContent, page_size: PageSize, title_zone: f64) -> PageText {
    let title_limit = page_size.h * title_zone;
    let mut title = None;
    let mut body = Vec::new();

    for block in &content.text_blocks {
        let text = block.text();
        if text.is_empty() {
            continue;
        }
        if title.is_none() && block.rect.y < title_limit {
            title = Some(text);
        } else {
            body.push(text);
        }
    }

    PageText {
        title,
        body: (!body.is_empty()).then(|| body.join("\n")),
    }
}

/// Split `text` after `budget` characters; the remainder is the overflow.
pub fn split_at_budget(text: &str, budget: usize) -> (&str, Option<&str>) {
    match text.char_indices().nth(budget) {
        Some((byte_idx, _)) => (&text[..byte_idx], Some(&text[byte_idx..])),
        None => (text, None),
    }
}

/// Turns a plan and its source into composed slides.
#[derive(Debug, Clone)]
pub struct Executor<'a> {
    catalog: &'a LayoutCatalog,
    config: &'a ExecutorConfig,
}

impl<'a> Executor<'a> {
    pub fn new(catalog: &'a LayoutCatalog, config: &'a ExecutorConfig) -> Self {
        Self { catalog, config }
    }

    /// Compose every mapping of `plan` against `source`.
    ///
    /// Mappings whose page is missing from the source produce no slide but
    /// still count in the report. Each overflowing page gets exactly one
    /// continuation slide carrying all of its overflow. Body text is only
    /// budgeted when the chosen layout has a body slot to put it in.
    pub fn compose(&self, plan: &TransformationPlan, source: &SourceDocument) -> Result<Composition> {
        for mapping in &plan.slides {
            self.catalog.resolve(mapping.chosen_layout_id)?;
        }

        let mut slides = Vec::new();
        let mut mappings = Vec::with_capacity(plan.slides.len());
        let mut traces = Vec::with_capacity(plan.slides.len());

        for mapping in &plan.slides {
            let mut mapping = mapping.clone();
            let mut trace = PageTrace::new(mapping.page_idx);

            let has_body_slot = self
                .catalog
                .resolve(mapping.chosen_layout_id)?
                .placeholders
                .body_slot_count
                > 0;

            match source.page(mapping.page_idx) {
                Some(page) => {
                    let text = page_text(&page.content, source.page_size, self.config.title_zone);
                    let (body, overflow) = match text.body.as_deref() {
                        Some(body) if has_body_slot => {
                            let (kept, rest) = split_at_budget(body, self.config.body_char_budget);
                            (Some(kept.to_string()), rest.map(str::to_string))
                        }
                        Some(body) => {
                            log::debug!(
                                "page {}: {} has no body slot, body text is not placed",
                                mapping.page_idx,
                                mapping.chosen_layout_id
                            );
                            (Some(body.to_string()), None)
                        }
                        None => (None, None),
                    };

                    slides.push(ComposedSlide {
                        page_idx: mapping.page_idx,
                        layout_id: mapping.chosen_layout_id,
                        title: text.title,
                        body,
                        continuation: false,
                    });
                    trace.advance(PageState::Composed);

                    if let Some(overflow) = overflow {
                        trace.advance(PageState::Overflowed);
                        mapping.issues.insert(Issue::Overflow);
                        slides.push(ComposedSlide {
                            page_idx: mapping.page_idx,
                            layout_id: mapping.chosen_layout_id,
                            title: Some(self.config.continuation_marker.clone()),
                            body: Some(overflow),
                            continuation: true,
                        });
                        trace.advance(PageState::ContinuationComposed);
                    }
                }
                None => {
                    log::warn!(
                        "plan {} references page {} which the source does not have; skipping",
                        plan.plan_id,
                        mapping.page_idx
                    );
                }
            }

            trace.advance(PageState::Done);
            traces.push(trace);
            mappings.push(mapping);
        }

        let report = ExecutionReport::from_mappings(&mappings);
        Ok(Composition {
            slides,
            mappings,
            traces,
            report,
        })
    }
}
