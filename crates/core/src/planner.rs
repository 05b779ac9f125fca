//! Layout matching: score every layout against a page signature and pick one.

use crate::config::ScoringConfig;
use crate::plan::SlideMapping;
use crate::signature::{PageEntry, PageSignature};
use crate::types::{Issue, IssueSet, LayoutCatalog, LayoutDescriptor};
use crate::{Error, Result};

/// Score of one layout for one signature, before any fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutScore {
    /// Clamped to [0, 1].
    pub score: f64,
    pub issues: IssueSet,
}

/// Score how well `layout` can hold a page with `signature`.
pub fn score(signature: &PageSignature, layout: &LayoutDescriptor, config: &ScoringConfig) -> LayoutScore {
    let caps = &layout.placeholders;
    let mut total = 0.0;
    let mut issues = IssueSet::new();

    match (signature.title, caps.has_title) {
        (true, true) => total += config.title_weight,
        (true, false) => total -= config.title_missing_penalty,
        (false, true) => total += config.title_unused_bonus,
        (false, false) => {}
    }

    if signature.bullet_count > 0 {
        let normalized = (signature.bullet_count as f64 / config.bullet_saturation as f64).min(1.0);
        if caps.body_slot_count > 0 {
            total += config.bullet_weight * normalized;
        } else {
            total -= config.bullet_no_body_penalty;
        }
    } else if caps.body_slot_count > 0 {
        total += config.body_available_bonus;
    }

    match signature.column_count {
        2 if caps.body_slot_count >= 2 => total += config.column_weight,
        2 => {
            total -= config.column_mismatch_penalty;
            issues.insert(Issue::ColumnMismatch);
        }
        1 if caps.body_slot_count == 1 => total += config.column_weight,
        _ => {}
    }

    if signature.image_count > 0 {
        if caps.picture_slot_count > 0 {
            let fill = (signature.image_count as f64 / caps.picture_slot_count as f64).min(1.0);
            total += config.image_weight * fill;
        } else {
            total -= config.image_no_slot_penalty;
            if signature.image_count > 1 {
                issues.insert(Issue::NoPictureSlots);
            }
        }
    } else if caps.picture_slot_count > 0 {
        total -= config.unused_picture_penalty;
    }

    if signature.has_table {
        if caps.has_table {
            total += config.table_weight;
        } else {
            issues.insert(Issue::NoTableSupport);
        }
    }

    if caps.body_slot_count <= 1 {
        if signature.bullet_count > config.overflow_bullet_threshold {
            total -= config.overflow_bullet_penalty;
            issues.insert(Issue::Overflow);
        } else if signature.coverage.text > config.overflow_coverage_threshold {
            total -= config.overflow_coverage_penalty;
            issues.insert(Issue::Overflow);
        }
    }

    LayoutScore {
        score: total.clamp(0.0, 1.0),
        issues,
    }
}

/// Matches page signatures against one template's catalog.
#[derive(Debug, Clone)]
pub struct Planner<'a> {
    catalog: &'a LayoutCatalog,
    config: &'a ScoringConfig,
}

impl<'a> Planner<'a> {
    pub fn new(catalog: &'a LayoutCatalog, config: &'a ScoringConfig) -> Self {
        Self { catalog, config }
    }

    /// Choose a layout for one page.
    ///
    /// The first layout leads until another scores strictly higher, so ties go
    /// to the earlier catalog entry. A winner below the low-fit floor is
    /// replaced by the first content-like layout, but keeps its own score.
    pub fn choose(&self, page_idx: usize, signature: &PageSignature) -> Result<SlideMapping> {
        let mut layouts = self.catalog.iter();
        let first = layouts.next().ok_or(Error::EmptyCatalog)?;

        let mut best = first;
        let mut best_score = score(signature, first, self.config);
        for layout in layouts {
            let candidate = score(signature, layout, self.config);
            if candidate.score > best_score.score {
                best = layout;
                best_score = candidate;
            }
        }

        let LayoutScore { score, mut issues } = best_score;
        if score < self.config.low_fit_threshold {
            issues.insert(Issue::LowFit);
            best = self.fallback().unwrap_or(first);
            log::debug!(
                "page {}: best score {:.2} below floor, falling back to {}",
                page_idx,
                score,
                best.layout_id
            );
        }

        Ok(SlideMapping {
            page_idx,
            chosen_layout_id: best.layout_id,
            score: self.config.round_score(score),
            issues,
        })
    }

    /// First layout whose name hints at content or that has a body slot.
    fn fallback(&self) -> Option<&'a LayoutDescriptor> {
        let hint = self.config.fallback_name_hint.to_lowercase();
        self.catalog.iter().find(|layout| {
            layout.name.to_lowercase().contains(&hint) || layout.placeholders.body_slot_count > 0
        })
    }

    /// Map every page, preserving page order.
    pub fn plan(&self, pages: &[PageEntry]) -> Result<Vec<SlideMapping>> {
        pages
            .iter()
            .map(|page| self.choose(page.idx, &page.signature))
            .collect()
    }
}

/// Map every page of a source onto the catalog.
pub fn plan(pages: &[PageEntry], catalog: &LayoutCatalog, config: &ScoringConfig) -> Result<Vec<SlideMapping>> {
    Planner::new(catalog, config).plan(pages)
}
