//! Transformation plans and manual layout overrides.

use crate::config::ScoringConfig;
use crate::types::{IssueSet, LayoutId, PlanId, SourceId, TemplateId, TemplateProfile};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// The layout chosen for one source page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideMapping {
    #[serde(rename = "idx")]
    pub page_idx: usize,
    pub chosen_layout_id: LayoutId,
    /// Fit score in [0, 1].
    pub score: f64,
    #[serde(default)]
    pub issues: IssueSet,
}

/// Ordered slide mappings computed for one template/source pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationPlan {
    pub plan_id: PlanId,
    pub template_id: TemplateId,
    pub source_id: SourceId,
    pub slides: Vec<SlideMapping>,
}

impl TransformationPlan {
    pub fn new(
        plan_id: PlanId,
        template_id: TemplateId,
        source_id: SourceId,
        slides: Vec<SlideMapping>,
    ) -> Self {
        Self {
            plan_id,
            template_id,
            source_id,
            slides,
        }
    }

    /// Mapping for a source page, if the plan covers it.
    pub fn mapping(&self, page_idx: usize) -> Option<&SlideMapping> {
        self.slides.iter().find(|m| m.page_idx == page_idx)
    }

    /// Return a new plan with one page moved onto `layout_id`.
    ///
    /// The swap is not scored: the mapping gets the configured manual score
    /// and loses its issues. Plan identity and page indices never change, so
    /// applying the same swap twice is the same as applying it once.
    pub fn swap(
        &self,
        template: &TemplateProfile,
        page_idx: usize,
        layout_id: LayoutId,
        scoring: &ScoringConfig,
    ) -> Result<TransformationPlan> {
        if template.template_id != self.template_id {
            return Err(Error::CatalogMismatch {
                expected: self.template_id.to_string(),
                actual: template.template_id.to_string(),
            });
        }
        template.layout_catalog.resolve(layout_id)?;

        let position = self
            .slides
            .iter()
            .position(|m| m.page_idx == page_idx)
            .ok_or(Error::PageOutOfRange(page_idx))?;

        let mut swapped = self.clone();
        let mapping = &mut swapped.slides[position];
        mapping.chosen_layout_id = layout_id;
        mapping.score = scoring.manual_override_score;
        mapping.issues.clear();

        log::debug!(
            "plan {}: page {} swapped to {}",
            self.plan_id,
            page_idx,
            layout_id
        );
        Ok(swapped)
    }
}
