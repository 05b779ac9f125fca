//! Execution report: how well the converted deck fits its template.

use crate::plan::SlideMapping;
use crate::types::Issue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fit summary of a completed execution.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Pages without any issue.
    pub greens: usize,
    /// Pages with at least one issue.
    pub yellows: usize,
    pub issues_by_type: BTreeMap<Issue, usize>,
}

impl ExecutionReport {
    /// Tally the final mappings of an execution.
    pub fn from_mappings<'a>(mappings: impl IntoIterator<Item = &'a SlideMapping>) -> Self {
        let mut report = Self::default();
        for mapping in mappings {
            if mapping.issues.is_empty() {
                report.greens += 1;
            } else {
                report.yellows += 1;
                for issue in &mapping.issues {
                    *report.issues_by_type.entry(*issue).or_insert(0) += 1;
                }
            }
        }
        report
    }

    pub fn total(&self) -> usize {
        self.greens + self.yellows
    }
}
