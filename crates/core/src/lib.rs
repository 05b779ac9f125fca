//! Core data model, page signatures, layout matching and content
//! recomposition for converting a deck or PDF onto a template's layouts.

pub mod config;
pub mod content;
pub mod error;
pub mod executor;
pub mod plan;
pub mod planner;
pub mod report;
pub mod signature;
pub mod types;

pub use config::{Config, ExecutorConfig, ExtractionConfig, ScoringConfig};
pub use content::{
    DocumentKind, ImageRegion, PageContent, Paragraph, SourceDocument, SourcePage, TableRegion,
    TextBlock,
};
pub use error::{Error, Result};
pub use executor::{ComposedSlide, Composition, Executor, PageState, PageTrace};
pub use plan::{SlideMapping, TransformationPlan};
pub use planner::{plan, score, LayoutScore, Planner};
pub use report::ExecutionReport;
pub use signature::{
    Coverage, ExtractionStrategy, PageEntry, PageSignature, PageWarning, SignatureExtractor,
    SourceProfile,
};
pub use types::{
    AccentColors, Issue, IssueSet, LayoutCatalog, LayoutDescriptor, LayoutId, PageSize,
    PlaceholderCaps, PlanId, Rect, SourceId, TemplateId, TemplateProfile, ThemeFonts, ThemeMeta,
    DEFAULT_THEME_FONT,
};
