//! Domain types shared by the template, source and plan sides of a conversion.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Identifier of an ingested template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(pub String);

/// Identifier of an ingested source document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(pub String);

/// Identifier of a transformation plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(pub String);

macro_rules! string_id {
    ($($ty:ident),*) => {
        $(
            impl $ty {
                pub fn new(id: impl Into<String>) -> Self {
                    Self(id.into())
                }

                pub fn as_str(&self) -> &str {
                    &self.0
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }
        )*
    };
}

string_id!(TemplateId, SourceId, PlanId);

/// Position of a layout within its template's catalog.
///
/// Always written as `layout_<n>`. Bare integers and numeric strings are
/// accepted when reading older plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawLayoutId", into = "String")]
pub struct LayoutId(usize);

impl LayoutId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Catalog position this id refers to.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for LayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layout_{}", self.0)
    }
}

impl FromStr for LayoutId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s.trim().strip_prefix("layout_").unwrap_or(s.trim());
        digits
            .parse::<usize>()
            .map(LayoutId)
            .map_err(|_| Error::UnknownLayout(s.to_string()))
    }
}

impl From<LayoutId> for String {
    fn from(id: LayoutId) -> Self {
        id.to_string()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLayoutId {
    Index(usize),
    Text(String),
}

impl TryFrom<RawLayoutId> for LayoutId {
    type Error = Error;

    fn try_from(raw: RawLayoutId) -> Result<Self> {
        match raw {
            RawLayoutId::Index(index) => Ok(LayoutId(index)),
            RawLayoutId::Text(text) => text.parse(),
        }
    }
}

/// Canvas dimensions in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub w: f64,
    pub h: f64,
}

impl PageSize {
    pub fn new(w: f64, h: f64) -> Self {
        Self { w, h }
    }

    /// Page area, zero when either side is degenerate.
    pub fn area(&self) -> f64 {
        if self.w.is_finite() && self.h.is_finite() && self.w > 0.0 && self.h > 0.0 {
            self.w * self.h
        } else {
            0.0
        }
    }
}

impl Default for PageSize {
    /// 10in x 7.5in, the classic 4:3 slide.
    fn default() -> Self {
        Self { w: 720.0, h: 540.0 }
    }
}

/// Axis-aligned rectangle in points, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Build a rectangle from two corners in any order.
    pub fn from_corners(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x: x0.min(x1),
            y: y0.min(y1),
            w: (x1 - x0).abs(),
            h: (y1 - y0).abs(),
        }
    }

    pub fn area(&self) -> f64 {
        self.w.max(0.0) * self.h.max(0.0)
    }

    pub fn centroid_x(&self) -> f64 {
        self.x + self.w / 2.0
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.w.is_finite() && self.h.is_finite()
    }
}

/// Title and body font names of a template theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeFonts {
    pub title: String,
    pub body: String,
}

/// Accent colors used when a template does not declare its own.
pub const DEFAULT_ACCENT_COLORS: [&str; 6] = [
    "#4472C4", "#ED7D31", "#A5A5A5", "#FFC000", "#5B9BD5", "#70AD47",
];

/// Font used when a template does not declare a theme font.
pub const DEFAULT_THEME_FONT: &str = "Calibri";

/// The six accent colors of a theme as `#RRGGBB` strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccentColors {
    pub accent1: String,
    pub accent2: String,
    pub accent3: String,
    pub accent4: String,
    pub accent5: String,
    pub accent6: String,
}

impl AccentColors {
    /// Build from optional per-slot values, filling gaps with the defaults.
    pub fn from_slots(slots: [Option<String>; 6]) -> Self {
        let [a1, a2, a3, a4, a5, a6] = slots;
        let pick = |value: Option<String>, slot: usize| {
            value.unwrap_or_else(|| DEFAULT_ACCENT_COLORS[slot].to_string())
        };
        Self {
            accent1: pick(a1, 0),
            accent2: pick(a2, 1),
            accent3: pick(a3, 2),
            accent4: pick(a4, 3),
            accent5: pick(a5, 4),
            accent6: pick(a6, 5),
        }
    }
}

impl Default for AccentColors {
    fn default() -> Self {
        Self::from_slots(Default::default())
    }
}

/// Theme metadata of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeMeta {
    pub fonts: ThemeFonts,
    pub colors: AccentColors,
    pub page_size: PageSize,
}

impl Default for ThemeMeta {
    fn default() -> Self {
        Self {
            fonts: ThemeFonts {
                title: DEFAULT_THEME_FONT.to_string(),
                body: DEFAULT_THEME_FONT.to_string(),
            },
            colors: AccentColors::default(),
            page_size: PageSize::default(),
        }
    }
}

/// Placeholder capabilities of one layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaceholderCaps {
    #[serde(rename = "title")]
    pub has_title: bool,
    #[serde(rename = "bodies")]
    pub body_slot_count: u32,
    #[serde(rename = "pictures")]
    pub picture_slot_count: u32,
    #[serde(rename = "table")]
    pub has_table: bool,
}

/// One reusable layout of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutDescriptor {
    pub layout_id: LayoutId,
    pub name: String,
    pub placeholders: PlaceholderCaps,
}

/// Ordered layouts of one template.
///
/// Order is significant: it breaks scoring ties and drives fallback choice.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayoutCatalog {
    layouts: Vec<LayoutDescriptor>,
}

impl LayoutCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layout, assigning it the next catalog position.
    pub fn push(&mut self, name: impl Into<String>, placeholders: PlaceholderCaps) -> LayoutId {
        let layout_id = LayoutId::new(self.layouts.len());
        self.layouts.push(LayoutDescriptor {
            layout_id,
            name: name.into(),
            placeholders,
        });
        layout_id
    }

    pub fn get(&self, id: LayoutId) -> Option<&LayoutDescriptor> {
        self.layouts.get(id.index()).filter(|l| l.layout_id == id)
    }

    /// Resolve an id, failing if it does not belong to this catalog.
    pub fn resolve(&self, id: LayoutId) -> Result<&LayoutDescriptor> {
        self.get(id).ok_or_else(|| Error::UnknownLayout(id.to_string()))
    }

    pub fn first(&self) -> Option<&LayoutDescriptor> {
        self.layouts.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayoutDescriptor> {
        self.layouts.iter()
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}

impl FromIterator<(String, PlaceholderCaps)> for LayoutCatalog {
    fn from_iter<I: IntoIterator<Item = (String, PlaceholderCaps)>>(iter: I) -> Self {
        let mut catalog = LayoutCatalog::new();
        for (name, caps) in iter {
            catalog.push(name, caps);
        }
        catalog
    }
}

/// Everything the planner needs to know about an ingested template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateProfile {
    pub template_id: TemplateId,
    pub theme_meta: ThemeMeta,
    pub layout_catalog: LayoutCatalog,
}

/// Fit problems attached to a slide mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Issue {
    /// Two-column content placed on a layout with fewer than two bodies.
    ColumnMismatch,
    /// Several images but the layout has no picture slots.
    NoPictureSlots,
    /// The page has a table the layout cannot hold.
    NoTableSupport,
    /// Body content does not fit and spills onto a continuation page.
    Overflow,
    /// No layout scored above the acceptance floor.
    LowFit,
}

impl Issue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Issue::ColumnMismatch => "column_mismatch",
            Issue::NoPictureSlots => "no_picture_slots",
            Issue::NoTableSupport => "no_table_support",
            Issue::Overflow => "overflow",
            Issue::LowFit => "low_fit",
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of issues, ordered for deterministic output.
pub type IssueSet = BTreeSet<Issue>;
