//! PPTX (Office Open XML) backend.
//!
//! Reads template themes and layouts, reads slides as source content, and
//! writes composed slides back into a copy of a template.

pub mod package;
pub mod shapes;
pub mod source;
pub mod template;
pub mod writer;
mod xml;

#[cfg(test)]
mod testing;

pub use package::{Package, PresentationInfo, Relationship};
pub use shapes::PlaceholderKind;
pub use source::SlideReader;
pub use template::{LayoutPart, LayoutPlaceholder, TemplateDeck, TemplateParser};
pub use writer::DeckWriter;
