//! Error types for deck ingest, planning and execution.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while ingesting, planning or executing a conversion.
///
/// Fit problems (low fit, overflow, missing slots) are never errors; they are
/// reported as [`Issue`](crate::Issue) values on the plan.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open or read an input or output file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// The document kind is not supported or could not be detected.
    #[error("Unsupported or unrecognized document kind: {0}")]
    UnsupportedFormat(String),

    /// A part the package must contain is missing.
    #[error("Missing package part: {0}")]
    MissingPart(String),

    /// ZIP archive error (for PPTX).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing or writing error (for PPTX).
    #[error("XML error: {0}")]
    XmlError(String),

    /// PDF object or content stream error.
    #[error("PDF error: {0}")]
    PdfError(String),

    /// The template has no layouts to choose from.
    #[error("Layout catalog is empty")]
    EmptyCatalog,

    /// A layout id does not exist in the catalog it was resolved against.
    #[error("Unknown layout '{0}'")]
    UnknownLayout(String),

    /// A plan was combined with a template it was not computed from.
    #[error("Plan was computed from template '{expected}', not '{actual}'")]
    CatalogMismatch { expected: String, actual: String },

    /// A page index is not part of the plan.
    #[error("Page {0} is not part of the plan")]
    PageOutOfRange(usize),

    /// A placeholder could not be filled with the given text.
    #[error("Placeholder fill failed: {0}")]
    PlaceholderFill(String),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// JSON (de)serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
