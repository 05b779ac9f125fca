//! PDF backend.
//!
//! PDF pages carry no placeholders or outline levels, so page content is
//! recovered heuristically by interpreting each page's content stream.

pub mod interpreter;
pub mod ocr;
pub mod reader;
pub mod text;

pub use interpreter::{ContentInterpreter, PageFrame};
pub use ocr::OcrEngine;
pub use reader::PdfReader;
pub use text::normalize_text;
