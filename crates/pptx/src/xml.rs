//! Small helpers over quick-xml shared by the PPTX readers and writer.

use deck_core::{Error, Result};
use quick_xml::events::BytesStart;
use quick_xml::Reader;

/// English Metric Units per point.
pub const EMU_PER_POINT: f64 = 12_700.0;

/// Extract the local name from a potentially namespaced XML element name.
pub fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Namespace prefix of a qualified name, including the colon (`"p:"`), or empty.
pub fn prefix_of(name: &[u8]) -> String {
    match name.iter().position(|&b| b == b':') {
        Some(pos) => String::from_utf8_lossy(&name[..=pos]).into_owned(),
        None => String::new(),
    }
}

/// Reader over a part's XML that keeps whitespace-only text.
pub fn reader(xml: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);
    reader
}

/// Value of an unprefixed attribute.
pub fn attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Value of a namespaced attribute by local name, e.g. `r:id` for `b"id"`.
pub fn prefixed_attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| {
            let raw = a.key.as_ref();
            raw.contains(&b':') && local_name(raw) == key
        })
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

pub fn attr_i64(e: &BytesStart, key: &[u8]) -> Option<i64> {
    attr(e, key).and_then(|v| v.trim().parse().ok())
}

pub fn attr_u32(e: &BytesStart, key: &[u8]) -> Option<u32> {
    attr(e, key).and_then(|v| v.trim().parse().ok())
}

pub fn emu_to_points(emu: i64) -> f64 {
    emu as f64 / EMU_PER_POINT
}

pub fn xml_error(context: &str, e: impl std::fmt::Display) -> Error {
    Error::XmlError(format!("{}: {}", context, e))
}

/// Whether every character may appear in an XML 1.0 document.
pub fn is_xml_safe(text: &str) -> bool {
    text.chars().all(|c| {
        matches!(c, '\t' | '\n' | '\r')
            || ('\u{20}'..='\u{D7FF}').contains(&c)
            || ('\u{E000}'..='\u{FFFD}').contains(&c)
            || c >= '\u{10000}'
    })
}

/// Parse the trailing number of a name like `"rId12"` or `"slide3.xml"`.
pub fn trailing_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}
