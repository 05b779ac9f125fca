//! Writing composed slides into a copy of the template deck.

use crate::package::{
    parse_relationships, relative_target, rels_part_name, Package, Relationship, REL_NOTES_SLIDE,
    REL_NS_PREFIX, REL_SLIDE, REL_SLIDE_LAYOUT,
};
use crate::shapes::PlaceholderKind;
use crate::template::{LayoutPart, LayoutPlaceholder, TemplateDeck};
use crate::xml::{self, attr, is_xml_safe, local_name, prefix_of, trailing_number};
use deck_core::{ComposedSlide, Error, Result};
use quick_xml::escape::escape;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub const SLIDE_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";

/// First id PowerPoint accepts for a slide in `p:sldIdLst`.
const FIRST_SLIDE_ID: u32 = 256;

/// Placeholder types that are never instantiated on generated slides.
const SKIPPED_PLACEHOLDERS: [&str; 4] = ["dt", "ftr", "sldNum", "hdr"];

const SLIDE_NAMESPACES: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

/// Writes composed slides into a template package.
///
/// Everything in the template is carried over except its own slides and
/// their notes; the composed slides take their place.
pub struct DeckWriter<'a> {
    deck: &'a TemplateDeck,
}

impl<'a> DeckWriter<'a> {
    pub fn new(deck: &'a TemplateDeck) -> Self {
        Self { deck }
    }

    pub fn write(&self, template: &[u8], slides: &[ComposedSlide]) -> Result<Vec<u8>> {
        let mut package = Package::open(Cursor::new(template))?;
        let info = package.presentation()?;

        let mut removed: HashSet<String> = HashSet::new();
        for slide in &info.slide_parts {
            let notes = package.related_parts(slide, REL_NOTES_SLIDE).unwrap_or_default();
            for part in notes {
                removed.insert(rels_part_name(&part));
                removed.insert(part);
            }
            removed.insert(rels_part_name(slide));
            removed.insert(slide.clone());
        }

        let mut new_parts: Vec<(String, String)> = Vec::new();
        let mut slide_names = Vec::with_capacity(slides.len());
        for (n, slide) in slides.iter().enumerate() {
            let layout = self
                .deck
                .layout_part(slide.layout_id)
                .ok_or_else(|| Error::UnknownLayout(slide.layout_id.to_string()))?;
            let part_name = format!("ppt/slides/slide{}.xml", n + 1);

            new_parts.push((part_name.clone(), slide_xml(layout, slide)));
            new_parts.push((
                rels_part_name(&part_name),
                slide_rels_xml(&relative_target(&part_name, &layout.part_name)),
            ));
            slide_names.push(part_name);
        }

        let pres_rels_part = rels_part_name(&info.part_name);
        let existing = parse_relationships(&package.read_part(&pres_rels_part)?)?;
        let first_rid = existing
            .iter()
            .filter(|r| !r.is(REL_SLIDE))
            .filter_map(|r| trailing_number(&r.id))
            .max()
            .unwrap_or(0)
            + 1;

        let slide_rels: Vec<Relationship> = slide_names
            .iter()
            .enumerate()
            .map(|(n, part)| Relationship {
                id: format!("rId{}", first_rid + n),
                rel_type: format!("{}{}", REL_NS_PREFIX, REL_SLIDE),
                target: relative_target(&info.part_name, part),
                external: false,
            })
            .collect();
        let slide_ids: Vec<(u32, String)> = slide_rels
            .iter()
            .enumerate()
            .map(|(n, rel)| (FIRST_SLIDE_ID + n as u32, rel.id.clone()))
            .collect();

        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        for index in 0..package.len() {
            let Some(name) = package.entry_name(index)? else {
                continue;
            };
            if removed.contains(&name) {
                log::debug!("Dropping template part '{}'", name);
                continue;
            }

            let content = if name == CONTENT_TYPES_PART {
                rewrite_content_types(&package.read_part(&name)?, &removed, &slide_names)?
            } else if name == info.part_name {
                rewrite_presentation(&package.read_part(&name)?, &slide_ids)?
            } else if name == pres_rels_part {
                rewrite_relationships(&package.read_part(&name)?, &slide_rels)?
            } else {
                package.read_bytes(&name)?
            };

            write_entry(&mut zip, &name, &content, options)?;
        }

        for (name, content) in &new_parts {
            write_entry(&mut zip, name, content.as_bytes(), options)?;
        }

        let cursor = zip
            .finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish ZIP: {}", e)))?;
        log::debug!("Wrote deck with {} slides", slides.len());
        Ok(cursor.into_inner())
    }
}

fn write_entry(
    zip: &mut ZipWriter<Cursor<Vec<u8>>>,
    name: &str,
    content: &[u8],
    options: FileOptions,
) -> Result<()> {
    zip.start_file(name, options)
        .map_err(|e| Error::ZipError(format!("Failed to add '{}': {}", name, e)))?;
    zip.write_all(content)?;
    Ok(())
}

/// Paragraph markup for text, one paragraph per line.
///
/// Fails when the text holds characters XML 1.0 cannot carry.
pub fn text_body(text: &str) -> Result<String> {
    if !is_xml_safe(text) {
        return Err(Error::PlaceholderFill(format!(
            "text contains characters not allowed in XML: {:?}",
            text.chars().take(40).collect::<String>()
        )));
    }

    let mut body = String::from("<p:txBody><a:bodyPr/><a:lstStyle/>");
    for line in text.lines() {
        if line.is_empty() {
            body.push_str("<a:p/>");
        } else {
            body.push_str(&format!(
                r#"<a:p><a:r><a:rPr lang="en-US" dirty="0"/><a:t>{}</a:t></a:r></a:p>"#,
                escape(line)
            ));
        }
    }
    if text.is_empty() {
        body.push_str("<a:p/>");
    }
    body.push_str("</p:txBody>");
    Ok(body)
}

const EMPTY_TEXT_BODY: &str = "<p:txBody><a:bodyPr/><a:lstStyle/><a:p/></p:txBody>";

fn fill(placeholder: &LayoutPlaceholder, text: Option<&str>) -> String {
    let Some(text) = text else {
        return EMPTY_TEXT_BODY.to_string();
    };
    match text_body(text) {
        Ok(body) => body,
        Err(e) => {
            log::warn!("Leaving placeholder '{}' empty: {}", placeholder.name, e);
            EMPTY_TEXT_BODY.to_string()
        }
    }
}

/// Slide part for a composed slide on its layout.
pub fn slide_xml(layout: &LayoutPart, slide: &ComposedSlide) -> String {
    let mut shapes = String::new();
    let mut title_done = false;
    let mut body_done = false;
    let mut shape_id = 2;

    for placeholder in &layout.placeholders {
        if placeholder
            .ph_type
            .as_deref()
            .map_or(false, |t| SKIPPED_PLACEHOLDERS.contains(&t))
        {
            continue;
        }

        let text = match placeholder.kind {
            PlaceholderKind::Title if !title_done => {
                title_done = true;
                slide.title.as_deref()
            }
            PlaceholderKind::Body if !body_done => {
                body_done = true;
                slide.body.as_deref()
            }
            _ => None,
        };

        let mut ph = String::from("<p:ph");
        if let Some(ph_type) = &placeholder.ph_type {
            ph.push_str(&format!(r#" type="{}""#, escape(ph_type.as_str())));
        }
        if let Some(idx) = placeholder.idx {
            ph.push_str(&format!(r#" idx="{}""#, idx));
        }
        ph.push_str("/>");

        shapes.push_str(&format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="{}"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr>{}</p:nvPr></p:nvSpPr><p:spPr/>{}</p:sp>"#,
            shape_id,
            escape(placeholder.name.as_str()),
            ph,
            fill(placeholder, text)
        ));
        shape_id += 1;
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld {}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
        SLIDE_NAMESPACES, shapes
    )
}

fn slide_rels_xml(layout_target: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{}{}" Target="{}"/></Relationships>"#,
        REL_NS_PREFIX,
        REL_SLIDE_LAYOUT,
        escape(layout_target)
    )
}

fn write_event<'e>(writer: &mut Writer<Vec<u8>>, event: impl AsRef<Event<'e>>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| xml::xml_error("Error writing XML", e))
}

/// Skip the rest of an element whose start tag was just read.
fn skip_element(reader: &mut quick_xml::Reader<&[u8]>) -> Result<()> {
    let mut depth = 1usize;
    while depth > 0 {
        match reader.read_event() {
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(_)) => depth -= 1,
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml::xml_error("Error skipping element", e)),
            _ => {}
        }
    }
    Ok(())
}

fn write_slide_list(writer: &mut Writer<Vec<u8>>, prefix: &str, slide_ids: &[(u32, String)]) -> Result<()> {
    if slide_ids.is_empty() {
        return Ok(());
    }
    write_event(writer, Event::Start(BytesStart::new(format!("{}sldIdLst", prefix))))?;
    for (id, rid) in slide_ids {
        let mut element = BytesStart::new(format!("{}sldId", prefix));
        element.push_attribute(("id", id.to_string().as_str()));
        element.push_attribute(("r:id", rid.as_str()));
        write_event(writer, Event::Empty(element))?;
    }
    write_event(writer, Event::End(BytesEnd::new(format!("{}sldIdLst", prefix))))
}

/// Replace the slide id list of a presentation part.
///
/// The list is written where the old one was, or before `sldSz`/`notesSz`
/// when the template had none.
pub fn rewrite_presentation(xml_content: &str, slide_ids: &[(u32, String)]) -> Result<Vec<u8>> {
    let mut reader = xml::reader(xml_content);
    let mut writer = Writer::new(Vec::new());
    let mut prefix: Option<String> = None;
    let mut written = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| xml::xml_error("Error parsing presentation", e))?;

        match &event {
            Event::Start(e) | Event::Empty(e) => {
                let name = e.name();
                let prefix = prefix.get_or_insert_with(|| prefix_of(name.as_ref()));
                match local_name(name.as_ref()) {
                    b"sldIdLst" => {
                        if matches!(event, Event::Start(_)) {
                            skip_element(&mut reader)?;
                        }
                        if !written {
                            write_slide_list(&mut writer, prefix, slide_ids)?;
                            written = true;
                        }
                        continue;
                    }
                    b"sldSz" | b"notesSz" if !written => {
                        write_slide_list(&mut writer, prefix, slide_ids)?;
                        written = true;
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }

        write_event(&mut writer, &event)?;
    }

    Ok(writer.into_inner())
}

/// Drop slide relationships and append `added` before the closing tag.
pub fn rewrite_relationships(xml_content: &str, added: &[Relationship]) -> Result<Vec<u8>> {
    let mut reader = xml::reader(xml_content);
    let mut writer = Writer::new(Vec::new());

    loop {
        let event = reader
            .read_event()
            .map_err(|e| xml::xml_error("Error parsing relationships", e))?;

        match &event {
            Event::Start(e) | Event::Empty(e) if local_name(e.name().as_ref()) == b"Relationship" => {
                let is_slide = attr(e, b"Type")
                    .map_or(false, |t| t.rsplit('/').next() == Some(REL_SLIDE));
                if is_slide {
                    if matches!(event, Event::Start(_)) {
                        skip_element(&mut reader)?;
                    }
                    continue;
                }
            }
            Event::End(e) if local_name(e.name().as_ref()) == b"Relationships" => {
                let prefix = prefix_of(e.name().as_ref());
                for rel in added {
                    let mut element = BytesStart::new(format!("{}Relationship", prefix));
                    element.push_attribute(("Id", rel.id.as_str()));
                    element.push_attribute(("Type", rel.rel_type.as_str()));
                    element.push_attribute(("Target", rel.target.as_str()));
                    write_event(&mut writer, Event::Empty(element))?;
                }
            }
            Event::Eof => break,
            _ => {}
        }

        write_event(&mut writer, &event)?;
    }

    Ok(writer.into_inner())
}

/// Drop overrides of removed parts and declare the new slide parts.
pub fn rewrite_content_types(
    xml_content: &str,
    removed: &HashSet<String>,
    slide_parts: &[String],
) -> Result<Vec<u8>> {
    let mut reader = xml::reader(xml_content);
    let mut writer = Writer::new(Vec::new());

    loop {
        let event = reader
            .read_event()
            .map_err(|e| xml::xml_error("Error parsing content types", e))?;

        match &event {
            Event::Start(e) | Event::Empty(e) if local_name(e.name().as_ref()) == b"Override" => {
                let part = attr(e, b"PartName").unwrap_or_default();
                if removed.contains(part.trim_start_matches('/')) {
                    if matches!(event, Event::Start(_)) {
                        skip_element(&mut reader)?;
                    }
                    continue;
                }
            }
            Event::End(e) if local_name(e.name().as_ref()) == b"Types" => {
                let prefix = prefix_of(e.name().as_ref());
                for part in slide_parts {
                    let part_name = format!("/{}", part);
                    let mut element = BytesStart::new(format!("{}Override", prefix));
                    element.push_attribute(("PartName", part_name.as_str()));
                    element.push_attribute(("ContentType", SLIDE_CONTENT_TYPE));
                    write_event(&mut writer, Event::Empty(element))?;
                }
            }
            Event::Eof => break,
            _ => {}
        }

        write_event(&mut writer, &event)?;
    }

    Ok(writer.into_inner())
}
