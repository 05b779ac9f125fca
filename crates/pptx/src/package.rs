//! OPC package access: parts, relationships and the presentation part.

use crate::xml::{self, attr, local_name, prefixed_attr, trailing_number};
use deck_core::{Error, PageSize, Result};
use quick_xml::events::Event;
use std::io::{Read, Seek};
use zip::ZipArchive;

pub const REL_OFFICE_DOCUMENT: &str = "officeDocument";
pub const REL_SLIDE: &str = "slide";
pub const REL_SLIDE_LAYOUT: &str = "slideLayout";
pub const REL_SLIDE_MASTER: &str = "slideMaster";
pub const REL_NOTES_SLIDE: &str = "notesSlide";
pub const REL_THEME: &str = "theme";

pub const REL_NS_PREFIX: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/";

/// One entry of a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

impl Relationship {
    /// Whether the relationship type's last path segment is `kind`.
    pub fn is(&self, kind: &str) -> bool {
        self.rel_type.rsplit('/').next() == Some(kind)
    }
}

/// Parse the relationships of a `.rels` part.
pub fn parse_relationships(xml_content: &str) -> Result<Vec<Relationship>> {
    let mut reader = xml::reader(xml_content);
    let mut rels = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                rels.push(Relationship {
                    id: attr(e, b"Id").unwrap_or_default(),
                    rel_type: attr(e, b"Type").unwrap_or_default(),
                    target: attr(e, b"Target").unwrap_or_default(),
                    external: attr(e, b"TargetMode").as_deref() == Some("External"),
                });
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml::xml_error("Error parsing relationships", e)),
            _ => {}
        }
    }

    Ok(rels)
}

/// Name of the relationships part belonging to `part`.
pub fn rels_part_name(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target relative to the part that owns it.
pub fn resolve_target(base_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = match base_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').filter(|s| !s.is_empty()).collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Target for a relationship from `base_part` to `part`, relative when possible.
pub fn relative_target(base_part: &str, part: &str) -> String {
    let base_dir = base_part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    let base: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    let target: Vec<&str> = part.split('/').collect();

    let common = base
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();
    if common == 0 && !base.is_empty() {
        return format!("/{}", part);
    }

    let mut path: Vec<&str> = vec![".."; base.len() - common];
    path.extend(&target[common..]);
    path.join("/")
}

/// Facts read from the presentation part.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentationInfo {
    pub part_name: String,
    pub page_size: PageSize,
    /// Slide parts in presentation order.
    pub slide_parts: Vec<String>,
    /// Slide master parts in presentation order.
    pub master_parts: Vec<String>,
}

/// A PPTX package opened for reading.
pub struct Package<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl<R: Read + Seek> Package<R> {
    /// Open a ZIP container.
    pub fn open(reader: R) -> Result<Self> {
        let archive =
            ZipArchive::new(reader).map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;
        Ok(Self { archive })
    }

    pub fn has_part(&self, name: &str) -> bool {
        self.archive.file_names().any(|n| n == name)
    }

    /// Number of entries in the archive, including directories.
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }

    /// Name of the entry at `index`, or `None` for a directory entry.
    pub fn entry_name(&mut self, index: usize) -> Result<Option<String>> {
        let file = self
            .archive
            .by_index(index)
            .map_err(|e| Error::ZipError(format!("Failed to read entry {}: {}", index, e)))?;
        if file.is_dir() {
            return Ok(None);
        }
        Ok(Some(file.name().to_string()))
    }

    /// Read a part as raw bytes.
    pub fn read_bytes(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut file = self
            .archive
            .by_name(name)
            .map_err(|e| Error::MissingPart(format!("'{}': {}", name, e)))?;

        let mut content = Vec::new();
        file.read_to_end(&mut content)
            .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", name, e)))?;

        Ok(content)
    }

    /// Read a part as UTF-8 text.
    pub fn read_part(&mut self, name: &str) -> Result<String> {
        let mut file = self
            .archive
            .by_name(name)
            .map_err(|e| Error::MissingPart(format!("'{}': {}", name, e)))?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", name, e)))?;

        Ok(content)
    }

    /// Relationships of `part`; a part without a rels part has none.
    pub fn relationships(&mut self, part: &str) -> Result<Vec<Relationship>> {
        let rels_part = rels_part_name(part);
        if !self.has_part(&rels_part) {
            return Ok(Vec::new());
        }
        parse_relationships(&self.read_part(&rels_part)?)
    }

    /// Resolved part names of every internal relationship of the given kind.
    pub fn related_parts(&mut self, part: &str, kind: &str) -> Result<Vec<String>> {
        Ok(self
            .relationships(part)?
            .into_iter()
            .filter(|r| r.is(kind) && !r.external)
            .map(|r| resolve_target(part, &r.target))
            .collect())
    }

    /// First related part of the given kind.
    pub fn related_part(&mut self, part: &str, kind: &str) -> Result<Option<String>> {
        Ok(self.related_parts(part, kind)?.into_iter().next())
    }

    /// Name of the presentation part, from the package relationships.
    pub fn main_part(&mut self) -> Result<String> {
        let main = self.related_part("", REL_OFFICE_DOCUMENT)?;
        Ok(main.unwrap_or_else(|| "ppt/presentation.xml".to_string()))
    }

    /// Read slide size, slide order and master order from the presentation part.
    pub fn presentation(&mut self) -> Result<PresentationInfo> {
        let part_name = self.main_part()?;
        let content = self.read_part(&part_name)?;
        let rels = self.relationships(&part_name)?;

        let mut page_size = PageSize::default();
        let mut slide_ids = Vec::new();
        let mut master_ids = Vec::new();

        let mut reader = xml::reader(&content);
        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    match local_name(e.name().as_ref()) {
                        b"sldSz" => {
                            if let (Some(cx), Some(cy)) = (xml::attr_i64(e, b"cx"), xml::attr_i64(e, b"cy")) {
                                page_size = PageSize::new(xml::emu_to_points(cx), xml::emu_to_points(cy));
                            }
                        }
                        b"sldId" => slide_ids.extend(prefixed_attr(e, b"id")),
                        b"sldMasterId" => master_ids.extend(prefixed_attr(e, b"id")),
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml::xml_error("Error parsing presentation", e)),
                _ => {}
            }
        }

        let resolve = |ids: &[String]| -> Vec<String> {
            ids.iter()
                .filter_map(|id| rels.iter().find(|r| &r.id == id))
                .map(|r| resolve_target(&part_name, &r.target))
                .collect()
        };
        let mut slide_parts = resolve(&slide_ids);
        let mut master_parts = resolve(&master_ids);

        // Without an id list, fall back to relationship order by number.
        if slide_parts.is_empty() {
            slide_parts = ordered_targets(&part_name, &rels, REL_SLIDE);
        }
        if master_parts.is_empty() {
            master_parts = ordered_targets(&part_name, &rels, REL_SLIDE_MASTER);
        }

        Ok(PresentationInfo {
            part_name,
            page_size,
            slide_parts,
            master_parts,
        })
    }
}

pub(crate) fn ordered_targets(base_part: &str, rels: &[Relationship], kind: &str) -> Vec<String> {
    let mut parts: Vec<(String, Option<usize>)> = rels
        .iter()
        .filter(|r| r.is(kind) && !r.external)
        .map(|r| {
            let order = trailing_number(&r.target).or_else(|| trailing_number(&r.id));
            (resolve_target(base_part, &r.target), order)
        })
        .collect();

    parts.sort_by(|a, b| match (a.1, b.1) {
        (Some(na), Some(nb)) => na.cmp(&nb),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.0.cmp(&b.0),
    });

    parts.into_iter().map(|(path, _)| path).collect()
}
