//! Theme and layout extraction from a template deck.

use crate::package::{
    ordered_targets, Package, REL_SLIDE_LAYOUT, REL_THEME,
};
use crate::shapes::{parse_shape_tree, PlaceholderKind, ShapeKind};
use crate::xml::{self, attr, local_name, prefixed_attr};
use deck_core::{
    AccentColors, LayoutCatalog, LayoutId, PlaceholderCaps, Result, ThemeFonts, ThemeMeta,
    DEFAULT_THEME_FONT,
};
use quick_xml::events::Event;
use std::io::{Read, Seek};

/// A placeholder declared by a layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutPlaceholder {
    pub kind: PlaceholderKind,
    pub ph_type: Option<String>,
    pub idx: Option<u32>,
    pub name: String,
}

/// A layout of the template together with the part it lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutPart {
    pub layout_id: LayoutId,
    pub part_name: String,
    pub placeholders: Vec<LayoutPlaceholder>,
}

/// Everything read from a template deck.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDeck {
    pub theme: ThemeMeta,
    pub catalog: LayoutCatalog,
    /// Layout parts, parallel to the catalog.
    pub layouts: Vec<LayoutPart>,
}

impl TemplateDeck {
    pub fn layout_part(&self, id: LayoutId) -> Option<&LayoutPart> {
        self.layouts.get(id.index())
    }
}

/// Parser for template decks.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateParser;

impl TemplateParser {
    pub fn new() -> Self {
        Self
    }

    /// Read the theme and layout catalog of a template.
    ///
    /// Layouts are listed master by master in presentation order. Parts that
    /// fail to parse are skipped with a warning; only an unreadable container
    /// or presentation part is an error.
    pub fn parse<R: Read + Seek>(&self, reader: R) -> Result<TemplateDeck> {
        let mut package = Package::open(reader)?;
        let info = package.presentation()?;

        let (fonts, colors) = match info.master_parts.first() {
            Some(master) => self.read_theme(&mut package, master),
            None => {
                log::warn!("Template has no slide master, using default theme");
                (default_fonts(), AccentColors::default())
            }
        };
        let theme = ThemeMeta {
            fonts,
            colors,
            page_size: info.page_size,
        };

        let mut catalog = LayoutCatalog::new();
        let mut layouts = Vec::new();

        for master in &info.master_parts {
            let layout_parts = match self.master_layouts(&mut package, master) {
                Ok(parts) => parts,
                Err(e) => {
                    log::warn!("Skipping slide master '{}': {}", master, e);
                    continue;
                }
            };

            for part_name in layout_parts {
                let content = match package.read_part(&part_name) {
                    Ok(content) => content,
                    Err(e) => {
                        log::warn!("Skipping layout '{}': {}", part_name, e);
                        continue;
                    }
                };
                let (name, placeholders, has_table_frame) = match parse_layout(&content) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        log::warn!("Skipping layout '{}': {}", part_name, e);
                        continue;
                    }
                };

                let caps = capabilities(&placeholders, has_table_frame);
                let name = name.unwrap_or_else(|| format!("Layout {}", catalog.len() + 1));
                let layout_id = catalog.push(name, caps);
                log::debug!("{} from '{}': {:?}", layout_id, part_name, caps);

                layouts.push(LayoutPart {
                    layout_id,
                    part_name,
                    placeholders,
                });
            }
        }

        Ok(TemplateDeck {
            theme,
            catalog,
            layouts,
        })
    }

    /// Layout parts of one master, in the master's layout list order.
    fn master_layouts<R: Read + Seek>(
        &self,
        package: &mut Package<R>,
        master: &str,
    ) -> Result<Vec<String>> {
        let content = package.read_part(master)?;
        let rels = package.relationships(master)?;

        let mut ids = Vec::new();
        let mut reader = xml::reader(&content);
        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if local_name(e.name().as_ref()) == b"sldLayoutId" =>
                {
                    ids.extend(prefixed_attr(e, b"id"));
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(xml::xml_error("Error parsing slide master", e)),
                _ => {}
            }
        }

        let parts: Vec<String> = ids
            .iter()
            .filter_map(|id| rels.iter().find(|r| &r.id == id && !r.external))
            .map(|r| crate::package::resolve_target(master, &r.target))
            .collect();

        if parts.is_empty() {
            return Ok(ordered_targets(master, &rels, REL_SLIDE_LAYOUT));
        }
        Ok(parts)
    }

    fn read_theme<R: Read + Seek>(
        &self,
        package: &mut Package<R>,
        master: &str,
    ) -> (ThemeFonts, AccentColors) {
        let theme = package
            .related_part(master, REL_THEME)
            .and_then(|part| match part {
                Some(part) => package.read_part(&part).map(Some),
                None => Ok(None),
            })
            .and_then(|content| content.map(|c| parse_theme(&c)).transpose());

        match theme {
            Ok(Some(theme)) => theme,
            Ok(None) => {
                log::warn!("Slide master '{}' has no theme, using defaults", master);
                (default_fonts(), AccentColors::default())
            }
            Err(e) => {
                log::warn!("Failed to read theme of '{}': {}", master, e);
                (default_fonts(), AccentColors::default())
            }
        }
    }
}

fn default_fonts() -> ThemeFonts {
    ThemeFonts {
        title: DEFAULT_THEME_FONT.to_string(),
        body: DEFAULT_THEME_FONT.to_string(),
    }
}

/// Parse the major/minor Latin fonts and accent colors of a theme part.
pub fn parse_theme(xml_content: &str) -> Result<(ThemeFonts, AccentColors)> {
    let mut reader = xml::reader(xml_content);

    let mut major: Option<String> = None;
    let mut minor: Option<String> = None;
    let mut accents: [Option<String>; 6] = Default::default();

    let mut in_major = false;
    let mut in_minor = false;
    let mut in_color_scheme = false;
    let mut accent: Option<usize> = None;

    loop {
        let (e, is_empty) = match reader.read_event() {
            Ok(Event::Start(e)) => (e, false),
            Ok(Event::Empty(e)) => (e, true),
            Ok(Event::End(ref e)) => {
                match local_name(e.name().as_ref()) {
                    b"majorFont" => in_major = false,
                    b"minorFont" => in_minor = false,
                    b"clrScheme" => in_color_scheme = false,
                    name if accent_slot(name).is_some() => accent = None,
                    _ => {}
                }
                continue;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml::xml_error("Error parsing theme", e)),
            _ => continue,
        };

        let name = e.name();
        match local_name(name.as_ref()) {
            b"majorFont" => in_major = !is_empty,
            b"minorFont" => in_minor = !is_empty,
            b"clrScheme" => in_color_scheme = !is_empty,
            b"latin" => {
                let typeface = attr(&e, b"typeface").filter(|t| !t.is_empty());
                if in_major && major.is_none() {
                    major = typeface;
                } else if in_minor && minor.is_none() {
                    minor = typeface;
                }
            }
            b"srgbClr" | b"sysClr" => {
                let key: &[u8] = if local_name(name.as_ref()) == b"srgbClr" {
                    b"val"
                } else {
                    b"lastClr"
                };
                if let Some(slot) = accent {
                    if accents[slot].is_none() {
                        accents[slot] = attr(&e, key).map(|v| format!("#{}", v.to_uppercase()));
                    }
                }
            }
            other if in_color_scheme && !is_empty => {
                if let Some(slot) = accent_slot(other) {
                    accent = Some(slot);
                }
            }
            _ => {}
        }
    }

    let fonts = ThemeFonts {
        title: major.unwrap_or_else(|| DEFAULT_THEME_FONT.to_string()),
        body: minor.unwrap_or_else(|| DEFAULT_THEME_FONT.to_string()),
    };
    Ok((fonts, AccentColors::from_slots(accents)))
}

fn accent_slot(name: &[u8]) -> Option<usize> {
    match name {
        b"accent1" => Some(0),
        b"accent2" => Some(1),
        b"accent3" => Some(2),
        b"accent4" => Some(3),
        b"accent5" => Some(4),
        b"accent6" => Some(5),
        _ => None,
    }
}

/// Parse a layout part into its display name, placeholders, and whether it
/// carries an embedded table outside any placeholder.
pub fn parse_layout(xml_content: &str) -> Result<(Option<String>, Vec<LayoutPlaceholder>, bool)> {
    let mut name = None;
    let mut reader = xml::reader(xml_content);
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if local_name(e.name().as_ref()) == b"cSld" =>
            {
                name = attr(e, b"name").filter(|n| !n.trim().is_empty());
                break;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml::xml_error("Error parsing layout", e)),
            _ => {}
        }
    }

    let shapes = parse_shape_tree(xml_content)?;
    let has_table_frame = shapes
        .iter()
        .any(|s| s.kind == ShapeKind::GraphicFrame && s.has_table && s.placeholder.is_none());

    let placeholders = shapes
        .into_iter()
        .filter_map(|shape| {
            let slot = shape.placeholder?;
            let kind = if shape.has_table {
                PlaceholderKind::Table
            } else {
                slot.kind()
            };
            Some(LayoutPlaceholder {
                kind,
                ph_type: slot.ph_type,
                idx: slot.idx,
                name: shape.name,
            })
        })
        .collect();

    Ok((name, placeholders, has_table_frame))
}

/// Summarize placeholders into the capabilities the planner scores against.
pub fn capabilities(placeholders: &[LayoutPlaceholder], has_table_frame: bool) -> PlaceholderCaps {
    let mut caps = PlaceholderCaps {
        has_table: has_table_frame,
        ..Default::default()
    };
    for placeholder in placeholders {
        match placeholder.kind {
            PlaceholderKind::Title => caps.has_title = true,
            PlaceholderKind::Body => caps.body_slot_count += 1,
            PlaceholderKind::Picture => caps.picture_slot_count += 1,
            PlaceholderKind::Table => caps.has_table = true,
            PlaceholderKind::Other => {}
        }
    }
    caps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::DeckBuilder;
    use std::io::Cursor;

    #[test]
    fn test_parse_theme() {
        let xml = r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office">
          <a:themeElements>
            <a:clrScheme name="Custom">
              <a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1>
              <a:accent1><a:srgbClr val="1f4e79"/></a:accent1>
              <a:accent2><a:sysClr val="highlight" lastClr="FF00AA"/></a:accent2>
            </a:clrScheme>
            <a:fontScheme name="Custom">
              <a:majorFont><a:latin typeface="Georgia"/><a:ea typeface=""/></a:majorFont>
              <a:minorFont><a:latin typeface="Verdana"/></a:minorFont>
            </a:fontScheme>
          </a:themeElements>
        </a:theme>"#;

        let (fonts, colors) = parse_theme(xml).unwrap();
        assert_eq!(fonts.title, "Georgia");
        assert_eq!(fonts.body, "Verdana");
        assert_eq!(colors.accent1, "#1F4E79");
        assert_eq!(colors.accent2, "#FF00AA");
        assert_eq!(colors.accent3, "#A5A5A5");
    }

    #[test]
    fn test_parse_theme_defaults() {
        let (fonts, colors) = parse_theme("<a:theme xmlns:a=\"a\"/>").unwrap();
        assert_eq!(fonts.title, DEFAULT_THEME_FONT);
        assert_eq!(fonts.body, DEFAULT_THEME_FONT);
        assert_eq!(colors, AccentColors::default());
    }

    #[test]
    fn test_capabilities() {
        let placeholder = |kind| LayoutPlaceholder {
            kind,
            ph_type: None,
            idx: None,
            name: String::new(),
        };
        let caps = capabilities(
            &[
                placeholder(PlaceholderKind::Title),
                placeholder(PlaceholderKind::Body),
                placeholder(PlaceholderKind::Body),
                placeholder(PlaceholderKind::Picture),
                placeholder(PlaceholderKind::Other),
            ],
            false,
        );
        assert!(caps.has_title);
        assert_eq!(caps.body_slot_count, 2);
        assert_eq!(caps.picture_slot_count, 1);
        assert!(!caps.has_table);
        assert!(capabilities(&[], true).has_table);
    }

    #[test]
    fn test_parse_template_deck() {
        let bytes = DeckBuilder::new()
            .theme_fonts("Georgia", "Verdana")
            .layout("Title Slide", &[("ctrTitle", None), ("subTitle", Some(1))])
            .layout("Two Content", &[("title", None), ("body", Some(1)), ("body", Some(2))])
            .layout("", &[("title", None), ("pic", Some(1)), ("dt", Some(10))])
            .build();

        let deck = TemplateParser::new().parse(Cursor::new(bytes)).unwrap();
        assert_eq!(deck.theme.fonts.title, "Georgia");
        assert_eq!(deck.theme.page_size.w, 720.0);
        assert_eq!(deck.theme.page_size.h, 540.0);

        let names: Vec<_> = deck.catalog.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Title Slide", "Two Content", "Layout 3"]);

        let ids: Vec<_> = deck.catalog.iter().map(|l| l.layout_id.to_string()).collect();
        assert_eq!(ids, vec!["layout_0", "layout_1", "layout_2"]);

        let title_slide = deck.catalog.get(LayoutId::new(0)).unwrap();
        assert!(title_slide.placeholders.has_title);
        assert_eq!(title_slide.placeholders.body_slot_count, 0);

        let two_content = deck.catalog.get(LayoutId::new(1)).unwrap();
        assert_eq!(two_content.placeholders.body_slot_count, 2);

        let picture = deck.catalog.get(LayoutId::new(2)).unwrap();
        assert_eq!(picture.placeholders.picture_slot_count, 1);

        let part = deck.layout_part(LayoutId::new(1)).unwrap();
        assert_eq!(part.part_name, "ppt/slideLayouts/slideLayout2.xml");
        assert_eq!(part.placeholders.len(), 3);
    }

    #[test]
    fn test_rejects_non_zip() {
        assert!(TemplateParser::new()
            .parse(Cursor::new(b"not a zip".to_vec()))
            .is_err());
    }
}
