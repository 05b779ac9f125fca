//! Shape tree parsing shared by slides, layouts and masters.

use crate::xml::{self, attr, attr_i64, attr_u32, local_name, EMU_PER_POINT};
use deck_core::{Rect, Result};
use quick_xml::events::{BytesStart, Event};

/// What a placeholder is for, as far as layout matching cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceholderKind {
    Title,
    Body,
    Picture,
    Table,
    /// Date, footer, slide number and anything else not used for content.
    Other,
}

impl PlaceholderKind {
    /// Classify a `p:ph` type attribute; a missing type means body.
    pub fn from_type(ph_type: Option<&str>) -> Self {
        match ph_type {
            None | Some("body") | Some("obj") => Self::Body,
            Some("title") | Some("ctrTitle") => Self::Title,
            Some("pic") => Self::Picture,
            Some("tbl") => Self::Table,
            Some(_) => Self::Other,
        }
    }
}

/// The `p:ph` element of a shape.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlaceholderSlot {
    pub ph_type: Option<String>,
    pub idx: Option<u32>,
}

impl PlaceholderSlot {
    pub fn kind(&self) -> PlaceholderKind {
        PlaceholderKind::from_type(self.ph_type.as_deref())
    }

    pub fn is_title(&self) -> bool {
        self.kind() == PlaceholderKind::Title
    }

    /// Type used to find the matching placeholder on a slide master.
    fn master_type(&self) -> &str {
        match self.ph_type.as_deref() {
            Some("title") | Some("ctrTitle") => "title",
            None | Some("body") | Some("obj") | Some("subTitle") => "body",
            Some(other) => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Shape,
    Picture,
    GraphicFrame,
    Connector,
}

/// A paragraph as written in the part, before lowering.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawParagraph {
    pub text: String,
    pub level: u32,
    pub bullet_markup: bool,
    /// Largest explicit run size, in points.
    pub font_size: Option<f64>,
}

/// One shape of a shape tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub kind: ShapeKind,
    pub name: String,
    pub placeholder: Option<PlaceholderSlot>,
    /// Own geometry in points, when the shape declares it.
    pub rect: Option<Rect>,
    /// Paragraphs of the text body; `None` when the shape has no text frame.
    pub paragraphs: Option<Vec<RawParagraph>>,
    pub has_table: bool,
    offset: Option<(i64, i64)>,
    extent: Option<(i64, i64)>,
}

impl Shape {
    fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            name: String::new(),
            placeholder: None,
            rect: None,
            paragraphs: None,
            has_table: false,
            offset: None,
            extent: None,
        }
    }

    /// Resolve the shape's geometry into slide space through its enclosing
    /// groups, outermost first in `groups`.
    fn finish(mut self, groups: &[GroupTransform]) -> Self {
        if let (Some((x, y)), Some((cx, cy))) = (self.offset, self.extent) {
            let (x, y, w, h) = groups
                .iter()
                .rev()
                .fold((x as f64, y as f64, cx as f64, cy as f64), |frame, group| group.apply(frame));
            self.rect = Some(Rect::new(
                x / EMU_PER_POINT,
                y / EMU_PER_POINT,
                w / EMU_PER_POINT,
                h / EMU_PER_POINT,
            ));
        }
        self
    }

    /// Largest explicit font size across all paragraphs.
    pub fn font_size(&self) -> Option<f64> {
        self.paragraphs
            .iter()
            .flatten()
            .filter_map(|p| p.font_size)
            .fold(None, |max, size| Some(max.map_or(size, |m: f64| m.max(size))))
    }
}

/// Placement of a group's child coordinate space within its parent, in EMU.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct GroupTransform {
    off: (f64, f64),
    ext: (f64, f64),
    ch_off: (f64, f64),
    ch_ext: (f64, f64),
}

impl GroupTransform {
    fn set(&mut self, local: &[u8], e: &BytesStart) {
        let pair = |a: &[u8], b: &[u8]| {
            (
                attr_i64(e, a).unwrap_or(0) as f64,
                attr_i64(e, b).unwrap_or(0) as f64,
            )
        };
        match local {
            b"off" => self.off = pair(b"x", b"y"),
            b"ext" => self.ext = pair(b"cx", b"cy"),
            b"chOff" => self.ch_off = pair(b"x", b"y"),
            b"chExt" => self.ch_ext = pair(b"cx", b"cy"),
            _ => {}
        }
    }

    /// Map a child-space frame into the parent space. A degenerate child
    /// extent leaves that axis unscaled.
    fn apply(&self, (x, y, w, h): (f64, f64, f64, f64)) -> (f64, f64, f64, f64) {
        let scale = |ext: f64, ch_ext: f64| if ch_ext > 0.0 { ext / ch_ext } else { 1.0 };
        let sx = scale(self.ext.0, self.ch_ext.0);
        let sy = scale(self.ext.1, self.ch_ext.1);
        (
            self.off.0 + (x - self.ch_off.0) * sx,
            self.off.1 + (y - self.ch_off.1) * sy,
            w * sx,
            h * sy,
        )
    }
}

fn shape_kind(name: &[u8]) -> Option<ShapeKind> {
    match name {
        b"sp" => Some(ShapeKind::Shape),
        b"pic" => Some(ShapeKind::Picture),
        b"graphicFrame" => Some(ShapeKind::GraphicFrame),
        b"cxnSp" => Some(ShapeKind::Connector),
        _ => None,
    }
}

#[derive(Default)]
struct TreeState {
    current: Option<Shape>,
    in_xfrm: bool,
    in_text_body: bool,
    in_text: bool,
}

impl TreeState {
    fn paragraph(&mut self) -> Option<&mut RawParagraph> {
        if !self.in_text_body {
            return None;
        }
        self.current
            .as_mut()
            .and_then(|s| s.paragraphs.as_mut())
            .and_then(|p| p.last_mut())
    }

    fn element(&mut self, e: &BytesStart, is_empty: bool) {
        let name = e.name();
        let local = local_name(name.as_ref());

        let Some(shape) = self.current.as_mut() else {
            return;
        };

        match local {
            b"cNvPr" if shape.name.is_empty() => {
                shape.name = attr(e, b"name").unwrap_or_default();
            }
            b"ph" => {
                shape.placeholder = Some(PlaceholderSlot {
                    ph_type: attr(e, b"type"),
                    idx: attr_u32(e, b"idx"),
                });
            }
            b"xfrm" if !is_empty => self.in_xfrm = true,
            b"off" if self.in_xfrm && shape.offset.is_none() => {
                shape.offset = Some((attr_i64(e, b"x").unwrap_or(0), attr_i64(e, b"y").unwrap_or(0)));
            }
            b"ext" if self.in_xfrm && shape.extent.is_none() => {
                shape.extent = Some((attr_i64(e, b"cx").unwrap_or(0), attr_i64(e, b"cy").unwrap_or(0)));
            }
            b"tbl" => shape.has_table = true,
            b"txBody" if shape.kind == ShapeKind::Shape => {
                shape.paragraphs = Some(Vec::new());
                self.in_text_body = !is_empty;
            }
            b"p" if self.in_text_body => {
                if let Some(paragraphs) = shape.paragraphs.as_mut() {
                    paragraphs.push(RawParagraph::default());
                }
            }
            b"pPr" => {
                let level = attr_u32(e, b"lvl");
                if let (Some(level), Some(p)) = (level, self.paragraph()) {
                    p.level = level;
                }
            }
            b"buChar" => {
                if let Some(p) = self.paragraph() {
                    p.bullet_markup = true;
                }
            }
            b"rPr" => {
                let size = attr_i64(e, b"sz").map(|sz| sz as f64 / 100.0);
                if let (Some(size), Some(p)) = (size, self.paragraph()) {
                    p.font_size = Some(p.font_size.map_or(size, |s| s.max(size)));
                }
            }
            b"br" => {
                if let Some(p) = self.paragraph() {
                    p.text.push('\n');
                }
            }
            b"t" if !is_empty && self.in_text_body => self.in_text = true,
            _ => {}
        }
    }
}

/// Parse every shape of a part's shape tree, flattening groups.
///
/// Group transforms are composed into the geometry of their children.
/// `mc:Fallback` branches are skipped so alternate content is not counted twice.
pub fn parse_shape_tree(xml_content: &str) -> Result<Vec<Shape>> {
    let mut reader = xml::reader(xml_content);
    let mut shapes = Vec::new();
    let mut state = TreeState::default();
    let mut fallback_depth = 0usize;
    let mut groups: Vec<GroupTransform> = Vec::new();
    let mut in_group_props = false;
    let mut in_group_xfrm = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                if local == b"Fallback" {
                    fallback_depth += 1;
                }
                if fallback_depth > 0 {
                    continue;
                }
                if local == b"grpSp" {
                    groups.push(GroupTransform::default());
                } else if let Some(kind) = shape_kind(local) {
                    state = TreeState {
                        current: Some(Shape::new(kind)),
                        ..Default::default()
                    };
                } else if state.current.is_none() {
                    match local {
                        b"grpSpPr" => in_group_props = true,
                        b"xfrm" if in_group_props => in_group_xfrm = true,
                        _ => {}
                    }
                } else {
                    state.element(e, false);
                }
            }
            Ok(Event::Empty(ref e)) => {
                if fallback_depth > 0 {
                    continue;
                }
                if state.current.is_none() {
                    if in_group_xfrm {
                        if let Some(group) = groups.last_mut() {
                            group.set(local_name(e.name().as_ref()), e);
                        }
                    }
                } else {
                    state.element(e, true);
                }
            }
            Ok(Event::End(ref e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                if local == b"Fallback" {
                    fallback_depth = fallback_depth.saturating_sub(1);
                    continue;
                }
                if fallback_depth > 0 {
                    continue;
                }
                match local {
                    b"xfrm" => {
                        state.in_xfrm = false;
                        in_group_xfrm = false;
                    }
                    b"grpSpPr" => in_group_props = false,
                    b"grpSp" => {
                        groups.pop();
                    }
                    b"txBody" => state.in_text_body = false,
                    b"t" => state.in_text = false,
                    other if shape_kind(other).is_some() => {
                        if let Some(shape) = state.current.take() {
                            shapes.push(shape.finish(&groups));
                        }
                        state = TreeState::default();
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(ref e)) if state.in_text && fallback_depth == 0 => {
                let text = e
                    .unescape()
                    .map_err(|e| xml::xml_error("Error decoding text", e))?;
                if let Some(p) = state.paragraph() {
                    p.text.push_str(&text);
                }
            }
            Ok(Event::CData(ref e)) if state.in_text && fallback_depth == 0 => {
                let text = String::from_utf8_lossy(e).into_owned();
                if let Some(p) = state.paragraph() {
                    p.text.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml::xml_error("Error parsing shape tree", e)),
            _ => {}
        }
    }

    Ok(shapes)
}

/// Geometry a placeholder inherits when it declares none of its own.
///
/// Layout placeholders are matched by `idx` first and type second; master
/// placeholders by type only.
pub fn inherited_rect(slot: &PlaceholderSlot, layout: &[Shape], master: &[Shape]) -> Option<Rect> {
    let idx = slot.idx.unwrap_or(0);
    let by_idx = layout.iter().find(|s| {
        s.placeholder
            .as_ref()
            .map_or(false, |p| p.idx.unwrap_or(0) == idx && p.master_type() == slot.master_type())
    });
    let layout_match = by_idx.or_else(|| {
        layout.iter().find(|s| {
            s.placeholder
                .as_ref()
                .map_or(false, |p| p.master_type() == slot.master_type())
        })
    });

    if let Some(rect) = layout_match.and_then(|s| s.rect) {
        return Some(rect);
    }

    let wanted = layout_match
        .and_then(|s| s.placeholder.as_ref())
        .unwrap_or(slot)
        .master_type();
    master
        .iter()
        .find(|s| s.placeholder.as_ref().map_or(false, |p| p.master_type() == wanted))
        .and_then(|s| s.rect)
}
