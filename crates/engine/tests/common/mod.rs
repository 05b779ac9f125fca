//! Fixture documents built in memory.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const CT_NS: &str = "application/vnd.openxmlformats-officedocument.presentationml";

fn emu(points: f64) -> i64 {
    (points * 12_700.0).round() as i64
}

fn xfrm(x: f64, y: f64, w: f64, h: f64) -> String {
    format!(
        r#"<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
        emu(x),
        emu(y),
        emu(w),
        emu(h)
    )
}

fn sp_tree(shapes: &str) -> String {
    format!(
        r#"<p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:spTree></p:cSld>"#,
        shapes
    )
}

fn placeholder(id: usize, ph: &str, geometry: &str, paragraphs: &str) -> String {
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="Placeholder {}"/><p:cNvSpPr/><p:nvPr>{}</p:nvPr></p:nvSpPr><p:spPr>{}</p:spPr><p:txBody><a:bodyPr/>{}</p:txBody></p:sp>"#,
        id, id, ph, geometry, paragraphs
    )
}

fn paragraph(text: &str, level: u32, size: Option<u32>) -> String {
    let ppr = if level > 0 {
        format!(r#"<a:pPr lvl="{}"/>"#, level)
    } else {
        String::new()
    };
    let rpr = size.map(|sz| format!(r#" sz="{}""#, sz)).unwrap_or_default();
    format!(r#"<a:p>{}<a:r><a:rPr lang="en-US"{}/><a:t>{}</a:t></a:r></a:p>"#, ppr, rpr, text)
}

/// A slide title placeholder without geometry of its own.
pub fn title(text: &str) -> String {
    placeholder(2, r#"<p:ph type="title"/>"#, "", &paragraph(text, 0, None))
}

/// A first body placeholder with `(text, level)` paragraphs.
pub fn body(paragraphs: &[(&str, u32)]) -> String {
    let paragraphs: String = paragraphs
        .iter()
        .map(|(text, level)| paragraph(text, *level, Some(1800)))
        .collect();
    placeholder(3, r#"<p:ph idx="1"/>"#, "", &paragraphs)
}

/// Builds a single-master deck with the given layouts and slides.
#[derive(Default)]
pub struct Deck {
    layouts: Vec<(String, Vec<(String, Option<u32>)>)>,
    slides: Vec<(usize, String)>,
}

impl Deck {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layout from `(ph type, idx)` placeholders. Title placeholders span the
    /// top; the rest share the area below as equal columns.
    pub fn layout(mut self, name: &str, placeholders: &[(&str, Option<u32>)]) -> Self {
        let placeholders = placeholders
            .iter()
            .map(|(t, idx)| (t.to_string(), *idx))
            .collect();
        self.layouts.push((name.to_string(), placeholders));
        self
    }

    pub fn slide(mut self, layout: usize, shapes: &[String]) -> Self {
        self.slides.push((layout, shapes.concat()));
        self
    }

    fn layout_xml(name: &str, placeholders: &[(String, Option<u32>)]) -> String {
        let is_title = |t: &str| t == "title" || t == "ctrTitle";
        let columns = placeholders.iter().filter(|(t, _)| !is_title(t)).count().max(1);
        let width = 648.0 / columns as f64;
        let mut column = 0;
        let mut shapes = String::new();

        for (n, (ph_type, idx)) in placeholders.iter().enumerate() {
            let geometry = if is_title(ph_type) {
                xfrm(36.0, 20.0, 648.0, 60.0)
            } else {
                column += 1;
                xfrm(36.0 + (column - 1) as f64 * width, 100.0, width - 10.0, 380.0)
            };
            let idx = idx.map(|i| format!(r#" idx="{}""#, i)).unwrap_or_default();
            let ph = format!(r#"<p:ph type="{}"{}/>"#, ph_type, idx);
            shapes.push_str(&placeholder(n + 2, &ph, &geometry, "<a:p/>"));
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sldLayout {}>{}</p:sldLayout>"#,
            NS,
            sp_tree(&shapes).replacen("<p:cSld>", &format!(r#"<p:cSld name="{}">"#, name), 1)
        )
    }

    pub fn build(self) -> Vec<u8> {
        let mut parts: Vec<(String, String)> = Vec::new();
        let mut overrides = vec![
            ("ppt/presentation.xml".to_string(), "presentation.main+xml"),
            ("ppt/slideMasters/slideMaster1.xml".to_string(), "slideMaster+xml"),
        ];

        parts.push(("_rels/.rels".to_string(), rels(&[("rId1", "officeDocument", "ppt/presentation.xml")])));

        let mut pres_rels = vec![("rId1".to_string(), "slideMaster", "slideMasters/slideMaster1.xml".to_string())];
        let mut slide_ids = String::new();
        for i in 0..self.slides.len() {
            let rid = format!("rId{}", i + 2);
            slide_ids.push_str(&format!(r#"<p:sldId id="{}" r:id="{}"/>"#, 256 + i, rid));
            pres_rels.push((rid, "slide", format!("slides/slide{}.xml", i + 1)));
        }
        let slide_list = if slide_ids.is_empty() {
            String::new()
        } else {
            format!("<p:sldIdLst>{}</p:sldIdLst>", slide_ids)
        };
        parts.push((
            "ppt/presentation.xml".to_string(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:presentation {}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>{}<p:sldSz cx="9144000" cy="6858000"/></p:presentation>"#,
                NS, slide_list
            ),
        ));
        let pres_rels: Vec<(&str, &str, &str)> = pres_rels
            .iter()
            .map(|(id, kind, target)| (id.as_str(), *kind, target.as_str()))
            .collect();
        parts.push(("ppt/_rels/presentation.xml.rels".to_string(), rels(&pres_rels)));

        let layout_ids: String = (0..self.layouts.len())
            .map(|i| format!(r#"<p:sldLayoutId id="{}" r:id="rId{}"/>"#, 2_147_483_649u64 + i as u64, i + 1))
            .collect();
        let master_shapes = format!(
            "{}{}",
            placeholder(2, r#"<p:ph type="title"/>"#, &xfrm(36.0, 20.0, 648.0, 60.0), "<a:p/>"),
            placeholder(3, r#"<p:ph type="body" idx="1"/>"#, &xfrm(36.0, 100.0, 648.0, 380.0), "<a:p/>")
        );
        parts.push((
            "ppt/slideMasters/slideMaster1.xml".to_string(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sldMaster {}>{}<p:sldLayoutIdLst>{}</p:sldLayoutIdLst></p:sldMaster>"#,
                NS,
                sp_tree(&master_shapes),
                layout_ids
            ),
        ));
        let layout_targets: Vec<(String, String)> = (0..self.layouts.len())
            .map(|i| (format!("rId{}", i + 1), format!("../slideLayouts/slideLayout{}.xml", i + 1)))
            .collect();
        let master_rels: Vec<(&str, &str, &str)> = layout_targets
            .iter()
            .map(|(id, target)| (id.as_str(), "slideLayout", target.as_str()))
            .collect();
        parts.push(("ppt/slideMasters/_rels/slideMaster1.xml.rels".to_string(), rels(&master_rels)));

        for (i, (name, placeholders)) in self.layouts.iter().enumerate() {
            let part = format!("ppt/slideLayouts/slideLayout{}.xml", i + 1);
            overrides.push((part.clone(), "slideLayout+xml"));
            parts.push((part, Self::layout_xml(name, placeholders)));
            parts.push((
                format!("ppt/slideLayouts/_rels/slideLayout{}.xml.rels", i + 1),
                rels(&[("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")]),
            ));
        }

        for (i, (layout, shapes)) in self.slides.iter().enumerate() {
            let part = format!("ppt/slides/slide{}.xml", i + 1);
            overrides.push((part.clone(), "slide+xml"));
            parts.push((
                part,
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sld {}>{}</p:sld>"#,
                    NS,
                    sp_tree(shapes)
                ),
            ));
            let target = format!("../slideLayouts/slideLayout{}.xml", layout + 1);
            parts.push((
                format!("ppt/slides/_rels/slide{}.xml.rels", i + 1),
                rels(&[("rId1", "slideLayout", target.as_str())]),
            ));
        }

        let overrides: String = overrides
            .iter()
            .map(|(part, kind)| format!(r#"<Override PartName="/{}" ContentType="{}.{}"/>"#, part, CT_NS, kind))
            .collect();
        let content_types = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/>{}</Types>"#,
            overrides
        );

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();
        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(content_types.as_bytes()).unwrap();
        for (name, content) in parts {
            zip.start_file(name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }
}

fn rels(entries: &[(&str, &str, &str)]) -> String {
    let body: String = entries
        .iter()
        .map(|(id, kind, target)| {
            format!(r#"<Relationship Id="{}" Type="{}/{}" Target="{}"/>"#, id, REL_NS, kind, target)
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
        body
    )
}

/// Four layouts covering title-only, single body, two bodies and picture.
/// As many layouts as [`template`], with different placeholders.
pub fn other_template() -> Vec<u8> {
    Deck::new()
        .layout("Picture Only", &[("pic", Some(1))])
        .layout("Section Header", &[("title", None)])
        .layout(
            "Comparison",
            &[("title", None), ("body", Some(1)), ("body", Some(2)), ("body", Some(3))],
        )
        .layout("Blank", &[])
        .build()
}

pub fn template() -> Vec<u8> {
    Deck::new()
        .layout("Title Slide", &[("ctrTitle", None), ("subTitle", Some(1))])
        .layout("Title and Content", &[("title", None), ("body", Some(1))])
        .layout("Two Content", &[("title", None), ("body", Some(1)), ("body", Some(2))])
        .layout(
            "Picture with Caption",
            &[("title", None), ("pic", Some(1)), ("body", Some(2))],
        )
        .build()
}

/// One-page PDF with a large heading and indented lines below it.
pub fn pdf(heading: &str, lines: &[&str]) -> Vec<u8> {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 32.into()]),
        Operation::new("Td", vec![72.into(), 740.into()]),
        Operation::new("Tj", vec![Object::string_literal(heading)]),
        Operation::new("ET", vec![]),
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 14.into()]),
        Operation::new("TL", vec![18.into()]),
        Operation::new("Td", vec![72.into(), 600.into()]),
    ];
    for line in lines {
        operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}
