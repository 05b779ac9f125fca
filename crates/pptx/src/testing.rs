//! In-memory deck construction for tests.

use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

fn emu(points: f64) -> i64 {
    (points * 12_700.0).round() as i64
}

fn xfrm(prefix: &str, x: f64, y: f64, w: f64, h: f64) -> String {
    format!(
        r#"<{p}:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></{p}:xfrm>"#,
        emu(x),
        emu(y),
        emu(w),
        emu(h),
        p = prefix
    )
}

fn run(text: &str, size: Option<u32>) -> String {
    let rpr = match size {
        Some(sz) => format!(r#"<a:rPr lang="en-US" sz="{}"/>"#, sz),
        None => r#"<a:rPr lang="en-US"/>"#.to_string(),
    };
    format!("<a:r>{}<a:t>{}</a:t></a:r>", rpr, quick_xml::escape::escape(text))
}

/// Title placeholder without its own geometry.
pub fn title_shape(text: &str, size: Option<u32>) -> String {
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:p>{}</a:p></p:txBody></p:sp>"#,
        run(text, size)
    )
}

/// Body placeholder (`idx="1"`) with `(text, level)` paragraphs.
pub fn body_shape(paragraphs: &[(&str, u32)], size: Option<u32>) -> String {
    let body: String = paragraphs
        .iter()
        .map(|(text, level)| {
            let ppr = if *level > 0 {
                format!(r#"<a:pPr lvl="{}"/>"#, level)
            } else {
                String::new()
            };
            format!("<a:p>{}{}</a:p>", ppr, run(text, size))
        })
        .collect();
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="3" name="Content 2"/><p:cNvSpPr/><p:nvPr><p:ph idx="1"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/>{}</p:txBody></p:sp>"#,
        body
    )
}

/// Free text box with explicit geometry.
pub fn text_box(x: f64, y: f64, w: f64, h: f64, text: &str, size: Option<u32>) -> String {
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="10" name="TextBox"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr>{}</p:spPr><p:txBody><a:bodyPr/><a:p>{}</a:p></p:txBody></p:sp>"#,
        xfrm("a", x, y, w, h),
        run(text, size)
    )
}

pub fn picture_shape(x: f64, y: f64, w: f64, h: f64) -> String {
    format!(
        r#"<p:pic><p:nvPicPr><p:cNvPr id="20" name="Picture"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rId9"/></p:blipFill><p:spPr>{}</p:spPr></p:pic>"#,
        xfrm("a", x, y, w, h)
    )
}

pub fn table_frame(x: f64, y: f64, w: f64, h: f64) -> String {
    format!(
        r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="30" name="Table"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr>{}<a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl><a:tr h="370840"><a:tc><a:txBody><a:bodyPr/><a:p><a:r><a:t>cell</a:t></a:r></a:p></a:txBody></a:tc></a:tr></a:tbl></a:graphicData></a:graphic></p:graphicFrame>"#,
        xfrm("p", x, y, w, h)
    )
}

fn sp_tree(shapes: &str) -> String {
    format!(
        r#"<p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:spTree>"#,
        shapes
    )
}

struct LayoutSpec {
    name: String,
    placeholders: Vec<(String, Option<u32>)>,
}

/// Builds a minimal but well-formed PPTX package.
pub struct DeckBuilder {
    major_font: String,
    minor_font: String,
    layouts: Vec<LayoutSpec>,
    slides: Vec<(usize, String)>,
    notes: bool,
}

impl DeckBuilder {
    pub fn new() -> Self {
        Self {
            major_font: "Calibri Light".to_string(),
            minor_font: "Calibri".to_string(),
            layouts: Vec::new(),
            slides: Vec::new(),
            notes: false,
        }
    }

    pub fn theme_fonts(mut self, major: &str, minor: &str) -> Self {
        self.major_font = major.to_string();
        self.minor_font = minor.to_string();
        self
    }

    /// Add a layout with `(ph type, idx)` placeholders.
    pub fn layout(mut self, name: &str, placeholders: &[(&str, Option<u32>)]) -> Self {
        self.layouts.push(LayoutSpec {
            name: name.to_string(),
            placeholders: placeholders
                .iter()
                .map(|(t, idx)| (t.to_string(), *idx))
                .collect(),
        });
        self
    }

    /// Add a slide on the given layout from shape snippets.
    pub fn slide(mut self, layout: usize, shapes: &[String]) -> Self {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sld {}><p:cSld>{}</p:cSld></p:sld>"#,
            NS,
            sp_tree(&shapes.concat())
        );
        self.slides.push((layout, xml));
        self
    }

    /// Add a slide with verbatim part content.
    pub fn raw_slide(mut self, layout: usize, xml: &str) -> Self {
        self.slides.push((layout, xml.to_string()));
        self
    }

    /// Give every slide a notes slide.
    pub fn with_notes(mut self) -> Self {
        self.notes = true;
        self
    }

    fn layout_xml(layout: &LayoutSpec) -> String {
        let count = layout.placeholders.iter().filter(|(t, _)| !is_title(t)).count().max(1);
        let width = 648.0 / count as f64;
        let mut column = 0usize;
        let mut shapes = String::new();

        for (n, (ph_type, idx)) in layout.placeholders.iter().enumerate() {
            let geometry = if is_title(ph_type) {
                xfrm("a", 36.0, 20.0, 648.0, 60.0)
            } else {
                let x = 36.0 + column as f64 * width;
                column += 1;
                xfrm("a", x, 100.0, width - 10.0, 380.0)
            };
            let idx_attr = idx.map(|i| format!(r#" idx="{}""#, i)).unwrap_or_default();
            shapes.push_str(&format!(
                r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="{} {}"/><p:cNvSpPr/><p:nvPr><p:ph type="{}"{}/></p:nvPr></p:nvSpPr><p:spPr>{}</p:spPr><p:txBody><a:bodyPr/><a:p/></p:txBody></p:sp>"#,
                n + 2,
                ph_type,
                n + 1,
                ph_type,
                idx_attr,
                geometry
            ));
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sldLayout {}><p:cSld name="{}">{}</p:cSld></p:sldLayout>"#,
            NS,
            layout.name,
            sp_tree(&shapes)
        )
    }

    fn master_xml(&self) -> String {
        let ids: String = (0..self.layouts.len())
            .map(|i| format!(r#"<p:sldLayoutId id="{}" r:id="rId{}"/>"#, 2_147_483_649u64 + i as u64, i + 1))
            .collect();
        let shapes = format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title Placeholder 1"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr>{}</p:spPr></p:sp><p:sp><p:nvSpPr><p:cNvPr id="3" name="Text Placeholder 2"/><p:cNvSpPr/><p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr><p:spPr>{}</p:spPr></p:sp>"#,
            xfrm("a", 36.0, 20.0, 648.0, 60.0),
            xfrm("a", 36.0, 100.0, 648.0, 380.0)
        );
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sldMaster {}><p:cSld>{}</p:cSld><p:sldLayoutIdLst>{}</p:sldLayoutIdLst></p:sldMaster>"#,
            NS,
            sp_tree(&shapes),
            ids
        )
    }

    fn theme_xml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Test"><a:themeElements><a:clrScheme name="Test"><a:accent1><a:srgbClr val="112233"/></a:accent1></a:clrScheme><a:fontScheme name="Test"><a:majorFont><a:latin typeface="{}"/></a:majorFont><a:minorFont><a:latin typeface="{}"/></a:minorFont></a:fontScheme></a:themeElements></a:theme>"#,
            self.major_font, self.minor_font
        )
    }

    pub fn build(self) -> Vec<u8> {
        let mut parts: Vec<(String, String)> = Vec::new();
        let mut overrides = String::new();
        let mut add_override = |part: &str, content_type: &str| {
            overrides.push_str(&format!(
                r#"<Override PartName="/{}" ContentType="application/vnd.openxmlformats-officedocument.{}"/>"#,
                part, content_type
            ));
        };

        add_override("ppt/presentation.xml", "presentationml.presentation.main+xml");
        add_override("ppt/slideMasters/slideMaster1.xml", "presentationml.slideMaster+xml");
        add_override("ppt/theme/theme1.xml", "theme+xml");

        parts.push((
            "_rels/.rels".to_string(),
            rels(&[(1, "officeDocument", "ppt/presentation.xml")]),
        ));

        let mut pres_rels = vec![(1, "slideMaster".to_string(), "slideMasters/slideMaster1.xml".to_string())];
        let mut slide_ids = String::new();
        for (i, _) in self.slides.iter().enumerate() {
            let rid = i + 2;
            pres_rels.push((rid, "slide".to_string(), format!("slides/slide{}.xml", i + 1)));
            slide_ids.push_str(&format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, rid));
        }
        let theme_rid = self.slides.len() + 2;
        pres_rels.push((theme_rid, "theme".to_string(), "theme/theme1.xml".to_string()));

        let slide_list = if slide_ids.is_empty() {
            String::new()
        } else {
            format!("<p:sldIdLst>{}</p:sldIdLst>", slide_ids)
        };
        parts.push((
            "ppt/presentation.xml".to_string(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:presentation {}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>{}<p:sldSz cx="9144000" cy="6858000"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#,
                NS, slide_list
            ),
        ));
        let pres_rels: Vec<(usize, &str, &str)> = pres_rels
            .iter()
            .map(|(id, kind, target)| (*id, kind.as_str(), target.as_str()))
            .collect();
        parts.push(("ppt/_rels/presentation.xml.rels".to_string(), rels(&pres_rels)));

        parts.push(("ppt/slideMasters/slideMaster1.xml".to_string(), self.master_xml()));
        let mut master_rels: Vec<(usize, String, String)> = self
            .layouts
            .iter()
            .enumerate()
            .map(|(i, _)| (i + 1, "slideLayout".to_string(), format!("../slideLayouts/slideLayout{}.xml", i + 1)))
            .collect();
        master_rels.push((self.layouts.len() + 1, "theme".to_string(), "../theme/theme1.xml".to_string()));
        let master_rels: Vec<(usize, &str, &str)> = master_rels
            .iter()
            .map(|(id, kind, target)| (*id, kind.as_str(), target.as_str()))
            .collect();
        parts.push(("ppt/slideMasters/_rels/slideMaster1.xml.rels".to_string(), rels(&master_rels)));
        parts.push(("ppt/theme/theme1.xml".to_string(), self.theme_xml()));

        for (i, layout) in self.layouts.iter().enumerate() {
            let part = format!("ppt/slideLayouts/slideLayout{}.xml", i + 1);
            add_override(&part, "presentationml.slideLayout+xml");
            parts.push((part, Self::layout_xml(layout)));
            parts.push((
                format!("ppt/slideLayouts/_rels/slideLayout{}.xml.rels", i + 1),
                rels(&[(1, "slideMaster", "../slideMasters/slideMaster1.xml")]),
            ));
        }

        for (i, (layout, xml)) in self.slides.iter().enumerate() {
            let part = format!("ppt/slides/slide{}.xml", i + 1);
            add_override(&part, "presentationml.slide+xml");
            parts.push((part, xml.clone()));

            let layout_target = format!("../slideLayouts/slideLayout{}.xml", layout + 1);
            let notes_target = format!("../notesSlides/notesSlide{}.xml", i + 1);
            let mut slide_rels = vec![(1, "slideLayout", layout_target.as_str())];
            if self.notes {
                slide_rels.push((2, "notesSlide", notes_target.as_str()));
                let notes_part = format!("ppt/notesSlides/notesSlide{}.xml", i + 1);
                add_override(&notes_part, "presentationml.notesSlide+xml");
                parts.push((
                    notes_part,
                    format!(
                        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:notes {}><p:cSld>{}</p:cSld></p:notes>"#,
                        NS,
                        sp_tree("")
                    ),
                ));
            }
            parts.push((format!("ppt/slides/_rels/slide{}.xml.rels", i + 1), rels(&slide_rels)));
        }

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

fn is_title(ph_type: &str) -> bool {
    matches!(ph_type, "title" | "ctrTitle")
}

fn rels(entries: &[(usize, &str, &str)]) -> String {
    let body: String = entries
        .iter()
        .map(|(id, kind, target)| {
            format!(
                r#"<Relationship Id="rId{}" Type="{}/{}" Target="{}"/>"#,
                id, REL_NS, kind, target
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{}">{}</Relationships>"#,
        PKG_REL_NS, body
    )
}
