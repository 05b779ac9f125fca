//! Reading a slide deck as source content.

use crate::package::{Package, REL_SLIDE_LAYOUT, REL_SLIDE_MASTER};
use crate::shapes::{inherited_rect, parse_shape_tree, Shape, ShapeKind};
use deck_core::{
    DocumentKind, ExtractionConfig, ImageRegion, PageContent, Paragraph, Result, SourceDocument,
    TableRegion, TextBlock,
};
use std::collections::HashMap;
use std::io::{Read, Seek};

/// Reads slides of a deck into page content.
pub struct SlideReader<'a> {
    config: &'a ExtractionConfig,
}

impl<'a> SlideReader<'a> {
    pub fn new(config: &'a ExtractionConfig) -> Self {
        Self { config }
    }

    /// Read every slide in presentation order.
    ///
    /// A slide that cannot be parsed is left out of the document; its index
    /// stays reserved so later slides keep their positions.
    pub fn read<R: Read + Seek>(&self, reader: R) -> Result<SourceDocument> {
        let mut package = Package::open(reader)?;
        let info = package.presentation()?;

        let mut document = SourceDocument::new(DocumentKind::Slide, info.page_size);
        let mut shape_cache: HashMap<String, Vec<Shape>> = HashMap::new();

        for (idx, slide_part) in info.slide_parts.iter().enumerate() {
            match self.read_slide(&mut package, slide_part, &mut shape_cache) {
                Ok(content) => document.add_page(idx, content),
                Err(e) => log::warn!("Skipping slide {} ('{}'): {}", idx, slide_part, e),
            }
        }

        log::debug!(
            "Read {} of {} slides",
            document.pages.len(),
            info.slide_parts.len()
        );
        Ok(document)
    }

    fn read_slide<R: Read + Seek>(
        &self,
        package: &mut Package<R>,
        slide_part: &str,
        cache: &mut HashMap<String, Vec<Shape>>,
    ) -> Result<PageContent> {
        let content = package.read_part(slide_part)?;
        let shapes = parse_shape_tree(&content)?;

        let layout_part = package.related_part(slide_part, REL_SLIDE_LAYOUT)?;
        let master_part = match &layout_part {
            Some(layout) => package.related_part(layout, REL_SLIDE_MASTER)?,
            None => None,
        };
        let layout = cached_shapes(package, cache, layout_part.as_deref());
        let master = cached_shapes(package, cache, master_part.as_deref());

        Ok(self.lower(&shapes, &layout, &master))
    }

    /// Turn parsed shapes into page content, filling in inherited geometry.
    pub fn lower(&self, shapes: &[Shape], layout: &[Shape], master: &[Shape]) -> PageContent {
        let mut page = PageContent::new();

        for shape in shapes {
            let rect = shape.rect.or_else(|| {
                shape
                    .placeholder
                    .as_ref()
                    .and_then(|slot| inherited_rect(slot, layout, master))
            });

            match shape.kind {
                ShapeKind::Shape => {
                    let Some(paragraphs) = &shape.paragraphs else {
                        continue;
                    };
                    let Some(rect) = rect else {
                        log::debug!("Shape '{}' has no geometry, skipping", shape.name);
                        continue;
                    };

                    let mut block = TextBlock::new(rect);
                    for raw in paragraphs {
                        block = block.with_paragraph(
                            Paragraph::new(raw.text.clone())
                                .with_level(raw.level)
                                .with_bullet_markup(raw.bullet_markup),
                        );
                    }

                    let is_title = shape.placeholder.as_ref().map_or(false, |p| p.is_title());
                    match shape.font_size() {
                        Some(size) => block = block.with_font_size(size),
                        None if is_title => {
                            block = block.with_font_size(self.config.default_title_font_size)
                        }
                        None => {}
                    }
                    page.text_blocks.push(block);
                }
                ShapeKind::Picture => match rect {
                    Some(rect) => page.images.push(ImageRegion { rect }),
                    None => log::debug!("Picture '{}' has no geometry, skipping", shape.name),
                },
                ShapeKind::GraphicFrame if shape.has_table => {
                    page.tables.push(TableRegion {
                        rect: rect.unwrap_or_default(),
                    });
                }
                _ => {}
            }
        }

        page
    }
}

fn cached_shapes<R: Read + Seek>(
    package: &mut Package<R>,
    cache: &mut HashMap<String, Vec<Shape>>,
    part: Option<&str>,
) -> Vec<Shape> {
    let Some(part) = part else {
        return Vec::new();
    };
    if let Some(shapes) = cache.get(part) {
        return shapes.clone();
    }

    let shapes = package
        .read_part(part)
        .and_then(|content| parse_shape_tree(&content))
        .unwrap_or_else(|e| {
            log::debug!("No inherited geometry from '{}': {}", part, e);
            Vec::new()
        });
    cache.insert(part.to_string(), shapes.clone());
    shapes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{body_shape, picture_shape, table_frame, title_shape, DeckBuilder};
    use std::io::Cursor;

    fn deck() -> Vec<u8> {
        DeckBuilder::new()
            .layout("Title and Content", &[("title", None), ("body", Some(1))])
            .slide(
                0,
                &[
                    title_shape("Agenda", None),
                    body_shape(&[("First", 0), ("Detail", 1), ("Second", 0)], None),
                ],
            )
            .slide(
                0,
                &[
                    title_shape("Gallery", Some(3200)),
                    picture_shape(100.0, 100.0, 200.0, 150.0),
                    picture_shape(400.0, 100.0, 200.0, 150.0),
                    table_frame(50.0, 300.0, 600.0, 200.0),
                ],
            )
            .build()
    }

    #[test]
    fn test_reads_slides_in_order() {
        let config = ExtractionConfig::default();
        let document = SlideReader::new(&config).read(Cursor::new(deck())).unwrap();
        assert_eq!(document.kind, DocumentKind::Slide);
        assert_eq!(document.pages.len(), 2);
        assert_eq!(document.pages[0].idx, 0);
        assert_eq!(document.pages[1].idx, 1);
        assert_eq!(document.page_size.w, 720.0);
    }

    #[test]
    fn test_title_inherits_geometry_and_default_size() {
        let config = ExtractionConfig::default();
        let document = SlideReader::new(&config).read(Cursor::new(deck())).unwrap();
        let page = &document.pages[0].content;

        assert_eq!(page.text_blocks.len(), 2);
        let title = &page.text_blocks[0];
        assert_eq!(title.text(), "Agenda");
        assert_eq!(title.font_size, Some(44.0));
        assert!(title.rect.y < 0.2 * 540.0);

        let body = &page.text_blocks[1];
        assert_eq!(body.paragraphs.len(), 3);
        assert_eq!(body.paragraphs[1].level, 1);
        assert!(body.rect.w > 0.0);
    }

    #[test]
    fn test_pictures_and_tables() {
        let config = ExtractionConfig::default();
        let document = SlideReader::new(&config).read(Cursor::new(deck())).unwrap();
        let page = &document.pages[1].content;

        assert_eq!(page.text_blocks[0].font_size, Some(32.0));
        assert_eq!(page.images.len(), 2);
        assert_eq!(page.images[0].rect.w, 200.0);
        assert_eq!(page.tables.len(), 1);
    }

    #[test]
    fn test_broken_slide_is_skipped() {
        let bytes = DeckBuilder::new()
            .layout("Title Only", &[("title", None)])
            .slide(0, &[title_shape("Fine", None)])
            .raw_slide(0, "<p:sld><p:cSld></p:spTree></p:sld>")
            .slide(0, &[title_shape("Also fine", None)])
            .build();

        let config = ExtractionConfig::default();
        let document = SlideReader::new(&config).read(Cursor::new(bytes)).unwrap();
        let indices: Vec<_> = document.pages.iter().map(|p| p.idx).collect();
        assert_eq!(indices, vec![0, 2]);
    }
}
