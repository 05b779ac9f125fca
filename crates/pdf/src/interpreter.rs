//! Content stream interpretation.
//!
//! A small PDF graphics state machine that turns page operators into
//! positioned text blocks, image regions and a table region. It tracks:
//!
//! | Operators | Effect |
//! |-----------|--------|
//! | `q` `Q` `cm` | CTM stack |
//! | `BT` `ET` | one text block per text object |
//! | `Tf` `TL` `Tz` `Ts` `Td` `TD` `Tm` `T*` | text state and position |
//! | `Tj` `TJ` `'` `"` | shown text, split into lines on baseline changes |
//! | `Do` `BI` | image regions from the unit square |
//! | `m` `l` `re` `h` and painting | ruling lines for the table heuristic |

use crate::text::{decode_pdf_string, normalize_text};
use deck_core::{
    ExtractionConfig, ImageRegion, PageContent, PageSize, Paragraph, Rect, TableRegion, TextBlock,
};
use lopdf::content::Operation;
use lopdf::Object;

pub type Matrix = [f64; 6];

pub const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Baselines closer than this belong to the same line.
const LINE_TOLERANCE: f64 = 1.0;

/// Estimated glyph advance as a fraction of the font size.
const GLYPH_WIDTH_EM: f64 = 0.5;

/// Maximum thickness of a stroke or filled rectangle that counts as a ruling.
const RULE_THICKNESS: f64 = 2.0;

const MIN_RULE_LENGTH: f64 = 10.0;

/// Distinct horizontal and vertical ruling positions needed to call a grid a table.
const MIN_RULINGS: usize = 3;

/// `a × b` in PDF's row-vector convention.
pub fn multiply(a: &Matrix, b: &Matrix) -> Matrix {
    [
        a[0] * b[0] + a[1] * b[2],
        a[0] * b[1] + a[1] * b[3],
        a[2] * b[0] + a[3] * b[2],
        a[2] * b[1] + a[3] * b[3],
        a[4] * b[0] + a[5] * b[2] + b[4],
        a[4] * b[1] + a[5] * b[3] + b[5],
    ]
}

pub fn transform(m: &Matrix, x: f64, y: f64) -> (f64, f64) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

fn translation(tx: f64, ty: f64) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

pub(crate) fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

fn numbers(operands: &[Object]) -> Vec<f64> {
    operands.iter().filter_map(number).collect()
}

fn matrix(operands: &[Object]) -> Option<Matrix> {
    let values = numbers(operands);
    if values.len() < 6 {
        return None;
    }
    Some([values[0], values[1], values[2], values[3], values[4], values[5]])
}

/// The visible area of a page in PDF user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFrame {
    pub x0: f64,
    pub y0: f64,
    pub width: f64,
    pub height: f64,
}

impl PageFrame {
    /// Frame from a `[x0 y0 x1 y1]` media box.
    pub fn from_media_box(media_box: [f64; 4]) -> Self {
        let [x0, y0, x1, y1] = media_box;
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            width: (x1 - x0).abs(),
            height: (y1 - y0).abs(),
        }
    }

    pub fn size(&self) -> PageSize {
        PageSize::new(self.width, self.height)
    }

    /// Convert a user-space box (bottom-left origin) to a top-left rectangle.
    pub fn to_rect(&self, x0: f64, y0: f64, x1: f64, y1: f64) -> Rect {
        Rect::from_corners(
            x0 - self.x0,
            self.height - (y0 - self.y0),
            x1 - self.x0,
            self.height - (y1 - self.y0),
        )
    }
}

impl Default for PageFrame {
    /// US Letter.
    fn default() -> Self {
        Self::from_media_box([0.0, 0.0, 612.0, 792.0])
    }
}

#[derive(Debug, Clone)]
struct Line {
    x: f64,
    y: f64,
    end_x: f64,
    size: f64,
    text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy)]
struct Ruling {
    axis: Axis,
    /// y of a horizontal ruling, x of a vertical one.
    position: f64,
    start: f64,
    end: f64,
}

#[derive(Debug, Clone, Copy)]
enum PathItem {
    Segment { from: (f64, f64), to: (f64, f64) },
    Rect { x0: f64, y0: f64, x1: f64, y1: f64 },
}

fn ruling(from: (f64, f64), to: (f64, f64)) -> Option<Ruling> {
    let dx = (to.0 - from.0).abs();
    let dy = (to.1 - from.1).abs();
    if dy <= RULE_THICKNESS && dx >= MIN_RULE_LENGTH {
        Some(Ruling {
            axis: Axis::Horizontal,
            position: (from.1 + to.1) / 2.0,
            start: from.0.min(to.0),
            end: from.0.max(to.0),
        })
    } else if dx <= RULE_THICKNESS && dy >= MIN_RULE_LENGTH {
        Some(Ruling {
            axis: Axis::Vertical,
            position: (from.0 + to.0) / 2.0,
            start: from.1.min(to.1),
            end: from.1.max(to.1),
        })
    } else {
        None
    }
}

/// Number of clusters among `positions` separated by more than a rule's thickness.
fn distinct_positions(mut positions: Vec<f64>) -> usize {
    positions.sort_by(|a, b| a.total_cmp(b));
    let mut count = 0;
    let mut last: Option<f64> = None;
    for p in positions {
        if last.map_or(true, |l| p - l > RULE_THICKNESS) {
            count += 1;
        }
        last = Some(p);
    }
    count
}

/// Interprets the operators of one page.
pub struct ContentInterpreter<'a> {
    config: &'a ExtractionConfig,
    frame: PageFrame,
    ctm: Matrix,
    stack: Vec<Matrix>,

    tm: Matrix,
    tlm: Matrix,
    font_size: f64,
    leading: f64,
    horizontal_scale: f64,
    rise: f64,
    lines: Option<Vec<Line>>,

    path: Vec<PathItem>,
    current_point: Option<(f64, f64)>,
    subpath_start: Option<(f64, f64)>,
    rulings: Vec<Ruling>,

    page: PageContent,
}

impl<'a> ContentInterpreter<'a> {
    pub fn new(config: &'a ExtractionConfig, frame: PageFrame) -> Self {
        Self {
            config,
            frame,
            ctm: IDENTITY,
            stack: Vec::new(),
            tm: IDENTITY,
            tlm: IDENTITY,
            font_size: 0.0,
            leading: 0.0,
            horizontal_scale: 1.0,
            rise: 0.0,
            lines: None,
            path: Vec::new(),
            current_point: None,
            subpath_start: None,
            rulings: Vec::new(),
            page: PageContent::new(),
        }
    }

    /// Run all operations and return what the page shows.
    pub fn run(mut self, operations: &[Operation]) -> PageContent {
        for op in operations {
            self.apply(op);
        }
        self.end_text();
        self.detect_table();
        self.page
    }

    fn apply(&mut self, op: &Operation) {
        let operands = &op.operands;
        match op.operator.as_str() {
            "q" => self.stack.push(self.ctm),
            "Q" => {
                if let Some(ctm) = self.stack.pop() {
                    self.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(m) = matrix(operands) {
                    self.ctm = multiply(&m, &self.ctm);
                }
            }

            "BT" => {
                self.tm = IDENTITY;
                self.tlm = IDENTITY;
                self.lines = Some(Vec::new());
            }
            "ET" => self.end_text(),
            "Tf" => {
                if let Some(size) = operands.get(1).and_then(number) {
                    self.font_size = size;
                }
            }
            "TL" => {
                if let Some(leading) = operands.first().and_then(number) {
                    self.leading = leading;
                }
            }
            "Tz" => {
                if let Some(scale) = operands.first().and_then(number) {
                    self.horizontal_scale = scale / 100.0;
                }
            }
            "Ts" => {
                if let Some(rise) = operands.first().and_then(number) {
                    self.rise = rise;
                }
            }
            "Td" => {
                if let [tx, ty, ..] = numbers(operands)[..] {
                    self.next_line(tx, ty);
                }
            }
            "TD" => {
                if let [tx, ty, ..] = numbers(operands)[..] {
                    self.leading = -ty;
                    self.next_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = matrix(operands) {
                    self.tm = m;
                    self.tlm = m;
                }
            }
            "T*" => self.next_line(0.0, -self.leading),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(bytes);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    for item in items {
                        match item {
                            Object::String(bytes, _) => self.show(bytes),
                            other => {
                                if let Some(adjust) = number(other) {
                                    let tx = -adjust / 1000.0 * self.font_size * self.horizontal_scale;
                                    self.tm = multiply(&translation(tx, 0.0), &self.tm);
                                }
                            }
                        }
                    }
                }
            }
            "'" => {
                self.next_line(0.0, -self.leading);
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(bytes);
                }
            }
            "\"" => {
                self.next_line(0.0, -self.leading);
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    self.show(bytes);
                }
            }

            "Do" | "BI" => self.image(),

            "m" => {
                if let [x, y, ..] = numbers(operands)[..] {
                    let p = transform(&self.ctm, x, y);
                    self.current_point = Some(p);
                    self.subpath_start = Some(p);
                }
            }
            "l" => {
                if let [x, y, ..] = numbers(operands)[..] {
                    let p = transform(&self.ctm, x, y);
                    if let Some(from) = self.current_point {
                        self.path.push(PathItem::Segment { from, to: p });
                    }
                    self.current_point = Some(p);
                }
            }
            "re" => {
                if let [x, y, w, h, ..] = numbers(operands)[..] {
                    let corners = [
                        transform(&self.ctm, x, y),
                        transform(&self.ctm, x + w, y),
                        transform(&self.ctm, x, y + h),
                        transform(&self.ctm, x + w, y + h),
                    ];
                    let (x0, x1) = min_max(corners.iter().map(|c| c.0));
                    let (y0, y1) = min_max(corners.iter().map(|c| c.1));
                    self.path.push(PathItem::Rect { x0, y0, x1, y1 });
                    self.current_point = Some(corners[0]);
                    self.subpath_start = Some(corners[0]);
                }
            }
            "h" => self.close_subpath(),
            "s" | "b" | "b*" => {
                self.close_subpath();
                self.paint(true);
            }
            "S" | "B" | "B*" => self.paint(true),
            "f" | "F" | "f*" => self.paint(false),
            "n" => self.clear_path(),
            _ => {}
        }
    }

    fn next_line(&mut self, tx: f64, ty: f64) {
        self.tlm = multiply(&translation(tx, ty), &self.tlm);
        self.tm = self.tlm;
    }

    fn show(&mut self, bytes: &[u8]) {
        let text = decode_pdf_string(bytes);
        let glyphs = text.chars().count() as f64;
        let advance = glyphs * GLYPH_WIDTH_EM * self.font_size * self.horizontal_scale;

        let trm = multiply(&self.tm, &self.ctm);
        let (x, y) = transform(&trm, 0.0, self.rise);
        let (end_x, _) = transform(&trm, advance, self.rise);
        let size = self.font_size * trm[2].hypot(trm[3]);
        self.tm = multiply(&translation(advance, 0.0), &self.tm);

        if text.trim().is_empty() {
            return;
        }

        let lines = self.lines.get_or_insert_with(Vec::new);
        match lines.last_mut() {
            Some(line) if (line.y - y).abs() <= LINE_TOLERANCE => {
                let gap = x - line.end_x;
                if gap > 0.2 * size && !line.text.ends_with(' ') && !text.starts_with(' ') {
                    line.text.push(' ');
                }
                line.text.push_str(&text);
                line.x = line.x.min(x);
                line.end_x = line.end_x.max(end_x);
                line.size = line.size.max(size);
            }
            _ => lines.push(Line {
                x: x.min(end_x),
                y,
                end_x: x.max(end_x),
                size,
                text,
            }),
        }
    }

    fn end_text(&mut self) {
        let Some(lines) = self.lines.take() else {
            return;
        };

        let lines: Vec<(Line, String)> = lines
            .into_iter()
            .filter_map(|line| {
                let text = normalize_text(&line.text);
                (!text.is_empty()).then_some((line, text))
            })
            .collect();
        if lines.is_empty() {
            return;
        }

        let (left, right) = min_max(lines.iter().flat_map(|(l, _)| [l.x, l.end_x]));
        let (bottom, _) = min_max(lines.iter().map(|(l, _)| l.y - 0.25 * l.size));
        let (_, top) = min_max(lines.iter().map(|(l, _)| l.y + l.size));
        let size = lines.iter().map(|(l, _)| l.size).fold(0.0, f64::max);

        let mut block = TextBlock::new(self.frame.to_rect(left, bottom, right, top));
        for (line, text) in lines {
            let level = u32::from(line.x - left > self.config.pdf_indent_threshold);
            block = block.with_paragraph(Paragraph::new(text).with_level(level));
        }
        if size > 0.0 {
            block = block.with_font_size(size);
        }
        self.page.text_blocks.push(block);
    }

    fn image(&mut self) {
        let corners = [
            transform(&self.ctm, 0.0, 0.0),
            transform(&self.ctm, 1.0, 0.0),
            transform(&self.ctm, 0.0, 1.0),
            transform(&self.ctm, 1.0, 1.0),
        ];
        let (x0, x1) = min_max(corners.iter().map(|c| c.0));
        let (y0, y1) = min_max(corners.iter().map(|c| c.1));
        self.page.images.push(ImageRegion {
            rect: self.frame.to_rect(x0, y0, x1, y1),
        });
    }

    fn close_subpath(&mut self) {
        if let (Some(from), Some(to)) = (self.current_point, self.subpath_start) {
            if from != to {
                self.path.push(PathItem::Segment { from, to });
            }
            self.current_point = Some(to);
        }
    }

    fn paint(&mut self, stroke: bool) {
        for item in std::mem::take(&mut self.path) {
            match item {
                PathItem::Segment { from, to } if stroke => self.rulings.extend(ruling(from, to)),
                PathItem::Segment { .. } => {}
                PathItem::Rect { x0, y0, x1, y1 } => {
                    let thin = (y1 - y0) <= RULE_THICKNESS || (x1 - x0) <= RULE_THICKNESS;
                    if thin {
                        let (mx, my) = ((x0 + x1) / 2.0, (y0 + y1) / 2.0);
                        let centre_line = if (y1 - y0) <= RULE_THICKNESS {
                            ruling((x0, my), (x1, my))
                        } else {
                            ruling((mx, y0), (mx, y1))
                        };
                        self.rulings.extend(centre_line);
                    } else if stroke {
                        for (from, to) in [
                            ((x0, y0), (x1, y0)),
                            ((x0, y1), (x1, y1)),
                            ((x0, y0), (x0, y1)),
                            ((x1, y0), (x1, y1)),
                        ] {
                            self.rulings.extend(ruling(from, to));
                        }
                    }
                }
            }
        }
        self.current_point = None;
        self.subpath_start = None;
    }

    fn clear_path(&mut self) {
        self.path.clear();
        self.current_point = None;
        self.subpath_start = None;
    }

    fn detect_table(&mut self) {
        let horizontal: Vec<&Ruling> = self.rulings.iter().filter(|r| r.axis == Axis::Horizontal).collect();
        let vertical: Vec<&Ruling> = self.rulings.iter().filter(|r| r.axis == Axis::Vertical).collect();

        let rows = distinct_positions(horizontal.iter().map(|r| r.position).collect());
        let columns = distinct_positions(vertical.iter().map(|r| r.position).collect());
        if rows < MIN_RULINGS || columns < MIN_RULINGS {
            return;
        }

        let (x0, x1) = min_max(
            horizontal
                .iter()
                .flat_map(|r| [r.start, r.end])
                .chain(vertical.iter().map(|r| r.position)),
        );
        let (y0, y1) = min_max(
            vertical
                .iter()
                .flat_map(|r| [r.start, r.end])
                .chain(horizontal.iter().map(|r| r.position)),
        );
        log::debug!("table grid with {} rows and {} columns of rulings", rows, columns);
        self.page.tables.push(TableRegion {
            rect: self.frame.to_rect(x0, y0, x1, y1),
        });
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}
