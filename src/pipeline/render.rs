//! Report rendering: lay out a [`ThesisResult`] and write it as an A4 PDF.
//!
//! Rendering is split in two:
//!
//! 1. [`layout_report`] turns the thesis into pages of positioned
//!    [`DrawOp`]s. It is pure and covers word wrap, table rows and
//!    pagination, so it is tested without pdfium.
//! 2. [`render_report`] binds pdfium and emits those ops with the standard
//!    Helvetica fonts.
//!
//! ## Why spawn_blocking?
//!
//! pdfium is a C++ library behind a global lock; document creation and
//! serialisation are CPU-bound calls that would stall a Tokio worker.
//!
//! Text widths are estimated from a per-font average glyph width rather than
//! measured; the wrap is conservative enough that Helvetica never overflows
//! a cell.

use crate::error::ThesisError;
use crate::output::{RenderedReport, ThesisResult};
use chrono::NaiveDate;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// Environment variable pointing at a pdfium library file or its directory.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// A4 in PDF points.
pub const PAGE_WIDTH: f32 = 595.0;
pub const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 50.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const TITLE_SIZE: f32 = 20.0;
const HEADING_SIZE: f32 = 14.0;
const BODY_SIZE: f32 = 11.0;
const TABLE_SIZE: f32 = 9.0;
const FOOTER_SIZE: f32 = 8.0;
const LEADING: f32 = 1.3;
const CELL_PAD: f32 = 4.0;
const GRID_WIDTH: f32 = 0.25;

/// Category, Score, Weight (%), Feedback.
const TABLE_COLUMNS: [f32; 4] = [150.0, 50.0, 65.0, 230.0];
const TABLE_HEADERS: [&str; 4] = ["Category", "Score", "Weight (%)", "Feedback"];
const HEADER_FILL: Rgb = Rgb(192, 192, 192);
const BLACK: Rgb = Rgb(0, 0, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Regular,
    Bold,
}

impl FontStyle {
    /// Average Helvetica glyph width as a fraction of the font size.
    fn average_advance(self) -> f32 {
        match self {
            FontStyle::Regular => 0.5,
            FontStyle::Bold => 0.56,
        }
    }
}

/// One positioned drawing instruction. Coordinates are PDF points with the
/// origin at the bottom-left corner; `y` of text is its baseline.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        y: f32,
        text: String,
        size: f32,
        font: FontStyle,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        width: f32,
    },
    FillRect {
        left: f32,
        bottom: f32,
        right: f32,
        top: f32,
        color: Rgb,
    },
}

/// The draw operations of one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub ops: Vec<DrawOp>,
}

impl PageLayout {
    /// All text on the page, in draw order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Download name of a report: `Investment_Thesis_<startup>_<DDMMYYYY>.pdf`.
///
/// Path separators in the startup name are replaced with `_` so the name is
/// always a single path component.
pub fn report_filename(startup_name: &str, date: NaiveDate) -> String {
    let safe: String = startup_name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("Investment_Thesis_{}_{}.pdf", safe, date.format("%d%m%Y"))
}

/// Estimated rendered width of `text`.
pub fn text_width(text: &str, size: f32, font: FontStyle) -> f32 {
    text.chars().count() as f32 * size * font.average_advance()
}

/// Greedy word wrap into lines no wider than `max_width`.
///
/// Explicit newlines start a new line; words longer than a line are split.
pub fn wrap_text(text: &str, max_width: f32, size: f32, font: FontStyle) -> Vec<String> {
    let max_chars = ((max_width / (size * font.average_advance())).floor() as usize).max(1);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_len = 0usize;
        for word in paragraph.split_whitespace() {
            let chars: Vec<char> = word.chars().collect();
            for chunk in chars.chunks(max_chars) {
                let chunk: String = chunk.iter().collect();
                let len = chunk.chars().count();
                if current_len > 0 && current_len + 1 + len > max_chars {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                if current_len > 0 {
                    current.push(' ');
                    current_len += 1;
                }
                current.push_str(&chunk);
                current_len += len;
            }
        }
        lines.push(current);
    }

    while lines.len() > 1 && lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    lines
}

// ── Layout ────────────────────────────────────────────────────────────────

struct Layout {
    pages: Vec<PageLayout>,
    /// Top of the free area on the current page.
    y: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: vec![PageLayout::default()],
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn page(&mut self) -> &mut PageLayout {
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn new_page(&mut self) {
        self.pages.push(PageLayout::default());
        self.y = PAGE_HEIGHT - MARGIN;
    }

    /// Start a new page unless `height` still fits above the bottom margin.
    fn ensure_space(&mut self, height: f32) {
        if self.y - height < MARGIN && self.y < PAGE_HEIGHT - MARGIN {
            self.new_page();
        }
    }

    fn text(&mut self, x: f32, baseline: f32, text: &str, size: f32, font: FontStyle) {
        if text.is_empty() {
            return;
        }
        self.page().ops.push(DrawOp::Text {
            x,
            y: baseline,
            text: text.to_string(),
            size,
            font,
        });
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    fn centered(&mut self, text: &str, size: f32, font: FontStyle) {
        let line_height = size * LEADING;
        self.ensure_space(line_height);
        let x = ((PAGE_WIDTH - text_width(text, size, font)) / 2.0).max(MARGIN);
        self.text(x, self.y - size, text, size, font);
        self.y -= line_height;
    }

    fn heading(&mut self, title: &str) {
        self.gap(10.0);
        // Keep a heading together with at least two body lines.
        self.ensure_space(HEADING_SIZE * LEADING + 2.0 * BODY_SIZE * LEADING);
        self.text(MARGIN, self.y - HEADING_SIZE, title, HEADING_SIZE, FontStyle::Bold);
        self.y -= HEADING_SIZE * LEADING + 6.0;
    }

    /// A wrapped paragraph, optionally prefixed with a bold label.
    fn paragraph(&mut self, label: Option<&str>, text: &str, indent: f32) {
        let line_height = BODY_SIZE * LEADING;
        let x0 = MARGIN + indent;
        let label_width = label.map_or(0.0, |l| text_width(l, BODY_SIZE, FontStyle::Bold) + 3.0);
        let lines = wrap_text(text, CONTENT_WIDTH - indent - label_width, BODY_SIZE, FontStyle::Regular);

        for (i, line) in lines.iter().enumerate() {
            self.ensure_space(line_height);
            let baseline = self.y - BODY_SIZE;
            if i == 0 {
                if let Some(l) = label {
                    self.text(x0, baseline, l, BODY_SIZE, FontStyle::Bold);
                }
            }
            self.text(x0 + label_width, baseline, line, BODY_SIZE, FontStyle::Regular);
            self.y -= line_height;
        }
        self.y -= 6.0;
    }

    fn bullet(&mut self, text: &str) {
        self.paragraph(Some("\u{2022}"), text, 8.0);
    }

    /// Rows taller than the space left are split across pages; the
    /// continuation sits under a repeated header.
    fn table(&mut self, rows: &[[String; 4]]) {
        self.table_header();
        let page_capacity = lines_fitting(PAGE_HEIGHT - 2.0 * MARGIN - header_height());

        for row in rows {
            let cells: Vec<Vec<String>> = row
                .iter()
                .zip(TABLE_COLUMNS)
                .map(|(cell, w)| wrap_text(cell, w - 2.0 * CELL_PAD, TABLE_SIZE, FontStyle::Regular))
                .collect();
            let total = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);

            let mut drawn = 0;
            while drawn < total {
                let remaining = total - drawn;
                let fit = lines_fitting(self.y - MARGIN);
                if remaining <= fit {
                    let part = cell_slice(&cells, drawn, remaining);
                    self.table_row(&part, FontStyle::Regular, row_height(remaining));
                    drawn = total;
                } else if fit == 0 || (drawn == 0 && remaining <= page_capacity) {
                    self.new_page();
                    self.table_header();
                } else {
                    let part = cell_slice(&cells, drawn, fit);
                    self.table_row(&part, FontStyle::Regular, row_height(fit));
                    drawn += fit;
                    self.new_page();
                    self.table_header();
                }
            }
        }
        self.y -= 6.0;
    }

    fn table_header(&mut self) {
        let cells = header_cells();
        let height = header_height();
        self.ensure_space(height);
        let top = self.y;
        self.page().ops.push(DrawOp::FillRect {
            left: MARGIN,
            bottom: top - height,
            right: MARGIN + CONTENT_WIDTH,
            top,
            color: HEADER_FILL,
        });
        self.table_row(&cells, FontStyle::Bold, height);
    }

    /// Cells with their grid lines; `self.y` is the row's top edge.
    fn table_row(&mut self, cells: &[Vec<String>], font: FontStyle, height: f32) {
        let top = self.y;
        let bottom = top - height;
        let mut x = MARGIN;

        for (lines, width) in cells.iter().zip(TABLE_COLUMNS) {
            for (i, line) in lines.iter().enumerate() {
                let baseline = top - CELL_PAD - TABLE_SIZE - i as f32 * TABLE_SIZE * LEADING;
                self.text(x + CELL_PAD, baseline, line, TABLE_SIZE, font);
            }
            self.grid(x, top, x, bottom);
            x += width;
        }
        self.grid(x, top, x, bottom);
        self.grid(MARGIN, top, x, top);
        self.grid(MARGIN, bottom, x, bottom);
        self.y = bottom;
    }

    fn grid(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        self.page().ops.push(DrawOp::Line {
            x1,
            y1,
            x2,
            y2,
            width: GRID_WIDTH,
        });
    }

    fn footers(&mut self, startup_name: &str) {
        let total = self.pages.len();
        for (i, page) in self.pages.iter_mut().enumerate() {
            page.ops.push(DrawOp::Text {
                x: MARGIN,
                y: MARGIN / 2.0,
                text: format!("{startup_name} - Investment Thesis - page {} of {}", i + 1, total),
                size: FOOTER_SIZE,
                font: FontStyle::Regular,
            });
        }
    }
}

fn row_height(lines: usize) -> f32 {
    lines.max(1) as f32 * TABLE_SIZE * LEADING + 2.0 * CELL_PAD
}

/// Table lines that fit in `available` points of height, padding included.
fn lines_fitting(available: f32) -> usize {
    ((available - 2.0 * CELL_PAD) / (TABLE_SIZE * LEADING)).floor().max(0.0) as usize
}

fn header_cells() -> Vec<Vec<String>> {
    TABLE_HEADERS
        .iter()
        .zip(TABLE_COLUMNS)
        .map(|(h, w)| wrap_text(h, w - 2.0 * CELL_PAD, TABLE_SIZE, FontStyle::Bold))
        .collect()
}

fn header_height() -> f32 {
    row_height(header_cells().iter().map(Vec::len).max().unwrap_or(1))
}

/// Lines `[from, from + count)` of every cell; shorter cells yield fewer.
fn cell_slice(cells: &[Vec<String>], from: usize, count: usize) -> Vec<Vec<String>> {
    cells
        .iter()
        .map(|lines| {
            let start = from.min(lines.len());
            let end = (from + count).min(lines.len());
            lines[start..end].to_vec()
        })
        .collect()
}

/// Lay out the full report.
///
/// Sections, in order: title, summary, category table, strengths,
/// weaknesses, recommendations. Every page gets a footer.
pub fn layout_report(thesis: &ThesisResult, startup_name: &str) -> Vec<PageLayout> {
    let mut l = Layout::new();

    l.centered("Investment Thesis Report", TITLE_SIZE, FontStyle::Bold);
    l.centered(startup_name, BODY_SIZE, FontStyle::Regular);
    l.gap(12.0);

    l.heading("Summary");
    l.paragraph(
        Some("Investment Recommendation:"),
        &thesis.recommendation.to_string(),
        0.0,
    );
    l.paragraph(Some("Overall Score:"), &thesis.overall_score.to_string(), 0.0);
    l.paragraph(Some("Confidence Score:"), &thesis.confidence_score.to_string(), 0.0);
    l.paragraph(Some("Processing Date:"), &thesis.processing_date, 0.0);

    l.gap(12.0);
    l.heading("Category-wise Analysis");
    let rows: Vec<[String; 4]> = thesis
        .categories
        .iter()
        .map(|c| {
            [
                c.name.clone(),
                c.score.to_string(),
                c.weight.to_string(),
                c.feedback.clone(),
            ]
        })
        .collect();
    l.table(&rows);

    l.gap(12.0);
    l.heading("Strengths");
    for s in &thesis.strengths {
        l.bullet(s);
    }

    l.gap(12.0);
    l.heading("Weaknesses");
    for w in &thesis.weaknesses {
        l.bullet(w);
    }

    l.gap(12.0);
    l.heading("Recommendations");
    l.paragraph(None, &thesis.recommendations, 0.0);

    l.footers(startup_name);
    l.pages
}

// ── pdfium ────────────────────────────────────────────────────────────────

/// Bind to a pdfium library.
///
/// Looks at [`PDFIUM_LIB_PATH_ENV`] first (a library file or a directory
/// holding one), then the working directory, then the system library path.
pub fn bind_pdfium() -> Result<Pdfium, ThesisError> {
    if let Ok(path) = std::env::var(PDFIUM_LIB_PATH_ENV) {
        let path = PathBuf::from(path);
        let lib = if path.is_dir() {
            Pdfium::pdfium_platform_library_name_at_path(&path)
        } else {
            path
        };
        debug!("Binding pdfium from {}", lib.display());
        return Pdfium::bind_to_library(&lib)
            .map(Pdfium::new)
            .map_err(|e| ThesisError::PdfiumBindingFailed(format!("{}: {:?}", lib.display(), e)));
    }

    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| ThesisError::PdfiumBindingFailed(format!("{:?}", e)))
}

/// Fail fast when no pdfium library can be bound.
///
/// Run this before any model call when a report is wanted, so a missing
/// library does not surface only after the analysis was paid for.
pub async fn check_renderer() -> Result<(), ThesisError> {
    tokio::task::spawn_blocking(|| bind_pdfium().map(drop))
        .await
        .map_err(|e| ThesisError::Internal(format!("Renderer check panicked: {}", e)))?
}

/// Render the thesis as PDF bytes with its download name.
///
/// No validation happens here; whatever the thesis holds is drawn.
pub async fn render_report(
    thesis: &ThesisResult,
    startup_name: &str,
) -> Result<RenderedReport, ThesisError> {
    let pages = layout_report(thesis, startup_name);
    let filename = report_filename(startup_name, chrono::Utc::now().date_naive());

    let bytes = tokio::task::spawn_blocking(move || render_blocking(&pages))
        .await
        .map_err(|e| ThesisError::Internal(format!("Render task panicked: {}", e)))??;

    info!("Rendered report {} ({} bytes)", filename, bytes.len());
    Ok(RenderedReport { bytes, filename })
}

/// Blocking implementation of PDF emission.
fn render_blocking(pages: &[PageLayout]) -> Result<Vec<u8>, ThesisError> {
    let pdfium = bind_pdfium()?;
    let render_err = |e: PdfiumError| ThesisError::RenderFailed(format!("{:?}", e));

    let mut document = pdfium.create_new_pdf().map_err(render_err)?;
    let regular = document.fonts_mut().helvetica();
    let bold = document.fonts_mut().helvetica_bold();

    for (i, layout) in pages.iter().enumerate() {
        let mut page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::a4())
            .map_err(render_err)?;
        let objects = page.objects_mut();

        for op in &layout.ops {
            match op {
                DrawOp::Text {
                    x,
                    y,
                    text,
                    size,
                    font,
                } => {
                    let token = match font {
                        FontStyle::Regular => regular,
                        FontStyle::Bold => bold,
                    };
                    objects
                        .create_text_object(
                            PdfPoints::new(*x),
                            PdfPoints::new(*y),
                            text,
                            token,
                            PdfPoints::new(*size),
                        )
                        .map_err(render_err)?;
                }
                DrawOp::Line {
                    x1,
                    y1,
                    x2,
                    y2,
                    width,
                } => {
                    objects
                        .create_path_object_line(
                            PdfPoints::new(*x1),
                            PdfPoints::new(*y1),
                            PdfPoints::new(*x2),
                            PdfPoints::new(*y2),
                            pdf_color(BLACK),
                            PdfPoints::new(*width),
                        )
                        .map_err(render_err)?;
                }
                DrawOp::FillRect {
                    left,
                    bottom,
                    right,
                    top,
                    color,
                } => {
                    objects
                        .create_path_object_rect(
                            PdfRect::new_from_values(*bottom, *left, *top, *right),
                            None,
                            None,
                            Some(pdf_color(*color)),
                        )
                        .map_err(render_err)?;
                }
            }
        }
        debug!("Page {}: {} draw ops", i + 1, layout.ops.len());
    }

    document.save_to_bytes().map_err(render_err)
}

fn pdf_color(Rgb(r, g, b): Rgb) -> PdfColor {
    PdfColor::new(r, g, b, 255)
}
