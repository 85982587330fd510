use crate::domain::series::DailyRevenue;
use crate::report::format_amount;
use crate::time::dates::format_date;
use anyhow::Context;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Rect,
    Rgb,
};

pub const REPORT_FILENAME: &str = "Laporan_Pendapatan_JackBarber.pdf";
pub const REPORT_TITLE: &str = "Laporan Pendapatan Harian - Jack Barber";
pub const REPORT_HEADERS: [&str; 3] = ["No", "tanggal", "harga"];

// Landscape A4.
const PAGE_W: f32 = 297.0;
const PAGE_H: f32 = 210.0;
const MARGIN: f32 = 15.0;

const TITLE_SIZE: f32 = 20.0;
const BODY_SIZE: f32 = 10.0;
const COLUMN_WIDTHS: [f32; 3] = [25.0, 60.0, 60.0];
const HEADER_H: f32 = 10.0;
const ROW_H: f32 = 8.0;
// Space taken by the title (plus spacer) on the first page only.
const TITLE_BLOCK_H: f32 = 20.0;

// Rough Helvetica advance width in em, good enough for centring short cells.
const AVG_CHAR_EM: f32 = 0.55;
const PT_TO_MM: f32 = 0.352_778;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub no: usize,
    pub tanggal: String,
    pub harga: String,
}

impl ReportRow {
    fn cells(&self) -> [String; 3] {
        [self.no.to_string(), self.tanggal.clone(), self.harga.clone()]
    }
}

pub fn report_rows(daily: &[DailyRevenue]) -> Vec<ReportRow> {
    daily
        .iter()
        .enumerate()
        .map(|(i, p)| ReportRow {
            no: i + 1,
            tanggal: format_date(p.date),
            harga: format_amount(p.total),
        })
        .collect()
}

fn rows_per_page(first_page: bool) -> usize {
    let mut available = PAGE_H - 2.0 * MARGIN - HEADER_H;
    if first_page {
        available -= TITLE_BLOCK_H;
    }
    ((available / ROW_H).floor() as usize).max(1)
}

// Always at least one page, even for an empty table.
pub fn paginate(rows: &[ReportRow]) -> Vec<&[ReportRow]> {
    let mut pages = Vec::new();
    let first = rows_per_page(true).min(rows.len());
    pages.push(&rows[..first]);

    let mut rest = &rows[first..];
    while !rest.is_empty() {
        let n = rows_per_page(false).min(rest.len());
        pages.push(&rest[..n]);
        rest = &rest[n..];
    }
    pages
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// Paginated PDF of the daily revenue table.
pub fn render_revenue_pdf(daily: &[DailyRevenue]) -> anyhow::Result<Vec<u8>> {
    let rows = report_rows(daily);
    let pages = paginate(&rows);

    let (doc, page1, layer1) = PdfDocument::new(REPORT_TITLE, Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| anyhow::anyhow!("{e:?}"))
            .context("failed to load Helvetica")?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| anyhow::anyhow!("{e:?}"))
            .context("failed to load Helvetica-Bold")?,
    };

    for (page_idx, page_rows) in pages.iter().enumerate() {
        let layer = if page_idx == 0 {
            doc.get_page(page1).get_layer(layer1)
        } else {
            let (page, layer) =
                doc.add_page(Mm(PAGE_W), Mm(PAGE_H), format!("Page {}", page_idx + 1));
            doc.get_page(page).get_layer(layer)
        };

        let mut top = PAGE_H - MARGIN;
        if page_idx == 0 {
            let title_w = text_width_mm(REPORT_TITLE, TITLE_SIZE);
            set_fill(&layer, BLACK);
            layer.use_text(
                REPORT_TITLE,
                TITLE_SIZE,
                Mm((PAGE_W - title_w) / 2.0),
                Mm(top - 8.0),
                &fonts.bold,
            );
            top -= TITLE_BLOCK_H;
        }

        draw_table_page(&layer, &fonts, top, page_rows);
    }

    tracing::debug!(rows = rows.len(), pages = pages.len(), "revenue report rendered");

    doc.save_to_bytes()
        .map_err(|e| anyhow::anyhow!("{e:?}"))
        .context("failed to serialize revenue report")
}

const BLACK: (f32, f32, f32) = (0.0, 0.0, 0.0);
const WHITE_SMOKE: (f32, f32, f32) = (0.96, 0.96, 0.96);
const DARK_BLUE: (f32, f32, f32) = (0.0, 0.0, 0.545);
const GREY: (f32, f32, f32) = (0.5, 0.5, 0.5);

fn rgb((r, g, b): (f32, f32, f32)) -> Color {
    Color::Rgb(Rgb::new(r, g, b, None))
}

fn set_fill(layer: &PdfLayerReference, c: (f32, f32, f32)) {
    layer.set_fill_color(rgb(c));
}

fn text_width_mm(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * AVG_CHAR_EM * PT_TO_MM
}

fn draw_table_page(layer: &PdfLayerReference, fonts: &Fonts, top: f32, rows: &[ReportRow]) {
    let table_w: f32 = COLUMN_WIDTHS.iter().sum();
    let left = (PAGE_W - table_w) / 2.0;
    let bottom = top - HEADER_H - ROW_H * rows.len() as f32;

    // Header band.
    set_fill(layer, DARK_BLUE);
    layer.add_rect(Rect::new(Mm(left), Mm(top - HEADER_H), Mm(left + table_w), Mm(top)));

    set_fill(layer, WHITE_SMOKE);
    let header_cells = REPORT_HEADERS.map(str::to_string);
    draw_row_text(layer, &fonts.bold, left, top - HEADER_H + 3.5, &header_cells);

    set_fill(layer, BLACK);
    for (i, row) in rows.iter().enumerate() {
        let row_bottom = top - HEADER_H - ROW_H * (i as f32 + 1.0);
        draw_row_text(layer, &fonts.regular, left, row_bottom + 2.5, &row.cells());
    }

    // Grid.
    layer.set_outline_color(rgb(GREY));
    layer.set_outline_thickness(0.5);

    stroke(layer, (left, top), (left + table_w, top));
    for i in 0..=rows.len() {
        let y = top - HEADER_H - ROW_H * i as f32;
        stroke(layer, (left, y), (left + table_w, y));
    }

    let mut x = left;
    stroke(layer, (x, top), (x, bottom));
    for w in COLUMN_WIDTHS {
        x += w;
        stroke(layer, (x, top), (x, bottom));
    }
}

fn draw_row_text(
    layer: &PdfLayerReference,
    font: &IndirectFontRef,
    left: f32,
    baseline: f32,
    cells: &[String; 3],
) {
    let mut x = left;
    for (cell, w) in cells.iter().zip(COLUMN_WIDTHS) {
        let text_w = text_width_mm(cell, BODY_SIZE);
        let cx = x + ((w - text_w) / 2.0).max(1.0);
        layer.use_text(cell.as_str(), BODY_SIZE, Mm(cx), Mm(baseline), font);
        x += w;
    }
}

fn stroke(layer: &PdfLayerReference, from: (f32, f32), to: (f32, f32)) {
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(from.0), Mm(from.1)), false),
            (Point::new(Mm(to.0), Mm(to.1)), false),
        ],
        is_closed: false,
    });
}
