//! Rendering: composed document → PDF bytes.
//!
//! The [`RenderBackend`] trait is the seam between the pipeline and whatever
//! produces the bytes. [`PdfBackend`] is the built-in implementation: it runs
//! [`crate::pipeline::layout`] and replays the draw operations onto printpdf
//! layers using the base-14 Helvetica and Courier faces.
//!
//! ## Why spawn_blocking?
//!
//! Layout and PDF serialisation are CPU-bound and synchronous. Running them
//! on the blocking pool keeps the watch loop's Tokio workers free to receive
//! filesystem events, and lets [`render`] put a wall-clock bound on a
//! pathological document without blocking the runtime.

use crate::document::ComposedDocument;
use crate::error::RenderError;
use crate::pipeline::layout::{layout, DrawOp, Face, PageLayout};
use crate::style::Rgb;
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Polygon,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Produces PDF bytes from a composed document.
///
/// Implementations must be pure with respect to the filesystem: the
/// pipeline owns all file I/O.
pub trait RenderBackend: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &str;

    /// Render `doc` to a complete PDF file image.
    fn render(&self, doc: &ComposedDocument) -> Result<Vec<u8>, RenderError>;
}

/// Render on the blocking pool, bounded by `timeout`.
///
/// A backend that panics, returns zero bytes, or overruns the timeout yields
/// a [`RenderError`]. An overrunning render is abandoned, not cancelled; its
/// output is discarded when it eventually finishes.
pub async fn render(
    backend: Arc<dyn RenderBackend>,
    doc: ComposedDocument,
    timeout: Duration,
) -> Result<Vec<u8>, RenderError> {
    let name = backend.name().to_string();
    let task = tokio::task::spawn_blocking(move || backend.render(&doc));

    let bytes = match tokio::time::timeout(timeout, task).await {
        Err(_) => {
            warn!("Renderer '{}' exceeded {:?}", name, timeout);
            return Err(RenderError::timeout(timeout.as_secs().max(1)));
        }
        Ok(Err(join)) => {
            return Err(RenderError::new(format!("renderer '{name}' panicked: {join}")));
        }
        Ok(Ok(result)) => result?,
    };

    if bytes.is_empty() {
        return Err(RenderError::empty_output());
    }
    debug!("Renderer '{}' produced {} bytes", name, bytes.len());
    Ok(bytes)
}

// ── printpdf backend ─────────────────────────────────────────────────────

/// The built-in PDF backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfBackend;

impl RenderBackend for PdfBackend {
    fn name(&self) -> &str {
        "printpdf"
    }

    fn render(&self, doc: &ComposedDocument) -> Result<Vec<u8>, RenderError> {
        let pages = layout(doc);
        debug!("Laid out {} page(s)", pages.len());
        emit(doc, &pages)
    }
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
    bold_italic: IndirectFontRef,
    mono: IndirectFontRef,
}

impl Fonts {
    fn load(doc: &PdfDocumentReference) -> Result<Self, RenderError> {
        let font = |f: BuiltinFont| {
            doc.add_builtin_font(f)
                .map_err(|e| RenderError::new(format!("failed to load builtin font: {e:?}")))
        };
        Ok(Self {
            regular: font(BuiltinFont::Helvetica)?,
            bold: font(BuiltinFont::HelveticaBold)?,
            italic: font(BuiltinFont::HelveticaOblique)?,
            bold_italic: font(BuiltinFont::HelveticaBoldOblique)?,
            mono: font(BuiltinFont::Courier)?,
        })
    }

    fn get(&self, face: Face) -> &IndirectFontRef {
        match face {
            Face::Regular => &self.regular,
            Face::Bold => &self.bold,
            Face::Italic => &self.italic,
            Face::BoldItalic => &self.bold_italic,
            Face::Mono => &self.mono,
        }
    }
}

fn emit(doc: &ComposedDocument, pages: &[PageLayout]) -> Result<Vec<u8>, RenderError> {
    let page = doc.style.page;
    let (w, h) = (Mm(page.width_mm), Mm(page.height_mm));
    let title = doc.title.as_deref().map(sanitize).unwrap_or_default();

    let (pdf, first_page, first_layer) = PdfDocument::new(title, w, h, "content");
    let fonts = Fonts::load(&pdf)?;

    for (i, page_layout) in pages.iter().enumerate() {
        let layer = if i == 0 {
            pdf.get_page(first_page).get_layer(first_layer)
        } else {
            let (p, l) = pdf.add_page(w, h, "content");
            pdf.get_page(p).get_layer(l)
        };
        for op in &page_layout.ops {
            draw(&layer, &fonts, op, page.height_mm);
        }
    }

    pdf.save_to_bytes()
        .map_err(|e| RenderError::new(format!("PDF serialisation failed: {e:?}")))
}

fn draw(layer: &PdfLayerReference, fonts: &Fonts, op: &DrawOp, page_height: f32) {
    // Layout measures from the top edge; PDF from the bottom.
    let flip = |y: f32| Mm(page_height - y);
    match op {
        DrawOp::Text {
            x,
            y,
            size_pt,
            face,
            color,
            text,
        } => {
            layer.set_fill_color(pdf_color(*color));
            layer.use_text(sanitize(text), *size_pt, Mm(*x), flip(*y), fonts.get(*face));
        }
        DrawOp::FillRect { x, y, w, h, color } => {
            let ring = vec![
                (Point::new(Mm(*x), flip(*y)), false),
                (Point::new(Mm(x + w), flip(*y)), false),
                (Point::new(Mm(x + w), flip(y + h)), false),
                (Point::new(Mm(*x), flip(y + h)), false),
            ];
            layer.set_fill_color(pdf_color(*color));
            layer.add_polygon(Polygon {
                rings: vec![ring],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            });
        }
        DrawOp::StrokeLine {
            x1,
            y1,
            x2,
            y2,
            width_pt,
            color,
        } => {
            layer.set_outline_color(pdf_color(*color));
            layer.set_outline_thickness(*width_pt);
            layer.add_line(Line {
                points: vec![
                    (Point::new(Mm(*x1), flip(*y1)), false),
                    (Point::new(Mm(*x2), flip(*y2)), false),
                ],
                is_closed: false,
            });
        }
    }
}

fn pdf_color(c: Rgb) -> Color {
    let f = |v: u8| f32::from(v) / 255.0;
    Color::Rgb(printpdf::Rgb::new(f(c.r), f(c.g), f(c.b), None))
}

/// Map text onto the characters the base-14 fonts can show.
///
/// Typographic punctuation is folded to ASCII and common Latin accents are
/// stripped; anything else becomes `?`.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            ' '..='~' => out.push(c),
            '\t' => out.push_str("    "),
            '\u{a0}' | '\u{2002}'..='\u{200a}' => out.push(' '),
            '\u{2018}' | '\u{2019}' | '\u{201a}' | '\u{2032}' => out.push('\''),
            '\u{201c}' | '\u{201d}' | '\u{201e}' | '\u{2033}' => out.push('"'),
            '\u{2010}'..='\u{2015}' | '\u{2212}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            '\u{2022}' | '\u{00b7}' | '\u{25cf}' => out.push('-'),
            '\u{2192}' => out.push_str("->"),
            '\u{2190}' => out.push_str("<-"),
            '\u{00d7}' => out.push('x'),
            '\u{2713}' | '\u{2714}' => out.push('v'),
            '\u{200b}' | '\u{feff}' => {}
            _ => out.push(fold_accent(c).unwrap_or('?')),
        }
    }
    out
}

fn fold_accent(c: char) -> Option<char> {
    Some(match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'A',
        'ç' => 'c',
        'Ç' => 'C',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'È' | 'É' | 'Ê' | 'Ë' => 'E',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'Ì' | 'Í' | 'Î' | 'Ï' => 'I',
        'ñ' => 'n',
        'Ñ' => 'N',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => 'o',
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => 'O',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'Ù' | 'Ú' | 'Û' | 'Ü' => 'U',
        'ý' | 'ÿ' => 'y',
        'Ý' => 'Y',
        'ß' => 's',
        _ => return None,
    })
}
