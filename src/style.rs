//! The fixed style sheet applied to every generated PDF.
//!
//! Pure data: nothing in here decides anything. [`crate::pipeline::layout`]
//! reads these values when it places text and boxes on the page.
//! Lengths given in CSS pixels are converted at 96 px/in (1 px = 0.2646 mm).

/// 1 typographic point in millimetres.
pub const PT_TO_MM: f32 = 0.352_778;

/// 1 CSS pixel in millimetres.
pub const PX_TO_MM: f32 = 0.264_583;

/// An sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn hex(v: u32) -> Self {
        Self {
            r: ((v >> 16) & 0xff) as u8,
            g: ((v >> 8) & 0xff) as u8,
            b: (v & 0xff) as u8,
        }
    }
}

/// The typeface families available to the layout engine.
///
/// They map onto the PDF base-14 fonts, so no font files are embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontFamily {
    Sans,
    Mono,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageStyle {
    pub width_mm: f32,
    pub height_mm: f32,
    pub margin_mm: f32,
}

impl PageStyle {
    pub fn content_width(&self) -> f32 {
        self.width_mm - 2.0 * self.margin_mm
    }

    pub fn content_bottom(&self) -> f32 {
        self.height_mm - self.margin_mm
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyStyle {
    pub family: FontFamily,
    pub size_pt: f32,
    pub line_height: f32,
    pub color: Rgb,
    /// Space after a paragraph, in em.
    pub paragraph_spacing_em: f32,
    pub link_color: Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingStyle {
    pub size_pt: f32,
    pub space_before_em: f32,
    pub space_after_em: f32,
    /// Draw a rule under the heading (h1).
    pub rule_below: Option<Rgb>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CodeStyle {
    pub family: FontFamily,
    /// Relative to the body size.
    pub size_ratio: f32,
    pub background: Rgb,
    pub border: Rgb,
    pub padding_mm: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableStyle {
    pub border: Rgb,
    pub border_width_pt: f32,
    pub padding_x_mm: f32,
    pub padding_y_mm: f32,
    pub header_background: Rgb,
    /// Background of every second body row.
    pub zebra_background: Rgb,
    pub size_ratio: f32,
    pub space_after_em: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockQuoteStyle {
    pub border: Rgb,
    pub border_width_mm: f32,
    pub padding_left_mm: f32,
    pub color: Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageStyle {
    /// Maximum image width as a fraction of the content width.
    pub max_width_ratio: f32,
    pub caption_color: Rgb,
    pub frame: Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListStyle {
    pub indent_mm: f32,
}

/// The complete style sheet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleSheet {
    pub page: PageStyle,
    pub body: BodyStyle,
    /// h1..h6
    pub headings: [HeadingStyle; 6],
    pub heading_color: Rgb,
    pub code: CodeStyle,
    pub table: TableStyle,
    pub blockquote: BlockQuoteStyle,
    pub image: ImageStyle,
    pub list: ListStyle,
    pub rule_color: Rgb,
}

impl StyleSheet {
    /// Style for heading `level` (1-based, clamped to 1..=6).
    pub fn heading(&self, level: u8) -> &HeadingStyle {
        let idx = usize::from(level.clamp(1, 6)) - 1;
        &self.headings[idx]
    }

    pub fn code_size_pt(&self) -> f32 {
        self.body.size_pt * self.code.size_ratio
    }

    pub fn table_size_pt(&self) -> f32 {
        self.body.size_pt * self.table.size_ratio
    }
}

const fn heading(size_pt: f32, rule_below: Option<Rgb>) -> HeadingStyle {
    HeadingStyle {
        size_pt,
        space_before_em: 1.5,
        space_after_em: 0.5,
        rule_below,
    }
}

/// A4, 2 cm margins, Helvetica 10 pt.
pub static STYLE_SHEET: StyleSheet = StyleSheet {
    page: PageStyle {
        width_mm: 210.0,
        height_mm: 297.0,
        margin_mm: 20.0,
    },
    body: BodyStyle {
        family: FontFamily::Sans,
        size_pt: 10.0,
        line_height: 1.2,
        color: Rgb::hex(0x333333),
        paragraph_spacing_em: 0.8,
        link_color: Rgb::hex(0x1a5fb4),
    },
    headings: [
        heading(18.0, Some(Rgb::hex(0xdddddd))),
        heading(16.0, None),
        heading(14.0, None),
        heading(12.0, None),
        heading(11.0, None),
        heading(10.0, None),
    ],
    heading_color: Rgb::hex(0x000000),
    code: CodeStyle {
        family: FontFamily::Mono,
        size_ratio: 0.9,
        background: Rgb::hex(0xf5f5f5),
        border: Rgb::hex(0xdddddd),
        padding_mm: 3.5,
    },
    table: TableStyle {
        border: Rgb::hex(0xdddddd),
        border_width_pt: 0.75,
        padding_x_mm: 10.0 * PX_TO_MM,
        padding_y_mm: 6.0 * PX_TO_MM,
        header_background: Rgb::hex(0xf2f2f2),
        zebra_background: Rgb::hex(0xf9f9f9),
        size_ratio: 0.9,
        space_after_em: 1.0,
    },
    blockquote: BlockQuoteStyle {
        border: Rgb::hex(0xdddddd),
        border_width_mm: 4.0 * PX_TO_MM,
        padding_left_mm: 3.5,
        color: Rgb::hex(0x666666),
    },
    image: ImageStyle {
        max_width_ratio: 1.0,
        caption_color: Rgb::hex(0x666666),
        frame: Rgb::hex(0xdddddd),
    },
    list: ListStyle { indent_mm: 6.0 },
    rule_color: Rgb::hex(0xdddddd),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_with_two_centimetre_margins() {
        let page = STYLE_SHEET.page;
        assert_eq!(page.width_mm, 210.0);
        assert_eq!(page.height_mm, 297.0);
        assert_eq!(page.content_width(), 170.0);
    }

    #[test]
    fn heading_level_is_clamped() {
        assert_eq!(STYLE_SHEET.heading(0).size_pt, 18.0);
        assert_eq!(STYLE_SHEET.heading(9).size_pt, 10.0);
        assert!(STYLE_SHEET.heading(1).rule_below.is_some());
        assert!(STYLE_SHEET.heading(2).rule_below.is_none());
    }

    #[test]
    fn hex_colour() {
        assert_eq!(Rgb::hex(0xf2f3f4), Rgb { r: 0xf2, g: 0xf3, b: 0xf4 });
    }
}
