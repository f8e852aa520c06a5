//! Style model for the paginated report.
//!
//! All lengths are millimetres measured from the top-left corner of the page,
//! font sizes are points. The defaults reproduce an A4 report with 10 mm side
//! margins, a running header band at the top and the page number 15 mm above
//! the bottom edge.

/// Page margins in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

/// Horizontal alignment of a text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlignment {
    Left,
    Center,
    Justify,
}

/// Font size and vertical rhythm for a family of text blocks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    /// Font size in points.
    pub size: u8,
    /// Height of one rendered line in millimetres.
    pub line_height: f32,
    /// Gap added after the block in millimetres.
    pub after_spacing: f32,
}

impl TextStyle {
    pub const fn new(size: u8, line_height: f32, after_spacing: f32) -> Self {
        Self {
            size,
            line_height,
            after_spacing,
        }
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self::new(12, 5.0, 6.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderStyle {
    /// Fixed title printed top-right on every page.
    pub title: String,
    pub size: u8,
    /// Vertical band reserved below the top margin before content starts.
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FooterStyle {
    pub size: u8,
    /// Distance from the bottom edge of the page to the footer band.
    pub offset: f32,
    /// Height of the band the page number is centred in.
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListStyle {
    pub text: TextStyle,
    /// Indentation of the bullet from the left margin.
    pub indent: f32,
    /// Width of the cell holding the bullet glyph.
    pub bullet_width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableStyle {
    pub size: u8,
    pub line_height: f32,
    /// Inner padding of every grid cell.
    pub padding: f32,
    pub before_spacing: f32,
    pub after_spacing: f32,
    /// Monospace style used when the grid cannot be laid out.
    pub fallback: TextStyle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleStyle {
    pub before_spacing: f32,
    pub after_spacing: f32,
    /// Stroke width in millimetres.
    pub thickness: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MathStyle {
    /// Formula font size in points, before scaling onto the page.
    pub size: f32,
    /// Raster resolution in dots per inch.
    pub dpi: u32,
    /// Fraction of the usable page width given to each equation image.
    pub width_fraction: f32,
    /// A new page is started when less than this much vertical space remains.
    pub break_threshold: f32,
    pub after_spacing: f32,
    /// Font size of the `(n)` equation number.
    pub number_size: u8,
    /// Preferred system font family for formula glyphs.
    pub font_family: Option<String>,
    /// Explicit font file for formula glyphs, tried before the system lookup.
    pub font_path: Option<String>,
    /// Monospace style for formulas that could not be rasterized.
    pub fallback: TextStyle,
}

/// Complete style configuration of a report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportStyle {
    /// Page width in millimetres.
    pub page_width: f32,
    /// Page height in millimetres.
    pub page_height: f32,
    pub margins: Margins,
    pub header: HeaderStyle,
    pub footer: FooterStyle,
    pub text: TextStyle,
    pub heading_1: TextStyle,
    pub heading_2: TextStyle,
    pub heading_3: TextStyle,
    /// Heading texts containing any of these patterns are centered.
    pub center_patterns: Vec<String>,
    pub list_item: ListStyle,
    pub table: TableStyle,
    pub horizontal_rule: RuleStyle,
    /// Vertical gap produced by a blank line.
    pub blank_spacing: f32,
    pub math: MathStyle,
}

impl Default for ReportStyle {
    fn default() -> Self {
        Self {
            page_width: 210.0,
            page_height: 297.0,
            margins: Margins {
                top: 10.0,
                right: 10.0,
                bottom: 20.0,
                left: 10.0,
            },
            header: HeaderStyle {
                title: "Report".to_string(),
                size: 9,
                height: 15.0,
            },
            footer: FooterStyle {
                size: 9,
                offset: 15.0,
                height: 10.0,
            },
            text: TextStyle::new(12, 5.0, 6.0),
            heading_1: TextStyle::new(16, 8.0, 4.0),
            heading_2: TextStyle::new(14, 8.0, 4.0),
            heading_3: TextStyle::new(12, 8.0, 4.0),
            center_patterns: vec!["Project Report".to_string(), "Module 3.2".to_string()],
            list_item: ListStyle {
                text: TextStyle::new(12, 5.0, 2.0),
                indent: 6.0,
                bullet_width: 5.0,
            },
            table: TableStyle {
                size: 10,
                line_height: 5.0,
                padding: 1.0,
                before_spacing: 2.0,
                after_spacing: 4.0,
                fallback: TextStyle::new(9, 4.0, 0.0),
            },
            horizontal_rule: RuleStyle {
                before_spacing: 2.0,
                after_spacing: 5.0,
                thickness: 0.2,
            },
            blank_spacing: 3.0,
            math: MathStyle {
                size: 14.0,
                dpi: 300,
                width_fraction: 0.5,
                break_threshold: 37.0,
                after_spacing: 5.0,
                number_size: 12,
                font_family: None,
                font_path: None,
                fallback: TextStyle::new(10, 5.0, 0.0),
            },
        }
    }
}

impl ReportStyle {
    /// Width available between the left and right margins.
    pub fn usable_width(&self) -> f32 {
        self.page_width - self.margins.left - self.margins.right
    }

    /// First writable line below the header band.
    pub fn content_top(&self) -> f32 {
        self.margins.top + self.header.height
    }

    /// Lowest writable position before a page break is required.
    pub fn content_bottom(&self) -> f32 {
        self.page_height - self.margins.bottom
    }

    /// Height available for content on a fresh page.
    pub fn usable_height(&self) -> f32 {
        self.content_bottom() - self.content_top()
    }

    /// Style for a heading of the given level; level 3 and deeper share one style.
    pub fn heading(&self, level: u8) -> TextStyle {
        match level {
            1 => self.heading_1,
            2 => self.heading_2,
            _ => self.heading_3,
        }
    }

    /// Whether a heading is one of the recognized document titles.
    pub fn is_centered_heading(&self, text: &str) -> bool {
        self.center_patterns
            .iter()
            .any(|pattern| !pattern.is_empty() && text.contains(pattern.as_str()))
    }
}
