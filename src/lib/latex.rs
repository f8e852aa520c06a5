//! Display-math rasterization.
//!
//! A formula is handed to a [`MathBackend`], which turns it into a grayscale
//! raster. The default [`GlyphBackend`] parses the LaTeX subset understood by
//! [`crate::formula`], stacks glyphs from a system font into boxes and paints
//! them with `rusttype` onto a draft canvas of 8 x 1.5 inches, which grows when
//! the formula does not fit. The canvas is then cropped to the inked area plus
//! a tenth of an inch on every side.
//!
//! [`MathRasterizer`] wraps a backend and never fails: empty formulas yield
//! [`MathOutcome::Empty`], and any backend error or panic is logged and
//! reported as [`MathOutcome::Failed`] so the caller can print the formula as
//! plain text instead.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use rusttype::{point, Font, Scale};

use crate::fonts::find_math_font;
use crate::formula::{parse_formula, AccentMark, AtomClass, FormulaError, Node};
use crate::styling::MathStyle;

lazy_static! {
    static ref SHORT_LE: Regex = Regex::new(r"\\le\b").unwrap();
    static ref SHORT_GE: Regex = Regex::new(r"\\ge\b").unwrap();
    static ref SYSTEM_MATH_FONT: Option<Vec<u8>> = find_math_font(None, None);
}

/// Rewrites the short comparison commands `\le` / `\ge` to `\leq` / `\geq`.
///
/// Commands that merely start with those letters (`\left`, `\leq`, `\geq`)
/// are left alone.
///
/// # Example
/// ```rust
/// use md2report::latex::preprocess_formula;
///
/// assert_eq!(preprocess_formula(r"a \le b \ge c"), r"a \leq b \geq c");
/// assert_eq!(preprocess_formula(r"\left( x \right)"), r"\left( x \right)");
/// ```
pub fn preprocess_formula(formula: &str) -> String {
    let step = SHORT_LE.replace_all(formula, r"\leq");
    SHORT_GE.replace_all(&step, r"\geq").into_owned()
}

/// Checks that a formula parses, without drawing it.
pub fn check_formula(formula: &str) -> Result<(), FormulaError> {
    parse_formula(&preprocess_formula(formula)).map(|_| ())
}

#[derive(Debug, Clone, PartialEq)]
pub enum RasterError {
    /// The formula uses syntax outside the supported subset.
    Formula(FormulaError),
    /// The math font has no glyph for a character.
    MissingGlyph(char),
    /// No usable math font was found.
    NoFont,
    /// Rendering produced no visible pixels.
    EmptyImage,
    /// Pixel buffer and dimensions disagree.
    InvalidRaster { expected: usize, actual: usize },
    /// Failure reported by a custom backend.
    Backend(String),
}

impl fmt::Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RasterError::Formula(e) => write!(f, "cannot parse formula: {}", e),
            RasterError::MissingGlyph(c) => {
                write!(f, "math font has no glyph for '{}' (U+{:04X})", c, *c as u32)
            }
            RasterError::NoFont => write!(f, "no math font available"),
            RasterError::EmptyImage => write!(f, "formula rendered no visible ink"),
            RasterError::InvalidRaster { expected, actual } => write!(
                f,
                "raster has {} pixels but its dimensions need {}",
                actual, expected
            ),
            RasterError::Backend(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for RasterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RasterError::Formula(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FormulaError> for RasterError {
    fn from(e: FormulaError) -> Self {
        RasterError::Formula(e)
    }
}

/// A cropped 8-bit grayscale image of a formula; 0 is black, 255 is white.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterMath {
    pixels: Vec<u8>,
    width_px: u32,
    height_px: u32,
    dpi: u32,
}

impl RasterMath {
    pub fn new(pixels: Vec<u8>, width_px: u32, height_px: u32, dpi: u32) -> Result<Self, RasterError> {
        let expected = width_px as usize * height_px as usize;
        if expected == 0 || pixels.len() != expected || dpi == 0 {
            return Err(RasterError::InvalidRaster {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            pixels,
            width_px,
            height_px,
            dpi,
        })
    }

    /// Row-major pixels, top row first.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn width_px(&self) -> u32 {
        self.width_px
    }

    pub fn height_px(&self) -> u32 {
        self.height_px
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    /// Height divided by width.
    pub fn aspect_ratio(&self) -> f32 {
        self.height_px as f32 / self.width_px as f32
    }
}

/// Rendering parameters shared by all backends.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterOptions {
    /// Formula font size in points.
    pub font_size: f32,
    pub dpi: u32,
    pub draft_width_in: f32,
    pub draft_height_in: f32,
    /// White border kept around the inked area after cropping.
    pub padding_in: f32,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            font_size: 14.0,
            dpi: 300,
            draft_width_in: 8.0,
            draft_height_in: 1.5,
            padding_in: 0.1,
        }
    }
}

impl RasterOptions {
    pub fn from_style(style: &MathStyle) -> Self {
        Self {
            font_size: style.size,
            dpi: style.dpi.max(1),
            ..Self::default()
        }
    }
}

/// Something that can turn a formula into pixels.
pub trait MathBackend {
    fn rasterize(&self, formula: &str, options: &RasterOptions) -> Result<RasterMath, RasterError>;
}

/// Result of rendering one display formula.
#[derive(Debug, Clone, PartialEq)]
pub enum MathOutcome {
    Rendered(RasterMath),
    /// The formula was empty or whitespace only; nothing is drawn.
    Empty,
    /// Rendering failed; the formula should be shown as plain text.
    Failed(RasterError),
}

/// Renders display formulas through a backend, containing every failure.
pub struct MathRasterizer {
    backend: Box<dyn MathBackend>,
    options: RasterOptions,
}

impl MathRasterizer {
    /// Rasterizer with the glyph backend configured from `style`.
    pub fn new(style: &MathStyle) -> Self {
        Self::with_backend(
            Box::new(GlyphBackend::from_style(style)),
            RasterOptions::from_style(style),
        )
    }

    pub fn with_backend(backend: Box<dyn MathBackend>, options: RasterOptions) -> Self {
        Self { backend, options }
    }

    pub fn render(&self, formula: &str) -> MathOutcome {
        let prepared = preprocess_formula(formula);
        let prepared = prepared.trim();
        if prepared.is_empty() {
            return MathOutcome::Empty;
        }

        let backend = &self.backend;
        let options = &self.options;
        match panic::catch_unwind(AssertUnwindSafe(|| backend.rasterize(prepared, options))) {
            Ok(Ok(raster)) => {
                debug!(
                    "Rendered formula '{}' to {}x{} px at {} dpi",
                    prepared,
                    raster.width_px(),
                    raster.height_px(),
                    raster.dpi()
                );
                MathOutcome::Rendered(raster)
            }
            Ok(Err(e)) => {
                warn!("Could not render formula '{}': {}", prepared, e);
                MathOutcome::Failed(e)
            }
            Err(_) => {
                warn!("Math backend panicked on formula '{}'", prepared);
                MathOutcome::Failed(RasterError::Backend("math backend panicked".to_string()))
            }
        }
    }
}

const SCRIPT_SCALE: f32 = 0.7;
const LARGE_OP_SCALE: f32 = 1.4;
const RULE_THICKNESS: f32 = 0.05;
const AXIS_HEIGHT: f32 = 0.25;

/// Drawing instruction in pixel space; `y` grows downward from the baseline.
#[derive(Debug, Clone, Copy)]
enum Ink {
    Glyph { ch: char, x: f32, y: f32, scale: Scale },
    Rule { x: f32, y: f32, width: f32, height: f32 },
}

impl Ink {
    fn shifted(self, dx: f32, dy: f32) -> Ink {
        match self {
            Ink::Glyph { ch, x, y, scale } => Ink::Glyph {
                ch,
                x: x + dx,
                y: y + dy,
                scale,
            },
            Ink::Rule {
                x,
                y,
                width,
                height,
            } => Ink::Rule {
                x: x + dx,
                y: y + dy,
                width,
                height,
            },
        }
    }
}

/// A laid-out piece of a formula with its baseline at y = 0.
#[derive(Debug, Default)]
struct MathBox {
    width: f32,
    ascent: f32,
    descent: f32,
    ink: Vec<Ink>,
}

impl MathBox {
    fn space(width: f32) -> Self {
        Self {
            width,
            ..Self::default()
        }
    }

    /// Adds `other` with its baseline origin at (`dx`, `dy`).
    fn place(&mut self, other: MathBox, dx: f32, dy: f32) {
        self.width = self.width.max(dx + other.width);
        self.ascent = self.ascent.max(other.ascent - dy);
        self.descent = self.descent.max(other.descent + dy);
        self.ink
            .extend(other.ink.into_iter().map(|ink| ink.shifted(dx, dy)));
    }

    fn rule(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.width = self.width.max(x + width);
        self.ascent = self.ascent.max(-y);
        self.descent = self.descent.max(y + height);
        self.ink.push(Ink::Rule {
            x,
            y,
            width,
            height,
        });
    }
}

fn class_index(class: AtomClass) -> usize {
    match class {
        AtomClass::Ord => 0,
        AtomClass::Op { .. } => 1,
        AtomClass::Bin => 2,
        AtomClass::Rel => 3,
        AtomClass::Open => 4,
        AtomClass::Close => 5,
        AtomClass::Punct => 6,
    }
}

// Inter-atom spacing: 0 none, 1 thin, 2 medium, 3 thick.
#[rustfmt::skip]
const SPACING: [[u8; 7]; 7] = [
    [0, 1, 2, 3, 0, 0, 0],
    [1, 1, 0, 3, 0, 0, 0],
    [2, 2, 0, 0, 2, 0, 0],
    [3, 3, 0, 0, 3, 0, 0],
    [0, 0, 0, 0, 0, 0, 0],
    [0, 1, 2, 3, 0, 0, 0],
    [1, 1, 0, 1, 1, 1, 1],
];

/// Space in em between two adjacent atoms.
fn spacing(left: AtomClass, right: AtomClass) -> f32 {
    match SPACING[class_index(left)][class_index(right)] {
        1 => 3.0 / 18.0,
        2 => 4.0 / 18.0,
        3 => 5.0 / 18.0,
        _ => 0.0,
    }
}

/// Node classes with binary operators in unary position demoted to ordinary.
fn effective_classes(nodes: &[Node]) -> Vec<Option<AtomClass>> {
    let mut classes: Vec<Option<AtomClass>> = nodes.iter().map(Node::class).collect();
    let mut prev: Option<AtomClass> = None;
    for i in 0..classes.len() {
        let Some(class) = classes[i] else {
            continue;
        };
        if class == AtomClass::Bin {
            let next = classes[i + 1..].iter().flatten().next().copied();
            let unary = matches!(
                prev,
                None | Some(AtomClass::Bin)
                    | Some(AtomClass::Op { .. })
                    | Some(AtomClass::Rel)
                    | Some(AtomClass::Open)
                    | Some(AtomClass::Punct)
            );
            let dangling = matches!(
                next,
                None | Some(AtomClass::Rel) | Some(AtomClass::Close) | Some(AtomClass::Punct)
            );
            if unary || dangling {
                classes[i] = Some(AtomClass::Ord);
            }
        }
        prev = classes[i];
    }
    classes
}

/// Lays out formula nodes with glyph metrics from one font.
struct Typesetter<'f> {
    font: &'f Font<'static>,
}

impl<'f> Typesetter<'f> {
    fn has_glyph(&self, ch: char) -> bool {
        self.font.glyph(ch).id().0 != 0
    }

    fn resolve(&self, ch: char) -> Result<char, RasterError> {
        if ch.is_whitespace() || self.has_glyph(ch) {
            return Ok(ch);
        }
        let substitute = match ch {
            '\u{2212}' => Some('-'),
            '\u{2217}' => Some('*'),
            '\u{2032}' => Some('\''),
            '\u{22ef}' => Some('\u{2026}'),
            '\u{3f5}' => Some('\u{3b5}'),
            '\u{2219}' => Some('\u{2022}'),
            '\u{27e8}' => Some('<'),
            '\u{27e9}' => Some('>'),
            _ => None,
        };
        match substitute {
            Some(alt) if self.has_glyph(alt) => Ok(alt),
            _ => Err(RasterError::MissingGlyph(ch)),
        }
    }

    fn axis(&self, px: f32) -> f32 {
        AXIS_HEIGHT * px
    }

    /// Vertical ink extent (top, bottom) of a glyph relative to its baseline.
    fn extent(&self, ch: char, scale: Scale) -> Option<(f32, f32)> {
        self.font
            .glyph(ch)
            .scaled(scale)
            .exact_bounding_box()
            .map(|bb| (bb.min.y, bb.max.y))
    }

    fn glyph(&self, ch: char, scale: Scale) -> Result<MathBox, RasterError> {
        let ch = self.resolve(ch)?;
        let glyph = self.font.glyph(ch).scaled(scale);
        let (ascent, descent) = match glyph.exact_bounding_box() {
            Some(bb) => ((-bb.min.y).max(0.0), bb.max.y.max(0.0)),
            None => (0.0, 0.0),
        };
        Ok(MathBox {
            width: glyph.h_metrics().advance_width,
            ascent,
            descent,
            ink: vec![Ink::Glyph {
                ch,
                x: 0.0,
                y: 0.0,
                scale,
            }],
        })
    }

    fn text(&self, text: &str, px: f32) -> Result<MathBox, RasterError> {
        let mut out = MathBox::default();
        let mut x = 0.0;
        for ch in text.chars() {
            let glyph = self.glyph(ch, Scale::uniform(px))?;
            let advance = glyph.width;
            out.place(glyph, x, 0.0);
            x += advance;
        }
        Ok(out)
    }

    fn sequence(&self, nodes: &[Node], px: f32) -> Result<MathBox, RasterError> {
        let classes = effective_classes(nodes);
        let mut out = MathBox::default();
        let mut x: f32 = 0.0;
        let mut prev: Option<AtomClass> = None;
        for (node, class) in nodes.iter().zip(classes) {
            if let (Some(left), Some(right)) = (prev, class) {
                x += spacing(left, right) * px;
            }
            let laid = self.node(node, px)?;
            let advance = laid.width;
            out.place(laid, x, 0.0);
            x += advance;
            if class.is_some() {
                prev = class;
            }
        }
        out.width = x.max(0.0);
        Ok(out)
    }

    fn node(&self, node: &Node, px: f32) -> Result<MathBox, RasterError> {
        match node {
            Node::Atom { text, class } => self.atom(text, *class, px),
            Node::Text(text) => self.text(text, px),
            Node::Group(nodes) => self.sequence(nodes, px),
            Node::Scripts { base, sup, sub } => {
                self.scripts(base, sup.as_deref(), sub.as_deref(), px)
            }
            Node::Frac {
                num,
                den,
                scale,
                bar,
            } => self.fraction(num, den, *scale, *bar, px),
            Node::Sqrt { index, body } => self.radical(index.as_deref(), body, px),
            Node::Accent { base, mark } => self.accent(base, *mark, px),
            Node::Space(em) => Ok(MathBox::space(em * px)),
        }
    }

    fn atom(&self, text: &str, class: AtomClass, px: f32) -> Result<MathBox, RasterError> {
        match class {
            AtomClass::Op { large: true, .. } => {
                let laid = self.text(text, px * LARGE_OP_SCALE)?;
                // centre on the math axis
                let dy = -self.axis(px) - (laid.descent - laid.ascent) / 2.0;
                let mut out = MathBox::default();
                out.place(laid, 0.0, dy);
                Ok(out)
            }
            _ => self.text(text, px),
        }
    }

    fn scripts(
        &self,
        base: &Node,
        sup: Option<&Node>,
        sub: Option<&Node>,
        px: f32,
    ) -> Result<MathBox, RasterError> {
        let base_box = self.node(base, px)?;
        let script_px = px * SCRIPT_SCALE;
        let sup_box = sup.map(|n| self.node(n, script_px)).transpose()?;
        let sub_box = sub.map(|n| self.node(n, script_px)).transpose()?;

        if matches!(base.class(), Some(AtomClass::Op { limits: true, .. })) {
            return Ok(self.limits(base_box, sup_box, sub_box, px));
        }

        let x = base_box.width + 0.04 * px;
        let mut sup_shift = (base_box.ascent - 0.3 * px).max(0.38 * px);
        let mut sub_shift = (base_box.descent + 0.05 * px).max(0.2 * px);
        if let (Some(sp), Some(sb)) = (&sup_box, &sub_box) {
            let clearance = (sup_shift - sp.descent) - (sb.ascent - sub_shift);
            let min_gap = 0.12 * px;
            if clearance < min_gap {
                sub_shift += (min_gap - clearance) / 2.0;
                sup_shift += (min_gap - clearance) / 2.0;
            }
        }

        let mut out = MathBox::default();
        out.place(base_box, 0.0, 0.0);
        if let Some(laid) = sup_box {
            out.place(laid, x, -sup_shift);
        }
        if let Some(laid) = sub_box {
            out.place(laid, x, sub_shift);
        }
        Ok(out)
    }

    /// Scripts stacked above and below a large operator.
    fn limits(
        &self,
        base: MathBox,
        sup: Option<MathBox>,
        sub: Option<MathBox>,
        px: f32,
    ) -> MathBox {
        let gap = 0.15 * px;
        let width = [
            Some(base.width),
            sup.as_ref().map(|b| b.width),
            sub.as_ref().map(|b| b.width),
        ]
        .into_iter()
        .flatten()
        .fold(0.0f32, f32::max);

        let (ascent, descent) = (base.ascent, base.descent);
        let mut out = MathBox::default();
        let base_x = (width - base.width) / 2.0;
        out.place(base, base_x, 0.0);
        if let Some(laid) = sup {
            let dy = -(ascent + gap + laid.descent);
            let sx = (width - laid.width) / 2.0;
            out.place(laid, sx, dy);
        }
        if let Some(laid) = sub {
            let dy = descent + gap + laid.ascent;
            let sx = (width - laid.width) / 2.0;
            out.place(laid, sx, dy);
        }
        out
    }

    fn fraction(
        &self,
        num: &Node,
        den: &Node,
        scale: f32,
        bar: bool,
        px: f32,
    ) -> Result<MathBox, RasterError> {
        let part_px = px * scale;
        let num_box = self.node(num, part_px)?;
        let den_box = self.node(den, part_px)?;

        let thickness = if bar { RULE_THICKNESS * px } else { 0.0 };
        let gap = if bar { 0.12 * px } else { 0.2 * px };
        let pad = 0.1 * px;
        let inner = num_box.width.max(den_box.width);
        let bar_top = -self.axis(px) - thickness / 2.0;
        let num_dy = bar_top - gap - num_box.descent;
        let den_dy = bar_top + thickness + gap + den_box.ascent;
        let num_x = pad + (inner - num_box.width) / 2.0;
        let den_x = pad + (inner - den_box.width) / 2.0;

        let mut out = MathBox::default();
        out.place(num_box, num_x, num_dy);
        out.place(den_box, den_x, den_dy);
        if bar {
            out.rule(pad / 2.0, bar_top, inner + pad, thickness);
        }
        out.width = inner + 2.0 * pad;
        Ok(out)
    }

    fn radical(&self, index: Option<&Node>, body: &Node, px: f32) -> Result<MathBox, RasterError> {
        let body_box = self.node(body, px)?;
        let thickness = RULE_THICKNESS * px;
        let gap = 0.12 * px;
        let top = -(body_box.ascent + gap + thickness);
        let target = body_box.descent.max(0.05 * px) - top;

        let radical = self.resolve('\u{221a}')?;
        let (natural_top, natural_bottom) = self
            .extent(radical, Scale::uniform(px))
            .ok_or(RasterError::MissingGlyph(radical))?;
        let stretch = (target / (natural_bottom - natural_top)).max(1.0);
        let scale = Scale {
            x: px,
            y: px * stretch,
        };
        let sign = self.glyph(radical, scale)?;
        let sign_right = self
            .font
            .glyph(radical)
            .scaled(scale)
            .exact_bounding_box()
            .map_or(sign.width, |bb| bb.max.x);
        let sign_dy = top - natural_top * stretch;

        let mut out = MathBox::default();
        let mut x = 0.0;
        if let Some(index) = index {
            let index_box = self.node(index, px * 0.6)?;
            let index_width = index_box.width;
            out.place(index_box, 0.0, top * 0.45);
            x = (index_width - 0.3 * sign_right).max(0.0);
        }
        let body_width = body_box.width;
        out.place(sign, x, sign_dy);
        out.place(body_box, x + sign_right + 0.05 * px, 0.0);
        out.rule(
            x + sign_right - thickness / 2.0,
            top,
            body_width + 0.1 * px + thickness / 2.0,
            thickness,
        );
        out.width = x + sign_right + body_width + 0.15 * px;
        Ok(out)
    }

    fn accent(&self, base: &Node, mark: AccentMark, px: f32) -> Result<MathBox, RasterError> {
        let base_box = self.node(base, px)?;
        let thickness = RULE_THICKNESS * px;
        let (width, ascent, descent) = (base_box.width, base_box.ascent, base_box.descent);

        let mut out = MathBox::default();
        out.place(base_box, 0.0, 0.0);
        match mark {
            AccentMark::Overline => out.rule(0.0, -(ascent + 0.1 * px + thickness), width, thickness),
            AccentMark::Underline => out.rule(0.0, descent + 0.1 * px, width, thickness),
            AccentMark::Glyph(c) => {
                let mark_px = if c == '\u{2192}' { 0.7 * px } else { px };
                let scale = Scale::uniform(mark_px);
                let resolved = self.resolve(c)?;
                if let Some((_, bottom)) = self.extent(resolved, scale) {
                    let mark_box = self.glyph(resolved, scale)?;
                    let x = (width - mark_box.width) / 2.0;
                    let dy = -(ascent + 0.08 * px) - bottom;
                    out.place(mark_box, x, dy);
                }
            }
        }
        out.width = width;
        Ok(out)
    }
}

fn rule_pixels(x: f32, y: f32, width: f32, height: f32) -> (i32, i32, i32, i32) {
    let x0 = x.round() as i32;
    let y0 = y.round() as i32;
    let x1 = ((x + width).round() as i32).max(x0 + 1);
    let y1 = ((y + height).round() as i32).max(y0 + 1);
    (x0, y0, x1, y1)
}

/// Coverage buffer; 0 is untouched paper, 255 full ink.
struct Canvas {
    width: i32,
    height: i32,
    coverage: Vec<u8>,
}

impl Canvas {
    fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            coverage: vec![0; (width * height) as usize],
        }
    }

    fn cover(&mut self, x: i32, y: i32, amount: f32) {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return;
        }
        let idx = (y * self.width + x) as usize;
        let value = (amount.clamp(0.0, 1.0) * 255.0).round() as u8;
        self.coverage[idx] = self.coverage[idx].max(value);
    }

    fn fill(&mut self, (x0, y0, x1, y1): (i32, i32, i32, i32)) {
        for y in y0..y1 {
            for x in x0..x1 {
                self.cover(x, y, 1.0);
            }
        }
    }

    /// Crops to the inked pixels plus `pad` on every side.
    fn crop(&self, pad: i32, dpi: u32) -> Result<RasterMath, RasterError> {
        let mut bounds: Option<(i32, i32, i32, i32)> = None;
        for y in 0..self.height {
            for x in 0..self.width {
                if self.coverage[(y * self.width + x) as usize] == 0 {
                    continue;
                }
                bounds = Some(match bounds {
                    None => (x, y, x + 1, y + 1),
                    Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x + 1), y1.max(y + 1)),
                });
            }
        }
        let (x0, y0, x1, y1) = bounds.ok_or(RasterError::EmptyImage)?;
        let left = (x0 - pad).max(0);
        let top = (y0 - pad).max(0);
        let right = (x1 + pad).min(self.width);
        let bottom = (y1 + pad).min(self.height);

        let mut pixels = Vec::with_capacity(((right - left) * (bottom - top)) as usize);
        for y in top..bottom {
            let row = (y * self.width) as usize;
            pixels.extend(
                self.coverage[row + left as usize..row + right as usize]
                    .iter()
                    .map(|c| 255 - c),
            );
        }
        RasterMath::new(pixels, (right - left) as u32, (bottom - top) as u32, dpi)
    }
}

fn ink_pixel_bounds(font: &Font<'static>, ink: &Ink) -> Option<(i32, i32, i32, i32)> {
    match *ink {
        Ink::Glyph { ch, x, y, scale } => font
            .glyph(ch)
            .scaled(scale)
            .positioned(point(x, y))
            .pixel_bounding_box()
            .map(|bb| (bb.min.x, bb.min.y, bb.max.x, bb.max.y)),
        Ink::Rule {
            x,
            y,
            width,
            height,
        } => Some(rule_pixels(x, y, width, height)),
    }
}

/// Paints laid-out ink centred on the draft canvas and crops the result.
fn paint(font: &Font<'static>, ink: &[Ink], options: &RasterOptions) -> Result<RasterMath, RasterError> {
    let bounds = ink
        .iter()
        .filter_map(|item| ink_pixel_bounds(font, item))
        .reduce(|a, b| (a.0.min(b.0), a.1.min(b.1), a.2.max(b.2), a.3.max(b.3)));
    let (min_x, min_y, max_x, max_y) = bounds.ok_or(RasterError::EmptyImage)?;

    let dpi = options.dpi as f32;
    let pad = (options.padding_in * dpi).round() as i32;
    let ink_w = max_x - min_x;
    let ink_h = max_y - min_y;
    let canvas_w = ((options.draft_width_in * dpi).round() as i32).max(ink_w + 2 * pad);
    let canvas_h = ((options.draft_height_in * dpi).round() as i32).max(ink_h + 2 * pad);
    if canvas_w > (options.draft_width_in * dpi) as i32 || canvas_h > (options.draft_height_in * dpi) as i32 {
        debug!("Formula exceeds draft canvas, growing to {}x{} px", canvas_w, canvas_h);
    }
    let off_x = ((canvas_w - ink_w) / 2 - min_x) as f32;
    let off_y = ((canvas_h - ink_h) / 2 - min_y) as f32;

    let mut canvas = Canvas::new(canvas_w, canvas_h);
    for item in ink {
        match item.shifted(off_x, off_y) {
            Ink::Glyph { ch, x, y, scale } => {
                let glyph = font.glyph(ch).scaled(scale).positioned(point(x, y));
                if let Some(bb) = glyph.pixel_bounding_box() {
                    glyph.draw(|gx, gy, v| canvas.cover(bb.min.x + gx as i32, bb.min.y + gy as i32, v));
                }
            }
            Ink::Rule {
                x,
                y,
                width,
                height,
            } => canvas.fill(rule_pixels(x, y, width, height)),
        }
    }
    canvas.crop(pad, options.dpi)
}

/// Default backend drawing formulas with glyphs from a system font.
pub struct GlyphBackend {
    font: Option<Font<'static>>,
}

impl GlyphBackend {
    /// Uses the configured font file or family, else the first installed
    /// candidate. The system lookup runs once per process.
    pub fn from_style(style: &MathStyle) -> Self {
        let font = if style.font_path.is_none() && style.font_family.is_none() {
            let cached: &'static Option<Vec<u8>> = &SYSTEM_MATH_FONT;
            cached.as_deref().and_then(Font::try_from_bytes)
        } else {
            find_math_font(style.font_path.as_deref(), style.font_family.as_deref())
                .and_then(Font::try_from_vec)
        };
        Self { font }
    }

    /// A backend without a font; every formula fails with [`RasterError::NoFont`].
    pub fn without_font() -> Self {
        Self { font: None }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }
}

impl MathBackend for GlyphBackend {
    fn rasterize(&self, formula: &str, options: &RasterOptions) -> Result<RasterMath, RasterError> {
        let nodes = parse_formula(formula)?;
        let font = self.font.as_ref().ok_or(RasterError::NoFont)?;
        let px = options.font_size * options.dpi as f32 / 72.0;
        let laid = Typesetter { font }.sequence(&nodes, px)?;
        paint(font, &laid.ink, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SolidBackend;

    impl MathBackend for SolidBackend {
        fn rasterize(&self, _formula: &str, options: &RasterOptions) -> Result<RasterMath, RasterError> {
            RasterMath::new(vec![0; 40 * 10], 40, 10, options.dpi)
        }
    }

    struct UnreachableBackend;

    impl MathBackend for UnreachableBackend {
        fn rasterize(&self, formula: &str, _options: &RasterOptions) -> Result<RasterMath, RasterError> {
            panic!("backend called with '{}'", formula);
        }
    }

    fn system_backend() -> Option<GlyphBackend> {
        let backend = GlyphBackend::from_style(&crate::styling::ReportStyle::default().math);
        backend.has_font().then_some(backend)
    }

    #[test]
    fn test_preprocess_short_comparisons() {
        assert_eq!(preprocess_formula(r"x \le 1"), r"x \leq 1");
        assert_eq!(preprocess_formula(r"x \ge 1"), r"x \geq 1");
        assert_eq!(preprocess_formula(r"x \leq 1 \geq 2"), r"x \leq 1 \geq 2");
        assert_eq!(preprocess_formula(r"\left( \right)"), r"\left( \right)");
        assert_eq!(preprocess_formula(r"a\le{b}"), r"a\leq{b}");
    }

    #[test]
    fn test_check_formula() {
        assert!(check_formula(r"a \le b").is_ok());
        assert!(check_formula(r"\frac{1}{2").is_err());
        assert!(check_formula(r"\notacommand").is_err());
    }

    #[test]
    fn test_raster_dimensions() {
        let raster = RasterMath::new(vec![255; 300 * 150], 300, 150, 300).unwrap();
        assert_eq!((raster.width_px(), raster.height_px(), raster.dpi()), (300, 150, 300));
        assert!((raster.aspect_ratio() - 0.5).abs() < 1e-6);
        assert!(RasterMath::new(vec![0; 10], 4, 4, 300).is_err());
        assert!(RasterMath::new(Vec::new(), 0, 0, 300).is_err());
    }

    #[test]
    fn test_empty_formula_short_circuits() {
        let rasterizer =
            MathRasterizer::with_backend(Box::new(UnreachableBackend), RasterOptions::default());
        assert_eq!(rasterizer.render(""), MathOutcome::Empty);
        assert_eq!(rasterizer.render("   \t "), MathOutcome::Empty);
    }

    #[test]
    fn test_backend_panic_is_contained() {
        let rasterizer =
            MathRasterizer::with_backend(Box::new(UnreachableBackend), RasterOptions::default());
        assert!(matches!(
            rasterizer.render("x"),
            MathOutcome::Failed(RasterError::Backend(_))
        ));
    }

    #[test]
    fn test_stub_backend_is_used() {
        let rasterizer =
            MathRasterizer::with_backend(Box::new(SolidBackend), RasterOptions::default());
        match rasterizer.render("E = mc^2") {
            MathOutcome::Rendered(raster) => assert_eq!(raster.width_px(), 40),
            other => panic!("expected raster, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_font_fails() {
        let rasterizer = MathRasterizer::with_backend(
            Box::new(GlyphBackend::without_font()),
            RasterOptions::default(),
        );
        assert_eq!(rasterizer.render("x"), MathOutcome::Failed(RasterError::NoFont));
    }

    #[test]
    fn test_unknown_command_fails_before_drawing() {
        let rasterizer = MathRasterizer::with_backend(
            Box::new(GlyphBackend::without_font()),
            RasterOptions::default(),
        );
        assert!(matches!(
            rasterizer.render(r"\foo{x}"),
            MathOutcome::Failed(RasterError::Formula(FormulaError::UnknownCommand(_)))
        ));
    }

    #[test]
    fn test_deeply_nested_formula_fails_cleanly() {
        let rasterizer = MathRasterizer::with_backend(
            Box::new(GlyphBackend::without_font()),
            RasterOptions::default(),
        );
        let formula = format!("{}x{}", "{".repeat(100_000), "}".repeat(100_000));
        assert_eq!(
            rasterizer.render(&formula),
            MathOutcome::Failed(RasterError::Formula(FormulaError::TooDeep))
        );
        assert_eq!(check_formula(&formula), Err(FormulaError::TooDeep));
    }

    #[test]
    fn test_effective_classes_demote_unary_minus() {
        let nodes = parse_formula("-a+b").unwrap();
        let classes = effective_classes(&nodes);
        assert_eq!(classes[0], Some(AtomClass::Ord));
        assert_eq!(classes[2], Some(AtomClass::Bin));
    }

    #[test]
    fn test_glyph_backend_renders_cropped_raster() {
        let Some(backend) = system_backend() else {
            eprintln!("no system font available, skipping");
            return;
        };
        let options = RasterOptions::default();
        let raster = backend.rasterize("x^2 + y^2 = z^2", &options).unwrap();
        assert!(raster.width_px() > raster.height_px());
        // cropped well inside the 8 x 1.5 in draft canvas
        assert!(raster.width_px() < 8 * 300);
        assert!(raster.height_px() < 450);

        let pad = 30;
        let width = raster.width_px() as usize;
        let first_row = &raster.pixels()[..width];
        assert!(first_row.iter().all(|&p| p == 255));
        assert!(raster.pixels().iter().any(|&p| p < 128));
        assert!(raster.height_px() as usize > 2 * pad);
    }

    #[test]
    fn test_fraction_is_taller_than_inline() {
        let Some(backend) = system_backend() else {
            return;
        };
        let options = RasterOptions::default();
        let flat = backend.rasterize("a b", &options).unwrap();
        let stacked = backend.rasterize(r"\frac{a}{b}", &options).unwrap();
        assert!(stacked.height_px() > flat.height_px());
    }

    #[test]
    fn test_wide_formula_grows_canvas() {
        let Some(backend) = system_backend() else {
            return;
        };
        let options = RasterOptions::default();
        let long = "a + ".repeat(60) + "a";
        let raster = backend.rasterize(&long, &options).unwrap();
        assert!(raster.width_px() > 8 * 300);
    }
}
