//! Page layout engine.
//!
//! Consumes parsed [`Block`]s in order and turns them into absolutely
//! positioned [`Placement`]s on A4-style pages. The engine owns the page
//! cursor and the equation counter, so every call to [`LayoutEngine::layout`]
//! starts a fresh document with equation (1).
//!
//! A block that fits on a fresh page but not in the space left on the current
//! one moves whole to the next page. Blocks taller than a page are split line
//! by line (row by row for tables).

use log::{debug, warn};

use crate::fonts::{BuiltinFont, PT_PER_MM};
use crate::inline::{format_inline, RunStyle, StyledRun};
use crate::latex::{MathOutcome, MathRasterizer, RasterMath};
use crate::markdown::Block;
use crate::styling::{ReportStyle, TextAlignment};

const BULLET: &str = "\u{2022}";

/// One drawing instruction. Coordinates are millimetres from the top-left
/// corner of the page; text `y` is the baseline.
#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    Text {
        x: f32,
        y: f32,
        font: BuiltinFont,
        size: f32,
        text: String,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        width: f32,
    },
    /// Stroked rectangle; `y` is the top edge.
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        line_width: f32,
    },
    /// Raster image; `y` is the top edge.
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        raster: RasterMath,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 1-based page number.
    pub number: u32,
    pub placements: Vec<Placement>,
}

impl Page {
    /// Text of every text placement, in placement order.
    pub fn texts(&self) -> Vec<&str> {
        self.placements
            .iter()
            .filter_map(|p| match p {
                Placement::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn image_count(&self) -> usize {
        self.placements
            .iter()
            .filter(|p| matches!(p, Placement::Image { .. }))
            .count()
    }
}

/// Where a block ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedBlock {
    /// Position of the block in the input sequence.
    pub index: usize,
    pub kind: &'static str,
    /// Page on which the block starts.
    pub page: u32,
}

/// Result of laying out a whole document.
#[derive(Debug, Clone, PartialEq)]
pub struct LaidOutDocument {
    pub pages: Vec<Page>,
    /// Equation numbers in the order they were printed.
    pub equation_numbers: Vec<u32>,
    pub placed_blocks: Vec<PlacedBlock>,
    pub math_fallbacks: usize,
    pub table_fallbacks: usize,
}

/// Numbers successfully rendered display equations, starting at 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquationCounter {
    next: u32,
}

impl Default for EquationCounter {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl EquationCounter {
    /// The number the next equation will receive.
    pub fn peek(&self) -> u32 {
        self.next
    }

    /// Returns the next number and advances the counter.
    pub fn take(&mut self) -> u32 {
        let number = self.next;
        self.next += 1;
        number
    }
}

fn size_mm(size: f32) -> f32 {
    size / PT_PER_MM
}

/// Baseline of a line of `size`-point text in a band starting at `top`.
fn baseline(top: f32, line_height: f32, size: f32) -> f32 {
    top + (line_height + size_mm(size) * 0.7) / 2.0
}

fn run_font(style: RunStyle) -> BuiltinFont {
    match style {
        RunStyle::Plain => BuiltinFont::TimesRoman,
        RunStyle::Bold => BuiltinFont::TimesBold,
        RunStyle::Italic => BuiltinFont::TimesItalic,
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Fragment {
    font: BuiltinFont,
    text: String,
    width: f32,
}

/// A run of non-space characters, possibly mixing fonts.
#[derive(Debug, Clone, Default, PartialEq)]
struct Word {
    fragments: Vec<Fragment>,
    width: f32,
}

impl Word {
    fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    fn push(&mut self, font: BuiltinFont, ch: char) {
        match self.fragments.last_mut() {
            Some(last) if last.font == font => last.text.push(ch),
            _ => self.fragments.push(Fragment {
                font,
                text: ch.to_string(),
                width: 0.0,
            }),
        }
    }

    fn measured(mut self, size: f32) -> Self {
        for fragment in &mut self.fragments {
            fragment.width = fragment.font.text_width(&fragment.text, size);
        }
        self.width = self.fragments.iter().map(|f| f.width).sum();
        self
    }

    /// Breaks a word wider than `max_width` into pieces that fit.
    fn split(self, max_width: f32, size: f32) -> Vec<Word> {
        let mut pieces = Vec::new();
        let mut current = Word::default();
        let mut width = 0.0;
        for fragment in &self.fragments {
            for ch in fragment.text.chars() {
                let char_width = fragment.font.text_width(&ch.to_string(), size);
                if width + char_width > max_width && !current.is_empty() {
                    pieces.push(std::mem::take(&mut current).measured(size));
                    width = 0.0;
                }
                current.push(fragment.font, ch);
                width += char_width;
            }
        }
        if !current.is_empty() {
            pieces.push(current.measured(size));
        }
        pieces
    }
}

/// Splits styled runs into words; whitespace separates words.
fn build_words(runs: &[StyledRun], size: f32, font_for: impl Fn(RunStyle) -> BuiltinFont) -> Vec<Word> {
    let mut words = Vec::new();
    let mut current = Word::default();
    for run in runs {
        let font = font_for(run.style);
        for ch in run.text.chars() {
            if ch.is_whitespace() {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current).measured(size));
                }
            } else {
                current.push(font, ch);
            }
        }
    }
    if !current.is_empty() {
        words.push(current.measured(size));
    }
    words
}

fn words_in_font(text: &str, font: BuiltinFont, size: f32) -> Vec<Word> {
    build_words(&[StyledRun::plain(text)], size, |_| font)
}

#[derive(Debug, Clone, PartialEq)]
struct TextLine {
    words: Vec<Word>,
    /// Width with single spaces between words.
    natural_width: f32,
}

fn space_width(size: f32) -> f32 {
    BuiltinFont::TimesRoman.text_width(" ", size)
}

/// Greedy line breaking.
fn wrap_words(words: Vec<Word>, max_width: f32, size: f32) -> Vec<TextLine> {
    let space = space_width(size);
    let mut lines = Vec::new();
    let mut current: Vec<Word> = Vec::new();
    let mut width = 0.0;
    for word in words {
        let pieces = if word.width > max_width {
            word.split(max_width, size)
        } else {
            vec![word]
        };
        for piece in pieces {
            let needed = if current.is_empty() {
                piece.width
            } else {
                width + space + piece.width
            };
            if needed > max_width && !current.is_empty() {
                lines.push(TextLine {
                    words: std::mem::take(&mut current),
                    natural_width: width,
                });
                width = piece.width;
            } else {
                width = needed;
            }
            current.push(piece);
        }
    }
    if !current.is_empty() {
        lines.push(TextLine {
            words: current,
            natural_width: width,
        });
    }
    lines
}

/// Cuts text into chunks of at most `max_chars` characters, keeping spaces.
fn chunk_chars(text: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(max_chars.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
struct GridRow {
    cells: Vec<Vec<TextLine>>,
    height: f32,
    header: bool,
}

/// Table laid out as a grid of equal-width columns.
#[derive(Debug, Clone, PartialEq)]
pub struct TableGrid {
    column_width: f32,
    rows: Vec<GridRow>,
}

impl TableGrid {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, |r| r.cells.len())
    }

    pub fn column_width(&self) -> f32 {
        self.column_width
    }

    pub fn height(&self) -> f32 {
        self.rows.iter().map(|r| r.height).sum()
    }
}

/// Outcome of planning a table: a grid, or the raw source lines to print in
/// a monospace face.
#[derive(Debug, Clone, PartialEq)]
pub enum TableLayout {
    Grid(TableGrid),
    Raw(Vec<String>),
}

/// Plans the grid for a table block, falling back to its raw lines when the
/// rows cannot be arranged in a grid that fits the page.
pub fn plan_table(style: &ReportStyle, rows: &[Vec<String>], raw_lines: &[String]) -> TableLayout {
    let table = &style.table;
    let size = table.size as f32;
    let raw = || TableLayout::Raw(raw_lines.to_vec());

    let Some(header) = rows.first() else {
        warn!("Table has no rows, printing raw lines");
        return raw();
    };
    let columns = header.len();
    if columns == 0 {
        return raw();
    }
    if let Some(row) = rows.iter().find(|r| r.len() > columns) {
        warn!(
            "Table row has {} cells but the header has {}, printing raw lines",
            row.len(),
            columns
        );
        return raw();
    }

    let column_width = style.usable_width() / columns as f32;
    let inner_width = column_width - 2.0 * table.padding;
    if inner_width < BuiltinFont::TimesBold.text_width("W", size) {
        warn!(
            "Table with {} columns is too wide for the page, printing raw lines",
            columns
        );
        return raw();
    }

    let grid_rows = rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let font = if idx == 0 {
                BuiltinFont::TimesBold
            } else {
                BuiltinFont::TimesRoman
            };
            let cells: Vec<Vec<TextLine>> = (0..columns)
                .map(|col| {
                    let text = row.get(col).map(|c| c.replace('$', "")).unwrap_or_default();
                    wrap_words(words_in_font(&text, font, size), inner_width, size)
                })
                .collect();
            let lines = cells.iter().map(Vec::len).max().unwrap_or(0).max(1);
            GridRow {
                cells,
                height: lines as f32 * table.line_height + 2.0 * table.padding,
                header: idx == 0,
            }
        })
        .collect();

    TableLayout::Grid(TableGrid {
        column_width,
        rows: grid_rows,
    })
}

/// Current page and vertical write position.
#[derive(Debug)]
struct PageCursor {
    number: u32,
    top: f32,
    bottom: f32,
    y: f32,
    placements: Vec<Placement>,
}

impl PageCursor {
    fn new(number: u32, style: &ReportStyle) -> Self {
        Self {
            number,
            top: style.content_top(),
            bottom: style.content_bottom(),
            y: style.content_top(),
            placements: Vec::new(),
        }
    }

    fn remaining_height(&self) -> f32 {
        (self.bottom - self.y).max(0.0)
    }

    /// Nothing has been written below the header yet.
    fn is_fresh(&self) -> bool {
        self.y <= self.top
    }

    fn advance(&mut self, dy: f32) {
        self.y += dy;
    }

    /// Closes the page, adding the running header and footer.
    fn finalize(mut self, style: &ReportStyle) -> Page {
        let header_size = style.header.size as f32;
        let title = style.header.title.as_str();
        let title_width = BuiltinFont::TimesRoman.text_width(title, header_size);
        self.placements.push(Placement::Text {
            x: style.page_width - style.margins.right - title_width,
            y: baseline(style.margins.top, style.header.height, header_size),
            font: BuiltinFont::TimesRoman,
            size: header_size,
            text: title.to_string(),
        });

        let footer_size = style.footer.size as f32;
        let number = self.number.to_string();
        let number_width = BuiltinFont::TimesRoman.text_width(&number, footer_size);
        self.placements.push(Placement::Text {
            x: style.margins.left + (style.usable_width() - number_width) / 2.0,
            y: baseline(style.page_height - style.footer.offset, style.footer.height, footer_size),
            font: BuiltinFont::TimesRoman,
            size: footer_size,
            text: number,
        });

        Page {
            number: self.number,
            placements: self.placements,
        }
    }
}

/// Lays out blocks onto pages.
pub struct LayoutEngine<'a> {
    style: &'a ReportStyle,
    rasterizer: &'a MathRasterizer,
    cursor: PageCursor,
    pages: Vec<Page>,
    equations: EquationCounter,
    equation_numbers: Vec<u32>,
    placed_blocks: Vec<PlacedBlock>,
    /// Block whose first placement has not been made yet.
    pending: Option<(usize, &'static str)>,
    math_fallbacks: usize,
    table_fallbacks: usize,
}

impl<'a> LayoutEngine<'a> {
    pub fn new(style: &'a ReportStyle, rasterizer: &'a MathRasterizer) -> Self {
        Self {
            style,
            rasterizer,
            cursor: PageCursor::new(1, style),
            pages: Vec::new(),
            equations: EquationCounter::default(),
            equation_numbers: Vec::new(),
            placed_blocks: Vec::new(),
            pending: None,
            math_fallbacks: 0,
            table_fallbacks: 0,
        }
    }

    /// Lays out all blocks and returns the finished pages. There is always at
    /// least one page.
    pub fn layout(mut self, blocks: &[Block]) -> LaidOutDocument {
        for (index, block) in blocks.iter().enumerate() {
            debug!("Laying out block {} ({})", index, block.kind());
            self.block(index, block);
        }

        let style = self.style;
        let last = self.cursor.finalize(style);
        self.pages.push(last);
        debug!("Layout finished with {} pages", self.pages.len());

        LaidOutDocument {
            pages: self.pages,
            equation_numbers: self.equation_numbers,
            placed_blocks: self.placed_blocks,
            math_fallbacks: self.math_fallbacks,
            table_fallbacks: self.table_fallbacks,
        }
    }

    fn block(&mut self, index: usize, block: &Block) {
        self.pending = Some((index, block.kind()));
        match block {
            Block::Heading { level, text } => self.heading(*level, text),
            Block::Rule => self.rule(),
            Block::ListItem { text } => self.list_item(text),
            Block::Table { rows, raw_lines } => self.table(rows, raw_lines),
            Block::DisplayMath { formula } => self.display_math(formula),
            Block::Paragraph { text } => self.paragraph(text),
            Block::Blank => self.cursor.advance(self.style.blank_spacing),
        }
        // blocks that drew nothing are recorded where the cursor ended
        self.record_pending();
    }

    fn record_pending(&mut self) {
        if let Some((index, kind)) = self.pending.take() {
            self.placed_blocks.push(PlacedBlock {
                index,
                kind,
                page: self.cursor.number,
            });
        }
    }

    fn break_page(&mut self) {
        let next = PageCursor::new(self.cursor.number + 1, self.style);
        let finished = std::mem::replace(&mut self.cursor, next).finalize(self.style);
        debug!("Page {} finished", finished.number);
        self.pages.push(finished);
    }

    /// Starts a new page unless `height` fits below the cursor. A block taller
    /// than a fresh page never triggers a break on its own.
    fn ensure_room(&mut self, height: f32) {
        if height <= self.cursor.remaining_height() || self.cursor.is_fresh() {
            return;
        }
        if height <= self.style.usable_height() {
            self.break_page();
        }
    }

    /// Like [`ensure_room`](Self::ensure_room) for one unit that must not be split.
    fn ensure_unit(&mut self, height: f32) {
        if height > self.cursor.remaining_height() && !self.cursor.is_fresh() {
            self.break_page();
        }
    }

    fn push(&mut self, placement: Placement) {
        self.record_pending();
        self.cursor.placements.push(placement);
    }

    #[allow(clippy::too_many_arguments)]
    fn place_line(
        &mut self,
        line: &TextLine,
        x: f32,
        top: f32,
        max_width: f32,
        size: f32,
        line_height: f32,
        align: TextAlignment,
        last: bool,
    ) {
        let space = space_width(size);
        let slack = (max_width - line.natural_width).max(0.0);
        let (mut pen, gap) = match align {
            TextAlignment::Left => (x, space),
            TextAlignment::Center => (x + slack / 2.0, space),
            TextAlignment::Justify if !last && line.words.len() > 1 => {
                (x, space + slack / (line.words.len() - 1) as f32)
            }
            TextAlignment::Justify => (x, space),
        };
        let y = baseline(top, line_height, size);
        for word in &line.words {
            let mut fx = pen;
            for fragment in &word.fragments {
                self.push(Placement::Text {
                    x: fx,
                    y,
                    font: fragment.font,
                    size,
                    text: fragment.text.clone(),
                });
                fx += fragment.width;
            }
            pen += word.width + gap;
        }
    }

    /// Places wrapped lines at the cursor, moving to a new page when needed.
    fn flow_lines(
        &mut self,
        lines: &[TextLine],
        x: f32,
        max_width: f32,
        size: f32,
        line_height: f32,
        align: TextAlignment,
    ) {
        self.ensure_room(lines.len() as f32 * line_height);
        for (i, line) in lines.iter().enumerate() {
            self.ensure_unit(line_height);
            let top = self.cursor.y;
            self.place_line(line, x, top, max_width, size, line_height, align, i + 1 == lines.len());
            self.cursor.advance(line_height);
        }
    }

    fn heading(&mut self, level: u8, text: &str) {
        let style = self.style.heading(level);
        let size = style.size as f32;
        let width = self.style.usable_width();
        let align = if self.style.is_centered_heading(text) {
            TextAlignment::Center
        } else {
            TextAlignment::Justify
        };
        let lines = wrap_words(words_in_font(text, BuiltinFont::TimesBold, size), width, size);
        if lines.is_empty() {
            self.ensure_room(style.line_height);
            self.cursor.advance(style.line_height);
        } else {
            let x = self.style.margins.left;
            self.flow_lines(&lines, x, width, size, style.line_height, align);
        }
        self.cursor.advance(style.after_spacing);
    }

    fn rule(&mut self) {
        let rule = self.style.horizontal_rule;
        self.cursor.advance(rule.before_spacing);
        self.ensure_unit(rule.thickness);
        let y = self.cursor.y;
        let left = self.style.margins.left;
        self.push(Placement::Line {
            x1: left,
            y1: y,
            x2: left + self.style.usable_width(),
            y2: y,
            width: rule.thickness,
        });
        self.cursor.advance(rule.after_spacing);
    }

    fn list_item(&mut self, text: &str) {
        let list = self.style.list_item;
        let size = list.text.size as f32;
        let text_x = self.style.margins.left + list.indent + list.bullet_width;
        let width = self.style.usable_width() - list.indent - list.bullet_width;
        let lines = wrap_words(build_words(&format_inline(text), size, run_font), width, size);

        self.ensure_room(lines.len().max(1) as f32 * list.text.line_height);
        self.ensure_unit(list.text.line_height);
        let bullet_width = BuiltinFont::TimesRoman.text_width(BULLET, size);
        let y = baseline(self.cursor.y, list.text.line_height, size);
        self.push(Placement::Text {
            x: text_x - bullet_width,
            y,
            font: BuiltinFont::TimesRoman,
            size,
            text: BULLET.to_string(),
        });

        if lines.is_empty() {
            self.cursor.advance(list.text.line_height);
        } else {
            self.flow_lines(&lines, text_x, width, size, list.text.line_height, TextAlignment::Left);
        }
        self.cursor.advance(list.text.after_spacing);
    }

    fn paragraph(&mut self, text: &str) {
        let style = self.style.text;
        let size = style.size as f32;
        let width = self.style.usable_width();
        let lines = wrap_words(build_words(&format_inline(text), size, run_font), width, size);
        let x = self.style.margins.left;
        self.flow_lines(&lines, x, width, size, style.line_height, TextAlignment::Justify);
        self.cursor.advance(style.after_spacing);
    }

    fn table(&mut self, rows: &[Vec<String>], raw_lines: &[String]) {
        let table = self.style.table;
        self.cursor.advance(table.before_spacing);
        match plan_table(self.style, rows, raw_lines) {
            TableLayout::Grid(grid) => self.place_grid(&grid),
            TableLayout::Raw(lines) => {
                self.table_fallbacks += 1;
                self.place_raw_lines(&lines);
            }
        }
        self.cursor.advance(table.after_spacing);
    }

    fn place_grid(&mut self, grid: &TableGrid) {
        self.ensure_room(grid.height());
        let header = grid.rows.first().filter(|r| r.header);
        for row in &grid.rows {
            if row.height > self.cursor.remaining_height() && !self.cursor.is_fresh() {
                self.break_page();
                // repeat the header row at the top of the continuation page
                if let Some(header) = header {
                    if !row.header {
                        self.place_row(header, grid.column_width);
                    }
                }
            }
            self.place_row(row, grid.column_width);
        }
    }

    fn place_row(&mut self, row: &GridRow, column_width: f32) {
        let table = self.style.table;
        let size = table.size as f32;
        let top = self.cursor.y;
        for (col, cell) in row.cells.iter().enumerate() {
            let x = self.style.margins.left + col as f32 * column_width;
            self.push(Placement::Rect {
                x,
                y: top,
                width: column_width,
                height: row.height,
                line_width: 0.2,
            });
            for (i, line) in cell.iter().enumerate() {
                let line_top = top + table.padding + i as f32 * table.line_height;
                self.place_line(
                    line,
                    x + table.padding,
                    line_top,
                    column_width - 2.0 * table.padding,
                    size,
                    table.line_height,
                    TextAlignment::Left,
                    true,
                );
            }
        }
        self.cursor.advance(row.height);
    }

    /// Prints lines verbatim in Courier, wrapping at the right margin.
    fn place_raw_lines(&mut self, lines: &[String]) {
        let fallback = self.style.table.fallback;
        self.place_monospace(lines, fallback.size as f32, fallback.line_height, TextAlignment::Left);
    }

    fn place_monospace(&mut self, lines: &[String], size: f32, line_height: f32, align: TextAlignment) {
        let width = self.style.usable_width();
        let char_width = BuiltinFont::Courier.text_width("M", size);
        let max_chars = (width / char_width).floor() as usize;
        let chunks: Vec<String> = lines
            .iter()
            .flat_map(|line| chunk_chars(line, max_chars))
            .collect();

        self.ensure_room(chunks.len() as f32 * line_height);
        for chunk in chunks {
            self.ensure_unit(line_height);
            let chunk_width = BuiltinFont::Courier.text_width(&chunk, size);
            let x = match align {
                TextAlignment::Center => self.style.margins.left + (width - chunk_width).max(0.0) / 2.0,
                _ => self.style.margins.left,
            };
            let y = baseline(self.cursor.y, line_height, size);
            self.push(Placement::Text {
                x,
                y,
                font: BuiltinFont::Courier,
                size,
                text: chunk,
            });
            self.cursor.advance(line_height);
        }
    }

    fn display_math(&mut self, formula: &str) {
        match self.rasterizer.render(formula) {
            MathOutcome::Rendered(raster) => self.place_equation(raster),
            MathOutcome::Empty => debug!("Skipping empty display formula"),
            MathOutcome::Failed(e) => {
                warn!("Printing formula '{}' as text: {}", formula, e);
                self.math_fallbacks += 1;
                let fallback = self.style.math.fallback;
                let lines = vec![formula.to_string()];
                self.place_monospace(&lines, fallback.size as f32, fallback.line_height, TextAlignment::Center);
            }
        }
    }

    fn place_equation(&mut self, raster: RasterMath) {
        let style = self.style;
        let math = &style.math;
        if self.cursor.remaining_height() < math.break_threshold && !self.cursor.is_fresh() {
            self.break_page();
        }

        let usable_width = self.style.usable_width();
        let usable_height = self.style.usable_height();
        let mut width = usable_width * math.width_fraction;
        let mut height = width * raster.aspect_ratio();
        if height > usable_height {
            width *= usable_height / height;
            height = usable_height;
        }
        self.ensure_unit(height);

        let top = self.cursor.y;
        let x = self.style.margins.left + (usable_width - width) / 2.0;
        self.push(Placement::Image {
            x,
            y: top,
            width,
            height,
            raster,
        });

        let number = self.equations.take();
        let size = math.number_size as f32;
        let label = format!("({})", number);
        let label_width = BuiltinFont::TimesRoman.text_width(&label, size);
        self.push(Placement::Text {
            x: self.style.margins.left + usable_width - label_width,
            y: top + height / 2.0 + size_mm(size) * 0.35,
            font: BuiltinFont::TimesRoman,
            size,
            text: label,
        });
        self.equation_numbers.push(number);
        debug!("Placed equation ({}) at y = {:.1} mm", number, top);

        self.cursor.advance(height + math.after_spacing);
    }
}
