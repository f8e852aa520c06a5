//! Line-oriented block parser for the report dialect.
//!
//! The parser scans the source once, top to bottom, and classifies each
//! trimmed line by its leading content:
//!
//! | Line                         | Result                                   |
//! |------------------------------|------------------------------------------|
//! | `<!-- ... -->`               | dropped                                  |
//! | `# Title`                    | `Heading`                                |
//! | `---`                        | `Rule`                                   |
//! | `- item` / `* item`          | `ListItem`                               |
//! | contains `\|`                | `Table` (with following `\|` lines)      |
//! | `$$ ... $$`                  | `DisplayMath` (possibly multi-line)      |
//! | empty                        | `Blank`                                  |
//! | anything else                | buffered into a `Paragraph`              |
//!
//! Consecutive plain lines are joined with single spaces and emitted as one
//! paragraph when the next structural line (or the end of input) flushes them.
//! The parser knows nothing about fonts or pages.

use std::fs;
use std::path::Path;

use crate::ReportError;

/// The markdown source, split into lines. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    lines: Vec<String>,
}

impl SourceDocument {
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    /// Reads a UTF-8 markdown file.
    pub fn load(path: &Path) -> Result<Self, ReportError> {
        let text = fs::read_to_string(path).map_err(|e| ReportError::IoError {
            message: format!("Could not read markdown source: {}", e),
            path: path.display().to_string(),
            suggestion: "Check that the input file exists and is valid UTF-8".to_string(),
            source: Some(e),
        })?;
        Ok(Self::from_text(&text))
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// One structurally classified unit of markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// `#`..`######` heading; `level` is in `1..=6`.
    Heading { level: u8, text: String },
    /// `---` horizontal rule.
    Rule,
    /// `- ` or `* ` bullet; `text` still carries inline markup.
    ListItem { text: String },
    /// Pipe table without its alignment row. `raw_lines` keeps every source
    /// line, separator included, for the monospace fallback.
    Table {
        rows: Vec<Vec<String>>,
        raw_lines: Vec<String>,
    },
    /// `$$ ... $$` formula without delimiters.
    DisplayMath { formula: String },
    /// Space-joined run of plain lines; still carries inline markup.
    Paragraph { text: String },
    Blank,
}

impl Block {
    /// Short name of the block kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Block::Heading { .. } => "Heading",
            Block::Rule => "Rule",
            Block::ListItem { .. } => "ListItem",
            Block::Table { .. } => "Table",
            Block::DisplayMath { .. } => "DisplayMath",
            Block::Paragraph { .. } => "Paragraph",
            Block::Blank => "Blank",
        }
    }
}

/// Whether a table line is the markdown alignment row (`| --- | :-: |`).
pub fn is_separator_row(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.contains('-')
        && trimmed
            .chars()
            .all(|c| matches!(c, '-' | '|' | ':') || c.is_whitespace())
}

/// Splits a table line into trimmed cells, dropping the empty fields produced
/// by leading and trailing pipes.
pub fn split_table_row(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(|cell| cell.trim().to_string()).collect()
}

/// Single-pass block classifier over a [`SourceDocument`].
pub struct BlockParser<'a> {
    lines: &'a [String],
    position: usize,
    paragraph: Vec<String>,
    blocks: Vec<Block>,
}

impl<'a> BlockParser<'a> {
    pub fn new(source: &'a SourceDocument) -> Self {
        Self {
            lines: source.lines(),
            position: 0,
            paragraph: Vec::new(),
            blocks: Vec::new(),
        }
    }

    /// Consumes the source and returns the block sequence in document order.
    pub fn parse(mut self) -> Vec<Block> {
        while self.position < self.lines.len() {
            let line = self.lines[self.position].trim();
            self.position += 1;
            self.classify(line);
        }
        self.flush();
        self.blocks
    }

    fn classify(&mut self, line: &str) {
        if line.starts_with("<!--") {
            return;
        }

        if line.starts_with('#') {
            self.flush();
            let hashes = line.chars().take_while(|&c| c == '#').count();
            let level = hashes.min(6) as u8;
            let text = line.trim_start_matches('#').trim().to_string();
            self.blocks.push(Block::Heading { level, text });
        } else if line.starts_with("---") {
            self.flush();
            self.blocks.push(Block::Rule);
        } else if line.starts_with("- ") || line.starts_with("* ") {
            self.flush();
            self.blocks.push(Block::ListItem {
                text: line[2..].to_string(),
            });
        } else if line.contains('|') {
            self.flush();
            let table = self.collect_table(line);
            self.blocks.push(table);
        } else if line.starts_with("$$") {
            self.flush();
            let formula = self.collect_display_math(line);
            self.blocks.push(Block::DisplayMath { formula });
        } else if line.is_empty() {
            self.flush();
            self.blocks.push(Block::Blank);
        } else {
            self.paragraph.push(line.to_string());
        }
    }

    /// Emits the pending paragraph, if any.
    fn flush(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }
        let text = self.paragraph.join(" ");
        self.paragraph.clear();
        self.blocks.push(Block::Paragraph { text });
    }

    fn collect_table(&mut self, first: &str) -> Block {
        let mut raw_lines = vec![first.to_string()];
        while self.position < self.lines.len() && self.lines[self.position].contains('|') {
            raw_lines.push(self.lines[self.position].trim().to_string());
            self.position += 1;
        }

        let rows = raw_lines
            .iter()
            .filter(|line| !is_separator_row(line))
            .map(|line| split_table_row(line))
            .collect();

        Block::Table { rows, raw_lines }
    }

    fn collect_display_math(&mut self, first: &str) -> String {
        if first.len() > 2 && first.ends_with("$$") {
            return first.trim_matches('$').trim().to_string();
        }

        let mut fragments = vec![first.trim_start_matches('$').trim().to_string()];
        let mut closed = false;
        while self.position < self.lines.len() {
            let line = self.lines[self.position].trim();
            self.position += 1;
            fragments.push(line.trim_matches('$').trim().to_string());
            if line.ends_with("$$") {
                closed = true;
                break;
            }
        }
        if !closed {
            log::debug!("Display math block not closed before end of input");
        }

        fragments
            .into_iter()
            .filter(|f| !f.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Parses markdown text into blocks.
///
/// # Example
/// ```rust
/// use md2report::markdown::{parse_blocks, Block};
///
/// let blocks = parse_blocks("# Title\n\nfirst line\nsecond line");
/// assert_eq!(blocks[0], Block::Heading { level: 1, text: "Title".to_string() });
/// assert_eq!(blocks[1], Block::Blank);
/// assert_eq!(blocks[2], Block::Paragraph { text: "first line second line".to_string() });
/// ```
pub fn parse_blocks(markdown: &str) -> Vec<Block> {
    let source = SourceDocument::from_text(markdown);
    BlockParser::new(&source).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heading(level: u8, text: &str) -> Block {
        Block::Heading {
            level,
            text: text.to_string(),
        }
    }

    fn paragraph(text: &str) -> Block {
        Block::Paragraph {
            text: text.to_string(),
        }
    }

    fn math(formula: &str) -> Block {
        Block::DisplayMath {
            formula: formula.to_string(),
        }
    }

    #[test]
    fn test_end_to_end_block_sequence() {
        let md = "# Title\n\nSome **bold** and *italic* text.\n\n$$ E = mc^2 $$\n\n- item one\n- item two\n";
        let blocks = parse_blocks(md);
        assert_eq!(
            blocks,
            vec![
                heading(1, "Title"),
                Block::Blank,
                paragraph("Some **bold** and *italic* text."),
                Block::Blank,
                math("E = mc^2"),
                Block::Blank,
                Block::ListItem {
                    text: "item one".to_string()
                },
                Block::ListItem {
                    text: "item two".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_heading_levels() {
        let blocks = parse_blocks("# One\n## Two\n###### Six\n######## Deep");
        assert_eq!(blocks[0], heading(1, "One"));
        assert_eq!(blocks[1], heading(2, "Two"));
        assert_eq!(blocks[2], heading(6, "Six"));
        assert_eq!(blocks[3], heading(6, "Deep"));
    }

    #[test]
    fn test_heading_without_space() {
        assert_eq!(parse_blocks("##Tight"), vec![heading(2, "Tight")]);
    }

    #[test]
    fn test_rule_and_list_markers() {
        let blocks = parse_blocks("---\n* star item\n- dash item\n-not a list");
        assert_eq!(blocks[0], Block::Rule);
        assert_eq!(
            blocks[1],
            Block::ListItem {
                text: "star item".to_string()
            }
        );
        assert_eq!(
            blocks[2],
            Block::ListItem {
                text: "dash item".to_string()
            }
        );
        assert_eq!(blocks[3], paragraph("-not a list"));
    }

    #[test]
    fn test_paragraph_lines_coalesce() {
        let blocks = parse_blocks("one\ntwo\n  three  ");
        assert_eq!(blocks, vec![paragraph("one two three")]);
    }

    #[test]
    fn test_comment_is_invisible() {
        let with_comment = parse_blocks("first half\n<!-- note -->\nsecond half");
        let without = parse_blocks("first half\nsecond half");
        assert_eq!(with_comment, without);
        assert_eq!(with_comment, vec![paragraph("first half second half")]);
    }

    #[test]
    fn test_structural_line_flushes_paragraph() {
        let blocks = parse_blocks("text\n# Head\nmore");
        assert_eq!(
            blocks,
            vec![paragraph("text"), heading(1, "Head"), paragraph("more")]
        );
    }

    #[test]
    fn test_table_with_separator() {
        let md = "| Name | Value |\n| --- | :---: |\n| a | 1 |\n| b | 2 |\nafter";
        let blocks = parse_blocks(md);
        match &blocks[0] {
            Block::Table { rows, raw_lines } => {
                assert_eq!(rows.len(), 3);
                assert_eq!(rows[0], vec!["Name", "Value"]);
                assert_eq!(rows[2], vec!["b", "2"]);
                assert_eq!(raw_lines.len(), 4);
            }
            other => panic!("expected table, got {:?}", other),
        }
        assert_eq!(blocks[1], paragraph("after"));
    }

    #[test]
    fn test_table_without_outer_pipes() {
        let blocks = parse_blocks("a | b\nc | d");
        assert_eq!(
            blocks,
            vec![Block::Table {
                rows: vec![vec!["a".into(), "b".into()], vec!["c".into(), "d".into()]],
                raw_lines: vec!["a | b".into(), "c | d".into()],
            }]
        );
    }

    #[test]
    fn test_separator_detection() {
        assert!(is_separator_row("| --- | --- |"));
        assert!(is_separator_row("|:--|--:|"));
        assert!(!is_separator_row("| a | - |"));
        assert!(!is_separator_row("| | |"));
    }

    #[test]
    fn test_single_line_display_math() {
        assert_eq!(parse_blocks("$$x + y$$"), vec![math("x + y")]);
    }

    #[test]
    fn test_multi_line_display_math() {
        let blocks = parse_blocks("$$\n a \\le b \n$$");
        assert_eq!(blocks, vec![math("a \\le b")]);
    }

    #[test]
    fn test_multi_line_math_with_inline_delimiters() {
        let blocks = parse_blocks("$$ x =\n y + z\n w $$\nafter");
        assert_eq!(blocks, vec![math("x = y + z w"), paragraph("after")]);
    }

    #[test]
    fn test_unterminated_math_takes_rest() {
        let blocks = parse_blocks("$$\na\nb");
        assert_eq!(blocks, vec![math("a b")]);
    }

    #[test]
    fn test_blank_lines() {
        let blocks = parse_blocks("a\n\n   \nb");
        assert_eq!(
            blocks,
            vec![paragraph("a"), Block::Blank, Block::Blank, paragraph("b")]
        );
    }

    #[test]
    fn test_empty_source() {
        assert!(parse_blocks("").is_empty());
        assert!(SourceDocument::from_text("").is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let err = SourceDocument::load(Path::new("/nonexistent/input.md")).unwrap_err();
        assert!(matches!(err, ReportError::IoError { .. }));
    }
}
