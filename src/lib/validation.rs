//! Pre-flight checks run before rendering (and alone with `--dry-run`).
//!
//! Nothing here is fatal. Every finding is a human-readable warning about
//! something that will render in a degraded way: a formula that falls back to
//! monospace text, a table printed as raw lines, markup shown literally or
//! characters that get transliterated.

use std::path::Path;

use crate::fonts::unencodable_chars;
use crate::inline::unmatched_delimiters;
use crate::latex::check_formula;
use crate::markdown::{parse_blocks, Block};

/// Line numbers (1-based) of `$$` blocks that never close.
fn unterminated_math(markdown: &str) -> Vec<usize> {
    let mut open: Option<usize> = None;
    let mut found = Vec::new();
    for (i, raw) in markdown.lines().enumerate() {
        let line = raw.trim();
        if open.is_some() {
            if line.ends_with("$$") {
                open = None;
            }
            continue;
        }
        let other_block = line.starts_with('#')
            || line.starts_with("---")
            || line.starts_with("- ")
            || line.starts_with("* ")
            || line.contains('|');
        if other_block || !line.starts_with("$$") {
            continue;
        }
        if !(line.len() > 2 && line.ends_with("$$")) {
            open = Some(i + 1);
        }
    }
    found.extend(open);
    found
}

fn check_inline(kind: &str, text: &str, warnings: &mut Vec<String>) {
    let (bold, dollars) = unmatched_delimiters(text);
    if bold > 0 {
        warnings.push(format!(
            "{} \"{}\" has an unmatched ** and will show it literally",
            kind,
            excerpt(text)
        ));
    }
    if dollars > 0 {
        warnings.push(format!(
            "{} \"{}\" has an unmatched $ and will show it literally",
            kind,
            excerpt(text)
        ));
    }
}

fn excerpt(text: &str) -> String {
    const MAX: usize = 40;
    if text.chars().count() <= MAX {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(MAX).collect::<String>())
    }
}

/// Checks markdown content and returns warnings for degraded renderings.
///
/// # Example
/// ```rust
/// use md2report::validation::validate_markdown;
///
/// assert!(validate_markdown("# Title\n\n$$x^2$$").is_empty());
/// let warnings = validate_markdown("$$\\unknowncommand$$");
/// assert_eq!(warnings.len(), 1);
/// ```
pub fn validate_markdown(markdown: &str) -> Vec<String> {
    let mut warnings = Vec::new();

    for line in unterminated_math(markdown) {
        warnings.push(format!(
            "Display math opened on line {} is never closed with $$; the rest of the document becomes one formula",
            line
        ));
    }

    for block in parse_blocks(markdown) {
        match &block {
            Block::Heading { text, .. } => check_inline("Heading", text, &mut warnings),
            Block::ListItem { text } => check_inline("List item", text, &mut warnings),
            Block::Paragraph { text } => check_inline("Paragraph", text, &mut warnings),
            Block::Table { rows, raw_lines } => {
                let header = rows.first().map_or(0, Vec::len);
                if rows.iter().any(|row| row.len() != header) {
                    warnings.push(format!(
                        "Table starting with \"{}\" has rows with inconsistent column counts",
                        excerpt(raw_lines.first().map_or("", String::as_str))
                    ));
                }
            }
            Block::DisplayMath { formula } => {
                if let Err(e) = check_formula(formula) {
                    warnings.push(format!(
                        "Formula \"{}\" cannot be typeset ({}); it will be printed as text",
                        excerpt(formula),
                        e
                    ));
                }
            }
            Block::Rule | Block::Blank => {}
        }
    }

    let missing = unencodable_chars(markdown);
    if !missing.is_empty() {
        let listed = missing
            .iter()
            .map(|c| format!("U+{:04X} ({})", *c as u32, c))
            .collect::<Vec<_>>()
            .join(", ");
        warnings.push(format!(
            "{} character(s) outside the built-in font encoding will be transliterated: {}",
            missing.len(),
            listed
        ));
    }

    warnings
}

/// Validates the markdown and, when given, that the output location is usable.
pub fn validate_conversion(markdown: &str, output_path: Option<&str>) -> Vec<String> {
    let mut warnings = Vec::new();
    if markdown.trim().is_empty() {
        warnings.push("Input is empty; the report will contain only header and footer".to_string());
    }
    warnings.extend(validate_markdown(markdown));

    if let Some(path) = output_path {
        let parent = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(dir) = parent {
            if !dir.exists() {
                warnings.push(format!("Output directory {} does not exist", dir.display()));
            }
        }
    }
    warnings
}
