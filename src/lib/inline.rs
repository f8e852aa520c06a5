//! Inline formatting of text spans.
//!
//! A span is split into styled runs by three passes applied in a fixed order:
//! `**bold**`, then `*italic*`, then `$math$`. Later passes only look at text
//! the earlier passes left plain, so markers never nest. Matching is lazy and
//! left to right; delimiters without a partner stay in the text as literals.
//! Inline math is not rasterized; it is shown as an italic run.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref BOLD: Regex = Regex::new(r"\*\*(.+?)\*\*").unwrap();
    static ref ITALIC: Regex = Regex::new(r"\*([^*]+?)\*").unwrap();
    static ref INLINE_MATH: Regex = Regex::new(r"\$([^$]+)\$").unwrap();
}

/// Style flag of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStyle {
    Plain,
    Bold,
    Italic,
}

/// A contiguous piece of text sharing one style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledRun {
    pub style: RunStyle,
    pub text: String,
}

impl StyledRun {
    pub fn new(style: RunStyle, text: impl Into<String>) -> Self {
        Self {
            style,
            text: text.into(),
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(RunStyle::Plain, text)
    }
}

/// Splits every plain run on `pattern`, turning captured group 1 into a run
/// of `style`.
fn apply_pass(runs: Vec<StyledRun>, pattern: &Regex, style: RunStyle) -> Vec<StyledRun> {
    let mut out = Vec::with_capacity(runs.len());
    for run in runs {
        if run.style != RunStyle::Plain {
            out.push(run);
            continue;
        }
        let mut last = 0;
        for caps in pattern.captures_iter(&run.text) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if whole.start() > last {
                out.push(StyledRun::plain(&run.text[last..whole.start()]));
            }
            out.push(StyledRun::new(style, inner.as_str()));
            last = whole.end();
        }
        if last < run.text.len() {
            out.push(StyledRun::plain(&run.text[last..]));
        }
    }
    out
}

/// Converts a raw text span into styled runs.
///
/// # Example
/// ```rust
/// use md2report::inline::{format_inline, RunStyle};
///
/// let runs = format_inline("Some **bold** text");
/// assert_eq!(runs.len(), 3);
/// assert_eq!(runs[1].style, RunStyle::Bold);
/// assert_eq!(runs[1].text, "bold");
/// ```
pub fn format_inline(text: &str) -> Vec<StyledRun> {
    if text.is_empty() {
        return Vec::new();
    }
    let runs = vec![StyledRun::plain(text)];
    let runs = apply_pass(runs, &BOLD, RunStyle::Bold);
    let runs = apply_pass(runs, &ITALIC, RunStyle::Italic);
    apply_pass(runs, &INLINE_MATH, RunStyle::Italic)
}

/// Counts the delimiters in `text` that no pass will consume.
///
/// Returns `(stray_bold, stray_math)`: leftover `**` pairs and leftover `$`.
pub fn unmatched_delimiters(text: &str) -> (usize, usize) {
    let runs = format_inline(text);
    let leftover = runs
        .iter()
        .filter(|r| r.style == RunStyle::Plain)
        .map(|r| r.text.as_str())
        .collect::<String>();
    (leftover.matches("**").count(), leftover.matches('$').count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_one_run() {
        assert_eq!(format_inline("just text"), vec![StyledRun::plain("just text")]);
        assert!(format_inline("").is_empty());
    }

    #[test]
    fn test_bold_and_italic() {
        let runs = format_inline("Some **bold** and *italic* text.");
        assert_eq!(
            runs,
            vec![
                StyledRun::plain("Some "),
                StyledRun::new(RunStyle::Bold, "bold"),
                StyledRun::plain(" and "),
                StyledRun::new(RunStyle::Italic, "italic"),
                StyledRun::plain(" text."),
            ]
        );
    }

    #[test]
    fn test_inline_math_is_italic() {
        let runs = format_inline("where $x^2$ grows");
        assert_eq!(runs[1], StyledRun::new(RunStyle::Italic, "x^2"));
        assert_eq!(runs.len(), 3);
    }

    #[test]
    fn test_bold_takes_precedence_over_italic() {
        let runs = format_inline("**a** *b*");
        assert_eq!(runs[0], StyledRun::new(RunStyle::Bold, "a"));
        assert_eq!(runs[2], StyledRun::new(RunStyle::Italic, "b"));
    }

    #[test]
    fn test_markers_inside_bold_are_kept() {
        let runs = format_inline("**cost $c$**");
        assert_eq!(runs, vec![StyledRun::new(RunStyle::Bold, "cost $c$")]);
    }

    #[test]
    fn test_unmatched_delimiters_are_literal() {
        assert_eq!(format_inline("price is $5"), vec![StyledRun::plain("price is $5")]);
        assert_eq!(format_inline("a * b"), vec![StyledRun::plain("a * b")]);
        assert_eq!(format_inline("**open"), vec![StyledRun::plain("**open")]);
    }

    #[test]
    fn test_first_match_wins() {
        let runs = format_inline("$a$ and $b$ and $c");
        let italics: Vec<_> = runs
            .iter()
            .filter(|r| r.style == RunStyle::Italic)
            .map(|r| r.text.as_str())
            .collect();
        assert_eq!(italics, vec!["a", "b"]);
        assert_eq!(runs.last().unwrap().text, " and $c");
    }

    #[test]
    fn test_markers_are_removed_from_run_text() {
        let runs = format_inline("x **y** *z* $w$");
        let text: String = runs.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(text, "x y z w");
    }

    #[test]
    fn test_unmatched_delimiters() {
        assert_eq!(unmatched_delimiters("fine **bold** $x$"), (0, 0));
        assert_eq!(unmatched_delimiters("costs $5"), (0, 1));
        assert_eq!(unmatched_delimiters("**never closed"), (1, 0));
    }
}
