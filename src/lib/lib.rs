//! The md2report library renders a restricted Markdown dialect with display math into a
//! paginated PDF report: a running title in the header, a page number in the footer,
//! numbered equations, and tables laid out as bordered grids.
//!
//! Basic usage passes Markdown content as a string along with an output path:
//! ```rust,no_run
//! use md2report::config::ConfigSource;
//! use std::error::Error;
//!
//! fn example() -> Result<(), Box<dyn Error>> {
//!     let markdown = "# Project Report\n\nFleet utilisation rose by **12%**.\n\n$$E = mc^2$$";
//!     md2report::render_into_file(markdown, "report.pdf", ConfigSource::Default)?;
//!     Ok(())
//! }
//! ```
//!
//! Styling is read from a TOML file (`md2reportrc.toml`), see [`config`]:
//! ```toml
//! [header]
//! title = "Quarterly Logistics Report"
//!
//! [math]
//! widthfraction = 0.6
//! ```
//!
//! ## Pipeline
//! ```text
//! +-------------+     +----------------+     +------------------+     +-----------+
//! |  Markdown   |     |  Blocks        |     |  Pages           |     |  PDF      |
//! |  # Title    | --> |  Heading       | --> |  text, lines,    | --> |  lopdf    |
//! |  | a | b |  |     |  Table         |     |  rects, equation |     |  document |
//! |  $$ x^2 $$  |     |  DisplayMath   |     |  images          |     |           |
//! +-------------+     +----------------+     +------------------+     +-----------+
//!   markdown            markdown + inline      layout + latex           pdf
//! ```
//!
//! Formulas that cannot be typeset and tables that cannot be laid out as a grid are
//! printed as monospace text instead; neither stops the render. Only I/O and PDF
//! serialization failures surface as [`ReportError`].

pub mod config;
mod debug;
pub mod fonts;
pub mod formula;
pub mod inline;
pub mod latex;
pub mod layout;
pub mod markdown;
pub mod pdf;
pub mod styling;
pub mod validation;

use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use latex::{MathBackend, MathRasterizer, RasterOptions};
use layout::{LaidOutDocument, LayoutEngine};
use log::{info, warn};
use markdown::{parse_blocks, Block, BlockParser, SourceDocument};
use pdf::Pdf;
use styling::ReportStyle;

/// Errors that abort a render. Per-formula and per-table problems never end up
/// here; they degrade to text output instead.
#[derive(Debug)]
pub enum ReportError {
    /// Reading the source or writing the output failed
    IoError {
        message: String,
        path: String,
        suggestion: String,
        source: Option<io::Error>,
    },
    /// The document could not be serialized
    PdfError {
        message: String,
        path: Option<String>,
        suggestion: Option<String>,
    },
}

impl Error for ReportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ReportError::IoError {
                source: Some(e), ..
            } => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ReportError::IoError {
                message,
                path,
                suggestion,
                ..
            } => {
                write!(f, "❌ File Error: {}", message)?;
                write!(f, "\n📁 Path: {}", path)?;
                write!(f, "\n💡 Suggestion: {}", suggestion)?;
                Ok(())
            }
            ReportError::PdfError {
                message,
                path,
                suggestion,
            } => {
                write!(f, "❌ PDF Generation Error: {}", message)?;
                if let Some(p) = path {
                    write!(f, "\n📁 Path: {}", p)?;
                }
                if let Some(hint) = suggestion {
                    write!(f, "\n💡 Suggestion: {}", hint)?;
                }
                Ok(())
            }
        }
    }
}

impl ReportError {
    /// Creates a simple PDF error with just a message
    pub fn pdf_error(message: impl Into<String>) -> Self {
        ReportError::PdfError {
            message: message.into(),
            path: None,
            suggestion: Some("Check available memory and try with a smaller document".to_string()),
        }
    }
}

/// Runs blocks through layout and serialization with one style and one math
/// rasterizer.
pub struct ReportRenderer {
    style: ReportStyle,
    rasterizer: MathRasterizer,
}

impl ReportRenderer {
    /// Renderer that typesets formulas with the built-in glyph backend.
    pub fn new(style: ReportStyle) -> Self {
        let rasterizer = MathRasterizer::new(&style.math);
        Self { style, rasterizer }
    }

    /// Renderer with a caller-provided formula rasterizer.
    pub fn with_backend(style: ReportStyle, backend: Box<dyn MathBackend>) -> Self {
        let options = RasterOptions::from_style(&style.math);
        let rasterizer = MathRasterizer::with_backend(backend, options);
        Self { style, rasterizer }
    }

    /// Places every block on pages.
    pub fn layout(&self, blocks: &[Block]) -> LaidOutDocument {
        let document = LayoutEngine::new(&self.style, &self.rasterizer).layout(blocks);
        info!(
            "Laid out {} blocks on {} page(s): {} equation(s), {} math fallback(s), {} table fallback(s)",
            blocks.len(),
            document.pages.len(),
            document.equation_numbers.len(),
            document.math_fallbacks,
            document.table_fallbacks
        );
        document
    }

    /// Lays out and serializes the blocks into PDF bytes.
    pub fn render_to_bytes(&self, blocks: &[Block]) -> Result<Vec<u8>, ReportError> {
        let document = self.layout(blocks);
        Pdf::new(&document, &self.style)
            .render_to_bytes()
            .map_err(ReportError::pdf_error)
    }

    /// Renders the blocks and writes the PDF to `path`.
    ///
    /// Nothing is written unless the whole document serialized; a failed
    /// write removes whatever part of the file was created.
    pub fn render_to_file(&self, blocks: &[Block], path: &str) -> Result<(), ReportError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(ReportError::IoError {
                    message: "Output directory does not exist".to_string(),
                    path: parent.display().to_string(),
                    suggestion: format!("Create the directory first: mkdir -p {}", parent.display()),
                    source: None,
                });
            }
        }

        let bytes = self.render_to_bytes(blocks).map_err(|e| match e {
            ReportError::PdfError {
                message,
                suggestion,
                ..
            } => ReportError::PdfError {
                message,
                path: Some(path.to_string()),
                suggestion,
            },
            other => other,
        })?;

        if let Err(e) = fs::write(path, &bytes) {
            if Path::new(path).is_file() {
                if let Err(cleanup) = fs::remove_file(path) {
                    warn!("Could not remove partial output {}: {}", path, cleanup);
                }
            }
            let suggestion = if e.kind() == io::ErrorKind::PermissionDenied {
                "Check that you have write permissions for this location".to_string()
            } else {
                "Try a different output path or check available disk space".to_string()
            };
            return Err(ReportError::IoError {
                message: format!("Could not write PDF: {}", e),
                path: path.to_string(),
                suggestion,
                source: Some(e),
            });
        }
        info!("Wrote {} bytes to {}", bytes.len(), path);
        Ok(())
    }
}

/// Transforms Markdown content into a PDF report and saves it to `path`.
///
/// # Example
/// ```rust,no_run
/// use md2report::config::ConfigSource;
///
/// const EMBEDDED: &str = r#"
///     [header]
///     title = "Depot Survey"
/// "#;
/// md2report::render_into_file("# Results\n\nAll depots reported.", "survey.pdf", ConfigSource::Embedded(EMBEDDED))
///     .unwrap();
/// ```
pub fn render_into_file(
    markdown: &str,
    path: &str,
    config: config::ConfigSource,
) -> Result<(), ReportError> {
    let style = config::load_config_from_source(config);
    let blocks = parse_blocks(markdown);
    ReportRenderer::new(style).render_to_file(&blocks, path)
}

/// Transforms Markdown content into a PDF report and returns the PDF data.
///
/// # Example
/// ```rust
/// use md2report::config::ConfigSource;
///
/// let bytes = md2report::render_into_bytes("# Hello\n\nA short report.", ConfigSource::Default).unwrap();
/// assert!(bytes.starts_with(b"%PDF-"));
/// ```
pub fn render_into_bytes(
    markdown: &str,
    config: config::ConfigSource,
) -> Result<Vec<u8>, ReportError> {
    let style = config::load_config_from_source(config);
    let blocks = parse_blocks(markdown);
    ReportRenderer::new(style).render_to_bytes(&blocks)
}

/// Reads a markdown file and renders it to `output`.
pub fn render_file(
    input: &Path,
    output: &str,
    config: config::ConfigSource,
) -> Result<(), ReportError> {
    let source = SourceDocument::load(input)?;
    let style = config::load_config_from_source(config);
    let blocks = BlockParser::new(&source).parse();
    ReportRenderer::new(style).render_to_file(&blocks, output)
}
