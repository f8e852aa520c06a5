use lopdf::Document;
use md2report::inline::{format_inline, RunStyle, StyledRun};
use md2report::latex::{preprocess_formula, MathBackend, RasterError, RasterMath, RasterOptions};
use md2report::markdown::{parse_blocks, Block};
use md2report::styling::ReportStyle;
use md2report::ReportRenderer;

struct StripeBackend;

impl MathBackend for StripeBackend {
    fn rasterize(&self, _formula: &str, options: &RasterOptions) -> Result<RasterMath, RasterError> {
        let (w, h) = (300u32, 60u32);
        let pixels = (0..w * h).map(|i| if (i / w) % 2 == 0 { 0 } else { 255 }).collect();
        RasterMath::new(pixels, w, h, options.dpi)
    }
}

const SCENARIO: &str = "# Title\n\nSome **bold** and *italic* text.\n\n$$ E = mc^2 $$\n\n- item one\n- item two\n";

#[test]
fn scenario_blocks() {
    let blocks = parse_blocks(SCENARIO);
    assert_eq!(
        blocks,
        vec![
            Block::Heading {
                level: 1,
                text: "Title".to_string()
            },
            Block::Blank,
            Block::Paragraph {
                text: "Some **bold** and *italic* text.".to_string()
            },
            Block::Blank,
            Block::DisplayMath {
                formula: "E = mc^2".to_string()
            },
            Block::Blank,
            Block::ListItem {
                text: "item one".to_string()
            },
            Block::ListItem {
                text: "item two".to_string()
            },
        ]
    );

    assert_eq!(
        format_inline("Some **bold** and *italic* text."),
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
fn scenario_document() {
    let renderer = ReportRenderer::with_backend(ReportStyle::default(), Box::new(StripeBackend));
    let blocks = parse_blocks(SCENARIO);

    let laid_out = renderer.layout(&blocks);
    assert_eq!(laid_out.pages.len(), 1);
    assert_eq!(laid_out.equation_numbers, vec![1]);
    let kinds: Vec<&str> = laid_out.placed_blocks.iter().map(|b| b.kind).collect();
    assert_eq!(
        kinds,
        vec!["Heading", "Blank", "Paragraph", "Blank", "DisplayMath", "Blank", "ListItem", "ListItem"]
    );

    let doc = Document::load_mem(&renderer.render_to_bytes(&blocks).unwrap()).unwrap();
    assert_eq!(doc.get_pages().len(), 1);
    let images = doc
        .objects
        .values()
        .filter_map(|o| o.as_stream().ok())
        .filter(|s| s.dict.get(b"Subtype").and_then(|v| v.as_name()).map_or(false, |n| n == b"Image"))
        .count();
    assert_eq!(images, 1);
}

#[test]
fn multiline_formula_is_joined() {
    let blocks = parse_blocks("$$\n a \\le b \n$$\n");
    assert_eq!(
        blocks,
        vec![Block::DisplayMath {
            formula: "a \\le b".to_string()
        }]
    );
    assert_eq!(preprocess_formula("a \\le b"), "a \\leq b");
}

#[test]
fn comment_lines_vanish() {
    let blocks = parse_blocks("first part\n<!-- note -->\nsecond part\n");
    assert_eq!(
        blocks,
        vec![Block::Paragraph {
            text: "first part second part".to_string()
        }]
    );
}

#[test]
fn separator_row_is_not_rendered() {
    let blocks = parse_blocks("| h1 | h2 |\n| --- | --- |\n| a | b |\n| c | d |\n");
    match &blocks[0] {
        Block::Table { rows, raw_lines } => {
            assert_eq!(rows.len(), 3);
            assert_eq!(raw_lines.len(), 4);
        }
        other => panic!("expected table, got {:?}", other),
    }
}

#[test]
fn block_order_survives_page_breaks() {
    let mut markdown = String::new();
    for i in 0..40 {
        markdown.push_str(&format!("## Section {}\n\nText of section {}.\n\n$$x_{}$$\n", i, i, i));
    }
    let renderer = ReportRenderer::with_backend(ReportStyle::default(), Box::new(StripeBackend));
    let blocks = parse_blocks(&markdown);
    let laid_out = renderer.layout(&blocks);

    assert!(laid_out.pages.len() > 1);
    let indices: Vec<usize> = laid_out.placed_blocks.iter().map(|b| b.index).collect();
    assert_eq!(indices, (0..blocks.len()).collect::<Vec<_>>());
    let pages: Vec<u32> = laid_out.placed_blocks.iter().map(|b| b.page).collect();
    assert!(pages.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(laid_out.equation_numbers, (1..=40).collect::<Vec<u32>>());
}
