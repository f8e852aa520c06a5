use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use md2report::latex::{GlyphBackend, MathBackend, RasterError, RasterMath, RasterOptions};
use md2report::markdown::parse_blocks;
use md2report::styling::ReportStyle;
use md2report::ReportRenderer;

/// Deterministic formula rasterizer: a gray box whose width grows with the
/// formula length. Formulas containing `\broken` fail.
struct BoxBackend;

impl MathBackend for BoxBackend {
    fn rasterize(&self, formula: &str, options: &RasterOptions) -> Result<RasterMath, RasterError> {
        if formula.contains("\\broken") {
            return Err(RasterError::Backend("cannot draw".to_string()));
        }
        let width = 100 + 10 * formula.len() as u32;
        RasterMath::new(vec![64; (width * 40) as usize], width, 40, options.dpi)
    }
}

fn load(bytes: &[u8]) -> Document {
    let mut doc = Document::load_mem(bytes).expect("valid PDF");
    doc.decompress();
    doc
}

/// Strings drawn with `Tj` on a page, in content order.
fn page_strings(doc: &Document, page_id: ObjectId) -> Vec<Vec<u8>> {
    let data = doc.get_page_content(page_id).unwrap();
    Content::decode(&data)
        .unwrap()
        .operations
        .into_iter()
        .filter(|op| op.operator == "Tj")
        .filter_map(|op| match op.operands.into_iter().next() {
            Some(Object::String(bytes, _)) => Some(bytes),
            _ => None,
        })
        .collect()
}

fn count_images(doc: &Document) -> usize {
    doc.objects
        .values()
        .filter(|o| match o {
            Object::Stream(s) => s
                .dict
                .get(b"Subtype")
                .and_then(|v| v.as_name())
                .map_or(false, |n| n == b"Image"),
            _ => false,
        })
        .count()
}

fn render_with(style: ReportStyle, backend: Box<dyn MathBackend>, markdown: &str) -> Vec<u8> {
    let renderer = ReportRenderer::with_backend(style, backend);
    renderer.render_to_bytes(&parse_blocks(markdown)).unwrap()
}

#[test]
fn header_and_page_number_on_every_page() {
    let mut style = ReportStyle::default();
    style.header.title = "Waste Collection Routing".to_string();
    let markdown = "A paragraph that takes up one line.\n\n".repeat(80);
    let doc = load(&render_with(style, Box::new(BoxBackend), &markdown));

    let pages = doc.get_pages();
    assert!(pages.len() >= 3, "expected several pages, got {}", pages.len());
    for (number, page_id) in pages {
        let strings = page_strings(&doc, page_id);
        let n = strings.len();
        assert!(n >= 2);
        assert_eq!(strings[n - 2], b"Waste Collection Routing".to_vec());
        assert_eq!(strings[n - 1], number.to_string().into_bytes());
    }
}

#[test]
fn one_image_per_rendered_equation() {
    let markdown = "# Model\n\n$$x^2$$\n\n$$\\broken$$\n\n$$\n\\sum_i c_i\n$$\n";
    let doc = load(&render_with(ReportStyle::default(), Box::new(BoxBackend), markdown));

    assert_eq!(count_images(&doc), 2);
    let page_id = doc.get_pages()[&1];
    let strings = page_strings(&doc, page_id);
    assert!(strings.contains(&b"(1)".to_vec()));
    assert!(strings.contains(&b"(2)".to_vec()));
    assert!(!strings.contains(&b"(3)".to_vec()));
    // The failed formula is printed verbatim
    assert!(strings.contains(&b"\\broken".to_vec()));
}

#[test]
fn formulas_fall_back_to_text_without_math_font() {
    let markdown = "$$a + b$$\n\n$$c$$\n";
    let doc = load(&render_with(
        ReportStyle::default(),
        Box::new(GlyphBackend::without_font()),
        markdown,
    ));

    assert_eq!(count_images(&doc), 0);
    let strings = page_strings(&doc, doc.get_pages()[&1]);
    assert!(strings.contains(&b"a + b".to_vec()));
    assert!(strings.contains(&b"c".to_vec()));
    assert!(!strings.iter().any(|s| s.starts_with(b"(")));
}

#[test]
fn table_cells_and_borders() {
    let markdown = "| Depot | Trucks |\n|---|---|\n| North | $12$ |\n";
    let bytes = render_with(ReportStyle::default(), Box::new(BoxBackend), markdown);
    let doc = load(&bytes);
    let page_id = doc.get_pages()[&1];

    let strings = page_strings(&doc, page_id);
    assert!(strings.contains(&b"Depot".to_vec()));
    assert!(strings.contains(&b"North".to_vec()));
    assert!(strings.contains(&b"12".to_vec()));

    let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
    let rects = content.operations.iter().filter(|op| op.operator == "re").count();
    assert_eq!(rects, 4);
}

#[test]
fn page_size_follows_configuration() {
    let mut style = ReportStyle::default();
    style.page_width = 215.9;
    style.page_height = 279.4;
    let doc = load(&render_with(style, Box::new(BoxBackend), "letter sized"));
    let page_id = doc.get_pages()[&1];
    let page = doc.get_dictionary(page_id).unwrap();
    let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
    let width = media_box[2].as_float().unwrap();
    let height = media_box[3].as_float().unwrap();
    assert!((width - 612.0).abs() < 0.5, "width {}", width);
    assert!((height - 792.0).abs() < 0.5, "height {}", height);
}

#[test]
fn transliterates_characters_outside_win_ansi() {
    let doc = load(&render_with(
        ReportStyle::default(),
        Box::new(BoxBackend),
        "Distance \u{2248} 5 km, cost 10 \u{20ac}",
    ));
    let strings = page_strings(&doc, doc.get_pages()[&1]);
    let body: Vec<u8> = strings.concat();
    assert!(!body.windows(3).any(|w| w == "\u{2248}".as_bytes()));
    // The euro sign has a WinAnsi code
    assert!(body.contains(&0x80));
}
