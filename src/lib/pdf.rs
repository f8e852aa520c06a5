//! PDF serialization of laid-out pages.
//!
//! Pages are written with `lopdf`. Text uses the four standard Type1 faces
//! (Times-Roman, Times-Bold, Times-Italic, Courier) in WinAnsiEncoding, so no
//! font program is embedded. Each equation raster becomes an 8-bit DeviceGray
//! image XObject scaled into its placement box with a `cm` operator.
//!
//! Layout coordinates are millimetres measured down from the top of the page;
//! they are converted to PDF points measured up from the bottom here.

use log::{debug, info};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::fonts::{encode_win_ansi, BuiltinFont, PT_PER_MM};
use crate::latex::RasterMath;
use crate::layout::{LaidOutDocument, Page, Placement};
use crate::styling::ReportStyle;

const PRODUCER: &str = concat!("md2report ", env!("CARGO_PKG_VERSION"));

/// Encodes a string for the document information dictionary: plain ASCII as
/// a literal, anything else as UTF-16BE with a byte order mark.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn mm(value: f32) -> f32 {
    value * PT_PER_MM
}

/// Serializes a [`LaidOutDocument`] into PDF bytes.
pub struct Pdf<'a> {
    document: &'a LaidOutDocument,
    style: &'a ReportStyle,
}

impl<'a> Pdf<'a> {
    pub fn new(document: &'a LaidOutDocument, style: &'a ReportStyle) -> Self {
        Self { document, style }
    }

    /// Page-space y coordinate in points for a layout y in millimetres.
    fn flip(&self, y: f32) -> f32 {
        mm(self.style.page_height - y)
    }

    fn text_operations(&self, x: f32, y: f32, font: BuiltinFont, size: f32, text: &str) -> Vec<Operation> {
        vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![font.resource_key().into(), size.into()]),
            Operation::new("Td", vec![mm(x).into(), self.flip(y).into()]),
            Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]
    }

    /// Content stream operations for one page, plus the images it references
    /// keyed by resource name.
    fn page_operations<'p>(&self, page: &'p Page) -> (Vec<Operation>, Vec<(String, &'p RasterMath)>) {
        let mut operations = Vec::new();
        let mut images = Vec::new();
        for placement in &page.placements {
            match placement {
                Placement::Text {
                    x,
                    y,
                    font,
                    size,
                    text,
                } => operations.extend(self.text_operations(*x, *y, *font, *size, text)),
                Placement::Line {
                    x1,
                    y1,
                    x2,
                    y2,
                    width,
                } => operations.extend([
                    Operation::new("w", vec![mm(*width).into()]),
                    Operation::new("m", vec![mm(*x1).into(), self.flip(*y1).into()]),
                    Operation::new("l", vec![mm(*x2).into(), self.flip(*y2).into()]),
                    Operation::new("S", vec![]),
                ]),
                Placement::Rect {
                    x,
                    y,
                    width,
                    height,
                    line_width,
                } => operations.extend([
                    Operation::new("w", vec![mm(*line_width).into()]),
                    Operation::new(
                        "re",
                        vec![
                            mm(*x).into(),
                            self.flip(y + height).into(),
                            mm(*width).into(),
                            mm(*height).into(),
                        ],
                    ),
                    Operation::new("S", vec![]),
                ]),
                Placement::Image {
                    x,
                    y,
                    width,
                    height,
                    raster,
                } => {
                    let name = format!("Im{}", images.len() + 1);
                    operations.extend([
                        Operation::new("q", vec![]),
                        Operation::new(
                            "cm",
                            vec![
                                mm(*width).into(),
                                0.into(),
                                0.into(),
                                mm(*height).into(),
                                mm(*x).into(),
                                self.flip(y + height).into(),
                            ],
                        ),
                        Operation::new("Do", vec![name.as_str().into()]),
                        Operation::new("Q", vec![]),
                    ]);
                    images.push((name, raster));
                }
            }
        }
        (operations, images)
    }

    fn image_xobject(raster: &RasterMath) -> Stream {
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => raster.width_px() as i64,
            "Height" => raster.height_px() as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        };
        Stream::new(dict, raster.pixels().to_vec())
    }

    /// Builds the in-memory PDF document.
    pub fn render_into_document(&self) -> Result<Document, lopdf::Error> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut fonts = Dictionary::new();
        for font in BuiltinFont::ALL {
            let id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => font.pdf_name(),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(font.resource_key(), id);
        }
        let fonts_id = doc.add_object(fonts);

        let media_box: Vec<Object> = vec![
            0.into(),
            0.into(),
            mm(self.style.page_width).into(),
            mm(self.style.page_height).into(),
        ];

        let mut kids: Vec<Object> = Vec::with_capacity(self.document.pages.len());
        for page in &self.document.pages {
            let (operations, images) = self.page_operations(page);
            let mut xobject_dict = Dictionary::new();
            for (name, raster) in images {
                let id: ObjectId = doc.add_object(Self::image_xobject(raster));
                xobject_dict.set(name.into_bytes(), id);
            }

            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let resources_id = doc.add_object(dictionary! {
                "Font" => fonts_id,
                "XObject" => xobject_dict,
            });
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => media_box.clone(),
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            debug!("Serialized page {} as object {:?}", page.number, page_id);
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let info_id = doc.add_object(dictionary! {
            "Title" => text_string(&self.style.header.title),
            "Producer" => Object::string_literal(PRODUCER),
            "Creator" => Object::string_literal("md2report"),
        });
        doc.trailer.set("Info", info_id);

        doc.compress();
        Ok(doc)
    }

    /// Serializes the document into PDF bytes.
    pub fn render_to_bytes(&self) -> Result<Vec<u8>, String> {
        let mut doc = self
            .render_into_document()
            .map_err(|e| format!("Failed to build PDF document: {}", e))?;
        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)
            .map_err(|e| format!("Failed to serialize PDF: {}", e))?;
        info!(
            "Serialized {} pages ({} bytes)",
            self.document.pages.len(),
            buffer.len()
        );
        Ok(buffer)
    }
}
