//! Font handling for the report renderer.
//!
//! Body text is set in the standard PDF Times and Courier faces, which every
//! PDF viewer provides without embedding. This module carries their advance
//! widths for line breaking and the WinAnsi encoding used in content streams.
//!
//! Display math is drawn into a raster by `rusttype`, which needs a real font
//! file. Those are looked up among the installed system fonts through `fontdb`.

use std::fs;
use std::path::Path;

use fontdb::Database;
use log::{debug, info, warn};
use rusttype::Font;

/// Points per millimetre.
pub const PT_PER_MM: f32 = 72.0 / 25.4;

/// The standard PDF faces used by the layout engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BuiltinFont {
    TimesRoman,
    TimesBold,
    TimesItalic,
    Courier,
}

impl BuiltinFont {
    pub const ALL: [BuiltinFont; 4] = [
        BuiltinFont::TimesRoman,
        BuiltinFont::TimesBold,
        BuiltinFont::TimesItalic,
        BuiltinFont::Courier,
    ];

    /// PostScript name of the face.
    pub fn pdf_name(self) -> &'static str {
        match self {
            BuiltinFont::TimesRoman => "Times-Roman",
            BuiltinFont::TimesBold => "Times-Bold",
            BuiltinFont::TimesItalic => "Times-Italic",
            BuiltinFont::Courier => "Courier",
        }
    }

    /// Name under which the face is registered in page resources.
    pub fn resource_key(self) -> &'static str {
        match self {
            BuiltinFont::TimesRoman => "F1",
            BuiltinFont::TimesBold => "F2",
            BuiltinFont::TimesItalic => "F3",
            BuiltinFont::Courier => "F4",
        }
    }

    /// Advance width of one WinAnsi byte in thousandths of an em.
    pub fn byte_width(self, byte: u8) -> u16 {
        let table = match self {
            BuiltinFont::Courier => return 600,
            BuiltinFont::TimesRoman => &TIMES_ROMAN_WIDTHS,
            BuiltinFont::TimesBold => &TIMES_BOLD_WIDTHS,
            BuiltinFont::TimesItalic => &TIMES_ITALIC_WIDTHS,
        };
        match byte {
            32..=126 => table[(byte - 32) as usize],
            0x95 => 350,
            0x96 => 500,
            0x97 => 1000,
            0x85 => 1000,
            _ => 500,
        }
    }

    /// Width of `text` set at `size` points, in millimetres.
    pub fn text_width(self, text: &str, size: f32) -> f32 {
        let units: u32 = encode_win_ansi(text)
            .iter()
            .map(|&b| self.byte_width(b) as u32)
            .sum();
        units as f32 / 1000.0 * size / PT_PER_MM
    }
}

// Advance widths for bytes 32..=126 taken from the Adobe core font metrics.
#[rustfmt::skip]
const TIMES_ROMAN_WIDTHS: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

#[rustfmt::skip]
const TIMES_BOLD_WIDTHS: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500,
    333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500,
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
];

#[rustfmt::skip]
const TIMES_ITALIC_WIDTHS: [u16; 95] = [
    250, 333, 420, 500, 500, 833, 778, 214, 333, 333, 500, 675, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 675, 675, 675, 500,
    920, 611, 611, 667, 722, 611, 611, 722, 722, 333, 444, 667, 556, 833, 667, 722,
    611, 722, 611, 500, 556, 722, 611, 833, 611, 556, 556, 389, 278, 389, 422, 500,
    333, 500, 500, 444, 500, 444, 278, 500, 500, 278, 278, 444, 278, 722, 500, 500,
    500, 500, 389, 389, 278, 500, 444, 667, 444, 444, 389, 400, 275, 400, 541,
];

/// Maps a character to its WinAnsiEncoding byte, if it has one.
pub fn win_ansi_byte(ch: char) -> Option<u8> {
    let cp = ch as u32;
    if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
        return Some(cp as u8);
    }
    match cp {
        0x20AC => Some(0x80),
        0x201A => Some(0x82),
        0x0192 => Some(0x83),
        0x201E => Some(0x84),
        0x2026 => Some(0x85),
        0x2020 => Some(0x86),
        0x2021 => Some(0x87),
        0x02C6 => Some(0x88),
        0x2030 => Some(0x89),
        0x0160 => Some(0x8A),
        0x2039 => Some(0x8B),
        0x0152 => Some(0x8C),
        0x017D => Some(0x8E),
        0x2018 => Some(0x91),
        0x2019 => Some(0x92),
        0x201C => Some(0x93),
        0x201D => Some(0x94),
        0x2022 => Some(0x95),
        0x2013 => Some(0x96),
        0x2014 => Some(0x97),
        0x02DC => Some(0x98),
        0x2122 => Some(0x99),
        0x0161 => Some(0x9A),
        0x203A => Some(0x9B),
        0x0153 => Some(0x9C),
        0x017E => Some(0x9E),
        0x0178 => Some(0x9F),
        _ => None,
    }
}

/// Encodes text for a standard-font content stream.
///
/// Characters without a WinAnsi code are transliterated to ASCII; whatever is
/// still unrepresentable becomes `?`. Tabs and other control characters become
/// spaces.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_control() {
            out.push(b' ');
            continue;
        }
        if let Some(byte) = win_ansi_byte(ch) {
            out.push(byte);
            continue;
        }
        match deunicode::deunicode_char(ch) {
            Some(ascii) if !ascii.is_empty() => {
                out.extend(ascii.bytes().filter(|b| (0x20..=0x7E).contains(b)))
            }
            _ => out.push(b'?'),
        }
    }
    out
}

/// Characters of `text` that have no WinAnsi code and will be transliterated.
pub fn unencodable_chars(text: &str) -> Vec<char> {
    let mut found: Vec<char> = text
        .chars()
        .filter(|&c| !c.is_control() && win_ansi_byte(c).is_none())
        .collect();
    found.sort_unstable();
    found.dedup();
    found
}

/// Returns common aliases for a serif font name, so that asking for "Times"
/// also finds "Liberation Serif" and friends.
fn get_font_aliases(name: &str) -> Vec<&'static str> {
    match name.to_lowercase().as_str() {
        "times new roman" | "times" => {
            vec!["Times", "Times New Roman", "Liberation Serif", "FreeSerif"]
        }
        "computer modern" | "cm" | "latin modern" => {
            vec!["Latin Modern Math", "Latin Modern Roman", "CMU Serif"]
        }
        "dejavu serif" => vec!["DejaVu Serif", "Bitstream Vera Serif"],
        "stix" => vec!["STIX Two Math", "STIX Two Text", "STIXGeneral"],
        _ => vec![],
    }
}

/// Families tried, in order, when no math font is configured.
const MATH_FONT_CANDIDATES: [&str; 8] = [
    "Latin Modern Math",
    "STIX Two Math",
    "CMU Serif",
    "DejaVu Serif",
    "Liberation Serif",
    "Times New Roman",
    "FreeSerif",
    "Noto Serif",
];

fn is_collection(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("ttc"))
}

/// Reads a font file and keeps it only if `rusttype` can parse it.
pub fn load_font_file(path: &Path) -> Option<Vec<u8>> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            warn!("Could not read font file {}: {}", path.display(), e);
            return None;
        }
    };
    if Font::try_from_bytes(&bytes).is_some() {
        Some(bytes)
    } else {
        warn!("Font file {} is not usable for math rendering", path.display());
        None
    }
}

/// Upright faces ordered from the regular weight outwards; slanted faces are dropped.
fn regular_faces_first<T>(faces: Vec<(T, fontdb::Style, fontdb::Weight)>) -> Vec<T> {
    let mut upright: Vec<(u16, T)> = faces
        .into_iter()
        .filter(|(_, style, _)| *style == fontdb::Style::Normal)
        .map(|(item, _, weight)| (weight.0.abs_diff(fontdb::Weight::NORMAL.0), item))
        .collect();
    upright.sort_by_key(|(distance, _)| *distance);
    upright.into_iter().map(|(_, item)| item).collect()
}

/// Searches the installed system fonts for a family, including its aliases.
fn find_system_family(db: &Database, name: &str) -> Option<Vec<u8>> {
    let mut candidates = vec![name];
    candidates.extend(get_font_aliases(name));

    for candidate in candidates {
        let wanted = candidate.to_lowercase();
        let mut faces = Vec::new();
        for face in db.faces() {
            let path = match &face.source {
                fontdb::Source::File(p) => p,
                _ => continue,
            };
            // rusttype can't read collections directly
            if is_collection(path) {
                continue;
            }
            let matches = face
                .families
                .iter()
                .any(|(family, _)| family.to_lowercase() == wanted);
            if matches {
                faces.push((path, face.style, face.weight));
            }
        }
        for path in regular_faces_first(faces) {
            if let Some(bytes) = load_font_file(path) {
                debug!("Math font '{}' found at {}", candidate, path.display());
                return Some(bytes);
            }
        }
    }
    None
}

/// Locates font bytes for the math rasterizer.
///
/// Lookup order: an explicit font file, the preferred family, the built-in
/// candidate list, and finally any TrueType/OpenType file on the system.
pub fn find_math_font(font_path: Option<&str>, family: Option<&str>) -> Option<Vec<u8>> {
    if let Some(path) = font_path {
        if let Some(bytes) = load_font_file(Path::new(path)) {
            info!("Using math font file {}", path);
            return Some(bytes);
        }
    }

    let mut db = Database::new();
    db.load_system_fonts();

    if let Some(name) = family {
        if let Some(bytes) = find_system_family(&db, name) {
            info!("Using math font family '{}'", name);
            return Some(bytes);
        }
        warn!("Math font family '{}' not found, trying defaults", name);
    }

    for name in MATH_FONT_CANDIDATES {
        if let Some(bytes) = find_system_family(&db, name) {
            info!("Using math font family '{}'", name);
            return Some(bytes);
        }
    }

    for face in db.faces() {
        let path = match &face.source {
            fontdb::Source::File(p) => p,
            _ => continue,
        };
        let usable_ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map_or(false, |ext| {
                ext.eq_ignore_ascii_case("ttf") || ext.eq_ignore_ascii_case("otf")
            });
        if !usable_ext {
            continue;
        }
        if let Some(bytes) = load_font_file(path) {
            info!("Using fallback math font {}", path.display());
            return Some(bytes);
        }
    }

    warn!("No usable system font found; display math will fall back to plain text");
    None
}
