//! TOML configuration for report styling.
//!
//! The configuration file is read as an untyped `toml::Value` tree and merged
//! over [`ReportStyle::default`]: every key is optional, and a missing key or a
//! value of the wrong type keeps the default. A file that cannot be read or is
//! not valid TOML yields the defaults with a warning.
//!
//! # Configuration Structure
//!
//! Lengths are millimetres, font sizes are points. Numeric keys accept both
//! integers and floats.
//!
//! - `[page]` `width`, `height`
//! - `[margin]` `top`, `right`, `bottom`, `left`
//! - `[header]` `title`, `size`, `height`
//! - `[footer]` `size`, `offset` (distance of the page number band from the
//!   bottom edge), `height`
//! - `[text]` and `[heading.1]`, `[heading.2]`, `[heading.3]`: `size`,
//!   `lineheight`, `afterspacing`
//! - `[heading]` `center`: headings containing any of these strings are centered
//! - `[list_item]` `size`, `lineheight`, `afterspacing`, `indent`, `bulletwidth`
//! - `[table]` `size`, `lineheight`, `padding`, `beforespacing`, `afterspacing`;
//!   `[table.fallback]` `size`, `lineheight`
//! - `[horizontal_rule]` `beforespacing`, `afterspacing`, `thickness`
//! - `[blank]` `spacing`
//! - `[math]` `size`, `dpi`, `widthfraction`, `breakthreshold`, `afterspacing`,
//!   `numbersize`, `fontfamily`, `fontpath`; `[math.fallback]` `size`, `lineheight`
//!
//! # Example
//!
//! ```toml
//! [header]
//! title = "Quarterly Logistics Report"
//!
//! [margin]
//! left = 15
//! right = 15
//!
//! [heading]
//! center = ["Project Report", "Summary"]
//!
//! [math]
//! widthfraction = 0.6
//! fontfamily = "DejaVu Serif"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use toml::Value;

use crate::styling::{ReportStyle, TextStyle};

/// File name looked up in the working directory and the user config directory.
pub const CONFIG_FILE_NAME: &str = "md2reportrc.toml";

/// Configuration source for styling configuration.
/// Determines where the TOML configuration should be loaded from.
#[derive(Debug, Clone)]
pub enum ConfigSource<'a> {
    /// Use default built-in styling configuration
    Default,
    /// Load configuration from a file path
    File(&'a str),
    /// Use an in-memory TOML configuration string
    Embedded(&'a str),
}

/// Reads a number that may be written as either a TOML integer or float.
fn number(value: Option<&Value>, key: &str) -> Option<f32> {
    let v = value?.get(key)?;
    v.as_float()
        .map(|f| f as f32)
        .or_else(|| v.as_integer().map(|i| i as f32))
}

/// Reads a font size. Out-of-range values are rejected.
fn font_size(value: Option<&Value>, key: &str) -> Option<u8> {
    let size = number(value, key)?;
    (size >= 1.0 && size <= 255.0).then(|| size.round() as u8)
}

fn string(value: Option<&Value>, key: &str) -> Option<String> {
    value?.get(key)?.as_str().map(str::to_string)
}

fn set_f32(target: &mut f32, value: Option<&Value>, key: &str) {
    if let Some(v) = number(value, key) {
        *target = v;
    }
}

fn set_size(target: &mut u8, value: Option<&Value>, key: &str) {
    if let Some(v) = font_size(value, key) {
        *target = v;
    }
}

fn section<'v>(config: &'v Value, path: &[&str]) -> Option<&'v Value> {
    path.iter()
        .try_fold(config, |node, key| node.get(*key))
        .filter(|node| node.is_table())
}

/// Parses a text style section over a default.
///
/// Recognizes `size`, `lineheight` and `afterspacing`; anything else in the
/// section is left to the caller.
fn parse_style(value: Option<&Value>, default: TextStyle) -> TextStyle {
    let mut style = default;
    set_size(&mut style.size, value, "size");
    set_f32(&mut style.line_height, value, "lineheight");
    set_f32(&mut style.after_spacing, value, "afterspacing");
    style
}

/// Applies a parsed TOML tree to a style.
fn apply_config(config: &Value, style: &mut ReportStyle) {
    let page = section(config, &["page"]);
    set_f32(&mut style.page_width, page, "width");
    set_f32(&mut style.page_height, page, "height");

    let margin = section(config, &["margin"]);
    set_f32(&mut style.margins.top, margin, "top");
    set_f32(&mut style.margins.right, margin, "right");
    set_f32(&mut style.margins.bottom, margin, "bottom");
    set_f32(&mut style.margins.left, margin, "left");

    let header = section(config, &["header"]);
    if let Some(title) = string(header, "title") {
        style.header.title = title;
    }
    set_size(&mut style.header.size, header, "size");
    set_f32(&mut style.header.height, header, "height");

    let footer = section(config, &["footer"]);
    set_size(&mut style.footer.size, footer, "size");
    set_f32(&mut style.footer.offset, footer, "offset");
    set_f32(&mut style.footer.height, footer, "height");

    style.text = parse_style(section(config, &["text"]), style.text);
    style.heading_1 = parse_style(section(config, &["heading", "1"]), style.heading_1);
    style.heading_2 = parse_style(section(config, &["heading", "2"]), style.heading_2);
    style.heading_3 = parse_style(section(config, &["heading", "3"]), style.heading_3);
    if let Some(patterns) = section(config, &["heading"])
        .and_then(|h| h.get("center"))
        .and_then(|c| c.as_array())
    {
        style.center_patterns = patterns
            .iter()
            .filter_map(|p| p.as_str().map(str::to_string))
            .collect();
    }

    let list = section(config, &["list_item"]);
    style.list_item.text = parse_style(list, style.list_item.text);
    set_f32(&mut style.list_item.indent, list, "indent");
    set_f32(&mut style.list_item.bullet_width, list, "bulletwidth");

    let table = section(config, &["table"]);
    set_size(&mut style.table.size, table, "size");
    set_f32(&mut style.table.line_height, table, "lineheight");
    set_f32(&mut style.table.padding, table, "padding");
    set_f32(&mut style.table.before_spacing, table, "beforespacing");
    set_f32(&mut style.table.after_spacing, table, "afterspacing");
    style.table.fallback = parse_style(section(config, &["table", "fallback"]), style.table.fallback);

    let rule = section(config, &["horizontal_rule"]);
    set_f32(&mut style.horizontal_rule.before_spacing, rule, "beforespacing");
    set_f32(&mut style.horizontal_rule.after_spacing, rule, "afterspacing");
    set_f32(&mut style.horizontal_rule.thickness, rule, "thickness");

    set_f32(&mut style.blank_spacing, section(config, &["blank"]), "spacing");

    let math = section(config, &["math"]);
    set_f32(&mut style.math.size, math, "size");
    if let Some(dpi) = number(math, "dpi").filter(|d| *d >= 1.0) {
        style.math.dpi = dpi.round() as u32;
    }
    if let Some(fraction) = number(math, "widthfraction").filter(|f| *f > 0.0 && *f <= 1.0) {
        style.math.width_fraction = fraction;
    }
    set_f32(&mut style.math.break_threshold, math, "breakthreshold");
    set_f32(&mut style.math.after_spacing, math, "afterspacing");
    set_size(&mut style.math.number_size, math, "numbersize");
    if let Some(family) = string(math, "fontfamily") {
        style.math.font_family = Some(family);
    }
    if let Some(path) = string(math, "fontpath") {
        style.math.font_path = Some(path);
    }
    style.math.fallback = parse_style(section(config, &["math", "fallback"]), style.math.fallback);
}

/// Parses a TOML configuration string and returns a complete ReportStyle.
///
/// Invalid TOML yields the default style.
///
/// # Example
/// ```rust
/// use md2report::config::parse_config_string;
///
/// let style = parse_config_string(r#"
/// [header]
/// title = "Fleet Study"
///
/// [heading.1]
/// size = 18
///
/// [math]
/// widthfraction = 0.75
/// "#);
/// assert_eq!(style.header.title, "Fleet Study");
/// assert_eq!(style.heading_1.size, 18);
/// assert_eq!(style.math.width_fraction, 0.75);
/// ```
pub fn parse_config_string(config_str: &str) -> ReportStyle {
    let mut style = ReportStyle::default();
    let config: Value = match toml::from_str(config_str) {
        Ok(v) => v,
        Err(e) => {
            warn!("Ignoring invalid configuration: {}", e);
            return style;
        }
    };
    apply_config(&config, &mut style);
    style
}

/// Loads the styling configuration from the given source.
///
/// # Examples
/// ```rust
/// use md2report::config::{ConfigSource, load_config_from_source};
///
/// let style = load_config_from_source(ConfigSource::Default);
/// assert_eq!(style.text.size, 12);
///
/// // A missing file falls back to the defaults
/// let style = load_config_from_source(ConfigSource::File("does-not-exist.toml"));
/// assert_eq!(style.text.size, 12);
///
/// let style = load_config_from_source(ConfigSource::Embedded("[text]\nsize = 11"));
/// assert_eq!(style.text.size, 11);
/// ```
pub fn load_config_from_source(source: ConfigSource) -> ReportStyle {
    match source {
        ConfigSource::Default => ReportStyle::default(),
        ConfigSource::File(path) => {
            let config_str = match fs::read_to_string(Path::new(path)) {
                Ok(s) => s,
                Err(e) => {
                    warn!("Could not read configuration file {}: {}", path, e);
                    return ReportStyle::default();
                }
            };
            debug!("Loaded configuration from {}", path);
            parse_config_string(&config_str)
        }
        ConfigSource::Embedded(content) => parse_config_string(content),
    }
}

/// Candidate configuration files in lookup order: the working directory, then
/// the user configuration directory.
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("md2report").join(CONFIG_FILE_NAME));
    }
    paths
}

/// First existing configuration file from [`config_search_paths`].
pub fn find_config_file() -> Option<PathBuf> {
    config_search_paths().into_iter().find(|p| p.is_file())
}

fn format_style(name: &str, style: &TextStyle) -> String {
    format!(
        "[{}]\nsize = {}\nlineheight = {:.1}\nafterspacing = {:.1}\n",
        name, style.size, style.line_height, style.after_spacing
    )
}

fn toml_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

/// The complete default configuration as TOML.
pub fn default_config_toml() -> String {
    let s = ReportStyle::default();
    let mut out = String::new();
    out.push_str("# md2report configuration. Lengths are millimetres, font sizes points.\n\n");
    out.push_str(&format!(
        "[page]\nwidth = {:.1}\nheight = {:.1}\n\n",
        s.page_width, s.page_height
    ));
    out.push_str(&format!(
        "[margin]\ntop = {:.1}\nright = {:.1}\nbottom = {:.1}\nleft = {:.1}\n\n",
        s.margins.top, s.margins.right, s.margins.bottom, s.margins.left
    ));
    out.push_str(&format!(
        "[header]\ntitle = {}\nsize = {}\nheight = {:.1}\n\n",
        toml_string(&s.header.title),
        s.header.size,
        s.header.height
    ));
    out.push_str(&format!(
        "[footer]\nsize = {}\noffset = {:.1}\nheight = {:.1}\n\n",
        s.footer.size, s.footer.offset, s.footer.height
    ));
    out.push_str(&format_style("text", &s.text));
    out.push('\n');
    let patterns = s
        .center_patterns
        .iter()
        .map(|p| toml_string(p))
        .collect::<Vec<_>>()
        .join(", ");
    out.push_str(&format!("[heading]\ncenter = [{}]\n\n", patterns));
    out.push_str(&format_style("heading.1", &s.heading_1));
    out.push('\n');
    out.push_str(&format_style("heading.2", &s.heading_2));
    out.push('\n');
    out.push_str(&format_style("heading.3", &s.heading_3));
    out.push('\n');
    out.push_str(&format_style("list_item", &s.list_item.text));
    out.push_str(&format!(
        "indent = {:.1}\nbulletwidth = {:.1}\n\n",
        s.list_item.indent, s.list_item.bullet_width
    ));
    out.push_str(&format!(
        "[table]\nsize = {}\nlineheight = {:.1}\npadding = {:.1}\nbeforespacing = {:.1}\nafterspacing = {:.1}\n\n",
        s.table.size, s.table.line_height, s.table.padding, s.table.before_spacing, s.table.after_spacing
    ));
    out.push_str(&format!(
        "[table.fallback]\nsize = {}\nlineheight = {:.1}\n\n",
        s.table.fallback.size, s.table.fallback.line_height
    ));
    out.push_str(&format!(
        "[horizontal_rule]\nbeforespacing = {:.1}\nafterspacing = {:.1}\nthickness = {}\n\n",
        s.horizontal_rule.before_spacing, s.horizontal_rule.after_spacing, s.horizontal_rule.thickness
    ));
    out.push_str(&format!("[blank]\nspacing = {:.1}\n\n", s.blank_spacing));
    out.push_str(&format!(
        "[math]\nsize = {:.1}\ndpi = {}\nwidthfraction = {}\nbreakthreshold = {:.1}\nafterspacing = {:.1}\nnumbersize = {}\n",
        s.math.size, s.math.dpi, s.math.width_fraction, s.math.break_threshold, s.math.after_spacing, s.math.number_size
    ));
    out.push_str("# fontfamily = \"DejaVu Serif\"\n# fontpath = \"/path/to/font.ttf\"\n\n");
    out.push_str(&format!(
        "[math.fallback]\nsize = {}\nlineheight = {:.1}\n",
        s.math.fallback.size, s.math.fallback.line_height
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_accepts_integers_and_floats() {
        let value: Value = toml::from_str("a = 3\nb = 2.5\nc = \"x\"").unwrap();
        assert_eq!(number(Some(&value), "a"), Some(3.0));
        assert_eq!(number(Some(&value), "b"), Some(2.5));
        assert_eq!(number(Some(&value), "c"), None);
        assert_eq!(number(Some(&value), "missing"), None);
        assert_eq!(number(None, "a"), None);
    }

    #[test]
    fn test_font_size_range() {
        let value: Value = toml::from_str("a = 0\nb = 300\nc = 11.6").unwrap();
        assert_eq!(font_size(Some(&value), "a"), None);
        assert_eq!(font_size(Some(&value), "b"), None);
        assert_eq!(font_size(Some(&value), "c"), Some(12));
    }

    #[test]
    fn test_parse_style_partial() {
        let value: Value = toml::from_str("[style]\nsize = 16").unwrap();
        let default = TextStyle::new(12, 5.0, 6.0);
        let parsed = parse_style(value.get("style"), default);
        assert_eq!(parsed.size, 16);
        assert_eq!(parsed.line_height, 5.0);
        assert_eq!(parsed.after_spacing, 6.0);
    }

    #[test]
    fn test_parse_style_invalid_values() {
        let value: Value =
            toml::from_str("[style]\nsize = \"big\"\nlineheight = true\nafterspacing = 1").unwrap();
        let default = TextStyle::new(12, 5.0, 6.0);
        let parsed = parse_style(value.get("style"), default);
        assert_eq!(parsed.size, 12);
        assert_eq!(parsed.line_height, 5.0);
        assert_eq!(parsed.after_spacing, 1.0);
    }

    #[test]
    fn test_parse_config_string() {
        let style = parse_config_string(
            r#"
            [page]
            width = 215.9
            height = 279.4

            [margin]
            top = 12
            left = 20.5

            [header]
            title = "Route Analysis"

            [heading]
            center = ["Overview"]

            [heading.2]
            size = 15

            [list_item]
            indent = 8
            bulletwidth = 4

            [table.fallback]
            size = 8

            [math]
            dpi = 150
            fontfamily = "DejaVu Serif"
            "#,
        );
        let default = ReportStyle::default();

        assert_eq!(style.page_width, 215.9);
        assert_eq!(style.page_height, 279.4);
        assert_eq!(style.margins.top, 12.0);
        assert_eq!(style.margins.left, 20.5);
        assert_eq!(style.margins.right, default.margins.right);
        assert_eq!(style.header.title, "Route Analysis");
        assert_eq!(style.center_patterns, vec!["Overview".to_string()]);
        assert_eq!(style.heading_2.size, 15);
        assert_eq!(style.heading_1, default.heading_1);
        assert_eq!(style.list_item.indent, 8.0);
        assert_eq!(style.list_item.bullet_width, 4.0);
        assert_eq!(style.table.fallback.size, 8);
        assert_eq!(style.table.size, default.table.size);
        assert_eq!(style.math.dpi, 150);
        assert_eq!(style.math.font_family.as_deref(), Some("DejaVu Serif"));
    }

    #[test]
    fn test_out_of_range_math_values_keep_defaults() {
        let style = parse_config_string("[math]\nwidthfraction = 1.5\ndpi = 0");
        let default = ReportStyle::default();
        assert_eq!(style.math.width_fraction, default.math.width_fraction);
        assert_eq!(style.math.dpi, default.math.dpi);
    }

    #[test]
    fn test_scalar_where_section_expected_is_ignored() {
        let style = parse_config_string("margin = 5\ntext = \"big\"");
        assert_eq!(style, ReportStyle::default());
    }

    #[test]
    fn test_parse_config_string_invalid_toml() {
        let style = parse_config_string("this is not valid toml {{{");
        assert_eq!(style, ReportStyle::default());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[footer]\noffset = 12\nheight = 6").unwrap();
        let style = load_config_from_source(ConfigSource::File(path.to_str().unwrap()));
        assert_eq!(style.footer.offset, 12.0);
        assert_eq!(style.footer.height, 6.0);
    }

    #[test]
    fn test_load_config_missing_file() {
        let style = load_config_from_source(ConfigSource::File("nonexistent.toml"));
        assert_eq!(style, ReportStyle::default());
    }

    #[test]
    fn test_default_config_round_trips() {
        let text = default_config_toml();
        let parsed: Value = toml::from_str(&text).unwrap();
        assert!(parsed.get("math").and_then(|m| m.get("fallback")).is_some());
        assert_eq!(parse_config_string(&text), ReportStyle::default());
    }

    #[test]
    fn test_search_paths_start_in_working_directory() {
        let paths = config_search_paths();
        assert_eq!(paths[0], PathBuf::from(CONFIG_FILE_NAME));
        assert!(paths.iter().all(|p| p.ends_with(CONFIG_FILE_NAME)));
    }
}
