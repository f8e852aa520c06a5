use crate::markdown::Block;

/// Escapes a string for inclusion in a JSON string literal.
fn escape_json(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn string_array(items: &[String]) -> String {
    let inner = items.iter().map(|s| escape_json(s)).collect::<Vec<_>>();
    format!("[{}]", inner.join(", "))
}

impl Block {
    /// Saves blocks to a JSON file for inspection.
    ///
    /// # Example
    /// ```no_run
    /// use md2report::markdown::{parse_blocks, Block};
    ///
    /// let blocks = parse_blocks("# Title\n\n$$x^2$$");
    /// Block::save_to_json_file(&blocks, "blocks.json").unwrap();
    /// ```
    pub fn save_to_json_file(blocks: &[Block], file_path: &str) -> std::io::Result<()> {
        std::fs::write(file_path, Self::blocks_to_readable_json(blocks))
    }

    /// Pretty-printed JSON array of blocks, one object per block.
    pub fn blocks_to_readable_json(blocks: &[Block]) -> String {
        if blocks.is_empty() {
            return "[]\n".to_string();
        }
        let items = blocks
            .iter()
            .enumerate()
            .map(|(i, block)| block.to_readable_json(i, 1))
            .collect::<Vec<_>>();
        format!("[\n{}\n]\n", items.join(",\n"))
    }

    /// Converts a block into a readable JSON object.
    fn to_readable_json(&self, index: usize, indent_level: usize) -> String {
        let indent = "  ".repeat(indent_level);
        let inner = "  ".repeat(indent_level + 1);

        let mut fields = vec![
            format!("{}\"index\": {}", inner, index),
            format!("{}\"type\": \"{}\"", inner, self.kind()),
        ];
        match self {
            Block::Heading { level, text } => {
                fields.push(format!("{}\"level\": {}", inner, level));
                fields.push(format!("{}\"text\": {}", inner, escape_json(text)));
            }
            Block::ListItem { text } | Block::Paragraph { text } => {
                fields.push(format!("{}\"text\": {}", inner, escape_json(text)));
            }
            Block::DisplayMath { formula } => {
                fields.push(format!("{}\"formula\": {}", inner, escape_json(formula)));
            }
            Block::Table { rows, raw_lines } => {
                let rendered = rows
                    .iter()
                    .map(|row| format!("{}  {}", inner, string_array(row)))
                    .collect::<Vec<_>>();
                if rendered.is_empty() {
                    fields.push(format!("{}\"rows\": []", inner));
                } else {
                    fields.push(format!("{}\"rows\": [\n{}\n{}]", inner, rendered.join(",\n"), inner));
                }
                fields.push(format!("{}\"raw_lines\": {}", inner, string_array(raw_lines)));
            }
            Block::Rule | Block::Blank => {}
        }

        format!("{}{{\n{}\n{}}}", indent, fields.join(",\n"), indent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::parse_blocks;

    #[test]
    fn test_escape_json() {
        assert_eq!(escape_json("plain"), "\"plain\"");
        assert_eq!(escape_json("a \"q\" \\ b"), "\"a \\\"q\\\" \\\\ b\"");
        assert_eq!(escape_json("x\ty\u{1}"), "\"x\\ty\\u0001\"");
    }

    #[test]
    fn test_empty_dump() {
        assert_eq!(Block::blocks_to_readable_json(&[]), "[]\n");
    }

    #[test]
    fn test_dump_contains_each_block() {
        let blocks = parse_blocks("# Title\n\n| a | b |\n|---|---|\n| 1 | 2 |\n$$\\frac{1}{2}$$");
        let json = Block::blocks_to_readable_json(&blocks);
        assert!(json.contains("\"type\": \"Heading\""));
        assert!(json.contains("\"level\": 1"));
        assert!(json.contains("\"type\": \"Table\""));
        assert!(json.contains("[\"a\", \"b\"]"));
        assert!(json.contains("\"formula\": \"\\\\frac{1}{2}\""));
        assert_eq!(json.matches("\"index\"").count(), blocks.len());
    }

    #[test]
    fn test_save_to_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocks.json");
        let blocks = parse_blocks("- item");
        Block::save_to_json_file(&blocks, path.to_str().unwrap()).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"type\": \"ListItem\""));
    }
}
