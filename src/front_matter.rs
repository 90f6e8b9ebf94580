//! Splitting a leading `---` metadata block off a Markdown document.

use serde_yaml::Value;

use crate::document::{MetaValue, Metadata};

const OPEN: &str = "---";
const CLOSE: &[&str] = &["---", "..."];

/// Split `input` into its front matter and the Markdown body that follows.
///
/// Documents without a front matter block come back unchanged with empty
/// metadata. The block is read as YAML; if that fails, it is scanned as
/// plain `key: value` lines instead.
pub fn split(input: &str) -> (Metadata, &str) {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);

    let mut lines = input.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return (Metadata::default(), input);
    };
    if first.trim_end() != OPEN {
        return (Metadata::default(), input);
    }

    let mut offset = first.len();
    let block_start = offset;
    for line in lines {
        let line_start = offset;
        offset += line.len();
        if CLOSE.contains(&line.trim_end()) {
            let block = &input[block_start..line_start];
            return (parse_block(block), &input[offset..]);
        }
    }

    log::warn!("Front matter block is never closed; treating it as Markdown");
    (Metadata::default(), input)
}

fn parse_block(block: &str) -> Metadata {
    match serde_yaml::from_str::<Value>(block) {
        Ok(Value::Mapping(mapping)) => {
            let mut metadata = Metadata::default();
            for (key, value) in mapping {
                let Some(key) = scalar_to_string(&key) else {
                    continue;
                };
                match value_to_meta(&value) {
                    Some(meta) => metadata.insert(key, meta),
                    None => log::warn!("Skipping front matter key '{}' with nested value", key),
                }
            }
            metadata
        }
        Ok(Value::Null) => Metadata::default(),
        Ok(_) => {
            log::warn!("Front matter is not a mapping; scanning key: value lines");
            scan_lines(block)
        }
        Err(e) => {
            log::warn!("Front matter is not valid YAML ({}); scanning key: value lines", e);
            scan_lines(block)
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_to_meta(value: &Value) -> Option<MetaValue> {
    match value {
        Value::Sequence(items) => Some(MetaValue::List(
            items.iter().filter_map(scalar_to_string).collect(),
        )),
        Value::Null => Some(MetaValue::Text(String::new())),
        other => scalar_to_string(other).map(MetaValue::Text),
    }
}

/// The forgiving fallback: one `key: value` per line, surrounding quotes
/// stripped, anything else ignored.
fn scan_lines(block: &str) -> Metadata {
    let mut metadata = Metadata::default();
    for line in block.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() || key.starts_with('#') {
            continue;
        }
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
        metadata.insert(key.to_string(), MetaValue::Text(value.to_string()));
    }
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_front_matter_is_split_off() {
        let input = "---\ntitle: Report\nauthor: Sam\nkeywords:\n  - rust\n  - pdf\nversion: 2\n---\n# Body\n";
        let (meta, body) = split(input);
        assert_eq!(body, "# Body\n");
        assert_eq!(meta.title(), Some("Report"));
        assert_eq!(meta.author(), Some("Sam"));
        assert_eq!(meta.keywords(), vec!["rust", "pdf"]);
        assert_eq!(meta.get("version"), Some(&MetaValue::Text("2".into())));
    }

    #[test]
    fn documents_without_front_matter_are_untouched() {
        let input = "# Title\n---\ntext";
        let (meta, body) = split(input);
        assert!(meta.is_empty());
        assert_eq!(body, input);
    }

    #[test]
    fn broken_yaml_falls_back_to_line_scan() {
        let input = "---\ntitle: \"A: B\" extra\ndate: 2024-03-01\n---\nbody";
        let (meta, body) = split(input);
        assert_eq!(body, "body");
        assert_eq!(meta.get("date"), Some(&MetaValue::Text("2024-03-01".into())));
        assert!(meta.title().is_some());
    }

    #[test]
    fn unclosed_block_is_left_in_the_body() {
        let input = "---\ntitle: x\n# Heading";
        let (meta, body) = split(input);
        assert!(meta.is_empty());
        assert_eq!(body, input);
    }

    #[test]
    fn dots_close_the_block_and_bom_is_ignored() {
        let (meta, body) = split("\u{feff}---\ntitle: T\n...\nrest");
        assert_eq!(meta.title(), Some("T"));
        assert_eq!(body, "rest");
    }
}
