/// Parse `text` as a JSON object directly, or — if the model wrapped its
/// answer in prose or a markdown code fence — extract the first balanced
/// `{...}` span and parse that instead, per the LLM contract in spec §4.1.
pub fn extract_json_object(text: &str) -> Option<serde_json::Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if value.is_object() {
            return Some(value);
        }
    }

    let start = trimmed.find('{')?;
    let bytes = trimmed.as_bytes();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        let ch = byte as char;
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + 1;
                    return serde_json::from_str(&trimmed[start..end]).ok();
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_object() {
        let value = extract_json_object(r#"{"a": 1}"#).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn extracts_object_from_markdown_fence() {
        let text = "Here is the plan:\n```json\n{\"a\": {\"b\": 2}}\n```\nDone.";
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["a"]["b"], 2);
    }

    #[test]
    fn ignores_braces_inside_strings_when_finding_the_close() {
        let text = r#"noise {"msg": "a } b", "n": 1} trailing"#;
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["n"], 1);
    }

    #[test]
    fn returns_none_for_unbalanced_input() {
        assert!(extract_json_object("not json at all").is_none());
    }
}
