//! Tolerant JSON extraction from LLM text output.
//!
//! Grounded on `original_source/.../server/worker.py`'s segment-generation
//! reply parsing: a model is asked for JSON but will sometimes wrap it in a
//! fenced code block, prefix it with commentary, or (rarely) return plain
//! text. `extract_json` tries, in order: a direct parse, a ```json fenced
//! block, the first balanced `{...}` object found anywhere in the text, and
//! finally a fallback object built from the raw text itself.

use serde_json::{Map, Value};

/// Parse `text` as the segment-generation JSON reply, falling back to
/// `{"script": text, "video_prompt": text[:200]}` if nothing parses.
pub fn extract_json(text: &str) -> Value {
    if let Some(v) = try_direct(text) {
        return v;
    }
    if let Some(v) = try_fenced(text) {
        return v;
    }
    if let Some(v) = try_first_object(text) {
        return v;
    }
    fallback(text)
}

fn try_direct(text: &str) -> Option<Value> {
    let v: Value = serde_json::from_str(text.trim()).ok()?;
    v.is_object().then_some(v)
}

fn try_fenced(text: &str) -> Option<Value> {
    let start_marker = text.find("```json").map(|i| i + "```json".len())?;
    let rest = &text[start_marker..];
    let end = rest.find("```")?;
    let candidate = rest[..end].trim();
    let v: Value = serde_json::from_str(candidate).ok()?;
    v.is_object().then_some(v)
}

/// Scan for the first `{`, then walk forward tracking brace depth (ignoring
/// braces inside string literals) until it closes, and try to parse that
/// span. Falls through to the next `{` on parse failure.
fn try_first_object(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let mut search_from = 0usize;

    while let Some(rel_start) = text[search_from..].find('{') {
        let start = search_from + rel_start;
        if let Some(end) = find_matching_brace(bytes, start) {
            let candidate = &text[start..=end];
            if let Ok(v) = serde_json::from_str::<Value>(candidate) {
                if v.is_object() {
                    return Some(v);
                }
            }
        }
        search_from = start + 1;
    }
    None
}

fn find_matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn fallback(text: &str) -> Value {
    let mut obj = Map::new();
    obj.insert("script".to_string(), Value::String(text.to_string()));
    let truncated: String = text.chars().take(200).collect();
    obj.insert("video_prompt".to_string(), Value::String(truncated));
    Value::Object(obj)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_direct_json() {
        let v = extract_json(r#"{"script": "a", "video_prompt": "b"}"#);
        assert_eq!(v["script"], "a");
        assert_eq!(v["video_prompt"], "b");
    }

    #[test]
    fn parses_fenced_json() {
        let text = "Here you go:\n```json\n{\"script\": \"a\", \"video_prompt\": \"b\"}\n```\nThanks.";
        let v = extract_json(text);
        assert_eq!(v["script"], "a");
    }

    #[test]
    fn parses_embedded_object_with_commentary() {
        let text = "Sure, here's the plan {\"script\": \"a\", \"video_prompt\": \"b\"} hope that helps";
        let v = extract_json(text);
        assert_eq!(v["script"], "a");
    }

    #[test]
    fn embedded_object_tolerates_braces_in_strings() {
        let text = r#"noise {"script": "uses a { brace }", "video_prompt": "p"} trailing"#;
        let v = extract_json(text);
        assert_eq!(v["script"], "uses a { brace }");
    }

    #[test]
    fn falls_back_to_raw_text_when_nothing_parses() {
        let v = extract_json("just plain prose, no braces here");
        assert_eq!(v["script"], "just plain prose, no braces here");
        assert_eq!(v["video_prompt"], "just plain prose, no braces here");
    }

    #[test]
    fn fallback_truncates_video_prompt_to_200_chars() {
        let long = "x".repeat(500);
        let v = extract_json(&long);
        assert_eq!(v["video_prompt"].as_str().unwrap().chars().count(), 200);
    }
}
