//! Parsing of the model's `THOUGHT` / `ACTION` / `INPUT` / `DONE`
//! directives. Local models follow the protocol loosely, so parsing is
//! forgiving: first action wins, a `DONE` after a
//! committed action is ignored, and the `INPUT` payload goes through a
//! chain of progressively looser JSON repairs before giving up.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

/// The structured content of one model turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Directive {
    pub thought: Option<String>,
    pub action: Option<String>,
    pub input: Option<Value>,
    pub done: Option<String>,
}

fn input_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"INPUT:\s*(\{[\s\S]*?\})").expect("valid regex"))
}

fn bare_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"([{,]\s*)([A-Za-z_]\w*)\s*:"#).expect("valid regex"))
}

fn trailing_comma_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*([}\]])").expect("valid regex"))
}

fn key_value_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(\w+)\s*[:=]\s*['"]?([^'"}\],]+)['"]?"#).expect("valid regex"))
}

/// Parses one model response into a [`Directive`].
///
/// Scan rules, in line order:
/// - `THOUGHT:` — the first one seen before any action is kept
/// - `ACTION:` — the first one wins; later actions are ignored
/// - `INPUT:` — only considered after an action, and only once
/// - `DONE:` — only honored when no action was parsed first
///
/// A response with no recognizable directive becomes a bare thought.
pub fn parse_response(response: &str) -> Directive {
    let mut directive = Directive::default();
    let mut found_action = false;
    let mut input_tail: Option<String> = None;
    let mut done_lines: Vec<String> = Vec::new();
    let mut capturing_done = false;

    for line in response.lines() {
        let line = line.trim();

        if let Some(rest) = line.strip_prefix("THOUGHT:") {
            capturing_done = false;
            if directive.thought.is_none() && !found_action {
                directive.thought = Some(rest.trim().to_string());
            }
        } else if let Some(rest) = line.strip_prefix("ACTION:") {
            capturing_done = false;
            if !found_action {
                let name = rest
                    .trim()
                    .split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .trim_matches(|c| c == '"' || c == '\'' || c == '`');
                if !name.is_empty() {
                    directive.action = Some(name.to_string());
                    found_action = true;
                }
            }
        } else if let Some(rest) = line.strip_prefix("INPUT:") {
            capturing_done = false;
            if found_action && input_tail.is_none() {
                input_tail = Some(rest.trim().to_string());
            }
        } else if let Some(rest) = line.strip_prefix("DONE:") {
            if !found_action && done_lines.is_empty() {
                done_lines.push(rest.trim().to_string());
                capturing_done = true;
            } else {
                capturing_done = false;
            }
        } else if capturing_done && !line.is_empty() {
            // A final answer may run over several lines.
            done_lines.push(line.to_string());
        }
    }

    if !done_lines.is_empty() {
        directive.done = Some(done_lines.join("\n"));
    }

    if let Some(tail) = input_tail {
        directive.input = Some(parse_input(&tail, response));
    }

    if directive.thought.is_none()
        && directive.action.is_none()
        && directive.done.is_none()
    {
        directive.thought = Some(response.trim().to_string());
    }

    directive
}

/// Parses the `INPUT:` payload, trying progressively looser readings:
/// strict JSON, a brace block extracted from the full response,
/// single-quote and bare-key repair, trailing-comma removal, a
/// key/value regex sweep, and finally `{"raw": <original>}`.
pub fn parse_input(tail: &str, full_response: &str) -> Value {
    let tail = tail.trim();

    if let Ok(value) = serde_json::from_str::<Value>(tail) {
        if value.is_object() {
            return value;
        }
    }

    let candidate = input_block_re()
        .captures(full_response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| tail.to_string());

    if let Ok(value) = serde_json::from_str::<Value>(&candidate) {
        if value.is_object() {
            return value;
        }
    }

    let repaired = bare_key_re()
        .replace_all(&candidate.replace('\'', "\""), "$1\"$2\":")
        .to_string();
    if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
        if value.is_object() {
            return value;
        }
    }

    let decommaed = trailing_comma_re().replace_all(&repaired, "$1").to_string();
    if let Ok(value) = serde_json::from_str::<Value>(&decommaed) {
        if value.is_object() {
            return value;
        }
    }

    let mut map = Map::new();
    for caps in key_value_re().captures_iter(&candidate) {
        let key = caps[1].to_string();
        let raw = caps[2].trim();
        let value = if let Ok(n) = raw.parse::<i64>() {
            Value::from(n)
        } else if let Ok(f) = raw.parse::<f64>() {
            Value::from(f)
        } else if raw == "true" || raw == "false" {
            Value::from(raw == "true")
        } else {
            Value::from(raw)
        };
        map.insert(key, value);
    }
    if !map.is_empty() {
        return Value::Object(map);
    }

    let mut raw = Map::new();
    raw.insert("raw".to_string(), Value::from(tail));
    Value::Object(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_action_wins() {
        let directive = parse_response(
            "THOUGHT: hmm\nACTION: calculator\nINPUT: {\"expression\":\"2+2\"}\nACTION: datetime\nINPUT: {}",
        );
        assert_eq!(directive.thought.as_deref(), Some("hmm"));
        assert_eq!(directive.action.as_deref(), Some("calculator"));
        assert_eq!(directive.input, Some(json!({ "expression": "2+2" })));
        assert_eq!(directive.done, None);
    }

    #[test]
    fn done_is_ignored_after_an_action() {
        let directive = parse_response("ACTION: calculator\nINPUT: {}\nDONE: all finished");
        assert_eq!(directive.action.as_deref(), Some("calculator"));
        assert_eq!(directive.done, None);
    }

    #[test]
    fn done_alone_is_honored() {
        let directive = parse_response("THOUGHT: ready\nDONE: The answer is 4.");
        assert_eq!(directive.done.as_deref(), Some("The answer is 4."));
        assert_eq!(directive.action, None);
    }

    #[test]
    fn multiline_done_is_joined() {
        let directive = parse_response("DONE: Summary:\nfirst point\nsecond point");
        assert_eq!(
            directive.done.as_deref(),
            Some("Summary:\nfirst point\nsecond point")
        );
    }

    #[test]
    fn unstructured_response_becomes_a_thought() {
        let directive = parse_response("I am not sure what to do next.");
        assert_eq!(
            directive.thought.as_deref(),
            Some("I am not sure what to do next.")
        );
        assert_eq!(directive.action, None);
        assert_eq!(directive.done, None);
    }

    #[test]
    fn input_before_action_is_ignored() {
        let directive = parse_response("INPUT: {\"a\": 1}\nACTION: calculator");
        assert_eq!(directive.action.as_deref(), Some("calculator"));
        // The INPUT line preceded the action commitment, so no input.
        assert_eq!(directive.input, None);
    }

    #[test]
    fn action_name_is_first_word_unquoted() {
        let directive = parse_response("ACTION: \"calculator\" with input below");
        assert_eq!(directive.action.as_deref(), Some("calculator"));
    }

    #[test]
    fn input_tolerates_single_quotes_and_bare_keys() {
        let value = parse_input("{expression: '2+2'}", "");
        assert_eq!(value, json!({ "expression": "2+2" }));
    }

    #[test]
    fn input_tolerates_trailing_commas() {
        let value = parse_input("{\"a\": 1,}", "");
        assert_eq!(value, json!({ "a": 1 }));
    }

    #[test]
    fn input_spanning_lines_is_extracted_from_full_response() {
        let full = "ACTION: calculator\nINPUT: {\n  \"expression\": \"1+1\"\n}";
        let directive = parse_response(full);
        assert_eq!(directive.input, Some(json!({ "expression": "1+1" })));
    }

    #[test]
    fn input_falls_back_to_key_value_pairs() {
        let value = parse_input("expression = 2+2, base = 10", "");
        assert_eq!(value["expression"], json!("2+2"));
        assert_eq!(value["base"], json!(10));
    }

    #[test]
    fn input_falls_back_to_raw() {
        let value = parse_input("???", "ACTION: x\nINPUT: ???");
        assert_eq!(value, json!({ "raw": "???" }));
    }
}
