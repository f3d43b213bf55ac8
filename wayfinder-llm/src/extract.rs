//! Fallback JSON extraction for predictor output that isn't valid JSON on
//! its own — spec.md §7 `ParseFailure` recovery, matching
//! `intent_parser.py`'s "look for JSON between braces" fallback, but
//! tracking brace nesting and string literals instead of just taking the
//! first `{` and the last `}` in the text (the original's naive version
//! grabs trailing prose past the real JSON object whenever the model adds
//! commentary after it).

use serde_json::Value;

/// Scan `text` for the first balanced `{...}` object and parse it.
/// Returns `None` if no balanced object is found or it doesn't parse.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + 1;
                    return serde_json::from_str(&text[start..end]).ok();
                }
            }
            _ => {}
        }
    }
    None
}
