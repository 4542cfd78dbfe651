//! Robust JSON extraction from LLM replies (spec §4.3).
//!
//! Tries, in order: direct parse; a structural repair pass; brace-extraction
//! between the first `{` and last `}`; a stack-based balanced-brace scan;
//! and, for short non-JSON replies, a last-resort plain-text wrap. Strategies
//! 1-4 each re-attempt the repair sub-step on their extracted fragment.

use serde_json::Value;
use thiserror::Error;

const PLAIN_TEXT_WRAP_LIMIT: usize = 500;

#[derive(Debug, Error)]
#[error("could not extract JSON from reply: {preview}")]
pub struct ExtractError {
    pub preview: String,
}

fn preview(raw: &str) -> String {
    raw.chars().take(200).collect()
}

/// Strips markdown fences, balances braces/brackets, removes trailing
/// commas, normalises smart quotes, and deletes `//` and `/* */` comments.
pub fn repair(raw: &str) -> String {
    let mut text = raw.trim().to_string();

    if let Some(fenced) = strip_markdown_fence(&text) {
        text = fenced;
    }

    text = text
        .replace('\u{201c}', "\"")
        .replace('\u{201d}', "\"")
        .replace('\u{2018}', "'")
        .replace('\u{2019}', "'");

    text = strip_comments(&text);
    text = remove_trailing_commas(&text);
    text = balance_brackets(&text);

    text.trim().to_string()
}

fn strip_markdown_fence(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return None;
    }
    let without_open = trimmed.strip_prefix("```")?;
    let without_lang = without_open
        .strip_prefix("json")
        .or_else(|| without_open.strip_prefix("JSON"))
        .unwrap_or(without_open);
    let end = without_lang.rfind("```")?;
    Some(without_lang[..end].trim().to_string())
}

fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    let mut escape = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            _ => out.push(c),
        }
    }

    out
}

fn remove_trailing_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == ',' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j < chars.len() && (chars[j] == '}' || chars[j] == ']') {
                i += 1;
                continue;
            }
        }
        out.push(c);
        i += 1;
    }
    out
}

fn balance_brackets(text: &str) -> String {
    let mut braces = 0i32;
    let mut brackets = 0i32;
    let mut in_string = false;
    let mut escape = false;

    for c in text.chars() {
        if in_string {
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => braces += 1,
            '}' => braces -= 1,
            '[' => brackets += 1,
            ']' => brackets -= 1,
            _ => {}
        }
    }

    let mut out = text.to_string();
    while brackets > 0 {
        out.push(']');
        brackets -= 1;
    }
    while braces > 0 {
        out.push('}');
        braces -= 1;
    }
    out
}

fn extract_first_to_last_brace(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(text[start..=end].to_string())
}

/// Walks the string outside string literals tracking brace depth, yielding
/// every balanced `{...}` substring in order of appearance.
fn balanced_brace_fragments(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut fragments = Vec::new();
    let mut in_string = false;
    let mut escape = false;
    let mut depth = 0i32;
    let mut start = None;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start.take() {
                        fragments.push(chars[s..=i].iter().collect());
                    }
                }
            }
            _ => {}
        }
    }

    fragments
}

fn wrap_plain_text(raw: &str) -> Value {
    serde_json::json!({
        "replies": [{
            "text": raw,
            "strategy": "direct_response",
            "reasoning": "LLM returned plain text, wrapped automatically"
        }]
    })
}

/// Runs the full cascade and returns the extracted JSON value, or an
/// `ExtractError` carrying a 200-char preview if every strategy fails.
pub fn extract_json(raw: &str) -> Result<Value, ExtractError> {
    // Strategy 1: direct parse.
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        return Ok(value);
    }

    // Strategy 2: repair pass on the whole string.
    let repaired = repair(raw);
    if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
        return Ok(value);
    }

    // Strategy 3: first-brace-to-last-brace fragment, repaired.
    if let Some(fragment) = extract_first_to_last_brace(&repaired).or_else(|| extract_first_to_last_brace(raw)) {
        let repaired_fragment = repair(&fragment);
        if let Ok(value) = serde_json::from_str::<Value>(&repaired_fragment) {
            return Ok(value);
        }
    }

    // Strategy 4: stack-based balanced-brace scan, first fragment that parses.
    for fragment in balanced_brace_fragments(&repaired).into_iter().chain(balanced_brace_fragments(raw)) {
        let repaired_fragment = repair(&fragment);
        if let Ok(value) = serde_json::from_str::<Value>(&repaired_fragment) {
            return Ok(value);
        }
    }

    // Strategy 5: last-resort plain-text wrap for short non-JSON replies.
    if raw.len() < PLAIN_TEXT_WRAP_LIMIT && !raw.contains('{') {
        return Ok(wrap_plain_text(raw));
    }

    Err(ExtractError { preview: preview(raw) })
}
