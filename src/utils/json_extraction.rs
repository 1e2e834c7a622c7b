//! JSON extraction from model responses.
//!
//! Generation models wrap their JSON in markdown fences or prose more often
//! than not. Extraction tries, in order:
//!
//! 1. a ```json fenced block,
//! 2. a generic ``` fenced block,
//! 3. the first balanced JSON object or array in the content.
//!
//! Each candidate must parse as JSON before it is accepted.

use regex::Regex;

/// Extracts a JSON document from mixed model output.
///
/// Returns `None` when no parseable JSON object or array is present.
pub fn extract_json(content: &str) -> Option<String> {
    let trimmed = content.trim();

    for candidate in [
        fenced_block(trimmed, true),
        fenced_block(trimmed, false),
        balanced_document(trimmed),
    ]
    .into_iter()
    .flatten()
    {
        if serde_json::from_str::<serde_json::Value>(&candidate).is_ok() {
            return Some(candidate);
        }
    }

    None
}

/// Extracts the contents of a markdown code fence. With `json_only`, only
/// ```json fences match.
fn fenced_block(content: &str, json_only: bool) -> Option<String> {
    let pattern = if json_only {
        r"```json\s*\n?([\s\S]*?)\n?```"
    } else {
        r"```(?:\w+)?\s*\n?([\s\S]*?)\n?```"
    };
    let re = Regex::new(pattern).ok()?;
    let inner = re.captures(content)?.get(1)?.as_str().trim();
    balanced_document(inner).or_else(|| Some(inner.to_string()))
}

/// Finds the first balanced `{...}` or `[...]` in the content, honoring
/// string literals and escapes.
fn balanced_document(content: &str) -> Option<String> {
    let start = content.find(['{', '['])?;
    let open = content[start..].chars().next()?;
    let close = if open == '{' { '}' } else { ']' };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in content[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            c if c == open && !in_string => depth += 1,
            c if c == close && !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(content[start..=start + i].to_string());
                }
            }
            _ => {}
        }
    }

    None
}
