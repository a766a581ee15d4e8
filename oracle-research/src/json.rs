//! Pulling JSON payloads out of free-form model output

use oracle_core::{OracleError, OracleResult};
use serde::de::DeserializeOwned;

/// First balanced `{...}` in `content`
pub fn extract_object(content: &str) -> OracleResult<&str> {
    extract_balanced(content, b'{', b'}', "object")
}

/// First balanced `[...]` in `content`
pub fn extract_array(content: &str) -> OracleResult<&str> {
    extract_balanced(content, b'[', b']', "array")
}

/// Extract and deserialize the first JSON object
pub fn parse_object<T: DeserializeOwned>(content: &str, what: &str) -> OracleResult<T> {
    let json = extract_object(content)?;
    serde_json::from_str(json).map_err(|e| OracleError::parse(format!("Failed to parse {what}: {e}")))
}

/// Extract and deserialize the first JSON array
pub fn parse_array<T: DeserializeOwned>(content: &str, what: &str) -> OracleResult<Vec<T>> {
    let json = extract_array(content)?;
    serde_json::from_str(json).map_err(|e| OracleError::parse(format!("Failed to parse {what}: {e}")))
}

/// Scan from the first `open` byte, tracking depth, until it is balanced.
/// Delimiters inside string literals do not count.
fn extract_balanced<'a>(content: &'a str, open: u8, close: u8, kind: &str) -> OracleResult<&'a str> {
    let bytes = content.as_bytes();
    let start = bytes
        .iter()
        .position(|b| *b == open)
        .ok_or_else(|| OracleError::parse(format!("No JSON {kind} found in response")))?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
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

        if b == b'"' {
            in_string = true;
        } else if b == open {
            depth += 1;
        } else if b == close {
            depth -= 1;
            if depth == 0 {
                // Delimiters are ASCII, so both ends sit on char boundaries
                return Ok(&content[start..=i]);
            }
        }
    }

    Err(OracleError::parse(format!("Unterminated JSON {kind} in response")))
}
