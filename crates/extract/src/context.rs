//! Decoding of the in-page configuration blob the account surfaces embed:
//! a global `reactContext = {...};` assignment whose string literals carry
//! hex-escaped bytes and stray backslashes that break strict JSON parsing.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

static REACT_CONTEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)reactContext\s*=\s*(\{.*?\});").expect("valid context pattern"));

static HEX_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\x([0-9a-fA-F]{2})").expect("valid hex escape pattern"));

/// Replace `\xNN` byte escapes with the character they encode. Escapes that
/// decode outside printable ASCII are replaced with a space so they cannot
/// re-break the JSON parse.
pub fn decode_hex_escapes(text: &str) -> String {
    HEX_ESCAPE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let byte = u8::from_str_radix(&caps[1], 16).unwrap_or(b' ');
            match byte {
                0x20..=0x7e if byte != b'"' && byte != b'\\' => (byte as char).to_string(),
                b'"' => "\\\"".to_string(),
                b'\\' => "\\\\".to_string(),
                _ => " ".to_string(),
            }
        })
        .into_owned()
}

/// Double any backslash that does not start a legal JSON escape sequence.
/// The blob mixes JavaScript string escaping with raw path fragments, so
/// lone backslashes are common.
pub fn repair_backslashes(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' {
            match bytes.get(i + 1).copied() {
                Some(next @ (b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't' | b'u')) => {
                    // Legal escape; copy both bytes so the second half is
                    // not re-inspected as a fresh backslash.
                    out.push('\\');
                    out.push(next as char);
                    i += 2;
                }
                _ => {
                    out.push('\\');
                    out.push('\\');
                    i += 1;
                }
            }
            continue;
        }
        let ch_len = utf8_len(bytes[i]);
        out.push_str(&text[i..i + ch_len]);
        i += ch_len;
    }

    out
}

fn utf8_len(first_byte: u8) -> usize {
    match first_byte {
        b if b < 0x80 => 1,
        b if b >> 5 == 0b110 => 2,
        b if b >> 4 == 0b1110 => 3,
        _ => 4,
    }
}

/// Locate and leniently parse the embedded context object. A missing blob or
/// a parse failure is silently `None`; the extractor carries on with its
/// other strategies.
pub fn parse_react_context(html: &str) -> Option<Value> {
    let raw = REACT_CONTEXT.captures(html)?.get(1)?.as_str();
    let decoded = decode_hex_escapes(raw);
    let repaired = repair_backslashes(&decoded);

    match serde_json::from_str::<Value>(&repaired) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("context blob present but unparseable: {}", e);
            None
        }
    }
}

/// `models.<name>.data` lookup inside the parsed context.
pub fn model_data<'a>(ctx: &'a Value, model: &str) -> Option<&'a Value> {
    ctx.get("models")?.get(model)?.get("data")
}

/// First present string under any of the given keys.
pub fn first_string(obj: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .filter_map(Value::as_str)
        .map(str::to_string)
        .find(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hex_escapes_printable() {
        assert_eq!(decode_hex_escapes(r"a\x20b"), "a b");
        assert_eq!(decode_hex_escapes(r"user\x40example.com"), "user@example.com");
    }

    #[test]
    fn test_decode_hex_escapes_quote_stays_escaped() {
        // \x22 is a double quote; decoding it bare would terminate the JSON
        // string early.
        assert_eq!(decode_hex_escapes(r"a\x22b"), "a\\\"b");
    }

    #[test]
    fn test_repair_doubles_lone_backslashes() {
        assert_eq!(repair_backslashes(r#""a\qb""#), r#""a\\qb""#);
        // Legal JSON escapes pass through untouched.
        assert_eq!(repair_backslashes(r#""a\nb""#), r#""a\nb""#);
        assert_eq!(repair_backslashes(r#""a\"b""#), r#""a\"b""#);
        // Trailing backslash is also doubled rather than dropped.
        assert_eq!(repair_backslashes(r#"ab\"#), r#"ab\\"#);
    }

    #[test]
    fn test_parse_react_context_happy_path() {
        let html = r#"<script>window.netflix = {};netflix.reactContext = {"models":{"userInfo":{"data":{"email":"a@b.com"}}}};</script>"#;
        let ctx = parse_react_context(html).expect("context parses");
        let user = model_data(&ctx, "userInfo").expect("userInfo present");
        assert_eq!(user.get("email").and_then(|v| v.as_str()), Some("a@b.com"));
    }

    #[test]
    fn test_parse_react_context_with_hex_escapes() {
        let html = r#"reactContext = {"models":{"userInfo":{"data":{"email":"a\x40b.com"}}}};"#;
        let ctx = parse_react_context(html).expect("hex-escaped context parses");
        let user = model_data(&ctx, "userInfo").unwrap();
        assert_eq!(user.get("email").and_then(|v| v.as_str()), Some("a@b.com"));
    }

    #[test]
    fn test_parse_react_context_garbage_is_none() {
        assert!(parse_react_context("reactContext = {broken};").is_none());
        assert!(parse_react_context("<html>no blob here</html>").is_none());
    }

    #[test]
    fn test_first_string_tries_keys_in_order() {
        let obj = serde_json::json!({"membershipEmail": "m@x.com", "email": "e@x.com"});
        assert_eq!(
            first_string(&obj, &["membershipEmail", "email"]),
            Some("m@x.com".to_string())
        );
        assert_eq!(first_string(&obj, &["missing", "email"]), Some("e@x.com".to_string()));
        assert_eq!(first_string(&obj, &["missing"]), None);
    }
}
