use nfchecker_core::{CookieFormat, CookieSet};
use serde_json::Value;

/// Parse raw cookie text into a name -> value mapping.
///
/// An empty `CookieSet` means "unparseable" and is handled downstream as an
/// invalid block; parsing itself never fails.
pub fn parse(text: &str, format: CookieFormat) -> CookieSet {
    match format {
        CookieFormat::Netscape => parse_netscape(text),
        CookieFormat::Json => parse_json(text),
        CookieFormat::Auto => parse_auto(text),
    }
}

/// Netscape export format, tolerating mixed dialects within one block:
/// tab-delimited lines with >= 7 fields contribute fields 6/7 as name/value,
/// everything else containing `=` is treated as `key=value` pairs split
/// on `;`. Comment and blank lines are skipped.
pub fn parse_netscape(text: &str) -> CookieSet {
    let mut cookies = CookieSet::new();

    for line in text.trim().lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() >= 7 {
            cookies.insert(fields[5], fields[6]);
        } else if line.contains('=') {
            for pair in line.split(';') {
                let pair = pair.trim();
                if let Some((name, value)) = pair.split_once('=') {
                    if !name.trim().is_empty() {
                        cookies.insert(name.trim(), value.trim());
                    }
                }
            }
        }
    }

    cookies
}

/// JSON cookie exports: either an array of objects carrying `name`/`value`
/// keys, or a plain top-level object used as the mapping directly.
pub fn parse_json(text: &str) -> CookieSet {
    let mut cookies = CookieSet::new();

    let Ok(data) = serde_json::from_str::<Value>(text) else {
        return cookies;
    };

    match data {
        Value::Array(items) => {
            for item in items {
                let (Some(name), Some(value)) = (
                    item.get("name").and_then(Value::as_str),
                    item.get("value").and_then(Value::as_str),
                ) else {
                    continue;
                };
                cookies.insert(name, value);
            }
        }
        Value::Object(map) => {
            for (name, value) in map {
                match value {
                    Value::String(s) => cookies.insert(name, s),
                    // Non-string scalars still make usable cookie values.
                    Value::Number(n) => cookies.insert(name, n.to_string()),
                    Value::Bool(b) => cookies.insert(name, b.to_string()),
                    _ => {}
                }
            }
        }
        _ => {}
    }

    cookies
}

/// JSON-looking input tries JSON first; a non-empty mapping wins, anything
/// else falls back to netscape parsing. Never attempts JSON otherwise.
pub fn parse_auto(text: &str) -> CookieSet {
    let trimmed = text.trim();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        let cookies = parse_json(trimmed);
        if !cookies.is_empty() {
            return cookies;
        }
    }
    parse_netscape(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_netscape_seven_field_line() {
        let line = ".netflix.com\tTRUE\t/\tTRUE\t1999999999\tNetflixId\tv%3D3%26abc";
        let cookies = parse_netscape(line);

        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies.get("NetflixId"), Some("v%3D3%26abc"));
    }

    #[test]
    fn test_netscape_skips_comments_and_blanks() {
        let text = "# Netscape HTTP Cookie File\n\n# comment\nNetflixId=abc";
        let cookies = parse_netscape(text);

        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies.get("NetflixId"), Some("abc"));
    }

    #[test]
    fn test_netscape_header_style_pairs() {
        let cookies = parse_netscape("NetflixId=abc; SecureNetflixId=xyz; nfvdid=q");

        assert_eq!(cookies.len(), 3);
        assert_eq!(cookies.get("SecureNetflixId"), Some("xyz"));
    }

    #[test]
    fn test_netscape_mixed_dialects_in_one_block() {
        let text = ".netflix.com\tTRUE\t/\tTRUE\t0\tNetflixId\tfrom_tab\nSecureNetflixId=from_pair";
        let cookies = parse_netscape(text);

        assert_eq!(cookies.get("NetflixId"), Some("from_tab"));
        assert_eq!(cookies.get("SecureNetflixId"), Some("from_pair"));
    }

    #[test]
    fn test_json_array_of_cookie_objects() {
        let text = r#"[{"name":"NetflixId","value":"abc","domain":".netflix.com"},{"value":"orphan"},{"name":"SecureNetflixId","value":"xyz"}]"#;
        let cookies = parse_json(text);

        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies.get("NetflixId"), Some("abc"));
    }

    #[test]
    fn test_json_top_level_object() {
        let cookies = parse_json(r#"{"NetflixId":"abc","SecureNetflixId":"xyz"}"#);

        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies.get("NetflixId"), Some("abc"));
    }

    #[test]
    fn test_json_garbage_yields_empty_set() {
        assert!(parse_json("not json at all").is_empty());
        assert!(parse_json("[1, 2").is_empty());
    }

    #[test]
    fn test_auto_prefers_json_for_bracket_lead() {
        let cookies = parse(
            r#"[{"name":"NetflixId","value":"abc"}]"#,
            CookieFormat::Auto,
        );
        assert_eq!(cookies.get("NetflixId"), Some("abc"));
    }

    #[test]
    fn test_auto_falls_back_to_netscape_for_plain_text() {
        // No leading bracket, so JSON must never be attempted.
        let cookies = parse("NetflixId=abc; SecureNetflixId=xyz", CookieFormat::Auto);
        assert_eq!(cookies.len(), 2);
    }

    #[test]
    fn test_auto_broken_json_falls_through_to_netscape() {
        // Leading `{` but unparseable as JSON; the netscape pass still finds
        // the `=` pairs inside.
        let cookies = parse("{NetflixId=abc}", CookieFormat::Auto);
        assert_eq!(cookies.get("{NetflixId"), Some("abc}"));
    }

    #[test]
    fn test_empty_input_is_the_unparseable_sentinel() {
        assert!(parse("", CookieFormat::Auto).is_empty());
        assert!(parse("no tabs no equals", CookieFormat::Auto).is_empty());
    }
}
