//! Account-info extraction from account-page HTML. Every strategy is
//! best-effort and only fills fields a previous strategy left empty, so a
//! second pass over the same document changes nothing.

pub mod context;
pub mod dates;
pub mod plan;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use url::Url;

use nfchecker_core::AccountInfo;

use crate::context::{first_string, model_data, parse_react_context};

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("valid email pattern")
});

/// Rendered-page elements that carry the plan name on account surfaces.
const PLAN_SELECTORS: &[&str] = &[
    r#"[data-uia="plan-name"]"#,
    r#"[data-uia="plan-label"]"#,
    r#"[data-uia="account-plan-name"]"#,
    ".account-section-item .plan-name",
];

/// Extract account attributes from an HTML document and its resolved URL.
pub fn extract(html: &str, url: &str) -> AccountInfo {
    let mut info = AccountInfo::default();

    info.country = country_from_url(url);

    if let Some(ctx) = parse_react_context(html) {
        info.fill_missing_from(info_from_context(&ctx));
    }

    if info.plan.is_none() {
        info.plan = plan_from_dom(html);
    }
    if info.plan.is_none() {
        info.plan = plan::plan_from_raw_json(html);
    }
    if info.plan.is_none() {
        info.plan = plan::plan_from_phrase_scan(html);
    }
    if info.email.is_none() {
        info.email = EMAIL.find(html).map(|m| m.as_str().to_string());
    }

    info
}

/// Two-letter locale segment immediately after the domain, e.g.
/// `netflix.com/ro/browse` -> `RO`.
pub fn country_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let first_segment = parsed.path_segments()?.next()?;
    if first_segment.len() == 2 && first_segment.chars().all(|c| c.is_ascii_lowercase()) {
        Some(first_segment.to_uppercase())
    } else {
        None
    }
}

fn info_from_context(ctx: &Value) -> AccountInfo {
    let mut info = AccountInfo::default();

    if let Some(user) = model_data(ctx, "userInfo") {
        info.email = first_string(user, &["membershipEmail", "email"]);
        info.country = first_string(user, &["countryOfSignup", "currentCountry"]);
        info.member_since = first_string(user, &["memberSince"])
            .map(|raw| dates::normalize_member_since(&raw));
    }

    let plan_name = model_data(ctx, "planInfo").and_then(|plan_info| {
        info.next_billing = first_string(plan_info, &["nextBillingDate"]);
        first_string(plan_info, &["planName"])
    });

    if let Some(account) = model_data(ctx, "accountInfo") {
        if info.email.is_none() {
            info.email = first_string(account, &["email", "membershipEmail"]);
        }
        if info.country.is_none() {
            info.country = first_string(account, &["country", "countryOfSignup"]);
        }
        // The stream allowance outranks whatever localized name the page
        // shows.
        if let Some(streams) = account.get("maxStreams").and_then(Value::as_u64) {
            info.plan = Some(plan::classify_by_streams(streams).to_string());
        }
    }

    if info.plan.is_none() {
        info.plan = plan_name.map(|name| plan::normalize_plan(&name));
    }

    if let Some(profiles) = model_data(ctx, "profiles").and_then(Value::as_array) {
        info.profiles = profiles
            .iter()
            .filter(|p| p.is_object())
            .filter_map(|p| first_string(p, &["firstName", "profileName"]))
            .collect();
    }

    info
}

fn plan_from_dom(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    for raw_selector in PLAN_SELECTORS {
        let Ok(selector) = Selector::parse(raw_selector) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let text = element.text().collect::<String>();
            let text = text.trim();
            if !text.is_empty() {
                return Some(plan::normalize_plan(text));
            }
        }
    }

    // Broader pass over visible text for known plan phrases.
    let body_selector = Selector::parse("body").ok()?;
    let body_text = document
        .select(&body_selector)
        .next()?
        .text()
        .collect::<Vec<_>>()
        .join(" ");
    plan::plan_from_phrase_scan(&body_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTEXT_PAGE: &str = r#"<html><body><script>
        netflix.reactContext = {"models":{
            "userInfo":{"data":{"membershipEmail":"user@example.com","countryOfSignup":"BR","memberSince":"setembro de 2019"}},
            "planInfo":{"data":{"planName":"Padr\x65o","nextBillingDate":"March 5, 2024"}},
            "accountInfo":{"data":{"maxStreams":4}},
            "profiles":{"data":[{"firstName":"Ana"},{"profileName":"Kids"},{"other":1}]}
        }};
    </script></body></html>"#;

    #[test]
    fn test_extract_from_context_blob() {
        let info = extract(CONTEXT_PAGE, "https://www.netflix.com/YourAccount");

        assert_eq!(info.email.as_deref(), Some("user@example.com"));
        assert_eq!(info.country.as_deref(), Some("BR"));
        assert_eq!(info.member_since.as_deref(), Some("September 2019"));
        assert_eq!(info.next_billing.as_deref(), Some("March 5, 2024"));
        assert_eq!(info.profiles, vec!["Ana", "Kids"]);
    }

    #[test]
    fn test_stream_count_outranks_plan_name() {
        // maxStreams 4 forces Premium regardless of the localized name.
        let info = extract(CONTEXT_PAGE, "https://www.netflix.com/YourAccount");
        assert_eq!(info.plan.as_deref(), Some(plan::PLAN_PREMIUM));
    }

    #[test]
    fn test_country_from_url_locale_segment() {
        assert_eq!(
            country_from_url("https://www.netflix.com/ro/browse"),
            Some("RO".to_string())
        );
        assert_eq!(country_from_url("https://www.netflix.com/browse"), None);
        assert_eq!(country_from_url("not a url"), None);
    }

    #[test]
    fn test_url_country_wins_over_context() {
        let info = extract(CONTEXT_PAGE, "https://www.netflix.com/fr/account");
        assert_eq!(info.country.as_deref(), Some("FR"));
    }

    #[test]
    fn test_dom_selector_plan_fallback() {
        let html = r#"<html><body><div data-uia="plan-name">Est&aacute;ndar</div></body></html>"#;
        let info = extract(html, "https://www.netflix.com/YourAccount");
        assert_eq!(info.plan.as_deref(), Some(plan::PLAN_STANDARD));
    }

    #[test]
    fn test_raw_json_plan_fallback() {
        let html = r#"<html><body><script>{"planName":"Premium"}</script></body></html>"#;
        let info = extract(html, "https://www.netflix.com/YourAccount");
        assert_eq!(info.plan.as_deref(), Some(plan::PLAN_PREMIUM));
    }

    #[test]
    fn test_phrase_scan_plan_fallback() {
        let html = "<html><body><p>You are on the Basic with ads plan.</p></body></html>";
        let info = extract(html, "https://www.netflix.com/YourAccount");
        assert_eq!(info.plan.as_deref(), Some(plan::PLAN_BASIC_ADS));
    }

    #[test]
    fn test_email_regex_fallback() {
        let html = "<html><body>Signed in as someone@example.org</body></html>";
        let info = extract(html, "https://www.netflix.com/YourAccount");
        assert_eq!(info.email.as_deref(), Some("someone@example.org"));
    }

    #[test]
    fn test_extract_is_idempotent() {
        let first = extract(CONTEXT_PAGE, "https://www.netflix.com/YourAccount");
        let second = extract(CONTEXT_PAGE, "https://www.netflix.com/YourAccount");
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_document_yields_empty_info() {
        let info = extract("", "https://www.netflix.com/YourAccount");
        assert!(info.email.is_none());
        assert!(info.plan.is_none());
        assert!(info.profiles.is_empty());
    }
}
