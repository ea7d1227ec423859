use serde::Serialize;
use tracing::{info, warn};

use nfchecker_core::config::AppConfig;
use nfchecker_core::{CheckError, CookieSet};

use crate::browser::BrowserSession;
use crate::error::SessionError;

const CODE_FIELDS: [&str; 3] = [
    r#"input[data-uia="tvsignup-code-input"]"#,
    r#"input[name="code"]"#,
    r#"input[type="tel"]"#,
];

const SUBMIT_BUTTONS: [&str; 3] = [
    r#"button[data-uia="tvsignup-code-submit"]"#,
    r#"button[type="submit"]"#,
    "form button",
];

/// Outcome of a TV activation attempt. Automation failures are reported
/// here rather than raised; only a blank code is a caller error.
#[derive(Debug, Clone, Serialize)]
pub struct TvCodeReport {
    pub success: bool,
    pub message: String,
}

/// Activate a TV sign-in code using an authenticated session from the
/// free-cookie pool. Navigates to the TV login surface with the cookies
/// injected, enters the code and submits the form.
pub async fn submit_tv_code(
    config: &AppConfig,
    cookies: &CookieSet,
    code: &str,
) -> Result<TvCodeReport, CheckError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(CheckError::Input("TV code cannot be empty".to_string()));
    }
    if cookies.is_empty() {
        return Err(CheckError::Input(
            "Cookie entry has no usable cookies".to_string(),
        ));
    }

    match run_activation(config, cookies, code).await {
        Ok(report) => Ok(report),
        Err(e) => {
            warn!("tv code automation failed: {}", e);
            Ok(TvCodeReport {
                success: false,
                message: format!("Automation failed: {}", e),
            })
        }
    }
}

async fn run_activation(
    config: &AppConfig,
    cookies: &CookieSet,
    code: &str,
) -> Result<TvCodeReport, SessionError> {
    let session = BrowserSession::launch(&config.browser)?;
    session.inject_cookies(cookies, ".netflix.com")?;

    let resolved = session.navigate(&config.target.tv_login_url()).await?;
    if resolved.contains("/login") {
        return Ok(TvCodeReport {
            success: false,
            message: "Session is no longer signed in".to_string(),
        });
    }

    let mut filled = false;
    for selector in CODE_FIELDS {
        if session.fill_field(selector, code).is_ok() {
            filled = true;
            break;
        }
    }
    if !filled {
        return Ok(TvCodeReport {
            success: false,
            message: "Could not find the code entry field".to_string(),
        });
    }

    if !session.try_click(&SUBMIT_BUTTONS) {
        return Ok(TvCodeReport {
            success: false,
            message: "Could not find the submit button".to_string(),
        });
    }

    // Give the page a moment to accept or reject the code.
    tokio::time::sleep(std::time::Duration::from_millis(config.browser.settle_wait_ms)).await;

    let html = session.rendered_html()?;
    let html_lower = html.to_lowercase();
    let rejected = html_lower.contains("incorrect code")
        || html_lower.contains("invalid code")
        || html_lower.contains("try again");

    if rejected {
        Ok(TvCodeReport {
            success: false,
            message: "The TV did not accept this code".to_string(),
        })
    } else {
        info!("tv code submitted");
        Ok(TvCodeReport {
            success: true,
            message: "Code submitted; check the TV screen".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        toml::from_str(include_str!("../../../config/default.toml")).unwrap()
    }

    #[tokio::test]
    async fn test_blank_code_rejected_before_browser_launch() {
        let mut cookies = CookieSet::new();
        cookies.insert("NetflixId", "abc");

        let err = submit_tv_code(&test_config(), &cookies, "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::Input(_)));
    }

    #[tokio::test]
    async fn test_empty_cookies_rejected() {
        let err = submit_tv_code(&test_config(), &CookieSet::new(), "12345678")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckError::Input(_)));
    }
}
