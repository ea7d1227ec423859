use tracing::{debug, info, warn};

use nfchecker_core::config::AppConfig;
use nfchecker_core::{AccountInfo, CheckStatus, CookieSet, ValidationResult};

use crate::browser::BrowserSession;
use crate::error::SessionError;
use crate::probe::HttpProbe;

const LOGIN_PATHS: [&str; 2] = ["/login", "/LoginHelp"];

/// Script run on the account-security page to read the displayed email.
/// The page renders it client-side, so the DOM is the only place to get it.
const EMAIL_SCRIPT: &str = r#"
(() => {
    const selectors = [
        '[data-uia="account-email"]',
        '[data-uia="email-label"]',
        '.account-email',
    ];
    for (const sel of selectors) {
        const el = document.querySelector(sel);
        if (el && el.textContent.includes('@')) return el.textContent.trim();
    }
    const m = document.body.innerText.match(/[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}/);
    return m ? m[0] : '';
})()
"#;

/// Decides whether a cookie set still opens an authenticated session.
/// Primary path is a real browser; a plain HTTP probe steps in only when
/// the browser path errors out, never when it cleanly reports expiry.
pub struct SessionValidator {
    config: AppConfig,
}

impl SessionValidator {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub async fn validate(&self, cookies: &CookieSet, original_text: &str) -> ValidationResult {
        let mut result = ValidationResult::pending(original_text);

        if cookies.is_empty() {
            return ValidationResult::invalid(original_text.to_string());
        }

        match self.browser_attempt(cookies, &mut result).await {
            Ok(()) => result,
            Err(e) => {
                warn!("browser validation failed, falling back to http: {}", e);
                if let Err(fallback_err) = self.http_attempt(cookies, &mut result).await {
                    result.status = CheckStatus::Expired;
                    result.error = Some(fallback_err.to_string());
                }
                result
            }
        }
    }

    async fn browser_attempt(
        &self,
        cookies: &CookieSet,
        result: &mut ValidationResult,
    ) -> Result<(), SessionError> {
        let session = BrowserSession::launch(&self.config.browser)?;
        session.inject_cookies(cookies, ".netflix.com")?;

        let resolved = session.navigate(&self.config.target.browse_url()).await?;
        if is_login_url(&resolved) {
            result.status = CheckStatus::Expired;
            result.error = Some("Cookie expired - redirected to login".to_string());
            return Ok(());
        }

        result.status = CheckStatus::Valid;
        result.browser_cookies = session.harvest_cookies("netflix")?;

        let mut info = AccountInfo {
            country: nfchecker_extract::country_from_url(&resolved),
            ..Default::default()
        };

        // The security page is the one surface that shows the full email.
        match session.navigate(&self.config.target.security_url()).await {
            Ok(_) => {
                info.email = session.evaluate_text(EMAIL_SCRIPT);
            }
            Err(e) => debug!("security page unavailable: {}", e),
        }

        match session.navigate(&self.config.target.account_url()).await {
            Ok(account_url) => {
                let html = session.rendered_html()?;
                info.fill_missing_from(nfchecker_extract::extract(&html, &account_url));
            }
            Err(e) => debug!("account page unavailable: {}", e),
        }

        info!(email = ?info.email, plan = ?info.plan, "browser validation: session alive");
        result.apply_info(info);
        Ok(())
    }

    async fn http_attempt(
        &self,
        cookies: &CookieSet,
        result: &mut ValidationResult,
    ) -> Result<(), SessionError> {
        let probe = HttpProbe::new(&self.config.http)?;
        let response = probe
            .fetch(&self.config.target.account_url(), cookies)
            .await?;

        let leading = response.body.chars().take(1000).collect::<String>();
        if response.final_url.contains("/login") || leading.to_lowercase().contains("login") {
            result.status = CheckStatus::Expired;
            result.error = Some("Cookie expired - redirected to login".to_string());
            return Ok(());
        }

        result.status = CheckStatus::Valid;
        result.apply_info(nfchecker_extract::extract(&response.body, &response.final_url));
        Ok(())
    }
}

fn is_login_url(url: &str) -> bool {
    LOGIN_PATHS.iter().any(|path| url.contains(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nfchecker_parser::cookie;
    use nfchecker_core::CookieFormat;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn test_config(base_url: String) -> AppConfig {
        let mut config: AppConfig =
            toml::from_str(include_str!("../../../config/default.toml")).unwrap();
        config.target.base_url = base_url;
        config
    }

    fn session_cookies() -> CookieSet {
        cookie::parse("NetflixId=abc; SecureNetflixId=def", CookieFormat::Auto)
    }

    fn html_response(body: &str) -> String {
        format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        )
    }

    /// One-route fixture server; responder maps a request path to a raw
    /// HTTP/1.1 response. Returns the base URL to point the config at.
    async fn serve(responder: fn(&str) -> String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let (mut socket, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]).into_owned();
                    let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                    let _ = socket.write_all(responder(&path).as_bytes()).await;
                });
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_http_probe_redirect_to_login_is_expired() {
        fn routes(path: &str) -> String {
            if path.starts_with("/YourAccount") {
                "HTTP/1.1 302 Found\r\nLocation: /login\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                    .to_string()
            } else {
                html_response("<html><body>Sign In</body></html>")
            }
        }

        let base = serve(routes).await;
        let validator = SessionValidator::new(test_config(base));

        let mut result = ValidationResult::pending("raw text");
        validator
            .http_attempt(&session_cookies(), &mut result)
            .await
            .unwrap();

        assert_eq!(result.status, CheckStatus::Expired);
        assert_eq!(
            result.error.as_deref(),
            Some("Cookie expired - redirected to login")
        );
    }

    #[tokio::test]
    async fn test_http_probe_account_page_is_valid_with_info() {
        fn routes(_path: &str) -> String {
            html_response(concat!(
                "<html><body><script>netflix.reactContext = ",
                r#"{"models":{"userInfo":{"data":{"email":"member@example.com","countryOfSignup":"US"}},"accountInfo":{"data":{"maxStreams":4}}}};</script></body></html>"#,
            ))
        }

        let base = serve(routes).await;
        let validator = SessionValidator::new(test_config(base));

        let mut result = ValidationResult::pending("raw text");
        validator
            .http_attempt(&session_cookies(), &mut result)
            .await
            .unwrap();

        assert_eq!(result.status, CheckStatus::Valid);
        assert!(result.error.is_none());
        assert_eq!(result.email.as_deref(), Some("member@example.com"));
        assert_eq!(result.country.as_deref(), Some("US"));
        assert_eq!(result.plan.as_deref(), Some("Premium (UHD)"));
    }

    #[test]
    fn test_login_url_detection() {
        assert!(is_login_url("https://www.netflix.com/login"));
        assert!(is_login_url("https://www.netflix.com/LoginHelp?x=1"));
        assert!(!is_login_url("https://www.netflix.com/browse"));
    }

    #[tokio::test]
    async fn test_empty_cookie_set_is_invalid_without_network() {
        let config: AppConfig =
            toml::from_str(include_str!("../../../config/default.toml")).unwrap();
        let validator = SessionValidator::new(config);

        let result = validator.validate(&CookieSet::new(), "garbage").await;
        assert_eq!(result.status, CheckStatus::Invalid);
        assert_eq!(result.error.as_deref(), Some("Could not parse cookies"));
    }
}
