use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::protocol::cdp::Network::CookieParam;
use headless_chrome::{Browser, Tab};
use tracing::{debug, info};

use nfchecker_core::config::BrowserConfig;
use nfchecker_core::CookieSet;

use crate::error::SessionError;

/// One isolated headless-browser session with the target's cookies
/// injected. Dropped when the validation attempt finishes; sessions are
/// never shared between checks.
pub struct BrowserSession {
    _browser: Browser,
    tab: Arc<Tab>,
    config: BrowserConfig,
}

impl BrowserSession {
    /// Launch a browser and prepare a tab with a spoofed user agent.
    pub fn launch(config: &BrowserConfig) -> Result<Self, SessionError> {
        let mut extra_args: Vec<OsString> = Vec::new();

        // Required for running in Docker containers
        extra_args.push(OsString::from("--no-sandbox"));
        extra_args.push(OsString::from("--disable-dev-shm-usage"));
        extra_args.push(OsString::from("--disable-gpu"));

        let mut builder = headless_chrome::LaunchOptionsBuilder::default();
        builder
            .headless(true)
            .window_size(Some((1920, 1080)))
            .args(extra_args.iter().map(|a| a.as_ref()).collect());

        // Use CHROME_PATH env var if set (for Docker/custom installs)
        if let Ok(chrome_path) = std::env::var("CHROME_PATH") {
            builder.path(Some(std::path::PathBuf::from(chrome_path)));
        }

        let launch_options = builder
            .build()
            .map_err(|e| SessionError::Browser(e.to_string()))?;

        let browser = Browser::new(launch_options).map_err(|e| SessionError::Browser(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| SessionError::Browser(e.to_string()))?;

        tab.set_default_timeout(Duration::from_secs(config.nav_timeout_seconds));
        tab.set_user_agent(&config.user_agent, Some("en-US,en;q=0.9"), Some("Win32"))
            .map_err(|e| SessionError::Browser(e.to_string()))?;

        Ok(Self {
            _browser: browser,
            tab,
            config: config.clone(),
        })
    }

    /// Inject the cookie set scoped to the given domain.
    pub fn inject_cookies(&self, cookies: &CookieSet, domain: &str) -> Result<(), SessionError> {
        let params: Vec<CookieParam> = cookies
            .iter()
            .map(|(name, value)| CookieParam {
                name: name.clone(),
                value: value.clone(),
                url: None,
                domain: Some(domain.to_string()),
                path: Some("/".to_string()),
                secure: None,
                http_only: None,
                same_site: None,
                expires: None,
                priority: None,
                same_party: None,
                source_scheme: None,
                source_port: None,
                partition_key: None,
            })
            .collect();

        debug!(count = params.len(), domain, "injecting cookies");
        self.tab
            .set_cookies(params)
            .map_err(|e| SessionError::Browser(e.to_string()))
    }

    /// Navigate, wait for the page to load and for client-side rendering to
    /// settle, and return the resolved URL (redirects included).
    pub async fn navigate(&self, url: &str) -> Result<String, SessionError> {
        info!("navigating to {}", url);
        self.tab
            .navigate_to(url)
            .map_err(|e| SessionError::Browser(e.to_string()))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| SessionError::Browser(e.to_string()))?;

        tokio::time::sleep(Duration::from_millis(self.config.settle_wait_ms)).await;

        Ok(self.tab.get_url())
    }

    /// Full rendered HTML after script execution.
    pub fn rendered_html(&self) -> Result<String, SessionError> {
        self.tab
            .get_content()
            .map_err(|e| SessionError::Browser(e.to_string()))
    }

    /// All cookies currently in the browsing context whose domain contains
    /// `domain_fragment`, as a semicolon-joined header-style string. The
    /// target rotates session cookies server-side, so this is usually a
    /// refreshed superset of what was injected.
    pub fn harvest_cookies(&self, domain_fragment: &str) -> Result<String, SessionError> {
        let cookies = self
            .tab
            .get_cookies()
            .map_err(|e| SessionError::Browser(e.to_string()))?;

        let joined = cookies
            .iter()
            .filter(|c| c.domain.to_lowercase().contains(domain_fragment))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ");

        Ok(joined)
    }

    /// Fill a form field by CSS selector, firing the events client-side
    /// frameworks listen for.
    pub fn fill_field(&self, selector: &str, value: &str) -> Result<(), SessionError> {
        self.tab
            .evaluate(
                &format!(
                    r#"
                    const elem = document.querySelector('{}');
                    if (elem) {{
                        elem.value = '{}';
                        elem.dispatchEvent(new Event('input', {{ bubbles: true }}));
                        elem.dispatchEvent(new Event('change', {{ bubbles: true }}));
                    }} else {{
                        throw new Error('Element not found: {}');
                    }}
                    "#,
                    selector, value, selector
                ),
                false,
            )
            .map_err(|e| SessionError::Browser(e.to_string()))?;

        Ok(())
    }

    /// Click a button or link.
    pub fn click(&self, selector: &str) -> Result<(), SessionError> {
        self.tab
            .evaluate(
                &format!(
                    r#"
                    const elem = document.querySelector('{}');
                    if (elem) {{
                        elem.click();
                    }} else {{
                        throw new Error('Element not found: {}');
                    }}
                    "#,
                    selector, selector
                ),
                false,
            )
            .map_err(|e| SessionError::Browser(e.to_string()))?;

        Ok(())
    }

    /// Try to click an element using multiple selector strategies.
    pub fn try_click(&self, selectors: &[&str]) -> bool {
        for selector in selectors {
            if self.click(selector).is_ok() {
                debug!("clicked {}", selector);
                return true;
            }
        }
        false
    }

    /// Evaluate a script in page context and read back a string result.
    /// Evaluation failures are soft; callers treat `None` as "not found".
    pub fn evaluate_text(&self, script: &str) -> Option<String> {
        self.tab
            .evaluate(script, false)
            .ok()
            .and_then(|result| result.value)
            .and_then(|value| value.as_str().map(str::to_string))
            .filter(|text| !text.is_empty())
    }
}
