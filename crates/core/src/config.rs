use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub target: TargetConfig,
    pub browser: BrowserConfig,
    pub http: HttpConfig,
    pub token: TokenConfig,
    pub checker: CheckerConfig,
    pub refresh: RefreshConfig,
    pub pool: PoolConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    pub data_dir: String,
}

/// Surfaces on the target site. Paths are joined onto `base_url`, which lets
/// tests point the whole pipeline at a local fixture server.
#[derive(Debug, Deserialize, Clone)]
pub struct TargetConfig {
    pub base_url: String,
    pub browse_path: String,
    pub account_path: String,
    pub security_path: String,
    pub tv_login_path: String,
}

impl TargetConfig {
    pub fn browse_url(&self) -> String {
        format!("{}{}", self.base_url, self.browse_path)
    }

    pub fn account_url(&self) -> String {
        format!("{}{}", self.base_url, self.account_path)
    }

    pub fn security_url(&self) -> String {
        format!("{}{}", self.base_url, self.security_path)
    }

    pub fn tv_login_url(&self) -> String {
        format!("{}{}", self.base_url, self.tv_login_path)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowserConfig {
    pub user_agent: String,
    pub nav_timeout_seconds: u64,
    /// Extra wait after navigation so client-side rendering can finish.
    pub settle_wait_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub user_agent: String,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TokenConfig {
    pub endpoint: String,
    pub user_agent: String,
    pub scope: String,
    pub persisted_query_version: u32,
    pub persisted_query_id: String,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CheckerConfig {
    /// Global ceiling on concurrent validations. Each one may launch a
    /// browser instance, so keep this small.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// How much of an unparseable input is kept on the result record.
    #[serde(default = "default_invalid_preview_len")]
    pub invalid_preview_len: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RefreshConfig {
    #[serde(default = "default_refresh_interval")]
    pub interval_seconds: u64,
    #[serde(default = "default_startup_grace")]
    pub startup_grace_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PoolConfig {
    #[serde(default = "default_display_limit")]
    pub default_display_limit: usize,
}

fn default_max_concurrency() -> usize { 5 }
fn default_invalid_preview_len() -> usize { 500 }
fn default_refresh_interval() -> u64 { 30 * 60 }
fn default_startup_grace() -> u64 { 60 }
fn default_display_limit() -> usize { 10 }
