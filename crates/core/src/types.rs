use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::CheckError;

/// The two identity cookies a session must carry before token minting is
/// even attempted. Matching is case-insensitive everywhere.
pub const IDENTITY_COOKIES: [&str; 2] = ["NetflixId", "SecureNetflixId"];

/// Name -> value credential mapping parsed from user-supplied text.
/// An empty set is the universal "could not parse" sentinel.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CookieSet {
    pairs: HashMap<String, String>,
}

impl CookieSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs.get(name).map(|v| v.as_str())
    }

    /// Case-insensitive lookup, for sloppy inputs that carry `netflixid=`.
    pub fn get_ci(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.pairs.iter()
    }

    /// Identity cookie names missing from this set, under any case variant.
    pub fn missing_identity_cookies(&self) -> Vec<&'static str> {
        IDENTITY_COOKIES
            .iter()
            .copied()
            .filter(|name| self.get_ci(name).is_none())
            .collect()
    }

    pub fn has_identity_cookies(&self) -> bool {
        self.missing_identity_cookies().is_empty()
    }

    /// Single `Cookie` header value, original names and values preserved.
    pub fn header_value(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl From<HashMap<String, String>> for CookieSet {
    fn from(pairs: HashMap<String, String>) -> Self {
        Self { pairs }
    }
}

impl FromIterator<(String, String)> for CookieSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().collect(),
        }
    }
}

/// Input dialect for cookie text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CookieFormat {
    Auto,
    Netscape,
    Json,
}

impl FromStr for CookieFormat {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "netscape" => Ok(Self::Netscape),
            "json" => Ok(Self::Json),
            other => Err(CheckError::Input(format!("unknown cookie format: {}", other))),
        }
    }
}

/// Terminal status of one cookie block.
/// `Invalid` means the text could not be parsed at all; `Expired` means the
/// credentials parsed but the target rejected them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Valid,
    Expired,
    Invalid,
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Valid => write!(f, "valid"),
            Self::Expired => write!(f, "expired"),
            Self::Invalid => write!(f, "invalid"),
        }
    }
}

/// Account attributes mined from an authenticated session's pages.
/// Every field is individually optional; extraction is best-effort.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AccountInfo {
    pub email: Option<String>,
    pub plan: Option<String>,
    pub country: Option<String>,
    pub member_since: Option<String>,
    pub next_billing: Option<String>,
    pub profiles: Vec<String>,
}

impl AccountInfo {
    /// Fill fields still unset from `other`. The first extraction step to
    /// populate a field wins; later steps never overwrite.
    pub fn fill_missing_from(&mut self, other: AccountInfo) {
        if self.email.is_none() {
            self.email = other.email;
        }
        if self.plan.is_none() {
            self.plan = other.plan;
        }
        if self.country.is_none() {
            self.country = other.country;
        }
        if self.member_since.is_none() {
            self.member_since = other.member_since;
        }
        if self.next_billing.is_none() {
            self.next_billing = other.next_billing;
        }
        if self.profiles.is_empty() {
            self.profiles = other.profiles;
        }
    }
}

/// Outcome of one cookie block check. Constructed once, immutable after
/// return, appended into its parent job record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub status: CheckStatus,
    pub email: Option<String>,
    pub plan: Option<String>,
    pub country: Option<String>,
    pub member_since: Option<String>,
    pub next_billing: Option<String>,
    pub profiles: Vec<String>,
    pub full_cookie: String,
    /// Semicolon-joined refreshed cookie string harvested from the browser
    /// session. Empty when the interactive path did not run or failed.
    pub browser_cookies: String,
    pub nftoken: Option<String>,
    pub nftoken_link: Option<String>,
    pub error: Option<String>,
}

impl ValidationResult {
    /// Result skeleton for a parseable block. Defaults to `expired` so the
    /// status is never left unset when a path errors early.
    pub fn pending(full_cookie: &str) -> Self {
        Self {
            status: CheckStatus::Expired,
            email: None,
            plan: None,
            country: None,
            member_since: None,
            next_billing: None,
            profiles: Vec::new(),
            full_cookie: full_cookie.to_string(),
            browser_cookies: String::new(),
            nftoken: None,
            nftoken_link: None,
            error: None,
        }
    }

    /// Terminal result for text that did not parse into any cookie pair.
    pub fn invalid(cookie_preview: String) -> Self {
        Self {
            status: CheckStatus::Invalid,
            error: Some("Could not parse cookies".to_string()),
            ..Self::pending("")
        }
        .with_full_cookie(cookie_preview)
    }

    fn with_full_cookie(mut self, full_cookie: String) -> Self {
        self.full_cookie = full_cookie;
        self
    }

    pub fn apply_info(&mut self, info: AccountInfo) {
        let mut merged = AccountInfo {
            email: self.email.take(),
            plan: self.plan.take(),
            country: self.country.take(),
            member_since: self.member_since.take(),
            next_billing: self.next_billing.take(),
            profiles: std::mem::take(&mut self.profiles),
        };
        merged.fill_missing_from(info);
        self.email = merged.email;
        self.plan = merged.plan;
        self.country = merged.country;
        self.member_since = merged.member_since;
        self.next_billing = merged.next_billing;
        self.profiles = merged.profiles;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Done,
}

/// Bulk-check job record. Counters only ever increment, `status` flips
/// processing -> done exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckJob {
    pub id: String,
    pub owner_id: String,
    pub owner_label: String,
    pub results: Vec<ValidationResult>,
    pub total: usize,
    pub checked_count: usize,
    pub valid_count: usize,
    pub expired_count: usize,
    pub invalid_count: usize,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

impl CheckJob {
    pub fn new(owner: &Identity, total: usize) -> Self {
        Self {
            id: new_id(),
            owner_id: owner.id.clone(),
            owner_label: owner.label.clone(),
            results: Vec::new(),
            total,
            checked_count: 0,
            valid_count: 0,
            expired_count: 0,
            invalid_count: 0,
            status: JobStatus::Processing,
            created_at: Utc::now(),
        }
    }
}

/// Append-only record of a check that came back valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidLogEntry {
    pub id: String,
    pub email: Option<String>,
    pub plan: Option<String>,
    pub country: Option<String>,
    pub member_since: Option<String>,
    pub nftoken: Option<String>,
    pub nftoken_link: Option<String>,
    pub checked_by: String,
    pub checked_by_label: String,
    pub created_at: DateTime<Utc>,
}

impl ValidLogEntry {
    pub fn from_result(result: &ValidationResult, owner: &Identity) -> Self {
        Self {
            id: new_id(),
            email: result.email.clone(),
            plan: result.plan.clone(),
            country: result.country.clone(),
            member_since: result.member_since.clone(),
            nftoken: result.nftoken.clone(),
            nftoken_link: result.nftoken_link.clone(),
            checked_by: owner.id.clone(),
            checked_by_label: owner.label.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Curated pool entry. `is_alive` stays unset until the first refresh cycle
/// has seen the entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreeCookie {
    pub id: String,
    pub email: Option<String>,
    pub plan: Option<String>,
    pub country: Option<String>,
    pub member_since: Option<String>,
    pub next_billing: Option<String>,
    #[serde(default)]
    pub profiles: Vec<String>,
    #[serde(default)]
    pub browser_cookies: String,
    #[serde(default)]
    pub full_cookie: String,
    pub nftoken: Option<String>,
    pub nftoken_link: Option<String>,
    pub is_alive: Option<bool>,
    pub last_refreshed: Option<DateTime<Utc>>,
    pub added_by: String,
    pub created_at: DateTime<Utc>,
}

/// Caller identity resolved by the external access-key service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub label: String,
    pub is_master: bool,
}

/// Outcome of one token-minting attempt. Minting never errors past this
/// boundary; callers always get either a token or a reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MintOutcome {
    Minted(String),
    Failed(String),
}

impl MintOutcome {
    pub fn is_minted(&self) -> bool {
        matches!(self, Self::Minted(_))
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Minted(token) => Some(token),
            Self::Failed(_) => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Minted(_) => None,
            Self::Failed(reason) => Some(reason),
        }
    }
}

/// Full per-block check pipeline: parse, validate, enrich, mint.
/// The bulk orchestrator fans out over this seam.
#[async_trait]
pub trait CookieChecker: Send + Sync + 'static {
    async fn check(&self, cookie_text: &str, format: CookieFormat) -> ValidationResult;
}

/// Auto-login token issuance against the external endpoint.
/// The refresh loop re-mints through this seam.
#[async_trait]
pub trait TokenMinter: Send + Sync + 'static {
    async fn mint(&self, cookies: &CookieSet) -> MintOutcome;
}

/// External access-key service. Consumed, never implemented here beyond
/// what the CLI needs.
#[async_trait]
pub trait AuthProvider: Send + Sync + 'static {
    async fn authenticate(&self, bearer: &str) -> Result<Identity, CheckError>;
}

/// Random document id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
