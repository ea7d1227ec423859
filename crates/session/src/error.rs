use thiserror::Error;

/// Failures inside one validation attempt. These never cross the validator
/// boundary; they either trigger the fallback path or end up in the
/// result's `error` field.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("browser error: {0}")]
    Browser(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
