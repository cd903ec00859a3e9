use std::fmt;
use std::time::Duration;

use reqwest::Url;

use crate::error::InsightError;

use super::retry::RetryPolicy;
use super::Auth;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Credentials plus the schemes they may be used with.
///
/// Both flags may be set; Digest then wins and Basic is never sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthConfig {
    pub credentials: Option<Credentials>,
    pub basic: bool,
    pub digest: bool,
}

impl AuthConfig {
    /// Scheme to attach to the next request.
    pub fn scheme(&self) -> Auth<'_> {
        match (&self.credentials, self.digest, self.basic) {
            (Some(credentials), true, _) => Auth::Digest(credentials),
            (Some(credentials), false, true) => Auth::Basic(credentials),
            _ => Auth::None,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), InsightError> {
        if (self.basic || self.digest) && self.credentials.is_none() {
            return Err(InsightError::Config(
                "basic or digest authentication requires a username and password".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Everything the request engine needs to reach one Insight instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL ending in `/`, e.g. `https://insight.example.com/api/`.
    pub base_address: String,
    pub timeout: Duration,
    pub auth: AuthConfig,
    pub retry: RetryPolicy,
    /// Client-side cap on outbound requests; every attempt counts.
    pub requests_per_second: Option<u32>,
}

impl ClientConfig {
    pub fn new(base_address: impl Into<String>) -> Self {
        Self {
            base_address: base_address.into(),
            timeout: DEFAULT_TIMEOUT,
            auth: AuthConfig::default(),
            retry: RetryPolicy::default(),
            requests_per_second: None,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), InsightError> {
        parse_base_address(&self.base_address)?;
        self.auth.validate()?;
        self.retry.validate()?;
        if self.requests_per_second == Some(0) {
            return Err(InsightError::Config(
                "requests_per_second must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Check that `base` is an HTTP(S) URL ending in `/`.
///
/// Request paths are appended verbatim, so a missing separator would
/// silently produce wrong URLs; it is rejected rather than patched up.
pub(super) fn parse_base_address(base: &str) -> Result<Url, InsightError> {
    let parsed = Url::parse(base).map_err(|e| {
        InsightError::Config(format!(
            "invalid base address `{base}`: expected HTTP(S) URL ({e})"
        ))
    })?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(InsightError::Config(format!(
                "unsupported base address scheme `{other}`; expected http or https"
            )))
        }
    }
    if !base.ends_with('/') {
        return Err(InsightError::Config(format!(
            "base address `{base}` must end with `/`"
        )));
    }
    Ok(parsed)
}

pub(super) fn resolve_credentials(
    user: Option<&str>,
    pass: Option<&str>,
) -> Result<Option<Credentials>, InsightError> {
    match (user, pass) {
        (Some(u), Some(p)) => Ok(Some(Credentials {
            username: u.to_owned(),
            password: p.to_owned(),
        })),
        (Some(_), None) | (None, Some(_)) => Err(InsightError::Config(
            "both username and password must be set together".to_owned(),
        )),
        (None, None) => Ok(None),
    }
}
