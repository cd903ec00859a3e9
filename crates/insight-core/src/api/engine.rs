use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::{ApiError, InsightError};

use super::connection::ClientConfig;
use super::retry::Backoff;
use super::{HttpResponse, Transport};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

// ==============================================================================
// RequestEngine: one logical GET with status check and backoff
// ==============================================================================

pub(crate) struct RequestEngine {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    limiter: Option<DirectRateLimiter>,
    cancel: Option<CancellationToken>,
}

impl RequestEngine {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        config: ClientConfig,
        cancel: Option<CancellationToken>,
    ) -> Result<Self, InsightError> {
        config.validate()?;
        let limiter = config
            .requests_per_second
            .and_then(NonZeroU32::new)
            .map(|limit| RateLimiter::direct(Quota::per_second(limit)));
        Ok(Self {
            transport,
            config,
            limiter,
            cancel,
        })
    }

    pub(crate) fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Mutable access for the client's setters. Callers re-validate.
    pub(crate) fn config_mut(&mut self) -> &mut ClientConfig {
        &mut self.config
    }

    pub(crate) fn set_cancellation(&mut self, cancel: Option<CancellationToken>) {
        self.cancel = cancel;
    }

    /// GET `base_address + path` until the server answers with `expected`.
    ///
    /// With retry disabled the first failure is returned as
    /// [`InsightError::Api`]. With retry enabled failures are logged and
    /// retried forever on the backoff schedule; only the cancellation token
    /// can end the loop early, with [`InsightError::Cancelled`].
    pub(crate) async fn get(
        &self,
        path: &str,
        expected: StatusCode,
    ) -> Result<HttpResponse, InsightError> {
        let url = format!("{}{}", self.config.base_address, path);
        let mut backoff = Backoff::new(&self.config.retry);
        let mut attempt: u64 = 0;

        loop {
            attempt += 1;
            let failure = match self.until_cancelled(self.attempt(&url, expected, attempt)).await {
                None => return Err(InsightError::Cancelled { url }),
                Some(Ok(response)) => return Ok(response),
                Some(Err(failure)) => failure,
            };

            if !self.config.retry.enabled {
                return Err(failure.into());
            }

            let wait = backoff.next_wait();
            self.log_retry(&failure, attempt, wait);
            if self.until_cancelled(tokio::time::sleep(wait)).await.is_none() {
                return Err(InsightError::Cancelled { url });
            }
        }
    }

    async fn attempt(
        &self,
        url: &str,
        expected: StatusCode,
        attempt: u64,
    ) -> Result<HttpResponse, ApiError> {
        self.wait_for_rate_limit().await;
        debug!(http.url = url, attempt, "insight request");

        let response = self
            .transport
            .get(url, self.config.auth.scheme())
            .await
            .map_err(|e| ApiError {
                message: e.to_string(),
                code: None,
                body: None,
                url: url.to_owned(),
            })?;
        debug!(
            http.url = url,
            status = %response.status,
            body_len = response.body.len(),
            "insight response"
        );
        trace!(http.url = url, body = %response.body, "insight response body");

        if response.status != expected {
            return Err(ApiError {
                message: format!(
                    "unexpected status {} (expected {})",
                    response.status, expected
                ),
                code: Some(response.status.as_u16()),
                body: Some(response.body),
                url: url.to_owned(),
            });
        }
        Ok(response)
    }

    fn log_retry(&self, failure: &ApiError, attempt: u64, wait: Duration) {
        let wait_ms = wait.as_millis() as u64;
        if self.config.retry.verbose {
            warn!(
                http.url = %failure.url,
                attempt,
                wait_ms,
                error = %failure,
                "insight request failed; retrying"
            );
        } else {
            debug!(
                http.url = %failure.url,
                attempt,
                wait_ms,
                error = %failure,
                "insight request failed; retrying"
            );
        }
    }

    async fn wait_for_rate_limit(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    /// Run `fut` to completion unless the cancellation token fires first.
    async fn until_cancelled<F: Future>(&self, fut: F) -> Option<F::Output> {
        match &self.cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => None,
                out = fut => Some(out),
            },
            None => Some(fut.await),
        }
    }
}
