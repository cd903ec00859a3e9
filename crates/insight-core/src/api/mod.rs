//! Insight HTTP API client.
//!
//! [`InsightClient`] exposes one method per explorer endpoint on top of a
//! retrying request engine. The HTTP layer itself sits behind the
//! [`Transport`] trait; [`ReqwestTransport`] is the production
//! implementation and handles Basic and Digest authentication.

mod client;
mod connection;
mod engine;
#[cfg(test)]
pub mod mock;
mod pagination;
mod retry;
mod transport;

pub use client::{AddressQuery, BalanceKind, InsightClient, InsightClientBuilder};
pub use connection::{AuthConfig, ClientConfig, Credentials};
pub use pagination::{PageWindow, PAGE_SIZE};
pub use retry::{next_backoff, Backoff, RetryPolicy};
pub use transport::ReqwestTransport;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::error::TransportError;

/// Authentication applied to a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth<'a> {
    None,
    Basic(&'a Credentials),
    Digest(&'a Credentials),
}

/// Status and body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

/// One HTTP GET round trip, with no retry or status policy of its own.
///
/// Implementations report any response the server produced, whatever its
/// status, and return `Err` only when no response could be obtained.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, auth: Auth<'_>) -> Result<HttpResponse, TransportError>;
}
