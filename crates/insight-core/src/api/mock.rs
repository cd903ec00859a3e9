use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::time::Instant;

use crate::error::TransportError;

use super::{Auth, HttpResponse, Transport};

/// What the mock does for one request.
#[derive(Debug, Clone)]
pub enum Scripted {
    Respond(u16, String),
    Fail(String),
}

/// Owned copy of the scheme a request was sent with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedAuth {
    None,
    Basic(String),
    Digest(String),
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub auth: RecordedAuth,
    pub at: Instant,
}

type Router = Box<dyn Fn(&str) -> Scripted + Send + Sync>;

/// A scripted [`Transport`] for tests. Answers from a queue first, then
/// from an optional URL router, then from a fallback, and records every
/// request it sees.
pub struct MockTransport {
    queue: Mutex<VecDeque<Scripted>>,
    router: Option<Router>,
    fallback: Option<Scripted>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn builder() -> MockTransportBuilder {
        MockTransportBuilder {
            queue: VecDeque::new(),
            router: None,
            fallback: None,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("mock lock").clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("mock lock").len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }

    pub fn auths(&self) -> Vec<RecordedAuth> {
        self.requests().into_iter().map(|r| r.auth).collect()
    }

    pub fn times(&self) -> Vec<Instant> {
        self.requests().into_iter().map(|r| r.at).collect()
    }
}

pub struct MockTransportBuilder {
    queue: VecDeque<Scripted>,
    router: Option<Router>,
    fallback: Option<Scripted>,
}

impl MockTransportBuilder {
    pub fn respond(mut self, status: u16, body: impl Into<String>) -> Self {
        self.queue.push_back(Scripted::Respond(status, body.into()));
        self
    }

    pub fn respond_json(self, status: u16, body: &serde_json::Value) -> Self {
        self.respond(status, body.to_string())
    }

    pub fn fail(mut self, message: impl Into<String>) -> Self {
        self.queue.push_back(Scripted::Fail(message.into()));
        self
    }

    pub fn route(mut self, router: impl Fn(&str) -> Scripted + Send + Sync + 'static) -> Self {
        self.router = Some(Box::new(router));
        self
    }

    pub fn otherwise(mut self, status: u16, body: impl Into<String>) -> Self {
        self.fallback = Some(Scripted::Respond(status, body.into()));
        self
    }

    pub fn build(self) -> Arc<MockTransport> {
        Arc::new(MockTransport {
            queue: Mutex::new(self.queue),
            router: self.router,
            fallback: self.fallback,
            requests: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &str, auth: Auth<'_>) -> Result<HttpResponse, TransportError> {
        let auth = match auth {
            Auth::None => RecordedAuth::None,
            Auth::Basic(c) => RecordedAuth::Basic(c.username.clone()),
            Auth::Digest(c) => RecordedAuth::Digest(c.username.clone()),
        };
        self.requests.lock().expect("mock lock").push(RecordedRequest {
            url: url.to_owned(),
            auth,
            at: Instant::now(),
        });

        let queued = self.queue.lock().expect("mock lock").pop_front();
        let scripted = queued
            .or_else(|| self.router.as_ref().map(|route| route(url)))
            .or_else(|| self.fallback.clone())
            .ok_or_else(|| TransportError::Other(format!("no scripted response for {url}")))?;

        match scripted {
            Scripted::Respond(status, body) => Ok(HttpResponse {
                status: StatusCode::from_u16(status)
                    .map_err(|e| TransportError::Other(format!("bad scripted status: {e}")))?,
                body,
            }),
            Scripted::Fail(message) => Err(TransportError::Other(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queue_then_router_then_fallback() {
        let mock = MockTransport::builder()
            .respond(201, "queued")
            .route(|url| {
                if url.ends_with("/routed") {
                    Scripted::Respond(200, "routed".into())
                } else {
                    Scripted::Fail("unrouted".into())
                }
            })
            .build();

        let first = mock.get("http://x/routed", Auth::None).await.expect("queued");
        assert_eq!(first.status, StatusCode::CREATED);
        let second = mock.get("http://x/routed", Auth::None).await.expect("routed");
        assert_eq!(second.body, "routed");
        assert!(mock.get("http://x/other", Auth::None).await.is_err());
        assert_eq!(mock.request_count(), 3);
    }
}
