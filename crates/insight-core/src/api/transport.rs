use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::{StatusCode, Url};
use tracing::debug;

use crate::error::{InsightError, TransportError};

use super::{Auth, Credentials, HttpResponse, Transport};

/// [`Transport`] over a pooled `reqwest` client.
///
/// Basic credentials are sent preemptively. Digest needs the server's
/// challenge, so the first request goes out bare and is replayed once with
/// an `Authorization` header computed from the `WWW-Authenticate` nonce.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, InsightError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .timeout(timeout)
            .pool_max_idle_per_host(8)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| InsightError::Config(format!("build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    async fn answer_digest_challenge(
        &self,
        url: &str,
        credentials: &Credentials,
        challenge: reqwest::Response,
    ) -> Result<reqwest::Response, TransportError> {
        // A 401 that cannot be answered is the server's final word.
        let authorization = match digest_authorization(&challenge, credentials) {
            Ok(Some(authorization)) => authorization,
            Ok(None) => return Ok(challenge),
            Err(reason) => {
                debug!(http.url = url, %reason, "cannot answer authentication challenge");
                return Ok(challenge);
            }
        };
        debug!(http.url = url, "answering digest challenge");

        Ok(self
            .client
            .get(url)
            .header(AUTHORIZATION, authorization)
            .send()
            .await?)
    }
}

/// `Authorization` value for the Digest challenge carried by `challenge`,
/// or `None` when the response has no `WWW-Authenticate` header.
fn digest_authorization(
    challenge: &reqwest::Response,
    credentials: &Credentials,
) -> Result<Option<String>, String> {
    let Some(header) = challenge.headers().get(WWW_AUTHENTICATE) else {
        return Ok(None);
    };
    let header = header
        .to_str()
        .map_err(|e| format!("unreadable challenge header: {e}"))?;
    let mut prompt = digest_auth::parse(header).map_err(|e| e.to_string())?;

    let uri = request_uri(challenge.url());
    let context = digest_auth::AuthContext::new(
        credentials.username.as_str(),
        credentials.password.as_str(),
        uri.as_str(),
    );
    let answer = prompt.respond(&context).map_err(|e| e.to_string())?;
    Ok(Some(answer.to_header_string()))
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str, auth: Auth<'_>) -> Result<HttpResponse, TransportError> {
        let mut builder = self.client.get(url);
        if let Auth::Basic(credentials) = auth {
            builder = builder.basic_auth(&credentials.username, Some(&credentials.password));
        }
        let response = builder.send().await?;

        let response = match auth {
            Auth::Digest(credentials) if response.status() == StatusCode::UNAUTHORIZED => {
                self.answer_digest_challenge(url, credentials, response)
                    .await?
            }
            _ => response,
        };

        let status = response.status();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}

/// Path and query of `url`, as digest `uri=` expects.
fn request_uri(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uri_keeps_query() {
        let url = Url::parse("http://host/api/addrs/a,b/txs?from=0&to=50").expect("valid url");
        assert_eq!(request_uri(&url), "/api/addrs/a,b/txs?from=0&to=50");
    }

    #[test]
    fn request_uri_without_query() {
        let url = Url::parse("http://host/api/tx/abc").expect("valid url");
        assert_eq!(request_uri(&url), "/api/tx/abc");
    }
}
