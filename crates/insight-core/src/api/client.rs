use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::StatusCode;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::decode::{parse_body, Fields};
use crate::error::{DecodeError, InsightError};
use crate::types::{Address, Block, BlockSummaries, Transaction, UnspentOutput};
use crate::units::parse_satoshi_text;

use super::connection::{resolve_credentials, AuthConfig, ClientConfig, Credentials};
use super::engine::RequestEngine;
use super::transport::ReqwestTransport;
use super::{HttpResponse, Transport};

// ==============================================================================
// Builder
// ==============================================================================

/// Configures an [`InsightClient`].
///
/// ```no_run
/// # use insight_core::api::InsightClient;
/// let client = InsightClient::builder("https://insight.example.com/api/")
///     .retry(true)
///     .build()?;
/// # Ok::<(), insight_core::InsightError>(())
/// ```
pub struct InsightClientBuilder {
    config: ClientConfig,
    user: Option<String>,
    pass: Option<String>,
    cancel: Option<CancellationToken>,
}

impl InsightClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn credentials(mut self, user: impl Into<String>, pass: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.pass = Some(pass.into());
        self
    }

    /// Set credentials and enable HTTP Basic authentication.
    pub fn basic_auth(self, user: impl Into<String>, pass: impl Into<String>) -> Self {
        let mut builder = self.credentials(user, pass);
        builder.config.auth.basic = true;
        builder
    }

    /// Set credentials and enable HTTP Digest authentication.
    pub fn digest_auth(self, user: impl Into<String>, pass: impl Into<String>) -> Self {
        let mut builder = self.credentials(user, pass);
        builder.config.auth.digest = true;
        builder
    }

    /// Enable or disable the schemes independently of the credentials,
    /// e.g. when both come from separate configuration sources.
    pub fn auth_schemes(mut self, basic: bool, digest: bool) -> Self {
        self.config.auth.basic = basic;
        self.config.auth.digest = digest;
        self
    }

    pub fn retry(mut self, enabled: bool) -> Self {
        self.config.retry.enabled = enabled;
        self
    }

    pub fn backoff(mut self, initial: Duration, multiplier: f64, max: Duration) -> Self {
        self.config.retry.initial_backoff = initial;
        self.config.retry.multiplier = multiplier;
        self.config.retry.max_backoff = max;
        self
    }

    pub fn verbose_retry(mut self, verbose: bool) -> Self {
        self.config.retry.verbose = verbose;
        self
    }

    pub fn requests_per_second(mut self, limit: u32) -> Self {
        self.config.requests_per_second = Some(limit);
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn into_config(self) -> Result<(ClientConfig, Option<CancellationToken>), InsightError> {
        let mut config = self.config;
        config.auth.credentials = resolve_credentials(self.user.as_deref(), self.pass.as_deref())?;
        config.validate()?;
        Ok((config, self.cancel))
    }

    pub fn build(self) -> Result<InsightClient, InsightError> {
        let timeout = self.config.timeout;
        let (config, cancel) = self.into_config()?;
        let transport = Arc::new(ReqwestTransport::new(timeout)?);
        Ok(InsightClient {
            engine: RequestEngine::new(transport, config, cancel)?,
        })
    }

    /// Build over a caller-supplied transport (proxies, tests, recording).
    pub fn build_with_transport(
        self,
        transport: Arc<dyn Transport>,
    ) -> Result<InsightClient, InsightError> {
        let (config, cancel) = self.into_config()?;
        Ok(InsightClient {
            engine: RequestEngine::new(transport, config, cancel)?,
        })
    }
}

// ==============================================================================
// Query parameters
// ==============================================================================

/// Options for [`InsightClient::get_address`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddressQuery {
    /// Ask the server to omit the transaction id list (`noTxList=1`).
    pub no_transactions: bool,
    pub from: Option<u64>,
    pub to: Option<u64>,
}

impl AddressQuery {
    fn path(&self, address: &str) -> Result<String, InsightError> {
        if self.no_transactions && (self.from.is_some() || self.to.is_some()) {
            return Err(InsightError::Param(
                "cannot request a transaction range together with no_transactions".to_owned(),
            ));
        }
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(InsightError::Param(format!(
                    "transaction range start {from} is after its end {to}"
                )));
            }
        }

        let mut params = Vec::new();
        if self.no_transactions {
            params.push("noTxList=1".to_owned());
        }
        if let Some(from) = self.from {
            params.push(format!("from={from}"));
        }
        if let Some(to) = self.to {
            params.push(format!("to={to}"));
        }

        if params.is_empty() {
            Ok(format!("addr/{address}"))
        } else {
            Ok(format!("addr/{address}?{}", params.join("&")))
        }
    }
}

/// Plain-text amount endpoints under `addr/{address}/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceKind {
    Balance,
    TotalReceived,
    TotalSent,
    UnconfirmedBalance,
}

impl BalanceKind {
    fn segment(self) -> &'static str {
        match self {
            Self::Balance => "balance",
            Self::TotalReceived => "totalReceived",
            Self::TotalSent => "totalSent",
            Self::UnconfirmedBalance => "unconfirmedBalance",
        }
    }
}

/// Join addresses into the comma-separated form used by `addrs/` paths.
pub(super) fn join_addresses<S: AsRef<str>>(addresses: &[S]) -> Result<String, InsightError> {
    if addresses.is_empty() {
        return Err(InsightError::Param(
            "at least one address is required".to_owned(),
        ));
    }
    Ok(addresses
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(","))
}

// ==============================================================================
// InsightClient
// ==============================================================================

/// Client for one Insight API instance.
pub struct InsightClient {
    engine: RequestEngine,
}

impl InsightClient {
    pub fn builder(base_address: impl Into<String>) -> InsightClientBuilder {
        InsightClientBuilder {
            config: ClientConfig::new(base_address),
            user: None,
            pass: None,
            cancel: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        self.engine.config()
    }

    // ------------------------------------------------------------------
    // Setters
    // ------------------------------------------------------------------

    pub fn set_retry_enabled(&mut self, enabled: bool) {
        self.engine.config_mut().retry.enabled = enabled;
    }

    pub fn set_verbose_retry(&mut self, verbose: bool) {
        self.engine.config_mut().retry.verbose = verbose;
    }

    pub fn set_credentials(&mut self, user: &str, pass: &str) {
        self.engine.config_mut().auth.credentials = Some(Credentials {
            username: user.to_owned(),
            password: pass.to_owned(),
        });
    }

    pub fn set_basic_auth(&mut self, enabled: bool) -> Result<(), InsightError> {
        self.update_auth(|auth| auth.basic = enabled)
    }

    pub fn set_digest_auth(&mut self, enabled: bool) -> Result<(), InsightError> {
        self.update_auth(|auth| auth.digest = enabled)
    }

    pub fn set_cancellation(&mut self, token: Option<CancellationToken>) {
        self.engine.set_cancellation(token);
    }

    fn update_auth(
        &mut self,
        update: impl FnOnce(&mut AuthConfig),
    ) -> Result<(), InsightError> {
        let mut auth = self.engine.config().auth.clone();
        update(&mut auth);
        auth.validate()?;
        self.engine.config_mut().auth = auth;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Raw requests
    // ------------------------------------------------------------------

    /// GET `path` relative to the base address, expecting `200 OK`.
    pub async fn request(&self, path: &str) -> Result<HttpResponse, InsightError> {
        self.engine.get(path, StatusCode::OK).await
    }

    /// GET `path` relative to the base address, expecting `expected`.
    pub async fn request_expecting(
        &self,
        path: &str,
        expected: StatusCode,
    ) -> Result<HttpResponse, InsightError> {
        self.engine.get(path, expected).await
    }

    pub(super) async fn get_decoded<T>(
        &self,
        path: &str,
        record: &'static str,
        decode: impl FnOnce(&Value) -> Result<T, DecodeError>,
    ) -> Result<T, InsightError> {
        let response = self.request(path).await?;
        let value = parse_body(&response.body, record)?;
        Ok(decode(&value)?)
    }

    async fn get_string_field(
        &self,
        path: &str,
        record: &'static str,
        key: &str,
    ) -> Result<String, InsightError> {
        self.get_decoded(path, record, |value| Fields::new(value, record)?.str(key))
            .await
    }

    // ------------------------------------------------------------------
    // Blocks
    // ------------------------------------------------------------------

    pub async fn get_block(&self, block_hash: &str) -> Result<Block, InsightError> {
        self.get_decoded(&format!("block/{block_hash}"), "Block", Block::from_json)
            .await
    }

    /// Hash of the main-chain block at `height`.
    pub async fn get_block_hash(&self, height: u64) -> Result<String, InsightError> {
        self.get_string_field(&format!("block-index/{height}"), "BlockIndex", "blockHash")
            .await
    }

    /// Serialized block as hex.
    pub async fn get_raw_block(&self, block_hash: &str) -> Result<String, InsightError> {
        self.get_string_field(&format!("rawblock/{block_hash}"), "RawBlock", "rawblock")
            .await
    }

    /// Up to `limit` block summaries for `date` (UTC day), or for today.
    pub async fn get_block_summaries(
        &self,
        limit: u32,
        date: Option<NaiveDate>,
    ) -> Result<BlockSummaries, InsightError> {
        if limit == 0 {
            return Err(InsightError::Param(
                "block listing limit must be at least 1".to_owned(),
            ));
        }
        let path = match date {
            Some(date) => format!("blocks?limit={limit}&blockDate={}", date.format("%Y-%m-%d")),
            None => format!("blocks?limit={limit}"),
        };
        self.get_decoded(&path, "BlockSummaries", BlockSummaries::from_json)
            .await
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    pub async fn get_transaction(&self, txid: &str) -> Result<Transaction, InsightError> {
        self.get_decoded(&format!("tx/{txid}"), "Transaction", Transaction::from_json)
            .await
    }

    /// Serialized transaction as hex.
    pub async fn get_raw_transaction(&self, txid: &str) -> Result<String, InsightError> {
        self.get_string_field(&format!("rawtx/{txid}"), "RawTransaction", "rawtx")
            .await
    }

    // ------------------------------------------------------------------
    // Addresses
    // ------------------------------------------------------------------

    /// Address summary. Contradictory options fail with
    /// [`InsightError::Param`] before any request is sent.
    pub async fn get_address(
        &self,
        address: &str,
        query: AddressQuery,
    ) -> Result<Address, InsightError> {
        let path = query.path(address)?;
        self.get_decoded(&path, "Address", Address::from_json).await
    }

    /// One of the plain-text amounts, in satoshis.
    pub async fn get_address_amount(
        &self,
        address: &str,
        kind: BalanceKind,
    ) -> Result<i64, InsightError> {
        let response = self
            .request(&format!("addr/{address}/{}", kind.segment()))
            .await?;
        Ok(parse_satoshi_text(&response.body)?)
    }

    pub async fn get_balance(&self, address: &str) -> Result<i64, InsightError> {
        self.get_address_amount(address, BalanceKind::Balance).await
    }

    pub async fn get_total_received(&self, address: &str) -> Result<i64, InsightError> {
        self.get_address_amount(address, BalanceKind::TotalReceived)
            .await
    }

    pub async fn get_total_sent(&self, address: &str) -> Result<i64, InsightError> {
        self.get_address_amount(address, BalanceKind::TotalSent).await
    }

    pub async fn get_unconfirmed_balance(&self, address: &str) -> Result<i64, InsightError> {
        self.get_address_amount(address, BalanceKind::UnconfirmedBalance)
            .await
    }

    pub async fn get_utxos(&self, address: &str) -> Result<Vec<UnspentOutput>, InsightError> {
        self.get_decoded(
            &format!("addr/{address}/utxo"),
            "UnspentOutput",
            UnspentOutput::list_from_json,
        )
        .await
    }

    pub async fn get_utxos_for_addresses<S: AsRef<str>>(
        &self,
        addresses: &[S],
    ) -> Result<Vec<UnspentOutput>, InsightError> {
        let joined = join_addresses(addresses)?;
        self.get_decoded(
            &format!("addrs/{joined}/utxo"),
            "UnspentOutput",
            UnspentOutput::list_from_json,
        )
        .await
    }
}
