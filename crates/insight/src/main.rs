mod cli;

use std::time::Duration;

use clap::Parser;
use eyre::WrapErr;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use insight_core::units::satoshi_to_bitcoin;
use insight_core::{AddressQuery, InsightClient};

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .init();

    let cancel = CancellationToken::new();
    spawn_ctrl_c_handler(cancel.clone());

    let client = build_client(&args, cancel).context("configure Insight client")?;
    let output = run(&client, args.command).await?;

    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("render output")?
    );
    Ok(())
}

fn build_client(args: &Cli, cancel: CancellationToken) -> eyre::Result<InsightClient> {
    let mut builder = InsightClient::builder(&args.api_url)
        .timeout(Duration::from_secs(args.timeout_secs))
        .retry(args.retry)
        .verbose_retry(args.verbose_retry)
        .backoff(
            Duration::from_millis(args.initial_backoff_ms),
            args.backoff_multiplier,
            Duration::from_secs(args.max_backoff_secs),
        )
        .cancellation(cancel);

    if let (Some(user), Some(pass)) = (&args.user, &args.pass) {
        builder = builder.credentials(user, pass);
    } else if args.user.is_some() || args.pass.is_some() {
        eyre::bail!("--user and --pass must be given together");
    }
    builder = builder.auth_schemes(args.basic_auth, args.digest_auth);

    if let Some(limit) = args.requests_per_second {
        builder = builder.requests_per_second(limit);
    }

    Ok(builder.build()?)
}

async fn run(client: &InsightClient, command: Command) -> eyre::Result<serde_json::Value> {
    let value = match command {
        Command::Block { hash } => serde_json::to_value(
            client
                .get_block(&hash)
                .await
                .with_context(|| format!("fetch block {hash}"))?,
        )?,
        Command::BlockHash { height } => json!({
            "height": height,
            "blockHash": client
                .get_block_hash(height)
                .await
                .with_context(|| format!("fetch block hash at height {height}"))?,
        }),
        Command::RawBlock { hash } => json!({
            "rawblock": client
                .get_raw_block(&hash)
                .await
                .with_context(|| format!("fetch raw block {hash}"))?,
        }),
        Command::Blocks { limit, date } => serde_json::to_value(
            client
                .get_block_summaries(limit, date)
                .await
                .context("fetch block summaries")?,
        )?,
        Command::Tx { txid } => serde_json::to_value(
            client
                .get_transaction(&txid)
                .await
                .with_context(|| format!("fetch transaction {txid}"))?,
        )?,
        Command::RawTx { txid } => json!({
            "rawtx": client
                .get_raw_transaction(&txid)
                .await
                .with_context(|| format!("fetch raw transaction {txid}"))?,
        }),
        Command::Address {
            address,
            no_tx_list,
            from,
            to,
        } => {
            let query = AddressQuery {
                no_transactions: no_tx_list,
                from,
                to,
            };
            serde_json::to_value(
                client
                    .get_address(&address, query)
                    .await
                    .with_context(|| format!("fetch address {address}"))?,
            )?
        }
        Command::Balance { address, kind, btc } => {
            let satoshis = client
                .get_address_amount(&address, kind.into())
                .await
                .with_context(|| format!("fetch {kind:?} of {address}"))?;
            if btc {
                let magnitude = satoshi_to_bitcoin(satoshis.unsigned_abs());
                json!({ "address": address, "btc": magnitude.copysign(satoshis as f64) })
            } else {
                json!({ "address": address, "satoshis": satoshis })
            }
        }
        Command::Utxo { addresses } => {
            let utxos = match addresses.as_slice() {
                [single] => client.get_utxos(single).await,
                many => client.get_utxos_for_addresses(many).await,
            }
            .context("fetch unspent outputs")?;
            serde_json::to_value(utxos)?
        }
        Command::History { addresses } => {
            let txs = client
                .get_all_transactions_for_addresses(&addresses)
                .await
                .context("fetch address history")?;
            tracing::info!(count = txs.len(), "fetched address history");
            serde_json::to_value(txs)?
        }
        Command::Gain { txid, address } => {
            let tx = client
                .get_transaction(&txid)
                .await
                .with_context(|| format!("fetch transaction {txid}"))?;
            json!({
                "txid": txid,
                "address": address,
                "gain": tx.gain_for_address(&address),
            })
        }
    };
    Ok(value)
}

/// Cancel the in-flight request on the first Ctrl-C.
fn spawn_ctrl_c_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted; cancelling request");
            cancel.cancel();
        }
    });
}
