//! Shared test helpers for `insight-core` unit tests.
//!
//! JSON fixture builders shaped like real Insight responses so that decoder,
//! engine, and pagination tests share one source of truth for dummy payloads.

use serde_json::{json, Value};

// ==============================================================================
// Transaction Fixtures
// ==============================================================================

/// A regular (non-coinbase) input spending `value` bitcoin from `addr`.
pub fn input_json(addr: &str, value: f64) -> Value {
    json!({
        "txid": "ff00000000000000000000000000000000000000000000000000000000000001",
        "vout": 0,
        "sequence": 4294967295u64,
        "n": 0,
        "scriptSig": {
            "hex": "483045022100",
            "asm": "3045022100[ALL]"
        },
        "addr": addr,
        "valueSat": (value * 100_000_000.0).round() as u64,
        "value": value,
        "doubleSpentTxID": null
    })
}

/// An unspent output paying `value` (rendered as the server does, as a
/// decimal string) to `addr`.
pub fn output_json(addr: &str, value: &str, n: u32) -> Value {
    json!({
        "value": value,
        "n": n,
        "scriptPubKey": {
            "hex": "76a914000000000000000000000000000000000000000088ac",
            "asm": "OP_DUP OP_HASH160 0000000000000000000000000000000000000000 OP_EQUALVERIFY OP_CHECKSIG",
            "addresses": [addr],
            "type": "pubkeyhash"
        },
        "spentTxId": null,
        "spentIndex": null,
        "spentHeight": null
    })
}

/// A confirmed transaction with the given inputs and outputs.
pub fn tx_json(txid: &str, vin: Vec<Value>, vout: Vec<Value>) -> Value {
    json!({
        "txid": txid,
        "version": 1,
        "locktime": 0,
        "vin": vin,
        "vout": vout,
        "blockhash": "0000000000000000000000000000000000000000000000000000000000000abc",
        "blockheight": 500000,
        "confirmations": 10,
        "time": 1500000000,
        "blocktime": 1500000000,
        "valueOut": 0.5,
        "size": 226,
        "valueIn": 0.75,
        "fees": 0.25
    })
}

/// One window of an `addrs/{..}/txs` listing.
pub fn page_json(total: u64, from: u64, to: u64, items: Vec<Value>) -> Value {
    json!({
        "totalItems": total,
        "from": from,
        "to": to,
        "items": items
    })
}

/// Build the page a well-behaved server returns for `(from, to)` over
/// `total` synthetic transactions: `to` clamped to `total`, txids `tx-{i}`.
pub fn served_page(total: u64, from: u64, to: u64) -> Value {
    let effective_to = to.min(total);
    let items = (from..effective_to)
        .map(|i| tx_json(&format!("tx-{i}"), vec![], vec![]))
        .collect();
    page_json(total, from, effective_to, items)
}

// ==============================================================================
// Address Fixtures
// ==============================================================================

pub fn address_json(addr: &str, transactions: &[&str]) -> Value {
    json!({
        "addrStr": addr,
        "balance": 0.5,
        "balanceSat": 50000000,
        "totalReceived": 1.5,
        "totalReceivedSat": 150000000,
        "totalSent": 1.0,
        "totalSentSat": 100000000,
        "unconfirmedBalance": 0,
        "unconfirmedBalanceSat": 0,
        "unconfirmedTxApperances": 0,
        "txApperances": transactions.len(),
        "transactions": transactions
    })
}
