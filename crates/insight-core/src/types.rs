//! Typed records returned by the Insight API.
//!
//! Every record is a plain value decoded once from a JSON response. Field
//! names follow the server's keys (converted to snake_case); keys the server
//! may omit are `Option`s. Decoding is all-or-nothing: any missing required
//! key fails the whole record with a [`DecodeError`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::decode::Fields;
use crate::error::DecodeError;

// ==============================================================================
// Blocks
// ==============================================================================

/// Mining pool attribution. Insight sends an empty object for unknown pools.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PoolInfo {
    pub pool_name: Option<String>,
    pub url: Option<String>,
}

impl PoolInfo {
    fn from_fields(fields: Option<Fields<'_>>) -> Result<Self, DecodeError> {
        let Some(fields) = fields else {
            return Ok(Self::default());
        };
        Ok(Self {
            pool_name: fields.opt_str("poolName")?,
            url: fields.opt_str("url")?,
        })
    }
}

/// Full block detail from `block/{hash}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub hash: String,
    pub size: u64,
    pub height: u64,
    pub version: i64,
    pub merkle_root: String,
    /// Transaction ids in block order.
    pub tx: Vec<String>,
    pub time: DateTime<Utc>,
    pub nonce: u64,
    pub bits: String,
    pub difficulty: f64,
    pub chain_work: String,
    pub confirmations: u64,
    pub previous_block_hash: Option<String>,
    pub next_block_hash: Option<String>,
    pub reward: f64,
    pub is_main_chain: bool,
    pub pool_info: PoolInfo,
}

impl Block {
    pub fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let f = Fields::new(value, "Block")?;
        Ok(Self {
            hash: f.str("hash")?,
            size: f.u64("size")?,
            height: f.u64("height")?,
            version: f.i64("version")?,
            merkle_root: f.str("merkleroot")?,
            tx: f.strings("tx")?,
            time: f.timestamp("time")?,
            nonce: f.u64("nonce")?,
            bits: f.str("bits")?,
            difficulty: f.f64("difficulty")?,
            chain_work: f.str("chainwork")?,
            confirmations: f.u64("confirmations")?,
            previous_block_hash: f.opt_str("previousblockhash")?,
            next_block_hash: f.opt_str("nextblockhash")?,
            reward: f.amount("reward")?,
            is_main_chain: f.bool("isMainChain")?,
            pool_info: PoolInfo::from_fields(f.opt_object("poolInfo", "PoolInfo")?)?,
        })
    }
}

/// One entry of the `blocks?limit=` listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockSummary {
    pub height: u64,
    pub size: u64,
    pub hash: String,
    pub time: DateTime<Utc>,
    pub tx_length: u64,
    pub pool_info: PoolInfo,
}

impl BlockSummary {
    pub fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let f = Fields::new(value, "BlockSummary")?;
        Ok(Self {
            height: f.u64("height")?,
            size: f.u64("size")?,
            hash: f.str("hash")?,
            time: f.timestamp("time")?,
            tx_length: f.u64("txlength")?,
            pool_info: PoolInfo::from_fields(f.opt_object("poolInfo", "PoolInfo")?)?,
        })
    }
}

/// Day-based navigation returned alongside a block listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockSummaryPagination {
    /// Next day, `YYYY-MM-DD`.
    pub next: String,
    /// Previous day, `YYYY-MM-DD`.
    pub prev: String,
    pub current_ts: i64,
    /// Listed day, `YYYY-MM-DD`.
    pub current: String,
    pub is_today: bool,
    /// Whether the day holds more blocks than were returned.
    pub more: bool,
    pub more_ts: Option<i64>,
}

impl BlockSummaryPagination {
    pub fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let f = Fields::new(value, "BlockSummaryPagination")?;
        Ok(Self {
            next: f.str("next")?,
            prev: f.str("prev")?,
            current_ts: f.i64("currentTs")?,
            current: f.str("current")?,
            is_today: f.bool("isToday")?,
            more: f.bool("more")?,
            more_ts: f.opt_i64("moreTs")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockSummaries {
    pub blocks: Vec<BlockSummary>,
    pub length: u64,
    pub pagination: BlockSummaryPagination,
}

impl BlockSummaries {
    pub fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let f = Fields::new(value, "BlockSummaries")?;
        Ok(Self {
            blocks: f
                .array("blocks")?
                .iter()
                .map(BlockSummary::from_json)
                .collect::<Result<_, _>>()?,
            length: f.u64("length")?,
            pagination: BlockSummaryPagination::from_json(f.value("pagination")?)?,
        })
    }
}

// ==============================================================================
// Transactions
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionInput {
    /// Spent transaction; `None` for coinbase inputs.
    pub txid: Option<String>,
    pub vout: Option<u32>,
    /// Coinbase script hex, present only on coinbase inputs.
    pub coinbase: Option<String>,
    pub sequence: u64,
    pub n: u32,
    pub addr: Option<String>,
    pub value_sat: Option<u64>,
    pub value: Option<f64>,
    pub double_spent_txid: Option<String>,
    pub script_sig_asm: Option<String>,
    pub script_sig_hex: Option<String>,
}

impl TransactionInput {
    pub fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let f = Fields::new(value, "TransactionInput")?;
        let script_sig = f.opt_object("scriptSig", "TransactionInput.scriptSig")?;
        let (script_sig_asm, script_sig_hex) = match script_sig {
            Some(s) => (s.opt_str("asm")?, s.opt_str("hex")?),
            None => (None, None),
        };

        let coinbase = f.opt_str("coinbase")?;
        // Coinbase inputs spend nothing, so txid/vout are only required
        // on regular inputs.
        let (txid, vout) = if coinbase.is_some() {
            (f.opt_str("txid")?, f.opt_u32("vout")?)
        } else {
            (Some(f.str("txid")?), Some(f.u32("vout")?))
        };

        Ok(Self {
            txid,
            vout,
            coinbase,
            sequence: f.u64("sequence")?,
            n: f.u32("n")?,
            addr: f.opt_str("addr")?,
            value_sat: f.opt_u64("valueSat")?,
            value: f.opt_f64("value")?,
            double_spent_txid: f.opt_str("doubleSpentTxID")?,
            script_sig_asm,
            script_sig_hex,
        })
    }

    pub fn is_coinbase(&self) -> bool {
        self.coinbase.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptPubKey {
    pub hex: String,
    pub asm: String,
    /// Empty for scripts without a standard address (e.g. `OP_RETURN`).
    pub addresses: Vec<String>,
    pub script_type: Option<String>,
}

impl ScriptPubKey {
    pub fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let f = Fields::new(value, "ScriptPubKey")?;
        Ok(Self {
            hex: f.str("hex")?,
            asm: f.str("asm")?,
            addresses: f.opt_strings("addresses")?,
            script_type: f.opt_str("type")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionOutput {
    pub value: f64,
    pub n: u32,
    pub script_pub_key: ScriptPubKey,
    pub spent_tx_id: Option<String>,
    pub spent_index: Option<u32>,
    pub spent_height: Option<i64>,
}

impl TransactionOutput {
    pub fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let f = Fields::new(value, "TransactionOutput")?;
        Ok(Self {
            value: f.amount("value")?,
            n: f.u32("n")?,
            script_pub_key: ScriptPubKey::from_json(f.value("scriptPubKey")?)?,
            spent_tx_id: f.opt_str("spentTxId")?,
            spent_index: f.opt_u32("spentIndex")?,
            spent_height: f.opt_i64("spentHeight")?,
        })
    }

    pub fn pays_to(&self, address: &str) -> bool {
        self.script_pub_key.addresses.iter().any(|a| a == address)
    }
}

/// Transaction detail from `tx/{txid}` and the `txs` listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub txid: String,
    pub version: i64,
    pub lock_time: u64,
    pub block_hash: Option<String>,
    /// `-1` while unconfirmed.
    pub block_height: i64,
    pub confirmations: u64,
    pub time: DateTime<Utc>,
    pub block_time: Option<DateTime<Utc>>,
    pub value_out: f64,
    pub size: u64,
    /// Absent for coinbase transactions.
    pub value_in: Option<f64>,
    pub fees: Option<f64>,
    pub is_coinbase: bool,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
}

impl Transaction {
    pub fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let f = Fields::new(value, "Transaction")?;
        let inputs = f
            .array("vin")?
            .iter()
            .map(TransactionInput::from_json)
            .collect::<Result<Vec<_>, _>>()?;
        let outputs = f
            .array("vout")?
            .iter()
            .map(TransactionOutput::from_json)
            .collect::<Result<Vec<_>, _>>()?;
        let is_coinbase = f
            .opt_bool("isCoinBase")?
            .unwrap_or_else(|| inputs.iter().any(TransactionInput::is_coinbase));

        Ok(Self {
            txid: f.str("txid")?,
            version: f.i64("version")?,
            lock_time: f.u64("locktime")?,
            block_hash: f.opt_str("blockhash")?,
            block_height: f.i64("blockheight")?,
            confirmations: f.u64("confirmations")?,
            time: f.timestamp("time")?,
            block_time: f.opt_timestamp("blocktime")?,
            value_out: f.f64("valueOut")?,
            size: f.u64("size")?,
            value_in: f.opt_f64("valueIn")?,
            fees: f.opt_f64("fees")?,
            is_coinbase,
            inputs,
            outputs,
        })
    }

    /// Net value this transaction moved into `address`, in bitcoin.
    ///
    /// Outputs paying the address count positively, inputs spending from it
    /// negatively. An address the transaction never touches yields `0.0`.
    pub fn gain_for_address(&self, address: &str) -> f64 {
        let received: f64 = self
            .outputs
            .iter()
            .filter(|output| output.pays_to(address))
            .map(|output| output.value)
            .sum();
        let spent: f64 = self
            .inputs
            .iter()
            .filter(|input| input.addr.as_deref() == Some(address))
            .filter_map(|input| input.value)
            .sum();
        received - spent
    }
}

/// One window of an address-set transaction listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionPage {
    pub total_items: u64,
    /// Effective start index served, which may differ from the request.
    pub from: u64,
    /// Effective end index served; the server clamps it to `total_items`.
    pub to: u64,
    pub items: Vec<Transaction>,
}

impl TransactionPage {
    pub fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let f = Fields::new(value, "TransactionPage")?;
        Ok(Self {
            total_items: f.u64("totalItems")?,
            from: f.u64("from")?,
            to: f.u64("to")?,
            items: f
                .array("items")?
                .iter()
                .map(Transaction::from_json)
                .collect::<Result<_, _>>()?,
        })
    }
}

// ==============================================================================
// Addresses
// ==============================================================================

/// Address summary from `addr/{address}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Address {
    pub address: String,
    pub balance: f64,
    pub balance_sat: i64,
    pub total_received: f64,
    pub total_received_sat: i64,
    pub total_sent: f64,
    pub total_sent_sat: i64,
    pub unconfirmed_balance: f64,
    pub unconfirmed_balance_sat: i64,
    pub unconfirmed_tx_appearances: u64,
    pub tx_appearances: u64,
    /// Transaction ids; empty when requested with `noTxList=1`.
    pub transactions: Vec<String>,
}

impl Address {
    pub fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let f = Fields::new(value, "Address")?;
        Ok(Self {
            address: f.str("addrStr")?,
            balance: f.f64("balance")?,
            balance_sat: f.i64("balanceSat")?,
            total_received: f.f64("totalReceived")?,
            total_received_sat: f.i64("totalReceivedSat")?,
            total_sent: f.f64("totalSent")?,
            total_sent_sat: f.i64("totalSentSat")?,
            unconfirmed_balance: f.f64("unconfirmedBalance")?,
            unconfirmed_balance_sat: f.i64("unconfirmedBalanceSat")?,
            // The server spells these keys "Apperances".
            unconfirmed_tx_appearances: f.u64("unconfirmedTxApperances")?,
            tx_appearances: f.u64("txApperances")?,
            transactions: f.opt_strings("transactions")?,
        })
    }
}

/// Spendable output from `addr/{address}/utxo` or `addrs/{..}/utxo`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnspentOutput {
    pub address: String,
    pub txid: String,
    pub vout: u32,
    pub script_pub_key: String,
    pub amount: f64,
    pub satoshis: u64,
    /// Absent while the funding transaction is unconfirmed.
    pub height: Option<u64>,
    pub confirmations: u64,
    pub ts: Option<DateTime<Utc>>,
}

impl UnspentOutput {
    pub fn from_json(value: &Value) -> Result<Self, DecodeError> {
        let f = Fields::new(value, "UnspentOutput")?;
        Ok(Self {
            address: f.str("address")?,
            txid: f.str("txid")?,
            vout: f.u32("vout")?,
            script_pub_key: f.str("scriptPubKey")?,
            amount: f.f64("amount")?,
            satoshis: f.u64("satoshis")?,
            height: f.opt_u64("height")?,
            confirmations: f.opt_u64("confirmations")?.unwrap_or(0),
            ts: f.opt_timestamp("ts")?,
        })
    }

    /// Decode a JSON array of unspent outputs.
    pub fn list_from_json(value: &Value) -> Result<Vec<Self>, DecodeError> {
        let items = value.as_array().ok_or_else(|| DecodeError::Malformed {
            record: "UnspentOutput",
            message: "expected JSON array".to_owned(),
        })?;
        items.iter().map(Self::from_json).collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::test_util::*;

    #[test]
    fn transaction_decodes_inputs_and_outputs() {
        let raw = tx_json(
            "aa01",
            vec![input_json("1Spender", 0.75)],
            vec![output_json("1Recipient", "0.50000000", 0)],
        );
        let tx = Transaction::from_json(&raw).expect("valid transaction");
        assert_eq!(tx.txid, "aa01");
        assert_eq!(tx.inputs.len(), 1);
        assert_eq!(tx.outputs.len(), 1);
        assert_eq!(tx.outputs[0].value, 0.5);
        assert_eq!(tx.outputs[0].script_pub_key.addresses, vec!["1Recipient"]);
        assert!(!tx.is_coinbase);
    }

    #[test]
    fn gain_for_output_recipient_is_output_value() {
        let tx = Transaction::from_json(&tx_json(
            "aa02",
            vec![input_json("1Spender", 0.75)],
            vec![output_json("1Recipient", "0.50000000", 0)],
        ))
        .expect("valid transaction");
        assert_eq!(tx.gain_for_address("1Recipient"), 0.5);
    }

    #[test]
    fn gain_for_input_spender_is_negative_input_value() {
        let tx = Transaction::from_json(&tx_json(
            "aa03",
            vec![input_json("1Spender", 0.75)],
            vec![output_json("1Recipient", "0.50000000", 0)],
        ))
        .expect("valid transaction");
        assert_eq!(tx.gain_for_address("1Spender"), -0.75);
    }

    #[test]
    fn gain_for_unrelated_address_is_zero() {
        let tx = Transaction::from_json(&tx_json(
            "aa04",
            vec![input_json("1Spender", 0.75)],
            vec![output_json("1Recipient", "0.50000000", 0)],
        ))
        .expect("valid transaction");
        assert_eq!(tx.gain_for_address("1Stranger"), 0.0);
    }

    #[test]
    fn missing_required_key_fails_whole_record() {
        let mut raw = tx_json("aa05", vec![], vec![output_json("1R", "1.0", 0)]);
        raw.as_object_mut()
            .expect("fixture is an object")
            .remove("valueOut");
        let err = Transaction::from_json(&raw).expect_err("valueOut is required");
        assert_eq!(
            err,
            DecodeError::MissingField {
                record: "Transaction",
                field: "valueOut".into()
            }
        );
    }

    #[test]
    fn missing_key_in_nested_output_names_output_record() {
        let mut output = output_json("1R", "1.0", 0);
        output.as_object_mut().expect("object").remove("n");
        let raw = tx_json("aa06", vec![], vec![output]);
        let err = Transaction::from_json(&raw).expect_err("vout.n is required");
        assert!(matches!(
            err,
            DecodeError::MissingField { record: "TransactionOutput", ref field } if field == "n"
        ));
    }

    #[test]
    fn coinbase_input_has_no_prevout() {
        let raw = tx_json(
            "aa07",
            vec![json!({
                "coinbase": "03a0bb0d",
                "sequence": 4294967295u64,
                "n": 0
            })],
            vec![output_json("1Miner", "6.25", 0)],
        );
        let tx = Transaction::from_json(&raw).expect("coinbase decodes");
        assert!(tx.is_coinbase);
        assert_eq!(tx.inputs[0].txid, None);
        assert_eq!(tx.inputs[0].script_sig_hex, None);
        assert_eq!(tx.gain_for_address("1Miner"), 6.25);
    }

    #[test]
    fn nullable_output_fields_decode_to_none() {
        let output = TransactionOutput::from_json(&output_json("1R", "0.1", 3))
            .expect("unspent output decodes");
        assert_eq!(output.spent_tx_id, None);
        assert_eq!(output.spent_index, None);
        assert_eq!(output.n, 3);
    }

    #[test]
    fn block_decodes_with_empty_pool_info_and_genesis_links() {
        let raw = json!({
            "hash": "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f",
            "size": 285,
            "height": 0,
            "version": 1,
            "merkleroot": "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b",
            "tx": ["4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b"],
            "time": 1231006505,
            "nonce": 2083236893u64,
            "bits": "1d00ffff",
            "difficulty": 1,
            "chainwork": "0000000000000000000000000000000000000000000000000000000100010001",
            "confirmations": 800000,
            "nextblockhash": "00000000839a8e6886ab5951d76f411475428afc90947ee320161bbf18eb6048",
            "reward": 50,
            "isMainChain": true,
            "poolInfo": {}
        });
        let block = Block::from_json(&raw).expect("genesis decodes");
        assert_eq!(block.height, 0);
        assert_eq!(block.previous_block_hash, None);
        assert!(block.next_block_hash.is_some());
        assert_eq!(block.pool_info, PoolInfo::default());
        assert_eq!(block.difficulty, 1.0);
        assert_eq!(block.reward, 50.0);
    }

    #[test]
    fn block_summaries_decode_with_pagination() {
        let raw = json!({
            "blocks": [{
                "height": 420000,
                "size": 999,
                "hash": "0000000000000000025cc5dbf5b5d0f4fd1b5a8e5dbf4c7bbd2b3e0ea0e8b9f3",
                "time": 1468082773,
                "txlength": 1,
                "poolInfo": { "poolName": "F2Pool", "url": "https://www.f2pool.com/" }
            }],
            "length": 1,
            "pagination": {
                "next": "2016-07-10",
                "prev": "2016-07-08",
                "currentTs": 1468108799,
                "current": "2016-07-09",
                "isToday": false,
                "more": true,
                "moreTs": 1468108800
            }
        });
        let summaries = BlockSummaries::from_json(&raw).expect("listing decodes");
        assert_eq!(summaries.length, 1);
        assert_eq!(summaries.blocks[0].tx_length, 1);
        assert_eq!(
            summaries.blocks[0].pool_info.pool_name.as_deref(),
            Some("F2Pool")
        );
        assert!(summaries.pagination.more);
        assert_eq!(summaries.pagination.more_ts, Some(1468108800));
    }

    #[test]
    fn address_decodes_misspelled_appearance_keys() {
        let raw = address_json("1Addr", &["t1", "t2"]);
        let address = Address::from_json(&raw).expect("address decodes");
        assert_eq!(address.address, "1Addr");
        assert_eq!(address.tx_appearances, 2);
        assert_eq!(address.transactions, vec!["t1", "t2"]);
    }

    #[test]
    fn unspent_output_list_decodes() {
        let raw = json!([{
            "address": "1Addr",
            "txid": "bb01",
            "vout": 1,
            "scriptPubKey": "76a914",
            "amount": 0.0001,
            "satoshis": 10000,
            "height": 500000,
            "confirmations": 12
        }, {
            "address": "1Addr",
            "txid": "bb02",
            "vout": 0,
            "scriptPubKey": "76a914",
            "amount": 0.0002,
            "satoshis": 20000,
            "confirmations": 0,
            "ts": 1500000000
        }]);
        let utxos = UnspentOutput::list_from_json(&raw).expect("list decodes");
        assert_eq!(utxos.len(), 2);
        assert_eq!(utxos[0].height, Some(500000));
        assert_eq!(utxos[1].height, None);
        assert!(utxos[1].ts.is_some());
    }

    #[test]
    fn transaction_page_decodes() {
        let raw = page_json(120, 100, 120, vec![tx_json("cc01", vec![], vec![])]);
        let page = TransactionPage::from_json(&raw).expect("page decodes");
        assert_eq!(page.total_items, 120);
        assert_eq!(page.to, 120);
        assert_eq!(page.items.len(), 1);
    }
}
