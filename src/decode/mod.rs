//! Ledger decoder (C2, spec.md §4.2). Unmarshals `xdr_bytes` into a
//! versioned `LedgerCloseMeta` and flattens it into the normalized
//! `DecodedLedger` the extractors (C3) operate over, so that the XDR
//! union-dispatch logic lives in exactly one place.
//!
//! The XDR codec itself (`stellar-xdr`'s `ReadXdr`) is the external
//! "Stellar SDK" collaborator named out-of-scope by spec.md §1; this
//! module is the dispatch/normalization logic spec.md §4.2 describes
//! on top of it.

use anyhow::{anyhow, Context, Result};
use stellar_xdr::curr::{
    ContractEvent, DiagnosticEvent, Hash, LedgerCloseMeta, LedgerEntry, LedgerEntryChange,
    LedgerEntryData, LedgerHeader, LedgerKey, Limits, Memo, Operation, OperationBody,
    OperationMeta, OperationResult, OperationResultTr, ReadXdr, TransactionEnvelope,
    TransactionMeta, TransactionResultMeta, TransactionResultResult, TransactionSetComponent,
    TxSetComponentTxsMaybeDiscountedFee,
};

#[derive(Debug, Clone)]
pub struct LedgerHeaderInfo {
    pub sequence: u32,
    pub hash: String,
    pub previous_hash: String,
    pub close_time: i64,
    pub protocol_version: u32,
    pub total_coins: i64,
    pub fee_pool: i64,
    pub base_fee: u32,
    pub base_reserve: u32,
    pub max_tx_set_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    Created,
    Updated,
    Removed,
    State,
}

/// A single ledger-entry change observed somewhere in the ledger (tx-level
/// `tx_changes_before`/`tx_changes_after`, or operation-level `changes`).
#[derive(Debug, Clone)]
pub struct LedgerChangeEntry {
    pub op: ChangeOp,
    pub key: LedgerKey,
    pub entry: Option<LedgerEntry>,
    pub last_modified_ledger_seq: u32,
}

impl From<LedgerEntryChange> for LedgerChangeEntry {
    fn from(c: LedgerEntryChange) -> Self {
        match c {
            LedgerEntryChange::Created(e) => LedgerChangeEntry {
                op: ChangeOp::Created,
                key: entry_to_key(&e),
                last_modified_ledger_seq: e.last_modified_ledger_seq,
                entry: Some(e),
            },
            LedgerEntryChange::Updated(e) => LedgerChangeEntry {
                op: ChangeOp::Updated,
                key: entry_to_key(&e),
                last_modified_ledger_seq: e.last_modified_ledger_seq,
                entry: Some(e),
            },
            LedgerEntryChange::State(e) => LedgerChangeEntry {
                op: ChangeOp::State,
                key: entry_to_key(&e),
                last_modified_ledger_seq: e.last_modified_ledger_seq,
                entry: Some(e),
            },
            LedgerEntryChange::Removed(key) => LedgerChangeEntry {
                op: ChangeOp::Removed,
                key,
                entry: None,
                last_modified_ledger_seq: 0,
            },
        }
    }
}

fn entry_to_key(entry: &LedgerEntry) -> LedgerKey {
    match &entry.data {
        LedgerEntryData::Account(a) => LedgerKey::Account(stellar_xdr::curr::LedgerKeyAccount {
            account_id: a.account_id.clone(),
        }),
        LedgerEntryData::Trustline(t) => {
            LedgerKey::Trustline(stellar_xdr::curr::LedgerKeyTrustLine {
                account_id: t.account_id.clone(),
                asset: t.asset.clone(),
            })
        }
        LedgerEntryData::Offer(o) => LedgerKey::Offer(stellar_xdr::curr::LedgerKeyOffer {
            seller_id: o.seller_id.clone(),
            offer_id: o.offer_id,
        }),
        LedgerEntryData::Data(d) => LedgerKey::Data(stellar_xdr::curr::LedgerKeyData {
            account_id: d.account_id.clone(),
            data_name: d.data_name.clone(),
        }),
        LedgerEntryData::ClaimableBalance(c) => {
            LedgerKey::ClaimableBalance(stellar_xdr::curr::LedgerKeyClaimableBalance {
                balance_id: c.balance_id.clone(),
            })
        }
        LedgerEntryData::LiquidityPool(l) => {
            LedgerKey::LiquidityPool(stellar_xdr::curr::LedgerKeyLiquidityPool {
                liquidity_pool_id: l.liquidity_pool_id.clone(),
            })
        }
        LedgerEntryData::ContractData(c) => {
            LedgerKey::ContractData(stellar_xdr::curr::LedgerKeyContractData {
                contract: c.contract.clone(),
                key: c.key.clone(),
                durability: c.durability,
            })
        }
        LedgerEntryData::ContractCode(c) => {
            LedgerKey::ContractCode(stellar_xdr::curr::LedgerKeyContractCode {
                hash: c.hash.clone(),
            })
        }
        LedgerEntryData::ConfigSetting(c) => {
            LedgerKey::ConfigSetting(stellar_xdr::curr::LedgerKeyConfigSetting {
                config_setting_id: c.discriminant(),
            })
        }
        LedgerEntryData::Ttl(t) => LedgerKey::Ttl(stellar_xdr::curr::LedgerKeyTtl {
            key_hash: t.key_hash.clone(),
        }),
    }
}

#[derive(Debug, Clone)]
pub struct DecodedOperation {
    pub index: u32,
    pub source_account: Option<String>,
    pub body: OperationBody,
    pub changes: Vec<LedgerChangeEntry>,
    pub result: Option<OperationResultTr>,
}

#[derive(Debug, Clone)]
pub struct DecodedTransaction {
    pub hash: String,
    pub index_in_ledger: u32,
    pub successful: bool,
    /// Whether per-operation results were present at all (§4.2 V0 rule:
    /// absent ⇒ count every operation as executed).
    pub op_results_present: bool,
    pub fee_charged: i64,
    pub source_account: String,
    pub memo_type: &'static str,
    pub memo: Option<String>,
    pub operations: Vec<DecodedOperation>,
    pub tx_changes: Vec<LedgerChangeEntry>,
    pub contract_events: Vec<ContractEvent>,
    pub diagnostic_events: Vec<DiagnosticEvent>,
}

#[derive(Debug, Clone)]
pub struct DecodedLedger {
    pub header: LedgerHeaderInfo,
    pub transactions: Vec<DecodedTransaction>,
    pub evicted_keys: Vec<LedgerKey>,
    pub bucket_list_size: Option<u64>,
    pub live_soroban_state_size: Option<u64>,
    pub fee_write_1kb: Option<i64>,
}

impl DecodedLedger {
    /// All ledger-entry changes in this ledger, in the order stellar-core
    /// applied them (tx-level changes, then each operation's changes, per
    /// transaction in ledger order). Stateful-entry extractors dedup over
    /// this with "last wins" (spec.md §4.3).
    pub fn all_changes(&self) -> Vec<&LedgerChangeEntry> {
        let mut out = Vec::new();
        for tx in &self.transactions {
            out.extend(tx.tx_changes.iter());
            for op in &tx.operations {
                out.extend(op.changes.iter());
            }
        }
        out
    }
}

pub fn decode_ledger(xdr_bytes: &[u8]) -> Result<DecodedLedger> {
    let meta =
        LedgerCloseMeta::from_xdr(xdr_bytes, Limits::none()).context("parsing LedgerCloseMeta")?;
    match meta {
        LedgerCloseMeta::V0(v0) => {
            let header = header_info(&v0.ledger_header.header, v0.ledger_header.hash.clone());
            let envelopes = classic_envelopes(&v0.tx_set.txs);
            let transactions =
                zip_transactions(&envelopes, v0.tx_processing.to_vec(), header.close_time)?;
            Ok(DecodedLedger {
                header,
                transactions,
                evicted_keys: vec![],
                bucket_list_size: None,
                live_soroban_state_size: None,
                fee_write_1kb: None,
            })
        }
        LedgerCloseMeta::V1(v1) => {
            let header = header_info(&v1.ledger_header.header, v1.ledger_header.hash.clone());
            let envelopes = generalized_envelopes(&v1.tx_set);
            let transactions =
                zip_transactions(&envelopes, v1.tx_processing.to_vec(), header.close_time)?;
            Ok(DecodedLedger {
                header,
                transactions,
                evicted_keys: v1.evicted_temporary_ledger_keys.to_vec(),
                bucket_list_size: Some(v1.total_byte_size_of_live_soroban_state),
                live_soroban_state_size: Some(v1.total_byte_size_of_live_soroban_state),
                fee_write_1kb: None,
            })
        }
        LedgerCloseMeta::V2(v2) => {
            let header = header_info(&v2.ledger_header.header, v2.ledger_header.hash.clone());
            let envelopes = generalized_envelopes(&v2.tx_set);
            let transactions =
                zip_transactions(&envelopes, v2.tx_processing.to_vec(), header.close_time)?;
            let mut evicted = v2.evicted_temporary_ledger_keys.to_vec();
            evicted.extend(
                v2.evicted_persistent_ledger_entries
                    .iter()
                    .map(entry_to_key),
            );
            Ok(DecodedLedger {
                header,
                transactions,
                evicted_keys: evicted,
                bucket_list_size: Some(v2.total_byte_size_of_live_soroban_state),
                live_soroban_state_size: Some(v2.total_byte_size_of_live_soroban_state),
                fee_write_1kb: None,
            })
        }
    }
}

fn header_info(header: &LedgerHeader, hash: Hash) -> LedgerHeaderInfo {
    LedgerHeaderInfo {
        sequence: header.ledger_seq,
        hash: hex::encode(hash.0),
        previous_hash: hex::encode(header.previous_ledger_hash.0),
        close_time: header.scp_value.close_time.0 as i64,
        protocol_version: header.ledger_version,
        total_coins: header.total_coins,
        fee_pool: header.fee_pool,
        base_fee: header.base_fee,
        base_reserve: header.base_reserve,
        max_tx_set_size: header.max_tx_set_size,
    }
}

fn classic_envelopes(txs: &[TransactionEnvelope]) -> Vec<TransactionEnvelope> {
    txs.to_vec()
}

/// Best-effort flattening of a `GeneralizedTransactionSet`'s phases/components
/// back into envelope order, matching the order `tx_processing` is reported in.
fn generalized_envelopes(
    tx_set: &stellar_xdr::curr::GeneralizedTransactionSet,
) -> Vec<TransactionEnvelope> {
    let stellar_xdr::curr::GeneralizedTransactionSet::V1(v1) = tx_set;
    let mut out = Vec::new();
    for phase in v1.phases.iter() {
        match phase {
            stellar_xdr::curr::TransactionPhase::V0(components) => {
                for component in components.iter() {
                    let TransactionSetComponent::TxsetCompTxsMaybeDiscountedFee(c) = component;
                    let TxSetComponentTxsMaybeDiscountedFee { txs, .. } = c;
                    out.extend(txs.iter().cloned());
                }
            }
            stellar_xdr::curr::TransactionPhase::ParallelTxsComponent(
                stellar_xdr::curr::ParallelTxsComponent { execution_stages, .. },
            ) => {
                for stage in execution_stages.iter() {
                    for cluster in stage.iter() {
                        out.extend(cluster.iter().cloned());
                    }
                }
            }
        }
    }
    out
}

fn zip_transactions(
    envelopes: &[TransactionEnvelope],
    results: Vec<TransactionResultMeta>,
    closed_at: i64,
) -> Result<Vec<DecodedTransaction>> {
    if envelopes.len() != results.len() {
        return Err(anyhow!(
            "envelope/result count mismatch: {} envelopes vs {} results",
            envelopes.len(),
            results.len()
        ));
    }

    let mut out = Vec::with_capacity(envelopes.len());
    for (index, (envelope, result_meta)) in envelopes.iter().zip(results.into_iter()).enumerate() {
        out.push(decode_transaction(index as u32, envelope, result_meta, closed_at)?);
    }
    Ok(out)
}

fn decode_transaction(
    index_in_ledger: u32,
    envelope: &TransactionEnvelope,
    result_meta: TransactionResultMeta,
    closed_at: i64,
) -> Result<DecodedTransaction> {
    let hash = hex::encode(result_meta.result.transaction_hash.0);
    let fee_charged = result_meta.result.result.fee_charged;

    let (op_results, successful, op_results_present) = match &result_meta.result.result.result {
        TransactionResultResult::TxSuccess(results) => (results.to_vec(), true, true),
        TransactionResultResult::TxFeeBumpInnerSuccess(inner) => {
            (op_results_of_inner(inner), true, true)
        }
        TransactionResultResult::TxFailed(results) => (results.to_vec(), false, true),
        TransactionResultResult::TxFeeBumpInnerFailed(inner) => {
            (op_results_of_inner(inner), false, true)
        }
        _ => (vec![], false, false),
    };

    let (source_account, memo_type, memo, operations_src) = match envelope {
        TransactionEnvelope::TxV0(v0) => (
            muxed_v0_to_strkey(&v0.tx.source_account_ed25519),
            memo_kind(&v0.tx.memo),
            memo_text(&v0.tx.memo),
            v0.tx.operations.to_vec(),
        ),
        TransactionEnvelope::Tx(v1) => (
            muxed_to_strkey(&v1.tx.source_account),
            memo_kind(&v1.tx.memo),
            memo_text(&v1.tx.memo),
            v1.tx.operations.to_vec(),
        ),
        TransactionEnvelope::TxFeeBump(fb) => {
            let stellar_xdr::curr::FeeBumpTransactionInnerTx::Tx(inner) = &fb.tx.inner_tx;
            (
                muxed_to_strkey(&inner.tx.source_account),
                memo_kind(&inner.tx.memo),
                memo_text(&inner.tx.memo),
                inner.tx.operations.to_vec(),
            )
        }
    };

    let tx_changes = result_meta
        .fee_processing
        .0
        .iter()
        .cloned()
        .map(LedgerChangeEntry::from)
        .collect::<Vec<_>>();

    let (op_metas, mut extra_tx_changes, soroban_meta) = operation_metas(result_meta.tx_apply_processing)?;
    let mut tx_changes = tx_changes;
    tx_changes.append(&mut extra_tx_changes);

    let mut operations = Vec::with_capacity(operations_src.len());
    for (op_index, op) in operations_src.iter().enumerate() {
        let changes = op_metas
            .get(op_index)
            .map(|m| m.changes.0.iter().cloned().map(LedgerChangeEntry::from).collect())
            .unwrap_or_default();
        let result = op_results.get(op_index).and_then(result_tr_of);
        operations.push(DecodedOperation {
            index: op_index as u32,
            source_account: op.source_account.as_ref().map(muxed_to_strkey),
            body: op.body.clone(),
            changes,
            result,
        });
    }

    let (contract_events, diagnostic_events) = soroban_meta
        .map(|m| (m.events.to_vec(), m.diagnostic_events.to_vec()))
        .unwrap_or_default();

    Ok(DecodedTransaction {
        hash,
        index_in_ledger,
        successful,
        op_results_present,
        fee_charged,
        source_account,
        memo_type,
        memo,
        operations,
        tx_changes,
        contract_events,
        diagnostic_events,
    })
}

fn op_results_of_inner(
    inner: &stellar_xdr::curr::InnerTransactionResultResult,
) -> Vec<OperationResult> {
    match inner {
        stellar_xdr::curr::InnerTransactionResultResult::TxSuccess(r)
        | stellar_xdr::curr::InnerTransactionResultResult::TxFailed(r) => r.to_vec(),
        _ => vec![],
    }
}

fn result_tr_of(result: &OperationResult) -> Option<OperationResultTr> {
    match result {
        OperationResult::OpInner(tr) => Some(tr.clone()),
        _ => None,
    }
}

/// Flattens a transaction's `TransactionMeta` union into its per-operation
/// metas plus any ledger changes carried outside the per-op list
/// (`tx_changes_after` in V1+), and its Soroban meta when present (V3+).
fn operation_metas(
    meta: TransactionMeta,
) -> Result<(
    Vec<OperationMeta>,
    Vec<LedgerChangeEntry>,
    Option<stellar_xdr::curr::SorobanTransactionMeta>,
)> {
    match meta {
        TransactionMeta::V0(ops) => Ok((ops.to_vec(), vec![], None)),
        TransactionMeta::V1(v1) => Ok((v1.operations.to_vec(), vec![], None)),
        TransactionMeta::V2(v2) => {
            let changes_after = v2
                .tx_changes_after
                .0
                .iter()
                .cloned()
                .map(LedgerChangeEntry::from)
                .collect();
            Ok((v2.operations.to_vec(), changes_after, None))
        }
        TransactionMeta::V3(v3) => {
            let changes_after = v3
                .tx_changes_after
                .0
                .iter()
                .cloned()
                .map(LedgerChangeEntry::from)
                .collect();
            Ok((v3.operations.to_vec(), changes_after, v3.soroban_meta))
        }
    }
}

fn muxed_to_strkey(account: &stellar_xdr::curr::MuxedAccount) -> String {
    use stellar_xdr::curr::MuxedAccount;
    match account {
        MuxedAccount::Ed25519(uint) => stellar_strkey::ed25519::PublicKey(uint.0).to_string(),
        MuxedAccount::MuxedEd25519(m) => {
            stellar_strkey::ed25519::PublicKey(m.ed25519.0).to_string()
        }
    }
}

fn muxed_v0_to_strkey(uint: &stellar_xdr::curr::Uint256) -> String {
    stellar_strkey::ed25519::PublicKey(uint.0).to_string()
}

fn memo_kind(memo: &Memo) -> &'static str {
    match memo {
        Memo::None => "none",
        Memo::Text(_) => "text",
        Memo::Id(_) => "id",
        Memo::Hash(_) => "hash",
        Memo::Return(_) => "return",
    }
}

fn memo_text(memo: &Memo) -> Option<String> {
    match memo {
        Memo::None => None,
        Memo::Text(t) => Some(t.to_string()),
        Memo::Id(id) => Some(id.to_string()),
        Memo::Hash(h) => Some(hex::encode(h.0)),
        Memo::Return(h) => Some(hex::encode(h.0)),
    }
}
