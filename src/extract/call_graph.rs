//! Cross-contract call-graph extractor (spec.md §3.2, §4.3). Recovers
//! edges from two independent sources within a transaction and unions
//! them:
//!
//! (a) the `fn_call`/`fn_return` diagnostic events a Soroban host emits
//!     around every contract invocation: a `fn_call` event pushes a
//!     frame onto a per-transaction call stack, `fn_return` pops it.
//! (b) the Soroban authorization sub-invocation tree attached to a
//!     transaction's `InvokeHostFunction` operation
//!     (`InvokeHostFunctionOp::auth`), walked recursively with a depth
//!     cap.
//!
//! Each source independently yields `(CallEdgeRow, CallAncestryRow)`
//! pairs; both sources' pairs are unioned per transaction and then
//! deduplicated on `(from_contract, to_contract, function, depth)`
//! (spec.md §4.3), keeping the first-seen pair for a given key.

use std::collections::HashSet;

use stellar_xdr::curr::{
    ContractEventBody, DiagnosticEvent, OperationBody, ScVal, SorobanAuthorizedFunction,
    SorobanAuthorizedInvocation,
};

use crate::decode::{DecodedLedger, DecodedTransaction};
use crate::model::rows::{CallAncestryRow, CallEdgeRow};
use crate::model::sql_value::sc_address_to_strkey;
use crate::model::table::ledger_range;

const ROOT: &str = "root";
/// Recursion bound on the auth sub-invocation walk (spec.md §4.3: "a
/// depth cap"); Soroban's own cross-call limit is far shallower than
/// this in practice, this is just a backstop against malformed input.
const MAX_AUTH_DEPTH: u32 = 32;

struct Frame {
    contract: String,
}

fn fn_marker(event: &DiagnosticEvent) -> Option<(&'static str, String, String)> {
    let ContractEventBody::V0(body) = &event.event.body;
    if body.topics.len() < 3 {
        return None;
    }
    let ScVal::Symbol(marker) = &body.topics[0] else {
        return None;
    };
    let marker_str = marker.to_string();
    if marker_str != "fn_call" && marker_str != "fn_return" {
        return None;
    }
    let contract = match &body.topics[1] {
        ScVal::Address(addr) => sc_address_to_strkey(addr),
        _ => return None,
    };
    let function = match &body.topics[2] {
        ScVal::Symbol(s) => s.to_string(),
        _ => return None,
    };
    let kind = if marker_str == "fn_call" { "fn_call" } else { "fn_return" };
    Some((kind, contract, function))
}

/// Source (a): walks the transaction's `diagnostic_events` once (they are
/// transaction-scoped, not per-operation, so this must not be replayed
/// once per operation). Soroban restricts a transaction invoking a host
/// function to a single operation, so every row is attributed to
/// operation index 0, matching `contract_events`'s convention.
fn edges_from_diagnostic_events(
    tx: &DecodedTransaction,
    ledger_sequence: u32,
    closed_at: i64,
    range: u32,
) -> Vec<(CallEdgeRow, CallAncestryRow)> {
    let mut stack: Vec<Frame> = Vec::new();
    let mut invocation_order = 0u32;
    let mut out = Vec::new();

    for event in &tx.diagnostic_events {
        let Some((kind, contract, function)) = fn_marker(event) else {
            continue;
        };
        match kind {
            "fn_call" => {
                let from_contract = stack.last().map(|f| f.contract.clone()).unwrap_or_else(|| ROOT.to_string());
                let depth = stack.len() as u32;

                let path: Vec<String> =
                    stack.iter().map(|f| f.contract.clone()).chain(std::iter::once(contract.clone())).collect();

                out.push((
                    CallEdgeRow {
                        ledger_sequence,
                        transaction_hash: tx.hash.clone(),
                        operation_index: 0,
                        from_contract,
                        to_contract: contract.clone(),
                        function,
                        depth,
                        invocation_order,
                        source: "diagnostic_events",
                        closed_at,
                        ledger_range: range,
                    },
                    CallAncestryRow {
                        ledger_sequence,
                        transaction_hash: tx.hash.clone(),
                        operation_index: 0,
                        root_contract: path.first().cloned().unwrap_or_else(|| contract.clone()),
                        child_contract: contract.clone(),
                        path_depth: depth,
                        full_path_json: serde_json::to_string(&path).unwrap_or_default(),
                        closed_at,
                        ledger_range: range,
                    },
                ));
                invocation_order += 1;
                stack.push(Frame { contract });
            }
            "fn_return" => {
                stack.pop();
            }
            _ => {}
        }
    }

    out
}

/// Source (b): walks a single `InvokeHostFunctionOp`'s authorization
/// sub-invocation tree. Only `SorobanAuthorizedFunction::ContractFn`
/// nodes name a callee contract and function and yield an edge;
/// contract-creation nodes (`CreateContractHostFn`/`CreateContractV2HostFn`)
/// have no "to" contract to call but their `sub_invocations` are still
/// walked in case a constructor itself invokes other contracts.
#[allow(clippy::too_many_arguments)]
fn walk_auth_invocation(
    invocation: &SorobanAuthorizedInvocation,
    from_contract: &str,
    path: &[String],
    depth: u32,
    tx: &DecodedTransaction,
    operation_index: u32,
    ledger_sequence: u32,
    closed_at: i64,
    range: u32,
    invocation_order: &mut u32,
    out: &mut Vec<(CallEdgeRow, CallAncestryRow)>,
) {
    if depth >= MAX_AUTH_DEPTH {
        return;
    }

    let next_from = match &invocation.function {
        SorobanAuthorizedFunction::ContractFn(args) => {
            let to_contract = sc_address_to_strkey(&args.contract_address);
            let function = args.function_name.to_string();

            let mut next_path = path.to_vec();
            next_path.push(to_contract.clone());

            out.push((
                CallEdgeRow {
                    ledger_sequence,
                    transaction_hash: tx.hash.clone(),
                    operation_index,
                    from_contract: from_contract.to_string(),
                    to_contract: to_contract.clone(),
                    function,
                    depth,
                    invocation_order: *invocation_order,
                    source: "auth_tree",
                    closed_at,
                    ledger_range: range,
                },
                CallAncestryRow {
                    ledger_sequence,
                    transaction_hash: tx.hash.clone(),
                    operation_index,
                    root_contract: next_path.first().cloned().unwrap_or_else(|| to_contract.clone()),
                    child_contract: to_contract.clone(),
                    path_depth: depth,
                    full_path_json: serde_json::to_string(&next_path).unwrap_or_default(),
                    closed_at,
                    ledger_range: range,
                },
            ));
            *invocation_order += 1;
            to_contract
        }
        SorobanAuthorizedFunction::CreateContractHostFn(_)
        | SorobanAuthorizedFunction::CreateContractV2HostFn(_) => from_contract.to_string(),
    };

    let mut next_path = path.to_vec();
    next_path.push(next_from.clone());
    for sub in invocation.sub_invocations.iter() {
        walk_auth_invocation(
            sub,
            &next_from,
            &next_path,
            depth + 1,
            tx,
            operation_index,
            ledger_sequence,
            closed_at,
            range,
            invocation_order,
            out,
        );
    }
}

fn edges_from_auth_tree(
    tx: &DecodedTransaction,
    ledger_sequence: u32,
    closed_at: i64,
    range: u32,
) -> Vec<(CallEdgeRow, CallAncestryRow)> {
    let mut out = Vec::new();
    for op in &tx.operations {
        let OperationBody::InvokeHostFunction(invoke_op) = &op.body else {
            continue;
        };
        for entry in invoke_op.auth.iter() {
            let mut invocation_order = 0u32;
            walk_auth_invocation(
                &entry.root_invocation,
                ROOT,
                &[],
                0,
                tx,
                op.index,
                ledger_sequence,
                closed_at,
                range,
                &mut invocation_order,
                &mut out,
            );
        }
    }
    out
}

/// Dedup key spec.md §4.3 names for the unioned edge set.
fn dedup_key(edge: &CallEdgeRow) -> (String, String, String, u32) {
    (edge.from_contract.clone(), edge.to_contract.clone(), edge.function.clone(), edge.depth)
}

pub fn extract_call_graph(
    ledger: &DecodedLedger,
    partition_width: u32,
) -> (Vec<CallEdgeRow>, Vec<CallAncestryRow>) {
    let range = ledger_range(ledger.header.sequence, partition_width);
    let mut edges = Vec::new();
    let mut ancestry = Vec::new();

    for tx in &ledger.transactions {
        let mut pairs = edges_from_diagnostic_events(tx, ledger.header.sequence, ledger.header.close_time, range);
        pairs.extend(edges_from_auth_tree(tx, ledger.header.sequence, ledger.header.close_time, range));

        let mut seen: HashSet<(String, String, String, u32)> = HashSet::new();
        for (edge, ancestry_row) in pairs {
            if seen.insert(dedup_key(&edge)) {
                edges.push(edge);
                ancestry.push(ancestry_row);
            }
        }
    }

    (edges, ancestry)
}
