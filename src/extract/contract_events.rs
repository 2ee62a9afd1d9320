//! Contract-event append-only extractor (spec.md §3.2, §4.3). Soroban
//! protocol restricts a transaction invoking a host function to a single
//! operation, so events are attributed to operation index 0 within the
//! transaction that produced them.

use stellar_xdr::curr::{ContractEvent, ContractEventBody};

use crate::decode::DecodedLedger;
use crate::model::rows::ContractEventRow;
use crate::model::sql_value::{scval_decoded_json, scval_xdr_base64};
use crate::model::table::ledger_range;

fn event_type_name(event: &ContractEvent) -> &'static str {
    use stellar_xdr::curr::ContractEventType;
    match event.type_ {
        ContractEventType::System => "system",
        ContractEventType::Contract => "contract",
        ContractEventType::Diagnostic => "diagnostic",
    }
}

pub fn extract_contract_events(
    ledger: &DecodedLedger,
    partition_width: u32,
) -> Vec<ContractEventRow> {
    let range = ledger_range(ledger.header.sequence, partition_width);
    let mut out = Vec::new();

    for tx in &ledger.transactions {
        for (sub_index, event) in tx.contract_events.iter().enumerate() {
            let ContractEventBody::V0(body) = &event.body;
            out.push(ContractEventRow {
                ledger_sequence: ledger.header.sequence,
                transaction_hash: tx.hash.clone(),
                operation_index: 0,
                sub_index: sub_index as u32,
                contract_id: event.contract_id.as_ref().map(|h| hex::encode(h.0)),
                event_type: event_type_name(event).to_string(),
                topics_xdr_base64: body.topics.iter().map(scval_xdr_base64).collect(),
                topics_decoded_json: serde_json::Value::Array(
                    body.topics
                        .iter()
                        .map(|t| {
                            serde_json::from_str(&scval_decoded_json(t))
                                .unwrap_or(serde_json::Value::Null)
                        })
                        .collect(),
                )
                .to_string(),
                data_xdr_base64: scval_xdr_base64(&body.data),
                data_decoded_json: scval_decoded_json(&body.data),
                in_successful_tx: tx.successful,
                closed_at: ledger.header.close_time,
                ledger_range: range,
            });
        }
    }

    out
}
