//! gRPC binding for the raw-ledger source (C1, spec.md §4.1/§6). Opens a
//! server-streaming `GetLedgers` call starting at whatever sequence the
//! caller last saw, re-opening it with exponential backoff on transport
//! drops. Malformed framing (a response the generated types can't even
//! parse) is not retried — it fails the call immediately per §4.1's
//! "malformed framing: fail fast".

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tonic::transport::Channel;
use tonic::Streaming;

use crate::error::{IngestError, Result};
use crate::source::{LedgerSource, RawLedger};

pub mod pb {
    tonic::include_proto!("stellar.ledger.v1");
}

use pb::raw_ledger_source_client::RawLedgerSourceClient;
use pb::GetLedgersRequest;

const INITIAL_BACKOFF: Duration = Duration::from_millis(200);
const MAX_BACKOFF: Duration = Duration::from_secs(30);
const MAX_RECONNECT_ATTEMPTS: u32 = 10;
/// gRPC receive carries a large max-message cap to accommodate oversized
/// ledgers (spec.md §5).
const MAX_MESSAGE_SIZE_BYTES: usize = 100 * 1024 * 1024;

pub struct GrpcLedgerSource {
    endpoint: String,
    end_sequence: u32,
    stream: Mutex<Option<Streaming<pb::LedgerResponse>>>,
    min_seen: AtomicU32,
    max_seen: AtomicU32,
    have_range: std::sync::atomic::AtomicBool,
}

impl GrpcLedgerSource {
    pub fn new(endpoint: String, end_sequence: u32) -> Self {
        Self {
            endpoint,
            end_sequence,
            stream: Mutex::new(None),
            min_seen: AtomicU32::new(u32::MAX),
            max_seen: AtomicU32::new(0),
            have_range: std::sync::atomic::AtomicBool::new(false),
        }
    }

    async fn connect(&self, start_sequence: u32) -> Result<Streaming<pb::LedgerResponse>> {
        let channel = Channel::from_shared(self.endpoint.clone())
            .map_err(|e| IngestError::Source(e.into()))?
            .connect()
            .await
            .map_err(|e| IngestError::Source(e.into()))?;

        let mut client = RawLedgerSourceClient::new(channel)
            .max_decoding_message_size(MAX_MESSAGE_SIZE_BYTES)
            .max_encoding_message_size(MAX_MESSAGE_SIZE_BYTES);

        let request = GetLedgersRequest {
            start_sequence,
            end_sequence: self.end_sequence,
        };
        let response = client
            .get_ledgers(request)
            .await
            .map_err(|e| IngestError::Source(e.into()))?;
        Ok(response.into_inner())
    }

    async fn connect_with_backoff(&self, start_sequence: u32) -> Result<Streaming<pb::LedgerResponse>> {
        let mut backoff = INITIAL_BACKOFF;
        let mut attempt = 0;
        loop {
            match self.connect(start_sequence).await {
                Ok(stream) => return Ok(stream),
                Err(err) if attempt < MAX_RECONNECT_ATTEMPTS => {
                    attempt += 1;
                    tracing::warn!(attempt, %err, "raw ledger source connect failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn record_sequence(&self, sequence: u32) {
        self.have_range.store(true, Ordering::Release);
        self.min_seen.fetch_min(sequence, Ordering::AcqRel);
        self.max_seen.fetch_max(sequence, Ordering::AcqRel);
    }
}

#[async_trait]
impl LedgerSource for GrpcLedgerSource {
    async fn next_ledger(&self, after_sequence: u32) -> Result<Option<RawLedger>> {
        let mut guard = self.stream.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect_with_backoff(after_sequence + 1).await?);
        }

        let mut backoff = INITIAL_BACKOFF;
        let mut attempt = 0;
        loop {
            let stream = guard.as_mut().expect("stream set above");
            match stream.message().await {
                Ok(Some(msg)) => {
                    self.record_sequence(msg.sequence);
                    return Ok(Some(RawLedger {
                        sequence: msg.sequence,
                        xdr_bytes: msg.ledger_close_meta_xdr,
                    }));
                }
                Ok(None) => return Ok(None),
                Err(status) if attempt < MAX_RECONNECT_ATTEMPTS => {
                    attempt += 1;
                    tracing::warn!(attempt, %status, "raw ledger source transport drop, reconnecting");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    *guard = Some(self.connect_with_backoff(after_sequence + 1).await?);
                }
                Err(status) => return Err(IngestError::Source(status.into())),
            }
        }
    }

    async fn min_ledger(&self) -> Option<u32> {
        self.have_range
            .load(Ordering::Acquire)
            .then(|| self.min_seen.load(Ordering::Acquire))
    }

    async fn max_ledger(&self) -> Option<u32> {
        self.have_range
            .load(Ordering::Acquire)
            .then(|| self.max_seen.load(Ordering::Acquire))
    }
}
