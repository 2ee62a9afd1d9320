//! Source manager (C9, spec.md §4.7): a reader-side state machine that
//! transparently falls back from a "hot" tier (typically a rolling
//! window of recent ledgers) to an optional "cold" tier on gap
//! detection, so a downstream pipeline never sees a hole just because
//! the hot tier aged a ledger out.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::source::{LedgerSource, RawLedger};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    Hot,
    /// Reading from cold until `target` is reached, at which point the
    /// checkpoint-driven transition in [`SourceManager::on_checkpoint_advance`]
    /// switches back to `Hot`.
    Backfill { target: u32 },
}

pub struct SourceManager<H, C> {
    hot: Arc<H>,
    cold: Option<Arc<C>>,
    fallback_enabled: bool,
    state: RwLock<SourceState>,
}

impl<H: LedgerSource, C: LedgerSource> SourceManager<H, C> {
    pub fn new(hot: Arc<H>, cold: Option<Arc<C>>, fallback_enabled: bool) -> Self {
        Self {
            hot,
            cold,
            fallback_enabled,
            state: RwLock::new(SourceState::Hot),
        }
    }

    pub async fn state(&self) -> SourceState {
        *self.state.read().await
    }

    /// Called after every successful commit (spec.md §4.7: "BACKFILL ->
    /// HOT when the checkpoint reaches `backfill_target`").
    pub async fn on_checkpoint_advance(&self, last_ledger: u32) {
        let mut state = self.state.write().await;
        if let SourceState::Backfill { target } = *state {
            if last_ledger >= target {
                tracing::info!(target, last_ledger, "source manager returning to HOT");
                *state = SourceState::Hot;
            }
        }
    }

    /// Evaluates the `HOT -> BACKFILL` gap-detection condition (spec.md
    /// §4.7) for a hot read that came back empty at `after_sequence + 1`.
    async fn maybe_enter_backfill(&self, after_sequence: u32) -> Option<u32> {
        if !self.fallback_enabled || self.cold.is_none() {
            return None;
        }
        let next = after_sequence + 1;
        let hot_min = self.hot.min_ledger().await?;
        let cold_max = self.cold.as_ref()?.max_ledger().await?;
        if hot_min > next && cold_max >= next {
            let target = hot_min - 1;
            let mut state = self.state.write().await;
            tracing::warn!(
                next,
                hot_min,
                cold_max,
                target,
                "gap in hot tier, falling back to cold"
            );
            *state = SourceState::Backfill { target };
            Some(target)
        } else {
            None
        }
    }
}

#[async_trait]
impl<H: LedgerSource, C: LedgerSource> LedgerSource for SourceManager<H, C> {
    async fn next_ledger(&self, after_sequence: u32) -> Result<Option<RawLedger>> {
        let state = self.state().await;
        match state {
            SourceState::Hot => match self.hot.next_ledger(after_sequence).await? {
                Some(ledger) => Ok(Some(ledger)),
                None => {
                    if self.maybe_enter_backfill(after_sequence).await.is_some() {
                        if let Some(cold) = &self.cold {
                            // Cold-tier errors never escalate (spec.md §4.7/§7).
                            return Ok(cold.next_ledger(after_sequence).await.unwrap_or(None));
                        }
                    }
                    Ok(None)
                }
            },
            SourceState::Backfill { target } => {
                if after_sequence >= target {
                    // Caller will observe the HOT transition on the next
                    // checkpoint advance; read one more from hot meanwhile.
                    return self.hot.next_ledger(after_sequence).await;
                }
                match &self.cold {
                    Some(cold) => Ok(cold.next_ledger(after_sequence).await.unwrap_or(None)),
                    None => Ok(None),
                }
            }
        }
    }

    async fn min_ledger(&self) -> Option<u32> {
        self.hot.min_ledger().await
    }

    /// Clamped to `backfill_target` in BACKFILL state so callers never
    /// read past cold's available range (spec.md §4.7).
    async fn max_ledger(&self) -> Option<u32> {
        match self.state().await {
            SourceState::Hot => self.hot.max_ledger().await,
            SourceState::Backfill { target } => Some(target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FakeSource {
        min: u32,
        max: u32,
        ledgers: Vec<u32>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl LedgerSource for FakeSource {
        async fn next_ledger(&self, after_sequence: u32) -> Result<Option<RawLedger>> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(self
                .ledgers
                .iter()
                .find(|&&seq| seq > after_sequence)
                .map(|&sequence| RawLedger {
                    sequence,
                    xdr_bytes: vec![],
                }))
        }
        async fn min_ledger(&self) -> Option<u32> {
            Some(self.min)
        }
        async fn max_ledger(&self) -> Option<u32> {
            Some(self.max)
        }
    }

    #[tokio::test]
    async fn falls_back_to_cold_on_gap_then_returns_to_hot() {
        // Hot only has [2000, 3000]; cold has [0, 3000]; we're at 1000.
        let hot = Arc::new(FakeSource {
            min: 2000,
            max: 3000,
            ledgers: vec![2000, 2001],
            calls: AtomicU32::new(0),
        });
        let cold = Arc::new(FakeSource {
            min: 0,
            max: 3000,
            ledgers: vec![1001, 1002],
            calls: AtomicU32::new(0),
        });
        let manager = SourceManager::new(hot.clone(), Some(cold.clone()), true);

        let next = manager.next_ledger(1000).await.unwrap().unwrap();
        assert_eq!(next.sequence, 1001);
        assert_eq!(manager.state().await, SourceState::Backfill { target: 1999 });

        let next = manager.next_ledger(1001).await.unwrap().unwrap();
        assert_eq!(next.sequence, 1002);

        manager.on_checkpoint_advance(1999).await;
        assert_eq!(manager.state().await, SourceState::Hot);
    }

    #[tokio::test]
    async fn cold_disabled_never_transitions() {
        let hot = Arc::new(FakeSource {
            min: 2000,
            max: 3000,
            ledgers: vec![],
            calls: AtomicU32::new(0),
        });
        let manager: SourceManager<FakeSource, FakeSource> = SourceManager::new(hot, None, false);
        let result = manager.next_ledger(1000).await.unwrap();
        assert!(result.is_none());
        assert_eq!(manager.state().await, SourceState::Hot);
    }
}
