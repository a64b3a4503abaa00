//! Adaptive block-range log pagination.
//!
//! Providers cap log queries at an undisclosed window size and reject
//! anything larger. The fetcher walks the block space from the newest
//! block backwards in end-anchored windows, growing the window after every
//! success and shrinking it after every failure, so the safe size is
//! discovered instead of configured.
//!
//! Windows are fetched with bounded concurrency. Coverage of
//! `[start_block, end_block]` is exact — no gaps, no duplicates — but
//! result order is unspecified; consumers re-sort by on-chain sequence
//! fields.

use std::collections::VecDeque;

use futures_util::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, trace};

use crate::domain::error::ExecError;

/// Window planner defaults; overridable from config.
pub const DEFAULT_MAX_RANGE: u64 = 10_000;
pub const DEFAULT_MULTIPLIER: u64 = 2;
pub const DEFAULT_WIDTH: usize = 5;

/// Adaptive descending log paginator.
#[derive(Debug, Clone)]
pub struct RangeFetcher {
    /// Largest window (in blocks, measured end - start) ever attempted.
    max_range: u64,
    /// Grow/shrink factor between attempts.
    multiplier: u64,
    /// Concurrent windows in flight.
    width: usize,
}

impl Default for RangeFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RANGE, DEFAULT_MULTIPLIER, DEFAULT_WIDTH)
    }
}

impl RangeFetcher {
    /// Create a fetcher. The multiplier is clamped to at least 2 and the
    /// worker width to at least 1.
    pub fn new(max_range: u64, multiplier: u64, width: usize) -> Self {
        Self {
            max_range: max_range.max(1),
            multiplier: multiplier.max(2),
            width: width.max(1),
        }
    }

    /// Fetch every event in `[start_block, end_block]` (inclusive).
    ///
    /// `fetch` runs one bounded window `(from, to)` and returns its events;
    /// a failed window is retried deterministically at a smaller size, any
    /// other error handling is the closure's business. Fails with
    /// `RangeExhausted` when a window shrinks to zero blocks and still
    /// cannot be fetched.
    pub async fn fetch_all<T, F, Fut>(
        &self,
        start_block: u64,
        end_block: u64,
        fetch: F,
    ) -> Result<Vec<T>, ExecError>
    where
        T: Send,
        F: Fn(u64, u64) -> Fut,
        Fut: std::future::Future<Output = anyhow::Result<Vec<T>>> + Send,
    {
        if end_block < start_block {
            return Ok(Vec::new());
        }

        let mut current_range = self.max_range.min(end_block - start_block);
        let mut segments: VecDeque<(u64, u64)> = VecDeque::from([(start_block, end_block)]);
        let mut inflight = FuturesUnordered::new();
        let mut out = Vec::new();

        loop {
            // Plan descending end-anchored windows until the pool is full.
            while inflight.len() < self.width {
                let Some((seg_start, seg_end)) = segments.pop_front() else {
                    break;
                };
                let window_start = if seg_end - seg_start <= current_range {
                    seg_start
                } else {
                    seg_end - current_range
                };
                if window_start > seg_start {
                    segments.push_front((seg_start, window_start - 1));
                }

                trace!(from = window_start, to = seg_end, "Planning log window");
                let fut = fetch(window_start, seg_end);
                inflight.push(async move { (window_start, seg_end, fut.await) });
            }

            let Some((from, to, result)) = inflight.next().await else {
                break;
            };

            match result {
                Ok(events) => {
                    out.extend(events);
                    current_range = current_range
                        .saturating_mul(self.multiplier)
                        .min(self.max_range);
                }
                Err(err) => {
                    let shrunk = current_range / self.multiplier;
                    debug!(
                        from,
                        to,
                        range = current_range,
                        shrunk,
                        error = %err,
                        "Log window failed, shrinking"
                    );
                    if shrunk == 0 {
                        return Err(ExecError::RangeExhausted {
                            start: from,
                            end: to,
                        });
                    }
                    current_range = shrunk;
                    segments.push_front((from, to));
                }
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Fetcher that rejects windows wider than `cap` blocks and otherwise
    /// returns one event per block number.
    fn capped_fetch<'a>(
        cap: u64,
        calls: &'a AtomicU64,
    ) -> impl Fn(u64, u64) -> std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<Vec<u64>>> + Send + 'a>> + 'a
    {
        move |from, to| {
            calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                if to - from > cap {
                    anyhow::bail!("query returned more than 10000 results");
                }
                Ok((from..=to).collect())
            })
        }
    }

    #[tokio::test]
    async fn test_exact_union_despite_unknown_cap() {
        let calls = AtomicU64::new(0);
        let fetcher = RangeFetcher::new(3000, 2, 3);
        let mut events = fetcher
            .fetch_all(0, 10_000, capped_fetch(1000, &calls))
            .await
            .unwrap();

        events.sort_unstable();
        let expected: Vec<u64> = (0..=10_000).collect();
        assert_eq!(events, expected);
        // Adaptation means at least one failed oversized probe happened.
        assert!(calls.load(Ordering::SeqCst) > (10_000 / 1000));
    }

    #[tokio::test]
    async fn test_no_duplicates() {
        let calls = AtomicU64::new(0);
        let fetcher = RangeFetcher::new(4096, 2, 4);
        let events = fetcher
            .fetch_all(500, 9_999, capped_fetch(700, &calls))
            .await
            .unwrap();

        let mut seen = std::collections::HashSet::new();
        for block in &events {
            assert!(seen.insert(*block), "block {block} fetched twice");
        }
        assert_eq!(seen.len(), 9_500);
    }

    #[tokio::test]
    async fn test_range_exhausted_when_nothing_fits() {
        let fetcher = RangeFetcher::new(64, 2, 2);
        let result: Result<Vec<u64>, _> = fetcher
            .fetch_all(0, 1_000, |_, _| async { anyhow::bail!("always too large") })
            .await;

        assert!(matches!(result, Err(ExecError::RangeExhausted { .. })));
    }

    #[tokio::test]
    async fn test_empty_interval() {
        let fetcher = RangeFetcher::default();
        let events: Vec<u64> = fetcher
            .fetch_all(10, 5, |_, _| async { Ok(vec![0]) })
            .await
            .unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_single_block_interval() {
        let fetcher = RangeFetcher::new(3000, 2, 2);
        let events = fetcher
            .fetch_all(42, 42, |from, to| async move {
                assert_eq!((from, to), (42, 42));
                Ok(vec![from])
            })
            .await
            .unwrap();
        assert_eq!(events, vec![42]);
    }
}
