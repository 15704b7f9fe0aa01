//! Run one query against many sources and merge the answers.
//!
//! Cross-account search asks every account at once. Accounts that fail do
//! not hide the results of accounts that answered; the failure is reported
//! next to the merged list instead.

use std::cmp::Ordering;
use std::future::Future;

use camper_core::{AccountInfo, CamperResult};
use futures_util::future::join_all;
use tokio::sync::Semaphore;

use crate::fetcher::FetchContext;

/// Concurrency limit used when the caller has no preference.
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

/// One source's answer.
#[derive(Debug)]
pub struct SourceResult<T> {
    pub source: AccountInfo,
    pub result: CamperResult<T>,
}

/// Query every source concurrently, at most `max_concurrent` at a time.
///
/// Results come back in the order of `sources`. Cancelling `ctx` fails
/// every source that has not answered yet.
pub async fn fan_out<T, F, Fut>(
    ctx: &FetchContext,
    sources: &[AccountInfo],
    max_concurrent: usize,
    query: F,
) -> Vec<SourceResult<T>>
where
    F: Fn(AccountInfo) -> Fut,
    Fut: Future<Output = CamperResult<T>>,
{
    let permits = Semaphore::new(max_concurrent.max(1));
    let query = &query;
    let permits = &permits;

    let calls = sources.iter().cloned().map(|source| async move {
        let _permit = permits.acquire().await;
        let result = ctx.run(query(source.clone())).await;
        if let Err(err) = &result {
            if !err.is_canceled() {
                tracing::warn!(account = %source.name, error = %err, "source query failed");
            }
        }
        SourceResult { source, result }
    });
    join_all(calls).await
}

/// Whether every source answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FanOutStatus {
    Complete,
    /// Some sources failed; their names are listed.
    Partial { failed: Vec<String> },
    /// Every source failed.
    Failed { failed: Vec<String> },
}

impl FanOutStatus {
    /// User-facing message, e.g. `could not search: Acme, Globex`.
    pub fn message(&self, action: &str) -> Option<String> {
        match self {
            Self::Complete => None,
            Self::Partial { failed } | Self::Failed { failed } => {
                Some(format!("could not {}: {}", action, failed.join(", ")))
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Merged items from a fan-out plus what went wrong.
#[derive(Debug, Clone)]
pub struct FanOutSummary<T> {
    pub items: Vec<T>,
    pub status: FanOutStatus,
}

/// Merge per-source item lists, sort with `compare`, and keep at most `cap`.
///
/// Canceled sources count neither as answers nor as failures.
pub fn merge<T, F>(results: Vec<SourceResult<Vec<T>>>, cap: usize, mut compare: F) -> FanOutSummary<T>
where
    F: FnMut(&T, &T) -> Ordering,
{
    let mut items = Vec::new();
    let mut failed = Vec::new();
    let mut answered = 0usize;

    for SourceResult { source, result } in results {
        match result {
            Ok(batch) => {
                answered += 1;
                items.extend(batch);
            }
            Err(err) if err.is_canceled() => {}
            Err(_) => failed.push(source.name),
        }
    }

    items.sort_by(|a, b| compare(a, b));
    items.truncate(cap);

    let status = match (answered, failed.is_empty()) {
        (_, true) => FanOutStatus::Complete,
        (0, false) => FanOutStatus::Failed { failed },
        (_, false) => FanOutStatus::Partial { failed },
    };
    FanOutSummary { items, status }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camper_core::{CamperError, RemoteError};
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::Arc;
    use std::time::Duration;

    fn accounts() -> Vec<AccountInfo> {
        vec![
            AccountInfo::new("1", "Acme"),
            AccountInfo::new("2", "Globex"),
            AccountInfo::new("3", "Initech"),
        ]
    }

    fn down(account: &AccountInfo) -> CamperError {
        RemoteError::Transport {
            endpoint: format!("/{}/search.json", account.id),
            reason: "unreachable".to_string(),
        }
        .into()
    }

    #[tokio::test]
    async fn test_fan_out_keeps_source_order() {
        let results = fan_out(&FetchContext::new(), &accounts(), 2, |account| async move {
            if account.id == "1" {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            Ok::<_, CamperError>(account.id.clone())
        })
        .await;

        let ids: Vec<String> = results.into_iter().filter_map(|r| r.result.ok()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_fan_out_respects_concurrency_limit() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let sources: Vec<AccountInfo> = (0..6)
            .map(|i| AccountInfo::new(i.to_string(), format!("acct {i}")))
            .collect();
        fan_out(&FetchContext::new(), &sources, 2, |_account| {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            async move {
                let now = running.fetch_add(1, AtomicOrdering::SeqCst) + 1;
                peak.fetch_max(now, AtomicOrdering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                running.fetch_sub(1, AtomicOrdering::SeqCst);
                Ok::<_, CamperError>(())
            }
        })
        .await;

        assert!(peak.load(AtomicOrdering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_partial_failure_names_failed_sources() {
        let results = fan_out(&FetchContext::new(), &accounts(), 5, |account| async move {
            if account.id == "2" {
                Err(down(&account))
            } else {
                Ok(vec![account.id.parse::<u32>().unwrap_or(0) * 10])
            }
        })
        .await;

        let merged = merge(results, 50, |a: &u32, b: &u32| b.cmp(a));
        assert_eq!(merged.items, vec![30, 10]);
        assert_eq!(
            merged.status,
            FanOutStatus::Partial {
                failed: vec!["Globex".to_string()]
            }
        );
        assert_eq!(
            merged.status.message("search").as_deref(),
            Some("could not search: Globex")
        );
    }

    #[tokio::test]
    async fn test_total_failure() {
        let results = fan_out(&FetchContext::new(), &accounts(), 5, |account| async move {
            Err::<Vec<u32>, _>(down(&account))
        })
        .await;

        let merged = merge(results, 50, |a: &u32, b: &u32| a.cmp(b));
        assert!(merged.items.is_empty());
        assert_eq!(
            merged.status.message("search").as_deref(),
            Some("could not search: Acme, Globex, Initech")
        );
        assert!(matches!(merged.status, FanOutStatus::Failed { .. }));
    }

    #[test]
    fn test_merge_caps_after_sorting() {
        let results = vec![
            SourceResult {
                source: AccountInfo::new("1", "Acme"),
                result: Ok(vec![1, 5, 9]),
            },
            SourceResult {
                source: AccountInfo::new("2", "Globex"),
                result: Ok(vec![2, 8]),
            },
        ];
        let merged = merge(results, 3, |a: &i32, b: &i32| b.cmp(a));
        assert_eq!(merged.items, vec![9, 8, 5]);
        assert!(merged.status.is_complete());
    }

    #[test]
    fn test_merge_with_no_sources() {
        let merged = merge(Vec::<SourceResult<Vec<u8>>>::new(), 10, |a, b| a.cmp(b));
        assert!(merged.items.is_empty());
        assert!(merged.status.is_complete());
    }
}
