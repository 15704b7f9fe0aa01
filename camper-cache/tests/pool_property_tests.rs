//! Property-Based Tests for Cache Pools
//!
//! Covers the pool read contract, single-flight fetching, optimistic
//! mutation with rollback, generation-guarded completions, confirm-then-act
//! and multi-account fan-out.

use camper_cache::{
    fan_out, merge, ConfirmGuard, ConfirmStep, FanOutStatus, FetchContext, Generation,
    MutatingPool, Pool, PoolConfig, SnapshotState,
};
use camper_test_utils::fixtures::{self, server_error};
use camper_test_utils::generators::{arb_todo_list, arb_search_result};
use camper_test_utils::{AccountInfo, CamperError, CountingFetcher, SetCompleted, TodoInfo};
use proptest::prelude::*;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Runtime::new().unwrap()
}

fn todo_pool(server: Vec<TodoInfo>) -> MutatingPool<Vec<TodoInfo>> {
    MutatingPool::new(
        "todos:1:2",
        PoolConfig::new().with_fresh_ttl(Duration::from_secs(60)),
        Arc::new(CountingFetcher::returning(server)),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Get right after Set returns the value, fresh.
    #[test]
    fn prop_set_then_get(todos in arb_todo_list()) {
        let mut pool: Pool<Vec<TodoInfo>> = Pool::new(
            "todos",
            PoolConfig::new().with_fresh_ttl(Duration::from_secs(60)),
            Arc::new(CountingFetcher::returning(vec![])),
        );
        pool.set(todos.clone());

        let snap = pool.get();
        prop_assert_eq!(snap.data(), Some(&todos));
        prop_assert!(snap.has_data());
        prop_assert_eq!(snap.state(), SnapshotState::Fresh);
        prop_assert!(snap.fetched_at().is_some());
    }

    /// Invalidating twice reads the same as invalidating once.
    #[test]
    fn prop_invalidate_is_idempotent(todos in arb_todo_list(), preload in any::<bool>()) {
        let mut pool: Pool<Vec<TodoInfo>> = Pool::new(
            "todos",
            PoolConfig::new(),
            Arc::new(CountingFetcher::returning(vec![])),
        );
        if preload {
            pool.set(todos);
        }
        pool.invalidate();
        let once = pool.get();
        pool.invalidate();
        let twice = pool.get();

        prop_assert_eq!(once.state(), twice.state());
        prop_assert_eq!(once.data(), twice.data());
    }

    /// Any number of fetch calls before completion hit the fetcher once.
    #[test]
    fn prop_single_flight(extra_calls in 1usize..10) {
        let fetcher = CountingFetcher::returning(7u32);
        let calls = fetcher.counter();
        let mut pool = Pool::new("count", PoolConfig::new(), Arc::new(fetcher));
        let ctx = FetchContext::new();

        let task = pool.fetch(&ctx);
        prop_assert!(task.is_some());
        for _ in 0..extra_calls {
            prop_assert!(pool.fetch(&ctx).is_none());
        }

        let outcome = runtime().block_on(async { task.unwrap().await });
        prop_assert!(pool.complete_fetch(outcome).is_some());
        prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
        let snapshot = pool.get();
        prop_assert_eq!(snapshot.data(), Some(&7));
    }

    /// A failed fetch after a success keeps the data and records the error.
    #[test]
    fn prop_failed_fetch_keeps_data(todos in arb_todo_list()) {
        let fetcher = CountingFetcher::scripted(
            vec![Ok(todos.clone())],
            Err(server_error("/todos.json")),
        );
        let mut pool = Pool::new("todos", PoolConfig::new(), Arc::new(fetcher));
        let ctx = FetchContext::new();
        let rt = runtime();

        let first = pool.fetch(&ctx).unwrap();
        pool.complete_fetch(rt.block_on(first));
        let second = pool.fetch(&ctx).unwrap();
        pool.complete_fetch(rt.block_on(second));

        let snap = pool.get();
        prop_assert_eq!(snap.state(), SnapshotState::Error);
        prop_assert!(snap.has_data());
        prop_assert_eq!(snap.data(), Some(&todos));
        prop_assert!(snap.error().is_some());
    }

    /// Optimistic apply shows B at once; a failed remote call restores A.
    #[test]
    fn prop_optimistic_apply_and_rollback(todos in arb_todo_list(), pick in any::<prop::sample::Index>()) {
        let target = todos[pick.index(todos.len())].clone();
        let mut pool = todo_pool(todos.clone());
        pool.set(todos.clone());

        let mutation = SetCompleted::new(target.id, !target.completed)
            .failing(server_error("/completion.json"));
        let task = pool.apply(&FetchContext::new(), mutation).unwrap();

        let optimistic = pool.get();
        let flipped = optimistic
            .data()
            .and_then(|list| list.iter().find(|t| t.id == target.id))
            .map(|t| t.completed);
        prop_assert_eq!(flipped, Some(!target.completed));
        prop_assert_eq!(task.ticket().prior(), &todos);

        let outcome = runtime().block_on(task);
        let event = pool.complete_mutation(outcome);
        let is_mutation_failed =
            matches!(event, Some(camper_cache::CacheEvent::MutationFailed { .. }));
        prop_assert!(is_mutation_failed);
        let snapshot = pool.get();
        prop_assert_eq!(snapshot.data(), Some(&todos));
    }

    /// Of completions tagged 1..=n arriving in any order, only n applies.
    #[test]
    fn prop_only_latest_generation_applies(order in Just((1u64..=6).collect::<Vec<_>>()).prop_shuffle()) {
        let mut generation = Generation::new();
        let tickets: Vec<_> = (0..order.len()).map(|_| generation.next()).collect();

        let applied: Vec<u64> = order
            .iter()
            .map(|i| tickets[(*i - 1) as usize])
            .filter_map(|t| generation.accept(t, t.value()))
            .collect();
        prop_assert_eq!(applied, vec![6]);
    }
}

#[test]
fn generation_three_one_two() {
    let mut generation = Generation::new();
    let one = generation.next();
    let two = generation.next();
    let three = generation.next();

    assert_eq!(generation.accept(three, "three"), Some("three"));
    assert_eq!(generation.accept(one, "one"), None);
    assert_eq!(generation.accept(two, "two"), None);
}

#[test]
fn confirm_then_act_sequence() {
    let mut guard = ConfirmGuard::new(Duration::from_secs(3));
    let t0 = Instant::now();

    assert!(matches!(guard.trigger_at("x", t0), ConfirmStep::Armed { .. }));
    assert!(matches!(guard.trigger_at("y", t0), ConfirmStep::Armed { .. }));
    assert_eq!(guard.armed_target(), Some(&"y"));

    assert_eq!(guard.trigger_at("y", t0 + Duration::from_secs(1)), ConfirmStep::Fired("y"));
    assert!(!guard.is_armed());
}

#[tokio::test]
async fn fan_out_partial_then_total_failure() {
    let accounts = fixtures::accounts();
    let now = chrono::Utc::now();

    let results = fan_out(&FetchContext::new(), &accounts, 5, |account: AccountInfo| async move {
        let minutes_ago = |m: i64| now - chrono::Duration::minutes(m);
        match account.name.as_str() {
            "Globex" => Err(server_error("/search.json")),
            "Acme" => Ok(vec![fixtures::search_result(10, &account, minutes_ago(3))]),
            _ => Ok(vec![
                fixtures::search_result(20, &account, minutes_ago(5)),
                fixtures::search_result(21, &account, minutes_ago(1)),
            ]),
        }
    })
    .await;
    let merged = merge(results, 50, |a, b| b.created_at.cmp(&a.created_at));
    let order: Vec<(i64, &str)> = merged
        .items
        .iter()
        .map(|r| (r.id, r.account_name.as_str()))
        .collect();
    assert_eq!(merged.items.len(), 3);
    assert_eq!(order, vec![(21, "Initech"), (10, "Acme"), (20, "Initech")]);
    assert!(merged.items.windows(2).all(|w| w[0].created_at >= w[1].created_at));
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

    let results = fan_out(&FetchContext::new(), &accounts, 5, |_account: AccountInfo| async move {
        Err::<Vec<camper_test_utils::SearchResultInfo>, CamperError>(server_error("/search.json"))
    })
    .await;
    let merged = merge(results, 50, |a, b| b.created_at.cmp(&a.created_at));
    assert!(merged.items.is_empty());
    assert!(matches!(merged.status, FanOutStatus::Failed { .. }));
    assert_eq!(
        merged.status.message("search").as_deref(),
        Some("could not search: Acme, Globex, Initech")
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(25))]

    /// Merged search results are newest first and never exceed the cap.
    #[test]
    fn prop_merge_sorted_and_capped(
        a in prop::collection::vec(arb_search_result(AccountInfo::new("1", "Acme")), 0..40),
        b in prop::collection::vec(arb_search_result(AccountInfo::new("2", "Globex")), 0..40),
        cap in 1usize..60,
    ) {
        let total = a.len() + b.len();
        let results = vec![
            camper_cache::SourceResult { source: AccountInfo::new("1", "Acme"), result: Ok(a) },
            camper_cache::SourceResult { source: AccountInfo::new("2", "Globex"), result: Ok(b) },
        ];
        let merged = merge(results, cap, |x, y| y.created_at.cmp(&x.created_at));

        prop_assert_eq!(merged.items.len(), total.min(cap));
        prop_assert!(merged.items.windows(2).all(|w| w[0].created_at >= w[1].created_at));
        prop_assert!(merged.status.is_complete());
    }
}
