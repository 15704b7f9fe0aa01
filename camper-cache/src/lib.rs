//! camper Cache - Reactive Pools
//!
//! Stale-while-revalidate caching for the terminal client. Every screen
//! reads from a [`Pool`]: cached data renders at once, stale data is
//! refreshed in the background, and edits go through a [`MutatingPool`]
//! so they show before the server confirms them and roll back if it
//! refuses.
//!
//! # Event loop contract
//!
//! Pools are owned by the event loop and never shared across tasks.
//! Starting a fetch or mutation returns a future; the loop drives it in the
//! background and feeds the resulting [`Completion`] back through
//! [`Session::deliver`], which answers with the [`CacheEvent`] to forward to
//! the screen. Completions from before a [`Pool::clear`] or a realm
//! teardown are recognised by generation and dropped.

pub mod fanout;
pub mod fetcher;
pub mod generation;
pub mod keyed_pool;
pub mod message;
pub mod metrics;
pub mod mutation;
pub mod poller;
pub mod pool;
pub mod registry;
pub mod session;
pub mod snapshot;

pub use fanout::{fan_out, merge, FanOutStatus, FanOutSummary, SourceResult, DEFAULT_MAX_CONCURRENT};
pub use fetcher::{fetcher_fn, FetchContext, Fetcher, FnFetcher};
pub use generation::{ConfirmGuard, ConfirmStep, Debouncer, Generation, SubmitGuard, SubmitResolution, Ticket};
pub use keyed_pool::KeyedPool;
pub use message::{CacheEvent, Completion, CompletionKind};
pub use metrics::{snapshot_quality, MetricsSummary, PoolEvent, PoolEventKind, PoolMetrics, PoolStats};
pub use mutation::{MutatingPool, Mutation, MutationOutcome, MutationResult, MutationTask, MutationTicket};
pub use poller::{PollConfig, Poller};
pub use pool::{FetchOutcome, FetchTask, Pool, PoolConfig};
pub use registry::{ErasedPool, Realm};
pub use session::Session;
pub use snapshot::{Snapshot, SnapshotState};
