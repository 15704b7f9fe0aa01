//! Generation guards for screen-level async work.
//!
//! Screens start work that can be superseded before it finishes: a search
//! debounced per keystroke, a submit the user cancels, a destructive action
//! that needs a second press. Each guard hands out a [`Ticket`] when work
//! starts and only honours completions that carry the current one.

use std::time::{Duration, Instant};

use camper_core::{CamperError, CamperResult};

use crate::fetcher::FetchContext;

/// Identifies one unit of guarded work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// Monotonic counter. Only the most recent ticket is current.
#[derive(Debug, Default, Clone)]
pub struct Generation {
    current: u64,
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supersede all earlier tickets and return a new one.
    pub fn next(&mut self) -> Ticket {
        self.current = self.current.wrapping_add(1);
        Ticket(self.current)
    }

    pub fn current(&self) -> Ticket {
        Ticket(self.current)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.current
    }

    /// Pass `value` through only if `ticket` is still current.
    pub fn accept<T>(&self, ticket: Ticket, value: T) -> Option<T> {
        self.is_current(ticket).then_some(value)
    }
}

// ============================================================================
// DEBOUNCE
// ============================================================================

/// Collapses bursts of input into one delayed action.
///
/// Call [`Debouncer::schedule`] on every keystroke and arm a timer for
/// [`Debouncer::delay`] carrying the ticket. When the timer fires, act only
/// if [`Debouncer::fire`] says the ticket is still the latest.
#[derive(Debug, Clone)]
pub struct Debouncer {
    generation: Generation,
    delay: Duration,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            generation: Generation::new(),
            delay,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn schedule(&mut self) -> Ticket {
        self.generation.next()
    }

    pub fn fire(&self, ticket: Ticket) -> bool {
        self.generation.is_current(ticket)
    }

    /// Drop any scheduled action.
    pub fn cancel(&mut self) {
        self.generation.next();
    }
}

// ============================================================================
// SUBMIT
// ============================================================================

/// How a guarded submit ended, as seen by the screen.
#[derive(Debug)]
pub enum SubmitResolution<T> {
    Applied(T),
    Failed(CamperError),
    /// The user canceled; say nothing.
    Canceled,
    /// A newer submit replaced this one; say nothing.
    Stale,
}

/// At most one in-flight create/update, cancelable by the user.
#[derive(Debug, Default)]
pub struct SubmitGuard {
    generation: Generation,
    in_flight: Option<FetchContext>,
}

impl SubmitGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a submit. Any submit still in flight is canceled and superseded.
    ///
    /// Run the remote call under the returned context and resolve with the
    /// returned ticket.
    pub fn begin(&mut self, parent: &FetchContext) -> (Ticket, FetchContext) {
        if let Some(previous) = self.in_flight.take() {
            previous.cancel();
        }
        let ticket = self.generation.next();
        let ctx = parent.child();
        self.in_flight = Some(ctx.clone());
        (ticket, ctx)
    }

    /// Cancel the in-flight submit. Returns false if there was none.
    pub fn cancel(&mut self) -> bool {
        match self.in_flight.take() {
            Some(ctx) => {
                ctx.cancel();
                true
            }
            None => false,
        }
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Classify a finished submit.
    pub fn resolve<T>(&mut self, ticket: Ticket, result: CamperResult<T>) -> SubmitResolution<T> {
        if !self.generation.is_current(ticket) {
            return SubmitResolution::Stale;
        }
        if self.in_flight.take().is_none() {
            return SubmitResolution::Canceled;
        }
        match result {
            Ok(value) => SubmitResolution::Applied(value),
            Err(err) if err.is_canceled() => SubmitResolution::Canceled,
            Err(err) => SubmitResolution::Failed(err),
        }
    }
}

// ============================================================================
// CONFIRM-THEN-ACT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum ConfirmState<K> {
    Idle,
    Armed {
        target: K,
        ticket: Ticket,
        armed_at: Instant,
    },
}

/// What a trigger did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmStep<K> {
    /// First press. Ask for confirmation and call
    /// [`ConfirmGuard::expire`] with `ticket` after `timeout`.
    Armed { ticket: Ticket, timeout: Duration },
    /// Second press on the same target inside the window. Perform the action.
    Fired(K),
}

/// Double-press confirmation for destructive actions.
#[derive(Debug, Clone)]
pub struct ConfirmGuard<K> {
    state: ConfirmState<K>,
    window: Duration,
    generation: Generation,
}

impl<K: PartialEq + Clone> ConfirmGuard<K> {
    pub fn new(window: Duration) -> Self {
        Self {
            state: ConfirmState::Idle,
            window,
            generation: Generation::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn trigger(&mut self, target: K) -> ConfirmStep<K> {
        self.trigger_at(target, Instant::now())
    }

    pub fn trigger_at(&mut self, target: K, now: Instant) -> ConfirmStep<K> {
        let fires = matches!(
            &self.state,
            ConfirmState::Armed { target: armed, armed_at, .. }
                if *armed == target && now.saturating_duration_since(*armed_at) < self.window
        );
        if fires {
            self.state = ConfirmState::Idle;
            self.generation.next();
            return ConfirmStep::Fired(target);
        }

        let ticket = self.generation.next();
        self.state = ConfirmState::Armed {
            target,
            ticket,
            armed_at: now,
        };
        ConfirmStep::Armed {
            ticket,
            timeout: self.window,
        }
    }

    /// Timer callback. Disarms only if `ticket` is the one currently armed.
    pub fn expire(&mut self, ticket: Ticket) -> bool {
        let matches_armed = matches!(&self.state, ConfirmState::Armed { ticket: armed, .. } if *armed == ticket);
        if matches_armed {
            self.state = ConfirmState::Idle;
        }
        matches_armed
    }

    /// Any other key disarms.
    pub fn reset(&mut self) {
        if self.is_armed() {
            self.generation.next();
        }
        self.state = ConfirmState::Idle;
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, ConfirmState::Armed { .. })
    }

    pub fn armed_target(&self) -> Option<&K> {
        match &self.state {
            ConfirmState::Armed { target, .. } => Some(target),
            ConfirmState::Idle => None,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use camper_core::RemoteError;

    #[test]
    fn test_only_latest_ticket_applies() {
        let mut generation = Generation::new();
        let one = generation.next();
        let two = generation.next();
        let three = generation.next();

        let applied: Vec<u64> = [three, one, two]
            .into_iter()
            .filter_map(|t| generation.accept(t, t.value()))
            .collect();
        assert_eq!(applied, vec![3]);
    }

    #[test]
    fn test_debounce_keeps_last_keystroke() {
        let mut debounce = Debouncer::new(Duration::from_millis(400));
        let first = debounce.schedule();
        let second = debounce.schedule();
        assert!(!debounce.fire(first));
        assert!(debounce.fire(second));

        debounce.cancel();
        assert!(!debounce.fire(second));
    }

    #[test]
    fn test_submit_applied() {
        let mut guard = SubmitGuard::new();
        let (ticket, _ctx) = guard.begin(&FetchContext::new());
        assert!(guard.in_flight());

        match guard.resolve(ticket, Ok::<_, CamperError>("saved")) {
            SubmitResolution::Applied(value) => assert_eq!(value, "saved"),
            other => panic!("expected Applied, got {:?}", other),
        }
        assert!(!guard.in_flight());
    }

    #[test]
    fn test_submit_cancel_is_silent() {
        let mut guard = SubmitGuard::new();
        let (ticket, ctx) = guard.begin(&FetchContext::new());
        assert!(guard.cancel());
        assert!(ctx.is_canceled());

        let resolution = guard.resolve::<()>(ticket, Err(CamperError::Canceled));
        assert!(matches!(resolution, SubmitResolution::Canceled));
        assert!(!guard.cancel());
    }

    #[test]
    fn test_submit_superseded_is_stale() {
        let mut guard = SubmitGuard::new();
        let parent = FetchContext::new();
        let (first, first_ctx) = guard.begin(&parent);
        let (second, _) = guard.begin(&parent);
        assert!(first_ctx.is_canceled());

        assert!(matches!(guard.resolve(first, Ok::<_, CamperError>(1)), SubmitResolution::Stale));
        assert!(matches!(guard.resolve(second, Ok::<_, CamperError>(2)), SubmitResolution::Applied(2)));
    }

    #[test]
    fn test_submit_failure_surfaces() {
        let mut guard = SubmitGuard::new();
        let (ticket, _) = guard.begin(&FetchContext::new());
        let err: CamperError = RemoteError::Status {
            endpoint: "/answers.json".to_string(),
            status: 500,
            message: "boom".to_string(),
        }
        .into();
        assert!(matches!(guard.resolve::<()>(ticket, Err(err)), SubmitResolution::Failed(_)));
    }

    #[test]
    fn test_confirm_second_press_fires_once() {
        let mut guard = ConfirmGuard::new(Duration::from_secs(3));
        let t0 = Instant::now();
        assert!(matches!(guard.trigger_at(7, t0), ConfirmStep::Armed { .. }));
        assert_eq!(
            guard.trigger_at(7, t0 + Duration::from_secs(1)),
            ConfirmStep::Fired(7)
        );
        assert!(!guard.is_armed());
        assert!(matches!(
            guard.trigger_at(7, t0 + Duration::from_secs(2)),
            ConfirmStep::Armed { .. }
        ));
    }

    #[test]
    fn test_confirm_other_target_rearms() {
        let mut guard = ConfirmGuard::new(Duration::from_secs(3));
        let t0 = Instant::now();
        guard.trigger_at(7, t0);
        assert!(matches!(guard.trigger_at(8, t0), ConfirmStep::Armed { .. }));
        assert_eq!(guard.armed_target(), Some(&8));
    }

    #[test]
    fn test_confirm_expires_on_timer_and_window() {
        let mut guard = ConfirmGuard::new(Duration::from_secs(3));
        let t0 = Instant::now();
        let ConfirmStep::Armed { ticket, timeout } = guard.trigger_at(7, t0) else {
            panic!("first press should arm");
        };
        assert_eq!(timeout, Duration::from_secs(3));
        assert!(guard.expire(ticket));
        assert!(matches!(guard.trigger_at(7, t0), ConfirmStep::Armed { .. }));

        assert!(matches!(
            guard.trigger_at(7, t0 + Duration::from_secs(4)),
            ConfirmStep::Armed { .. }
        ));
    }

    #[test]
    fn test_confirm_stale_timer_does_not_disarm() {
        let mut guard = ConfirmGuard::new(Duration::from_secs(3));
        let t0 = Instant::now();
        let ConfirmStep::Armed { ticket: old, .. } = guard.trigger_at(7, t0) else {
            panic!("first press should arm");
        };
        guard.trigger_at(8, t0);
        assert!(!guard.expire(old));
        assert!(guard.is_armed());
    }

    #[test]
    fn test_confirm_reset() {
        let mut guard = ConfirmGuard::new(Duration::from_secs(3));
        guard.trigger(1);
        guard.reset();
        assert!(!guard.is_armed());
        assert!(matches!(guard.trigger(1), ConfirmStep::Armed { .. }));
    }
}
