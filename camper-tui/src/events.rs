//! Event types for the TUI event loop.

use crate::nav::View;
use camper_cache::{Completion, FanOutSummary, Ticket};
use camper_core::{CamperResult, CheckinAnswerInfo, SearchResultInfo};
use crossterm::event::KeyEvent;

#[derive(Debug)]
pub enum TuiEvent {
    Input(KeyEvent),
    Tick,
    Resize { width: u16, height: u16 },
    /// A pool fetch or mutation finished.
    Cache(Completion),
    /// The search debounce timer for `ticket` ran out.
    SearchDebounce { ticket: Ticket, query: String },
    SearchResults {
        ticket: Ticket,
        query: String,
        summary: FanOutSummary<SearchResultInfo>,
    },
    /// The trash confirmation armed with `ticket` timed out.
    ConfirmExpired(Ticket),
    AnswerSubmitted {
        ticket: Ticket,
        result: CamperResult<CheckinAnswerInfo>,
    },
    /// Time to poll the pools behind `view`.
    Poll(View),
}
