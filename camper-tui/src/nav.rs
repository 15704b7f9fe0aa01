//! Navigation and view switching utilities.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Todos,
    Schedule,
    Checkins,
    Search,
}

impl View {
    pub fn title(&self) -> &'static str {
        match self {
            View::Todos => "Todos",
            View::Schedule => "Schedule",
            View::Checkins => "Check-ins",
            View::Search => "Search",
        }
    }

    /// Poller tag for the view. Search is driven by typing, not polling.
    pub fn poll_tag(&self) -> Option<&'static str> {
        match self {
            View::Todos => Some("todos"),
            View::Schedule => Some("schedule"),
            View::Checkins => Some("checkins"),
            View::Search => None,
        }
    }

    pub fn all() -> &'static [View] {
        &[View::Todos, View::Schedule, View::Checkins, View::Search]
    }

    pub fn index(&self) -> usize {
        Self::all().iter().position(|v| v == self).unwrap_or(0)
    }

    pub fn from_index(index: usize) -> Option<View> {
        Self::all().get(index).copied()
    }

    pub fn next(&self) -> View {
        let all = Self::all();
        all[(self.index() + 1) % all.len()]
    }

    pub fn previous(&self) -> View {
        let idx = self.index();
        let all = Self::all();
        let prev = if idx == 0 { all.len() - 1 } else { idx - 1 };
        all[prev]
    }
}
