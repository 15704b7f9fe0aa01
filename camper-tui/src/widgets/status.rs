//! Pool state badge and the cache status line.

use crate::theme::{snapshot_state_color, CamperTheme};
use camper_cache::{MetricsSummary, Snapshot, SnapshotState};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Short label for the state of the data a view shows.
pub struct PoolBadge {
    pub state: SnapshotState,
    pub has_data: bool,
    pub error: Option<String>,
}

impl PoolBadge {
    pub fn from_snapshot<T>(snap: &Snapshot<T>) -> Self {
        Self {
            state: snap.state(),
            has_data: snap.has_data(),
            error: snap.error().map(ToString::to_string),
        }
    }

    pub fn label(&self) -> String {
        match (self.state, self.has_data) {
            (SnapshotState::Loading, true) => "refreshing".to_string(),
            (SnapshotState::Error, true) => "stale (refresh failed)".to_string(),
            (state, _) => state.as_str().to_string(),
        }
    }

    pub fn span(&self, theme: &CamperTheme) -> Span<'static> {
        Span::styled(
            format!("[{}]", self.label()),
            Style::default()
                .fg(snapshot_state_color(self.state, theme))
                .add_modifier(Modifier::BOLD),
        )
    }
}

pub struct StatusLine<'a> {
    pub badge: Option<PoolBadge>,
    pub summary: &'a MetricsSummary,
    pub theme: &'a CamperTheme,
}

impl<'a> StatusLine<'a> {
    pub fn render(&self, f: &mut Frame<'_>, area: Rect) {
        let mut spans = Vec::new();
        if let Some(badge) = &self.badge {
            spans.push(badge.span(self.theme));
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled(
            format_summary(self.summary),
            Style::default().fg(self.theme.text_dim),
        ));
        f.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}

pub fn format_summary(summary: &MetricsSummary) -> String {
    format!(
        "pools {} • p50 {}ms • errors {:.0}% • apdex {:.2}",
        summary.active_pools,
        summary.p50_latency.as_millis(),
        summary.error_rate * 100.0,
        summary.apdex,
    )
}
