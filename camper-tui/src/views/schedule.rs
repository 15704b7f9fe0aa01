//! Schedule view.

use crate::state::App;
use crate::views::{list_block, placeholder, render_placeholder};
use crate::widgets::DetailPanel;
use camper_core::ScheduleEntryInfo;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::Style,
    widgets::{List, ListItem, ListState},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: ratatui::layout::Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let snap = &app.schedule.snapshot;
    let entries = snap.data().map(Vec::as_slice).unwrap_or_default();
    let block = list_block("Schedule", snap, app);
    if let Some(message) = placeholder(snap, "schedule entries") {
        render_placeholder(f, block, message, app, chunks[0]);
    } else {
        let items: Vec<ListItem> = entries
            .iter()
            .map(|entry| ListItem::new(format!("{}  {}", when(entry), entry.summary)))
            .collect();

        let mut state = ListState::default();
        if let Some(selected) = app.schedule.selected {
            state.select(entries.iter().position(|e| e.id == selected));
        }

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().fg(app.theme.primary).bg(app.theme.bg_highlight));
        f.render_stateful_widget(list, chunks[0], &mut state);
    }

    let mut fields = Vec::new();
    if let Some(entry) = app
        .schedule
        .selected
        .and_then(|id| entries.iter().find(|e| e.id == id))
    {
        fields.push(("Event", entry.summary.clone()));
        fields.push(("Starts", entry.starts_at.to_rfc3339()));
        fields.push(("Ends", entry.ends_at.to_rfc3339()));
        if !entry.participants.is_empty() {
            fields.push(("With", entry.participants.join(", ")));
        }
    }

    let detail = DetailPanel {
        title: "Details",
        fields,
        style: Style::default().fg(app.theme.secondary),
    };
    detail.render(f, chunks[1]);
}

fn when(entry: &ScheduleEntryInfo) -> String {
    if entry.all_day {
        format!("{} all day", entry.starts_at.format("%a %b %d"))
    } else {
        entry.starts_at.format("%a %b %d %H:%M").to_string()
    }
}
