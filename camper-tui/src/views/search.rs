//! Cross-account search view.

use crate::state::App;
use crate::widgets::{DetailPanel, InputBar};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: ratatui::layout::Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let title = if app.search.searching() {
        "Search (searching…)"
    } else {
        "Search"
    };
    InputBar {
        title,
        value: &app.search.input,
        placeholder: "Search every account",
        style: Style::default().fg(app.theme.text),
        placeholder_style: Style::default().fg(app.theme.text_dim),
        focused: true,
    }
    .render(f, rows[0]);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[1]);

    let results_title = match &app.search.failure {
        Some(failure) => format!("Results ({})", failure),
        None => format!("Results ({})", app.search.results.len()),
    };
    let block = Block::default().title(results_title).borders(Borders::ALL);

    if app.search.results.is_empty() {
        let message = if app.search.query.is_empty() {
            "Start typing to search"
        } else if app.search.searching() {
            "Searching…"
        } else {
            "No results"
        };
        let paragraph = Paragraph::new(message)
            .style(Style::default().fg(app.theme.text_dim))
            .block(block);
        f.render_widget(paragraph, chunks[0]);
    } else {
        let items: Vec<ListItem> = app
            .search
            .results
            .iter()
            .map(|r| {
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{:<10}", r.kind), Style::default().fg(app.theme.info)),
                    Span::raw(r.title.clone()),
                    Span::styled(
                        format!("  {}", r.account_name),
                        Style::default().fg(app.theme.text_dim),
                    ),
                ]))
            })
            .collect();

        let mut state = ListState::default();
        state.select(Some(app.search.selected.min(app.search.results.len() - 1)));
        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().fg(app.theme.primary).bg(app.theme.bg_highlight));
        f.render_stateful_widget(list, chunks[0], &mut state);
    }

    let mut fields = Vec::new();
    if let Some(result) = app.search.results.get(app.search.selected) {
        fields.push(("Title", result.title.clone()));
        fields.push(("Type", result.kind.clone()));
        fields.push(("Project", result.project.clone()));
        fields.push(("Account", result.account_name.clone()));
        fields.push(("Created", result.created_at.to_rfc3339()));
    }
    DetailPanel {
        title: "Details",
        fields,
        style: Style::default().fg(app.theme.secondary),
    }
    .render(f, chunks[1]);
}
