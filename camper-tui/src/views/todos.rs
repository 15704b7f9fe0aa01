//! Todo list view.

use crate::state::App;
use crate::theme::completion_color;
use crate::views::{list_block, placeholder, render_placeholder};
use crate::widgets::DetailPanel;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, ListState},
    Frame,
};

pub fn render(f: &mut Frame<'_>, app: &App, area: ratatui::layout::Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let snap = &app.todos.snapshot;
    let block = list_block("Todos", snap, app);
    if let Some(message) = placeholder(snap, "todos") {
        render_placeholder(f, block, message, app, chunks[0]);
    } else {
        let todos = snap.data().map(Vec::as_slice).unwrap_or_default();
        let armed = app.trash_confirm.armed_target().copied();
        let items: Vec<ListItem> = todos
            .iter()
            .map(|todo| {
                let mark = if todo.completed { "[x]" } else { "[ ]" };
                let mut style = Style::default().fg(completion_color(todo.completed, &app.theme));
                if todo.completed {
                    style = style.add_modifier(Modifier::CROSSED_OUT);
                }
                if armed == Some(todo.id) {
                    style = Style::default().fg(app.theme.error);
                }
                let mut spans = vec![Span::styled(format!("{} {}", mark, todo.content), style)];
                if let Some(due) = &todo.due_on {
                    spans.push(Span::styled(
                        format!("  due {}", due),
                        Style::default().fg(app.theme.text_dim),
                    ));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();

        let mut state = ListState::default();
        if let Some(selected) = app.todos.selected {
            state.select(todos.iter().position(|t| t.id == selected));
        }

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().fg(app.theme.primary).bg(app.theme.bg_highlight));
        f.render_stateful_widget(list, chunks[0], &mut state);
    }

    let mut fields = Vec::new();
    if let Some(todo) = app.todos.selected_todo() {
        fields.push(("Todo", todo.content.clone()));
        fields.push(("Status", if todo.completed { "completed" } else { "open" }.to_string()));
        if let Some(due) = &todo.due_on {
            fields.push(("Due", due.clone()));
        }
        if !todo.assignees.is_empty() {
            fields.push(("Assigned", todo.assignees.join(", ")));
        }
        if !todo.description.is_empty() {
            fields.push(("Notes", todo.description.clone()));
        }
    }

    let detail = DetailPanel {
        title: "Details",
        fields,
        style: Style::default().fg(app.theme.secondary),
    };
    detail.render(f, chunks[1]);
}
