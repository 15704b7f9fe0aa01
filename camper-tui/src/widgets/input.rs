//! Single-line text input.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub struct InputBar<'a> {
    pub title: &'a str,
    pub value: &'a str,
    /// Shown dimmed when `value` is empty.
    pub placeholder: &'a str,
    pub style: Style,
    pub placeholder_style: Style,
    pub focused: bool,
}

impl<'a> InputBar<'a> {
    pub fn render(&self, f: &mut Frame<'_>, area: Rect) {
        let mut spans = if self.value.is_empty() {
            vec![Span::styled(self.placeholder.to_string(), self.placeholder_style)]
        } else {
            vec![Span::styled(self.value.to_string(), self.style)]
        };
        if self.focused {
            spans.push(Span::styled("▏", self.style));
        }

        let paragraph = Paragraph::new(Line::from(spans))
            .block(Block::default().title(self.title).borders(Borders::ALL));
        f.render_widget(paragraph, area);
    }
}
