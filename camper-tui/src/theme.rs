//! Campfire theme and color utilities.

use crate::notifications::NotificationLevel;
use camper_cache::SnapshotState;
use ratatui::style::Color;

#[derive(Debug, Clone)]
pub struct CamperTheme {
    pub bg: Color,
    pub bg_highlight: Color,
    pub primary: Color,
    pub primary_dim: Color,
    pub secondary: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub text: Color,
    pub text_dim: Color,
    pub border: Color,
    pub border_focus: Color,
}

impl CamperTheme {
    pub fn campfire() -> Self {
        Self {
            bg: Color::Rgb(24, 20, 18),
            bg_highlight: Color::Rgb(52, 44, 38),
            primary: Color::Rgb(255, 170, 60),
            primary_dim: Color::Rgb(150, 100, 40),
            secondary: Color::Rgb(120, 190, 140),
            success: Color::Rgb(110, 200, 90),
            warning: Color::Rgb(240, 200, 70),
            error: Color::Rgb(230, 80, 60),
            info: Color::Rgb(110, 170, 230),
            text: Color::Rgb(240, 232, 220),
            text_dim: Color::Rgb(150, 140, 130),
            border: Color::Rgb(90, 80, 70),
            border_focus: Color::Rgb(255, 170, 60),
        }
    }
}

pub fn snapshot_state_color(state: SnapshotState, theme: &CamperTheme) -> Color {
    match state {
        SnapshotState::Idle => theme.text_dim,
        SnapshotState::Loading => theme.info,
        SnapshotState::Fresh => theme.success,
        SnapshotState::Stale => theme.warning,
        SnapshotState::Error => theme.error,
    }
}

pub fn notification_color(level: NotificationLevel, theme: &CamperTheme) -> Color {
    match level {
        NotificationLevel::Info => theme.info,
        NotificationLevel::Warning => theme.warning,
        NotificationLevel::Error => theme.error,
        NotificationLevel::Success => theme.success,
    }
}

pub fn completion_color(completed: bool, theme: &CamperTheme) -> Color {
    if completed {
        theme.text_dim
    } else {
        theme.text
    }
}
