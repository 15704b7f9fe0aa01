//! Adaptive polling intervals.
//!
//! Each tag (usually one per screen) polls at its base interval while the
//! user looks at it and at a slower background interval otherwise. Polls
//! that bring nothing new back off exponentially up to a ceiling.

use std::collections::HashMap;
use std::time::Duration;

/// Intervals for one polling tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    pub tag: String,
    /// Interval while focused and active.
    pub base: Duration,
    /// Interval while not focused.
    pub background: Duration,
    /// Ceiling for backoff.
    pub max: Duration,
}

#[derive(Debug, Clone)]
struct Channel {
    config: PollConfig,
    current: Duration,
    misses: u32,
    focused: bool,
}

impl Channel {
    fn resting(&self) -> Duration {
        if self.focused {
            self.config.base
        } else {
            self.config.background
        }
    }
}

/// Tracks the next interval for every registered tag.
#[derive(Debug, Clone, Default)]
pub struct Poller {
    channels: HashMap<String, Channel>,
}

impl Poller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tag. New tags start focused at their base interval.
    pub fn add(&mut self, config: PollConfig) {
        let channel = Channel {
            current: config.base,
            misses: 0,
            focused: true,
            config,
        };
        self.channels.insert(channel.config.tag.clone(), channel);
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    /// How long to wait before the next poll of `tag`.
    pub fn interval(&self, tag: &str) -> Option<Duration> {
        self.channels.get(tag).map(|c| c.current)
    }

    /// Consecutive polls of `tag` that brought nothing new.
    pub fn misses(&self, tag: &str) -> u32 {
        self.channels.get(tag).map_or(0, |c| c.misses)
    }

    /// New data arrived: drop back to the resting interval.
    pub fn record_hit(&mut self, tag: &str) {
        if let Some(channel) = self.channels.get_mut(tag) {
            channel.misses = 0;
            channel.current = channel.resting();
        }
    }

    /// Nothing new: double the interval up to the ceiling.
    pub fn record_miss(&mut self, tag: &str) {
        if let Some(channel) = self.channels.get_mut(tag) {
            channel.misses = channel.misses.saturating_add(1);
            channel.current = channel.current.saturating_mul(2).min(channel.config.max);
        }
    }

    pub fn set_focused(&mut self, tag: &str, focused: bool) {
        if let Some(channel) = self.channels.get_mut(tag) {
            channel.focused = focused;
            if focused {
                channel.current = channel.config.base;
            } else if channel.current < channel.config.background {
                channel.current = channel.config.background;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poller() -> Poller {
        let mut poller = Poller::new();
        poller.add(PollConfig {
            tag: "todos".to_string(),
            base: Duration::from_secs(30),
            background: Duration::from_secs(120),
            max: Duration::from_secs(300),
        });
        poller
    }

    #[test]
    fn test_misses_back_off_to_max() {
        let mut poller = poller();
        poller.record_miss("todos");
        assert_eq!(poller.interval("todos"), Some(Duration::from_secs(60)));
        for _ in 0..5 {
            poller.record_miss("todos");
        }
        assert_eq!(poller.interval("todos"), Some(Duration::from_secs(300)));
        assert_eq!(poller.misses("todos"), 6);
    }

    #[test]
    fn test_hit_resets_interval() {
        let mut poller = poller();
        poller.record_miss("todos");
        poller.record_miss("todos");
        poller.record_hit("todos");
        assert_eq!(poller.interval("todos"), Some(Duration::from_secs(30)));
        assert_eq!(poller.misses("todos"), 0);
    }

    #[test]
    fn test_blur_uses_background_interval() {
        let mut poller = poller();
        poller.set_focused("todos", false);
        assert_eq!(poller.interval("todos"), Some(Duration::from_secs(120)));
        poller.record_hit("todos");
        assert_eq!(poller.interval("todos"), Some(Duration::from_secs(120)));
        poller.set_focused("todos", true);
        assert_eq!(poller.interval("todos"), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_unknown_tag_is_ignored() {
        let mut poller = poller();
        poller.record_miss("schedule");
        assert_eq!(poller.interval("schedule"), None);
        assert_eq!(poller.tags().count(), 1);
    }
}
