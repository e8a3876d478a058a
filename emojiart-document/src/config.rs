//! Document configuration.

use std::time::Duration;

/// Quiescence window after which a pending autosave is written.
pub const DEFAULT_AUTOSAVE_INTERVAL: Duration = Duration::from_secs(5);

/// Default maximum number of undoable actions.
pub const DEFAULT_UNDO_LIMIT: usize = 1000;

/// Default timeout for fetching a remote background image.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Tunables for a [`Document`](crate::Document) and its image fetcher.
#[derive(Debug, Clone)]
pub struct DocumentConfig {
    /// Quiescence window before an edit burst is saved.
    pub autosave_interval: Duration,
    /// Maximum undo depth, `None` for unbounded.
    pub undo_limit: Option<usize>,
    /// Timeout for a single background image request.
    pub fetch_timeout: Duration,
    /// User agent sent with image requests.
    pub user_agent: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            autosave_interval: DEFAULT_AUTOSAVE_INTERVAL,
            undo_limit: Some(DEFAULT_UNDO_LIMIT),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            user_agent: format!("emojiart/{}", crate::VERSION),
        }
    }

    /// Set the autosave quiescence window.
    #[must_use]
    pub fn with_autosave_interval(mut self, interval: Duration) -> Self {
        self.autosave_interval = interval;
        self
    }

    /// Set the maximum undo depth.
    #[must_use]
    pub fn with_undo_limit(mut self, limit: Option<usize>) -> Self {
        self.undo_limit = limit;
        self
    }

    /// Set the image request timeout.
    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Set the user agent for image requests.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DocumentConfig::default();
        assert_eq!(config.autosave_interval, Duration::from_secs(5));
        assert_eq!(config.undo_limit, Some(DEFAULT_UNDO_LIMIT));
        assert!(config.user_agent.starts_with("emojiart/"));
    }

    #[test]
    fn test_builders() {
        let config = DocumentConfig::new()
            .with_autosave_interval(Duration::from_millis(250))
            .with_undo_limit(None)
            .with_fetch_timeout(Duration::from_secs(2))
            .with_user_agent("test-agent");
        assert_eq!(config.autosave_interval, Duration::from_millis(250));
        assert_eq!(config.undo_limit, None);
        assert_eq!(config.fetch_timeout, Duration::from_secs(2));
        assert_eq!(config.user_agent, "test-agent");
    }
}
