//! Document manager configuration.

/// Configuration for a document manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Generated ids try `prefix1` up to `prefix<limit>` before falling
    /// back to random suffixes.
    pub sequential_id_limit: u32,

    /// Maximum number of committed transactions kept for undo (0 = none).
    pub undo_limit: usize,

    /// Maximum number of change events kept for polling.
    pub change_history: usize,

    /// Whether consecutive changes of the same record within a transaction
    /// are folded into one.
    pub merge_changes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sequential_id_limit: 99,
            undo_limit: 100,
            change_history: 10_000,
            merge_changes: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sequential id limit.
    #[must_use]
    pub const fn sequential_id_limit(mut self, limit: u32) -> Self {
        self.sequential_id_limit = limit;
        self
    }

    /// Sets the undo depth.
    #[must_use]
    pub const fn undo_limit(mut self, limit: usize) -> Self {
        self.undo_limit = limit;
        self
    }

    /// Sets the change history size.
    #[must_use]
    pub const fn change_history(mut self, size: usize) -> Self {
        self.change_history = size;
        self
    }

    /// Sets whether consecutive changes are merged.
    #[must_use]
    pub const fn merge_changes(mut self, value: bool) -> Self {
        self.merge_changes = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.sequential_id_limit, 99);
        assert_eq!(config.undo_limit, 100);
        assert!(config.merge_changes);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .sequential_id_limit(3)
            .undo_limit(0)
            .merge_changes(false);

        assert_eq!(config.sequential_id_limit, 3);
        assert_eq!(config.undo_limit, 0);
        assert!(!config.merge_changes);
    }
}
