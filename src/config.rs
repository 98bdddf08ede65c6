//! Plugin configuration.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::token::DEFAULT_NAMESPACE;

/// Timestamp source, unix milliseconds. Injectable so tests can pin time.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Wall-clock backed [`Clock`].
pub fn system_clock() -> Clock {
    Arc::new(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as i64)
            .unwrap_or(0)
    })
}

/// Plain-data configuration.
///
/// Callable overrides (key builder, serializer, clock, diagnostics) live on
/// the plugin builder instead; they cannot round-trip through serde.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuFlowConfig {
    /// Token namespace. Buttons from other subsystems sharing the same chat
    /// are ignored as long as their namespace differs.
    pub namespace: String,
    /// Maximum retained history entries per session; `None` keeps everything.
    /// Exceeding the limit silently drops the oldest entries.
    pub history_limit: Option<usize>,
}

impl Default for MenuFlowConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            history_limit: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MenuFlowConfig::default();
        assert_eq!(config.namespace, "mm");
        assert_eq!(config.history_limit, None);
    }

    #[test]
    fn test_partial_json() {
        let config: MenuFlowConfig = serde_json::from_str(r#"{"history_limit": 5}"#).unwrap();
        assert_eq!(config.namespace, "mm"); // Default
        assert_eq!(config.history_limit, Some(5));
    }

    #[test]
    fn test_system_clock_is_recent() {
        let clock = system_clock();
        // Anything after 2020 proves the epoch math is not off by a unit.
        assert!(clock() > 1_577_836_800_000);
    }
}
