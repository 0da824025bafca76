//! Freshness policy for widget responses.

use std::time::Duration;

use edge_core::{Widget, WidgetConfig};
use serde::{Deserialize, Serialize};

/// Freshness policy applied to a widget response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetCachePolicy {
    /// Time-to-live of the response.
    pub ttl: Duration,
}

impl Default for WidgetCachePolicy {
    fn default() -> Self {
        Self::public(WidgetConfig::default().default_ttl())
    }
}

impl WidgetCachePolicy {
    /// Create a public policy.
    pub fn public(ttl: Duration) -> Self {
        Self { ttl }
    }

    /// Policy for `widget`: its own TTL if it declares one, else the configured default.
    pub fn for_widget(widget: &dyn Widget, config: &WidgetConfig) -> Self {
        Self::public(widget.default_ttl().unwrap_or_else(|| config.default_ttl()))
    }

    /// Generate Cache-Control header value.
    pub fn cache_control_header(&self) -> String {
        format!("public, max-age={}", self.ttl.as_secs())
    }
}
