//! Render context for the request currently being served.

use std::sync::atomic::{AtomicU64, Ordering};

use url::Url;

/// Query parameter that marks an edge-inclusion request for one widget.
pub const WIDGET_PARAM: &str = "widget";

/// Unique request identifier for tracing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a new request ID.
    pub fn generate() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = format!(
            "{:x}-{:x}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        );
        Self(id)
    }

    /// Create from an existing ID string.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error building a render context.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("invalid request URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// The request being rendered.
///
/// Fragment resolution derives widget inclusion URLs from this request, so it
/// keeps the full absolute URL rather than just the path.
#[derive(Debug, Clone)]
pub struct RenderContext {
    /// Unique request identifier.
    pub request_id: RequestId,
    url: Url,
}

impl RenderContext {
    /// Create a context from an absolute request URL.
    pub fn parse(request_url: &str) -> Result<Self, ContextError> {
        let url = Url::parse(request_url).map_err(|source| ContextError::InvalidUrl {
            url: request_url.to_string(),
            source,
        })?;
        Ok(Self::new(url))
    }

    /// Create a context from an already parsed URL.
    pub fn new(url: Url) -> Self {
        Self {
            request_id: RequestId::generate(),
            url,
        }
    }

    /// Set the request ID.
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    /// The full request URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Request path.
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Raw query string, without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.url.query()
    }

    /// Decoded query parameters in request order.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// Get a query parameter by name (first occurrence).
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    /// Whether this request renders a single widget for the edge cache.
    pub fn is_widget_request(&self) -> bool {
        self.query_param(WIDGET_PARAM).is_some()
    }
}
