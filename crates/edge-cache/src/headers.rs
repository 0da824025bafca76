//! Response headers for pages and widget fragments.

use edge_core::{RenderContext, WidgetId};
use http::header::{HeaderMap, HeaderName, HeaderValue, CACHE_CONTROL};

use crate::policy::WidgetCachePolicy;

/// Header names used by the edge cache.
pub mod header_names {
    /// Surrogate-Control header, read and stripped by the edge cache.
    pub const SURROGATE_CONTROL: &str = "surrogate-control";
    /// Widget id of a fragment response (for debugging).
    pub const X_ESI_WIDGET: &str = "x-esi-widget";
}

/// Surrogate-Control value asking the edge cache to process inclusion tags.
pub const ESI_CONTENT: &str = r#"content="ESI/1.0""#;

/// Set the freshness lifetime of a widget response.
pub fn apply_widget_ttl(headers: &mut HeaderMap, policy: &WidgetCachePolicy) {
    if let Ok(value) = HeaderValue::from_str(&policy.cache_control_header()) {
        headers.insert(CACHE_CONTROL, value);
    }
}

/// Mark a page response as carrying edge-inclusion tags.
pub fn mark_esi_content(headers: &mut HeaderMap) {
    headers.insert(
        HeaderName::from_static(header_names::SURROGATE_CONTROL),
        HeaderValue::from_static(ESI_CONTENT),
    );
}

/// Builder for edge-cache response headers.
#[derive(Debug, Default)]
pub struct CacheHeadersBuilder {
    policy: Option<WidgetCachePolicy>,
    esi_content: bool,
    widget: Option<WidgetId>,
    include_debug: bool,
}

impl CacheHeadersBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set Cache-Control from a widget policy.
    pub fn policy(mut self, policy: WidgetCachePolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Mark the response as containing inclusion tags.
    pub fn esi_content(mut self, enabled: bool) -> Self {
        self.esi_content = enabled;
        self
    }

    /// Record the widget this response renders.
    pub fn widget(mut self, id: WidgetId) -> Self {
        self.widget = Some(id);
        self
    }

    /// Enable debug headers in output.
    pub fn include_debug(mut self, enabled: bool) -> Self {
        self.include_debug = enabled;
        self
    }

    /// Build the headers.
    pub fn build(self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Some(policy) = &self.policy {
            apply_widget_ttl(&mut headers, policy);
        }

        if self.esi_content {
            mark_esi_content(&mut headers);
        }

        if self.include_debug {
            if let Some(id) = self.widget {
                if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
                    headers.insert(HeaderName::from_static(header_names::X_ESI_WIDGET), value);
                }
            }
        }

        headers
    }
}

/// Headers for the response to `ctx`, if it is a widget inclusion request.
///
/// Widget requests get the widget's freshness lifetime; anything else is
/// left to the page renderer.
pub fn widget_response_headers(ctx: &RenderContext, policy: &WidgetCachePolicy) -> Option<HeaderMap> {
    let id = ctx.query_param(edge_core::WIDGET_PARAM)?;

    let mut builder = CacheHeadersBuilder::new().policy(policy.clone());
    if let Ok(id) = id.parse::<u64>() {
        builder = builder.widget(WidgetId(id)).include_debug(true);
    }

    Some(builder.build())
}
