//! The cache-strategy seam called by the content system.

use async_trait::async_trait;
use edge_core::{Page, RenderContext, UrlOptions, Widget, WidgetId};
use serde::{Deserialize, Serialize};

use crate::fragment::FragmentMap;
use crate::policy::WidgetCachePolicy;

/// Options for expiring a widget.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpireOptions {
    /// Also match deeper paths sharing the page URL as prefix.
    #[serde(default)]
    pub loose: bool,
    /// Forwarded to the owning page's absolute URL.
    #[serde(default)]
    pub url: UrlOptions,
}

impl ExpireOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable loose matching.
    pub fn loose(mut self) -> Self {
        self.loose = true;
        self
    }

    /// Set URL options for the owning page.
    pub fn with_url_options(mut self, url: UrlOptions) -> Self {
        self.url = url;
        self
    }
}

/// How widget output is cached and expired.
///
/// Rendering asks for fragments with `multi_get` and hands rendered output to
/// `cache`; content mutations call `expire` / `expire_page`.
#[async_trait]
pub trait EdgeCacheStrategy: Send + Sync {
    /// Error surfaced to the content system.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Cached or deferred output for the widgets of `page`.
    fn multi_get(&self, page: &dyn Page, ctx: &RenderContext) -> FragmentMap;

    /// Store the rendered output of one widget.
    fn cache(&self, widget_id: WidgetId, contents: &str, policy: &WidgetCachePolicy);

    /// Expire everything derived from `widget`.
    async fn expire(&self, widget: &dyn Widget, options: &ExpireOptions) -> Result<(), Self::Error>;

    /// Expire every cached rendering of `page`.
    async fn expire_page(&self, page: &dyn Page) -> Result<(), Self::Error>;
}
