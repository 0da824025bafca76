//! Edge-inclusion fragments for cacheable widgets.

use std::collections::BTreeMap;
use std::fmt;

use edge_core::{EsiConfig, Page, RenderContext, Widget, WidgetId, WIDGET_PARAM};
use serde::{Deserialize, Serialize};

use crate::policy::WidgetCachePolicy;

/// An edge-inclusion directive pointing the cache server at a widget URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EsiInclude {
    /// URL the cache server fetches and splices in.
    pub src: String,
}

impl EsiInclude {
    /// Create an inclusion for a URL.
    pub fn new(src: impl Into<String>) -> Self {
        Self { src: src.into() }
    }

    /// Render the inclusion tag.
    pub fn to_markup(&self) -> String {
        format!(r#"<esi:include src="{}"/>"#, self.src)
    }
}

impl fmt::Display for EsiInclude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_markup())
    }
}

/// Inclusion markup per widget, keyed by widget id.
pub type FragmentMap = BTreeMap<WidgetId, EsiInclude>;

/// Decides which widgets render as edge inclusions and where they point.
///
/// The resolver never writes cache state: the cache server captures each
/// widget response itself when it fetches the inclusion URL.
#[derive(Debug, Clone, Default)]
pub struct FragmentResolver {
    esi_enabled: bool,
}

impl FragmentResolver {
    /// Create a resolver from the ESI toggle.
    pub fn new(config: &EsiConfig) -> Self {
        Self {
            esi_enabled: config.enabled,
        }
    }

    /// Whether edge rendering is switched on.
    pub fn esi_enabled(&self) -> bool {
        self.esi_enabled
    }

    /// Whether `widget` is rendered as an edge inclusion.
    pub fn renders_esi(&self, widget: &dyn Widget) -> bool {
        self.esi_enabled && !widget.edge_caching().is_skipped()
    }

    /// URL the edge cache fetches for `widget` while rendering `ctx`.
    ///
    /// A dedicated URL is used verbatim. Otherwise the current request URL is
    /// reused with its `widget` parameter set to the widget id. Every other
    /// query segment is kept byte-for-byte and in position, so the URL stays
    /// matchable by a ban built from the page URL.
    pub fn include_url(&self, widget: &dyn Widget, ctx: &RenderContext) -> String {
        if let Some(url) = widget.unique_url() {
            return url.to_string();
        }

        let marker = format!("{}={}", WIDGET_PARAM, widget.id());
        let mut segments: Vec<&str> = Vec::new();
        let mut replaced = false;
        for segment in ctx.query().unwrap_or_default().split('&') {
            if segment.is_empty() {
                continue;
            }
            if !is_widget_segment(segment) {
                segments.push(segment);
            } else if !replaced {
                segments.push(&marker);
                replaced = true;
            }
        }
        if !replaced {
            segments.push(&marker);
        }

        let mut url = ctx.url().clone();
        url.set_fragment(None);
        url.set_query(Some(&segments.join("&")));
        url.to_string()
    }

    /// Inclusion markup for every edge-cacheable widget of `page`.
    ///
    /// Widgets are read through each block's real block, so shared blocks
    /// contribute the same widgets to every page embedding them.
    pub fn multi_get(&self, page: &dyn Page, ctx: &RenderContext) -> FragmentMap {
        let mut fragments = FragmentMap::new();

        if !self.esi_enabled {
            return fragments;
        }

        for widget in page.widgets() {
            if !self.renders_esi(widget.as_ref()) {
                continue;
            }
            let include = EsiInclude::new(self.include_url(widget.as_ref(), ctx));
            tracing::trace!(widget = %widget.id(), src = %include.src, "edge inclusion");
            fragments.insert(widget.id(), include);
        }

        fragments
    }

    /// Store rendered widget contents.
    ///
    /// A no-op for edge caching: the cache server captures the response of
    /// the inclusion request on its own.
    pub fn cache(&self, widget_id: WidgetId, contents: &str, policy: &WidgetCachePolicy) {
        tracing::trace!(
            widget = %widget_id,
            bytes = contents.len(),
            ttl_secs = policy.ttl.as_secs(),
            "cache call ignored, captured at the edge"
        );
    }
}

// Whether a raw `key=value` query segment carries the widget parameter.
fn is_widget_segment(segment: &str) -> bool {
    url::form_urlencoded::parse(segment.as_bytes())
        .next()
        .is_some_and(|(key, _)| key == WIDGET_PARAM)
}
