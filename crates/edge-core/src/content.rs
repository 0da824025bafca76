//! Content-model contracts consumed by the edge cache.
//!
//! Pages, blocks and widgets are owned by the content system. The edge cache
//! only reads them through the narrow traits defined here.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Get the raw numeric id.
            pub fn get(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

define_id!(WidgetId, "Identifier of a widget.");
define_id!(PageId, "Identifier of a page.");
define_id!(BlockId, "Identifier of a block or shared block.");

/// Whether a widget takes part in edge-fragment caching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeCaching {
    /// Rendered as an edge inclusion and cached on its own.
    #[default]
    Participates,
    /// Always rendered inline with its page.
    Skip,
}

impl EdgeCaching {
    /// Check if the widget opted out.
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skip)
    }
}

/// Options forwarded to a page when building its absolute URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlOptions {
    /// Host override (e.g. a canonical public host).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Port override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Protocol override ("http" or "https").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

impl UrlOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the host override.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the port override.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the protocol override.
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }
}

/// A widget placed inside a block.
///
/// Every widget variant implements this trait; the opt-out capability and
/// the dedicated URL have defaults so plain widgets only provide an id and
/// the URL of the page that owns them.
pub trait Widget: Send + Sync + fmt::Debug {
    /// The widget id.
    fn id(&self) -> WidgetId;

    /// The dedicated URL, if the widget is served from one.
    ///
    /// May be absolute or host-relative; a host-relative URL is resolved
    /// against the owning page URL when the widget is invalidated.
    fn unique_url(&self) -> Option<&str> {
        None
    }

    /// Whether the widget has a dedicated URL.
    fn has_unique_url(&self) -> bool {
        self.unique_url().is_some()
    }

    /// Edge-caching capability of this widget.
    fn edge_caching(&self) -> EdgeCaching {
        EdgeCaching::Participates
    }

    /// Freshness lifetime for this widget type, if it differs from the default.
    fn default_ttl(&self) -> Option<Duration> {
        None
    }

    /// Absolute URL of the page owning this widget.
    fn owner_page_url(&self, options: &UrlOptions) -> String;
}

/// A block definition reused by several pages.
#[derive(Debug, Clone)]
pub struct SharedBlock {
    /// Shared block id.
    pub id: BlockId,
    /// Ordered widgets of the shared block.
    pub widgets: Vec<Arc<dyn Widget>>,
}

impl SharedBlock {
    /// Create a shared block.
    pub fn new(id: BlockId, widgets: Vec<Arc<dyn Widget>>) -> Self {
        Self { id, widgets }
    }
}

/// Where a block's widgets live.
#[derive(Debug, Clone)]
pub enum BlockSource {
    /// Widgets owned by this block.
    Private(Vec<Arc<dyn Widget>>),
    /// Alias of a shared block.
    Shared(Arc<SharedBlock>),
}

/// A slot within a page.
#[derive(Debug, Clone)]
pub struct Block {
    /// Block id.
    pub id: BlockId,
    /// Widget source.
    pub source: BlockSource,
}

impl Block {
    /// Create a block owning its widgets.
    pub fn private(id: BlockId, widgets: Vec<Arc<dyn Widget>>) -> Self {
        Self {
            id,
            source: BlockSource::Private(widgets),
        }
    }

    /// Create a block aliasing a shared block.
    pub fn shared(id: BlockId, shared: Arc<SharedBlock>) -> Self {
        Self {
            id,
            source: BlockSource::Shared(shared),
        }
    }

    /// Id of the block that actually holds the widgets.
    pub fn real_block_id(&self) -> BlockId {
        match &self.source {
            BlockSource::Private(_) => self.id,
            BlockSource::Shared(shared) => shared.id,
        }
    }

    /// Widgets of the real block, in order.
    pub fn real_widgets(&self) -> &[Arc<dyn Widget>] {
        match &self.source {
            BlockSource::Private(widgets) => widgets,
            BlockSource::Shared(shared) => &shared.widgets,
        }
    }

    /// Check if this block aliases a shared block.
    pub fn is_shared(&self) -> bool {
        matches!(self.source, BlockSource::Shared(_))
    }
}

/// A page composed of blocks.
pub trait Page: Send + Sync {
    /// The page id.
    fn id(&self) -> PageId;

    /// Canonical absolute URL of the page.
    fn absolute_url(&self, options: &UrlOptions) -> String;

    /// Ordered blocks of the page.
    fn blocks(&self) -> &[Block];

    /// Whether the page content changed since it was last cached.
    fn is_modified(&self) -> bool {
        false
    }

    /// Iterate every widget of every real block, in page order.
    fn widgets(&self) -> Box<dyn Iterator<Item = &Arc<dyn Widget>> + '_> {
        Box::new(self.blocks().iter().flat_map(|b| b.real_widgets().iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Text(u64);

    impl Widget for Text {
        fn id(&self) -> WidgetId {
            WidgetId(self.0)
        }

        fn owner_page_url(&self, _options: &UrlOptions) -> String {
            "http://site/".to_string()
        }
    }

    #[derive(Debug)]
    struct Banner;

    impl Widget for Banner {
        fn id(&self) -> WidgetId {
            WidgetId(9)
        }

        fn unique_url(&self) -> Option<&str> {
            Some("http://site/banner")
        }

        fn edge_caching(&self) -> EdgeCaching {
            EdgeCaching::Skip
        }

        fn owner_page_url(&self, _options: &UrlOptions) -> String {
            "http://site/".to_string()
        }
    }

    struct Home {
        blocks: Vec<Block>,
    }

    impl Page for Home {
        fn id(&self) -> PageId {
            PageId(1)
        }

        fn absolute_url(&self, _options: &UrlOptions) -> String {
            "http://site/".to_string()
        }

        fn blocks(&self) -> &[Block] {
            &self.blocks
        }
    }

    #[test]
    fn test_widget_defaults() {
        let w = Text(1);
        assert!(!w.has_unique_url());
        assert_eq!(w.edge_caching(), EdgeCaching::Participates);
        assert!(w.default_ttl().is_none());
    }

    #[test]
    fn test_widget_overrides() {
        let w = Banner;
        assert!(w.has_unique_url());
        assert!(w.edge_caching().is_skipped());
    }

    #[test]
    fn test_shared_block_resolves_real_widgets() {
        let widgets: Vec<Arc<dyn Widget>> = vec![Arc::new(Text(3))];
        let shared = Arc::new(SharedBlock::new(BlockId(50), widgets));
        let a = Block::shared(BlockId(10), shared.clone());
        let b = Block::shared(BlockId(11), shared);

        assert!(a.is_shared());
        assert_eq!(a.real_block_id(), BlockId(50));
        assert_eq!(b.real_block_id(), BlockId(50));
        assert_eq!(a.real_widgets()[0].id(), WidgetId(3));
        assert_eq!(b.real_widgets()[0].id(), WidgetId(3));
    }

    #[test]
    fn test_page_widgets_in_order() {
        let widgets: Vec<Arc<dyn Widget>> = vec![Arc::new(Text(3))];
        let shared = Arc::new(SharedBlock::new(BlockId(50), widgets));
        let page = Home {
            blocks: vec![
                Block::private(
                    BlockId(1),
                    vec![Arc::new(Text(1)) as Arc<dyn Widget>, Arc::new(Text(2))],
                ),
                Block::shared(BlockId(2), shared),
            ],
        };

        let ids: Vec<u64> = page.widgets().map(|w| w.id().get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(!page.is_modified());
    }

    #[test]
    fn test_id_serialization() {
        let json = serde_json::to_string(&WidgetId(7)).unwrap();
        assert_eq!(json, "7");
        assert_eq!(WidgetId::from(7).to_string(), "7");
    }

    #[test]
    fn test_edge_caching_serialization() {
        let json = serde_json::to_string(&EdgeCaching::Skip).unwrap();
        assert_eq!(json, r#""skip""#);
    }
}
