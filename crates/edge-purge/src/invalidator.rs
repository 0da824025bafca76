//! Invalidation orchestration for widgets, blocks and pages.

use async_trait::async_trait;
use edge_cache::{
    resolve_url, BanBase, BanPattern, BanSuffix, EdgeCacheStrategy, ExpireOptions, FragmentMap,
    FragmentResolver, WidgetCachePolicy,
};
use edge_core::{Block, EdgeConfig, Page, RenderContext, UrlOptions, Widget, WidgetId};
use tracing::debug;

use crate::dispatcher::{DispatchReport, Dispatcher};
use crate::error::PurgeResult;
use crate::registry::ServerRegistry;
use crate::transport::{BanTransport, TcpBanTransport};

/// Edge caching strategy: renders edge inclusions and bans stale entries.
pub struct Invalidator<R, T> {
    resolver: FragmentResolver,
    dispatcher: Dispatcher<R, T>,
}

impl<R: ServerRegistry> Invalidator<R, TcpBanTransport> {
    /// Build an invalidator speaking HTTP to the servers of `registry`.
    pub fn from_config(config: &EdgeConfig, registry: R) -> PurgeResult<Self> {
        config.validate()?;

        let invalidation = &config.invalidation;
        let transport = TcpBanTransport::new(invalidation.timeout());
        let dispatcher = Dispatcher::new(registry, transport, invalidation.http_method()?);

        Ok(Self::new(FragmentResolver::new(&config.esi), dispatcher))
    }
}

impl<R: ServerRegistry, T: BanTransport> Invalidator<R, T> {
    /// Create from a resolver and a dispatcher.
    pub fn new(resolver: FragmentResolver, dispatcher: Dispatcher<R, T>) -> Self {
        Self { resolver, dispatcher }
    }

    /// The fragment resolver.
    pub fn resolver(&self) -> &FragmentResolver {
        &self.resolver
    }

    /// The ban dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher<R, T> {
        &self.dispatcher
    }

    /// Invalidate one widget.
    ///
    /// A widget without a dedicated URL lives inside its owning page, so its
    /// inclusion requests are banned first and the page renders second;
    /// the page ban is only sent once the widget ban has completed on every
    /// server. A widget with a dedicated URL is banned at that URL alone,
    /// resolved against its owning page when host-relative.
    /// Widgets opted out of edge caching have no inclusion entries to ban.
    ///
    /// Both patterns are built before anything is sent, so a malformed URL
    /// fails without any dispatch.
    pub async fn expire(&self, widget: &dyn Widget, options: &ExpireOptions) -> PurgeResult<Vec<DispatchReport>> {
        let (widget_ban, page_ban) = match widget.unique_url() {
            Some(url) => {
                let url = resolve_url(url, &widget.owner_page_url(&options.url))?;
                (BanPattern::resource(&url, options.loose)?, None)
            }
            None => {
                let base = BanBase::parse(&widget.owner_page_url(&options.url))?;
                let widget_ban = base.pattern(&BanSuffix::Widget {
                    id: widget.id(),
                    loose: options.loose,
                });
                let page_ban = base.pattern(&BanSuffix::Page { loose: options.loose });
                (widget_ban, Some(page_ban))
            }
        };

        let mut reports = Vec::with_capacity(2);

        if self.resolver.renders_esi(widget) {
            reports.push(self.dispatcher.ban(&widget_ban).await);
        } else {
            debug!(widget = %widget.id(), "widget not edge cached, skipping widget ban");
        }

        if let Some(page_ban) = page_ban {
            reports.push(self.dispatcher.ban(&page_ban).await);
        }

        debug!(widget = %widget.id(), bans = reports.len(), "widget expired");
        Ok(reports)
    }

    /// Invalidate every widget of a block, read through its real block.
    ///
    /// Stops at the first widget whose URL cannot be parsed.
    pub async fn expire_block(&self, block: &Block, options: &ExpireOptions) -> PurgeResult<Vec<DispatchReport>> {
        let mut reports = Vec::new();
        for widget in block.real_widgets() {
            reports.extend(self.expire(widget.as_ref(), options).await?);
        }
        Ok(reports)
    }

    /// Invalidate every cached variant of a page.
    pub async fn expire_page(&self, page: &dyn Page) -> PurgeResult<Vec<DispatchReport>> {
        let url = page.absolute_url(&UrlOptions::default());
        debug!(page = %page.id(), url = %url, "expiring page");
        self.expire_url(&url, None).await
    }

    /// Invalidate a page only if it reports unsaved modifications.
    pub async fn expire_if_modified(&self, page: &dyn Page) -> PurgeResult<Option<Vec<DispatchReport>>> {
        if !page.is_modified() {
            return Ok(None);
        }
        self.expire_page(page).await.map(Some)
    }

    /// Invalidate several pages in order.
    pub async fn expire_pages(&self, pages: &[&dyn Page]) -> PurgeResult<Vec<DispatchReport>> {
        let mut reports = Vec::new();
        for page in pages {
            reports.extend(self.expire_page(*page).await?);
        }
        Ok(reports)
    }

    /// Invalidate everything cached under `url`.
    ///
    /// Sends, in order: the caller's regex suffix when given, then every
    /// query-string variant, then the exact resource.
    pub async fn expire_url(&self, url: &str, regexp: Option<&str>) -> PurgeResult<Vec<DispatchReport>> {
        let base = BanBase::parse(url)?;

        let mut suffixes = Vec::with_capacity(3);
        if let Some(regexp) = regexp {
            suffixes.push(BanSuffix::Custom(regexp.to_string()));
        }
        suffixes.push(BanSuffix::AnyQuery);
        suffixes.push(BanSuffix::Exact);

        let mut reports = Vec::with_capacity(suffixes.len());
        for suffix in &suffixes {
            reports.push(self.dispatcher.ban(&base.pattern(suffix)).await);
        }
        Ok(reports)
    }
}

#[async_trait]
impl<R: ServerRegistry, T: BanTransport> EdgeCacheStrategy for Invalidator<R, T> {
    type Error = crate::PurgeError;

    fn multi_get(&self, page: &dyn Page, ctx: &RenderContext) -> FragmentMap {
        self.resolver.multi_get(page, ctx)
    }

    fn cache(&self, widget_id: WidgetId, contents: &str, policy: &WidgetCachePolicy) {
        self.resolver.cache(widget_id, contents, policy);
    }

    async fn expire(&self, widget: &dyn Widget, options: &ExpireOptions) -> Result<(), Self::Error> {
        Invalidator::expire(self, widget, options).await.map(|_| ())
    }

    async fn expire_page(&self, page: &dyn Page) -> Result<(), Self::Error> {
        Invalidator::expire_page(self, page).await.map(|_| ())
    }
}
