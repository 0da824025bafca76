//! Edge fragment caching for widget-based pages.
//!
//! This crate provides:
//! - `FragmentResolver` - Which widgets render as edge inclusions, and their URLs
//! - `BanPattern` - Anchored, host-scoped invalidation patterns
//! - `WidgetCachePolicy` - Freshness lifetime of widget responses
//! - `CacheHeadersBuilder` - Cache-Control / Surrogate-Control headers
//! - `EdgeCacheStrategy` - The seam the content system calls
//!
//! # Example
//!
//! ```ignore
//! use edge_cache::{BanPattern, FragmentResolver};
//! use edge_core::{EsiConfig, RenderContext, WidgetId};
//!
//! let resolver = FragmentResolver::new(&EsiConfig::enabled());
//! let ctx = RenderContext::parse("http://site/news?id=4")?;
//! let fragments = resolver.multi_get(&page, &ctx);
//!
//! // ^/news\?id=4/?&.*widget=7 on host "site"
//! let ban = BanPattern::widget("http://site/news?id=4", WidgetId(7), false)?;
//! ```

mod fragment;
mod headers;
mod pattern;
mod policy;
mod strategy;

pub use fragment::*;
pub use headers::*;
pub use pattern::*;
pub use policy::*;
pub use strategy::*;
