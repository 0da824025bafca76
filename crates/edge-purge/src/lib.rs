//! Cache invalidation for edge-cached pages and widgets.
//!
//! This crate provides:
//! - `Invalidator` - Expires widgets, blocks, pages and raw URLs
//! - `Dispatcher` - Fans a ban out to every live cache server
//! - `ServerRegistry` - Live cache-server set (`StaticRegistry`, `MemoryRegistry`)
//! - `BanTransport` - Delivers one ban to one server (`TcpBanTransport`)
//!
//! # Example
//!
//! ```ignore
//! use edge_cache::ExpireOptions;
//! use edge_purge::{Invalidator, StaticRegistry};
//!
//! let registry = StaticRegistry::from_config(&config.invalidation);
//! let invalidator = Invalidator::from_config(&config, registry)?;
//!
//! invalidator.expire(widget.as_ref(), &ExpireOptions::new()).await?;
//! invalidator.expire_url("http://site/news", Some(r"\.rss$")).await?;
//! ```

mod dispatcher;
mod error;
mod invalidator;
mod registry;
mod transport;

pub use dispatcher::*;
pub use error::*;
pub use invalidator::*;
pub use registry::*;
pub use transport::*;
