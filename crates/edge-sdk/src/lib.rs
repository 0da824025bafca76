//! Public SDK for edge fragment caching and invalidation.
//!
//! This crate re-exports all functionality:
//!
//! ```ignore
//! use edge_sdk::prelude::*;
//!
//! let invalidator = edge_sdk::bootstrap("edge.toml")?;
//!
//! // rendering
//! let fragments = invalidator.multi_get(&page, &RenderContext::parse(url)?);
//!
//! // after a widget was edited
//! invalidator.expire(widget.as_ref(), &ExpireOptions::new()).await?;
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use edge_core::EdgeConfig;
use edge_purge::{Invalidator, StaticRegistry, TcpBanTransport};

pub use edge_cache;
pub use edge_core;
pub use edge_observability;
pub use edge_purge;

/// Invalidator over the statically configured cache servers.
pub type EdgeInvalidator = Invalidator<StaticRegistry, TcpBanTransport>;

/// Load config from `path`, initialize logging and build the invalidator.
pub fn bootstrap(path: impl AsRef<Path>) -> Result<EdgeInvalidator> {
    let config = EdgeConfig::load(path)?;
    from_config(&config)
}

/// Initialize logging and build the invalidator from a loaded config.
pub fn from_config(config: &EdgeConfig) -> Result<EdgeInvalidator> {
    edge_observability::init_logging(&config.logging).context("Failed to initialize logging")?;

    let registry = StaticRegistry::from_config(&config.invalidation);
    let invalidator = Invalidator::from_config(config, registry).context("Failed to build invalidator")?;

    tracing::info!(
        esi = config.esi.enabled,
        servers = config.invalidation.servers.len(),
        method = %config.invalidation.method,
        "edge cache ready"
    );
    Ok(invalidator)
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use edge_cache::*;
    pub use edge_core::*;
    pub use edge_observability::*;
    pub use edge_purge::*;

    pub use crate::EdgeInvalidator;
}
