//! Core abstractions for edge fragment caching.
//!
//! This crate provides the fundamental types and traits:
//! - `Widget` / `Page` traits - Content-model contracts
//! - `Block` / `SharedBlock` - Widget containers with shared-block aliasing
//! - `RenderContext` - The request being rendered
//! - `EdgeConfig` - ESI toggle, widget TTL, invalidation and logging settings

mod config;
mod content;
mod context;

pub use config::*;
pub use content::*;
pub use context::*;
