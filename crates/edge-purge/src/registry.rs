//! Cache-server registry.

use std::fmt;
use std::sync::{Arc, RwLock};

use edge_core::{InvalidationConfig, ServerConfig};
use serde::{Deserialize, Serialize};

/// A cache server reachable over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheServer {
    /// Host name or IP.
    pub host: String,
    /// Port.
    pub port: u16,
}

impl CacheServer {
    /// Create a server address.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `host:port` form used for connecting and as the fallback Host header.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for CacheServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl From<&ServerConfig> for CacheServer {
    fn from(config: &ServerConfig) -> Self {
        Self::new(config.host.clone(), config.port)
    }
}

/// Source of the currently live cache servers.
///
/// Liveness is maintained elsewhere; the dispatcher reads the live set once
/// per dispatch and never writes it.
pub trait ServerRegistry: Send + Sync {
    /// Servers currently considered live.
    fn live_servers(&self) -> Vec<CacheServer>;
}

impl<R: ServerRegistry + ?Sized> ServerRegistry for Arc<R> {
    fn live_servers(&self) -> Vec<CacheServer> {
        (**self).live_servers()
    }
}

/// A fixed server list, every entry always considered live.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    servers: Vec<CacheServer>,
}

impl StaticRegistry {
    /// Create from a server list.
    pub fn new(servers: Vec<CacheServer>) -> Self {
        Self { servers }
    }

    /// Create from the configured servers.
    pub fn from_config(config: &InvalidationConfig) -> Self {
        Self::new(config.servers.iter().map(CacheServer::from).collect())
    }
}

impl ServerRegistry for StaticRegistry {
    fn live_servers(&self) -> Vec<CacheServer> {
        self.servers.clone()
    }
}

#[derive(Debug, Clone)]
struct Entry {
    server: CacheServer,
    live: bool,
}

/// Registry whose live set is updated by an external liveness prober.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    entries: RwLock<Vec<Entry>>,
}

impl MemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a server (live) if it is not registered yet.
    pub fn register(&self, server: CacheServer) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if !entries.iter().any(|e| e.server == server) {
            entries.push(Entry { server, live: true });
        }
    }

    /// Remove a server. Returns whether it was registered.
    pub fn deregister(&self, server: &CacheServer) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|e| &e.server != server);
        entries.len() != before
    }

    /// Mark a registered server live. Returns whether it was registered.
    pub fn mark_live(&self, server: &CacheServer) -> bool {
        self.set_live(server, true)
    }

    /// Mark a registered server down. Returns whether it was registered.
    pub fn mark_down(&self, server: &CacheServer) -> bool {
        self.set_live(server, false)
    }

    /// Every registered server, live or not.
    pub fn all_servers(&self) -> Vec<CacheServer> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.iter().map(|e| e.server.clone()).collect()
    }

    fn set_live(&self, server: &CacheServer, live: bool) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        match entries.iter_mut().find(|e| &e.server == server) {
            Some(entry) => {
                entry.live = live;
                true
            }
            None => false,
        }
    }
}

impl ServerRegistry for MemoryRegistry {
    fn live_servers(&self) -> Vec<CacheServer> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .filter(|e| e.live)
            .map(|e| e.server.clone())
            .collect()
    }
}
