//! Configuration types and loading
//!
//! Settings are environment-driven with sensible defaults, loaded once at
//! startup and passed explicitly into the services that need them.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DepotConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Filesystem roots and public URL prefixes
    pub paths: PathsConfig,

    /// Image variant generation settings
    pub images: ImageConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Root directory for original file storage, partitioned by MIME category
    pub storage_root: PathBuf,
    /// Root directory for publicly servable generated variants
    pub static_root: PathBuf,
    /// Public URL prefix under which `static_root` is served
    pub static_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageConfig {
    /// Hard cap for a requested variant width
    pub resize_limit_width: u32,
    /// Hard cap for a requested variant height
    pub resize_limit_height: u32,
    /// Grid step requested sizes are snapped up to
    pub resize_step: u32,
    /// Seconds a generated variant may sit unused before the sweep removes it
    pub static_ttl_seconds: u64,
    /// External placeholder-image service used when a source file is missing
    pub placeholder_url: String,
}

impl Default for DepotConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            paths: PathsConfig {
                storage_root: PathBuf::from("/var/depot/storage"),
                static_root: PathBuf::from("/var/depot/static"),
                static_url: "/static".to_string(),
            },
            images: ImageConfig {
                resize_limit_width: 1200,
                resize_limit_height: 1200,
                resize_step: 50,
                static_ttl_seconds: 2_592_000, // 30 days
                placeholder_url: "http://placehold.it".to_string(),
            },
        }
    }
}

impl DepotConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            config.server.port = port.parse().unwrap_or(8080);
        }

        if let Ok(path) = std::env::var("DEPOT_STORAGE_ROOT") {
            config.paths.storage_root = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("DEPOT_STATIC_ROOT") {
            config.paths.static_root = PathBuf::from(path);
        }
        if let Ok(url) = std::env::var("DEPOT_STATIC_URL") {
            config.paths.static_url = url;
        }

        if let Ok(v) = std::env::var("DEPOT_RESIZE_LIMIT_WIDTH") {
            config.images.resize_limit_width = v.parse().unwrap_or(1200);
        }
        if let Ok(v) = std::env::var("DEPOT_RESIZE_LIMIT_HEIGHT") {
            config.images.resize_limit_height = v.parse().unwrap_or(1200);
        }
        if let Ok(v) = std::env::var("DEPOT_RESIZE_STEP") {
            config.images.resize_step = v.parse().unwrap_or(50);
        }
        if let Ok(v) = std::env::var("DEPOT_STATIC_TTL") {
            config.images.static_ttl_seconds = v.parse().unwrap_or(2_592_000);
        }
        if let Ok(url) = std::env::var("DEPOT_PLACEHOLDER_URL") {
            config.images.placeholder_url = url;
        }

        config
    }

    /// Get the server address
    pub fn server_addr(&self) -> std::net::SocketAddr {
        use std::net::SocketAddr;
        let ip: std::net::IpAddr = self.server.host.parse().unwrap_or([0, 0, 0, 0].into());
        SocketAddr::new(ip, self.server.port)
    }
}
