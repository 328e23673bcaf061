use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub job: JobConfig,
    #[serde(default)]
    pub compositor: CompositorConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Image fetcher configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetcherConfig {
    /// Number of downloads in flight per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Per-request timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
    /// User agent sent with every image request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            timeout_secs: default_fetch_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_batch_size() -> usize {
    crate::fetcher::DEFAULT_BATCH_SIZE
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("proxysheet/{}", env!("CARGO_PKG_VERSION"))
}

/// Image cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// How long a downloaded image stays cached, in seconds.
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
    /// How often expired entries are evicted, in seconds.
    #[serde(default = "default_prune_interval")]
    pub prune_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_secs: default_cache_ttl(),
            prune_interval_secs: default_prune_interval(),
        }
    }
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    3600 // 1 hour
}

fn default_prune_interval() -> u64 {
    60
}

/// Print job configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobConfig {
    /// Cards per printed page.
    #[serde(default = "default_page_capacity")]
    pub page_capacity: usize,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            page_capacity: default_page_capacity(),
        }
    }
}

fn default_page_capacity() -> usize {
    crate::job::DEFAULT_PAGE_CAPACITY
}

/// External sheet compositor configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CompositorConfig {
    /// Compositor executable. Print jobs fail at composition when unset.
    #[serde(default)]
    pub program: Option<PathBuf>,
    /// Extra arguments placed before the manifest path.
    #[serde(default)]
    pub args: Vec<String>,
    /// Parent directory for per-build work directories.
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
}

/// Sanitized config for API responses
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub fetcher: FetcherConfig,
    pub cache: CacheConfig,
    pub job: JobConfig,
    pub compositor: SanitizedCompositorConfig,
}

/// Compositor config without local filesystem paths
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCompositorConfig {
    pub configured: bool,
    pub program_name: Option<String>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            fetcher: config.fetcher.clone(),
            cache: config.cache.clone(),
            job: config.job.clone(),
            compositor: SanitizedCompositorConfig {
                configured: config.compositor.program.is_some(),
                program_name: config
                    .compositor
                    .program
                    .as_ref()
                    .and_then(|p| p.file_name())
                    .map(|n| n.to_string_lossy().to_string()),
            },
        }
    }
}
