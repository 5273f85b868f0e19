//! Service configuration.
//!
//! Layers, lowest precedence first: built-in defaults, an optional TOML
//! file, environment variables, then command-line flags (applied by the
//! `serve` command).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;
use std::{env, fs, path::Path};

use crate::infrastructure::upstream::{ProviderCredentials, DEFAULT_BASE_URL};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerCfg {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerCfg {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UpstreamCfg {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for UpstreamCfg {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheCfg {
    pub ttl_secs: u64,
    /// 0 disables the background sweeper.
    pub sweep_interval_secs: u64,
}

impl Default for CacheCfg {
    fn default() -> Self {
        Self {
            ttl_secs: 60,
            sweep_interval_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerCfg,
    pub upstream: UpstreamCfg,
    pub cache: CacheCfg,
    pub credentials: ProviderCredentials,
}

impl ServiceConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: Self = toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
        Ok(cfg)
    }

    /// Defaults or `path`, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(base.with_env_overrides(|name| env::var(name).ok()))
    }

    /// Overlay variables resolved through `lookup`. Blank or unparsable
    /// values leave the current setting in place.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| {
            lookup(name)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let parsed = |name: &str| var(name).and_then(|s| s.parse::<u64>().ok());

        if let Some(bind) = var("BIND_ADDR") {
            self.server.bind = bind;
        }
        if let Some(port) = var("PORT").and_then(|s| s.parse::<u16>().ok()) {
            self.server.port = port;
        }
        if let Some(url) = var("UPSTREAM_BASE_URL") {
            self.upstream.base_url = url;
        }
        if let Some(ms) = parsed("UPSTREAM_TIMEOUT_MS") {
            self.upstream.timeout_ms = ms;
        }
        if let Some(secs) = parsed("CACHE_TTL_SECS") {
            self.cache.ttl_secs = secs;
        }
        if let Some(secs) = parsed("CACHE_SWEEP_SECS") {
            self.cache.sweep_interval_secs = secs;
        }

        let creds = &mut self.credentials;
        for (name, field) in [
            ("EMAIL", &mut creds.email),
            ("NAME", &mut creds.name),
            ("ROLL_NO", &mut creds.roll_no),
            ("ACCESS_CODE", &mut creds.access_code),
            ("CLIENT_ID", &mut creds.client_id),
            ("CLIENT_SECRET", &mut creds.client_secret),
        ] {
            if let Some(value) = var(name) {
                *field = value;
            }
        }

        self
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.bind, self.server.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.server.bind, self.server.port))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream.timeout_ms)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.cache.sweep_interval_secs > 0).then(|| Duration::from_secs(self.cache.sweep_interval_secs))
    }
}
