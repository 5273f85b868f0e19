//! CLI commands and handlers

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use super::http::{router, AppState};
use crate::config::ServiceConfig;
use crate::domain::aggregation::AggregationService;
use crate::infrastructure::cache::InMemorySeriesCache;
use crate::infrastructure::fetcher::{FetchPolicy, SeriesFetcher};
use crate::infrastructure::session::SessionManager;
use crate::infrastructure::upstream::{Registration, StockExchangeClient, DEFAULT_BASE_URL};

#[derive(Parser, Debug)]
#[command(name = "stockscope")]
#[command(version, about = "Stock price aggregation and correlation service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API
    Serve(ServeArgs),

    /// Register with the stock exchange provider and print the issued credentials
    Register(RegisterArgs),
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Path to a TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    pub bind: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Provider base URL
    #[arg(long)]
    pub upstream_url: Option<String>,

    /// Seconds a fetched series stays cached
    #[arg(long)]
    pub cache_ttl_secs: Option<u64>,

    /// Upper bound on a provider round trip, in milliseconds
    #[arg(long)]
    pub upstream_timeout_ms: Option<u64>,
}

impl ServeArgs {
    /// Flags take precedence over file and environment settings.
    pub fn apply(&self, mut cfg: ServiceConfig) -> ServiceConfig {
        if let Some(bind) = &self.bind {
            cfg.server.bind = bind.clone();
        }
        if let Some(port) = self.port {
            cfg.server.port = port;
        }
        if let Some(url) = &self.upstream_url {
            cfg.upstream.base_url = url.clone();
        }
        if let Some(ttl) = self.cache_ttl_secs {
            cfg.cache.ttl_secs = ttl;
        }
        if let Some(ms) = self.upstream_timeout_ms {
            cfg.upstream.timeout_ms = ms;
        }
        cfg
    }
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    #[arg(long)]
    pub email: String,

    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub mobile_no: String,

    #[arg(long)]
    pub github_username: String,

    #[arg(long)]
    pub roll_no: String,

    #[arg(long)]
    pub college_name: String,

    #[arg(long)]
    pub access_code: String,

    /// Provider base URL
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub upstream_url: String,
}

impl From<&RegisterArgs> for Registration {
    fn from(args: &RegisterArgs) -> Self {
        Self {
            email: args.email.clone(),
            name: args.name.clone(),
            mobile_no: args.mobile_no.clone(),
            github_username: args.github_username.clone(),
            roll_no: args.roll_no.clone(),
            college_name: args.college_name.clone(),
            access_code: args.access_code.clone(),
        }
    }
}

pub struct CommandExecutor;

impl CommandExecutor {
    /// Execute the selected command
    pub async fn execute(cli: Cli) -> Result<()> {
        match cli.command {
            Commands::Serve(args) => Self::execute_serve_command(args).await,
            Commands::Register(args) => Self::execute_register_command(args).await,
        }
    }

    async fn execute_serve_command(args: ServeArgs) -> Result<()> {
        let cfg = args.apply(ServiceConfig::load(args.config.as_deref())?);
        let addr = cfg.bind_addr()?;
        info!("Configuration: {:?}", cfg);

        let client = Arc::new(
            StockExchangeClient::new(&cfg.upstream.base_url, cfg.upstream_timeout())
                .context("build provider client")?,
        );
        let session = Arc::new(SessionManager::new(
            client.clone(),
            cfg.credentials.clone(),
            cfg.upstream_timeout(),
        ));

        let cache = Arc::new(InMemorySeriesCache::new());
        let sweeper = cfg
            .sweep_interval()
            .map(|interval| Arc::clone(&cache).spawn_sweeper(interval));

        let policy = FetchPolicy {
            cache_ttl: cfg.cache_ttl(),
            upstream_timeout: cfg.upstream_timeout(),
        };
        let fetcher = Arc::new(SeriesFetcher::new(session, cache, client.clone(), policy));
        let app = router(AppState::new(AggregationService::new(fetcher)));

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("bind {addr}"))?;
        info!(
            "Stock analysis service listening on http://{} (provider {}, cache ttl {:?})",
            addr,
            client.base_url(),
            cfg.cache_ttl()
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("http server")?;

        if let Some(sweeper) = sweeper {
            sweeper.abort();
        }
        info!("Stock analysis service stopped");
        Ok(())
    }

    async fn execute_register_command(args: RegisterArgs) -> Result<()> {
        let client = StockExchangeClient::new(&args.upstream_url, std::time::Duration::from_secs(30))
            .context("build provider client")?;

        info!("Registering {} with {}", args.email, client.base_url());
        let credentials = client
            .register(&Registration::from(&args))
            .await
            .context("registration failed")?;

        println!("===== Registration Successful! =====");
        println!("IMPORTANT: Save these credentials. You will NOT be able to retrieve them again!");
        println!("{}", serde_json::to_string_pretty(&credentials)?);
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
