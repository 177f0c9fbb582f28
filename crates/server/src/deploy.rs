//! Bootstrap and hosting.
//!
//! The process runs in exactly one of two ways, chosen once at startup:
//!
//! - **Local**: started with the `local` argument on a workstation. Forces
//!   development mode and listens on `0.0.0.0:8000`.
//! - **Managed**: started by the serverless platform, which provides the GPU,
//!   injects `EMBEDDING_API_KEY` from its secret store, mounts the model cache
//!   volume at `/model_cache`, and forwards HTTP traffic to the container port.
//!   The platform side is declared in [`DEPLOY_DESCRIPTOR`]: a `gpu="any"`
//!   web server built with `--features cuda`, the `embedding-model-cache`
//!   volume, and the `embedding-api-key` secret.
//!
//! Both paths build the same application through [`build_app`]; a [`Host`]
//! only decides how that application is exposed.

use crate::config::{ApiKeySource, HostMode, ServiceConfig};
use crate::server::{build_app, init_tracing, serve};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Environment variable the managed platform sets inside every container.
pub const PLATFORM_MARKER_ENV: &str = "MODAL_TASK_ID";

/// Platform descriptor, relative to the workspace root.
pub const DEPLOY_DESCRIPTOR: &str = "deploy/modal_app.py";

/// Printed when the binary is run without anything to serve.
pub const DEPLOY_INSTRUCTIONS: &str = "\
Deploy with: modal deploy deploy/modal_app.py
  (GPU container, `embedding-model-cache` volume at /model_cache, `embedding-api-key` secret)
Run locally with: embedding-service local";

/// How this process was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    Local,
    Managed,
    /// Print deployment instructions and exit.
    Instructions,
}

impl Invocation {
    /// A lone `local` always wins; with no arguments, serve only when the
    /// platform started us. Anything else gets the instructions.
    pub fn select<S: AsRef<str>>(args: &[S], platform_detected: bool) -> Self {
        match args {
            [only] if only.as_ref() == "local" => Invocation::Local,
            [] if platform_detected => Invocation::Managed,
            _ => Invocation::Instructions,
        }
    }

    pub fn from_process<S: AsRef<str>>(args: &[S]) -> Self {
        Self::select(args, std::env::var_os(PLATFORM_MARKER_ENV).is_some())
    }
}

/// Something that can expose the application to clients.
pub trait Host {
    fn name(&self) -> &'static str;

    fn serve(self, app: Router) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Listener on the developer's machine.
#[derive(Debug, Clone)]
pub struct LocalHost {
    addr: SocketAddr,
}

impl LocalHost {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }
}

impl Host for LocalHost {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn serve(self, app: Router) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        tracing::info!(addr = %self.addr, "Starting local development server");
        serve(listener, app).await
    }
}

/// Web endpoint inside the managed platform's container. The platform owns
/// TLS, routing, and scaling; we only answer on the forwarded port.
#[derive(Debug, Clone)]
pub struct ManagedHost {
    addr: SocketAddr,
}

impl ManagedHost {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }
}

impl Host for ManagedHost {
    fn name(&self) -> &'static str {
        "managed"
    }

    async fn serve(self, app: Router) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        tracing::info!(
            addr = %self.addr,
            task = %std::env::var(PLATFORM_MARKER_ENV).unwrap_or_default(),
            "Serving as managed web endpoint"
        );
        serve(listener, app).await
    }
}

/// Run the process for `invocation`. Returns once the server shuts down.
pub async fn run(invocation: Invocation) -> anyhow::Result<()> {
    match invocation {
        Invocation::Instructions => {
            println!("{DEPLOY_INSTRUCTIONS}");
            Ok(())
        }
        Invocation::Local => {
            let config = ServiceConfig::load(HostMode::Local)?;
            init_tracing(&config.log_level, false);
            let host = LocalHost::new(config.socket_addr()?);
            launch(config, host).await
        }
        Invocation::Managed => {
            let config = ServiceConfig::load(HostMode::Managed)?;
            init_tracing(&config.log_level, true);
            let host = ManagedHost::new(config.socket_addr()?);
            launch(config, host).await
        }
    }
}

/// Load the model, build the app, and hand it to `host`.
///
/// The model is loaded before the listener binds; a load failure aborts
/// startup instead of serving without a model.
pub async fn launch<H: Host>(config: ServiceConfig, host: H) -> anyhow::Result<()> {
    if config.api_key_source == ApiKeySource::Default {
        tracing::warn!("No API key set. Using default development key.");
        tracing::warn!("Set the EMBEDDING_API_KEY environment variable to use a custom key.");
    }
    if config.auth_bypass_active() {
        tracing::warn!("API key authentication is DISABLED (development mode)");
    }

    tracing::info!(
        host = host.name(),
        environment = %config.environment,
        cache_dir = %config.model.cache_dir.display(),
        "Loading embedding model"
    );
    let embedder = semantic::load_embedder(&config.model).await?;
    tracing::info!(
        model = embedder.model_name(),
        dimension = embedder.dimension(),
        "Model ready"
    );
    tracing::info!(
        "Timeout: {}s, Max body: {}MB, CORS: {}",
        config.timeout_secs,
        config.max_body_size_mb,
        config.enable_cors
    );

    let app = build_app(config, embedder);
    host.serve(app).await
}
