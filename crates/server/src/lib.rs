//! Embedding Service - HTTP API for sentence embeddings
//!
//! This crate wraps one loaded sentence-embedding model in a small
//! authenticated HTTP API:
//!
//! - **Embedding**: single text and ordered batches, unit-length vectors
//! - **Authentication**: shared secret in the `X-API-Key` header, with a
//!   development-only bypass
//! - **Hosting**: the same router runs as a local listener or as a web
//!   endpoint inside a managed serverless platform
//!
//! # API Endpoints
//!
//! ## Public Endpoints (No Authentication)
//!
//! - `GET /` - API information
//! - `GET /health` - Status, model name, environment
//!
//! ## Protected Endpoints (API Key Required)
//!
//! - `POST /embed` - `{"text": "..."}` → `{"embedding": [...]}`
//! - `POST /embed_batch` - `{"texts": [...]}` → `{"embeddings": [[...], ...]}`
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::deploy::{run, Invocation};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     run(Invocation::Local).await
//! }
//! ```

pub mod auth;
pub mod config;
pub mod deploy;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use auth::{AuthGrant, AuthRejection, Authenticator};
pub use config::{EnvironmentMode, HostMode, ServiceConfig};
pub use error::{ServerError, ServerResult};
pub use server::{build_app, build_router};
pub use state::ServerState;
