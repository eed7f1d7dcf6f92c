//! HTTP and realtime surface for Siteline.
//!
//! Exposes the sync endpoint, shift transitions, the operator conflict
//! queue, assignment grants, and the WebSocket event stream. Handlers
//! are stateless; everything stateful lives behind the services in
//! [`state::AppState`], wired once at startup.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

pub use config::ServerConfig;
pub use error::ApiError;
pub use server::SitelineServer;
pub use state::AppState;
