use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::router::build_router;
use crate::state::AppState;

/// The Siteline backend server.
pub struct SitelineServer {
    state: AppState,
}

impl SitelineServer {
    /// Build an in-memory server from configuration. Store seeding
    /// happens through the returned handles before `serve`.
    pub fn in_memory(config: ServerConfig) -> (Self, crate::state::InMemoryStores) {
        let (state, stores) = AppState::in_memory(config);
        (Self { state }, stores)
    }

    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router (useful for testing without a listener).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Start serving requests. Runs until the listener fails; the
    /// fanout is shut down on the way out so connection tasks end.
    pub async fn serve(self) -> anyhow::Result<()> {
        let bind_addr = self.state.config.bind_addr;
        let fanout = self.state.fanout.clone();
        let app = build_router(self.state);

        let listener = TcpListener::bind(bind_addr).await?;
        tracing::info!("siteline server listening on {bind_addr}");
        let result = axum::serve(listener, app).await;

        fanout.shutdown();
        result.map_err(Into::into)
    }
}
