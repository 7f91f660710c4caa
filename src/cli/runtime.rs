use std::env;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use tracing::debug;

use crate::auth::{AuthProvider, RoleResolver, SessionContext, SessionState, TokenAuth};
use crate::backend::BackendClient;
use crate::config::config;
use crate::context::AdminContext;
use crate::database::{DataStore, DatabaseManager, PgStore};

/// Environment variable holding the operator's access token
pub const ACCESS_TOKEN_VAR: &str = "ADMIN_ACCESS_TOKEN";

/// A signed-in admin context backed by Postgres
pub struct Runtime {
    pub context: AdminContext,
    pub auth: Arc<TokenAuth>,
}

impl Runtime {
    /// Connect, sign in with the token from the environment and wait for the
    /// role to resolve. `restaurant` seeds the super-admin selection.
    pub async fn connect(restaurant: Option<&str>) -> anyhow::Result<Self> {
        let config = config().clone();

        let pool = DatabaseManager::connect(&config.database).await?;
        let store: Arc<dyn DataStore> = Arc::new(
            PgStore::new(pool, config.realtime.feed_buffer).with_query_logging(config.database.enable_query_logging),
        );

        let token = env::var(ACCESS_TOKEN_VAR).with_context(|| format!("{} is not set", ACCESS_TOKEN_VAR))?;
        let auth = Arc::new(TokenAuth::new(config.auth.clone()));
        let signed_in = auth.sign_in(token.trim())?;
        debug!("Signed in as {} until {}", signed_in.principal_id, signed_in.expires_at);

        let provider: Arc<dyn AuthProvider> = auth.clone();
        let session = SessionContext::spawn(Arc::clone(&provider), RoleResolver::new(Arc::clone(&store)));
        if let SessionState::Unauthenticated = session.settled().await {
            return Err(anyhow!("Session is not authenticated"));
        }

        let backend = BackendClient::new(&config.api, provider)?;
        let context = AdminContext::new(store, session, backend, config);
        if let Some(restaurant) = restaurant {
            context.selector.select(Some(restaurant))?;
        }

        Ok(Self { context, auth })
    }
}
