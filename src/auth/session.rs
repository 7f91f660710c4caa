use std::sync::Arc;

use serde_json::json;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{AuthProvider, AuthSession};
use crate::database::models::{Role, User};
use crate::database::{DataStore, Repository};
use crate::types::RestaurantId;

/// Resolved identity of the signed-in admin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub role: Role,
    pub restaurant_id: Option<RestaurantId>,
}

impl Principal {
    /// Safe default for principals without a usable role mapping: a
    /// restaurant admin bound to nothing, which can read and write nothing
    pub fn unmapped(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: Role::RestaurantAdmin,
            restaurant_id: None,
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }
}

/// Session lifecycle; scoped queries and guards act on `Resolved` only
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unresolved,
    Resolving,
    Resolved(Principal),
    Unauthenticated,
}

impl SessionState {
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Unresolved | SessionState::Resolving)
    }

    pub fn principal(&self) -> Option<&Principal> {
        match self {
            SessionState::Resolved(principal) => Some(principal),
            _ => None,
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.principal().map(|p| p.role)
    }
}

/// Reads role and restaurant binding from the role-mapping table
#[derive(Clone)]
pub struct RoleResolver {
    store: Arc<dyn DataStore>,
}

impl RoleResolver {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Never fails: a missing row or a failed query yields [`Principal::unmapped`]
    pub async fn resolve(&self, principal_id: &str) -> Principal {
        let repo = Repository::<User>::new(self.store.as_ref());
        let query = match repo.query().where_clause(json!({ "id": principal_id })) {
            Ok(query) => query,
            Err(e) => {
                warn!("Role lookup for {} could not be built: {}", principal_id, e);
                return Principal::unmapped(principal_id);
            }
        };

        match repo.select_one(query).await {
            Ok(Some(user)) => Principal {
                id: principal_id.to_string(),
                role: user.role,
                restaurant_id: user.bound_restaurant().cloned(),
            },
            Ok(None) => {
                warn!("No role mapping for principal {}; treating as unbound restaurant admin", principal_id);
                Principal::unmapped(principal_id)
            }
            Err(e) => {
                warn!("Role lookup for {} failed: {}; treating as unbound restaurant admin", principal_id, e);
                Principal::unmapped(principal_id)
            }
        }
    }
}

struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Injectable, observable session.
///
/// Clones share one resolver task; it stops when the last clone is dropped.
#[derive(Clone)]
pub struct SessionContext {
    state: watch::Receiver<SessionState>,
    _task: Option<Arc<AbortOnDrop>>,
}

impl SessionContext {
    /// Follow `auth` and resolve the role on every sign-in and token refresh
    pub fn spawn(auth: Arc<dyn AuthProvider>, resolver: RoleResolver) -> Self {
        let (tx, rx) = watch::channel(SessionState::Unresolved);
        let mut sessions = auth.watch();
        let task = tokio::spawn(async move {
            loop {
                let current: Option<AuthSession> = sessions.borrow_and_update().clone();
                match current {
                    None => {
                        tx.send_if_modified(|state| replace_if_changed(state, SessionState::Unauthenticated));
                    }
                    Some(session) => {
                        let same_principal = matches!(
                            &*tx.borrow(),
                            SessionState::Resolved(p) if p.id == session.principal_id
                        );
                        // A refresh for the same principal keeps serving the old scope until re-resolved
                        if !same_principal {
                            tx.send_replace(SessionState::Resolving);
                        }
                        let principal = resolver.resolve(&session.principal_id).await;
                        if matches!(sessions.has_changed(), Ok(true)) {
                            debug!("Session changed while resolving {}; resolving again", session.principal_id);
                            continue;
                        }
                        info!(
                            "Session resolved: {} as {} (restaurant {})",
                            principal.id,
                            principal.role,
                            principal.restaurant_id.as_ref().map(|r| r.as_str()).unwrap_or("-")
                        );
                        tx.send_if_modified(|state| replace_if_changed(state, SessionState::Resolved(principal)));
                    }
                }
                if sessions.changed().await.is_err() {
                    break;
                }
            }
        });

        Self {
            state: rx,
            _task: Some(Arc::new(AbortOnDrop(task))),
        }
    }

    /// Context pinned to a single state; for tools and tests with no auth client
    pub fn fixed(state: SessionState) -> Self {
        let (_, rx) = watch::channel(state);
        Self { state: rx, _task: None }
    }

    /// Context driven by hand through the returned sender
    pub fn manual(initial: SessionState) -> (watch::Sender<SessionState>, Self) {
        let (tx, rx) = watch::channel(initial);
        (tx, Self { state: rx, _task: None })
    }

    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Wait until the session has left the loading states
    pub async fn settled(&self) -> SessionState {
        let mut rx = self.state.clone();
        let settled = rx.wait_for(|state| !state.is_loading()).await.map(|s| s.clone());
        settled.unwrap_or_else(|_| self.current())
    }
}

fn replace_if_changed(state: &mut SessionState, next: SessionState) -> bool {
    if *state == next {
        false
    } else {
        *state = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::types::Table;

    #[tokio::test]
    async fn resolves_role_from_mapping_table() {
        let store = MemoryStore::new();
        store.seed(
            Table::Users,
            json!({ "id": "u1", "email": "ama@example.com", "phone": null, "name": "Ama",
                    "role": "RESTAURANT_ADMIN", "restaurant_id": "r2", "is_active": true,
                    "created_at": "2024-01-01T00:00:00Z" }),
        );
        let resolver = RoleResolver::new(Arc::new(store));

        let principal = resolver.resolve("u1").await;
        assert_eq!(principal.role, Role::RestaurantAdmin);
        assert_eq!(principal.restaurant_id, Some(RestaurantId::new("r2")));

        let unknown = resolver.resolve("nobody").await;
        assert_eq!(unknown, Principal::unmapped("nobody"));
    }

    #[tokio::test]
    async fn failed_lookup_falls_back_to_unbound_admin() {
        let store = MemoryStore::new();
        store.fail_reads(Some("timeout"));
        let principal = RoleResolver::new(Arc::new(store)).resolve("u1").await;
        assert_eq!(principal.role, Role::RestaurantAdmin);
        assert_eq!(principal.restaurant_id, None);
    }

    #[test]
    fn loading_states() {
        assert!(SessionState::Unresolved.is_loading());
        assert!(SessionState::Resolving.is_loading());
        assert!(!SessionState::Unauthenticated.is_loading());
        assert_eq!(SessionState::Unauthenticated.role(), None);
    }
}
