use tokio::sync::watch;
use tracing::info;

use crate::auth::{SessionContext, SessionState};
use crate::error::AdminError;
use crate::types::{RestaurantId, Scope};

/// How a live query derives its scope from the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopePolicy {
    /// One restaurant: the selector override (super-admins only), else the
    /// session's bound restaurant, else nothing
    Tenant,
    /// Platform-wide, super-admins only, and only while enabled
    Platform { enabled: bool },
}

/// Effective scope, or `None` while the session is still loading
pub fn resolve_scope(policy: ScopePolicy, session: &SessionState, selection: Option<&RestaurantId>) -> Option<Scope> {
    let principal = match session {
        SessionState::Unresolved | SessionState::Resolving => return None,
        SessionState::Unauthenticated => return Some(Scope::None),
        SessionState::Resolved(principal) => principal,
    };

    Some(match policy {
        ScopePolicy::Platform { enabled } if enabled && principal.is_super_admin() => Scope::Platform,
        ScopePolicy::Platform { .. } => Scope::None,
        ScopePolicy::Tenant if principal.is_super_admin() => selection.cloned().map(Scope::Restaurant).unwrap_or_default(),
        ScopePolicy::Tenant => principal.restaurant_id.clone().map(Scope::Restaurant).unwrap_or_default(),
    })
}

/// Explicit restaurant override used by super-admins to view one tenant.
///
/// Clones share the selection.
#[derive(Clone)]
pub struct RestaurantSelector {
    session: SessionContext,
    sender: watch::Sender<Option<RestaurantId>>,
}

impl RestaurantSelector {
    pub fn new(session: SessionContext) -> Self {
        let (sender, _) = watch::channel(None);
        Self { session, sender }
    }

    /// Select a restaurant from a picker value; blank clears the selection
    pub fn select(&self, value: Option<&str>) -> Result<(), AdminError> {
        let is_super_admin = self
            .session
            .current()
            .principal()
            .map(|p| p.is_super_admin())
            .unwrap_or(false);
        if !is_super_admin {
            return Err(AdminError::forbidden("Only super admins can switch restaurants"));
        }

        let selection = RestaurantId::from_selection(value);
        let changed = self.sender.send_if_modified(|current| {
            if *current == selection {
                false
            } else {
                *current = selection.clone();
                true
            }
        });
        if changed {
            info!(
                "Selected restaurant: {}",
                selection.as_ref().map(|r| r.as_str()).unwrap_or("<none>")
            );
        }
        Ok(())
    }

    pub fn clear(&self) -> Result<(), AdminError> {
        self.select(None)
    }

    pub fn current(&self) -> Option<RestaurantId> {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<RestaurantId>> {
        self.sender.subscribe()
    }
}
