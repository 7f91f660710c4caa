use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use super::session::{SessionContext, SessionState};

/// Where non-qualifying sessions are sent
pub const FALLBACK_PATH: &str = "/dashboard";

/// Navigation seam owned by the front end
pub trait Navigator: Send + Sync {
    fn redirect(&self, path: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardStatus {
    /// Session still loading; show nothing
    Pending,
    Allowed,
    Denied,
}

/// Gate for super-admin-only views.
///
/// A resolved non-super-admin session is redirected once; further
/// evaluations (and clones of the guard) never redirect again. An
/// unauthenticated session is denied without redirecting.
#[derive(Clone)]
pub struct AdminGuard {
    session: SessionContext,
    navigator: Arc<dyn Navigator>,
    redirected: Arc<AtomicBool>,
}

impl AdminGuard {
    pub fn new(session: SessionContext, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            session,
            navigator,
            redirected: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn evaluate(&self) -> GuardStatus {
        match self.session.current() {
            SessionState::Unresolved | SessionState::Resolving => GuardStatus::Pending,
            SessionState::Unauthenticated => GuardStatus::Denied,
            SessionState::Resolved(principal) if principal.is_super_admin() => GuardStatus::Allowed,
            SessionState::Resolved(principal) => {
                if !self.redirected.swap(true, Ordering::SeqCst) {
                    info!("Principal {} is not a super admin; redirecting to {}", principal.id, FALLBACK_PATH);
                    self.navigator.redirect(FALLBACK_PATH);
                }
                GuardStatus::Denied
            }
        }
    }

    /// Evaluate once the session has settled
    pub async fn wait(&self) -> GuardStatus {
        self.session.settled().await;
        self.evaluate()
    }

    pub fn is_loading(&self) -> bool {
        self.session.current().is_loading()
    }

    pub fn is_ready(&self) -> bool {
        let state = self.session.current();
        !state.is_loading() && state.principal().map(|p| p.is_super_admin()).unwrap_or(false)
    }
}
