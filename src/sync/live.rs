use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info};

use super::realtime::RealtimeChannel;
use super::scope::{resolve_scope, RestaurantSelector, ScopePolicy};
use crate::auth::{SessionContext, SessionState};
use crate::database::{DataStore, DatabaseError};
use crate::error::AdminError;
use crate::types::{RestaurantId, Scope, Table};

/// Published state of a live query
#[derive(Debug, Clone)]
pub struct HookState<T> {
    pub data: T,
    pub loading: bool,
    pub error: Option<String>,
    /// Scope `data` was read for
    pub scope: Scope,
}

impl<T: Default> Default for HookState<T> {
    fn default() -> Self {
        Self {
            data: T::default(),
            loading: true,
            error: None,
            scope: Scope::None,
        }
    }
}

/// The read behind a live query
#[async_trait]
pub trait Loader: Send + Sync + 'static {
    type Output: Clone + Default + Send + Sync + 'static;

    fn name(&self) -> &'static str;

    /// Tables whose changes make the result stale; one channel each
    fn tables(&self) -> &'static [Table];

    fn policy(&self) -> ScopePolicy;

    /// Full read for `scope`; never called with `Scope::None`
    async fn load(&self, store: &dyn DataStore, scope: &Scope) -> Result<Self::Output, DatabaseError>;
}

/// Everything a live query needs from its surroundings
#[derive(Clone)]
pub struct LiveDeps {
    pub store: Arc<dyn DataStore>,
    pub session: SessionContext,
    pub selector: Option<RestaurantSelector>,
    pub debounce: Duration,
}

struct Shared<L: Loader> {
    loader: L,
    deps: LiveDeps,
    state: watch::Sender<HookState<L::Output>>,
}

impl<L: Loader> Shared<L> {
    fn effective_scope(&self) -> Option<Scope> {
        let selection = self.deps.selector.as_ref().and_then(|s| s.current());
        resolve_scope(self.loader.policy(), &self.deps.session.current(), selection.as_ref())
    }

    /// Full re-read for `scope`; the result is dropped if the query has
    /// moved to another scope in the meantime
    async fn reload(&self, scope: &Scope) {
        if scope.is_none() {
            self.state.send_if_modified(|state| {
                if state.scope.is_none() && state.loading {
                    state.loading = false;
                    true
                } else {
                    false
                }
            });
            return;
        }

        debug!("{}: reloading for {}", self.loader.name(), scope);
        let result = self.loader.load(self.deps.store.as_ref(), scope).await;
        if let Err(e) = &result {
            error!("{}: read for {} failed: {}", self.loader.name(), scope, e);
        }

        let name = self.loader.name();
        self.state.send_if_modified(move |state| {
            if state.scope != *scope {
                debug!("{}: discarding read for {} (now {})", name, scope, state.scope);
                return false;
            }
            match result {
                Ok(data) => {
                    state.data = data;
                    state.error = None;
                }
                // Keep the last good data
                Err(e) => state.error = Some(e.to_string()),
            }
            state.loading = false;
            true
        });
    }

    /// Switch to `scope`: empty data, loading unless there is nothing to read
    fn enter_scope(&self, scope: &Scope) {
        info!("{}: scope -> {}", self.loader.name(), scope);
        self.state.send_replace(HookState {
            data: L::Output::default(),
            loading: !scope.is_none(),
            error: None,
            scope: scope.clone(),
        });
    }

    fn enter_loading(&self) {
        self.state.send_if_modified(|state| {
            if state.loading && state.scope.is_none() {
                return false;
            }
            *state = HookState::default();
            true
        });
    }
}

/// A scoped, self-refreshing read.
///
/// A driver task follows the session and the restaurant selection. On
/// every scope change it closes the previous realtime channels, clears the
/// data, opens one channel per watched table for the new scope and reads.
/// Change signals from any of them trigger full re-reads. Dropping the query
/// stops the driver and releases the channels.
pub struct LiveQuery<L: Loader> {
    shared: Arc<Shared<L>>,
    state: watch::Receiver<HookState<L::Output>>,
    driver: JoinHandle<()>,
}

impl<L: Loader> LiveQuery<L> {
    pub fn spawn(loader: L, deps: LiveDeps) -> Self {
        let (tx, rx) = watch::channel(HookState::default());
        let shared = Arc::new(Shared { loader, deps, state: tx });
        let driver = tokio::spawn(drive(Arc::clone(&shared)));
        Self { shared, state: rx, driver }
    }

    pub fn state(&self) -> HookState<L::Output> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<HookState<L::Output>> {
        self.state.clone()
    }

    pub fn data(&self) -> L::Output {
        self.state.borrow().data.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn scope(&self) -> Scope {
        self.state.borrow().scope.clone()
    }

    /// Wait for the first settled state
    pub async fn loaded(&self) -> HookState<L::Output> {
        let mut rx = self.state.clone();
        let settled = rx.wait_for(|state| !state.loading).await.map(|s| s.clone());
        settled.unwrap_or_else(|_| self.state())
    }

    /// Re-run the read for the current effective scope
    pub async fn reload(&self) {
        if let Some(scope) = self.shared.effective_scope() {
            self.shared.reload(&scope).await;
        }
    }

    fn require_session(&self) -> Result<(), AdminError> {
        match self.shared.deps.session.current() {
            SessionState::Unauthenticated => Err(AdminError::Unauthenticated),
            _ => Ok(()),
        }
    }

    /// Restaurant a write must target, checked before any store call
    pub fn require_restaurant(&self, action: &str) -> Result<RestaurantId, AdminError> {
        self.require_session()?;
        match self.shared.effective_scope() {
            Some(Scope::Restaurant(id)) => Ok(id),
            _ => Err(AdminError::unscoped(action)),
        }
    }

    /// Platform-wide writes require a resolved super-admin
    pub fn require_platform(&self, action: &str) -> Result<(), AdminError> {
        self.require_session()?;
        match self.shared.effective_scope() {
            Some(Scope::Platform) => Ok(()),
            _ => Err(AdminError::forbidden(format!("Only super admins can {}", action))),
        }
    }

    pub fn store(&self) -> &dyn DataStore {
        self.shared.deps.store.as_ref()
    }

    pub fn loader(&self) -> &L {
        &self.shared.loader
    }
}

impl<L: Loader> Drop for LiveQuery<L> {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

async fn changed_or_pending<T>(rx: &mut watch::Receiver<T>) {
    if rx.changed().await.is_err() {
        pending::<()>().await;
    }
}

async fn drive<L: Loader>(shared: Arc<Shared<L>>) {
    let mut session = shared.deps.session.subscribe();
    let mut selection = shared.deps.selector.as_ref().map(|s| s.subscribe());
    let (stale_tx, mut stale_rx) = mpsc::channel::<String>(8);
    let mut channels: Vec<RealtimeChannel> = Vec::new();
    let mut current: Option<Scope> = None;
    let mut reloads = JoinSet::new();

    loop {
        let session_state = session.borrow_and_update().clone();
        let selected = selection.as_mut().and_then(|rx| rx.borrow_and_update().clone());
        let next = resolve_scope(shared.loader.policy(), &session_state, selected.as_ref());

        if next != current {
            for previous in channels.drain(..) {
                previous.close().await;
            }
            match &next {
                None => shared.enter_loading(),
                Some(scope) => {
                    shared.enter_scope(scope);
                    if !scope.is_none() {
                        for &table in shared.loader.tables() {
                            match RealtimeChannel::open(
                                shared.deps.store.as_ref(),
                                table,
                                scope,
                                shared.deps.debounce,
                                stale_tx.clone(),
                            )
                            .await
                            {
                                Ok(opened) => channels.push(opened),
                                Err(e) => {
                                    error!("{}: realtime channel {} for {} failed: {}", shared.loader.name(), table, scope, e);
                                    let message = e.to_string();
                                    shared.state.send_modify(|state| state.error = Some(message));
                                }
                            }
                        }
                        let task_shared = Arc::clone(&shared);
                        let task_scope = scope.clone();
                        reloads.spawn(async move { task_shared.reload(&task_scope).await });
                    }
                }
            }
            current = next;
        }

        tokio::select! {
            _ = changed_or_pending(&mut session) => {}
            _ = async {
                match selection.as_mut() {
                    Some(rx) => changed_or_pending(rx).await,
                    None => pending::<()>().await,
                }
            } => {}
            Some(key) = stale_rx.recv() => {
                let live = channels.iter().any(|c| c.key() == key);
                if let (true, Some(scope)) = (live, current.clone()) {
                    let task_shared = Arc::clone(&shared);
                    reloads.spawn(async move { task_shared.reload(&scope).await });
                } else {
                    debug!("{}: ignoring stale signal from closed channel {}", shared.loader.name(), key);
                }
            }
            Some(_) = reloads.join_next(), if !reloads.is_empty() => {}
        }
    }
}
