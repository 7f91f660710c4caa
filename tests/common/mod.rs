#![allow(dead_code)]

use std::future::Future;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use restaurant_admin::auth::{generate_access_token, AuthProvider, Navigator, RoleResolver, SessionContext, TokenAuth};
use restaurant_admin::backend::BackendClient;
use restaurant_admin::config::{AppConfig, ReviewVariant};
use restaurant_admin::database::MemoryStore;
use restaurant_admin::sync::HookState;
use restaurant_admin::types::Table;
use restaurant_admin::AdminContext;

pub const SECRET: &str = "integration-test-secret";
pub const WAIT: Duration = Duration::from_secs(3);
pub const DEBOUNCE_MS: u64 = 10;

pub const SUPER_ADMIN: &str = "u-super";
pub const R1_ADMIN: &str = "u-r1";
pub const R2_ADMIN: &str = "u-r2";
/// Signed in, but has no row in the role-mapping table
pub const UNMAPPED: &str = "u-ghost";

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn test_config(backend_url: &str, review_variant: ReviewVariant) -> AppConfig {
    let mut config = AppConfig::development();
    config.api.base_url = backend_url.to_string();
    config.api.request_timeout_secs = 5;
    config.auth.jwt_secret = SECRET.to_string();
    config.realtime.debounce_ms = DEBOUNCE_MS;
    config.orders.review_variant = review_variant;
    config
}

pub fn mint_token(principal_id: &str) -> Result<String> {
    Ok(generate_access_token(principal_id, chrono::Duration::hours(1), SECRET)?)
}

/// Two restaurants with their admins, menus and orders
pub fn seed_platform(store: &MemoryStore) {
    store.seed(
        Table::Restaurants,
        json!({ "id": "r1", "name": "Mama's Kitchen", "description": null, "phone": "+233200000001", "email": null,
                "momo_number": "0240000001", "momo_name": "Mama K", "is_active": true,
                "subscription_status": "ACTIVE", "trial_ends_at": null, "created_at": "2024-01-01T08:00:00Z" }),
    );
    store.seed(
        Table::Restaurants,
        json!({ "id": "r2", "name": "Chop Bar", "description": null, "phone": "+233200000002", "email": null,
                "momo_number": "0240000002", "momo_name": "Chop Bar", "is_active": true,
                "subscription_status": "TRIAL", "trial_ends_at": "2024-03-01T00:00:00Z", "created_at": "2024-01-02T08:00:00Z" }),
    );
    store.seed(
        Table::Restaurants,
        json!({ "id": "r3", "name": "Closed Cafe", "description": null, "phone": "+233200000003", "email": null,
                "momo_number": "0240000003", "momo_name": "Closed", "is_active": false,
                "subscription_status": "CANCELLED", "trial_ends_at": null, "created_at": "2024-01-03T08:00:00Z" }),
    );

    for (id, name, role, restaurant, created) in [
        (SUPER_ADMIN, "Root", "SUPER_ADMIN", None, "2024-01-01T00:00:00Z"),
        (R1_ADMIN, "Ama", "RESTAURANT_ADMIN", Some("r1"), "2024-01-01T09:00:00Z"),
        (R2_ADMIN, "Kojo", "RESTAURANT_ADMIN", Some("r2"), "2024-01-02T09:00:00Z"),
    ] {
        store.seed(
            Table::Users,
            json!({ "id": id, "email": format!("{}@example.com", id), "phone": null, "name": name, "role": role,
                    "restaurant_id": restaurant, "is_active": true, "created_at": created }),
        );
    }

    for (id, name, sort_order, restaurant) in [
        ("c1", "Mains", 1, "r1"),
        ("c2", "Sides", 2, "r1"),
        ("c3", "Soups", 1, "r2"),
        ("c4", "Desserts", 5, "r2"),
    ] {
        store.seed(
            Table::MenuCategories,
            json!({ "id": id, "name": name, "description": null, "sort_order": sort_order, "is_active": true,
                    "restaurant_id": restaurant, "created_at": "2024-01-05T00:00:00Z" }),
        );
    }

    for (id, name, price, category) in [
        ("i1", "Jollof Rice", "35.00", "c1"),
        ("i2", "Fried Plantain", "10.00", "c2"),
        ("i3", "Light Soup", "40.00", "c3"),
    ] {
        store.seed(
            Table::MenuItems,
            json!({ "id": id, "name": name, "description": null, "price": price, "category_id": category,
                    "image_url": null, "is_available": true, "sort_order": 1, "created_at": "2024-01-06T00:00:00Z" }),
        );
    }

    store.seed(Table::Customers, json!({ "id": "cu1", "name": "Efua", "phone": "+233501110000" }));
    store.seed(Table::Customers, json!({ "id": "cu2", "name": null, "phone": "+233502220000" }));

    for (id, number, customer, restaurant, total, status, payment, created) in [
        ("o1", "ORD-001", "cu1", "r1", "45.00", "PENDING", "PENDING_VERIFICATION", "2024-02-01T10:00:00Z"),
        ("o2", "ORD-002", "cu2", "r1", "35.00", "PREPARING", "VERIFIED", "2024-02-01T11:00:00Z"),
        ("o3", "ORD-003", "cu1", "r1", "70.00", "COMPLETED", "VERIFIED", "2024-02-01T12:00:00Z"),
        ("o4", "ORD-004", "cu2", "r2", "40.00", "PENDING", "UNPAID", "2024-02-01T13:00:00Z"),
    ] {
        store.seed(
            Table::Orders,
            json!({ "id": id, "order_number": number, "customer_id": customer, "restaurant_id": restaurant,
                    "total_amount": total, "status": status, "payment_status": payment,
                    "delivery_address": "Osu, Accra", "customer_notes": null, "created_at": created }),
        );
    }
    store.seed(
        Table::OrderItems,
        json!({ "id": "oi1", "order_id": "o1", "item_name": "Jollof Rice", "item_price": "35.00", "quantity": 1, "subtotal": "35.00" }),
    );
    store.seed(
        Table::OrderItems,
        json!({ "id": "oi2", "order_id": "o1", "item_name": "Fried Plantain", "item_price": "10.00", "quantity": 1, "subtotal": "10.00" }),
    );
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

type RequestHook = Arc<dyn Fn(&RecordedRequest) + Send + Sync>;

#[derive(Clone, Default)]
struct MockState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    response: Arc<Mutex<(u16, Value)>>,
    hook: Arc<Mutex<Option<RequestHook>>>,
}

/// Stand-in for the backend API on a free local port
pub struct MockBackend {
    pub base_url: String,
    state: MockState,
    server: JoinHandle<()>,
}

impl MockBackend {
    pub async fn start() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;

        let state = MockState::default();
        *state.response.lock().unwrap() = (200, json!({ "success": true }));
        let app = Router::new().fallback(record).with_state(state.clone());
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            base_url: format!("http://127.0.0.1:{}/api", port),
            state,
            server,
        })
    }

    pub fn respond_with(&self, status: u16, body: Value) {
        *self.state.response.lock().unwrap() = (status, body);
    }

    /// Run `hook` for every request before answering; used to apply the
    /// backend's own writes to the store
    pub fn on_request(&self, hook: impl Fn(&RecordedRequest) + Send + Sync + 'static) {
        *self.state.hook.lock().unwrap() = Some(Arc::new(hook));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn record(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let request = RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    };

    let hook = state.hook.lock().unwrap().clone();
    if let Some(hook) = hook {
        hook(&request);
    }
    state.requests.lock().unwrap().push(request);

    let (status, body) = state.response.lock().unwrap().clone();
    (StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR), Json(body))
}

#[derive(Default)]
pub struct RecordingNavigator {
    paths: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, path: &str) {
        self.paths.lock().unwrap().push(path.to_string());
    }
}

/// A signed-in admin context over a seeded `MemoryStore`
pub struct Harness {
    pub store: MemoryStore,
    pub auth: Arc<TokenAuth>,
    pub context: AdminContext,
    pub backend: MockBackend,
}

impl Harness {
    pub async fn start(principal_id: &str) -> Result<Self> {
        Self::start_with(principal_id, ReviewVariant::Payment).await
    }

    pub async fn start_with(principal_id: &str, review_variant: ReviewVariant) -> Result<Self> {
        init_tracing();
        let store = MemoryStore::new();
        seed_platform(&store);

        let backend = MockBackend::start().await?;
        let config = test_config(&backend.base_url, review_variant);

        let auth = Arc::new(TokenAuth::new(config.auth.clone()));
        auth.sign_in(&mint_token(principal_id)?)?;
        let provider: Arc<dyn AuthProvider> = auth.clone();
        let session = SessionContext::spawn(Arc::clone(&provider), RoleResolver::new(Arc::new(store.clone())));
        tokio::time::timeout(WAIT, session.settled())
            .await
            .context("session did not settle")?;

        let client = BackendClient::new(&config.api, provider)?;
        let context = AdminContext::new(Arc::new(store.clone()), session, client, config);
        Ok(Self {
            store,
            auth,
            context,
            backend,
        })
    }
}

/// Wait for a hook state matching `predicate`
pub async fn until<T>(
    mut rx: watch::Receiver<HookState<T>>,
    predicate: impl FnMut(&HookState<T>) -> bool,
) -> Result<HookState<T>>
where
    T: Clone,
{
    let state = tokio::time::timeout(WAIT, rx.wait_for(predicate))
        .await
        .context("timed out waiting for hook state")??
        .clone();
    Ok(state)
}

/// Poll `condition` until it holds
pub async fn eventually(mut condition: impl FnMut() -> bool) -> Result<()> {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .context("condition never held")
}

/// Let debounce windows and pending reloads run out
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(DEBOUNCE_MS * 8)).await;
}

pub async fn within<F: Future>(future: F) -> Result<F::Output> {
    tokio::time::timeout(WAIT, future).await.context("timed out")
}
