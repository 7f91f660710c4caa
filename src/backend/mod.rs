use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::auth::AuthProvider;
use crate::config::ApiConfig;
use crate::database::models::{NewUser, RoleUpdate, StatusUpdate};
use crate::error::AdminError;

/// Client for the backend API that owns side-effecting mutations
/// (order transitions with customer notification, identity provisioning).
///
/// Every call reads a fresh bearer token from the auth provider.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: Url,
    auth: Arc<dyn AuthProvider>,
}

impl BackendClient {
    pub fn new(config: &ApiConfig, auth: Arc<dyn AuthProvider>) -> Result<Self, AdminError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| AdminError::validation(format!("Invalid backend URL {}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(AdminError::validation(format!("Invalid backend URL {}", config.base_url)));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self { http, base_url, auth })
    }

    /// `PATCH orders/{id}/status`
    pub async fn update_order_status(&self, order_id: &str, update: &StatusUpdate) -> Result<Value, AdminError> {
        self.send(Method::PATCH, &["orders", order_id, "status"], update).await
    }

    /// `POST admin/users`
    pub async fn create_user(&self, user: &NewUser) -> Result<Value, AdminError> {
        self.send(Method::POST, &["admin", "users"], user).await
    }

    /// `PATCH admin/users/{id}/role`
    pub async fn update_user_role(&self, user_id: &str, update: &RoleUpdate) -> Result<Value, AdminError> {
        self.send(Method::PATCH, &["admin", "users", user_id, "role"], update).await
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(&self, method: Method, segments: &[&str], body: &impl Serialize) -> Result<Value, AdminError> {
        let session = self.auth.session().ok_or(AdminError::Unauthenticated)?;
        let url = self.endpoint(segments);
        debug!("{} {}", method, url);

        let response = self
            .http
            .request(method.clone(), url.clone())
            .bearer_auth(&session.access_token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if status.is_success() {
            return Ok(if text.trim().is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&text).unwrap_or(Value::String(text))
            });
        }

        let message = error_message(status, &text);
        warn!("{} {} rejected with {}: {}", method, url, status.as_u16(), message);
        Err(AdminError::upstream(status.as_u16(), message))
    }
}

/// The payload's `error` string, else its `message`, else `HTTP {status}`
fn error_message(status: StatusCode, body: &str) -> String {
    let payload: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    ["error", "message"]
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenAuth;
    use crate::config::AuthConfig;

    fn client(base: &str) -> BackendClient {
        let config = ApiConfig {
            base_url: base.to_string(),
            request_timeout_secs: 5,
        };
        let auth = Arc::new(TokenAuth::new(AuthConfig {
            jwt_secret: "s".to_string(),
            leeway_secs: 0,
        }));
        BackendClient::new(&config, auth).unwrap()
    }

    #[test]
    fn endpoints_extend_base_path() {
        let with_prefix = client("http://localhost:4000/api/");
        assert_eq!(
            with_prefix.endpoint(&["orders", "o-1", "status"]).as_str(),
            "http://localhost:4000/api/orders/o-1/status"
        );
        let bare = client("http://localhost:4000");
        assert_eq!(bare.endpoint(&["admin", "users"]).as_str(), "http://localhost:4000/admin/users");
    }

    #[test]
    fn ids_are_percent_encoded() {
        let c = client("http://localhost:4000");
        assert_eq!(
            c.endpoint(&["admin", "users", "a/b", "role"]).as_str(),
            "http://localhost:4000/admin/users/a%2Fb/role"
        );
    }

    #[test]
    fn error_message_precedence() {
        assert_eq!(
            error_message(StatusCode::CONFLICT, r#"{"error":"Order already completed","message":"ignored"}"#),
            "Order already completed"
        );
        assert_eq!(error_message(StatusCode::BAD_REQUEST, r#"{"message":"Bad role"}"#), "Bad role");
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, "<html>oops</html>"), "HTTP 502");
    }

    #[tokio::test]
    async fn calls_without_session_are_unauthenticated() {
        let c = client("http://127.0.0.1:9");
        let err = c.update_order_status("o-1", &StatusUpdate::default()).await.unwrap_err();
        assert!(matches!(err, AdminError::Unauthenticated));
        assert_eq!(err.to_string(), "Not authenticated");
    }

    #[test]
    fn rejects_unusable_base_url() {
        let config = ApiConfig {
            base_url: "mailto:ops@example.com".to_string(),
            request_timeout_secs: 5,
        };
        let auth = Arc::new(TokenAuth::new(AuthConfig {
            jwt_secret: "s".to_string(),
            leeway_secs: 0,
        }));
        assert!(BackendClient::new(&config, auth).is_err());
    }
}
