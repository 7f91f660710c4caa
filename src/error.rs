// Admin layer error types
use std::collections::HashMap;

use serde_json::{json, Value};
use thiserror::Error;

use crate::auth::AuthError;
use crate::database::DatabaseError;

/// Errors surfaced to callers of the admin layer.
///
/// Reads never return these past a live query (they land in the query's
/// `error` state instead); writes always do, so the initiating form or
/// action can show them inline.
#[derive(Debug, Error)]
pub enum AdminError {
    /// No valid session where one is required
    #[error("Not authenticated")]
    Unauthenticated,

    /// A write was attempted without a tenant scope
    #[error("{0}")]
    Unscoped(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{message}")]
    Validation {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },

    #[error("{0}")]
    InvalidTransition(String),

    #[error("A status update is already in progress for order {0}")]
    TransitionInFlight(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Non-2xx answer from the backend API; `message` is its payload verbatim
    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl AdminError {
    pub fn unscoped(action: &str) -> Self {
        AdminError::Unscoped(format!(
            "Cannot {}: no restaurant is selected for this session",
            action
        ))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AdminError::Forbidden(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AdminError::Validation {
            message: message.into(),
            field_errors: None,
        }
    }

    pub fn field_error(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut field_errors = HashMap::new();
        field_errors.insert(field.to_string(), message.clone());
        AdminError::Validation {
            message,
            field_errors: Some(field_errors),
        }
    }

    pub fn invalid_transition(message: impl Into<String>) -> Self {
        AdminError::InvalidTransition(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AdminError::NotFound(message.into())
    }

    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        AdminError::Upstream {
            status,
            message: message.into(),
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            AdminError::Unauthenticated => "UNAUTHENTICATED",
            AdminError::Unscoped(_) => "UNSCOPED",
            AdminError::Forbidden(_) => "FORBIDDEN",
            AdminError::Validation { .. } => "VALIDATION_ERROR",
            AdminError::InvalidTransition(_) => "INVALID_TRANSITION",
            AdminError::TransitionInFlight(_) => "TRANSITION_IN_FLIGHT",
            AdminError::NotFound(_) | AdminError::Database(DatabaseError::NotFound(_)) => "NOT_FOUND",
            AdminError::Upstream { .. } => "UPSTREAM_REJECTED",
            AdminError::Database(_) => "DATABASE_ERROR",
            AdminError::Http(_) => "HTTP_ERROR",
            AdminError::Auth(_) => "AUTH_ERROR",
        }
    }

    /// Convert to a JSON body for machine-readable output
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "error": true,
            "message": self.to_string(),
            "code": self.error_code(),
        });
        if let AdminError::Validation {
            field_errors: Some(field_errors),
            ..
        } = self
        {
            body["field_errors"] = json!(field_errors);
        }
        body
    }
}
