use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub realtime: RealtimeConfig,
    pub orders: OrdersConfig,
    pub restaurants: RestaurantsConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub enable_query_logging: bool,
}

/// Backend API that performs order transitions and user provisioning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub leeway_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Window in which bursts of change events collapse into one reload
    pub debounce_ms: u64,
    pub feed_buffer: usize,
}

/// Which fields a payment review sends to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewVariant {
    /// `{paymentStatus: VERIFIED | FAILED}`
    Payment,
    /// `{status: CONFIRMED | CANCELLED}`
    Paired,
}

impl ReviewVariant {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "payment" => Some(ReviewVariant::Payment),
            "paired" => Some(ReviewVariant::Paired),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrdersConfig {
    pub review_variant: ReviewVariant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestaurantsConfig {
    pub trial_days: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from any key lookup (the process environment in production)
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        // Database overrides
        if let Some(v) = lookup("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Some(v) = lookup("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Some(v) = lookup("DATABASE_ENABLE_QUERY_LOGGING") {
            self.database.enable_query_logging = v.parse().unwrap_or(self.database.enable_query_logging);
        }

        // Backend API overrides
        if let Some(v) = lookup("ADMIN_API_URL") {
            self.api.base_url = v;
        }
        if let Some(v) = lookup("ADMIN_API_TIMEOUT_SECS") {
            self.api.request_timeout_secs = v.parse().unwrap_or(self.api.request_timeout_secs);
        }

        // Auth overrides
        if let Some(v) = lookup("AUTH_JWT_SECRET") {
            self.auth.jwt_secret = v;
        }
        if let Some(v) = lookup("AUTH_JWT_LEEWAY_SECS") {
            self.auth.leeway_secs = v.parse().unwrap_or(self.auth.leeway_secs);
        }

        // Realtime overrides
        if let Some(v) = lookup("REALTIME_DEBOUNCE_MS") {
            self.realtime.debounce_ms = v.parse().unwrap_or(self.realtime.debounce_ms);
        }
        if let Some(v) = lookup("REALTIME_FEED_BUFFER") {
            self.realtime.feed_buffer = v.parse().unwrap_or(self.realtime.feed_buffer);
        }

        // Domain overrides
        if let Some(v) = lookup("ORDERS_REVIEW_VARIANT") {
            self.orders.review_variant = ReviewVariant::parse(&v).unwrap_or(self.orders.review_variant);
        }
        if let Some(v) = lookup("RESTAURANTS_TRIAL_DAYS") {
            self.restaurants.trial_days = v.parse().unwrap_or(self.restaurants.trial_days);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
                connection_timeout: 30,
                enable_query_logging: true,
            },
            api: ApiConfig {
                base_url: "http://localhost:4000".to_string(),
                request_timeout_secs: 30,
            },
            auth: AuthConfig {
                jwt_secret: String::new(),
                leeway_secs: 60,
            },
            realtime: RealtimeConfig {
                debounce_ms: 100,
                feed_buffer: 64,
            },
            orders: OrdersConfig {
                review_variant: ReviewVariant::Paired,
            },
            restaurants: RestaurantsConfig { trial_days: 30 },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 10,
                enable_query_logging: true,
            },
            api: ApiConfig {
                base_url: "https://api.staging.example.com".to_string(),
                request_timeout_secs: 15,
            },
            auth: AuthConfig {
                jwt_secret: String::new(),
                leeway_secs: 30,
            },
            realtime: RealtimeConfig {
                debounce_ms: 250,
                feed_buffer: 128,
            },
            orders: OrdersConfig {
                review_variant: ReviewVariant::Paired,
            },
            restaurants: RestaurantsConfig { trial_days: 30 },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 5,
                enable_query_logging: false,
            },
            api: ApiConfig {
                base_url: "https://api.example.com".to_string(),
                request_timeout_secs: 10,
            },
            auth: AuthConfig {
                jwt_secret: String::new(),
                leeway_secs: 30,
            },
            realtime: RealtimeConfig {
                debounce_ms: 250,
                feed_buffer: 256,
            },
            orders: OrdersConfig {
                review_variant: ReviewVariant::Paired,
            },
            restaurants: RestaurantsConfig { trial_days: 30 },
        }
    }
}

// Process-wide config for the binary; library code takes sections explicitly
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
