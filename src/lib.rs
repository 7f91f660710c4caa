pub mod auth;
pub mod backend;
pub mod cli;
pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod filter;
pub mod sync;
pub mod types;

pub use context::AdminContext;
pub use error::AdminError;
