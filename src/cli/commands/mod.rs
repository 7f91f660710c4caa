pub mod categories;
pub mod db;
pub mod menu;
pub mod orders;
pub mod restaurants;
pub mod session;
pub mod stats;
pub mod users;
pub mod watch;

use anyhow::anyhow;

use crate::sync::{LiveQuery, Loader};
use crate::types::Scope;

/// Wait for the first read and surface a failed one as an error
pub(crate) async fn loaded<L: Loader>(query: &LiveQuery<L>) -> anyhow::Result<(L::Output, Scope)> {
    let state = query.loaded().await;
    match state.error {
        Some(error) => Err(anyhow!("{} read failed: {}", query.loader().name(), error)),
        None => Ok((state.data, state.scope)),
    }
}
