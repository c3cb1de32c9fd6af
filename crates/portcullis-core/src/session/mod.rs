//! Session store contract and session strategies.
//!
//! The store is an external collaborator: the core never owns a session, it
//! reads and writes through whatever [`SessionStore`] the
//! [`WebContext`] carries. The free functions in this module are the only
//! way the rest of the crate touches the session; each one fails with
//! [`Error::NoSessionStore`] when the context has no store attached.

mod destruction;
mod memory;
mod renewal;

pub use destruction::SessionDestruction;
pub use memory::{MemorySessionStore, SESSION_COOKIE};
pub use renewal::SessionRenewal;

use async_trait::async_trait;
use serde_json::Value;

use crate::context::WebContext;
use crate::error::{Error, Result};

/// Session key under which the originally requested URL is kept.
pub const REQUESTED_URL: &str = "requestedUrl";

/// Per-session keyed attribute storage.
///
/// Within one session, a `get` issued after a `set` on the same key must
/// observe the written value. Nothing stronger is required: concurrent
/// requests on the same session may race, last write wins.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Return the current session id, creating a session if needed.
    ///
    /// Repeated calls against the same context return the same id.
    async fn get_or_create_session_id(&self, ctx: &mut dyn WebContext) -> Result<String>;

    /// Read an attribute. Absent sessions read as absent attributes.
    async fn get(&self, ctx: &mut dyn WebContext, key: &str) -> Result<Option<Value>>;

    /// Write an attribute. Writing [`Value::Null`] removes it.
    async fn set(&self, ctx: &mut dyn WebContext, key: &str, value: Value) -> Result<()>;

    /// Destroy the current session. Returns `false` if the store cannot.
    async fn destroy_session(&self, _ctx: &mut dyn WebContext) -> Result<bool> {
        Ok(false)
    }

    /// Move the session data to a new id. Returns `false` if the store cannot.
    async fn renew_session(&self, _ctx: &mut dyn WebContext) -> Result<bool> {
        Ok(false)
    }
}

/// Session id of the request, creating the session if needed.
pub async fn session_id(ctx: &mut dyn WebContext) -> Result<String> {
    let store = ctx.session_store().ok_or(Error::NoSessionStore)?;
    store.get_or_create_session_id(ctx).await
}

/// Read a session attribute.
pub async fn get_attribute(ctx: &mut dyn WebContext, key: &str) -> Result<Option<Value>> {
    let store = ctx.session_store().ok_or(Error::NoSessionStore)?;
    Ok(store.get(ctx, key).await?.filter(|v| !v.is_null()))
}

/// Write a session attribute.
pub async fn set_attribute(ctx: &mut dyn WebContext, key: &str, value: Value) -> Result<()> {
    let store = ctx.session_store().ok_or(Error::NoSessionStore)?;
    store.set(ctx, key, value).await
}

/// Remove a session attribute.
pub async fn remove_attribute(ctx: &mut dyn WebContext, key: &str) -> Result<()> {
    set_attribute(ctx, key, Value::Null).await
}
