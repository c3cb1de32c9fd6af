//! In-process session store.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::SessionStore;
use crate::context::{Cookie, WebContext};
use crate::error::Result;

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "PORTCULLIS_SESSION";

/// Request attribute remembering the session id resolved for this request.
const SESSION_ID_ATTRIBUTE: &str = "portcullis.sessionId";

type Attributes = HashMap<String, Value>;

/// A [`SessionStore`] keeping every session in memory.
///
/// The session id travels in the [`SESSION_COOKIE`] cookie. Ids are UUID v4.
/// Sessions are never expired; this store is meant for tests, demos and
/// single-process deployments.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Attributes>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no session exists.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Id of the live session the request refers to, if any.
    async fn current_id(&self, ctx: &dyn WebContext) -> Option<String> {
        let candidate = ctx
            .request_attribute(SESSION_ID_ATTRIBUTE)
            .and_then(Value::as_str)
            .or_else(|| ctx.request_cookie(SESSION_COOKIE))?
            .to_string();
        self.sessions
            .read()
            .await
            .contains_key(&candidate)
            .then_some(candidate)
    }

    fn bind(ctx: &mut dyn WebContext, id: &str) {
        ctx.set_request_attribute(SESSION_ID_ATTRIBUTE, Value::from(id));
        let mut cookie = Cookie::new(SESSION_COOKIE, id);
        cookie.path = Some("/".to_string());
        cookie.http_only = true;
        cookie.secure = ctx.is_secure();
        ctx.add_response_cookie(cookie);
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get_or_create_session_id(&self, ctx: &mut dyn WebContext) -> Result<String> {
        if let Some(id) = self.current_id(ctx).await {
            return Ok(id);
        }
        let id = uuid::Uuid::new_v4().to_string();
        self.sessions
            .write()
            .await
            .insert(id.clone(), Attributes::new());
        Self::bind(ctx, &id);
        log::debug!("Created session {id}");
        Ok(id)
    }

    async fn get(&self, ctx: &mut dyn WebContext, key: &str) -> Result<Option<Value>> {
        let Some(id) = self.current_id(ctx).await else {
            return Ok(None);
        };
        Ok(self
            .sessions
            .read()
            .await
            .get(&id)
            .and_then(|attributes| attributes.get(key))
            .cloned())
    }

    async fn set(&self, ctx: &mut dyn WebContext, key: &str, value: Value) -> Result<()> {
        let id = self.get_or_create_session_id(ctx).await?;
        let mut sessions = self.sessions.write().await;
        let attributes = sessions.entry(id).or_default();
        if value.is_null() {
            attributes.remove(key);
        } else {
            attributes.insert(key.to_string(), value);
        }
        Ok(())
    }

    async fn destroy_session(&self, ctx: &mut dyn WebContext) -> Result<bool> {
        let Some(id) = self.current_id(ctx).await else {
            return Ok(false);
        };
        self.sessions.write().await.remove(&id);
        ctx.set_request_attribute(SESSION_ID_ATTRIBUTE, Value::Null);
        log::debug!("Destroyed session {id}");
        Ok(true)
    }

    async fn renew_session(&self, ctx: &mut dyn WebContext) -> Result<bool> {
        let old_id = self.get_or_create_session_id(ctx).await?;
        let new_id = uuid::Uuid::new_v4().to_string();
        {
            let mut sessions = self.sessions.write().await;
            let attributes = sessions.remove(&old_id).unwrap_or_default();
            sessions.insert(new_id.clone(), attributes);
        }
        Self::bind(ctx, &new_id);
        log::debug!("Renewed session {old_id} as {new_id}");
        Ok(true)
    }
}
