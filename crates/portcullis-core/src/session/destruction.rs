//! Session destruction on logout.

use serde::{Deserialize, Serialize};

use crate::context::WebContext;

/// What to do with the session once the profiles have been removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionDestruction {
    /// Leave the session alone. Never touches the session store.
    #[default]
    DoNotDestroy,
    /// Ask the session store to destroy the session.
    Destroy,
}

impl SessionDestruction {
    /// Map the `destroy_session` setting onto a strategy.
    pub fn from_flag(destroy: bool) -> Self {
        if destroy {
            Self::Destroy
        } else {
            Self::DoNotDestroy
        }
    }

    /// Apply the strategy to the request's session.
    ///
    /// Always completes: a missing store, a store that cannot destroy, or a
    /// store failure is logged and otherwise ignored so that logout keeps
    /// going.
    pub async fn attempt_session_destruction_for(&self, ctx: &mut dyn WebContext) {
        match self {
            Self::DoNotDestroy => {}
            Self::Destroy => {
                let Some(store) = ctx.session_store() else {
                    log::error!("No session store available for this web context");
                    return;
                };
                match store.destroy_session(ctx).await {
                    Ok(true) => log::debug!("Session destroyed"),
                    Ok(false) => log::error!("Unable to destroy the web session"),
                    Err(e) => log::error!("Session destruction failed: {e}"),
                }
            }
        }
    }
}
