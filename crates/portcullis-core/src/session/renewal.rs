//! Session renewal after a successful login.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::client::AuthClient;
use crate::context::WebContext;
use crate::error::Result;

/// Whether the session id changes once a user has logged in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionRenewal {
    /// Keep the session id.
    Never,
    /// Move the session to a fresh id and tell every client about it.
    #[default]
    Always,
}

impl SessionRenewal {
    /// Map the `renew_session` setting onto a strategy.
    pub fn from_flag(renew: bool) -> Self {
        if renew { Self::Always } else { Self::Never }
    }

    /// Apply the strategy.
    ///
    /// A missing store, or a store that cannot renew, is logged and the
    /// login carries on with the old id. Store failures propagate.
    pub async fn renew(
        &self,
        ctx: &mut dyn WebContext,
        clients: &[Arc<dyn AuthClient>],
    ) -> Result<()> {
        if *self == Self::Never {
            return Ok(());
        }
        let Some(store) = ctx.session_store() else {
            log::error!("No session store available for this web context; session not renewed");
            return Ok(());
        };

        let old_id = store.get_or_create_session_id(ctx).await?;
        if !store.renew_session(ctx).await? {
            log::error!("Unable to renew the session; the session store may not support this feature");
            return Ok(());
        }
        log::debug!("Renewed session {old_id}");
        for client in clients {
            client.notify_session_renewal(&old_id, ctx).await?;
        }
        Ok(())
    }
}
