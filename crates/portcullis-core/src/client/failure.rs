//! Recording failed authentication attempts of indirect clients.
//!
//! An indirect client that comes back from its redirect round-trip without
//! credentials records the attempt in the session. The next redirect for
//! that client sees the marker and answers 401 instead of looping back to
//! the identity provider.

use serde_json::Value;

use crate::context::WebContext;
use crate::error::Result;
use crate::session;

/// Suffix appended to the client name to build the session key.
pub const ATTEMPTED_AUTHENTICATION_SUFFIX: &str = "$attemptedAuthentication";

/// Whether and where failed attempts are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedAuthRecorder {
    /// Direct clients: nothing is recorded.
    DoNotRecord,
    /// Indirect clients: a marker is kept in the session.
    RecordInSession,
}

impl FailedAuthRecorder {
    /// The recorder used by a client of the given kind.
    pub fn for_client(indirect: bool) -> Self {
        if indirect {
            Self::RecordInSession
        } else {
            Self::DoNotRecord
        }
    }

    /// Record a failed attempt for `client_name`.
    pub async fn record(&self, client_name: &str, ctx: &mut dyn WebContext) -> Result<()> {
        match self {
            Self::DoNotRecord => Ok(()),
            Self::RecordInSession => {
                log::debug!("Recording failed authentication for client {client_name}");
                session::set_attribute(ctx, &key(client_name), Value::from("true")).await
            }
        }
    }

    /// Forget any recorded attempt for `client_name`.
    pub async fn clear(&self, client_name: &str, ctx: &mut dyn WebContext) -> Result<()> {
        match self {
            Self::DoNotRecord => Ok(()),
            Self::RecordInSession => session::remove_attribute(ctx, &key(client_name)).await,
        }
    }

    /// Whether a failed attempt is on record for `client_name`.
    pub async fn is_present(&self, client_name: &str, ctx: &mut dyn WebContext) -> Result<bool> {
        match self {
            Self::DoNotRecord => Ok(false),
            Self::RecordInSession => {
                let marker = session::get_attribute(ctx, &key(client_name)).await?;
                Ok(marker
                    .as_ref()
                    .and_then(Value::as_str)
                    .is_some_and(|s| !s.is_empty()))
            }
        }
    }
}

fn key(client_name: &str) -> String {
    format!("{client_name}{ATTEMPTED_AUTHENTICATION_SUFFIX}")
}
