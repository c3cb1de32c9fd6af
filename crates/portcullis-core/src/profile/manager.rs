//! Reading and writing the profiles of the current request.

use indexmap::IndexMap;
use serde_json::Value;

use super::UserProfile;
use crate::context::WebContext;
use crate::error::Result;
use crate::runner;
use crate::session;

/// Request attribute and session key holding the profiles.
pub const USER_PROFILES: &str = "userProfiles";

/// Profiles keyed by client name, in insertion order.
///
/// Stored as a JSON object; the workspace enables `serde_json`'s
/// `preserve_order` so the order survives the round-trip.
pub type ProfileMap = IndexMap<String, UserProfile>;

/// Manages the profiles of one request.
///
/// Profiles live in the [`USER_PROFILES`] request attribute and, when asked
/// for, in the session under the same key. Reads tolerate a context without
/// a session store (the session simply holds nothing). Writes to the session
/// fail with [`Error::NoSessionStore`](crate::Error::NoSessionStore) instead.
pub struct ProfileManager<'a> {
    ctx: &'a mut dyn WebContext,
}

impl<'a> ProfileManager<'a> {
    /// Manage the profiles of `ctx`.
    pub fn new(ctx: &'a mut dyn WebContext) -> Self {
        Self { ctx }
    }

    /// The main profile: the first non-anonymous one, else the first one.
    pub async fn get(&mut self, read_from_session: bool) -> Result<Option<UserProfile>> {
        let profiles = self.retrieve_all(read_from_session).await?;
        let main = profiles
            .values()
            .find(|p| !p.is_anonymous())
            .or_else(|| profiles.values().next())
            .cloned();
        Ok(main)
    }

    /// Every profile, in insertion order.
    pub async fn get_all(&mut self, read_from_session: bool) -> Result<Vec<UserProfile>> {
        let profiles = self.retrieve_all(read_from_session).await?;
        Ok(profiles.into_values().collect())
    }

    /// Save `profile`.
    ///
    /// Without multi-profile support the profile replaces whatever was
    /// there; with it, the profile replaces only the one from the same
    /// client.
    pub async fn save(
        &mut self,
        save_in_session: bool,
        profile: UserProfile,
        multi_profile: bool,
    ) -> Result<()> {
        let key = profile.storage_key().to_string();
        let mut profiles = if multi_profile {
            let mut existing = self.retrieve_all(save_in_session).await?;
            existing.shift_remove(&key);
            existing
        } else {
            ProfileMap::new()
        };
        profiles.insert(key, profile);

        let value = serde_json::to_value(&profiles)?;
        if save_in_session {
            session::set_attribute(&mut *self.ctx, USER_PROFILES, value.clone()).await?;
        }
        self.ctx.set_request_attribute(USER_PROFILES, value);
        Ok(())
    }

    /// Remove every profile from the request, and from the session if asked.
    pub async fn remove(&mut self, remove_from_session: bool) -> Result<()> {
        let empty = Value::Object(Default::default());
        self.ctx.set_request_attribute(USER_PROFILES, empty.clone());
        if remove_from_session {
            session::set_attribute(&mut *self.ctx, USER_PROFILES, empty).await?;
        }
        Ok(())
    }

    /// Remove every profile from both the request and the session.
    pub async fn logout(&mut self) -> Result<()> {
        self.remove(true).await
    }

    /// Whether a non-anonymous profile exists in the request or session.
    pub async fn is_authenticated(&mut self) -> Result<bool> {
        let profiles = self.get_all(true).await?;
        Ok(profiles.iter().any(|p| !p.is_anonymous()))
    }

    async fn retrieve_all(&mut self, read_from_session: bool) -> Result<ProfileMap> {
        let mut profiles = match self.ctx.request_attribute(USER_PROFILES) {
            Some(value) => profiles_from_value(value.clone())?,
            None => ProfileMap::new(),
        };
        if !read_from_session {
            return Ok(profiles);
        }
        if self.ctx.session_store().is_none() {
            log::debug!("No session store attached; profiles read from the request only");
            return Ok(profiles);
        }

        let from_session = match session::get_attribute(&mut *self.ctx, USER_PROFILES).await? {
            Some(value) => profiles_from_value(value)?,
            None => ProfileMap::new(),
        };
        if from_session.is_empty() {
            return Ok(profiles);
        }
        let runner = self.ctx.runner();
        runner::on_context(&*runner, move || {
            profiles.extend(from_session);
            profiles
        })
        .await
    }
}

/// Decode a stored profile map. A single stored profile is accepted too.
fn profiles_from_value(value: Value) -> Result<ProfileMap> {
    if value.get("id").is_some_and(Value::is_string) {
        let profile: UserProfile = serde_json::from_value(value)?;
        let mut profiles = ProfileMap::new();
        profiles.insert(profile.storage_key().to_string(), profile);
        return Ok(profiles);
    }
    Ok(serde_json::from_value(value)?)
}
