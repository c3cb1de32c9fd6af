//! Authenticated user profiles.
//!
//! A [`UserProfile`] is produced once per successful authentication chain
//! and treated as read-only for the rest of the request. Profiles are kept
//! in a [`ProfileMap`] keyed by the name of the client that produced them,
//! see [`ProfileManager`].

mod manager;

pub use manager::{ProfileManager, ProfileMap, USER_PROFILES};

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key used for profiles whose client name is unknown.
pub const DEFAULT_CLIENT_NAME: &str = "DEFAULT";

/// Id given to anonymous profiles.
pub const ANONYMOUS_PROFILE_ID: &str = "anonymous";

/// An authenticated identity plus its attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    client_name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    attributes: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    roles: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    permissions: BTreeSet<String>,
    #[serde(default)]
    remembered: bool,
    #[serde(default)]
    anonymous: bool,
}

impl UserProfile {
    /// A profile for the given identity.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// The placeholder profile granted by anonymous clients.
    pub fn anonymous() -> Self {
        Self {
            anonymous: true,
            ..Self::new(ANONYMOUS_PROFILE_ID)
        }
    }

    /// Identity of the user.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name of the client that authenticated the user.
    pub fn client_name(&self) -> Option<&str> {
        self.client_name.as_deref()
    }

    /// Record which client produced this profile.
    pub fn set_client_name(&mut self, name: impl Into<String>) {
        self.client_name = Some(name.into());
    }

    /// Key of this profile in a [`ProfileMap`].
    pub fn storage_key(&self) -> &str {
        self.client_name().unwrap_or(DEFAULT_CLIENT_NAME)
    }

    /// A single attribute.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// All attributes.
    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    /// Set an attribute.
    pub fn add_attribute(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Builder-style [`add_attribute`](Self::add_attribute).
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add_attribute(name, value);
        self
    }

    /// Granted roles.
    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    /// Grant a role.
    pub fn add_role(&mut self, role: impl Into<String>) {
        self.roles.insert(role.into());
    }

    /// Builder-style [`add_role`](Self::add_role).
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.add_role(role);
        self
    }

    /// Whether the role was granted.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Granted permissions.
    pub fn permissions(&self) -> &BTreeSet<String> {
        &self.permissions
    }

    /// Grant a permission.
    pub fn add_permission(&mut self, permission: impl Into<String>) {
        self.permissions.insert(permission.into());
    }

    /// Whether the user was authenticated through a remember-me mechanism.
    pub fn is_remembered(&self) -> bool {
        self.remembered
    }

    /// Mark the profile as remembered.
    pub fn set_remembered(&mut self, remembered: bool) {
        self.remembered = remembered;
    }

    /// Whether this is an anonymous placeholder.
    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }
}
