//! A small self-contained configuration for trying the logics out.
//!
//! The demo client reads a bearer token from the `Authorization` header
//! (or the `token` parameter) and knows two users:
//!
//! | Token | User | Roles |
//! |---|---|---|
//! | `demo-token` | `demo` | `user`, `admin` |
//! | `guest-token` | `guest` | `user` |

use std::collections::HashMap;

use async_trait::async_trait;
use portcullis_core::authorization::RequireAnyRole;
use portcullis_core::client::{Client, anonymous_client};
use portcullis_core::credentials::{
    Authenticator, CredentialsExtractor, DefaultRolesGenerator, ProfileCreator,
};
use portcullis_core::matching::PathMatcher;
use portcullis_core::{Error, Result, SecurityConfig, SecuritySettings, UserProfile, WebContext};

/// Name of the demo client.
pub const DEMO_CLIENT_NAME: &str = "DemoTokenClient";

/// Request parameter accepted instead of the `Authorization` header.
pub const TOKEN_PARAMETER: &str = "token";

/// Bearer token from the `Authorization` header or the `token` parameter.
#[derive(Debug, Clone, Copy, Default)]
pub struct BearerTokenExtractor;

#[async_trait]
impl CredentialsExtractor<String> for BearerTokenExtractor {
    async fn extract(&self, ctx: &mut dyn WebContext) -> Result<Option<String>> {
        let from_header = ctx
            .request_header("Authorization")
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim);
        let token = from_header.or_else(|| ctx.request_parameter(TOKEN_PARAMETER));
        Ok(token.filter(|t| !t.is_empty()).map(str::to_string))
    }
}

#[derive(Debug, Clone)]
struct DemoUser {
    id: &'static str,
    roles: &'static [&'static str],
}

/// The fixed demo user directory, keyed by token.
#[derive(Debug, Clone)]
pub struct DemoUsers {
    users: HashMap<&'static str, DemoUser>,
}

impl Default for DemoUsers {
    fn default() -> Self {
        let users = HashMap::from([
            (
                "demo-token",
                DemoUser {
                    id: "demo",
                    roles: &["user", "admin"],
                },
            ),
            (
                "guest-token",
                DemoUser {
                    id: "guest",
                    roles: &["user"],
                },
            ),
        ]);
        Self { users }
    }
}

#[async_trait]
impl Authenticator<String> for DemoUsers {
    async fn validate(&self, credentials: &String, _ctx: &mut dyn WebContext) -> Result<()> {
        if self.users.contains_key(credentials.as_str()) {
            Ok(())
        } else {
            Err(Error::credentials("unknown demo token"))
        }
    }
}

#[async_trait]
impl ProfileCreator<String> for DemoUsers {
    async fn create(&self, credentials: String, _ctx: &mut dyn WebContext) -> Result<UserProfile> {
        let user = self
            .users
            .get(credentials.as_str())
            .ok_or_else(|| Error::technical("validated token vanished from the directory"))?;
        let mut profile = UserProfile::new(user.id);
        for role in user.roles {
            profile.add_role(*role);
        }
        Ok(profile)
    }
}

/// The demo client.
pub fn demo_client() -> Client<String> {
    Client::direct(
        DEMO_CLIENT_NAME,
        BearerTokenExtractor,
        DemoUsers::default(),
        DemoUsers::default(),
    )
    .with_generator(DefaultRolesGenerator::new(Vec::<String>::new(), ["read"]))
}

/// The demo configuration: the demo client and the anonymous client, an
/// `admin` authorizer and an `excludeHealth` matcher.
pub fn demo_config(settings: SecuritySettings) -> Result<SecurityConfig> {
    SecurityConfig::builder(settings)
        .client(demo_client())
        .client(anonymous_client())
        .authorizer("admin", RequireAnyRole::new(["admin"]))
        .matcher("excludeHealth", PathMatcher::new().exclude_path("/health"))
        .build()
}
