#![doc = include_str!("../README.md")]

//! # Modules
//!
//! - [`action`]: HTTP actions, redirect descriptors and the caller-visible outcome
//! - [`adapter`]: response adapters
//! - [`authenticate`]: the extract, validate, create chain of one client
//! - [`authorization`]: authorizers, built-ins included
//! - [`client`]: clients, the anonymous client and the client finder
//! - [`config`]: settings and the assembled security configuration
//! - [`context`]: the per-request web context
//! - [`credentials`]: per-client capabilities
//! - [`decision`]: session load and save decisions
//! - [`error`]: error types and `Result` alias
//! - [`matching`]: request matchers
//! - [`profile`]: user profiles and the profile manager
//! - [`runner`]: execution context runners
//! - [`session`]: session store contract and session strategies

pub mod action;
pub mod adapter;
pub mod authenticate;
pub mod authorization;
pub mod client;
pub mod config;
pub mod context;
pub mod credentials;
pub mod decision;
pub mod error;
pub mod matching;
pub mod profile;
pub mod runner;
pub mod session;

// Re-export key types at crate root for convenience
pub use action::{HttpAction, Outcome, RedirectAction};
pub use adapter::{GrantedAccessAdapter, HttpActionAdapter, SimpleResponse, SimpleResponseAdapter};
pub use authenticate::ClientAuthenticator;
pub use client::{AuthClient, Client};
pub use config::{ErrorHandling, SecuredRoute, SecurityConfig, SecuritySettings};
pub use context::{RequestContext, WebContext};
pub use error::{Error, Result};
pub use profile::{ProfileManager, UserProfile};
pub use runner::{AffinityRunner, ContextFreeRunner, ExecutionContextRunner};
pub use session::{MemorySessionStore, SessionDestruction, SessionRenewal, SessionStore};
