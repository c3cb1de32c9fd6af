//! Portcullis: asynchronous authentication and authorization orchestration.
//!
//! This crate re-exports the Portcullis components for convenience.

#![doc = include_str!("../README.md")]

pub use portcullis_core as core;
pub use portcullis_logic as logic;

pub mod demo;

// Re-export the types most hosts need at the crate root
pub use portcullis_core::{
    Error, HttpAction, Outcome, RequestContext, Result, SecuredRoute, SecurityConfig,
    SecuritySettings, UserProfile, WebContext,
};
pub use portcullis_logic::{CallbackLogic, LogoutLogic, SecurityLogic};
