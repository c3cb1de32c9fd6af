#![doc = include_str!("../README.md")]

//! # Modules
//!
//! - [`security`]: protecting a route
//! - [`callback`]: finishing an indirect login
//! - [`logout`]: local and central logout
//! - [`indirect`]: saving and restoring the requested URL around the
//!   identity provider round-trip

pub mod callback;
pub mod indirect;
pub mod logout;
mod outcome;
pub mod security;

pub use callback::CallbackLogic;
pub use logout::{LOGOUT_URL_PARAMETER, LogoutLogic};
pub use security::SecurityLogic;
