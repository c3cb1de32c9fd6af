//! HTTP actions, redirect descriptors and the final outcome of a logic run.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::context::WebContext;

/// Name of the response header carrying a redirect location.
pub const LOCATION_HEADER: &str = "Location";

/// A concrete protocol-level action: a status code plus whatever the
/// adapter needs to render it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpAction {
    status: u16,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

impl HttpAction {
    /// HTTP 200 OK.
    pub const OK: u16 = 200;
    /// HTTP 302 Found.
    pub const TEMP_REDIRECT: u16 = 302;
    /// HTTP 400 Bad Request.
    pub const BAD_REQUEST: u16 = 400;
    /// HTTP 401 Unauthorized.
    pub const UNAUTHORIZED: u16 = 401;
    /// HTTP 403 Forbidden.
    pub const FORBIDDEN: u16 = 403;
    /// HTTP 500 Internal Server Error.
    pub const SERVER_ERROR: u16 = 500;

    /// Build an action for an arbitrary status code.
    pub fn status_code(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            location: None,
            content: None,
        }
    }

    /// 200 with no content.
    pub fn ok(message: impl Into<String>) -> Self {
        Self::status_code(Self::OK, message)
    }

    /// 200 carrying a response body.
    pub fn ok_with_content(message: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::ok(message)
        }
    }

    /// 302 towards `location`.
    pub fn redirect(message: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            location: Some(location.into()),
            ..Self::status_code(Self::TEMP_REDIRECT, message)
        }
    }

    /// 400.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::status_code(Self::BAD_REQUEST, message)
    }

    /// 401.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::status_code(Self::UNAUTHORIZED, message)
    }

    /// 403.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::status_code(Self::FORBIDDEN, message)
    }

    /// 500.
    pub fn server_error(message: impl Into<String>) -> Self {
        Self::status_code(Self::SERVER_ERROR, message)
    }

    /// The HTTP status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Human-readable reason, for logs.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Redirect target, for 3xx actions.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Response body, if any.
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// Whether this action is a redirect.
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status) && self.location.is_some()
    }
}

impl fmt::Display for HttpAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} {} -> {location}", self.status, self.message),
            None => write!(f, "{} {}", self.status, self.message),
        }
    }
}

/// Redirect descriptor produced by a [`RedirectActionBuilder`](crate::client::RedirectActionBuilder).
///
/// Either a plain redirect or a self-submitting page (e.g. a POST binding).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RedirectAction {
    /// Redirect the browser to `location`.
    Redirect {
        /// Target URL
        location: String,
    },
    /// Answer 200 with `content`.
    Success {
        /// Page content
        content: String,
    },
}

impl RedirectAction {
    /// A plain redirect.
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::Redirect {
            location: location.into(),
        }
    }

    /// A 200 page.
    pub fn success(content: impl Into<String>) -> Self {
        Self::Success {
            content: content.into(),
        }
    }

    /// The redirect target, if this is a plain redirect.
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Redirect { location } => Some(location),
            Self::Success { .. } => None,
        }
    }

    /// Turn the descriptor into an action, writing the `Location` header.
    pub fn perform(&self, ctx: &mut dyn WebContext) -> HttpAction {
        match self {
            Self::Redirect { location } => {
                ctx.set_response_header(LOCATION_HEADER, location);
                HttpAction::redirect("redirect", location.clone())
            }
            Self::Success { content } => HttpAction::ok_with_content("ok", content.clone()),
        }
    }
}

/// The single caller-visible result of a logic run.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<R> {
    /// Authentication and authorization succeeded.
    Granted(R),
    /// The caller must redirect.
    Redirect {
        /// Redirect target
        location: String,
        /// Adapted protocol response
        response: R,
    },
    /// Any other status (401, 403, 200 from logout, 500, ...).
    Status {
        /// HTTP status code
        code: u16,
        /// Adapted protocol response
        response: R,
    },
}

impl<R> Outcome<R> {
    /// Build the outcome for an adapted action.
    pub fn from_action(action: &HttpAction, response: R) -> Self {
        match action.location() {
            Some(location) if action.is_redirect() => Outcome::Redirect {
                location: location.to_string(),
                response,
            },
            _ => Outcome::Status {
                code: action.status(),
                response,
            },
        }
    }

    /// Returns `true` if access was granted.
    pub fn is_granted(&self) -> bool {
        matches!(self, Outcome::Granted(_))
    }

    /// The status code of a non-granted outcome (302 for redirects).
    pub fn status(&self) -> Option<u16> {
        match self {
            Outcome::Granted(_) => None,
            Outcome::Redirect { .. } => Some(HttpAction::TEMP_REDIRECT),
            Outcome::Status { code, .. } => Some(*code),
        }
    }

    /// Unwrap into the protocol response regardless of kind.
    pub fn into_response(self) -> R {
        match self {
            Outcome::Granted(r) => r,
            Outcome::Redirect { response, .. } => response,
            Outcome::Status { response, .. } => response,
        }
    }
}
