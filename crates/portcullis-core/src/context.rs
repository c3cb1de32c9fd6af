//! Per-request web context.
//!
//! [`WebContext`] is the view the logics have of one request and its
//! response. It is owned by the request's execution and never shared
//! across requests. The session store and the execution runner are
//! injected into the context; nothing is attached through trait defaults.
//!
//! [`RequestContext`] is an in-memory implementation suitable for tests,
//! demos and hosts that translate their own request type up front.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::runner::{ContextFreeRunner, ExecutionContextRunner};
use crate::session::SessionStore;

/// A response cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
    /// Domain attribute
    pub domain: Option<String>,
    /// Path attribute
    pub path: Option<String>,
    /// HttpOnly flag
    pub http_only: bool,
    /// Secure flag
    pub secure: bool,
}

impl Cookie {
    /// A cookie with no attributes set.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            http_only: false,
            secure: false,
        }
    }
}

/// The per-request capability surface used by every logic and strategy.
pub trait WebContext: Send + Sync {
    /// HTTP method, upper case.
    fn request_method(&self) -> &str;

    /// Full URL of the current request, including the query string.
    fn full_request_url(&self) -> &str;

    /// A request (query or form) parameter.
    fn request_parameter(&self, name: &str) -> Option<&str>;

    /// A request header (case-insensitive name).
    fn request_header(&self, name: &str) -> Option<&str>;

    /// A request cookie value.
    fn request_cookie(&self, name: &str) -> Option<&str>;

    /// Host name the request was addressed to.
    fn server_name(&self) -> &str;

    /// Whether the request came over TLS.
    fn is_secure(&self) -> bool;

    /// A request-scoped attribute.
    fn request_attribute(&self, name: &str) -> Option<&Value>;

    /// Set a request-scoped attribute.
    fn set_request_attribute(&mut self, name: &str, value: Value);

    /// Set (replace) a response header.
    fn set_response_header(&mut self, name: &str, value: &str);

    /// Add a cookie to the response.
    fn add_response_cookie(&mut self, cookie: Cookie);

    /// The session store attached to this request, if any.
    fn session_store(&self) -> Option<Arc<dyn SessionStore>>;

    /// The execution runner carrying this request's affinity.
    fn runner(&self) -> Arc<dyn ExecutionContextRunner>;
}

/// In-memory [`WebContext`].
#[derive(Clone)]
pub struct RequestContext {
    method: String,
    url: String,
    server_name: String,
    secure: bool,
    parameters: HashMap<String, String>,
    headers: Vec<(String, String)>,
    cookies: HashMap<String, String>,
    attributes: HashMap<String, Value>,
    response_headers: Vec<(String, String)>,
    response_cookies: Vec<Cookie>,
    session_store: Option<Arc<dyn SessionStore>>,
    runner: Arc<dyn ExecutionContextRunner>,
}

impl RequestContext {
    /// Start building a context for `method url`.
    ///
    /// Query string parameters in `url` are picked up automatically.
    pub fn builder(method: impl Into<String>, url: impl Into<String>) -> RequestContextBuilder {
        let url = url.into();
        let parameters = parse_query(&url);
        RequestContextBuilder {
            ctx: RequestContext {
                method: method.into().to_ascii_uppercase(),
                server_name: host_of(&url).to_string(),
                secure: url.starts_with("https://"),
                url,
                parameters,
                headers: Vec::new(),
                cookies: HashMap::new(),
                attributes: HashMap::new(),
                response_headers: Vec::new(),
                response_cookies: Vec::new(),
                session_store: None,
                runner: Arc::new(ContextFreeRunner),
            },
        }
    }

    /// A response header written during processing.
    pub fn response_header(&self, name: &str) -> Option<&str> {
        self.response_headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All response headers, in write order.
    pub fn response_headers(&self) -> &[(String, String)] {
        &self.response_headers
    }

    /// Cookies added to the response.
    pub fn response_cookies(&self) -> &[Cookie] {
        &self.response_cookies
    }

    /// Carry response cookies over as request cookies, the way a browser
    /// would on its next request. Handy to chain requests in tests.
    pub fn follow_up(&self, method: &str, url: &str) -> RequestContextBuilder {
        let mut builder = RequestContext::builder(method, url);
        for (name, value) in &self.cookies {
            builder = builder.cookie(name, value);
        }
        for cookie in &self.response_cookies {
            builder = builder.cookie(&cookie.name, &cookie.value);
        }
        builder.ctx.session_store = self.session_store.clone();
        builder.ctx.runner = self.runner.clone();
        builder
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("has_session_store", &self.session_store.is_some())
            .finish()
    }
}

impl WebContext for RequestContext {
    fn request_method(&self) -> &str {
        &self.method
    }

    fn full_request_url(&self) -> &str {
        &self.url
    }

    fn request_parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    fn request_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn request_cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    fn server_name(&self) -> &str {
        &self.server_name
    }

    fn is_secure(&self) -> bool {
        self.secure
    }

    fn request_attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    fn set_request_attribute(&mut self, name: &str, value: Value) {
        self.attributes.insert(name.to_string(), value);
    }

    fn set_response_header(&mut self, name: &str, value: &str) {
        self.response_headers
            .retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.response_headers
            .push((name.to_string(), value.to_string()));
    }

    fn add_response_cookie(&mut self, cookie: Cookie) {
        self.response_cookies.retain(|c| c.name != cookie.name);
        self.response_cookies.push(cookie);
    }

    fn session_store(&self) -> Option<Arc<dyn SessionStore>> {
        self.session_store.clone()
    }

    fn runner(&self) -> Arc<dyn ExecutionContextRunner> {
        self.runner.clone()
    }
}

/// Builder for [`RequestContext`].
pub struct RequestContextBuilder {
    ctx: RequestContext,
}

impl RequestContextBuilder {
    /// Add a request parameter.
    pub fn parameter(mut self, name: &str, value: &str) -> Self {
        self.ctx
            .parameters
            .insert(name.to_string(), value.to_string());
        self
    }

    /// Add a request header.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.ctx.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Add a request cookie.
    pub fn cookie(mut self, name: &str, value: &str) -> Self {
        self.ctx.cookies.insert(name.to_string(), value.to_string());
        self
    }

    /// Attach a session store.
    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.ctx.session_store = Some(store);
        self
    }

    /// Use a specific execution runner (defaults to [`ContextFreeRunner`]).
    pub fn runner(mut self, runner: Arc<dyn ExecutionContextRunner>) -> Self {
        self.ctx.runner = runner;
        self
    }

    /// Finish building.
    pub fn build(self) -> RequestContext {
        self.ctx
    }
}

fn host_of(url: &str) -> &str {
    let rest = url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(url);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    authority.split(':').next().unwrap_or_default()
}

fn parse_query(url: &str) -> HashMap<String, String> {
    let Some((_, query)) = url.split_once('?') else {
        return HashMap::new();
    };
    let query = query.split('#').next().unwrap_or_default();
    match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
        Ok(pairs) => pairs.into_iter().collect(),
        Err(e) => {
            log::warn!("Ignoring undecodable query string: {e}");
            HashMap::new()
        }
    }
}
