#![forbid(unsafe_code)]

//! Portcullis demo CLI
//!
//! Runs one synthetic request through the security logic against the demo
//! configuration and prints the outcome as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use portcullis::core::{AffinityRunner, MemorySessionStore, SimpleResponse, SimpleResponseAdapter};
use portcullis::demo::demo_config;
use portcullis::{Outcome, RequestContext, SecuredRoute, SecurityLogic, SecuritySettings};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,portcullis=debug";

/// Portcullis - evaluate a request against the demo security configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file (TOML); defaults to $PORTCULLIS_CONFIG
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP method of the synthetic request
    #[arg(short, long, default_value = "GET")]
    method: String,

    /// Full URL of the synthetic request
    #[arg(short, long, default_value = "https://localhost/")]
    url: String,

    /// Bearer token sent in the Authorization header
    #[arg(short, long)]
    token: Option<String>,

    /// Extra request header, as NAME=VALUE
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Named route from the settings file
    #[arg(short, long, conflicts_with_all = ["clients", "authorizers", "matchers"])]
    route: Option<String>,

    /// Route clients, comma separated
    #[arg(long, default_value = "DemoTokenClient")]
    clients: String,

    /// Route authorizers, comma separated
    #[arg(long, default_value = "")]
    authorizers: String,

    /// Route matchers, comma separated
    #[arg(long, default_value = "")]
    matchers: String,

    /// Run session merges on a dedicated affinity thread
    #[arg(long)]
    affinity: bool,
}

fn parse_header(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, got {raw}"))
}

fn describe(outcome: Outcome<SimpleResponse>) -> serde_json::Value {
    match outcome {
        Outcome::Granted(response) => serde_json::json!({
            "outcome": "granted",
            "response": response,
        }),
        Outcome::Redirect { location, response } => serde_json::json!({
            "outcome": "redirect",
            "location": location,
            "response": response,
        }),
        Outcome::Status { code, response } => serde_json::json!({
            "outcome": "status",
            "code": code,
            "response": response,
        }),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = SecuritySettings::load(args.config.as_deref()).context("loading settings")?;
    let route = match &args.route {
        Some(name) => settings.route(name)?.clone(),
        None => SecuredRoute::new(args.clients.clone())
            .with_authorizers(args.authorizers.clone())
            .with_matchers(args.matchers.clone()),
    };
    let config = demo_config(settings).context("building the demo configuration")?;
    tracing::debug!(?config, "configuration ready");

    let mut builder = RequestContext::builder(args.method.as_str(), args.url.as_str())
        .session_store(Arc::new(MemorySessionStore::new()));
    if let Some(token) = &args.token {
        builder = builder.header("Authorization", &format!("Bearer {token}"));
    }
    for (name, value) in &args.headers {
        builder = builder.header(name, value);
    }
    if args.affinity {
        builder = builder.runner(Arc::new(AffinityRunner::new("portcullis-request")?));
    }
    let mut ctx = builder.build();

    tracing::info!(method = %args.method, url = %args.url, "securing request");
    let outcome = SecurityLogic
        .perform(&mut ctx, &config, &route, &SimpleResponseAdapter, &SimpleResponseAdapter)
        .await?;
    tracing::info!(granted = outcome.is_granted(), status = ?outcome.status(), "done");

    let mut report = describe(outcome);
    report["response_headers"] = serde_json::json!(ctx.response_headers());
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
