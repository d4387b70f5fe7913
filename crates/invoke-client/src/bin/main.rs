//! Service call CLI
//!
//! Usage:
//!   svc-call Northwind/Order/List --page-url https://app.example.com/ \
//!     --request '{"Take": 10}'

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use invoke_client::{CacheMode, ErrorMode, ServiceCallOptions, ServiceClient};
use invoke_core::{ClientConfig, ServiceTarget};
use reqwest::Method;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "svc-call")]
#[command(about = "Invoke a backend service and print the response envelope")]
struct Args {
    /// Service name (e.g. Northwind/Order/List) or URL
    target: String,

    /// Treat the target as a literal URL instead of a service name
    #[arg(long)]
    url: bool,

    /// JSON request payload
    #[arg(long)]
    request: Option<String>,

    /// HTTP method
    #[arg(long, default_value = "POST")]
    method: String,

    /// Use the blocking transport
    #[arg(long)]
    sync: bool,

    /// Do not follow 403 redirects
    #[arg(long)]
    no_redirect: bool,

    /// Do not block the UI while the call runs
    #[arg(long)]
    no_block_ui: bool,

    /// Show errors as notifications instead of alerts
    #[arg(long)]
    notify: bool,

    /// Application root that `~/` expands to
    #[arg(long, env = "INVOKE_APP_PATH", default_value = "/")]
    app_path: String,

    /// URL of the current page; the origin the token is scoped to
    #[arg(long, env = "INVOKE_PAGE_URL", default_value = "http://localhost/")]
    page_url: String,

    /// Cookie string, e.g. "CSRF-TOKEN=abc; session=xyz"
    #[arg(long, env = "INVOKE_COOKIES", default_value = "")]
    cookies: String,

    /// Extra header as name=value (repeatable)
    #[arg(long = "header", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Cache directive (no-store, no-cache, reload, ...)
    #[arg(long)]
    cache: Option<CacheMode>,
}

fn parse_header(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| format!("expected name=value, got {s}"))
}

fn build_options(args: &Args) -> Result<ServiceCallOptions> {
    let target = if args.url {
        ServiceTarget::url(&args.target)
    } else {
        ServiceTarget::service(&args.target)
    };
    let method = Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid HTTP method {}", args.method))?;

    let mut options = ServiceCallOptions::new(target)
        .method(method)
        .asynchronous(!args.sync)
        .allow_redirect(!args.no_redirect)
        .block_ui(!args.no_block_ui)
        .error_mode(if args.notify {
            ErrorMode::Notification
        } else {
            ErrorMode::Alert
        });

    if let Some(request) = &args.request {
        let value = serde_json::from_str(request).context("request is not valid JSON")?;
        options = options.request(value);
    }
    for (name, value) in &args.headers {
        options = options.try_header(name, value)?;
    }
    if let Some(cache) = args.cache {
        options = options.cache(cache);
    }
    Ok(options)
}

fn build_client(args: &Args) -> Result<ServiceClient> {
    let config = ClientConfig::new(&args.page_url)?
        .with_application_path(&args.app_path)
        .with_cookies(args.cookies.clone());
    Ok(ServiceClient::new(config)?)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "invoke_client=info".into()),
        )
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(body) => {
            println!("{body}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<String> {
    let client = build_client(args)?;
    let options = build_options(args)?;

    tracing::info!(service = %options.target, sync = args.sync, "Invoking service");

    let response = if args.sync {
        client.call_blocking(options)?
    } else {
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(client.call(options))?
    };

    Ok(serde_json::to_string_pretty(response.body())?)
}
