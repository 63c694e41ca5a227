#![forbid(unsafe_code)]

//! `ota-relay-ctl` — command-line client for the `ota-relay` admin API.
//!
//! Sends authenticated HTTP requests to a running server and prints the
//! JSON response.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use reqwest::{Method, StatusCode};
use sha2::{Digest, Sha256};

type CtlResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

#[derive(Debug, Parser)]
#[command(
    name = "ota-relay-ctl",
    about = "Command-line client for the ota-relay admin API",
    version,
    long_about = None
)]
struct Cli {
    /// Base URL of the server.
    #[arg(long, default_value = "http://127.0.0.1:3000")]
    url: String,

    /// Admin secret; falls back to `OTA_RELAY_AUTH_SECRET`.
    #[arg(long)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum PlatformArg {
    Ios,
    Android,
}

impl PlatformArg {
    fn as_str(self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List bundles, newest first.
    List {
        /// Only bundles on this channel.
        #[arg(long)]
        channel: Option<String>,
        /// Only bundles for this platform.
        #[arg(long, value_enum)]
        platform: Option<PlatformArg>,
        /// Page size.
        #[arg(long)]
        limit: Option<u32>,
        /// Rows to skip.
        #[arg(long)]
        offset: Option<u32>,
    },

    /// Show one bundle.
    Get {
        /// Bundle ID.
        id: String,
    },

    /// Delete one bundle.
    Delete {
        /// Bundle ID.
        id: String,
    },

    /// List channel names.
    Channels,

    /// Register a bundle.
    Create {
        /// Target platform.
        #[arg(long, value_enum)]
        platform: PlatformArg,
        /// Archive location, e.g. `s3://bucket/key.zip`.
        #[arg(long)]
        storage_uri: String,
        /// Local archive; its SHA-256 becomes the file hash.
        #[arg(long, conflicts_with = "file_hash")]
        file: Option<PathBuf>,
        /// Precomputed archive hash.
        #[arg(long, required_unless_present = "file")]
        file_hash: Option<String>,
        /// Update channel.
        #[arg(long, default_value = "production")]
        channel: String,
        /// App version range the bundle targets.
        #[arg(long)]
        target_app_version: Option<String>,
        /// Native fingerprint the bundle targets.
        #[arg(long)]
        fingerprint_hash: Option<String>,
        /// Release note.
        #[arg(long)]
        message: Option<String>,
        /// Source commit.
        #[arg(long)]
        git_commit_hash: Option<String>,
        /// Register the bundle disabled.
        #[arg(long)]
        disabled: bool,
        /// Require clients to apply the bundle immediately.
        #[arg(long)]
        force_update: bool,
        /// Explicit bundle ID (UUID); generated by the server when omitted.
        #[arg(long)]
        id: Option<String>,
    },

    /// Show server and schema version.
    Version,
}

fn main() {
    let args = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("Failed to start runtime: {err}");
            std::process::exit(1);
        }
    };

    match runtime.block_on(run(&args)) {
        Ok(body) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string())
            );
        }
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}

/// One HTTP call derived from a subcommand.
#[derive(Debug, PartialEq)]
struct RequestSpec {
    method: Method,
    path: String,
    query: Vec<(&'static str, String)>,
    body: Option<serde_json::Value>,
}

impl RequestSpec {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }
}

/// Map a subcommand onto the request it sends.
///
/// `create --file` reads and hashes the archive here.
fn request_for(command: &Command) -> CtlResult<RequestSpec> {
    let spec = match command {
        Command::List {
            channel,
            platform,
            limit,
            offset,
        } => {
            let mut spec = RequestSpec::new(Method::GET, "/api/bundles");
            if let Some(c) = channel {
                spec.query.push(("channel", c.clone()));
            }
            if let Some(p) = platform {
                spec.query.push(("platform", p.as_str().to_owned()));
            }
            if let Some(l) = limit {
                spec.query.push(("limit", l.to_string()));
            }
            if let Some(o) = offset {
                spec.query.push(("offset", o.to_string()));
            }
            spec
        }
        Command::Get { id } => RequestSpec::new(Method::GET, format!("/api/bundles/{id}")),
        Command::Delete { id } => RequestSpec::new(Method::DELETE, format!("/api/bundles/{id}")),
        Command::Channels => RequestSpec::new(Method::GET, "/api/channels"),
        Command::Version => RequestSpec::new(Method::GET, "/version"),
        Command::Create {
            platform,
            storage_uri,
            file,
            file_hash,
            channel,
            target_app_version,
            fingerprint_hash,
            message,
            git_commit_hash,
            disabled,
            force_update,
            id,
        } => {
            let file_hash = match (file, file_hash) {
                (Some(path), _) => file_sha256(path)?,
                (None, Some(hash)) => hash.clone(),
                (None, None) => return Err("either --file or --file-hash is required".into()),
            };
            let mut payload = serde_json::json!({
                "platform": platform.as_str(),
                "enabled": !disabled,
                "should_force_update": force_update,
                "file_hash": file_hash,
                "channel": channel,
                "storage_uri": storage_uri,
                "target_app_version": target_app_version,
                "fingerprint_hash": fingerprint_hash,
                "message": message,
                "git_commit_hash": git_commit_hash,
            });
            if let Some(id) = id {
                payload["id"] = serde_json::Value::String(id.clone());
            }
            let mut spec = RequestSpec::new(Method::POST, "/api/bundles");
            spec.body = Some(payload);
            spec
        }
    };
    Ok(spec)
}

async fn run(args: &Cli) -> CtlResult<serde_json::Value> {
    let token = args
        .token
        .clone()
        .or_else(|| std::env::var("OTA_RELAY_AUTH_SECRET").ok());
    let base = args.url.trim_end_matches('/');
    let spec = request_for(&args.command)?;

    let client = reqwest::Client::new();
    let mut request = client.request(spec.method, format!("{base}{}", spec.path));
    if !spec.query.is_empty() {
        request = request.query(&spec.query);
    }
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    if let Some(body) = spec.body {
        request = request.json(&body);
    }

    let response = request.send().await.map_err(|err| {
        format!("failed to reach server at {base}: {err}")
    })?;
    let status = response.status();
    let text = response.text().await?;
    let value: serde_json::Value =
        serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text));

    if status.is_success() {
        Ok(value)
    } else {
        Err(describe_failure(status, &value).into())
    }
}

/// Render a non-success response, preferring the server's `message` field.
fn describe_failure(status: StatusCode, body: &serde_json::Value) -> String {
    let detail = body
        .get("message")
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| body.to_string());
    format!("{status}: {detail}")
}

/// Lowercase hex SHA-256 of a file's contents.
fn file_sha256(path: &Path) -> CtlResult<String> {
    let bytes = std::fs::read(path)
        .map_err(|err| format!("cannot read {}: {err}", path.display()))?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}
