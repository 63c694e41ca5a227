//! Global configuration parsing, validation, and credential loading.

use std::env;
use std::fmt;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::{AppError, Result};

/// Keychain service name under which secrets are stored.
pub const KEYRING_SERVICE: &str = "ota-relay";

/// Environment variable holding the admin API secret.
pub const AUTH_SECRET_ENV: &str = "OTA_RELAY_AUTH_SECRET";

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    3000
}

fn default_database_url() -> String {
    "ota-relay.db".into()
}

/// Cloud storage location where bundle archives live.
///
/// The server never talks to the bucket; it only uses the bucket name to
/// check that registered `storage_uri` values point inside it. Credentials
/// are loaded at runtime from the environment, never from the TOML file.
#[derive(Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct StorageConfig {
    /// Cloud region of the bucket.
    #[serde(default)]
    pub region: Option<String>,
    /// Bucket holding bundle archives.
    #[serde(default)]
    pub bucket: Option<String>,
    /// Access key id (populated at runtime).
    #[serde(skip)]
    pub access_key_id: Option<String>,
    /// Secret access key (populated at runtime).
    #[serde(skip)]
    pub secret_access_key: Option<String>,
}

impl StorageConfig {
    /// Whether `uri` lies inside the configured bucket.
    ///
    /// Always `true` when no bucket is configured.
    #[must_use]
    pub fn owns_uri(&self, uri: &str) -> bool {
        match self.bucket.as_deref() {
            Some(bucket) if !bucket.is_empty() => uri
                .strip_prefix("s3://")
                .and_then(|rest| rest.strip_prefix(bucket))
                .is_some_and(|rest| rest.starts_with('/') && rest.len() > 1),
            _ => true,
        }
    }

    /// Whether both storage credentials were supplied.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.access_key_id.is_some() && self.secret_access_key.is_some()
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("access_key_id", &self.access_key_id.as_ref().map(|_| "<redacted>"))
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Global configuration parsed from `config.toml`.
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Interface the HTTP server binds to.
    #[serde(default = "default_host")]
    pub host: String,
    /// HTTP port; `0` binds an ephemeral port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// `SQLite` database file path or `sqlite:` URL.
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Bundle archive storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Shared secret guarding the admin API (populated at runtime).
    #[serde(skip)]
    pub auth_secret: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database_url: default_database_url(),
            storage: StorageConfig::default(),
            auth_secret: String::new(),
        }
    }
}

impl fmt::Debug for GlobalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &self.database_url)
            .field("storage", &self.storage)
            .field("auth_secret", &"<redacted>")
            .finish()
    }
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `OTA_RELAY_*` overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if an override holds an invalid value.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| env::var(key).ok())
    }

    /// Apply overrides resolved through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if an override holds an invalid value.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("OTA_RELAY_PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|err| AppError::Config(format!("OTA_RELAY_PORT invalid: {err}")))?;
        }
        if let Some(url) = lookup("OTA_RELAY_DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(region) = lookup("OTA_RELAY_STORAGE_REGION") {
            self.storage.region = Some(region);
        }
        if let Some(bucket) = lookup("OTA_RELAY_STORAGE_BUCKET") {
            self.storage.bucket = Some(bucket);
        }
        self.validate()
    }

    /// Load the admin secret and storage credentials.
    ///
    /// The admin secret is read from the `ota-relay` keychain service first,
    /// then from `OTA_RELAY_AUTH_SECRET`. Storage credentials are optional and
    /// read from `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if no non-empty admin secret is found.
    pub async fn load_credentials(&mut self) -> Result<()> {
        self.auth_secret = lookup_secret("auth_secret", AUTH_SECRET_ENV)
            .await?
            .ok_or_else(|| {
                AppError::Config(format!(
                    "auth secret not set: store it in the {KEYRING_SERVICE} keychain \
                     or export {AUTH_SECRET_ENV}"
                ))
            })?;

        self.storage.access_key_id = env::var("AWS_ACCESS_KEY_ID").ok().filter(|v| !v.is_empty());
        self.storage.secret_access_key = env::var("AWS_SECRET_ACCESS_KEY")
            .ok()
            .filter(|v| !v.is_empty());
        if self.storage.bucket.is_some() && !self.storage.has_credentials() {
            warn!("storage bucket configured without AWS credentials");
        }
        Ok(())
    }

    /// Socket address the HTTP server binds to.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `host` is not an IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|err| AppError::Config(format!("host invalid: {err}")))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            return Err(AppError::Config("database_url must not be empty".into()));
        }
        self.bind_addr()?;
        if let Some(bucket) = &self.storage.bucket {
            if bucket.is_empty() || bucket.contains('/') {
                return Err(AppError::Config(format!(
                    "storage bucket name invalid: {bucket:?}"
                )));
            }
        }
        Ok(())
    }
}

/// Look up `key` in the `ota-relay` keychain service, then in `env_key`.
///
/// Empty values count as absent in both places. Keychain failures are
/// logged and fall through to the environment.
async fn lookup_secret(key: &'static str, env_key: &str) -> Result<Option<String>> {
    // keyring is synchronous I/O.
    let from_keychain = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match from_keychain {
        Ok(value) if !value.trim().is_empty() => return Ok(Some(value)),
        Ok(_) | Err(keyring::Error::NoEntry) => {}
        Err(err) => warn!(key, %err, "keychain unavailable"),
    }
    Ok(env::var(env_key).ok().filter(|value| !value.trim().is_empty()))
}
