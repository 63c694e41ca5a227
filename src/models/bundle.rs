//! Bundle model: one deployable release of mobile application code.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppError, Result};

/// Channel used when a create request names none.
pub const DEFAULT_CHANNEL: &str = "production";

static CHANNEL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").ok());

/// Target mobile platform of a bundle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Apple iOS.
    Ios,
    /// Google Android.
    Android,
}

impl Platform {
    /// Lowercase wire and storage representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ios" => Ok(Self::Ios),
            "android" => Ok(Self::Android),
            other => Err(AppError::Validation(format!("unknown platform: {other}"))),
        }
    }
}

/// Stored bundle record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Bundle {
    /// UUID primary key; v7 when generated server-side so ids sort by time.
    pub id: String,
    /// Target platform.
    pub platform: Platform,
    /// Whether clients may receive this bundle.
    pub enabled: bool,
    /// Whether clients must apply the bundle immediately.
    pub should_force_update: bool,
    /// Content hash of the bundle archive.
    pub file_hash: String,
    /// Source commit the bundle was built from.
    pub git_commit_hash: Option<String>,
    /// Release note.
    pub message: Option<String>,
    /// Update track the bundle belongs to.
    pub channel: String,
    /// Location of the bundle archive.
    pub storage_uri: String,
    /// App version range the bundle targets.
    pub target_app_version: Option<String>,
    /// Native fingerprint the bundle targets.
    pub fingerprint_hash: Option<String>,
    /// Free-form JSON object.
    pub metadata: serde_json::Value,
}

impl Bundle {
    /// Check record-level invariants.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` naming the first violated rule.
    pub fn validate(&self) -> Result<()> {
        Uuid::parse_str(&self.id)
            .map_err(|err| AppError::Validation(format!("id is not a uuid: {err}")))?;
        if self.file_hash.trim().is_empty() {
            return Err(AppError::Validation("file_hash must not be empty".into()));
        }
        if self.storage_uri.trim().is_empty() {
            return Err(AppError::Validation("storage_uri must not be empty".into()));
        }
        validate_channel(&self.channel)?;
        let has_version = self
            .target_app_version
            .as_deref()
            .is_some_and(|v| !v.trim().is_empty());
        let has_fingerprint = self
            .fingerprint_hash
            .as_deref()
            .is_some_and(|v| !v.trim().is_empty());
        if !has_version && !has_fingerprint {
            return Err(AppError::Validation(
                "one of target_app_version or fingerprint_hash is required".into(),
            ));
        }
        if !self.metadata.is_object() {
            return Err(AppError::Validation("metadata must be a json object".into()));
        }
        Ok(())
    }
}

/// Check a channel name against the allowed character set.
///
/// # Errors
///
/// Returns `AppError::Validation` if the name is empty or has other characters.
pub fn validate_channel(channel: &str) -> Result<()> {
    let valid = CHANNEL_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(channel));
    if valid {
        Ok(())
    } else {
        Err(AppError::Validation(format!("invalid channel name: {channel:?}")))
    }
}

fn default_true() -> bool {
    true
}

fn default_channel() -> String {
    DEFAULT_CHANNEL.into()
}

fn default_metadata() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Create/upsert payload; omitted fields take server defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct NewBundle {
    /// Client-chosen id; a UUIDv7 is generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Target platform.
    pub platform: Platform,
    /// Defaults to `true`.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Defaults to `false`.
    #[serde(default)]
    pub should_force_update: bool,
    /// Content hash of the bundle archive.
    pub file_hash: String,
    /// Source commit.
    #[serde(default)]
    pub git_commit_hash: Option<String>,
    /// Release note.
    #[serde(default)]
    pub message: Option<String>,
    /// Defaults to `production`.
    #[serde(default = "default_channel")]
    pub channel: String,
    /// Location of the bundle archive.
    pub storage_uri: String,
    /// App version range.
    #[serde(default)]
    pub target_app_version: Option<String>,
    /// Native fingerprint.
    #[serde(default)]
    pub fingerprint_hash: Option<String>,
    /// Defaults to `{}`.
    #[serde(default = "default_metadata")]
    pub metadata: serde_json::Value,
}

impl NewBundle {
    /// Fill defaults and validate, producing a storable record.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if the resulting bundle is invalid.
    pub fn into_bundle(self) -> Result<Bundle> {
        let bundle = Bundle {
            id: self.id.unwrap_or_else(|| Uuid::now_v7().to_string()),
            platform: self.platform,
            enabled: self.enabled,
            should_force_update: self.should_force_update,
            file_hash: self.file_hash,
            git_commit_hash: self.git_commit_hash,
            message: self.message,
            channel: self.channel,
            storage_uri: self.storage_uri,
            target_app_version: self.target_app_version,
            fingerprint_hash: self.fingerprint_hash,
            metadata: self.metadata,
        };
        bundle.validate()?;
        Ok(bundle)
    }
}

/// Listing filter and page window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleFilter {
    /// Restrict to one channel.
    pub channel: Option<String>,
    /// Restrict to one platform.
    pub platform: Option<Platform>,
    /// Page size.
    pub limit: u32,
    /// Rows to skip.
    pub offset: u32,
}
