//! Configuration types and loading.
//!
//! Non-secret settings come from an optional TOML file; every field has a
//! default so the file may be absent. Credentials come from the environment
//! (after `.env` has been loaded) and are validated against the chosen sink.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use archiver_engine::{
    ClientSettings, FetchFailurePolicy, MessageShape, DEFAULT_FIRESTORE_BASE, DEFAULT_GCS_BASE,
    DEFAULT_SLACK_API_BASE, MAX_BATCH_WRITES, SNAPSHOT_FILENAME,
};
use serde::Deserialize;

pub const SLACK_TOKEN_VAR: &str = "SLACK_TOKEN";
pub const PROJECT_ID_VAR: &str = "GOOGLE_CLOUD_PROJECT";
pub const CREDENTIALS_PATH_VAR: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Which destination receives the archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// One JSON file on local disk.
    #[default]
    File,
    /// JSON file uploaded to a Cloud Storage bucket.
    Bucket,
    /// One Firestore document per message.
    Firestore,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeSetting {
    #[default]
    Raw,
    Normalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicySetting {
    TreatAsEmpty,
    Abort,
}

/// Top-level application config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub sink: SinkKind,
    pub message_shape: ShapeSetting,
    /// Unset means the sink decides (file and bucket keep going, firestore aborts).
    pub failure_policy: Option<FailurePolicySetting>,
    pub slack: SlackConfig,
    pub http: HttpConfig,
    pub file: FileConfig,
    pub bucket: BucketConfig,
    pub firestore: FirestoreConfig,
    pub log: LogConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SlackConfig {
    pub api_base: String,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_SLACK_API_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        let defaults = ClientSettings::default();
        Self {
            connect_timeout_secs: defaults.connect_timeout.as_secs(),
            request_timeout_secs: defaults.request_timeout.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub output_path: PathBuf,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from(SNAPSHOT_FILENAME),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BucketConfig {
    pub name: String,
    pub destination: String,
    /// Local file uploaded after the run (default: `<temp dir>/allMessages.json`).
    pub staging_path: Option<PathBuf>,
    pub api_base: String,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            name: "ctrlpanel-ai".to_string(),
            destination: SNAPSHOT_FILENAME.to_string(),
            staging_path: None,
            api_base: DEFAULT_GCS_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FirestoreConfig {
    /// Top-level collection holding one document per channel.
    pub company: String,
    pub batch_size: usize,
    pub api_base: String,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            company: "workspace".to_string(),
            batch_size: MAX_BATCH_WRITES,
            api_base: DEFAULT_FIRESTORE_BASE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Reads the TOML file at `path`, or returns defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        if config.sink == SinkKind::Firestore && config.firestore.company.trim().is_empty() {
            bail!("firestore.company must not be empty");
        }
        if config.sink == SinkKind::Bucket && config.bucket.name.trim().is_empty() {
            bail!("bucket.name must not be empty");
        }
        if config.http.connect_timeout_secs == 0 {
            bail!("http.connect_timeout_secs must be at least 1");
        }
        if config.http.request_timeout_secs == 0 {
            bail!("http.request_timeout_secs must be at least 1");
        }
        Ok(config)
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            connect_timeout: Duration::from_secs(self.http.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.http.request_timeout_secs),
            ..ClientSettings::default()
        }
    }

    pub fn message_shape(&self) -> MessageShape {
        match self.message_shape {
            ShapeSetting::Raw => MessageShape::Raw,
            ShapeSetting::Normalized => MessageShape::Normalized,
        }
    }

    pub fn failure_policy(&self) -> Option<FetchFailurePolicy> {
        self.failure_policy.map(|policy| match policy {
            FailurePolicySetting::TreatAsEmpty => FetchFailurePolicy::TreatAsEmpty,
            FailurePolicySetting::Abort => FetchFailurePolicy::Abort,
        })
    }
}

/// Credentials and project identity taken from the environment.
#[derive(Clone)]
pub struct Secrets {
    pub slack_token: String,
    pub project_id: Option<String>,
    pub credentials_path: Option<PathBuf>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("slack_token", &"[REDACTED]")
            .field("project_id", &self.project_id)
            .field("credentials_path", &self.credentials_path)
            .finish()
    }
}

impl Secrets {
    pub fn from_env(sink: SinkKind) -> Result<Self> {
        Self::from_lookup(sink, |name| std::env::var(name).ok())
    }

    /// Fails when a value the sink needs is missing or blank.
    pub fn from_lookup(sink: SinkKind, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let value = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let slack_token = value(SLACK_TOKEN_VAR)
            .with_context(|| format!("{SLACK_TOKEN_VAR} is not set"))?;

        let needs_google = matches!(sink, SinkKind::Bucket | SinkKind::Firestore);
        let project_id = value(PROJECT_ID_VAR);
        let credentials_path = value(CREDENTIALS_PATH_VAR).map(PathBuf::from);
        if needs_google {
            if project_id.is_none() {
                bail!("{PROJECT_ID_VAR} is not set");
            }
            if credentials_path.is_none() {
                bail!("{CREDENTIALS_PATH_VAR} is not set");
            }
        }

        Ok(Self {
            slack_token,
            project_id,
            credentials_path,
        })
    }
}
