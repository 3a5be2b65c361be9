use azure_ha_core::arm::{ArmSettings, DEFAULT_API_VERSION, DEFAULT_MANAGEMENT_URL};
use azure_ha_core::auth::DEFAULT_AUTHORITY_HOST;
use azure_ha_core::credentials::{DEFAULT_PASSPHRASE_ENV, SecretEncoding};
use azure_ha_core::credentials::secrets::DEFAULT_ENV_PREFIX;
use azure_ha_core::failover::PollPolicy;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/azure-ha/config.toml";
pub const DEFAULT_CREDENTIALS_PATH: &str = "/shared/tmp/scripts/azure/azure_ha.json";
pub const DEFAULT_LOG_FILE: &str = "/var/log/azure-ha.log";
pub const DEFAULT_PID_DIR: &str = "/var/run";
/// Prefix of environment overrides, e.g. `AZURE_HA__ARM__API_VERSION`.
pub const ENV_PREFIX: &str = "AZURE_HA";

const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;
const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(String),
    #[error("Failed to deserialize config: {0}")]
    Deserialize(String),
    #[error("Configuration validation failed: {}", join(.0))]
    Invalid(Vec<ConfigValidationError>),
}

fn join(errors: &[ConfigValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid request_timeout_secs: {configured} (min: 1, max: {limit})")]
    RequestTimeout { configured: u64, limit: u64 },
    #[error("Invalid poll.multiplier: {configured} (min: 1)")]
    PollMultiplier { configured: u32 },
    #[error("Invalid poll intervals: initial {initial_ms}ms exceeds max {max_ms}ms")]
    PollIntervals { initial_ms: u64, max_ms: u64 },
    #[error("Invalid poll.deadline_secs: {configured} (min: 1)")]
    PollDeadline { configured: u64 },
    #[error("Unknown auth.secret_source '{0}' (expected 'file' or 'env')")]
    SecretSource(String),
    #[error("Unknown auth.secret_encoding '{0}' (expected 'base64' or 'aes-gcm')")]
    SecretEncoding(String),
}

/// Where the client secret is read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SecretSource {
    /// The `pass` field of the credentials file.
    File,
    /// `<prefix>PASS` in the environment.
    Env { prefix: String },
}

/// Application configuration. Every key is optional.
#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    credentials_file: Option<PathBuf>,
    #[serde(default)]
    arm: ArmConfig,
    #[serde(default)]
    auth: AuthConfig,
    #[serde(default)]
    poll: PollConfig,
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    monitor: MonitorConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct ArmConfig {
    management_url: Option<String>,
    api_version: Option<String>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthConfig {
    authority_host: Option<String>,
    secret_source: Option<String>,
    secret_env_prefix: Option<String>,
    secret_encoding: Option<String>,
    passphrase_env: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PollConfig {
    initial_interval_ms: Option<u64>,
    max_interval_ms: Option<u64>,
    multiplier: Option<u32>,
    deadline_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingConfig {
    file: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MonitorConfig {
    pid_dir: Option<PathBuf>,
    probe_timeout_secs: Option<u64>,
}

impl AppConfig {
    /// Loads `path` (or the default file, if present) layered under
    /// `AZURE_HA__*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let file_source = match path {
            Some(path) => File::from(path).required(true),
            None => File::from(Path::new(DEFAULT_CONFIG_PATH)).required(false),
        };
        let env_source = Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true);

        let config = Config::builder()
            .add_source(file_source)
            .add_source(env_source)
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        let app_config: AppConfig = config
            .try_deserialize()
            .map_err(|e| ConfigError::Deserialize(e.to_string()))?;
        app_config.validate().map_err(ConfigError::Invalid)?;
        Ok(app_config)
    }

    pub fn validate(&self) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        let timeout = self.request_timeout().as_secs();
        if timeout == 0 || timeout > MAX_REQUEST_TIMEOUT_SECS {
            errors.push(ConfigValidationError::RequestTimeout {
                configured: timeout,
                limit: MAX_REQUEST_TIMEOUT_SECS,
            });
        }

        let poll = self.poll_policy();
        if poll.multiplier == 0 {
            errors.push(ConfigValidationError::PollMultiplier {
                configured: poll.multiplier,
            });
        }
        if poll.initial_interval > poll.max_interval {
            errors.push(ConfigValidationError::PollIntervals {
                initial_ms: poll.initial_interval.as_millis() as u64,
                max_ms: poll.max_interval.as_millis() as u64,
            });
        }
        if poll.deadline.is_zero() {
            errors.push(ConfigValidationError::PollDeadline { configured: 0 });
        }

        if let Err(e) = self.secret_source() {
            errors.push(e);
        }
        if let Err(e) = self.secret_encoding() {
            errors.push(e);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    pub fn credentials_file(&self) -> &Path {
        self.credentials_file
            .as_deref()
            .unwrap_or(Path::new(DEFAULT_CREDENTIALS_PATH))
    }

    pub fn request_timeout(&self) -> Duration {
        self.arm
            .request_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(azure_ha_core::arm::context::DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn arm_settings(&self) -> ArmSettings {
        ArmSettings {
            management_url: self
                .arm
                .management_url
                .clone()
                .unwrap_or_else(|| DEFAULT_MANAGEMENT_URL.to_string()),
            api_version: self
                .arm
                .api_version
                .clone()
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            request_timeout: self.request_timeout(),
        }
    }

    pub fn authority_host(&self) -> &str {
        self.auth
            .authority_host
            .as_deref()
            .unwrap_or(DEFAULT_AUTHORITY_HOST)
    }

    pub fn secret_source(&self) -> Result<SecretSource, ConfigValidationError> {
        match self.auth.secret_source.as_deref().unwrap_or("file") {
            "file" => Ok(SecretSource::File),
            "env" => Ok(SecretSource::Env {
                prefix: self
                    .auth
                    .secret_env_prefix
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ENV_PREFIX.to_string()),
            }),
            other => Err(ConfigValidationError::SecretSource(other.to_string())),
        }
    }

    pub fn secret_encoding(&self) -> Result<SecretEncoding, ConfigValidationError> {
        match self.auth.secret_encoding.as_deref().unwrap_or("base64") {
            "base64" => Ok(SecretEncoding::Base64),
            "aes-gcm" => Ok(SecretEncoding::AesGcm {
                passphrase_env: self
                    .auth
                    .passphrase_env
                    .clone()
                    .unwrap_or_else(|| DEFAULT_PASSPHRASE_ENV.to_string()),
            }),
            other => Err(ConfigValidationError::SecretEncoding(other.to_string())),
        }
    }

    pub fn poll_policy(&self) -> PollPolicy {
        let default = PollPolicy::default();
        PollPolicy {
            initial_interval: self
                .poll
                .initial_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(default.initial_interval),
            max_interval: self
                .poll
                .max_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(default.max_interval),
            multiplier: self.poll.multiplier.unwrap_or(default.multiplier),
            deadline: self
                .poll
                .deadline_secs
                .map(Duration::from_secs)
                .unwrap_or(default.deadline),
        }
    }

    pub fn log_file(&self) -> &Path {
        self.logging
            .file
            .as_deref()
            .unwrap_or(Path::new(DEFAULT_LOG_FILE))
    }

    pub fn pid_dir(&self) -> &Path {
        self.monitor
            .pid_dir
            .as_deref()
            .unwrap_or(Path::new(DEFAULT_PID_DIR))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(
            self.monitor
                .probe_timeout_secs
                .unwrap_or(DEFAULT_PROBE_TIMEOUT_SECS),
        )
    }
}
