use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SUBSCRIPTION_ID_KEY: &str = "subID";
pub const RESOURCE_GROUP_KEY: &str = "rgName";
pub const TENANT_ID_KEY: &str = "tenantID";
pub const APP_ID_KEY: &str = "appID";
pub const SECRET_KEY: &str = "pass";
pub const BEARER_KEY: &str = "bearer";
pub const EXPIRES_ON_KEY: &str = "expiresOn";
pub const SALT_KEY: &str = "salt";

/// Errors raised while reading or writing the credentials file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Credentials file {} is missing", .path.display())]
    Missing { path: PathBuf },

    #[error("Credentials file {} is unreadable: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Credentials file {} is malformed: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("Credentials field '{0}' is missing or not a string")]
    MissingField(&'static str),

    #[error("Credentials field '{field}' is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Failed to write credentials file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The logical credentials record.
///
/// Backed by the raw JSON object so keys this agent does not know about
/// survive a token refresh rewrite.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CredentialsRecord {
    fields: Map<String, Value>,
}

impl CredentialsRecord {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    fn required(&self, key: &'static str) -> Result<&str, StoreError> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(StoreError::MissingField(key))
    }

    pub fn subscription_id(&self) -> Result<&str, StoreError> {
        self.required(SUBSCRIPTION_ID_KEY)
    }

    pub fn resource_group(&self) -> Result<&str, StoreError> {
        self.required(RESOURCE_GROUP_KEY)
    }

    pub fn tenant_id(&self) -> Result<&str, StoreError> {
        self.required(TENANT_ID_KEY)
    }

    pub fn app_id(&self) -> Result<&str, StoreError> {
        self.required(APP_ID_KEY)
    }

    /// The client secret as stored, still encoded.
    pub fn encoded_secret(&self) -> Result<&str, StoreError> {
        self.required(SECRET_KEY)
    }

    pub fn salt(&self) -> Option<&str> {
        self.fields.get(SALT_KEY).and_then(Value::as_str)
    }

    /// The cached bearer (still encoded) and its expiry epoch.
    ///
    /// Returns `Ok(None)` unless both keys are present. The expiry is
    /// accepted as a JSON number or a numeric string, since the identity
    /// provider reports it as a string and older files stored it verbatim.
    pub fn cached_bearer(&self) -> Result<Option<(&str, i64)>, StoreError> {
        let (Some(bearer), Some(expires_on)) = (
            self.fields.get(BEARER_KEY),
            self.fields.get(EXPIRES_ON_KEY),
        ) else {
            return Ok(None);
        };

        let bearer = bearer.as_str().ok_or(StoreError::InvalidField {
            field: BEARER_KEY,
            reason: "expected a string".to_string(),
        })?;
        let expires_on = parse_epoch(expires_on).ok_or_else(|| StoreError::InvalidField {
            field: EXPIRES_ON_KEY,
            reason: format!("expected epoch seconds, got {expires_on}"),
        })?;

        Ok(Some((bearer, expires_on)))
    }

    pub fn set_bearer(&mut self, encoded_bearer: String, expires_on: i64) {
        self.fields
            .insert(BEARER_KEY.to_string(), Value::String(encoded_bearer));
        self.fields
            .insert(EXPIRES_ON_KEY.to_string(), Value::from(expires_on));
    }

    pub fn clear_bearer(&mut self) -> bool {
        let had_bearer = self.fields.remove(BEARER_KEY).is_some();
        let had_expiry = self.fields.remove(EXPIRES_ON_KEY).is_some();
        had_bearer || had_expiry
    }
}

pub(crate) fn parse_epoch(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|float| (i64::MIN as f64..i64::MAX as f64).contains(float))
                .map(|float| float as i64)
        }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// File-backed credentials store.
///
/// Writes go to a temporary file in the same directory which is flushed to
/// disk and then renamed over the original, so a crash mid-write leaves
/// either the old or the new record, never a truncated one.
#[derive(Clone, Debug)]
pub struct CredentialsStore {
    path: PathBuf,
}

impl CredentialsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn load(&self) -> Result<CredentialsRecord, StoreError> {
        if !self.exists() {
            return Err(StoreError::Missing {
                path: self.path.clone(),
            });
        }

        let raw = fs::read_to_string(&self.path).map_err(|source| StoreError::Unreadable {
            path: self.path.clone(),
            source,
        })?;

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(fields)) => Ok(CredentialsRecord::from_fields(fields)),
            Ok(other) => Err(StoreError::Malformed {
                path: self.path.clone(),
                reason: format!("expected a JSON object, found {}", json_kind(&other)),
            }),
            Err(e) => Err(StoreError::Malformed {
                path: self.path.clone(),
                reason: e.to_string(),
            }),
        }
    }

    pub fn save(&self, record: &CredentialsRecord) -> Result<(), StoreError> {
        let contents = render(record).map_err(|e| StoreError::Write {
            path: self.path.clone(),
            source: std::io::Error::other(e),
        })?;

        let temp_path = self.temp_path();
        let result = self.write_and_rename(&temp_path, contents.as_bytes());
        if result.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        result.map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })
    }

    fn write_and_rename(&self, temp_path: &Path, contents: &[u8]) -> std::io::Result<()> {
        let mut file = fs::File::create(temp_path)?;
        if let Ok(metadata) = fs::metadata(&self.path) {
            file.set_permissions(metadata.permissions())?;
        }
        file.write_all(contents)?;
        file.sync_all()?;
        drop(file);
        fs::rename(temp_path, &self.path)
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "credentials.json".to_string());
        self.path
            .with_file_name(format!(".{file_name}.{}.tmp", std::process::id()))
    }
}

/// Pretty-prints with sorted keys and four-space indentation, the layout the
/// credentials file has always had.
fn render(record: &CredentialsRecord) -> Result<String, serde_json::Error> {
    use serde::Serialize;

    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    record.fields.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
