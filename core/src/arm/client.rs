use super::context::ArmSettings;
use super::errors::ArmError;
use crate::auth::BearerToken;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

pub const ASYNC_OPERATION_HEADER: &str = "Azure-AsyncOperation";
pub const REQUEST_ID_HEADER: &str = "x-ms-request-id";
pub const CLIENT_REQUEST_ID_HEADER: &str = "x-ms-client-request-id";

/// What ARM returned for an accepted write.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteAccepted {
    /// Status URL of the long-running operation, when ARM created one.
    pub operation_url: Option<String>,
    pub request_id: Option<String>,
}

/// Authenticated access to the resource-management API.
///
/// Paths are relative to the management root, e.g.
/// `subscriptions/{sub}/resourceGroups/{rg}/providers/...`; leading and
/// trailing slashes are ignored.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn get_resource(&self, path: &str) -> Result<Value, ArmError>;

    async fn put_resource(&self, path: &str, body: &Value) -> Result<WriteAccepted, ArmError>;

    /// Reads the `status` field of an asynchronous operation.
    async fn get_operation_status(&self, operation_url: &str) -> Result<String, ArmError>;
}

/// [`ControlPlane`] over HTTPS with a bearer token.
#[derive(Clone, Debug)]
pub struct ArmClient {
    settings: ArmSettings,
    token: BearerToken,
    http_client: reqwest::Client,
}

impl ArmClient {
    pub fn new(settings: ArmSettings, token: BearerToken) -> Result<Self, ArmError> {
        let http_client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| ArmError::ClientCreation(e.to_string()))?;

        Ok(Self {
            settings,
            token,
            http_client,
        })
    }

    pub fn settings(&self) -> &ArmSettings {
        &self.settings
    }

    fn timeout_secs(&self) -> u64 {
        self.settings.request_timeout.as_secs()
    }

    async fn get_json(&self, url: &str, operation: &str) -> Result<Value, ArmError> {
        let correlation_id = uuid::Uuid::new_v4().to_string();
        log::trace!("GET {url} ({CLIENT_REQUEST_ID_HEADER}: {correlation_id})");

        let response = self
            .http_client
            .get(url)
            .header(AUTHORIZATION, self.token.authorization_header())
            .header(CLIENT_REQUEST_ID_HEADER, &correlation_id)
            .send()
            .await
            .map_err(|e| ArmError::from_transport(url, e, self.timeout_secs()))?;

        if !response.status().is_success() {
            return Err(ArmError::from_response(response, operation).await);
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ArmError::invalid_response(format!("{operation}: {e}")))
    }
}

#[async_trait]
impl ControlPlane for ArmClient {
    async fn get_resource(&self, path: &str) -> Result<Value, ArmError> {
        let url = self.settings.resource_url(path);
        self.get_json(&url, "get_resource").await
    }

    async fn put_resource(&self, path: &str, body: &Value) -> Result<WriteAccepted, ArmError> {
        let url = self.settings.resource_url(path);
        let correlation_id = uuid::Uuid::new_v4().to_string();
        log::trace!("PUT {url} ({CLIENT_REQUEST_ID_HEADER}: {correlation_id})");

        let response = self
            .http_client
            .put(&url)
            .header(AUTHORIZATION, self.token.authorization_header())
            .header(CONTENT_TYPE, "application/json")
            .header(CLIENT_REQUEST_ID_HEADER, &correlation_id)
            .json(body)
            .send()
            .await
            .map_err(|e| ArmError::from_transport(&url, e, self.timeout_secs()))?;

        if !response.status().is_success() {
            return Err(ArmError::from_response(response, "put_resource").await);
        }

        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        };

        let accepted = WriteAccepted {
            operation_url: header(ASYNC_OPERATION_HEADER),
            request_id: header(REQUEST_ID_HEADER),
        };

        log::debug!(
            "ARM async operation, {REQUEST_ID_HEADER}: {}",
            accepted.request_id.as_deref().unwrap_or("<none>")
        );

        Ok(accepted)
    }

    async fn get_operation_status(&self, operation_url: &str) -> Result<String, ArmError> {
        let body = self
            .get_json(operation_url, "get_operation_status")
            .await?;

        body.get("status")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ArmError::invalid_response("operation status has no 'status' field"))
    }
}
