use std::time::Duration;

pub const DEFAULT_MANAGEMENT_URL: &str = "https://management.azure.com/";
pub const DEFAULT_API_VERSION: &str = "2016-03-30";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for the Azure Resource Manager endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArmSettings {
    /// Base URL, also used as the OAuth2 `resource` of the token request.
    pub management_url: String,
    pub api_version: String,
    /// Upper bound for each individual request.
    pub request_timeout: Duration,
}

impl Default for ArmSettings {
    fn default() -> Self {
        Self {
            management_url: DEFAULT_MANAGEMENT_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ArmSettings {
    /// Absolute, versioned URL for a resource path relative to the
    /// management root. Leading and trailing slashes on `path` are ignored.
    pub fn resource_url(&self, path: &str) -> String {
        format!(
            "{}/{}?api-version={}",
            self.management_url.trim_end_matches('/'),
            path.trim_matches('/'),
            self.api_version
        )
    }
}

/// Subscription and resource group the HA pair lives in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceScope {
    pub subscription_id: String,
    pub resource_group: String,
}

impl ResourceScope {
    pub fn new(subscription_id: impl Into<String>, resource_group: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
        }
    }

    pub fn load_balancers_path(&self) -> String {
        format!(
            "subscriptions/{}/resourceGroups/{}/providers/Microsoft.Network/loadBalancers",
            self.subscription_id, self.resource_group
        )
    }
}
