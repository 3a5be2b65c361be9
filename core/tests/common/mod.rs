#![allow(dead_code)]

use async_trait::async_trait;
use azure_ha::Connector;
use azure_ha::arm::{ArmError, ControlPlane, WriteAccepted};
use azure_ha::auth::{
    BearerToken, ClientCredentialsRequest, IdentityProvider, TokenError, TokenGrant,
};
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const SUBSCRIPTION: &str = "sub-ha";
pub const RESOURCE_GROUP: &str = "rg-ha";
pub const LOCAL_IP: &str = "10.0.0.4";
pub const PEER_IP: &str = "10.0.0.5";
pub const NOW: i64 = 1_700_000_000;

pub fn nic_path(name: &str) -> String {
    format!(
        "subscriptions/{SUBSCRIPTION}/resourceGroups/{RESOURCE_GROUP}/providers/Microsoft.Network/networkInterfaces/{name}"
    )
}

pub fn load_balancers_path() -> String {
    format!(
        "subscriptions/{SUBSCRIPTION}/resourceGroups/{RESOURCE_GROUP}/providers/Microsoft.Network/loadBalancers"
    )
}

pub fn pool_id() -> String {
    format!(
        "/subscriptions/{SUBSCRIPTION}/resourceGroups/{RESOURCE_GROUP}/providers/Microsoft.Network/loadBalancers/f5-lb/backendAddressPools/f5-pool"
    )
}

pub fn ip(s: &str) -> std::net::IpAddr {
    s.parse().unwrap()
}

// ---------------------------------------------------------------------------
// Identity provider
// ---------------------------------------------------------------------------

pub enum GrantScript {
    Grant(TokenGrant),
    AuthFailure(&'static str),
    NetworkError(&'static str),
}

pub struct FakeIdentityProvider {
    script: GrantScript,
    calls: AtomicUsize,
    requests: Mutex<Vec<ClientCredentialsRequest>>,
}

impl FakeIdentityProvider {
    pub fn granting(access_token: &str, expires_on: i64) -> Arc<Self> {
        Self::new(GrantScript::Grant(TokenGrant {
            access_token: access_token.to_string(),
            expires_on,
        }))
    }

    pub fn new(script: GrantScript) -> Arc<Self> {
        Arc::new(Self {
            script,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ClientCredentialsRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn client_credentials_grant(
        &self,
        request: &ClientCredentialsRequest,
    ) -> Result<TokenGrant, TokenError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        match &self.script {
            GrantScript::Grant(grant) => Ok(grant.clone()),
            GrantScript::AuthFailure(reason) => Err(TokenError::AuthFailure(reason.to_string())),
            GrantScript::NetworkError(reason) => Err(TokenError::NetworkError(reason.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Credentials file
// ---------------------------------------------------------------------------

pub fn b64(s: &str) -> String {
    use base64::Engine as _;
    base64::engine::general_purpose::STANDARD.encode(s)
}

pub fn base_credentials() -> Value {
    json!({
        "subID": SUBSCRIPTION,
        "rgName": RESOURCE_GROUP,
        "tenantID": "tenant-ha",
        "appID": "app-ha",
        "pass": b64("client-secret"),
    })
}

pub fn write_credentials(dir: &tempfile::TempDir, contents: &Value) -> PathBuf {
    let path = dir.path().join("azure_ha.json");
    std::fs::write(&path, serde_json::to_string_pretty(contents).unwrap()).unwrap();
    path
}

pub fn read_credentials(path: &PathBuf) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

// ---------------------------------------------------------------------------
// Control plane
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Get(String),
    Put(String),
    Poll(String),
}

/// Status sequence reported for one PUT's asynchronous operation. The last
/// entry repeats forever; `"ERROR"` makes the poll fail at the transport.
pub type OperationScript = Vec<&'static str>;

struct Operation {
    statuses: VecDeque<&'static str>,
}

#[derive(Default)]
struct FakeState {
    nics: BTreeMap<String, Value>,
    calls: Vec<Call>,
    scripts: VecDeque<OperationScript>,
    operations: HashMap<String, Operation>,
    get_failures: HashMap<String, ArmError>,
    put_failures: HashMap<String, ArmError>,
    without_operation_header: bool,
}

/// In-memory ARM with one load balancer, one backend pool and NICs whose
/// primary IP configuration is `ipconfig1`. Pool membership is derived from
/// the NICs, as ARM does.
#[derive(Default)]
pub struct FakeArm {
    state: Mutex<FakeState>,
}

fn key(path: &str) -> String {
    path.trim_matches('/').to_string()
}

pub fn nic_document(name: &str, address: &str, member: bool) -> Value {
    let id = format!("/{}", nic_path(name));
    let pools = if member {
        json!([{ "id": pool_id() }])
    } else {
        json!([])
    };
    json!({
        "name": name,
        "id": id,
        "location": "westeurope",
        "etag": "W/\"00000000-0000-0000-0000-000000000000\"",
        "properties": {
            "provisioningState": "Succeeded",
            "enableIPForwarding": true,
            "ipConfigurations": [{
                "name": "ipconfig1",
                "id": format!("{id}/ipConfigurations/ipconfig1"),
                "properties": {
                    "primary": true,
                    "privateIPAddress": address,
                    "privateIPAllocationMethod": "Static",
                    "loadBalancerBackendAddressPools": pools,
                }
            }]
        }
    })
}

impl FakeArm {
    /// `f5-nicA` (peer, 10.0.0.5) owns the pool; `f5-nicB` is the local node.
    pub fn peer_active() -> Arc<Self> {
        Self::with_nics(vec![
            ("f5-nicA", PEER_IP, true),
            ("f5-nicB", LOCAL_IP, false),
        ])
    }

    /// `f5-nicB` (local, 10.0.0.4) owns the pool.
    pub fn local_active() -> Arc<Self> {
        Self::with_nics(vec![
            ("f5-nicA", PEER_IP, false),
            ("f5-nicB", LOCAL_IP, true),
        ])
    }

    /// Neither NIC is in the pool.
    pub fn empty_pool() -> Arc<Self> {
        Self::with_nics(vec![
            ("f5-nicA", PEER_IP, false),
            ("f5-nicB", LOCAL_IP, false),
        ])
    }

    pub fn with_nics(nics: Vec<(&str, &str, bool)>) -> Arc<Self> {
        let fake = Self::default();
        {
            let mut state = fake.state.lock().unwrap();
            for (name, address, member) in nics {
                state
                    .nics
                    .insert(key(&nic_path(name)), nic_document(name, address, member));
            }
        }
        Arc::new(fake)
    }

    /// Queues status sequences for the next PUTs, in order.
    pub fn script_operations(&self, scripts: Vec<OperationScript>) {
        self.state.lock().unwrap().scripts.extend(scripts);
    }

    pub fn fail_get(&self, path: &str, error: ArmError) {
        self.state
            .lock()
            .unwrap()
            .get_failures
            .insert(key(path), error);
    }

    pub fn fail_put(&self, path: &str, error: ArmError) {
        self.state
            .lock()
            .unwrap()
            .put_failures
            .insert(key(path), error);
    }

    pub fn complete_writes_synchronously(&self) {
        self.state.lock().unwrap().without_operation_header = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn puts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Put(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn nic(&self, name: &str) -> Value {
        self.state.lock().unwrap().nics[&key(&nic_path(name))].clone()
    }

    pub fn is_member(&self, name: &str) -> bool {
        is_member(&self.nic(name))
    }

    fn load_balancer_list(state: &FakeState) -> Value {
        let members: Vec<Value> = state
            .nics
            .values()
            .filter(|nic| is_member(nic))
            .map(|nic| json!({ "id": format!("{}/ipConfigurations/ipconfig1", nic["id"].as_str().unwrap()) }))
            .collect();

        json!({
            "value": [{
                "name": "f5-lb",
                "properties": {
                    "backendAddressPools": [{
                        "id": pool_id(),
                        "name": "f5-pool",
                        "properties": { "backendIPConfigurations": members }
                    }]
                }
            }]
        })
    }
}

fn is_member(nic: &Value) -> bool {
    nic.pointer("/properties/ipConfigurations/0/properties/loadBalancerBackendAddressPools")
        .and_then(Value::as_array)
        .is_some_and(|pools| !pools.is_empty())
}

#[async_trait]
impl ControlPlane for FakeArm {
    async fn get_resource(&self, path: &str) -> Result<Value, ArmError> {
        let mut state = self.state.lock().unwrap();
        let path = key(path);
        state.calls.push(Call::Get(path.clone()));

        if let Some(error) = state.get_failures.get(&path) {
            return Err(error.clone());
        }

        if path == load_balancers_path() {
            return Ok(Self::load_balancer_list(&state));
        }

        if let Some(nic) = state.nics.get(&path) {
            return Ok(nic.clone());
        }

        if let Some(nic_key) = path.strip_suffix("/ipConfigurations/ipconfig1") {
            if let Some(nic) = state.nics.get(nic_key) {
                return Ok(nic["properties"]["ipConfigurations"][0].clone());
            }
        }

        Err(ArmError::AzureApi {
            operation: "get_resource".to_string(),
            status_code: 404,
            code: "NotFound".to_string(),
            message: format!("{path} not found"),
            request_id: None,
        })
    }

    async fn put_resource(&self, path: &str, body: &Value) -> Result<WriteAccepted, ArmError> {
        let mut state = self.state.lock().unwrap();
        let path = key(path);
        state.calls.push(Call::Put(path.clone()));

        if let Some(error) = state.put_failures.get(&path) {
            return Err(error.clone());
        }

        let script = state
            .scripts
            .pop_front()
            .unwrap_or_else(|| vec!["Succeeded"]);
        if script.last() == Some(&"Succeeded") {
            state.nics.insert(path.clone(), body.clone());
        }

        if state.without_operation_header {
            return Ok(WriteAccepted::default());
        }

        let url = format!("https://fake.arm/operations/{}", state.operations.len() + 1);
        state.operations.insert(
            url.clone(),
            Operation {
                statuses: script.into_iter().collect(),
            },
        );

        Ok(WriteAccepted {
            operation_url: Some(url),
            request_id: Some("fake-request".to_string()),
        })
    }

    async fn get_operation_status(&self, operation_url: &str) -> Result<String, ArmError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Poll(operation_url.to_string()));

        let operation = state
            .operations
            .get_mut(operation_url)
            .ok_or_else(|| ArmError::invalid_response("unknown operation"))?;

        let status = if operation.statuses.len() > 1 {
            operation.statuses.pop_front().unwrap_or("Succeeded")
        } else {
            operation.statuses.front().copied().unwrap_or("Succeeded")
        };

        if status == "ERROR" {
            return Err(ArmError::RequestFailed {
                url: operation_url.to_string(),
                reason: "connection reset".to_string(),
            });
        }

        Ok(status.to_string())
    }
}

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

pub struct FakeConnector {
    arm: Arc<FakeArm>,
    tokens: Mutex<Vec<BearerToken>>,
}

impl FakeConnector {
    pub fn new(arm: Arc<FakeArm>) -> Arc<Self> {
        Arc::new(Self {
            arm,
            tokens: Mutex::new(Vec::new()),
        })
    }

    pub fn tokens(&self) -> Vec<BearerToken> {
        self.tokens.lock().unwrap().clone()
    }
}

impl Connector for FakeConnector {
    fn connect(&self, token: &BearerToken) -> Result<Arc<dyn ControlPlane>, ArmError> {
        self.tokens.lock().unwrap().push(token.clone());
        Ok(self.arm.clone())
    }
}
