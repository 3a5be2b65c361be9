//! Views over the ARM network resources the failover touches.
//!
//! Network interfaces are handled as raw JSON: the agent rewrites a single
//! property and PUTs the document back, so every other property must
//! round-trip untouched.

use super::errors::ArmError;
use serde_json::{Value, json};
use std::fmt;

const IP_CONFIGURATION_MARKER: &str = "ipConfiguration";

/// One of the two interchangeable interface slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    pub fn other(self) -> Slot {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }

    fn marker(self) -> &'static str {
        match self {
            Slot::A => "A/",
            Slot::B => "B/",
        }
    }
}

/// Resource path of a network interface, without the leading `/` and with
/// a trailing `/`, e.g. `subscriptions/.../networkInterfaces/f5-nicA/`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InterfaceIdentity(String);

impl InterfaceIdentity {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Derives the owning interface from a backend IP configuration id
    /// (`/subscriptions/.../networkInterfaces/nicA/ipConfigurations/ipconfig1`).
    pub fn from_ip_configuration_id(id: &str) -> Result<Self, ArmError> {
        let path = id.trim_start_matches('/');
        let end = path.find(IP_CONFIGURATION_MARKER).ok_or_else(|| {
            ArmError::invalid_response(format!("'{id}' is not an IP configuration id"))
        })?;
        Ok(Self(path[..end].to_string()))
    }

    pub fn as_path(&self) -> &str {
        &self.0
    }

    pub fn slot(&self) -> Option<Slot> {
        if self.0.ends_with(Slot::A.marker()) {
            Some(Slot::A)
        } else if self.0.ends_with(Slot::B.marker()) {
            Some(Slot::B)
        } else {
            None
        }
    }

    /// The interface in the other slot: the trailing `A/` becomes `B/` and
    /// vice versa. `None` when the path carries no slot marker.
    pub fn alternate(&self) -> Option<InterfaceIdentity> {
        let slot = self.slot()?;
        let stem = &self.0[..self.0.len() - slot.marker().len()];
        Some(Self(format!("{stem}{}", slot.other().marker())))
    }
}

impl fmt::Display for InterfaceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The load balancer's backend address pools, as fetched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BackendPools(Vec<Value>);

impl BackendPools {
    pub fn new(pools: Vec<Value>) -> Self {
        Self(pools)
    }

    /// Reads `value[0].properties.backendAddressPools` from a load balancer
    /// list response.
    pub fn from_load_balancer_list(list: &Value) -> Result<Self, ArmError> {
        let load_balancer = list
            .get("value")
            .and_then(Value::as_array)
            .and_then(|balancers| balancers.first())
            .ok_or_else(|| ArmError::invalid_response("no load balancer in resource group"))?;

        let pools = load_balancer
            .pointer("/properties/backendAddressPools")
            .and_then(Value::as_array)
            .ok_or_else(|| ArmError::invalid_response("load balancer has no backendAddressPools"))?;

        Ok(Self(pools.clone()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn pools(&self) -> &[Value] {
        &self.0
    }

    /// Id of the first backend IP configuration of the first pool.
    pub fn first_backend_ip_configuration(&self) -> Option<&str> {
        self.0
            .first()?
            .pointer("/properties/backendIPConfigurations/0/id")
            .and_then(Value::as_str)
    }

    /// `{"id": ...}` references suitable for a NIC's
    /// `loadBalancerBackendAddressPools`.
    pub fn references(&self) -> Vec<Value> {
        self.0
            .iter()
            .filter_map(|pool| pool.get("id").and_then(Value::as_str))
            .map(|id| json!({ "id": id }))
            .collect()
    }
}

/// Private address of an IP configuration resource.
pub fn private_ip_address(ip_configuration: &Value) -> Result<&str, ArmError> {
    ip_configuration
        .pointer("/properties/privateIPAddress")
        .and_then(Value::as_str)
        .ok_or_else(|| ArmError::invalid_response("IP configuration has no privateIPAddress"))
}

/// The NIC's primary IP configuration: the one flagged `primary`, or the
/// first when none is.
fn primary_ip_configuration_mut(nic: &mut Value) -> Option<&mut Value> {
    let configurations = nic
        .pointer_mut("/properties/ipConfigurations")?
        .as_array_mut()?;

    let index = configurations
        .iter()
        .position(|config| {
            config
                .pointer("/properties/primary")
                .and_then(Value::as_bool)
                .unwrap_or(false)
        })
        .unwrap_or(0);

    configurations.get_mut(index)
}

/// Replaces the backend pool membership of the NIC's primary IP
/// configuration.
pub fn set_backend_pools(nic: &mut Value, pools: Vec<Value>) -> Result<(), ArmError> {
    let properties = primary_ip_configuration_mut(nic)
        .and_then(|config| config.get_mut("properties"))
        .and_then(Value::as_object_mut)
        .ok_or_else(|| ArmError::invalid_response("network interface has no IP configuration"))?;

    properties.insert(
        "loadBalancerBackendAddressPools".to_string(),
        Value::Array(pools),
    );
    Ok(())
}
