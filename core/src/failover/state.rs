use crate::arm::resources::private_ip_address;
use crate::arm::{ArmError, BackendPools, ControlPlane, InterfaceIdentity, ResourceScope};
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

/// The local node's role as recorded in the load balancer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailoverState {
    /// The backend pool points at this node.
    Active,
    /// The backend pool points at the (unresponsive) peer.
    Standby,
    /// Could not tell; never acted upon.
    Unknown,
}

impl fmt::Display for FailoverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailoverState::Active => f.write_str("Active"),
            FailoverState::Standby => f.write_str("Standby"),
            FailoverState::Unknown => f.write_str("Unknown"),
        }
    }
}

/// Classifies the local node from the address of the backend pool owner.
pub fn classify(local: IpAddr, peer: IpAddr, owner: Option<IpAddr>) -> FailoverState {
    match owner {
        Some(owner) if owner == local => FailoverState::Active,
        Some(owner) if owner == peer => FailoverState::Standby,
        _ => FailoverState::Unknown,
    }
}

/// Result of one inspection, carrying what the failover needs.
#[derive(Clone, Debug)]
pub struct Inspection {
    pub state: FailoverState,
    /// Interface currently in the backend pool, if any.
    pub active_interface: Option<InterfaceIdentity>,
    pub backend_pools: Option<BackendPools>,
    /// ARM rejected the bearer token.
    pub unauthorized: bool,
}

impl Inspection {
    fn unknown() -> Self {
        Self {
            state: FailoverState::Unknown,
            active_interface: None,
            backend_pools: None,
            unauthorized: false,
        }
    }
}

/// Derives the local node's failover state from live control-plane data.
pub struct StateInspector {
    control_plane: Arc<dyn ControlPlane>,
    scope: ResourceScope,
}

impl StateInspector {
    pub fn new(control_plane: Arc<dyn ControlPlane>, scope: ResourceScope) -> Self {
        Self {
            control_plane,
            scope,
        }
    }

    /// Never fails: every lookup error degrades to [`FailoverState::Unknown`].
    pub async fn inspect(&self, local: IpAddr, peer: IpAddr) -> Inspection {
        log::debug!(
            "Current local private IP: {local}, resource group: {}",
            self.scope.resource_group
        );

        let mut inspection = Inspection::unknown();
        match self.observe(&mut inspection).await {
            Ok(owner) => {
                log::debug!("Current private IP in Azure RM: {owner}");
                inspection.state = classify(local, peer, Some(owner));
            }
            Err(e) => {
                inspection.unauthorized = e.is_unauthorized();
                log::error!("State inspection failed: {e}");
            }
        }

        match inspection.state {
            FailoverState::Active => log::info!("Current state: Active"),
            FailoverState::Standby => log::info!("Current state: Standby"),
            FailoverState::Unknown => log::warn!("Current state: Unknown"),
        }

        inspection
    }

    async fn observe(&self, inspection: &mut Inspection) -> Result<IpAddr, ArmError> {
        let list = self
            .control_plane
            .get_resource(&self.scope.load_balancers_path())
            .await?;
        let pools = BackendPools::from_load_balancer_list(&list)?;
        let configuration_id = pools.first_backend_ip_configuration().map(str::to_string);
        inspection.backend_pools = Some(pools);

        let configuration_id = configuration_id
            .ok_or_else(|| ArmError::invalid_response("backend pool has no IP configurations"))?;
        inspection.active_interface = Some(InterfaceIdentity::from_ip_configuration_id(
            &configuration_id,
        )?);

        let configuration = self.control_plane.get_resource(&configuration_id).await?;
        let address = private_ip_address(&configuration)?;
        address.parse().map_err(|_| {
            ArmError::invalid_response(format!("'{address}' is not an IP address"))
        })
    }
}
