use super::poller::{OperationOutcome, OperationPoller, PollPolicy};
use crate::arm::resources::set_backend_pools;
use crate::arm::{ArmError, BackendPools, ControlPlane, InterfaceIdentity};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// The two writes of an interface swap, in the order they are issued.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwapStage {
    /// Adding the live node's interface to the backend pool.
    AddNew,
    /// Removing the dead node's interface from the backend pool.
    RemoveOld,
}

impl fmt::Display for SwapStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwapStage::AddNew => f.write_str("add new interface"),
            SwapStage::RemoveOld => f.write_str("remove old interface"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailoverOutcome {
    /// Both writes reached `Succeeded`.
    Succeeded,
    /// A write did not reach `Succeeded`. After [`SwapStage::AddNew`] the old
    /// interface is untouched; after [`SwapStage::RemoveOld`] both
    /// interfaces are members until a later run completes the swap.
    PartialFailure {
        stage: SwapStage,
        outcome: OperationOutcome,
    },
    /// No interface in the backend pool, nothing to move.
    NoOp,
    /// Failed before any write was issued.
    Error(String),
}

impl fmt::Display for FailoverOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailoverOutcome::Succeeded => f.write_str("failover succeeded"),
            FailoverOutcome::PartialFailure { stage, outcome } => {
                write!(f, "failover partially failed at '{stage}': {outcome}")
            }
            FailoverOutcome::NoOp => f.write_str("no interface in the backend pool"),
            FailoverOutcome::Error(reason) => write!(f, "failover error: {reason}"),
        }
    }
}

/// Moves backend pool membership from the current interface to the
/// interface in the other slot.
///
/// The new interface is added before the old one is removed, so an
/// interrupted swap leaves the pool over-populated rather than empty.
pub struct FailoverExecutor {
    control_plane: Arc<dyn ControlPlane>,
    poller: OperationPoller,
}

impl FailoverExecutor {
    pub fn new(control_plane: Arc<dyn ControlPlane>, policy: PollPolicy) -> Self {
        Self {
            poller: OperationPoller::new(control_plane.clone(), policy),
            control_plane,
        }
    }

    pub async fn failover(
        &self,
        current: Option<&InterfaceIdentity>,
        backend_pools: &BackendPools,
    ) -> FailoverOutcome {
        let Some(current) = current else {
            log::warn!("No NICs in the backend pool!");
            return FailoverOutcome::NoOp;
        };

        let (old_nic, new_nic, new_interface) = match self.prepare(current, backend_pools).await {
            Ok(prepared) => prepared,
            Err(e) => {
                log::error!("Failover aborted before any change: {e}");
                return FailoverOutcome::Error(e.to_string());
            }
        };

        log::info!("Adding {new_interface} to the load balancer backend pool...");
        let outcome = self.write(&new_interface, &new_nic).await;
        if !outcome.is_success() {
            log::error!("Adding {new_interface} did not succeed: {outcome}");
            return FailoverOutcome::PartialFailure {
                stage: SwapStage::AddNew,
                outcome,
            };
        }

        log::info!("Removing {current} from the load balancer backend pool...");
        let outcome = self.write(current, &old_nic).await;
        if !outcome.is_success() {
            log::error!("Removing {current} did not succeed: {outcome}");
            return FailoverOutcome::PartialFailure {
                stage: SwapStage::RemoveOld,
                outcome,
            };
        }

        log::info!("Failover to {new_interface} complete");
        FailoverOutcome::Succeeded
    }

    /// Fetches both interfaces and builds their updated documents.
    async fn prepare(
        &self,
        current: &InterfaceIdentity,
        backend_pools: &BackendPools,
    ) -> Result<(Value, Value, InterfaceIdentity), ArmError> {
        let alternate = current.alternate().ok_or_else(|| {
            ArmError::invalid_response(format!("'{current}' does not end in an A/B slot"))
        })?;

        let mut old_nic = self.control_plane.get_resource(current.as_path()).await?;
        set_backend_pools(&mut old_nic, Vec::new())?;

        let mut new_nic = self.control_plane.get_resource(alternate.as_path()).await?;
        set_backend_pools(&mut new_nic, backend_pools.references())?;

        Ok((old_nic, new_nic, alternate))
    }

    async fn write(&self, interface: &InterfaceIdentity, nic: &Value) -> OperationOutcome {
        match self
            .control_plane
            .put_resource(interface.as_path(), nic)
            .await
        {
            Ok(accepted) => self.poller.await_completion(&accepted).await,
            Err(e) => OperationOutcome::Indeterminate(e.to_string()),
        }
    }
}
