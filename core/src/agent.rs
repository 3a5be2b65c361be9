use crate::arm::{ArmClient, ArmError, ArmSettings, ControlPlane};
use crate::auth::{BearerToken, Session, TokenError, TokenManager};
use crate::failover::{
    FailoverExecutor, FailoverOutcome, FailoverState, PollPolicy, StateInspector,
};
use std::net::IpAddr;
use std::sync::Arc;

/// Opens a control-plane connection authenticated with a bearer token.
pub trait Connector: Send + Sync {
    fn connect(&self, token: &BearerToken) -> Result<Arc<dyn ControlPlane>, ArmError>;
}

/// Connects to ARM over HTTPS.
#[derive(Clone, Debug, Default)]
pub struct ArmConnector {
    settings: ArmSettings,
}

impl ArmConnector {
    pub fn new(settings: ArmSettings) -> Self {
        Self { settings }
    }
}

impl Connector for ArmConnector {
    fn connect(&self, token: &BearerToken) -> Result<Arc<dyn ControlPlane>, ArmError> {
        Ok(Arc::new(ArmClient::new(self.settings.clone(), token.clone())?))
    }
}

/// Result of one agent run.
#[derive(Debug)]
pub enum AgentOutcome {
    AuthFailed(TokenError),
    /// This node already owns the backend pool.
    Active,
    /// State could not be determined; nothing was changed.
    Indeterminate,
    /// This node was Standby and a failover was attempted.
    FailedOver(FailoverOutcome),
}

/// Token manager → state inspector → failover executor, run once.
pub struct FailoverAgent {
    tokens: TokenManager,
    connector: Arc<dyn Connector>,
    poll_policy: PollPolicy,
}

impl FailoverAgent {
    pub fn new(tokens: TokenManager, connector: Arc<dyn Connector>, poll_policy: PollPolicy) -> Self {
        Self {
            tokens,
            connector,
            poll_policy,
        }
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Acquires a token without touching the control plane.
    pub async fn check_auth(&self) -> Result<Session, TokenError> {
        self.tokens.acquire().await
    }

    /// Runs one failover cycle for a peer that failed its health probe.
    pub async fn run(&self, local: IpAddr, peer: IpAddr) -> AgentOutcome {
        let session = match self.tokens.acquire().await {
            Ok(session) => session,
            Err(e) => {
                log::error!("ARM auth error: {e}");
                return AgentOutcome::AuthFailed(e);
            }
        };

        let control_plane = match self.connector.connect(&session.token) {
            Ok(control_plane) => control_plane,
            Err(e) => {
                log::error!("Could not open the ARM client: {e}");
                return AgentOutcome::Indeterminate;
            }
        };

        let inspection = StateInspector::new(control_plane.clone(), session.scope.clone())
            .inspect(local, peer)
            .await;

        if inspection.unauthorized {
            if let Err(e) = self.tokens.invalidate() {
                log::error!("Failed to discard the rejected bearer: {e}");
            }
        }

        match inspection.state {
            FailoverState::Active => AgentOutcome::Active,
            FailoverState::Unknown => AgentOutcome::Indeterminate,
            FailoverState::Standby => {
                log::warn!("We're Standby in ARM, Active peer down. Trying to failover...");
                let backend_pools = inspection.backend_pools.unwrap_or_default();
                let outcome = FailoverExecutor::new(control_plane, self.poll_policy.clone())
                    .failover(inspection.active_interface.as_ref(), &backend_pools)
                    .await;
                log::info!("Failover result: {outcome}");
                AgentOutcome::FailedOver(outcome)
            }
        }
    }
}
