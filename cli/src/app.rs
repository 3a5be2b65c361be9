use crate::args::Args;
use crate::config::{AppConfig, SecretSource};
use crate::exit;
use crate::lock::PidLock;
use crate::logger::{self, LogTarget};
use crate::{net, probe};
use anyhow::Context;
use azure_ha_core::auth::{AzureAdProvider, TokenManager};
use azure_ha_core::credentials::{CredentialsStore, EnvSecretStore};
use azure_ha_core::{AgentOutcome, ArmConnector, FailoverAgent};
use std::net::IpAddr;
use std::sync::Arc;

/// Runs the monitor once and returns the process exit code.
pub async fn run(args: Args) -> i32 {
    let config = match AppConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return exit::ARGS;
        }
    };

    let target = if args.log_to_stdout() {
        LogTarget::Stdout
    } else {
        LogTarget::File(config.log_file())
    };
    if let Err(e) = logger::setup_logger(args.log_level(), target) {
        eprintln!("Warning: Failed to initialize logger: {e}");
    }

    // Argument errors win over setup failures.
    let peer = if args.auth {
        None
    } else {
        let Some((raw_addr, peer_port)) = args.peer() else {
            log::error!("Not enough arguments!");
            return exit::ARGS;
        };
        Some((net::normalize_peer_address(raw_addr), peer_port))
    };

    let agent = match build_agent(&config) {
        Ok(agent) => agent,
        Err(e) => {
            log::error!("{e:#}");
            return if args.auth { 1 } else { exit::ARM_AUTH };
        }
    };

    let Some((peer_addr, peer_port)) = peer else {
        return check_auth(&agent).await;
    };

    log::info!("{}", "=".repeat(62));

    let lock_path = PidLock::path_for(config.pid_dir(), &peer_addr, peer_port);
    let lock = match PidLock::acquire(lock_path) {
        Ok(lock) => Some(lock),
        Err(e) => {
            log::error!("Failed to record PID file: {e}");
            None
        }
    };

    if probe::peer_is_up(&peer_addr, peer_port, config.probe_timeout()).await {
        // Any stdout output marks the peer up, so the PID file goes first.
        drop(lock);
        println!("UP");
        return exit::OK;
    }

    log::warn!("Peer down, ARM action required.");
    let code = fail_over(&agent, &peer_addr).await;
    drop(lock);
    code
}

async fn check_auth(agent: &FailoverAgent) -> i32 {
    match agent.check_auth().await {
        Ok(session) => {
            log::info!(
                "ARM authentication OK (subscription {}, resource group {})",
                session.scope.subscription_id,
                session.scope.resource_group
            );
            log::trace!("ARM Bearer: {:?}", session.token);
            exit::OK
        }
        Err(e) => {
            log::error!("ARM Auth Error! {e}");
            exit::auth_code(Some(&e))
        }
    }
}

async fn fail_over(agent: &FailoverAgent, peer_addr: &str) -> i32 {
    let peer: IpAddr = match peer_addr.parse() {
        Ok(peer) => peer,
        Err(_) => {
            log::error!("Peer address '{peer_addr}' is not an IP address");
            return exit::PEER_DOWN;
        }
    };

    let local = match net::local_address_towards(peer).await {
        Ok(local) => local,
        Err(e) => {
            log::error!("Could not determine the local address towards {peer}: {e}");
            return exit::PEER_DOWN;
        }
    };

    match agent.run(local, peer).await {
        AgentOutcome::AuthFailed(_) => {
            log::error!("ARM Auth Error!");
            exit::ARM_AUTH
        }
        AgentOutcome::Active => {
            log::info!("Already Active in ARM, nothing to do");
            exit::PEER_DOWN
        }
        AgentOutcome::Indeterminate => exit::PEER_DOWN,
        AgentOutcome::FailedOver(outcome) => {
            log::info!("Failover finished: {outcome}");
            exit::PEER_DOWN
        }
    }
}

pub fn build_agent(config: &AppConfig) -> anyhow::Result<FailoverAgent> {
    let arm_settings = config.arm_settings();
    let provider = AzureAdProvider::new(config.authority_host(), arm_settings.request_timeout)
        .context("Failed to create the identity provider client")?;
    let encoding = config
        .secret_encoding()
        .context("Invalid secret encoding")?;

    let mut tokens = TokenManager::new(
        CredentialsStore::new(config.credentials_file()),
        Arc::new(provider),
        arm_settings.management_url.clone(),
    )
    .with_encoding(encoding);

    if let SecretSource::Env { prefix } = config.secret_source().context("Invalid secret source")? {
        tokens = tokens.with_secret_store(Arc::new(EnvSecretStore::new(prefix)));
    }

    Ok(FailoverAgent::new(
        tokens,
        Arc::new(ArmConnector::new(arm_settings)),
        config.poll_policy(),
    ))
}
