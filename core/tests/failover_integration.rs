mod common;

use azure_ha::arm::{
    ArmError, BackendPools, DEFAULT_MANAGEMENT_URL, InterfaceIdentity, ResourceScope,
};
use azure_ha::auth::{TokenError, TokenManager};
use azure_ha::credentials::CredentialsStore;
use azure_ha::failover::{
    FailoverExecutor, FailoverOutcome, FailoverState, OperationOutcome, OperationStatus,
    PollPolicy, StateInspector, SwapStage,
};
use azure_ha::{AgentOutcome, FailoverAgent};
use common::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn scope() -> ResourceScope {
    ResourceScope::new(SUBSCRIPTION, RESOURCE_GROUP)
}

fn interface(name: &str) -> InterfaceIdentity {
    InterfaceIdentity::new(format!("{}/", nic_path(name)))
}

fn pools() -> BackendPools {
    BackendPools::new(vec![json!({ "id": pool_id(), "name": "f5-pool" })])
}

fn fast_policy() -> PollPolicy {
    PollPolicy {
        initial_interval: Duration::from_millis(1),
        max_interval: Duration::from_millis(5),
        multiplier: 2,
        deadline: Duration::from_secs(5),
    }
}

async fn inspect_and_failover(arm: Arc<FakeArm>) -> FailoverOutcome {
    let inspection = StateInspector::new(arm.clone(), scope())
        .inspect(ip(LOCAL_IP), ip(PEER_IP))
        .await;
    assert_eq!(inspection.state, FailoverState::Standby);
    FailoverExecutor::new(arm, fast_policy())
        .failover(
            inspection.active_interface.as_ref(),
            &inspection.backend_pools.unwrap_or_default(),
        )
        .await
}

mod executor {
    use super::*;

    #[tokio::test]
    async fn test_standby_node_takes_over_the_pool() {
        let arm = FakeArm::peer_active();

        let outcome = inspect_and_failover(arm.clone()).await;

        assert_eq!(outcome, FailoverOutcome::Succeeded);
        assert!(arm.is_member("f5-nicB"));
        assert!(!arm.is_member("f5-nicA"));

        let inspection = StateInspector::new(arm, scope())
            .inspect(ip(LOCAL_IP), ip(PEER_IP))
            .await;
        assert_eq!(inspection.state, FailoverState::Active);
    }

    #[tokio::test]
    async fn test_new_interface_is_added_before_old_is_removed() {
        let arm = FakeArm::peer_active();

        inspect_and_failover(arm.clone()).await;

        assert_eq!(arm.puts(), vec![nic_path("f5-nicB"), nic_path("f5-nicA")]);

        let calls = arm.calls();
        let first_put = calls
            .iter()
            .position(|call| matches!(call, Call::Put(_)))
            .unwrap();
        let second_put = calls
            .iter()
            .rposition(|call| matches!(call, Call::Put(_)))
            .unwrap();
        assert!(
            calls[first_put..second_put]
                .iter()
                .any(|call| matches!(call, Call::Poll(_))),
            "the first write must complete before the second is issued"
        );
    }

    #[tokio::test]
    async fn test_written_documents_carry_the_pool_change() {
        let arm = FakeArm::peer_active();

        inspect_and_failover(arm.clone()).await;

        let new_nic = arm.nic("f5-nicB");
        assert_eq!(
            new_nic["properties"]["ipConfigurations"][0]["properties"]
                ["loadBalancerBackendAddressPools"],
            json!([{ "id": pool_id() }])
        );
        assert_eq!(new_nic["properties"]["enableIPForwarding"], json!(true));
        assert_eq!(new_nic["location"], json!("westeurope"));

        let old_nic = arm.nic("f5-nicA");
        assert_eq!(
            old_nic["properties"]["ipConfigurations"][0]["properties"]
                ["loadBalancerBackendAddressPools"],
            json!([])
        );
        assert_eq!(
            old_nic["properties"]["ipConfigurations"][0]["properties"]["privateIPAddress"],
            json!(PEER_IP)
        );
    }

    #[tokio::test]
    async fn test_failed_add_leaves_old_interface_untouched() {
        let arm = FakeArm::peer_active();
        arm.script_operations(vec![vec!["InProgress", "Failed"]]);

        let outcome = inspect_and_failover(arm.clone()).await;

        assert_eq!(
            outcome,
            FailoverOutcome::PartialFailure {
                stage: SwapStage::AddNew,
                outcome: OperationOutcome::Failed(OperationStatus::Failed),
            }
        );
        assert_eq!(arm.puts(), vec![nic_path("f5-nicB")]);
        assert!(arm.is_member("f5-nicA"));
        assert!(!arm.is_member("f5-nicB"));
    }

    #[tokio::test]
    async fn test_failed_remove_leaves_both_members() {
        let arm = FakeArm::peer_active();
        arm.script_operations(vec![vec!["Succeeded"], vec!["Canceled"]]);

        let outcome = inspect_and_failover(arm.clone()).await;

        assert_eq!(
            outcome,
            FailoverOutcome::PartialFailure {
                stage: SwapStage::RemoveOld,
                outcome: OperationOutcome::Failed(OperationStatus::Canceled),
            }
        );
        assert!(arm.is_member("f5-nicA"));
        assert!(arm.is_member("f5-nicB"));
    }

    #[tokio::test]
    async fn test_rejected_write_is_indeterminate() {
        let arm = FakeArm::peer_active();
        arm.fail_put(
            &nic_path("f5-nicB"),
            ArmError::AzureApi {
                operation: "put_resource".to_string(),
                status_code: 409,
                code: "AnotherOperationInProgress".to_string(),
                message: "Another operation on this resource is in progress".to_string(),
                request_id: Some("req-1".to_string()),
            },
        );

        let outcome = inspect_and_failover(arm.clone()).await;

        assert!(matches!(
            outcome,
            FailoverOutcome::PartialFailure {
                stage: SwapStage::AddNew,
                outcome: OperationOutcome::Indeterminate(_),
            }
        ));
        assert!(arm.is_member("f5-nicA"));
    }

    #[tokio::test]
    async fn test_poll_transport_error_is_indeterminate() {
        let arm = FakeArm::peer_active();
        arm.script_operations(vec![vec!["InProgress", "ERROR"]]);

        let outcome = inspect_and_failover(arm.clone()).await;

        assert!(matches!(
            outcome,
            FailoverOutcome::PartialFailure {
                stage: SwapStage::AddNew,
                outcome: OperationOutcome::Indeterminate(_),
            }
        ));
        assert_eq!(arm.puts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_operation_that_never_finishes_times_out() {
        let arm = FakeArm::peer_active();
        arm.script_operations(vec![vec!["InProgress"]]);

        let started = tokio::time::Instant::now();
        let outcome = FailoverExecutor::new(arm.clone(), PollPolicy::default())
            .failover(Some(&interface("f5-nicA")), &pools())
            .await;

        assert_eq!(
            outcome,
            FailoverOutcome::PartialFailure {
                stage: SwapStage::AddNew,
                outcome: OperationOutcome::TimedOut,
            }
        );
        assert!(started.elapsed() <= Duration::from_secs(120));
        assert_eq!(arm.puts().len(), 1);
    }

    #[tokio::test]
    async fn test_synchronous_writes_need_no_polling() {
        let arm = FakeArm::peer_active();
        arm.complete_writes_synchronously();

        let outcome = inspect_and_failover(arm.clone()).await;

        assert_eq!(outcome, FailoverOutcome::Succeeded);
        assert!(!arm.calls().iter().any(|call| matches!(call, Call::Poll(_))));
    }

    #[tokio::test]
    async fn test_empty_pool_is_a_no_op() {
        let arm = FakeArm::empty_pool();

        let outcome = FailoverExecutor::new(arm.clone(), fast_policy())
            .failover(None, &BackendPools::default())
            .await;

        assert_eq!(outcome, FailoverOutcome::NoOp);
        assert!(arm.calls().is_empty());
    }

    #[tokio::test]
    async fn test_interface_without_slot_marker_is_an_error() {
        let arm = FakeArm::with_nics(vec![("f5-nic", PEER_IP, true)]);

        let outcome = FailoverExecutor::new(arm.clone(), fast_policy())
            .failover(Some(&interface("f5-nic")), &pools())
            .await;

        assert!(matches!(outcome, FailoverOutcome::Error(_)));
        assert!(arm.puts().is_empty());
    }

    #[tokio::test]
    async fn test_missing_alternate_interface_is_an_error() {
        let arm = FakeArm::with_nics(vec![("f5-nicA", PEER_IP, true)]);

        let outcome = FailoverExecutor::new(arm.clone(), fast_policy())
            .failover(Some(&interface("f5-nicA")), &pools())
            .await;

        assert!(matches!(outcome, FailoverOutcome::Error(_)));
        assert!(arm.puts().is_empty());
    }

    #[tokio::test]
    async fn test_repeating_a_completed_swap_changes_nothing() {
        let arm = FakeArm::peer_active();
        assert_eq!(inspect_and_failover(arm.clone()).await, FailoverOutcome::Succeeded);
        let puts_after_first = arm.puts().len();

        let inspection = StateInspector::new(arm.clone(), scope())
            .inspect(ip(LOCAL_IP), ip(PEER_IP))
            .await;

        assert_eq!(inspection.state, FailoverState::Active);
        assert_eq!(arm.puts().len(), puts_after_first);
    }
}

mod agent {
    use super::*;

    fn agent(
        dir: &tempfile::TempDir,
        credentials: serde_json::Value,
        arm: Arc<FakeArm>,
    ) -> (FailoverAgent, Arc<FakeIdentityProvider>, std::path::PathBuf) {
        let path = write_credentials(dir, &credentials);
        let provider = FakeIdentityProvider::granting("fresh-token", i64::MAX / 2);
        let tokens = TokenManager::new(
            CredentialsStore::new(path.clone()),
            provider.clone(),
            DEFAULT_MANAGEMENT_URL,
        );
        (
            FailoverAgent::new(tokens, FakeConnector::new(arm), fast_policy()),
            provider,
            path,
        )
    }

    #[tokio::test]
    async fn test_standby_agent_fails_over() {
        let dir = tempfile::tempdir().unwrap();
        let arm = FakeArm::peer_active();
        let (agent, provider, _) = agent(&dir, base_credentials(), arm.clone());

        let outcome = agent.run(ip(LOCAL_IP), ip(PEER_IP)).await;

        assert!(matches!(
            outcome,
            AgentOutcome::FailedOver(FailoverOutcome::Succeeded)
        ));
        assert_eq!(provider.calls(), 1);
        assert!(arm.is_member("f5-nicB"));
    }

    #[tokio::test]
    async fn test_active_agent_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let arm = FakeArm::local_active();
        let (agent, _, _) = agent(&dir, base_credentials(), arm.clone());

        let outcome = agent.run(ip(LOCAL_IP), ip(PEER_IP)).await;

        assert!(matches!(outcome, AgentOutcome::Active));
        assert!(arm.puts().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_state_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let arm = FakeArm::empty_pool();
        let (agent, _, _) = agent(&dir, base_credentials(), arm.clone());

        let outcome = agent.run(ip(LOCAL_IP), ip(PEER_IP)).await;

        assert!(matches!(outcome, AgentOutcome::Indeterminate));
        assert!(arm.puts().is_empty());
    }

    #[tokio::test]
    async fn test_auth_failure_stops_before_the_control_plane() {
        let dir = tempfile::tempdir().unwrap();
        let arm = FakeArm::peer_active();
        let mut credentials = base_credentials();
        credentials.as_object_mut().unwrap().remove("appID");
        let (agent, _, _) = agent(&dir, credentials, arm.clone());

        let outcome = agent.run(ip(LOCAL_IP), ip(PEER_IP)).await;

        assert!(matches!(
            outcome,
            AgentOutcome::AuthFailed(TokenError::CredentialsInvalid(_))
        ));
        assert!(arm.calls().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_bearer_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let arm = FakeArm::peer_active();
        arm.fail_get(
            &load_balancers_path(),
            ArmError::AzureApi {
                operation: "get_resource".to_string(),
                status_code: 401,
                code: "InvalidAuthenticationToken".to_string(),
                message: "The access token is invalid.".to_string(),
                request_id: None,
            },
        );
        let mut credentials = base_credentials();
        credentials["bearer"] = json!(b64("revoked-token"));
        credentials["expiresOn"] = json!(i64::MAX / 2);
        let (agent, provider, path) = agent(&dir, credentials, arm.clone());

        let outcome = agent.run(ip(LOCAL_IP), ip(PEER_IP)).await;

        assert!(matches!(outcome, AgentOutcome::Indeterminate));
        assert_eq!(provider.calls(), 0);
        let stored = read_credentials(&path);
        assert!(stored.get("bearer").is_none());
        assert!(arm.puts().is_empty());
    }

    #[tokio::test]
    async fn test_check_auth_never_touches_the_control_plane() {
        let dir = tempfile::tempdir().unwrap();
        let arm = FakeArm::peer_active();
        let (agent, provider, _) = agent(&dir, base_credentials(), arm.clone());

        let session = agent.check_auth().await.unwrap();

        assert_eq!(session.token.value(), "fresh-token");
        assert_eq!(provider.calls(), 1);
        assert!(arm.calls().is_empty());
    }
}
