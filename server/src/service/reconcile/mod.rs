//! Workspace reconciliation pipeline
//!
//! Executes once per inbound agent poll. Stages run strictly in order over a
//! shared [`ReconcileContext`]:
//!
//! 1. [`agent_infos`] matches agent-reported state to persisted records and
//!    applies immediate corrections;
//! 2. [`orphans`] logs reported workspaces with no record (side channel);
//! 3. [`lifecycle`] decays desired state on inactivity;
//! 4. [`finder`] selects the workspaces the agent must be told about;
//! 5. [`bookkeeping`] records the response checkpoint.

pub mod agent_infos;
pub mod bookkeeping;
pub mod context;
pub mod finder;
pub mod lifecycle;
pub mod orphans;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::domain::state::{UpdateType, WorkspaceState};
use crate::domain::workspace::AgentInfo;
use crate::error::Result;
use crate::infra::agent_repository::AgentRepository;
use crate::infra::workspace_repository::WorkspaceRepository;
use crate::Config;

use context::ReconcileContext;
use lifecycle::LifecycleThresholds;

/// Workspace state snapshot returned to the agent
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceSnapshot {
    pub id: String,
    pub name: String,
    pub namespace: String,
    pub desired_state: WorkspaceState,
    pub actual_state: WorkspaceState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_resource_version: Option<String>,
    /// Whether the agent must apply full resource definitions for this
    /// workspace rather than a delta
    pub full_resources: bool,
}

/// Reconcile service running the pipeline for agent polls
pub struct ReconcileService {
    workspace_repo: Arc<WorkspaceRepository>,
    agent_repo: Arc<AgentRepository>,
    config: Arc<Config>,
}

impl ReconcileService {
    /// Create a new reconcile service
    pub fn new(
        workspace_repo: Arc<WorkspaceRepository>,
        agent_repo: Arc<AgentRepository>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            workspace_repo,
            agent_repo,
            config,
        }
    }

    /// Run the pipeline for one agent poll
    pub async fn reconcile(
        &self,
        agent_id: &str,
        update_type: UpdateType,
        infos: Vec<AgentInfo>,
    ) -> Result<Vec<WorkspaceSnapshot>> {
        self.reconcile_at(agent_id, update_type, infos, Utc::now()).await
    }

    /// Run the pipeline with an explicit request timestamp.
    ///
    /// `now` is captured once and shared by every write in the request;
    /// re-running with the same timestamp and inputs converges to the same
    /// state.
    pub async fn reconcile_at(
        &self,
        agent_id: &str,
        update_type: UpdateType,
        infos: Vec<AgentInfo>,
        now: DateTime<Utc>,
    ) -> Result<Vec<WorkspaceSnapshot>> {
        let agent = self.agent_repo.get(agent_id).await?;
        let agent_config = self.agent_repo.config_for(agent_id).await?;

        info!(
            agent_id = %agent.id,
            update_type = update_type.as_str(),
            reported = infos.len(),
            "Reconciling workspaces"
        );

        let mut ctx = ReconcileContext::new(agent, update_type, infos, now);

        agent_infos::run(&self.workspace_repo, &mut ctx).await?;
        orphans::observe(&ctx);

        let thresholds = LifecycleThresholds {
            max_hours_before_termination: self.config.max_hours_before_termination,
            max_active_hours_before_stop: agent_config.max_active_hours_before_stop,
            max_stopped_hours_before_termination: agent_config.max_stopped_hours_before_termination,
        };
        lifecycle::run(&self.workspace_repo, &thresholds, &mut ctx).await?;

        finder::run(&self.workspace_repo, &mut ctx).await?;

        // Capture per-workspace resource completeness before bookkeeping
        // clears the one-shot flag.
        let full_resources: Vec<bool> = ctx
            .workspaces_to_be_returned
            .iter()
            .map(|w| update_type == UpdateType::Full || w.force_include_all_resources)
            .collect();

        bookkeeping::run(&self.workspace_repo, &mut ctx).await?;

        let snapshots: Vec<WorkspaceSnapshot> = ctx
            .workspaces_to_be_returned
            .into_iter()
            .zip(full_resources)
            .map(|(w, full)| WorkspaceSnapshot {
                id: w.id,
                name: w.name,
                namespace: w.namespace,
                desired_state: w.desired_state,
                actual_state: w.actual_state,
                deployment_resource_version: w.deployment_resource_version,
                full_resources: full,
            })
            .collect();

        info!(
            agent_id = %ctx.agent.id,
            returned = snapshots.len(),
            "Reconcile complete"
        );

        Ok(snapshots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

    use crate::domain::agent::CreateAgentParams;
    use crate::domain::workspace::CreateWorkspaceParams;
    use crate::error::Error;

    struct Harness {
        pool: SqlitePool,
        workspace_repo: Arc<WorkspaceRepository>,
        service: ReconcileService,
        agent_id: String,
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap()
    }

    async fn harness() -> Harness {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test pool");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        let config = Arc::new(Config::default());
        let workspace_repo = Arc::new(WorkspaceRepository::new(pool.clone()));
        let agent_repo = Arc::new(AgentRepository::new(
            pool.clone(),
            config.default_agent_lifecycle_config(),
        ));

        let agent = agent_repo
            .create(
                CreateAgentParams {
                    name: "cluster-1".to_string(),
                    config: None,
                },
                t0(),
            )
            .await
            .expect("Failed to create agent");

        let service = ReconcileService::new(workspace_repo.clone(), agent_repo, config);

        Harness {
            pool,
            workspace_repo,
            service,
            agent_id: agent.id,
        }
    }

    async fn create_workspace(h: &Harness, name: &str) -> String {
        let workspace = h
            .workspace_repo
            .create(
                CreateWorkspaceParams {
                    agent_id: h.agent_id.clone(),
                    user_id: "user-1".to_string(),
                    name: name.to_string(),
                    namespace: format!("ns-{}", name),
                },
                t0(),
            )
            .await
            .expect("Failed to create workspace");
        workspace.id
    }

    async fn set_states(h: &Harness, id: &str, desired: WorkspaceState, actual: WorkspaceState) {
        sqlx::query("UPDATE workspaces SET desired_state = ?, actual_state = ? WHERE id = ?")
            .bind(desired.as_str())
            .bind(actual.as_str())
            .bind(id)
            .execute(&h.pool)
            .await
            .expect("Failed to set states");
    }

    async fn set_timestamp(h: &Harness, id: &str, column: &str, value: DateTime<Utc>) {
        let sql = format!("UPDATE workspaces SET {} = ? WHERE id = ?", column);
        sqlx::query(&sql)
            .bind(value.to_rfc3339())
            .bind(id)
            .execute(&h.pool)
            .await
            .expect("Failed to set timestamp");
    }

    fn info_for(name: &str, actual: WorkspaceState) -> AgentInfo {
        AgentInfo {
            name: name.to_string(),
            namespace: format!("ns-{}", name),
            actual_state: actual,
            deployment_resource_version: Some("rv-1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_unknown_agent_is_rejected() {
        let h = harness().await;
        let result = h
            .service
            .reconcile_at("nope", UpdateType::Partial, vec![], t0())
            .await;
        assert!(matches!(result, Err(Error::AgentNotFound(_))));
    }

    #[tokio::test]
    async fn test_restart_handshake() {
        let h = harness().await;
        let id = create_workspace(&h, "ws-1").await;
        h.workspace_repo
            .update_desired_state(&id, WorkspaceState::RestartRequested, t0())
            .await
            .expect("Failed to set desired state");

        let now = t0() + chrono::Duration::minutes(5);
        let returned = h
            .service
            .reconcile_at(
                &h.agent_id,
                UpdateType::Partial,
                vec![info_for("ws-1", WorkspaceState::Stopped)],
                now,
            )
            .await
            .expect("Reconcile failed");

        assert_eq!(returned.len(), 1);
        assert_eq!(returned[0].desired_state, WorkspaceState::Running);

        let workspace = h.workspace_repo.get(&id).await.expect("Failed to get workspace");
        assert_eq!(workspace.desired_state, WorkspaceState::Running);
        assert_eq!(workspace.desired_state_updated_at, now);

        // A later poll with the workspace still stopped triggers nothing
        // further: the handshake is complete and the desired state is fresh.
        let later = now + chrono::Duration::minutes(5);
        h.service
            .reconcile_at(
                &h.agent_id,
                UpdateType::Partial,
                vec![info_for("ws-1", WorkspaceState::Stopped)],
                later,
            )
            .await
            .expect("Reconcile failed");

        let workspace = h.workspace_repo.get(&id).await.expect("Failed to get workspace");
        assert_eq!(workspace.desired_state, WorkspaceState::Running);
        assert_eq!(workspace.desired_state_updated_at, now);
    }

    #[tokio::test]
    async fn test_full_sweep_completeness() {
        let h = harness().await;

        let mut ids = Vec::new();
        for i in 1..=7 {
            ids.push(create_workspace(&h, &format!("ws-{}", i)).await);
        }

        // One fully terminated on both sides; the rest in mixed states.
        set_states(&h, &ids[0], WorkspaceState::Terminated, WorkspaceState::Terminated).await;
        set_states(&h, &ids[1], WorkspaceState::Running, WorkspaceState::Running).await;
        set_states(&h, &ids[2], WorkspaceState::Stopped, WorkspaceState::Stopped).await;
        set_states(&h, &ids[3], WorkspaceState::Terminated, WorkspaceState::Terminating).await;
        set_states(&h, &ids[4], WorkspaceState::Running, WorkspaceState::Failed).await;

        let now = t0() + chrono::Duration::minutes(1);
        let returned = h
            .service
            .reconcile_at(
                &h.agent_id,
                UpdateType::Full,
                vec![
                    info_for("ws-2", WorkspaceState::Running),
                    info_for("ws-3", WorkspaceState::Stopped),
                ],
                now,
            )
            .await
            .expect("Reconcile failed");

        let mut returned_ids: Vec<String> = returned.iter().map(|w| w.id.clone()).collect();
        returned_ids.sort();
        let mut expected: Vec<String> = ids[1..].to_vec();
        expected.sort();
        assert_eq!(returned_ids, expected);
        assert!(returned.iter().all(|w| w.full_resources));
    }

    #[tokio::test]
    async fn test_partial_excludes_synced_full_includes_them() {
        let h = harness().await;
        let id_a = create_workspace(&h, "ws-a").await;
        let id_b = create_workspace(&h, "ws-b").await;

        // Checkpoint both after their last state change.
        let responded = t0() + chrono::Duration::minutes(1);
        h.workspace_repo
            .bulk_mark_responded(&[id_a.clone(), id_b.clone()], responded)
            .await
            .expect("Failed to mark responded");

        let now = t0() + chrono::Duration::minutes(10);
        let partial = h
            .service
            .reconcile_at(&h.agent_id, UpdateType::Partial, vec![], now)
            .await
            .expect("Reconcile failed");
        assert!(partial.is_empty());

        let full = h
            .service
            .reconcile_at(&h.agent_id, UpdateType::Full, vec![], now)
            .await
            .expect("Reconcile failed");
        assert_eq!(full.len(), 2);
    }

    #[tokio::test]
    async fn test_in_flight_termination_returned_until_converged() {
        let h = harness().await;
        let id = create_workspace(&h, "ws-1").await;
        set_states(&h, &id, WorkspaceState::Terminated, WorkspaceState::Terminating).await;

        let now = t0() + chrono::Duration::minutes(1);
        let returned = h
            .service
            .reconcile_at(&h.agent_id, UpdateType::Partial, vec![], now)
            .await
            .expect("Reconcile failed");
        assert_eq!(returned.len(), 1);

        // The agent confirms termination; the workspace drops out of every
        // subsequent response.
        let later = now + chrono::Duration::minutes(1);
        let returned = h
            .service
            .reconcile_at(
                &h.agent_id,
                UpdateType::Partial,
                vec![info_for("ws-1", WorkspaceState::Terminated)],
                later,
            )
            .await
            .expect("Reconcile failed");
        assert!(returned.is_empty());

        let full = h
            .service
            .reconcile_at(&h.agent_id, UpdateType::Full, vec![], later)
            .await
            .expect("Reconcile failed");
        assert!(full.is_empty());
    }

    #[tokio::test]
    async fn test_orphans_do_not_affect_selection() {
        let h = harness().await;
        create_workspace(&h, "ws-1").await;
        create_workspace(&h, "ws-2").await;

        let now = t0() + chrono::Duration::minutes(1);
        let without_orphan = h
            .service
            .reconcile_at(
                &h.agent_id,
                UpdateType::Full,
                vec![info_for("ws-1", WorkspaceState::Running)],
                now,
            )
            .await
            .expect("Reconcile failed");

        let later = now + chrono::Duration::minutes(1);
        let with_orphan = h
            .service
            .reconcile_at(
                &h.agent_id,
                UpdateType::Full,
                vec![
                    info_for("ws-1", WorkspaceState::Running),
                    info_for("ws-ghost", WorkspaceState::Running),
                ],
                later,
            )
            .await
            .expect("Reconcile failed");

        let ids = |snapshots: &[WorkspaceSnapshot]| {
            let mut ids: Vec<String> = snapshots.iter().map(|w| w.id.clone()).collect();
            ids.sort();
            ids
        };
        assert_eq!(ids(&without_orphan), ids(&with_orphan));
        assert!(with_orphan.iter().all(|w| w.name != "ws-ghost"));
    }

    #[tokio::test]
    async fn test_bookkeeping_round_trip() {
        let h = harness().await;
        let id_a = create_workspace(&h, "ws-a").await;
        let id_b = create_workspace(&h, "ws-b").await;
        h.workspace_repo
            .set_force_include(&id_a, true, t0())
            .await
            .expect("Failed to set force include");

        let now = t0() + chrono::Duration::minutes(1);
        let returned = h
            .service
            .reconcile_at(&h.agent_id, UpdateType::Partial, vec![], now)
            .await
            .expect("Reconcile failed");
        assert_eq!(returned.len(), 2);
        let forced = returned
            .iter()
            .find(|w| w.id == id_a)
            .expect("forced workspace missing");
        assert!(forced.full_resources);

        for id in [&id_a, &id_b] {
            let workspace = h.workspace_repo.get(id).await.expect("Failed to get workspace");
            assert_eq!(workspace.responded_to_agent_at, Some(now));
            assert!(!workspace.force_include_all_resources);
        }

        // Same timestamp, no state changes, nothing reported: nothing is
        // newly stale, so the next partial response is empty.
        let again = h
            .service
            .reconcile_at(&h.agent_id, UpdateType::Partial, vec![], now)
            .await
            .expect("Reconcile failed");
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn test_terminal_floor() {
        let h = harness().await;
        let id_running = create_workspace(&h, "ws-1").await;
        let id_stopped = create_workspace(&h, "ws-2").await;
        let id_terminated = create_workspace(&h, "ws-3").await;

        set_states(&h, &id_stopped, WorkspaceState::Stopped, WorkspaceState::Stopped).await;
        set_states(&h, &id_terminated, WorkspaceState::Terminated, WorkspaceState::Terminating)
            .await;

        // All three are past the hard age cap (default 120h).
        let ancient = t0() - chrono::Duration::hours(121);
        for id in [&id_running, &id_stopped, &id_terminated] {
            set_timestamp(&h, id, "created_at", ancient).await;
            set_timestamp(&h, id, "desired_state_updated_at", ancient).await;
        }

        let infos = vec![
            info_for("ws-1", WorkspaceState::Running),
            info_for("ws-2", WorkspaceState::Stopped),
            info_for("ws-3", WorkspaceState::Terminating),
        ];
        h.service
            .reconcile_at(&h.agent_id, UpdateType::Partial, infos, t0())
            .await
            .expect("Reconcile failed");

        for id in [&id_running, &id_stopped] {
            let workspace = h.workspace_repo.get(id).await.expect("Failed to get workspace");
            assert_eq!(workspace.desired_state, WorkspaceState::Terminated);
            assert_eq!(workspace.desired_state_updated_at, t0());
        }

        // Already terminated: no write, timestamp untouched.
        let workspace = h
            .workspace_repo
            .get(&id_terminated)
            .await
            .expect("Failed to get workspace");
        assert_eq!(workspace.desired_state, WorkspaceState::Terminated);
        assert_eq!(workspace.desired_state_updated_at, ancient);
    }

    #[tokio::test]
    async fn test_lifecycle_decay_is_idempotent() {
        let h = harness().await;
        let id = create_workspace(&h, "ws-1").await;
        set_timestamp(
            &h,
            &id,
            "desired_state_updated_at",
            t0() - chrono::Duration::hours(37),
        )
        .await;

        let infos = vec![info_for("ws-1", WorkspaceState::Running)];
        h.service
            .reconcile_at(&h.agent_id, UpdateType::Partial, infos.clone(), t0())
            .await
            .expect("Reconcile failed");

        let workspace = h.workspace_repo.get(&id).await.expect("Failed to get workspace");
        assert_eq!(workspace.desired_state, WorkspaceState::Stopped);
        assert_eq!(workspace.desired_state_updated_at, t0());

        // Second run at the same instant: same desired state, no timestamp
        // movement.
        h.service
            .reconcile_at(&h.agent_id, UpdateType::Partial, infos, t0())
            .await
            .expect("Reconcile failed");

        let again = h.workspace_repo.get(&id).await.expect("Failed to get workspace");
        assert_eq!(again.desired_state, WorkspaceState::Stopped);
        assert_eq!(again.desired_state_updated_at, workspace.desired_state_updated_at);
    }

    #[tokio::test]
    async fn test_partial_ordering_is_deterministic() {
        let h = harness().await;
        // Created in this order; reported infos iterate in name order.
        let id_b = create_workspace(&h, "ws-b").await;
        let id_a = create_workspace(&h, "ws-a").await;
        let id_c = create_workspace(&h, "ws-c").await;

        let now = t0() + chrono::Duration::minutes(1);
        let infos = vec![
            info_for("ws-b", WorkspaceState::Running),
            info_for("ws-a", WorkspaceState::Running),
        ];
        let returned = h
            .service
            .reconcile_at(&h.agent_id, UpdateType::Partial, infos, now)
            .await
            .expect("Reconcile failed");

        // Reported workspaces first in request key order, then the
        // remaining stale workspace (never responded) in repository order.
        let returned_ids: Vec<String> = returned.iter().map(|w| w.id.clone()).collect();
        assert_eq!(returned_ids, vec![id_a, id_b, id_c]);
    }
}
