//! Workspace service

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::domain::state::WorkspaceState;
use crate::domain::workspace::{CreateWorkspaceParams, Workspace};
use crate::error::{Error, Result};
use crate::infra::agent_repository::AgentRepository;
use crate::infra::workspace_repository::WorkspaceRepository;

/// Workspace service for managing workspace lifecycle requests
pub struct WorkspaceService {
    repository: Arc<WorkspaceRepository>,
    agent_repository: Arc<AgentRepository>,
}

impl WorkspaceService {
    /// Create a new workspace service
    pub fn new(
        repository: Arc<WorkspaceRepository>,
        agent_repository: Arc<AgentRepository>,
    ) -> Self {
        Self {
            repository,
            agent_repository,
        }
    }

    /// Create a new workspace
    pub async fn create(&self, params: CreateWorkspaceParams) -> Result<Workspace> {
        info!(
            agent_id = %params.agent_id,
            name = %params.name,
            "Creating workspace"
        );

        // Verify the agent exists
        self.agent_repository.get(&params.agent_id).await?;

        if self
            .repository
            .find_by_agent_and_name(&params.agent_id, &params.name)
            .await?
            .is_some()
        {
            return Err(Error::WorkspaceAlreadyExists(params.name));
        }

        self.repository.create(params, Utc::now()).await
    }

    /// Get a workspace by ID
    pub async fn get(&self, id: &str) -> Result<Workspace> {
        self.repository.get(id).await
    }

    /// List all workspaces
    pub async fn list(&self) -> Result<Vec<Workspace>> {
        self.repository.list().await
    }

    /// Apply a user-driven desired-state change.
    ///
    /// Only externally settable states are accepted; transitional states are
    /// owned by the agent and the lifecycle policy. An equal-state request is
    /// a no-op so the staleness clock is not reset. Optionally raises the
    /// one-shot force-include flag so the next response carries full
    /// resources.
    pub async fn update_desired_state(
        &self,
        id: &str,
        desired_state: WorkspaceState,
        force_include_all_resources: bool,
    ) -> Result<Workspace> {
        if !desired_state.is_user_settable() {
            return Err(Error::DesiredStateNotSettable(
                desired_state.as_str().to_string(),
            ));
        }

        let workspace = self.repository.get(id).await?;
        let now = Utc::now();

        if workspace.desired_state != desired_state {
            info!(
                workspace_id = %id,
                from = workspace.desired_state.as_str(),
                to = desired_state.as_str(),
                "Updating desired state"
            );
            self.repository.update_desired_state(id, desired_state, now).await?;
        }

        if force_include_all_resources && !workspace.force_include_all_resources {
            self.repository.set_force_include(id, true, now).await?;
        }

        self.repository.get(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    use crate::domain::agent::{AgentLifecycleConfig, CreateAgentParams};

    async fn setup() -> (WorkspaceService, String) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test pool");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        let agent_repo = Arc::new(AgentRepository::new(
            pool.clone(),
            AgentLifecycleConfig {
                max_active_hours_before_stop: 36,
                max_stopped_hours_before_termination: 722,
            },
        ));
        let agent = agent_repo
            .create(
                CreateAgentParams {
                    name: "cluster-1".to_string(),
                    config: None,
                },
                Utc::now(),
            )
            .await
            .expect("Failed to create agent");

        let service = WorkspaceService::new(
            Arc::new(WorkspaceRepository::new(pool)),
            agent_repo,
        );
        (service, agent.id)
    }

    fn params(agent_id: &str, name: &str) -> CreateWorkspaceParams {
        CreateWorkspaceParams {
            agent_id: agent_id.to_string(),
            user_id: "user-1".to_string(),
            name: name.to_string(),
            namespace: format!("ns-{}", name),
        }
    }

    #[tokio::test]
    async fn test_create_requires_agent() {
        let (service, _) = setup().await;
        let result = service.create(params("missing", "ws-1")).await;
        assert!(matches!(result, Err(Error::AgentNotFound(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_name() {
        let (service, agent_id) = setup().await;
        service
            .create(params(&agent_id, "ws-1"))
            .await
            .expect("Failed to create workspace");

        let result = service.create(params(&agent_id, "ws-1")).await;
        assert!(matches!(result, Err(Error::WorkspaceAlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_update_desired_state() {
        let (service, agent_id) = setup().await;
        let workspace = service
            .create(params(&agent_id, "ws-1"))
            .await
            .expect("Failed to create workspace");

        let updated = service
            .update_desired_state(&workspace.id, WorkspaceState::Stopped, false)
            .await
            .expect("Failed to update desired state");
        assert_eq!(updated.desired_state, WorkspaceState::Stopped);
    }

    #[tokio::test]
    async fn test_transitional_states_not_settable() {
        let (service, agent_id) = setup().await;
        let workspace = service
            .create(params(&agent_id, "ws-1"))
            .await
            .expect("Failed to create workspace");

        let result = service
            .update_desired_state(&workspace.id, WorkspaceState::Terminating, false)
            .await;
        assert!(matches!(result, Err(Error::DesiredStateNotSettable(_))));
    }

    #[tokio::test]
    async fn test_equal_state_update_keeps_timestamp() {
        let (service, agent_id) = setup().await;
        let workspace = service
            .create(params(&agent_id, "ws-1"))
            .await
            .expect("Failed to create workspace");

        let updated = service
            .update_desired_state(&workspace.id, WorkspaceState::Running, false)
            .await
            .expect("Failed to update desired state");
        assert_eq!(
            updated.desired_state_updated_at,
            workspace.desired_state_updated_at
        );
    }

    #[tokio::test]
    async fn test_force_include_flag() {
        let (service, agent_id) = setup().await;
        let workspace = service
            .create(params(&agent_id, "ws-1"))
            .await
            .expect("Failed to create workspace");

        let updated = service
            .update_desired_state(&workspace.id, WorkspaceState::Running, true)
            .await
            .expect("Failed to update desired state");
        assert!(updated.force_include_all_resources);
    }
}
