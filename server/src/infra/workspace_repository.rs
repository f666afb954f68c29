//! Workspace repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::domain::state::WorkspaceState;
use crate::domain::workspace::{CreateWorkspaceParams, Workspace};
use crate::error::{Error, Result};

const WORKSPACE_COLUMNS: &str = "id, agent_id, user_id, name, namespace, desired_state, \
     actual_state, desired_state_updated_at, actual_state_updated_at, responded_to_agent_at, \
     force_include_all_resources, deployment_resource_version, created_at, updated_at";

/// Database row for workspace
#[derive(Debug, FromRow)]
struct WorkspaceRow {
    id: String,
    agent_id: String,
    user_id: String,
    name: String,
    namespace: String,
    desired_state: String,
    actual_state: String,
    desired_state_updated_at: String,
    actual_state_updated_at: String,
    responded_to_agent_at: Option<String>,
    force_include_all_resources: bool,
    deployment_resource_version: Option<String>,
    created_at: String,
    updated_at: String,
}

fn parse_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
}

impl TryFrom<WorkspaceRow> for Workspace {
    type Error = Error;

    fn try_from(row: WorkspaceRow) -> Result<Self> {
        let desired_state = WorkspaceState::from_str(&row.desired_state).ok_or_else(|| {
            Error::Internal(format!("Invalid desired_state: {}", row.desired_state))
        })?;

        let actual_state = WorkspaceState::from_str(&row.actual_state)
            .ok_or_else(|| Error::Internal(format!("Invalid actual_state: {}", row.actual_state)))?;

        let desired_state_updated_at =
            parse_timestamp(&row.desired_state_updated_at, "desired_state_updated_at")?;
        let actual_state_updated_at =
            parse_timestamp(&row.actual_state_updated_at, "actual_state_updated_at")?;
        let responded_to_agent_at = row
            .responded_to_agent_at
            .as_deref()
            .map(|t| parse_timestamp(t, "responded_to_agent_at"))
            .transpose()?;
        let created_at = parse_timestamp(&row.created_at, "created_at")?;
        let updated_at = parse_timestamp(&row.updated_at, "updated_at")?;

        Ok(Workspace {
            id: row.id,
            agent_id: row.agent_id,
            user_id: row.user_id,
            name: row.name,
            namespace: row.namespace,
            desired_state,
            actual_state,
            desired_state_updated_at,
            actual_state_updated_at,
            responded_to_agent_at,
            force_include_all_resources: row.force_include_all_resources,
            deployment_resource_version: row.deployment_resource_version,
            created_at,
            updated_at,
        })
    }
}

/// Workspace repository for database operations
pub struct WorkspaceRepository {
    pool: SqlitePool,
}

impl WorkspaceRepository {
    /// Create a new repository with the given pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new workspace
    ///
    /// A freshly created workspace is desired-Running; the agent reports
    /// progress from CreationRequested on subsequent polls.
    pub async fn create(
        &self,
        params: CreateWorkspaceParams,
        now: DateTime<Utc>,
    ) -> Result<Workspace> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO workspaces (
                id, agent_id, user_id, name, namespace, desired_state, actual_state,
                desired_state_updated_at, actual_state_updated_at, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&params.agent_id)
        .bind(&params.user_id)
        .bind(&params.name)
        .bind(&params.namespace)
        .bind(WorkspaceState::Running.as_str())
        .bind(WorkspaceState::CreationRequested.as_str())
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.get(&id).await
    }

    /// Get a workspace by ID
    pub async fn get(&self, id: &str) -> Result<Workspace> {
        let row: WorkspaceRow = sqlx::query_as(&format!(
            "SELECT {} FROM workspaces WHERE id = ?",
            WORKSPACE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::WorkspaceNotFound(id.to_string()))?;

        row.try_into()
    }

    /// List all workspaces
    pub async fn list(&self) -> Result<Vec<Workspace>> {
        let rows: Vec<WorkspaceRow> = sqlx::query_as(&format!(
            "SELECT {} FROM workspaces ORDER BY created_at DESC",
            WORKSPACE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    /// Find a workspace by its owning agent and name
    pub async fn find_by_agent_and_name(
        &self,
        agent_id: &str,
        name: &str,
    ) -> Result<Option<Workspace>> {
        let row: Option<WorkspaceRow> = sqlx::query_as(&format!(
            "SELECT {} FROM workspaces WHERE agent_id = ? AND name = ?",
            WORKSPACE_COLUMNS
        ))
        .bind(agent_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.try_into()).transpose()
    }

    /// All workspaces belonging to an agent, in stable id order
    pub async fn find_all_for_agent(&self, agent_id: &str) -> Result<Vec<Workspace>> {
        let rows: Vec<WorkspaceRow> = sqlx::query_as(&format!(
            "SELECT {} FROM workspaces WHERE agent_id = ? ORDER BY id",
            WORKSPACE_COLUMNS
        ))
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    /// Update desired state, bumping its timestamp
    pub async fn update_desired_state(
        &self,
        id: &str,
        state: WorkspaceState,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE workspaces
            SET desired_state = ?, desired_state_updated_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(state.as_str())
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::WorkspaceNotFound(id.to_string()));
        }

        Ok(())
    }

    /// Update agent-reported actual state, bumping its timestamp
    pub async fn update_actual_state(
        &self,
        id: &str,
        state: WorkspaceState,
        deployment_resource_version: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE workspaces
            SET actual_state = ?, actual_state_updated_at = ?,
                deployment_resource_version = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(state.as_str())
        .bind(now.to_rfc3339())
        .bind(deployment_resource_version)
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::WorkspaceNotFound(id.to_string()));
        }

        Ok(())
    }

    /// Update the agent-side resource version without touching state timestamps
    pub async fn update_resource_version(
        &self,
        id: &str,
        deployment_resource_version: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE workspaces
            SET deployment_resource_version = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(deployment_resource_version)
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::WorkspaceNotFound(id.to_string()));
        }

        Ok(())
    }

    /// Set or clear the one-shot force-include flag
    pub async fn set_force_include(
        &self,
        id: &str,
        value: bool,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE workspaces
            SET force_include_all_resources = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(value)
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::WorkspaceNotFound(id.to_string()));
        }

        Ok(())
    }

    /// Record the response checkpoint for a batch of workspaces.
    ///
    /// One statement so the whole selection updates atomically: sets
    /// `responded_to_agent_at` and clears the one-shot force-include flag.
    pub async fn bulk_mark_responded(&self, ids: &[String], now: DateTime<Utc>) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "UPDATE workspaces \
             SET responded_to_agent_at = ?, force_include_all_resources = 0, updated_at = ? \
             WHERE id IN ({})",
            placeholders
        );

        let mut query = sqlx::query(&sql).bind(now.to_rfc3339()).bind(now.to_rfc3339());
        for id in ids {
            query = query.bind(id.as_str());
        }

        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
