//! Agent repository for database operations

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::domain::agent::{Agent, AgentLifecycleConfig, CreateAgentParams};
use crate::error::{Error, Result};

/// Database row for agent
#[derive(Debug, FromRow)]
struct AgentRow {
    id: String,
    name: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<AgentRow> for Agent {
    type Error = Error;

    fn try_from(row: AgentRow) -> Result<Self> {
        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .map_err(|e| Error::Internal(format!("Failed to parse created_at: {}", e)))?
            .with_timezone(&Utc);

        let updated_at = DateTime::parse_from_rfc3339(&row.updated_at)
            .map_err(|e| Error::Internal(format!("Failed to parse updated_at: {}", e)))?
            .with_timezone(&Utc);

        Ok(Agent {
            id: row.id,
            name: row.name,
            created_at,
            updated_at,
        })
    }
}

/// Agent repository for database operations
///
/// Lifecycle configs are read on every reconcile poll, so `config_for` keeps
/// a read-through cache invalidated by `set_config`.
pub struct AgentRepository {
    pool: SqlitePool,
    default_config: AgentLifecycleConfig,
    config_cache: DashMap<String, AgentLifecycleConfig>,
}

impl AgentRepository {
    /// Create a new repository with the given pool and server-wide defaults
    pub fn new(pool: SqlitePool, default_config: AgentLifecycleConfig) -> Self {
        Self {
            pool,
            default_config,
            config_cache: DashMap::new(),
        }
    }

    /// Register a new agent
    pub async fn create(&self, params: CreateAgentParams, now: DateTime<Utc>) -> Result<Agent> {
        if self.find_by_name(&params.name).await?.is_some() {
            return Err(Error::AgentAlreadyExists(params.name));
        }

        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO agents (id, name, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&params.name)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        if let Some(config) = params.config {
            self.set_config(&id, config, now).await?;
        }

        self.get(&id).await
    }

    /// Get an agent by ID
    pub async fn get(&self, id: &str) -> Result<Agent> {
        let row: AgentRow = sqlx::query_as(
            r#"
            SELECT id, name, created_at, updated_at
            FROM agents
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::AgentNotFound(id.to_string()))?;

        row.try_into()
    }

    /// Find an agent by name
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Agent>> {
        let row: Option<AgentRow> = sqlx::query_as(
            r#"
            SELECT id, name, created_at, updated_at
            FROM agents
            WHERE name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.try_into()).transpose()
    }

    /// Lifecycle thresholds for an agent, falling back to server defaults
    pub async fn config_for(&self, agent_id: &str) -> Result<AgentLifecycleConfig> {
        if let Some(config) = self.config_cache.get(agent_id) {
            return Ok(*config);
        }

        let row: Option<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT max_active_hours_before_stop, max_stopped_hours_before_termination
            FROM agent_configs
            WHERE agent_id = ?
            "#,
        )
        .bind(agent_id)
        .fetch_optional(&self.pool)
        .await?;

        let config = match row {
            Some((active, stopped)) => AgentLifecycleConfig {
                max_active_hours_before_stop: active,
                max_stopped_hours_before_termination: stopped,
            },
            None => self.default_config,
        };

        self.config_cache.insert(agent_id.to_string(), config);
        Ok(config)
    }

    /// Set lifecycle thresholds for an agent
    pub async fn set_config(
        &self,
        agent_id: &str,
        config: AgentLifecycleConfig,
        now: DateTime<Utc>,
    ) -> Result<()> {
        // Verify the agent exists before writing config
        self.get(agent_id).await?;

        sqlx::query(
            r#"
            INSERT INTO agent_configs (
                agent_id, max_active_hours_before_stop,
                max_stopped_hours_before_termination, updated_at
            )
            VALUES (?, ?, ?, ?)
            ON CONFLICT(agent_id) DO UPDATE SET
                max_active_hours_before_stop = excluded.max_active_hours_before_stop,
                max_stopped_hours_before_termination = excluded.max_stopped_hours_before_termination,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(agent_id)
        .bind(config.max_active_hours_before_stop)
        .bind(config.max_stopped_hours_before_termination)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.config_cache.insert(agent_id.to_string(), config);
        Ok(())
    }
}
