//! Agent service

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::domain::agent::{Agent, AgentLifecycleConfig, CreateAgentParams};
use crate::error::Result;
use crate::infra::agent_repository::AgentRepository;

/// Agent service for registration and configuration
pub struct AgentService {
    repository: Arc<AgentRepository>,
}

impl AgentService {
    /// Create a new agent service
    pub fn new(repository: Arc<AgentRepository>) -> Self {
        Self { repository }
    }

    /// Register a new agent
    pub async fn create(&self, params: CreateAgentParams) -> Result<Agent> {
        info!(name = %params.name, "Registering agent");
        self.repository.create(params, Utc::now()).await
    }

    /// Get an agent by ID
    pub async fn get(&self, id: &str) -> Result<Agent> {
        self.repository.get(id).await
    }

    /// Lifecycle thresholds for an agent
    pub async fn config_for(&self, id: &str) -> Result<AgentLifecycleConfig> {
        self.repository.get(id).await?;
        self.repository.config_for(id).await
    }

    /// Set lifecycle thresholds for an agent
    pub async fn set_config(&self, id: &str, config: AgentLifecycleConfig) -> Result<AgentLifecycleConfig> {
        info!(agent_id = %id, "Updating agent lifecycle config");
        self.repository.set_config(id, config, Utc::now()).await?;
        self.repository.config_for(id).await
    }
}
