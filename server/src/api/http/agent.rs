//! Agent HTTP handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::domain::agent::{AgentLifecycleConfig, CreateAgentParams};
use crate::{AppState, Result};

// ==================== Request/Response Types ====================

/// Register agent request
#[derive(Debug, Deserialize)]
pub struct CreateAgentRequest {
    pub name: String,
    pub config: Option<AgentLifecycleConfig>,
}

/// Agent response
#[derive(Debug, Serialize)]
pub struct AgentResponse {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

// ==================== Handlers ====================

/// Register a new agent
pub async fn create_agent(
    State(state): State<AppState>,
    Json(req): Json<CreateAgentRequest>,
) -> Result<Json<AgentResponse>> {
    let agent = state
        .agent_service
        .create(CreateAgentParams {
            name: req.name,
            config: req.config,
        })
        .await?;

    Ok(Json(AgentResponse {
        id: agent.id,
        name: agent.name,
        created_at: agent.created_at.to_rfc3339(),
        updated_at: agent.updated_at.to_rfc3339(),
    }))
}

/// Get an agent by ID
pub async fn get_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AgentResponse>> {
    let agent = state.agent_service.get(&id).await?;

    Ok(Json(AgentResponse {
        id: agent.id,
        name: agent.name,
        created_at: agent.created_at.to_rfc3339(),
        updated_at: agent.updated_at.to_rfc3339(),
    }))
}

/// Get lifecycle thresholds for an agent
pub async fn get_agent_config(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AgentLifecycleConfig>> {
    let config = state.agent_service.config_for(&id).await?;
    Ok(Json(config))
}

/// Set lifecycle thresholds for an agent
pub async fn set_agent_config(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AgentLifecycleConfig>,
) -> Result<Json<AgentLifecycleConfig>> {
    let config = state.agent_service.set_config(&id, req).await?;
    Ok(Json(config))
}
