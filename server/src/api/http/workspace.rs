//! Workspace HTTP handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::domain::state::WorkspaceState;
use crate::domain::workspace::{CreateWorkspaceParams, Workspace};
use crate::error::Error;
use crate::{AppState, Result};

// ==================== Request/Response Types ====================

/// Create workspace request
#[derive(Debug, Deserialize)]
pub struct CreateWorkspaceRequest {
    pub agent_id: String,
    pub user_id: String,
    pub name: String,
    pub namespace: String,
}

/// Update workspace request
#[derive(Debug, Deserialize)]
pub struct UpdateWorkspaceRequest {
    pub desired_state: String,
    pub force_include_all_resources: Option<bool>,
}

/// Workspace response
#[derive(Debug, Serialize)]
pub struct WorkspaceResponse {
    pub id: String,
    pub agent_id: String,
    pub user_id: String,
    pub name: String,
    pub namespace: String,
    pub desired_state: String,
    pub actual_state: String,
    pub desired_state_updated_at: String,
    pub actual_state_updated_at: String,
    pub responded_to_agent_at: Option<String>,
    pub force_include_all_resources: bool,
    pub deployment_resource_version: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Workspace> for WorkspaceResponse {
    fn from(w: Workspace) -> Self {
        WorkspaceResponse {
            id: w.id,
            agent_id: w.agent_id,
            user_id: w.user_id,
            name: w.name,
            namespace: w.namespace,
            desired_state: w.desired_state.as_str().to_string(),
            actual_state: w.actual_state.as_str().to_string(),
            desired_state_updated_at: w.desired_state_updated_at.to_rfc3339(),
            actual_state_updated_at: w.actual_state_updated_at.to_rfc3339(),
            responded_to_agent_at: w.responded_to_agent_at.map(|t| t.to_rfc3339()),
            force_include_all_resources: w.force_include_all_resources,
            deployment_resource_version: w.deployment_resource_version,
            created_at: w.created_at.to_rfc3339(),
            updated_at: w.updated_at.to_rfc3339(),
        }
    }
}

/// List workspaces response
#[derive(Debug, Serialize)]
pub struct ListWorkspacesResponse {
    pub workspaces: Vec<WorkspaceResponse>,
    pub total: usize,
}

// ==================== Handlers ====================

/// Create a new workspace
pub async fn create_workspace(
    State(state): State<AppState>,
    Json(req): Json<CreateWorkspaceRequest>,
) -> Result<Json<WorkspaceResponse>> {
    let workspace = state
        .workspace_service
        .create(CreateWorkspaceParams {
            agent_id: req.agent_id,
            user_id: req.user_id,
            name: req.name,
            namespace: req.namespace,
        })
        .await?;

    Ok(Json(workspace.into()))
}

/// Get a workspace by ID
pub async fn get_workspace(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WorkspaceResponse>> {
    let workspace = state.workspace_service.get(&id).await?;
    Ok(Json(workspace.into()))
}

/// List all workspaces
pub async fn list_workspaces(
    State(state): State<AppState>,
) -> Result<Json<ListWorkspacesResponse>> {
    let workspaces = state.workspace_service.list().await?;
    let total = workspaces.len();

    Ok(Json(ListWorkspacesResponse {
        workspaces: workspaces.into_iter().map(Into::into).collect(),
        total,
    }))
}

/// Apply a user-driven desired-state change
pub async fn update_workspace(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateWorkspaceRequest>,
) -> Result<Json<WorkspaceResponse>> {
    let desired_state = WorkspaceState::from_str(&req.desired_state)
        .ok_or_else(|| Error::InvalidWorkspaceState(req.desired_state.clone()))?;

    let workspace = state
        .workspace_service
        .update_desired_state(
            &id,
            desired_state,
            req.force_include_all_resources.unwrap_or(false),
        )
        .await?;

    Ok(Json(workspace.into()))
}
