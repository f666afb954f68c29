//! Reconcile HTTP handler
//!
//! The poll endpoint for cluster agents. Agent-reported state values are
//! validated here, before anything enters the pipeline.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::domain::state::{UpdateType, WorkspaceState};
use crate::domain::workspace::AgentInfo;
use crate::error::Error;
use crate::service::reconcile::WorkspaceSnapshot;
use crate::{AppState, Result};

// ==================== Request/Response Types ====================

/// One agent-reported workspace
#[derive(Debug, Deserialize)]
pub struct WorkspaceAgentInfoPayload {
    pub name: String,
    pub namespace: String,
    pub actual_state: String,
    pub deployment_resource_version: Option<String>,
}

/// Reconcile request
#[derive(Debug, Deserialize)]
pub struct ReconcileRequest {
    pub update_type: String,
    #[serde(default)]
    pub workspace_agent_infos: Vec<WorkspaceAgentInfoPayload>,
}

/// Reconcile response
#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub workspaces: Vec<WorkspaceSnapshot>,
}

impl WorkspaceAgentInfoPayload {
    fn into_agent_info(self) -> Result<AgentInfo> {
        let actual_state = WorkspaceState::from_str(&self.actual_state)
            .ok_or_else(|| Error::InvalidWorkspaceState(self.actual_state.clone()))?;

        Ok(AgentInfo {
            name: self.name,
            namespace: self.namespace,
            actual_state,
            deployment_resource_version: self.deployment_resource_version,
        })
    }
}

// ==================== Handler ====================

/// Run the reconciliation pipeline for one agent poll
pub async fn reconcile(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Json(req): Json<ReconcileRequest>,
) -> Result<Json<ReconcileResponse>> {
    let update_type = UpdateType::from_str(&req.update_type)
        .ok_or_else(|| Error::InvalidUpdateType(req.update_type.clone()))?;

    let infos = req
        .workspace_agent_infos
        .into_iter()
        .map(WorkspaceAgentInfoPayload::into_agent_info)
        .collect::<Result<Vec<_>>>()?;

    let workspaces = state
        .reconcile_service
        .reconcile(&agent_id, update_type, infos)
        .await?;

    Ok(Json(ReconcileResponse { workspaces }))
}
