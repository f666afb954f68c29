//! Workspace domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::state::WorkspaceState;

/// Workspace entity
///
/// A workspace is a per-user remote development environment executed by a
/// cluster agent. The control plane tracks a desired state alongside the
/// state the agent last reported, and `responded_to_agent_at` records the
/// last time this workspace was included in a reconcile response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    /// Unique identifier
    pub id: String,

    /// Owning agent
    pub agent_id: String,

    /// Owning user
    pub user_id: String,

    /// Workspace name, unique per agent
    pub name: String,

    /// Namespace on the agent's cluster, unique per agent with name
    pub namespace: String,

    /// State the control plane wants the workspace to be in
    pub desired_state: WorkspaceState,

    /// State the agent last reported
    pub actual_state: WorkspaceState,

    /// Last time desired_state changed
    pub desired_state_updated_at: DateTime<Utc>,

    /// Last time actual_state changed
    pub actual_state_updated_at: DateTime<Utc>,

    /// Last time this workspace was included in a reconcile response.
    /// None means it has never been returned to the agent.
    pub responded_to_agent_at: Option<DateTime<Utc>>,

    /// One-shot flag: the next response must carry full resource definitions
    pub force_include_all_resources: bool,

    /// Agent-side resource version, passed through for optimistic concurrency
    pub deployment_resource_version: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Workspace {
    /// Both sides have converged on termination; nothing left to reconcile.
    pub fn is_termination_converged(&self) -> bool {
        self.desired_state == WorkspaceState::Terminated
            && self.actual_state == WorkspaceState::Terminated
    }

    /// Whether the workspace carries information the agent has not seen.
    ///
    /// Comparisons are strict so a workspace whose timestamps equal the
    /// response checkpoint is considered already known to the agent.
    pub fn has_new_information(&self) -> bool {
        if self.force_include_all_resources {
            return true;
        }
        match self.responded_to_agent_at {
            None => true,
            Some(checkpoint) => {
                self.desired_state_updated_at > checkpoint
                    || self.actual_state_updated_at > checkpoint
            }
        }
    }
}

/// Workspace state as reported by an agent for a single reconcile request
#[derive(Debug, Clone)]
pub struct AgentInfo {
    /// Workspace name
    pub name: String,

    /// Workspace namespace
    pub namespace: String,

    /// State the agent currently observes
    pub actual_state: WorkspaceState,

    /// Agent-side resource version, not interpreted here
    pub deployment_resource_version: Option<String>,
}

/// Parameters for creating a workspace
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWorkspaceParams {
    /// Owning agent
    pub agent_id: String,

    /// Owning user
    pub user_id: String,

    /// Workspace name, unique per agent
    pub name: String,

    /// Namespace on the agent's cluster
    pub namespace: String,
}
