//! Workspace state vocabulary

use serde::{Deserialize, Serialize};

/// Workspace state
///
/// Shared domain for both `desired_state` (what the control plane wants) and
/// `actual_state` (what the agent last reported). Values outside this domain
/// are rejected at the request boundary before they can enter the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceState {
    /// Workspace creation has been requested but not started
    CreationRequested,
    /// Workspace is starting up
    Starting,
    /// Workspace is running
    Running,
    /// Workspace is shutting down
    Stopping,
    /// Workspace is stopped
    Stopped,
    /// A restart has been requested; waiting for the agent to stop it
    RestartRequested,
    /// Workspace is being terminated
    Terminating,
    /// Workspace is terminated
    Terminated,
    /// Workspace failed
    Failed,
    /// Workspace encountered an error
    Error,
    /// State could not be determined by the agent
    Unknown,
}

impl WorkspaceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkspaceState::CreationRequested => "creation_requested",
            WorkspaceState::Starting => "starting",
            WorkspaceState::Running => "running",
            WorkspaceState::Stopping => "stopping",
            WorkspaceState::Stopped => "stopped",
            WorkspaceState::RestartRequested => "restart_requested",
            WorkspaceState::Terminating => "terminating",
            WorkspaceState::Terminated => "terminated",
            WorkspaceState::Failed => "failed",
            WorkspaceState::Error => "error",
            WorkspaceState::Unknown => "unknown",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "creation_requested" => Some(WorkspaceState::CreationRequested),
            "starting" => Some(WorkspaceState::Starting),
            "running" => Some(WorkspaceState::Running),
            "stopping" => Some(WorkspaceState::Stopping),
            "stopped" => Some(WorkspaceState::Stopped),
            "restart_requested" => Some(WorkspaceState::RestartRequested),
            "terminating" => Some(WorkspaceState::Terminating),
            "terminated" => Some(WorkspaceState::Terminated),
            "failed" => Some(WorkspaceState::Failed),
            "error" => Some(WorkspaceState::Error),
            "unknown" => Some(WorkspaceState::Unknown),
            _ => None,
        }
    }

    /// Desired states a user may request directly
    pub fn is_user_settable(&self) -> bool {
        matches!(
            self,
            WorkspaceState::Running
                | WorkspaceState::Stopped
                | WorkspaceState::RestartRequested
                | WorkspaceState::Terminated
        )
    }
}

/// Reconcile update type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateType {
    /// Full resync: every live workspace for the agent is returned
    Full,
    /// Incremental: only workspaces with new information are returned
    Partial,
}

impl UpdateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateType::Full => "full",
            UpdateType::Partial => "partial",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "full" => Some(UpdateType::Full),
            "partial" => Some(UpdateType::Partial),
            _ => None,
        }
    }
}
