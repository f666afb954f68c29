//! Agent domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Agent entity
///
/// The remote runtime (e.g. a cluster agent) that executes workspaces and
/// polls the control plane for reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Unique identifier
    pub id: String,

    /// Human-readable name, unique
    pub name: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Per-agent lifecycle thresholds, in hours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentLifecycleConfig {
    /// Hours a workspace may stay in an active desired state before it is
    /// stopped for inactivity
    pub max_active_hours_before_stop: i64,

    /// Hours a workspace may stay desired-Stopped before it is terminated
    pub max_stopped_hours_before_termination: i64,
}

/// Parameters for registering an agent
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAgentParams {
    /// Agent name
    pub name: String,

    /// Optional lifecycle thresholds; server defaults apply when absent
    pub config: Option<AgentLifecycleConfig>,
}
