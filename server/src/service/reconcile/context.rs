//! Shared context threaded through the reconcile pipeline stages

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::domain::agent::Agent;
use crate::domain::state::UpdateType;
use crate::domain::workspace::{AgentInfo, Workspace};

/// Working set for one reconcile request.
///
/// Each stage reads a subset of these fields and extends the context; no
/// stage removes a field another stage has written. A single `now` is
/// captured at request entry so every write within the request shares one
/// timestamp.
#[derive(Debug)]
pub struct ReconcileContext {
    /// The polling agent
    pub agent: Agent,

    /// Full or partial update semantics for this poll
    pub update_type: UpdateType,

    /// Agent-reported workspace states, keyed by workspace name.
    /// BTreeMap so iteration order is deterministic per request.
    pub agent_infos_by_name: BTreeMap<String, AgentInfo>,

    /// Timestamp for the whole request
    pub now: DateTime<Utc>,

    /// Persisted workspaces matched to agent infos, post state correction
    pub workspaces_from_agent_infos: Vec<Workspace>,

    /// Workspaces selected for the response
    pub workspaces_to_be_returned: Vec<Workspace>,
}

impl ReconcileContext {
    pub fn new(
        agent: Agent,
        update_type: UpdateType,
        agent_infos: Vec<AgentInfo>,
        now: DateTime<Utc>,
    ) -> Self {
        let agent_infos_by_name = agent_infos
            .into_iter()
            .map(|info| (info.name.clone(), info))
            .collect();

        Self {
            agent,
            update_type,
            agent_infos_by_name,
            now,
            workspaces_from_agent_infos: Vec::new(),
            workspaces_to_be_returned: Vec::new(),
        }
    }
}
