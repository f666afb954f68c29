//! Orphaned workspace detection

use std::collections::HashSet;

use tracing::warn;

use crate::domain::workspace::AgentInfo;
use crate::service::reconcile::context::ReconcileContext;

/// Agent infos with no matching persisted workspace.
///
/// Computed against the post-correction matched set so only true
/// persistence-layer gaps are reported.
fn orphaned_agent_infos(ctx: &ReconcileContext) -> Vec<&AgentInfo> {
    let matched: HashSet<&str> = ctx
        .workspaces_from_agent_infos
        .iter()
        .map(|w| w.name.as_str())
        .collect();

    ctx.agent_infos_by_name
        .values()
        .filter(|info| !matched.contains(info.name.as_str()))
        .collect()
}

/// Log agent-reported workspaces that have no persisted record.
///
/// A pure side-channel observer: drift between the cluster and the control
/// plane is expected steady-state noise (e.g. a just-deleted workspace the
/// agent has not caught up on), so this never fails the request and never
/// touches the context.
pub fn observe(ctx: &ReconcileContext) {
    let orphans = orphaned_agent_infos(ctx);
    if orphans.is_empty() {
        return;
    }

    let details: Vec<serde_json::Value> = orphans
        .iter()
        .map(|info| {
            serde_json::json!({
                "name": info.name,
                "namespace": info.namespace,
                "actual_state": info.actual_state.as_str(),
            })
        })
        .collect();

    warn!(
        error_type = "orphaned_workspace_agent_infos",
        agent_id = %ctx.agent.id,
        update_type = ctx.update_type.as_str(),
        count = orphans.len(),
        orphans = %serde_json::Value::Array(details),
        "Agent reported workspaces with no persisted record"
    );
}
