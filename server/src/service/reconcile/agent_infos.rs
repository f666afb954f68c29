//! Matching of agent-reported workspace states to persisted records

use tracing::debug;

use crate::domain::state::WorkspaceState;
use crate::error::Result;
use crate::infra::workspace_repository::WorkspaceRepository;
use crate::service::reconcile::context::ReconcileContext;

/// Match each agent-reported workspace to its persisted record, record the
/// reported actual state, and complete the restart handshake.
///
/// Reported workspaces with no persisted record are skipped here; the orphan
/// observer reports them. Writes are skipped when the stored value already
/// matches the report, so repeated polls with unchanged state do not re-stale
/// the workspace for the finder.
pub async fn run(repo: &WorkspaceRepository, ctx: &mut ReconcileContext) -> Result<()> {
    let mut matched = Vec::with_capacity(ctx.agent_infos_by_name.len());

    for (name, info) in &ctx.agent_infos_by_name {
        let Some(mut workspace) = repo.find_by_agent_and_name(&ctx.agent.id, name).await? else {
            continue;
        };

        if workspace.actual_state != info.actual_state {
            repo.update_actual_state(
                &workspace.id,
                info.actual_state,
                info.deployment_resource_version.as_deref(),
                ctx.now,
            )
            .await?;
            workspace.actual_state = info.actual_state;
            workspace.actual_state_updated_at = ctx.now;
            workspace.deployment_resource_version = info.deployment_resource_version.clone();
            workspace.updated_at = ctx.now;
        } else if workspace.deployment_resource_version != info.deployment_resource_version {
            if let Some(version) = info.deployment_resource_version.as_deref() {
                repo.update_resource_version(&workspace.id, version, ctx.now).await?;
                workspace.deployment_resource_version = Some(version.to_string());
                workspace.updated_at = ctx.now;
            }
        }

        // Restart handshake: the agent has stopped the workspace, so the
        // restart can proceed. Corrected before any lifecycle decision runs.
        if workspace.desired_state == WorkspaceState::RestartRequested
            && workspace.actual_state == WorkspaceState::Stopped
        {
            debug!(
                workspace_id = %workspace.id,
                "restart handshake complete, setting desired state to running"
            );
            repo.update_desired_state(&workspace.id, WorkspaceState::Running, ctx.now)
                .await?;
            workspace.desired_state = WorkspaceState::Running;
            workspace.desired_state_updated_at = ctx.now;
            workspace.updated_at = ctx.now;
        }

        matched.push(workspace);
    }

    ctx.workspaces_from_agent_infos = matched;
    Ok(())
}
