//! Response bookkeeping

use crate::error::Result;
use crate::infra::workspace_repository::WorkspaceRepository;
use crate::service::reconcile::context::ReconcileContext;

/// Record that the selected workspaces have been communicated to the agent.
///
/// One batched write sets `responded_to_agent_at` to the request timestamp
/// and clears the one-shot force-include flag for the whole selection;
/// workspaces outside the selection keep their checkpoint as-is. The
/// in-memory records are refreshed to match so downstream serialization sees
/// post-update state.
pub async fn run(repo: &WorkspaceRepository, ctx: &mut ReconcileContext) -> Result<()> {
    let ids: Vec<String> = ctx
        .workspaces_to_be_returned
        .iter()
        .map(|w| w.id.clone())
        .collect();

    repo.bulk_mark_responded(&ids, ctx.now).await?;

    for workspace in &mut ctx.workspaces_to_be_returned {
        workspace.responded_to_agent_at = Some(ctx.now);
        workspace.force_include_all_resources = false;
        workspace.updated_at = ctx.now;
    }

    Ok(())
}
