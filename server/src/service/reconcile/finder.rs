//! Selection of workspaces to include in the reconcile response

use std::collections::HashSet;

use crate::domain::state::UpdateType;
use crate::domain::workspace::Workspace;
use crate::error::Result;
use crate::infra::workspace_repository::WorkspaceRepository;
use crate::service::reconcile::context::ReconcileContext;

/// Whether a workspace belongs in this response.
///
/// Fully converged terminations are excluded under both update types: once
/// desired and actual are both Terminated there is nothing left to
/// reconcile. A desired-Terminated workspace whose actual state is still in
/// flight (e.g. Terminating) keeps being returned until the agent confirms.
///
/// FULL returns every remaining workspace. PARTIAL returns only workspaces
/// the agent asked about this round or that carry new information since the
/// last response checkpoint; the one-shot force-include flag always wins.
pub fn should_return(workspace: &Workspace, update_type: UpdateType, reported: bool) -> bool {
    if workspace.is_termination_converged() {
        return false;
    }

    match update_type {
        UpdateType::Full => true,
        UpdateType::Partial => reported || workspace.has_new_information(),
    }
}

/// Compute `workspaces_to_be_returned`.
///
/// Ordering: matched agent-reported workspaces first (request key order),
/// then the remaining qualifying workspaces in repository id order,
/// deduplicated by id. Deterministic for a given input; not a contract for
/// consumers.
pub async fn run(repo: &WorkspaceRepository, ctx: &mut ReconcileContext) -> Result<()> {
    let reported_ids: HashSet<&str> = ctx
        .workspaces_from_agent_infos
        .iter()
        .map(|w| w.id.as_str())
        .collect();

    let mut selected = Vec::new();

    for workspace in &ctx.workspaces_from_agent_infos {
        if should_return(workspace, ctx.update_type, true) {
            selected.push(workspace.clone());
        }
    }

    for workspace in repo.find_all_for_agent(&ctx.agent.id).await? {
        if reported_ids.contains(workspace.id.as_str()) {
            continue;
        }
        if should_return(&workspace, ctx.update_type, false) {
            selected.push(workspace);
        }
    }

    ctx.workspaces_to_be_returned = selected;
    Ok(())
}
