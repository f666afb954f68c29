//! Inactivity-based desired-state decay

use chrono::Duration;
use tracing::debug;

use crate::domain::state::WorkspaceState;
use crate::error::Result;
use crate::infra::workspace_repository::WorkspaceRepository;
use crate::service::reconcile::context::ReconcileContext;

/// Thresholds driving the decay state machine, in hours
#[derive(Debug, Clone, Copy)]
pub struct LifecycleThresholds {
    /// System-wide hard cap on workspace age; overrides per-agent thresholds
    pub max_hours_before_termination: i64,

    /// Per-agent: hours before an active workspace is stopped
    pub max_active_hours_before_stop: i64,

    /// Per-agent: hours before a stopped workspace is terminated
    pub max_stopped_hours_before_termination: i64,
}

/// Compute the decayed desired state, if any.
///
/// Guards in priority order:
/// 1. terminal floor: past the hard age cap, everything not yet Terminated
///    is terminated;
/// 2. active workspaces whose desired state has not changed within the
///    active threshold are stopped;
/// 3. stopped workspaces past the stopped threshold are terminated.
///
/// Returns None when no transition applies, including whenever the target
/// would equal the current state; callers skip the write entirely in that
/// case so the staleness clock is not reset.
pub fn next_desired_state(
    current: WorkspaceState,
    workspace_age: Duration,
    desired_state_age: Duration,
    thresholds: &LifecycleThresholds,
) -> Option<WorkspaceState> {
    if current != WorkspaceState::Terminated
        && workspace_age > Duration::hours(thresholds.max_hours_before_termination)
    {
        return Some(WorkspaceState::Terminated);
    }

    if !matches!(current, WorkspaceState::Stopped | WorkspaceState::Terminated)
        && desired_state_age > Duration::hours(thresholds.max_active_hours_before_stop)
    {
        return Some(WorkspaceState::Stopped);
    }

    if current == WorkspaceState::Stopped
        && desired_state_age > Duration::hours(thresholds.max_stopped_hours_before_termination)
    {
        return Some(WorkspaceState::Terminated);
    }

    None
}

/// Apply desired-state decay to the matched workspaces.
///
/// Evaluated per workspace independently; equal-state writes never happen by
/// construction of `next_desired_state`. Returns the number of transitions
/// written.
pub async fn run(
    repo: &WorkspaceRepository,
    thresholds: &LifecycleThresholds,
    ctx: &mut ReconcileContext,
) -> Result<usize> {
    let mut transitions = 0;

    for workspace in &mut ctx.workspaces_from_agent_infos {
        let workspace_age = ctx.now - workspace.created_at;
        let desired_state_age = ctx.now - workspace.desired_state_updated_at;

        let Some(target) =
            next_desired_state(workspace.desired_state, workspace_age, desired_state_age, thresholds)
        else {
            continue;
        };

        debug!(
            workspace_id = %workspace.id,
            from = workspace.desired_state.as_str(),
            to = target.as_str(),
            "desired state decayed by lifecycle policy"
        );

        repo.update_desired_state(&workspace.id, target, ctx.now).await?;
        workspace.desired_state = target;
        workspace.desired_state_updated_at = ctx.now;
        workspace.updated_at = ctx.now;
        transitions += 1;
    }

    Ok(transitions)
}
