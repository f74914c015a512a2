//! Proposal commit.
//!
//! The engine only proposes; this module applies. Snapshot reads mean a
//! proposal can go stale between generation and "Apply", so the conflict
//! check re-runs here against a fresh read and the commit is refused with
//! a described clash when it fails.
//!
//! Co-join's cross-order mutation is deliberately two independent writes:
//! the primary order's schedule first, then each linked order's return
//! policy. A failure in the second half is surfaced distinctly (and
//! logged) rather than rolled back; there are no multi-order
//! transactions in the portal's storage model.

use serde::{Deserialize, Serialize};

use crate::error::{ScheduleError, ScheduleResult};
use crate::services::timeutil::{roll_end_minutes, time_to_minutes};
use crate::services::workload::WorkloadIndex;
use crate::store::{require_order, OrderStore};
use crate::types::{
    LinkedOrderUpdate, PhasePlan, PhaseProposal, ReturnPlan, ReturnPolicy, ScheduleProposal,
};

/// Per-linked-order result of the co-join half of a commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoJoinCommitResult {
    pub linked_order: String,
    pub success: bool,
    pub error: Option<String>,
}

/// Outcome of applying a proposal. `primary_updated` is independent of the
/// co-join results: a failed linked write never unwinds the primary order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitOutcome {
    pub order_number: String,
    pub primary_updated: bool,
    pub co_join_results: Vec<CoJoinCommitResult>,
}

/// Apply an accepted proposal to the order store.
///
/// Re-checks every phase's team interval against a fresh snapshot first;
/// a conflict refuses the whole commit with the clashing order named.
pub fn apply_schedule(
    store: &dyn OrderStore,
    proposal: &ScheduleProposal,
) -> ScheduleResult<CommitOutcome> {
    let orders = store.get_all_orders()?;
    require_order(&orders, &proposal.order_number)?;

    // Commit-time conflict re-check on fresh data.
    for phase in proposal.phases() {
        let Some(start) = time_to_minutes(&phase.arrival_time) else {
            return Err(ScheduleError::InvalidSchedule {
                order_number: proposal.order_number.clone(),
                message: format!("{}: unparseable arrival time", phase.phase),
            });
        };
        // Same end rule the workload index applies once the plan is
        // stored: extended to the hub arrival under return-to-hub.
        let mut end = start + phase.work_minutes.max(0) + phase.buffer_minutes.max(0);
        if phase.return_plan.policy == ReturnPolicy::ReturnToHub {
            if let Some(arrival) = phase
                .return_plan
                .arrival_time
                .as_deref()
                .and_then(time_to_minutes)
            {
                end = end.max(roll_end_minutes(start, arrival));
            }
        }
        let index = WorkloadIndex::build(&orders, phase.date, Some(&proposal.order_number));
        if let Some(clash) = index.find_conflict(phase.team, start, end) {
            tracing::warn!(
                order = proposal.order_number,
                team = %phase.team,
                clashing_order = clash.order_number,
                "commit refused: conflict appeared since the proposal was generated"
            );
            return Err(ScheduleError::Conflict {
                team: phase.team,
                phase: phase.phase,
                order_number: proposal.order_number.clone(),
                clashing_order: clash.order_number.clone(),
            });
        }
    }

    store.update_order_by_number(&proposal.order_number, &mut |order| {
        for phase in proposal.phases() {
            *order.schedule.phase_mut(phase.phase) = Some(plan_from_proposal(phase));
        }
    })?;

    // Second half: linked-order return-policy flips, one write per order.
    let mut co_join_results = Vec::new();
    for phase in proposal.phases() {
        let Some(update) = phase
            .co_join
            .as_ref()
            .filter(|d| d.applied)
            .and_then(|d| d.linked_order_update.as_ref())
        else {
            continue;
        };
        match apply_co_join_update(store, update) {
            Ok(()) => co_join_results.push(CoJoinCommitResult {
                linked_order: update.order_number.clone(),
                success: true,
                error: None,
            }),
            Err(e) => {
                let wrapped = ScheduleError::CoJoinCommit {
                    linked_order: update.order_number.clone(),
                    source: Box::new(e),
                };
                tracing::warn!(
                    order = proposal.order_number,
                    linked_order = update.order_number,
                    error = %wrapped,
                    "co-join linked write failed; flag for manual reconciliation"
                );
                co_join_results.push(CoJoinCommitResult {
                    linked_order: update.order_number.clone(),
                    success: false,
                    error: Some(wrapped.to_string()),
                });
            }
        }
    }

    Ok(CommitOutcome {
        order_number: proposal.order_number.clone(),
        primary_updated: true,
        co_join_results,
    })
}

/// Flip the linked order's return policy to remain-on-site, chained to the
/// accepted co-join partner. Idempotent: re-applying the same decision
/// leaves the linked order unchanged.
pub fn apply_co_join_update(
    store: &dyn OrderStore,
    update: &LinkedOrderUpdate,
) -> ScheduleResult<()> {
    let orders = store.get_all_orders()?;
    let linked = require_order(&orders, &update.order_number)?;
    if linked.schedule.phase(update.phase).is_none() {
        return Err(ScheduleError::InvalidSchedule {
            order_number: update.order_number.clone(),
            message: format!("{} has no {} plan to chain", update.order_number, update.phase),
        });
    }

    let site = linked.site_address.clone();
    store.update_order_by_number(&update.order_number, &mut |order| {
        if let Some(plan) = order.schedule.phase_mut(update.phase).as_mut() {
            plan.return_plan = Some(ReturnPlan::remain_on_site(
                &site,
                &update.next_task_order_number,
            ));
        }
    })?;
    tracing::info!(
        linked_order = update.order_number,
        next = update.next_task_order_number,
        "linked order set to remain on site"
    );
    Ok(())
}

fn plan_from_proposal(phase: &PhaseProposal) -> PhasePlan {
    PhasePlan {
        date: Some(phase.date),
        team: Some(phase.team),
        departure_source: Some(phase.departure_source.clone()),
        departure_address: Some(phase.departure_address.clone()),
        departure_time: Some(phase.departure_time.clone()),
        travel_minutes: Some(phase.travel_minutes),
        distance_km: Some(phase.distance_km),
        work_minutes: phase.work_minutes,
        buffer_minutes: phase.buffer_minutes,
        buffer_reason: None,
        start_time: Some(phase.arrival_time.clone()),
        end_time: Some(phase.end_time.clone()),
        return_plan: Some(phase.return_plan.clone()),
    }
}
