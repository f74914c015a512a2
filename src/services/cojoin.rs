//! Co-join detector.
//!
//! Looks for an already-scheduled task (another order, same date) that the
//! candidate job can chain onto back-to-back, so the team skips one hub
//! leg. Head = candidate runs first and the team proceeds to the linked
//! site; tail = the linked task runs first and the team proceeds to the
//! candidate site.
//!
//! The detector never touches the network: site-to-site distances come
//! through an injected lookup the caller resolved beforehand. Pairs the
//! lookup cannot resolve are skipped.

use crate::services::timeutil::{minutes_to_time, travel_minutes};
use crate::services::workload::{TeamInterval, WorkloadIndex};
use crate::types::{
    AiSettings, CoJoinDecision, CoJoinType, LinkedOrderUpdate, Order, Phase, ReturnPolicy, Team,
};

/// The job being scheduled, reduced to what chaining needs.
#[derive(Debug, Clone)]
pub struct CoJoinCandidate<'a> {
    pub order_number: &'a str,
    pub phase: Phase,
    pub site_address: &'a str,
    /// Proposed task window in minute offsets (end includes buffer).
    pub start_minutes: i32,
    pub end_minutes: i32,
}

/// A feasible chaining, with everything the engine needs to fold it in.
#[derive(Debug, Clone)]
pub struct CoJoinMatch {
    pub decision: CoJoinDecision,
    /// The linked task's team; the candidate inherits it.
    pub team: Team,
    /// Tail only: the chained leg departs from the linked job's site
    /// instead of the hub.
    pub departure_address: Option<String>,
    /// Tail only: travel minutes for the chained leg (site to site).
    pub travel_minutes: Option<i32>,
}

/// Site-to-site distance lookup resolved by the caller layer.
pub type SiteDistanceFn<'a> = &'a dyn Fn(&str, &str) -> Option<f64>;

/// Find the best co-join pairing for the candidate, or `None`.
///
/// Eligibility: linked team not excluded, both sites within `radius_km`,
/// waiting time within `[0, waiting_hours*60]`. A negative gap (the tasks
/// would overlap even without hub travel) disqualifies the pairing. The
/// match with the least waiting wins.
pub fn detect_co_join(
    candidate: &CoJoinCandidate,
    orders: &[Order],
    index: &WorkloadIndex,
    ai: &AiSettings,
    excluded_teams: &[Team],
    site_distance_km: SiteDistanceFn,
) -> Option<CoJoinMatch> {
    let max_waiting = ai.max_waiting_minutes();
    let mut best: Option<CoJoinMatch> = None;

    for interval in index.all_intervals() {
        if interval.order_number == candidate.order_number {
            continue;
        }
        if excluded_teams.contains(&interval.team) {
            continue;
        }
        if already_chained_elsewhere(orders, interval, candidate.order_number) {
            continue;
        }

        let Some(distance) = site_distance_km(candidate.site_address, &interval.site_address)
        else {
            tracing::debug!(
                candidate = candidate.order_number,
                linked = interval.order_number,
                "co-join pairing skipped: site distance unresolved"
            );
            continue;
        };
        if distance > ai.radius_km {
            continue;
        }

        let leg_minutes = travel_minutes(distance, ai.minutes_per_km);

        // Tail: linked task ends, team waits on the linked site and drives
        // straight to the candidate, timed to arrive at the task start.
        let tail_waiting = candidate.start_minutes - interval.end_minutes - leg_minutes;
        if (0..=max_waiting).contains(&tail_waiting) {
            let decision = CoJoinDecision {
                applied: true,
                co_join_type: CoJoinType::Tail,
                linked_order_number: interval.order_number.clone(),
                distance_km: distance,
                waiting_minutes: tail_waiting,
                adjusted_departure_time: minutes_to_time(candidate.start_minutes - leg_minutes),
                linked_order_update: Some(LinkedOrderUpdate {
                    order_number: interval.order_number.clone(),
                    phase: interval.phase,
                    next_task_order_number: candidate.order_number.to_string(),
                }),
            };
            consider(
                &mut best,
                CoJoinMatch {
                    decision,
                    team: interval.team,
                    departure_address: Some(interval.site_address.clone()),
                    travel_minutes: Some(leg_minutes),
                },
            );
        }

        // Head: candidate ends first; the team remains on the candidate
        // site and drives off in time for the linked task.
        let head_waiting = interval.start_minutes - candidate.end_minutes - leg_minutes;
        if (0..=max_waiting).contains(&head_waiting) {
            let decision = CoJoinDecision {
                applied: true,
                co_join_type: CoJoinType::Head,
                linked_order_number: interval.order_number.clone(),
                distance_km: distance,
                waiting_minutes: head_waiting,
                adjusted_departure_time: minutes_to_time(interval.start_minutes - leg_minutes),
                // The candidate runs first, so its own return plan carries
                // the chain; no cross-order write is needed.
                linked_order_update: None,
            };
            consider(
                &mut best,
                CoJoinMatch {
                    decision,
                    team: interval.team,
                    departure_address: None,
                    travel_minutes: None,
                },
            );
        }
    }

    if let Some(m) = &best {
        tracing::info!(
            candidate = candidate.order_number,
            linked = m.decision.linked_order_number,
            kind = ?m.decision.co_join_type,
            waiting = m.decision.waiting_minutes,
            "co-join opportunity found"
        );
    }
    best
}

fn consider(best: &mut Option<CoJoinMatch>, candidate: CoJoinMatch) {
    let better = match best {
        Some(b) => candidate.decision.waiting_minutes < b.decision.waiting_minutes,
        None => true,
    };
    if better {
        *best = Some(candidate);
    }
}

/// A linked task already chained to a third order must not be re-chained.
fn already_chained_elsewhere(
    orders: &[Order],
    interval: &TeamInterval,
    candidate_number: &str,
) -> bool {
    orders
        .iter()
        .find(|o| o.order_number == interval.order_number)
        .and_then(|o| o.schedule.phase(interval.phase))
        .and_then(|p| p.return_plan.as_ref())
        .map_or(false, |ret| {
            ret.policy == ReturnPolicy::RemainOnSite
                && ret.next_task_order_number.as_deref() != Some(candidate_number)
                && ret.next_task_order_number.is_some()
        })
}
