//! Team workload index.
//!
//! A team's day state is never stored; it is derived on demand by
//! scanning every order for intervals assigned to that team on the date in
//! question. The index backs conflict detection, least-loaded team ranking
//! and co-join lookups.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::error::{ScheduleError, ScheduleResult};
use crate::services::timeutil::{roll_end_minutes, time_to_minutes};
use crate::types::{Order, Phase, PhasePlan, ReturnPolicy, Team};

/// A committed time interval for one team on one date. Minute offsets may
/// exceed 24h×60 when a hub return rolled past midnight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamInterval {
    pub team: Team,
    pub start_minutes: i32,
    pub end_minutes: i32,
    pub order_number: String,
    pub phase: Phase,
    pub site_address: String,
}

/// Per-team interval lists for one date.
#[derive(Debug, Clone, Default)]
pub struct WorkloadIndex {
    intervals: HashMap<Team, Vec<TeamInterval>>,
}

/// The engaged interval of a phase plan on the given date, if any.
///
/// A plan is engaged iff it has a confirmed matching date and a resolvable
/// start time. The interval end is start + work + buffer, extended to the
/// hub arrival time under a return-to-hub policy, rolled past midnight
/// when needed.
pub fn phase_interval(plan: &PhasePlan, date: NaiveDate) -> Option<(i32, i32)> {
    if plan.date != Some(date) {
        return None;
    }
    let start = time_to_minutes(plan.start_time.as_deref()?)?;
    let mut end = start + plan.work_minutes.max(0) + plan.buffer_minutes.max(0);

    if let Some(ret) = &plan.return_plan {
        if ret.policy == ReturnPolicy::ReturnToHub {
            if let Some(arrival) = ret.arrival_time.as_deref().and_then(time_to_minutes) {
                end = end.max(roll_end_minutes(start, arrival));
            }
        }
    }
    Some((start, end.max(start)))
}

impl WorkloadIndex {
    /// Scan all orders and collect every team's intervals on `date`.
    /// `exclude_order` drops that order's own intervals, since an order may
    /// freely move within its own slots while being rescheduled.
    pub fn build(orders: &[Order], date: NaiveDate, exclude_order: Option<&str>) -> Self {
        let mut intervals: HashMap<Team, Vec<TeamInterval>> = HashMap::new();

        for order in orders {
            if exclude_order == Some(order.order_number.as_str()) {
                continue;
            }
            for (phase, plan) in order.schedule.phases() {
                let Some(team) = plan.team else { continue };
                let Some((start, end)) = phase_interval(plan, date) else {
                    continue;
                };
                intervals.entry(team).or_default().push(TeamInterval {
                    team,
                    start_minutes: start,
                    end_minutes: end,
                    order_number: order.order_number.clone(),
                    phase,
                    site_address: order.site_address.clone(),
                });
            }
        }

        for list in intervals.values_mut() {
            list.sort_by_key(|i| i.start_minutes);
        }

        Self { intervals }
    }

    /// First existing interval overlapping the candidate, if any.
    /// Half-open overlap test: `candidate_start < existing_end &&
    /// candidate_end > existing_start`.
    pub fn find_conflict(&self, team: Team, start: i32, end: i32) -> Option<&TeamInterval> {
        self.intervals
            .get(&team)?
            .iter()
            .find(|i| start < i.end_minutes && end > i.start_minutes)
    }

    /// Committed task count for a team on the indexed date.
    pub fn task_count(&self, team: Team) -> usize {
        self.intervals.get(&team).map_or(0, |l| l.len())
    }

    /// Teams ranked by ascending workload, stable on roster order.
    pub fn teams_by_workload(&self) -> Vec<Team> {
        let mut teams = Team::ALL.to_vec();
        teams.sort_by_key(|t| self.task_count(*t));
        teams
    }

    pub fn intervals(&self, team: Team) -> &[TeamInterval] {
        self.intervals.get(&team).map_or(&[], |l| l.as_slice())
    }

    /// All intervals on the date, across teams, sorted by start.
    pub fn all_intervals(&self) -> Vec<&TeamInterval> {
        let mut all: Vec<&TeamInterval> = self.intervals.values().flatten().collect();
        all.sort_by_key(|i| i.start_minutes);
        all
    }
}

/// Guard for manual time edits: rejects a hand-entered interval that would
/// double-book the team, naming the clashing order.
pub fn check_manual_interval(
    orders: &[Order],
    date: NaiveDate,
    order_number: &str,
    phase: Phase,
    team: Team,
    start_time: &str,
    end_time: &str,
) -> ScheduleResult<()> {
    let start = time_to_minutes(start_time).ok_or_else(|| ScheduleError::InvalidSchedule {
        order_number: order_number.to_string(),
        message: format!("unparseable start time '{start_time}'"),
    })?;
    let end_raw = time_to_minutes(end_time).ok_or_else(|| ScheduleError::InvalidSchedule {
        order_number: order_number.to_string(),
        message: format!("unparseable end time '{end_time}'"),
    })?;
    let end = roll_end_minutes(start, end_raw);

    let index = WorkloadIndex::build(orders, date, Some(order_number));
    if let Some(clash) = index.find_conflict(team, start, end) {
        tracing::warn!(
            order = order_number,
            team = %team,
            clashing_order = clash.order_number,
            "manual time edit rejected: team double-booked"
        );
        return Err(ScheduleError::Conflict {
            team,
            phase,
            order_number: order_number.to_string(),
            clashing_order: clash.order_number.clone(),
        });
    }
    Ok(())
}
