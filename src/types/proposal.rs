//! Schedule proposal, the engine's ephemeral output
//!
//! A proposal is created fresh on every engine invocation, shown to the
//! operator, and merged into the order's schedule record only on explicit
//! apply. Nothing here is persisted by the engine itself.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Phase, ReturnPlan, Team};

/// Whether the candidate job runs before (head) or after (tail) the linked job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoJoinType {
    Head,
    Tail,
}

/// Proposed cross-order mutation: flips the named order's return policy to
/// remain-on-site, chained to `next_task_order_number`. Produced as data by
/// the detector, applied only by the commit step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedOrderUpdate {
    pub order_number: String,
    pub phase: Phase,
    pub next_task_order_number: String,
}

/// Outcome of the co-join detector for one phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoJoinDecision {
    pub applied: bool,
    #[serde(rename = "type")]
    pub co_join_type: CoJoinType,
    pub linked_order_number: String,
    /// Site-to-site distance between the two jobs.
    pub distance_km: f64,
    /// Idle time between the chained tasks after removing hub travel.
    #[serde(rename = "waitingMins")]
    pub waiting_minutes: i32,
    /// Departure "HH:MM" of the chained leg: for tail, when the team leaves
    /// the linked site toward the candidate; for head, when it leaves the
    /// candidate site toward the linked job.
    pub adjusted_departure_time: String,
    /// Present for tail co-joins only: the linked (earlier) task's return
    /// policy flips. For head co-joins the candidate's own return plan in
    /// the proposal carries the chain and no cross-order write is needed.
    pub linked_order_update: Option<LinkedOrderUpdate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OvertimeRecommendation {
    Accept,
    DeployNewTeam,
}

/// Overtime policy verdict for a proposal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OvertimeDecision {
    pub required: bool,
    pub recommendation: Option<OvertimeRecommendation>,
    pub message: Option<String>,
}

/// Proposed schedule for one phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseProposal {
    pub phase: Phase,
    pub date: NaiveDate,
    pub team: Team,
    pub departure_source: String,
    pub departure_address: String,
    /// "HH:MM"
    pub departure_time: String,
    pub travel_minutes: i32,
    pub arrival_time: String,
    pub work_minutes: i32,
    pub buffer_minutes: i32,
    pub end_time: String,
    pub distance_km: f64,
    pub return_plan: ReturnPlan,
    pub co_join: Option<CoJoinDecision>,
}

/// Per-team committed task count for the proposal's date.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamWorkloadCount {
    pub team: Team,
    pub tasks: usize,
}

/// Complete engine output, presented to the operator before apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleProposal {
    pub proposal_id: Uuid,
    pub order_number: String,
    pub setup: Option<PhaseProposal>,
    pub dismantle: Option<PhaseProposal>,
    pub overtime: OvertimeDecision,
    pub workload: Vec<TeamWorkloadCount>,
    /// True iff no conflict remains for either phase's final team/time.
    pub no_overlap: bool,
    /// True iff both phases fall inside the customer's preferred slot
    /// (exact for strict, same-day for flexible).
    pub within_preferred: bool,
    /// Plain-language trail of how the proposal was assembled.
    pub reasoning: Vec<String>,
}

impl ScheduleProposal {
    pub fn phases(&self) -> impl Iterator<Item = &PhaseProposal> {
        self.setup.iter().chain(self.dismantle.iter())
    }
}
