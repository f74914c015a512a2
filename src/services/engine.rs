//! Team assignment & scheduling engine.
//!
//! The orchestrator behind the scheduling page's "AI schedule" action:
//! derives departure/arrival/end times per phase, picks a team (preference
//! first, else least loaded and conflict-free, optionally extended by a
//! co-join chain), evaluates overtime policy, and assembles the reasoning
//! trail. The engine performs no I/O and writes nothing; its output is an
//! ephemeral proposal the operator may apply or discard.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::{ScheduleError, ScheduleResult};
use crate::services::cojoin::{detect_co_join, CoJoinCandidate, SiteDistanceFn};
use crate::services::overtime;
use crate::services::timeutil::{
    minutes_to_time, roll_end_minutes, time_to_minutes, travel_minutes,
};
use crate::services::workload::WorkloadIndex;
use crate::types::{
    AiSettings, AppSettings, CoJoinType, Order, Phase, PhaseProposal, ReturnPlan, ReturnPolicy,
    ScheduleProposal, Team, TeamWorkloadCount, TimeWindowMode,
};

/// Inputs for one engine invocation. Distances are resolved by the caller
/// layer beforehand; the engine never calls out to the network.
pub struct ScheduleRequest<'a> {
    pub order: &'a Order,
    pub all_orders: &'a [Order],
    pub ai_settings: &'a AiSettings,
    pub app_settings: &'a AppSettings,
    /// Hub-to-site driving distance.
    pub distance_km: f64,
    pub allow_co_join: bool,
    /// Teams the operator rejected in a previous run.
    pub excluded_teams: Vec<Team>,
    pub preferred_setup_team: Option<Team>,
    pub preferred_dismantle_team: Option<Team>,
}

/// How far a flexible start may be pushed past the preferred slot, and the
/// step used while probing (quarter-hour convention).
const FLEX_SHIFT_STEP_MINUTES: i32 = 15;
const FLEX_SHIFT_MAX_MINUTES: i32 = 8 * 60;

struct PhaseOutcome {
    proposal: PhaseProposal,
    conflict_free: bool,
    within_preferred: bool,
}

/// Run the scheduler for one order and return a complete proposal.
///
/// Contradictory input (e.g. a preferred team double-booked at the only
/// viable time) still yields a best-effort proposal with
/// `no_overlap=false` and a reasoning line naming the clashing order; the
/// engine never silently drops a conflict.
pub fn run_ai_schedule(
    req: &ScheduleRequest,
    site_distance_km: SiteDistanceFn,
) -> ScheduleResult<ScheduleProposal> {
    let mut reasoning: Vec<String> = Vec::new();

    if req.ai_settings.minutes_per_km <= 0.0 {
        return Err(ScheduleError::InvalidSchedule {
            order_number: req.order.order_number.clone(),
            message: "minutesPerKm must be positive".to_string(),
        });
    }

    let setup = plan_phase(
        req,
        Phase::Setup,
        req.preferred_setup_team,
        None,
        site_distance_km,
        &mut reasoning,
    )?;

    // The dismantle run sees the freshly proposed setup interval so the
    // two phases cannot double-book the same team on a shared date.
    let setup_interval = setup.as_ref().map(|s| {
        (
            s.proposal.team,
            s.proposal.date,
            interval_of(&s.proposal),
        )
    });
    let dismantle = plan_phase(
        req,
        Phase::Dismantle,
        req.preferred_dismantle_team,
        setup_interval,
        site_distance_km,
        &mut reasoning,
    )?;

    if setup.is_none() && dismantle.is_none() {
        return Err(ScheduleError::InvalidSchedule {
            order_number: req.order.order_number.clone(),
            message: "no phase has a confirmed date to schedule".to_string(),
        });
    }

    // Overtime verdict against the (possibly co-join-adjusted) end times.
    let phase_ends: Vec<(Phase, i32)> = [&setup, &dismantle]
        .into_iter()
        .flatten()
        .filter_map(|o| {
            time_to_minutes(&o.proposal.end_time).map(|end| (o.proposal.phase, end))
        })
        .collect();
    let alternative_free = alternative_team_exists(req, &setup, &dismantle);
    let overtime = overtime::evaluate(&phase_ends, req.app_settings, alternative_free);
    if let Some(msg) = &overtime.message {
        reasoning.push(format!("Overtime: {msg}"));
    }

    if req.distance_km > req.ai_settings.long_travel_warning_km {
        reasoning.push(format!(
            "Long travel: {:.1} km one way exceeds the {:.0} km warning threshold.",
            req.distance_km, req.ai_settings.long_travel_warning_km
        ));
    }

    let no_overlap = [&setup, &dismantle]
        .into_iter()
        .flatten()
        .all(|o| o.conflict_free);
    let within_preferred = [&setup, &dismantle]
        .into_iter()
        .flatten()
        .all(|o| o.within_preferred);

    // Workload counts for the setup date (falling back to dismantle's).
    let workload_date = setup
        .as_ref()
        .map(|s| s.proposal.date)
        .or_else(|| dismantle.as_ref().map(|d| d.proposal.date));
    let workload = workload_date
        .map(|date| {
            let index = WorkloadIndex::build(
                req.all_orders,
                date,
                Some(req.order.order_number.as_str()),
            );
            Team::ALL
                .iter()
                .map(|t| TeamWorkloadCount {
                    team: *t,
                    tasks: index.task_count(*t),
                })
                .collect()
        })
        .unwrap_or_default();

    tracing::info!(
        order = req.order.order_number,
        no_overlap,
        within_preferred,
        overtime = overtime.required,
        "schedule proposal assembled"
    );

    Ok(ScheduleProposal {
        proposal_id: Uuid::new_v4(),
        order_number: req.order.order_number.clone(),
        setup: setup.map(|o| o.proposal),
        dismantle: dismantle.map(|o| o.proposal),
        overtime,
        workload,
        no_overlap,
        within_preferred,
        reasoning,
    })
}

/// The interval a phase proposal will occupy once stored: start + work +
/// buffer, extended to the hub arrival under return-to-hub. Must match the
/// stored-interval rule in the workload index.
fn interval_of(p: &PhaseProposal) -> (i32, i32) {
    let start = time_to_minutes(&p.arrival_time).unwrap_or(0);
    let mut end = start + p.work_minutes + p.buffer_minutes;
    if p.return_plan.policy == ReturnPolicy::ReturnToHub {
        if let Some(arrival) = p.return_plan.arrival_time.as_deref().and_then(time_to_minutes) {
            end = end.max(roll_end_minutes(start, arrival));
        }
    }
    (start, end)
}

fn plan_phase(
    req: &ScheduleRequest,
    phase: Phase,
    preferred_team: Option<Team>,
    sibling: Option<(Team, NaiveDate, (i32, i32))>,
    site_distance_km: SiteDistanceFn,
    reasoning: &mut Vec<String>,
) -> ScheduleResult<Option<PhaseOutcome>> {
    let order = req.order;
    let ai = req.ai_settings;
    let app = req.app_settings;

    let Some(date) = order.preferred_date(phase) else {
        reasoning.push(format!("{phase}: skipped, no confirmed date."));
        return Ok(None);
    };

    let work_minutes = app.work_minutes(&order.items, phase);
    let buffer_minutes = ai.buffer_time_minutes.max(0);
    let hub_travel = travel_minutes(req.distance_km, ai.minutes_per_km);

    let preferred_time = order.preferred_time(phase).and_then(time_to_minutes);
    let work_start = time_to_minutes(&app.work_start_time).unwrap_or(8 * 60);
    let natural_start = preferred_time.unwrap_or(work_start);
    let window_mode = order.window_mode(phase);

    let index = WorkloadIndex::build(req.all_orders, date, Some(order.order_number.as_str()));
    let conflict_at = |team: Team, start: i32, end: i32| -> Option<String> {
        if let Some(clash) = index.find_conflict(team, start, end) {
            return Some(clash.order_number.clone());
        }
        if let Some((sib_team, sib_date, (sib_start, sib_end))) = &sibling {
            if *sib_team == team && *sib_date == date && start < *sib_end && end > *sib_start {
                return Some(order.order_number.clone());
            }
        }
        None
    };

    let duration = work_minutes + buffer_minutes;
    // The stored interval will extend to the hub arrival, so the candidate
    // window must carry the return leg while checking. Conservative for
    // co-join (which drops the hub return), never the other way around.
    let busy_span = duration + hub_travel;
    let mut start = natural_start;
    let mut conflict: Option<String> = None;

    // Team selection: honor the operator's preference, else least-loaded
    // conflict-free; flexible windows may shift to the nearest free slot.
    let mut team = match preferred_team {
        Some(t) => {
            conflict = conflict_at(t, start, start + busy_span);
            if conflict.is_none() {
                reasoning.push(format!(
                    "{phase}: {t} assigned as requested ({} task(s) already on {date}).",
                    index.task_count(t)
                ));
            }
            t
        }
        None => {
            let ranked: Vec<Team> = index
                .teams_by_workload()
                .into_iter()
                .filter(|t| !req.excluded_teams.contains(t))
                .collect();
            match ranked
                .iter()
                .find(|t| conflict_at(**t, start, start + busy_span).is_none())
            {
                Some(t) => {
                    reasoning.push(format!(
                        "{phase}: {t} selected, least loaded conflict-free team ({} task(s) on {date}).",
                        index.task_count(*t)
                    ));
                    *t
                }
                None => {
                    let fallback = ranked.first().copied().unwrap_or(Team::Alpha);
                    conflict = conflict_at(fallback, start, start + busy_span);
                    fallback
                }
            }
        }
    };

    // Flexible window: probe quarter-hour slots on both sides of the
    // preferred start, nearest first, never before the working day.
    if conflict.is_some() && window_mode == TimeWindowMode::Flexible {
        let candidates: Vec<Team> = match preferred_team {
            Some(t) => vec![t],
            None => index
                .teams_by_workload()
                .into_iter()
                .filter(|t| !req.excluded_teams.contains(t))
                .collect(),
        };
        'probe: for offset in (FLEX_SHIFT_STEP_MINUTES..=FLEX_SHIFT_MAX_MINUTES)
            .step_by(FLEX_SHIFT_STEP_MINUTES as usize)
        {
            for shifted in [natural_start - offset, natural_start + offset] {
                if shifted < work_start {
                    continue;
                }
                for t in &candidates {
                    if conflict_at(*t, shifted, shifted + busy_span).is_none() {
                        reasoning.push(format!(
                            "{phase}: shifted start to {} for {t} to avoid a clash (flexible window).",
                            minutes_to_time(shifted)
                        ));
                        team = *t;
                        start = shifted;
                        conflict = None;
                        break 'probe;
                    }
                }
            }
        }
    }

    if let Some(clashing) = &conflict {
        reasoning.push(format!(
            "{phase}: {team} is double-booked with order {clashing} at the required time. Proposal flagged, choose another team or time."
        ));
        tracing::warn!(
            order = order.order_number,
            %team,
            clashing_order = clashing,
            "proposed interval conflicts"
        );
    }

    let end = start + duration;
    let mut departure_source = "hub".to_string();
    let mut departure_address = ai.hub_address.clone();
    let mut leg_travel = hub_travel;
    let mut return_plan = ReturnPlan::return_to_hub(
        &order.site_address,
        &ai.hub_address,
        hub_travel,
        &minutes_to_time(end + hub_travel),
    );

    // Co-join attempt against the (conflict-free) proposed window.
    let mut co_join = None;
    if req.allow_co_join && conflict.is_none() {
        let candidate = CoJoinCandidate {
            order_number: &order.order_number,
            phase,
            site_address: &order.site_address,
            start_minutes: start,
            end_minutes: end,
        };
        if let Some(m) = detect_co_join(
            &candidate,
            req.all_orders,
            &index,
            ai,
            &req.excluded_teams,
            site_distance_km,
        ) {
            // The chained team must itself be free for our window.
            if conflict_at(m.team, start, start + busy_span).is_none() {
                match m.decision.co_join_type {
                    CoJoinType::Tail => {
                        departure_source = "co-join".to_string();
                        departure_address = m
                            .departure_address
                            .clone()
                            .unwrap_or_else(|| ai.hub_address.clone());
                        leg_travel = m.travel_minutes.unwrap_or(hub_travel);
                        reasoning.push(format!(
                            "{phase}: tail co-join with order {}: {} proceeds from {} without a hub return ({} min waiting).",
                            m.decision.linked_order_number,
                            m.team,
                            departure_address,
                            m.decision.waiting_minutes
                        ));
                    }
                    CoJoinType::Head => {
                        return_plan = ReturnPlan::remain_on_site(
                            &order.site_address,
                            &m.decision.linked_order_number,
                        );
                        reasoning.push(format!(
                            "{phase}: head co-join with order {}: {} remains on site and proceeds to the next job ({} min waiting).",
                            m.decision.linked_order_number,
                            m.team,
                            m.decision.waiting_minutes
                        ));
                    }
                }
                team = m.team;
                co_join = Some(m.decision);
            }
        }
    }

    let soft_cap = ai.max_jobs_per_day;
    if soft_cap > 0 && index.task_count(team) + 1 > soft_cap {
        reasoning.push(format!(
            "{phase}: {team} would carry {} tasks on {date}, above the soft limit of {soft_cap}/day.",
            index.task_count(team) + 1
        ));
    }

    let within_preferred = match (preferred_time, window_mode) {
        (Some(pref), TimeWindowMode::Strict) => start == pref,
        (Some(_), TimeWindowMode::Flexible) => true, // same-day best effort
        (None, _) => true,
    } && order.preferred_date(phase) == Some(date);

    let proposal = PhaseProposal {
        phase,
        date,
        team,
        departure_source,
        departure_address,
        departure_time: minutes_to_time(start - leg_travel),
        travel_minutes: leg_travel,
        arrival_time: minutes_to_time(start),
        work_minutes,
        buffer_minutes,
        end_time: minutes_to_time(start + work_minutes + buffer_minutes),
        distance_km: req.distance_km,
        return_plan,
        co_join,
    };

    Ok(Some(PhaseOutcome {
        proposal,
        conflict_free: conflict.is_none(),
        within_preferred,
    }))
}

/// Is any other team conflict-free for every planned interval? Drives the
/// overtime recommendation (deploy-new-team only makes sense if a team is
/// actually available).
fn alternative_team_exists(
    req: &ScheduleRequest,
    setup: &Option<PhaseOutcome>,
    dismantle: &Option<PhaseOutcome>,
) -> bool {
    let planned: Vec<&PhaseOutcome> = [setup, dismantle].into_iter().flatten().collect();
    if planned.is_empty() {
        return false;
    }

    Team::ALL.iter().any(|team| {
        if req.excluded_teams.contains(team) {
            return false;
        }
        planned.iter().all(|o| {
            if o.proposal.team == *team {
                return false;
            }
            let index = WorkloadIndex::build(
                req.all_orders,
                o.proposal.date,
                Some(req.order.order_number.as_str()),
            );
            let (start, end) = interval_of(&o.proposal);
            index.find_conflict(*team, start, end).is_none()
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderItem, PhasePlan, TaskMinutes};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    fn app_settings(work_minutes_per_unit: i32) -> AppSettings {
        let mut app = AppSettings {
            work_start_time: "08:00".to_string(),
            work_end_time: "16:30".to_string(),
            ..Default::default()
        };
        app.inventory_task_minutes.insert(
            "marquee".to_string(),
            TaskMinutes {
                setup_minutes: work_minutes_per_unit,
                dismantle_minutes: work_minutes_per_unit,
            },
        );
        app
    }

    fn ai_settings() -> AiSettings {
        AiSettings {
            buffer_time_minutes: 15,
            minutes_per_km: 3.0,
            ..Default::default()
        }
    }

    fn order_x() -> Order {
        Order {
            order_number: "X".to_string(),
            site_address: "12 Festival Grounds".to_string(),
            preferred_setup_date: Some(date()),
            preferred_setup_time: Some("09:00".to_string()),
            items: vec![OrderItem {
                item_type_id: "marquee".to_string(),
                quantity: 1,
            }],
            ..Default::default()
        }
    }

    fn no_site_distance(_: &str, _: &str) -> Option<f64> {
        None
    }

    fn request<'a>(
        order: &'a Order,
        all: &'a [Order],
        ai: &'a AiSettings,
        app: &'a AppSettings,
    ) -> ScheduleRequest<'a> {
        ScheduleRequest {
            order,
            all_orders: all,
            ai_settings: ai,
            app_settings: app,
            distance_km: 20.0,
            allow_co_join: true,
            excluded_teams: vec![],
            preferred_setup_team: None,
            preferred_dismantle_team: None,
        }
    }

    // Scenario A: 20 km at 3 min/km → 60 min travel; departure 08:00,
    // arrival 09:00; work 90 + buffer 15 → end 10:45; no overtime.
    #[test]
    fn scenario_a_no_overtime() {
        let order = order_x();
        let ai = ai_settings();
        let app = app_settings(90);
        let all = vec![order.clone()];
        let req = request(&order, &all, &ai, &app);

        let proposal = run_ai_schedule(&req, &no_site_distance).unwrap();
        let setup = proposal.setup.unwrap();
        assert_eq!(setup.travel_minutes, 60);
        assert_eq!(setup.departure_time, "08:00");
        assert_eq!(setup.arrival_time, "09:00");
        assert_eq!(setup.end_time, "10:45");
        assert!(!proposal.overtime.required);
        assert!(proposal.no_overlap);
        assert!(proposal.within_preferred);
    }

    // Scenario B: work 480 min → end 17:45 > 16:30 → OT with deploy-new-team.
    #[test]
    fn scenario_b_overtime_recommends_new_team() {
        let order = order_x();
        let ai = ai_settings();
        let app = app_settings(480);
        let all = vec![order.clone()];
        let req = request(&order, &all, &ai, &app);

        let proposal = run_ai_schedule(&req, &no_site_distance).unwrap();
        assert_eq!(proposal.setup.as_ref().unwrap().end_time, "17:45");
        assert!(proposal.overtime.required);
        assert_eq!(
            proposal.overtime.recommendation,
            Some(crate::types::OvertimeRecommendation::DeployNewTeam)
        );
    }

    // Scenario C: order Y's dismantle ends 14:00 at a site 8 km away;
    // candidate Z setting up at 14:30 gets a tail co-join with Y.
    #[test]
    fn scenario_c_tail_co_join_proposed() {
        let mut linked = Order {
            order_number: "Y".to_string(),
            site_address: "Site S".to_string(),
            ..Default::default()
        };
        linked.schedule.dismantle = Some(PhasePlan {
            date: Some(date()),
            team: Some(Team::Bravo),
            start_time: Some("12:00".to_string()),
            work_minutes: 120,
            ..Default::default()
        });

        let order = Order {
            order_number: "Z".to_string(),
            site_address: "Site Z".to_string(),
            preferred_setup_date: Some(date()),
            preferred_setup_time: Some("14:30".to_string()),
            items: vec![OrderItem {
                item_type_id: "marquee".to_string(),
                quantity: 1,
            }],
            ..Default::default()
        };

        let ai = ai_settings();
        let app = app_settings(60);
        let all = vec![linked, order.clone()];
        let req = request(&order, &all, &ai, &app);
        let site_distance = |_: &str, _: &str| Some(8.0);

        let proposal = run_ai_schedule(&req, &site_distance).unwrap();
        let setup = proposal.setup.unwrap();
        let decision = setup.co_join.expect("tail co-join");
        assert!(decision.applied);
        assert_eq!(decision.co_join_type, CoJoinType::Tail);
        assert_eq!(decision.linked_order_number, "Y");
        assert_eq!(setup.team, Team::Bravo);
        assert_eq!(setup.departure_address, "Site S");
        assert_eq!(setup.departure_source, "co-join");
        let update = decision.linked_order_update.unwrap();
        assert_eq!(update.order_number, "Y");
        assert_eq!(update.next_task_order_number, "Z");
    }

    // Scenario D: preferred team already booked 09:00–11:00; a strict
    // 10:00 request is flagged with the clashing order named.
    #[test]
    fn scenario_d_conflict_flagged_with_named_order() {
        let mut booked = Order {
            order_number: "BOOKED".to_string(),
            site_address: "Elsewhere".to_string(),
            ..Default::default()
        };
        booked.schedule.setup = Some(PhasePlan {
            date: Some(date()),
            team: Some(Team::Alpha),
            start_time: Some("09:00".to_string()),
            work_minutes: 120,
            ..Default::default()
        });

        let mut order = order_x();
        order.preferred_setup_time = Some("10:00".to_string());
        order.setup_window_mode = TimeWindowMode::Strict;

        let ai = ai_settings();
        let app = app_settings(105);
        let all = vec![booked, order.clone()];
        let mut req = request(&order, &all, &ai, &app);
        req.preferred_setup_team = Some(Team::Alpha);
        req.allow_co_join = false;

        let proposal = run_ai_schedule(&req, &no_site_distance).unwrap();
        assert!(!proposal.no_overlap);
        assert!(proposal
            .reasoning
            .iter()
            .any(|line| line.contains("BOOKED")));
        // Best-effort proposal still returned with the requested team.
        assert_eq!(proposal.setup.unwrap().team, Team::Alpha);
    }

    #[test]
    fn flexible_window_shifts_past_a_clash() {
        // Every team busy 09:00–11:00 except via a later slot.
        let mut all = Vec::new();
        for (i, team) in Team::ALL.iter().enumerate() {
            let mut o = Order {
                order_number: format!("B{i}"),
                site_address: "Busy site".to_string(),
                ..Default::default()
            };
            o.schedule.setup = Some(PhasePlan {
                date: Some(date()),
                team: Some(*team),
                start_time: Some("09:00".to_string()),
                work_minutes: 120,
                ..Default::default()
            });
            all.push(o);
        }

        let order = order_x(); // flexible by default, preferred 09:00
        all.push(order.clone());
        let ai = ai_settings();
        let app = app_settings(60);
        let mut req = request(&order, &all, &ai, &app);
        req.allow_co_join = false;

        let proposal = run_ai_schedule(&req, &no_site_distance).unwrap();
        assert!(proposal.no_overlap);
        let setup = proposal.setup.unwrap();
        assert_eq!(setup.arrival_time, "11:00");
        assert!(proposal.reasoning.iter().any(|l| l.contains("shifted")));
    }

    #[test]
    fn least_loaded_team_preferred() {
        let mut busy = Order {
            order_number: "B1".to_string(),
            site_address: "Busy".to_string(),
            ..Default::default()
        };
        busy.schedule.setup = Some(PhasePlan {
            date: Some(date()),
            team: Some(Team::Alpha),
            start_time: Some("13:00".to_string()),
            work_minutes: 60,
            ..Default::default()
        });

        let order = order_x();
        let all = vec![busy, order.clone()];
        let ai = ai_settings();
        let app = app_settings(60);
        let mut req = request(&order, &all, &ai, &app);
        req.allow_co_join = false;

        let proposal = run_ai_schedule(&req, &no_site_distance).unwrap();
        // Alpha has a task; Bravo is the first team with zero workload.
        assert_eq!(proposal.setup.unwrap().team, Team::Bravo);
        let alpha = proposal
            .workload
            .iter()
            .find(|w| w.team == Team::Alpha)
            .unwrap();
        assert_eq!(alpha.tasks, 1);
    }

    #[test]
    fn long_travel_warning_added() {
        let order = order_x();
        let ai = ai_settings();
        let app = app_settings(60);
        let all = vec![order.clone()];
        let mut req = request(&order, &all, &ai, &app);
        req.distance_km = 75.0;

        let proposal = run_ai_schedule(&req, &no_site_distance).unwrap();
        assert!(proposal.reasoning.iter().any(|l| l.contains("Long travel")));
    }

    #[test]
    fn no_schedulable_phase_is_an_error() {
        let order = Order {
            order_number: "EMPTY".to_string(),
            ..Default::default()
        };
        let ai = ai_settings();
        let app = app_settings(60);
        let all = vec![order.clone()];
        let req = request(&order, &all, &ai, &app);

        let err = run_ai_schedule(&req, &no_site_distance).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidSchedule { .. }));
    }

    #[test]
    fn dismantle_sees_setup_interval_on_shared_date() {
        // Same date, same preferred times: the dismantle must not land on
        // the same team at an overlapping time.
        let mut order = order_x();
        order.preferred_dismantle_date = Some(date());
        order.preferred_dismantle_time = Some("09:30".to_string());

        let ai = ai_settings();
        let app = app_settings(120);
        let all = vec![order.clone()];
        let mut req = request(&order, &all, &ai, &app);
        req.allow_co_join = false;

        let proposal = run_ai_schedule(&req, &no_site_distance).unwrap();
        let setup = proposal.setup.unwrap();
        let dismantle = proposal.dismantle.unwrap();
        if setup.team == dismantle.team {
            let (s0, s1) = (
                time_to_minutes(&setup.arrival_time).unwrap(),
                time_to_minutes(&setup.end_time).unwrap(),
            );
            let (d0, d1) = (
                time_to_minutes(&dismantle.arrival_time).unwrap(),
                time_to_minutes(&dismantle.end_time).unwrap(),
            );
            assert!(d1 <= s0 || d0 >= s1, "phases overlap on one team");
        }
        assert!(proposal.no_overlap);
    }

    #[test]
    fn hub_return_leg_counts_toward_the_conflict_window() {
        // The candidate's task ends 10:45 but the crew is only back at the
        // hub at 11:45, so an 11:00 task for the same team is a real clash.
        let mut later = Order {
            order_number: "LATER".to_string(),
            site_address: "Elsewhere".to_string(),
            ..Default::default()
        };
        later.schedule.setup = Some(PhasePlan {
            date: Some(date()),
            team: Some(Team::Alpha),
            start_time: Some("11:00".to_string()),
            work_minutes: 120,
            ..Default::default()
        });

        let mut order = order_x();
        order.setup_window_mode = TimeWindowMode::Strict;

        let ai = ai_settings();
        let app = app_settings(90);
        let all = vec![later, order.clone()];
        let mut req = request(&order, &all, &ai, &app);
        req.preferred_setup_team = Some(Team::Alpha);
        req.allow_co_join = false;

        let proposal = run_ai_schedule(&req, &no_site_distance).unwrap();
        assert!(!proposal.no_overlap);
        assert!(proposal.reasoning.iter().any(|l| l.contains("LATER")));
    }

    #[test]
    fn conflict_free_proposal_survives_the_commit_recheck() {
        use crate::services::commit::apply_schedule;
        use crate::store::MemoryOrderStore;

        // Alpha's 11:00 task clashes with the candidate's hub return; the
        // engine must route around it and the apply step must then accept
        // the proposal as-is.
        let mut later = Order {
            order_number: "LATER".to_string(),
            site_address: "Elsewhere".to_string(),
            ..Default::default()
        };
        later.schedule.setup = Some(PhasePlan {
            date: Some(date()),
            team: Some(Team::Alpha),
            start_time: Some("11:00".to_string()),
            work_minutes: 120,
            ..Default::default()
        });

        let order = order_x();
        let ai = ai_settings();
        let app = app_settings(90);
        let all = vec![later, order.clone()];
        let mut req = request(&order, &all, &ai, &app);
        req.allow_co_join = false;

        let proposal = run_ai_schedule(&req, &no_site_distance).unwrap();
        assert!(proposal.no_overlap);
        assert_ne!(proposal.setup.as_ref().unwrap().team, Team::Alpha);

        let store = MemoryOrderStore::with_orders(all);
        let outcome = apply_schedule(&store, &proposal).unwrap();
        assert!(outcome.primary_updated);
    }

    #[test]
    fn flexible_window_probes_earlier_slots_too() {
        // Alpha is busy from 12:45; starting 15 minutes earlier than the
        // preferred 10:00 clears the return leg, and that slot is nearer
        // than anything later in the day.
        let mut busy = Order {
            order_number: "B1".to_string(),
            site_address: "Busy".to_string(),
            ..Default::default()
        };
        busy.schedule.setup = Some(PhasePlan {
            date: Some(date()),
            team: Some(Team::Alpha),
            start_time: Some("12:45".to_string()),
            work_minutes: 60,
            ..Default::default()
        });

        let mut order = order_x();
        order.preferred_setup_time = Some("10:00".to_string());

        let ai = ai_settings();
        let app = app_settings(105);
        let all = vec![busy, order.clone()];
        let mut req = request(&order, &all, &ai, &app);
        req.preferred_setup_team = Some(Team::Alpha);
        req.allow_co_join = false;

        let proposal = run_ai_schedule(&req, &no_site_distance).unwrap();
        assert!(proposal.no_overlap);
        let setup = proposal.setup.unwrap();
        assert_eq!(setup.arrival_time, "09:45");
        assert!(proposal.reasoning.iter().any(|l| l.contains("shifted")));
    }

    #[test]
    fn return_plan_defaults_to_hub_with_arrival() {
        let order = order_x();
        let ai = ai_settings();
        let app = app_settings(90);
        let all = vec![order.clone()];
        let mut req = request(&order, &all, &ai, &app);
        req.allow_co_join = false;

        let proposal = run_ai_schedule(&req, &no_site_distance).unwrap();
        let setup = proposal.setup.unwrap();
        assert_eq!(
            setup.return_plan.policy,
            crate::types::ReturnPolicy::ReturnToHub
        );
        // end 10:45 + 60 min travel back
        assert_eq!(setup.return_plan.arrival_time.as_deref(), Some("11:45"));
    }
}
