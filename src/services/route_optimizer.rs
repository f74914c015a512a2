//! Daily route optimizer.
//!
//! For one team and one date: take the stops already on the books, build
//! the route in its currently scheduled order, then a greedy
//! nearest-neighbor reordering, and report the distance/time difference.
//! Strict-window stops keep their fixed times and co-joined pairs stay
//! adjacent. The reorder step sits behind [`RouteStrategy`] so a stronger
//! solver can be dropped in without touching the rest of this module.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ScheduleResult;
use crate::services::cojoin::SiteDistanceFn;
use crate::services::timeutil::{minutes_to_time, travel_minutes};
use crate::services::workload::WorkloadIndex;
use crate::store::OrderStore;
use crate::types::{AiSettings, Order, Phase, ReturnPolicy, Team, TimeWindowMode};

/// One job on a team's day, as stored.
#[derive(Debug, Clone)]
pub struct RouteStop {
    pub order_number: String,
    pub phase: Phase,
    pub site_address: String,
    /// Scheduled on-site arrival, minute offset from midnight.
    pub scheduled_arrival_minutes: i32,
    pub work_minutes: i32,
    pub buffer_minutes: i32,
    /// Stored inbound leg, used when a fresh distance is unresolvable.
    pub stored_distance_km: Option<f64>,
    pub stored_travel_minutes: Option<i32>,
    /// Strict customer window: the arrival time may not move.
    pub rigid: bool,
    /// Chained onward order when this stop ends with remain-on-site.
    pub co_join_next: Option<String>,
}

/// Where (and when) the team leaves from at the start of the day.
#[derive(Debug, Clone)]
pub struct RouteStart {
    pub address: String,
    /// Departure minute offset, typically the working-day start.
    pub time_minutes: i32,
}

/// A stop with recomputed times after a forward walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedStop {
    pub order_number: String,
    pub phase: Phase,
    pub site_address: String,
    pub departure_address: String,
    pub departure_time: String,
    pub travel_minutes: i32,
    pub distance_km: Option<f64>,
    pub arrival_time: String,
    pub end_time: String,
    pub rigid: bool,
    pub co_joined: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlan {
    pub stops: Vec<PlannedStop>,
    pub total_distance_km: f64,
    /// First departure to last on-site finish.
    pub total_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteComparison {
    pub team: Team,
    pub date: NaiveDate,
    pub original: RoutePlan,
    pub optimized: RoutePlan,
    pub distance_saved_km: f64,
    pub time_saved_minutes: i32,
    pub percent_saved: f64,
}

/// Pluggable reordering step. Returns indices into `stops` in visit order.
pub trait RouteStrategy {
    fn reorder(
        &self,
        stops: &[RouteStop],
        start: &RouteStart,
        site_distance_km: SiteDistanceFn,
    ) -> Vec<usize>;
}

/// Collect a team's stops on a date, sorted by scheduled start.
pub fn collect_team_stops(orders: &[Order], team: Team, date: NaiveDate) -> Vec<RouteStop> {
    let index = WorkloadIndex::build(orders, date, None);
    index
        .intervals(team)
        .iter()
        .filter_map(|interval| {
            let order = orders
                .iter()
                .find(|o| o.order_number == interval.order_number)?;
            let plan = order.schedule.phase(interval.phase)?;
            let co_join_next = plan
                .return_plan
                .as_ref()
                .filter(|r| r.policy == ReturnPolicy::RemainOnSite)
                .and_then(|r| r.next_task_order_number.clone());
            Some(RouteStop {
                order_number: interval.order_number.clone(),
                phase: interval.phase,
                site_address: order.site_address.clone(),
                scheduled_arrival_minutes: interval.start_minutes,
                work_minutes: plan.work_minutes,
                buffer_minutes: plan.buffer_minutes,
                stored_distance_km: plan.distance_km,
                stored_travel_minutes: plan.travel_minutes,
                rigid: order.window_mode(interval.phase) == TimeWindowMode::Strict,
                co_join_next,
            })
        })
        .collect()
}

/// Build the baseline and optimized routes and the savings between them.
/// Savings are clamped at zero when the reordering found no improvement.
pub fn optimize_route(
    orders: &[Order],
    team: Team,
    date: NaiveDate,
    start: &RouteStart,
    ai: &AiSettings,
    strategy: &dyn RouteStrategy,
    site_distance_km: SiteDistanceFn,
) -> RouteComparison {
    let stops = collect_team_stops(orders, team, date);
    let identity: Vec<usize> = (0..stops.len()).collect();
    let original = walk_route(&stops, &identity, start, ai, site_distance_km);

    let order = strategy.reorder(&stops, start, site_distance_km);
    let optimized = walk_route(&stops, &order, start, ai, site_distance_km);

    let distance_saved_km =
        (original.total_distance_km - optimized.total_distance_km).max(0.0);
    let time_saved_minutes = (original.total_minutes - optimized.total_minutes).max(0);
    let percent_saved = if original.total_distance_km > 0.0 {
        (distance_saved_km / original.total_distance_km * 100.0 * 10.0).round() / 10.0
    } else {
        0.0
    };

    tracing::info!(
        team = %team,
        %date,
        stops = stops.len(),
        distance_saved_km,
        time_saved_minutes,
        "route optimization computed"
    );

    RouteComparison {
        team,
        date,
        original,
        optimized,
        distance_saved_km,
        time_saved_minutes,
        percent_saved,
    }
}

/// Write a plan's recomputed times back onto the affected orders in one
/// batch. Returns the number of phase plans updated.
pub fn apply_route(
    store: &dyn OrderStore,
    date: NaiveDate,
    plan: &RoutePlan,
) -> ScheduleResult<usize> {
    let mut updated = 0;
    for stop in &plan.stops {
        // Only count stops whose plan was actually rewritten; an order may
        // have been rescheduled since the route was computed.
        let mut wrote = false;
        store.update_order_by_number(&stop.order_number, &mut |order| {
            if let Some(phase_plan) = order.schedule.phase_mut(stop.phase).as_mut() {
                if phase_plan.date != Some(date) {
                    return;
                }
                phase_plan.departure_address = Some(stop.departure_address.clone());
                phase_plan.departure_time = Some(stop.departure_time.clone());
                phase_plan.travel_minutes = Some(stop.travel_minutes);
                if stop.distance_km.is_some() {
                    phase_plan.distance_km = stop.distance_km;
                }
                phase_plan.start_time = Some(stop.arrival_time.clone());
                phase_plan.end_time = Some(stop.end_time.clone());
                wrote = true;
            }
        })?;
        if wrote {
            updated += 1;
        }
    }
    tracing::info!(stops = updated, %date, "route applied");
    Ok(updated)
}

/// Forward time walk over `order`, recomputing every leg from the start
/// point. Rigid stops never start before their fixed time; the team waits.
fn walk_route(
    stops: &[RouteStop],
    order: &[usize],
    start: &RouteStart,
    ai: &AiSettings,
    site_distance_km: SiteDistanceFn,
) -> RoutePlan {
    let mut planned = Vec::with_capacity(order.len());
    let mut at = start.address.clone();
    let mut now = start.time_minutes;
    let mut total_distance = 0.0;

    for &i in order {
        let stop = &stops[i];
        let km = site_distance_km(&at, &stop.site_address).or(stop.stored_distance_km);
        let leg_minutes = km
            .map(|k| travel_minutes(k, ai.minutes_per_km))
            .or(stop.stored_travel_minutes)
            .unwrap_or(0);
        total_distance += km.unwrap_or(0.0);

        let mut arrival = now + leg_minutes;
        if stop.rigid {
            arrival = arrival.max(stop.scheduled_arrival_minutes);
        }
        let departure = arrival - leg_minutes;
        let end = arrival + stop.work_minutes.max(0) + stop.buffer_minutes.max(0);

        planned.push(PlannedStop {
            order_number: stop.order_number.clone(),
            phase: stop.phase,
            site_address: stop.site_address.clone(),
            departure_address: at.clone(),
            departure_time: minutes_to_time(departure),
            travel_minutes: leg_minutes,
            distance_km: km,
            arrival_time: minutes_to_time(arrival),
            end_time: minutes_to_time(end),
            rigid: stop.rigid,
            co_joined: stop.co_join_next.is_some(),
        });

        at = stop.site_address.clone();
        now = end;
    }

    RoutePlan {
        stops: planned,
        total_distance_km: (total_distance * 10.0).round() / 10.0,
        total_minutes: if order.is_empty() {
            0
        } else {
            now - start.time_minutes
        },
    }
}

/// Greedy nearest-unvisited-next reordering.
///
/// Stops are grouped into units first: a remain-on-site chain is one unit
/// and is never split. Units containing a rigid stop are only taken in
/// their original order, and a flexible unit is skipped when the detour
/// would arrive late at the next rigid stop's fixed time.
pub struct NearestNeighborStrategy {
    /// Travel-time estimate used when checking rigid-stop deadlines.
    pub minutes_per_km: f64,
}

impl Default for NearestNeighborStrategy {
    fn default() -> Self {
        Self {
            minutes_per_km: AiSettings::default().minutes_per_km,
        }
    }
}

struct Unit {
    indices: Vec<usize>,
    rigid: bool,
    /// Fixed-arrival deadline for the first rigid stop, adjusted for the
    /// service time ahead of it inside the unit.
    deadline: Option<i32>,
    duration_minutes: i32,
}

impl RouteStrategy for NearestNeighborStrategy {
    fn reorder(
        &self,
        stops: &[RouteStop],
        start: &RouteStart,
        site_distance_km: SiteDistanceFn,
    ) -> Vec<usize> {
        let units = build_units(stops, self.minutes_per_km, site_distance_km);
        let mut rigid: Vec<usize> = (0..units.len()).filter(|&u| units[u].rigid).collect();
        let mut flexible: Vec<usize> = (0..units.len()).filter(|&u| !units[u].rigid).collect();

        let mut order = Vec::with_capacity(stops.len());
        let mut at = start.address.clone();
        let mut now = start.time_minutes;

        while !rigid.is_empty() || !flexible.is_empty() {
            let nearest = flexible
                .iter()
                .copied()
                .min_by(|&a, &b| {
                    let da = unit_leg(stops, &units[a], &at, site_distance_km);
                    let db = unit_leg(stops, &units[b], &at, site_distance_km);
                    da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
                });

            // Take the nearest flexible unit unless that detour would miss
            // the next rigid stop's fixed time.
            let choice = match (nearest, rigid.first().copied()) {
                (Some(f), Some(r)) => {
                    if fits_before(
                        stops,
                        &units,
                        f,
                        r,
                        &at,
                        now,
                        self.minutes_per_km,
                        site_distance_km,
                    ) {
                        Pick::Flexible(f)
                    } else {
                        Pick::Rigid(r)
                    }
                }
                (Some(f), None) => Pick::Flexible(f),
                (None, Some(r)) => Pick::Rigid(r),
                (None, None) => break,
            };

            let unit_idx = match choice {
                Pick::Flexible(u) => {
                    flexible.retain(|&x| x != u);
                    u
                }
                Pick::Rigid(u) => {
                    rigid.remove(0);
                    u
                }
            };

            let unit = &units[unit_idx];
            let first = &stops[unit.indices[0]];
            let leg_km = site_distance_km(&at, &first.site_address)
                .or(first.stored_distance_km)
                .unwrap_or(0.0);
            let mut arrival = now + travel_minutes(leg_km, self.minutes_per_km);
            if let Some(deadline) = unit.deadline {
                arrival = arrival.max(deadline);
            }
            now = arrival + unit.duration_minutes;
            at = stops[*unit.indices.last().unwrap()].site_address.clone();
            order.extend(unit.indices.iter().copied());
        }

        order
    }
}

enum Pick {
    Flexible(usize),
    Rigid(usize),
}

/// Merge remain-on-site chains into single units; stops arrive sorted by
/// scheduled start so a chain's members are consecutive.
fn build_units(
    stops: &[RouteStop],
    minutes_per_km: f64,
    site_distance_km: SiteDistanceFn,
) -> Vec<Unit> {
    let mut units = Vec::new();
    let mut i = 0;
    while i < stops.len() {
        let mut indices = vec![i];
        while let Some(next) = stops.get(indices[indices.len() - 1] + 1) {
            let last = &stops[*indices.last().unwrap()];
            if last.co_join_next.as_deref() == Some(next.order_number.as_str()) {
                indices.push(indices[indices.len() - 1] + 1);
            } else {
                break;
            }
        }
        i = indices[indices.len() - 1] + 1;

        let mut duration = 0;
        let mut deadline = None;
        for (pos, &idx) in indices.iter().enumerate() {
            let stop = &stops[idx];
            if stop.rigid && deadline.is_none() {
                deadline = Some(stop.scheduled_arrival_minutes - duration);
            }
            duration += stop.work_minutes.max(0) + stop.buffer_minutes.max(0);
            if pos + 1 < indices.len() {
                let next = &stops[indices[pos + 1]];
                let km = site_distance_km(&stop.site_address, &next.site_address)
                    .or(next.stored_distance_km)
                    .unwrap_or(0.0);
                duration += travel_minutes(km, minutes_per_km);
            }
        }

        units.push(Unit {
            rigid: indices.iter().any(|&idx| stops[idx].rigid),
            deadline,
            duration_minutes: duration,
            indices,
        });
    }
    units
}

fn unit_leg(
    stops: &[RouteStop],
    unit: &Unit,
    from: &str,
    site_distance_km: SiteDistanceFn,
) -> f64 {
    let first = &stops[unit.indices[0]];
    site_distance_km(from, &first.site_address)
        .or(first.stored_distance_km)
        .unwrap_or(f64::MAX)
}

#[allow(clippy::too_many_arguments)]
fn fits_before(
    stops: &[RouteStop],
    units: &[Unit],
    flexible: usize,
    rigid: usize,
    at: &str,
    now: i32,
    minutes_per_km: f64,
    site_distance_km: SiteDistanceFn,
) -> bool {
    let Some(deadline) = units[rigid].deadline else {
        return true;
    };
    let flex = &units[flexible];
    let leg_in = site_distance_km(at, &stops[flex.indices[0]].site_address).unwrap_or(0.0);
    let last_site = &stops[*flex.indices.last().unwrap()].site_address;
    let leg_out = site_distance_km(last_site, &stops[units[rigid].indices[0]].site_address)
        .unwrap_or(0.0);
    now + travel_minutes(leg_in, minutes_per_km)
        + flex.duration_minutes
        + travel_minutes(leg_out, minutes_per_km)
        <= deadline
}
