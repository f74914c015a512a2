//! Order and schedule-record types
//!
//! The order is the unit of persistence. Scheduling state lives in the
//! nested [`ScheduleRecord`]; everything else on the order is input the
//! engine treats as opaque.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Phase, Team, TimeWindowMode};

/// Coarse order lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    #[default]
    Draft,
    Scheduling,
    Packing,
    SettingUp,
    Dismantling,
    Completed,
    /// Branch for ad-hoc single-task orders.
    AdhocTask,
}

/// A rented line item; scheduling only cares about the derived task minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub item_type_id: String,
    pub quantity: i32,
}

/// What the team does after finishing a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReturnPolicy {
    #[default]
    ReturnToHub,
    /// Stay at the site, usually because a co-joined task follows.
    RemainOnSite,
}

/// Per-phase return leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnPlan {
    pub policy: ReturnPolicy,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    /// Return travel time; set when returning to hub.
    pub travel_minutes: Option<i32>,
    /// Hub arrival "HH:MM"; may fall on the next calendar day when the
    /// return spans midnight.
    pub arrival_time: Option<String>,
    /// Set when remaining on site because a co-joined task follows.
    pub next_task_order_number: Option<String>,
}

impl ReturnPlan {
    pub fn return_to_hub(from: &str, hub: &str, travel_minutes: i32, arrival_time: &str) -> Self {
        Self {
            policy: ReturnPolicy::ReturnToHub,
            from_address: Some(from.to_string()),
            to_address: Some(hub.to_string()),
            travel_minutes: Some(travel_minutes),
            arrival_time: Some(arrival_time.to_string()),
            next_task_order_number: None,
        }
    }

    pub fn remain_on_site(site: &str, next_order: &str) -> Self {
        Self {
            policy: ReturnPolicy::RemainOnSite,
            from_address: Some(site.to_string()),
            to_address: None,
            travel_minutes: None,
            arrival_time: None,
            next_task_order_number: Some(next_order.to_string()),
        }
    }
}

/// Mutable scheduling state for one phase of an order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhasePlan {
    pub date: Option<NaiveDate>,
    pub team: Option<Team>,
    /// "hub" or the address of a preceding co-joined site.
    pub departure_source: Option<String>,
    pub departure_address: Option<String>,
    /// "HH:MM"
    pub departure_time: Option<String>,
    pub travel_minutes: Option<i32>,
    pub distance_km: Option<f64>,
    pub work_minutes: i32,
    pub buffer_minutes: i32,
    pub buffer_reason: Option<String>,
    /// Computed task window, "HH:MM".
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub return_plan: Option<ReturnPlan>,
}

/// The scheduling state of an order, one slot per phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRecord {
    pub setup: Option<PhasePlan>,
    pub dismantle: Option<PhasePlan>,
    pub adhoc: Option<PhasePlan>,
}

impl ScheduleRecord {
    pub fn phase(&self, phase: Phase) -> Option<&PhasePlan> {
        match phase {
            Phase::Setup => self.setup.as_ref(),
            Phase::Dismantle => self.dismantle.as_ref(),
            Phase::Adhoc => self.adhoc.as_ref(),
        }
    }

    pub fn phase_mut(&mut self, phase: Phase) -> &mut Option<PhasePlan> {
        match phase {
            Phase::Setup => &mut self.setup,
            Phase::Dismantle => &mut self.dismantle,
            Phase::Adhoc => &mut self.adhoc,
        }
    }

    pub fn phases(&self) -> impl Iterator<Item = (Phase, &PhasePlan)> {
        [
            (Phase::Setup, self.setup.as_ref()),
            (Phase::Dismantle, self.dismantle.as_ref()),
            (Phase::Adhoc, self.adhoc.as_ref()),
        ]
        .into_iter()
        .filter_map(|(p, plan)| plan.map(|pl| (p, pl)))
    }
}

/// A sales order (the subset relevant to scheduling).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Unique, human-readable, immutable once created.
    pub order_number: String,
    pub customer_name: String,
    /// Event site: destination of setup, origin of dismantle.
    pub site_address: String,
    pub event_date: Option<NaiveDate>,
    pub preferred_setup_date: Option<NaiveDate>,
    /// "HH:MM"
    pub preferred_setup_time: Option<String>,
    pub setup_window_mode: TimeWindowMode,
    pub preferred_dismantle_date: Option<NaiveDate>,
    pub preferred_dismantle_time: Option<String>,
    pub dismantle_window_mode: TimeWindowMode,
    pub items: Vec<OrderItem>,
    pub schedule: ScheduleRecord,
    pub status: OrderStatus,
}

impl Order {
    pub fn window_mode(&self, phase: Phase) -> TimeWindowMode {
        match phase {
            Phase::Dismantle => self.dismantle_window_mode,
            _ => self.setup_window_mode,
        }
    }

    pub fn preferred_date(&self, phase: Phase) -> Option<NaiveDate> {
        match phase {
            Phase::Setup => self.preferred_setup_date.or(self.event_date),
            Phase::Dismantle => self.preferred_dismantle_date.or(self.event_date),
            Phase::Adhoc => self.event_date,
        }
    }

    pub fn preferred_time(&self, phase: Phase) -> Option<&str> {
        match phase {
            Phase::Setup => self.preferred_setup_time.as_deref(),
            Phase::Dismantle => self.preferred_dismantle_time.as_deref(),
            Phase::Adhoc => None,
        }
    }
}
