//! Scheduler and application settings
//!
//! Pure configuration, read at invocation time and passed explicitly into
//! every core function. The core never reads ambient state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{OrderItem, Phase};

/// AI scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSettings {
    /// Home base, the default departure source and return destination.
    pub hub_address: String,
    /// Buffer added after the work duration of every task.
    pub buffer_time_minutes: i32,
    /// Straight travel-time rate: minutes per driven kilometre.
    pub minutes_per_km: f64,
    /// Maximum site-to-site distance for a co-join pairing.
    pub radius_km: f64,
    /// Maximum idle time between two chained tasks, in hours.
    pub waiting_hours: f64,
    /// Distance above which the reasoning trail carries a long-travel warning.
    pub long_travel_warning_km: f64,
    /// Soft cap on tasks per team per day; exceeding it adds a capacity warning.
    pub max_jobs_per_day: usize,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            hub_address: "Rentops Warehouse, 12 Industrial Park Rd".to_string(),
            buffer_time_minutes: 15,
            minutes_per_km: 3.0,
            radius_km: 10.0,
            waiting_hours: 1.5,
            long_travel_warning_km: 50.0,
            max_jobs_per_day: 3,
        }
    }
}

impl AiSettings {
    /// Waiting threshold in minutes.
    pub fn max_waiting_minutes(&self) -> i32 {
        (self.waiting_hours * 60.0).round() as i32
    }
}

/// Per-item-type task minutes (per unit).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMinutes {
    pub setup_minutes: i32,
    pub dismantle_minutes: i32,
}

/// Application settings relevant to scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// Per-unit task minutes keyed by inventory item type id.
    pub inventory_task_minutes: HashMap<String, TaskMinutes>,
    /// Fallback per-unit minutes for item types without a configured entry.
    pub default_task_minutes: i32,
    /// Working hours window, "HH:MM".
    pub work_start_time: String,
    pub work_end_time: String,
    /// Lunch window, "HH:MM". Displayed to operators; not a hard constraint.
    pub lunch_start_time: String,
    pub lunch_end_time: String,
    /// Flat overtime fee applied to Sunday work (pricing concern, carried
    /// on the settings contract).
    pub sunday_ot_fee: f64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            inventory_task_minutes: HashMap::new(),
            default_task_minutes: 15,
            work_start_time: "08:00".to_string(),
            work_end_time: "16:30".to_string(),
            lunch_start_time: "12:00".to_string(),
            lunch_end_time: "13:00".to_string(),
            sunday_ot_fee: 0.0,
        }
    }
}

impl AppSettings {
    /// Derive the work duration for a phase from the order's item list:
    /// quantity × per-unit-type task minutes, falling back to the default
    /// rate for unconfigured item types.
    pub fn work_minutes(&self, items: &[OrderItem], phase: Phase) -> i32 {
        items
            .iter()
            .map(|item| {
                let per_unit = match self.inventory_task_minutes.get(&item.item_type_id) {
                    Some(t) => match phase {
                        Phase::Dismantle => t.dismantle_minutes,
                        _ => t.setup_minutes,
                    },
                    None => self.default_task_minutes,
                };
                per_unit * item.quantity.max(0)
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, qty: i32) -> OrderItem {
        OrderItem {
            item_type_id: id.to_string(),
            quantity: qty,
        }
    }

    #[test]
    fn work_minutes_uses_configured_per_unit_times() {
        let mut settings = AppSettings::default();
        settings.inventory_task_minutes.insert(
            "tent-6x12".to_string(),
            TaskMinutes {
                setup_minutes: 45,
                dismantle_minutes: 30,
            },
        );

        let items = vec![item("tent-6x12", 2)];
        assert_eq!(settings.work_minutes(&items, Phase::Setup), 90);
        assert_eq!(settings.work_minutes(&items, Phase::Dismantle), 60);
    }

    #[test]
    fn work_minutes_falls_back_to_default_for_unknown_types() {
        let settings = AppSettings::default();
        let items = vec![item("mystery-item", 3)];
        assert_eq!(settings.work_minutes(&items, Phase::Setup), 45);
    }

    #[test]
    fn work_minutes_ignores_negative_quantities() {
        let settings = AppSettings::default();
        let items = vec![item("x", -2), item("y", 1)];
        assert_eq!(settings.work_minutes(&items, Phase::Setup), 15);
    }

    #[test]
    fn waiting_threshold_converts_to_minutes() {
        let settings = AiSettings::default();
        assert_eq!(settings.max_waiting_minutes(), 90);
    }
}
