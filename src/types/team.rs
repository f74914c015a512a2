//! Team roster and scheduling phases

use serde::{Deserialize, Serialize};
use std::fmt;

/// A delivery/setup team. The roster is fixed; a team is a scheduling resource,
/// not a stored entity; its day state is derived each time by scanning all
/// orders for intervals assigned to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Team {
    Alpha,
    Bravo,
    Charlie,
    Delta,
    Echo,
}

impl Team {
    /// Canonical roster order, used for stable workload ranking.
    pub const ALL: [Team; 5] = [Team::Alpha, Team::Bravo, Team::Charlie, Team::Delta, Team::Echo];

    pub fn name(&self) -> &'static str {
        match self {
            Team::Alpha => "Team Alpha",
            Team::Bravo => "Team Bravo",
            Team::Charlie => "Team Charlie",
            Team::Delta => "Team Delta",
            Team::Echo => "Team Echo",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Scheduling phase of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Setup,
    Dismantle,
    /// Single-task ad-hoc orders (e.g. a repair visit). Counts toward
    /// workload and conflicts but is never scheduled by the engine itself.
    Adhoc,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Setup => "setup",
            Phase::Dismantle => "dismantle",
            Phase::Adhoc => "adhoc",
        };
        f.write_str(s)
    }
}

/// How strictly a customer-preferred time must be honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeWindowMode {
    /// Must match the preferred time exactly.
    Strict,
    /// Advisory only; the nearest feasible slot on the same day is fine.
    #[default]
    Flexible,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_serializes_kebab_case() {
        assert_eq!(serde_json::to_string(&Team::Alpha).unwrap(), "\"alpha\"");
        let t: Team = serde_json::from_str("\"charlie\"").unwrap();
        assert_eq!(t, Team::Charlie);
    }

    #[test]
    fn roster_has_five_teams_in_canonical_order() {
        assert_eq!(Team::ALL.len(), 5);
        assert_eq!(Team::ALL[0], Team::Alpha);
        assert_eq!(Team::ALL[4], Team::Echo);
    }

    #[test]
    fn window_mode_defaults_to_flexible() {
        assert_eq!(TimeWindowMode::default(), TimeWindowMode::Flexible);
    }
}
