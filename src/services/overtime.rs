//! Overtime policy evaluator.
//!
//! Company policy avoids overtime: when a proposed end time falls after
//! working hours the default recommendation is to deploy a different
//! team. The recommendation is advisory; the operator always gets the
//! explicit choice between allowing OT and re-running with the proposed
//! team(s) excluded.

use serde::{Deserialize, Serialize};

use crate::services::timeutil::time_to_minutes;
use crate::types::{
    AppSettings, OvertimeDecision, OvertimeRecommendation, Phase, ScheduleProposal,
};

/// Evaluate the proposed per-phase end times against working hours.
///
/// `required` iff any end is strictly after `work_end_time`. When no
/// alternative team is conflict-free the recommendation flips to `accept`
/// (informational only, there is nothing to redeploy to).
pub fn evaluate(
    phase_ends: &[(Phase, i32)],
    settings: &AppSettings,
    alternative_team_free: bool,
) -> OvertimeDecision {
    let Some(work_end) = time_to_minutes(&settings.work_end_time) else {
        // Unparseable configuration: treat as no window, never require OT.
        return OvertimeDecision::default();
    };

    let over: Vec<&(Phase, i32)> = phase_ends.iter().filter(|(_, end)| *end > work_end).collect();
    if over.is_empty() {
        return OvertimeDecision {
            required: false,
            recommendation: None,
            message: None,
        };
    }

    let phases = over
        .iter()
        .map(|(p, end)| {
            format!(
                "{} would end at {} (working hours end {})",
                p,
                crate::services::timeutil::minutes_to_time(*end),
                settings.work_end_time
            )
        })
        .collect::<Vec<_>>()
        .join("; ");

    let recommendation = if alternative_team_free {
        OvertimeRecommendation::DeployNewTeam
    } else {
        OvertimeRecommendation::Accept
    };

    let message = match recommendation {
        OvertimeRecommendation::DeployNewTeam => {
            format!("{phases}. Recommend deploying a different team to avoid overtime.")
        }
        OvertimeRecommendation::Accept => {
            format!("{phases}. No conflict-free alternative team available; overtime needed.")
        }
    };

    OvertimeDecision {
        required: true,
        recommendation: Some(recommendation),
        message: Some(message),
    }
}

/// Side-by-side comparison of an original proposal against the alternate
/// produced by re-running with co-join disabled and the original team(s)
/// excluded. Lets the operator weigh "allow OT" against "deploy another
/// team" with the new times in hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OvertimeComparison {
    pub original_requires_overtime: bool,
    pub alternative_requires_overtime: bool,
    pub original_setup_end: Option<String>,
    pub alternative_setup_end: Option<String>,
    pub original_dismantle_end: Option<String>,
    pub alternative_dismantle_end: Option<String>,
    pub original_teams: Vec<String>,
    pub alternative_teams: Vec<String>,
}

pub fn compare(original: &ScheduleProposal, alternative: &ScheduleProposal) -> OvertimeComparison {
    OvertimeComparison {
        original_requires_overtime: original.overtime.required,
        alternative_requires_overtime: alternative.overtime.required,
        original_setup_end: original.setup.as_ref().map(|p| p.end_time.clone()),
        alternative_setup_end: alternative.setup.as_ref().map(|p| p.end_time.clone()),
        original_dismantle_end: original.dismantle.as_ref().map(|p| p.end_time.clone()),
        alternative_dismantle_end: alternative.dismantle.as_ref().map(|p| p.end_time.clone()),
        original_teams: original.phases().map(|p| p.team.to_string()).collect(),
        alternative_teams: alternative.phases().map(|p| p.team.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PhaseProposal, ReturnPlan, Team};
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn settings() -> AppSettings {
        AppSettings {
            work_end_time: "16:30".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn end_before_work_end_needs_no_overtime() {
        let decision = evaluate(&[(Phase::Setup, 10 * 60 + 45)], &settings(), true);
        assert!(!decision.required);
        assert!(decision.recommendation.is_none());
    }

    #[test]
    fn end_exactly_at_work_end_needs_no_overtime() {
        let decision = evaluate(&[(Phase::Setup, 16 * 60 + 30)], &settings(), true);
        assert!(!decision.required);
    }

    #[test]
    fn end_after_work_end_recommends_new_team() {
        let decision = evaluate(&[(Phase::Setup, 17 * 60 + 45)], &settings(), true);
        assert!(decision.required);
        assert_eq!(
            decision.recommendation,
            Some(OvertimeRecommendation::DeployNewTeam)
        );
        let msg = decision.message.unwrap();
        assert!(msg.contains("17:45"));
        assert!(msg.contains("16:30"));
    }

    #[test]
    fn no_free_alternative_flips_to_accept() {
        let decision = evaluate(&[(Phase::Dismantle, 18 * 60)], &settings(), false);
        assert!(decision.required);
        assert_eq!(decision.recommendation, Some(OvertimeRecommendation::Accept));
    }

    #[test]
    fn either_phase_over_triggers_requirement() {
        let decision = evaluate(
            &[(Phase::Setup, 12 * 60), (Phase::Dismantle, 17 * 60)],
            &settings(),
            true,
        );
        assert!(decision.required);
        assert!(decision.message.unwrap().contains("dismantle"));
    }

    fn proposal_with_setup(team: Team, end: &str, required: bool) -> ScheduleProposal {
        ScheduleProposal {
            proposal_id: Uuid::new_v4(),
            order_number: "SO-1".to_string(),
            setup: Some(PhaseProposal {
                phase: Phase::Setup,
                date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
                team,
                departure_source: "hub".to_string(),
                departure_address: "Hub".to_string(),
                departure_time: "08:00".to_string(),
                travel_minutes: 60,
                arrival_time: "09:00".to_string(),
                work_minutes: 90,
                buffer_minutes: 15,
                end_time: end.to_string(),
                distance_km: 20.0,
                return_plan: ReturnPlan::return_to_hub("site", "Hub", 60, "18:45"),
                co_join: None,
            }),
            dismantle: None,
            overtime: OvertimeDecision {
                required,
                recommendation: None,
                message: None,
            },
            workload: vec![],
            no_overlap: true,
            within_preferred: true,
            reasoning: vec![],
        }
    }

    #[test]
    fn comparison_puts_both_verdicts_side_by_side() {
        let original = proposal_with_setup(Team::Alpha, "17:45", true);
        let alternative = proposal_with_setup(Team::Charlie, "16:15", false);

        let cmp = compare(&original, &alternative);
        assert!(cmp.original_requires_overtime);
        assert!(!cmp.alternative_requires_overtime);
        assert_eq!(cmp.original_setup_end.as_deref(), Some("17:45"));
        assert_eq!(cmp.alternative_setup_end.as_deref(), Some("16:15"));
        assert_eq!(cmp.original_teams, vec!["Team Alpha".to_string()]);
        assert_eq!(cmp.alternative_teams, vec!["Team Charlie".to_string()]);
        assert!(cmp.original_dismantle_end.is_none());
    }

    #[test]
    fn unparseable_work_end_never_requires_overtime() {
        let mut s = settings();
        s.work_end_time = "late".to_string();
        let decision = evaluate(&[(Phase::Setup, 23 * 60)], &s, true);
        assert!(!decision.required);
    }
}
