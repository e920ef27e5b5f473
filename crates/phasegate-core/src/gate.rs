//! The gate combinator.
//!
//! [`evaluate`] is a pure function of the configuration and the two
//! instants in [`EvaluationContext`]. Manual override bypasses every
//! evaluator; otherwise all evaluators run so the status line can report on
//! each of them, and the decision is their AND.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::condition::{TimeCondition, TimeConditionOutcome};
use crate::dependency::{DependencyGate, DependencyOutcome};
use crate::error::{ConfigurationError, Result};
use crate::status::{self, ConditionCheck, ConditionName, GateState};
use crate::window::{self, TimeWindow, WindowKind, WindowOutcome};

/// The two instants every evaluation depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationContext {
    pub now: DateTime<Utc>,
    /// Reference epoch for all relative-hour computations. Owned and kept
    /// stable by the caller.
    pub deployment_start_time: DateTime<Utc>,
}

impl EvaluationContext {
    #[must_use]
    pub fn new(now: DateTime<Utc>, deployment_start_time: DateTime<Utc>) -> Self {
        Self {
            now,
            deployment_start_time,
        }
    }
}

/// The identifiers released when the gate opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeTarget {
    Single(String),
    Multiple(Vec<String>),
}

impl ScopeTarget {
    #[must_use]
    pub fn single(id: impl Into<String>) -> Self {
        Self::Single(id.into())
    }

    #[must_use]
    pub fn multiple<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Multiple(ids.into_iter().map(Into::into).collect())
    }

    fn validate(&self) -> Result<()> {
        match self {
            Self::Single(id) if id.is_empty() => Err(ConfigurationError::EmptyScopeId.into()),
            Self::Multiple(ids) if ids.is_empty() => Err(ConfigurationError::EmptyScopeIds.into()),
            Self::Multiple(ids) if ids.iter().any(String::is_empty) => {
                Err(ConfigurationError::EmptyScopeId.into())
            }
            _ => Ok(()),
        }
    }
}

/// Fully resolved gate configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    pub time_condition: Option<TimeCondition>,
    pub inclusion_windows: Option<Vec<TimeWindow>>,
    pub exclusion_windows: Option<Vec<TimeWindow>>,
    pub dependency_gate: Option<DependencyGate>,
    pub manual_override: bool,
    pub scope: ScopeTarget,
}

impl GateConfig {
    /// A gate with no conditions: always open.
    #[must_use]
    pub fn new(scope: ScopeTarget) -> Self {
        Self {
            time_condition: None,
            inclusion_windows: None,
            exclusion_windows: None,
            dependency_gate: None,
            manual_override: false,
            scope,
        }
    }

    /// Eagerly check every field, including those manual override would skip.
    ///
    /// Used by configuration loaders; [`evaluate`] does not call it.
    ///
    /// # Errors
    ///
    /// Returns the first format or configuration error found, checking scope,
    /// time condition, inclusion windows, exclusion windows, then dependency.
    pub fn validate(&self) -> Result<()> {
        self.scope.validate()?;
        if let Some(condition) = &self.time_condition {
            condition.validate()?;
        }
        window::validate_list(WindowKind::Inclusion, self.inclusion_windows.as_deref())?;
        window::validate_list(WindowKind::Exclusion, self.exclusion_windows.as_deref())?;
        if let Some(dependency) = &self.dependency_gate {
            dependency.validate()?;
        }
        Ok(())
    }
}

/// Per-condition results behind a decision. Every field is `None` under
/// manual override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateDetail {
    pub manual_override: bool,
    pub time_condition: Option<TimeConditionOutcome>,
    pub inclusion: Option<WindowOutcome>,
    pub exclusion: Option<WindowOutcome>,
    pub dependency: Option<DependencyOutcome>,
}

impl GateDetail {
    /// Status records for the conditions that were configured, in render order.
    #[must_use]
    pub fn checks(&self) -> Vec<ConditionCheck> {
        let mut checks = Vec::new();
        if let Some(time) = &self.time_condition {
            checks.push(ConditionCheck::new(ConditionName::Time, time.met, &time.reason));
        }
        for (name, outcome) in [
            (ConditionName::InclusionWindow, &self.inclusion),
            (ConditionName::ExclusionWindow, &self.exclusion),
        ] {
            if let Some(outcome) = outcome.as_ref().filter(|o| o.is_configured()) {
                checks.push(ConditionCheck::new(name, outcome.passed, outcome.reason()));
            }
        }
        if let Some(dependency) = &self.dependency {
            checks.push(ConditionCheck::new(
                ConditionName::Dependency,
                dependency.met,
                &dependency.reason,
            ));
        }
        checks
    }
}

/// Output of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateDecision {
    pub condition_met: bool,
    pub released_scope_id: Option<String>,
    pub released_scope_ids: Option<Vec<String>>,
    pub status_message: String,
    pub detail: GateDetail,
}

impl GateDecision {
    fn new(condition_met: bool, scope: &ScopeTarget, status_message: String, detail: GateDetail) -> Self {
        let (released_scope_id, released_scope_ids) = match (condition_met, scope) {
            (false, _) => (None, None),
            (true, ScopeTarget::Single(id)) => (Some(id.clone()), None),
            (true, ScopeTarget::Multiple(ids)) => (None, Some(ids.clone())),
        };
        Self {
            condition_met,
            released_scope_id,
            released_scope_ids,
            status_message,
            detail,
        }
    }

    /// Released identifiers regardless of single/multiple configuration.
    #[must_use]
    pub fn released(&self) -> Vec<&str> {
        match (&self.released_scope_id, &self.released_scope_ids) {
            (Some(id), _) => vec![id.as_str()],
            (None, Some(ids)) => ids.iter().map(String::as_str).collect(),
            (None, None) => Vec::new(),
        }
    }
}

/// Evaluate the gate.
///
/// # Errors
///
/// Any malformed or invalid field in an evaluated condition aborts the
/// evaluation; no partial decision is returned. Under manual override nothing
/// is evaluated and this never fails.
pub fn evaluate(config: &GateConfig, ctx: &EvaluationContext) -> Result<GateDecision> {
    if config.manual_override {
        tracing::debug!("manual override set, skipping condition evaluation");
        let detail = GateDetail {
            manual_override: true,
            ..GateDetail::default()
        };
        let status_message = status::render(GateState::Overridden, &[]);
        return Ok(GateDecision::new(true, &config.scope, status_message, detail));
    }

    let time_condition = config
        .time_condition
        .as_ref()
        .map(|condition| condition.evaluate(ctx))
        .transpose()?;
    let inclusion = window::evaluate_inclusion(ctx.now, config.inclusion_windows.as_deref())?;
    let exclusion = window::evaluate_exclusion(ctx.now, config.exclusion_windows.as_deref())?;
    let dependency = config
        .dependency_gate
        .as_ref()
        .map(|dependency| dependency.evaluate(ctx))
        .transpose()?;

    let condition_met = time_condition.as_ref().is_none_or(|t| t.met)
        && inclusion.allowed()
        && !exclusion.blocked()
        && dependency.as_ref().is_none_or(|d| d.met);

    let detail = GateDetail {
        manual_override: false,
        time_condition,
        inclusion: Some(inclusion),
        exclusion: Some(exclusion),
        dependency,
    };
    let status_message = status::render(GateState::from_met(condition_met), &detail.checks());

    tracing::info!(condition_met, status = %status_message, "gate evaluated");

    Ok(GateDecision::new(condition_met, &config.scope, status_message, detail))
}

/// Evaluate after a full [`GateConfig::validate`], so that configuration
/// errors surface even under manual override.
///
/// # Errors
///
/// Same as [`GateConfig::validate`] and [`evaluate`].
pub fn evaluate_strict(config: &GateConfig, ctx: &EvaluationContext) -> Result<GateDecision> {
    config.validate()?;
    evaluate(config, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GateError;
    use crate::time::Weekday;
    use chrono::{Duration, TimeZone};
    use std::collections::BTreeSet;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn at(hours: i64) -> EvaluationContext {
        EvaluationContext::new(t0() + Duration::hours(hours), t0())
    }

    fn delayed(hours: i64, scope: ScopeTarget) -> GateConfig {
        GateConfig {
            time_condition: Some(TimeCondition {
                delay_start_time_by: hours,
                ..TimeCondition::default()
            }),
            ..GateConfig::new(scope)
        }
    }

    #[test]
    fn closed_gate_reports_delay_and_releases_nothing() {
        let decision = evaluate(&delayed(48, ScopeTarget::single("grp-1")), &at(24)).unwrap();
        assert!(!decision.condition_met);
        assert_eq!(decision.released_scope_id, None);
        assert_eq!(decision.released_scope_ids, None);
        assert_eq!(
            decision.status_message,
            "[GATE CLOSED] FAIL — Time: delay not elapsed: 24.0h / 48h required, 24.0h remaining"
        );
    }

    #[test]
    fn open_gate_releases_single_scope() {
        let decision = evaluate(&delayed(48, ScopeTarget::single("grp-1")), &at(48)).unwrap();
        assert!(decision.condition_met);
        assert_eq!(decision.released_scope_id.as_deref(), Some("grp-1"));
        assert_eq!(decision.released_scope_ids, None);
        assert_eq!(decision.released(), vec!["grp-1"]);
    }

    #[test]
    fn open_gate_releases_multiple_scopes() {
        let config = GateConfig::new(ScopeTarget::multiple(["a", "b", "c"]));
        let decision = evaluate(&config, &at(0)).unwrap();
        assert!(decision.condition_met);
        assert_eq!(decision.released_scope_id, None);
        assert_eq!(
            decision.released_scope_ids,
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
        assert_eq!(decision.status_message, "[GATE OPEN] no conditions configured");
    }

    #[test]
    fn manual_override_skips_invalid_conditions() {
        let config = GateConfig {
            manual_override: true,
            ..delayed(-5, ScopeTarget::single("grp-1"))
        };
        let decision = evaluate(&config, &at(0)).unwrap();
        assert!(decision.condition_met);
        assert_eq!(decision.released_scope_id.as_deref(), Some("grp-1"));
        assert_eq!(decision.status_message, status::OVERRIDE_STATUS);
        assert!(decision.detail.manual_override);
        assert!(decision.detail.time_condition.is_none());
    }

    #[test]
    fn strict_evaluation_rejects_invalid_conditions_under_override() {
        let config = GateConfig {
            manual_override: true,
            ..delayed(-5, ScopeTarget::single("grp-1"))
        };
        assert!(evaluate_strict(&config, &at(0)).unwrap_err().is_configuration());
    }

    #[test]
    fn exclusion_blocks_an_otherwise_open_gate() {
        let config = GateConfig {
            exclusion_windows: Some(vec![TimeWindow::default()]),
            ..delayed(0, ScopeTarget::single("grp-1"))
        };
        let decision = evaluate(&config, &at(10)).unwrap();
        assert!(!decision.condition_met);
        assert_eq!(
            decision.status_message,
            "[GATE CLOSED] PASS — Time: delay elapsed: 10.0h / 0h required \
             | FAIL — Exclusion Window: inside exclusion window 1 of 1"
        );
    }

    #[test]
    fn every_condition_is_reported_even_after_a_failure() {
        let config = GateConfig {
            inclusion_windows: Some(vec![TimeWindow {
                days_of_week: Some(BTreeSet::from([Weekday::Tuesday])),
                ..TimeWindow::default()
            }]),
            dependency_gate: Some(DependencyGate {
                prerequisite_delay_start_time_by: 168,
                minimum_open_hours: 48,
            }),
            ..delayed(48, ScopeTarget::single("grp-1"))
        };
        // t0 + 200h is Tuesday 2024-01-09 08:00
        let decision = evaluate(&config, &at(200)).unwrap();
        assert!(!decision.condition_met);
        let checks = decision.detail.checks();
        let names: Vec<ConditionName> = checks.iter().map(|c| c.condition).collect();
        assert_eq!(
            names,
            vec![ConditionName::Time, ConditionName::InclusionWindow, ConditionName::Dependency]
        );
        assert!(checks[0].passed);
        assert!(checks[1].passed);
        assert!(!checks[2].passed);
        assert!(decision.status_message.contains("prerequisite open 32.0h / 48h required"));
    }

    #[test]
    fn configuration_error_aborts_evaluation() {
        let config = GateConfig {
            dependency_gate: Some(DependencyGate {
                prerequisite_delay_start_time_by: 0,
                minimum_open_hours: -1,
            }),
            ..GateConfig::new(ScopeTarget::single("grp-1"))
        };
        assert!(evaluate(&config, &at(0)).unwrap_err().is_configuration());
    }

    #[test]
    fn validate_checks_scope_and_every_condition() {
        assert!(GateConfig::new(ScopeTarget::single("")).validate().is_err());
        assert!(GateConfig::new(ScopeTarget::Multiple(Vec::new())).validate().is_err());

        let config = GateConfig {
            exclusion_windows: Some(vec![TimeWindow {
                time_of_day_start: Some("7am".to_string()),
                ..TimeWindow::default()
            }]),
            ..GateConfig::new(ScopeTarget::single("grp-1"))
        };
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, GateError::MalformedTimeOfDay { ref field, .. } if field == "exclusion_windows[1].time_of_day_start")
        );
    }

    #[test]
    fn decision_serializes_unreleased_scopes_as_null() {
        let decision = evaluate(&delayed(48, ScopeTarget::single("grp-1")), &at(1)).unwrap();
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["condition_met"], false);
        assert!(json["released_scope_id"].is_null());
        assert!(json["released_scope_ids"].is_null());
        assert_eq!(json["detail"]["time_condition"]["status"], "delay_pending");
    }
}
