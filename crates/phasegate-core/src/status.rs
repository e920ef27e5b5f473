//! Status line rendering.
//!
//! Evaluators produce [`ConditionCheck`] records; [`render`] turns them into
//! one deterministic line:
//!
//! ```text
//! [GATE CLOSED] FAIL — Time: delay not elapsed: 24.0h / 48h required, 24.0h remaining | PASS — Dependency: prerequisite open 60.0h / 48h required
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Marker used when manual override bypasses evaluation.
pub const OVERRIDE_STATUS: &str = "[MANUAL OVERRIDE] gate forced open; all conditions skipped";

/// Overall gate state shown at the front of the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    Open,
    Closed,
    Overridden,
}

impl GateState {
    #[must_use]
    pub fn from_met(met: bool) -> Self {
        if met {
            Self::Open
        } else {
            Self::Closed
        }
    }

    fn marker(self) -> &'static str {
        match self {
            Self::Open => "[GATE OPEN]",
            Self::Closed => "[GATE CLOSED]",
            Self::Overridden => OVERRIDE_STATUS,
        }
    }
}

/// The conditions a gate can report on. Declaration order is render order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionName {
    Time,
    InclusionWindow,
    ExclusionWindow,
    Dependency,
}

impl fmt::Display for ConditionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Time => "Time",
            Self::InclusionWindow => "Inclusion Window",
            Self::ExclusionWindow => "Exclusion Window",
            Self::Dependency => "Dependency",
        })
    }
}

/// One evaluated condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionCheck {
    pub condition: ConditionName,
    pub passed: bool,
    pub detail: String,
}

impl ConditionCheck {
    #[must_use]
    pub fn new(condition: ConditionName, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            condition,
            passed,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ConditionCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.passed { "PASS" } else { "FAIL" };
        write!(f, "{verdict} — {}: {}", self.condition, self.detail)
    }
}

/// Render the status line.
///
/// Checks are ordered by [`ConditionName`] regardless of input order.
/// Override ignores `checks`, since nothing was evaluated.
#[must_use]
pub fn render(state: GateState, checks: &[ConditionCheck]) -> String {
    if state == GateState::Overridden {
        return OVERRIDE_STATUS.to_string();
    }
    if checks.is_empty() {
        return format!("{} no conditions configured", state.marker());
    }

    let mut ordered: Vec<&ConditionCheck> = checks.iter().collect();
    ordered.sort_by_key(|check| check.condition);

    let entries: Vec<String> = ordered.iter().map(ToString::to_string).collect();
    format!("{} {}", state.marker(), entries.join(" | "))
}
