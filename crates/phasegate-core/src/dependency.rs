//! Dependency on a prerequisite gate, modelled from offsets alone.
//!
//! The prerequisite is never polled. It is assumed to open
//! `prerequisite_delay_start_time_by` hours after the shared deployment start,
//! and this gate waits until it has been open for `minimum_open_hours`.

use serde::{Deserialize, Serialize};

use crate::error::GateError;
use crate::gate::EvaluationContext;
use crate::time;

/// Simulated prerequisite gate timeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyGate {
    #[serde(default)]
    pub prerequisite_delay_start_time_by: i64,
    #[serde(default)]
    pub minimum_open_hours: i64,
}

/// Where the prerequisite is on its timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyStatus {
    /// The prerequisite's own delay has not elapsed.
    NotYetOpen,
    /// Open, but not for `minimum_open_hours` yet.
    OpenTooBriefly,
    Satisfied,
}

/// Result of evaluating a [`DependencyGate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyOutcome {
    pub met: bool,
    pub status: DependencyStatus,
    pub prerequisite_open_offset_hours: i64,
    pub minimum_open_hours: i64,
    pub current_elapsed_hours: f64,
    /// Clamped at zero.
    pub prerequisite_hours_open: f64,
    pub reason: String,
}

impl DependencyGate {
    fn hours(&self) -> Result<(i64, i64), GateError> {
        Ok((
            time::ensure_non_negative(
                "prerequisite_delay_start_time_by",
                self.prerequisite_delay_start_time_by,
            )?,
            time::ensure_non_negative("minimum_open_hours", self.minimum_open_hours)?,
        ))
    }

    /// Check every field without evaluating.
    ///
    /// # Errors
    ///
    /// Same as [`DependencyGate::evaluate`].
    pub fn validate(&self) -> Result<(), GateError> {
        self.hours().map(|_| ())
    }

    /// Evaluate the prerequisite's simulated timeline.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when either hour count is negative.
    pub fn evaluate(&self, ctx: &EvaluationContext) -> Result<DependencyOutcome, GateError> {
        let (offset_hours, minimum_open_hours) = self.hours()?;

        let elapsed_ns = time::elapsed_nanos(ctx.deployment_start_time, ctx.now);
        let offset_ns = time::hours_to_nanos(offset_hours);
        let open_ns = (elapsed_ns - offset_ns).max(0);
        let required_ns = time::hours_to_nanos(minimum_open_hours);

        let met = open_ns >= required_ns;
        let current_elapsed_hours = time::nanos_to_hours(elapsed_ns);
        let prerequisite_hours_open = time::nanos_to_hours(open_ns);

        let (status, reason) = if met {
            (
                DependencyStatus::Satisfied,
                format!(
                    "prerequisite open {prerequisite_hours_open:.1}h / {minimum_open_hours}h required"
                ),
            )
        } else if elapsed_ns < offset_ns {
            (
                DependencyStatus::NotYetOpen,
                format!(
                    "prerequisite not yet open: opens at {offset_hours}h, {current_elapsed_hours:.1}h elapsed, {:.1}h until open",
                    time::nanos_to_hours(offset_ns - elapsed_ns)
                ),
            )
        } else {
            (
                DependencyStatus::OpenTooBriefly,
                format!(
                    "prerequisite open {prerequisite_hours_open:.1}h / {minimum_open_hours}h required, {:.1}h remaining",
                    time::nanos_to_hours(required_ns - open_ns)
                ),
            )
        };

        tracing::debug!(
            current_elapsed_hours,
            prerequisite_hours_open,
            minimum_open_hours,
            met,
            "evaluated dependency gate"
        );

        Ok(DependencyOutcome {
            met,
            status,
            prerequisite_open_offset_hours: offset_hours,
            minimum_open_hours,
            current_elapsed_hours,
            prerequisite_hours_open,
            reason,
        })
    }
}
