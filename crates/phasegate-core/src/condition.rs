//! The time condition: a delay relative to the deployment start, optional
//! absolute bounds, and an optional auto-expiry once the gate has opened.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GateError;
use crate::gate::EvaluationContext;
use crate::time;

/// Time-based release rule, as configured.
///
/// Hour counts stay signed and timestamps stay textual so that validation
/// happens during evaluation and is skipped entirely under manual override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeCondition {
    /// Hours after the deployment start before the gate may open.
    #[serde(default)]
    pub delay_start_time_by: i64,
    /// The gate never opens before this instant (inclusive), RFC3339.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_earliest: Option<String>,
    /// The gate closes for good after this instant (exclusive), RFC3339.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_latest: Option<String>,
    /// Once open, close again after this many hours. Zero disables the limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_open_duration_hours: Option<i64>,
}

/// First unmet sub-condition, in reporting priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeConditionStatus {
    DelayPending,
    BeforeEarliest,
    AfterLatest,
    MaxDurationExceeded,
    Open,
}

impl TimeConditionStatus {
    /// `AfterLatest` and `MaxDurationExceeded` can never recover for a fixed
    /// deployment start, since elapsed time only grows.
    #[must_use]
    pub fn is_permanently_closed(self) -> bool {
        matches!(self, Self::AfterLatest | Self::MaxDurationExceeded)
    }
}

/// Per-sub-condition breakdown of one time condition evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeConditionOutcome {
    pub met: bool,
    pub status: TimeConditionStatus,
    /// Hours since the deployment start; negative if `now` precedes it.
    pub hours_elapsed: f64,
    pub delay_hours: i64,
    pub delay_met: bool,
    pub earliest_met: bool,
    pub latest_exceeded: bool,
    pub max_duration_exceeded: bool,
    /// Hours since the delay elapsed, present once it has.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours_open: Option<f64>,
    pub reason: String,
}

struct Bounds {
    delay_hours: i64,
    earliest: Option<DateTime<Utc>>,
    latest: Option<DateTime<Utc>>,
    max_open_hours: i64,
}

impl TimeCondition {
    fn bounds(&self) -> Result<Bounds, GateError> {
        let delay_hours = time::ensure_non_negative("delay_start_time_by", self.delay_start_time_by)?;
        let max_open_hours = match self.max_open_duration_hours {
            Some(hours) => time::ensure_non_negative("max_open_duration_hours", hours)?,
            None => 0,
        };
        Ok(Bounds {
            delay_hours,
            earliest: time::parse_optional_instant(
                "absolute_earliest",
                self.absolute_earliest.as_deref(),
            )?,
            latest: time::parse_optional_instant("absolute_latest", self.absolute_latest.as_deref())?,
            max_open_hours,
        })
    }

    /// Check every field without evaluating.
    ///
    /// # Errors
    ///
    /// Same as [`TimeCondition::evaluate`].
    pub fn validate(&self) -> Result<(), GateError> {
        self.bounds().map(|_| ())
    }

    /// Evaluate the condition against the context.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for negative hour counts and
    /// [`GateError::MalformedTimestamp`] for unparsable absolute bounds.
    pub fn evaluate(&self, ctx: &EvaluationContext) -> Result<TimeConditionOutcome, GateError> {
        let bounds = self.bounds()?;
        let now = ctx.now;

        let elapsed_ns = time::elapsed_nanos(ctx.deployment_start_time, now);
        let delay_ns = time::hours_to_nanos(bounds.delay_hours);
        let open_ns = elapsed_ns - delay_ns;

        let delay_met = elapsed_ns >= delay_ns;
        let earliest_met = bounds.earliest.is_none_or(|earliest| now >= earliest);
        let latest_exceeded = bounds.latest.is_some_and(|latest| now > latest);
        let max_duration_exceeded =
            bounds.max_open_hours > 0 && open_ns > time::hours_to_nanos(bounds.max_open_hours);

        let met = delay_met && earliest_met && !latest_exceeded && !max_duration_exceeded;

        let hours_elapsed = time::nanos_to_hours(elapsed_ns);
        let hours_open = delay_met.then(|| time::nanos_to_hours(open_ns));

        let (status, reason) = if !delay_met {
            (
                TimeConditionStatus::DelayPending,
                format!(
                    "delay not elapsed: {hours_elapsed:.1}h / {}h required, {:.1}h remaining",
                    bounds.delay_hours,
                    time::nanos_to_hours(-open_ns)
                ),
            )
        } else if let Some(earliest) = bounds.earliest.filter(|_| !earliest_met) {
            (
                TimeConditionStatus::BeforeEarliest,
                format!(
                    "before absolute earliest {}, {:.1}h remaining",
                    time::format_instant(earliest),
                    time::nanos_to_hours(time::elapsed_nanos(now, earliest))
                ),
            )
        } else if let Some(latest) = bounds.latest.filter(|_| latest_exceeded) {
            (
                TimeConditionStatus::AfterLatest,
                format!(
                    "past absolute latest {} (permanently closed)",
                    time::format_instant(latest)
                ),
            )
        } else if max_duration_exceeded {
            (
                TimeConditionStatus::MaxDurationExceeded,
                format!(
                    "max open duration exceeded: {:.1}h open / {}h max (permanently closed)",
                    time::nanos_to_hours(open_ns),
                    bounds.max_open_hours
                ),
            )
        } else {
            (
                TimeConditionStatus::Open,
                format!(
                    "delay elapsed: {hours_elapsed:.1}h / {}h required",
                    bounds.delay_hours
                ),
            )
        };

        tracing::debug!(
            hours_elapsed,
            delay_hours = bounds.delay_hours,
            delay_met,
            earliest_met,
            latest_exceeded,
            max_duration_exceeded,
            "evaluated time condition"
        );

        Ok(TimeConditionOutcome {
            met,
            status,
            hours_elapsed,
            delay_hours: bounds.delay_hours,
            delay_met,
            earliest_met,
            latest_exceeded,
            max_duration_exceeded,
            hours_open,
            reason,
        })
    }
}
