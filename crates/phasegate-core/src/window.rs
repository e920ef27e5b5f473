//! Time windows: the single-window matcher and the inclusion/exclusion
//! list evaluators.
//!
//! A window ANDs whichever sub-constraints are populated (weekday set,
//! time-of-day range, absolute date range). A list of windows is ORed.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, GateError};
use crate::time::{self, Weekday};

/// One recurring or absolute time window, as configured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_of_week: Option<BTreeSet<Weekday>>,
    /// Inclusive lower bound, `HH:MM:SS`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_day_start: Option<String>,
    /// Inclusive upper bound, `HH:MM:SS`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_day_end: Option<String>,
    /// Inclusive lower bound, RFC3339.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_start: Option<String>,
    /// Inclusive upper bound, RFC3339.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_end: Option<String>,
}

/// A [`TimeWindow`] with every string field parsed and checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedWindow<'a> {
    days_of_week: Option<&'a BTreeSet<Weekday>>,
    time_of_day_start: Option<NaiveTime>,
    time_of_day_end: Option<NaiveTime>,
    date_start: Option<DateTime<Utc>>,
    date_end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    /// Parse and validate the window.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::MalformedTimeOfDay`] / [`GateError::MalformedTimestamp`]
    /// for unparsable fields, and [`ConfigurationError::InvertedTimeOfDay`] when
    /// `time_of_day_start` is after `time_of_day_end`.
    pub fn parse(&self) -> Result<ParsedWindow<'_>, GateError> {
        let time_of_day_start = self
            .time_of_day_start
            .as_deref()
            .map(|v| time::parse_time_of_day("time_of_day_start", v))
            .transpose()?;
        let time_of_day_end = self
            .time_of_day_end
            .as_deref()
            .map(|v| time::parse_time_of_day("time_of_day_end", v))
            .transpose()?;

        if let (Some(start), Some(end)) = (time_of_day_start, time_of_day_end) {
            if start > end {
                return Err(ConfigurationError::InvertedTimeOfDay {
                    start: start.format("%H:%M:%S").to_string(),
                    end: end.format("%H:%M:%S").to_string(),
                }
                .into());
            }
        }

        Ok(ParsedWindow {
            days_of_week: self.days_of_week.as_ref(),
            time_of_day_start,
            time_of_day_end,
            date_start: time::parse_optional_instant("date_start", self.date_start.as_deref())?,
            date_end: time::parse_optional_instant("date_end", self.date_end.as_deref())?,
        })
    }

    /// Whether `instant` falls inside this window.
    ///
    /// # Errors
    ///
    /// Same as [`TimeWindow::parse`].
    pub fn matches(&self, instant: DateTime<Utc>) -> Result<bool, GateError> {
        Ok(self.parse()?.matches(instant))
    }
}

impl ParsedWindow<'_> {
    /// AND of the populated sub-checks. A window with nothing set always matches.
    #[must_use]
    pub fn matches(&self, instant: DateTime<Utc>) -> bool {
        self.weekday_matches(instant) && self.time_of_day_matches(instant) && self.date_matches(instant)
    }

    fn weekday_matches(&self, instant: DateTime<Utc>) -> bool {
        self.days_of_week
            .is_none_or(|days| days.contains(&time::weekday_of(instant)))
    }

    fn time_of_day_matches(&self, instant: DateTime<Utc>) -> bool {
        let tod = instant.time();
        self.time_of_day_start.is_none_or(|start| tod >= start)
            && self.time_of_day_end.is_none_or(|end| tod <= end)
    }

    fn date_matches(&self, instant: DateTime<Utc>) -> bool {
        self.date_start.is_none_or(|start| instant >= start)
            && self.date_end.is_none_or(|end| instant <= end)
    }
}

/// Which role a window list plays in the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    Inclusion,
    Exclusion,
}

impl WindowKind {
    fn config_key(self) -> &'static str {
        match self {
            Self::Inclusion => "inclusion_windows",
            Self::Exclusion => "exclusion_windows",
        }
    }

    fn noun(self) -> &'static str {
        match self {
            Self::Inclusion => "inclusion",
            Self::Exclusion => "exclusion",
        }
    }
}

/// Result of evaluating a window list against one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowOutcome {
    pub kind: WindowKind,
    /// Number of windows in the list; zero when absent or empty.
    pub window_count: usize,
    /// 1-based position of the first matching window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_index: Option<usize>,
    /// Inclusion: allowed. Exclusion: not blocked.
    pub passed: bool,
}

impl WindowOutcome {
    /// Whether the list had any windows to evaluate.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.window_count > 0
    }

    /// Inclusion semantics: allowed if unconfigured or any window matched.
    #[must_use]
    pub fn allowed(&self) -> bool {
        self.kind == WindowKind::Inclusion && self.passed
    }

    /// Exclusion semantics: blocked if any window matched.
    #[must_use]
    pub fn blocked(&self) -> bool {
        self.kind == WindowKind::Exclusion && !self.passed
    }

    /// Human-readable explanation for the status line.
    #[must_use]
    pub fn reason(&self) -> String {
        let noun = self.kind.noun();
        match (self.matched_index, self.is_configured()) {
            (_, false) => format!("no {noun} windows configured"),
            (Some(index), true) => {
                format!("inside {noun} window {index} of {}", self.window_count)
            }
            (None, true) => format!(
                "outside all {noun} windows ({} configured)",
                self.window_count
            ),
        }
    }
}

/// Inclusion list: allowed when absent/empty or any window matches `now`.
///
/// # Errors
///
/// Propagates the first window parse error, with the field qualified as
/// `inclusion_windows[N].field`.
pub fn evaluate_inclusion(
    now: DateTime<Utc>,
    windows: Option<&[TimeWindow]>,
) -> Result<WindowOutcome, GateError> {
    evaluate_list(WindowKind::Inclusion, now, windows)
}

/// Exclusion list: blocked when any window matches `now`; never blocked when
/// absent/empty.
///
/// # Errors
///
/// Same as [`evaluate_inclusion`], qualified as `exclusion_windows[N].field`.
pub fn evaluate_exclusion(
    now: DateTime<Utc>,
    windows: Option<&[TimeWindow]>,
) -> Result<WindowOutcome, GateError> {
    evaluate_list(WindowKind::Exclusion, now, windows)
}

/// Parse every window in a list without evaluating it.
pub(crate) fn validate_list(kind: WindowKind, windows: Option<&[TimeWindow]>) -> Result<(), GateError> {
    for (position, window) in windows.unwrap_or_default().iter().enumerate() {
        window
            .parse()
            .map_err(|e| e.within(&format!("{}[{}]", kind.config_key(), position + 1)))?;
    }
    Ok(())
}

fn evaluate_list(
    kind: WindowKind,
    now: DateTime<Utc>,
    windows: Option<&[TimeWindow]>,
) -> Result<WindowOutcome, GateError> {
    let windows = windows.unwrap_or_default();

    // Every window is parsed even after a match so list order never hides
    // a malformed entry.
    let mut matched_index = None;
    for (position, window) in windows.iter().enumerate() {
        let parsed = window
            .parse()
            .map_err(|e| e.within(&format!("{}[{}]", kind.config_key(), position + 1)))?;
        if matched_index.is_none() && parsed.matches(now) {
            matched_index = Some(position + 1);
        }
    }

    let passed = match kind {
        WindowKind::Inclusion => windows.is_empty() || matched_index.is_some(),
        WindowKind::Exclusion => matched_index.is_none(),
    };

    tracing::debug!(
        kind = kind.noun(),
        window_count = windows.len(),
        matched_index = ?matched_index,
        passed,
        "evaluated time windows"
    );

    Ok(WindowOutcome {
        kind,
        window_count: windows.len(),
        matched_index,
        passed,
    })
}
