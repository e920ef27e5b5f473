//! Gate documents: the on-disk configuration and default resolution.
//!
//! A gate document looks like:
//! ```yaml
//! scope_ids: ["ring-1", "ring-2"]
//! deployment_start_time: "2024-01-01T00:00:00Z"
//! time_condition:
//!   delay_start_time_by: 48
//!   max_open_duration_hours: 336
//! inclusion_windows:
//!   - days_of_week: [monday, tuesday, wednesday, thursday]
//!     time_of_day_start: "09:00:00"
//!     time_of_day_end: "17:00:00"
//! dependency_gate:
//!   prerequisite_delay_start_time_by: 0
//!   minimum_open_hours: 24
//! ```

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::condition::TimeCondition;
use crate::dependency::DependencyGate;
use crate::error::{ConfigurationError, GateError, Result};
use crate::gate::{EvaluationContext, GateConfig, ScopeTarget};
use crate::time;
use crate::window::TimeWindow;

/// Serialization format of a gate document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Toml,
    Json,
}

impl DocumentFormat {
    /// Pick a format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// The gate configuration as written by users.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_ids: Option<Vec<String>>,
    #[serde(default)]
    pub manual_override: bool,
    /// RFC3339. Falls back to the evaluation instant when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_condition: Option<TimeCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inclusion_windows: Option<Vec<TimeWindow>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusion_windows: Option<Vec<TimeWindow>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_gate: Option<DependencyGate>,
}

/// A document with defaults applied, ready to evaluate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGate {
    pub config: GateConfig,
    pub deployment_start_time: DateTime<Utc>,
}

impl ResolvedGate {
    /// Context for evaluating this gate at `now`.
    #[must_use]
    pub fn context(&self, now: DateTime<Utc>) -> EvaluationContext {
        EvaluationContext::new(now, self.deployment_start_time)
    }
}

/// Deserialize a gate document.
///
/// # Errors
///
/// Returns [`GateError::Parse`] when the text is not a valid document in
/// `format`.
pub fn parse_document(text: &str, format: DocumentFormat) -> Result<GateDocument> {
    match format {
        DocumentFormat::Yaml => serde_yaml::from_str(text).map_err(|e| GateError::Parse(e.to_string())),
        DocumentFormat::Toml => toml::from_str(text).map_err(|e| GateError::Parse(e.to_string())),
        DocumentFormat::Json => serde_json::from_str(text).map_err(|e| GateError::Parse(e.to_string())),
    }
}

/// Resolve the document into a [`GateConfig`] and a deployment start time.
///
/// Pure: the input is not modified, and `now` is only used as the fallback
/// start time. Persisting that fallback across calls is the caller's job.
///
/// # Errors
///
/// Returns a configuration error unless exactly one of `scope_id` /
/// `scope_ids` is set, and [`GateError::MalformedTimestamp`] for an
/// unparsable `deployment_start_time`.
pub fn resolve_defaults(document: &GateDocument, now: DateTime<Utc>) -> Result<ResolvedGate> {
    let scope = match (&document.scope_id, &document.scope_ids) {
        (Some(_), Some(_)) => return Err(ConfigurationError::ConflictingScopes.into()),
        (None, None) => return Err(ConfigurationError::MissingScope.into()),
        (Some(id), None) => ScopeTarget::Single(id.clone()),
        (None, Some(ids)) => ScopeTarget::Multiple(ids.clone()),
    };

    let deployment_start_time = time::parse_optional_instant(
        "deployment_start_time",
        document.deployment_start_time.as_deref(),
    )?
    .unwrap_or(now);

    Ok(ResolvedGate {
        config: GateConfig {
            time_condition: document.time_condition.clone(),
            inclusion_windows: document.inclusion_windows.clone(),
            exclusion_windows: document.exclusion_windows.clone(),
            dependency_gate: document.dependency_gate.clone(),
            manual_override: document.manual_override,
            scope,
        },
        deployment_start_time,
    })
}

/// Parse, resolve and fully validate a document.
///
/// # Errors
///
/// Any error from [`parse_document`], [`resolve_defaults`] or
/// [`GateConfig::validate`].
pub fn load(text: &str, format: DocumentFormat, now: DateTime<Utc>) -> Result<ResolvedGate> {
    let document = parse_document(text, format)?;
    let resolved = resolve_defaults(&document, now)?;
    resolved.config.validate()?;
    tracing::debug!(
        deployment_start_time = %time::format_instant(resolved.deployment_start_time),
        manual_override = resolved.config.manual_override,
        "loaded gate document"
    );
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Weekday;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    const YAML: &str = r#"
scope_ids: ["ring-1", "ring-2"]
deployment_start_time: "2024-01-01T00:00:00Z"
time_condition:
  delay_start_time_by: 48
inclusion_windows:
  - days_of_week: [monday, tue]
    time_of_day_start: "09:00:00"
    time_of_day_end: "17:00:00"
dependency_gate:
  prerequisite_delay_start_time_by: 0
  minimum_open_hours: 24
"#;

    #[test]
    fn parses_yaml_document() {
        let doc = parse_document(YAML, DocumentFormat::Yaml).unwrap();
        assert_eq!(doc.scope_ids.as_ref().map(Vec::len), Some(2));
        assert!(!doc.manual_override);
        let windows = doc.inclusion_windows.as_ref().unwrap();
        let days = windows[0].days_of_week.as_ref().unwrap();
        assert!(days.contains(&Weekday::Monday));
        assert!(days.contains(&Weekday::Tuesday));
        assert_eq!(doc.time_condition.unwrap().delay_start_time_by, 48);
    }

    #[test]
    fn parses_toml_document() {
        let text = r#"
scope_id = "grp-1"
manual_override = true

[time_condition]
delay_start_time_by = 12
absolute_latest = "2024-02-01T00:00:00Z"
"#;
        let doc = parse_document(text, DocumentFormat::Toml).unwrap();
        assert_eq!(doc.scope_id.as_deref(), Some("grp-1"));
        assert!(doc.manual_override);
        let condition = doc.time_condition.unwrap();
        assert_eq!(condition.absolute_latest.as_deref(), Some("2024-02-01T00:00:00Z"));
    }

    #[test]
    fn parses_json_document() {
        let text = r#"{"scope_id": "grp-1", "exclusion_windows": [{"days_of_week": ["saturday", "sunday"]}]}"#;
        let doc = parse_document(text, DocumentFormat::Json).unwrap();
        assert_eq!(doc.exclusion_windows.unwrap().len(), 1);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = parse_document("scope_id: x\ndelay: 3\n", DocumentFormat::Yaml).unwrap_err();
        assert!(matches!(err, GateError::Parse(_)));
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(DocumentFormat::from_path(Path::new("gate.yml")), Some(DocumentFormat::Yaml));
        assert_eq!(DocumentFormat::from_path(Path::new("gate.TOML")), Some(DocumentFormat::Toml));
        assert_eq!(DocumentFormat::from_path(Path::new("gate.json")), Some(DocumentFormat::Json));
        assert_eq!(DocumentFormat::from_path(Path::new("gate.txt")), None);
        assert_eq!(DocumentFormat::from_path(Path::new("gate")), None);
    }

    #[test]
    fn resolve_defaults_falls_back_to_now() {
        let doc = GateDocument {
            scope_id: Some("grp-1".to_string()),
            ..GateDocument::default()
        };
        let now = utc(2024, 5, 1, 12);
        let resolved = resolve_defaults(&doc, now).unwrap();
        assert_eq!(resolved.deployment_start_time, now);
        assert_eq!(resolved.config, GateConfig::new(ScopeTarget::single("grp-1")));
        // Input untouched
        assert_eq!(doc.deployment_start_time, None);
    }

    #[test]
    fn resolve_defaults_keeps_configured_start() {
        let doc = parse_document(YAML, DocumentFormat::Yaml).unwrap();
        let resolved = resolve_defaults(&doc, utc(2024, 5, 1, 12)).unwrap();
        assert_eq!(resolved.deployment_start_time, utc(2024, 1, 1, 0));
        assert_eq!(resolved.config.scope, ScopeTarget::multiple(["ring-1", "ring-2"]));
    }

    #[test]
    fn scope_fields_are_mutually_exclusive() {
        let both = GateDocument {
            scope_id: Some("a".to_string()),
            scope_ids: Some(vec!["b".to_string()]),
            ..GateDocument::default()
        };
        assert_eq!(
            resolve_defaults(&both, utc(2024, 1, 1, 0)).unwrap_err(),
            GateError::Configuration(ConfigurationError::ConflictingScopes)
        );
        assert_eq!(
            resolve_defaults(&GateDocument::default(), utc(2024, 1, 1, 0)).unwrap_err(),
            GateError::Configuration(ConfigurationError::MissingScope)
        );
    }

    #[test]
    fn load_validates_conditions() {
        let text = "scope_id: grp-1\ntime_condition:\n  delay_start_time_by: -3\n";
        let err = load(text, DocumentFormat::Yaml, utc(2024, 1, 1, 0)).unwrap_err();
        assert!(err.is_configuration());

        let text = "scope_id: grp-1\ndeployment_start_time: tomorrow\n";
        let err = load(text, DocumentFormat::Yaml, utc(2024, 1, 1, 0)).unwrap_err();
        assert!(matches!(err, GateError::MalformedTimestamp { .. }));
    }

    #[test]
    fn load_then_evaluate() {
        let resolved = load(YAML, DocumentFormat::Yaml, utc(2024, 1, 3, 0)).unwrap();
        // Wednesday 2024-01-03 10:00 is outside the Monday/Tuesday window.
        let decision = crate::evaluate(&resolved.config, &resolved.context(utc(2024, 1, 3, 10))).unwrap();
        assert!(!decision.condition_met);
        // Tuesday 2024-01-09 10:00: all conditions hold.
        let decision = crate::evaluate(&resolved.config, &resolved.context(utc(2024, 1, 9, 10))).unwrap();
        assert!(decision.condition_met);
        assert_eq!(decision.released(), vec!["ring-1", "ring-2"]);
    }
}
