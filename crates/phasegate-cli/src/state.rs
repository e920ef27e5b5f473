//! Caller-side persistence of the deployment start time.
//!
//! The first evaluation records `now` as the deployment start; later
//! evaluations read it back so relative delays stay anchored.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    deployment_start_time: DateTime<Utc>,
}

/// Read the recorded start time, or record `now` if the file does not exist.
pub fn load_or_init(path: &Path, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    if path.exists() {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading state file {}", path.display()))?;
        let state: StateFile = serde_json::from_str(&text)
            .with_context(|| format!("parsing state file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "using recorded deployment start time");
        return Ok(state.deployment_start_time);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating state directory {}", parent.display()))?;
    }
    let state = StateFile {
        deployment_start_time: now,
    };
    fs::write(path, serde_json::to_string_pretty(&state)?)
        .with_context(|| format!("writing state file {}", path.display()))?;
    tracing::info!(path = %path.display(), "recorded deployment start time");
    Ok(now)
}
