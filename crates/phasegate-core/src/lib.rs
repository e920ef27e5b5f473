//! # phasegate-core
//!
//! Condition evaluation engine for the phasegate deployment gate.
//!
//! Given a gate configuration, the current instant and a caller-owned
//! deployment start time, [`evaluate`] decides whether a phased rollout
//! releases its scope identifiers:
//! - Time condition ([`TimeCondition`]) — delay, absolute bounds, auto-expiry
//! - Time windows ([`TimeWindow`]) — inclusion and exclusion lists
//! - Dependency gate ([`DependencyGate`]) — simulated prerequisite timeline
//! - Manual override — bypasses all of the above
//!
//! Evaluation is pure and synchronous. The [`config`] module loads gate
//! documents and resolves defaults; [`status`] renders the status line.

pub mod condition;
pub mod config;
pub mod dependency;
pub mod error;
pub mod gate;
pub mod status;
pub mod time;
pub mod window;

pub use condition::{TimeCondition, TimeConditionOutcome, TimeConditionStatus};
pub use config::{DocumentFormat, GateDocument, ResolvedGate};
pub use dependency::{DependencyGate, DependencyOutcome, DependencyStatus};
pub use error::{ConfigurationError, GateError, Result};
pub use gate::{
    evaluate, evaluate_strict, EvaluationContext, GateConfig, GateDecision, GateDetail, ScopeTarget,
};
pub use status::{ConditionCheck, ConditionName, GateState};
pub use time::Weekday;
pub use window::{evaluate_exclusion, evaluate_inclusion, TimeWindow, WindowKind, WindowOutcome};
