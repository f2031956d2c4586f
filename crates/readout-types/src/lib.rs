// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Readout Risk Kernel Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Type definitions, configuration, and error hierarchy for the
//! Readout Risk Kernel: trial-failure estimation from disclosure data.
//!
//! Every output record satisfies the persistence invariants callers rely
//! on: severities come from a closed set, likelihood ratios lie in
//! [`LR_MIN`, `LR_MAX`], logits in [-20, 20] and probabilities in [0, 1].

pub mod card;
pub mod config;
pub mod error;
pub mod gate;
pub mod history;
pub mod score;
pub mod signal;

pub use card::{
    num, rate, AnalysisPlan, Arm, CardFlags, ChangedField, ClassMetadata, EndpointKind,
    IndicationClass, LooseNumber, PopulationResult, PrimaryResult, StudyCard, SubgroupResult,
    SurvivalEstimate, SurvivalResults, TrialMetadata, TrialPhase, TrialVersion, VersionChange,
};
pub use config::{EngineConfig, SignalThresholds, MAX_WINDOW_DAYS};
pub use error::{ReadoutError, ReadoutResult};
pub use gate::{
    clamp_likelihood_ratio, default_likelihood_ratio, GateId, GateMetadata, GateResult, LrSource,
    LR_MAX, LR_MIN,
};
pub use history::{FiredGate, HistoricalTrial};
pub use score::{
    clamp_logit, clamp_score, logit, sigmoid, GateContribution, PriorAdjustment, ScoreMetadata,
    ScoreResult, StopRule, LOGIT_BOUND,
};
pub use signal::{EvidenceKind, EvidenceRef, Severity, SignalId, SignalMetadata, SignalResult};
