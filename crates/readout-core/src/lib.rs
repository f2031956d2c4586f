// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Readout Risk Kernel Core Engine
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Signal detection, gate evaluation and Bayesian scoring of clinical
//! trial failure risk from public disclosure data.
//!
//! # Pipeline
//!
//! For each trial: nine signal detectors run over the study card, four
//! gates combine their results, and the scorer turns the fired gates into
//! a posterior failure probability. [`ScoringEngine`] drives the pipeline
//! for one trial or a parallel batch.
//!
//! # Invariants
//!
//! 1. **No spurious firing**: a gate whose required signal is absent
//!    from the collection never fires.
//! 2. **Neutral without evidence**: with no fired gate and no stop rule,
//!    `p_fail` equals the prior exactly.
//! 3. **Stop rules dominate**: the first matching rule fixes the posterior
//!    regardless of the gates' likelihood ratios.
//! 4. **Deterministic**: the scoring time is an explicit argument, so the
//!    same inputs always produce bit-identical results.

pub mod calibration;
pub mod engine;
pub mod gates;
pub mod scorer;
pub mod signals;
pub mod stats;
pub mod summary;

pub use calibration::{
    build_calibrated_config, CalibratedConfig, CalibrationDocument, LikelihoodRatioCalibrator,
    LikelihoodRatioTable, LrEntry, PriorCategory, PriorEntry, PriorRateCalibrator, PriorSource,
    PriorTable, CALIBRATION_SCHEMA, CALIBRATION_VERSION,
};
pub use engine::{ScoringEngine, TrialEvaluation, TrialInput};
pub use gates::{evaluate_gate, evaluate_gates, lookup_likelihood_ratio, required_signals};
pub use scorer::{score_trial, TrialScorer};
pub use signals::{evaluate_signal, evaluate_signals, SignalContext};
pub use summary::{summarize, BatchSummary, RiskBucket};
