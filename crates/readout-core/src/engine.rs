// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Readout Scoring Engine
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Pipeline facade: signals → gates → score, for one trial or a batch.
//!
//! The engine owns a validated [`EngineConfig`] and a swappable
//! [`CalibratedConfig`]. Every evaluation works on an `Arc` snapshot of the
//! calibration taken when it starts, so installing a new calibration while
//! a batch is in flight never mixes two calibrations inside one batch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use readout_types::{
    CardFlags, ClassMetadata, EngineConfig, GateResult, ReadoutResult, ScoreResult, SignalResult,
    StudyCard, TrialMetadata, TrialVersion,
};

use crate::calibration::CalibratedConfig;
use crate::gates::evaluate_gates;
use crate::scorer::TrialScorer;
use crate::signals::{evaluate_signals, SignalContext};

/// Everything known about one trial at scoring time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialInput {
    pub card: StudyCard,
    /// Registry versions in chronological order.
    pub versions: Vec<TrialVersion>,
    pub class_metadata: Option<ClassMetadata>,
    /// Primary p-values across the sponsor's program, for heaping checks.
    pub program_p_values: Vec<f64>,
    pub metadata: TrialMetadata,
}

/// Full audit trail of one trial's evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialEvaluation {
    pub signals: Vec<SignalResult>,
    pub gates: Vec<GateResult>,
    pub score: ScoreResult,
}

pub struct ScoringEngine {
    config: EngineConfig,
    calibration: RwLock<Arc<CalibratedConfig>>,
}

impl ScoringEngine {
    /// Build an uncalibrated engine; fails if `config` does not validate.
    pub fn new(config: EngineConfig) -> ReadoutResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            calibration: RwLock::new(Arc::new(CalibratedConfig::uncalibrated())),
        })
    }

    pub fn with_calibration(self, calibration: CalibratedConfig) -> Self {
        self.install_calibration(calibration);
        self
    }

    /// Replace the calibration used by evaluations that start after this call.
    pub fn install_calibration(&self, calibration: CalibratedConfig) {
        log::info!(
            "installing calibration {}",
            calibration.version.as_deref().unwrap_or("<uncalibrated>")
        );
        *self.calibration.write() = Arc::new(calibration);
    }

    /// Snapshot of the calibration currently installed.
    pub fn calibration(&self) -> Arc<CalibratedConfig> {
        Arc::clone(&self.calibration.read())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn evaluate_with(
        &self,
        calibration: &CalibratedConfig,
        input: &TrialInput,
        run_id: &str,
        now: DateTime<Utc>,
    ) -> TrialEvaluation {
        let ctx = SignalContext::new(self.config.require_randomized)
            .with_versions(&input.versions)
            .with_class_metadata(input.class_metadata.as_ref())
            .with_program_p_values(&input.program_p_values);
        let signals = evaluate_signals(&input.card, &ctx, &self.config.signals);
        let gates = evaluate_gates(&signals, calibration.likelihood_ratios.as_ref());
        let score = TrialScorer::new(&self.config, calibration).score(
            &input.metadata,
            &input.card.flags,
            &gates,
            run_id,
            now,
        );
        TrialEvaluation {
            signals,
            gates,
            score,
        }
    }

    /// Evaluate one trial end to end.
    pub fn evaluate_at(
        &self,
        input: &TrialInput,
        run_id: &str,
        now: DateTime<Utc>,
    ) -> TrialEvaluation {
        let calibration = self.calibration();
        self.evaluate_with(&calibration, input, run_id, now)
    }

    /// Score precomputed gate results.
    pub fn score_at(
        &self,
        meta: &TrialMetadata,
        flags: &CardFlags,
        gates: &[GateResult],
        run_id: &str,
        now: DateTime<Utc>,
    ) -> ScoreResult {
        let calibration = self.calibration();
        TrialScorer::new(&self.config, &calibration).score(meta, flags, gates, run_id, now)
    }

    /// Evaluate trials in parallel. Output order matches `inputs`, and the
    /// whole batch shares one calibration snapshot.
    pub fn evaluate_batch_at(
        &self,
        inputs: &[TrialInput],
        run_id: &str,
        now: DateTime<Utc>,
    ) -> Vec<TrialEvaluation> {
        let calibration = self.calibration();
        log::info!("scoring batch {run_id}: {} trials", inputs.len());
        inputs
            .par_iter()
            .map(|input| self.evaluate_with(&calibration, input, run_id, now))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};
    use readout_types::{
        FiredGate, GateId, HistoricalTrial, ReadoutError, Severity, SignalId, StopRule,
    };

    use super::*;
    use crate::calibration::build_calibrated_config;
    use crate::signals::fixtures::underpowered_card;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 8, 0, 0).unwrap()
    }

    fn input(id: &str) -> TrialInput {
        TrialInput {
            card: StudyCard {
                trial_id: id.into(),
                ..underpowered_card()
            },
            metadata: TrialMetadata {
                trial_id: id.into(),
                is_pivotal: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = EngineConfig {
            prior_min: 0.6,
            prior_max: 0.4,
            ..Default::default()
        };
        assert!(matches!(ScoringEngine::new(config), Err(ReadoutError::Config(_))));
    }

    #[test]
    fn test_evaluate_produces_full_audit() {
        let engine = ScoringEngine::new(EngineConfig::default()).unwrap();
        let eval = engine.evaluate_at(&input("NCT1"), "run-7", now());
        assert_eq!(eval.signals.len(), 9);
        assert_eq!(eval.gates.len(), 4);
        assert_eq!(eval.score.run_id, "run-7");
        assert_eq!(eval.score.trial_id, "NCT1");
        // S2 fires but no versions means no S1, so G1 stays quiet.
        assert!(eval.signals.iter().any(|s| s.signal_id == SignalId::S2 && s.fired));
        assert!(eval.gates.iter().all(|g| !g.fired));
        assert_eq!(eval.score.p_fail, eval.score.prior_pi);
    }

    #[test]
    fn test_batch_preserves_order() {
        let engine = ScoringEngine::new(EngineConfig::default()).unwrap();
        let inputs: Vec<_> = (0..64).map(|i| input(&format!("NCT{i:04}"))).collect();
        let out = engine.evaluate_batch_at(&inputs, "batch", now());
        assert_eq!(out.len(), 64);
        for (i, eval) in out.iter().enumerate() {
            assert_eq!(eval.score.trial_id, format!("NCT{i:04}"));
        }
    }

    #[test]
    fn test_batch_matches_single() {
        let engine = ScoringEngine::new(EngineConfig::default()).unwrap();
        let inputs = vec![input("A"), input("B")];
        let batch = engine.evaluate_batch_at(&inputs, "r", now());
        assert_eq!(batch[1], engine.evaluate_at(&inputs[1], "r", now()));
    }

    #[test]
    fn test_score_at_with_prebuilt_gates() {
        let engine = ScoringEngine::new(EngineConfig::default()).unwrap();
        let flags = CardFlags {
            unblinded_subjective_primary: true,
            blinding_feasible: true,
            ..Default::default()
        };
        let r = engine.score_at(&TrialMetadata::default(), &flags, &[], "r", now());
        assert_eq!(r.metadata.stop_rule_type, Some(StopRule::UnblindedSubjectivePrimary));
    }

    #[test]
    fn test_install_calibration_swaps_snapshot() {
        let engine = ScoringEngine::new(EngineConfig::default()).unwrap();
        let before = engine.calibration();
        assert!(!before.is_calibrated());

        let history: Vec<HistoricalTrial> = (0..30)
            .map(|i| HistoricalTrial {
                trial_id: format!("H{i}"),
                failed: i % 2 == 0,
                is_pivotal: true,
                indication: None,
                fired_gates: vec![FiredGate {
                    gate_id: GateId::G2,
                    severity: Severity::Low,
                }],
            })
            .collect();
        engine.install_calibration(build_calibrated_config(&history, 5, 10, now()));

        let after = engine.calibration();
        assert!(after.is_calibrated());
        // The earlier snapshot is unaffected by the swap.
        assert!(!before.is_calibrated());

        let r = engine.score_at(
            &TrialMetadata {
                is_pivotal: true,
                ..Default::default()
            },
            &CardFlags::default(),
            &[],
            "r",
            now(),
        );
        assert!((r.prior_pi - 0.5).abs() < 1e-12);
        assert!(r.metadata.calibration_version.is_some());
    }

    #[test]
    fn test_batch_survives_out_of_range_completion_date() {
        let engine = ScoringEngine::new(EngineConfig::default()).unwrap();
        let mut odd = input("NCT-MIN");
        odd.metadata.est_primary_completion_date = Some(NaiveDate::MIN);
        let mut late = input("NCT-MAX");
        late.metadata.est_primary_completion_date = Some(NaiveDate::MAX);
        let inputs = vec![input("A"), odd, late, input("B")];

        let out = engine.evaluate_batch_at(&inputs, "r", now());
        assert_eq!(out.len(), 4);
        let ids: Vec<_> = out.iter().map(|e| e.score.trial_id.as_str()).collect();
        assert_eq!(ids, ["A", "NCT-MIN", "NCT-MAX", "B"]);
        assert!(out[1].score.features_frozen_at.is_none());
        assert!(out[2].score.features_frozen_at.is_none());
        assert_eq!(out[0], engine.evaluate_at(&inputs[0], "r", now()));
        assert_eq!(out[3], engine.evaluate_at(&inputs[3], "r", now()));
    }
}
