// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Readout Risk Kernel Score Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gate::GateId;
use crate::signal::Severity;

/// Bound applied to every logit and log-likelihood sum.
pub const LOGIT_BOUND: f64 = 20.0;

/// Probabilities are pinned this far inside (0, 1) before taking logits.
const PROB_EPS: f64 = 1e-9;

/// Clamp a value to [lo, hi], mapping NaN to lo and Inf to nearest bound.
#[inline]
pub fn clamp_score(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_nan() {
        log::warn!("clamp_score: NaN detected, clamping to {lo:.4}");
        return lo;
    }
    if value.is_infinite() {
        let boundary = if value > 0.0 { hi } else { lo };
        log::warn!("clamp_score: Inf detected, clamping to {boundary:.4}");
        return boundary;
    }
    value.clamp(lo, hi)
}

/// Clamp to the persisted logit range [-20, 20].
#[inline]
pub fn clamp_logit(value: f64) -> f64 {
    clamp_score(value, -LOGIT_BOUND, LOGIT_BOUND)
}

/// Log-odds of `p`, clamped to [-20, 20].
pub fn logit(p: f64) -> f64 {
    let p = clamp_score(p, PROB_EPS, 1.0 - PROB_EPS);
    clamp_logit((p / (1.0 - p)).ln())
}

/// Logistic transform, clamped to [0, 1].
pub fn sigmoid(x: f64) -> f64 {
    let x = clamp_logit(x);
    let p = if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    };
    clamp_score(p, 0.0, 1.0)
}

/// Deterministic overrides, listed in evaluation priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopRule {
    /// Endpoint changed after last patient randomized while G1 fired.
    EndpointChangedAfterLpr,
    /// Success only in the per-protocol population with asymmetric dropout.
    PpOnlyDropoutAsymmetry,
    /// Subjective primary endpoint left unblinded although blinding was feasible.
    UnblindedSubjectivePrimary,
    /// Two or more gates fired at High severity.
    MultipleHighSeverityGates,
}

impl StopRule {
    pub const PRIORITY: [StopRule; 4] = [
        StopRule::EndpointChangedAfterLpr,
        StopRule::PpOnlyDropoutAsymmetry,
        StopRule::UnblindedSubjectivePrimary,
        StopRule::MultipleHighSeverityGates,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StopRule::EndpointChangedAfterLpr => "endpoint_changed_after_lpr",
            StopRule::PpOnlyDropoutAsymmetry => "pp_only_dropout_asymmetry",
            StopRule::UnblindedSubjectivePrimary => "unblinded_subjective_primary",
            StopRule::MultipleHighSeverityGates => "multiple_high_severity_gates",
        }
    }
}

impl fmt::Display for StopRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fired gate's contribution to the posterior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateContribution {
    pub gate_id: GateId,
    pub severity: Severity,
    pub likelihood_ratio: f64,
    pub log_lr: f64,
}

/// One multiplicative adjustment applied while forming the prior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorAdjustment {
    pub factor: String,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreMetadata {
    pub stop_rule_applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_rule_type: Option<StopRule>,
    pub fired_gates: Vec<GateId>,
    pub gate_contributions: Vec<GateContribution>,
    pub prior_adjustments: Vec<PriorAdjustment>,
    /// Set when a calibrated configuration informed the score.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calibration_version: Option<String>,
}

/// Posterior failure estimate for one trial in one scoring pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub trial_id: String,
    pub run_id: String,
    /// Prior failure probability ∈ [0, 1].
    pub prior_pi: f64,
    pub logit_prior: f64,
    /// Sum of log likelihood ratios of fired gates (0 if none).
    pub sum_log_lr: f64,
    pub logit_post: f64,
    /// Posterior failure probability ∈ [0, 1].
    pub p_fail: f64,
    pub features_frozen_at: Option<DateTime<Utc>>,
    pub scored_at: DateTime<Utc>,
    pub metadata: ScoreMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_nan() {
        assert_eq!(clamp_score(f64::NAN, 0.0, 1.0), 0.0);
    }

    #[test]
    fn test_clamp_pos_inf() {
        assert_eq!(clamp_score(f64::INFINITY, 0.0, 1.0), 1.0);
    }

    #[test]
    fn test_clamp_neg_inf() {
        assert_eq!(clamp_score(f64::NEG_INFINITY, 0.0, 1.0), 0.0);
    }

    #[test]
    fn test_clamp_normal() {
        assert_eq!(clamp_score(0.75, 0.0, 1.0), 0.75);
    }

    #[test]
    fn test_logit_bounded() {
        assert_eq!(logit(0.0), -LOGIT_BOUND);
        assert_eq!(logit(1.0), LOGIT_BOUND);
        assert_eq!(logit(0.5), 0.0);
    }

    #[test]
    fn test_sigmoid_inverts_logit() {
        for p in [0.01, 0.15, 0.5, 0.9, 0.97] {
            assert!((sigmoid(logit(p)) - p).abs() < 1e-12);
        }
    }

    #[test]
    fn test_sigmoid_extremes_stay_in_unit_interval() {
        assert!(sigmoid(1e6) <= 1.0);
        assert!(sigmoid(-1e6) >= 0.0);
        assert_eq!(sigmoid(f64::NAN), sigmoid(-LOGIT_BOUND));
    }

    #[test]
    fn test_stop_rule_tags() {
        assert_eq!(
            serde_json::to_string(&StopRule::EndpointChangedAfterLpr).unwrap(),
            "\"endpoint_changed_after_lpr\""
        );
        assert_eq!(StopRule::PRIORITY[0], StopRule::EndpointChangedAfterLpr);
    }
}
