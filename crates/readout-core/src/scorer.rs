// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Readout Bayesian Failure Scorer
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Log-odds failure scorer.
//!
//! A trial's score is computed in five pure steps:
//! 1. **Prior** from trial category, indication, phase and sponsor record.
//! 2. **Stop rules**: the first matching deterministic override fixes the
//!    posterior outright.
//! 3. **Likelihood**: each fired gate contributes `ln(LR)`.
//! 4. **Posterior**: `p_fail = σ(logit(prior) + Σ ln LR)`, clamped.
//! 5. **Freeze**: inputs are frozen near primary completion.
//!
//! `now` is always passed in, so rescoring the same inputs is
//! bit-identical.

use chrono::{DateTime, TimeDelta, Utc};

use readout_types::{
    clamp_likelihood_ratio, clamp_logit, clamp_score, logit, rate, sigmoid, CardFlags,
    EngineConfig, GateContribution, GateId, GateResult, IndicationClass, PriorAdjustment,
    ScoreMetadata, ScoreResult, Severity, StopRule, TrialMetadata, TrialPhase,
};

use crate::calibration::{CalibratedConfig, PriorCategory};
use crate::gates::lookup_likelihood_ratio;

/// Prior multiplier for pivotal trials when no pivotal rate is calibrated.
pub const PIVOTAL_MULTIPLIER: f64 = 1.20;

pub fn indication_multiplier(indication: IndicationClass) -> f64 {
    match indication {
        IndicationClass::Oncology => 1.30,
        IndicationClass::Neurology => 1.25,
        IndicationClass::Cardiovascular => 1.10,
        IndicationClass::Metabolic => 1.05,
        IndicationClass::InfectiousDisease => 0.90,
        IndicationClass::RareDisease => 0.80,
        IndicationClass::Other => 1.00,
    }
}

pub fn phase_multiplier(phase: TrialPhase) -> f64 {
    match phase {
        TrialPhase::Phase1 => 1.00,
        TrialPhase::Phase2 => 1.05,
        TrialPhase::Phase3 => 1.15,
    }
}

/// Sponsors without an approval track record fail more often.
pub fn sponsor_multiplier(prior_approvals: u32) -> f64 {
    match prior_approvals {
        0 => 1.25,
        1 | 2 => 1.10,
        _ => 1.00,
    }
}

fn phase_label(phase: TrialPhase) -> &'static str {
    match phase {
        TrialPhase::Phase1 => "phase:1",
        TrialPhase::Phase2 => "phase:2",
        TrialPhase::Phase3 => "phase:3",
    }
}

/// Scorer bound to one engine configuration and calibration snapshot.
#[derive(Debug, Clone, Copy)]
pub struct TrialScorer<'a> {
    config: &'a EngineConfig,
    calibration: &'a CalibratedConfig,
}

impl<'a> TrialScorer<'a> {
    pub fn new(config: &'a EngineConfig, calibration: &'a CalibratedConfig) -> Self {
        Self {
            config,
            calibration,
        }
    }

    /// Step 1: prior failure probability and the multipliers that formed it.
    pub fn prior(&self, meta: &TrialMetadata) -> (f64, Vec<PriorAdjustment>) {
        let rates = self.calibration.prior_rates.as_ref();
        let category = if meta.is_pivotal {
            PriorCategory::Pivotal
        } else {
            PriorCategory::NonPivotal
        };
        let calibrated_base = rates.and_then(|r| r.empirical_rate(category));

        let mut adjustments = Vec::new();
        let mut push = |factor: String, multiplier: f64| {
            adjustments.push(PriorAdjustment { factor, multiplier });
        };

        if meta.is_pivotal && calibrated_base.is_none() {
            push("pivotal".into(), PIVOTAL_MULTIPLIER);
        }
        if let Some(ind) = meta.indication {
            let calibrated = rates.and_then(|r| {
                let ind_rate = r.empirical_rate(PriorCategory::Indication(ind))?;
                let overall = r.empirical_rate(PriorCategory::Overall)?;
                (overall > 0.0).then(|| ind_rate / overall)
            });
            push(
                format!("indication:{ind}"),
                calibrated.unwrap_or_else(|| indication_multiplier(ind)),
            );
        }
        if let Some(phase) = meta.phase {
            push(phase_label(phase).into(), phase_multiplier(phase));
        }
        if let Some(n) = meta.sponsor_prior_approvals {
            push(format!("sponsor_prior_approvals:{n}"), sponsor_multiplier(n));
        }

        let base = calibrated_base.unwrap_or(self.config.default_prior);
        let raw = adjustments.iter().fold(base, |p, a| p * a.multiplier);
        let prior = clamp_score(raw, self.config.prior_min, self.config.prior_max);
        (prior, adjustments)
    }

    fn stop_rule_matches(&self, rule: StopRule, flags: &CardFlags, gates: &[GateResult]) -> bool {
        match rule {
            StopRule::EndpointChangedAfterLpr => {
                flags.endpoint_changed_after_lpr
                    && gates.iter().any(|g| g.gate_id == GateId::G1 && g.fired)
            }
            StopRule::PpOnlyDropoutAsymmetry => {
                flags.pp_only_success
                    && rate(&flags.dropout_asymmetry)
                        .is_some_and(|d| d > self.config.dropout_asymmetry_threshold)
            }
            StopRule::UnblindedSubjectivePrimary => {
                flags.unblinded_subjective_primary && flags.blinding_feasible
            }
            StopRule::MultipleHighSeverityGates => {
                gates
                    .iter()
                    .filter(|g| g.fired && g.severity == Severity::High)
                    .count()
                    >= 2
            }
        }
    }

    fn stop_rule_posterior(&self, rule: StopRule) -> f64 {
        match rule {
            StopRule::EndpointChangedAfterLpr => self.config.lpr_change_posterior,
            StopRule::PpOnlyDropoutAsymmetry => self.config.pp_only_posterior,
            StopRule::UnblindedSubjectivePrimary => self.config.unblinded_subjective_posterior,
            StopRule::MultipleHighSeverityGates => self.config.multi_high_gate_posterior,
        }
    }

    /// Step 2: first matching stop rule in priority order, with its fixed
    /// posterior.
    pub fn stop_rule(&self, flags: &CardFlags, gates: &[GateResult]) -> Option<(StopRule, f64)> {
        StopRule::PRIORITY
            .iter()
            .copied()
            .find(|rule| {
                let hit = self.stop_rule_matches(*rule, flags, gates);
                log::debug!("stop rule {rule}: {}", if hit { "match" } else { "no match" });
                hit
            })
            .map(|rule| (rule, self.stop_rule_posterior(rule)))
    }

    /// Step 3: log-likelihood contribution of every fired gate.
    pub fn contributions(&self, gates: &[GateResult]) -> Vec<GateContribution> {
        let table = self.calibration.likelihood_ratios.as_ref();
        gates
            .iter()
            .filter(|g| g.fired)
            .map(|g| {
                let lr = g
                    .likelihood_ratio
                    .unwrap_or_else(|| lookup_likelihood_ratio(table, g.gate_id, g.severity).0);
                let lr = clamp_likelihood_ratio(lr);
                GateContribution {
                    gate_id: g.gate_id,
                    severity: g.severity,
                    likelihood_ratio: lr,
                    log_lr: lr.ln(),
                }
            })
            .collect()
    }

    /// Step 5: `Some(now)` once `now` is inside the freeze window. A window
    /// start outside chrono's calendar range means no freeze.
    pub fn freeze(&self, meta: &TrialMetadata, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let completion = meta.est_primary_completion_date?;
        let window = TimeDelta::try_days(self.config.feature_freeze_days)?;
        let starts = completion.checked_sub_signed(window)?;
        (now.date_naive() >= starts).then_some(now)
    }

    /// Score one trial from its metadata, card flags and gate results.
    pub fn score(
        &self,
        meta: &TrialMetadata,
        flags: &CardFlags,
        gates: &[GateResult],
        run_id: &str,
        now: DateTime<Utc>,
    ) -> ScoreResult {
        let (prior_pi, prior_adjustments) = self.prior(meta);
        let logit_prior = logit(prior_pi);

        let mut metadata = ScoreMetadata {
            fired_gates: gates.iter().filter(|g| g.fired).map(|g| g.gate_id).collect(),
            prior_adjustments,
            calibration_version: self.calibration.version.clone(),
            ..Default::default()
        };

        let (sum_log_lr, logit_post, p_fail) = match self.stop_rule(flags, gates) {
            Some((rule, fixed)) => {
                log::info!(
                    "trial {}: stop rule {rule} fixes p_fail at {fixed:.2}",
                    meta.trial_id
                );
                metadata.stop_rule_applied = true;
                metadata.stop_rule_type = Some(rule);
                (0.0, logit(fixed), clamp_score(fixed, 0.0, 1.0))
            }
            None => {
                metadata.gate_contributions = self.contributions(gates);
                let sum = clamp_logit(metadata.gate_contributions.iter().map(|c| c.log_lr).sum());
                if sum == 0.0 {
                    (0.0, logit_prior, prior_pi)
                } else {
                    let post = clamp_logit(logit_prior + sum);
                    (sum, post, clamp_score(sigmoid(post), 0.0, 1.0))
                }
            }
        };

        log::debug!(
            "trial {}: prior {prior_pi:.4} Σln(LR) {sum_log_lr:.4} → p_fail {p_fail:.4}",
            meta.trial_id
        );

        ScoreResult {
            trial_id: meta.trial_id.clone(),
            run_id: run_id.to_string(),
            prior_pi,
            logit_prior,
            sum_log_lr,
            logit_post,
            p_fail,
            features_frozen_at: self.freeze(meta, now),
            scored_at: now,
            metadata,
        }
    }
}

/// Score one trial against `config` and `calibration`.
pub fn score_trial(
    config: &EngineConfig,
    calibration: &CalibratedConfig,
    meta: &TrialMetadata,
    flags: &CardFlags,
    gates: &[GateResult],
    run_id: &str,
    now: DateTime<Utc>,
) -> ScoreResult {
    TrialScorer::new(config, calibration).score(meta, flags, gates, run_id, now)
}
