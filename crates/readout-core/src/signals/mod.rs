// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Readout Signal Evaluator
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Nine independent red-flag detectors over a single study card.
//!
//! Every detector is a pure function of the card, the optional
//! [`SignalContext`] and the configured [`SignalThresholds`]. A detector
//! never panics and never returns an error: when a required input is
//! missing or unparsable it returns a not-fired [`SignalResult`] whose
//! `reason` names the unmet precondition.

mod analysis;
mod design;
mod plausibility;
mod timeline;

pub use analysis::{itt_pp_divergence, os_pfs_contradiction, p_value_cusp, subgroup_only_win};
pub use design::{
    interim_looks_without_spending, single_arm_where_randomized, underpowered_pivotal,
};
pub use plausibility::graveyard_implausibility;
pub use timeline::endpoint_changed_late;

use readout_types::{
    ClassMetadata, SignalId, SignalResult, SignalThresholds, StudyCard, TrialVersion,
};

/// Auxiliary inputs supplied alongside the study card.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalContext<'a> {
    /// Registry snapshots, oldest first (S1).
    pub versions: &'a [TrialVersion],
    /// Indication/modality class history (S5).
    pub class_metadata: Option<&'a ClassMetadata>,
    /// Sponsor program p-value history (S8).
    pub program_p_values: &'a [f64],
    /// Randomized comparison is the field standard here (S7).
    pub randomized_standard: bool,
}

impl<'a> SignalContext<'a> {
    pub fn new(randomized_standard: bool) -> Self {
        Self {
            randomized_standard,
            ..Default::default()
        }
    }

    pub fn with_versions(mut self, versions: &'a [TrialVersion]) -> Self {
        self.versions = versions;
        self
    }

    pub fn with_class_metadata(mut self, class_metadata: Option<&'a ClassMetadata>) -> Self {
        self.class_metadata = class_metadata;
        self
    }

    pub fn with_program_p_values(mut self, program_p_values: &'a [f64]) -> Self {
        self.program_p_values = program_p_values;
        self
    }
}

/// Run a single detector.
pub fn evaluate_signal(
    id: SignalId,
    card: &StudyCard,
    ctx: &SignalContext<'_>,
    thresholds: &SignalThresholds,
) -> SignalResult {
    match id {
        SignalId::S1 => endpoint_changed_late(ctx.versions, thresholds),
        SignalId::S2 => underpowered_pivotal(card, thresholds),
        SignalId::S3 => subgroup_only_win(card, thresholds),
        SignalId::S4 => itt_pp_divergence(card, thresholds),
        SignalId::S5 => graveyard_implausibility(card, ctx.class_metadata, thresholds),
        SignalId::S6 => interim_looks_without_spending(card),
        SignalId::S7 => single_arm_where_randomized(card, ctx.randomized_standard),
        SignalId::S8 => p_value_cusp(card, ctx.program_p_values, thresholds),
        SignalId::S9 => os_pfs_contradiction(card),
    }
}

/// Run all nine detectors, returned in S1..S9 order.
pub fn evaluate_signals(
    card: &StudyCard,
    ctx: &SignalContext<'_>,
    thresholds: &SignalThresholds,
) -> Vec<SignalResult> {
    let results: Vec<SignalResult> = SignalId::ALL
        .iter()
        .map(|id| evaluate_signal(*id, card, ctx, thresholds))
        .collect();
    log::debug!(
        "signals for {}: fired [{}]",
        card.trial_id,
        results
            .iter()
            .filter(|r| r.fired)
            .map(|r| format!("{}:{}", r.signal_id, r.severity))
            .collect::<Vec<_>>()
            .join(", ")
    );
    results
}

/// The subset of `used` field paths the extractor marked low-certainty.
pub(crate) fn low_cert(card: &StudyCard, used: &[String]) -> Vec<String> {
    used.iter()
        .filter(|f| card.low_confidence_fields.contains(f.as_str()))
        .cloned()
        .collect()
}
