// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Readout Gate Evaluator
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Combinators grouping signals into named failure patterns.
//!
//! A gate fires only when every required signal is present in the
//! collection and individually fired. A required signal that is absent
//! altogether yields a not-fired result with a "missing signal"
//! rationale, never a spurious firing.

use readout_types::{
    clamp_likelihood_ratio, default_likelihood_ratio, GateId, GateMetadata, GateResult, LrSource,
    Severity, SignalId, SignalResult,
};

use crate::calibration::LikelihoodRatioTable;

/// Signals that must be present and fired for each gate.
pub fn required_signals(gate: GateId) -> &'static [SignalId] {
    match gate {
        GateId::G1 => &[SignalId::S1, SignalId::S2],
        GateId::G2 => &[SignalId::S3, SignalId::S4],
        GateId::G3 => &[SignalId::S5],
        GateId::G4 => &[SignalId::S8],
    }
}

/// Signals that strengthen G3 when fired.
const G3_STRENGTHENERS: &[SignalId] = &[SignalId::S6];

/// Signals of which at least one must corroborate S8 for G4.
const G4_CORROBORATORS: &[SignalId] = &[SignalId::S1, SignalId::S3, SignalId::S4];

/// Likelihood ratio for (gate, severity): calibrated if the table carries
/// it, otherwise the built-in default. Table values are clamped to
/// [`LR_MIN`, `LR_MAX`].
///
/// [`LR_MIN`]: readout_types::LR_MIN
/// [`LR_MAX`]: readout_types::LR_MAX
pub fn lookup_likelihood_ratio(
    table: Option<&LikelihoodRatioTable>,
    gate: GateId,
    severity: Severity,
) -> (f64, LrSource) {
    match table.and_then(|t| t.get(gate, severity)) {
        Some(entry) => (clamp_likelihood_ratio(entry.likelihood_ratio), entry.lr_source()),
        None => (default_likelihood_ratio(gate, severity), LrSource::Default),
    }
}

fn find(signals: &[SignalResult], id: SignalId) -> Option<&SignalResult> {
    signals.iter().find(|s| s.signal_id == id)
}

fn join_ids(ids: &[SignalId]) -> String {
    ids.iter().map(SignalId::as_str).collect::<Vec<_>>().join(", ")
}

fn fire(
    gate: GateId,
    supporting: &[&SignalResult],
    table: Option<&LikelihoodRatioTable>,
) -> GateResult {
    let severity = supporting
        .iter()
        .map(|s| s.severity)
        .max()
        .unwrap_or(Severity::Low);
    let (lr, source) = lookup_likelihood_ratio(table, gate, severity);
    let rationale = format!(
        "{} {}: {}",
        gate,
        gate.title(),
        supporting
            .iter()
            .map(|s| format!("{} ({})", s.signal_id, s.severity))
            .collect::<Vec<_>>()
            .join(", ")
    );
    log::debug!("{gate} fired at {severity} with LR {lr:.2}");
    GateResult {
        gate_id: gate,
        fired: true,
        supporting_signal_ids: supporting.iter().map(|s| s.signal_id).collect(),
        likelihood_ratio: Some(lr),
        rationale,
        severity,
        metadata: GateMetadata {
            missing_signals: Vec::new(),
            lr_source: Some(source),
        },
    }
}

/// Required signals if all are present, or the not-fired "missing" result.
fn require<'a>(
    gate: GateId,
    signals: &'a [SignalResult],
) -> Result<Vec<&'a SignalResult>, GateResult> {
    let required = required_signals(gate);
    let missing: Vec<SignalId> = required
        .iter()
        .copied()
        .filter(|id| find(signals, *id).is_none())
        .collect();
    if !missing.is_empty() {
        let mut result =
            GateResult::not_fired(gate, format!("missing signal(s): {}", join_ids(&missing)));
        result.metadata.missing_signals = missing;
        return Err(result);
    }
    Ok(required.iter().filter_map(|id| find(signals, *id)).collect())
}

fn unfired_rationale(present: &[&SignalResult]) -> String {
    present
        .iter()
        .filter(|s| !s.fired)
        .map(|s| format!("{} not fired ({})", s.signal_id, s.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

fn conjunction(
    gate: GateId,
    signals: &[SignalResult],
    table: Option<&LikelihoodRatioTable>,
) -> GateResult {
    let present = match require(gate, signals) {
        Ok(p) => p,
        Err(missing) => return missing,
    };
    if present.iter().all(|s| s.fired) {
        fire(gate, &present, table)
    } else {
        GateResult::not_fired(gate, unfired_rationale(&present))
    }
}

fn implausibility(signals: &[SignalResult], table: Option<&LikelihoodRatioTable>) -> GateResult {
    let present = match require(GateId::G3, signals) {
        Ok(p) => p,
        Err(missing) => return missing,
    };
    if !present.iter().all(|s| s.fired) {
        return GateResult::not_fired(GateId::G3, unfired_rationale(&present));
    }
    let mut supporting = present;
    supporting.extend(
        G3_STRENGTHENERS
            .iter()
            .filter_map(|id| find(signals, *id))
            .filter(|s| s.fired),
    );
    fire(GateId::G3, &supporting, table)
}

fn manipulation(signals: &[SignalResult], table: Option<&LikelihoodRatioTable>) -> GateResult {
    let present = match require(GateId::G4, signals) {
        Ok(p) => p,
        Err(missing) => return missing,
    };
    if !present.iter().all(|s| s.fired) {
        return GateResult::not_fired(GateId::G4, unfired_rationale(&present));
    }
    let corroborating: Vec<&SignalResult> = G4_CORROBORATORS
        .iter()
        .filter_map(|id| find(signals, *id))
        .filter(|s| s.fired)
        .collect();
    if corroborating.is_empty() {
        return GateResult::not_fired(
            GateId::G4,
            format!(
                "S8 fired without a corroborating signal ({})",
                join_ids(G4_CORROBORATORS)
            ),
        );
    }
    let mut supporting = present;
    supporting.extend(corroborating);
    fire(GateId::G4, &supporting, table)
}

/// Evaluate one gate over a trial's complete signal collection.
pub fn evaluate_gate(
    gate: GateId,
    signals: &[SignalResult],
    table: Option<&LikelihoodRatioTable>,
) -> GateResult {
    match gate {
        GateId::G1 | GateId::G2 => conjunction(gate, signals, table),
        GateId::G3 => implausibility(signals, table),
        GateId::G4 => manipulation(signals, table),
    }
}

/// Evaluate all four gates, returned in G1..G4 order.
pub fn evaluate_gates(
    signals: &[SignalResult],
    table: Option<&LikelihoodRatioTable>,
) -> Vec<GateResult> {
    GateId::ALL
        .iter()
        .map(|g| evaluate_gate(*g, signals, table))
        .collect()
}
