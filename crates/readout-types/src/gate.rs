// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Readout Risk Kernel Gate Records
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::signal::{Severity, SignalId};

/// Identifier of a named failure pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GateId {
    G1,
    G2,
    G3,
    G4,
}

impl GateId {
    pub const ALL: [GateId; 4] = [GateId::G1, GateId::G2, GateId::G3, GateId::G4];

    pub fn as_str(&self) -> &'static str {
        match self {
            GateId::G1 => "G1",
            GateId::G2 => "G2",
            GateId::G3 => "G3",
            GateId::G4 => "G4",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            GateId::G1 => "statistical-control breakdown",
            GateId::G2 => "analysis gaming",
            GateId::G3 => "implausibility",
            GateId::G4 => "result manipulation",
        }
    }
}

impl fmt::Display for GateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Smallest likelihood ratio the kernel will emit or consume.
pub const LR_MIN: f64 = 0.05;
/// Largest likelihood ratio the kernel will emit or consume.
pub const LR_MAX: f64 = 20.0;

/// Conservative built-in likelihood ratio for a (gate, severity) pair,
/// used whenever no calibrated value is available.
pub const fn default_likelihood_ratio(gate: GateId, severity: Severity) -> f64 {
    match (gate, severity) {
        (GateId::G1, Severity::Low) => 3.0,
        (GateId::G1, Severity::Medium) => 5.0,
        (GateId::G1, Severity::High) => 10.0,
        (GateId::G2, Severity::Low) => 2.5,
        (GateId::G2, Severity::Medium) => 4.0,
        (GateId::G2, Severity::High) => 8.0,
        (GateId::G3, Severity::Low) => 2.0,
        (GateId::G3, Severity::Medium) => 3.5,
        (GateId::G3, Severity::High) => 6.0,
        (GateId::G4, Severity::Low) => 2.0,
        (GateId::G4, Severity::Medium) => 3.0,
        (GateId::G4, Severity::High) => 5.0,
    }
}

/// Clamp a likelihood ratio into [`LR_MIN`, `LR_MAX`]; non-finite or
/// non-positive input becomes neutral (1.0).
pub fn clamp_likelihood_ratio(lr: f64) -> f64 {
    if !lr.is_finite() || lr <= 0.0 {
        log::warn!("clamp_likelihood_ratio: invalid ratio {lr}, using neutral 1.0");
        return 1.0;
    }
    lr.clamp(LR_MIN, LR_MAX)
}

/// Where a gate's likelihood ratio came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LrSource {
    Calibrated,
    Default,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateMetadata {
    /// Required signals absent from the input collection.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_signals: Vec<SignalId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lr_source: Option<LrSource>,
}

/// Outcome of one gate over a trial's signal collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    pub gate_id: GateId,
    pub fired: bool,
    pub supporting_signal_ids: Vec<SignalId>,
    /// Present only when fired.
    pub likelihood_ratio: Option<f64>,
    pub rationale: String,
    pub severity: Severity,
    pub metadata: GateMetadata,
}

impl GateResult {
    pub fn not_fired(gate_id: GateId, rationale: impl Into<String>) -> Self {
        Self {
            gate_id,
            fired: false,
            supporting_signal_ids: Vec::new(),
            likelihood_ratio: None,
            rationale: rationale.into(),
            severity: Severity::Low,
            metadata: GateMetadata::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lr_g1_high() {
        assert_eq!(default_likelihood_ratio(GateId::G1, Severity::High), 10.0);
    }

    #[test]
    fn test_default_lr_monotone_in_severity() {
        for gate in GateId::ALL {
            let l = default_likelihood_ratio(gate, Severity::Low);
            let m = default_likelihood_ratio(gate, Severity::Medium);
            let h = default_likelihood_ratio(gate, Severity::High);
            assert!(l < m && m < h, "{gate} defaults not increasing");
            assert!(h <= LR_MAX);
        }
    }

    #[test]
    fn test_clamp_lr() {
        assert_eq!(clamp_likelihood_ratio(100.0), LR_MAX);
        assert_eq!(clamp_likelihood_ratio(0.001), LR_MIN);
        assert_eq!(clamp_likelihood_ratio(f64::NAN), 1.0);
        assert_eq!(clamp_likelihood_ratio(-2.0), 1.0);
        assert_eq!(clamp_likelihood_ratio(4.0), 4.0);
    }

    #[test]
    fn test_gate_id_serde() {
        assert_eq!(serde_json::to_string(&GateId::G3).unwrap(), "\"G3\"");
    }
}
