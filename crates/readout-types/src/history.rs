// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Readout Risk Kernel Historical Outcomes
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::card::IndicationClass;
use crate::gate::GateId;
use crate::signal::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiredGate {
    pub gate_id: GateId,
    pub severity: Severity,
}

/// A completed trial with a known outcome, used for calibration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoricalTrial {
    pub trial_id: String,
    /// True if the trial failed to show its intended effect.
    pub failed: bool,
    pub is_pivotal: bool,
    pub indication: Option<IndicationClass>,
    pub fired_gates: Vec<FiredGate>,
}

impl HistoricalTrial {
    pub fn gate_fired_at(&self, gate_id: GateId, severity: Severity) -> bool {
        self.fired_gates
            .iter()
            .any(|g| g.gate_id == gate_id && g.severity == severity)
    }
}
