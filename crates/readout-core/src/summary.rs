// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Readout Batch Summary
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use readout_types::{ScoreResult, StopRule};

/// Coarse risk band of a posterior failure probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskBucket {
    Low,
    Medium,
    High,
}

impl RiskBucket {
    pub const MEDIUM_FROM: f64 = 0.30;
    pub const HIGH_FROM: f64 = 0.60;

    pub fn of(p_fail: f64) -> Self {
        if p_fail >= Self::HIGH_FROM {
            RiskBucket::High
        } else if p_fail >= Self::MEDIUM_FROM {
            RiskBucket::Medium
        } else {
            RiskBucket::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskBucket::Low => "low",
            RiskBucket::Medium => "medium",
            RiskBucket::High => "high",
        }
    }
}

impl fmt::Display for RiskBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate view over one scoring run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub low_risk: usize,
    pub medium_risk: usize,
    pub high_risk: usize,
    /// 0.0 for an empty batch.
    pub mean_p_fail: f64,
    pub stop_rule_count: usize,
    pub frozen_count: usize,
    pub stop_rules_by_type: BTreeMap<StopRule, usize>,
}

pub fn summarize(scores: &[ScoreResult]) -> BatchSummary {
    let mut summary = BatchSummary {
        total: scores.len(),
        ..Default::default()
    };
    let mut sum = 0.0;
    for s in scores {
        sum += s.p_fail;
        match RiskBucket::of(s.p_fail) {
            RiskBucket::Low => summary.low_risk += 1,
            RiskBucket::Medium => summary.medium_risk += 1,
            RiskBucket::High => summary.high_risk += 1,
        }
        if s.features_frozen_at.is_some() {
            summary.frozen_count += 1;
        }
        if let Some(rule) = s.metadata.stop_rule_type {
            summary.stop_rule_count += 1;
            *summary.stop_rules_by_type.entry(rule).or_default() += 1;
        }
    }
    if !scores.is_empty() {
        summary.mean_p_fail = sum / scores.len() as f64;
    }
    summary
}
