// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Readout Risk Kernel Signal Records
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity attached to signals and gates. Ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Low, Severity::Medium, Severity::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of one of the nine red-flag detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SignalId {
    S1,
    S2,
    S3,
    S4,
    S5,
    S6,
    S7,
    S8,
    S9,
}

impl SignalId {
    pub const ALL: [SignalId; 9] = [
        SignalId::S1,
        SignalId::S2,
        SignalId::S3,
        SignalId::S4,
        SignalId::S5,
        SignalId::S6,
        SignalId::S7,
        SignalId::S8,
        SignalId::S9,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalId::S1 => "S1",
            SignalId::S2 => "S2",
            SignalId::S3 => "S3",
            SignalId::S4 => "S4",
            SignalId::S5 => "S5",
            SignalId::S6 => "S6",
            SignalId::S7 => "S7",
            SignalId::S8 => "S8",
            SignalId::S9 => "S9",
        }
    }

    /// Short human-readable name.
    pub fn title(&self) -> &'static str {
        match self {
            SignalId::S1 => "endpoint changed late",
            SignalId::S2 => "underpowered pivotal trial",
            SignalId::S3 => "subgroup-only win without multiplicity control",
            SignalId::S4 => "ITT vs per-protocol divergence",
            SignalId::S5 => "implausible effect in graveyard class",
            SignalId::S6 => "interim looks without alpha spending",
            SignalId::S7 => "single-arm where randomized is standard",
            SignalId::S8 => "p-value at significance cusp",
            SignalId::S9 => "OS vs PFS contradiction",
        }
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which part of the study card (or its context) a reference points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    Arm,
    AnalysisPlan,
    PrimaryResult,
    Subgroup,
    Survival,
    CardFlag,
    TrialVersion,
    ClassMetadata,
    ProgramHistory,
}

/// Tagged reference into the originating card; resolved lazily by callers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EvidenceRef {
    pub kind: EvidenceKind,
    pub id: String,
}

impl EvidenceRef {
    pub fn new(kind: EvidenceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

/// Recognized detector metadata. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_before_completion: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_n: Option<(f64, f64)>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub offending_subgroups: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub divergence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dropout_gap: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_upper_percentile: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cusp_band: Option<(f64, f64)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_cusp_fraction: Option<f64>,
}

/// Outcome of one detector on one study card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalResult {
    pub signal_id: SignalId,
    pub fired: bool,
    pub severity: Severity,
    /// Always populated, fired or not.
    pub reason: String,
    pub value: Option<f64>,
    pub evidence: Vec<EvidenceRef>,
    /// Inputs used despite being marked low-certainty by the extractor.
    pub low_cert_inputs: Vec<String>,
    pub metadata: SignalMetadata,
}

impl SignalResult {
    /// A not-fired result explaining which precondition was unmet.
    pub fn not_fired(signal_id: SignalId, reason: impl Into<String>) -> Self {
        Self {
            signal_id,
            fired: false,
            severity: Severity::Low,
            reason: reason.into(),
            value: None,
            evidence: Vec::new(),
            low_cert_inputs: Vec::new(),
            metadata: SignalMetadata::default(),
        }
    }

    pub fn fired(signal_id: SignalId, severity: Severity, reason: impl Into<String>) -> Self {
        Self {
            fired: true,
            severity,
            ..Self::not_fired(signal_id, reason)
        }
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_evidence(mut self, evidence: Vec<EvidenceRef>) -> Self {
        self.evidence = evidence;
        self
    }

    pub fn with_metadata(mut self, metadata: SignalMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_low_cert_inputs(mut self, inputs: Vec<String>) -> Self {
        self.low_cert_inputs = inputs;
        self
    }
}
