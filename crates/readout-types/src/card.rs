// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Readout Risk Kernel Input Records
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Study cards and the auxiliary context produced by upstream
//! extraction and registry-ingestion collaborators.
//!
//! Every numeric field extracted from a disclosure is a [`LooseNumber`]:
//! extractors emit numbers as JSON numbers or strings, and a value that
//! does not parse is indistinguishable from an absent one.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A numeric input that may arrive as a number or as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseNumber {
    Number(f64),
    Text(String),
}

impl LooseNumber {
    /// Interpreted value; `None` for unparsable or non-finite input.
    pub fn value(&self) -> Option<f64> {
        let v = match self {
            LooseNumber::Number(v) => *v,
            LooseNumber::Text(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        };
        v.is_finite().then_some(v)
    }

    fn is_percent(&self) -> bool {
        matches!(self, LooseNumber::Text(s) if s.trim_end().ends_with('%'))
    }

    /// Interpreted as a rate in [0, 1]. Text with a trailing `%` is always a
    /// percentage; bare values in (1, 100] are read as percentages too.
    pub fn fraction(&self) -> Option<f64> {
        let v = self.value()?;
        let v = if self.is_percent() || (v > 1.0 && v <= 100.0) {
            v / 100.0
        } else {
            v
        };
        (0.0..=1.0).contains(&v).then_some(v)
    }
}

impl From<f64> for LooseNumber {
    fn from(v: f64) -> Self {
        LooseNumber::Number(v)
    }
}

impl From<&str> for LooseNumber {
    fn from(s: &str) -> Self {
        LooseNumber::Text(s.to_string())
    }
}

/// Resolve an optional loose number to a finite value.
#[inline]
pub fn num(value: &Option<LooseNumber>) -> Option<f64> {
    value.as_ref().and_then(LooseNumber::value)
}

/// Resolve an optional loose number to a rate in [0, 1].
#[inline]
pub fn rate(value: &Option<LooseNumber>) -> Option<f64> {
    value.as_ref().and_then(LooseNumber::fraction)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    Binary,
    Continuous,
    TimeToEvent,
    Other,
}

/// One randomized (or single) arm of the trial.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Arm {
    pub label: String,
    pub is_control: bool,
    pub n: Option<LooseNumber>,
    /// Fraction of enrolled participants lost before the primary analysis.
    pub dropout_rate: Option<LooseNumber>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisPlan {
    pub alpha: Option<LooseNumber>,
    /// `None` is read as two-sided.
    pub two_sided: Option<bool>,
    /// Event rate assumed for the control arm in the sample-size calculation.
    pub assumed_control_rate: Option<LooseNumber>,
    /// Absolute treatment effect assumed in the sample-size calculation.
    pub assumed_effect: Option<LooseNumber>,
    pub planned_interims: Option<u32>,
    /// Name of the alpha-spending function (e.g. "O'Brien-Fleming").
    pub alpha_spending: Option<String>,
}

impl AnalysisPlan {
    pub fn is_two_sided(&self) -> bool {
        self.two_sided.unwrap_or(true)
    }

    pub fn has_alpha_spending(&self) -> bool {
        self.alpha_spending
            .as_deref()
            .map(|s| !s.trim().is_empty() && !s.trim().eq_ignore_ascii_case("none"))
            .unwrap_or(false)
    }
}

/// Result of the primary analysis in one analysis population.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationResult {
    pub p_value: Option<LooseNumber>,
    pub effect: Option<LooseNumber>,
}

impl PopulationResult {
    pub fn is_empty(&self) -> bool {
        num(&self.p_value).is_none() && num(&self.effect).is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimaryResult {
    /// Intention-to-treat population.
    pub itt: Option<PopulationResult>,
    /// Per-protocol population.
    pub pp: Option<PopulationResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubgroupResult {
    pub name: String,
    pub p_value: Option<LooseNumber>,
    /// Explicit significance claim; falls back to `p_value < alpha`.
    pub significant: Option<bool>,
    pub prespecified_interaction: bool,
    pub multiplicity_adjusted: bool,
}

/// Hazard-ratio estimate for a survival endpoint (HR < 1 favours treatment).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurvivalEstimate {
    pub hazard_ratio: Option<LooseNumber>,
    pub p_value: Option<LooseNumber>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurvivalResults {
    /// Overall survival.
    pub os: Option<SurvivalEstimate>,
    /// Progression-free survival.
    pub pfs: Option<SurvivalEstimate>,
}

/// Scalar override flags consumed by the stop rules and by S4.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardFlags {
    pub endpoint_changed_after_lpr: bool,
    pub pp_only_success: bool,
    /// Absolute between-arm difference in dropout rate.
    pub dropout_asymmetry: Option<LooseNumber>,
    pub unblinded_subjective_primary: bool,
    pub blinding_feasible: bool,
}

/// Normalized trial disclosure. Immutable input to the kernel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyCard {
    pub trial_id: String,
    pub is_pivotal: bool,
    pub primary_type: Option<EndpointKind>,
    pub arms: Vec<Arm>,
    pub analysis_plan: Option<AnalysisPlan>,
    pub primary_result: PrimaryResult,
    pub subgroups: Vec<SubgroupResult>,
    pub single_arm: bool,
    pub survival: SurvivalResults,
    pub flags: CardFlags,
    /// Field paths (e.g. `"arms[0].n"`) the extractor marked low-certainty.
    pub low_confidence_fields: BTreeSet<String>,
}

impl StudyCard {
    pub fn itt(&self) -> Option<&PopulationResult> {
        self.primary_result.itt.as_ref()
    }

    pub fn pp(&self) -> Option<&PopulationResult> {
        self.primary_result.pp.as_ref().filter(|pp| !pp.is_empty())
    }

    /// Alpha from the analysis plan, falling back to `default`.
    pub fn alpha_or(&self, default: f64) -> f64 {
        self.analysis_plan
            .as_ref()
            .and_then(|p| num(&p.alpha))
            .filter(|a| *a > 0.0 && *a < 1.0)
            .unwrap_or(default)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangedField {
    PrimaryEndpoint,
    PrimaryCompletionDate,
    SampleSize,
    AnalysisPlan,
    Other,
}

/// A change detected between a registry version and its predecessor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionChange {
    pub field: ChangedField,
    /// Sponsor-stated reason for the change, if any was disclosed.
    #[serde(default)]
    pub rationale: Option<String>,
}

/// One captured snapshot of a registry record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialVersion {
    pub captured_at: DateTime<Utc>,
    #[serde(default)]
    pub primary_endpoint_text: Option<String>,
    #[serde(default)]
    pub est_primary_completion_date: Option<NaiveDate>,
    #[serde(default)]
    pub sample_size: Option<LooseNumber>,
    #[serde(default)]
    pub analysis_plan_text: Option<String>,
    #[serde(default)]
    pub changes: Vec<VersionChange>,
}

/// Historical context for an indication/modality class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassMetadata {
    pub class_id: String,
    /// Class has a historically poor success record.
    pub graveyard: bool,
    /// Percentile (0-100) → effect size among historical winners.
    pub winner_effect_percentiles: BTreeMap<u8, f64>,
}

impl ClassMetadata {
    /// Highest recorded winner-effect percentile and its value.
    pub fn upper_percentile(&self) -> Option<(u8, f64)> {
        self.winner_effect_percentiles
            .iter()
            .rev()
            .find(|(_, v)| v.is_finite())
            .map(|(p, v)| (*p, *v))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialPhase {
    Phase1,
    Phase2,
    Phase3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicationClass {
    Oncology,
    Neurology,
    Cardiovascular,
    InfectiousDisease,
    RareDisease,
    Metabolic,
    Other,
}

impl IndicationClass {
    pub const ALL: [IndicationClass; 7] = [
        IndicationClass::Oncology,
        IndicationClass::Neurology,
        IndicationClass::Cardiovascular,
        IndicationClass::InfectiousDisease,
        IndicationClass::RareDisease,
        IndicationClass::Metabolic,
        IndicationClass::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IndicationClass::Oncology => "oncology",
            IndicationClass::Neurology => "neurology",
            IndicationClass::Cardiovascular => "cardiovascular",
            IndicationClass::InfectiousDisease => "infectious_disease",
            IndicationClass::RareDisease => "rare_disease",
            IndicationClass::Metabolic => "metabolic",
            IndicationClass::Other => "other",
        }
    }
}

impl fmt::Display for IndicationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trial-level facts used to form the prior and the freeze window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialMetadata {
    pub trial_id: String,
    pub is_pivotal: bool,
    pub phase: Option<TrialPhase>,
    pub indication: Option<IndicationClass>,
    /// Number of prior approvals held by the sponsor.
    pub sponsor_prior_approvals: Option<u32>,
    pub est_primary_completion_date: Option<NaiveDate>,
}
