// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Readout Historical Calibration
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Calibration of gate likelihood ratios and prior failure rates from
//! completed trials with known outcomes.
//!
//! Both calibrators degrade to the built-in defaults for sparse buckets,
//! so a fitted table is always complete. Fitted tables travel in a
//! versioned [`CalibrationDocument`]; the engine consumes them as a
//! [`CalibratedConfig`].

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use readout_types::{
    clamp_likelihood_ratio, default_likelihood_ratio, GateId, HistoricalTrial, IndicationClass,
    LrSource, ReadoutError, ReadoutResult, Severity, LR_MAX, LR_MIN,
};

use crate::scorer::{indication_multiplier, PIVOTAL_MULTIPLIER};

/// Schema tag carried by every calibration document.
pub const CALIBRATION_SCHEMA: &str = "readout.calibration";
/// Document layout version this build reads and writes.
pub const CALIBRATION_VERSION: u32 = 1;

/// Overall failure rate assumed when history is too thin to estimate it.
pub const DEFAULT_FAILURE_RATE: f64 = 0.15;

// ── Likelihood ratios ───────────────────────────────────────────────

/// One (gate, severity) bucket of a likelihood-ratio table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LrEntry {
    pub likelihood_ratio: f64,
    /// Failed trials in which the gate fired at this severity.
    pub n_fired_fail: u32,
    /// Successful trials in which the gate fired at this severity.
    pub n_fired_success: u32,
    pub source: LrSource,
}

impl LrEntry {
    pub fn empirical(likelihood_ratio: f64, n_fired_fail: u32, n_fired_success: u32) -> Self {
        Self {
            likelihood_ratio: clamp_likelihood_ratio(likelihood_ratio),
            n_fired_fail,
            n_fired_success,
            source: LrSource::Calibrated,
        }
    }

    pub fn default_for(gate: GateId, severity: Severity) -> Self {
        Self {
            likelihood_ratio: default_likelihood_ratio(gate, severity),
            n_fired_fail: 0,
            n_fired_success: 0,
            source: LrSource::Default,
        }
    }

    pub fn lr_source(&self) -> LrSource {
        self.source
    }
}

/// Likelihood ratio per gate and severity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LikelihoodRatioTable {
    entries: BTreeMap<GateId, BTreeMap<Severity, LrEntry>>,
}

impl LikelihoodRatioTable {
    /// Table holding the built-in default for all twelve buckets.
    pub fn defaults() -> Self {
        let mut table = Self::default();
        for gate in GateId::ALL {
            for severity in Severity::ALL {
                table.insert(gate, severity, LrEntry::default_for(gate, severity));
            }
        }
        table
    }

    pub fn get(&self, gate: GateId, severity: Severity) -> Option<&LrEntry> {
        self.entries.get(&gate).and_then(|row| row.get(&severity))
    }

    pub fn insert(&mut self, gate: GateId, severity: Severity, entry: LrEntry) {
        self.entries.entry(gate).or_default().insert(severity, entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = (GateId, Severity, &LrEntry)> {
        self.entries
            .iter()
            .flat_map(|(g, row)| row.iter().map(move |(s, e)| (*g, *s, e)))
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of buckets backed by historical evidence.
    pub fn calibrated_count(&self) -> usize {
        self.iter()
            .filter(|(_, _, e)| e.source == LrSource::Calibrated)
            .count()
    }

    /// Reject ratios that are non-finite or outside [`LR_MIN`, `LR_MAX`].
    pub fn validate(&self) -> ReadoutResult<()> {
        for (gate, severity, entry) in self.iter() {
            let lr = entry.likelihood_ratio;
            if !lr.is_finite() || !(LR_MIN..=LR_MAX).contains(&lr) {
                return Err(ReadoutError::Calibration(format!(
                    "{gate}/{severity}: likelihood ratio {lr} outside [{LR_MIN}, {LR_MAX}]"
                )));
            }
        }
        Ok(())
    }
}

/// Fits per-(gate, severity) likelihood ratios from labelled history.
///
/// With `a` failed and `b` successful trials firing a bucket out of `N_f`
/// failures and `N_s` successes, the ratio is
/// `((a + 0.5) / (N_f + 1)) / ((b + 0.5) / (N_s + 1))`, clamped.
#[derive(Debug, Clone)]
pub struct LikelihoodRatioCalibrator {
    min_support: u32,
    fitted: Option<LikelihoodRatioTable>,
}

impl Default for LikelihoodRatioCalibrator {
    fn default() -> Self {
        Self::new(5)
    }
}

impl LikelihoodRatioCalibrator {
    pub fn new(min_support: u32) -> Self {
        Self {
            min_support,
            fitted: None,
        }
    }

    pub fn min_support(&self) -> u32 {
        self.min_support
    }

    pub fn fit(&mut self, history: &[HistoricalTrial]) -> &LikelihoodRatioTable {
        let n_fail = history.iter().filter(|t| t.failed).count() as u32;
        let n_success = history.len() as u32 - n_fail;
        let one_sided = n_fail == 0 || n_success == 0;
        if one_sided {
            log::warn!(
                "LR calibration: {n_fail} failures / {n_success} successes, using defaults"
            );
        }

        let mut table = LikelihoodRatioTable::default();
        for gate in GateId::ALL {
            for severity in Severity::ALL {
                let (mut a, mut b) = (0u32, 0u32);
                for trial in history.iter().filter(|t| t.gate_fired_at(gate, severity)) {
                    if trial.failed {
                        a += 1;
                    } else {
                        b += 1;
                    }
                }
                let entry = if one_sided || a + b < self.min_support {
                    if !one_sided {
                        log::warn!(
                            "LR calibration: {gate}/{severity} has support {} < {}, using default",
                            a + b,
                            self.min_support
                        );
                    }
                    LrEntry {
                        n_fired_fail: a,
                        n_fired_success: b,
                        ..LrEntry::default_for(gate, severity)
                    }
                } else {
                    let p_fail = (f64::from(a) + 0.5) / (f64::from(n_fail) + 1.0);
                    let p_success = (f64::from(b) + 0.5) / (f64::from(n_success) + 1.0);
                    LrEntry::empirical(p_fail / p_success, a, b)
                };
                table.insert(gate, severity, entry);
            }
        }

        log::info!(
            "LR calibration fitted on {} trials: {} of {} buckets calibrated",
            history.len(),
            table.calibrated_count(),
            table.len()
        );
        self.fitted.insert(table)
    }

    pub fn table(&self) -> Option<&LikelihoodRatioTable> {
        self.fitted.as_ref()
    }

    pub fn save(&self, path: impl AsRef<Path>, generated_at: DateTime<Utc>) -> ReadoutResult<()> {
        let table = self.fitted.clone().ok_or_else(|| {
            ReadoutError::Calibration("likelihood-ratio calibrator has not been fitted".into())
        })?;
        CalibrationDocument::new(generated_at)
            .with_likelihood_ratios(table)
            .save(path)
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> ReadoutResult<&LikelihoodRatioTable> {
        let table = CalibrationDocument::load(path)?
            .likelihood_ratios
            .ok_or_else(|| {
                ReadoutError::Calibration("document carries no likelihood-ratio table".into())
            })?;
        Ok(&*self.fitted.insert(table))
    }
}

// ── Prior rates ─────────────────────────────────────────────────────

/// A population over which a prior failure rate is estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriorCategory {
    Overall,
    Pivotal,
    NonPivotal,
    Indication(IndicationClass),
}

impl PriorCategory {
    /// Rate used when a category lacks enough history.
    pub fn default_rate(&self) -> f64 {
        match self {
            PriorCategory::Overall | PriorCategory::NonPivotal => DEFAULT_FAILURE_RATE,
            PriorCategory::Pivotal => DEFAULT_FAILURE_RATE * PIVOTAL_MULTIPLIER,
            PriorCategory::Indication(ind) => DEFAULT_FAILURE_RATE * indication_multiplier(*ind),
        }
    }

    fn includes(&self, trial: &HistoricalTrial) -> bool {
        match self {
            PriorCategory::Overall => true,
            PriorCategory::Pivotal => trial.is_pivotal,
            PriorCategory::NonPivotal => !trial.is_pivotal,
            PriorCategory::Indication(ind) => trial.indication == Some(*ind),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorSource {
    Empirical,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorEntry {
    pub rate: f64,
    pub n_trials: u32,
    pub n_failed: u32,
    pub source: PriorSource,
}

impl PriorEntry {
    pub fn is_empirical(&self) -> bool {
        self.source == PriorSource::Empirical
    }
}

/// Failure rates for the overall, pivotal, non-pivotal and per-indication
/// populations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorTable {
    pub overall: PriorEntry,
    pub pivotal: PriorEntry,
    pub non_pivotal: PriorEntry,
    #[serde(default)]
    pub indications: BTreeMap<IndicationClass, PriorEntry>,
}

impl PriorTable {
    pub fn get(&self, category: PriorCategory) -> Option<&PriorEntry> {
        match category {
            PriorCategory::Overall => Some(&self.overall),
            PriorCategory::Pivotal => Some(&self.pivotal),
            PriorCategory::NonPivotal => Some(&self.non_pivotal),
            PriorCategory::Indication(ind) => self.indications.get(&ind),
        }
    }

    /// Rate for `category` only if it was estimated from history.
    pub fn empirical_rate(&self, category: PriorCategory) -> Option<f64> {
        self.get(category)
            .filter(|e| e.is_empirical())
            .map(|e| e.rate)
    }

    /// Reject rates that are non-finite or outside [0, 1].
    pub fn validate(&self) -> ReadoutResult<()> {
        let fixed = [
            ("overall", &self.overall),
            ("pivotal", &self.pivotal),
            ("non_pivotal", &self.non_pivotal),
        ];
        let indications = self.indications.iter().map(|(k, v)| (k.as_str(), v));
        for (category, entry) in fixed.into_iter().chain(indications) {
            if !(0.0..=1.0).contains(&entry.rate) {
                return Err(ReadoutError::Calibration(format!(
                    "prior rate {} for {category} outside [0, 1]",
                    entry.rate
                )));
            }
        }
        Ok(())
    }
}

/// Estimates prior failure rates per population from labelled history.
#[derive(Debug, Clone)]
pub struct PriorRateCalibrator {
    min_trials: u32,
    fitted: Option<PriorTable>,
}

impl Default for PriorRateCalibrator {
    fn default() -> Self {
        Self::new(10)
    }
}

impl PriorRateCalibrator {
    pub fn new(min_trials: u32) -> Self {
        Self {
            min_trials,
            fitted: None,
        }
    }

    pub fn min_trials(&self) -> u32 {
        self.min_trials
    }

    fn estimate(&self, category: PriorCategory, history: &[HistoricalTrial]) -> PriorEntry {
        let (n_trials, n_failed) = history
            .iter()
            .filter(|t| category.includes(t))
            .fold((0u32, 0u32), |(n, f), t| (n + 1, f + u32::from(t.failed)));
        if n_trials < self.min_trials {
            log::warn!(
                "prior calibration: {category:?} has {n_trials} trials < {}, using default",
                self.min_trials
            );
            return PriorEntry {
                rate: category.default_rate(),
                n_trials,
                n_failed,
                source: PriorSource::Default,
            };
        }
        PriorEntry {
            rate: f64::from(n_failed) / f64::from(n_trials),
            n_trials,
            n_failed,
            source: PriorSource::Empirical,
        }
    }

    pub fn fit(&mut self, history: &[HistoricalTrial]) -> &PriorTable {
        let indications = IndicationClass::ALL
            .iter()
            .filter(|ind| history.iter().any(|t| t.indication == Some(**ind)))
            .map(|ind| (*ind, self.estimate(PriorCategory::Indication(*ind), history)))
            .collect();
        let table = PriorTable {
            overall: self.estimate(PriorCategory::Overall, history),
            pivotal: self.estimate(PriorCategory::Pivotal, history),
            non_pivotal: self.estimate(PriorCategory::NonPivotal, history),
            indications,
        };
        log::info!(
            "prior calibration fitted on {} trials (overall rate {:.3})",
            history.len(),
            table.overall.rate
        );
        self.fitted.insert(table)
    }

    pub fn table(&self) -> Option<&PriorTable> {
        self.fitted.as_ref()
    }

    pub fn save(&self, path: impl AsRef<Path>, generated_at: DateTime<Utc>) -> ReadoutResult<()> {
        let table = self.fitted.clone().ok_or_else(|| {
            ReadoutError::Calibration("prior-rate calibrator has not been fitted".into())
        })?;
        CalibrationDocument::new(generated_at)
            .with_prior_rates(table)
            .save(path)
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> ReadoutResult<&PriorTable> {
        let table = CalibrationDocument::load(path)?.prior_rates.ok_or_else(|| {
            ReadoutError::Calibration("document carries no prior-rate table".into())
        })?;
        Ok(&*self.fitted.insert(table))
    }
}

// ── Documents ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct DocumentHeader {
    schema: String,
    version: u32,
}

/// Self-describing, versioned calibration artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationDocument {
    pub schema: String,
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likelihood_ratios: Option<LikelihoodRatioTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_rates: Option<PriorTable>,
}

impl CalibrationDocument {
    pub fn new(generated_at: DateTime<Utc>) -> Self {
        Self {
            schema: CALIBRATION_SCHEMA.to_string(),
            version: CALIBRATION_VERSION,
            generated_at,
            likelihood_ratios: None,
            prior_rates: None,
        }
    }

    pub fn with_likelihood_ratios(mut self, table: LikelihoodRatioTable) -> Self {
        self.likelihood_ratios = Some(table);
        self
    }

    pub fn with_prior_rates(mut self, table: PriorTable) -> Self {
        self.prior_rates = Some(table);
        self
    }

    pub fn to_json(&self) -> ReadoutResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a document, rejecting any schema tag or version other than
    /// the ones this build writes, and any table entry out of range.
    pub fn from_json(json: &str) -> ReadoutResult<Self> {
        let header: DocumentHeader = serde_json::from_str(json)?;
        if header.schema != CALIBRATION_SCHEMA {
            return Err(ReadoutError::UnsupportedSchema {
                found: header.schema,
                expected: CALIBRATION_SCHEMA.to_string(),
            });
        }
        if header.version != CALIBRATION_VERSION {
            return Err(ReadoutError::UnsupportedSchema {
                found: format!("{} v{}", header.schema, header.version),
                expected: format!("{CALIBRATION_SCHEMA} v{CALIBRATION_VERSION}"),
            });
        }
        let doc: Self = serde_json::from_str(json)?;
        if let Some(table) = &doc.likelihood_ratios {
            table.validate()?;
        }
        if let Some(table) = &doc.prior_rates {
            table.validate()?;
        }
        Ok(doc)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> ReadoutResult<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)?;
        log::info!("calibration document written to {}", path.display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> ReadoutResult<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Identifier recorded on scores computed with this calibration.
    pub fn version_tag(&self) -> String {
        format!(
            "{}/v{}@{}",
            self.schema,
            self.version,
            self.generated_at.format("%Y%m%dT%H%M%SZ")
        )
    }
}

/// Calibrated tables as consumed by the scoring engine. The default value
/// carries no calibration and reproduces the built-in behaviour.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibratedConfig {
    pub version: Option<String>,
    pub likelihood_ratios: Option<LikelihoodRatioTable>,
    pub prior_rates: Option<PriorTable>,
}

impl CalibratedConfig {
    pub fn uncalibrated() -> Self {
        Self::default()
    }

    pub fn is_calibrated(&self) -> bool {
        self.likelihood_ratios.is_some() || self.prior_rates.is_some()
    }

    pub fn to_document(&self, generated_at: DateTime<Utc>) -> CalibrationDocument {
        CalibrationDocument {
            likelihood_ratios: self.likelihood_ratios.clone(),
            prior_rates: self.prior_rates.clone(),
            ..CalibrationDocument::new(generated_at)
        }
    }
}

impl From<CalibrationDocument> for CalibratedConfig {
    fn from(doc: CalibrationDocument) -> Self {
        Self {
            version: Some(doc.version_tag()),
            likelihood_ratios: doc.likelihood_ratios,
            prior_rates: doc.prior_rates,
        }
    }
}

/// Fit both calibrators on `history` and bundle the results.
pub fn build_calibrated_config(
    history: &[HistoricalTrial],
    lr_min_support: u32,
    prior_min_trials: u32,
    generated_at: DateTime<Utc>,
) -> CalibratedConfig {
    let mut lr = LikelihoodRatioCalibrator::new(lr_min_support);
    let mut priors = PriorRateCalibrator::new(prior_min_trials);
    let doc = CalibrationDocument::new(generated_at)
        .with_likelihood_ratios(lr.fit(history).clone())
        .with_prior_rates(priors.fit(history).clone());
    CalibratedConfig::from(doc)
}
