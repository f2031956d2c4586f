// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Readout Risk Kernel Configuration
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::error::{ReadoutError, ReadoutResult};

/// Upper bound on every day-count window (about a century).
pub const MAX_WINDOW_DAYS: i64 = 36_500;

/// Thresholds used by the nine signal detectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalThresholds {
    /// S1: an endpoint change this many days (or fewer) before estimated
    /// primary completion counts as late.
    /// Default: 180.
    pub late_change_window_days: i64,

    /// S1: a late change this close to completion is High severity even
    /// when a rationale was recorded.
    /// Default: 90.
    pub late_change_high_days: i64,

    /// S2: approximated power below this fires the detector.
    /// Default: 0.80.
    pub min_power: f64,

    /// Significance level assumed when the analysis plan omits alpha.
    /// Default: 0.05.
    pub default_alpha: f64,

    /// S4: relative ITT/PP effect divergence considered material.
    /// Default: 0.25.
    pub itt_pp_divergence: f64,

    /// S4: minimum between-arm dropout gap considered asymmetric.
    /// Default: 0.10.
    pub dropout_gap_min: f64,

    /// S4: dropout gap at which divergence becomes High severity.
    /// Default: 0.20.
    pub dropout_gap_high: f64,

    /// S5: observed/upper-percentile ratio at which implausibility is High.
    /// Default: 1.5.
    pub graveyard_high_ratio: f64,

    /// S8: width of the band just below alpha treated as the cusp.
    /// Default: 0.01.
    pub cusp_width: f64,

    /// S8: minimum number of significant program p-values before heaping
    /// is assessed.
    /// Default: 5.
    pub heaping_min_count: usize,

    /// S8: fraction of significant program p-values inside the cusp band
    /// that counts as heaping.
    /// Default: 0.40.
    pub heaping_fraction: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            late_change_window_days: 180,
            late_change_high_days: 90,
            min_power: 0.80,
            default_alpha: 0.05,
            itt_pp_divergence: 0.25,
            dropout_gap_min: 0.10,
            dropout_gap_high: 0.20,
            graveyard_high_ratio: 1.5,
            cusp_width: 0.01,
            heaping_min_count: 5,
            heaping_fraction: 0.40,
        }
    }
}

/// Runtime configuration for the Readout scoring engine.
///
/// Supplied by the orchestrating caller. Calibrated likelihood ratios and
/// priors are not part of this struct; they arrive separately as a
/// `CalibratedConfig` and override the built-in default tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Baseline failure probability before trial-specific adjustment.
    /// Default: 0.15.
    pub default_prior: f64,

    /// Lower clamp for the adjusted prior.
    /// Default: 0.01.
    pub prior_min: f64,

    /// Upper clamp for the adjusted prior.
    /// Default: 0.50.
    pub prior_max: f64,

    /// Inputs freeze once scoring runs within this many days of the
    /// estimated primary completion date. At most [`MAX_WINDOW_DAYS`].
    /// Default: 30.
    pub feature_freeze_days: i64,

    /// Stop rule (b): dropout asymmetry strictly above this triggers it.
    /// Default: 0.20.
    pub dropout_asymmetry_threshold: f64,

    /// Stop rule (a) fixed posterior.
    /// Default: 0.97.
    pub lpr_change_posterior: f64,

    /// Stop rule (b) fixed posterior.
    /// Default: 0.97.
    pub pp_only_posterior: f64,

    /// Stop rule (c) fixed posterior.
    /// Default: 0.95.
    pub unblinded_subjective_posterior: f64,

    /// Stop rule (d) fixed posterior, restricted to [0.90, 0.95].
    /// Default: 0.93.
    pub multi_high_gate_posterior: f64,

    /// Whether a randomized comparison is the field standard for the
    /// trials being scored (consumed by S7).
    /// Default: true.
    pub require_randomized: bool,

    /// Detector thresholds.
    pub signals: SignalThresholds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_prior: 0.15,
            prior_min: 0.01,
            prior_max: 0.50,
            feature_freeze_days: 30,
            dropout_asymmetry_threshold: 0.20,
            lpr_change_posterior: 0.97,
            pp_only_posterior: 0.97,
            unblinded_subjective_posterior: 0.95,
            multi_high_gate_posterior: 0.93,
            require_randomized: true,
            signals: SignalThresholds::default(),
        }
    }
}

fn check_open_unit(name: &str, value: f64) -> ReadoutResult<()> {
    if !(value > 0.0 && value < 1.0) {
        return Err(ReadoutError::Config(format!(
            "{name} must be in (0, 1), got {value}"
        )));
    }
    Ok(())
}

impl EngineConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> ReadoutResult<()> {
        check_open_unit("default_prior", self.default_prior)?;
        check_open_unit("prior_min", self.prior_min)?;
        check_open_unit("prior_max", self.prior_max)?;
        if self.prior_min > self.prior_max {
            return Err(ReadoutError::Config(format!(
                "prior_min must be <= prior_max, got {} > {}",
                self.prior_min, self.prior_max
            )));
        }
        if !(self.prior_min..=self.prior_max).contains(&self.default_prior) {
            return Err(ReadoutError::Config(format!(
                "default_prior {} lies outside [{}, {}]",
                self.default_prior, self.prior_min, self.prior_max
            )));
        }
        if !(0..=MAX_WINDOW_DAYS).contains(&self.feature_freeze_days) {
            return Err(ReadoutError::Config(format!(
                "feature_freeze_days must be in [0, {MAX_WINDOW_DAYS}], got {}",
                self.feature_freeze_days
            )));
        }
        check_open_unit("dropout_asymmetry_threshold", self.dropout_asymmetry_threshold)?;
        check_open_unit("lpr_change_posterior", self.lpr_change_posterior)?;
        check_open_unit("pp_only_posterior", self.pp_only_posterior)?;
        check_open_unit(
            "unblinded_subjective_posterior",
            self.unblinded_subjective_posterior,
        )?;
        if !(0.90..=0.95).contains(&self.multi_high_gate_posterior) {
            return Err(ReadoutError::Config(format!(
                "multi_high_gate_posterior must be in [0.90, 0.95], got {}",
                self.multi_high_gate_posterior
            )));
        }
        self.signals.validate()
    }

    /// Load from JSON string. Missing fields take their defaults.
    pub fn from_json(json: &str) -> ReadoutResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ReadoutError::Config(format!("JSON parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}

impl SignalThresholds {
    pub fn validate(&self) -> ReadoutResult<()> {
        for (name, days) in [
            ("late_change_window_days", self.late_change_window_days),
            ("late_change_high_days", self.late_change_high_days),
        ] {
            if !(0..=MAX_WINDOW_DAYS).contains(&days) {
                return Err(ReadoutError::Config(format!(
                    "signals.{name} must be in [0, {MAX_WINDOW_DAYS}], got {days}"
                )));
            }
        }
        if self.late_change_high_days > self.late_change_window_days {
            return Err(ReadoutError::Config(format!(
                "late_change_high_days ({}) must not exceed late_change_window_days ({})",
                self.late_change_high_days, self.late_change_window_days
            )));
        }
        check_open_unit("signals.min_power", self.min_power)?;
        check_open_unit("signals.default_alpha", self.default_alpha)?;
        if self.itt_pp_divergence <= 0.0 {
            return Err(ReadoutError::Config(format!(
                "signals.itt_pp_divergence must be > 0, got {}",
                self.itt_pp_divergence
            )));
        }
        check_open_unit("signals.dropout_gap_min", self.dropout_gap_min)?;
        check_open_unit("signals.dropout_gap_high", self.dropout_gap_high)?;
        if self.graveyard_high_ratio < 1.0 {
            return Err(ReadoutError::Config(format!(
                "signals.graveyard_high_ratio must be >= 1, got {}",
                self.graveyard_high_ratio
            )));
        }
        if !(self.cusp_width > 0.0 && self.cusp_width < self.default_alpha) {
            return Err(ReadoutError::Config(format!(
                "signals.cusp_width must be in (0, default_alpha), got {}",
                self.cusp_width
            )));
        }
        if self.heaping_min_count == 0 {
            return Err(ReadoutError::Config(
                "signals.heaping_min_count must be >= 1".to_string(),
            ));
        }
        check_open_unit("signals.heaping_fraction", self.heaping_fraction)
    }
}
