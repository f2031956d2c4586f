// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Readout Signals S2, S6, S7 (Trial Design)
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────

use readout_types::{
    num, rate, Arm, EvidenceKind, EvidenceRef, Severity, SignalId, SignalMetadata, SignalResult,
    SignalThresholds, StudyCard,
};

use super::low_cert;
use crate::stats::two_proportion_power;

/// Treatment and control arms with their card indices. The first arm
/// flagged as control is the control; otherwise the last arm is.
fn treatment_and_control(arms: &[Arm]) -> Option<((usize, &Arm), (usize, &Arm))> {
    if arms.len() < 2 {
        return None;
    }
    let ctrl_idx = arms
        .iter()
        .position(|a| a.is_control)
        .unwrap_or(arms.len() - 1);
    let trt_idx = (0..arms.len()).find(|i| *i != ctrl_idx)?;
    Some(((trt_idx, &arms[trt_idx]), (ctrl_idx, &arms[ctrl_idx])))
}

/// S2: pivotal trial whose approximated power falls below the
/// acceptable threshold.
pub fn underpowered_pivotal(card: &StudyCard, t: &SignalThresholds) -> SignalResult {
    const ID: SignalId = SignalId::S2;

    if !card.is_pivotal {
        return SignalResult::not_fired(ID, "not pivotal");
    }
    let Some(((ti, trt), (ci, ctrl))) = treatment_and_control(&card.arms) else {
        return SignalResult::not_fired(ID, "missing sample sizes (fewer than two arms)");
    };
    let (Some(n_t), Some(n_c)) = (num(&trt.n), num(&ctrl.n)) else {
        return SignalResult::not_fired(ID, "missing sample sizes");
    };
    if n_t <= 0.0 || n_c <= 0.0 {
        return SignalResult::not_fired(ID, "missing sample sizes (non-positive arm size)");
    }
    let (Some(d_t), Some(d_c)) = (rate(&trt.dropout_rate), rate(&ctrl.dropout_rate)) else {
        return SignalResult::not_fired(ID, "missing dropout rates");
    };
    let Some(plan) = card.analysis_plan.as_ref() else {
        return SignalResult::not_fired(ID, "missing analysis plan");
    };
    let (Some(p_ctrl), Some(effect), Some(alpha)) = (
        rate(&plan.assumed_control_rate),
        num(&plan.assumed_effect),
        num(&plan.alpha),
    ) else {
        return SignalResult::not_fired(
            ID,
            "missing analysis-plan assumptions (control rate, effect, alpha)",
        );
    };

    let eff_t = n_t * (1.0 - d_t);
    let eff_c = n_c * (1.0 - d_c);
    let Some(power) =
        two_proportion_power(p_ctrl, effect, eff_c, eff_t, alpha, plan.is_two_sided())
    else {
        return SignalResult::not_fired(ID, "analysis-plan assumptions out of range");
    };

    let used = vec![
        format!("arms[{ti}].n"),
        format!("arms[{ci}].n"),
        format!("arms[{ti}].dropout_rate"),
        format!("arms[{ci}].dropout_rate"),
        "analysis_plan.assumed_control_rate".to_string(),
        "analysis_plan.assumed_effect".to_string(),
        "analysis_plan.alpha".to_string(),
    ];
    let evidence = vec![
        EvidenceRef::new(EvidenceKind::Arm, format!("arms[{ti}]")),
        EvidenceRef::new(EvidenceKind::Arm, format!("arms[{ci}]")),
        EvidenceRef::new(EvidenceKind::AnalysisPlan, "analysis_plan"),
    ];
    let metadata = SignalMetadata {
        threshold: Some(t.min_power),
        effective_n: Some((eff_t, eff_c)),
        ..Default::default()
    };

    let result = if power < t.min_power {
        let severity = if power < 0.50 {
            Severity::High
        } else if power < 0.70 {
            Severity::Medium
        } else {
            Severity::Low
        };
        SignalResult::fired(
            ID,
            severity,
            format!(
                "approximate power {power:.3} below {:.2} (effective n {eff_t:.0} vs {eff_c:.0})",
                t.min_power
            ),
        )
    } else {
        SignalResult::not_fired(
            ID,
            format!("approximate power {power:.3} meets {:.2}", t.min_power),
        )
    };

    result
        .with_value(power)
        .with_evidence(evidence)
        .with_low_cert_inputs(low_cert(card, &used))
        .with_metadata(metadata)
}

/// S6: more than one interim analysis without a declared
/// alpha-spending function.
pub fn interim_looks_without_spending(card: &StudyCard) -> SignalResult {
    const ID: SignalId = SignalId::S6;

    let Some(plan) = card.analysis_plan.as_ref() else {
        return SignalResult::not_fired(ID, "missing analysis plan");
    };
    let Some(looks) = plan.planned_interims else {
        return SignalResult::not_fired(ID, "planned interim count not disclosed");
    };
    let evidence = vec![EvidenceRef::new(EvidenceKind::AnalysisPlan, "analysis_plan")];
    if looks <= 1 {
        return SignalResult::not_fired(ID, format!("{looks} interim analysis planned"))
            .with_value(f64::from(looks))
            .with_evidence(evidence);
    }
    if plan.has_alpha_spending() {
        return SignalResult::not_fired(
            ID,
            format!(
                "{looks} interim analyses controlled by {}",
                plan.alpha_spending.as_deref().unwrap_or_default().trim()
            ),
        )
        .with_value(f64::from(looks))
        .with_evidence(evidence);
    }

    let severity = if looks >= 3 {
        Severity::High
    } else {
        Severity::Medium
    };
    SignalResult::fired(
        ID,
        severity,
        format!("{looks} interim analyses planned with no alpha-spending function"),
    )
    .with_value(f64::from(looks))
    .with_evidence(evidence)
}

/// S7: pivotal single-arm design where a randomized comparison is the
/// field standard.
pub fn single_arm_where_randomized(card: &StudyCard, randomized_standard: bool) -> SignalResult {
    const ID: SignalId = SignalId::S7;

    if !card.is_pivotal {
        return SignalResult::not_fired(ID, "not pivotal");
    }
    if !card.single_arm {
        return SignalResult::not_fired(ID, "randomized or multi-arm design");
    }
    if !randomized_standard {
        return SignalResult::not_fired(
            ID,
            "single-arm design, but randomized comparison is not standard for this context",
        );
    }
    SignalResult::fired(
        ID,
        Severity::High,
        "pivotal single-arm design where a randomized comparison is standard",
    )
    .with_evidence(vec![EvidenceRef::new(EvidenceKind::CardFlag, "single_arm")])
}

#[cfg(test)]
mod tests {
    use readout_types::{AnalysisPlan, LooseNumber};

    use super::*;
    use crate::signals::fixtures::{arm, underpowered_card};

    #[test]
    fn test_s2_fires_on_small_pivotal() {
        let r = underpowered_pivotal(&underpowered_card(), &SignalThresholds::default());
        assert!(r.fired, "{}", r.reason);
        assert_eq!(r.severity, Severity::High);
        let power = r.value.unwrap();
        assert!((power - 0.2926).abs() < 0.005, "power = {power}");
        assert_eq!(r.metadata.effective_n, Some((90.0, 90.0)));
    }

    #[test]
    fn test_s2_well_powered() {
        let mut card = underpowered_card();
        card.arms = vec![arm("drug", false, 500.0, 0.05), arm("placebo", true, 500.0, 0.05)];
        let r = underpowered_pivotal(&card, &SignalThresholds::default());
        assert!(!r.fired);
        assert!(r.value.unwrap() > 0.85);
    }

    #[test]
    fn test_s2_not_pivotal() {
        let mut card = underpowered_card();
        card.is_pivotal = false;
        let r = underpowered_pivotal(&card, &SignalThresholds::default());
        assert!(!r.fired);
        assert_eq!(r.reason, "not pivotal");
    }

    #[test]
    fn test_s2_unparsable_sample_size_is_missing() {
        let mut card = underpowered_card();
        card.arms[0].n = Some(LooseNumber::from("about 100"));
        let r = underpowered_pivotal(&card, &SignalThresholds::default());
        assert!(!r.fired);
        assert!(r.reason.contains("missing sample sizes"));
    }

    #[test]
    fn test_s2_missing_dropout() {
        let mut card = underpowered_card();
        card.arms[1].dropout_rate = None;
        let r = underpowered_pivotal(&card, &SignalThresholds::default());
        assert!(!r.fired);
        assert!(r.reason.contains("dropout"));
    }

    #[test]
    fn test_s2_reports_low_cert_inputs() {
        let mut card = underpowered_card();
        card.low_confidence_fields.insert("arms[1].n".into());
        card.low_confidence_fields.insert("primary_result.itt.effect".into());
        let r = underpowered_pivotal(&card, &SignalThresholds::default());
        assert_eq!(r.low_cert_inputs, vec!["arms[1].n".to_string()]);
    }

    #[test]
    fn test_s2_string_numbers_accepted() {
        let mut card = underpowered_card();
        card.arms[0].n = Some(LooseNumber::from("100"));
        card.arms[0].dropout_rate = Some(LooseNumber::from("10%"));
        let r = underpowered_pivotal(&card, &SignalThresholds::default());
        assert!(r.fired);
    }

    #[test]
    fn test_s2_small_percent_dropout() {
        let mut card = underpowered_card();
        card.arms = vec![arm("drug", false, 500.0, 0.0), arm("placebo", true, 500.0, 0.0)];
        card.arms[0].dropout_rate = Some(LooseNumber::from("1%"));
        card.arms[1].dropout_rate = Some(LooseNumber::from("0.5%"));
        let r = underpowered_pivotal(&card, &SignalThresholds::default());
        assert!(!r.fired, "{}", r.reason);
        let (eff_t, eff_c) = r.metadata.effective_n.unwrap();
        assert!((eff_t - 495.0).abs() < 1e-9, "eff_t = {eff_t}");
        assert!((eff_c - 497.5).abs() < 1e-9, "eff_c = {eff_c}");

        let mut numeric = card.clone();
        numeric.arms[0].dropout_rate = Some(LooseNumber::Number(0.01));
        numeric.arms[1].dropout_rate = Some(LooseNumber::Number(0.005));
        let same = underpowered_pivotal(&numeric, &SignalThresholds::default());
        assert_eq!(r.value, same.value);
    }

    fn plan(looks: u32, spending: Option<&str>) -> StudyCard {
        StudyCard {
            analysis_plan: Some(AnalysisPlan {
                planned_interims: Some(looks),
                alpha_spending: spending.map(String::from),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_s6_fires_without_spending() {
        let r = interim_looks_without_spending(&plan(2, None));
        assert!(r.fired);
        assert_eq!(r.severity, Severity::Medium);
        let r = interim_looks_without_spending(&plan(4, None));
        assert_eq!(r.severity, Severity::High);
    }

    #[test]
    fn test_s6_single_interim_ok() {
        assert!(!interim_looks_without_spending(&plan(1, None)).fired);
    }

    #[test]
    fn test_s6_spending_declared() {
        let r = interim_looks_without_spending(&plan(3, Some("O'Brien-Fleming")));
        assert!(!r.fired);
        assert!(r.reason.contains("O'Brien-Fleming"));
    }

    #[test]
    fn test_s7_requires_standard_flag() {
        let card = StudyCard {
            is_pivotal: true,
            single_arm: true,
            ..Default::default()
        };
        assert!(single_arm_where_randomized(&card, true).fired);
        assert!(!single_arm_where_randomized(&card, false).fired);
    }

    #[test]
    fn test_s7_not_pivotal() {
        let card = StudyCard {
            single_arm: true,
            ..Default::default()
        };
        let r = single_arm_where_randomized(&card, true);
        assert!(!r.fired);
        assert_eq!(r.reason, "not pivotal");
    }
}
