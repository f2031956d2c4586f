// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Readout Signals S3, S4, S8, S9 (Reported Analyses)
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────

use readout_types::{
    num, rate, EvidenceKind, EvidenceRef, Severity, SignalId, SignalMetadata, SignalResult,
    SignalThresholds, StudyCard, SurvivalEstimate,
};

use super::low_cert;

/// S3: ITT not significant, yet a subgroup is claimed significant
/// without pre-specified interaction testing or multiplicity control.
pub fn subgroup_only_win(card: &StudyCard, t: &SignalThresholds) -> SignalResult {
    const ID: SignalId = SignalId::S3;

    let alpha = card.alpha_or(t.default_alpha);
    let Some(itt_p) = card.itt().and_then(|r| num(&r.p_value)) else {
        return SignalResult::not_fired(ID, "missing ITT p-value");
    };
    if itt_p < alpha {
        return SignalResult::not_fired(
            ID,
            format!("ITT analysis significant (p={itt_p:.4} < {alpha})"),
        )
        .with_value(itt_p);
    }
    if card.subgroups.is_empty() {
        return SignalResult::not_fired(ID, "no subgroup results reported").with_value(itt_p);
    }

    let mut significant = 0usize;
    let mut offending = Vec::new();
    let mut evidence = vec![EvidenceRef::new(EvidenceKind::PrimaryResult, "primary_result.itt")];
    let mut used = vec!["primary_result.itt.p_value".to_string()];
    for (i, sg) in card.subgroups.iter().enumerate() {
        let is_sig = sg
            .significant
            .unwrap_or_else(|| num(&sg.p_value).is_some_and(|p| p < alpha));
        if !is_sig {
            continue;
        }
        significant += 1;
        if sg.prespecified_interaction || sg.multiplicity_adjusted {
            continue;
        }
        let label = if sg.name.is_empty() {
            format!("subgroups[{i}]")
        } else {
            sg.name.clone()
        };
        offending.push(label);
        evidence.push(EvidenceRef::new(EvidenceKind::Subgroup, format!("subgroups[{i}]")));
        used.push(format!("subgroups[{i}].p_value"));
    }

    if significant == 0 {
        return SignalResult::not_fired(ID, "no significant subgroup reported").with_value(itt_p);
    }
    if offending.is_empty() {
        return SignalResult::not_fired(
            ID,
            "significant subgroups were pre-specified or multiplicity-adjusted",
        )
        .with_value(itt_p);
    }

    let severity = if offending.len() >= 2 {
        Severity::High
    } else {
        Severity::Medium
    };
    let reason = format!(
        "ITT not significant (p={itt_p:.4}) but uncontrolled subgroup win in {}",
        offending.join(", ")
    );
    SignalResult::fired(ID, severity, reason)
        .with_value(itt_p)
        .with_evidence(evidence)
        .with_low_cert_inputs(low_cert(card, &used))
        .with_metadata(SignalMetadata {
            threshold: Some(alpha),
            offending_subgroups: offending,
            ..Default::default()
        })
}

/// Largest spread in reported per-arm dropout, if at least two arms report one.
fn arm_dropout_spread(card: &StudyCard) -> Option<f64> {
    let rates: Vec<f64> = card.arms.iter().filter_map(|a| rate(&a.dropout_rate)).collect();
    if rates.len() < 2 {
        return None;
    }
    let max = rates.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = rates.iter().copied().fold(f64::INFINITY, f64::min);
    Some(max - min)
}

/// S4: ITT and per-protocol estimates diverge materially while the arms
/// show asymmetric dropout.
pub fn itt_pp_divergence(card: &StudyCard, t: &SignalThresholds) -> SignalResult {
    const ID: SignalId = SignalId::S4;

    let Some(pp) = card.pp() else {
        return SignalResult::not_fired(ID, "no per-protocol population set");
    };
    let Some(itt) = card.itt() else {
        return SignalResult::not_fired(ID, "missing ITT result");
    };
    let (Some(itt_eff), Some(pp_eff)) = (num(&itt.effect), num(&pp.effect)) else {
        return SignalResult::not_fired(ID, "missing ITT or per-protocol effect estimate");
    };

    let alpha = card.alpha_or(t.default_alpha);
    let denom = itt_eff.abs().max(pp_eff.abs());
    let divergence = if denom > 0.0 {
        (pp_eff - itt_eff).abs() / denom
    } else {
        0.0
    };
    let flip = match (num(&itt.p_value), num(&pp.p_value)) {
        (Some(a), Some(b)) => (a < alpha) != (b < alpha),
        _ => false,
    };
    let evidence = vec![
        EvidenceRef::new(EvidenceKind::PrimaryResult, "primary_result.itt"),
        EvidenceRef::new(EvidenceKind::PrimaryResult, "primary_result.pp"),
    ];

    if divergence < t.itt_pp_divergence && !flip {
        return SignalResult::not_fired(
            ID,
            format!("ITT and per-protocol estimates consistent (divergence {divergence:.3})"),
        )
        .with_value(divergence)
        .with_evidence(evidence);
    }

    let gap = match (arm_dropout_spread(card), rate(&card.flags.dropout_asymmetry)) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    };
    let Some(gap) = gap else {
        return SignalResult::not_fired(
            ID,
            "ITT and per-protocol estimates diverge but dropout asymmetry is unknown",
        )
        .with_value(divergence)
        .with_evidence(evidence);
    };
    let metadata = SignalMetadata {
        threshold: Some(t.itt_pp_divergence),
        divergence: Some(divergence),
        dropout_gap: Some(gap),
        ..Default::default()
    };
    if gap < t.dropout_gap_min {
        return SignalResult::not_fired(
            ID,
            format!(
                "ITT and per-protocol estimates diverge but dropout is symmetric (gap {gap:.3})"
            ),
        )
        .with_value(divergence)
        .with_evidence(evidence)
        .with_metadata(metadata);
    }

    let severity = if gap >= t.dropout_gap_high {
        Severity::High
    } else {
        Severity::Medium
    };
    let used: Vec<String> = [
        "primary_result.itt.effect",
        "primary_result.pp.effect",
        "flags.dropout_asymmetry",
    ]
    .iter()
    .map(|s| s.to_string())
    .chain((0..card.arms.len()).map(|i| format!("arms[{i}].dropout_rate")))
    .collect();
    let flips = if flip { ", significance flips" } else { "" };
    let reason = format!(
        "ITT effect {itt_eff:.3} vs per-protocol {pp_eff:.3} (divergence {divergence:.3}{flips}) \
         with dropout gap {gap:.3}"
    );
    SignalResult::fired(ID, severity, reason)
        .with_value(divergence)
        .with_evidence(evidence)
        .with_low_cert_inputs(low_cert(card, &used))
        .with_metadata(metadata)
}

/// S8: primary p-value just below the significance threshold, or the
/// sponsor's program history heaping in that band.
pub fn p_value_cusp(
    card: &StudyCard,
    program_p_values: &[f64],
    t: &SignalThresholds,
) -> SignalResult {
    const ID: SignalId = SignalId::S8;

    let alpha = card.alpha_or(t.default_alpha);
    let lo = (alpha - t.cusp_width).max(0.0);
    let in_band = |p: f64| p >= lo && p < alpha;

    let primary_p = card.itt().and_then(|r| num(&r.p_value));
    let significant: Vec<f64> = program_p_values
        .iter()
        .copied()
        .filter(|p| p.is_finite() && *p >= 0.0 && *p < alpha)
        .collect();
    let program_fraction = (significant.len() >= t.heaping_min_count).then(|| {
        significant.iter().filter(|p| in_band(**p)).count() as f64 / significant.len() as f64
    });

    if primary_p.is_none() && program_fraction.is_none() {
        return SignalResult::not_fired(
            ID,
            "missing primary p-value and insufficient program p-value history",
        );
    }

    let cusp = primary_p.is_some_and(in_band);
    let heaping = program_fraction.is_some_and(|f| f >= t.heaping_fraction);
    let mut evidence = Vec::new();
    if primary_p.is_some() {
        evidence.push(EvidenceRef::new(EvidenceKind::PrimaryResult, "primary_result.itt"));
    }
    if program_fraction.is_some() {
        evidence.push(EvidenceRef::new(EvidenceKind::ProgramHistory, "program_p_values"));
    }
    let metadata = SignalMetadata {
        threshold: Some(alpha),
        cusp_band: Some((lo, alpha)),
        program_cusp_fraction: program_fraction,
        ..Default::default()
    };
    let describe_p = primary_p.map_or_else(|| "n/a".to_string(), |p| format!("{p:.4}"));

    let result = match (cusp, heaping) {
        (false, false) => SignalResult::not_fired(
            ID,
            format!(
                "primary p={describe_p} outside cusp band [{lo:.3}, {alpha}) and no program heaping"
            ),
        ),
        (true, true) => SignalResult::fired(
            ID,
            Severity::High,
            format!("primary p={describe_p} in cusp band and program p-values heap below {alpha}"),
        ),
        (true, false) => SignalResult::fired(
            ID,
            Severity::Medium,
            format!("primary p={describe_p} in cusp band [{lo:.3}, {alpha})"),
        ),
        (false, true) => SignalResult::fired(
            ID,
            Severity::Medium,
            format!(
                "program p-values heap in cusp band ({:.0}% of significant results)",
                program_fraction.unwrap_or_default() * 100.0
            ),
        ),
    };
    let result = match primary_p {
        Some(p) => result.with_value(p),
        None => result,
    };
    result
        .with_evidence(evidence)
        .with_low_cert_inputs(low_cert(card, &["primary_result.itt.p_value".to_string()]))
        .with_metadata(metadata)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Benefit,
    Harm,
    Neutral,
}

fn direction(hazard_ratio: f64) -> Direction {
    if hazard_ratio < 1.0 {
        Direction::Benefit
    } else if hazard_ratio > 1.0 {
        Direction::Harm
    } else {
        Direction::Neutral
    }
}

/// S9: overall survival and progression-free survival point in
/// opposite clinical directions.
pub fn os_pfs_contradiction(card: &StudyCard) -> SignalResult {
    const ID: SignalId = SignalId::S9;

    let hr = |e: &Option<SurvivalEstimate>| {
        e.as_ref()
            .and_then(|e| num(&e.hazard_ratio))
            .filter(|h| *h > 0.0)
    };
    let (Some(os), Some(pfs)) = (hr(&card.survival.os), hr(&card.survival.pfs)) else {
        return SignalResult::not_fired(ID, "missing OS or PFS hazard ratio");
    };
    let evidence = vec![
        EvidenceRef::new(EvidenceKind::Survival, "survival.os"),
        EvidenceRef::new(EvidenceKind::Survival, "survival.pfs"),
    ];
    let used = vec![
        "survival.os.hazard_ratio".to_string(),
        "survival.pfs.hazard_ratio".to_string(),
    ];

    let result = match (direction(os), direction(pfs)) {
        (Direction::Harm, Direction::Benefit) => SignalResult::fired(
            ID,
            Severity::High,
            format!("PFS favours treatment (HR {pfs:.2}) while OS indicates harm (HR {os:.2})"),
        ),
        (Direction::Benefit, Direction::Harm) => SignalResult::fired(
            ID,
            Severity::Medium,
            format!("OS favours treatment (HR {os:.2}) while PFS indicates harm (HR {pfs:.2})"),
        ),
        _ => SignalResult::not_fired(
            ID,
            format!("OS (HR {os:.2}) and PFS (HR {pfs:.2}) directionally consistent"),
        ),
    };
    result
        .with_value(os)
        .with_evidence(evidence)
        .with_low_cert_inputs(low_cert(card, &used))
}
