// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Readout Signal S5 (Class Plausibility)
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────

use readout_types::{
    num, ClassMetadata, EvidenceKind, EvidenceRef, Severity, SignalId, SignalMetadata,
    SignalResult, SignalThresholds, StudyCard,
};

use super::low_cert;

/// S5: observed effect exceeds what historical winners in a
/// poor-performing ("graveyard") class ever achieved.
pub fn graveyard_implausibility(
    card: &StudyCard,
    class: Option<&ClassMetadata>,
    t: &SignalThresholds,
) -> SignalResult {
    const ID: SignalId = SignalId::S5;

    let Some(class) = class else {
        return SignalResult::not_fired(ID, "no class metadata supplied");
    };
    if !class.graveyard {
        return SignalResult::not_fired(
            ID,
            format!("class {} not flagged as graveyard", class.class_id),
        );
    }
    let Some((pct, upper)) = class.upper_percentile() else {
        return SignalResult::not_fired(
            ID,
            format!("no winner effect percentiles for class {}", class.class_id),
        );
    };
    let Some(effect) = card.itt().and_then(|r| num(&r.effect)) else {
        return SignalResult::not_fired(ID, "missing ITT effect estimate");
    };

    let observed = effect.abs();
    let upper = upper.abs();
    let evidence = vec![
        EvidenceRef::new(EvidenceKind::PrimaryResult, "primary_result.itt"),
        EvidenceRef::new(EvidenceKind::ClassMetadata, class.class_id.clone()),
    ];
    let metadata = SignalMetadata {
        threshold: Some(upper),
        class_upper_percentile: Some(pct),
        ..Default::default()
    };

    if observed <= upper {
        return SignalResult::not_fired(
            ID,
            format!("effect {observed:.3} within p{pct} of class winners ({upper:.3})"),
        )
        .with_value(observed)
        .with_evidence(evidence)
        .with_metadata(metadata);
    }

    let ratio = if upper > 0.0 { observed / upper } else { f64::INFINITY };
    let severity = if ratio >= t.graveyard_high_ratio {
        Severity::High
    } else {
        Severity::Medium
    };
    SignalResult::fired(
        ID,
        severity,
        format!(
            "effect {observed:.3} exceeds p{pct} of winners ({upper:.3}) in graveyard class {}",
            class.class_id
        ),
    )
    .with_value(observed)
    .with_evidence(evidence)
    .with_low_cert_inputs(low_cert(card, &["primary_result.itt.effect".to_string()]))
    .with_metadata(metadata)
}
