// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Readout Signal S1 (Registry Timeline)
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────

use readout_types::{
    ChangedField, EvidenceKind, EvidenceRef, Severity, SignalId, SignalMetadata, SignalResult,
    SignalThresholds, TrialVersion,
};

fn normalize_endpoint(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn has_rationale(version: &TrialVersion) -> bool {
    version.changes.iter().any(|c| {
        c.field == ChangedField::PrimaryEndpoint
            && c.rationale.as_deref().is_some_and(|r| !r.trim().is_empty())
    })
}

/// S1: primary endpoint text changed between the two most recent
/// registry versions, close to estimated primary completion.
pub fn endpoint_changed_late(versions: &[TrialVersion], t: &SignalThresholds) -> SignalResult {
    const ID: SignalId = SignalId::S1;

    if versions.len() < 2 {
        return SignalResult::not_fired(
            ID,
            format!("fewer than two trial versions ({} supplied)", versions.len()),
        );
    }
    let latest_idx = versions.len() - 1;
    let previous_idx = latest_idx - 1;
    let latest = &versions[latest_idx];
    let previous = &versions[previous_idx];

    let (Some(before), Some(after)) = (
        previous.primary_endpoint_text.as_deref(),
        latest.primary_endpoint_text.as_deref(),
    ) else {
        return SignalResult::not_fired(ID, "missing primary endpoint text in recent versions");
    };
    if normalize_endpoint(before) == normalize_endpoint(after) {
        return SignalResult::not_fired(
            ID,
            "primary endpoint unchanged across the two most recent versions",
        );
    }

    let evidence = vec![
        EvidenceRef::new(EvidenceKind::TrialVersion, format!("versions[{previous_idx}]")),
        EvidenceRef::new(EvidenceKind::TrialVersion, format!("versions[{latest_idx}]")),
    ];

    let Some(completion) = latest
        .est_primary_completion_date
        .or(previous.est_primary_completion_date)
    else {
        return SignalResult::not_fired(
            ID,
            "primary endpoint changed but estimated primary completion date is unknown",
        )
        .with_evidence(evidence);
    };

    let days = (completion - latest.captured_at.date_naive()).num_days();
    let metadata = SignalMetadata {
        threshold: Some(t.late_change_window_days as f64),
        days_before_completion: Some(days),
        ..Default::default()
    };

    if days > t.late_change_window_days {
        return SignalResult::not_fired(
            ID,
            format!(
                "primary endpoint changed {days} days before primary completion, \
                 outside the {}-day late window",
                t.late_change_window_days
            ),
        )
        .with_value(days as f64)
        .with_evidence(evidence)
        .with_metadata(metadata);
    }

    let explained = has_rationale(latest);
    let severity = if days <= t.late_change_high_days || !explained {
        Severity::High
    } else {
        Severity::Medium
    };
    let timing = if days < 0 {
        format!("{} days after estimated primary completion", -days)
    } else {
        format!("{days} days before estimated primary completion")
    };
    let reason = format!(
        "primary endpoint changed {timing}{}",
        if explained { "" } else { " without a stated rationale" }
    );

    SignalResult::fired(ID, severity, reason)
        .with_value(days as f64)
        .with_evidence(evidence)
        .with_metadata(metadata)
}
