// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Readout Risk Kernel Pipeline Tests
// ─────────────────────────────────────────────────────────────────────
//! End-to-end properties of signals → gates → score → calibration.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use readout_core::{
    build_calibrated_config, evaluate_gates, summarize, LikelihoodRatioCalibrator,
    PriorRateCalibrator, ScoringEngine, TrialInput,
};
use readout_types::{
    AnalysisPlan, Arm, CardFlags, EngineConfig, FiredGate, GateId, HistoricalTrial,
    IndicationClass, LooseNumber, LrSource, PopulationResult, PrimaryResult, Severity, SignalId,
    SignalResult, StopRule, StudyCard, TrialMetadata, TrialVersion, LOGIT_BOUND, LR_MAX, LR_MIN,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 15, 10, 0, 0).unwrap()
}

fn completion() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2025, 6, 30)
}

fn arm(label: &str, control: bool, n: f64) -> Arm {
    Arm {
        label: label.into(),
        is_control: control,
        n: Some(LooseNumber::Number(n)),
        dropout_rate: Some(LooseNumber::Number(0.10)),
    }
}

fn version(captured: DateTime<Utc>, endpoint: &str) -> TrialVersion {
    TrialVersion {
        captured_at: captured,
        primary_endpoint_text: Some(endpoint.into()),
        est_primary_completion_date: completion(),
        sample_size: None,
        analysis_plan_text: None,
        changes: Vec::new(),
    }
}

/// Pivotal trial with a late endpoint switch and too few patients.
fn g1_trial() -> TrialInput {
    TrialInput {
        card: StudyCard {
            trial_id: "NCT04000001".into(),
            is_pivotal: true,
            arms: vec![arm("active", false, 100.0), arm("placebo", true, 100.0)],
            analysis_plan: Some(AnalysisPlan {
                alpha: Some(LooseNumber::Number(0.05)),
                two_sided: Some(true),
                assumed_control_rate: Some(LooseNumber::Number(0.30)),
                assumed_effect: Some(LooseNumber::Number(0.10)),
                ..Default::default()
            }),
            primary_result: PrimaryResult {
                itt: Some(PopulationResult {
                    p_value: Some(LooseNumber::Number(0.20)),
                    effect: Some(LooseNumber::Number(0.08)),
                }),
                pp: None,
            },
            ..Default::default()
        },
        versions: vec![
            version(
                Utc.with_ymd_and_hms(2023, 2, 1, 0, 0, 0).unwrap(),
                "Overall survival at 24 months",
            ),
            version(
                Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap(),
                "Progression-free survival",
            ),
        ],
        metadata: TrialMetadata {
            trial_id: "NCT04000001".into(),
            is_pivotal: true,
            est_primary_completion_date: completion(),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn signal(signals: &[SignalResult], id: SignalId) -> &SignalResult {
    signals.iter().find(|s| s.signal_id == id).unwrap()
}

#[test]
fn g1_fires_on_late_switch_in_underpowered_pivotal() {
    let engine = ScoringEngine::new(EngineConfig::default()).unwrap();
    let eval = engine.evaluate_at(&g1_trial(), "run-1", now());

    let s1 = signal(&eval.signals, SignalId::S1);
    let s2 = signal(&eval.signals, SignalId::S2);
    assert!(s1.fired && s2.fired);

    let g1 = &eval.gates[0];
    assert_eq!(g1.gate_id, GateId::G1);
    assert!(g1.fired);
    assert_eq!(g1.severity, s1.severity.max(s2.severity));
    assert_eq!(g1.metadata.lr_source, Some(LrSource::Default));

    assert!(eval.score.p_fail > eval.score.prior_pi);
    assert_eq!(eval.score.metadata.fired_gates, vec![GateId::G1]);
    assert!(eval.score.features_frozen_at.is_none());
}

#[test]
fn g1_quiet_without_endpoint_change() {
    let mut input = g1_trial();
    input.versions[1].primary_endpoint_text = input.versions[0].primary_endpoint_text.clone();
    let engine = ScoringEngine::new(EngineConfig::default()).unwrap();
    let eval = engine.evaluate_at(&input, "run-1", now());
    assert!(!eval.gates[0].fired);
}

#[test]
fn missing_signal_never_fires_gate() {
    let engine = ScoringEngine::new(EngineConfig::default()).unwrap();
    let eval = engine.evaluate_at(&g1_trial(), "run-1", now());
    let partial: Vec<SignalResult> = eval
        .signals
        .into_iter()
        .filter(|s| s.signal_id != SignalId::S2)
        .collect();
    let g1 = &evaluate_gates(&partial, None)[0];
    assert!(!g1.fired);
    assert!(g1.rationale.contains("missing signal"));
}

#[test]
fn no_gates_leaves_prior_exact() {
    let engine = ScoringEngine::new(EngineConfig::default()).unwrap();
    let meta = TrialMetadata {
        trial_id: "NCT1".into(),
        ..Default::default()
    };
    let r = engine.score_at(&meta, &CardFlags::default(), &[], "r", now());
    assert_eq!(r.prior_pi, 0.15);
    assert_eq!(r.p_fail, 0.15);
}

#[test]
fn fired_gate_strictly_raises_posterior() {
    let engine = ScoringEngine::new(EngineConfig::default()).unwrap();
    let signals = vec![
        SignalResult::fired(SignalId::S5, Severity::Low, "effect above class winners"),
        SignalResult::not_fired(SignalId::S6, "no interims"),
    ];
    let gates = evaluate_gates(&signals, None);
    let meta = TrialMetadata::default();
    let r = engine.score_at(&meta, &CardFlags::default(), &gates, "r", now());
    assert_eq!(r.prior_pi, 0.15);
    assert!(r.p_fail > 0.15);
}

#[test]
fn higher_priority_stop_rule_wins() {
    let mut input = g1_trial();
    input.card.flags = CardFlags {
        endpoint_changed_after_lpr: true,
        unblinded_subjective_primary: true,
        blinding_feasible: true,
        ..Default::default()
    };
    let engine = ScoringEngine::new(EngineConfig::default()).unwrap();
    let eval = engine.evaluate_at(&input, "run-1", now());
    assert!(eval.score.metadata.stop_rule_applied);
    assert_eq!(
        eval.score.metadata.stop_rule_type,
        Some(StopRule::EndpointChangedAfterLpr)
    );
    assert_eq!(eval.score.p_fail, 0.97);
    assert_eq!(eval.score.sum_log_lr, 0.0);
}

#[test]
fn rescoring_is_bit_identical() {
    let engine = ScoringEngine::new(EngineConfig::default()).unwrap();
    let a = engine.evaluate_at(&g1_trial(), "run-1", now());
    let b = engine.evaluate_at(&g1_trial(), "run-1", now());
    assert_eq!(a, b);
    assert_eq!(a.score.logit_post.to_bits(), b.score.logit_post.to_bits());
}

#[test]
fn outputs_respect_persistence_bounds() {
    let engine = ScoringEngine::new(EngineConfig::default()).unwrap();
    let inputs: Vec<TrialInput> = (0..50)
        .map(|i| {
            let mut t = g1_trial();
            t.card.arms[0].n = Some(LooseNumber::Number(20.0 + 10.0 * f64::from(i)));
            t.metadata.trial_id = format!("NCT{i}");
            t
        })
        .collect();
    for eval in engine.evaluate_batch_at(&inputs, "bounds", now()) {
        for g in eval.gates.iter().filter(|g| g.fired) {
            let lr = g.likelihood_ratio.unwrap();
            assert!((LR_MIN..=LR_MAX).contains(&lr));
        }
        let s = &eval.score;
        assert!((0.0..=1.0).contains(&s.p_fail));
        assert!((0.0..=1.0).contains(&s.prior_pi));
        assert!(s.logit_post.abs() <= LOGIT_BOUND);
        assert!(s.logit_prior.abs() <= LOGIT_BOUND);
        assert!(s.sum_log_lr.abs() <= LOGIT_BOUND);
    }
}

#[test]
fn percent_text_rates_read_as_percentages() {
    let mut input = g1_trial();
    for a in &mut input.card.arms {
        a.dropout_rate = Some(LooseNumber::from("1%"));
    }
    input.card.flags = CardFlags {
        pp_only_success: true,
        dropout_asymmetry: Some(LooseNumber::from("0.5%")),
        ..Default::default()
    };
    let engine = ScoringEngine::new(EngineConfig::default()).unwrap();
    let eval = engine.evaluate_at(&input, "run-1", now());

    let s2 = signal(&eval.signals, SignalId::S2);
    let (eff_t, eff_c) = s2.metadata.effective_n.unwrap();
    assert!((eff_t - 99.0).abs() < 1e-9 && (eff_c - 99.0).abs() < 1e-9);
    assert!(!eval.score.metadata.stop_rule_applied);
    assert!(eval.score.p_fail < 0.97);
}

#[test]
fn batch_isolates_out_of_range_completion_date() {
    let mut odd = g1_trial();
    odd.metadata.trial_id = "NCT-MIN".into();
    odd.metadata.est_primary_completion_date = Some(NaiveDate::MIN);
    let inputs = vec![g1_trial(), odd, g1_trial()];

    let engine = ScoringEngine::new(EngineConfig::default()).unwrap();
    let out = engine.evaluate_batch_at(&inputs, "run-3", now());
    assert_eq!(out.len(), 3);
    assert_eq!(out[1].score.trial_id, "NCT-MIN");
    assert!(out[1].score.features_frozen_at.is_none());
    assert_eq!(out[0], engine.evaluate_at(&g1_trial(), "run-3", now()));
    assert_eq!(out[2], out[0]);
}

#[test]
fn batch_summary_over_run() {
    let engine = ScoringEngine::new(EngineConfig::default()).unwrap();
    let mut quiet = g1_trial();
    quiet.versions.truncate(1);
    let out = engine.evaluate_batch_at(&[g1_trial(), quiet], "run-2", now());
    let scores: Vec<_> = out.into_iter().map(|e| e.score).collect();
    let summary = summarize(&scores);
    assert_eq!(summary.total, 2);
    assert_eq!(summary.low_risk + summary.medium_risk + summary.high_risk, 2);
    assert_eq!(summary.stop_rule_count, 0);
}

fn history() -> Vec<HistoricalTrial> {
    (0..60)
        .map(|i| {
            let failed = i % 3 != 0;
            let mut fired_gates = Vec::new();
            if failed && i % 2 == 0 {
                fired_gates.push(FiredGate {
                    gate_id: GateId::G1,
                    severity: Severity::High,
                });
            }
            HistoricalTrial {
                trial_id: format!("H{i:03}"),
                failed,
                is_pivotal: i % 4 == 0,
                indication: Some(IndicationClass::Oncology),
                fired_gates,
            }
        })
        .collect()
}

#[test]
fn calibration_round_trip_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let stamp = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();

    let mut lr = LikelihoodRatioCalibrator::default();
    let fitted = lr.fit(&history()).clone();
    lr.save(dir.path().join("lr.json"), stamp).unwrap();
    let mut fresh = LikelihoodRatioCalibrator::default();
    assert_eq!(fresh.load(dir.path().join("lr.json")).unwrap(), &fitted);

    let mut priors = PriorRateCalibrator::default();
    let fitted = priors.fit(&history()).clone();
    priors.save(dir.path().join("priors.json"), stamp).unwrap();
    let mut fresh = PriorRateCalibrator::default();
    assert_eq!(fresh.load(dir.path().join("priors.json")).unwrap(), &fitted);
}

#[test]
fn empty_bucket_uses_default_lr() {
    let mut lr = LikelihoodRatioCalibrator::default();
    let table = lr.fit(&history());
    let g4_low = table.get(GateId::G4, Severity::Low).unwrap();
    assert_eq!(g4_low.likelihood_ratio, 2.0);
    assert_eq!(g4_low.source, LrSource::Default);
    assert_eq!(table.get(GateId::G1, Severity::High).unwrap().source, LrSource::Calibrated);
}

#[test]
fn calibrated_engine_uses_calibrated_lr() {
    let stamp = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
    let calibration = build_calibrated_config(&history(), 5, 10, stamp);
    let engine = ScoringEngine::new(EngineConfig::default())
        .unwrap()
        .with_calibration(calibration);
    let eval = engine.evaluate_at(&g1_trial(), "cal", now());
    let g1 = &eval.gates[0];
    assert!(g1.fired);
    assert_eq!(g1.metadata.lr_source, Some(LrSource::Calibrated));
    assert!(eval.score.metadata.calibration_version.is_some());
}
