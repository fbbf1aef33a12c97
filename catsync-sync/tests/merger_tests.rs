use catsync_sync::{
    DivergenceRule, KeepReason, MergeOutcome, MergePolicy, ReconciliationMerger, SyncWarning,
};
use catsync_types::{Record, RecordId};
use catsync_variants::FallbackChains;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn merger(policy: MergePolicy) -> ReconciliationMerger {
    ReconciliationMerger::new(policy, Arc::new(FallbackChains::chinese()))
}

fn soft(field: &str) -> MergePolicy {
    MergePolicy {
        soft_field: Some(field.to_string()),
        ..Default::default()
    }
}

// ── Added / updated / unchanged ─────────────────────────────────

#[test]
fn new_record_is_added() {
    let incoming = Record::new(1u64).with_freshness(10).with_field("en", json!("X"));
    let decision = merger(MergePolicy::default()).merge(None, incoming.clone());

    assert_eq!(decision.outcome, MergeOutcome::Added);
    assert_eq!(decision.record, incoming);
    assert!(decision.warnings.is_empty());
}

#[test]
fn newer_different_record_replaces_prior() {
    let prior = Record::new(1u64).with_freshness(10).with_field("en", json!("X"));
    let incoming = Record::new(1u64).with_freshness(20).with_field("en", json!("Y"));

    let decision = merger(MergePolicy::default()).merge(Some(&prior), incoming.clone());

    assert_eq!(decision.outcome, MergeOutcome::Updated);
    assert_eq!(decision.record, incoming);
}

#[test]
fn equal_freshness_without_delta_keeps_prior_verbatim() {
    let prior = Record::new(1u64)
        .with_freshness(10)
        .with_field("title", json!({ "zh-hans": "进击的巨人", "zh-cn": "进击的巨人" }));
    let incoming = Record::new(1u64)
        .with_freshness(10)
        .with_field("title", json!({ "zh-hans": "进击的巨人" }));

    let decision = merger(MergePolicy::chinese_titles()).merge(Some(&prior), incoming);

    assert_eq!(decision.outcome, MergeOutcome::Unchanged);
    assert_eq!(decision.record, prior);
}

#[test]
fn newer_record_with_same_content_keeps_prior() {
    let prior = Record::new(1u64).with_freshness(10).with_field("en", json!("X"));
    let incoming = Record::new(1u64).with_freshness(30).with_field("en", json!("X"));

    let decision = merger(MergePolicy::default()).merge(Some(&prior), incoming);

    assert_eq!(decision.outcome, MergeOutcome::Unchanged);
    assert_eq!(decision.record.freshness, prior.freshness);
}

#[test]
fn newly_added_simplified_label_is_an_update() {
    let prior = Record::new(1u64)
        .with_freshness(10)
        .with_field("title", json!({ "zh-hant": "T" }));
    let incoming = Record::new(1u64)
        .with_freshness(20)
        .with_field("title", json!({ "zh-hant": "T", "zh-cn": "T" }));

    let decision = merger(MergePolicy::chinese_titles()).merge(Some(&prior), incoming.clone());

    assert_eq!(decision.outcome, MergeOutcome::Updated);
    assert_eq!(decision.record, incoming);
}

#[test]
fn page_change_is_an_update() {
    let prior = Record::new(1u64).with_freshness(10).with_page("https://a");
    let incoming = Record::new(1u64).with_freshness(10).with_page("https://b");

    let decision = merger(MergePolicy::default()).merge(Some(&prior), incoming);
    assert_eq!(decision.outcome, MergeOutcome::Updated);
}

// ── Stale records ───────────────────────────────────────────────

#[test]
fn stale_soft_change_keeps_prior() {
    let prior = Record::new(5u64).with_freshness(100).with_field("en", json!("X"));
    let incoming = Record::new(5u64)
        .with_freshness(90)
        .with_field("en", json!("X"))
        .with_field("jp", json!("Y"));

    let decision = merger(soft("jp")).merge(Some(&prior), incoming);

    assert_eq!(
        decision.outcome,
        MergeOutcome::KeptPrior(KeepReason::SpuriousSoftChange)
    );
    assert_eq!(decision.record, prior);
    assert_eq!(decision.warnings.len(), 1);
    assert!(!decision.warnings[0].is_hard());
}

#[test]
fn stale_substantive_change_is_desync() {
    let prior = Record::new(5u64).with_freshness(100).with_field("en", json!("X"));
    let incoming = Record::new(5u64)
        .with_freshness(90)
        .with_field("en", json!("Z"))
        .with_field("jp", json!("Y"));

    let decision = merger(soft("jp")).merge(Some(&prior), incoming);

    assert_eq!(
        decision.outcome,
        MergeOutcome::KeptPrior(KeepReason::Desync {
            changed: vec!["en".to_string(), "jp".to_string()]
        })
    );
    assert_eq!(decision.record, prior);
    assert!(decision.warnings[0].is_hard());
    assert_eq!(decision.warnings[0].id(), &RecordId::Numeric(5));
}

#[test]
fn stale_identical_record_is_spurious() {
    let prior = Record::new(5u64).with_freshness(100).with_field("en", json!("X"));
    let incoming = Record::new(5u64).with_freshness(1).with_field("en", json!("X"));

    let decision = merger(MergePolicy::default()).merge(Some(&prior), incoming);
    assert_eq!(
        decision.outcome,
        MergeOutcome::KeptPrior(KeepReason::SpuriousSoftChange)
    );
}

#[test]
fn soft_field_can_name_a_variant() {
    let prior = Record::new(5u64)
        .with_freshness(100)
        .with_field("title", json!({ "zh-tw": "鋼之鍊金術師" }));
    let incoming = Record::new(5u64)
        .with_freshness(90)
        .with_field("title", json!({ "zh-tw": "鋼之鍊金術師", "zh-hk": "鋼之鍊金術師" }));

    let decision = merger(MergePolicy::chinese_titles()).merge(Some(&prior), incoming);
    assert_eq!(
        decision.outcome,
        MergeOutcome::KeptPrior(KeepReason::SpuriousSoftChange)
    );
}

// ── Structural diff ─────────────────────────────────────────────

#[test]
fn diff_descends_into_variant_fields() {
    let merger = merger(MergePolicy::chinese_titles());
    let a = Record::new(1u64)
        .with_field("title", json!({ "zh-cn": "A", "zh-tw": "B" }))
        .with_field("format", json!("TV"));
    let b = Record::new(1u64)
        .with_field("title", json!({ "zh-cn": "A", "zh-hk": "C" }))
        .with_field("format", json!("MOVIE"))
        .with_page("https://example.org");

    assert_eq!(
        merger.diff_fields(&a, &b),
        vec!["format", "page", "title.zh-hk", "title.zh-tw"]
    );
}

#[test]
fn non_variant_objects_diff_as_a_whole() {
    let merger = merger(MergePolicy::default());
    let a = Record::new(1u64).with_field("title", json!({ "romaji": "A" }));
    let b = Record::new(1u64).with_field("title", json!({ "romaji": "B" }));
    assert_eq!(merger.diff_fields(&a, &b), vec!["title"]);
}

#[test]
fn semantic_equality_is_symmetric() {
    let merger = merger(MergePolicy::chinese_titles());
    let a = Record::new(1u64).with_field("title", json!({ "zh-hant": "T" }));
    let b = Record::new(1u64).with_field("title", json!({ "zh-hant": "T", "zh-tw": "T" }));
    assert!(merger.semantically_equal(&a, &b));
    assert!(merger.semantically_equal(&b, &a));

    let c = Record::new(1u64).with_field("title", json!({ "zh-hant": "T", "zh-tw": "U" }));
    assert!(!merger.semantically_equal(&a, &c));
    assert!(!merger.semantically_equal(&c, &a));
}

// ── Divergence rules ────────────────────────────────────────────

#[test]
fn divergent_secondary_variant_is_dropped() {
    let incoming = Record::new(7u64)
        .with_field("title", json!({ "zh-hk": "香港名", "zh-mo": "澳門名" }));

    let decision = merger(MergePolicy::chinese_titles()).merge(None, incoming);

    assert_eq!(decision.record.field("title"), Some(&json!({ "zh-hk": "香港名" })));
    assert_eq!(
        decision.warnings,
        vec![SyncWarning::DivergentVariant {
            id: RecordId::Numeric(7),
            field: "title".to_string(),
            secondary: "zh-mo".to_string(),
            value: "澳門名".to_string(),
            canonical: "zh-hk".to_string(),
            canonical_value: "香港名".to_string(),
        }]
    );
}

#[test]
fn agreeing_secondary_variant_is_kept() {
    let incoming = Record::new(7u64).with_field("title", json!({ "zh-hk": "名", "zh-mo": "名" }));
    let decision = merger(MergePolicy::chinese_titles()).merge(None, incoming.clone());
    assert_eq!(decision.record, incoming);
    assert!(decision.warnings.is_empty());
}

#[test]
fn lone_secondary_variant_is_kept() {
    let incoming = Record::new(7u64).with_field("title", json!({ "zh-mo": "名" }));
    let decision = merger(MergePolicy::chinese_titles()).merge(None, incoming.clone());
    assert_eq!(decision.record, incoming);
}

#[test]
fn secondary_variant_is_not_compared_across_scripts() {
    let incoming = Record::new(16498u64)
        .with_field("title", json!({ "zh-cn": "进击的巨人", "zh-mo": "進擊的巨人" }));

    let decision = merger(MergePolicy::chinese_titles()).merge(None, incoming.clone());

    assert_eq!(decision.record, incoming);
    assert!(decision.warnings.is_empty());
}

#[test]
fn divergence_exception_keeps_value() {
    let mut policy = MergePolicy::chinese_titles();
    policy.divergence = vec![
        DivergenceRule::new("title", "zh-mo", "zh-hk").with_exceptions([RecordId::Numeric(7)]),
    ];
    let incoming = Record::new(7u64).with_field("title", json!({ "zh-hk": "甲", "zh-mo": "乙" }));

    let decision = merger(policy).merge(None, incoming.clone());
    assert_eq!(decision.record, incoming);
    assert!(decision.warnings.is_empty());
}

// ── Properties ──────────────────────────────────────────────────

mod properties {
    use super::*;
    use catsync_variants::chinese::LANG_CODES;
    use catsync_variants::{VariantMap, variant_map_to_json};
    use proptest::prelude::*;

    fn sparse_map() -> impl Strategy<Value = VariantMap> {
        prop::collection::btree_map(
            prop::sample::select(LANG_CODES.to_vec()).prop_map(str::to_string),
            prop::sample::select(vec!["甲", "乙", ""]).prop_map(str::to_string),
            0..5,
        )
    }

    fn titled(map: &VariantMap) -> Record {
        Record::new(1u64)
            .with_freshness(50)
            .with_field("title", variant_map_to_json(map))
    }

    proptest! {
        #[test]
        fn no_delta_outcome_is_symmetric(a in sparse_map(), b in sparse_map()) {
            let merger = merger(MergePolicy {
                variant_fields: vec!["title".to_string()],
                ..Default::default()
            });
            let forward = merger.merge(Some(&titled(&a)), titled(&b)).outcome;
            let backward = merger.merge(Some(&titled(&b)), titled(&a)).outcome;
            prop_assert_eq!(
                forward == MergeOutcome::Unchanged,
                backward == MergeOutcome::Unchanged
            );
        }

        #[test]
        fn merge_never_lowers_freshness(prior_f in 0i64..1000, incoming_f in 0i64..1000, same in any::<bool>()) {
            let prior = Record::new(1u64).with_freshness(prior_f).with_field("en", json!("X"));
            let value = if same { "X" } else { "Y" };
            let incoming = Record::new(1u64).with_freshness(incoming_f).with_field("en", json!(value));

            let decision = merger(MergePolicy::default()).merge(Some(&prior), incoming);
            prop_assert!(decision.record.freshness >= prior.freshness);
        }
    }
}
