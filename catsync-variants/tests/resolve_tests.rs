use catsync_variants::{
    equivalent, resolve, resolve_key, variant_map_from_json, variant_map_to_json, FallbackChains,
    VariantMap,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn map(entries: &[(&str, &str)]) -> VariantMap {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

// ── resolve_key ──────────────────────────────────────────────────

#[test]
fn own_value_wins() {
    let chains = FallbackChains::chinese();
    let m = map(&[("zh-hk", "香港"), ("zh-tw", "台灣")]);
    assert_eq!(resolve_key(&m, "zh-hk", &chains), Some("香港"));
}

#[test]
fn falls_back_in_chain_order() {
    let chains = FallbackChains::chinese();
    let m = map(&[("zh-tw", "台灣"), ("zh-hant", "繁體")]);
    // zh-hk: [zh-mo, zh-hant, zh-tw, zh]
    assert_eq!(resolve_key(&m, "zh-hk", &chains), Some("繁體"));
}

#[test]
fn empty_values_are_absent() {
    let chains = FallbackChains::chinese();
    let m = map(&[("zh-hk", ""), ("zh-hant", "繁體")]);
    assert_eq!(resolve_key(&m, "zh-hk", &chains), Some("繁體"));
}

#[test]
fn nothing_present_resolves_to_none() {
    let chains = FallbackChains::chinese();
    assert_eq!(resolve_key(&VariantMap::new(), "zh", &chains), None);
}

// ── resolve ──────────────────────────────────────────────────────

#[test]
fn traditional_value_stays_on_traditional_keys() {
    let chains = FallbackChains::chinese();
    let resolved = resolve(&map(&[("zh-hant", "繁體")]), &chains);

    assert_eq!(
        resolved,
        map(&[
            ("zh", "繁體"),
            ("zh-hant", "繁體"),
            ("zh-hk", "繁體"),
            ("zh-mo", "繁體"),
            ("zh-tw", "繁體"),
        ])
    );
    for key in ["zh-hans", "zh-cn", "zh-sg", "zh-my"] {
        assert!(!resolved.contains_key(key), "{key}");
    }
}

#[test]
fn lookup_does_not_follow_chains_of_chain_members() {
    let chains = FallbackChains::chinese();
    // zh-hans: [zh-cn, zh-sg, zh-my, zh]; zh would reach zh-tw, but only
    // zh-hans's own chain is consulted.
    let m = map(&[("zh-tw", "台灣")]);
    assert_eq!(resolve_key(&m, "zh-hans", &chains), None);
    assert_eq!(resolve_key(&m, "zh", &chains), Some("台灣"));
}

#[test]
fn script_split_is_preserved() {
    let chains = FallbackChains::chinese();
    let resolved = resolve(&map(&[("zh-hans", "简体"), ("zh-hant", "繁體")]), &chains);
    assert_eq!(resolved["zh-cn"], "简体");
    assert_eq!(resolved["zh-sg"], "简体");
    assert_eq!(resolved["zh-tw"], "繁體");
    assert_eq!(resolved["zh-mo"], "繁體");
    assert_eq!(resolved["zh"], "简体");
}

#[test]
fn unknown_keys_pass_through() {
    let chains = FallbackChains::chinese();
    let resolved = resolve(&map(&[("en", "Attack on Titan")]), &chains);
    assert_eq!(resolved, map(&[("en", "Attack on Titan")]));
}

// ── equivalent ───────────────────────────────────────────────────

#[test]
fn redundant_variant_is_equivalent() {
    let chains = FallbackChains::chinese();
    let a = map(&[("zh-hans", "简体"), ("zh-hant", "繁體")]);
    let b = map(&[("zh-hans", "简体"), ("zh-cn", "简体"), ("zh-hant", "繁體")]);
    assert!(equivalent(&a, &b, &chains));
}

#[test]
fn diverging_variant_is_not_equivalent() {
    let chains = FallbackChains::chinese();
    let a = map(&[("zh-hant", "繁體")]);
    let b = map(&[("zh-hant", "繁體"), ("zh-hk", "港版")]);
    assert!(!equivalent(&a, &b, &chains));
}

// ── JSON helpers ─────────────────────────────────────────────────

#[test]
fn json_roundtrip_skips_non_strings() {
    let value = json!({ "zh": "标题", "zh-hk": null, "n": 3 });
    let m = variant_map_from_json(&value).unwrap();
    assert_eq!(m, map(&[("zh", "标题")]));
    assert_eq!(variant_map_to_json(&m), json!({ "zh": "标题" }));
    assert!(variant_map_from_json(&json!("plain")).is_none());
}

// ── Properties ───────────────────────────────────────────────────

mod properties {
    use super::*;
    use catsync_variants::chinese::LANG_CODES;
    use proptest::prelude::*;

    fn sparse_map() -> impl Strategy<Value = VariantMap> {
        prop::collection::btree_map(
            prop::sample::select(LANG_CODES.to_vec()).prop_map(str::to_string),
            prop::sample::select(vec!["甲", "乙", "丙", ""]).prop_map(str::to_string),
            0..6,
        )
    }

    proptest! {
        #[test]
        fn resolving_same_input_twice_is_identical(m in sparse_map()) {
            let chains = FallbackChains::chinese();
            prop_assert_eq!(resolve(&m, &chains), resolve(&m, &chains));
        }

        #[test]
        fn resolution_keeps_present_values(m in sparse_map()) {
            let chains = FallbackChains::chinese();
            let resolved = resolve(&m, &chains);
            for (key, value) in m.iter().filter(|(_, v)| !v.is_empty()) {
                prop_assert_eq!(resolved.get(key), Some(value));
            }
        }

        #[test]
        fn equivalence_is_symmetric(a in sparse_map(), b in sparse_map()) {
            let chains = FallbackChains::chinese();
            prop_assert_eq!(equivalent(&a, &b, &chains), equivalent(&b, &a, &chains));
        }
    }
}
