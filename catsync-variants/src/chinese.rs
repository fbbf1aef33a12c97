//! Chinese script and region variants.
//!
//! Keys are wiki-style language codes (`zh-hk`); the triple store reports
//! BCP 47 tags (`zh-Hant-HK`), which are mapped back with
//! [`lang_from_bcp47`].

use crate::FallbackChains;
use std::collections::BTreeMap;

/// Wiki code to BCP 47 tag for every script/region variant.
pub const LANG_MAP: [(&str, &str); 8] = [
    ("zh-hans", "zh-Hans"),
    ("zh-hant", "zh-Hant"),
    ("zh-cn", "zh-Hans-CN"),
    ("zh-sg", "zh-Hans-SG"),
    ("zh-my", "zh-Hans-MY"),
    ("zh-tw", "zh-Hant-TW"),
    ("zh-hk", "zh-Hant-HK"),
    ("zh-mo", "zh-Hant-MO"),
];

/// Variant codes, excluding the bare `zh`.
pub const VARIANT_CODES: [&str; 8] = [
    "zh-hans", "zh-hant", "zh-cn", "zh-sg", "zh-my", "zh-tw", "zh-hk", "zh-mo",
];

/// All language codes known to the table.
pub const LANG_CODES: [&str; 9] = [
    "zh", "zh-hans", "zh-hant", "zh-cn", "zh-sg", "zh-my", "zh-tw", "zh-hk", "zh-mo",
];

const FALLBACKS: [(&str, &[&str]); 9] = [
    (
        "zh",
        &["zh-hans", "zh-hant", "zh-cn", "zh-tw", "zh-hk", "zh-sg", "zh-mo", "zh-my"],
    ),
    ("zh-hans", &["zh-cn", "zh-sg", "zh-my", "zh"]),
    ("zh-hant", &["zh-tw", "zh-hk", "zh-mo", "zh"]),
    ("zh-cn", &["zh-hans", "zh-sg", "zh-my", "zh"]),
    ("zh-sg", &["zh-my", "zh-hans", "zh-cn", "zh"]),
    ("zh-my", &["zh-sg", "zh-hans", "zh-cn", "zh"]),
    ("zh-tw", &["zh-hant", "zh-hk", "zh-mo", "zh"]),
    ("zh-hk", &["zh-mo", "zh-hant", "zh-tw", "zh"]),
    ("zh-mo", &["zh-hk", "zh-hant", "zh-tw", "zh"]),
];

/// Raw fallback table, in declaration order.
pub fn fallback_table() -> impl Iterator<Item = (&'static str, &'static [&'static str])> {
    FALLBACKS.iter().copied()
}

/// Maps a BCP 47 tag to its wiki code.
#[must_use]
pub fn lang_from_bcp47(tag: &str) -> Option<&'static str> {
    LANG_MAP
        .iter()
        .find(|(_, bcp47)| bcp47.eq_ignore_ascii_case(tag))
        .map(|(code, _)| *code)
}

/// Normalizes a tag to a known wiki code, accepting either form.
#[must_use]
pub fn to_wiki_code(tag: &str) -> Option<&'static str> {
    lang_from_bcp47(tag).or_else(|| {
        let lower = tag.to_ascii_lowercase();
        LANG_CODES.iter().copied().find(|code| *code == lower)
    })
}

impl FallbackChains {
    /// The built-in Chinese variant table.
    #[must_use]
    pub fn chinese() -> Self {
        let keys = FALLBACKS.iter().map(|(k, _)| (*k).to_string()).collect();
        let chains: BTreeMap<String, Vec<String>> = FALLBACKS
            .iter()
            .map(|(k, chain)| {
                (
                    (*k).to_string(),
                    chain.iter().map(|c| (*c).to_string()).collect(),
                )
            })
            .collect();
        Self::assemble(keys, chains)
    }
}
