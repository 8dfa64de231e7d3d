//! Cosmetic region labelling.
//!
//! A small keyword table used only for display grouping in conversion
//! stats. It never gates parsing or conversion; swap the table to
//! change the labels.

/// (label, lowercase keywords matched as substrings of the node name).
pub type RegionTable = [(&'static str, &'static [&'static str])];

pub const DEFAULT_REGIONS: &RegionTable = &[
    ("Hong Kong", &["hk", "hong kong", "hongkong", "香港", "🇭🇰"]),
    ("Taiwan", &["tw", "taiwan", "台湾", "🇹🇼"]),
    ("Singapore", &["sg", "singapore", "新加坡", "狮城", "🇸🇬"]),
    ("Japan", &["jp", "japan", "日本", "东京", "🇯🇵"]),
    ("Korea", &["kr", "korea", "韩国", "🇰🇷"]),
    ("United States", &["us", "united states", "美国", "🇺🇸"]),
];

pub const OTHER_REGION: &str = "Other";

/// First label whose keyword appears in the name, else [`OTHER_REGION`].
pub fn region_label(table: &RegionTable, name: &str) -> &'static str {
    let lowered = name.to_lowercase();
    for (label, keywords) in table {
        if keywords.iter().any(|keyword| lowered.contains(keyword)) {
            return label;
        }
    }
    OTHER_REGION
}
