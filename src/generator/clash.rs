//! Clash document converter.
//!
//! Pipeline: filter, dedup, validate, sort, map to Clash entries,
//! optional DIRECT entry, serialize. Per-node problems become warnings;
//! only an empty survivor set or an unusable base document fails the
//! whole conversion.

use std::collections::HashSet;

use log::{debug, warn};
use serde_yaml::{Mapping, Value};

use crate::models::{ClashProxy, ConversionOutcome, ConversionStats, ProxyNode};
use crate::utils::string::natural_cmp;

use super::converter::{ConvertOptions, FormatConverter, SerializeFormat, TargetFormat};
use super::region::{region_label, RegionTable, DEFAULT_REGIONS};

pub struct ClashConverter {
    regions: &'static RegionTable,
}

impl ClashConverter {
    pub fn new() -> Self {
        ClashConverter {
            regions: DEFAULT_REGIONS,
        }
    }

    /// Replaces the cosmetic region table.
    pub fn with_regions(regions: &'static RegionTable) -> Self {
        ClashConverter { regions }
    }
}

impl Default for ClashConverter {
    fn default() -> Self {
        ClashConverter::new()
    }
}

fn name_matches(name: &str, keywords: &[String]) -> bool {
    let lowered = name.to_lowercase();
    keywords
        .iter()
        .any(|keyword| lowered.contains(&keyword.to_lowercase()))
}

fn valid_server_charset(server: &str) -> bool {
    server
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '_'))
}

/// Validation applied to nodes that survived filtering; returns the
/// reason a node is unusable.
fn validate_node(node: &ProxyNode) -> Result<(), String> {
    if node.name.trim().is_empty() {
        return Err("empty name".to_string());
    }
    if node.server.is_empty() {
        return Err("empty server".to_string());
    }
    if node.port == 0 {
        return Err("port out of range".to_string());
    }
    if !valid_server_charset(&node.server) {
        return Err(format!("invalid server charset: {}", node.server));
    }
    Ok(())
}

fn direct_entry() -> Value {
    let mut entry = Mapping::new();
    entry.insert(
        Value::String("name".to_string()),
        Value::String("DIRECT".to_string()),
    );
    entry.insert(
        Value::String("type".to_string()),
        Value::String("direct".to_string()),
    );
    Value::Mapping(entry)
}

impl FormatConverter for ClashConverter {
    fn target(&self) -> TargetFormat {
        TargetFormat::Clash
    }

    fn convert(&self, nodes: &[ProxyNode], options: &ConvertOptions) -> ConversionOutcome {
        let mut stats = ConversionStats {
            total: nodes.len(),
            ..ConversionStats::default()
        };
        let mut warnings = Vec::new();

        // (a) protocol allow-list and name keyword filters.
        let mut survivors: Vec<&ProxyNode> = nodes
            .iter()
            .filter(|node| {
                if let Some(allowed) = &options.allow_protocols {
                    if !allowed.contains(&node.proxy_type()) {
                        return false;
                    }
                }
                if !options.include_keywords.is_empty()
                    && !name_matches(&node.name, &options.include_keywords)
                {
                    return false;
                }
                if name_matches(&node.name, &options.exclude_keywords) {
                    return false;
                }
                true
            })
            .collect();

        // (b) dedup by endpoint identity, first occurrence wins.
        let mut seen = HashSet::new();
        let before = survivors.len();
        survivors.retain(|node| seen.insert(node.dedup_key()));
        let duplicates = before - survivors.len();
        if duplicates > 0 {
            warnings.push(format!(
                "{} duplicate node{} removed",
                duplicates,
                if duplicates == 1 { "" } else { "s" }
            ));
        }

        // (c) per-node validation, dropping instead of aborting.
        survivors.retain(|node| match validate_node(node) {
            Ok(()) => true,
            Err(reason) => {
                warn!("dropping invalid node {:?}: {}", node.name, reason);
                warnings.push(format!("dropped invalid node {:?}: {}", node.name, reason));
                false
            }
        });

        // (d) display-name sort, numeric-aware.
        survivors.sort_by(|a, b| natural_cmp(&a.name, &b.name));

        // (e) map survivors to Clash entries. A variant without a
        // mapping is surfaced, never silently dropped.
        let mut entries = Vec::with_capacity(survivors.len());
        for node in &survivors {
            match ClashProxy::from_node(node) {
                Ok(entry) => match serde_yaml::to_value(&entry) {
                    Ok(value) => {
                        *stats
                            .by_protocol
                            .entry(node.proxy_type().as_str())
                            .or_insert(0) += 1;
                        *stats
                            .by_region
                            .entry(region_label(self.regions, &node.name))
                            .or_insert(0) += 1;
                        entries.push(value);
                    }
                    Err(error) => {
                        warnings.push(format!(
                            "failed to serialize node {:?}: {}",
                            node.name, error
                        ));
                    }
                },
                Err(error) => {
                    warnings.push(format!("unsupported protocol for {:?}: {}", node.name, error));
                }
            }
        }
        stats.valid = entries.len();

        if entries.is_empty() {
            return ConversionOutcome::failure("no valid nodes", warnings, stats);
        }

        // (f) synthetic DIRECT entry.
        if options.prepend_direct {
            entries.insert(0, direct_entry());
        }

        // (g) merge into the base document and serialize.
        let mut document = match &options.base {
            Some(base) => match serde_yaml::from_str::<Value>(base) {
                Ok(Value::Mapping(map)) => map,
                Ok(_) => {
                    return ConversionOutcome::failure(
                        "base document is not a mapping",
                        warnings,
                        stats,
                    )
                }
                Err(error) => {
                    return ConversionOutcome::failure(
                        format!("base document parse error: {}", error),
                        warnings,
                        stats,
                    )
                }
            },
            None => Mapping::new(),
        };
        document.insert(
            Value::String("proxies".to_string()),
            Value::Sequence(entries),
        );

        let serialized = match options.format {
            SerializeFormat::Yaml => serde_yaml::to_string(&Value::Mapping(document)),
            SerializeFormat::Json => {
                return match serde_json::to_string_pretty(&Value::Mapping(document)) {
                    Ok(json) => {
                        debug!("clash conversion produced {} entries", stats.valid);
                        ConversionOutcome::success(json, warnings, stats)
                    }
                    Err(error) => ConversionOutcome::failure(
                        format!("serialization error: {}", error),
                        warnings,
                        stats,
                    ),
                }
            }
        };
        match serialized {
            Ok(yaml) => {
                debug!("clash conversion produced {} entries", stats.valid);
                ConversionOutcome::success(yaml, warnings, stats)
            }
            Err(error) => ConversionOutcome::failure(
                format!("serialization error: {}", error),
                warnings,
                stats,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProxyDetail, ProxyType, ShadowsocksNode, TrojanNode};

    fn ss_node(name: &str, server: &str, port: u16) -> ProxyNode {
        ProxyNode {
            name: name.to_string(),
            server: server.to_string(),
            port,
            detail: ProxyDetail::Shadowsocks(ShadowsocksNode {
                cipher: "aes-256-gcm".to_string(),
                password: "pw".to_string(),
                udp: Some(true),
                plugin: None,
                plugin_opts: None,
            }),
        }
    }

    fn trojan_node(name: &str, server: &str, port: u16) -> ProxyNode {
        ProxyNode {
            name: name.to_string(),
            server: server.to_string(),
            port,
            detail: ProxyDetail::Trojan(TrojanNode {
                password: "pw".to_string(),
                tls: true,
                sni: None,
                alpn: Vec::new(),
                ws_opts: None,
            }),
        }
    }

    fn convert(nodes: &[ProxyNode], options: &ConvertOptions) -> ConversionOutcome {
        ClashConverter::new().convert(nodes, options)
    }

    #[test]
    fn duplicate_endpoint_keeps_first_and_warns() {
        let nodes = vec![
            ss_node("first", "a.example.com", 8388),
            ss_node("second", "a.example.com", 8388),
        ];
        let outcome = convert(&nodes, &ConvertOptions::default());
        assert!(outcome.is_success());
        assert_eq!(outcome.stats.valid, 1);
        assert!(outcome
            .warnings
            .iter()
            .any(|w| w.contains("1 duplicate node removed")));
        let doc = outcome.document.unwrap();
        assert!(doc.contains("first"));
        assert!(!doc.contains("second"));
    }

    #[test]
    fn same_endpoint_different_protocol_is_not_a_duplicate() {
        let nodes = vec![
            ss_node("ss", "a.example.com", 443),
            trojan_node("tj", "a.example.com", 443),
        ];
        let outcome = convert(&nodes, &ConvertOptions::default());
        assert_eq!(outcome.stats.valid, 2);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn empty_after_filter_is_a_failure_not_empty_success() {
        let nodes = vec![ss_node("HK-01", "a.example.com", 443)];
        let options = ConvertOptions {
            exclude_keywords: vec!["hk".to_string()],
            ..Default::default()
        };
        let outcome = convert(&nodes, &options);
        assert!(!outcome.is_success());
        assert_eq!(outcome.error.as_deref(), Some("no valid nodes"));
    }

    #[test]
    fn invalid_node_is_dropped_with_warning_not_abort() {
        let nodes = vec![
            ss_node("ok", "a.example.com", 443),
            ss_node("bad server", "bad host!", 443),
        ];
        let outcome = convert(&nodes, &ConvertOptions::default());
        assert!(outcome.is_success());
        assert_eq!(outcome.stats.valid, 1);
        assert!(outcome.warnings.iter().any(|w| w.contains("bad server")));
    }

    #[test]
    fn nodes_are_sorted_naturally_by_name() {
        let nodes = vec![
            ss_node("node10", "c.example.com", 1),
            ss_node("node2", "b.example.com", 1),
            ss_node("node1", "a.example.com", 1),
        ];
        let outcome = convert(&nodes, &ConvertOptions::default());
        let doc = outcome.document.unwrap();
        let p1 = doc.find("node1\n").or_else(|| doc.find("node1")).unwrap();
        let p2 = doc.find("node2").unwrap();
        let p10 = doc.find("node10").unwrap();
        assert!(p1 < p2, "node1 should come before node2");
        assert!(p2 < p10, "node2 should come before node10");
    }

    #[test]
    fn protocol_allow_list_filters_nodes() {
        let nodes = vec![
            ss_node("ss", "a.example.com", 1),
            trojan_node("tj", "b.example.com", 1),
        ];
        let options = ConvertOptions {
            allow_protocols: Some([ProxyType::Trojan].into_iter().collect()),
            ..Default::default()
        };
        let outcome = convert(&nodes, &options);
        assert_eq!(outcome.stats.valid, 1);
        assert_eq!(outcome.stats.by_protocol.get("Trojan"), Some(&1));
        assert_eq!(outcome.stats.by_protocol.get("SS"), None);
    }

    #[test]
    fn base_document_sections_pass_through() {
        let base = "dns:\n  enable: true\nexperimental:\n  ignore-resolve-fail: true\n";
        let options = ConvertOptions {
            base: Some(base.to_string()),
            ..Default::default()
        };
        let nodes = vec![ss_node("n", "a.example.com", 1)];
        let outcome = convert(&nodes, &options);
        let doc = outcome.document.unwrap();
        assert!(doc.contains("dns:"));
        assert!(doc.contains("ignore-resolve-fail"));
        assert!(doc.contains("proxies:"));
    }

    #[test]
    fn direct_entry_is_prepended_on_request() {
        let options = ConvertOptions {
            prepend_direct: true,
            ..Default::default()
        };
        let nodes = vec![ss_node("n", "a.example.com", 1)];
        let outcome = convert(&nodes, &options);
        let doc = outcome.document.unwrap();
        let direct = doc.find("DIRECT").unwrap();
        let node = doc.find("a.example.com").unwrap();
        assert!(direct < node);
    }

    #[test]
    fn json_output_is_valid_json() {
        let options = ConvertOptions {
            format: SerializeFormat::Json,
            ..Default::default()
        };
        let nodes = vec![ss_node("n", "a.example.com", 1)];
        let outcome = convert(&nodes, &options);
        let doc = outcome.document.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&doc).unwrap();
        assert!(parsed["proxies"].is_array());
    }

    #[test]
    fn region_stats_are_cosmetic_only() {
        let nodes = vec![ss_node("HK-01", "a.example.com", 1)];
        let outcome = convert(&nodes, &ConvertOptions::default());
        assert!(outcome.is_success());
        assert_eq!(outcome.stats.by_region.get("Hong Kong"), Some(&1));
    }
}
