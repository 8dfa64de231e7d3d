//! Config document extraction: the inverse of conversion.
//!
//! Takes an already-serialized Clash document and re-encodes each proxy
//! entry as a share link, reading the document's native field names.
//! Unsupported entry types become comment lines so nothing vanishes
//! silently; the output preserves document order.

use log::{debug, warn};
use serde_yaml::Value;

use crate::error::ExtractError;
use crate::models::{ClashProxy, SUPPORTED_CLASH_TYPES};
use crate::parser::CodecRegistry;

/// Result of extracting a document: one line per proxy entry, either a
/// share link or an explanatory comment.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub lines: Vec<String>,
    pub supported: usize,
    pub unsupported: usize,
}

impl Extraction {
    /// The newline-joined share-link blob.
    pub fn to_blob(&self) -> String {
        self.lines.join("\n")
    }
}

/// Extracts every proxy entry of `document` as a share link.
///
/// A document that does not parse, lacks a `proxies` key, or whose
/// `proxies` is not a list fails with `InvalidStructure`; a valid but
/// empty list fails with `EmptyNodeSet`. The two are never conflated.
pub fn extract_links(
    registry: &CodecRegistry,
    document: &str,
) -> Result<Extraction, ExtractError> {
    let root: Value = serde_yaml::from_str(document)
        .map_err(|e| ExtractError::InvalidStructure(format!("document parse error: {}", e)))?;

    if !root.is_mapping() {
        return Err(ExtractError::InvalidStructure(
            "document root is not a mapping".to_string(),
        ));
    }
    let proxies = root
        .get("proxies")
        .ok_or_else(|| ExtractError::InvalidStructure("missing proxies list".to_string()))?;
    let entries = proxies
        .as_sequence()
        .ok_or_else(|| ExtractError::InvalidStructure("proxies is not a list".to_string()))?;
    if entries.is_empty() {
        return Err(ExtractError::EmptyNodeSet);
    }

    let mut extraction = Extraction::default();
    for entry in entries {
        let entry_type = entry
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let name = entry
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("unnamed")
            .to_string();

        if !SUPPORTED_CLASH_TYPES.contains(&entry_type.as_str()) {
            extraction
                .lines
                .push(format!("# unsupported type: {} - {}", entry_type, name));
            extraction.unsupported += 1;
            continue;
        }

        let link = serde_yaml::from_value::<ClashProxy>(entry.clone())
            .map_err(|e| e.to_string())
            .and_then(|proxy| proxy.into_node().map_err(|e| e.to_string()))
            .and_then(|node| registry.encode(&node).map_err(|e| e.to_string()));
        match link {
            Ok(link) => {
                extraction.lines.push(link);
                extraction.supported += 1;
            }
            Err(reason) => {
                warn!("skipping {} entry {:?}: {}", entry_type, name, reason);
                extraction
                    .lines
                    .push(format!("# invalid {} entry: {}", entry_type, name));
                extraction.unsupported += 1;
            }
        }
    }

    debug!(
        "extracted {} links, {} passed over",
        extraction.supported, extraction.unsupported
    );
    Ok(extraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> CodecRegistry {
        CodecRegistry::with_defaults()
    }

    #[test]
    fn supported_and_unsupported_entries_keep_document_order() {
        let document = r#"
proxies:
  - type: ss
    name: node1
    server: example.com
    port: 8388
    cipher: aes-256-gcm
    password: secret
  - type: snell
    name: fancy
    server: example.org
    port: 443
    psk: x
"#;
        let extraction = extract_links(&registry(), document).unwrap();
        assert_eq!(extraction.lines.len(), 2);
        assert_eq!(extraction.supported, 1);
        assert_eq!(extraction.unsupported, 1);
        assert!(extraction.lines[0].starts_with("ss://"));
        assert!(extraction.lines[0].ends_with("#node1"));
        assert_eq!(extraction.lines[1], "# unsupported type: snell - fancy");
    }

    #[test]
    fn extracted_ss_link_decodes_back() {
        let document = r#"
proxies:
  - type: ss
    name: node one
    server: example.com
    port: 8388
    cipher: aes-256-gcm
    password: secret
"#;
        let registry = registry();
        let extraction = extract_links(&registry, document).unwrap();
        let node = registry.decode(&extraction.lines[0]).unwrap();
        assert_eq!(node.name, "node one");
        assert_eq!(node.server, "example.com");
    }

    #[test]
    fn non_list_proxies_is_invalid_structure() {
        let document = "proxies: \"not-a-list\"\n";
        assert!(matches!(
            extract_links(&registry(), document),
            Err(ExtractError::InvalidStructure(_))
        ));
    }

    #[test]
    fn missing_proxies_key_is_invalid_structure() {
        let document = "rules: []\n";
        assert!(matches!(
            extract_links(&registry(), document),
            Err(ExtractError::InvalidStructure(_))
        ));
    }

    #[test]
    fn empty_proxies_list_is_empty_node_set() {
        let document = "proxies: []\n";
        assert!(matches!(
            extract_links(&registry(), document),
            Err(ExtractError::EmptyNodeSet)
        ));
    }

    #[test]
    fn structure_and_empty_errors_are_distinct_kinds() {
        let structural = extract_links(&registry(), "proxies: 3\n").unwrap_err();
        let empty = extract_links(&registry(), "proxies: []\n").unwrap_err();
        assert_ne!(
            std::mem::discriminant(&structural),
            std::mem::discriminant(&empty)
        );
    }

    #[test]
    fn malformed_supported_entry_becomes_comment() {
        let document = r#"
proxies:
  - type: trojan
    name: broken
    server: example.com
    port: 443
    password: ""
"#;
        let extraction = extract_links(&registry(), document).unwrap();
        assert_eq!(extraction.supported, 0);
        assert_eq!(extraction.lines[0], "# invalid trojan entry: broken");
    }

    #[test]
    fn json_documents_are_accepted() {
        let document = r#"{"proxies":[{"type":"ss","name":"j","server":"example.com","port":1,"cipher":"aes-256-gcm","password":"pw"}]}"#;
        let extraction = extract_links(&registry(), document).unwrap();
        assert_eq!(extraction.supported, 1);
    }
}
