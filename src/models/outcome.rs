//! Outcome types for batch parsing and document conversion.
//!
//! Per-item failures are data, not errors: a batch keeps going and
//! reports what it dropped.

use std::collections::BTreeMap;

use super::proxy::ProxyNode;

/// Maximum length of source text echoed back in a failure, links can be
/// thousands of characters of base64.
const FAILURE_SOURCE_LIMIT: usize = 48;

/// One rejected input line, with the offending text truncated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub message: String,
    pub source: String,
}

impl ParseFailure {
    pub fn new(message: impl Into<String>, source: &str) -> Self {
        let source = if source.chars().count() > FAILURE_SOURCE_LIMIT {
            let truncated: String = source.chars().take(FAILURE_SOURCE_LIMIT).collect();
            format!("{}...", truncated)
        } else {
            source.to_string()
        };
        ParseFailure {
            message: message.into(),
            source,
        }
    }
}

/// Accumulated result of decoding a multi-line input.
///
/// `total` counts every non-blank, non-comment line seen. In lenient
/// mode unsupported lines are skipped without a failure record, so
/// `success + failed <= total`.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub nodes: Vec<ProxyNode>,
    pub failures: Vec<ParseFailure>,
    pub total: usize,
    pub success: usize,
    pub failed: usize,
}

/// Informational counters returned alongside a conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionStats {
    /// Nodes handed to the converter before any filtering.
    pub total: usize,
    /// Nodes that survived filtering, dedup and validation.
    pub valid: usize,
    pub by_protocol: BTreeMap<&'static str, usize>,
    /// Cosmetic region grouping, display only.
    pub by_region: BTreeMap<&'static str, usize>,
}

/// Result of converting a node set into a target document.
#[derive(Debug, Clone, Default)]
pub struct ConversionOutcome {
    pub document: Option<String>,
    pub error: Option<String>,
    pub warnings: Vec<String>,
    pub stats: ConversionStats,
}

impl ConversionOutcome {
    pub fn success(document: String, warnings: Vec<String>, stats: ConversionStats) -> Self {
        ConversionOutcome {
            document: Some(document),
            error: None,
            warnings,
            stats,
        }
    }

    pub fn failure(error: impl Into<String>, warnings: Vec<String>, stats: ConversionStats) -> Self {
        ConversionOutcome {
            document: None,
            error: Some(error.into()),
            warnings,
            stats,
        }
    }

    pub fn is_success(&self) -> bool {
        self.document.is_some()
    }
}
