//! Format converter trait and registry.

use std::collections::HashSet;

use crate::models::{ConversionOutcome, ProxyNode, ProxyType};

use super::clash::ClashConverter;

/// Target document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetFormat {
    Clash,
}

impl TargetFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "clash" => Some(TargetFormat::Clash),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetFormat::Clash => "clash",
        }
    }
}

/// Serialization of the produced document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SerializeFormat {
    #[default]
    Yaml,
    Json,
}

/// Options applied by the conversion pipeline, in pipeline order.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Only keep nodes of these protocols; `None` keeps all.
    pub allow_protocols: Option<HashSet<ProxyType>>,
    /// Keep only nodes whose name contains one of these (case-insensitive).
    pub include_keywords: Vec<String>,
    /// Drop nodes whose name contains one of these (case-insensitive).
    pub exclude_keywords: Vec<String>,
    /// Prepend a synthetic DIRECT entry to the proxy list.
    pub prepend_direct: bool,
    /// Base document whose non-proxy sections pass through opaquely.
    pub base: Option<String>,
    pub format: SerializeFormat,
}

/// Converts a node set into one target document format.
pub trait FormatConverter: Send + Sync {
    fn target(&self) -> TargetFormat;

    fn supports(&self, target: TargetFormat) -> bool {
        self.target() == target
    }

    fn convert(&self, nodes: &[ProxyNode], options: &ConvertOptions) -> ConversionOutcome;
}

/// Target-format-keyed converter lookup, populated once.
pub struct ConverterRegistry {
    converters: Vec<Box<dyn FormatConverter>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        ConverterRegistry {
            converters: Vec::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = ConverterRegistry::new();
        registry.register(Box::new(ClashConverter::new()));
        registry
    }

    pub fn register(&mut self, converter: Box<dyn FormatConverter>) {
        self.converters.push(converter);
    }

    pub fn resolve(&self, target: TargetFormat) -> Option<&dyn FormatConverter> {
        self.converters
            .iter()
            .find(|converter| converter.supports(target))
            .map(|converter| converter.as_ref())
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        ConverterRegistry::with_defaults()
    }
}
