//! Protocol codec trait and registry.
//!
//! Adding support for a new share-link protocol means implementing
//! [`ProtocolCodec`] and registering it; nothing else changes.

use crate::error::LinkError;
use crate::models::{ProxyNode, ProxyType};

use super::codecs::{
    Hysteria2Codec, HysteriaCodec, ShadowsocksCodec, ShadowsocksRCodec, TrojanCodec, VlessCodec,
    VmessCodec,
};

/// Decodes one share-link wire format and encodes its exact inverse.
pub trait ProtocolCodec: Send + Sync {
    /// URI prefixes this codec recognizes, e.g. `ssr://`.
    fn prefixes(&self) -> &'static [&'static str];

    /// The node variants this codec can encode.
    fn handles(&self, kind: ProxyType) -> bool;

    fn can_decode(&self, link: &str) -> bool {
        self.prefixes().iter().any(|p| link.starts_with(p))
    }

    fn decode(&self, link: &str) -> Result<ProxyNode, LinkError>;

    /// Inverse of [`decode`](ProtocolCodec::decode):
    /// `decode(encode(n))` is field-for-field equal to `n`.
    fn encode(&self, node: &ProxyNode) -> Result<String, LinkError>;
}

/// Prefix-dispatched codec lookup, populated once at construction and
/// read-only afterwards. Build a fresh one per test when isolation
/// matters; there is no process-global instance.
pub struct CodecRegistry {
    codecs: Vec<Box<dyn ProtocolCodec>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        CodecRegistry { codecs: Vec::new() }
    }

    /// Registry with every built-in protocol codec registered.
    pub fn with_defaults() -> Self {
        let mut registry = CodecRegistry::new();
        registry.register(Box::new(ShadowsocksCodec));
        registry.register(Box::new(ShadowsocksRCodec));
        registry.register(Box::new(VmessCodec));
        registry.register(Box::new(VlessCodec));
        registry.register(Box::new(TrojanCodec));
        registry.register(Box::new(HysteriaCodec));
        registry.register(Box::new(Hysteria2Codec));
        registry
    }

    pub fn register(&mut self, codec: Box<dyn ProtocolCodec>) {
        self.codecs.push(codec);
    }

    /// Finds the codec whose prefix matches the link, if any.
    pub fn resolve(&self, link: &str) -> Option<&dyn ProtocolCodec> {
        self.codecs
            .iter()
            .find(|codec| codec.can_decode(link))
            .map(|codec| codec.as_ref())
    }

    pub fn supported_prefixes(&self) -> Vec<&'static str> {
        self.codecs
            .iter()
            .flat_map(|codec| codec.prefixes().iter().copied())
            .collect()
    }

    /// Decodes a single link, or fails with `UnsupportedProtocol` when
    /// no codec claims it.
    pub fn decode(&self, link: &str) -> Result<ProxyNode, LinkError> {
        match self.resolve(link) {
            Some(codec) => codec.decode(link),
            None => {
                let prefix = link.split("://").next().unwrap_or(link);
                Err(LinkError::UnsupportedProtocol(prefix.to_string()))
            }
        }
    }

    /// Encodes a node with the codec that handles its variant.
    pub fn encode(&self, node: &ProxyNode) -> Result<String, LinkError> {
        let kind = node.proxy_type();
        match self.codecs.iter().find(|codec| codec.handles(kind)) {
            Some(codec) => codec.encode(node),
            None => Err(LinkError::UnsupportedProtocol(kind.as_str().to_string())),
        }
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        CodecRegistry::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_knows_all_prefixes() {
        let registry = CodecRegistry::with_defaults();
        let prefixes = registry.supported_prefixes();
        for expected in [
            "ss://",
            "ssr://",
            "vmess://",
            "vless://",
            "trojan://",
            "hysteria://",
            "hysteria2://",
            "hy2://",
        ] {
            assert!(prefixes.contains(&expected), "missing {}", expected);
        }
    }

    #[test]
    fn resolve_dispatches_by_prefix() {
        let registry = CodecRegistry::with_defaults();
        assert!(registry.resolve("ssr://abc").is_some());
        assert!(registry.resolve("wireguard://abc").is_none());
    }

    #[test]
    fn unknown_prefix_is_unsupported_protocol() {
        let registry = CodecRegistry::with_defaults();
        assert!(matches!(
            registry.decode("snell://whatever"),
            Err(LinkError::UnsupportedProtocol(_))
        ));
    }
}
