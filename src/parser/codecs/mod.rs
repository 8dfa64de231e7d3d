//! One codec per share-link wire format.

mod hysteria;
mod ss;
mod ssr;
mod trojan;
mod vless;
mod vmess;

pub use hysteria::{Hysteria2Codec, HysteriaCodec};
pub use ss::ShadowsocksCodec;
pub use ssr::ShadowsocksRCodec;
pub use trojan::TrojanCodec;
pub use vless::VlessCodec;
pub use vmess::VmessCodec;

use crate::error::LinkError;

/// Parses a port field, rejecting 0 and non-numeric values.
pub(crate) fn parse_port(value: &str) -> Result<u16, LinkError> {
    match value.parse::<u16>() {
        Ok(0) | Err(_) => Err(LinkError::MalformedLink(format!(
            "port out of range: {}",
            value
        ))),
        Ok(port) => Ok(port),
    }
}

/// Rejects an empty required field.
pub(crate) fn require(value: &str, field: &str) -> Result<(), LinkError> {
    if value.is_empty() {
        Err(LinkError::MalformedLink(format!("missing {}", field)))
    } else {
        Ok(())
    }
}

pub(crate) fn malformed(message: impl Into<String>) -> LinkError {
    LinkError::MalformedLink(message.into())
}
