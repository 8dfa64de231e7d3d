//! Data model: the protocol-agnostic proxy node, batch/conversion
//! outcome types, and the Clash document entry records.

pub mod clash;
pub mod outcome;
pub mod proxy;

pub use clash::{ClashProxy, SUPPORTED_CLASH_TYPES};
pub use outcome::{BatchOutcome, ConversionOutcome, ConversionStats, ParseFailure};
pub use proxy::{
    GrpcOptions, H2Options, Hysteria2Node, HysteriaNode, ProxyDetail, ProxyNode, ProxyType,
    ShadowsocksNode, ShadowsocksRNode, TrojanNode, VMessNode, VlessNode, WsOptions,
};
