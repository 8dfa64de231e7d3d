//! subrelay: a protocol codec and format-conversion engine for proxy
//! subscription nodes, plus the subscription re-hosting workflow built
//! on top of it.

pub mod error;
pub mod extractor;
pub mod generator;
pub mod interfaces;
pub mod merge;
pub mod models;
pub mod parser;
pub mod utils;

// Re-export the main entry points for easier access.
pub use error::{ExtractError, FetchError, LinkError, MergeError, StoreError};
pub use generator::{ConvertOptions, ConverterRegistry, FormatConverter, SerializeFormat, TargetFormat};
pub use interfaces::Subrelay;
pub use merge::{LinkStore, MergeOutput, MergeRequest, SubscriptionFetch};
pub use models::{BatchOutcome, ConversionOutcome, ProxyNode, ProxyType};
pub use parser::{BatchOptions, CodecRegistry, ProtocolCodec};
