//! Share-link decoding: per-protocol codecs, the codec registry and
//! batch subscription parsing.

pub mod batch;
pub mod codec;
pub mod codecs;

pub use batch::{decode_batch, parse_base64_subscription, BatchOptions};
pub use codec::{CodecRegistry, ProtocolCodec};
