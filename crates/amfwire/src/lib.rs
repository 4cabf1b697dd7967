//! AMF3 object-graph codec.
//!
//! amfwire reads and writes Action Message Format 3 byte streams: typed
//! values, shared and cyclic object graphs, per-message reference tables and
//! class-name mapping between remote and local types.
//!
//! # Crate Structure
//!
//! - [`codec`]: serializer, deserializer, value graph and class mapper
//!
//! The `async` feature adds a `tokio_util` decoder/encoder; the `cli` feature
//! builds the `amfwire` inspector binary.

/// Re-export codec types.
pub mod codec {
    pub use amfwire_codec::*;
}

pub use amfwire_codec::{
    ClassMapper, Codec, CodecConfig, Decoded, Graph, Message, MessageReader, MessageWriter, Value,
};
