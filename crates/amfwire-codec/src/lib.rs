//! AMF3 object-graph codec.
//!
//! Encodes and decodes values in the AMF3 binary format:
//! - Variable-length 29-bit integers and big-endian doubles
//! - Per-message reference tables for strings, objects and traits
//! - Class-name mapping between remote types and local Rust types
//! - Cyclic and shared substructures through an arena [`Graph`]
//!
//! Truncated input is not an error: undecoded bytes come back as leftover
//! so a caller can append more data and decode again.

mod cache;
pub mod codec;
pub mod config;
pub mod deserializer;
pub mod error;
pub mod mapping;
pub mod marker;
pub mod object;
pub mod primitive;
pub mod reader;
pub mod serializer;
pub mod value;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

#[cfg(feature = "async")]
pub use async_codec::AmfCodec;
pub use codec::{Codec, Message};
pub use config::{CodecConfig, DEFAULT_MAX_DEPTH, DEFAULT_MAX_MESSAGE};
pub use deserializer::{Decoded, Deserializer};
pub use error::{AmfError, Result};
pub use mapping::{ClassMapper, Factory, DEFAULT_ALIASES};
pub use object::{
    AmfObject, ArrayCollection, CustomCodec, DynamicObject, Object, Traits, ARRAY_COLLECTION_CLASS,
};
pub use reader::MessageReader;
pub use serializer::Serializer;
pub use value::{
    Array, Date, Dictionary, Graph, Node, NodeId, Properties, Value, Vector, Xml, XmlKind,
};
pub use writer::MessageWriter;
