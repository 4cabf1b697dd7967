use bytes::Bytes;

use crate::config::CodecConfig;
use crate::deserializer::{Decoded, Deserializer};
use crate::error::Result;
use crate::mapping::ClassMapper;
use crate::serializer::Serializer;
use crate::value::{Graph, Value};

/// A single value together with the graph its handles point into.
#[derive(Debug, Default)]
pub struct Message {
    pub graph: Graph,
    pub value: Value,
}

impl Message {
    pub fn new(graph: Graph, value: Value) -> Self {
        Self { graph, value }
    }
}

/// Owned class mapper plus configuration; the usual entry point.
///
/// Each call builds a fresh serializer or deserializer, so reference tables
/// never leak between calls. Alias changes made through
/// [`mapper_mut`](Self::mapper_mut) apply to every later call.
#[derive(Debug, Clone, Default)]
pub struct Codec {
    mapper: ClassMapper,
    config: CodecConfig,
}

impl Codec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CodecConfig) -> Self {
        Self {
            mapper: ClassMapper::new(),
            config,
        }
    }

    pub fn with_mapper(mapper: ClassMapper, config: CodecConfig) -> Self {
        Self { mapper, config }
    }

    pub fn mapper(&self) -> &ClassMapper {
        &self.mapper
    }

    pub fn mapper_mut(&mut self) -> &mut ClassMapper {
        &mut self.mapper
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut CodecConfig {
        &mut self.config
    }

    /// Encode one value graph as a single message.
    pub fn serialize(&self, graph: &Graph, value: &Value) -> Result<Bytes> {
        Serializer::with_config(&self.mapper, self.config.clone()).serialize(graph, value)
    }

    pub fn serialize_message(&self, message: &Message) -> Result<Bytes> {
        self.serialize(&message.graph, &message.value)
    }

    /// Decode every complete message in `source`.
    pub fn deserialize<'a>(&self, source: impl Into<Option<&'a [u8]>>) -> Result<Decoded> {
        let source: Option<&'a [u8]> = source.into();
        Deserializer::with_config(&self.mapper, self.config.clone()).deserialize(source)
    }
}
