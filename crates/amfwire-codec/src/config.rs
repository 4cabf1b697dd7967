/// Default maximum buffered message size for the stream adapters: 16 MiB.
pub const DEFAULT_MAX_MESSAGE: usize = 16 * 1024 * 1024;

/// Default limit on value nesting for the serializer and deserializer.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Configuration shared by the serializer, deserializer and stream adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    /// Write dynamic property names in lexical order. Default: true.
    pub sort_dynamic_properties: bool,
    /// Write plain arrays wrapped in `flex.messaging.io.ArrayCollection`. Default: false.
    pub use_array_collection: bool,
    /// Decode XML and vector markers instead of rejecting them. Default: true.
    pub extended_types: bool,
    /// Maximum bytes a stream adapter buffers for one message. Default: 16 MiB.
    pub max_message_size: usize,
    /// Deepest nesting of arrays, objects, dictionaries and vectors. Default: 512.
    pub max_depth: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            sort_dynamic_properties: true,
            use_array_collection: false,
            extended_types: true,
            max_message_size: DEFAULT_MAX_MESSAGE,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}
