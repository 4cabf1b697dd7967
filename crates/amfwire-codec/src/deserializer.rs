//! AMF3 bytes to value graph.

use bytes::Bytes;
use tracing::{debug, trace};

use crate::cache::ReadCaches;
use crate::config::CodecConfig;
use crate::error::{AmfError, Result};
use crate::mapping::ClassMapper;
use crate::marker;
use crate::object::{DynamicObject, Object, Traits};
use crate::primitive::{get_f64, get_i29, get_i32, get_slice, get_u29, get_u32, get_u8};
use crate::value::{
    Array, Date, Dictionary, Graph, Node, NodeId, Properties, Value, Vector, Xml, XmlKind,
};

/// Result of decoding a buffer.
#[derive(Debug)]
pub struct Decoded {
    /// Arena holding every node referenced from `values`.
    pub graph: Graph,
    /// One value per complete message, in stream order.
    pub values: Vec<Value>,
    /// Bytes of a trailing incomplete message, to be prefixed to the next read.
    pub leftover: Option<Bytes>,
    /// Number of input bytes that produced `values`.
    pub consumed: usize,
}

/// AMF3 reader over an in-memory buffer.
///
/// Each message in the buffer is decoded with fresh reference tables. A
/// message cut short by the end of the buffer is not an error: decoding
/// stops there and its bytes are returned as [`Decoded::leftover`].
#[derive(Debug)]
pub struct Deserializer<'a> {
    mapper: &'a ClassMapper,
    config: CodecConfig,
    src: &'a [u8],
    graph: Graph,
    caches: ReadCaches,
    depth: usize,
}

impl<'a> Deserializer<'a> {
    pub fn new(mapper: &'a ClassMapper) -> Self {
        Self::with_config(mapper, CodecConfig::default())
    }

    pub fn with_config(mapper: &'a ClassMapper, config: CodecConfig) -> Self {
        Self {
            mapper,
            config,
            src: &[],
            graph: Graph::new(),
            caches: ReadCaches::default(),
            depth: 0,
        }
    }

    /// Decode every complete message in `source`.
    pub fn deserialize(mut self, source: impl Into<Option<&'a [u8]>>) -> Result<Decoded> {
        let source = source.into().ok_or(AmfError::MissingSource)?;
        self.src = source;

        let mut values = Vec::new();
        let mut leftover = None;

        while !self.src.is_empty() {
            let snapshot = self.src;
            let nodes = self.graph.len();
            self.caches.reset();
            self.depth = 0;

            match self.read_value() {
                Ok(value) => {
                    trace!(
                        bytes = snapshot.len() - self.src.len(),
                        "decoded message"
                    );
                    values.push(value);
                }
                Err(AmfError::IncompleteData) => {
                    debug!(pending = snapshot.len(), "incomplete message, keeping leftover");
                    self.graph.truncate(nodes);
                    leftover = Some(Bytes::copy_from_slice(snapshot));
                    self.src = &[];
                    break;
                }
                Err(err) => return Err(err),
            }
        }

        let consumed = source.len() - leftover.as_ref().map_or(0, Bytes::len);
        Ok(Decoded {
            graph: self.graph,
            values,
            leftover,
            consumed,
        })
    }

    /// Nodes decoded so far.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// Unread bytes of the current buffer.
    pub fn remaining(&self) -> &'a [u8] {
        self.src
    }

    /// Read one marker-prefixed value.
    pub fn read_value(&mut self) -> Result<Value> {
        if self.depth >= self.config.max_depth {
            return Err(AmfError::DepthLimitExceeded {
                max: self.config.max_depth,
            });
        }
        self.depth += 1;
        let result = self.read_marked();
        self.depth -= 1;
        result
    }

    fn read_marked(&mut self) -> Result<Value> {
        let tag = get_u8(&mut self.src)?;
        match tag {
            marker::UNDEFINED | marker::NULL => Ok(Value::Null),
            marker::FALSE => Ok(Value::Bool(false)),
            marker::TRUE => Ok(Value::Bool(true)),
            marker::INTEGER => Ok(Value::Integer(i64::from(get_i29(&mut self.src)?))),
            marker::DOUBLE => {
                let value = get_f64(&mut self.src)?;
                Ok(if value.is_nan() {
                    Value::Null
                } else {
                    Value::Double(value)
                })
            }
            marker::STRING => Ok(Value::String(self.read_utf8()?)),
            marker::DATE => self.read_date(),
            marker::ARRAY => self.read_array(),
            marker::OBJECT => self.read_object(),
            marker::BYTE_ARRAY => self.read_byte_array(),
            marker::DICTIONARY => self.read_dictionary(),
            m if marker::is_extended(m) && !self.config.extended_types => {
                debug!(marker = marker::marker_name(m), "extended types are disabled");
                Err(AmfError::UnsupportedType(m))
            }
            marker::XML_DOC => self.read_xml(XmlKind::Document),
            marker::XML => self.read_xml(XmlKind::E4x),
            marker::VECTOR_INT
            | marker::VECTOR_UINT
            | marker::VECTOR_DOUBLE
            | marker::VECTOR_OBJECT => self.read_vector(tag),
            other => Err(AmfError::InvalidMarker(other)),
        }
    }

    /// Read a string body (no marker) through the string table.
    pub fn read_utf8(&mut self) -> Result<String> {
        let header = get_u29(&mut self.src)?;
        if header & 1 == 0 {
            return self.caches.string((header >> 1) as usize).map(str::to_string);
        }

        let len = (header >> 1) as usize;
        if len == 0 {
            return Ok(String::new());
        }
        let bytes = get_slice(&mut self.src, len)?;
        let s = String::from_utf8(bytes.to_vec())?;
        self.caches.strings.push(s.clone());
        Ok(s)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        get_u8(&mut self.src)
    }

    pub fn read_u29(&mut self) -> Result<u32> {
        get_u29(&mut self.src)
    }

    pub fn read_double(&mut self) -> Result<f64> {
        get_f64(&mut self.src)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        get_slice(&mut self.src, len)
    }

    /// Read the reference-or-inline header. `Err` carries the resolved reference.
    fn read_header(&mut self) -> Result<std::result::Result<usize, Value>> {
        let header = get_u29(&mut self.src)?;
        if header & 1 == 0 {
            return Ok(Err(self.caches.object((header >> 1) as usize)?));
        }
        Ok(Ok((header >> 1) as usize))
    }

    /// Store a finished leaf node and register it in the object table.
    fn register(&mut self, node: Node) -> Value {
        let value = Value::Node(self.graph.insert(node));
        self.caches.objects.push(value.clone());
        value
    }

    /// Register a placeholder to be filled once its children are decoded.
    fn reserve(&mut self) -> NodeId {
        let id = self
            .graph
            .insert(Node::Object(Object::Dynamic(DynamicObject::default())));
        self.caches.objects.push(Value::Node(id));
        id
    }

    /// Pre-allocation bound for a declared element count.
    fn capacity(&self, count: usize) -> usize {
        count.min(self.src.len())
    }

    fn read_date(&mut self) -> Result<Value> {
        let header = get_u29(&mut self.src)?;
        if header & 1 == 0 {
            return self.caches.object((header >> 1) as usize);
        }
        let millis = get_f64(&mut self.src)?;
        Ok(self.register(Node::Date(Date::from_millis(millis))))
    }

    fn read_byte_array(&mut self) -> Result<Value> {
        let len = match self.read_header()? {
            Ok(len) => len,
            Err(reference) => return Ok(reference),
        };
        let bytes = Bytes::copy_from_slice(get_slice(&mut self.src, len)?);
        Ok(self.register(Node::ByteArray(bytes)))
    }

    fn read_xml(&mut self, kind: XmlKind) -> Result<Value> {
        let len = match self.read_header()? {
            Ok(len) => len,
            Err(reference) => return Ok(reference),
        };
        let text = String::from_utf8(get_slice(&mut self.src, len)?.to_vec())?;
        Ok(self.register(Node::Xml(Xml { kind, text })))
    }

    fn read_array(&mut self) -> Result<Value> {
        let count = match self.read_header()? {
            Ok(count) => count,
            Err(reference) => return Ok(reference),
        };
        let id = self.reserve();

        let mut named = Properties::new();
        loop {
            let name = self.read_utf8()?;
            if name.is_empty() {
                break;
            }
            let value = self.read_value()?;
            named.insert(name, value);
        }

        let mut dense = Vec::with_capacity(self.capacity(count));
        for _ in 0..count {
            dense.push(self.read_value()?);
        }

        self.graph.replace(id, Node::Array(Array { dense, named }));
        Ok(Value::Node(id))
    }

    fn read_dictionary(&mut self) -> Result<Value> {
        let count = match self.read_header()? {
            Ok(count) => count,
            Err(reference) => return Ok(reference),
        };
        let weak_keys = get_u8(&mut self.src)? != 0;
        let id = self.reserve();

        let mut entries = Vec::with_capacity(self.capacity(count));
        for _ in 0..count {
            let key = self.read_value()?;
            let value = self.read_value()?;
            entries.push((key, value));
        }

        self.graph
            .replace(id, Node::Dictionary(Dictionary { weak_keys, entries }));
        Ok(Value::Node(id))
    }

    fn read_vector(&mut self, kind: u8) -> Result<Value> {
        let count = match self.read_header()? {
            Ok(count) => count,
            Err(reference) => return Ok(reference),
        };
        let fixed = get_u8(&mut self.src)? != 0;

        let vector = match kind {
            marker::VECTOR_INT => {
                let mut items = Vec::with_capacity(self.capacity(count));
                for _ in 0..count {
                    items.push(get_i32(&mut self.src)?);
                }
                Vector::Int { fixed, items }
            }
            marker::VECTOR_UINT => {
                let mut items = Vec::with_capacity(self.capacity(count));
                for _ in 0..count {
                    items.push(get_u32(&mut self.src)?);
                }
                Vector::UInt { fixed, items }
            }
            marker::VECTOR_DOUBLE => {
                let mut items = Vec::with_capacity(self.capacity(count));
                for _ in 0..count {
                    items.push(get_f64(&mut self.src)?);
                }
                Vector::Double { fixed, items }
            }
            _ => {
                let type_name = self.read_utf8()?;
                let id = self.reserve();
                let mut items = Vec::with_capacity(self.capacity(count));
                for _ in 0..count {
                    items.push(self.read_value()?);
                }
                let vector = Vector::Object {
                    fixed,
                    type_name,
                    items,
                };
                self.graph.replace(id, Node::Vector(vector));
                return Ok(Value::Node(id));
            }
        };

        Ok(self.register(Node::Vector(vector)))
    }

    fn read_traits(&mut self, class_type: u32) -> Result<Traits> {
        if class_type & 0x01 == 0 {
            return self.caches.trait_at((class_type >> 1) as usize);
        }

        let externalizable = class_type & 0x02 != 0;
        let dynamic = class_type & 0x04 != 0;
        let count = class_type >> 3;

        let class_name = self.read_utf8()?;
        let mut members = Vec::with_capacity(self.capacity(count as usize));
        for _ in 0..count {
            members.push(self.read_utf8()?);
        }

        let traits = Traits {
            class_name: (!class_name.is_empty()).then_some(class_name),
            members,
            dynamic,
            externalizable,
        };
        self.caches.traits.push(traits.clone());
        Ok(traits)
    }

    fn read_object(&mut self) -> Result<Value> {
        let header = get_u29(&mut self.src)?;
        if header & 1 == 0 {
            return self.caches.object((header >> 1) as usize);
        }

        let traits = self.read_traits(header >> 1)?;
        let mut object = self.mapper.instantiate(traits.remote_name());
        let id = self.reserve();

        if traits.externalizable {
            let codec = match &mut object {
                Object::Native(native) => native.codec_mut(),
                Object::Dynamic(_) => None,
            };
            match codec {
                Some(codec) => codec.read_external(self)?,
                None => {
                    return Err(AmfError::NotExternalizable(
                        traits.remote_name().to_string(),
                    ))
                }
            }
        } else {
            let mut properties = Properties::with_capacity(traits.members.len());
            for member in &traits.members {
                let value = self.read_value()?;
                properties.insert(member.clone(), value);
            }

            if traits.dynamic {
                loop {
                    let name = self.read_utf8()?;
                    if name.is_empty() {
                        break;
                    }
                    let value = self.read_value()?;
                    properties.insert(name, value);
                }
            }

            self.mapper.populate(&mut object, properties);
        }

        self.graph.replace(id, Node::Object(object));
        Ok(Value::Node(id))
    }
}
