//! Value graph to AMF3 bytes.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, trace};

use crate::cache::WriteCaches;
use crate::config::CodecConfig;
use crate::error::{AmfError, Result};
use crate::mapping::ClassMapper;
use crate::marker;
use crate::object::{Object, Traits, ARRAY_COLLECTION_CLASS};
use crate::primitive::{put_i29, put_u29, U29_MASK};
use crate::value::{Array, Graph, Node, NodeId, Properties, Value, Vector, XmlKind};

/// Reentrant AMF3 writer.
///
/// A top-level [`serialize`](Self::serialize) call starts with empty
/// reference tables. Calls made from inside a custom encode hook while the
/// outer call is still running share those tables and append to the same
/// output, so references across the hook boundary stay valid.
#[derive(Debug)]
pub struct Serializer<'m> {
    mapper: &'m ClassMapper,
    config: CodecConfig,
    out: BytesMut,
    depth: usize,
    nesting: usize,
    caches: WriteCaches,
}

impl<'m> Serializer<'m> {
    pub fn new(mapper: &'m ClassMapper) -> Self {
        Self::with_config(mapper, CodecConfig::default())
    }

    pub fn with_config(mapper: &'m ClassMapper, config: CodecConfig) -> Self {
        Self {
            mapper,
            config,
            out: BytesMut::new(),
            depth: 0,
            nesting: 0,
            caches: WriteCaches::default(),
        }
    }

    pub fn mapper(&self) -> &ClassMapper {
        self.mapper
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Encode `value` and everything reachable from it.
    ///
    /// At top level, returns the encoded message. When nested inside another
    /// `serialize` call the bytes are appended to the outer message and an
    /// empty buffer is returned.
    pub fn serialize(&mut self, graph: &Graph, value: &Value) -> Result<Bytes> {
        if self.depth == 0 {
            self.caches.reset();
            self.nesting = 0;
        }
        self.depth += 1;
        let result = self.write_value(graph, value);
        self.depth -= 1;

        if self.depth > 0 {
            return result.map(|()| Bytes::new());
        }

        self.caches.reset();
        match result {
            Ok(()) => {
                trace!(bytes = self.out.len(), "serialized message");
                Ok(self.out.split().freeze())
            }
            Err(err) => {
                self.out.clear();
                Err(err)
            }
        }
    }

    /// Write a value with its type marker.
    pub fn write_value(&mut self, graph: &Graph, value: &Value) -> Result<()> {
        match value {
            Value::Undefined => self.out.put_u8(marker::UNDEFINED),
            Value::Null => self.out.put_u8(marker::NULL),
            Value::Bool(false) => self.out.put_u8(marker::FALSE),
            Value::Bool(true) => self.out.put_u8(marker::TRUE),
            Value::Integer(n) => self.write_integer(*n),
            Value::Double(d) => {
                self.out.put_u8(marker::DOUBLE);
                self.out.put_f64(*d);
            }
            Value::String(s) => {
                self.out.put_u8(marker::STRING);
                self.write_utf8(s)?;
            }
            Value::Node(id) => {
                if self.nesting >= self.config.max_depth {
                    return Err(AmfError::DepthLimitExceeded {
                        max: self.config.max_depth,
                    });
                }
                self.nesting += 1;
                let result = self.write_node(graph, *id);
                self.nesting -= 1;
                return result;
            }
        }
        Ok(())
    }

    fn write_integer(&mut self, n: i64) {
        if marker::fits_integer(n) {
            self.out.put_u8(marker::INTEGER);
            put_i29(&mut self.out, n);
        } else {
            self.out.put_u8(marker::DOUBLE);
            self.out.put_f64(n as f64);
        }
    }

    fn write_node(&mut self, graph: &Graph, id: NodeId) -> Result<()> {
        let node = lookup(graph, id)?;
        match node {
            Node::Object(Object::Native(native)) => match native.codec() {
                Some(codec) => codec.encode_amf(self, graph, id),
                None => self.write_object(graph, id, None, None),
            },
            Node::Object(Object::Dynamic(_)) => self.write_object(graph, id, None, None),
            Node::Array(_) => self.write_array(graph, id),
            Node::Date(date) => {
                self.out.put_u8(marker::DATE);
                if self.write_reference(id)? {
                    return Ok(());
                }
                self.out.put_u8(marker::DATE_INLINE);
                self.out.put_f64(date.millis());
                Ok(())
            }
            Node::ByteArray(bytes) => {
                self.out.put_u8(marker::BYTE_ARRAY);
                if self.write_reference(id)? {
                    return Ok(());
                }
                self.write_inline_len(bytes.len())?;
                self.out.put_slice(bytes);
                Ok(())
            }
            Node::Dictionary(dict) => {
                self.out.put_u8(marker::DICTIONARY);
                if self.write_reference(id)? {
                    return Ok(());
                }
                self.write_inline_len(dict.entries.len())?;
                self.out.put_u8(u8::from(dict.weak_keys));
                for (key, value) in &dict.entries {
                    self.write_value(graph, key)?;
                    self.write_value(graph, value)?;
                }
                Ok(())
            }
            Node::Xml(xml) => {
                self.out.put_u8(match xml.kind {
                    XmlKind::Document => marker::XML_DOC,
                    XmlKind::E4x => marker::XML,
                });
                if self.write_reference(id)? {
                    return Ok(());
                }
                self.write_inline_len(xml.text.len())?;
                self.out.put_slice(xml.text.as_bytes());
                Ok(())
            }
            Node::Vector(vector) => self.write_vector(graph, id, vector),
        }
    }

    fn write_vector(&mut self, graph: &Graph, id: NodeId, vector: &Vector) -> Result<()> {
        self.out.put_u8(match vector {
            Vector::Int { .. } => marker::VECTOR_INT,
            Vector::UInt { .. } => marker::VECTOR_UINT,
            Vector::Double { .. } => marker::VECTOR_DOUBLE,
            Vector::Object { .. } => marker::VECTOR_OBJECT,
        });
        if self.write_reference(id)? {
            return Ok(());
        }
        self.write_inline_len(vector.len())?;
        self.out.put_u8(u8::from(vector.is_fixed()));

        match vector {
            Vector::Int { items, .. } => items.iter().for_each(|v| self.out.put_i32(*v)),
            Vector::UInt { items, .. } => items.iter().for_each(|v| self.out.put_u32(*v)),
            Vector::Double { items, .. } => items.iter().for_each(|v| self.out.put_f64(*v)),
            Vector::Object {
                type_name, items, ..
            } => {
                self.write_utf8(type_name)?;
                for item in items {
                    self.write_value(graph, item)?;
                }
            }
        }
        Ok(())
    }

    /// Write an array node, honoring `use_array_collection` for plain arrays.
    pub fn write_array(&mut self, graph: &Graph, id: NodeId) -> Result<()> {
        let array = match lookup(graph, id)? {
            Node::Array(array) => array,
            other => {
                return Err(AmfError::UnexpectedNode {
                    expected: "array",
                    found: other.kind(),
                })
            }
        };

        if self.config.use_array_collection && !array.is_associative() {
            self.out.put_u8(marker::OBJECT);
            if self.write_reference(id)? {
                return Ok(());
            }
            // The wrapper and its source array each take an object slot.
            self.caches.objects.skip();
            self.write_traits(&Traits::externalizable(ARRAY_COLLECTION_CLASS))?;
            self.out.put_u8(marker::ARRAY);
        } else {
            self.out.put_u8(marker::ARRAY);
            if self.write_reference(id)? {
                return Ok(());
            }
        }

        self.write_array_body(graph, array)
    }

    fn write_array_body(&mut self, graph: &Graph, array: &Array) -> Result<()> {
        self.write_inline_len(array.dense.len())?;
        for (name, value) in array.named.iter() {
            if name.is_empty() {
                debug!("skipping associative array entry with empty name");
                continue;
            }
            self.write_utf8(name)?;
            self.write_value(graph, value)?;
        }
        self.out.put_u8(marker::CLOSE_DYNAMIC_ARRAY);
        for value in &array.dense {
            self.write_value(graph, value)?;
        }
        Ok(())
    }

    /// Write an object node through the traits/property pipeline.
    ///
    /// `properties` replaces the mapper's property extraction and `traits`
    /// replaces the default anonymous-or-aliased dynamic traits. Hooks use
    /// these to write sealed or externalizable layouts.
    pub fn write_object(
        &mut self,
        graph: &Graph,
        id: NodeId,
        properties: Option<Properties>,
        traits: Option<Traits>,
    ) -> Result<()> {
        let object = match lookup(graph, id)? {
            Node::Object(object) => object,
            other => {
                return Err(AmfError::UnexpectedNode {
                    expected: "object",
                    found: other.kind(),
                })
            }
        };

        self.out.put_u8(marker::OBJECT);
        if self.write_reference(id)? {
            return Ok(());
        }

        let traits = traits.unwrap_or_else(|| Traits::dynamic(self.mapper.remote_name_for(object)));
        self.write_traits(&traits)?;

        if traits.externalizable {
            let codec = match object {
                Object::Native(native) => native.codec(),
                Object::Dynamic(_) => None,
            };
            return match codec {
                Some(codec) => codec.write_external(self, graph),
                None => Err(AmfError::NotExternalizable(
                    traits.remote_name().to_string(),
                )),
            };
        }

        let mut properties = properties.unwrap_or_else(|| self.mapper.extract_properties(object));

        for member in &traits.members {
            let value = properties.remove(member).unwrap_or_default();
            self.write_value(graph, &value)?;
        }

        if traits.dynamic {
            if self.config.sort_dynamic_properties {
                properties.sort_by_name();
            }
            for (name, value) in properties.iter() {
                if name.is_empty() {
                    debug!("skipping dynamic property with empty name");
                    continue;
                }
                self.write_utf8(name)?;
                self.write_value(graph, value)?;
            }
            self.out.put_u8(marker::CLOSE_DYNAMIC_OBJECT);
        }

        Ok(())
    }

    /// Write a traits reference if this shape was already written, else the full header.
    fn write_traits(&mut self, traits: &Traits) -> Result<()> {
        let key = traits.normalized();
        if let Some(index) = self.caches.traits.get(&key) {
            put_u29(&mut self.out, u29_field(index, 2)? | 0x01);
            return Ok(());
        }

        let mut header = u29_field(traits.members.len(), 4)? | 0x03;
        if traits.externalizable {
            header |= 0x01 << 2;
        }
        if traits.dynamic {
            header |= 0x02 << 2;
        }
        put_u29(&mut self.out, header);

        self.write_utf8(traits.remote_name())?;
        for member in &traits.members {
            self.write_utf8(member)?;
        }
        self.caches.traits.add(key);
        Ok(())
    }

    /// Emit a back-reference if `id` was already written; otherwise register it.
    fn write_reference(&mut self, id: NodeId) -> Result<bool> {
        if let Some(index) = self.caches.objects.get(&id) {
            put_u29(&mut self.out, u29_field(index, 1)?);
            return Ok(true);
        }
        self.caches.objects.add(id);
        Ok(false)
    }

    fn write_inline_len(&mut self, len: usize) -> Result<()> {
        put_u29(&mut self.out, u29_field(len, 1)? | 1);
        Ok(())
    }

    /// Write a string body (no marker) through the string table.
    pub fn write_utf8(&mut self, s: &str) -> Result<()> {
        if s.is_empty() {
            self.out.put_u8(marker::EMPTY_STRING);
            return Ok(());
        }
        if let Some(index) = self.caches.strings.get(s) {
            put_u29(&mut self.out, u29_field(index, 1)?);
            return Ok(());
        }
        self.write_inline_len(s.len())?;
        self.caches.add_string(s);
        self.out.put_slice(s.as_bytes());
        Ok(())
    }

    pub fn write_u8(&mut self, byte: u8) {
        self.out.put_u8(byte);
    }

    pub fn write_u29(&mut self, value: u32) {
        put_u29(&mut self.out, value);
    }

    pub fn write_double(&mut self, value: f64) {
        self.out.put_f64(value);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.out.put_slice(bytes);
    }
}

/// Shift `value` into a U29 field whose low `shift` bits carry flags.
fn u29_field(value: usize, shift: u32) -> Result<u32> {
    let max = (U29_MASK >> shift) as usize;
    if value > max {
        return Err(AmfError::LengthOverflow { len: value, max });
    }
    Ok((value as u32) << shift)
}

fn lookup(graph: &Graph, id: NodeId) -> Result<&Node> {
    graph
        .get(id)
        .ok_or(AmfError::UnknownNode(id.index() as u32))
}
