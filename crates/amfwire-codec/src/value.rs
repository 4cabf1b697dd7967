//! Value graph: scalar values plus an arena of identity-bearing nodes.
//!
//! Strings and numbers are plain values. Dates, byte arrays, arrays, objects,
//! dictionaries, XML documents and vectors live in a [`Graph`] and are
//! referenced through a [`NodeId`] handle. Identity is the handle: two
//! structurally equal arrays stored as separate nodes stay distinct on the
//! wire, while the same handle written twice becomes a back-reference.
//! Cycles are expressed by a node holding its own (or an ancestor's) handle.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;

use crate::object::{AmfObject, DynamicObject, Object};

/// Stable handle of a node inside a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Position of the node in its graph.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single AMF3 value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Written as the undefined marker; decodes as [`Value::Null`].
    Undefined,
    #[default]
    Null,
    Bool(bool),
    /// Integers inside the 29-bit range use the integer marker, others fall back to double.
    Integer(i64),
    Double(f64),
    String(String),
    /// Handle of an identity-bearing node.
    Node(NodeId),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Value::Node(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<NodeId> for Value {
    fn from(value: NodeId) -> Self {
        Value::Node(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Ordered string-keyed property map.
///
/// Keeps insertion order; re-inserting an existing name replaces the value in place.
/// Lookups go through a name index kept in step with the entry list.
#[derive(Clone, Default)]
pub struct Properties {
    entries: Vec<(String, Value)>,
    index: HashMap<String, usize>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Insert or replace a property, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let name = name.into();
        let value = value.into();
        if let Some(&pos) = self.index.get(&name) {
            return self
                .entries
                .get_mut(pos)
                .map(|(_, slot)| std::mem::replace(slot, value));
        }
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, value));
        None
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        let pos = *self.index.get(name)?;
        self.entries.get(pos).map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        let pos = *self.index.get(name)?;
        self.entries.get_mut(pos).map(|(_, value)| value)
    }

    /// Remove a property, preserving the order of the rest.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let pos = self.index.remove(name)?;
        let (_, value) = self.entries.remove(pos);
        for (key, _) in &self.entries[pos..] {
            if let Some(slot) = self.index.get_mut(key) {
                *slot -= 1;
            }
        }
        Some(value)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Sort entries by name (byte-wise lexical order).
    pub fn sort_by_name(&mut self) {
        self.entries.sort_by(|a, b| a.0.cmp(&b.0));
        self.reindex();
    }

    /// Insert every entry of `other`, replacing existing names.
    pub fn merge(&mut self, other: Properties) {
        for (name, value) in other {
            self.insert(name, value);
        }
    }

    fn reindex(&mut self) {
        for (pos, (key, _)) in self.entries.iter().enumerate() {
            if let Some(slot) = self.index.get_mut(key) {
                *slot = pos;
            }
        }
    }
}

impl PartialEq for Properties {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl fmt::Debug for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut props = Properties::new();
        for (name, value) in iter {
            props.insert(name, value);
        }
        props
    }
}

impl IntoIterator for Properties {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Point in time as milliseconds since the Unix epoch (UTC).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Date {
    millis: f64,
}

impl Date {
    pub fn from_millis(millis: f64) -> Self {
        Self { millis }
    }

    pub fn millis(&self) -> f64 {
        self.millis
    }

    pub fn from_system_time(time: SystemTime) -> Self {
        let millis = match time.duration_since(UNIX_EPOCH) {
            Ok(since) => since.as_millis() as f64,
            Err(err) => -(err.duration().as_millis() as f64),
        };
        Self { millis }
    }

    /// Convert back to `SystemTime`; `None` if the value is not finite.
    pub fn to_system_time(&self) -> Option<SystemTime> {
        if !self.millis.is_finite() {
            return None;
        }
        let offset = Duration::from_millis(self.millis.abs() as u64);
        if self.millis >= 0.0 {
            UNIX_EPOCH.checked_add(offset)
        } else {
            UNIX_EPOCH.checked_sub(offset)
        }
    }
}

/// ECMA array: a dense part plus optional associative (named) slots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Array {
    pub dense: Vec<Value>,
    pub named: Properties,
}

impl Array {
    pub fn new(dense: Vec<Value>) -> Self {
        Self {
            dense,
            named: Properties::new(),
        }
    }

    /// True if any associative slot is present.
    pub fn is_associative(&self) -> bool {
        !self.named.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty() && self.named.is_empty()
    }
}

/// Dictionary with arbitrary keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary {
    pub weak_keys: bool,
    pub entries: Vec<(Value, Value)>,
}

/// XML payload kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlKind {
    /// Legacy `flash.xml.XMLDocument` (marker 0x07).
    Document,
    /// E4X `XML` (marker 0x0B).
    E4x,
}

/// XML document carried as text.
#[derive(Debug, Clone, PartialEq)]
pub struct Xml {
    pub kind: XmlKind,
    pub text: String,
}

/// Typed AMF3 vector.
#[derive(Debug, Clone, PartialEq)]
pub enum Vector {
    Int { fixed: bool, items: Vec<i32> },
    UInt { fixed: bool, items: Vec<u32> },
    Double { fixed: bool, items: Vec<f64> },
    Object {
        fixed: bool,
        type_name: String,
        items: Vec<Value>,
    },
}

impl Vector {
    pub fn len(&self) -> usize {
        match self {
            Vector::Int { items, .. } => items.len(),
            Vector::UInt { items, .. } => items.len(),
            Vector::Double { items, .. } => items.len(),
            Vector::Object { items, .. } => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_fixed(&self) -> bool {
        match self {
            Vector::Int { fixed, .. }
            | Vector::UInt { fixed, .. }
            | Vector::Double { fixed, .. }
            | Vector::Object { fixed, .. } => *fixed,
        }
    }
}

/// An identity-bearing value stored in a [`Graph`].
#[derive(Debug)]
pub enum Node {
    Date(Date),
    ByteArray(Bytes),
    Array(Array),
    Object(Object),
    Dictionary(Dictionary),
    Xml(Xml),
    Vector(Vector),
}

impl Node {
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Date(_) => "date",
            Node::ByteArray(_) => "byte-array",
            Node::Array(_) => "array",
            Node::Object(_) => "object",
            Node::Dictionary(_) => "dictionary",
            Node::Xml(_) => "xml",
            Node::Vector(_) => "vector",
        }
    }
}

/// Arena of nodes addressed by [`NodeId`].
#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Store a node and return its handle.
    pub fn insert(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Node behind a value, if the value is a handle into this graph.
    pub fn resolve(&self, value: &Value) -> Option<&Node> {
        value.as_node().and_then(|id| self.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (NodeId(idx as u32), node))
    }

    /// Swap the content of an existing node.
    pub(crate) fn replace(&mut self, id: NodeId, node: Node) {
        if let Some(slot) = self.nodes.get_mut(id.index()) {
            *slot = node;
        }
    }

    /// Drop every node allocated at or after `len`.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.nodes.truncate(len);
    }

    pub fn array(&mut self, items: impl IntoIterator<Item = Value>) -> Value {
        let array = Array::new(items.into_iter().collect());
        Value::Node(self.insert(Node::Array(array)))
    }

    /// Anonymous dynamic object.
    pub fn object(&mut self, properties: Properties) -> Value {
        let object = DynamicObject::with_properties("", properties);
        Value::Node(self.insert(Node::Object(Object::Dynamic(object))))
    }

    /// Dynamic object carrying a remote type name.
    pub fn typed_object(&mut self, remote_name: &str, properties: Properties) -> Value {
        let object = DynamicObject::with_properties(remote_name, properties);
        Value::Node(self.insert(Node::Object(Object::Dynamic(object))))
    }

    pub fn native(&mut self, object: Box<dyn AmfObject>) -> Value {
        Value::Node(self.insert(Node::Object(Object::Native(object))))
    }

    pub fn date(&mut self, date: Date) -> Value {
        Value::Node(self.insert(Node::Date(date)))
    }

    pub fn byte_array(&mut self, bytes: impl Into<Bytes>) -> Value {
        Value::Node(self.insert(Node::ByteArray(bytes.into())))
    }

    pub fn dictionary(&mut self, entries: Vec<(Value, Value)>) -> Value {
        let dict = Dictionary {
            weak_keys: false,
            entries,
        };
        Value::Node(self.insert(Node::Dictionary(dict)))
    }

    pub fn as_array(&self, value: &Value) -> Option<&Array> {
        match self.resolve(value)? {
            Node::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_object(&self, value: &Value) -> Option<&Object> {
        match self.resolve(value)? {
            Node::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Structural comparison of `a` in this graph with `b` in `other`.
    ///
    /// Nodes are matched one-to-one: a node already paired with another node
    /// must be paired with the same node everywhere it occurs, so shared
    /// substructures and cycles must have the same shape on both sides.
    pub fn equivalent(&self, a: &Value, other: &Graph, b: &Value) -> bool {
        let mut pairing = Pairing::default();
        pairing.pair(a, b) && pairing.drain(self, other)
    }
}

/// Node pairing built breadth-first from a worklist, so depth costs heap, not stack.
#[derive(Default)]
struct Pairing {
    forward: HashMap<NodeId, NodeId>,
    backward: HashMap<NodeId, NodeId>,
    pending: Vec<(NodeId, NodeId)>,
}

impl Pairing {
    /// Compare scalars now; pair handles and queue their content.
    fn pair(&mut self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Node(x), Value::Node(y)) => {
                match (self.forward.get(x), self.backward.get(y)) {
                    (Some(mapped), _) => mapped == y,
                    (None, Some(_)) => false,
                    (None, None) => {
                        self.forward.insert(*x, *y);
                        self.backward.insert(*y, *x);
                        self.pending.push((*x, *y));
                        true
                    }
                }
            }
            (Value::Node(_), _) | (_, Value::Node(_)) => false,
            _ => a == b,
        }
    }

    fn drain(&mut self, lg: &Graph, rg: &Graph) -> bool {
        while let Some((x, y)) = self.pending.pop() {
            let (Some(left), Some(right)) = (lg.get(x), rg.get(y)) else {
                return false;
            };
            if !self.content(left, right) {
                return false;
            }
        }
        true
    }

    fn content(&mut self, left: &Node, right: &Node) -> bool {
        match (left, right) {
            (Node::Date(l), Node::Date(r)) => l == r,
            (Node::ByteArray(l), Node::ByteArray(r)) => l == r,
            (Node::Xml(l), Node::Xml(r)) => l == r,
            (Node::Array(l), Node::Array(r)) => {
                self.all(&l.dense, &r.dense) && self.properties(&l.named, &r.named)
            }
            (Node::Dictionary(l), Node::Dictionary(r)) => {
                l.weak_keys == r.weak_keys
                    && l.entries.len() == r.entries.len()
                    && l.entries.iter().zip(&r.entries).all(|((lk, lv), (rk, rv))| {
                        self.pair(lk, rk) && self.pair(lv, rv)
                    })
            }
            (Node::Vector(l), Node::Vector(r)) => match (l, r) {
                (
                    Vector::Object {
                        fixed: lf,
                        type_name: lt,
                        items: li,
                    },
                    Vector::Object {
                        fixed: rf,
                        type_name: rt,
                        items: ri,
                    },
                ) => lf == rf && lt == rt && self.all(li, ri),
                _ => l == r,
            },
            (Node::Object(l), Node::Object(r)) => self.objects(l, r),
            _ => false,
        }
    }

    fn all(&mut self, l: &[Value], r: &[Value]) -> bool {
        l.len() == r.len() && l.iter().zip(r).all(|(lv, rv)| self.pair(lv, rv))
    }

    fn objects(&mut self, l: &Object, r: &Object) -> bool {
        match (l, r) {
            (Object::Dynamic(l), Object::Dynamic(r)) => {
                l.remote_name() == r.remote_name()
                    && self.properties(l.properties(), r.properties())
            }
            (Object::Native(l), Object::Native(r)) => {
                l.type_name() == r.type_name()
                    && self.properties(&l.properties(), &r.properties())
            }
            _ => false,
        }
    }

    fn properties(&mut self, l: &Properties, r: &Properties) -> bool {
        l.len() == r.len()
            && l.iter().all(|(name, lv)| match r.get(name) {
                Some(rv) => self.pair(lv, rv),
                None => false,
            })
    }
}
