//! JSON view of a decoded value graph, and the reverse mapping used by `encode`.
//!
//! Plain arrays, anonymous objects and scalars map onto their JSON
//! counterparts. Everything else is an object with `$`-prefixed keys:
//!
//! - `{"$date": millis}`
//! - `{"$bytes": "hex"}`
//! - `{"$class": "com.example.Type", ...properties}`
//! - `{"$items": [...], ...named}` for arrays with associative slots
//! - `{"$dictionary": [[key, value], ...], "$weak": true}`
//! - `{"$xml": "...", "$kind": "document" | "e4x"}`
//! - `{"$vector": "int" | "uint" | "double" | "object:Type", "$fixed": false, "$items": [...]}`
//!
//! A node reached more than once carries `"$id": n` on its first occurrence
//! and every later occurrence becomes `{"$ref": n}`, so shared substructure
//! and cycles survive the trip and the output stays linear in the graph size.

use std::collections::{HashMap, HashSet};

use amfwire_codec::{
    Array, ClassMapper, Date, Dictionary, Graph, Node, NodeId, Object, Properties, Value, Vector,
    Xml, XmlKind,
};
use serde_json::{json, Map, Number, Value as Json};

use crate::exit::{CliError, CliResult, DATA_INVALID};

const ID: &str = "$id";
const REF: &str = "$ref";
const CLASS: &str = "$class";
const ITEMS: &str = "$items";
const DATE: &str = "$date";
const BYTES: &str = "$bytes";
const DICTIONARY: &str = "$dictionary";
const WEAK: &str = "$weak";
const XML: &str = "$xml";
const KIND: &str = "$kind";
const VECTOR: &str = "$vector";
const FIXED: &str = "$fixed";

pub fn to_json(graph: &Graph, mapper: &ClassMapper, value: &Value) -> Json {
    JsonWriter {
        graph,
        mapper,
        shared: find_shared(graph, value),
        emitted: HashSet::new(),
    }
    .value(value)
}

/// Collect nodes reached more than once, through sharing or a cycle.
fn find_shared(graph: &Graph, root: &Value) -> HashSet<NodeId> {
    let mut seen = HashSet::new();
    let mut shared = HashSet::new();
    let mut pending = vec![root.clone()];
    while let Some(value) = pending.pop() {
        let Value::Node(id) = value else {
            continue;
        };
        if !seen.insert(id) {
            shared.insert(id);
            continue;
        }
        if let Some(node) = graph.get(id) {
            pending.extend(children(node));
        }
    }
    shared
}

fn children(node: &Node) -> Vec<Value> {
    match node {
        Node::Array(array) => array
            .dense
            .iter()
            .cloned()
            .chain(array.named.iter().map(|(_, value)| value.clone()))
            .collect(),
        Node::Object(object) => object.properties().into_iter().map(|(_, v)| v).collect(),
        Node::Dictionary(dict) => dict
            .entries
            .iter()
            .flat_map(|(key, value)| [key.clone(), value.clone()])
            .collect(),
        Node::Vector(Vector::Object { items, .. }) => items.clone(),
        _ => Vec::new(),
    }
}

struct JsonWriter<'g> {
    graph: &'g Graph,
    mapper: &'g ClassMapper,
    shared: HashSet<NodeId>,
    emitted: HashSet<NodeId>,
}

impl JsonWriter<'_> {
    fn value(&mut self, value: &Value) -> Json {
        match value {
            Value::Undefined | Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Integer(n) => Json::from(*n),
            Value::Double(d) => Number::from_f64(*d).map_or(Json::Null, Json::Number),
            Value::String(s) => Json::String(s.clone()),
            Value::Node(id) => self.node(*id),
        }
    }

    fn node(&mut self, id: NodeId) -> Json {
        if self.emitted.contains(&id) {
            return json!({ REF: id.index() });
        }
        let graph = self.graph;
        let Some(node) = graph.get(id) else {
            return Json::Null;
        };
        self.emitted.insert(id);
        let tagged = self.shared.contains(&id);
        let mut out = match node {
            Node::Date(date) => json!({ DATE: date.millis() }),
            Node::ByteArray(bytes) => json!({ BYTES: hex::encode(bytes) }),
            Node::Array(array) => self.array(array, tagged),
            Node::Object(object) => self.object(object),
            Node::Dictionary(dict) => self.dictionary(dict),
            Node::Xml(xml) => {
                let kind = match xml.kind {
                    XmlKind::Document => "document",
                    XmlKind::E4x => "e4x",
                };
                json!({ XML: xml.text, KIND: kind })
            }
            Node::Vector(vector) => self.vector(vector),
        };

        if tagged {
            if let Json::Object(map) = &mut out {
                map.insert(ID.to_string(), Json::from(id.index()));
            }
        }
        out
    }

    fn array(&mut self, array: &Array, tagged: bool) -> Json {
        let items: Vec<Json> = array.dense.iter().map(|item| self.value(item)).collect();
        if !array.is_associative() && !tagged {
            return Json::Array(items);
        }
        let mut map = Map::new();
        map.insert(ITEMS.to_string(), Json::Array(items));
        for (name, value) in array.named.iter() {
            map.insert(name.to_string(), self.value(value));
        }
        Json::Object(map)
    }

    fn object(&mut self, object: &Object) -> Json {
        let mut map = Map::new();
        let class = match object {
            Object::Native(native) => Some(
                self.mapper
                    .remote_name_for(object)
                    .unwrap_or_else(|| native.type_name().to_string()),
            ),
            Object::Dynamic(_) => self.mapper.remote_name_for(object),
        };
        if let Some(class) = class {
            map.insert(CLASS.to_string(), Json::String(class));
        }
        for (name, value) in object.properties().iter() {
            map.insert(name.to_string(), self.value(value));
        }
        Json::Object(map)
    }

    fn dictionary(&mut self, dict: &Dictionary) -> Json {
        let entries: Vec<Json> = dict
            .entries
            .iter()
            .map(|(key, value)| json!([self.value(key), self.value(value)]))
            .collect();
        let mut map = Map::new();
        map.insert(DICTIONARY.to_string(), Json::Array(entries));
        if dict.weak_keys {
            map.insert(WEAK.to_string(), Json::Bool(true));
        }
        Json::Object(map)
    }

    fn vector(&mut self, vector: &Vector) -> Json {
        let (kind, items): (String, Vec<Json>) = match vector {
            Vector::Int { items, .. } => ("int".into(), items.iter().map(|n| json!(n)).collect()),
            Vector::UInt { items, .. } => ("uint".into(), items.iter().map(|n| json!(n)).collect()),
            Vector::Double { items, .. } => (
                "double".into(),
                items
                    .iter()
                    .map(|d| Number::from_f64(*d).map_or(Json::Null, Json::Number))
                    .collect(),
            ),
            Vector::Object {
                type_name, items, ..
            } => (
                format!("object:{type_name}"),
                items.iter().map(|item| self.value(item)).collect(),
            ),
        };
        json!({ VECTOR: kind, FIXED: vector.is_fixed(), ITEMS: items })
    }
}

/// Build graph values from JSON using the conventions of [`to_json`].
///
/// Every `$id` in the document is reserved up front, so a `$ref` may name a
/// node that appears before, around or after it regardless of key order.
pub fn from_json(graph: &mut Graph, mapper: &ClassMapper, json: &Json) -> CliResult<Value> {
    let mut reader = JsonReader {
        graph,
        mapper,
        ids: HashMap::new(),
    };
    reader.reserve_ids(json)?;
    reader.value(json)
}

struct JsonReader<'g> {
    graph: &'g mut Graph,
    mapper: &'g ClassMapper,
    ids: HashMap<u64, NodeId>,
}

impl JsonReader<'_> {
    /// Allocate a placeholder node for every `$id` tag.
    fn reserve_ids(&mut self, root: &Json) -> CliResult<()> {
        let mut pending = vec![root];
        while let Some(json) = pending.pop() {
            match json {
                Json::Array(items) => pending.extend(items),
                Json::Object(map) => {
                    if let Some(tag) = map.get(ID) {
                        let tag = tag.as_u64().ok_or_else(|| {
                            invalid(format!("{ID} must be a non-negative integer"))
                        })?;
                        if self.ids.contains_key(&tag) {
                            return Err(invalid(format!("{ID} {tag} is used more than once")));
                        }
                        let id = self.graph.insert(Node::Array(Array::default()));
                        self.ids.insert(tag, id);
                    }
                    pending.extend(map.values());
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn value(&mut self, json: &Json) -> CliResult<Value> {
        Ok(match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Double(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::String(s.clone()),
            Json::Array(items) => {
                let items = self.values(items)?;
                self.graph.array(items)
            }
            Json::Object(map) => {
                if let Some(target) = map.get(REF) {
                    let id = target
                        .as_u64()
                        .and_then(|n| self.ids.get(&n))
                        .ok_or_else(|| invalid(format!("{REF} {target} does not name a $id")))?;
                    return Ok(Value::Node(*id));
                }
                let node = self.node(map)?;
                Value::Node(self.place(map, node))
            }
        })
    }

    fn values(&mut self, items: &[Json]) -> CliResult<Vec<Value>> {
        items.iter().map(|item| self.value(item)).collect()
    }

    /// Store a finished node in its reserved slot, or append it.
    fn place(&mut self, map: &Map<String, Json>, node: Node) -> NodeId {
        let reserved = map
            .get(ID)
            .and_then(Json::as_u64)
            .and_then(|tag| self.ids.get(&tag).copied());
        match reserved {
            Some(id) => {
                if let Some(slot) = self.graph.get_mut(id) {
                    *slot = node;
                }
                id
            }
            None => self.graph.insert(node),
        }
    }

    fn node(&mut self, map: &Map<String, Json>) -> CliResult<Node> {
        if let Some(millis) = map.get(DATE) {
            let millis = millis
                .as_f64()
                .ok_or_else(|| invalid(format!("{DATE} must be a number of milliseconds")))?;
            return Ok(Node::Date(Date::from_millis(millis)));
        }
        if let Some(text) = map.get(BYTES) {
            let text = text
                .as_str()
                .ok_or_else(|| invalid(format!("{BYTES} must be a hex string")))?;
            let bytes = hex::decode(text.trim())
                .map_err(|err| invalid(format!("{BYTES} is not valid hex: {err}")))?;
            return Ok(Node::ByteArray(bytes.into()));
        }
        if let Some(entries) = map.get(DICTIONARY) {
            return self.dictionary(map, entries);
        }
        if let Some(text) = map.get(XML) {
            let text = text
                .as_str()
                .ok_or_else(|| invalid(format!("{XML} must be a string")))?;
            let kind = match map.get(KIND).and_then(Json::as_str) {
                None | Some("e4x") => XmlKind::E4x,
                Some("document") => XmlKind::Document,
                Some(other) => return Err(invalid(format!("unknown {KIND} {other:?}"))),
            };
            return Ok(Node::Xml(Xml {
                kind,
                text: text.to_string(),
            }));
        }
        if let Some(kind) = map.get(VECTOR) {
            return self.vector(map, kind);
        }

        if let Some(items) = map.get(ITEMS) {
            let Json::Array(items) = items else {
                return Err(invalid(format!("{ITEMS} must be an array")));
            };
            return Ok(Node::Array(Array {
                dense: self.values(items)?,
                named: self.properties(map)?,
            }));
        }

        let class = match map.get(CLASS) {
            Some(Json::String(class)) => class.as_str(),
            Some(_) => return Err(invalid(format!("{CLASS} must be a string"))),
            None => "",
        };
        let mut object = self.mapper.instantiate(class);
        let properties = self.properties(map)?;
        self.mapper.populate(&mut object, properties);
        Ok(Node::Object(object))
    }

    fn dictionary(&mut self, map: &Map<String, Json>, entries: &Json) -> CliResult<Node> {
        let Json::Array(entries) = entries else {
            return Err(invalid(format!("{DICTIONARY} must be an array of pairs")));
        };
        let weak_keys = match map.get(WEAK) {
            None => false,
            Some(Json::Bool(weak)) => *weak,
            Some(_) => return Err(invalid(format!("{WEAK} must be a boolean"))),
        };
        let mut pairs = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some([key, value]) = entry.as_array().map(Vec::as_slice) else {
                return Err(invalid(format!("{DICTIONARY} entries must be [key, value] pairs")));
            };
            pairs.push((self.value(key)?, self.value(value)?));
        }
        Ok(Node::Dictionary(Dictionary {
            weak_keys,
            entries: pairs,
        }))
    }

    fn vector(&mut self, map: &Map<String, Json>, kind: &Json) -> CliResult<Node> {
        let kind = kind
            .as_str()
            .ok_or_else(|| invalid(format!("{VECTOR} must be a string")))?;
        let fixed = match map.get(FIXED) {
            None => false,
            Some(Json::Bool(fixed)) => *fixed,
            Some(_) => return Err(invalid(format!("{FIXED} must be a boolean"))),
        };
        let items: &[Json] = match map.get(ITEMS) {
            None => &[],
            Some(Json::Array(items)) => items,
            Some(_) => return Err(invalid(format!("{ITEMS} must be an array"))),
        };

        let vector = match kind {
            "int" => Vector::Int {
                fixed,
                items: numbers(items, |n| n.as_i64().and_then(|n| i32::try_from(n).ok()))?,
            },
            "uint" => Vector::UInt {
                fixed,
                items: numbers(items, |n| n.as_u64().and_then(|n| u32::try_from(n).ok()))?,
            },
            "double" => Vector::Double {
                fixed,
                items: numbers(items, |n| match n {
                    Json::Null => Some(f64::NAN),
                    other => other.as_f64(),
                })?,
            },
            other => match other.strip_prefix("object:") {
                Some(type_name) => Vector::Object {
                    fixed,
                    type_name: type_name.to_string(),
                    items: self.values(items)?,
                },
                None => return Err(invalid(format!("unknown {VECTOR} kind {other:?}"))),
            },
        };
        Ok(Node::Vector(vector))
    }

    fn properties(&mut self, map: &Map<String, Json>) -> CliResult<Properties> {
        let mut properties = Properties::with_capacity(map.len());
        for (name, value) in map {
            if name.starts_with('$') {
                continue;
            }
            properties.insert(name.as_str(), self.value(value)?);
        }
        Ok(properties)
    }
}

fn numbers<T>(items: &[Json], convert: impl Fn(&Json) -> Option<T>) -> CliResult<Vec<T>> {
    items
        .iter()
        .map(|item| {
            convert(item).ok_or_else(|| invalid(format!("{item} does not fit the {VECTOR} kind")))
        })
        .collect()
}

fn invalid(message: impl Into<String>) -> CliError {
    CliError::new(DATA_INVALID, message)
}
