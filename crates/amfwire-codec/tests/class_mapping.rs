//! Native types, aliases and custom encode/decode hooks.

use std::any::Any;

use amfwire_codec::{
    AmfError, AmfObject, ArrayCollection, Codec, CodecConfig, CustomCodec, Deserializer, Graph,
    NodeId, Object, Properties, Serializer, Traits, Value, ARRAY_COLLECTION_CLASS,
};

#[derive(Debug, Default, PartialEq)]
struct Point {
    x: i64,
    y: i64,
}

impl AmfObject for Point {
    fn type_name(&self) -> &'static str {
        "Point"
    }

    fn properties(&self) -> Properties {
        [("x", self.x), ("y", self.y)].into_iter().collect()
    }

    fn set_property(&mut self, name: &str, value: Value) -> bool {
        let Value::Integer(n) = value else {
            return false;
        };
        match name {
            "x" => self.x = n,
            "y" => self.y = n,
            _ => return false,
        }
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Written with sealed traits `baz, foo` under a fixed remote class.
#[derive(Debug, Default)]
struct SealedRecord {
    foo: Option<String>,
}

impl AmfObject for SealedRecord {
    fn type_name(&self) -> &'static str {
        "SealedRecord"
    }

    fn properties(&self) -> Properties {
        [("foo", Value::from(self.foo.clone())), ("baz", Value::Null)]
            .into_iter()
            .collect()
    }

    fn codec(&self) -> Option<&dyn CustomCodec> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl CustomCodec for SealedRecord {
    fn encode_amf(
        &self,
        ser: &mut Serializer<'_>,
        graph: &Graph,
        this: NodeId,
    ) -> amfwire_codec::Result<()> {
        let traits = Traits::sealed(
            Some("org.amf.ASClass".to_string()),
            vec!["baz".to_string(), "foo".to_string()],
        );
        ser.write_object(graph, this, None, Some(traits))
    }
}

/// Externalizable pair of doubles.
#[derive(Debug, Default, PartialEq)]
struct ExternalPair {
    one: f64,
    two: f64,
}

impl AmfObject for ExternalPair {
    fn type_name(&self) -> &'static str {
        "ExternalPair"
    }

    fn properties(&self) -> Properties {
        Properties::new()
    }

    fn codec(&self) -> Option<&dyn CustomCodec> {
        Some(self)
    }

    fn codec_mut(&mut self) -> Option<&mut dyn CustomCodec> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl CustomCodec for ExternalPair {
    fn encode_amf(
        &self,
        ser: &mut Serializer<'_>,
        graph: &Graph,
        this: NodeId,
    ) -> amfwire_codec::Result<()> {
        ser.write_object(graph, this, None, Some(Traits::externalizable("ExternalPair")))
    }

    fn write_external(
        &self,
        ser: &mut Serializer<'_>,
        _graph: &Graph,
    ) -> amfwire_codec::Result<()> {
        ser.write_double(self.one);
        ser.write_double(self.two);
        Ok(())
    }

    fn read_external(&mut self, des: &mut Deserializer<'_>) -> amfwire_codec::Result<()> {
        self.one = des.read_double()?;
        self.two = des.read_double()?;
        Ok(())
    }
}

/// Writes two nested strings through the reentrant serializer.
#[derive(Debug, Default)]
struct Echo;

impl AmfObject for Echo {
    fn type_name(&self) -> &'static str {
        "Echo"
    }

    fn properties(&self) -> Properties {
        Properties::new()
    }

    fn codec(&self) -> Option<&dyn CustomCodec> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl CustomCodec for Echo {
    fn encode_amf(
        &self,
        ser: &mut Serializer<'_>,
        graph: &Graph,
        _this: NodeId,
    ) -> amfwire_codec::Result<()> {
        let nested = ser.serialize(graph, &Value::from("shared"))?;
        assert!(nested.is_empty());
        ser.serialize(graph, &Value::from("shared"))?;
        Ok(())
    }
}

fn codec_with_point() -> Codec {
    let mut codec = Codec::new();
    codec.mapper_mut().register_class::<Point>("com.example.Point");
    codec
}

#[test]
fn registered_type_roundtrip() {
    let codec = codec_with_point();
    let mut graph = Graph::new();
    let value = graph.native(Box::new(Point { x: 1, y: -2 }));

    let bytes = codec.serialize(&graph, &value).unwrap();
    let decoded = codec.deserialize(&bytes[..]).unwrap();

    let object = decoded.graph.as_object(&decoded.values[0]).unwrap();
    assert_eq!(object.downcast_ref::<Point>(), Some(&Point { x: 1, y: -2 }));
    assert!(graph.equivalent(&value, &decoded.graph, &decoded.values[0]));
}

#[test]
fn unmapped_type_writes_anonymous_object() {
    let mut codec = codec_with_point();
    codec.mapper_mut().reset_to_defaults();

    let mut graph = Graph::new();
    let value = graph.native(Box::new(Point { x: 1, y: 2 }));
    let bytes = codec.serialize(&graph, &value).unwrap();
    assert_eq!(&bytes[..3], &[0x0A, 0x0B, 0x01]);

    let decoded = codec.deserialize(&bytes[..]).unwrap();
    let object = decoded.graph.as_object(&decoded.values[0]).unwrap();
    let dynamic = object.as_dynamic().unwrap();
    assert!(dynamic.is_anonymous());
    assert_eq!(dynamic.properties().get("y"), Some(&Value::Integer(2)));
}

#[test]
fn unknown_remote_name_survives_roundtrip() {
    let codec = Codec::new();
    let mut graph = Graph::new();
    let value = graph.typed_object("com.example.Unknown", [("a", 1)].into_iter().collect());

    let bytes = codec.serialize(&graph, &value).unwrap();
    let decoded = codec.deserialize(&bytes[..]).unwrap();
    let reencoded = codec.serialize(&decoded.graph, &decoded.values[0]).unwrap();
    assert_eq!(bytes, reencoded);

    match decoded.graph.as_object(&decoded.values[0]).unwrap() {
        Object::Dynamic(object) => assert_eq!(object.remote_name(), "com.example.Unknown"),
        Object::Native(_) => panic!("expected dynamic object"),
    }
}

#[test]
fn sealed_traits_are_referenced() {
    let codec = Codec::new();
    let mut graph = Graph::new();
    let a = graph.native(Box::new(SealedRecord {
        foo: Some("foo".into()),
    }));
    let b = graph.native(Box::new(SealedRecord {
        foo: Some("bar".into()),
    }));
    let value = graph.array([a, b]);

    let mut expected = vec![0x09, 0x05, 0x01, 0x0A, 0x23, 0x1F];
    expected.extend_from_slice(b"org.amf.ASClass");
    expected.extend_from_slice(&[0x07, b'b', b'a', b'z', 0x07, b'f', b'o', b'o']);
    expected.extend_from_slice(&[0x01, 0x06, 0x04]);
    expected.extend_from_slice(&[0x0A, 0x01, 0x01, 0x06, 0x07, b'b', b'a', b'r']);

    let bytes = codec.serialize(&graph, &value).unwrap();
    assert_eq!(bytes.as_ref(), expected.as_slice());

    let decoded = codec.deserialize(&bytes[..]).unwrap();
    let array = decoded.graph.as_array(&decoded.values[0]).unwrap();
    let second = decoded.graph.as_object(&array.dense[1]).unwrap();
    assert_eq!(second.as_dynamic().unwrap().remote_name(), "org.amf.ASClass");
    assert_eq!(second.properties().get("foo"), Some(&Value::from("bar")));
    assert_eq!(second.properties().get("baz"), Some(&Value::Null));
}

#[test]
fn externalizable_roundtrip() {
    let mut codec = Codec::new();
    codec.mapper_mut().register_class::<ExternalPair>("ExternalPair");

    let mut graph = Graph::new();
    let value = graph.native(Box::new(ExternalPair { one: 5.0, two: 6.5 }));
    let bytes = codec.serialize(&graph, &value).unwrap();

    let mut expected = vec![0x0A, 0x07, 0x19];
    expected.extend_from_slice(b"ExternalPair");
    expected.extend_from_slice(&5f64.to_be_bytes());
    expected.extend_from_slice(&6.5f64.to_be_bytes());
    assert_eq!(bytes.as_ref(), expected.as_slice());

    let decoded = codec.deserialize(&bytes[..]).unwrap();
    let object = decoded.graph.as_object(&decoded.values[0]).unwrap();
    assert_eq!(
        object.downcast_ref::<ExternalPair>(),
        Some(&ExternalPair { one: 5.0, two: 6.5 })
    );
}

#[test]
fn externalizable_without_registered_type_fails() {
    let mut codec = Codec::new();
    codec.mapper_mut().register_class::<ExternalPair>("ExternalPair");
    let mut graph = Graph::new();
    let value = graph.native(Box::new(ExternalPair::default()));
    let bytes = codec.serialize(&graph, &value).unwrap();

    let err = Codec::new().deserialize(&bytes[..]).unwrap_err();
    assert!(matches!(err, AmfError::NotExternalizable(name) if name == "ExternalPair"));
}

#[test]
fn externalizable_traits_on_dynamic_object_fail_to_encode() {
    let mapper = amfwire_codec::ClassMapper::new();
    let mut ser = Serializer::new(&mapper);
    let mut graph = Graph::new();
    let value = graph.object(Properties::new());
    let id = value.as_node().unwrap();

    ser.serialize(&graph, &Value::Null).unwrap();
    let err = ser
        .write_object(&graph, id, None, Some(Traits::externalizable("X")))
        .unwrap_err();
    assert!(matches!(err, AmfError::NotExternalizable(name) if name == "X"));
}

#[test]
fn array_collection_roundtrip() {
    let codec = Codec::new();
    let mut graph = Graph::new();
    let source = graph.array([1.into(), 2.into()]);
    let value = graph.native(Box::new(ArrayCollection::new(source)));

    let bytes = codec.serialize(&graph, &value).unwrap();
    assert_eq!(&bytes[..3], &[0x0A, 0x07, 0x43]);
    assert_eq!(&bytes[3..36], ARRAY_COLLECTION_CLASS.as_bytes());

    let decoded = codec.deserialize(&bytes[..]).unwrap();
    assert!(graph.equivalent(&value, &decoded.graph, &decoded.values[0]));
}

#[test]
fn array_collection_wrapping_decodes_to_collection() {
    let codec = Codec::with_config(CodecConfig {
        use_array_collection: true,
        ..CodecConfig::default()
    });
    let mut graph = Graph::new();
    let inner = graph.array([7.into()]);
    let value = graph.array([inner.clone(), inner]);

    let bytes = codec.serialize(&graph, &value).unwrap();
    let decoded = codec.deserialize(&bytes[..]).unwrap();

    let outer = decoded.graph.as_object(&decoded.values[0]).unwrap();
    let outer = outer.downcast_ref::<ArrayCollection>().unwrap();
    let source = decoded.graph.as_array(&outer.source).unwrap();
    assert_eq!(source.dense.len(), 2);
    // Both entries reference the same wrapped array.
    assert_eq!(source.dense[0], source.dense[1]);
    let first = decoded.graph.as_object(&source.dense[0]).unwrap();
    assert!(first.downcast_ref::<ArrayCollection>().is_some());
}

#[test]
fn nested_serialize_shares_reference_tables() {
    let codec = Codec::new();
    let mut graph = Graph::new();
    let value = graph.native(Box::new(Echo));

    let bytes = codec.serialize(&graph, &value).unwrap();
    assert_eq!(
        bytes.as_ref(),
        &[0x06, 0x0D, b's', b'h', b'a', b'r', b'e', b'd', 0x06, 0x00]
    );
}

#[test]
fn populate_drops_unknown_properties() {
    let codec = codec_with_point();
    let mut graph = Graph::new();
    let value = graph.typed_object(
        "com.example.Point",
        [("x", 3), ("z", 9)].into_iter().collect(),
    );
    let bytes = codec.serialize(&graph, &value).unwrap();

    let decoded = codec.deserialize(&bytes[..]).unwrap();
    let object = decoded.graph.as_object(&decoded.values[0]).unwrap();
    assert_eq!(object.downcast_ref::<Point>(), Some(&Point { x: 3, y: 0 }));
}
