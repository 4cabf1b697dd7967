//! Object model: traits descriptors, dynamic objects and the extension
//! points for application-defined types.

use std::any::Any;
use std::fmt;

use crate::deserializer::Deserializer;
use crate::error::{AmfError, Result};
use crate::serializer::Serializer;
use crate::value::{Graph, NodeId, Properties, Value};

/// Remote class name of the Flex array wrapper.
pub const ARRAY_COLLECTION_CLASS: &str = "flex.messaging.io.ArrayCollection";

/// Class shape descriptor written once per message and then referenced by index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Traits {
    /// Remote class name; `None` for anonymous objects.
    pub class_name: Option<String>,
    /// Sealed member names, written in order without names per instance.
    pub members: Vec<String>,
    pub dynamic: bool,
    pub externalizable: bool,
}

impl Traits {
    /// Anonymous, dynamic, no sealed members.
    pub fn anonymous() -> Self {
        Self::dynamic(None)
    }

    pub fn dynamic(class_name: Option<String>) -> Self {
        Self {
            class_name,
            members: Vec::new(),
            dynamic: true,
            externalizable: false,
        }
    }

    pub fn sealed(class_name: Option<String>, members: Vec<String>) -> Self {
        Self {
            class_name,
            members,
            dynamic: false,
            externalizable: false,
        }
    }

    pub fn externalizable(class_name: impl Into<String>) -> Self {
        Self {
            class_name: Some(class_name.into()),
            members: Vec::new(),
            dynamic: false,
            externalizable: true,
        }
    }

    /// Name written on the wire (empty for anonymous).
    pub fn remote_name(&self) -> &str {
        self.class_name.as_deref().unwrap_or("")
    }

    /// Copy with an empty class name folded into `None`, used as the trait-table key.
    pub(crate) fn normalized(&self) -> Self {
        let mut traits = self.clone();
        if traits.class_name.as_deref() == Some("") {
            traits.class_name = None;
        }
        traits
    }
}

/// Object whose properties are all carried in a property map.
///
/// Produced when decoding anonymous or unmapped classes, and usable to
/// build typed objects without registering a native type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicObject {
    remote_name: String,
    properties: Properties,
}

impl DynamicObject {
    pub fn new(remote_name: impl Into<String>) -> Self {
        Self::with_properties(remote_name, Properties::new())
    }

    pub fn with_properties(remote_name: impl Into<String>, properties: Properties) -> Self {
        Self {
            remote_name: remote_name.into(),
            properties,
        }
    }

    /// Remote class name; empty for anonymous objects.
    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }

    pub fn is_anonymous(&self) -> bool {
        self.remote_name.is_empty()
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }
}

/// An object node: either dynamic or an application-defined native type.
#[derive(Debug)]
pub enum Object {
    Dynamic(DynamicObject),
    Native(Box<dyn AmfObject>),
}

impl Object {
    pub fn as_dynamic(&self) -> Option<&DynamicObject> {
        match self {
            Object::Dynamic(object) => Some(object),
            Object::Native(_) => None,
        }
    }

    pub fn as_native(&self) -> Option<&dyn AmfObject> {
        match self {
            Object::Native(object) => Some(object.as_ref()),
            Object::Dynamic(_) => None,
        }
    }

    /// Downcast a native object to its concrete type.
    pub fn downcast_ref<T: AmfObject>(&self) -> Option<&T> {
        self.as_native()?.downcast_ref::<T>()
    }

    pub fn downcast_mut<T: AmfObject>(&mut self) -> Option<&mut T> {
        match self {
            Object::Native(object) => object.downcast_mut::<T>(),
            Object::Dynamic(_) => None,
        }
    }

    /// Property getter used for serialization.
    pub fn properties(&self) -> Properties {
        match self {
            Object::Dynamic(object) => object.properties.clone(),
            Object::Native(object) => object.properties(),
        }
    }
}

/// Application type that can be carried in a graph as an object node.
///
/// `type_name` is the local name the class mapper keys on; it must be unique
/// per registered type.
pub trait AmfObject: Any + fmt::Debug {
    fn type_name(&self) -> &'static str;

    /// Readable properties, in the order they should be written.
    fn properties(&self) -> Properties;

    /// Assign a decoded property. Returns false if the type has no such field.
    fn set_property(&mut self, _name: &str, _value: Value) -> bool {
        false
    }

    /// Open property bag for names `set_property` does not accept.
    fn named_slots(&mut self) -> Option<&mut Properties> {
        None
    }

    /// Custom encoding hooks, if the type provides them.
    fn codec(&self) -> Option<&dyn CustomCodec> {
        None
    }

    fn codec_mut(&mut self) -> Option<&mut dyn CustomCodec> {
        None
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl dyn AmfObject {
    pub fn is<T: AmfObject>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: AmfObject>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: AmfObject>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// Hooks a type uses to take over its own encoding.
///
/// `encode_amf` replaces the default object writer; it typically calls
/// [`Serializer::write_object`] with explicit properties or traits.
/// `write_external`/`read_external` are only invoked for externalizable
/// traits and handle the opaque body that follows the traits header.
pub trait CustomCodec {
    fn encode_amf(&self, ser: &mut Serializer<'_>, graph: &Graph, this: NodeId) -> Result<()>;

    fn write_external(&self, _ser: &mut Serializer<'_>, _graph: &Graph) -> Result<()> {
        Err(AmfError::NotExternalizable(
            std::any::type_name::<Self>().to_string(),
        ))
    }

    fn read_external(&mut self, _des: &mut Deserializer<'_>) -> Result<()> {
        Err(AmfError::NotExternalizable(
            std::any::type_name::<Self>().to_string(),
        ))
    }
}

/// Flex `ArrayCollection`: an externalizable wrapper around a single source value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrayCollection {
    pub source: Value,
}

impl ArrayCollection {
    pub fn new(source: Value) -> Self {
        Self { source }
    }
}

impl AmfObject for ArrayCollection {
    fn type_name(&self) -> &'static str {
        "ArrayCollection"
    }

    fn properties(&self) -> Properties {
        [("source", self.source.clone())].into_iter().collect()
    }

    fn set_property(&mut self, name: &str, value: Value) -> bool {
        if name != "source" {
            return false;
        }
        self.source = value;
        true
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

impl CustomCodec for ArrayCollection {
    fn encode_amf(&self, ser: &mut Serializer<'_>, graph: &Graph, this: NodeId) -> Result<()> {
        let traits = Traits::externalizable(ARRAY_COLLECTION_CLASS);
        ser.write_object(graph, this, None, Some(traits))
    }

    fn write_external(&self, ser: &mut Serializer<'_>, graph: &Graph) -> Result<()> {
        ser.serialize(graph, &self.source)?;
        Ok(())
    }

    fn read_external(&mut self, des: &mut Deserializer<'_>) -> Result<()> {
        self.source = des.read_value()?;
        Ok(())
    }
}
