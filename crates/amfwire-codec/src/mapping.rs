//! Bidirectional mapping between local type names and remote class names.
//!
//! The mapper answers three questions for the codec: what remote name to
//! write for an object, which local type to instantiate for a remote name,
//! and how to move properties into and out of an instance.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::object::{AmfObject, ArrayCollection, DynamicObject, Object, ARRAY_COLLECTION_CLASS};
use crate::value::Properties;

/// Constructor for a registered native type.
pub type Factory = fn() -> Box<dyn AmfObject>;

/// Aliases present after construction and after [`ClassMapper::reset_to_defaults`].
pub const DEFAULT_ALIASES: &[(&str, &str)] = &[("ArrayCollection", ARRAY_COLLECTION_CLASS)];

fn construct<T: AmfObject + Default>() -> Box<dyn AmfObject> {
    Box::new(T::default())
}

/// Class-name registry shared by a serializer/deserializer pair.
#[derive(Debug, Clone)]
pub struct ClassMapper {
    remote_by_local: HashMap<String, String>,
    local_by_remote: HashMap<String, String>,
    factories: HashMap<String, Factory>,
}

impl Default for ClassMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassMapper {
    /// Mapper seeded with the default aliases and the `ArrayCollection` type.
    pub fn new() -> Self {
        let mut mapper = Self {
            remote_by_local: HashMap::new(),
            local_by_remote: HashMap::new(),
            factories: HashMap::new(),
        };
        mapper.register_type::<ArrayCollection>();
        mapper.reset_to_defaults();
        mapper
    }

    /// Make a native type constructible by its local name.
    ///
    /// Registering a type does not alias it; without an alias it is written
    /// as an anonymous object.
    pub fn register_type<T: AmfObject + Default>(&mut self) -> &'static str {
        let local = T::default().type_name();
        self.factories.insert(local.to_string(), construct::<T>);
        local
    }

    /// Register a type and alias it to `remote` in one step.
    pub fn register_class<T: AmfObject + Default>(&mut self, remote: impl Into<String>) {
        let local = self.register_type::<T>();
        self.register_alias(local, remote);
    }

    /// Record `local <-> remote`, replacing any earlier mapping of either name.
    pub fn register_alias(&mut self, local: impl Into<String>, remote: impl Into<String>) {
        let local = local.into();
        let remote = remote.into();

        if let Some(old_remote) = self.remote_by_local.remove(&local) {
            self.local_by_remote.remove(&old_remote);
        }
        if let Some(old_local) = self.local_by_remote.remove(&remote) {
            self.remote_by_local.remove(&old_local);
        }

        debug!(local = %local, remote = %remote, "registered class alias");
        self.remote_by_local.insert(local.clone(), remote.clone());
        self.local_by_remote.insert(remote, local);
    }

    /// Register several aliases in order; later pairs override earlier ones.
    pub fn register_aliases<I, L, R>(&mut self, aliases: I)
    where
        I: IntoIterator<Item = (L, R)>,
        L: Into<String>,
        R: Into<String>,
    {
        for (local, remote) in aliases {
            self.register_alias(local, remote);
        }
    }

    /// Drop all aliases and restore [`DEFAULT_ALIASES`]. Registered types are kept.
    pub fn reset_to_defaults(&mut self) {
        self.remote_by_local.clear();
        self.local_by_remote.clear();
        self.register_aliases(DEFAULT_ALIASES.iter().copied());
    }

    pub fn remote_alias(&self, local: &str) -> Option<&str> {
        self.remote_by_local.get(local).map(String::as_str)
    }

    pub fn local_alias(&self, remote: &str) -> Option<&str> {
        self.local_by_remote.get(remote).map(String::as_str)
    }

    /// Remote class name to write for `object`; `None` means anonymous.
    pub fn remote_name_for(&self, object: &Object) -> Option<String> {
        match object {
            Object::Dynamic(dynamic) if dynamic.is_anonymous() => None,
            Object::Dynamic(dynamic) => Some(dynamic.remote_name().to_string()),
            Object::Native(native) => self.remote_alias(native.type_name()).map(str::to_string),
        }
    }

    /// Fresh instance for a remote class name.
    ///
    /// Unknown names, and aliases whose local type was never registered,
    /// produce a dynamic object that keeps the remote name.
    pub fn instantiate(&self, remote: &str) -> Object {
        if remote.is_empty() {
            return Object::Dynamic(DynamicObject::new(""));
        }

        let Some(local) = self.local_alias(remote) else {
            debug!(remote = %remote, "no alias for remote class, using dynamic object");
            return Object::Dynamic(DynamicObject::new(remote));
        };

        match self.factories.get(local) {
            Some(factory) => Object::Native(factory()),
            None => {
                debug!(
                    remote = %remote,
                    local = %local,
                    "alias has no registered type, using dynamic object"
                );
                Object::Dynamic(DynamicObject::new(remote))
            }
        }
    }

    /// Assign decoded properties to an instance.
    ///
    /// Dynamic objects merge everything. Native objects take each property
    /// through `set_property`, then their open property bag; anything left
    /// over is dropped.
    pub fn populate(&self, target: &mut Object, properties: Properties) {
        match target {
            Object::Dynamic(dynamic) => dynamic.properties_mut().merge(properties),
            Object::Native(native) => {
                for (name, value) in properties {
                    if native.set_property(&name, value.clone()) {
                        continue;
                    }
                    match native.named_slots() {
                        Some(slots) => {
                            slots.insert(name, value);
                        }
                        None => {
                            trace!(
                                type_name = native.type_name(),
                                property = %name,
                                "dropping property with no matching field"
                            );
                        }
                    }
                }
            }
        }
    }

    /// Readable properties of an instance, in write order.
    pub fn extract_properties(&self, object: &Object) -> Properties {
        object.properties()
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;

    use super::*;
    use crate::value::Value;

    #[derive(Debug, Default)]
    struct Point {
        x: i64,
        extra: Properties,
    }

    impl AmfObject for Point {
        fn type_name(&self) -> &'static str {
            "Point"
        }

        fn properties(&self) -> Properties {
            [("x", self.x)].into_iter().collect()
        }

        fn set_property(&mut self, name: &str, value: Value) -> bool {
            match (name, value) {
                ("x", Value::Integer(x)) => {
                    self.x = x;
                    true
                }
                _ => false,
            }
        }

        fn named_slots(&mut self) -> Option<&mut Properties> {
            Some(&mut self.extra)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn defaults_are_seeded() {
        let mapper = ClassMapper::new();
        assert_eq!(mapper.remote_alias("ArrayCollection"), Some(ARRAY_COLLECTION_CLASS));
        assert_eq!(mapper.local_alias(ARRAY_COLLECTION_CLASS), Some("ArrayCollection"));
        let object = mapper.instantiate(ARRAY_COLLECTION_CLASS);
        assert!(object.downcast_ref::<ArrayCollection>().is_some());
    }

    #[test]
    fn realias_removes_stale_reverse_entry() {
        let mut mapper = ClassMapper::new();
        mapper.register_alias("Point", "com.example.Point");
        mapper.register_alias("Point", "com.example.Point2");
        assert_eq!(mapper.local_alias("com.example.Point"), None);
        assert_eq!(mapper.remote_alias("Point"), Some("com.example.Point2"));

        mapper.register_alias("Other", "com.example.Point2");
        assert_eq!(mapper.remote_alias("Point"), None);
        assert_eq!(mapper.local_alias("com.example.Point2"), Some("Other"));
    }

    #[test]
    fn register_aliases_applies_each_pair_in_order() {
        let mut mapper = ClassMapper::new();
        mapper.register_aliases([
            ("Point", "com.example.Point"),
            ("Shape", "com.example.Shape"),
            ("Point", "com.example.Point2"),
        ]);
        assert_eq!(mapper.remote_alias("Shape"), Some("com.example.Shape"));
        assert_eq!(mapper.local_alias("com.example.Shape"), Some("Shape"));
        assert_eq!(mapper.remote_alias("Point"), Some("com.example.Point2"));
        assert_eq!(mapper.local_alias("com.example.Point"), None);
        assert!(mapper.remote_alias("ArrayCollection").is_some());

        mapper.register_aliases(vec![(String::from("Owned"), String::from("com.example.Owned"))]);
        assert_eq!(mapper.local_alias("com.example.Owned"), Some("Owned"));
    }

    #[test]
    fn reset_restores_defaults_and_keeps_types() {
        let mut mapper = ClassMapper::new();
        mapper.register_class::<Point>("com.example.Point");
        mapper.reset_to_defaults();
        assert_eq!(mapper.remote_alias("Point"), None);
        assert!(mapper.remote_alias("ArrayCollection").is_some());

        mapper.register_alias("Point", "com.example.Point");
        assert!(mapper.instantiate("com.example.Point").downcast_ref::<Point>().is_some());
    }

    #[test]
    fn unknown_remote_becomes_typed_dynamic() {
        let mapper = ClassMapper::new();
        match mapper.instantiate("com.example.Missing") {
            Object::Dynamic(object) => assert_eq!(object.remote_name(), "com.example.Missing"),
            Object::Native(_) => panic!("expected dynamic object"),
        }
    }

    #[test]
    fn populate_native_routes_unknown_names_to_slots() {
        let mut mapper = ClassMapper::new();
        mapper.register_class::<Point>("com.example.Point");
        let mut object = mapper.instantiate("com.example.Point");
        let props: Properties = [("x", 4), ("y", 5)].into_iter().collect();
        mapper.populate(&mut object, props);

        let point = object.downcast_ref::<Point>().unwrap();
        assert_eq!(point.x, 4);
        assert_eq!(point.extra.get("y"), Some(&Value::Integer(5)));
        assert_eq!(mapper.remote_name_for(&object).as_deref(), Some("com.example.Point"));
    }

    #[test]
    fn anonymous_dynamic_has_no_remote_name() {
        let mapper = ClassMapper::new();
        let object = Object::Dynamic(DynamicObject::new(""));
        assert_eq!(mapper.remote_name_for(&object), None);
    }
}
