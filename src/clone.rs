/*!

Shallow and deep clones of entities.

Both kinds of clone create a new entity in the source's context and replay the source's
enumerated property values onto it, each under its original property identity. A shallow clone
shares every referenced entity and object with the source. A deep clone copies the graph reachable
through property values: referenced entities are cloned recursively, containers are rebuilt with
cloned elements, and objects are copied when they implement
[`Object::copy_object`](crate::value::Object::copy_object). Each source
entity or object is cloned at most once, so cycles terminate and shared references stay shared.

*/
use crate::collections::{ObservableList, ObservableMap, ObservableSet};
use crate::entity::Entity;
use crate::error::Result;
use crate::value::{ObjectRef, Value, ViewRef};
use crate::HashMap;

impl Entity {
    /// Clones the entity. See the [module documentation](crate::clone).
    pub fn clone_entity(&self, deep: bool) -> Result<Entity> {
        if deep {
            DeepCloner::default().clone_entity(self)
        } else {
            let target = self.context().create_entity(self.create_native_child());
            for value in self.property_values()? {
                target.store_property(value.property, Some(value.value))?;
            }
            Ok(target)
        }
    }
}

#[derive(Default)]
struct DeepCloner {
    entities: HashMap<Entity, Entity>,
    objects: HashMap<usize, ObjectRef>,
}

impl DeepCloner {
    fn clone_entity(&mut self, source: &Entity) -> Result<Entity> {
        if let Some(target) = self.entities.get(source) {
            return Ok(target.clone());
        }
        let target = source
            .context()
            .create_entity(source.create_native_child());
        self.entities.insert(source.clone(), target.clone());

        for facet in source.attached_facets() {
            target.attach(facet);
        }
        for value in source.property_values()? {
            let cloned = self.clone_value(value.value)?;
            target.store_property(value.property, Some(cloned))?;
        }
        Ok(target)
    }

    fn clone_value(&mut self, value: Value) -> Result<Value> {
        let cloned = match value {
            Value::View(view) => {
                let entity = self.clone_entity(view.entity())?;
                Value::View(ViewRef::new(entity, view.facet()))
            }
            Value::Object(object) => Value::Object(self.clone_object(object)),
            Value::List(list) => {
                let copy = ObservableList::new(list.element_type().clone());
                for item in list.to_vec() {
                    copy.add(self.clone_value(item)?)?;
                }
                Value::List(copy)
            }
            Value::Set(set) => {
                let copy = ObservableSet::new(set.element_type().clone());
                for item in set.to_vec() {
                    copy.add(self.clone_value(item)?)?;
                }
                Value::Set(copy)
            }
            Value::Map(map) => {
                let copy = ObservableMap::new(map.key_type().clone(), map.value_type().clone());
                for (key, item) in map.entries() {
                    copy.insert(self.clone_value(key)?, self.clone_value(item)?)?;
                }
                Value::Map(copy)
            }
            scalar => scalar,
        };
        Ok(cloned)
    }

    fn clone_object(&mut self, object: ObjectRef) -> ObjectRef {
        if let Some(copy) = self.objects.get(&object.address()) {
            return copy.clone();
        }
        let copy = object.copy_object().unwrap_or_else(|| object.clone());
        self.objects.insert(object.address(), copy.clone());
        copy
    }
}
