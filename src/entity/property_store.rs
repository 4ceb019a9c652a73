/*!

The slot store behind an entity's properties.

Slots are organized in three levels: by the facet that declares the property, then by the value
category of its type (one category per scalar kind, one shared category for all reference types),
then by a key made of the property name and its exact value type. A property redeclared with the
same name and type along a line of ancestry is stored under the facet that owns its slot (see
[`PropertyInfo::slot_property`]), so every declaration reads and writes the same value.

Names beginning with `_` are hidden slots. They back per-facet private state, never correspond to
a declared property, and are skipped by the property enumerator.

*/
use indexmap::IndexMap;

use crate::error::{PolycastError, Result};
use crate::facet::{FacetId, PropertyInfo};
use crate::log::trace;
use crate::type_policy::{ValueCategory, ValueType};
use crate::value::Value;

const HIDDEN_PREFIX: char = '_';

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct SlotKey {
    name: Box<str>,
    value_type: ValueType,
}

impl SlotKey {
    fn of(property: &PropertyInfo) -> SlotKey {
        SlotKey {
            name: property.name().into(),
            value_type: property.value_type().clone(),
        }
    }

    fn is_hidden(&self) -> bool {
        self.name.starts_with(HIDDEN_PREFIX)
    }
}

struct Slot {
    /// The property the slot was created for; `None` for hidden slots.
    property: Option<&'static PropertyInfo>,
    value: Value,
}

type CategorySlots = IndexMap<SlotKey, Slot>;
type FacetSlots = IndexMap<ValueCategory, CategorySlots>;

#[derive(Default)]
pub(crate) struct PropertyStore {
    facets: IndexMap<FacetId, FacetSlots>,
}

impl PropertyStore {
    pub(crate) fn peek(&self, property: &'static PropertyInfo) -> Option<Value> {
        let owner = property.slot_property();
        self.facets
            .get(&owner.declaring_id())?
            .get(&owner.value_type().category())?
            .get(&SlotKey::of(owner))
            .map(|slot| slot.value.clone())
    }

    /// Reads a property, materializing and persisting the type's default when the slot is empty.
    pub(crate) fn get_or_default(&mut self, property: &'static PropertyInfo) -> Option<Value> {
        if let Some(value) = self.peek(property) {
            return Some(value);
        }
        let default = property.value_type().default_value()?;
        trace!(
            "materialized default for `{}.{}`",
            property.declaring_facet().name(),
            property.name()
        );
        self.insert(property, default.clone());
        Some(default)
    }

    /// The container held by a collection-typed slot, created on first use. Writes to the
    /// property merge into it with [`merge_into`](crate::collections::merge_into).
    pub(crate) fn container(&mut self, property: &'static PropertyInfo) -> Result<Value> {
        self.get_or_default(property)
            .filter(|_| property.value_type().is_collection())
            .ok_or_else(|| {
                PolycastError::InvalidArgument(format!(
                    "property `{}` has no container",
                    property.name()
                ))
            })
    }

    /// Writes a scalar or reference property. `None` empties the slot.
    pub(crate) fn set(
        &mut self,
        property: &'static PropertyInfo,
        value: Option<Value>,
    ) -> Result<()> {
        debug_assert!(!property.value_type().is_collection());
        match value {
            Some(value) => {
                let value = property.value_type().coerce(value)?;
                self.insert(property, value);
            }
            None => self.remove(property),
        }
        Ok(())
    }

    /// Overwrites the slot without merging. Used to store values that were just computed.
    pub(crate) fn replace(&mut self, property: &'static PropertyInfo, value: Option<Value>) {
        match value {
            Some(value) => self.insert(property, value),
            None => self.remove(property),
        }
    }

    fn insert(&mut self, property: &'static PropertyInfo, value: Value) {
        let owner = property.slot_property();
        self.facets
            .entry(owner.declaring_id())
            .or_default()
            .entry(owner.value_type().category())
            .or_default()
            .insert(
                SlotKey::of(owner),
                Slot {
                    property: Some(owner),
                    value,
                },
            );
    }

    fn remove(&mut self, property: &'static PropertyInfo) {
        let owner = property.slot_property();
        if let Some(slots) = self
            .facets
            .get_mut(&owner.declaring_id())
            .and_then(|categories| categories.get_mut(&owner.value_type().category()))
        {
            slots.shift_remove(&SlotKey::of(owner));
        }
    }

    fn hidden_key(name: &str, value_type: ValueType) -> SlotKey {
        SlotKey {
            name: format!("{HIDDEN_PREFIX}{name}").into(),
            value_type,
        }
    }

    pub(crate) fn hidden(
        &self,
        facet: FacetId,
        name: &str,
        value_type: ValueType,
    ) -> Option<Value> {
        let category = value_type.category();
        self.facets
            .get(&facet)?
            .get(&category)?
            .get(&Self::hidden_key(name, value_type))
            .map(|slot| slot.value.clone())
    }

    pub(crate) fn set_hidden(
        &mut self,
        facet: FacetId,
        name: &str,
        value_type: ValueType,
        value: Option<Value>,
    ) {
        let category = value_type.category();
        let key = Self::hidden_key(name, value_type);
        let slots = self
            .facets
            .entry(facet)
            .or_default()
            .entry(category)
            .or_default();
        match value {
            Some(value) => {
                slots.insert(
                    key,
                    Slot {
                        property: None,
                        value,
                    },
                );
            }
            None => {
                slots.shift_remove(&key);
            }
        }
    }

    /// Every non-hidden slot with the property owning it, ordered by facet, then category, then
    /// insertion.
    pub(crate) fn snapshot(&self) -> Vec<(&'static PropertyInfo, Value)> {
        self.facets
            .values()
            .flat_map(|categories| categories.values())
            .flat_map(|slots| slots.iter())
            .filter(|(key, _)| !key.is_hidden())
            .filter_map(|(_, slot)| Some((slot.property?, slot.value.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::List;
    use crate::define_facet;
    use crate::facet::Facet;

    define_facet! {
        interface Counter {
            prop count: i32;
            prop label: String;
            get history: List<String>;
        }
    }

    define_facet! {
        interface Tally: Counter {
            prop count: i32;
        }
    }

    fn property(name: &str) -> &'static PropertyInfo {
        <dyn Counter as Facet>::info().property(name).unwrap()
    }

    #[test]
    fn value_types_materialize_defaults() {
        let mut store = PropertyStore::default();
        assert_eq!(store.peek(property("count")), None);
        assert_eq!(store.get_or_default(property("count")), Some(Value::Int(0)));
        assert_eq!(store.peek(property("count")), Some(Value::Int(0)));
    }

    #[test]
    fn reference_types_have_no_default() {
        let mut store = PropertyStore::default();
        assert_eq!(store.get_or_default(property("label")), None);
        assert_eq!(store.peek(property("label")), None);
    }

    #[test]
    fn set_overwrites_and_none_clears() {
        let mut store = PropertyStore::default();
        store
            .set(property("label"), Some(Value::from("first")))
            .unwrap();
        store
            .set(property("label"), Some(Value::from("second")))
            .unwrap();
        assert_eq!(store.peek(property("label")), Some(Value::from("second")));
        store.set(property("label"), None).unwrap();
        assert_eq!(store.peek(property("label")), None);
    }

    #[test]
    fn set_coerces_and_rejects() {
        let mut store = PropertyStore::default();
        store.set(property("count"), Some(Value::UInt(7))).unwrap();
        assert_eq!(store.peek(property("count")), Some(Value::Int(7)));
        assert!(matches!(
            store.set(property("count"), Some(Value::from("seven"))),
            Err(PolycastError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn collection_slot_keeps_its_container() {
        let mut store = PropertyStore::default();
        let container = store.get_or_default(property("history")).unwrap();
        assert_eq!(store.container(property("history")).unwrap(), container);
        assert!(matches!(
            store.container(property("count")),
            Err(PolycastError::InvalidArgument(_))
        ));
    }

    #[test]
    fn redeclared_property_uses_the_ancestor_slot() {
        let mut store = PropertyStore::default();
        let tally = <dyn Tally as Facet>::info().property("count").unwrap();
        store.set(tally, Some(Value::Int(5))).unwrap();
        assert_eq!(store.peek(property("count")), Some(Value::Int(5)));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(std::ptr::eq(snapshot[0].0, property("count")));
    }

    #[test]
    fn hidden_slots_are_not_snapshotted() {
        let mut store = PropertyStore::default();
        let facet = <dyn Counter as Facet>::info().id();
        store.set_hidden(facet, "cache", ValueType::Int, Some(Value::Int(3)));
        store.set(property("count"), Some(Value::Int(1))).unwrap();

        assert_eq!(store.hidden(facet, "cache", ValueType::Int), Some(Value::Int(3)));
        let names: Vec<_> = store
            .snapshot()
            .into_iter()
            .map(|(property, _)| property.name())
            .collect();
        assert_eq!(names, vec!["count"]);

        store.set_hidden(facet, "cache", ValueType::Int, None);
        assert_eq!(store.hidden(facet, "cache", ValueType::Int), None);
    }
}
