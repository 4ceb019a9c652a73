/*!

Enumeration of the materialized properties of an entity.

[`Entity::property_values`] first reads every property declared by the attached facets, so that
defaults are materialized, then takes a snapshot of the slot store and returns a cursor over it.
Facets are visited base first; within a facet, slots are visited by value category and then in
the order they were created. Declarations that share a slot (see
[`PropertyInfo::slot_property`]) are reported once, for the most derived attached facet that
declares the property.

```rust
use polycast::prelude::*;

define_facet! {
    interface Point {
        prop x: i32;
        prop y: i32;
    }
}

fn main() {
    let entity = Context::new().new_entity();
    entity.set::<dyn Point, i32>("y", 4).unwrap();
    let names: Vec<_> = entity
        .property_values()
        .unwrap()
        .map(|value| value.property.name())
        .collect();
    assert_eq!(names, vec!["x", "y"]);
}
```

*/
use std::ptr;

use indexmap::IndexMap;

use crate::entity::Entity;
use crate::error::Result;
use crate::facet::{FacetInfo, FacetObject, PropertyInfo};
use crate::type_policy::ValueCategory;
use crate::value::Value;
use crate::HashSet;

/// Orders `facets` so that every facet comes after the facets in the list it inherits from. Facets
/// with no ordering constraint between them keep their relative order from `facets`.
pub fn topological_sort(facets: &[&'static FacetInfo]) -> Vec<&'static FacetInfo> {
    let mut sorted = Vec::with_capacity(facets.len());
    let mut seen = HashSet::default();

    for &root in facets {
        if seen.contains(&root.id()) {
            continue;
        }
        // (facet, parents already pushed)
        let mut stack = vec![(root, false)];
        while let Some((facet, expanded)) = stack.pop() {
            if expanded {
                sorted.push(facet);
                continue;
            }
            if !seen.insert(facet.id()) {
                continue;
            }
            stack.push((facet, true));
            let parents: Vec<_> = facet
                .parents()
                .filter(|parent| facets.contains(parent) && !seen.contains(&parent.id()))
                .collect();
            stack.extend(parents.into_iter().rev().map(|parent| (parent, false)));
        }
    }
    sorted
}

#[derive(Clone, Debug)]
pub struct PropertyValue {
    /// The most derived attached facet declaring the property.
    pub facet: &'static FacetInfo,
    pub property: &'static PropertyInfo,
    pub value: Value,
}

type FacetGroup = (&'static FacetInfo, Vec<Vec<(&'static PropertyInfo, Value)>>);

/// A restartable cursor over a snapshot of an entity's slots.
pub struct PropertyValues {
    groups: Vec<FacetGroup>,
    facet: usize,
    category: usize,
    slot: usize,
}

impl PropertyValues {
    fn new(groups: Vec<FacetGroup>) -> Self {
        PropertyValues {
            groups,
            facet: 0,
            category: 0,
            slot: 0,
        }
    }

    /// Moves the cursor back to the first value of the same snapshot.
    pub fn reset(&mut self) {
        self.facet = 0;
        self.category = 0;
        self.slot = 0;
    }
}

impl Iterator for PropertyValues {
    type Item = PropertyValue;

    fn next(&mut self) -> Option<PropertyValue> {
        loop {
            let (facet, categories) = self.groups.get(self.facet)?;
            let Some(slots) = categories.get(self.category) else {
                self.facet += 1;
                self.category = 0;
                self.slot = 0;
                continue;
            };
            let Some((property, value)) = slots.get(self.slot) else {
                self.category += 1;
                self.slot = 0;
                continue;
            };
            self.slot += 1;
            return Some(PropertyValue {
                facet: *facet,
                property: *property,
                value: value.clone(),
            });
        }
    }
}

/// Finds the declaration of `slot` on the most derived facet of `order`.
fn attribute(
    order: &[&'static FacetInfo],
    slot: &'static PropertyInfo,
) -> Option<(usize, &'static PropertyInfo)> {
    order.iter().copied().enumerate().rev().find_map(|(index, facet)| {
        facet
            .properties()
            .iter()
            .find(|&property| ptr::eq(property.slot_property(), slot))
            .map(|property| (index, property))
    })
}

impl Entity {
    /// Materializes and enumerates the properties of every attached facet.
    pub fn property_values(&self) -> Result<PropertyValues> {
        let facets = self.attached_facets();
        for &facet in &facets {
            for property in facet.properties() {
                if property.is_computed() {
                    let view = self.view_for(facet)?;
                    view.facet_view().get_value(property)?;
                } else {
                    self.get_property(property)?;
                }
            }
        }

        let order = topological_sort(&facets);
        let snapshot = self.state().store.snapshot();
        let mut buckets: Vec<IndexMap<ValueCategory, Vec<_>>> = vec![IndexMap::new(); order.len()];
        // Slots of detached facets have no attached declaration and are skipped.
        for (slot, value) in snapshot {
            if let Some((index, property)) = attribute(&order, slot) {
                buckets[index]
                    .entry(property.value_type().category())
                    .or_default()
                    .push((property, value));
            }
        }

        let groups = order
            .into_iter()
            .zip(buckets)
            .filter(|(_, categories)| !categories.is_empty())
            .map(|(facet, categories)| (facet, categories.into_values().collect()))
            .collect();
        Ok(PropertyValues::new(groups))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;

    define_facet! {
        interface Node {
            prop label: String;
        }
    }

    define_facet! {
        interface Left: Node {
            prop left: i32;
        }
    }

    define_facet! {
        interface Right: Node {
            prop right: i32;
        }
    }

    define_facet! {
        interface Joined: Left + Right + Node {
            prop label: String;
            prop weight: f64;
        }
    }

    define_facet! {
        interface Titled {
            prop name: String;
        }
    }

    define_facet! {
        interface Captioned {
            prop name: String;
        }
    }

    define_facet! {
        interface Exhibit: Titled + Captioned {
            prop name: String;
            prop year: i32;
        }
    }

    fn names(values: PropertyValues) -> Vec<(&'static str, &'static str)> {
        values
            .map(|value| (value.facet.name(), value.property.name()))
            .collect()
    }

    #[test]
    fn sort_puts_bases_first() {
        let joined = <dyn Joined as Facet>::info();
        let left = <dyn Left as Facet>::info();
        let right = <dyn Right as Facet>::info();
        let node = <dyn Node as Facet>::info();
        let sorted: Vec<_> = topological_sort(&[joined, right, left, node])
            .into_iter()
            .map(FacetInfo::name)
            .collect();
        assert_eq!(sorted, vec!["Node", "Left", "Right", "Joined"]);

        let sorted: Vec<_> = topological_sort(&[right, left, node])
            .into_iter()
            .map(FacetInfo::name)
            .collect();
        assert_eq!(sorted, vec!["Node", "Right", "Left"]);
    }

    #[test]
    fn diamond_properties_are_reported_once() {
        let entity = Context::new().new_entity();
        entity.set::<dyn Left, i32>("left", 1).unwrap();
        entity.set::<dyn Right, i32>("right", 2).unwrap();
        entity
            .set::<dyn Node, String>("label", "base".into())
            .unwrap();

        assert_eq!(
            names(entity.property_values().unwrap()),
            vec![("Node", "label"), ("Left", "left"), ("Right", "right")]
        );
    }

    #[test]
    fn redeclared_property_is_attributed_to_the_derived_facet() {
        let entity = Context::new().new_entity();
        entity
            .set::<dyn Node, String>("label", "base".into())
            .unwrap();
        entity
            .set::<dyn Joined, String>("label", "joined".into())
            .unwrap();

        let values: Vec<_> = entity.property_values().unwrap().collect();
        let labels: Vec<_> = values
            .iter()
            .filter(|value| value.property.name() == "label")
            .collect();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].facet.name(), "Joined");
        assert_eq!(labels[0].value, Value::from("joined"));
        assert_eq!(values.last().unwrap().property.name(), "weight");
        assert_eq!(
            entity.get::<dyn Node, String>("label").unwrap(),
            "joined"
        );
    }

    #[test]
    fn property_joined_from_unrelated_interfaces_is_reported_once() {
        let entity = Context::new().new_entity();
        entity
            .set::<dyn Exhibit, String>("name", "Water Lilies".into())
            .unwrap();
        entity.act_like::<dyn Titled>().unwrap();
        entity.act_like::<dyn Captioned>().unwrap();

        let values: Vec<_> = entity.property_values().unwrap().collect();
        let named: Vec<_> = values
            .iter()
            .filter(|value| value.property.name() == "name")
            .collect();
        assert_eq!(named.len(), 1);
        assert_eq!(named[0].facet.name(), "Exhibit");
        assert_eq!(named[0].value, Value::from("Water Lilies"));
        assert_eq!(values.len(), 2);

        assert_eq!(
            entity.get::<dyn Titled, String>("name").unwrap(),
            "Water Lilies"
        );
        assert_eq!(
            entity.get::<dyn Captioned, String>("name").unwrap(),
            "Water Lilies"
        );
    }

    #[test]
    fn defaults_are_materialized_and_cursor_restarts() {
        let entity = Context::new().new_entity();
        entity.act_like::<dyn Left>().unwrap();
        let mut values = entity.property_values().unwrap();
        let first: Vec<_> = values.by_ref().map(|value| value.property.name()).collect();
        assert_eq!(first, vec!["left"]);
        assert!(values.next().is_none());
        values.reset();
        assert_eq!(values.next().unwrap().value, Value::Int(0));
    }

    #[test]
    fn detached_facets_are_not_enumerated() {
        let entity = Context::new().new_entity();
        entity.set::<dyn Left, i32>("left", 3).unwrap();
        entity.set::<dyn Right, i32>("right", 4).unwrap();
        entity.undo_act_like::<dyn Right>();
        assert_eq!(
            names(entity.property_values().unwrap()),
            vec![("Left", "left")]
        );
    }
}
