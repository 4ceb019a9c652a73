use std::any::TypeId;
use std::sync::Arc;

use assert_approx_eq::assert_approx_eq;
use polycast::prelude::*;
use polycast::view::downcast_view;

define_facet! {
    interface Product {
        prop name: String;
        prop price: f64;
    }
}

define_facet! {
    interface Catalogued {
        prop categories: List<String>;
        prop stock: i64;
    }
}

define_facet! {
    class Vehicle {
        prop wheels: u8;
    }
}

define_facet! {
    class Car: Vehicle {
        prop doors: u8;
    }
}

define_facet! {
    class Boat: Vehicle {
        prop draft: f64;
    }
}

#[test]
fn product_scenario() {
    let context = Context::new();
    let entity = context.new_entity();
    entity
        .act_like::<dyn Product>()
        .unwrap()
        .set_name("Widget".to_string())
        .unwrap();
    entity
        .act_like::<dyn Product>()
        .unwrap()
        .set_price(9.99)
        .unwrap();

    let values: Vec<_> = entity.property_values().unwrap().collect();
    assert_eq!(values.len(), 2);
    assert_eq!(values[0].facet.name(), "Product");
    assert_eq!(values[0].property.name(), "name");
    assert_eq!(values[0].value, Value::from("Widget"));
    assert_eq!(values[1].property.name(), "price");
    assert_approx_eq!(values[1].value.as_float().unwrap(), 9.99);

    let copy = entity.clone_entity(false).unwrap();
    assert_eq!(copy.act_like::<dyn Product>().unwrap().name(), "Widget");
}

#[test]
fn casting_twice_returns_the_same_view() {
    let entity = Context::new().new_entity();
    let first = entity.act_like::<dyn Product>().unwrap();
    let second = first.act_like::<dyn Product>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(*first, *second);
}

#[test]
fn dropped_views_are_synthesized_again() {
    let entity = Context::new().new_entity();
    let first = entity.act_like::<dyn Product>().unwrap();
    first.set_name("Widget".to_string()).unwrap();
    let stale = Arc::downgrade(&first);
    drop(first);
    assert!(stale.upgrade().is_none());

    let second = entity.act_like::<dyn Product>().unwrap();
    assert_eq!(second.name(), "Widget");
    assert_eq!(second.unwrap_entity(), entity);
}

#[test]
fn views_of_one_entity_share_state() {
    let entity = Context::new().new_entity();
    let product = entity.act_like::<dyn Product>().unwrap();
    let catalogued = product.act_like::<dyn Catalogued>().unwrap();
    product.set_name("Lamp".to_string()).unwrap();
    catalogued.set_stock(4).unwrap();

    assert_eq!(catalogued.act_like::<dyn Product>().unwrap().name(), "Lamp");
    assert_eq!(entity.get::<dyn Catalogued, i64>("stock").unwrap(), 4);
    assert_eq!(catalogued.unwrap_entity(), product.unwrap_entity());
}

#[test]
fn scalar_round_trip() {
    let entity = Context::new().new_entity();
    let product = entity.act_like::<dyn Product>().unwrap();
    for price in [0.0, -1.5, 1e9] {
        product.set_price(price).unwrap();
        assert_approx_eq!(product.price(), price);
    }
}

#[test]
fn assigning_a_collection_merges_into_the_existing_one() {
    let entity = Context::new().new_entity();
    let catalogued = entity.act_like::<dyn Catalogued>().unwrap();
    let categories = catalogued.categories();
    categories.push("a".to_string());

    assert!(entity.try_set_member("categories", Some(Value::from("b"))));
    catalogued
        .set_categories(List::from_iter(["c".to_string()]))
        .unwrap();

    assert!(catalogued.categories().ptr_eq(&categories));
    assert_eq!(
        categories.to_vec(),
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    );
}

#[test]
fn defaults_are_materialized_once() {
    let entity = Context::new().new_entity();
    let catalogued = entity.act_like::<dyn Catalogued>().unwrap();
    assert_eq!(catalogued.stock(), 0);
    assert_eq!(catalogued.stock(), 0);
    let first = catalogued.categories();
    assert!(first.ptr_eq(&catalogued.categories()));

    let stock = entity
        .property_values()
        .unwrap()
        .find(|value| value.property.name() == "stock")
        .unwrap();
    assert_eq!(stock.value, Value::Int(0));
}

#[test]
fn casting_attaches_the_ancestors() {
    let entity = Context::new().new_entity();
    let car = entity.act_like::<dyn Car>().unwrap();
    car.set_wheels(4).unwrap();
    car.set_doors(5).unwrap();

    let attached: Vec<_> = entity
        .attached_facets()
        .into_iter()
        .map(FacetInfo::name)
        .collect();
    assert_eq!(attached, vec!["Vehicle", "Car"]);
    assert!(entity.is::<dyn Vehicle>());
    assert_eq!(entity.act_like::<dyn Vehicle>().unwrap().wheels(), 4);
}

#[test]
fn unrelated_classes_conflict() {
    let entity = Context::new().new_entity();
    entity.act_like::<dyn Car>().unwrap();
    assert!(matches!(
        entity.act_like::<dyn Boat>(),
        Err(PolycastError::ConflictingClassCast {
            attached: "Car",
            requested: "Boat"
        })
    ));
    assert!(entity.act_like::<dyn Vehicle>().is_ok());
    assert!(!entity.is::<dyn Boat>());
}

#[test]
fn locked_entities_reject_writes_but_not_reads() {
    let entity = Context::new().new_entity();
    let product = entity.act_like::<dyn Product>().unwrap();
    product.set_name("Chair".to_string()).unwrap();

    entity.lock();
    assert!(matches!(
        product.set_name("Table".to_string()),
        Err(PolycastError::InstanceLocked)
    ));
    assert!(matches!(
        entity.set::<dyn Product, f64>("price", 1.0),
        Err(PolycastError::InstanceLocked)
    ));
    assert_eq!(product.name(), "Chair");

    entity.unlock();
    product.set_name("Table".to_string()).unwrap();
    assert_eq!(product.name(), "Table");
}

#[test]
fn undoing_a_cast_keeps_the_slots() {
    let entity = Context::new().new_entity();
    entity
        .act_like::<dyn Product>()
        .unwrap()
        .set_name("Kettle".to_string())
        .unwrap();
    entity.act_like::<dyn Catalogued>().unwrap();

    assert!(entity.undo_act_like::<dyn Product>());
    assert!(!entity.undo_act_like::<dyn Product>());
    assert!(!entity.is::<dyn Product>());
    assert!(entity.is::<dyn Catalogued>());

    assert_eq!(entity.act_like::<dyn Product>().unwrap().name(), "Kettle");
}

#[test]
fn casting_by_id_and_by_name() {
    let context = Context::new();
    let entity = context.new_entity();

    let view = entity.act_like_dyn(TypeId::of::<dyn Product>()).unwrap();
    let product = downcast_view::<dyn Product>(view).unwrap();
    product.set_price(2.5).unwrap();
    assert!(entity.is::<dyn Product>());

    let facet = context.facet_named("Catalogued").unwrap();
    let view = entity.act_like_dyn(facet.id()).unwrap();
    assert!(downcast_view::<dyn Product>(Arc::clone(&view)).is_none());
    assert!(downcast_view::<dyn Catalogued>(view).is_some());

    assert!(matches!(
        entity.act_like_dyn(TypeId::of::<String>()),
        Err(PolycastError::NotAnInterfaceOrClass(_))
    ));
    assert!(matches!(
        context.facet_named(""),
        Err(PolycastError::InvalidArgument(_))
    ));
}
