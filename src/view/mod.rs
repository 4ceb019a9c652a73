/*!

Facet views. A view is what a cast returns: an adapter implementing the facet trait whose every
accessor forwards to a [`FacetView`], which in turn reads and writes the entity's slots, consults
computed accessors and dispatches to registered implementations.

Casting an entity twice to the same facet yields the same view as long as one is still alive.
Views of the same entity compare equal whatever their facet.

*/
mod synthesizer;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

pub(crate) use synthesizer::{AdapterCache, Blueprint};

use crate::entity::Entity;
use crate::error::{PolycastError, Result};
use crate::facet::{ComputedAccessors, Facet, FacetInfo, FacetObject, PropertyInfo};
use crate::value::{PropertyType, Value};

/// The state shared by every accessor of one facet adapter.
#[derive(Clone)]
pub struct FacetView {
    entity: Entity,
    facet: &'static FacetInfo,
    blueprint: Arc<Blueprint>,
}

impl FacetView {
    pub(crate) fn new(
        entity: Entity,
        facet: &'static FacetInfo,
        blueprint: Arc<Blueprint>,
    ) -> Self {
        FacetView {
            entity,
            facet,
            blueprint,
        }
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    /// The facet this view was cast to.
    pub fn current_facet(&self) -> &'static FacetInfo {
        self.facet
    }

    /// Reads `property`: a registered implementation wins, then a computed getter, then the
    /// entity's native field or slot.
    pub fn get_value(&self, property: &'static PropertyInfo) -> Result<Option<Value>> {
        if let Some(implementation) = self.blueprint.property(property) {
            return implementation(self);
        }
        if let Some(computed) = property.computed() {
            return self.reconcile(property, computed);
        }
        self.entity.get_property(property)
    }

    pub fn set_value(&self, property: &'static PropertyInfo, value: Option<Value>) -> Result<()> {
        if self.entity.is_locked() {
            return Err(PolycastError::InstanceLocked);
        }
        match property.computed() {
            Some(ComputedAccessors {
                get,
                set: Some(set),
            }) => {
                set(self, value)?;
                let value = get(self)?;
                self.entity.replace_property(property, value);
                Ok(())
            }
            Some(ComputedAccessors { set: None, .. }) => Err(PolycastError::InvalidArgument(
                format!("computed property `{}` has no setter", property.name()),
            )),
            None => self.entity.store_property(property, value),
        }
    }

    /// Runs the computed getter and stores the result in the slot when it differs from what the
    /// slot holds, so that stored state agrees with the computed value.
    fn reconcile(
        &self,
        property: &'static PropertyInfo,
        computed: &ComputedAccessors,
    ) -> Result<Option<Value>> {
        let value = (computed.get)(self)?;
        if self.entity.peek_property(property) != value {
            self.entity.replace_property(property, value.clone());
        }
        Ok(value)
    }

    /// Reads a private value kept for the current facet. Hidden values are not properties: they
    /// are not enumerated and the lock does not apply to them.
    pub fn hidden<T: PropertyType>(&self, name: &str) -> Result<T> {
        let value = self
            .entity
            .state()
            .store
            .hidden(self.facet.id(), name, T::value_type());
        T::from_value(value)
    }

    pub fn set_hidden<T: PropertyType>(&self, name: &str, value: T) {
        self.entity.state().store.set_hidden(
            self.facet.id(),
            name,
            T::value_type(),
            value.into_value(),
        );
    }

    fn declared(facet: &'static FacetInfo, name: &str) -> &'static PropertyInfo {
        match facet.property(name) {
            Some(property) => property,
            None => panic!("`{name}` is not a property of facet `{}`", facet.name()),
        }
    }

    #[doc(hidden)]
    pub fn read<T: PropertyType>(&self, facet: &'static FacetInfo, name: &str) -> T {
        let property = Self::declared(facet, name);
        match self.get_value(property).and_then(T::from_value) {
            Ok(value) => value,
            Err(error) => panic!("reading `{}.{name}` failed: {error}", facet.name()),
        }
    }

    #[doc(hidden)]
    pub fn write<T: PropertyType>(
        &self,
        facet: &'static FacetInfo,
        name: &str,
        value: T,
    ) -> Result<()> {
        self.set_value(Self::declared(facet, name), value.into_value())
    }

    #[doc(hidden)]
    pub fn overrides(&self, facet: &'static FacetInfo, name: &'static str) -> bool {
        self.blueprint.method(facet.id(), name).is_some()
    }

    #[doc(hidden)]
    pub fn invoke<A: Send + 'static, R: 'static>(
        &self,
        facet: &'static FacetInfo,
        name: &'static str,
        args: A,
    ) -> R {
        let Some(implementation) = self.blueprint.method(facet.id(), name) else {
            panic!("no implementation of `{}.{name}`", facet.name());
        };
        let result = implementation(self, Box::new(args)).and_then(|result| {
            result.downcast::<R>().map_err(|_| {
                PolycastError::type_mismatch(std::any::type_name::<R>(), "method result")
            })
        });
        match result {
            Ok(result) => *result,
            Err(error) => panic!("calling `{}.{name}` failed: {error}", facet.name()),
        }
    }
}

impl PartialEq for FacetView {
    fn eq(&self, other: &Self) -> bool {
        self.entity == other.entity
    }
}

impl Eq for FacetView {}

impl fmt::Debug for FacetView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", self.facet.name(), self.entity)
    }
}

/// Casting for anything that is already a facet view.
pub trait ActLike {
    /// Casts the underlying entity to `F`.
    fn act_like<F: Facet + ?Sized>(&self) -> Result<Arc<F>>;

    /// The entity behind the view.
    fn unwrap_entity(&self) -> Entity;
}

impl<T: FacetObject + ?Sized> ActLike for T {
    fn act_like<F: Facet + ?Sized>(&self) -> Result<Arc<F>> {
        self.facet_view().entity().act_like::<F>()
    }

    fn unwrap_entity(&self) -> Entity {
        self.facet_view().entity().clone()
    }
}

/// Downcasts a type-erased view produced by [`Entity::act_like_dyn`].
pub fn downcast_view<F: Facet + ?Sized>(view: Arc<dyn FacetObject>) -> Option<Arc<F>> {
    let any: Arc<dyn Any + Send + Sync> = view.into_any();
    any.downcast::<F::View>().ok().map(F::upcast)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::downcast_view;
    use crate::prelude::*;

    define_facet! {
        interface Temperature {
            prop celsius: f64;
            computed fahrenheit: f64 {
                get(this) { this.celsius() * 9.0 / 5.0 + 32.0 }
                set(this, value) { this.set_celsius((value - 32.0) * 5.0 / 9.0) }
            }
            computed kelvin: f64 {
                get(this) { this.celsius() + 273.15 }
            }
        }
    }

    define_facet! {
        interface Tally {
            prop total: i64;
            fn bump(&self, by: i64) -> i64 {
                let next = self.total() + by;
                self.set_total(next).unwrap();
                next
            }
        }
    }

    #[test]
    fn casting_twice_returns_the_same_view() {
        let entity = Context::new().new_entity();
        let first = entity.act_like::<dyn Temperature>().unwrap();
        let second = entity.act_like::<dyn Temperature>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        let third = first.act_like::<dyn Temperature>().unwrap();
        assert!(Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn views_compare_by_entity() {
        let context = Context::new();
        let entity = context.new_entity();
        let temperature = entity.act_like::<dyn Temperature>().unwrap();
        let tally = entity.act_like::<dyn Tally>().unwrap();
        assert_eq!(temperature.facet_view(), tally.facet_view());
        assert_eq!(tally.unwrap_entity(), entity);
        let other = context.new_entity().act_like::<dyn Tally>().unwrap();
        assert_ne!(other.facet_view(), tally.facet_view());
    }

    #[test]
    fn computed_properties_reconcile_their_slot() {
        let entity = Context::new().new_entity();
        let temperature = entity.act_like::<dyn Temperature>().unwrap();
        temperature.set_celsius(100.0).unwrap();
        assert_approx_eq::assert_approx_eq!(temperature.fahrenheit(), 212.0);

        let fahrenheit = <dyn Temperature as Facet>::info().property("fahrenheit").unwrap();
        assert_eq!(
            entity.peek_property(fahrenheit),
            Some(Value::Float(212.0))
        );

        temperature.set_fahrenheit(32.0).unwrap();
        assert_approx_eq::assert_approx_eq!(temperature.celsius(), 0.0);
        assert_eq!(entity.peek_property(fahrenheit), Some(Value::Float(32.0)));
        assert_approx_eq::assert_approx_eq!(temperature.kelvin(), 273.15);
    }

    #[test]
    fn computed_without_setter_rejects_writes() {
        let temperature = Context::new()
            .new_entity()
            .act_like::<dyn Temperature>()
            .unwrap();
        let kelvin = <dyn Temperature as Facet>::info().property("kelvin").unwrap();
        assert!(matches!(
            temperature.facet_view().set_value(kelvin, Some(Value::Float(1.0))),
            Err(PolycastError::InvalidArgument(_))
        ));
    }

    #[test]
    fn concrete_methods_run_their_body_unless_overridden() {
        let context = Context::new();
        let tally = context.new_entity().act_like::<dyn Tally>().unwrap();
        assert_eq!(tally.bump(2), 2);
        assert_eq!(tally.bump(3), 5);

        let overridden = Context::new();
        overridden
            .implementation_of::<dyn Tally>()
            .for_method("bump")
            .implemented_by(|_, (by,): (i64,)| by * 100)
            .unwrap();
        let tally = overridden.new_entity().act_like::<dyn Tally>().unwrap();
        assert_eq!(tally.bump(2), 200);
        assert_eq!(tally.total(), 0);
    }

    #[test]
    fn hidden_values_are_per_facet() {
        let entity = Context::new().new_entity();
        let tally = entity.act_like::<dyn Tally>().unwrap();
        let temperature = entity.act_like::<dyn Temperature>().unwrap();
        tally.facet_view().set_hidden("seen", 4_i64);
        assert_eq!(tally.facet_view().hidden::<i64>("seen").unwrap(), 4);
        assert_eq!(temperature.facet_view().hidden::<i64>("seen").unwrap(), 0);
    }

    #[test]
    fn type_erased_casts() {
        let entity = Context::new().new_entity();
        let id = <dyn Tally as Facet>::info().id();
        let view = entity.act_like_dyn(id).unwrap();
        assert_eq!(view.facet_view().current_facet().name(), "Tally");
        let tally = downcast_view::<dyn Tally>(view).unwrap();
        assert!(Arc::ptr_eq(&tally, &entity.act_like::<dyn Tally>().unwrap()));
        assert!(matches!(
            entity.act_like_dyn(std::any::TypeId::of::<String>()),
            Err(PolycastError::NotAnInterfaceOrClass(_))
        ));
    }
}
