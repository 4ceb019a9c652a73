/*!

The implementation registry maps facet members to Rust closures.

A facet's abstract methods have no body of their own; before an entity can be cast to the facet,
an implementation has to be registered for each of them. Concrete methods and read-only
properties can be overridden the same way.

```rust
use polycast::prelude::*;

define_facet! {
    interface Greeter {
        prop name: String;
        fn greet(&self, greeting: String) -> String;
    }
}

fn main() {
    let context = Context::new();
    context
        .implementation_of::<dyn Greeter>()
        .for_method("greet")
        .implemented_by(|this, (greeting,): (String,)| {
            format!("{greeting}, {}", this.name())
        })
        .unwrap();

    let greeter = context.new_entity().act_like::<dyn Greeter>().unwrap();
    greeter.set_name("Ada".to_string()).unwrap();
    assert_eq!(greeter.greet("Hello".to_string()), "Hello, Ada");
}
```

Implementations are looked up when a facet's blueprint is synthesized, which happens on the first
cast to that facet in a context. Register implementations before casting.

*/
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

use crate::error::{PolycastError, Result};
use crate::facet::{Facet, FacetId, MethodInfo, PropertyInfo};
use crate::log::debug;
use crate::value::{PropertyType, Value};
use crate::view::FacetView;
use crate::HashMap;

/// A member is identified by its declaring facet and its name.
pub(crate) type MemberKey = (FacetId, &'static str);

pub(crate) type MethodImplementation = Arc<
    dyn Fn(&FacetView, Box<dyn Any + Send>) -> Result<Box<dyn Any + Send>> + Send + Sync,
>;

pub(crate) type PropertyImplementation =
    Arc<dyn Fn(&FacetView) -> Result<Option<Value>> + Send + Sync>;

#[derive(Default)]
pub struct ImplementationRegistry {
    methods: RwLock<HashMap<MemberKey, MethodImplementation>>,
    properties: RwLock<HashMap<MemberKey, PropertyImplementation>>,
}

impl ImplementationRegistry {
    /// Whether an implementation is registered for member `name` of `F`.
    pub fn contains<F: Facet + ?Sized>(&self, name: &str) -> bool {
        let facet = F::info();
        if let Some(method) = facet.method(name) {
            return self.method(&(facet.id(), method.name())).is_some();
        }
        facet
            .property(name)
            .is_some_and(|property| self.property(&(facet.id(), property.name())).is_some())
    }

    pub fn len(&self) -> usize {
        self.methods.read().expect("RwLock poisoned").len()
            + self.properties.read().expect("RwLock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn method(&self, key: &MemberKey) -> Option<MethodImplementation> {
        self.methods
            .read()
            .expect("RwLock poisoned")
            .get(key)
            .cloned()
    }

    pub(crate) fn property(&self, key: &MemberKey) -> Option<PropertyImplementation> {
        self.properties
            .read()
            .expect("RwLock poisoned")
            .get(key)
            .cloned()
    }

    fn register_method(
        &self,
        facet: &'static str,
        key: MemberKey,
        implementation: MethodImplementation,
    ) {
        let mut methods = self.methods.write().expect("RwLock poisoned");
        if methods.contains_key(&key) {
            debug!("ignoring duplicate implementation of `{facet}.{}`", key.1);
            return;
        }
        debug!("registered implementation of method `{facet}.{}`", key.1);
        methods.insert(key, implementation);
    }

    fn register_property(
        &self,
        facet: &'static str,
        key: MemberKey,
        implementation: PropertyImplementation,
    ) {
        let mut properties = self.properties.write().expect("RwLock poisoned");
        if properties.contains_key(&key) {
            debug!("ignoring duplicate implementation of `{facet}.{}`", key.1);
            return;
        }
        debug!("registered implementation of property `{facet}.{}`", key.1);
        properties.insert(key, implementation);
    }
}

fn incompatible<F: Facet + ?Sized>(member: &str, reason: impl Into<String>) -> PolycastError {
    PolycastError::IncompatibleImplementation {
        facet: F::info().name(),
        member: member.to_string(),
        reason: reason.into(),
    }
}

/// Returned by [`Context::implementation_of`](crate::Context::implementation_of).
pub struct ImplementationBuilder<'a, F: ?Sized> {
    registry: &'a ImplementationRegistry,
    marker: PhantomData<fn(&F)>,
}

impl<'a, F: Facet + ?Sized> ImplementationBuilder<'a, F> {
    pub(crate) fn new(registry: &'a ImplementationRegistry) -> Self {
        ImplementationBuilder {
            registry,
            marker: PhantomData,
        }
    }

    pub fn for_method(&self, name: &str) -> MethodImplementationBuilder<'a, F> {
        MethodImplementationBuilder {
            registry: self.registry,
            name: name.to_string(),
            marker: PhantomData,
        }
    }

    pub fn for_property(&self, name: &str) -> PropertyImplementationBuilder<'a, F> {
        PropertyImplementationBuilder {
            registry: self.registry,
            name: name.to_string(),
            marker: PhantomData,
        }
    }
}

impl<F: Facet + ?Sized> fmt::Debug for ImplementationBuilder<'_, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImplementationBuilder")
            .field("facet", &F::info().name())
            .finish_non_exhaustive()
    }
}

/// Only members declared by `F` itself can be implemented through `F`.
fn own_member<'m, F: Facet + ?Sized, M>(
    name: &str,
    kind: &str,
    own: Option<&'m M>,
    inherited: Option<&'static str>,
) -> Result<&'m M> {
    if let Some(member) = own {
        return Ok(member);
    }
    Err(match inherited {
        Some(declaring) => incompatible::<F>(
            name,
            format!("{kind} is declared on `{declaring}`; implement it there"),
        ),
        None => incompatible::<F>(name, format!("no such {kind}")),
    })
}

pub struct MethodImplementationBuilder<'a, F: ?Sized> {
    registry: &'a ImplementationRegistry,
    name: String,
    marker: PhantomData<fn(&F)>,
}

impl<'a, F: Facet + ?Sized> MethodImplementationBuilder<'a, F> {
    /// Registers `implementation` for the method. `A` is the tuple of the method's parameters and
    /// `R` its return type; both must match the declaration exactly. Returns the facet's builder so
    /// registrations can be chained.
    pub fn implemented_by<A, R, I>(self, implementation: I) -> Result<ImplementationBuilder<'a, F>>
    where
        A: Send + 'static,
        R: Send + 'static,
        I: Fn(&F, A) -> R + Send + Sync + 'static,
    {
        let facet = F::info();
        let inherited = facet
            .find_method(&self.name)
            .map(|method| method.declaring_facet().name());
        let method: &'static MethodInfo =
            own_member::<F, _>(&self.name, "method", facet.method(&self.name), inherited)?;

        if method.params() != TypeId::of::<A>() {
            return Err(incompatible::<F>(
                &self.name,
                format!(
                    "declared parameters are `{}` but the implementation takes `{}`",
                    method.params_name(),
                    type_name::<A>()
                ),
            ));
        }
        if method.returns() != TypeId::of::<R>() {
            return Err(incompatible::<F>(
                &self.name,
                format!(
                    "declared return type is `{}` but the implementation returns `{}`",
                    method.returns_name(),
                    type_name::<R>()
                ),
            ));
        }

        let erased: MethodImplementation =
            Arc::new(move |view: &FacetView, args: Box<dyn Any + Send>| {
                let this = view.entity().act_like::<F>()?;
                let args = args.downcast::<A>().map_err(|_| {
                    PolycastError::type_mismatch(type_name::<A>(), "method arguments")
                })?;
                let result: Box<dyn Any + Send> = Box::new(implementation(&*this, *args));
                Ok(result)
            });
        self.registry
            .register_method(facet.name(), (facet.id(), method.name()), erased);
        Ok(ImplementationBuilder::new(self.registry))
    }
}

pub struct PropertyImplementationBuilder<'a, F: ?Sized> {
    registry: &'a ImplementationRegistry,
    name: String,
    marker: PhantomData<fn(&F)>,
}

impl<'a, F: Facet + ?Sized> PropertyImplementationBuilder<'a, F> {
    /// Registers `implementation` as the getter of a read-only property. Reads through any view
    /// of the facet return what it computes; the slot store is not consulted.
    pub fn implemented_by<T, I>(self, implementation: I) -> Result<ImplementationBuilder<'a, F>>
    where
        T: PropertyType,
        I: Fn(&F) -> T + Send + Sync + 'static,
    {
        let facet = F::info();
        let inherited = facet
            .find_property(&self.name)
            .map(|property| property.declaring_facet().name());
        let property: &'static PropertyInfo =
            own_member::<F, _>(&self.name, "property", facet.property(&self.name), inherited)?;

        if !property.is_read_only() {
            return Err(incompatible::<F>(
                &self.name,
                "only read-only properties can be implemented",
            ));
        }
        if property.rust_type() != TypeId::of::<T>() {
            return Err(incompatible::<F>(
                &self.name,
                format!(
                    "declared type is `{}` but the implementation returns `{}`",
                    property.rust_type_name(),
                    type_name::<T>()
                ),
            ));
        }

        let erased: PropertyImplementation = Arc::new(move |view: &FacetView| {
            let this = view.entity().act_like::<F>()?;
            Ok(implementation(&*this).into_value())
        });
        self.registry
            .register_property(facet.name(), (facet.id(), property.name()), erased);
        Ok(ImplementationBuilder::new(self.registry))
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    define_facet! {
        interface Shape {
            prop width: f64;
            get area: f64;
            fn scale(&self, factor: f64) -> f64;
        }
    }

    define_facet! {
        interface Square: Shape {
            prop side: f64;
        }
    }

    #[test]
    fn registers_methods_and_properties() {
        let context = Context::new();
        context
            .implementation_of::<dyn Shape>()
            .for_method("scale")
            .implemented_by(|this, (factor,): (f64,)| this.width() * factor)
            .unwrap()
            .for_property("area")
            .implemented_by(|this| this.width() * this.width())
            .unwrap();

        let registry = context.implementations();
        assert!(registry.contains::<dyn Shape>("scale"));
        assert!(registry.contains::<dyn Shape>("area"));
        assert!(!registry.contains::<dyn Shape>("width"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn duplicate_registration_keeps_the_first() {
        let context = Context::new();
        let shapes = context.implementation_of::<dyn Shape>();
        shapes
            .for_method("scale")
            .implemented_by(|_, (factor,): (f64,)| factor)
            .unwrap();
        shapes
            .for_method("scale")
            .implemented_by(|_, (_,): (f64,)| 0.0)
            .unwrap();
        assert_eq!(context.implementations().len(), 1);

        let shape = context.new_entity().act_like::<dyn Shape>().unwrap();
        assert_eq!(shape.scale(3.0), 3.0);
    }

    #[test]
    fn rejects_mismatched_signatures() {
        let context = Context::new();
        let shapes = context.implementation_of::<dyn Shape>();
        assert!(matches!(
            shapes
                .for_method("scale")
                .implemented_by(|_, (factor,): (i32,)| f64::from(factor)),
            Err(PolycastError::IncompatibleImplementation { .. })
        ));
        assert!(matches!(
            shapes
                .for_method("scale")
                .implemented_by(|_, (factor,): (f64,)| factor.to_string()),
            Err(PolycastError::IncompatibleImplementation { .. })
        ));
        assert!(matches!(
            shapes.for_method("rotate").implemented_by(|_, (): ()| ()),
            Err(PolycastError::IncompatibleImplementation { .. })
        ));
        assert!(context.implementations().is_empty());
    }

    #[test]
    fn rejects_writable_and_mistyped_properties() {
        let context = Context::new();
        let shapes = context.implementation_of::<dyn Shape>();
        assert!(matches!(
            shapes.for_property("width").implemented_by(|_| 1.0),
            Err(PolycastError::IncompatibleImplementation { .. })
        ));
        assert!(matches!(
            shapes.for_property("area").implemented_by(|_| 1_i32),
            Err(PolycastError::IncompatibleImplementation { .. })
        ));
    }

    #[test]
    fn inherited_members_are_implemented_on_their_facet() {
        let context = Context::new();
        let result = context
            .implementation_of::<dyn Square>()
            .for_method("scale")
            .implemented_by(|_, (factor,): (f64,)| factor);
        match result {
            Err(PolycastError::IncompatibleImplementation { facet, reason, .. }) => {
                assert_eq!(facet, "Square");
                assert!(reason.contains("Shape"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
