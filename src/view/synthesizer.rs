use std::sync::{Arc, RwLock};

use super::FacetView;
use crate::entity::Entity;
use crate::error::{PolycastError, Result};
use crate::facet::{facet_by_id, Facet, FacetId, FacetInfo, FacetObject, PropertyInfo};
use crate::log::debug;
use crate::registry::{
    ImplementationRegistry, MemberKey, MethodImplementation, PropertyImplementation,
};
use crate::HashMap;

/// The dispatch table shared by every view of one facet within a context: the registered
/// implementations for the members of the facet and all of its ancestors.
///
/// A blueprint is a snapshot. Implementations registered after it was synthesized are not seen by
/// views of that facet in the same context.
pub(crate) struct Blueprint {
    methods: HashMap<MemberKey, MethodImplementation>,
    properties: HashMap<MemberKey, PropertyImplementation>,
}

impl Blueprint {
    fn synthesize(
        facet: &'static FacetInfo,
        registry: &ImplementationRegistry,
    ) -> Result<Blueprint> {
        let mut methods = HashMap::default();
        let mut properties = HashMap::default();

        for declaring in facet.closure() {
            for method in declaring.methods() {
                let key = (declaring.id(), method.name());
                match registry.method(&key) {
                    Some(implementation) => {
                        methods.insert(key, implementation);
                    }
                    None if method.is_abstract() => {
                        return Err(PolycastError::MissingImplementation {
                            facet: declaring.name(),
                            member: method.name(),
                        });
                    }
                    None => {}
                }
            }
            for property in declaring.properties() {
                let key = (declaring.id(), property.name());
                if let Some(implementation) = registry.property(&key) {
                    properties.insert(key, implementation);
                }
            }
        }

        debug!(
            "synthesized blueprint for `{}` ({} methods, {} properties implemented)",
            facet.name(),
            methods.len(),
            properties.len()
        );
        Ok(Blueprint {
            methods,
            properties,
        })
    }

    pub(crate) fn method(
        &self,
        facet: FacetId,
        name: &'static str,
    ) -> Option<&MethodImplementation> {
        self.methods.get(&(facet, name))
    }

    pub(crate) fn property(&self, property: &PropertyInfo) -> Option<&PropertyImplementation> {
        self.properties.get(&(property.declaring_id(), property.name()))
    }
}

/// Blueprints by facet closure, built on first use and then reused for every cast.
#[derive(Default)]
pub(crate) struct AdapterCache {
    blueprints: RwLock<HashMap<Vec<FacetId>, Arc<Blueprint>>>,
}

impl AdapterCache {
    pub(crate) fn blueprint_for(
        &self,
        facet: &'static FacetInfo,
        registry: &ImplementationRegistry,
    ) -> Result<Arc<Blueprint>> {
        let key: Vec<FacetId> = facet.closure().iter().map(|facet| facet.id()).collect();
        if let Some(blueprint) = self.blueprints.read().expect("RwLock poisoned").get(&key) {
            return Ok(Arc::clone(blueprint));
        }

        let mut blueprints = self.blueprints.write().expect("RwLock poisoned");
        if let Some(blueprint) = blueprints.get(&key) {
            return Ok(Arc::clone(blueprint));
        }
        let blueprint = Arc::new(Blueprint::synthesize(facet, registry)?);
        blueprints.insert(key, Arc::clone(&blueprint));
        Ok(blueprint)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.blueprints.read().expect("RwLock poisoned").len()
    }
}

impl Entity {
    /// Casts the entity to facet `F`, attaching `F` and its ancestors. While a view of `F` is
    /// alive, casting again returns that same view.
    ///
    /// The entity caches its views through weak references, so a view never keeps itself cached.
    /// Once every handle to a view is dropped, the next cast synthesizes a new view; slot values
    /// are unaffected. Compare views with [`FacetObject::unwrap_entity`] rather than
    /// [`Arc::ptr_eq`] when identity must survive that.
    pub fn act_like<F: Facet + ?Sized>(&self) -> Result<Arc<F>> {
        let view = self.view_for(F::info())?;
        super::downcast_view::<F>(view)
            .ok_or_else(|| PolycastError::NotAnInterfaceOrClass(F::info().name().to_string()))
    }

    /// Casts the entity to the facet with id `facet`, returning a type-erased view.
    pub fn act_like_dyn(&self, facet: FacetId) -> Result<Arc<dyn FacetObject>> {
        let info = facet_by_id(facet)
            .ok_or_else(|| PolycastError::NotAnInterfaceOrClass(format!("{facet:?}")))?;
        self.view_for(info)
    }

    pub(crate) fn view_for(&self, facet: &'static FacetInfo) -> Result<Arc<dyn FacetObject>> {
        {
            let state = self.state();
            if let Some(view) = state.cached_view(facet.id()) {
                return Ok(view);
            }
            state.check_class_cast(facet)?;
        }

        // The entity lock is never held while the blueprint cache is locked.
        let context = self.context();
        let blueprint = context
            .adapters()
            .blueprint_for(facet, context.implementations())?;

        let mut state = self.state();
        if let Some(view) = state.cached_view(facet.id()) {
            return Ok(view);
        }
        state.check_class_cast(facet)?;
        state.attach(self.id(), facet);
        let view = facet.make_view(FacetView::new(self.clone(), facet, blueprint));
        state.cache_view(facet.id(), &view);
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    define_facet! {
        interface Speaker {
            prop volume: u8;
            fn speak(&self) -> String;
        }
    }

    define_facet! {
        interface LoudSpeaker: Speaker {
            prop boost: u8;
        }
    }

    #[test]
    fn missing_abstract_implementation_fails_the_cast() {
        let entity = Context::new().new_entity();
        assert!(matches!(
            entity.act_like::<dyn LoudSpeaker>(),
            Err(PolycastError::MissingImplementation {
                facet: "Speaker",
                member: "speak"
            })
        ));
        assert!(entity.attached_facets().is_empty());
    }

    #[test]
    fn blueprints_are_shared_per_facet() {
        let context = Context::new();
        context
            .implementation_of::<dyn Speaker>()
            .for_method("speak")
            .implemented_by(|this, (): ()| format!("at {}", this.volume()))
            .unwrap();

        let first = context.new_entity().act_like::<dyn LoudSpeaker>().unwrap();
        let second = context.new_entity().act_like::<dyn LoudSpeaker>().unwrap();
        assert_eq!(context.adapters().len(), 1);
        assert_eq!(first.speak(), "at 0");
        second.set_volume(11).unwrap();
        assert_eq!(second.speak(), "at 11");
        assert_eq!(
            first.facet_view().current_facet().name(),
            "LoudSpeaker"
        );
    }
}
