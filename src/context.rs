//! The `Context` owns the process-wide state the rest of the crate consults: the implementation
//! registry, the adapter blueprint cache and the configuration. Applications construct one and
//! create entities from it; every entity remembers the context it came from.
//!
//! ```
//! use polycast::prelude::*;
//!
//! let context = Context::new();
//! let entity = context.new_entity();
//! assert!(entity.attached_facets().is_empty());
//! ```
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::Config;
use crate::entity::{Entity, EntityId, NativeFields};
use crate::error::{PolycastError, Result};
use crate::facet::{facet_by_name, Facet, FacetInfo};
use crate::registry::{ImplementationBuilder, ImplementationRegistry};
use crate::view::AdapterCache;

#[derive(Clone)]
pub struct Context(Arc<ContextInner>);

struct ContextInner {
    config: Config,
    implementations: ImplementationRegistry,
    adapters: AdapterCache,
    next_entity_id: AtomicU64,
}

impl Context {
    pub fn new() -> Context {
        Context::with_config(Config::default())
    }

    /// Builds a context from `config`, installing its logging settings.
    pub fn with_config(config: Config) -> Context {
        config.apply_logging();
        Context(Arc::new(ContextInner {
            config,
            implementations: ImplementationRegistry::default(),
            adapters: AdapterCache::default(),
            next_entity_id: AtomicU64::new(0),
        }))
    }

    pub fn config(&self) -> &Config {
        &self.0.config
    }

    /// Creates an empty entity with no facets attached.
    pub fn new_entity(&self) -> Entity {
        self.create_entity(None)
    }

    /// Creates an entity whose properties are looked up in `native` first.
    pub fn new_entity_with<N: NativeFields>(&self, native: N) -> Entity {
        self.create_entity(Some(Box::new(native)))
    }

    pub(crate) fn create_entity(&self, native: Option<Box<dyn NativeFields>>) -> Entity {
        let id = EntityId::new(self.0.next_entity_id.fetch_add(1, Ordering::Relaxed));
        let entity = Entity::new(id, self.clone(), native);
        if self.0.config.lock_new_entities {
            entity.lock();
        }
        entity
    }

    /// Starts registering implementations for members of facet `F`.
    pub fn implementation_of<F: Facet + ?Sized>(&self) -> ImplementationBuilder<'_, F> {
        ImplementationBuilder::new(&self.0.implementations)
    }

    pub fn implementations(&self) -> &ImplementationRegistry {
        &self.0.implementations
    }

    pub(crate) fn adapters(&self) -> &AdapterCache {
        &self.0.adapters
    }

    /// Looks a facet up in the catalog by name.
    pub fn facet_named(&self, name: &str) -> Result<&'static FacetInfo> {
        if name.is_empty() {
            return Err(PolycastError::InvalidArgument(
                "facet name must not be empty".to_string(),
            ));
        }
        facet_by_name(name).ok_or_else(|| PolycastError::NotAnInterfaceOrClass(name.to_string()))
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}
