use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use indexmap::IndexMap;

use super::native::NativeFields;
use super::property_store::PropertyStore;
use crate::collections::merge_into;
use crate::context::Context;
use crate::error::{PolycastError, Result};
use crate::facet::{Facet, FacetId, FacetInfo, FacetObject, PropertyInfo};
use crate::log::trace;
use crate::value::{PropertyType, Value};
use crate::HashMap;

/// Identifies an entity within its context. Ids are handed out in creation order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    pub(crate) fn new(id: u64) -> Self {
        EntityId(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A handle to an entity. Handles compare equal when they refer to the same entity.
#[derive(Clone)]
pub struct Entity(Arc<EntityCore>);

struct EntityCore {
    id: EntityId,
    context: Context,
    locked: AtomicBool,
    state: Mutex<EntityState>,
    native: Option<Mutex<Box<dyn NativeFields>>>,
}

#[derive(Default)]
pub(crate) struct EntityState {
    facets: IndexMap<FacetId, &'static FacetInfo>,
    pub(crate) store: PropertyStore,
    views: HashMap<FacetId, Weak<dyn FacetObject>>,
}

impl EntityState {
    /// Attaches `facet` and all of its ancestors, ancestors first. Already attached facets keep
    /// their position.
    pub(crate) fn attach(&mut self, id: EntityId, facet: &'static FacetInfo) {
        for &facet in facet.closure().iter().rev() {
            if !self.facets.contains_key(&facet.id()) {
                trace!("entity {id} now acts like `{}`", facet.name());
                self.facets.insert(facet.id(), facet);
            }
        }
    }

    pub(crate) fn is_attached(&self, facet: FacetId) -> bool {
        self.facets.contains_key(&facet)
    }

    pub(crate) fn attached(&self) -> Vec<&'static FacetInfo> {
        self.facets.values().copied().collect()
    }

    /// Class facets form a single chain: a requested class must be an ancestor or a descendant of
    /// every class already attached.
    pub(crate) fn check_class_cast(&self, requested: &'static FacetInfo) -> Result<()> {
        if !requested.is_class() {
            return Ok(());
        }
        let conflict = self.facets.values().find(|attached| {
            attached.is_class()
                && !attached.is_assignable_from(requested)
                && !requested.is_assignable_from(attached)
        });
        match conflict {
            Some(attached) => Err(PolycastError::ConflictingClassCast {
                attached: attached.name(),
                requested: requested.name(),
            }),
            None => Ok(()),
        }
    }

    pub(crate) fn cached_view(&self, facet: FacetId) -> Option<Arc<dyn FacetObject>> {
        self.views.get(&facet).and_then(Weak::upgrade)
    }

    pub(crate) fn cache_view(&mut self, facet: FacetId, view: &Arc<dyn FacetObject>) {
        self.views.insert(facet, Arc::downgrade(view));
    }
}

impl Entity {
    pub(crate) fn new(
        id: EntityId,
        context: Context,
        native: Option<Box<dyn NativeFields>>,
    ) -> Self {
        Entity(Arc::new(EntityCore {
            id,
            context,
            locked: AtomicBool::new(false),
            state: Mutex::new(EntityState::default()),
            native: native.map(Mutex::new),
        }))
    }

    pub fn id(&self) -> EntityId {
        self.0.id
    }

    pub fn context(&self) -> &Context {
        &self.0.context
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, EntityState> {
        self.0.state.lock().expect("Mutex poisoned")
    }

    /// Makes property writes through facet views fail with `InstanceLocked`. Reads still work, and
    /// assignments made directly to native fields are not affected.
    pub fn lock(&self) {
        self.0.locked.store(true, Ordering::Release);
    }

    pub fn unlock(&self) {
        self.0.locked.store(false, Ordering::Release);
    }

    pub fn is_locked(&self) -> bool {
        self.0.locked.load(Ordering::Acquire)
    }

    /// The attached facets, in attachment order.
    pub fn attached_facets(&self) -> Vec<&'static FacetInfo> {
        self.state().attached()
    }

    pub fn is<F: Facet + ?Sized>(&self) -> bool {
        self.state().is_attached(F::info().id())
    }

    pub(crate) fn attach(&self, facet: &'static FacetInfo) {
        self.state().attach(self.id(), facet);
    }

    /// Detaches `F` alone and drops the cached view for it. Slot values written through `F` stay
    /// in the store and are visible again if the entity is cast back. Returns whether `F` was
    /// attached.
    pub fn undo_act_like<F: Facet + ?Sized>(&self) -> bool {
        let id = F::info().id();
        let mut state = self.state();
        state.views.remove(&id);
        state.facets.shift_remove(&id).is_some()
    }

    /// Reads `property`. A native field of the same name takes precedence; otherwise the
    /// declaring facet is attached and the slot is read, materializing a default if it is empty.
    pub fn get_property(&self, property: &'static PropertyInfo) -> Result<Option<Value>> {
        if let Some(value) = self.native_get(property)? {
            return Ok(value);
        }
        let mut state = self.state();
        state.attach(self.id(), property.declaring_facet());
        Ok(state.store.get_or_default(property))
    }

    /// Writes `property`, failing with `InstanceLocked` if the entity is locked.
    pub fn set_property(
        &self,
        property: &'static PropertyInfo,
        value: Option<Value>,
    ) -> Result<()> {
        if self.is_locked() {
            return Err(PolycastError::InstanceLocked);
        }
        self.store_property(property, value)
    }

    /// Writes `property` regardless of the lock.
    ///
    /// A collection write merges into the slot's container after the entity's state has been
    /// released, so change observers are free to use the entity.
    pub(crate) fn store_property(
        &self,
        property: &'static PropertyInfo,
        value: Option<Value>,
    ) -> Result<()> {
        if let Some(native) = &self.0.native {
            let mut native = native.lock().expect("Mutex poisoned");
            if native.has_field(property.name()) {
                return native.set_field(property.name(), value);
            }
        }
        let container = {
            let mut state = self.state();
            state.attach(self.id(), property.declaring_facet());
            if !property.value_type().is_collection() {
                return state.store.set(property, value);
            }
            state.store.container(property)?
        };
        merge_into(&container, value, property.is_read_only())
    }

    /// The slot value of `property` without materializing a default or attaching anything.
    pub(crate) fn peek_property(&self, property: &'static PropertyInfo) -> Option<Value> {
        self.state().store.peek(property)
    }

    /// Overwrites the slot of `property` without collection merging.
    pub(crate) fn replace_property(&self, property: &'static PropertyInfo, value: Option<Value>) {
        let mut state = self.state();
        state.attach(self.id(), property.declaring_facet());
        state.store.replace(property, value);
    }

    fn native_get(&self, property: &'static PropertyInfo) -> Result<Option<Option<Value>>> {
        let Some(native) = &self.0.native else {
            return Ok(None);
        };
        let native = native.lock().expect("Mutex poisoned");
        if !native.has_field(property.name()) {
            return Ok(None);
        }
        match native.get_field(property.name()) {
            Some(value) if !property.value_type().accepts(&value) => Err(
                PolycastError::type_mismatch(property.value_type(), value.kind_name()),
            ),
            value => Ok(Some(value)),
        }
    }

    pub(crate) fn create_native_child(&self) -> Option<Box<dyn NativeFields>> {
        let native = self.0.native.as_ref()?;
        native.lock().expect("Mutex poisoned").create_child()
    }

    /// Runs `f` against the native object if it has type `N`.
    pub fn with_native<N: NativeFields, R>(&self, f: impl FnOnce(&N) -> R) -> Option<R> {
        let native = self.0.native.as_ref()?.lock().expect("Mutex poisoned");
        let native: &dyn Any = &**native;
        native.downcast_ref::<N>().map(f)
    }

    /// Runs `f` against the native object if it has type `N`. The lock flag does not apply.
    pub fn with_native_mut<N: NativeFields, R>(&self, f: impl FnOnce(&mut N) -> R) -> Option<R> {
        let mut native = self.0.native.as_ref()?.lock().expect("Mutex poisoned");
        let native: &mut dyn Any = &mut **native;
        native.downcast_mut::<N>().map(f)
    }

    /// Reads property `name` of facet `F` through a view of `F`.
    pub fn get<F: Facet + ?Sized, T: PropertyType>(&self, name: &str) -> Result<T> {
        let property = typed_property::<F, T>(name)?;
        let view = self.act_like::<F>()?;
        T::from_value(FacetObject::facet_view(&*view).get_value(property)?)
    }

    /// Writes property `name` of facet `F` through a view of `F`.
    pub fn set<F: Facet + ?Sized, T: PropertyType>(&self, name: &str, value: T) -> Result<()> {
        let property = typed_property::<F, T>(name)?;
        let view = self.act_like::<F>()?;
        FacetObject::facet_view(&*view).set_value(property, value.into_value())
    }
}

fn typed_property<F: Facet + ?Sized, T: PropertyType>(
    name: &str,
) -> Result<&'static PropertyInfo> {
    let facet = F::info();
    let property = facet.find_property(name).ok_or_else(|| {
        PolycastError::InvalidArgument(format!(
            "facet `{}` has no property `{name}`",
            facet.name()
        ))
    })?;
    let expected = T::value_type();
    if property.value_type() != &expected {
        return Err(PolycastError::type_mismatch(property.value_type(), expected));
    }
    Ok(property)
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Entity {}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.0).hash(state);
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity{}", self.0.id)
    }
}
