/*!

Facet metadata and the global facet catalog.

A facet is a trait declared with [`define_facet!`](crate::define_facet). The macro generates,
for each facet, a [`FacetInfo`] describing it (name, kind, parents, properties, methods), an
adapter struct implementing the trait by forwarding to a [`FacetView`], and an implementation
of [`Facet`] for the trait object type `dyn Trait`. The facet is identified by the `TypeId` of
that trait object type.

Every declared facet registers itself in the catalog from a `ctor` at program start. The catalog
is frozen on first read; lookups by id or name go through it.

*/

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::ptr;
use std::sync::{Arc, LazyLock, Mutex, OnceLock};

use crate::error::Result;
use crate::type_policy::ValueType;
use crate::value::{PropertyType, Value};
use crate::view::FacetView;
use crate::HashMap;

pub type FacetId = TypeId;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FacetKind {
    /// A structural contract. An entity can carry any number of them.
    Interface,
    /// A base class. An entity carries classes from a single inheritance chain.
    Class,
}

/// Implemented by every facet adapter, and therefore by every facet trait object.
pub trait FacetObject: Send + Sync {
    /// The view this adapter forwards to.
    fn facet_view(&self) -> &FacetView;

    #[doc(hidden)]
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Implemented for `dyn Trait` of every facet trait declared with `define_facet!`.
pub trait Facet: FacetObject + 'static {
    /// The generated adapter struct.
    type View: FacetObject + 'static;

    fn info() -> &'static FacetInfo;

    fn new_view(view: FacetView) -> Self::View;

    fn upcast(view: Arc<Self::View>) -> Arc<Self>;
}

type ViewConstructor = fn(FacetView) -> Arc<dyn FacetObject>;

pub struct FacetInfo {
    id: FacetId,
    name: &'static str,
    kind: FacetKind,
    parents: Vec<fn() -> &'static FacetInfo>,
    properties: Vec<PropertyInfo>,
    methods: Vec<MethodInfo>,
    make_view: ViewConstructor,
    closure: OnceLock<Vec<&'static FacetInfo>>,
}

impl FacetInfo {
    pub fn builder<F: Facet + ?Sized>(name: &'static str, kind: FacetKind) -> FacetInfoBuilder<F> {
        FacetInfoBuilder {
            info: FacetInfo {
                id: TypeId::of::<F>(),
                name,
                kind,
                parents: Vec::new(),
                properties: Vec::new(),
                methods: Vec::new(),
                make_view: |view| -> Arc<dyn FacetObject> { Arc::new(F::new_view(view)) },
                closure: OnceLock::new(),
            },
            marker: PhantomData,
        }
    }

    pub fn id(&self) -> FacetId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> FacetKind {
        self.kind
    }

    pub fn is_class(&self) -> bool {
        self.kind == FacetKind::Class
    }

    /// The direct parents, in declaration order.
    pub fn parents(&self) -> impl Iterator<Item = &'static FacetInfo> + '_ {
        self.parents.iter().map(|parent| parent())
    }

    /// The properties declared on this facet itself.
    pub fn properties(&self) -> &[PropertyInfo] {
        &self.properties
    }

    /// The methods declared on this facet itself.
    pub fn methods(&self) -> &[MethodInfo] {
        &self.methods
    }

    pub fn property(&self, name: &str) -> Option<&PropertyInfo> {
        self.properties.iter().find(|property| property.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|method| method.name == name)
    }

    /// This facet followed by all of its transitive ancestors, breadth first, without
    /// duplicates.
    pub fn closure(&'static self) -> &'static [&'static FacetInfo] {
        self.closure.get_or_init(|| {
            let mut closure: Vec<&'static FacetInfo> = vec![self];
            let mut next = 0;
            while next < closure.len() {
                let current = closure[next];
                for parent in current.parents() {
                    if !closure.iter().any(|known| known.id == parent.id) {
                        closure.push(parent);
                    }
                }
                next += 1;
            }
            closure
        })
    }

    /// Whether `self` is `derived` or one of its ancestors.
    pub fn is_assignable_from(&'static self, derived: &'static FacetInfo) -> bool {
        derived.closure().iter().any(|facet| facet.id == self.id)
    }

    /// Finds a property by name on this facet or, failing that, on its ancestors.
    pub fn find_property(&'static self, name: &str) -> Option<&'static PropertyInfo> {
        self.closure()
            .iter()
            .find_map(|facet| facet.property(name))
    }

    /// Finds a method by name on this facet or, failing that, on its ancestors.
    pub fn find_method(&'static self, name: &str) -> Option<&'static MethodInfo> {
        self.closure().iter().find_map(|facet| facet.method(name))
    }

    pub(crate) fn make_view(&self, view: FacetView) -> Arc<dyn FacetObject> {
        (self.make_view)(view)
    }
}

impl fmt::Debug for FacetInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FacetInfo")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("properties", &self.properties)
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}

impl PartialEq for FacetInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for FacetInfo {}

/// Assembles a [`FacetInfo`]. Used by `define_facet!`.
pub struct FacetInfoBuilder<F: ?Sized> {
    info: FacetInfo,
    marker: PhantomData<fn(&F)>,
}

impl<F: Facet + ?Sized> FacetInfoBuilder<F> {
    #[must_use]
    pub fn parent(mut self, parent: fn() -> &'static FacetInfo) -> Self {
        self.info.parents.push(parent);
        self
    }

    #[must_use]
    pub fn property<T: PropertyType>(mut self, name: &'static str, access: PropertyAccess) -> Self {
        self.info
            .properties
            .push(PropertyInfo::new::<F, T>(name, access, None));
        self
    }

    /// A property whose value is computed by `get` from the facet's other members.
    #[must_use]
    pub fn computed<T: PropertyType>(mut self, name: &'static str, get: fn(&F) -> T) -> Self {
        let accessors = ComputedAccessors {
            get: erase_getter::<F, T>(get),
            set: None,
        };
        self.info.properties.push(PropertyInfo::new::<F, T>(
            name,
            PropertyAccess::ReadOnly,
            Some(accessors),
        ));
        self
    }

    /// A computed property with a setter. The stored value is what `get` returns after `set`
    /// has run.
    #[must_use]
    pub fn computed_with_setter<T: PropertyType>(
        mut self,
        name: &'static str,
        get: fn(&F) -> T,
        set: fn(&F, T) -> Result<()>,
    ) -> Self {
        let setter: ComputedSetter = Box::new(move |view: &FacetView, value: Option<Value>| {
            let this = view.entity().act_like::<F>()?;
            set(&*this, T::from_value(value)?)
        });
        let accessors = ComputedAccessors {
            get: erase_getter::<F, T>(get),
            set: Some(setter),
        };
        self.info.properties.push(PropertyInfo::new::<F, T>(
            name,
            PropertyAccess::ReadWrite,
            Some(accessors),
        ));
        self
    }

    #[must_use]
    pub fn method<A: 'static, R: 'static>(mut self, name: &'static str, is_abstract: bool) -> Self {
        self.info.methods.push(MethodInfo {
            declaring: F::info,
            declaring_id: TypeId::of::<F>(),
            name,
            params: TypeId::of::<A>(),
            params_name: type_name::<A>(),
            returns: TypeId::of::<R>(),
            returns_name: type_name::<R>(),
            is_abstract,
        });
        self
    }

    pub fn build(self) -> FacetInfo {
        self.info
    }
}

fn erase_getter<F: Facet + ?Sized, T: PropertyType>(get: fn(&F) -> T) -> ComputedGetter {
    Box::new(move |view: &FacetView| {
        let this = view.entity().act_like::<F>()?;
        Ok(get(&*this).into_value())
    })
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyAccess {
    ReadWrite,
    ReadOnly,
}

pub(crate) type ComputedGetter = Box<dyn Fn(&FacetView) -> Result<Option<Value>> + Send + Sync>;
pub(crate) type ComputedSetter =
    Box<dyn Fn(&FacetView, Option<Value>) -> Result<()> + Send + Sync>;

pub(crate) struct ComputedAccessors {
    pub(crate) get: ComputedGetter,
    pub(crate) set: Option<ComputedSetter>,
}

/// A property declared on a facet. Its identity is (declaring facet, name, value type).
pub struct PropertyInfo {
    declaring: fn() -> &'static FacetInfo,
    declaring_id: FacetId,
    name: &'static str,
    value_type: ValueType,
    rust_type: TypeId,
    rust_type_name: &'static str,
    access: PropertyAccess,
    computed: Option<ComputedAccessors>,
    slot: OnceLock<&'static PropertyInfo>,
}

impl PropertyInfo {
    fn new<F: Facet + ?Sized, T: PropertyType>(
        name: &'static str,
        access: PropertyAccess,
        computed: Option<ComputedAccessors>,
    ) -> Self {
        PropertyInfo {
            declaring: F::info,
            declaring_id: TypeId::of::<F>(),
            name,
            value_type: T::value_type(),
            rust_type: TypeId::of::<T>(),
            rust_type_name: type_name::<T>(),
            access,
            computed,
            slot: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn declaring_facet(&self) -> &'static FacetInfo {
        (self.declaring)()
    }

    pub fn declaring_id(&self) -> FacetId {
        self.declaring_id
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    pub fn rust_type(&self) -> TypeId {
        self.rust_type
    }

    pub fn rust_type_name(&self) -> &'static str {
        self.rust_type_name
    }

    pub fn access(&self) -> PropertyAccess {
        self.access
    }

    pub fn is_read_only(&self) -> bool {
        self.access == PropertyAccess::ReadOnly
    }

    pub fn is_computed(&self) -> bool {
        self.computed.is_some()
    }

    pub(crate) fn computed(&self) -> Option<&ComputedAccessors> {
        self.computed.as_ref()
    }

    /// The property whose slot holds this property's value.
    ///
    /// A property redeclared with the same name and value type on an ancestor or a descendant is
    /// the same slot, and so is everything linked to it that way: two unrelated facets declaring
    /// `name` share it once some facet extends both and redeclares `name`. The slot is owned by
    /// the most basic property of that group.
    pub fn slot_property(&'static self) -> &'static PropertyInfo {
        self.slot.get_or_init(|| {
            let mut linked: Vec<&'static PropertyInfo> = vec![self];
            let mut next = 0;
            while next < linked.len() {
                let current = linked[next];
                let facet = current.declaring_facet();
                let descendants = facet_catalog()
                    .values()
                    .copied()
                    .filter(|other| facet.is_assignable_from(other));
                for other in facet.closure().iter().copied().chain(descendants) {
                    let Some(candidate) = other.property(current.name) else {
                        continue;
                    };
                    if candidate.value_type == current.value_type
                        && !linked.iter().any(|known| ptr::eq(*known, candidate))
                    {
                        linked.push(candidate);
                    }
                }
                next += 1;
            }
            linked
                .into_iter()
                .min_by_key(|property| {
                    let facet = property.declaring_facet();
                    (facet.closure().len(), facet.name(), facet.id())
                })
                .unwrap_or(self)
        })
    }

    /// Whether both properties are stored in the same slot.
    pub fn shares_slot_with(&'static self, other: &'static PropertyInfo) -> bool {
        ptr::eq(self.slot_property(), other.slot_property())
    }
}

impl fmt::Debug for PropertyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyInfo")
            .field("name", &self.name)
            .field("value_type", &self.value_type)
            .field("access", &self.access)
            .field("computed", &self.computed.is_some())
            .finish_non_exhaustive()
    }
}

impl PartialEq for PropertyInfo {
    fn eq(&self, other: &Self) -> bool {
        self.declaring_id == other.declaring_id
            && self.name == other.name
            && self.value_type == other.value_type
    }
}

impl Eq for PropertyInfo {}

/// A method declared on a facet. Parameters are described by the type of the argument tuple.
pub struct MethodInfo {
    declaring: fn() -> &'static FacetInfo,
    declaring_id: FacetId,
    name: &'static str,
    params: TypeId,
    params_name: &'static str,
    returns: TypeId,
    returns_name: &'static str,
    is_abstract: bool,
}

impl MethodInfo {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn declaring_facet(&self) -> &'static FacetInfo {
        (self.declaring)()
    }

    pub fn declaring_id(&self) -> FacetId {
        self.declaring_id
    }

    pub fn params(&self) -> TypeId {
        self.params
    }

    pub fn params_name(&self) -> &'static str {
        self.params_name
    }

    pub fn returns(&self) -> TypeId {
        self.returns
    }

    pub fn returns_name(&self) -> &'static str {
        self.returns_name
    }

    /// Abstract methods have no body and need a registered implementation.
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }
}

impl fmt::Debug for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} -> {}",
            self.name, self.params_name, self.returns_name
        )
    }
}

/// Facets registered by `ctor`s, collected until the catalog is first read.
static FACET_CATALOG_BUILDER: LazyLock<Mutex<Vec<fn() -> &'static FacetInfo>>> =
    LazyLock::new(|| Mutex::new(Vec::new()));

/// The frozen catalog, keyed by facet id.
static FACET_CATALOG: OnceLock<HashMap<FacetId, &'static FacetInfo>> = OnceLock::new();

fn facet_catalog() -> &'static HashMap<FacetId, &'static FacetInfo> {
    FACET_CATALOG.get_or_init(|| {
        let mut builder = FACET_CATALOG_BUILDER.lock().expect("Mutex poisoned");
        std::mem::take(&mut *builder)
            .into_iter()
            .map(|info| {
                let info = info();
                (info.id, info)
            })
            .collect()
    })
}

/// Registers a facet in the catalog. Called from the `ctor` generated by `define_facet!`.
pub fn add_to_facet_catalog(info: fn() -> &'static FacetInfo) {
    let mut builder = FACET_CATALOG_BUILDER.lock().expect("Mutex poisoned");
    if FACET_CATALOG.get().is_some() {
        panic!(
            "`add_to_facet_catalog()` called after the facet catalog was frozen; registration must occur during startup/ctors."
        );
    }
    builder.push(info);
}

pub fn facet_by_id(id: FacetId) -> Option<&'static FacetInfo> {
    facet_catalog().get(&id).copied()
}

pub fn facet_by_name(name: &str) -> Option<&'static FacetInfo> {
    facet_catalog().values().copied().find(|info| info.name == name)
}

/// Every facet in the catalog, sorted by name.
pub fn registered_facets() -> Vec<&'static FacetInfo> {
    let mut facets: Vec<_> = facet_catalog().values().copied().collect();
    facets.sort_by_key(|info| info.name);
    facets
}
