//! The dynamic value model.
//!
//! Every value held in an entity's slots is a [`Value`]. Facet accessors are typed: they convert
//! between Rust types and `Value` through [`PropertyType`]. An absent value is `None`.
use std::any::{type_name, Any, TypeId};
use std::fmt::{self, Debug};
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use crate::collections::{List, Map, ObservableList, ObservableMap, ObservableSet, Set};
use crate::entity::Entity;
use crate::error::{PolycastError, Result};
use crate::facet::{Facet, FacetInfo, FacetObject};
use crate::type_policy::ValueType;

#[derive(Clone)]
pub enum Value {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Char(char),
    Text(String),
    Bytes(Vec<u8>),
    View(ViewRef),
    Object(ObjectRef),
    List(ObservableList),
    Set(ObservableSet),
    Map(ObservableMap),
}

impl Value {
    /// A short name for the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::UInt(_) => "UInt",
            Value::Float(_) => "Float",
            Value::Char(_) => "Char",
            Value::Text(_) => "Text",
            Value::Bytes(_) => "Bytes",
            Value::View(_) => "View",
            Value::Object(_) => "Object",
            Value::List(_) => "List",
            Value::Set(_) => "Set",
            Value::Map(_) => "Map",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            Value::UInt(value) => i64::try_from(*value).ok(),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_view(&self) -> Option<&ViewRef> {
        match self {
            Value::View(view) => Some(view),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ObservableList> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&ObservableSet> {
        match self {
            Value::Set(set) => Some(set),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ObservableMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Whether this value is one of the container variants.
    pub fn is_container(&self) -> bool {
        matches!(self, Value::List(_) | Value::Set(_) | Value::Map(_))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::UInt(a), Value::UInt(b)) => a == b,
            // Bitwise so that `Value` can be a set element or map key.
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::View(a), Value::View(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::List(a), Value::List(b)) => a.ptr_eq(b),
            (Value::Set(a), Value::Set(b)) => a.ptr_eq(b),
            (Value::Map(a), Value::Map(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Bool(value) => value.hash(state),
            Value::Int(value) => value.hash(state),
            Value::UInt(value) => value.hash(state),
            Value::Float(value) => value.to_bits().hash(state),
            Value::Char(value) => value.hash(state),
            Value::Text(value) => value.hash(state),
            Value::Bytes(value) => value.hash(state),
            Value::View(view) => view.hash(state),
            Value::Object(object) => object.hash(state),
            Value::List(list) => list.address().hash(state),
            Value::Set(set) => set.address().hash(state),
            Value::Map(map) => map.address().hash(state),
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(value) => write!(f, "Bool({value})"),
            Value::Int(value) => write!(f, "Int({value})"),
            Value::UInt(value) => write!(f, "UInt({value})"),
            Value::Float(value) => write!(f, "Float({value})"),
            Value::Char(value) => write!(f, "Char({value:?})"),
            Value::Text(value) => write!(f, "Text({value:?})"),
            Value::Bytes(value) => write!(f, "Bytes({value:?})"),
            Value::View(view) => view.fmt(f),
            Value::Object(object) => object.fmt(f),
            Value::List(list) => write!(f, "List({:?})", list.to_vec()),
            Value::Set(set) => write!(f, "Set({:?})", set.to_vec()),
            Value::Map(map) => write!(f, "Map({:?})", map.entries()),
        }
    }
}

macro_rules! impl_value_from {
    ($($ty:ty => $variant:ident as $target:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(<$target>::from(value))
                }
            }
        )*
    };
}

impl_value_from!(
    bool => Bool as bool,
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int as i64,
    u8 => UInt as u64,
    u16 => UInt as u64,
    u32 => UInt as u64,
    u64 => UInt as u64,
    f32 => Float as f64,
    f64 => Float as f64,
    char => Char as char,
    String => Text as String,
    &str => Text as String,
);

/// A reference to an entity, remembering the facet it was taken through.
///
/// Two view references are equal when they refer to the same entity, whatever the facet.
#[derive(Clone)]
pub struct ViewRef {
    entity: Entity,
    facet: &'static FacetInfo,
}

impl ViewRef {
    pub fn new(entity: Entity, facet: &'static FacetInfo) -> Self {
        ViewRef { entity, facet }
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    /// The facet the reference was taken through.
    pub fn facet(&self) -> &'static FacetInfo {
        self.facet
    }

    pub fn act_like<F: Facet + ?Sized>(&self) -> Result<Arc<F>> {
        self.entity.act_like::<F>()
    }
}

impl PartialEq for ViewRef {
    fn eq(&self, other: &Self) -> bool {
        self.entity == other.entity
    }
}

impl Eq for ViewRef {}

impl Hash for ViewRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entity.hash(state);
    }
}

impl Debug for ViewRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "View({} of {:?})", self.facet.name(), self.entity)
    }
}

/// An opaque reference value stored in a slot.
///
/// Implement it with [`impl_object!`](crate::impl_object). `copy_object` is the copy contract used
/// by deep clones; objects that do not provide it are shared between the original and the clone.
pub trait Object: Any + Send + Sync + Debug {
    fn as_any(&self) -> &dyn Any;

    fn copy_object(&self) -> Option<Arc<dyn Object>> {
        None
    }
}

#[derive(Clone)]
pub struct ObjectRef(Arc<dyn Object>);

impl ObjectRef {
    pub fn new<T: Object>(object: T) -> Self {
        ObjectRef(Arc::new(object))
    }

    pub fn from_arc(object: Arc<dyn Object>) -> Self {
        ObjectRef(object)
    }

    pub fn object_type_id(&self) -> TypeId {
        self.0.as_any().type_id()
    }

    pub fn downcast_ref<T: Object>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    pub fn copy_object(&self) -> Option<ObjectRef> {
        self.0.copy_object().map(ObjectRef)
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        self.address() == other.address()
    }

    pub(crate) fn address(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ObjectRef {}

impl Hash for ObjectRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

impl Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({:?})", self.0)
    }
}

/// A typed shared handle to an [`Object`], usable as a property type through
/// `Option<Shared<T>>`.
pub struct Shared<T: Object>(Arc<T>);

impl<T: Object> Shared<T> {
    pub fn new(object: T) -> Self {
        Shared(Arc::new(object))
    }

    pub fn ptr_eq(&self, other: &Shared<T>) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: Object> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Shared(Arc::clone(&self.0))
    }
}

impl<T: Object> Deref for Shared<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: Object> Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Conversion between a Rust type and the stored [`Value`] representation.
///
/// `from_value(None)` produces the type's empty value; value types never observe it through facet
/// accessors because reads materialize a default first.
pub trait PropertyType: Clone + Send + Sync + 'static {
    fn value_type() -> ValueType;
    fn into_value(self) -> Option<Value>;
    fn from_value(value: Option<Value>) -> Result<Self>;
}

fn mismatch<T>(found: &Option<Value>) -> PolycastError {
    PolycastError::type_mismatch(
        type_name::<T>(),
        found.as_ref().map_or("None", Value::kind_name),
    )
}

macro_rules! impl_integer_property {
    ($($ty:ty => $value_type:ident),* $(,)?) => {
        $(
            impl PropertyType for $ty {
                fn value_type() -> ValueType {
                    ValueType::$value_type
                }

                fn into_value(self) -> Option<Value> {
                    Some(Value::from(self))
                }

                fn from_value(value: Option<Value>) -> Result<Self> {
                    match &value {
                        None => Ok(0),
                        Some(Value::Int(v)) => <$ty>::try_from(*v).map_err(|_| mismatch::<$ty>(&value)),
                        Some(Value::UInt(v)) => <$ty>::try_from(*v).map_err(|_| mismatch::<$ty>(&value)),
                        _ => Err(mismatch::<$ty>(&value)),
                    }
                }
            }
        )*
    };
}

impl_integer_property!(
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => UInt,
    u16 => UInt,
    u32 => UInt,
    u64 => UInt,
);

impl PropertyType for f64 {
    fn value_type() -> ValueType {
        ValueType::Float
    }

    fn into_value(self) -> Option<Value> {
        Some(Value::Float(self))
    }

    #[allow(clippy::cast_precision_loss)]
    fn from_value(value: Option<Value>) -> Result<Self> {
        match &value {
            None => Ok(0.0),
            Some(Value::Float(v)) => Ok(*v),
            Some(Value::Int(v)) => Ok(*v as f64),
            Some(Value::UInt(v)) => Ok(*v as f64),
            _ => Err(mismatch::<f64>(&value)),
        }
    }
}

impl PropertyType for f32 {
    fn value_type() -> ValueType {
        ValueType::Float
    }

    fn into_value(self) -> Option<Value> {
        Some(Value::Float(f64::from(self)))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: Option<Value>) -> Result<Self> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl PropertyType for bool {
    fn value_type() -> ValueType {
        ValueType::Bool
    }

    fn into_value(self) -> Option<Value> {
        Some(Value::Bool(self))
    }

    fn from_value(value: Option<Value>) -> Result<Self> {
        match &value {
            None => Ok(false),
            Some(Value::Bool(v)) => Ok(*v),
            _ => Err(mismatch::<bool>(&value)),
        }
    }
}

impl PropertyType for char {
    fn value_type() -> ValueType {
        ValueType::Char
    }

    fn into_value(self) -> Option<Value> {
        Some(Value::Char(self))
    }

    fn from_value(value: Option<Value>) -> Result<Self> {
        match &value {
            None => Ok('\0'),
            Some(Value::Char(v)) => Ok(*v),
            _ => Err(mismatch::<char>(&value)),
        }
    }
}

impl PropertyType for String {
    fn value_type() -> ValueType {
        ValueType::Text
    }

    fn into_value(self) -> Option<Value> {
        Some(Value::Text(self))
    }

    fn from_value(value: Option<Value>) -> Result<Self> {
        match value {
            None => Ok(String::new()),
            Some(Value::Text(v)) => Ok(v),
            other => Err(mismatch::<String>(&other)),
        }
    }
}

impl PropertyType for Option<String> {
    fn value_type() -> ValueType {
        ValueType::Text
    }

    fn into_value(self) -> Option<Value> {
        self.map(Value::Text)
    }

    fn from_value(value: Option<Value>) -> Result<Self> {
        match value {
            None => Ok(None),
            Some(Value::Text(v)) => Ok(Some(v)),
            other => Err(mismatch::<Option<String>>(&other)),
        }
    }
}

impl PropertyType for Vec<u8> {
    fn value_type() -> ValueType {
        ValueType::Bytes
    }

    fn into_value(self) -> Option<Value> {
        Some(Value::Bytes(self))
    }

    fn from_value(value: Option<Value>) -> Result<Self> {
        match value {
            None => Ok(Vec::new()),
            Some(Value::Bytes(v)) => Ok(v),
            other => Err(mismatch::<Vec<u8>>(&other)),
        }
    }
}

impl<F: Facet + ?Sized> PropertyType for Option<Arc<F>> {
    fn value_type() -> ValueType {
        ValueType::Facet(TypeId::of::<F>(), type_name::<F>())
    }

    fn into_value(self) -> Option<Value> {
        self.map(|view| {
            let view = FacetObject::facet_view(&*view);
            Value::View(ViewRef::new(view.entity().clone(), view.current_facet()))
        })
    }

    fn from_value(value: Option<Value>) -> Result<Self> {
        match value {
            None => Ok(None),
            Some(Value::View(view)) => view.act_like::<F>().map(Some),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl<T: Object> PropertyType for Option<Shared<T>> {
    fn value_type() -> ValueType {
        ValueType::Object(TypeId::of::<T>(), type_name::<T>())
    }

    fn into_value(self) -> Option<Value> {
        self.map(|shared| Value::Object(ObjectRef(shared.0)))
    }

    fn from_value(value: Option<Value>) -> Result<Self> {
        match value {
            None => Ok(None),
            Some(Value::Object(ObjectRef(object))) => {
                if object.as_any().type_id() != TypeId::of::<T>() {
                    return Err(mismatch::<Self>(&Some(Value::Object(ObjectRef(object)))));
                }
                let object: Arc<dyn Any + Send + Sync> = object;
                object
                    .downcast::<T>()
                    .map(|object| Some(Shared(object)))
                    .map_err(|_| PolycastError::type_mismatch(type_name::<T>(), "Object"))
            }
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl<T: PropertyType> PropertyType for List<T> {
    fn value_type() -> ValueType {
        ValueType::Sequence(Box::new(T::value_type()))
    }

    fn into_value(self) -> Option<Value> {
        Some(Value::List(self.into_raw()))
    }

    fn from_value(value: Option<Value>) -> Result<Self> {
        match value {
            None => Ok(List::new()),
            Some(Value::List(raw)) => List::from_raw(raw),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl<T: PropertyType> PropertyType for Set<T> {
    fn value_type() -> ValueType {
        ValueType::Set(Box::new(T::value_type()))
    }

    fn into_value(self) -> Option<Value> {
        Some(Value::Set(self.into_raw()))
    }

    fn from_value(value: Option<Value>) -> Result<Self> {
        match value {
            None => Ok(Set::new()),
            Some(Value::Set(raw)) => Set::from_raw(raw),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl<K: PropertyType, V: PropertyType> PropertyType for Map<K, V> {
    fn value_type() -> ValueType {
        ValueType::Map(Box::new(K::value_type()), Box::new(V::value_type()))
    }

    fn into_value(self) -> Option<Value> {
        Some(Value::Map(self.into_raw()))
    }

    fn from_value(value: Option<Value>) -> Result<Self> {
        match value {
            None => Ok(Map::new()),
            Some(Value::Map(raw)) => Map::from_raw(raw),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::HashSet;

    #[derive(Debug, Clone, PartialEq)]
    struct Money(i64);
    crate::impl_object!(Money, copy);

    #[derive(Debug)]
    struct Handle;
    crate::impl_object!(Handle);

    #[test]
    fn floats_hash_by_bits() {
        let mut set = HashSet::default();
        set.insert(Value::Float(1.5));
        assert!(set.contains(&Value::Float(1.5)));
        assert!(!set.contains(&Value::Int(1)));
    }

    #[test]
    fn integers_convert_within_range() {
        assert_eq!(i32::from_value(Some(Value::Int(7))).unwrap(), 7);
        assert_eq!(u8::from_value(Some(Value::Int(200))).unwrap(), 200);
        assert!(matches!(
            u8::from_value(Some(Value::Int(-1))),
            Err(PolycastError::TypeMismatch { .. })
        ));
        assert_eq!(i64::from_value(None).unwrap(), 0);
    }

    #[test]
    fn text_rejects_other_kinds() {
        assert!(String::from_value(Some(Value::Bool(true))).is_err());
        assert_eq!(Option::<String>::from_value(None).unwrap(), None);
        assert_eq!(
            String::from_value(Some("widget".into())).unwrap(),
            "widget".to_string()
        );
    }

    #[test]
    fn objects_round_trip_through_shared() {
        let shared = Shared::new(Money(5));
        let value = Some(shared.clone()).into_value();
        let back = Option::<Shared<Money>>::from_value(value).unwrap().unwrap();
        assert!(back.ptr_eq(&shared));
        assert_eq!(back.0 .0, 5);
    }

    #[test]
    fn objects_of_another_type_mismatch() {
        let value = Some(Value::Object(ObjectRef::new(Handle)));
        assert!(Option::<Shared<Money>>::from_value(value).is_err());
    }

    #[test]
    fn copy_contract() {
        let money = ObjectRef::new(Money(3));
        let copy = money.copy_object().unwrap();
        assert!(!copy.ptr_eq(&money));
        assert_eq!(copy.downcast_ref::<Money>(), Some(&Money(3)));
        assert!(ObjectRef::new(Handle).copy_object().is_none());
    }
}
