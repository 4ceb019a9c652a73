//! Classification of declared property types and their default values.
//!
//! A [`ValueType`] describes what a property holds. Its [`ValueCategory`] partitions an entity's
//! slots: scalar value types get one bucket per kind, everything else shares the reference
//! bucket. [`ValueType::default_value`] produces what a never-written property reads as.
use std::any::TypeId;
use std::fmt;

use crate::collections::{ObservableList, ObservableMap, ObservableSet};
use crate::error::{PolycastError, Result};
use crate::value::Value;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    Int,
    UInt,
    Float,
    Char,
    Text,
    Bytes,
    /// A view of an entity through the facet with this id.
    Facet(TypeId, &'static str),
    /// An opaque object of this concrete type.
    Object(TypeId, &'static str),
    Sequence(Box<ValueType>),
    Set(Box<ValueType>),
    Map(Box<ValueType>, Box<ValueType>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarKind {
    Bool,
    Int,
    UInt,
    Float,
    Char,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueCategory {
    Value(ScalarKind),
    Reference,
}

impl ValueType {
    pub fn category(&self) -> ValueCategory {
        match self {
            ValueType::Bool => ValueCategory::Value(ScalarKind::Bool),
            ValueType::Int => ValueCategory::Value(ScalarKind::Int),
            ValueType::UInt => ValueCategory::Value(ScalarKind::UInt),
            ValueType::Float => ValueCategory::Value(ScalarKind::Float),
            ValueType::Char => ValueCategory::Value(ScalarKind::Char),
            _ => ValueCategory::Reference,
        }
    }

    pub fn is_value_type(&self) -> bool {
        matches!(self.category(), ValueCategory::Value(_))
    }

    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            ValueType::Sequence(_) | ValueType::Set(_) | ValueType::Map(_, _)
        )
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, ValueType::Sequence(_))
    }

    pub fn is_set(&self) -> bool {
        matches!(self, ValueType::Set(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, ValueType::Map(_, _))
    }

    /// The element type of a sequence or set, the value type of a map.
    pub fn element_type(&self) -> Option<&ValueType> {
        match self {
            ValueType::Sequence(element) | ValueType::Set(element) | ValueType::Map(_, element) => {
                Some(element)
            }
            _ => None,
        }
    }

    /// The value a never-written property of this type reads as. Reference types have none;
    /// collections get a fresh, empty container.
    pub fn default_value(&self) -> Option<Value> {
        match self {
            ValueType::Bool => Some(Value::Bool(false)),
            ValueType::Int => Some(Value::Int(0)),
            ValueType::UInt => Some(Value::UInt(0)),
            ValueType::Float => Some(Value::Float(0.0)),
            ValueType::Char => Some(Value::Char('\0')),
            ValueType::Text | ValueType::Bytes | ValueType::Facet(..) | ValueType::Object(..) => {
                None
            }
            ValueType::Sequence(element) => {
                Some(Value::List(ObservableList::new((**element).clone())))
            }
            ValueType::Set(element) => Some(Value::Set(ObservableSet::new((**element).clone()))),
            ValueType::Map(key, value) => Some(Value::Map(ObservableMap::new(
                (**key).clone(),
                (**value).clone(),
            ))),
        }
    }

    /// Whether `value` can be stored as this type without conversion.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (ValueType::Bool, Value::Bool(_))
            | (ValueType::Int, Value::Int(_))
            | (ValueType::UInt, Value::UInt(_))
            | (ValueType::Float, Value::Float(_))
            | (ValueType::Char, Value::Char(_))
            | (ValueType::Text, Value::Text(_))
            | (ValueType::Bytes, Value::Bytes(_)) => true,
            (ValueType::Facet(id, _), Value::View(view)) => {
                view.facet().closure().iter().any(|facet| facet.id() == *id)
            }
            (ValueType::Object(id, _), Value::Object(object)) => object.object_type_id() == *id,
            (ValueType::Sequence(element), Value::List(list)) => list.element_type() == &**element,
            (ValueType::Set(element), Value::Set(set)) => set.element_type() == &**element,
            (ValueType::Map(key, element), Value::Map(map)) => {
                map.key_type() == &**key && map.value_type() == &**element
            }
            _ => false,
        }
    }

    /// Converts `value` to this type. Only lossless numeric conversions are performed; anything
    /// else that is not already accepted is a `TypeMismatch`.
    #[allow(clippy::cast_precision_loss)]
    pub fn coerce(&self, value: Value) -> Result<Value> {
        if self.accepts(&value) {
            return Ok(value);
        }
        let converted = match (self, &value) {
            (ValueType::Int, Value::UInt(v)) => i64::try_from(*v).ok().map(Value::Int),
            (ValueType::UInt, Value::Int(v)) => u64::try_from(*v).ok().map(Value::UInt),
            (ValueType::Float, Value::Int(v)) if v.unsigned_abs() < (1 << 53) => {
                Some(Value::Float(*v as f64))
            }
            (ValueType::Float, Value::UInt(v)) if *v < (1 << 53) => Some(Value::Float(*v as f64)),
            _ => None,
        };
        converted.ok_or_else(|| PolycastError::type_mismatch(self, value.kind_name()))
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Facet(_, name) | ValueType::Object(_, name) => write!(f, "{name}"),
            ValueType::Sequence(element) => write!(f, "List<{element}>"),
            ValueType::Set(element) => write!(f, "Set<{element}>"),
            ValueType::Map(key, value) => write!(f, "Map<{key}, {value}>"),
            other => write!(f, "{other:?}"),
        }
    }
}
