pub use crate::collections::{List, Map, Set};
pub use crate::config::Config;
pub use crate::context::Context;
pub use crate::entity::{Entity, EntityId, NativeFields};
pub use crate::enumerator::PropertyValue;
pub use crate::error::PolycastError;
pub use crate::facet::{Facet, FacetInfo, FacetKind, FacetObject, PropertyInfo};
pub use crate::log::{debug, error, info, trace, warn};
pub use crate::value::{PropertyType, Shared, Value, ViewRef};
pub use crate::view::{ActLike, FacetView};
pub use crate::{define_facet, impl_object};
pub use polycast_derive::NativeFields;
