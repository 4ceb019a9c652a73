//! Member access by name, for callers that do not know an entity's facets statically.
//!
//! Lookups search the attached facets in attachment order and go through a view of the facet that
//! declares the property, so computed accessors, registered implementations and the lock all
//! apply. Failures are logged and reported as `None` or `false`.
use crate::entity::Entity;
use crate::error::Result;
use crate::facet::{FacetObject, PropertyInfo};
use crate::log::debug;
use crate::value::Value;

impl Entity {
    /// The first property named `name` declared by an attached facet.
    pub fn find_property(&self, name: &str) -> Option<&'static PropertyInfo> {
        self.attached_facets()
            .into_iter()
            .find_map(|facet| facet.property(name))
    }

    /// Reads property `name`. Returns `None` if no attached facet declares it or the read fails.
    pub fn try_get_member(&self, name: &str) -> Option<Option<Value>> {
        let property = self.find_property(name)?;
        self.read_member(property)
            .inspect_err(|error| debug!("reading member `{name}` of {self:?} failed: {error}"))
            .ok()
    }

    /// Writes property `name`, returning whether the write happened.
    pub fn try_set_member(&self, name: &str, value: Option<Value>) -> bool {
        let Some(property) = self.find_property(name) else {
            debug!("{self:?} has no member `{name}`");
            return false;
        };
        self.write_member(property, value)
            .inspect_err(|error| debug!("writing member `{name}` of {self:?} failed: {error}"))
            .is_ok()
    }

    fn read_member(&self, property: &'static PropertyInfo) -> Result<Option<Value>> {
        let view = self.view_for(property.declaring_facet())?;
        view.facet_view().get_value(property)
    }

    fn write_member(&self, property: &'static PropertyInfo, value: Option<Value>) -> Result<()> {
        let view = self.view_for(property.declaring_facet())?;
        view.facet_view().set_value(property, value)
    }
}

#[cfg(test)]
mod tests {
    use crate::collections::List;
    use crate::prelude::*;

    define_facet! {
        interface Catalogued {
            prop title: String;
            prop categories: List<String>;
        }
    }

    define_facet! {
        interface Ranked {
            prop rank: u16;
        }
    }

    #[test]
    fn unknown_members_fail_quietly() {
        let entity = Context::new().new_entity();
        assert_eq!(entity.find_property("title"), None);
        assert_eq!(entity.try_get_member("title"), None);
        assert!(!entity.try_set_member("title", Some(Value::from("x"))));
    }

    #[test]
    fn members_are_found_on_attached_facets() {
        let entity = Context::new().new_entity();
        entity.act_like::<dyn Catalogued>().unwrap();
        assert_eq!(
            entity.find_property("title").map(|p| p.declaring_facet().name()),
            Some("Catalogued")
        );
        assert!(entity.try_set_member("title", Some(Value::from("Dune"))));
        assert_eq!(entity.try_get_member("title"), Some(Some(Value::from("Dune"))));
        assert_eq!(entity.try_get_member("rank"), None);
    }

    #[test]
    fn assignments_accumulate_into_collections() {
        let entity = Context::new().new_entity();
        let catalogued = entity.act_like::<dyn Catalogued>().unwrap();
        catalogued.categories().push("a".to_string());
        assert!(entity.try_set_member("categories", Some(Value::from("b"))));
        assert_eq!(
            catalogued.categories().to_vec(),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn failures_report_false() {
        let entity = Context::new().new_entity();
        entity.act_like::<dyn Ranked>().unwrap();
        assert!(!entity.try_set_member("rank", Some(Value::from("first"))));
        entity.lock();
        assert!(!entity.try_set_member("rank", Some(Value::UInt(1))));
        assert_eq!(entity.try_get_member("rank"), Some(Some(Value::UInt(0))));
    }
}
