//! Declarative macros. All of them are exported at the crate root.
mod define_facet;

/// Implements [`Object`](crate::value::Object) for a type so that it can be stored in a property
/// through [`Shared`](crate::value::Shared).
///
/// With `copy`, deep clones store a copy made with `Clone::clone`; without it, they share the
/// original.
///
/// ```rust
/// use polycast::impl_object;
///
/// #[derive(Debug, Clone)]
/// struct Coordinates(f64, f64);
/// impl_object!(Coordinates, copy);
/// ```
#[macro_export]
macro_rules! impl_object {
    ($ty:ty) => {
        impl $crate::value::Object for $ty {
            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }
        }
    };

    ($ty:ty, copy) => {
        impl $crate::value::Object for $ty {
            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn copy_object(
                &self,
            ) -> ::std::option::Option<::std::sync::Arc<dyn $crate::value::Object>> {
                ::std::option::Option::Some(::std::sync::Arc::new(::std::clone::Clone::clone(self)))
            }
        }
    };
}
