//! Macros to declare facets.

/// Declares a facet: a trait, its adapter struct, its [`Facet`](crate::facet::Facet)
/// implementation and its registration in the facet catalog.
///
/// # Forms
///
/// ```rust,ignore
/// define_facet! {
///     /// Anything with a display name.
///     pub interface Named {
///         prop name: String;                  // read-write property: `name()`, `set_name(v)`
///         get aliases: List<String>;          // read-only property: `aliases()`
///         computed initial: Option<String> {  // computed from other members
///             get(this) { this.name().chars().next().map(String::from) }
///         }
///         fn rename(&self, to: String);       // abstract: must be registered before casting
///         fn shout(&self) -> String {         // concrete: can be overridden
///             self.name().to_uppercase()
///         }
///     }
/// }
///
/// define_facet! {
///     pub class Employee: Named {
///         prop salary: f64;
///     }
/// }
/// ```
///
/// A computed property may also have a setter, `set(this, value) { ... }`, returning
/// `polycast::Result<()>`; the slot then stores whatever the getter computes after the setter ran.
///
/// `interface` facets can be combined freely on an entity. `class` facets must form a single
/// chain. Every ancestor must be listed after the colon, not only the direct parents. Method
/// parameters must be owned, `Send` and `'static`.
#[macro_export]
macro_rules! define_facet {
    (
        $(#[$meta:meta])*
        $vis:vis interface $name:ident $(: $first:ident $(+ $rest:ident)*)? {
            $($body:tt)*
        }
    ) => {
        $crate::define_facet!(@emit [$(#[$meta])*] $vis Interface $name [$($first $($rest)*)?] {
            $($body)*
        });
    };

    (
        $(#[$meta:meta])*
        $vis:vis class $name:ident $(: $first:ident $(+ $rest:ident)*)? {
            $($body:tt)*
        }
    ) => {
        $crate::define_facet!(@emit [$(#[$meta])*] $vis Class $name [$($first $($rest)*)?] {
            $($body)*
        });
    };

    (@emit [$(#[$meta:meta])*] $vis:vis $kind:ident $name:ident [$($parent:ident)*] {
        $($body:tt)*
    }) => {
        $(#[$meta])*
        $vis trait $name: $crate::facet::FacetObject $(+ $parent)* {
            $crate::__facet_members!(@trait $name; $($body)*);
        }

        $crate::paste::paste! {
            #[doc(hidden)]
            #[derive(Debug)]
            $vis struct [<$name View>] {
                view: $crate::view::FacetView,
            }

            impl $crate::facet::FacetObject for [<$name View>] {
                fn facet_view(&self) -> &$crate::view::FacetView {
                    &self.view
                }

                fn into_any(
                    self: ::std::sync::Arc<Self>,
                ) -> ::std::sync::Arc<dyn ::std::any::Any + ::std::marker::Send + ::std::marker::Sync> {
                    self
                }
            }

            impl $name for [<$name View>] {}
            $(impl $parent for [<$name View>] {})*

            impl $crate::facet::Facet for dyn $name {
                type View = [<$name View>];

                fn info() -> &'static $crate::facet::FacetInfo {
                    static INFO: ::std::sync::LazyLock<$crate::facet::FacetInfo> =
                        ::std::sync::LazyLock::new(|| {
                            let builder = $crate::facet::FacetInfo::builder::<dyn $name>(
                                stringify!($name),
                                $crate::facet::FacetKind::$kind,
                            )
                            $(.parent(<dyn $parent as $crate::facet::Facet>::info))*;
                            $crate::__facet_members!(@info builder; $($body)*).build()
                        });
                    &INFO
                }

                fn new_view(view: $crate::view::FacetView) -> Self::View {
                    [<$name View>] { view }
                }

                fn upcast(view: ::std::sync::Arc<Self::View>) -> ::std::sync::Arc<Self> {
                    view
                }
            }

            impl ::std::cmp::PartialEq for dyn $name {
                fn eq(&self, other: &Self) -> bool {
                    $crate::facet::FacetObject::facet_view(self)
                        == $crate::facet::FacetObject::facet_view(other)
                }
            }

            impl ::std::fmt::Debug for dyn $name {
                fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                    ::std::fmt::Debug::fmt($crate::facet::FacetObject::facet_view(self), f)
                }
            }

            $crate::ctor::declarative::ctor! {
                #[ctor]
                fn [<_register_facet_ $name:snake>]() {
                    $crate::facet::add_to_facet_catalog(<dyn $name as $crate::facet::Facet>::info);
                }
            }
        }
    };
}

/// Expands the members of a `define_facet!` body, either into trait items (`@trait`) or into
/// calls on a `FacetInfoBuilder` (`@info`).
#[doc(hidden)]
#[macro_export]
macro_rules! __facet_members {
    // === Trait items ===
    (@trait $facet:ident;) => {};

    (@trait $facet:ident;
        $(#[$attr:meta])* prop $prop:ident : $ty:ty; $($rest:tt)*
    ) => {
        $crate::paste::paste! {
            $(#[$attr])*
            fn $prop(&self) -> $ty {
                $crate::facet::FacetObject::facet_view(self)
                    .read(<dyn $facet as $crate::facet::Facet>::info(), stringify!($prop))
            }

            fn [<set_ $prop>](&self, value: $ty) -> $crate::Result<()> {
                $crate::facet::FacetObject::facet_view(self)
                    .write(<dyn $facet as $crate::facet::Facet>::info(), stringify!($prop), value)
            }
        }
        $crate::__facet_members!(@trait $facet; $($rest)*);
    };

    (@trait $facet:ident;
        $(#[$attr:meta])* get $prop:ident : $ty:ty; $($rest:tt)*
    ) => {
        $(#[$attr])*
        fn $prop(&self) -> $ty {
            $crate::facet::FacetObject::facet_view(self)
                .read(<dyn $facet as $crate::facet::Facet>::info(), stringify!($prop))
        }
        $crate::__facet_members!(@trait $facet; $($rest)*);
    };

    (@trait $facet:ident;
        $(#[$attr:meta])* computed $prop:ident : $ty:ty {
            get($getter:ident) $get:block
            set($setter:ident, $value:ident) $set:block
        }
        $($rest:tt)*
    ) => {
        $crate::__facet_members!(@trait $facet; $(#[$attr])* prop $prop: $ty; $($rest)*);
    };

    (@trait $facet:ident;
        $(#[$attr:meta])* computed $prop:ident : $ty:ty {
            get($getter:ident) $get:block
        }
        $($rest:tt)*
    ) => {
        $crate::__facet_members!(@trait $facet; $(#[$attr])* get $prop: $ty; $($rest)*);
    };

    (@trait $facet:ident;
        $(#[$attr:meta])*
        fn $method:ident(&$this:ident $(, $arg:ident : $arg_ty:ty)* $(,)?) $(-> $ret:ty)?;
        $($rest:tt)*
    ) => {
        $(#[$attr])*
        fn $method(&$this $(, $arg: $arg_ty)*) -> $crate::__facet_return!($($ret)?) {
            $crate::facet::FacetObject::facet_view($this).invoke(
                <dyn $facet as $crate::facet::Facet>::info(),
                stringify!($method),
                ($($arg,)*),
            )
        }
        $crate::__facet_members!(@trait $facet; $($rest)*);
    };

    (@trait $facet:ident;
        $(#[$attr:meta])*
        fn $method:ident(&$this:ident $(, $arg:ident : $arg_ty:ty)* $(,)?) $(-> $ret:ty)? $body:block
        $($rest:tt)*
    ) => {
        $(#[$attr])*
        fn $method(&$this $(, $arg: $arg_ty)*) -> $crate::__facet_return!($($ret)?) {
            {
                let view = $crate::facet::FacetObject::facet_view($this);
                let facet = <dyn $facet as $crate::facet::Facet>::info();
                if view.overrides(facet, stringify!($method)) {
                    return view.invoke(facet, stringify!($method), ($($arg,)*));
                }
            }
            $body
        }
        $crate::__facet_members!(@trait $facet; $($rest)*);
    };

    // === Metadata ===
    (@info $builder:expr;) => {
        $builder
    };

    (@info $builder:expr;
        $(#[$attr:meta])* prop $prop:ident : $ty:ty; $($rest:tt)*
    ) => {
        $crate::__facet_members!(@info
            $builder.property::<$ty>(stringify!($prop), $crate::facet::PropertyAccess::ReadWrite);
            $($rest)*
        )
    };

    (@info $builder:expr;
        $(#[$attr:meta])* get $prop:ident : $ty:ty; $($rest:tt)*
    ) => {
        $crate::__facet_members!(@info
            $builder.property::<$ty>(stringify!($prop), $crate::facet::PropertyAccess::ReadOnly);
            $($rest)*
        )
    };

    (@info $builder:expr;
        $(#[$attr:meta])* computed $prop:ident : $ty:ty {
            get($getter:ident) $get:block
            set($setter:ident, $value:ident) $set:block
        }
        $($rest:tt)*
    ) => {
        $crate::__facet_members!(@info
            $builder.computed_with_setter::<$ty>(
                stringify!($prop),
                |$getter| $get,
                |$setter, $value| $set,
            );
            $($rest)*
        )
    };

    (@info $builder:expr;
        $(#[$attr:meta])* computed $prop:ident : $ty:ty {
            get($getter:ident) $get:block
        }
        $($rest:tt)*
    ) => {
        $crate::__facet_members!(@info
            $builder.computed::<$ty>(stringify!($prop), |$getter| $get);
            $($rest)*
        )
    };

    (@info $builder:expr;
        $(#[$attr:meta])*
        fn $method:ident(&$this:ident $(, $arg:ident : $arg_ty:ty)* $(,)?) $(-> $ret:ty)?;
        $($rest:tt)*
    ) => {
        $crate::__facet_members!(@info
            $builder.method::<($($arg_ty,)*), $crate::__facet_return!($($ret)?)>(
                stringify!($method),
                true,
            );
            $($rest)*
        )
    };

    (@info $builder:expr;
        $(#[$attr:meta])*
        fn $method:ident(&$this:ident $(, $arg:ident : $arg_ty:ty)* $(,)?) $(-> $ret:ty)? $body:block
        $($rest:tt)*
    ) => {
        $crate::__facet_members!(@info
            $builder.method::<($($arg_ty,)*), $crate::__facet_return!($($ret)?)>(
                stringify!($method),
                false,
            );
            $($rest)*
        )
    };
}

/// The return type of a facet method: `()` when none is written.
#[doc(hidden)]
#[macro_export]
macro_rules! __facet_return {
    () => { () };
    ($ret:ty) => { $ret };
}
