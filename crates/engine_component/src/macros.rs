//! Declarative helpers for concrete component types.

/// Implement [`Component`](crate::Component) for a struct that stores its
/// [`PropertySet`](crate::PropertySet) in a field (named `properties` unless
/// given).
///
/// The type must implement `Clone` and `Debug`. Types that need custom
/// `on_added` / `on_removed` hooks implement the trait by hand instead.
#[macro_export]
macro_rules! impl_component {
    ($ty:ty) => {
        $crate::impl_component!($ty, properties);
    };
    ($ty:ty, $field:ident) => {
        impl $crate::Component for $ty {
            fn properties(&self) -> &$crate::PropertySet {
                &self.$field
            }

            fn properties_mut(&mut self) -> &mut $crate::PropertySet {
                &mut self.$field
            }

            fn clone_component(&self) -> ::std::boxed::Box<dyn $crate::Component> {
                ::std::boxed::Box::new(::std::clone::Clone::clone(self))
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }
        }
    };
}
