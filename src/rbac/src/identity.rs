//! Resource identity resolution
//!
//! Any value can be checked against as a resource. Types that carry an
//! explicit type or id designator override the [`Identifiable`] methods;
//! everything else falls back to its own type name and an absent id.

use crate::types::{ResourceRef, RoleIdentity};

/// Explicit identity designators of a resource
///
/// The designators default to `None`, so an empty `impl Identifiable for T {}`
/// makes `T` usable as a resource identified by its type name.
pub trait Identifiable {
    /// Explicit type designator
    fn resource_type(&self) -> Option<String> {
        None
    }

    /// Explicit id designator
    fn resource_id(&self) -> Option<String> {
        None
    }

    /// Name of the implementing type
    ///
    /// Dispatched through the vtable, so `dyn Identifiable` values still
    /// report their concrete type.
    fn type_name(&self) -> String {
        type_name_of::<Self>()
    }
}

/// Resolve the resource type of `obj`
///
/// Uses the explicit designator when present, else the name of its own type.
pub fn resolve_type<T: Identifiable + ?Sized>(obj: &T) -> String {
    obj.resource_type().unwrap_or_else(|| obj.type_name())
}

/// Resolve the resource id of `obj`, `None` when it has no designator
pub fn resolve_id<T: Identifiable + ?Sized>(obj: &T) -> Option<String> {
    obj.resource_id()
}

/// Resolve both halves of the identity of `obj`
pub fn resolve<T: Identifiable + ?Sized>(obj: &T) -> ResourceRef {
    ResourceRef {
        resource_type: resolve_type(obj),
        id: resolve_id(obj),
    }
}

/// Unqualified name of a type, without module path or generic arguments
///
/// `alloc::string::String` becomes `String`, `my_app::Doc<u8>` becomes `Doc`.
pub fn type_name_of<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::")
        .next()
        .unwrap_or(base)
        .trim_start_matches('&')
        .to_string()
}

macro_rules! identified_by_type_name {
    ($($ty:ty),* $(,)?) => {
        $(impl Identifiable for $ty {})*
    };
}

identified_by_type_name!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
    str, String,
);

impl Identifiable for ResourceRef {
    fn resource_type(&self) -> Option<String> {
        Some(self.resource_type.clone())
    }

    fn resource_id(&self) -> Option<String> {
        self.id.clone()
    }
}

impl Identifiable for RoleIdentity {
    fn resource_type(&self) -> Option<String> {
        Some(self.role_type.clone())
    }

    fn resource_id(&self) -> Option<String> {
        (!self.is_wildcard()).then(|| self.id.clone())
    }
}
