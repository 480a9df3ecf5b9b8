//! Catalog entries describing types and their members.

mod member;
mod method;
mod type_entry;

pub use member::{FieldEntry, GenericParamEntry, PropertyEntry};
pub use method::{MethodEntry, MethodFlags, MethodImpl, NativeFn, ParamEntry};
pub use type_entry::{TypeEntry, TypeFlags};
