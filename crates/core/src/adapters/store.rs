pub use super::traits::{AttendanceOps, OrganizationOps, UserOps};

/// Store trait for persistence.
///
/// Combines all entity-specific operation traits. Any type that implements
/// all sub-traits (`UserOps`, `OrganizationOps`, `AttendanceOps`)
/// automatically implements `Store` via the blanket impl.
///
/// Use the sub-traits directly when you only need a subset of operations
/// (e.g., a plugin that only touches users).
pub trait Store: UserOps + OrganizationOps + AttendanceOps {}

impl<T> Store for T where T: UserOps + OrganizationOps + AttendanceOps {}
