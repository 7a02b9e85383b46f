pub mod memory;
pub mod store;
pub mod traits;

pub use memory::MemoryStore;
pub use store::Store;
pub use traits::{AttendanceOps, OrganizationOps, UserOps};
