//! Request-handling plugins.
//!
//! Each plugin owns one slice of the HTTP surface and is mounted on the
//! app at build time. Handlers stay framework-agnostic: they take an
//! [`ApiRequest`](punchclock_core::ApiRequest) and produce an
//! [`ApiResponse`](punchclock_core::ApiResponse).

pub mod admin;
pub mod attendance;
pub mod auth;
pub mod helpers;
pub mod id_verify;
pub mod organization;
pub mod reports;

pub use admin::AdminPlugin;
pub use attendance::AttendancePlugin;
pub use auth::AuthPlugin;
pub use id_verify::IdVerifyPlugin;
pub use organization::OrganizationPlugin;
pub use reports::ReportsPlugin;
