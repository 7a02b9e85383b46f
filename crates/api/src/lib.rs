//! # Punchclock API
//!
//! Request-handling plugins for the punchclock attendance backend. The
//! core crate supplies the store traits, configuration, and plugin
//! framework; this crate supplies the endpoints.

pub mod plugins;

pub use plugins::{
    AdminPlugin, AttendancePlugin, AuthPlugin, IdVerifyPlugin, OrganizationPlugin, ReportsPlugin,
};
