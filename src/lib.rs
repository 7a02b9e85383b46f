//! # Punchclock
//!
//! A multi-tenant attendance tracking backend: organizations, accounts
//! with role-based access, a check-in/check-out ledger with working-hours
//! arithmetic, reporting, and national-ID verification.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use punchclock::{AppBuilder, AppConfig, MemoryStore};
//! use punchclock::plugins::{AttendancePlugin, AuthPlugin};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::new("your-secret-key-that-is-at-least-32-chars");
//!
//!     let app = AppBuilder::new(config)
//!         .store(MemoryStore::new())
//!         .plugin(AuthPlugin::new())
//!         .plugin(AttendancePlugin::new())
//!         .build()
//!         .await?;
//!
//!     let _ = app;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod handlers;

pub use punchclock_core::{
    hash_password, verify_password, AdminAction, ApiError, ApiRequest, ApiResponse, ApiResult,
    AppConfig, ApprovalStatus,
    AttendanceEvent, AttendanceOps, Claims, ConsoleEmailProvider, Context,
    CreateAttendanceEvent, CreateOrganization, CreateUser, DayState, EmailProvider,
    EndpointRateLimit, EventType, GeoPoint, HttpMethod, IdVerifier, LockoutConfig, Logger,
    MediaStore, MemoryStore, Middleware, MockIdVerifier, NoopMediaStore, Organization,
    OrganizationOps, OrgSettings, OrgStats, OrgType, PasswordConfig, PlanTier, Plugin,
    RateLimitConfig, RateLimitMiddleware, RecognitionMethod, Role, Route, Store, Subscription,
    TokenConfig, TokenManager, TracingLogger, TtlCache, UpdateAttendanceEvent, UpdateOrganization,
    UpdateUser, User, UserOps, WorkdayConfig,
};

pub mod adapters {
    pub use punchclock_core::adapters::{
        AttendanceOps, MemoryStore, OrganizationOps, Store, UserOps,
    };
}

pub mod plugins {
    pub use punchclock_api::plugins::*;
}

pub use core::{App, AppBuilder, TypedAppBuilder};

#[cfg(feature = "axum")]
pub use handlers::axum::AxumIntegration;
