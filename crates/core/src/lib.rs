//! # Punchclock Core
//!
//! Core abstractions for the Punchclock attendance backend.
//! Contains traits, types, configuration, and error handling.

pub mod access;
pub mod adapters;
pub mod cache;
pub mod config;
pub mod email;
pub mod error;
pub mod ledger;
pub mod logger;
pub mod media;
pub mod middleware;
pub mod password;
pub mod plugin;
pub mod token;
pub mod types;
pub mod verify;

// Re-export commonly used items
pub use access::{
    AdminAction, authorize, authorize_owner_or, check_admin_action, require_active,
    require_approval, require_face_enrollment, require_role, require_same_org,
};
pub use adapters::{AttendanceOps, MemoryStore, OrganizationOps, Store, UserOps};
pub use cache::TtlCache;
pub use config::{
    AppConfig, LockoutConfig, PasswordConfig, TokenConfig, WorkdayConfig,
};
pub use email::{ConsoleEmailProvider, EmailProvider};
pub use error::{ApiError, ApiResult, validate_request_body, validation_error_response};
pub use ledger::{DayState, WorkedTime, break_minutes, worked_time};
pub use logger::{Logger, TracingLogger, default_logger};
pub use media::{MediaStore, NoopMediaStore};
pub use middleware::{
    EndpointRateLimit, Middleware, RateLimitConfig, RateLimitMiddleware, run_after, run_before,
};
pub use password::{hash_password, verify_password};
pub use plugin::{Context, Plugin, Route};
pub use token::{Claims, TokenManager};
pub use types::{
    ApiRequest, ApiResponse, ApprovalStatus, AttendanceEvent, CreateAttendanceEvent,
    CreateOrganization, CreateUser, EventType, GeoPoint, HttpMethod, Organization, OrgSettings,
    OrgStats, OrgType, PlanTier, RecognitionMethod, Role, Subscription, UpdateAttendanceEvent,
    UpdateOrganization, UpdateUser, User,
};
pub use verify::{IdVerifier, MockIdVerifier, OtpChallenge};
