use thiserror::Error;

/// Error taxonomy for the attendance backend.
///
/// Each variant maps to an HTTP status code via [`ApiError::status_code`].
/// Use [`ApiError::into_response`] to produce the standard JSON envelope
/// `{ "success": false, "message": "..." }`.
#[derive(Error, Debug)]
pub enum ApiError {
    // --- 400 Bad Request ---
    #[error("{0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Duplicate of a unique field (email, employee id, organization name, ...).
    #[error("{0}")]
    Conflict(String),

    /// Illegal attendance transition: an open check-in already exists today.
    #[error("Already checked in")]
    AlreadyCheckedIn,

    /// Illegal attendance transition: no open check-in to close.
    #[error("No open check-in found for today")]
    NoOpenCheckIn,

    /// Illegal break transition (break without an open check-in, nested
    /// break-start, break-end without a break-start).
    #[error("{0}")]
    InvalidBreak(String),

    #[error("Organization still has users and cannot be deleted")]
    OrganizationNotEmpty,

    #[error("Face enrollment attempt limit reached")]
    EnrollmentLimitReached,

    // --- 401 Unauthorized ---
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is temporarily locked due to repeated failed logins")]
    AccountLocked,

    #[error("Authentication required")]
    Unauthenticated,

    // --- 403 Forbidden ---
    #[error("{0}")]
    Forbidden(String),

    #[error("Insufficient permissions")]
    Unauthorized,

    #[error("Access to another organization's resources is not allowed")]
    CrossOrganizationAccess,

    #[error("This action cannot be applied to your own account")]
    SelfActionForbidden,

    #[error("Account is pending approval")]
    NotApproved,

    #[error("Account is deactivated")]
    AccountInactive,

    // --- 404 Not Found ---
    #[error("User not found")]
    UserNotFound,

    #[error("Invalid or inactive invite code")]
    InvalidInviteCode,

    #[error("{0}")]
    NotFound(String),

    // --- 429 Too Many Requests ---
    #[error("Too many requests")]
    RateLimited,

    // --- 500 Internal Server Error ---
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// Collaborator (email, image store, OTP verifier) failure. Callers must
    /// catch this at the call site and downgrade it to a logged warning; it
    /// never aborts the owning operation.
    #[error("Dependency failure: {0}")]
    Dependency(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            // 400
            Self::BadRequest(_)
            | Self::Validation(_)
            | Self::Conflict(_)
            | Self::AlreadyCheckedIn
            | Self::NoOpenCheckIn
            | Self::InvalidBreak(_)
            | Self::OrganizationNotEmpty
            | Self::EnrollmentLimitReached => 400,
            // 401
            Self::InvalidCredentials | Self::AccountLocked | Self::Unauthenticated => 401,
            // 403
            Self::Forbidden(_)
            | Self::Unauthorized
            | Self::CrossOrganizationAccess
            | Self::SelfActionForbidden
            | Self::NotApproved
            | Self::AccountInactive => 403,
            // 404
            Self::UserNotFound | Self::InvalidInviteCode | Self::NotFound(_) => 404,
            // 429
            Self::RateLimited => 429,
            // 500
            Self::Config(_)
            | Self::Storage(_)
            | Self::Dependency(_)
            | Self::Serialization(_)
            | Self::Token(_)
            | Self::PasswordHash(_)
            | Self::Internal(_) => 500,
        }
    }

    /// Convert this error into the standard envelope response
    /// `{ "success": false, "message": "..." }`.
    ///
    /// Internal errors (500) use a generic message to avoid leaking details.
    pub fn into_response(self) -> crate::types::ApiResponse {
        let status = self.status_code();
        let message = match status {
            500 => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        crate::types::ApiResponse::json(
            status,
            &serde_json::json!({
                "success": false,
                "message": message,
            }),
        )
        .unwrap_or_else(|_| crate::types::ApiResponse::text(status, &message))
    }

    // --- Constructors ---

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    pub fn dependency(message: impl Into<String>) -> Self {
        Self::Dependency(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Convert `validator::ValidationErrors` into the standard envelope with a
/// per-field error map under `errors`.
pub fn validation_error_response(
    errors: &validator::ValidationErrors,
) -> crate::types::ApiResponse {
    let field_errors: std::collections::HashMap<String, Vec<String>> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages: Vec<String> = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field))
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect();

    let body = serde_json::json!({
        "success": false,
        "message": "Validation failed",
        "errors": field_errors,
    });

    crate::types::ApiResponse::json(400, &body)
        .unwrap_or_else(|_| crate::types::ApiResponse::text(400, "Validation failed"))
}

/// Parse and validate a request body, returning the typed value or a
/// ready-made envelope error response.
pub fn validate_request_body<T>(
    req: &crate::types::ApiRequest,
) -> Result<T, crate::types::ApiResponse>
where
    T: serde::de::DeserializeOwned + validator::Validate,
{
    let value: T = req.body_as_json().map_err(|e| {
        crate::types::ApiResponse::json(
            400,
            &serde_json::json!({
                "success": false,
                "message": format!("Invalid JSON: {}", e),
            }),
        )
        .unwrap_or_else(|_| crate::types::ApiResponse::text(400, "Invalid JSON"))
    })?;

    value.validate().map_err(|e| validation_error_response(&e))?;

    Ok(value)
}
