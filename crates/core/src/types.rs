use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// User role within (or above) an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Employee,
    Admin,
    Hr,
    SuperAdmin,
}

impl Role {
    /// Roles that administer users and attendance inside one organization.
    pub const ORG_ADMINS: &'static [Role] = &[Role::Admin, Role::Hr];

    /// True for roles whose queries are scoped to a single organization.
    pub fn is_org_scoped(&self) -> bool {
        !matches!(self, Role::SuperAdmin)
    }
}

/// Kind of organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrgType {
    Company,
    School,
    Ngo,
    Other,
}

/// Subscription plan tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanTier {
    Free,
    Basic,
    Premium,
}

/// Attendance event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    CheckIn,
    CheckOut,
    BreakStart,
    BreakEnd,
}

/// How the event identity claim was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecognitionMethod {
    FaceRecognition,
    Manual,
    IdAssisted,
}

/// Approval state of an attendance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    AutoApproved,
}

/// Working-hours window and attendance policy for an organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgSettings {
    #[serde(rename = "workStart")]
    pub work_start: NaiveTime,
    #[serde(rename = "workEnd")]
    pub work_end: NaiveTime,
    /// Lowercase day names, e.g. `["mon", "tue", ...]`.
    #[serde(rename = "workingDays")]
    pub working_days: Vec<String>,
    pub timezone: String,
    #[serde(rename = "lateThresholdMinutes")]
    pub late_threshold_minutes: i64,
    #[serde(rename = "requireFace")]
    pub require_face: bool,
    #[serde(rename = "allowOffline")]
    pub allow_offline: bool,
}

impl Default for OrgSettings {
    fn default() -> Self {
        Self {
            work_start: NaiveTime::from_hms_opt(9, 0, 0).expect("valid time"),
            work_end: NaiveTime::from_hms_opt(18, 0, 0).expect("valid time"),
            working_days: ["mon", "tue", "wed", "thu", "fri"]
                .iter()
                .map(|d| d.to_string())
                .collect(),
            timezone: "UTC".to_string(),
            late_threshold_minutes: 15,
            require_face: false,
            allow_offline: false,
        }
    }
}

/// Subscription limits for an organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub plan: PlanTier,
    #[serde(rename = "maxUsers")]
    pub max_users: u32,
    pub active: bool,
    #[serde(rename = "expiresAt")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Default for Subscription {
    fn default() -> Self {
        Self {
            plan: PlanTier::Free,
            max_users: 25,
            active: true,
            expires_at: None,
        }
    }
}

/// Derived counters, recomputed on demand. Never authoritative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgStats {
    #[serde(rename = "totalUsers")]
    pub total_users: u64,
    #[serde(rename = "activeUsers")]
    pub active_users: u64,
    #[serde(rename = "totalAttendanceRecords")]
    pub total_attendance_records: u64,
}

/// Tenant organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(rename = "orgType")]
    pub org_type: OrgType,
    pub settings: OrgSettings,
    pub subscription: Subscription,
    #[serde(rename = "inviteCode")]
    pub invite_code: String,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    #[serde(rename = "createdBy")]
    pub created_by: String,
    pub stats: OrgStats,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// Advisory capacity check against the last recomputed stats.
    /// Not a transactional admission gate.
    pub fn can_add_user(&self) -> bool {
        self.stats.total_users < u64::from(self.subscription.max_users)
    }
}

/// A user account. Sensitive and internal-state fields are never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(rename = "firstName")]
    pub first_name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    pub email: String,
    #[serde(rename = "employeeId")]
    pub employee_id: String,
    pub department: Option<String>,
    pub designation: Option<String>,
    #[serde(rename = "phoneNumber")]
    pub phone_number: Option<String>,
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
    /// Required for every role except super-admin.
    #[serde(rename = "organizationId")]
    pub organization_id: Option<String>,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    #[serde(rename = "isApproved")]
    pub is_approved: bool,
    #[serde(rename = "approvedBy")]
    pub approved_by: Option<String>,
    #[serde(rename = "approvedAt")]
    pub approved_at: Option<DateTime<Utc>>,
    /// Ordered face descriptor vectors; parallel to `face_images`.
    #[serde(skip)]
    pub face_descriptors: Vec<Vec<f32>>,
    #[serde(rename = "faceImages")]
    pub face_images: Vec<String>,
    #[serde(rename = "faceEnrolled")]
    pub face_enrolled: bool,
    #[serde(rename = "enrollmentAttempts")]
    pub enrollment_attempts: u8,
    #[serde(rename = "nationalId")]
    pub national_id: Option<String>,
    #[serde(rename = "nationalIdVerified")]
    pub national_id_verified: bool,
    #[serde(rename = "nationalIdVerifiedAt")]
    pub national_id_verified_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub failed_logins: u32,
    #[serde(skip)]
    pub lock_until: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub reset_token_hash: Option<String>,
    #[serde(skip)]
    pub reset_token_expires: Option<DateTime<Utc>>,
    #[serde(rename = "lastLogin")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// True while a lock timestamp lies in the future.
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.lock_until.is_some_and(|until| until > now)
    }
}

/// Geographic point attached to an attendance event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
}

/// One attendance record: created by a check-in, completed by the matching
/// check-out. `day` is a snapshot taken from the check-in time and is never
/// recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceEvent {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    /// Denormalized from the user for organization-scoped queries.
    #[serde(rename = "organizationId")]
    pub organization_id: String,
    pub day: NaiveDate,
    #[serde(rename = "checkInTime")]
    pub check_in_time: DateTime<Utc>,
    #[serde(rename = "checkOutTime")]
    pub check_out_time: Option<DateTime<Utc>>,
    #[serde(rename = "eventType")]
    pub event_type: EventType,
    pub method: RecognitionMethod,
    /// Caller-claimed similarity score in `[0, 1]`. Evidentiary, not
    /// authoritative for identity.
    #[serde(rename = "faceConfidence")]
    pub face_confidence: Option<f32>,
    pub location: Option<GeoPoint>,
    /// Reference to a check-in photo held by the media store.
    #[serde(rename = "photoUrl")]
    pub photo_url: Option<String>,
    pub status: ApprovalStatus,
    #[serde(rename = "approvedBy")]
    pub approved_by: Option<String>,
    #[serde(rename = "approvedAt")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(rename = "rejectionReason")]
    pub rejection_reason: Option<String>,
    #[serde(rename = "workingMinutes")]
    pub working_minutes: i64,
    #[serde(rename = "breakMinutes")]
    pub break_minutes: i64,
    #[serde(rename = "overtimeMinutes")]
    pub overtime_minutes: i64,
    #[serde(rename = "isOffline")]
    pub is_offline: bool,
    #[serde(rename = "syncedAt")]
    pub synced_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[serde(rename = "modifiedBy")]
    pub modified_by: Option<String>,
    #[serde(rename = "modifiedAt")]
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl AttendanceEvent {
    /// A check-in record with no closing check-out.
    pub fn is_open(&self) -> bool {
        self.event_type == EventType::CheckIn && self.check_out_time.is_none()
    }
}

// ─── Creation / update data ─────────────────────────────────────────────

/// User creation data.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub employee_id: String,
    pub department: Option<String>,
    pub designation: Option<String>,
    pub phone_number: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub organization_id: Option<String>,
    pub is_approved: bool,
    pub approved_by: Option<String>,
}

impl CreateUser {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        employee_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(Uuid::new_v4().to_string()),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            employee_id: employee_id.into(),
            department: None,
            designation: None,
            phone_number: None,
            password_hash: String::new(),
            role: Role::Employee,
            organization_id: None,
            is_approved: false,
            approved_by: None,
        }
    }

    pub fn with_password_hash(mut self, hash: impl Into<String>) -> Self {
        self.password_hash = hash.into();
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn with_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn approved(mut self) -> Self {
        self.is_approved = true;
        self
    }
}

/// User update data. `None` leaves the field unchanged; double-`Option`
/// fields distinguish "set to null" (`Some(None)`) from "unchanged" (`None`).
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub department: Option<String>,
    pub designation: Option<String>,
    pub phone_number: Option<String>,
    pub password_hash: Option<String>,
    pub is_active: Option<bool>,
    pub is_approved: Option<bool>,
    pub approved_by: Option<Option<String>>,
    pub approved_at: Option<Option<DateTime<Utc>>>,
    pub face_descriptors: Option<Vec<Vec<f32>>>,
    pub face_images: Option<Vec<String>>,
    pub face_enrolled: Option<bool>,
    pub enrollment_attempts: Option<u8>,
    pub national_id: Option<Option<String>>,
    pub national_id_verified: Option<bool>,
    pub national_id_verified_at: Option<Option<DateTime<Utc>>>,
    pub failed_logins: Option<u32>,
    pub lock_until: Option<Option<DateTime<Utc>>>,
    pub reset_token_hash: Option<Option<String>>,
    pub reset_token_expires: Option<Option<DateTime<Utc>>>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Organization creation data.
#[derive(Debug, Clone)]
pub struct CreateOrganization {
    pub id: Option<String>,
    pub name: String,
    pub org_type: OrgType,
    pub settings: OrgSettings,
    pub subscription: Subscription,
    pub invite_code: String,
    pub created_by: String,
}

/// Organization update data.
#[derive(Debug, Clone, Default)]
pub struct UpdateOrganization {
    pub name: Option<String>,
    pub org_type: Option<OrgType>,
    pub settings: Option<OrgSettings>,
    pub subscription: Option<Subscription>,
    pub is_active: Option<bool>,
    pub stats: Option<OrgStats>,
}

/// Attendance record creation data (produced by a legal check-in).
#[derive(Debug, Clone)]
pub struct CreateAttendanceEvent {
    pub user_id: String,
    pub organization_id: String,
    pub day: NaiveDate,
    pub check_in_time: DateTime<Utc>,
    pub event_type: EventType,
    pub method: RecognitionMethod,
    pub face_confidence: Option<f32>,
    pub location: Option<GeoPoint>,
    pub photo_url: Option<String>,
    pub status: ApprovalStatus,
    pub is_offline: bool,
    pub synced_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Patch applied to an attendance record.
///
/// Closing a check-in sets `check_out_time` plus the derived minutes; admins
/// may only touch `notes`, `status`, and `rejection_reason`.
#[derive(Debug, Clone, Default)]
pub struct UpdateAttendanceEvent {
    pub check_out_time: Option<DateTime<Utc>>,
    pub working_minutes: Option<i64>,
    pub break_minutes: Option<i64>,
    pub overtime_minutes: Option<i64>,
    pub status: Option<ApprovalStatus>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub modified_by: Option<String>,
    pub modified_at: Option<DateTime<Utc>>,
}

// ─── Request / response wrappers ────────────────────────────────────────

/// HTTP method enumeration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

/// Framework-agnostic request wrapper handed to plugins.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
    pub query: HashMap<String, String>,
}

/// Framework-agnostic response wrapper.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HashMap::new(),
            body: None,
            query: HashMap::new(),
        }
    }

    pub fn method(&self) -> &HttpMethod {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn header(&self, name: &str) -> Option<&String> {
        self.headers.get(name)
    }

    pub fn body_as_json<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        if let Some(body) = &self.body {
            serde_json::from_slice(body)
        } else {
            serde_json::from_str("{}")
        }
    }
}

impl ApiResponse {
    pub fn json<T: Serialize>(status: u16, data: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(data)?;
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());

        Ok(Self {
            status,
            headers,
            body,
        })
    }

    pub fn text(status: u16, text: impl Into<String>) -> Self {
        let body = text.into().into_bytes();
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "text/plain".to_string());

        Self {
            status,
            headers,
            body,
        }
    }

    /// Standard success envelope: `{ "success": true, "message", "data" }`.
    pub fn ok<T: Serialize>(
        status: u16,
        message: &str,
        data: &T,
    ) -> Result<Self, serde_json::Error> {
        Self::json(
            status,
            &serde_json::json!({
                "success": true,
                "message": message,
                "data": data,
            }),
        )
    }

    /// Success envelope without a data payload.
    pub fn ok_message(status: u16, message: &str) -> Result<Self, serde_json::Error> {
        Self::json(
            status,
            &serde_json::json!({
                "success": true,
                "message": message,
            }),
        )
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}
