use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::ApiResult;
use crate::types::{
    AttendanceEvent, CreateAttendanceEvent, CreateOrganization, CreateUser, Organization,
    UpdateAttendanceEvent, UpdateOrganization, UpdateUser, User,
};

/// User persistence operations.
///
/// Uniqueness enforced at this layer: email (global), employee id (per
/// organization), national id (global, when set). Violations surface as
/// conflict errors.
#[async_trait]
pub trait UserOps: Send + Sync + 'static {
    async fn create_user(&self, user: CreateUser) -> ApiResult<User>;
    async fn get_user_by_id(&self, id: &str) -> ApiResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> ApiResult<Option<User>>;
    async fn get_user_by_employee_id(
        &self,
        organization_id: &str,
        employee_id: &str,
    ) -> ApiResult<Option<User>>;
    async fn get_user_by_national_id(&self, national_id: &str) -> ApiResult<Option<User>>;
    async fn update_user(&self, id: &str, update: UpdateUser) -> ApiResult<User>;
    async fn delete_user(&self, id: &str) -> ApiResult<()>;
    /// All users of one organization, newest first.
    async fn list_organization_users(&self, organization_id: &str) -> ApiResult<Vec<User>>;
    async fn count_organization_users(&self, organization_id: &str) -> ApiResult<usize>;
}

/// Organization persistence operations.
#[async_trait]
pub trait OrganizationOps: Send + Sync + 'static {
    /// Create an organization. Duplicate names (case-insensitive) and
    /// duplicate invite codes are conflicts.
    async fn create_organization(&self, org: CreateOrganization) -> ApiResult<Organization>;
    async fn get_organization_by_id(&self, id: &str) -> ApiResult<Option<Organization>>;
    async fn get_organization_by_invite_code(
        &self,
        invite_code: &str,
    ) -> ApiResult<Option<Organization>>;
    async fn update_organization(
        &self,
        id: &str,
        update: UpdateOrganization,
    ) -> ApiResult<Organization>;
    /// Delete an organization record. Emptiness is the caller's check.
    async fn delete_organization(&self, id: &str) -> ApiResult<()>;
    async fn list_organizations(&self) -> ApiResult<Vec<Organization>>;
}

/// Attendance record persistence operations.
///
/// All listings are ordered by check-in time ascending; the state machine
/// depends on that order.
#[async_trait]
pub trait AttendanceOps: Send + Sync + 'static {
    async fn create_event(&self, event: CreateAttendanceEvent) -> ApiResult<AttendanceEvent>;
    async fn get_event_by_id(&self, id: &str) -> ApiResult<Option<AttendanceEvent>>;
    async fn update_event(
        &self,
        id: &str,
        update: UpdateAttendanceEvent,
    ) -> ApiResult<AttendanceEvent>;
    async fn delete_event(&self, id: &str) -> ApiResult<()>;
    async fn list_user_events_on_day(
        &self,
        user_id: &str,
        day: NaiveDate,
    ) -> ApiResult<Vec<AttendanceEvent>>;
    async fn list_user_events_in_range(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ApiResult<Vec<AttendanceEvent>>;
    async fn list_organization_events_on_day(
        &self,
        organization_id: &str,
        day: NaiveDate,
    ) -> ApiResult<Vec<AttendanceEvent>>;
    async fn list_organization_events_in_range(
        &self,
        organization_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ApiResult<Vec<AttendanceEvent>>;
    async fn count_organization_events(&self, organization_id: &str) -> ApiResult<usize>;
    /// Remove all records of one user, returning how many were deleted.
    async fn delete_user_events(&self, user_id: &str) -> ApiResult<usize>;
}
