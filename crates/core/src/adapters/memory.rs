use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::types::{
    AttendanceEvent, CreateAttendanceEvent, CreateOrganization, CreateUser, Organization,
    OrgStats, UpdateAttendanceEvent, UpdateOrganization, UpdateUser, User,
};

use super::traits::{AttendanceOps, OrganizationOps, UserOps};

/// In-memory store backed by mutex-guarded maps.
///
/// Suitable for tests and single-process demos; a database-backed adapter
/// implements the same operation traits for production.
#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<String, User>>,
    organizations: Mutex<HashMap<String, Organization>>,
    events: Mutex<HashMap<String, AttendanceEvent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn user_from_create(id: String, create: &CreateUser) -> User {
    let now = Utc::now();
    User {
        id,
        first_name: create.first_name.clone(),
        last_name: create.last_name.clone(),
        email: create.email.clone(),
        employee_id: create.employee_id.clone(),
        department: create.department.clone(),
        designation: create.designation.clone(),
        phone_number: create.phone_number.clone(),
        password_hash: create.password_hash.clone(),
        role: create.role,
        organization_id: create.organization_id.clone(),
        is_active: true,
        is_approved: create.is_approved,
        approved_by: create.approved_by.clone(),
        approved_at: create.is_approved.then_some(now),
        face_descriptors: Vec::new(),
        face_images: Vec::new(),
        face_enrolled: false,
        enrollment_attempts: 0,
        national_id: None,
        national_id_verified: false,
        national_id_verified_at: None,
        failed_logins: 0,
        lock_until: None,
        reset_token_hash: None,
        reset_token_expires: None,
        last_login: None,
        created_at: now,
        updated_at: now,
    }
}

fn apply_user_update(user: &mut User, update: &UpdateUser) {
    if let Some(first_name) = &update.first_name {
        user.first_name = first_name.clone();
    }
    if let Some(last_name) = &update.last_name {
        user.last_name = last_name.clone();
    }
    if let Some(department) = &update.department {
        user.department = Some(department.clone());
    }
    if let Some(designation) = &update.designation {
        user.designation = Some(designation.clone());
    }
    if let Some(phone_number) = &update.phone_number {
        user.phone_number = Some(phone_number.clone());
    }
    if let Some(password_hash) = &update.password_hash {
        user.password_hash = password_hash.clone();
    }
    if let Some(is_active) = update.is_active {
        user.is_active = is_active;
    }
    if let Some(is_approved) = update.is_approved {
        user.is_approved = is_approved;
    }
    if let Some(approved_by) = &update.approved_by {
        user.approved_by = approved_by.clone();
    }
    if let Some(approved_at) = update.approved_at {
        user.approved_at = approved_at;
    }
    if let Some(face_descriptors) = &update.face_descriptors {
        user.face_descriptors = face_descriptors.clone();
    }
    if let Some(face_images) = &update.face_images {
        user.face_images = face_images.clone();
    }
    if let Some(face_enrolled) = update.face_enrolled {
        user.face_enrolled = face_enrolled;
    }
    if let Some(enrollment_attempts) = update.enrollment_attempts {
        user.enrollment_attempts = enrollment_attempts;
    }
    if let Some(national_id) = &update.national_id {
        user.national_id = national_id.clone();
    }
    if let Some(national_id_verified) = update.national_id_verified {
        user.national_id_verified = national_id_verified;
    }
    if let Some(national_id_verified_at) = update.national_id_verified_at {
        user.national_id_verified_at = national_id_verified_at;
    }
    if let Some(failed_logins) = update.failed_logins {
        user.failed_logins = failed_logins;
    }
    if let Some(lock_until) = update.lock_until {
        user.lock_until = lock_until;
    }
    if let Some(reset_token_hash) = &update.reset_token_hash {
        user.reset_token_hash = reset_token_hash.clone();
    }
    if let Some(reset_token_expires) = update.reset_token_expires {
        user.reset_token_expires = reset_token_expires;
    }
    if let Some(last_login) = update.last_login {
        user.last_login = Some(last_login);
    }
    user.updated_at = Utc::now();
}

fn apply_organization_update(org: &mut Organization, update: &UpdateOrganization) {
    if let Some(name) = &update.name {
        org.name = name.clone();
    }
    if let Some(org_type) = update.org_type {
        org.org_type = org_type;
    }
    if let Some(settings) = &update.settings {
        org.settings = settings.clone();
    }
    if let Some(subscription) = &update.subscription {
        org.subscription = subscription.clone();
    }
    if let Some(is_active) = update.is_active {
        org.is_active = is_active;
    }
    if let Some(stats) = update.stats {
        org.stats = stats;
    }
    org.updated_at = Utc::now();
}

fn apply_event_update(event: &mut AttendanceEvent, update: &UpdateAttendanceEvent) {
    if let Some(check_out_time) = update.check_out_time {
        event.check_out_time = Some(check_out_time);
    }
    if let Some(working_minutes) = update.working_minutes {
        event.working_minutes = working_minutes;
    }
    if let Some(break_minutes) = update.break_minutes {
        event.break_minutes = break_minutes;
    }
    if let Some(overtime_minutes) = update.overtime_minutes {
        event.overtime_minutes = overtime_minutes;
    }
    if let Some(status) = update.status {
        event.status = status;
    }
    if let Some(approved_by) = &update.approved_by {
        event.approved_by = Some(approved_by.clone());
    }
    if let Some(approved_at) = update.approved_at {
        event.approved_at = Some(approved_at);
    }
    if let Some(rejection_reason) = &update.rejection_reason {
        event.rejection_reason = rejection_reason.clone();
    }
    if let Some(notes) = &update.notes {
        event.notes = notes.clone();
    }
    if let Some(modified_by) = &update.modified_by {
        event.modified_by = Some(modified_by.clone());
    }
    if let Some(modified_at) = update.modified_at {
        event.modified_at = Some(modified_at);
    }
    event.updated_at = Utc::now();
}

#[async_trait]
impl UserOps for MemoryStore {
    async fn create_user(&self, create: CreateUser) -> ApiResult<User> {
        let mut users = self.users.lock().unwrap();

        let email = create.email.to_lowercase();
        if users.values().any(|u| u.email.to_lowercase() == email) {
            return Err(ApiError::conflict("Email is already registered"));
        }
        if let Some(org_id) = &create.organization_id {
            if users.values().any(|u| {
                u.organization_id.as_deref() == Some(org_id) && u.employee_id == create.employee_id
            }) {
                return Err(ApiError::conflict(
                    "Employee ID is already taken in this organization",
                ));
            }
        }

        let id = create
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let user = user_from_create(id.clone(), &create);
        users.insert(id, user.clone());
        Ok(user)
    }

    async fn get_user_by_id(&self, id: &str) -> ApiResult<Option<User>> {
        Ok(self.users.lock().unwrap().get(id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        let email = email.to_lowercase();
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email.to_lowercase() == email)
            .cloned())
    }

    async fn get_user_by_employee_id(
        &self,
        organization_id: &str,
        employee_id: &str,
    ) -> ApiResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| {
                u.organization_id.as_deref() == Some(organization_id)
                    && u.employee_id == employee_id
            })
            .cloned())
    }

    async fn get_user_by_national_id(&self, national_id: &str) -> ApiResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.national_id.as_deref() == Some(national_id))
            .cloned())
    }

    async fn update_user(&self, id: &str, update: UpdateUser) -> ApiResult<User> {
        let mut users = self.users.lock().unwrap();

        if let Some(Some(national_id)) = &update.national_id {
            if users
                .values()
                .any(|u| u.id != id && u.national_id.as_deref() == Some(national_id))
            {
                return Err(ApiError::conflict(
                    "National ID is already linked to another account",
                ));
            }
        }

        let user = users.get_mut(id).ok_or(ApiError::UserNotFound)?;
        apply_user_update(user, &update);
        Ok(user.clone())
    }

    async fn delete_user(&self, id: &str) -> ApiResult<()> {
        self.users.lock().unwrap().remove(id);
        Ok(())
    }

    async fn list_organization_users(&self, organization_id: &str) -> ApiResult<Vec<User>> {
        let mut users: Vec<User> = self
            .users
            .lock()
            .unwrap()
            .values()
            .filter(|u| u.organization_id.as_deref() == Some(organization_id))
            .cloned()
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn count_organization_users(&self, organization_id: &str) -> ApiResult<usize> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .filter(|u| u.organization_id.as_deref() == Some(organization_id))
            .count())
    }
}

#[async_trait]
impl OrganizationOps for MemoryStore {
    async fn create_organization(&self, create: CreateOrganization) -> ApiResult<Organization> {
        let mut organizations = self.organizations.lock().unwrap();

        // Only active organizations reserve their name.
        let name = create.name.to_lowercase();
        if organizations
            .values()
            .any(|o| o.is_active && o.name.to_lowercase() == name)
        {
            return Err(ApiError::conflict(
                "An organization with this name already exists",
            ));
        }
        if organizations
            .values()
            .any(|o| o.invite_code == create.invite_code)
        {
            return Err(ApiError::conflict("Invite code collision"));
        }

        let now = Utc::now();
        let id = create
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let organization = Organization {
            id: id.clone(),
            name: create.name,
            org_type: create.org_type,
            settings: create.settings,
            subscription: create.subscription,
            invite_code: create.invite_code,
            is_active: true,
            created_by: create.created_by,
            stats: OrgStats::default(),
            created_at: now,
            updated_at: now,
        };
        organizations.insert(id, organization.clone());
        Ok(organization)
    }

    async fn get_organization_by_id(&self, id: &str) -> ApiResult<Option<Organization>> {
        Ok(self.organizations.lock().unwrap().get(id).cloned())
    }

    async fn get_organization_by_invite_code(
        &self,
        invite_code: &str,
    ) -> ApiResult<Option<Organization>> {
        Ok(self
            .organizations
            .lock()
            .unwrap()
            .values()
            .find(|o| o.invite_code == invite_code)
            .cloned())
    }

    async fn update_organization(
        &self,
        id: &str,
        update: UpdateOrganization,
    ) -> ApiResult<Organization> {
        let mut organizations = self.organizations.lock().unwrap();

        if let Some(name) = &update.name {
            let name = name.to_lowercase();
            if organizations
                .values()
                .any(|o| o.id != id && o.is_active && o.name.to_lowercase() == name)
            {
                return Err(ApiError::conflict(
                    "An organization with this name already exists",
                ));
            }
        }

        let organization = organizations
            .get_mut(id)
            .ok_or_else(|| ApiError::not_found("Organization not found"))?;
        apply_organization_update(organization, &update);
        Ok(organization.clone())
    }

    async fn delete_organization(&self, id: &str) -> ApiResult<()> {
        self.organizations.lock().unwrap().remove(id);
        Ok(())
    }

    async fn list_organizations(&self) -> ApiResult<Vec<Organization>> {
        let mut organizations: Vec<Organization> = self
            .organizations
            .lock()
            .unwrap()
            .values()
            .cloned()
            .collect();
        organizations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(organizations)
    }
}

#[async_trait]
impl AttendanceOps for MemoryStore {
    async fn create_event(&self, create: CreateAttendanceEvent) -> ApiResult<AttendanceEvent> {
        let now = Utc::now();
        let event = AttendanceEvent {
            id: Uuid::new_v4().to_string(),
            user_id: create.user_id,
            organization_id: create.organization_id,
            day: create.day,
            check_in_time: create.check_in_time,
            check_out_time: None,
            event_type: create.event_type,
            method: create.method,
            face_confidence: create.face_confidence,
            location: create.location,
            photo_url: create.photo_url,
            status: create.status,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            working_minutes: 0,
            break_minutes: 0,
            overtime_minutes: 0,
            is_offline: create.is_offline,
            synced_at: create.synced_at,
            notes: create.notes,
            modified_by: None,
            modified_at: None,
            created_at: now,
            updated_at: now,
        };
        self.events
            .lock()
            .unwrap()
            .insert(event.id.clone(), event.clone());
        Ok(event)
    }

    async fn get_event_by_id(&self, id: &str) -> ApiResult<Option<AttendanceEvent>> {
        Ok(self.events.lock().unwrap().get(id).cloned())
    }

    async fn update_event(
        &self,
        id: &str,
        update: UpdateAttendanceEvent,
    ) -> ApiResult<AttendanceEvent> {
        let mut events = self.events.lock().unwrap();
        let event = events
            .get_mut(id)
            .ok_or_else(|| ApiError::not_found("Attendance record not found"))?;
        apply_event_update(event, &update);
        Ok(event.clone())
    }

    async fn delete_event(&self, id: &str) -> ApiResult<()> {
        self.events.lock().unwrap().remove(id);
        Ok(())
    }

    async fn list_user_events_on_day(
        &self,
        user_id: &str,
        day: NaiveDate,
    ) -> ApiResult<Vec<AttendanceEvent>> {
        let mut events: Vec<AttendanceEvent> = self
            .events
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.user_id == user_id && e.day == day)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.check_in_time.cmp(&b.check_in_time));
        Ok(events)
    }

    async fn list_user_events_in_range(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ApiResult<Vec<AttendanceEvent>> {
        let mut events: Vec<AttendanceEvent> = self
            .events
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.user_id == user_id && e.day >= from && e.day <= to)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.check_in_time.cmp(&b.check_in_time));
        Ok(events)
    }

    async fn list_organization_events_on_day(
        &self,
        organization_id: &str,
        day: NaiveDate,
    ) -> ApiResult<Vec<AttendanceEvent>> {
        let mut events: Vec<AttendanceEvent> = self
            .events
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.organization_id == organization_id && e.day == day)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.check_in_time.cmp(&b.check_in_time));
        Ok(events)
    }

    async fn list_organization_events_in_range(
        &self,
        organization_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ApiResult<Vec<AttendanceEvent>> {
        let mut events: Vec<AttendanceEvent> = self
            .events
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.organization_id == organization_id && e.day >= from && e.day <= to)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.check_in_time.cmp(&b.check_in_time));
        Ok(events)
    }

    async fn count_organization_events(&self, organization_id: &str) -> ApiResult<usize> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.organization_id == organization_id)
            .count())
    }

    async fn delete_user_events(&self, user_id: &str) -> ApiResult<usize> {
        let mut events = self.events.lock().unwrap();
        let before = events.len();
        events.retain(|_, e| e.user_id != user_id);
        Ok(before - events.len())
    }
}
