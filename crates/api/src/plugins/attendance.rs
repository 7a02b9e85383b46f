//! Attendance marking and queries.
//!
//! The mark handler runs the read-evaluate-append sequence inside a
//! per-user async lock so concurrent requests from one account cannot
//! both observe "no open check-in" and double-insert.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use validator::Validate;

use punchclock_core::adapters::Store;
use punchclock_core::ledger::{break_minutes, worked_time, DayState};
use punchclock_core::{
    require_approval, require_face_enrollment, require_role, require_same_org,
    validate_request_body, ApiError, ApiRequest, ApiResponse, ApiResult, ApprovalStatus, Context,
    CreateAttendanceEvent, EventType, GeoPoint, HttpMethod, Plugin, RecognitionMethod, Role,
    Route, UpdateAttendanceEvent, User,
};

use super::helpers::{
    get_authenticated_user, last_segment, parse_day, resolve_org_id, store_image_best_effort,
};

/// Registry size at which idle per-user locks are swept out.
const LOCK_SWEEP_THRESHOLD: usize = 1024;

/// Attendance ledger plugin.
pub struct AttendancePlugin {
    /// Per-user serialization of the mark sequence.
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

#[derive(Debug, Deserialize, Validate)]
struct MarkRequest {
    #[serde(rename = "eventType")]
    event_type: EventType,
    method: Option<RecognitionMethod>,
    #[serde(rename = "faceConfidence")]
    face_confidence: Option<f32>,
    location: Option<GeoPoint>,
    notes: Option<String>,
    #[serde(rename = "isOffline")]
    is_offline: Option<bool>,
    #[serde(rename = "offlineTimestamp")]
    offline_timestamp: Option<DateTime<Utc>>,
    #[serde(rename = "imageBase64")]
    image_base64: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct PatchRecordRequest {
    status: Option<ApprovalStatus>,
    #[serde(rename = "rejectionReason")]
    rejection_reason: Option<String>,
    notes: Option<String>,
}

impl AttendancePlugin {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn user_lock(&self, user_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        // A strong count of 1 means only the registry holds the lock; those
        // entries are swept once the map grows large enough to matter.
        if locks.len() >= LOCK_SWEEP_THRESHOLD {
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        locks.entry(user_id.to_string()).or_default().clone()
    }

    async fn handle_mark<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
    ) -> ApiResult<ApiResponse> {
        let user = get_authenticated_user(req, ctx).await?;
        require_approval(&user)?;

        let org_id = user
            .organization_id
            .clone()
            .ok_or_else(|| ApiError::forbidden("Account has no organization"))?;
        let org = ctx
            .store
            .get_organization_by_id(&org_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Organization not found"))?;

        let body: MarkRequest = match validate_request_body(req) {
            Ok(v) => v,
            Err(resp) => return Ok(resp),
        };

        let method = body.method.unwrap_or(RecognitionMethod::Manual);
        if org.settings.require_face || method == RecognitionMethod::FaceRecognition {
            require_face_enrollment(&user)?;
        }
        if let Some(confidence) = body.face_confidence {
            if !(0.0..=1.0).contains(&confidence) {
                return Err(ApiError::bad_request(
                    "faceConfidence must lie between 0 and 1",
                ));
            }
        }

        let is_offline = body.is_offline.unwrap_or(false);
        let timestamp = if is_offline {
            if !org.settings.allow_offline {
                return Err(ApiError::bad_request(
                    "Offline attendance is not enabled for this organization",
                ));
            }
            body.offline_timestamp
                .ok_or_else(|| ApiError::bad_request("offlineTimestamp is required"))?
        } else {
            Utc::now()
        };
        let day = timestamp.date_naive();

        // Everything from the day-state read to the write happens inside
        // the caller's lock.
        let lock = self.user_lock(&user.id);
        let _guard = lock.lock().await;

        let events = ctx.store.list_user_events_on_day(&user.id, day).await?;
        let state = DayState::from_events(&events);

        let status = match (method, body.face_confidence) {
            (RecognitionMethod::FaceRecognition, Some(confidence))
                if confidence >= ctx.config.workday.auto_approve_confidence =>
            {
                ApprovalStatus::AutoApproved
            }
            _ => ApprovalStatus::Pending,
        };

        match body.event_type {
            EventType::CheckIn => {
                state.check_check_in()?;

                let photo_url = match &body.image_base64 {
                    Some(image) => {
                        let filename = format!("checkin-{}.jpg", timestamp.timestamp());
                        store_image_best_effort(ctx, &user.id, &filename, image).await
                    }
                    None => None,
                };

                let record = ctx
                    .store
                    .create_event(CreateAttendanceEvent {
                        user_id: user.id.clone(),
                        organization_id: org_id,
                        day,
                        check_in_time: timestamp,
                        event_type: EventType::CheckIn,
                        method,
                        face_confidence: body.face_confidence,
                        location: body.location,
                        photo_url,
                        status,
                        is_offline,
                        synced_at: is_offline.then(Utc::now),
                        notes: body.notes,
                    })
                    .await?;

                ApiResponse::ok(201, "Checked in", &record).map_err(ApiError::from)
            }
            EventType::CheckOut => {
                let open = state.check_check_out()?;

                let breaks = break_minutes(&events, open.check_in_time, timestamp);
                let worked = worked_time(
                    open.check_in_time,
                    timestamp,
                    breaks,
                    ctx.config.workday.standard_day_minutes,
                );

                let record = ctx
                    .store
                    .update_event(
                        &open.id,
                        UpdateAttendanceEvent {
                            check_out_time: Some(timestamp),
                            working_minutes: Some(worked.working_minutes),
                            break_minutes: Some(breaks),
                            overtime_minutes: Some(worked.overtime_minutes),
                            ..Default::default()
                        },
                    )
                    .await?;

                ApiResponse::ok(200, "Checked out", &record).map_err(ApiError::from)
            }
            EventType::BreakStart | EventType::BreakEnd => {
                if body.event_type == EventType::BreakStart {
                    state.check_break_start()?;
                } else {
                    state.check_break_end()?;
                }

                let record = ctx
                    .store
                    .create_event(CreateAttendanceEvent {
                        user_id: user.id.clone(),
                        organization_id: org_id,
                        day,
                        check_in_time: timestamp,
                        event_type: body.event_type,
                        method,
                        face_confidence: None,
                        location: body.location,
                        photo_url: None,
                        status: ApprovalStatus::Pending,
                        is_offline,
                        synced_at: is_offline.then(Utc::now),
                        notes: body.notes,
                    })
                    .await?;

                let message = if body.event_type == EventType::BreakStart {
                    "Break started"
                } else {
                    "Break ended"
                };
                ApiResponse::ok(201, message, &record).map_err(ApiError::from)
            }
        }
    }

    async fn handle_my_history<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
    ) -> ApiResult<ApiResponse> {
        let user = get_authenticated_user(req, ctx).await?;

        let to = match req.query.get("to") {
            Some(value) => parse_day(value)?,
            None => Utc::now().date_naive(),
        };
        let from = match req.query.get("from") {
            Some(value) => parse_day(value)?,
            None => to - Duration::days(30),
        };
        if from > to {
            return Err(ApiError::bad_request("from must not be after to"));
        }

        let limit: usize = req
            .query
            .get("limit")
            .and_then(|v| v.parse().ok())
            .unwrap_or(50);
        let offset: usize = req
            .query
            .get("offset")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        let events = ctx
            .store
            .list_user_events_in_range(&user.id, from, to)
            .await?;
        let total = events.len();
        let page: Vec<_> = events.into_iter().skip(offset).take(limit).collect();

        ApiResponse::ok(
            200,
            "OK",
            &serde_json::json!({
                "records": page,
                "total": total,
                "limit": limit,
                "offset": offset,
            }),
        )
        .map_err(ApiError::from)
    }

    async fn handle_all<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
    ) -> ApiResult<ApiResponse> {
        let user = get_authenticated_user(req, ctx).await?;
        require_role(&user, &[Role::Admin, Role::Hr, Role::SuperAdmin])?;
        let org_id = resolve_org_id(&user, req, ctx)?;

        let day = match req.query.get("date") {
            Some(value) => parse_day(value)?,
            None => Utc::now().date_naive(),
        };

        let members: HashMap<String, User> = ctx
            .store
            .list_organization_users(&org_id)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        let department = req.query.get("department");
        let events = ctx
            .store
            .list_organization_events_on_day(&org_id, day)
            .await?;

        let rows: Vec<serde_json::Value> = events
            .into_iter()
            .filter(|e| match department {
                Some(dept) => members
                    .get(&e.user_id)
                    .is_some_and(|u| u.department.as_deref() == Some(dept.as_str())),
                None => true,
            })
            .map(|e| {
                let member = members.get(&e.user_id);
                serde_json::json!({
                    "record": e,
                    "userName": member.map(|u| u.full_name()),
                    "department": member.and_then(|u| u.department.clone()),
                })
            })
            .collect();

        ApiResponse::ok(200, "OK", &rows).map_err(ApiError::from)
    }

    async fn handle_today_summary<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
    ) -> ApiResult<ApiResponse> {
        let user = get_authenticated_user(req, ctx).await?;

        let now = Utc::now();
        let events = ctx
            .store
            .list_user_events_on_day(&user.id, now.date_naive())
            .await?;
        let state = DayState::from_events(&events);

        let open = state.open_check_in();
        let closed_minutes: i64 = events
            .iter()
            .filter(|e| e.event_type == EventType::CheckIn && e.check_out_time.is_some())
            .map(|e| e.working_minutes)
            .sum();
        let open_minutes = open
            .map(|record| {
                let breaks = break_minutes(&events, record.check_in_time, now);
                ((now - record.check_in_time).num_minutes() - breaks).max(0)
            })
            .unwrap_or(0);

        ApiResponse::ok(
            200,
            "OK",
            &serde_json::json!({
                "checkedIn": open.is_some(),
                "onBreak": state.open_break().is_some(),
                "openSince": open.map(|r| r.check_in_time),
                "workedMinutes": closed_minutes + open_minutes,
                "records": events,
            }),
        )
        .map_err(ApiError::from)
    }

    async fn handle_by_date<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
    ) -> ApiResult<ApiResponse> {
        let user = get_authenticated_user(req, ctx).await?;
        let day = match req.query.get("date") {
            Some(value) => parse_day(value)?,
            None => Utc::now().date_naive(),
        };

        let events = ctx.store.list_user_events_on_day(&user.id, day).await?;
        ApiResponse::ok(200, "OK", &events).map_err(ApiError::from)
    }

    async fn handle_patch_record<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
        record_id: &str,
    ) -> ApiResult<ApiResponse> {
        let actor = get_authenticated_user(req, ctx).await?;
        require_role(&actor, &[Role::Admin, Role::Hr, Role::SuperAdmin])?;

        let record = ctx
            .store
            .get_event_by_id(record_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Attendance record not found"))?;
        require_same_org(&actor, &record.organization_id)?;

        let body: PatchRecordRequest = match validate_request_body(req) {
            Ok(v) => v,
            Err(resp) => return Ok(resp),
        };

        let now = Utc::now();
        let mut update = UpdateAttendanceEvent {
            notes: body.notes.map(Some),
            modified_by: Some(actor.id.clone()),
            modified_at: Some(now),
            ..Default::default()
        };
        if let Some(status) = body.status {
            update.status = Some(status);
            if status == ApprovalStatus::Approved {
                update.approved_by = Some(actor.id.clone());
                update.approved_at = Some(now);
            }
            if status == ApprovalStatus::Rejected {
                update.rejection_reason = Some(body.rejection_reason);
            }
        }

        let updated = ctx.store.update_event(record_id, update).await?;
        ApiResponse::ok(200, "Record updated", &updated).map_err(ApiError::from)
    }

    async fn handle_delete_record<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
        record_id: &str,
    ) -> ApiResult<ApiResponse> {
        let actor = get_authenticated_user(req, ctx).await?;
        require_role(&actor, &[Role::Admin, Role::Hr, Role::SuperAdmin])?;

        let record = ctx
            .store
            .get_event_by_id(record_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Attendance record not found"))?;
        require_same_org(&actor, &record.organization_id)?;

        ctx.store.delete_event(record_id).await?;
        ApiResponse::ok_message(200, "Record deleted").map_err(ApiError::from)
    }
}

#[async_trait]
impl<S: Store> Plugin<S> for AttendancePlugin {
    fn name(&self) -> &'static str {
        "attendance"
    }

    fn routes(&self) -> Vec<Route> {
        vec![
            Route::post("/attendance/mark", "markAttendance"),
            Route::get("/attendance/my-history", "myAttendanceHistory"),
            Route::get("/attendance/all", "allAttendance"),
            Route::get("/attendance/today-summary", "todaySummary"),
            Route::get("/attendance/by-date", "attendanceByDate"),
            Route::put("/attendance/{id}", "patchAttendanceRecord"),
            Route::delete("/attendance/{id}", "deleteAttendanceRecord"),
        ]
    }

    async fn on_request(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
    ) -> ApiResult<Option<ApiResponse>> {
        match (req.method(), req.path()) {
            (HttpMethod::Post, "/attendance/mark") => Ok(Some(self.handle_mark(req, ctx).await?)),
            (HttpMethod::Get, "/attendance/my-history") => {
                Ok(Some(self.handle_my_history(req, ctx).await?))
            }
            (HttpMethod::Get, "/attendance/all") => Ok(Some(self.handle_all(req, ctx).await?)),
            (HttpMethod::Get, "/attendance/today-summary") => {
                Ok(Some(self.handle_today_summary(req, ctx).await?))
            }
            (HttpMethod::Get, "/attendance/by-date") => {
                Ok(Some(self.handle_by_date(req, ctx).await?))
            }
            (HttpMethod::Put, path) if path.starts_with("/attendance/") => {
                match last_segment(path, "/attendance/") {
                    Some(id) => Ok(Some(self.handle_patch_record(req, ctx, id).await?)),
                    None => Ok(None),
                }
            }
            (HttpMethod::Delete, path) if path.starts_with("/attendance/") => {
                match last_segment(path, "/attendance/") {
                    Some(id) => Ok(Some(self.handle_delete_record(req, ctx, id).await?)),
                    None => Ok(None),
                }
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_user_locks_are_swept_from_the_registry() {
        let plugin = AttendancePlugin::new();

        let held = plugin.user_lock("still-marking");
        for i in 0..LOCK_SWEEP_THRESHOLD {
            drop(plugin.user_lock(&format!("user-{}", i)));
        }

        // Crossing the threshold evicts every lock nobody holds.
        drop(plugin.user_lock("one-more"));

        let locks = plugin.locks.lock().unwrap();
        assert!(locks.len() <= 2);
        assert!(locks.contains_key("still-marking"));
        drop(held);
    }

    #[test]
    fn user_lock_is_shared_between_acquisitions() {
        let plugin = AttendancePlugin::new();
        let a = plugin.user_lock("worker");
        let b = plugin.user_lock("worker");
        assert!(Arc::ptr_eq(&a, &b));
    }
}
