//! Attendance reporting: daily, per-department, and date-range rollups.
//!
//! Reports are recomputed from the ledger on every request; nothing here
//! is cached or persisted.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use std::collections::{HashMap, HashSet};

use punchclock_core::adapters::Store;
use punchclock_core::{
    require_role, ApiError, ApiRequest, ApiResponse, ApiResult, AttendanceEvent, Context,
    EventType, HttpMethod, Plugin, Role, Route, User,
};

use super::helpers::{get_authenticated_user, parse_day, resolve_org_id};

/// Longest range a single report may span.
const MAX_RANGE_DAYS: i64 = 92;

/// Reporting plugin.
pub struct ReportsPlugin;

struct DayRollup {
    present: usize,
    headcount: usize,
    working_minutes: i64,
    overtime_minutes: i64,
}

impl DayRollup {
    fn compute(events: &[AttendanceEvent], headcount: usize) -> Self {
        let present: HashSet<&str> = events
            .iter()
            .filter(|e| e.event_type == EventType::CheckIn)
            .map(|e| e.user_id.as_str())
            .collect();

        let (working, overtime) = events
            .iter()
            .filter(|e| e.event_type == EventType::CheckIn)
            .fold((0, 0), |(w, o), e| {
                (w + e.working_minutes, o + e.overtime_minutes)
            });

        Self {
            present: present.len(),
            headcount,
            working_minutes: working,
            overtime_minutes: overtime,
        }
    }

    fn rate(&self) -> f64 {
        if self.headcount == 0 {
            0.0
        } else {
            self.present as f64 / self.headcount as f64
        }
    }

    fn to_json(&self, day: NaiveDate) -> serde_json::Value {
        serde_json::json!({
            "date": day,
            "present": self.present,
            "absent": self.headcount.saturating_sub(self.present),
            "headcount": self.headcount,
            "attendanceRate": self.rate(),
            "workingMinutes": self.working_minutes,
            "overtimeMinutes": self.overtime_minutes,
        })
    }
}

/// Accounts that count toward the attendance denominator.
fn counted(user: &User) -> bool {
    user.is_active && user.is_approved
}

impl ReportsPlugin {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self
    }

    async fn authorize_reporting<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
    ) -> ApiResult<(User, String)> {
        let actor = get_authenticated_user(req, ctx).await?;
        require_role(&actor, &[Role::Admin, Role::Hr, Role::SuperAdmin])?;
        let org_id = resolve_org_id(&actor, req, ctx)?;
        Ok((actor, org_id))
    }

    async fn handle_daily<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
    ) -> ApiResult<ApiResponse> {
        let (_, org_id) = self.authorize_reporting(req, ctx).await?;

        let day = match req.query.get("date") {
            Some(value) => parse_day(value)?,
            None => Utc::now().date_naive(),
        };

        let members = ctx.store.list_organization_users(&org_id).await?;
        let headcount = members.iter().filter(|u| counted(u)).count();

        let events = ctx
            .store
            .list_organization_events_on_day(&org_id, day)
            .await?;

        let rollup = DayRollup::compute(&events, headcount);
        ApiResponse::ok(200, "OK", &rollup.to_json(day)).map_err(ApiError::from)
    }

    async fn handle_by_department<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
    ) -> ApiResult<ApiResponse> {
        let (_, org_id) = self.authorize_reporting(req, ctx).await?;

        let day = match req.query.get("date") {
            Some(value) => parse_day(value)?,
            None => Utc::now().date_naive(),
        };

        let members = ctx.store.list_organization_users(&org_id).await?;
        let events = ctx
            .store
            .list_organization_events_on_day(&org_id, day)
            .await?;

        // Accounts with no department roll up under "unassigned".
        let department_of: HashMap<&str, &str> = members
            .iter()
            .map(|u| (u.id.as_str(), u.department.as_deref().unwrap_or("unassigned")))
            .collect();

        let mut by_department: HashMap<&str, (Vec<&AttendanceEvent>, usize)> = HashMap::new();
        for member in members.iter().filter(|u| counted(u)) {
            let dept = department_of[member.id.as_str()];
            by_department.entry(dept).or_default().1 += 1;
        }
        for event in &events {
            if let Some(&dept) = department_of.get(event.user_id.as_str()) {
                by_department.entry(dept).or_default().0.push(event);
            }
        }

        let mut departments: Vec<serde_json::Value> = by_department
            .into_iter()
            .map(|(dept, (dept_events, headcount))| {
                let owned: Vec<AttendanceEvent> =
                    dept_events.into_iter().cloned().collect();
                let rollup = DayRollup::compute(&owned, headcount);
                let mut row = rollup.to_json(day);
                row["department"] = serde_json::json!(dept);
                row
            })
            .collect();
        departments.sort_by(|a, b| a["department"].as_str().cmp(&b["department"].as_str()));

        ApiResponse::ok(200, "OK", &departments).map_err(ApiError::from)
    }

    async fn handle_range<S: Store>(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
    ) -> ApiResult<ApiResponse> {
        let (_, org_id) = self.authorize_reporting(req, ctx).await?;

        let from = req
            .query
            .get("from")
            .ok_or_else(|| ApiError::bad_request("from query parameter is required"))
            .and_then(|v| parse_day(v))?;
        let to = req
            .query
            .get("to")
            .ok_or_else(|| ApiError::bad_request("to query parameter is required"))
            .and_then(|v| parse_day(v))?;

        if from > to {
            return Err(ApiError::bad_request("from must not be after to"));
        }
        if (to - from).num_days() > MAX_RANGE_DAYS {
            return Err(ApiError::bad_request(format!(
                "Range may span at most {} days",
                MAX_RANGE_DAYS
            )));
        }

        let members = ctx.store.list_organization_users(&org_id).await?;
        let headcount = members.iter().filter(|u| counted(u)).count();

        let events = ctx
            .store
            .list_organization_events_in_range(&org_id, from, to)
            .await?;

        let mut per_day: HashMap<NaiveDate, Vec<AttendanceEvent>> = HashMap::new();
        for event in events {
            per_day.entry(event.day).or_default().push(event);
        }

        let mut days = Vec::new();
        let mut day = from;
        while day <= to {
            let day_events = per_day.get(&day).map(Vec::as_slice).unwrap_or(&[]);
            days.push(DayRollup::compute(day_events, headcount).to_json(day));
            day += Duration::days(1);
        }

        let total_working: i64 = days
            .iter()
            .filter_map(|d| d["workingMinutes"].as_i64())
            .sum();

        ApiResponse::ok(
            200,
            "OK",
            &serde_json::json!({
                "from": from,
                "to": to,
                "days": days,
                "totalWorkingMinutes": total_working,
            }),
        )
        .map_err(ApiError::from)
    }
}

#[async_trait]
impl<S: Store> Plugin<S> for ReportsPlugin {
    fn name(&self) -> &'static str {
        "reports"
    }

    fn routes(&self) -> Vec<Route> {
        vec![
            Route::get("/reports/daily", "dailyReport"),
            Route::get("/reports/by-department", "departmentReport"),
            Route::get("/reports/range", "rangeReport"),
        ]
    }

    async fn on_request(
        &self,
        req: &ApiRequest,
        ctx: &Context<S>,
    ) -> ApiResult<Option<ApiResponse>> {
        match (req.method(), req.path()) {
            (HttpMethod::Get, "/reports/daily") => Ok(Some(self.handle_daily(req, ctx).await?)),
            (HttpMethod::Get, "/reports/by-department") => {
                Ok(Some(self.handle_by_department(req, ctx).await?))
            }
            (HttpMethod::Get, "/reports/range") => Ok(Some(self.handle_range(req, ctx).await?)),
            _ => Ok(None),
        }
    }
}
