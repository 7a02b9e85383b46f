//! The attendance state machine.
//!
//! State for a user's calendar day is never stored; it is derived from the
//! ordered sequence of that day's events. This module owns the transition
//! rules (what a check-in/check-out/break request is allowed to do) and the
//! working-time arithmetic. Persistence and per-user serialization live in
//! the attendance plugin.

use chrono::{DateTime, Utc};

use crate::error::{ApiError, ApiResult};
use crate::types::{AttendanceEvent, EventType};

/// Derived state of one user's day, inferred from its event sequence.
///
/// Events must belong to a single user and day, ordered by `check_in_time`
/// ascending (the order the store returns them in).
#[derive(Debug)]
pub struct DayState<'a> {
    /// Most recent check-in record today, if any.
    pub last_check_in: Option<&'a AttendanceEvent>,
    /// Most recent break-start today, if any.
    last_break_start: Option<&'a AttendanceEvent>,
    /// Most recent break-end today, if any.
    last_break_end: Option<&'a AttendanceEvent>,
}

impl<'a> DayState<'a> {
    pub fn from_events(events: &'a [AttendanceEvent]) -> Self {
        let mut last_check_in = None;
        let mut last_break_start = None;
        let mut last_break_end = None;

        for event in events {
            match event.event_type {
                EventType::CheckIn | EventType::CheckOut => last_check_in = Some(event),
                EventType::BreakStart => last_break_start = Some(event),
                EventType::BreakEnd => last_break_end = Some(event),
            }
        }

        Self {
            last_check_in,
            last_break_start,
            last_break_end,
        }
    }

    /// The open check-in record (one with no closing check-out), if any.
    ///
    /// The invariant "at most one open check-in per user" holds because a
    /// check-in is only appended when this returns `None`, and the caller
    /// serializes that read-evaluate-append sequence per user.
    pub fn open_check_in(&self) -> Option<&'a AttendanceEvent> {
        self.last_check_in.filter(|e| e.is_open())
    }

    /// The open break-start, if a break was started after the open check-in
    /// and not yet ended.
    pub fn open_break(&self) -> Option<&'a AttendanceEvent> {
        let open = self.open_check_in()?;
        let start = self.last_break_start?;
        if start.check_in_time < open.check_in_time {
            return None;
        }
        match self.last_break_end {
            Some(end) if end.check_in_time >= start.check_in_time => None,
            _ => Some(start),
        }
    }

    /// A check-in is legal only when no open check-in exists.
    pub fn check_check_in(&self) -> ApiResult<()> {
        if self.open_check_in().is_some() {
            Err(ApiError::AlreadyCheckedIn)
        } else {
            Ok(())
        }
    }

    /// A check-out is legal only against an open check-in; returns the
    /// record it closes.
    pub fn check_check_out(&self) -> ApiResult<&'a AttendanceEvent> {
        self.open_check_in().ok_or(ApiError::NoOpenCheckIn)
    }

    /// A break may start only inside an open check-in, and breaks do not
    /// nest.
    pub fn check_break_start(&self) -> ApiResult<()> {
        if self.open_check_in().is_none() {
            return Err(ApiError::InvalidBreak(
                "Cannot start a break without an open check-in".to_string(),
            ));
        }
        if self.open_break().is_some() {
            return Err(ApiError::InvalidBreak(
                "A break is already in progress".to_string(),
            ));
        }
        Ok(())
    }

    /// A break may end only while one is in progress.
    pub fn check_break_end(&self) -> ApiResult<()> {
        if self.open_break().is_none() {
            return Err(ApiError::InvalidBreak("No break in progress".to_string()));
        }
        Ok(())
    }
}

/// Sum of break minutes between `since` and `until`, from paired
/// break-start/break-end events. A break still open at `until` counts up to
/// `until`.
pub fn break_minutes(
    events: &[AttendanceEvent],
    since: DateTime<Utc>,
    until: DateTime<Utc>,
) -> i64 {
    let mut total = 0;
    let mut open_start: Option<DateTime<Utc>> = None;

    for event in events {
        if event.check_in_time < since || event.check_in_time > until {
            continue;
        }
        match event.event_type {
            EventType::BreakStart => open_start = Some(event.check_in_time),
            EventType::BreakEnd => {
                if let Some(start) = open_start.take() {
                    total += (event.check_in_time - start).num_minutes();
                }
            }
            _ => {}
        }
    }

    if let Some(start) = open_start {
        total += (until - start).num_minutes();
    }

    total.max(0)
}

/// Derived working time for a closed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkedTime {
    pub working_minutes: i64,
    pub overtime_minutes: i64,
}

/// `working = max(0, minutes(check_out - check_in) - break)`; minutes worked
/// beyond the standard day are also reported as overtime.
pub fn worked_time(
    check_in: DateTime<Utc>,
    check_out: DateTime<Utc>,
    break_mins: i64,
    standard_day_minutes: i64,
) -> WorkedTime {
    let elapsed = (check_out - check_in).num_minutes();
    let working_minutes = (elapsed - break_mins).max(0);
    let overtime_minutes = (working_minutes - standard_day_minutes).max(0);

    WorkedTime {
        working_minutes,
        overtime_minutes,
    }
}
