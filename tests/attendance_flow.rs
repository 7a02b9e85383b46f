//! Attendance ledger: state machine, working-hours arithmetic, queries,
//! and record administration.

mod common;

use serde_json::json;

use common::*;
use punchclock::HttpMethod;

#[tokio::test]
async fn double_check_in_is_rejected() {
    let app = build_app().await;
    let fixture = register_org(&app, "One Open").await;
    let (token, _) = onboard_employee(&app, &fixture).await;

    let (status, _) = send(
        &app,
        with_auth(
            json_request(
                HttpMethod::Post,
                "/attendance/mark",
                &json!({ "eventType": "check-in" }),
            ),
            &token,
        ),
    )
    .await;
    assert_eq!(status, 201);

    let (status, body) = send(
        &app,
        with_auth(
            json_request(
                HttpMethod::Post,
                "/attendance/mark",
                &json!({ "eventType": "check-in" }),
            ),
            &token,
        ),
    )
    .await;
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("Already checked in"));
}

#[tokio::test]
async fn check_out_without_check_in_is_rejected() {
    let app = build_app().await;
    let fixture = register_org(&app, "No Open").await;
    let (token, _) = onboard_employee(&app, &fixture).await;

    let (status, body) = send(
        &app,
        with_auth(
            json_request(
                HttpMethod::Post,
                "/attendance/mark",
                &json!({ "eventType": "check-out" }),
            ),
            &token,
        ),
    )
    .await;
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("No open check-in"));
}

#[tokio::test]
async fn full_day_without_breaks_yields_no_overtime() {
    let app = build_app().await;
    let fixture = register_org(&app, "Plain Day").await;
    enable_offline(&app, &fixture).await;
    let (token, _) = onboard_employee(&app, &fixture).await;

    let (status, _) = mark_offline(&app, &token, "check-in", "2024-03-11T09:00:00Z").await;
    assert_eq!(status, 201);

    let (status, body) = mark_offline(&app, &token, "check-out", "2024-03-11T17:00:00Z").await;
    assert_eq!(status, 200);

    assert_eq!(body["data"]["workingMinutes"], 480);
    assert_eq!(body["data"]["breakMinutes"], 0);
    assert_eq!(body["data"]["overtimeMinutes"], 0);
}

#[tokio::test]
async fn breaks_are_subtracted_and_overtime_counted() {
    let app = build_app().await;
    let fixture = register_org(&app, "Long Day").await;
    enable_offline(&app, &fixture).await;
    let (token, _) = onboard_employee(&app, &fixture).await;

    let (status, _) = mark_offline(&app, &token, "check-in", "2024-03-11T08:00:00Z").await;
    assert_eq!(status, 201);
    let (status, _) = mark_offline(&app, &token, "break-start", "2024-03-11T12:00:00Z").await;
    assert_eq!(status, 201);
    let (status, _) = mark_offline(&app, &token, "break-end", "2024-03-11T14:00:00Z").await;
    assert_eq!(status, 201);

    // 12h elapsed, 2h break: 10h working, 2h beyond the 8h standard day.
    let (status, body) = mark_offline(&app, &token, "check-out", "2024-03-11T20:00:00Z").await;
    assert_eq!(status, 200);

    assert_eq!(body["data"]["workingMinutes"], 600);
    assert_eq!(body["data"]["breakMinutes"], 120);
    assert_eq!(body["data"]["overtimeMinutes"], 120);
}

#[tokio::test]
async fn break_transitions_are_validated() {
    let app = build_app().await;
    let fixture = register_org(&app, "Break Rules").await;
    enable_offline(&app, &fixture).await;
    let (token, _) = onboard_employee(&app, &fixture).await;

    // Break without an open check-in.
    let (status, _) = mark_offline(&app, &token, "break-start", "2024-03-11T09:00:00Z").await;
    assert_eq!(status, 400);

    let (status, _) = mark_offline(&app, &token, "check-in", "2024-03-11T09:00:00Z").await;
    assert_eq!(status, 201);

    // Break-end without a break-start.
    let (status, _) = mark_offline(&app, &token, "break-end", "2024-03-11T10:00:00Z").await;
    assert_eq!(status, 400);

    let (status, _) = mark_offline(&app, &token, "break-start", "2024-03-11T10:00:00Z").await;
    assert_eq!(status, 201);

    // Nested break-start.
    let (status, _) = mark_offline(&app, &token, "break-start", "2024-03-11T11:00:00Z").await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn offline_marking_requires_the_org_setting() {
    let app = build_app().await;
    let fixture = register_org(&app, "Online Only").await;
    let (token, _) = onboard_employee(&app, &fixture).await;

    let (status, body) = mark_offline(&app, &token, "check-in", "2024-03-11T09:00:00Z").await;
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("Offline"));
}

#[tokio::test]
async fn new_session_can_open_after_check_out() {
    let app = build_app().await;
    let fixture = register_org(&app, "Split Shift").await;
    enable_offline(&app, &fixture).await;
    let (token, _) = onboard_employee(&app, &fixture).await;

    let (status, _) = mark_offline(&app, &token, "check-in", "2024-03-11T09:00:00Z").await;
    assert_eq!(status, 201);
    let (status, _) = mark_offline(&app, &token, "check-out", "2024-03-11T12:00:00Z").await;
    assert_eq!(status, 200);
    let (status, _) = mark_offline(&app, &token, "check-in", "2024-03-11T14:00:00Z").await;
    assert_eq!(status, 201);

    let (status, body) = send(
        &app,
        with_auth(
            with_query(
                request(HttpMethod::Get, "/attendance/by-date"),
                "date",
                "2024-03-11",
            ),
            &token,
        ),
    )
    .await;
    assert_eq!(status, 200);
    let records = body["data"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert!(records[0]["checkOutTime"].is_string());
    assert!(records[1]["checkOutTime"].is_null());
}

#[tokio::test]
async fn today_summary_reflects_open_session() {
    let app = build_app().await;
    let fixture = register_org(&app, "Summary Co").await;
    let (token, _) = onboard_employee(&app, &fixture).await;

    let (status, body) = send(
        &app,
        with_auth(request(HttpMethod::Get, "/attendance/today-summary"), &token),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["checkedIn"], false);

    let (status, _) = send(
        &app,
        with_auth(
            json_request(
                HttpMethod::Post,
                "/attendance/mark",
                &json!({ "eventType": "check-in" }),
            ),
            &token,
        ),
    )
    .await;
    assert_eq!(status, 201);

    let (status, body) = send(
        &app,
        with_auth(request(HttpMethod::Get, "/attendance/today-summary"), &token),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["checkedIn"], true);
    assert_eq!(body["data"]["onBreak"], false);
}

#[tokio::test]
async fn my_history_paginates_records() {
    let app = build_app().await;
    let fixture = register_org(&app, "History Co").await;
    enable_offline(&app, &fixture).await;
    let (token, _) = onboard_employee(&app, &fixture).await;

    for day in 11..14 {
        let (status, _) = mark_offline(
            &app,
            &token,
            "check-in",
            &format!("2024-03-{:02}T09:00:00Z", day),
        )
        .await;
        assert_eq!(status, 201);
        let (status, _) = mark_offline(
            &app,
            &token,
            "check-out",
            &format!("2024-03-{:02}T17:00:00Z", day),
        )
        .await;
        assert_eq!(status, 200);
    }

    let mut req = request(HttpMethod::Get, "/attendance/my-history");
    for (key, value) in [
        ("from", "2024-03-01"),
        ("to", "2024-03-31"),
        ("limit", "2"),
        ("offset", "0"),
    ] {
        req = with_query(req, key, value);
    }
    let (status, body) = send(&app, with_auth(req, &token)).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["records"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn admin_can_reject_a_record_with_a_reason() {
    let app = build_app().await;
    let fixture = register_org(&app, "Review Co").await;
    enable_offline(&app, &fixture).await;
    let (token, _) = onboard_employee(&app, &fixture).await;

    let (status, body) = mark_offline(&app, &token, "check-in", "2024-03-11T09:00:00Z").await;
    assert_eq!(status, 201);
    let record_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        with_auth(
            json_request(
                HttpMethod::Put,
                &format!("/attendance/{}", record_id),
                &json!({ "status": "rejected", "rejectionReason": "No badge scan on file" }),
            ),
            &fixture.admin_token,
        ),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"], "rejected");
    assert_eq!(body["data"]["rejectionReason"], "No badge scan on file");
    assert!(body["data"]["modifiedBy"].is_string());
}

#[tokio::test]
async fn admins_cannot_touch_other_tenants_records() {
    let app = build_app().await;
    let org_a = register_org(&app, "Tenant A").await;
    let org_b = register_org(&app, "Tenant B").await;
    enable_offline(&app, &org_b).await;
    let (token_b, _) = onboard_employee(&app, &org_b).await;

    let (status, body) = mark_offline(&app, &token_b, "check-in", "2024-03-11T09:00:00Z").await;
    assert_eq!(status, 201);
    let record_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        with_auth(
            json_request(
                HttpMethod::Put,
                &format!("/attendance/{}", record_id),
                &json!({ "notes": "not yours" }),
            ),
            &org_a.admin_token,
        ),
    )
    .await;
    assert_eq!(status, 403);

    let (status, _) = send(
        &app,
        with_auth(
            request(HttpMethod::Delete, &format!("/attendance/{}", record_id)),
            &org_a.admin_token,
        ),
    )
    .await;
    assert_eq!(status, 403);
}

#[tokio::test]
async fn employees_cannot_administer_records() {
    let app = build_app().await;
    let fixture = register_org(&app, "No Priv").await;
    enable_offline(&app, &fixture).await;
    let (token, _) = onboard_employee(&app, &fixture).await;

    let (status, body) = mark_offline(&app, &token, "check-in", "2024-03-11T09:00:00Z").await;
    assert_eq!(status, 201);
    let record_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        with_auth(
            json_request(
                HttpMethod::Put,
                &format!("/attendance/{}", record_id),
                &json!({ "status": "approved" }),
            ),
            &token,
        ),
    )
    .await;
    assert_eq!(status, 403);
}
