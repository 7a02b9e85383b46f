//! Reporting rollups over the attendance ledger.

mod common;

use common::*;
use punchclock::HttpMethod;

#[tokio::test]
async fn daily_report_counts_present_against_headcount() {
    let app = build_app().await;
    let fixture = register_org(&app, "Daily Report Org").await;
    enable_offline(&app, &fixture).await;
    let (token_a, _) = onboard_employee(&app, &fixture).await;
    let (_token_b, _) = onboard_employee(&app, &fixture).await;

    let (status, _) = mark_offline(&app, &token_a, "check-in", "2024-03-11T09:00:00Z").await;
    assert_eq!(status, 201);
    let (status, _) = mark_offline(&app, &token_a, "check-out", "2024-03-11T17:00:00Z").await;
    assert_eq!(status, 200);

    let (status, body) = send(
        &app,
        with_auth(
            with_query(request(HttpMethod::Get, "/reports/daily"), "date", "2024-03-11"),
            &fixture.admin_token,
        ),
    )
    .await;
    assert_eq!(status, 200);

    // One of three counted accounts (admin plus two employees) was present.
    assert_eq!(body["data"]["present"], 1);
    assert_eq!(body["data"]["headcount"], 3);
    assert_eq!(body["data"]["absent"], 2);
    assert_eq!(body["data"]["workingMinutes"], 480);
    let rate = body["data"]["attendanceRate"].as_f64().unwrap();
    assert!((rate - 1.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn department_report_groups_members() {
    let app = build_app().await;
    let fixture = register_org(&app, "Dept Report Org").await;
    enable_offline(&app, &fixture).await;
    let (token, _) = onboard_employee(&app, &fixture).await;

    let (status, _) = mark_offline(&app, &token, "check-in", "2024-03-11T09:00:00Z").await;
    assert_eq!(status, 201);

    let (status, body) = send(
        &app,
        with_auth(
            with_query(
                request(HttpMethod::Get, "/reports/by-department"),
                "date",
                "2024-03-11",
            ),
            &fixture.admin_token,
        ),
    )
    .await;
    assert_eq!(status, 200);

    // Neither account set a department, so everything rolls up together.
    let departments = body["data"].as_array().unwrap();
    assert_eq!(departments.len(), 1);
    assert_eq!(departments[0]["department"], "unassigned");
    assert_eq!(departments[0]["present"], 1);
    assert_eq!(departments[0]["headcount"], 2);
}

#[tokio::test]
async fn range_report_emits_one_row_per_day() {
    let app = build_app().await;
    let fixture = register_org(&app, "Range Report Org").await;
    enable_offline(&app, &fixture).await;
    let (token, _) = onboard_employee(&app, &fixture).await;

    for day in ["2024-03-11", "2024-03-12"] {
        let (status, _) =
            mark_offline(&app, &token, "check-in", &format!("{}T09:00:00Z", day)).await;
        assert_eq!(status, 201);
        let (status, _) =
            mark_offline(&app, &token, "check-out", &format!("{}T17:00:00Z", day)).await;
        assert_eq!(status, 200);
    }

    let mut req = request(HttpMethod::Get, "/reports/range");
    req = with_query(req, "from", "2024-03-11");
    req = with_query(req, "to", "2024-03-13");
    let (status, body) = send(&app, with_auth(req, &fixture.admin_token)).await;
    assert_eq!(status, 200);

    let days = body["data"]["days"].as_array().unwrap();
    assert_eq!(days.len(), 3);
    assert_eq!(days[0]["present"], 1);
    assert_eq!(days[2]["present"], 0);
    assert_eq!(body["data"]["totalWorkingMinutes"], 960);
}

#[tokio::test]
async fn range_report_validates_the_window() {
    let app = build_app().await;
    let fixture = register_org(&app, "Strict Range Org").await;

    let mut req = request(HttpMethod::Get, "/reports/range");
    req = with_query(req, "from", "2024-03-13");
    req = with_query(req, "to", "2024-03-11");
    let (status, _) = send(&app, with_auth(req, &fixture.admin_token)).await;
    assert_eq!(status, 400);

    let mut req = request(HttpMethod::Get, "/reports/range");
    req = with_query(req, "from", "2024-01-01");
    req = with_query(req, "to", "2024-12-31");
    let (status, _) = send(&app, with_auth(req, &fixture.admin_token)).await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn reports_are_admin_only() {
    let app = build_app().await;
    let fixture = register_org(&app, "Private Report Org").await;
    let (token, _) = onboard_employee(&app, &fixture).await;

    let (status, _) = send(
        &app,
        with_auth(request(HttpMethod::Get, "/reports/daily"), &token),
    )
    .await;
    assert_eq!(status, 403);
}

#[tokio::test]
async fn super_admin_reports_need_an_organization_id() {
    let app = build_app().await;
    let root_token = create_super_admin(&app).await;
    let fixture = register_org(&app, "Observed Org").await;

    let (status, _) = send(
        &app,
        with_auth(request(HttpMethod::Get, "/reports/daily"), &root_token),
    )
    .await;
    assert_eq!(status, 400);

    let (status, body) = send(
        &app,
        with_auth(
            with_query(
                request(HttpMethod::Get, "/reports/daily"),
                "organizationId",
                &fixture.org_id,
            ),
            &root_token,
        ),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["headcount"], 1);
}
