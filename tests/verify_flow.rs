//! National-ID verification: OTP round trip, uniqueness, and unlink.

mod common;

use serde_json::json;

use common::*;
use punchclock::HttpMethod;

async fn send_otp(
    app: &punchclock::App<punchclock::MemoryStore>,
    token: &str,
    national_id: &str,
) -> (u16, serde_json::Value) {
    send(
        app,
        with_auth(
            json_request(
                HttpMethod::Post,
                "/verify/send-otp",
                &json!({ "nationalId": national_id }),
            ),
            token,
        ),
    )
    .await
}

async fn confirm_otp(
    app: &punchclock::App<punchclock::MemoryStore>,
    token: &str,
    otp: &str,
) -> (u16, serde_json::Value) {
    send(
        app,
        with_auth(
            json_request(HttpMethod::Post, "/verify/confirm-otp", &json!({ "otp": otp })),
            token,
        ),
    )
    .await
}

#[tokio::test]
async fn otp_round_trip_links_the_national_id() {
    let app = build_app().await;
    let fixture = register_org(&app, "Verified Org").await;
    let (token, _) = onboard_employee(&app, &fixture).await;

    let (status, body) = send_otp(&app, &token, "1234567890").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["maskedPhone"], "*******890");

    // A wrong code does not burn the pending session.
    let (status, _) = confirm_otp(&app, &token, "000000").await;
    assert_eq!(status, 400);

    let (status, body) = confirm_otp(&app, &token, "123456").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["nationalIdVerified"], true);
    assert_eq!(body["data"]["nationalId"], "1234567890");

    let (status, body) = send(
        &app,
        with_auth(request(HttpMethod::Get, "/verify/status"), &token),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["verified"], true);
    assert_eq!(body["data"]["pendingOtp"], false);
}

#[tokio::test]
async fn confirm_without_a_pending_session_fails() {
    let app = build_app().await;
    let fixture = register_org(&app, "No Session Org").await;
    let (token, _) = onboard_employee(&app, &fixture).await;

    let (status, body) = confirm_otp(&app, &token, "123456").await;
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("No pending"));
}

#[tokio::test]
async fn a_national_id_links_to_one_account_only() {
    let app = build_app().await;
    let fixture = register_org(&app, "Unique Id Org").await;
    let (token_a, _) = onboard_employee(&app, &fixture).await;
    let (token_b, _) = onboard_employee(&app, &fixture).await;

    let (status, _) = send_otp(&app, &token_a, "555000111").await;
    assert_eq!(status, 200);
    let (status, _) = confirm_otp(&app, &token_a, "123456").await;
    assert_eq!(status, 200);

    let (status, body) = send_otp(&app, &token_b, "555000111").await;
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("another account"));
}

#[tokio::test]
async fn verified_accounts_cannot_start_another_verification() {
    let app = build_app().await;
    let fixture = register_org(&app, "Once Org").await;
    let (token, _) = onboard_employee(&app, &fixture).await;

    let (status, _) = send_otp(&app, &token, "777000333").await;
    assert_eq!(status, 200);
    let (status, _) = confirm_otp(&app, &token, "123456").await;
    assert_eq!(status, 200);

    let (status, body) = send_otp(&app, &token, "777000444").await;
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("already linked"));
}

#[tokio::test]
async fn unlink_clears_the_verification() {
    let app = build_app().await;
    let fixture = register_org(&app, "Unlink Org").await;
    let (token, _) = onboard_employee(&app, &fixture).await;

    let (status, _) = send_otp(&app, &token, "999000888").await;
    assert_eq!(status, 200);
    let (status, _) = confirm_otp(&app, &token, "123456").await;
    assert_eq!(status, 200);

    let (status, _) = send(
        &app,
        with_auth(request(HttpMethod::Delete, "/verify/unlink"), &token),
    )
    .await;
    assert_eq!(status, 200);

    let (status, body) = send(
        &app,
        with_auth(request(HttpMethod::Get, "/verify/status"), &token),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["verified"], false);

    // Unlinking twice is a 404.
    let (status, _) = send(
        &app,
        with_auth(request(HttpMethod::Delete, "/verify/unlink"), &token),
    )
    .await;
    assert_eq!(status, 404);

    // The freed id can be claimed again.
    let (status, _) = send_otp(&app, &token, "999000888").await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn missing_verifier_is_a_server_error() {
    let mut config = test_config();
    config.id_verifier = None;
    let app = build_app_with(config).await;
    let fixture = register_org(&app, "No Verifier Org").await;
    let (token, _) = onboard_employee(&app, &fixture).await;

    let (status, body) = send_otp(&app, &token, "123123123").await;
    assert_eq!(status, 500);
    // Internal detail stays hidden behind the generic message.
    assert_eq!(body["message"], "Internal server error");
}
