//! Referral endpoint tests.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]

mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let (status, json) = app.get("/health", &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "success": true }));
}

#[tokio::test]
async fn test_register_student_returns_code() {
    let app = TestApp::new();
    let (status, json) = app.post("/students", &[], json!({ "name": "  Ada Lovelace " })).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["success"], true);
    let data = &json["data"];
    assert_eq!(data["name"], "Ada Lovelace");
    assert_eq!(data["referralCount"], 0);
    assert_eq!(data["isPremiumUnlocked"], false);
    assert!(data["referredBy"].is_null());
    let code = data["referralCode"].as_str().unwrap();
    assert_eq!(code.len(), 8);
    assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
}

#[tokio::test]
async fn test_register_blank_name_rejected() {
    let app = TestApp::new();
    let (status, json) = app.post("/students", &[], json!({ "name": "   " })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["errors"][0]["field"], "name");
}

#[tokio::test]
async fn test_apply_and_read_referral_info() {
    let app = TestApp::new();
    let (referrer, code) = app.register("Rosa").await;
    let (referee, _) = app.register("Xavier").await;

    let (status, json) = app.apply(referee, &code.to_lowercase()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Referral code applied successfully");
    // The applicant is unlocked immediately.
    assert_eq!(json["data"]["isPremiumUnlocked"], true);

    let id = referrer.to_string();
    let (status, json) = app.get("/referral", &[("x-student-id", &id)]).await;
    assert_eq!(status, StatusCode::OK);
    let data = &json["data"];
    assert_eq!(data["referralCode"], code.as_str());
    assert_eq!(data["referralCount"], 1);
    assert_eq!(data["isPremiumUnlocked"], false);
    assert_eq!(data["referrals"][0]["refereeName"], "Xavier");
    assert_eq!(data["referrals"][0]["credited"], false);
    assert!(data["referrals"][0]["joinedAt"].is_string());
}

#[tokio::test]
async fn test_third_referral_unlocks_both_students() {
    let app = TestApp::new();
    let (referrer, code) = app.register("Rosa").await;
    let id = referrer.to_string();

    for name in ["One", "Two"] {
        let (applicant, _) = app.register(name).await;
        let (status, json) = app.apply(applicant, &code).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["isPremiumUnlocked"], true);

        let (_, json) = app.get("/referral", &[("x-student-id", &id)]).await;
        assert_eq!(json["data"]["isPremiumUnlocked"], false, "after {name}");
    }

    let (third, _) = app.register("Three").await;
    let (status, json) = app.apply(third, &code).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["isPremiumUnlocked"], true);

    let (_, json) = app.get("/referral", &[("x-student-id", &id)]).await;
    assert_eq!(json["data"]["referralCount"], 3);
    assert_eq!(json["data"]["isPremiumUnlocked"], true);
    assert_eq!(json["data"]["referrals"][0]["refereeName"], "Three");
}

#[tokio::test]
async fn test_self_referral_is_bad_request() {
    let app = TestApp::new();
    let (id, code) = app.register("Solo").await;

    let (status, json) = app.apply(id, &code).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "You cannot use your own referral code");
    assert_eq!(json["code"], 3001);
}

#[tokio::test]
async fn test_second_application_is_bad_request() {
    let app = TestApp::new();
    let (_, first) = app.register("First").await;
    let (_, second) = app.register("Second").await;
    let (applicant, _) = app.register("Applicant").await;

    assert_eq!(app.apply(applicant, &first).await.0, StatusCode::OK);
    let (status, json) = app.apply(applicant, &second).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "You have already used a referral code");
}

#[tokio::test]
async fn test_unknown_code_is_not_found() {
    let app = TestApp::new();
    let (id, _) = app.register("Lost").await;

    let (status, json) = app.apply(id, "NOSUCH00").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["message"], "Invalid referral code");
}

#[tokio::test]
async fn test_blank_code_is_validation_error() {
    let app = TestApp::new();
    let (id, _) = app.register("Blank").await;

    let (status, json) = app.apply(id, "  ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["errors"][0]["field"], "code");
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let app = TestApp::new();

    let (status, json) = app.get("/referral", &[]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["success"], false);

    let (status, _) = app.get("/referral", &[("x-student-id", "abc")]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.post("/referral/apply", &[], json!({ "code": "ABCDEFGH" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_student_is_not_found() {
    let app = TestApp::new();
    let (status, json) = app.get("/referral", &[("x-student-id", "999")]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = TestApp::new();
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/referral/apply")
        .header("x-student-id", "1")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();

    let (status, json) = app.send_request(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["errors"][0]["field"], "body");
}

#[tokio::test]
async fn test_credit_referral() {
    let app = TestApp::new();
    let (referrer, code) = app.register("Rosa").await;
    let (referee, _) = app.register("Xavier").await;
    app.apply(referee, &code).await;

    let uri = format!("/referral/credit/{referee}");
    let (status, json) = app.post(&uri, &[], json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["referrerId"], referrer);
    assert_eq!(json["data"]["refereeId"], referee);
    assert_eq!(json["data"]["credited"], true);

    // Idempotent.
    let (status, json) = app.post(&uri, &[], json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["credited"], true);

    let id = referrer.to_string();
    let (_, json) = app.get("/referral", &[("x-student-id", &id)]).await;
    assert_eq!(json["data"]["referrals"][0]["credited"], true);
}

#[tokio::test]
async fn test_credit_unreferred_student_is_not_found() {
    let app = TestApp::new();
    let (id, _) = app.register("Nobody").await;

    let (status, _) = app.post(&format!("/referral/credit/{id}"), &[], json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = app.post("/referral/credit/not-a-number", &[], json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["errors"][0]["field"], "path");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = TestApp::new();
    let (status, json) = app.get("/nope", &[]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
    assert_eq!(json["code"], 3204);
}
