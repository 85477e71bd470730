mod common;

use axum::http::StatusCode;
use common::{
    MockRepository, admin_request, app, body_json, json_request, missing_relation, query_failure,
};
use game_portal::{
    audit::UNKNOWN_IP,
    error::ErrorBody,
    models::{AuditLogEntry, AuditLogResponse, OperationType},
};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

#[tokio::test]
async fn test_missing_operation_type_is_rejected_before_store() {
    let repo = Arc::new(MockRepository::default());
    let response = app(repo.clone())
        .oneshot(json_request(
            "POST",
            "/api/logs",
            json!({ "targetTable": "games" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ErrorBody = body_json(response).await;
    assert_eq!(body.code, "VALIDATION_ERROR");
    assert!(!repo.called("insert_audit_entry"));
}

#[tokio::test]
async fn test_missing_target_table_is_rejected_before_store() {
    let repo = Arc::new(MockRepository::default());
    let response = app(repo.clone())
        .oneshot(json_request(
            "POST",
            "/api/logs",
            json!({ "operationType": "create" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!repo.called("insert_audit_entry"));
}

#[tokio::test]
async fn test_malformed_body_is_a_validation_error() {
    let response = app(Arc::new(MockRepository::default()))
        .oneshot(
            axum::http::Request::builder()
                .method("POST")
                .uri("/api/logs")
                .header("content-type", "application/json")
                .body(axum::body::Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_entry_is_recorded_with_forwarded_ip() {
    let repo = Arc::new(MockRepository::default());
    let mut request = json_request(
        "POST",
        "/api/logs",
        json!({
            "operationType": "update",
            "targetTable": "games",
            "targetId": "g-42",
            "details": { "title": "Snake" }
        }),
    );
    request
        .headers_mut()
        .insert("x-forwarded-for", "198.51.100.7, 10.0.0.1".parse().unwrap());

    let response = app(repo.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: AuditLogResponse = body_json(response).await;
    assert!(body.success);
    assert!(body.log_id.is_some());

    let entries = repo.audit_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].operation_type, OperationType::Update);
    assert_eq!(entries[0].target_id.as_deref(), Some("g-42"));
    assert_eq!(entries[0].ip_address, "198.51.100.7");
    assert_eq!(entries[0].user_id, None);
}

#[tokio::test]
async fn test_unknown_ip_when_no_proxy_headers() {
    let repo = Arc::new(MockRepository::default());
    app(repo.clone())
        .oneshot(json_request(
            "POST",
            "/api/logs",
            json!({ "operationType": "other", "targetTable": "games" }),
        ))
        .await
        .unwrap();
    assert_eq!(repo.audit_entries()[0].ip_address, UNKNOWN_IP);
}

#[tokio::test]
async fn test_session_identity_replaces_nil_actor() {
    let repo = Arc::new(MockRepository::default());
    let response = app(repo.clone())
        .oneshot(admin_request(
            "POST",
            "/api/logs",
            Some(json!({
                "userId": Uuid::nil().to_string(),
                "operationType": "delete",
                "targetTable": "categories"
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(repo.audit_entries()[0].user_id, Some(Uuid::from_u128(7)));
}

#[tokio::test]
async fn test_missing_audit_table_reports_success_without_id() {
    let repo = Arc::new(MockRepository::default());
    repo.lock().audit_failure = Some(missing_relation());

    let response = app(repo)
        .oneshot(json_request(
            "POST",
            "/api/logs",
            json!({ "operationType": "create", "targetTable": "games" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = body_json(response).await;
    assert_eq!(body, json!({ "success": true, "logId": null }));
}

#[tokio::test]
async fn test_other_store_failures_are_errors() {
    let repo = Arc::new(MockRepository::default());
    repo.lock().audit_failure = Some(query_failure());

    let response = app(repo)
        .oneshot(json_request(
            "POST",
            "/api/logs",
            json!({ "operationType": "create", "targetTable": "games" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorBody = body_json(response).await;
    assert_eq!(body.code, "STORE_ERROR");
    // Store internals stay out of the response.
    assert!(!body.error.contains("permission denied"));
}

#[tokio::test]
async fn test_log_viewer_lists_entries() {
    let repo = Arc::new(MockRepository::default());
    let router = app(repo.clone());
    router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/logs",
            json!({ "operationType": "create", "targetTable": "games" }),
        ))
        .await
        .unwrap();

    let response = router
        .oneshot(admin_request("GET", "/admin/logs", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let entries: Vec<AuditLogEntry> = body_json(response).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].operation_type, "create");
}

#[tokio::test]
async fn test_log_viewer_is_empty_without_audit_table() {
    let repo = Arc::new(MockRepository::default());
    repo.lock().audit_failure = Some(missing_relation());

    let response = app(repo)
        .oneshot(admin_request("GET", "/admin/logs", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let entries: Vec<AuditLogEntry> = body_json(response).await;
    assert!(entries.is_empty());
}
