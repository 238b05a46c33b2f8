mod common;

use axum::http::{Method, StatusCode};
use common::{days_ago, today, TestApp};
use serde_json::json;

#[tokio::test]
async fn health_reports_database_up() {
    let app = TestApp::new().await;

    let (status, body) = app.request(Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "up");
    assert_eq!(body["database"]["status"], "up");
}

#[tokio::test]
async fn seed_then_list_tanks() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/tanks/seed",
            Some(json!({ "serials": ["T2", "T1"] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["created"], 2);

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/tanks/seed",
            Some(json!({ "serials": ["T1"] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], 0);

    let (status, body) = app.request(Method::GET, "/api/v1/tanks", None).await;
    assert_eq!(status, StatusCode::OK);
    let tanks = body.as_array().expect("array");
    assert_eq!(tanks.len(), 2);
    assert_eq!(tanks[0]["serial"], "T1");
    assert_eq!(tanks[0]["status"], "in");
    assert!(tanks[0]["last_movement_date"].is_null());
}

#[tokio::test]
async fn empty_seed_request_is_rejected() {
    let app = TestApp::new().await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/tanks/seed",
            Some(json!({ "serials": [] })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn record_movement_maps_outcomes_to_statuses() {
    let app = TestApp::new().await;
    app.seed(&["T1"]).await;

    let dispatch = json!({
        "serial": "T1",
        "movement_type": "dispatch",
        "movement_date": today(),
        "project": "Atlas",
        "responsible_engineer": "Jane",
        "responsible_contractor": "ACME",
        "smt_number": "00001"
    });

    let (status, body) = app
        .request(Method::POST, "/api/v1/movements", Some(dispatch.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["movement_type"], "dispatch");
    assert_eq!(body["serial"], "T1");

    let (status, body) = app
        .request(Method::POST, "/api/v1/movements", Some(dispatch))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Conflict");

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/movements",
            Some(json!({
                "serial": "T1",
                "movement_type": "receipt",
                "smt_number": "123"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/movements",
            Some(json!({
                "serial": "T1",
                "movement_type": "transfer",
                "smt_number": "00002"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/movements",
            Some(json!({
                "serial": "T9",
                "movement_type": "receipt",
                "smt_number": "00002"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().unwrap_or_default().contains("T9"));

    let (status, body) = app
        .request(Method::GET, "/api/v1/tanks/T1", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "out");
}

#[tokio::test]
async fn unknown_tank_lookup_is_404() {
    let app = TestApp::new().await;

    let (status, body) = app.request(Method::GET, "/api/v1/tanks/NOPE", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not Found");
}

#[tokio::test]
async fn movements_can_be_filtered_by_serial() {
    let app = TestApp::new().await;
    app.seed(&["T1", "T2"]).await;
    app.dispatch("T1", days_ago(2), "Jane", "00001").await;
    app.dispatch("T2", days_ago(1), "Bob", "00002").await;

    let (status, body) = app
        .request(Method::GET, "/api/v1/movements?serial=T2", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().expect("array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["responsible_engineer"], "Bob");

    let (_, body) = app.request(Method::GET, "/api/v1/movements", None).await;
    assert_eq!(body.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn report_endpoints() {
    let app = TestApp::new().await;
    app.seed(&["T1", "T2", "T3"]).await;
    app.dispatch("T1", days_ago(3), "Jane", "00001").await;
    app.dispatch("T2", days_ago(2), "Jane", "00002").await;
    app.dispatch("T3", days_ago(1), "Bob", "00003").await;

    let (status, body) = app
        .request(Method::GET, "/api/v1/reports/out-by-engineer", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            { "responsible_engineer": "Jane", "count": 2 },
            { "responsible_engineer": "Bob", "count": 1 }
        ])
    );

    let (status, body) = app
        .request(Method::GET, "/api/v1/reports/movement-counts", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["serial"], "T1");
    assert_eq!(body[0]["dispatches"], 1);
    assert_eq!(body[0]["total"], 1);
}

#[tokio::test]
async fn maintenance_endpoints() {
    let app = TestApp::new().await;
    app.seed(&["T1"]).await;
    app.dispatch("T1", days_ago(2), "Jane", "00001").await;
    app.force_tank_state("T1", tank_ledger::entities::TankStatus::In, None)
        .await;

    let (status, body) = app
        .request(Method::GET, "/api/v1/maintenance/drift", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["serial"], "T1");
    assert_eq!(body[0]["expected_status"], "out");

    let (status, body) = app
        .request(Method::POST, "/api/v1/maintenance/recompute", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 1);

    let (_, body) = app
        .request(Method::POST, "/api/v1/maintenance/recompute", None)
        .await;
    assert_eq!(body["updated"], 0);
}
