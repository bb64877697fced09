use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use verkstad::api_router::configure_routes;
use verkstad::shared::test_utils::{state_with_mocks, test_config};
use verkstad::tickets::store::TicketStore;

const API_KEY: &str = "test-key";

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("response is JSON")
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-api-key", API_KEY)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

#[tokio::test]
async fn test_health_is_public() {
    let (state, _, _, _, _) = state_with_mocks(test_config());
    let app = configure_routes(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await, json!({ "ok": true }));
}

#[tokio::test]
async fn test_staff_routes_require_api_key() {
    let (state, _, _, _, _) = state_with_mocks(test_config());
    let app = configure_routes(state);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/tickets")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/tickets")
                .header("x-api-key", "wrong")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/tickets")
                .header(header::AUTHORIZATION, format!("Bearer {API_KEY}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_full_lifecycle_over_http() {
    let (state, _, _messages, sms, email) = state_with_mocks(test_config());
    let app = configure_routes(state);

    // Register the case.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/tickets",
            json!({
                "customer_name": "Anna Svensson",
                "customer_phone": "070-123 45 67",
                "customer_email": "anna@example.test",
                "device_type": "Mobiltelefon",
                "device_model": "iPhone 13",
                "issue_description": "Skärmen är sprucken"
            }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let ticket = read_json(response).await;
    let id = ticket["id"].as_str().expect("ticket id").to_string();
    assert_eq!(ticket["status"], "Nytt");
    assert_eq!(ticket["phone_normalized"], "0701234567");

    // Staff records a diagnosis and a price.
    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/tickets/{id}"),
            json!({ "diagnosis": "Trasig skärm, byte krävs", "final_cost": "1500" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    // Cost proposal goes out by SMS.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/tickets/{id}/notify"),
            json!({ "kind": "cost_proposal", "channel": "sms" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let notify = read_json(response).await;
    assert_eq!(notify["status"], "Väntar på kund");
    assert_eq!(sms.sent(), 1);
    assert!(sms
        .last_body()
        .expect("sms body")
        .contains("Trasig skärm, byte krävs"));

    // The customer answers yes from their registered number.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/webhooks/sms")
                .header(
                    header::CONTENT_TYPE,
                    "application/x-www-form-urlencoded",
                )
                .body(Body::from("from=070-123%2045%2067&message=JA"))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await, json!({ "ok": true }));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/tickets/{id}"))
                .header("x-api-key", API_KEY)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    let ticket = read_json(response).await;
    assert_eq!(ticket["status"], "Kostnadsförslag godkänt");
    assert_eq!(ticket["cost_proposal_approved"], true);
    assert_eq!(ticket["work_done_summary"], "Trasig skärm, byte krävs");
    assert_eq!(ticket["diagnosis"], Value::Null);

    // Repair done: notify by email, then close at pickup.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/tickets/{id}/notify"),
            json!({ "kind": "repair_ready", "channel": "email" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(email.sent(), 1);

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/tickets/{id}/finalize"),
            json!({}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let ticket = read_json(response).await;
    assert_eq!(ticket["status"], "Avslutad");
    assert!(ticket["picked_up_at"].is_string());
    assert!(ticket["closed_at"].is_string());

    // Two outbound notifications plus one inbound reply in the audit trail.
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/tickets/{id}/messages"))
                .header("x-api-key", API_KEY)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let log = read_json(response).await;
    assert_eq!(log.as_array().expect("message list").len(), 3);
}

#[tokio::test]
async fn test_webhook_secret_is_enforced() {
    let mut config = test_config();
    config.webhook_secret = Some("hemlig".to_string());
    let (state, _, messages, _, _) = state_with_mocks(config);
    let app = configure_routes(state);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/webhooks/sms?secret=fel")
                .header(
                    header::CONTENT_TYPE,
                    "application/x-www-form-urlencoded",
                )
                .body(Body::from("from=0701234567&message=JA"))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(messages.entries().is_empty());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/webhooks/sms?secret=hemlig")
                .header(
                    header::CONTENT_TYPE,
                    "application/x-www-form-urlencoded",
                )
                .body(Body::from("sender=0701234567&text=hej"))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(messages.entries().len(), 1);
    assert_eq!(messages.entries()[0].ticket_id, None);
}

#[tokio::test]
async fn test_finalize_without_cost_is_rejected_without_mutation() {
    let (state, tickets, _, _, _) = state_with_mocks(test_config());
    let app = configure_routes(state);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/tickets",
            json!({
                "customer_name": "Anna Svensson",
                "customer_phone": "0701234567",
                "device_type": "Laptop",
                "issue_description": "Startar inte",
                "status": "Färdig"
            }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let ticket = read_json(response).await;
    let id = ticket["id"].as_str().expect("ticket id").to_string();

    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/api/tickets/{id}/finalize"),
            json!({}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let after = tickets
        .get(id.parse().expect("uuid"))
        .await
        .expect("store read")
        .expect("ticket");
    assert_eq!(after.status, "Färdig");
    assert_eq!(after.closed_at, None);
}

#[tokio::test]
async fn test_create_ticket_requires_mandatory_fields() {
    let (state, _, _, _, _) = state_with_mocks(test_config());
    let app = configure_routes(state);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/tickets",
            json!({ "customer_name": "Anna Svensson" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
