mod common;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::Value;
use shop_orders_api::{models::Role, routes::build_app};
use tower::ServiceExt;

use common::{bearer, lazy_state};

fn app() -> Router {
    build_app(lazy_state())
}

async fn send(
    method: Method,
    uri: &str,
    auth: Option<&str>,
    body: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn health_reports_ok() {
    let (status, body) = send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    assert!(body["data"]["database"].is_string());
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let (status, body) = send(Method::GET, "/api/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["data"]["path"], "/api/nope");
}

#[tokio::test]
async fn order_creation_requires_identity() {
    let cart = r#"{"cartItems":[{"productId":1,"quantity":1}]}"#;

    let (status, _) = send(Method::POST, "/api/orders/create", None, Some(cart)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        Method::POST,
        "/api/orders/create",
        Some("Basic dXNlcjpwYXNz"),
        Some(cart),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        Method::POST,
        "/api/orders/create",
        Some("Bearer not.a.token"),
        Some(cart),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].as_str().unwrap().contains("Invalid or expired token"));
}

#[tokio::test]
async fn my_orders_requires_identity() {
    let (status, _) = send(Method::GET, "/api/orders/myorders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_reject_plain_users() {
    let user = bearer(5, Role::User);

    let (status, _) = send(Method::GET, "/api/orders", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        Method::PUT,
        "/api/orders/1",
        Some(&user),
        Some(r#"{"status":"entregado"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        Method::POST,
        "/api/products",
        Some(&user),
        Some(r#"{"name":"Mug","price":1,"stock":1}"#),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(Method::DELETE, "/api/products/1", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_routes_without_token_are_unauthorized() {
    let (status, _) = send(Method::DELETE, "/api/products/1", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(Method::GET, "/api/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_carts_are_rejected_before_touching_the_store() {
    let user = bearer(5, Role::User);
    let cases = [
        r#"{"cartItems":[]}"#,
        r#"{"cartItems":[{"productId":1,"quantity":0}]}"#,
        r#"{"cartItems":[{"productId":1,"quantity":-3}]}"#,
        r#"{"cartItems":[{"quantity":2}]}"#,
        r#"{"cartItems":[{"productId":1,"quantity":"two"}]}"#,
        r#"{"cartItems":"nope"}"#,
        r#"{}"#,
        r#"{"cartItems":["#,
    ];

    for body in cases {
        let (status, json) = send(Method::POST, "/api/orders/create", Some(&user), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body} gave {json}");
        assert!(json["data"]["error"].is_string());
    }
}

#[tokio::test]
async fn unknown_status_is_rejected_before_touching_the_store() {
    let admin = bearer(1, Role::Admin);
    let (status, body) = send(
        Method::PUT,
        "/api/orders/1",
        Some(&admin),
        Some(r#"{"status":"shipped"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("shipped"));
}

#[tokio::test]
async fn invalid_product_payload_is_bad_request() {
    let admin = bearer(1, Role::Admin);
    let (status, _) = send(
        Method::POST,
        "/api/products",
        Some(&admin),
        Some(r#"{"name":"Mug","price":-1,"stock":1}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        Method::PUT,
        "/api/products/1",
        Some(&admin),
        Some(r#"{"stock":-5}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn registration_payload_is_validated() {
    let (status, _) = send(
        Method::POST,
        "/api/auth/register",
        None,
        Some(r#"{"username":"ana","email":"not-an-email","password":"secret1"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        Method::POST,
        "/api/auth/register",
        None,
        Some(r#"{"username":"ana","email":"ana@example.com","password":"123"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_path_and_query_use_the_error_envelope() {
    let admin = bearer(1, Role::Admin);

    let (status, body) = send(
        Method::PUT,
        "/api/orders/abc",
        Some(&admin),
        Some(r#"{"status":"entregado"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["data"]["error"].is_string(), "got {body}");

    let (status, body) = send(Method::GET, "/api/products/abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["data"]["error"].is_string(), "got {body}");

    let (status, body) = send(Method::DELETE, "/api/products/1.5", Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["data"]["error"].is_string(), "got {body}");

    let (status, body) = send(
        Method::GET,
        "/api/products?category=a&category=b",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["data"]["error"].is_string(), "got {body}");
}

#[tokio::test]
async fn out_of_range_prices_are_bad_requests() {
    let admin = bearer(1, Role::Admin);

    for body in [
        r#"{"name":"Yacht","price":100000000000,"stock":1}"#,
        r#"{"name":"Yacht","price":10000000000,"stock":1}"#,
        r#"{"name":"Gum","price":10.005,"stock":1}"#,
    ] {
        let (status, json) = send(Method::POST, "/api/products", Some(&admin), Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body} gave {json}");
    }

    let (status, _) = send(
        Method::PUT,
        "/api/products/1",
        Some(&admin),
        Some(r#"{"price":0.001}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
