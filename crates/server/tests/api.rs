use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::Engine as _;
use http_body_util::BodyExt;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use tower::ServiceExt;

use migration::MigratorTrait;
use server::types::dispute::{DisputeResponse, DisputeStatus};
use server::types::transaction::{TransactionResponse, TransactionStatus};

async fn test_app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();

    seed_user(&db, "bob", "buyer").await;
    seed_user(&db, "sally", "seller").await;
    seed_user(&db, "ada", "admin").await;
    seed_product(&db, "prod-1", "sally").await;

    let engine = engine::Engine::builder()
        .database(db.clone())
        .build()
        .unwrap();
    server::app(engine, db)
}

async fn seed_user(db: &DatabaseConnection, id: &str, role: &str) {
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO users (id, email, password, first_name, last_name, role, is_active, is_verified) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        vec![
            id.into(),
            format!("{id}@example.com").into(),
            "password".into(),
            id.into(),
            "Tester".into(),
            role.into(),
            true.into(),
            true.into(),
        ],
    ))
    .await
    .unwrap();
}

async fn seed_product(db: &DatabaseConnection, id: &str, seller: &str) {
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO products (id, seller_id, title, price_cents, shipping_cents, quantity_available, is_active) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        vec![
            id.into(),
            seller.into(),
            "Vintage Camera".into(),
            10_000_i64.into(),
            1_000_i64.into(),
            5.into(),
            true.into(),
        ],
    ))
    .await
    .unwrap();
}

fn basic_auth(user: &str, password: &str) -> String {
    let encoded =
        base64::engine::general_purpose::STANDARD.encode(format!("{user}@example.com:{password}"));
    format!("Basic {encoded}")
}

fn request(method: &str, uri: &str, user: &str, password: &str, body: Option<&str>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, basic_auth(user, password))
        .header(header::CONTENT_TYPE, "application/json");
    match body {
        Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

const NEW_ORDER: &str = r#"{
    "product_id": "prod-1",
    "quantity": 2,
    "shipping_address": {
        "street": "1 Main St",
        "city": "Springfield",
        "postal_code": "12345",
        "country": "US"
    }
}"#;

#[tokio::test]
async fn purchase_flow_over_http() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(request("POST", "/transactions", "bob", "password", Some(NEW_ORDER)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: TransactionResponse = json_body(response).await;
    assert_eq!(created.transaction.total_cents, 21_500);
    assert_eq!(created.transaction.status, TransactionStatus::Pending);
    let id = created.transaction.id;

    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/transactions/{id}/status"),
            "bob",
            "password",
            Some(r#"{"status": "paid"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/transactions/{id}/tracking"),
            "sally",
            "password",
            Some(r#"{"tracking_number": "TRACK-42"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let shipped: TransactionResponse = json_body(response).await;
    assert_eq!(shipped.transaction.status, TransactionStatus::Shipped);
    assert_eq!(shipped.transaction.tracking_number.as_deref(), Some("TRACK-42"));

    // The buyer can read it back; the uninvolved admin can too.
    for user in ["bob", "ada"] {
        let response = app
            .clone()
            .oneshot(request(
                "GET",
                &format!("/transactions/{id}"),
                user,
                "password",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn invalid_transition_is_a_client_error() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(request("POST", "/transactions", "bob", "password", Some(NEW_ORDER)))
        .await
        .unwrap();
    let created: TransactionResponse = json_body(response).await;
    let id = created.transaction.id;

    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/transactions/{id}/status"),
            "bob",
            "password",
            Some(r#"{"status": "delivered"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_transaction_is_not_found() {
    let app = test_app().await;

    let response = app
        .oneshot(request(
            "GET",
            "/transactions/00000000-0000-0000-0000-000000000000",
            "bob",
            "password",
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dispute_review_starts_with_an_empty_assign_body() {
    let app = test_app().await;

    let response = app
        .clone()
        .oneshot(request("POST", "/transactions", "bob", "password", Some(NEW_ORDER)))
        .await
        .unwrap();
    let created: TransactionResponse = json_body(response).await;
    let tx_id = created.transaction.id;

    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/transactions/{tx_id}/status"),
            "bob",
            "password",
            Some(r#"{"status": "paid"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/transactions/{tx_id}/tracking"),
            "sally",
            "password",
            Some(r#"{"tracking_number": "TRACK-7"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let dispute_body = format!(
        r#"{{"transaction_id": "{tx_id}", "dispute_type": "product_not_received", "title": "Never arrived", "description": "Tracking shows no movement"}}"#
    );
    let response = app
        .clone()
        .oneshot(request("POST", "/disputes", "bob", "password", Some(&dispute_body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: DisputeResponse = json_body(response).await;
    let dispute_id = created.dispute.id;

    // No assignee in the body: the dispute still moves to `under_review`.
    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/disputes/{dispute_id}/assign"),
            "ada",
            "password",
            Some("{}"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let assigned: DisputeResponse = json_body(response).await;
    assert_eq!(assigned.dispute.status, DisputeStatus::UnderReview);
    assert!(assigned.dispute.assigned_reviewer_id.is_none());
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = test_app().await;

    let response = app
        .oneshot(request("GET", "/transactions", "bob", "nope", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn repeated_failures_lock_the_account() {
    let app = test_app().await;

    for _ in 0..5 {
        let response = app
            .clone()
            .oneshot(request("GET", "/transactions", "bob", "nope", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = app
        .clone()
        .oneshot(request("GET", "/transactions", "bob", "nope", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // Even the right password is locked out until the window passes.
    let response = app
        .oneshot(request("GET", "/transactions", "bob", "password", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}
