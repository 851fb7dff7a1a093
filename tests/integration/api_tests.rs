//! API integration tests
//!
//! Run against a live server started with `ADMIN_EMAIL=admin@example.org`.

use chrono::{Duration, Utc};
use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api";
const ADMIN_EMAIL: &str = "admin@example.org";
const PASSWORD: &str = "correct-horse-battery";

fn unique_email(prefix: &str) -> String {
    format!(
        "{}-{}@example.org",
        prefix,
        Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}

/// Register (ignoring "already exists") then log in
async fn login_as(client: &Client, email: &str) -> String {
    client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "email": email,
            "password": PASSWORD,
            "display_name": email.split('@').next().unwrap()
        }))
        .send()
        .await
        .expect("Failed to send register request");

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": PASSWORD }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

async fn create_equipment(client: &Client, admin: &str, quantity: i32) -> i64 {
    let response = client
        .post(format!("{}/equipment", BASE_URL))
        .bearer_auth(admin)
        .json(&json!({
            "name": format!("Tripod {}", Utc::now().timestamp_millis()),
            "category": "Photo",
            "description": "Aluminium tripod",
            "total_quantity": quantity
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    body["id"].as_i64().expect("No equipment id")
}

fn date_range() -> (String, String) {
    let today = Utc::now().date_naive();
    (
        (today + Duration::days(1)).to_string(),
        (today + Duration::days(3)).to_string(),
    )
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login() {
    let client = Client::new();
    let email = unique_email("login");
    login_as(&client, &email).await;

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": PASSWORD }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["user"]["role"], "USER");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": ADMIN_EMAIL, "password": "wrong-password" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_profile_from_query_token() {
    let client = Client::new();
    let token = login_as(&client, &unique_email("query")).await;

    let response = client
        .post(format!("{}/user?token={}", BASE_URL, token))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["role"], "USER");
}

#[tokio::test]
#[ignore]
async fn test_unauthorized_access() {
    let client = Client::new();

    let response = client
        .get(format!("{}/borrow", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_plain_user_cannot_review() {
    let client = Client::new();
    let token = login_as(&client, &unique_email("user")).await;

    let response = client
        .post(format!("{}/borrow/manage", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "request_id": 1, "action": "approve" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);

    let response = client
        .get(format!("{}/statistics", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_full_lifecycle() {
    let client = Client::new();
    let admin = login_as(&client, ADMIN_EMAIL).await;
    let user = login_as(&client, &unique_email("borrower")).await;
    let equipment_id = create_equipment(&client, &admin, 2).await;
    let (start, end) = date_range();

    // File
    let response = client
        .post(format!("{}/borrow", BASE_URL))
        .bearer_auth(&user)
        .json(&json!({
            "equipment_id": equipment_id,
            "quantity": 2,
            "start_date": start,
            "end_date": end,
            "purpose": "Field shoot"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let request: Value = response.json().await.unwrap();
    let id = request["id"].as_i64().unwrap();
    assert_eq!(request["status"], "PENDING");

    // Returning a pending request is not allowed
    let response = client
        .post(format!("{}/borrow/{}/return", BASE_URL, id))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    // Approve
    let response = client
        .post(format!("{}/borrow/manage", BASE_URL))
        .bearer_auth(&admin)
        .json(&json!({ "request_id": id, "action": "approve" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let view: Value = response.json().await.unwrap();
    assert_eq!(view["status"], "APPROVED");

    let equipment: Value = client
        .get(format!("{}/equipment/{}", BASE_URL, equipment_id))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(equipment["available_quantity"], 0);
    assert_eq!(equipment["status"], "BORROWED");

    // Approving twice is a transition error
    let response = client
        .post(format!("{}/borrow/manage", BASE_URL))
        .bearer_auth(&admin)
        .json(&json!({ "request_id": id, "action": "approve" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    // Return
    let response = client
        .post(format!("{}/borrow/{}/return", BASE_URL, id))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let view: Value = response.json().await.unwrap();
    assert_eq!(view["status"], "PENDING_RETURN");

    // Confirm
    let response = client
        .post(format!("{}/borrow/{}/confirm-return", BASE_URL, id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let view: Value = response.json().await.unwrap();
    assert_eq!(view["status"], "RETURNED");
    assert_eq!(view["actions"].as_array().unwrap().len(), 0);

    let equipment: Value = client
        .get(format!("{}/equipment/{}", BASE_URL, equipment_id))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(equipment["available_quantity"], 2);
    assert_eq!(equipment["status"], "AVAILABLE");
}

#[tokio::test]
#[ignore]
async fn test_cart_submission() {
    let client = Client::new();
    let admin = login_as(&client, ADMIN_EMAIL).await;
    let user = login_as(&client, &unique_email("cart")).await;
    let first = create_equipment(&client, &admin, 3).await;
    let second = create_equipment(&client, &admin, 1).await;
    let (start, end) = date_range();

    for (equipment_id, quantity) in [(first, 5), (second, 1)] {
        let response = client
            .post(format!("{}/cart/items", BASE_URL))
            .bearer_auth(&user)
            .json(&json!({ "equipment_id": equipment_id, "quantity": quantity }))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
    }

    let cart: Value = client
        .get(format!("{}/cart", BASE_URL))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let lines = cart.as_array().unwrap();
    assert_eq!(lines.len(), 2);
    // Capped at available units
    assert_eq!(lines[0]["quantity"], 3);

    let response = client
        .post(format!("{}/cart/submit", BASE_URL))
        .bearer_auth(&user)
        .json(&json!({ "start_date": start, "end_date": end, "purpose": "Workshop" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let submission: Value = response.json().await.unwrap();
    assert_eq!(submission["created"].as_array().unwrap().len(), 2);
    assert_eq!(submission["message"], "2 borrow request(s) submitted");

    let cart: Value = client
        .get(format!("{}/cart", BASE_URL))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(cart.as_array().unwrap().is_empty());
}

#[tokio::test]
#[ignore]
async fn test_cart_submit_rejects_reversed_dates() {
    let client = Client::new();
    let user = login_as(&client, &unique_email("dates")).await;
    let (start, end) = date_range();

    let response = client
        .post(format!("{}/cart/submit", BASE_URL))
        .bearer_auth(&user)
        .json(&json!({ "start_date": end, "end_date": start }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_demoted_moderator_token_is_refused() {
    let client = Client::new();
    let admin = login_as(&client, ADMIN_EMAIL).await;
    let email = unique_email("moderator");
    let token = login_as(&client, &email).await;

    let profile: Value = client
        .post(format!("{}/user", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let user_id = profile["id"].as_i64().unwrap();

    let set_role = |role: &'static str| {
        client
            .put(format!("{}/users/{}/role", BASE_URL, user_id))
            .bearer_auth(&admin)
            .json(&json!({ "role": role }))
            .send()
    };

    assert!(set_role("MODERATOR").await.unwrap().status().is_success());
    let response = client
        .get(format!("{}/statistics", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    // Same token after demotion
    assert!(set_role("USER").await.unwrap().status().is_success());
    let response = client
        .get(format!("{}/statistics", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
}
