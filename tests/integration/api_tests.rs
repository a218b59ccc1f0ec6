//! API integration tests
//!
//! These run against a live server started with a seeded database:
//! `cargo run --bin seed && cargo run`, then `cargo test -- --ignored`.

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const SERVER_URL: &str = "http://localhost:5000";
const BASE_URL: &str = "http://localhost:5000/api";

/// Log in as one of the seeded users
async fn get_auth_token(client: &Client) -> String {
    let response = client
        .post(format!("{}/users/login", BASE_URL))
        .json(&json!({
            "email": "omar.ali@example.com",
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

/// A valid ISBN-13 that is unlikely to collide with earlier runs
fn fresh_isbn() -> String {
    let digits = format!("{:013}", chrono::Utc::now().timestamp_micros() % 10_000_000_000_000);
    format!("{}-{}", &digits[..3], &digits[3..])
}

async fn create_book(client: &Client, token: &str, isbn: &str) -> Value {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "title": "The Pragmatic Programmer",
            "author": "Andrew Hunt",
            "year": 1999,
            "isbn": isbn
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.expect("Failed to parse response")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", SERVER_URL))
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
    let token = get_auth_token(&client).await;
    assert!(!token.is_empty());
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/users/login", BASE_URL))
        .json(&json!({
            "email": "omar.ali@example.com",
            "password": "wrong-password"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid credentials.");
}

#[tokio::test]
#[ignore]
async fn test_register_existing_email() {
    let client = Client::new();

    let response = client
        .post(format!("{}/users/register", BASE_URL))
        .json(&json!({
            "name": "Omar Ali",
            "email": "omar.ali@example.com",
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "Email is already in use.");
}

#[tokio::test]
#[ignore]
async fn test_profile() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .get(format!("{}/users/profile", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["email"], "omar.ali@example.com");
    assert!(body["data"].get("password").is_none());
}

#[tokio::test]
#[ignore]
async fn test_list_books_paginated() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books?page=1&limit=2", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], true);
    assert_eq!(body["currentPage"], 1);
    assert!(body["data"].as_array().unwrap().len() <= 2);
    assert!(body.get("previous").is_none());
}

#[tokio::test]
#[ignore]
async fn test_list_books_past_the_end() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books?page=1000&limit=10", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"], json!([]));
    assert!(body.get("next").is_none());
    assert_eq!(body["previous"], json!({ "page": 999, "limit": 10 }));
}

#[tokio::test]
#[ignore]
async fn test_book_lifecycle() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let isbn = fresh_isbn();

    let created = create_book(&client, &token, &isbn).await;
    let id = created["data"]["id"].as_str().expect("No book id").to_string();

    let response = client
        .put(format!("{}/books/{}", BASE_URL, id))
        .bearer_auth(&token)
        .json(&json!({ "title": "The Pragmatic Programmer, 2nd Edition" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["isbn"], isbn.as_str());

    let response = client
        .delete(format!("{}/books/{}", BASE_URL, id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client
        .get(format!("{}/books/{}", BASE_URL, id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_isbn() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "title": "Atomic Habits",
            "author": "James Clear",
            "year": 2018,
            "isbn": "978-0-525-57499-3"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "ISBN must be unique.");
}

#[tokio::test]
#[ignore]
async fn test_malformed_id() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books/not-an-id", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["message"], "Resource not found with id: not-an-id");
}

#[tokio::test]
#[ignore]
async fn test_loans_require_token() {
    let client = Client::new();

    let response = client
        .get(format!("{}/loans", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_loans_expand_references() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .get(format!("{}/loans", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    let loans = body["data"].as_array().expect("No loan list");
    assert!(!loans.is_empty());
    assert!(loans[0]["user"]["name"].is_string());
    assert!(loans[0]["book"]["title"].is_string());
}

#[tokio::test]
#[ignore]
async fn test_loan_for_unknown_book() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "book": uuid::Uuid::new_v4(),
            "user": uuid::Uuid::new_v4(),
            "returnDate": "2030-01-01"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
