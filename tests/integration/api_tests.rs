//! API integration tests

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use book_library::{api, repository::Repository, services::Services, AppConfig, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn app() -> Router {
    let repository = Repository::in_memory()
        .await
        .expect("Failed to open in-memory database");
    api::create_router(AppState {
        config: Arc::new(AppConfig::default()),
        services: Arc::new(Services::new(repository)),
    })
}

/// Send a request and return the status with the parsed JSON body (Null when empty)
async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("Failed to build request");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to send request");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Failed to parse response")
    };
    (status, body)
}

#[tokio::test]
async fn test_health_check() {
    let app = app().await;

    let (status, body) = send(&app, "GET", "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, "GET", "/api/v1/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_create_get_update_delete_book() {
    let app = app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/books",
        Some(json!({
            "name": "1984",
            "author": "George Orwell",
            "year_published": 1949,
            "book_type": "Fiction"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "available");
    let id = body["id"].as_i64().expect("No book ID");

    let (status, body) = send(&app, "GET", &format!("/api/v1/books/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "1984");
    assert_eq!(body["year_published"], 1949);

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/v1/books/{}", id),
        Some(json!({ "status": "checked out" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "checked out");
    assert_eq!(body["author"], "George Orwell");

    let (status, body) = send(&app, "GET", "/api/v1/books?name=1984", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["books"][0]["status"], "checked out");

    let (status, _) = send(&app, "DELETE", &format!("/api/v1/books/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "GET", &format!("/api/v1/books/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchBook");
}

#[tokio::test]
async fn test_list_books() {
    let app = app().await;

    for name in ["Dune", "Emma"] {
        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/books",
            Some(json!({
                "name": name,
                "author": "Test Name",
                "year_published": 2000,
                "book_type": "Fiction"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(&app, "GET", "/api/v1/books", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["books"][0]["name"], "Dune");
    assert_eq!(body["books"][1]["name"], "Emma");

    let (_, body) = send(&app, "GET", "/api/v1/books?name=Missing", None).await;
    assert_eq!(body["total"], 0);
    assert!(body["books"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_duplicate_name_is_rejected() {
    let app = app().await;
    let book = json!({
        "name": "Name",
        "author": "Test Name",
        "year_published": 2000,
        "book_type": "Fiction"
    });

    let (status, _) = send(&app, "POST", "/api/v1/books", Some(book.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "POST", "/api/v1/books", Some(book)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
    assert_eq!(body["violations"][0]["field"], "name");
    assert_eq!(body["violations"][0]["kind"], "unique");
}

#[tokio::test]
async fn test_create_with_text_year_is_rejected() {
    let app = app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/books",
        Some(json!({
            "name": "Test",
            "author": "Test Name",
            "year_published": "text",
            "book_type": "Fiction"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["violations"][0]["field"], "year_published");
    assert_eq!(body["violations"][0]["kind"], "type");

    let (_, body) = send(&app, "GET", "/api/v1/books", None).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_update_with_oversized_type_is_rejected() {
    let app = app().await;

    let (_, body) = send(
        &app,
        "POST",
        "/api/v1/books",
        Some(json!({
            "name": "Test",
            "author": "Test Name",
            "year_published": 2000,
            "book_type": "Fiction"
        })),
    )
    .await;
    let id = body["id"].as_i64().expect("No book ID");

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/v1/books/{}", id),
        Some(json!({ "book_type": "a".repeat(21) })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["violations"][0]["field"], "book_type");

    let (_, body) = send(&app, "GET", &format!("/api/v1/books/{}", id), None).await;
    assert_eq!(body["book_type"], "Fiction");
}

#[tokio::test]
async fn test_missing_book_returns_not_found() {
    let app = app().await;

    let (status, _) = send(&app, "PUT", "/api/v1/books/42", Some(json!({ "status": "lost" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", "/api/v1/books/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_without_year_is_rejected() {
    let app = app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/books",
        Some(json!({
            "name": "T",
            "author": "A",
            "book_type": "Fiction"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
    assert_eq!(body["violations"][0]["field"], "year_published");
    assert_eq!(body["violations"][0]["kind"], "required");

    let (_, body) = send(&app, "GET", "/api/v1/books", None).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_malformed_body_returns_json_error() {
    let app = app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/books",
        Some(json!({
            "name": 5,
            "author": "A",
            "year_published": 2000,
            "book_type": "Fiction"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_update_to_null_is_rejected() {
    let app = app().await;

    let (_, body) = send(
        &app,
        "POST",
        "/api/v1/books",
        Some(json!({
            "name": "Test",
            "author": "Test Name",
            "year_published": 2000,
            "book_type": "Fiction"
        })),
    )
    .await;
    let id = body["id"].as_i64().expect("No book ID");
    let uri = format!("/api/v1/books/{}", id);

    let (status, body) = send(&app, "PUT", &uri, Some(json!({ "year_published": null }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["violations"][0]["field"], "year_published");
    assert_eq!(body["violations"][0]["kind"], "type");

    let (status, body) = send(&app, "PUT", &uri, Some(json!({ "status": null }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["violations"][0]["field"], "status");
    assert_eq!(body["violations"][0]["kind"], "required");

    let (_, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(body["year_published"], 2000);
    assert_eq!(body["status"], "available");
}

#[tokio::test]
async fn test_year_beyond_32_bits_is_stored() {
    let app = app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/books",
        Some(json!({
            "name": "Far Future",
            "author": "Test Name",
            "year_published": 3000000000_i64,
            "book_type": "Fiction"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["year_published"], 3000000000_i64);
}
