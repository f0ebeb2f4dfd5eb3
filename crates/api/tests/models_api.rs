//! Integration tests for the model catalogue and download proxy validation.

mod common;

use std::convert::Infallible;

use axum::body::{Body, Bytes};
use axum::http::{header, StatusCode};
use axum::routing::get as get_route;
use axum::Router;
use common::{body_json, get};
use http_body_util::BodyExt;

/// Serve `router` on an ephemeral port and return its base URL.
async fn spawn_image_host(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// An image host with a small PNG, an oversized one with a declared length,
/// and an oversized one streamed in chunks without a length.
fn image_host() -> Router {
    Router::new()
        .route(
            "/small.png",
            get_route(|| async { ([(header::CONTENT_TYPE, "image/png")], vec![7u8; 100]) }),
        )
        .route(
            "/large.png",
            get_route(|| async { ([(header::CONTENT_TYPE, "image/png")], vec![7u8; 4096]) }),
        )
        .route(
            "/streamed.png",
            get_route(|| async {
                let chunks = (0..8).map(|_| Ok::<_, Infallible>(Bytes::from(vec![7u8; 512])));
                Body::from_stream(futures::stream::iter(chunks))
            }),
        )
}

#[tokio::test]
async fn models_lists_chat_and_image_models() {
    let test = common::build_test_app();

    let response = get(test.app(), "/models").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let models = json["data"].as_array().expect("data must be an array");
    let ids: Vec<&str> = models.iter().filter_map(|m| m["id"].as_str()).collect();

    assert!(ids.contains(&"gpt-3.5-turbo"));
    assert!(ids.contains(&"dall-e-3"));
}

#[tokio::test]
async fn download_without_url_is_bad_request() {
    let test = common::build_test_app();
    let response = get(test.app(), "/download").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn download_rejects_non_http_scheme() {
    let test = common::build_test_app();
    let response = get(test.app(), "/download?url=file:///etc/passwd").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn download_returns_image_as_attachment() {
    let test = common::build_test_app();
    let host = spawn_image_host(image_host()).await;

    let response = get(test.app(), &format!("/download?url={host}/small.png")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/png");
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=kidstory-image.png"
    );

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(bytes.len(), 100);
}

#[tokio::test]
async fn download_rejects_body_with_declared_length_over_cap() {
    let test = common::build_test_app();
    let host = spawn_image_host(image_host()).await;

    let response = get(test.app(), &format!("/download?url={host}/large.png")).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["code"], "BAD_GATEWAY");
}

#[tokio::test]
async fn download_rejects_streamed_body_crossing_cap() {
    let test = common::build_test_app();
    let host = spawn_image_host(image_host()).await;

    let response = get(test.app(), &format!("/download?url={host}/streamed.png")).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn download_failure_from_host_is_bad_gateway() {
    let test = common::build_test_app();
    let host = spawn_image_host(image_host()).await;

    let response = get(test.app(), &format!("/download?url={host}/missing.png")).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
