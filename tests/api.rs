//! End-to-end tests for the HTTP surface

use std::io::Cursor;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use axum_test::TestServer;
use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use image_tools_server::{router, AppState, Config};

const BOUNDARY: &str = "image-tools-test-boundary";

// ============================================================================
// Helpers
// ============================================================================

async fn test_app(temp_dir: &TempDir) -> Router {
    test_app_with(temp_dir, |_| {}).await
}

async fn test_app_with(temp_dir: &TempDir, tweak: impl FnOnce(&mut Config)) -> Router {
    let mut config = Config::default();
    config.storage.dir = temp_dir.path().join("uploads");
    tweak(&mut config);

    let state = AppState::new(config).await.unwrap();
    router(state)
}

fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x * 7) as u8, (y * 5) as u8, 128]));
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut cursor, ImageFormat::Png)
        .unwrap();
    cursor.into_inner()
}

fn multipart_body(image: Option<&[u8]>, fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    if let Some(image) = image {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"image\"; filename=\"upload.png\"\r\n",
        );
        body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
        body.extend_from_slice(image);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(uri: &str, image: Option<&[u8]>, fields: &[(&str, &str)]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::HOST, "localhost:5000")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(image, fields)))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::HOST, "localhost:5000")
        .body(Body::empty())
        .unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_text(response: Response) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

/// POST an upload, expect success and return the download path
async fn upload_ok(app: &Router, uri: &str, image: &[u8], fields: &[(&str, &str)]) -> String {
    let response = app
        .clone()
        .oneshot(upload_request(uri, Some(image), fields))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    let link = json["downloadLink"].as_str().unwrap().to_string();
    assert!(
        link.starts_with("http://localhost:5000/download/"),
        "unexpected link {link}"
    );
    link.trim_start_matches("http://localhost:5000").to_string()
}

/// GET a download path, expect an attachment and return its bytes
async fn download_ok(app: &Router, path: &str) -> Vec<u8> {
    let response = app.clone().oneshot(get_request(path)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment;"), "{disposition}");

    body_bytes(response).await
}

// ============================================================================
// Tool endpoints
// ============================================================================

#[tokio::test]
async fn test_convert_to_webp_and_download() {
    let temp_dir = TempDir::new().unwrap();
    let app = test_app(&temp_dir).await;

    let path = upload_ok(&app, "/convert", &sample_png(24, 16), &[("format", "webp")]).await;
    assert!(path.starts_with("/download/converted-"));
    assert!(path.ends_with(".webp"));

    let data = download_ok(&app, &path).await;
    assert_eq!(image::guess_format(&data).unwrap(), ImageFormat::WebP);
}

#[tokio::test]
async fn test_convert_defaults_to_png() {
    let temp_dir = TempDir::new().unwrap();
    let app = test_app(&temp_dir).await;

    let jpeg = {
        let mut cursor = Cursor::new(Vec::new());
        image::load_from_memory(&sample_png(8, 8))
            .unwrap()
            .write_to(&mut cursor, ImageFormat::Jpeg)
            .unwrap();
        cursor.into_inner()
    };

    let path = upload_ok(&app, "/convert", &jpeg, &[]).await;
    assert!(path.ends_with(".png"));
    let data = download_ok(&app, &path).await;
    assert_eq!(image::guess_format(&data).unwrap(), ImageFormat::Png);
}

#[tokio::test]
async fn test_compress_produces_jpeg() {
    let temp_dir = TempDir::new().unwrap();
    let app = test_app(&temp_dir).await;

    let path = upload_ok(&app, "/compress", &sample_png(32, 32), &[("quality", "30")]).await;
    assert!(path.starts_with("/download/compressed-"));
    assert!(path.ends_with(".jpeg"));

    let data = download_ok(&app, &path).await;
    assert_eq!(image::guess_format(&data).unwrap(), ImageFormat::Jpeg);
}

#[tokio::test]
async fn test_to_pdf_produces_single_page() {
    let temp_dir = TempDir::new().unwrap();
    let app = test_app(&temp_dir).await;

    let path = upload_ok(&app, "/to-pdf", &sample_png(40, 60), &[]).await;
    assert!(path.starts_with("/download/doc-"));
    assert!(path.ends_with(".pdf"));

    let data = download_ok(&app, &path).await;
    let doc = lopdf::Document::load_mem(&data).unwrap();
    assert_eq!(doc.get_pages().len(), 1);
}

#[tokio::test]
async fn test_resize_fills_exact_dimensions() {
    let temp_dir = TempDir::new().unwrap();
    let app = test_app(&temp_dir).await;

    let path = upload_ok(
        &app,
        "/resize",
        &sample_png(50, 10),
        &[("width", "20"), ("height", "30")],
    )
    .await;
    assert!(path.ends_with(".png"));

    let data = download_ok(&app, &path).await;
    let img = image::load_from_memory(&data).unwrap();
    assert_eq!(img.dimensions(), (20, 30));
}

#[tokio::test]
async fn test_public_url_is_used_for_links() {
    let temp_dir = TempDir::new().unwrap();
    let app = test_app_with(&temp_dir, |config| {
        config.server.public_url = Some("https://img.example.net".to_string());
    })
    .await;

    let response = app
        .oneshot(upload_request("/to-pdf", Some(sample_png(4, 4).as_slice()), &[]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert!(json["downloadLink"]
        .as_str()
        .unwrap()
        .starts_with("https://img.example.net/download/doc-"));
}

// ============================================================================
// Client errors
// ============================================================================

#[tokio::test]
async fn test_missing_file_is_bad_request() {
    let temp_dir = TempDir::new().unwrap();
    let app = test_app(&temp_dir).await;

    for uri in ["/convert", "/compress", "/to-pdf", "/resize"] {
        let response = app
            .clone()
            .oneshot(upload_request(uri, None, &[("width", "10"), ("height", "10")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body_text(response).await, "No file uploaded");
    }
}

#[tokio::test]
async fn test_empty_file_is_bad_request() {
    let temp_dir = TempDir::new().unwrap();
    let app = test_app(&temp_dir).await;

    let response = app
        .oneshot(upload_request("/convert", Some(&b""[..]), &[]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_resize_requires_dimensions() {
    let temp_dir = TempDir::new().unwrap();
    let app = test_app(&temp_dir).await;
    let png = sample_png(8, 8);

    for fields in [
        vec![],
        vec![("width", "10")],
        vec![("width", "abc"), ("height", "10")],
        vec![("width", "0"), ("height", "10")],
    ] {
        let response = app
            .clone()
            .oneshot(upload_request("/resize", Some(png.as_slice()), &fields))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{fields:?}");
    }
}

#[tokio::test]
async fn test_unknown_format_is_bad_request() {
    let temp_dir = TempDir::new().unwrap();
    let app = test_app(&temp_dir).await;

    let response = app
        .oneshot(upload_request("/convert", Some(sample_png(8, 8).as_slice()), &[("format", "bmp")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_corrupt_image_is_server_error() {
    let temp_dir = TempDir::new().unwrap();
    let app = test_app(&temp_dir).await;

    let response = app
        .clone()
        .oneshot(upload_request("/convert", Some(&b"not an image at all"[..]), &[]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "Conversion Failed");

    let response = app
        .oneshot(upload_request("/to-pdf", Some(&b"not an image at all"[..]), &[]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "PDF Generation Failed");
}

// ============================================================================
// Downloads
// ============================================================================

#[tokio::test]
async fn test_download_missing_file_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let server = TestServer::new(test_app(&temp_dir).await).unwrap();

    let response = server.get("/download/converted-missing.png").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_rejects_traversal() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("secret.txt"), b"secret").unwrap();
    let app = test_app(&temp_dir).await;

    let response = app
        .oneshot(get_request("/download/..%2Fsecret.txt"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Ambient behavior
// ============================================================================

#[tokio::test]
async fn test_health() {
    let temp_dir = TempDir::new().unwrap();
    let server = TestServer::new(test_app(&temp_dir).await).unwrap();

    let response = server.get("/health").await;
    response.assert_status_ok();
    let json = response.json::<Value>();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "image-tools-server");
}

#[tokio::test]
async fn test_storage_directory_is_created() {
    let temp_dir = TempDir::new().unwrap();
    let _app = test_app(&temp_dir).await;
    assert!(temp_dir.path().join("uploads").is_dir());
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let temp_dir = TempDir::new().unwrap();
    let app = test_app(&temp_dir).await;

    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://somewhere.example")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_rate_limit_per_forwarded_client() {
    let temp_dir = TempDir::new().unwrap();
    let app = test_app_with(&temp_dir, |config| {
        config.limits.rate_limit_max = 3;
    })
    .await;

    let from = |ip: &str| {
        Request::builder()
            .uri("/health")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    };

    for _ in 0..3 {
        let response = app.clone().oneshot(from("203.0.113.9")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.clone().oneshot(from("203.0.113.9")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    assert!(body_text(response).await.starts_with("Too many requests"));

    let response = app.oneshot(from("198.51.100.1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
