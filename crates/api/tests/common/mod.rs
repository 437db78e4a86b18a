//! Shared helpers for API integration tests.

#![allow(dead_code)]

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tempfile::TempDir;
use tower::ServiceExt;

use themesmith_api::config::ServerConfig;
use themesmith_api::router::build_app_router;
use themesmith_api::state::AppState;
use themesmith_pipeline::plugins::PluginRegistry;

pub const PROTECTED: [&str; 4] = ["index", "default", "category", "news"];

/// Build a test `ServerConfig` rooted at `website`.
pub fn test_config(website: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        website_path: website.to_path_buf(),
        website_url: "http://example.test/".to_string(),
        themes_dir: "themes".to_string(),
        max_media_bytes: themesmith_core::media::MAX_THEME_MEDIA_BYTES,
        protected_templates: PROTECTED.iter().map(|s| s.to_string()).collect(),
        archive_dir: website.join("archives"),
    }
}

/// A temporary website root plus the router serving it.
pub struct TestSite {
    pub dir: TempDir,
    pub app: Router,
}

impl TestSite {
    pub fn new(pool: PgPool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("themes")).unwrap();
        let config = test_config(dir.path());
        let state = AppState::new(pool, config.clone(), PluginRegistry::new());
        let app = build_app_router(state, &config);
        Self { dir, app }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn theme_path(&self, name: &str) -> PathBuf {
        self.root().join("themes").join(name)
    }

    /// A theme directory with every protected template plus `extra`.
    pub fn valid_theme(&self, name: &str, extra: &[(&str, &str)]) -> PathBuf {
        let path = self.theme_path(name);
        for template in PROTECTED {
            write_file(&path.join(format!("{template}.html")), template.as_bytes());
        }
        for (file, contents) in extra {
            write_file(&path.join(file), contents.as_bytes());
        }
        path
    }

    pub fn staged_archives(&self) -> usize {
        fs::read_dir(self.root().join("archives"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

pub fn write_file(path: &Path, bytes: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}

pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut cursor);
        for (name, body) in entries {
            zip.start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    cursor.into_inner()
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    send_empty(app, Method::DELETE, uri).await
}

/// A request with no body and no content type.
pub async fn send_empty(app: Router, method: Method, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn send_json(
    app: Router,
    method: Method,
    uri: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST a single file field as `multipart/form-data`.
pub async fn post_file(app: Router, uri: &str, file_name: &str, bytes: &[u8]) -> Response<Body> {
    let boundary = "themesmith-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"theme\"; \
             filename=\"{file_name}\"\r\nContent-Type: application/zip\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
