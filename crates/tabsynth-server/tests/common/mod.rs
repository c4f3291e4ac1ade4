//! Common test utilities for tabsynth server integration tests
//!
//! Every [`TestApp`] owns a temporary directory holding its SQLite file and
//! artifact tree, so tests run isolated and in parallel.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;
use tabsynth_server::{api, config::Config, AppContext};
use tempfile::TempDir;
use tower::ServiceExt;

pub const PASSWORD: &str = "s3cret";

pub const PEOPLE_CSV: &str = "age,height,city\n\
31,1.72,Paris\n\
45,1.80,Lyon\n\
27,1.65,Paris\n\
52,1.77,Nice\n\
38,1.70,Lyon\n\
61,1.68,Nice\n";

const BOUNDARY: &str = "tabsynth-test-boundary";

pub struct TestApp {
    pub dir: TempDir,
    pub ctx: AppContext,
    pub router: Router,
}

/// Status plus raw body of a response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("JSON body")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("UTF-8 body")
    }
}

pub fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.database.url = format!("sqlite://{}", dir.path().join("tabsynth.db").display());
    config.storage.dataset_dir = dir.path().join("data");
    config.storage.synthetic_dir = dir.path().join("synthetic");
    config.storage.plot_dir = dir.path().join("plots");
    config.synthesis.sampler_seed = Some(11);
    config.auth.bcrypt_cost = 4;
    config
}

impl TestApp {
    pub async fn start() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        Self::start_with(dir, |_| {}).await
    }

    pub async fn start_with(dir: TempDir, tweak: impl FnOnce(&mut Config)) -> Self {
        let mut config = test_config(&dir);
        tweak(&mut config);
        let ctx = AppContext::initialize(config).await.expect("context");
        let router = api::create_router(ctx.clone());
        Self { dir, ctx, router }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body")
            .to_vec();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, user: Option<&str>) -> TestResponse {
        self.send(request(Method::GET, uri, user).body(Body::empty()).expect("request"))
            .await
    }

    pub async fn delete(&self, uri: &str, user: &str) -> TestResponse {
        self.send(request(Method::DELETE, uri, Some(user)).body(Body::empty()).expect("request"))
            .await
    }

    pub async fn post_json(&self, uri: &str, user: Option<&str>, body: Value) -> TestResponse {
        self.send(
            request(Method::POST, uri, user)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await
    }

    /// Register `username` with [`PASSWORD`].
    pub async fn register(&self, username: &str) -> i64 {
        let response = self
            .post_json(
                "/api/v1/users",
                None,
                serde_json::json!({ "username": username, "password": PASSWORD }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());
        response.json()["data"]["id"].as_i64().expect("user id")
    }

    pub async fn upload(&self, user: &str, field: &str, filename: &str, content: &str) -> TestResponse {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             Content-Type: text/csv\r\n\r\n\
             {content}\r\n\
             --{BOUNDARY}--\r\n"
        );
        self.send(
            request(Method::POST, "/api/v1/datasets", Some(user))
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .expect("request"),
        )
        .await
    }

    /// Upload [`PEOPLE_CSV`] as `people.csv` and return the new id.
    pub async fn upload_people(&self, user: &str) -> i64 {
        let response = self.upload(user, "dataset", "people.csv", PEOPLE_CSV).await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());
        response.json()["data"]["id"].as_i64().expect("dataset id")
    }

    pub async fn synthesize(&self, user: &str, id: i64, form: Value) -> TestResponse {
        self.post_json(&format!("/api/v1/datasets/{id}/synthesize"), Some(user), form)
            .await
    }
}

pub fn basic(username: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{PASSWORD}")))
}

fn request(method: Method, uri: &str, user: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match user {
        Some(user) => builder.header(header::AUTHORIZATION, basic(user)),
        None => builder,
    }
}
