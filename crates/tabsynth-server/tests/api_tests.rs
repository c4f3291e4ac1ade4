//! API integration tests for the tabsynth server
//!
//! Drive the full router with `oneshot`: registration, authentication,
//! upload validation, synthesis, downloads, evaluation, plots and deletion.

use axum::http::{header, StatusCode};
use serde_json::json;

mod common;
use common::{TestApp, PEOPLE_CSV};

// ============================================================================
// Service routes
// ============================================================================

#[tokio::test]
async fn test_root_and_health() {
    let app = TestApp::start().await;

    let response = app.get("/", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["status"], "running");

    let response = app.get("/health", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["database"], "connected");
}

// ============================================================================
// Users and authentication
// ============================================================================

#[tokio::test]
async fn test_register_and_duplicate() {
    let app = TestApp::start().await;
    let id = app.register("ada").await;
    assert_eq!(id, 1);

    let response = app
        .post_json("/api/v1/users", None, json!({ "username": "ada", "password": "other" }))
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.json()["error"]["code"], "CONFLICT");

    let response = app
        .post_json("/api/v1/users", None, json!({ "username": "x", "password": "pw" }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["success"], false);
}

#[tokio::test]
async fn test_dataset_routes_require_credentials() {
    let app = TestApp::start().await;
    app.register("ada").await;

    let response = app.get("/api/v1/datasets", None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.headers.contains_key(header::WWW_AUTHENTICATE));

    // Unknown user
    let response = app.get("/api/v1/datasets", Some("bob")).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app.get("/api/v1/datasets", Some("ada")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["data"]["datasets"], json!([]));
}

// ============================================================================
// Upload
// ============================================================================

#[tokio::test]
async fn test_upload_assigns_sequential_ids() {
    let app = TestApp::start().await;
    app.register("ada").await;

    assert_eq!(app.upload_people("ada").await, 1);
    assert_eq!(app.upload_people("ada").await, 2);

    let response = app.get("/api/v1/datasets", Some("ada")).await;
    let datasets = response.json()["data"]["datasets"].clone();
    assert_eq!(datasets.as_array().unwrap().len(), 2);
    assert_eq!(datasets[0]["name"], "people.csv");
    assert_eq!(datasets[0]["has_synthetic"], false);
    assert!(datasets[0].get("path").is_none());

    let stored = app.dir.path().join("data").join("2_people.csv");
    assert_eq!(std::fs::read_to_string(stored).unwrap(), PEOPLE_CSV);
}

#[tokio::test]
async fn test_upload_validation_errors() {
    let app = TestApp::start().await;
    app.register("ada").await;

    let cases = [
        ("notes.txt", PEOPLE_CSV),
        ("semi.csv", "a;b;c\n1;2;3\n4;5;6\n"),
        ("blank.csv", "\n\n"),
        ("noheader.csv", "1,2,3\n4,5,6\n"),
        ("bad.csv", "a,b$,c\n1,2,3\n"),
    ];
    for (filename, content) in cases {
        let response = app.upload("ada", "dataset", filename, content).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{filename}: {}", response.text());
        assert_eq!(response.json()["error"]["code"], "VALIDATION_ERROR");
    }

    let response = app.upload("ada", "file", "people.csv", PEOPLE_CSV).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    assert_eq!(std::fs::read_dir(app.dir.path().join("data")).unwrap().count(), 0);
    assert_eq!(app.upload_people("ada").await, 1);
}

#[tokio::test]
async fn test_upload_over_limit_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = TestApp::start_with(dir, |config| config.storage.max_upload_bytes = 64).await;
    app.register("ada").await;

    let big = format!("a,b\n{}", "1,2\n".repeat(100));
    let response = app.upload("ada", "dataset", "big.csv", &big).await;
    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
}

// ============================================================================
// Synthesis, download, evaluation
// ============================================================================

#[tokio::test]
async fn test_synthesize_download_evaluate() {
    let app = TestApp::start().await;
    app.register("ada").await;
    let id = app.upload_people("ada").await;

    let response = app
        .synthesize("ada", id, json!({ "strategy": "gaussian_copula", "rows": 30 }))
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text());
    let data = response.json()["data"].clone();
    assert_eq!(data["strategy"], "gaussian-copula");
    assert_eq!(data["columns"], json!(["age", "height", "city"]));
    assert_eq!(data["row_count"], 30);
    assert_eq!(data["preview"].as_array().unwrap().len(), 20);

    let response = app.get(&format!("/api/v1/datasets/{id}/synthetic"), Some("ada")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers[header::CONTENT_TYPE], "text/csv");
    assert!(response.headers[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains("1_s_people.csv"));
    let csv = response.text();
    assert!(csv.starts_with("age,height,city"));
    assert_eq!(csv.lines().count(), 31);

    let listed = app.get("/api/v1/datasets", Some("ada")).await.json();
    assert_eq!(listed["data"]["datasets"][0]["has_synthetic"], true);

    let response = app.get(&format!("/api/v1/datasets/{id}/evaluation"), Some("ada")).await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text());
    let data = response.json()["data"].clone();
    let score = data["report"]["overall_score"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&score));
    assert_eq!(data["report"]["column_pairs"], json!([["age", "height"]]));

    let plots = data["plots"].as_array().unwrap();
    assert_eq!(plots.len(), 7);
    let url = plots
        .iter()
        .filter_map(|p| p.as_str())
        .find(|p| p.ends_with("ageheightreg.png"))
        .unwrap()
        .to_string();

    let response = app.get(&url, Some("ada")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers[header::CONTENT_TYPE], "image/png");
    assert_eq!(&response.body[1..4], b"PNG");
}

#[tokio::test]
async fn test_regenerate_overwrites_synthetic() {
    let app = TestApp::start().await;
    app.register("ada").await;
    let id = app.upload_people("ada").await;

    for (strategy, rows) in [("ctgan", 12), ("tvae", 8)] {
        let response = app
            .synthesize("ada", id, json!({ "strategy": strategy, "rows": rows, "epochs": 10 }))
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.text());
    }

    let csv = app
        .get(&format!("/api/v1/datasets/{id}/synthetic"), Some("ada"))
        .await
        .text();
    assert_eq!(csv.lines().count(), 9);
    assert_eq!(std::fs::read_dir(app.dir.path().join("synthetic")).unwrap().count(), 1);
}

#[tokio::test]
async fn test_synthesis_parameter_errors() {
    let app = TestApp::start().await;
    app.register("ada").await;
    let id = app.upload_people("ada").await;

    let forms = [
        json!({ "strategy": "fast_ml", "rows": 0 }),
        json!({ "strategy": "ctgan", "rows": 10 }),
        json!({ "strategy": "tvae", "rows": 10, "epochs": -1 }),
        json!({ "strategy": "bayesian_network", "rows": 10 }),
        json!({ "strategy": "gaussian_copula", "rows": 10, "column_distributions": { "weight": "beta" } }),
    ];
    for form in forms {
        let response = app.synthesize("ada", id, form.clone()).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{form}: {}", response.text());
        assert_eq!(response.json()["error"]["code"], "VALIDATION_ERROR");
    }

    assert_eq!(std::fs::read_dir(app.dir.path().join("synthetic")).unwrap().count(), 0);
}

#[tokio::test]
async fn test_missing_synthetic_is_not_found() {
    let app = TestApp::start().await;
    app.register("ada").await;
    let id = app.upload_people("ada").await;

    let response = app.get(&format!("/api/v1/datasets/{id}/synthetic"), Some("ada")).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.get(&format!("/api/v1/datasets/{id}/evaluation"), Some("ada")).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["error"]["code"], "NOT_FOUND");
}

// ============================================================================
// Ownership and deletion
// ============================================================================

#[tokio::test]
async fn test_other_users_cannot_touch_dataset() {
    let app = TestApp::start().await;
    app.register("ada").await;
    app.register("eve").await;
    let id = app.upload_people("ada").await;

    let foreign = app
        .synthesize("eve", id, json!({ "strategy": "fast_ml", "rows": 5 }))
        .await;
    let missing = app
        .synthesize("eve", 99, json!({ "strategy": "fast_ml", "rows": 5 }))
        .await;
    assert_eq!(foreign.status, StatusCode::FORBIDDEN);
    assert_eq!(missing.status, StatusCode::FORBIDDEN);
    // Existence is not revealed
    assert_eq!(foreign.json(), missing.json());

    for uri in [
        format!("/api/v1/datasets/{id}/synthetic"),
        format!("/api/v1/datasets/{id}/evaluation"),
        format!("/api/v1/datasets/{id}/plots/{id}age.png"),
    ] {
        assert_eq!(app.get(&uri, Some("eve")).await.status, StatusCode::FORBIDDEN, "{uri}");
    }

    let response = app.delete(&format!("/api/v1/datasets/{id}"), "eve").await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let listed = app.get("/api/v1/datasets", Some("eve")).await.json();
    assert_eq!(listed["data"]["datasets"], json!([]));
}

#[tokio::test]
async fn test_delete_removes_everything() {
    let app = TestApp::start().await;
    app.register("ada").await;
    let id = app.upload_people("ada").await;
    app.synthesize("ada", id, json!({ "strategy": "fast_ml", "rows": 10 }))
        .await;
    let evaluation = app.get(&format!("/api/v1/datasets/{id}/evaluation"), Some("ada")).await;
    assert_eq!(evaluation.status, StatusCode::OK);

    let response = app.delete(&format!("/api/v1/datasets/{id}"), "ada").await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text());
    // synthetic table plus seven plots
    assert_eq!(response.json()["data"]["artifacts_removed"], 8);

    for dir in ["data", "synthetic", "plots"] {
        assert_eq!(std::fs::read_dir(app.dir.path().join(dir)).unwrap().count(), 0, "{dir}");
    }

    let response = app.delete(&format!("/api/v1/datasets/{id}"), "ada").await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_reused_id_does_not_inherit_artifacts() {
    let app = TestApp::start().await;
    app.register("ada").await;
    app.register("bob").await;
    let id = app.upload_people("ada").await;
    app.synthesize("ada", id, json!({ "strategy": "fast_ml", "rows": 10 }))
        .await;
    let evaluation = app.get(&format!("/api/v1/datasets/{id}/evaluation"), Some("ada")).await;
    assert_eq!(evaluation.status, StatusCode::OK);

    // Real table disappears; listing purges the record
    std::fs::remove_file(app.dir.path().join("data").join(format!("{id}_people.csv"))).unwrap();
    let listed = app.get("/api/v1/datasets", Some("ada")).await.json();
    assert_eq!(listed["data"]["datasets"], json!([]));

    let reused = app.upload_people("bob").await;
    assert_eq!(reused, id);

    let response = app.get(&format!("/api/v1/datasets/{id}/synthetic"), Some("bob")).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    let response = app
        .get(&format!("/api/v1/datasets/{id}/plots/{id}age.png"), Some("bob"))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    let response = app.get(&format!("/api/v1/datasets/{id}/evaluation"), Some("bob")).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let listed = app.get("/api/v1/datasets", Some("bob")).await.json();
    assert_eq!(listed["data"]["datasets"][0]["has_synthetic"], false);
}

#[tokio::test]
async fn test_deleted_newest_id_is_reused_clean() {
    let app = TestApp::start().await;
    app.register("ada").await;
    app.register("bob").await;
    let id = app.upload_people("ada").await;
    app.synthesize("ada", id, json!({ "strategy": "fast_ml", "rows": 10 }))
        .await;
    app.get(&format!("/api/v1/datasets/{id}/evaluation"), Some("ada")).await;
    let response = app.delete(&format!("/api/v1/datasets/{id}"), "ada").await;
    assert_eq!(response.status, StatusCode::OK);

    assert_eq!(app.upload_people("bob").await, id);
    let response = app.get(&format!("/api/v1/datasets/{id}/synthetic"), Some("bob")).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    let response = app
        .get(&format!("/api/v1/datasets/{id}/plots/{id}column_shapes.png"), Some("bob"))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_plot_name_rejected() {
    let app = TestApp::start().await;
    app.register("ada").await;
    let id = app.upload_people("ada").await;

    let response = app
        .get(&format!("/api/v1/datasets/{id}/plots/{id}age.csv"), Some("ada"))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .get(&format!("/api/v1/datasets/{id}/plots/{id}age.png"), Some("ada"))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
