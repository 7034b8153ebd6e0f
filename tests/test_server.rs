//! Integration test: Server API endpoints

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use std::sync::Arc;
use tabtrain::registry::{MemoryModelRegistry, ModelRegistry};
use tabtrain::server::{create_router, AppState, ServerConfig};
use tabtrain::training::TrainingConfig;
use tower::ServiceExt;

const BOUNDARY: &str = "tabtrain-test-boundary";

fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        static_dir: None,
        models_dir: "unused".to_string(),
        max_upload_size: 10 * 1024 * 1024,
        csv_delimiter: b';',
    }
}

fn test_app() -> axum::Router {
    let config = test_config();
    let registry: Arc<dyn ModelRegistry> = Arc::new(MemoryModelRegistry::new());
    let training = TrainingConfig::default()
        .with_n_estimators(15)
        .with_boosting_rounds(15);
    let state = Arc::new(AppState::with_registry(&config, registry, training));
    create_router(state, &config)
}

fn weather_csv() -> String {
    let mut text = String::from("temp;outlook;humidity;play\n");
    for i in 0..30 {
        let play = i % 2 == 0;
        let temp = if play { 22 + i % 5 } else { 5 + i % 4 };
        let outlook = if play { "sunny" } else { "rainy" };
        let humidity = if play { 40 } else { 85 };
        text.push_str(&format!(
            "{};{};{};{}\n",
            temp,
            outlook,
            humidity,
            if play { "yes" } else { "no" }
        ));
    }
    text
}

fn multipart_body(field: &str, file_name: Option<&str>, content: &str) -> String {
    let disposition = match file_name {
        Some(name) => format!("form-data; name=\"{}\"; filename=\"{}\"", field, name),
        None => format!("form-data; name=\"{}\"", field),
    };
    format!(
        "--{b}\r\nContent-Disposition: {d}\r\nContent-Type: text/csv\r\n\r\n{c}\r\n--{b}--\r\n",
        b = BOUNDARY,
        d = disposition,
        c = content
    )
}

fn upload_request(field: &str, file_name: Option<&str>, content: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(field, file_name, content)))
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn upload_and_train(app: &axum::Router) {
    let (status, _) = send(app, upload_request("file", Some("weather.csv"), &weather_csv())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        app,
        json_request("POST", "/api/train", serde_json::json!({ "target_variable": "play" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app();
    let (status, body) = send(
        &app,
        Request::builder().uri("/api/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["dataset_loaded"], false);
    assert_eq!(body["model_trained"], false);
}

#[tokio::test]
async fn test_upload_returns_columns() {
    let app = test_app();
    let (status, body) = send(&app, upload_request("file", Some("weather.csv"), &weather_csv())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["columns"],
        serde_json::json!(["temp", "outlook", "humidity", "play"])
    );
}

#[tokio::test]
async fn test_upload_without_file_part() {
    let app = test_app();
    let (status, body) = send(&app, upload_request("other", Some("weather.csv"), "a;b\n1;2\n")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file part");
}

#[tokio::test]
async fn test_upload_without_file_name() {
    let app = test_app();
    let (status, body) = send(&app, upload_request("file", Some(""), "a;b\n1;2\n")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No selected file");
}

#[tokio::test]
async fn test_upload_wrong_extension() {
    let app = test_app();
    let (status, body) = send(&app, upload_request("file", Some("data.xlsx"), "a;b\n1;2\n")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid file format");
}

#[tokio::test]
async fn test_train_without_upload() {
    let app = test_app();
    let (status, body) = send(
        &app,
        json_request("POST", "/api/train", serde_json::json!({ "target_variable": "play" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No data uploaded");
}

#[tokio::test]
async fn test_train_without_upload_checks_dataset_first() {
    let app = test_app();
    for request_body in [serde_json::json!({ "target_variable": "" }), serde_json::json!({})] {
        let (status, body) = send(&app, json_request("POST", "/api/train", request_body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No data uploaded");
    }
}

#[tokio::test]
async fn test_train_invalid_target() {
    let app = test_app();
    send(&app, upload_request("file", Some("weather.csv"), &weather_csv())).await;

    for request_body in [
        serde_json::json!({ "target_variable": "wind" }),
        serde_json::json!({ "target_variable": "" }),
        serde_json::json!({}),
    ] {
        let (status, body) = send(&app, json_request("POST", "/api/train", request_body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid target variable");
    }
}

#[tokio::test]
async fn test_train_returns_prediction_url() {
    let app = test_app();
    send(&app, upload_request("file", Some("weather.csv"), &weather_csv())).await;

    let (status, body) = send(
        &app,
        json_request("POST", "/api/train", serde_json::json!({ "target_variable": "play" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({ "prediction_url": "/predict" }));
}

#[tokio::test]
async fn test_features_before_training() {
    let app = test_app();
    let (status, body) = send(
        &app,
        Request::builder().uri("/api/features").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No model trained");
}

#[tokio::test]
async fn test_features_after_training() {
    let app = test_app();
    upload_and_train(&app).await;

    let (status, body) = send(
        &app,
        Request::builder().uri("/api/features").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["features"],
        serde_json::json!(["temp", "outlook_sunny", "outlook_rainy", "humidity"])
    );
}

#[tokio::test]
async fn test_predict_before_training() {
    let app = test_app();
    let (status, body) = send(
        &app,
        json_request("POST", "/api/predict", serde_json::json!({ "temp": 20 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No model trained");
}

#[tokio::test]
async fn test_predict_default_model() {
    let app = test_app();
    upload_and_train(&app).await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/predict",
            serde_json::json!({ "temp": 25, "outlook": "sunny", "humidity": 40 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], "yes");
    assert_eq!(body["model"], "random_forest");
}

#[tokio::test]
async fn test_predict_selected_model() {
    let app = test_app();
    upload_and_train(&app).await;

    for model in ["gradient_boosting", "svm"] {
        let (status, body) = send(
            &app,
            json_request(
                "POST",
                &format!("/api/predict?model={}", model),
                serde_json::json!({ "temp": 6, "outlook_rainy": 1, "outlook_sunny": 0, "humidity": 85 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", model);
        assert_eq!(body["prediction"], "no");
        assert_eq!(body["model"], model);
    }
}

#[tokio::test]
async fn test_predict_unknown_model() {
    let app = test_app();
    upload_and_train(&app).await;

    let (status, _) = send(
        &app,
        json_request("POST", "/api/predict?model=knn", serde_json::json!({ "temp": 6 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_predict_rejects_non_object() {
    let app = test_app();
    upload_and_train(&app).await;

    let (status, _) = send(
        &app,
        json_request("POST", "/api/predict", serde_json::json!([1, 2, 3])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_api_route() {
    let app = test_app();
    let (status, body) = send(
        &app,
        Request::builder().uri("/api/models").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found");
}
