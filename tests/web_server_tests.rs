//! ダッシュボードサーバーのルート統合テスト

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use scuuba_light::{
    config::ServerConfig,
    web::{router, session_store::SessionStore, AppState, DashboardServer},
    DashboardSettings,
};
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "scuuba-test-boundary";
const FIXTURE: &str = include_str!("data/conversations.csv");

fn test_app() -> Router {
    DashboardServer::new(ServerConfig::default(), DashboardSettings::default()).router()
}

fn multipart_body(file_name: &str, content: &str) -> String {
    format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: text/csv\r\n\r\n{c}\r\n--{b}--\r\n",
        b = BOUNDARY,
        f = file_name,
        c = content
    )
}

fn upload_request(file_name: &str, content: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(file_name, content)))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// アップロードしてダッシュボードのパスを返す
async fn upload_fixture(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(upload_request("conversations.csv", FIXTURE))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_index_shows_upload_form() {
    let response = test_app().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Choisissez un fichier CSV d'analyse"));
    assert!(html.contains(r#"name="file""#));
}

#[tokio::test]
async fn test_upload_then_dashboard() {
    let app = test_app();
    let location = upload_fixture(&app).await;
    assert!(location.starts_with("/dashboard/"));

    let response = app
        .clone()
        .oneshot(get(&format!("{}?start=2024-06-01&end=2024-06-03", location)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("📊 10 conversations analysées"));
    assert!(html.contains("6 conversations dans la période sélectionnée"));
    assert!(html.contains("Analyse des Hot Topics"));
    assert!(html.contains("Plotly.newPlot"));
}

#[tokio::test]
async fn test_dashboard_json_api() {
    let app = test_app();
    let location = upload_fixture(&app).await;
    let id = location.trim_start_matches("/dashboard/");

    let response = app
        .clone()
        .oneshot(get(&format!("/api/dashboard/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["metadata"]["filtered_rows"], 10);
    assert_eq!(json["dashboard"]["satisfaction"]["data"]["total_votes"], 9);
}

#[tokio::test]
async fn test_export_download() {
    let app = test_app();
    let location = upload_fixture(&app).await;
    let id = location.trim_start_matches("/dashboard/");

    let response = app
        .clone()
        .oneshot(get(&format!("/export/{}?format=csv", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/csv; charset=utf-8"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"conversations_dashboard.csv\""
    );

    let response = app
        .clone()
        .oneshot(get(&format!("/export/{}?format=pdf", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_schema_failure_is_unprocessable() {
    let response = test_app()
        .oneshot(upload_request("brut.csv", "conversationId,date\nc1,2024-06-01\n"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = body_text(response).await;
    assert!(html.contains("Colonnes requises: theme_principal"));
}

#[tokio::test]
async fn test_malformed_row_is_bad_request() {
    let content = "conversationId,date,theme_principal,sous_theme,turn_count,default_count,feedbackPositive,feedbackNegative\n\
                   c1,pas-une-date,A,B,1,0,0,0\n";
    let response = test_app()
        .oneshot(upload_request("casse.csv", content))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let html = body_text(response).await;
    assert!(html.contains("Erreur lors du traitement"));
    assert!(html.contains("pas-une-date"));
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let app = test_app();
    for uri in [
        "/dashboard/00000000-0000-0000-0000-000000000000",
        "/api/dashboard/not-a-uuid",
        "/export/00000000-0000-0000-0000-000000000000?format=json",
    ] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[tokio::test]
async fn test_invalid_query_date_is_bad_request() {
    let app = test_app();
    let location = upload_fixture(&app).await;
    let response = app
        .clone()
        .oneshot(get(&format!("{}?start=hier&end=2024-06-03", location)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cleared_dates_show_incomplete_warning() {
    let app = test_app();
    let location = upload_fixture(&app).await;
    let response = app
        .clone()
        .oneshot(get(&format!("{}?start=&end=", location)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Veuillez sélectionner une période complète"));
    assert!(!html.contains("dans la période sélectionnée"));
}

#[tokio::test]
async fn test_sessions_are_bounded() {
    let store = Arc::new(SessionStore::new(1));
    let app = router(
        AppState {
            store: store.clone(),
            settings: DashboardSettings::default(),
        },
        1024 * 1024,
    );

    let first = upload_fixture(&app).await;
    let second = upload_fixture(&app).await;
    assert_eq!(store.len(), 1);

    let response = app.clone().oneshot(get(&first)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = app.clone().oneshot(get(&second)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
