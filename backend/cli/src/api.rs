use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value};

use payguide_core::{Language, ScanError};
use payguide_media::{from_data_url, UploadedFile, MAX_UPLOAD_BYTES};
use payguide_session::{ScanOutcome, ScanSession, SessionSnapshot};

/// Room for a base64 data URL of a maximum-size image, so oversized
/// uploads reach the domain check instead of a bare 413.
pub const SCAN_BODY_LIMIT: usize = MAX_UPLOAD_BYTES * 2;

/// Shared application state for API handlers.
pub struct AppState {
    pub session: Arc<ScanSession>,
}

/// Build the Axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/state", get(get_state))
        .route("/api/strings", get(get_strings))
        .route("/api/languages", get(list_languages))
        .route("/api/language", post(set_language))
        .route("/api/scan", post(scan))
        .route("/api/camera/start", post(start_camera))
        .route("/api/camera/capture", post(capture))
        .route("/api/reset", post(reset))
        .layer(DefaultBodyLimit::max(SCAN_BODY_LIMIT))
        .with_state(state)
}

/// A `ScanError` rendered as JSON with its localized message.
pub struct ApiError {
    status: StatusCode,
    body: Value,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn status_for(error: &ScanError) -> StatusCode {
    match error {
        ScanError::InvalidFileType(_) | ScanError::FileTooLarge { .. } => StatusCode::BAD_REQUEST,
        ScanError::Busy => StatusCode::CONFLICT,
        ScanError::UnsupportedLanguage(_) | ScanError::UnsupportedShape { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ScanError::ClassificationService(_) => StatusCode::BAD_GATEWAY,
        ScanError::CameraUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl AppState {
    async fn error(&self, error: ScanError) -> ApiError {
        let status = status_for(&error);
        if status.is_server_error() {
            tracing::error!(error = %error, "Scan request failed");
        }
        ApiError {
            status,
            body: json!({
                "error": error.kind(),
                "message": self.session.fault_message(&error).await,
                "detail": error.to_string(),
            }),
        }
    }
}

/// Health check endpoint.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "payguide",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn get_state(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    Json(state.session.snapshot().await)
}

/// UI strings for the active language.
async fn get_strings(State(state): State<Arc<AppState>>) -> Json<Value> {
    let language = state.session.language().await;
    let strings = state.session.strings().await;
    Json(json!({ "language": language, "strings": strings }))
}

async fn list_languages() -> Json<Value> {
    let languages: Vec<Value> = Language::ALL
        .iter()
        .map(|l| json!({ "code": l.code(), "name": l.native_name() }))
        .collect();
    Json(json!({ "languages": languages }))
}

#[derive(Deserialize)]
struct LanguageRequest {
    language: String,
}

async fn set_language(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LanguageRequest>,
) -> Result<Json<Value>, ApiError> {
    match state.session.set_language(&req.language).await {
        Ok(language) => Ok(Json(json!({ "language": language }))),
        Err(e) => Err(state.error(e).await),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataUrlUpload {
    data_url: String,
    name: Option<String>,
}

/// Turn the request body into an upload.
///
/// `application/json` bodies carry `{ "dataUrl": ... }`; anything else is the
/// raw image with its MIME type in `Content-Type`.
fn upload_from_request(headers: &HeaderMap, body: Bytes) -> Result<UploadedFile, ScanError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty());
    let name = headers
        .get("x-file-name")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("upload")
        .to_string();

    if content_type.as_deref() == Some("application/json") {
        let req: DataUrlUpload = serde_json::from_slice(&body)
            .map_err(|e| ScanError::InvalidFileType(format!("malformed upload body: {e}")))?;
        let source = req.name.unwrap_or(name);
        let image = from_data_url(&req.data_url, &source)
            .map_err(|e| ScanError::InvalidFileType(e.to_string()))?;
        return Ok(UploadedFile {
            name: image.source,
            mime_type: Some(image.mime_type),
            data: image.data,
        });
    }

    Ok(UploadedFile {
        name,
        mime_type: content_type.filter(|m| m != "application/octet-stream"),
        data: body,
    })
}

async fn scan(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ScanOutcome>, ApiError> {
    let file = match upload_from_request(&headers, body) {
        Ok(file) => file,
        Err(e) => return Err(state.error(state.session.fail_upload(e).await).await),
    };
    match state.session.scan_upload(file).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e) => Err(state.error(e).await),
    }
}

async fn start_camera(State(state): State<Arc<AppState>>) -> Result<Json<SessionSnapshot>, ApiError> {
    match state.session.start_camera().await {
        Ok(()) => Ok(Json(state.session.snapshot().await)),
        Err(e) => Err(state.error(e).await),
    }
}

async fn capture(State(state): State<Arc<AppState>>) -> Result<Json<ScanOutcome>, ApiError> {
    match state.session.capture().await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e) => Err(state.error(e).await),
    }
}

async fn reset(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    state.session.reset().await;
    Json(state.session.snapshot().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use payguide_core::{Catalog, Classifier, ImageBuffer};
    use payguide_media::{encode_base64, UploadPolicy};
    use payguide_session::Presenter;
    use payguide_tts::{SilentSoundPlayer, SilentSpeech};
    use tower::util::ServiceExt;

    struct FixedClassifier(&'static str);

    #[async_trait]
    impl Classifier for FixedClassifier {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn classify(&self, _image: &ImageBuffer) -> Result<String, ScanError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingClassifier;

    #[async_trait]
    impl Classifier for FailingClassifier {
        fn name(&self) -> &str {
            "failing"
        }

        async fn classify(&self, _image: &ImageBuffer) -> Result<String, ScanError> {
            Err(ScanError::ClassificationService("HTTP 500".into()))
        }
    }

    fn app_with(classifier: Arc<dyn Classifier>) -> Router {
        let presenter = Presenter::new(
            Arc::new(Catalog::builtin()),
            Arc::new(SilentSpeech),
            Arc::new(SilentSoundPlayer),
        );
        let session = ScanSession::new(classifier, presenter, UploadPolicy::default(), Language::En);
        build_router(Arc::new(AppState { session: Arc::new(session) }))
    }

    fn app() -> Router {
        app_with(Arc::new(FixedClassifier("₦500 - Nigerian Naira")))
    }

    fn post(uri: &str, content_type: &str, body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", content_type)
            .body(body.into())
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0xFF, 0xD9];

    #[tokio::test]
    async fn health_reports_ok() {
        let response = app().oneshot(get("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["service"], "payguide");
    }

    #[tokio::test]
    async fn raw_image_upload_is_classified() {
        let response = app().oneshot(post("/api/scan", "image/jpeg", JPEG)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "presented");
        assert_eq!(body["label"]["value"], "500");
        assert_eq!(body["message"], "₦500 - Nigerian Naira");
    }

    #[tokio::test]
    async fn data_url_upload_is_classified() {
        let payload = json!({ "dataUrl": format!("data:image/jpeg;base64,{}", encode_base64(JPEG)) });
        let response = app()
            .oneshot(post("/api/scan", "application/json", payload.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["label"]["value"], "500");
    }

    #[tokio::test]
    async fn non_image_upload_is_bad_request() {
        let response = app().oneshot(post("/api/scan", "text/plain", "hello")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "invalid_file");
        assert_eq!(body["message"], "Please choose an image file.");
    }

    #[tokio::test]
    async fn malformed_data_url_is_recorded_in_state() {
        let app = app();
        let response = app
            .clone()
            .oneshot(post("/api/scan", "application/json", r#"{"dataUrl":"not a data url"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "invalid_file");

        let state = json_body(app.oneshot(get("/api/state")).await.unwrap()).await;
        assert_eq!(state["phase"], "errored");
        assert_eq!(state["display"]["kind"], "error");
        assert_eq!(state["display"]["message"], "Please choose an image file.");
    }

    #[tokio::test]
    async fn oversized_upload_reaches_size_check() {
        let mut big = JPEG.to_vec();
        big.resize(MAX_UPLOAD_BYTES + 1, 0);
        let response = app().oneshot(post("/api/scan", "image/jpeg", big)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "file_too_large");
    }

    #[tokio::test]
    async fn classifier_failure_is_bad_gateway() {
        let response = app_with(Arc::new(FailingClassifier))
            .oneshot(post("/api/scan", "image/jpeg", JPEG))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(response).await["error"], "service_error");
    }

    #[tokio::test]
    async fn language_switch_changes_strings() {
        let app = app();
        let response = app
            .clone()
            .oneshot(post("/api/language", "application/json", r#"{"language":"yo"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(app.oneshot(get("/api/strings")).await.unwrap()).await;
        assert_eq!(body["language"], "yo");
        assert_eq!(body["strings"]["back"], "Pada");
    }

    #[tokio::test]
    async fn unknown_language_is_unprocessable() {
        let response = app()
            .oneshot(post("/api/language", "application/json", r#"{"language":"fr"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["error"], "unsupported_language");
    }

    #[tokio::test]
    async fn camera_without_device_is_unavailable() {
        let response = app()
            .oneshot(post("/api/camera/start", "application/json", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn reset_returns_idle_state() {
        let app = app();
        app.clone().oneshot(post("/api/scan", "text/plain", "x")).await.unwrap();
        let state = json_body(app.clone().oneshot(get("/api/state")).await.unwrap()).await;
        assert_eq!(state["phase"], "errored");

        let body = json_body(app.oneshot(post("/api/reset", "application/json", "")).await.unwrap()).await;
        assert_eq!(body["phase"], "idle");
        assert!(body["display"].is_null());
    }

    #[tokio::test]
    async fn languages_are_listed() {
        let body = json_body(app().oneshot(get("/api/languages")).await.unwrap()).await;
        assert_eq!(body["languages"].as_array().unwrap().len(), 4);
    }
}
