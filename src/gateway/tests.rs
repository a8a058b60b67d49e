use super::*;
use crate::error::ClientError;
use crate::session::{MemoryCredentialStorage, SessionStore};
use axum::{
    extract::{Form, Multipart, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Router,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::{net::TcpListener, sync::Mutex};

const VALID_TOKEN: &str = "tok-priya";

#[derive(Debug, Clone)]
struct ReceivedUpload {
    path: &'static str,
    field: String,
    file_name: Option<String>,
    content_type: Option<String>,
    len: usize,
    authorization: Option<String>,
}

#[derive(Clone)]
struct Backend {
    tasks_body: Arc<Mutex<String>>,
    analysis_status: Arc<Mutex<StatusCode>>,
    analysis_body: Arc<Mutex<String>>,
    analysis_delay: Arc<Mutex<Duration>>,
    uploads: Arc<Mutex<Vec<ReceivedUpload>>>,
    token_form: Arc<Mutex<Option<HashMap<String, String>>>>,
}

impl Default for Backend {
    fn default() -> Self {
        Self {
            tasks_body: Arc::new(Mutex::new(
                r#"[{"id": 1, "description": "Send deck", "due_date_str": "Friday", "status": "To Do"},
                    {"id": 2, "description": "Review budget", "due_date_str": "Monday", "status": "Done"}]"#
                    .to_string(),
            )),
            analysis_status: Arc::new(Mutex::new(StatusCode::OK)),
            analysis_body: Arc::new(Mutex::new(
                r#"{"meeting_info": {"id": 1, "filename": "standup.wav"},
                    "results": {"minutes": "Discussed roadmap.",
                                "tasks": [{"task_description": "Follow up", "assignee": "Priya", "due_date": "2024-01-10"}]}}"#
                    .to_string(),
            )),
            analysis_delay: Arc::new(Mutex::new(Duration::ZERO)),
            uploads: Arc::new(Mutex::new(Vec::new())),
            token_form: Arc::new(Mutex::new(None)),
        }
    }
}

fn authorization(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn is_authorized(headers: &HeaderMap) -> bool {
    authorization(headers).as_deref() == Some(format!("Bearer {VALID_TOKEN}").as_str())
}

async fn handle_token(
    State(backend): State<Backend>,
    Form(form): Form<HashMap<String, String>>,
) -> (StatusCode, String) {
    let ok = form.get("username").map(String::as_str) == Some("priya")
        && form.get("password").map(String::as_str) == Some("pass123");
    *backend.token_form.lock().await = Some(form);

    if ok {
        (
            StatusCode::OK,
            format!(r#"{{"access_token": "{VALID_TOKEN}", "token_type": "bearer"}}"#),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            r#"{"detail": "Incorrect username or password"}"#.to_string(),
        )
    }
}

async fn handle_me(headers: HeaderMap) -> (StatusCode, String) {
    if is_authorized(&headers) {
        (StatusCode::OK, r#"{"id": 1, "username": "priya"}"#.to_string())
    } else {
        (StatusCode::UNAUTHORIZED, r#"{"detail": "expired"}"#.to_string())
    }
}

async fn handle_tasks(State(backend): State<Backend>, headers: HeaderMap) -> (StatusCode, String) {
    if is_authorized(&headers) {
        (StatusCode::OK, backend.tasks_body.lock().await.clone())
    } else {
        (StatusCode::UNAUTHORIZED, r#"{"detail": "expired"}"#.to_string())
    }
}

async fn record_upload(
    backend: &Backend,
    path: &'static str,
    headers: &HeaderMap,
    mut multipart: Multipart,
) {
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let len = field.bytes().await.map(|b| b.len()).unwrap_or(0);
        backend.uploads.lock().await.push(ReceivedUpload {
            path,
            field: name,
            file_name,
            content_type,
            len,
            authorization: authorization(headers),
        });
    }
}

async fn respond_analysis(backend: &Backend) -> (StatusCode, String) {
    let delay = *backend.analysis_delay.lock().await;
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    (
        *backend.analysis_status.lock().await,
        backend.analysis_body.lock().await.clone(),
    )
}

async fn handle_process_audio(
    State(backend): State<Backend>,
    headers: HeaderMap,
    multipart: Multipart,
) -> (StatusCode, String) {
    record_upload(&backend, PROCESS_AUDIO_PATH, &headers, multipart).await;
    respond_analysis(&backend).await
}

async fn handle_process_meeting(
    State(backend): State<Backend>,
    headers: HeaderMap,
    multipart: Multipart,
) -> (StatusCode, String) {
    record_upload(&backend, PROCESS_MEETING_PATH, &headers, multipart).await;
    if !is_authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, r#"{"detail": "expired"}"#.to_string());
    }
    respond_analysis(&backend).await
}

async fn spawn_backend() -> (String, Backend) {
    let backend = Backend::default();
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");

    let app = Router::new()
        .route(TOKEN_PATH, post(handle_token))
        .route(PROFILE_PATH, get(handle_me))
        .route(TASKS_PATH, get(handle_tasks))
        .route(PROCESS_AUDIO_PATH, post(handle_process_audio))
        .route(PROCESS_MEETING_PATH, post(handle_process_meeting))
        .with_state(backend.clone());

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{addr}"), backend)
}

fn gateway(base_url: &str) -> HttpGateway {
    HttpGateway::new(base_url, Duration::from_secs(5), Duration::from_secs(5))
}

fn credential(token: &str) -> Credential {
    SessionStore::open(MemoryCredentialStorage::new(), "token").login(token)
}

fn recording() -> AudioFile {
    AudioFile::new("standup.wav", b"RIFF0000WAVEfmt ".to_vec())
}

#[tokio::test]
async fn authenticate_sends_form_encoded_credentials() {
    let (url, backend) = spawn_backend().await;

    let token = gateway(&url).authenticate("priya", "pass123").await.unwrap();
    assert_eq!(token, VALID_TOKEN);

    let form = backend.token_form.lock().await.clone().unwrap();
    assert_eq!(form.get("username").map(String::as_str), Some("priya"));
    assert_eq!(form.get("password").map(String::as_str), Some("pass123"));
}

#[tokio::test]
async fn authenticate_rejections_are_indistinguishable() {
    let (url, _backend) = spawn_backend().await;
    let gateway = gateway(&url);

    let wrong_password = gateway.authenticate("priya", "nope").await.unwrap_err();
    let wrong_user = gateway.authenticate("mallory", "pass123").await.unwrap_err();

    assert_eq!(wrong_password, ClientError::InvalidCredentials);
    assert_eq!(wrong_user, wrong_password);
    assert_eq!(wrong_user.to_string(), wrong_password.to_string());
}

#[tokio::test]
async fn authenticate_unreachable_backend_is_invalid_credentials() {
    // Bind then drop to get a port nothing listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = gateway(&format!("http://{addr}"))
        .authenticate("priya", "pass123")
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::InvalidCredentials);
}

#[tokio::test]
async fn authenticate_blank_fields_never_reach_network() {
    let (url, backend) = spawn_backend().await;

    let err = gateway(&url).authenticate("  ", "pass123").await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert!(backend.token_form.lock().await.is_none());
}

#[tokio::test]
async fn fetch_profile_and_tasks_with_valid_token() {
    let (url, _backend) = spawn_backend().await;
    let gateway = gateway(&url);
    let credential = credential(VALID_TOKEN);

    let profile = gateway.fetch_profile(&credential).await.unwrap();
    assert_eq!(profile.username, "priya");

    let tasks = gateway.fetch_tasks(&credential).await.unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].description, "Send deck");
    assert_eq!(tasks[0].status, TaskStatus::Pending);
    assert_eq!(tasks[1].status, TaskStatus::Done);
}

#[tokio::test]
async fn fetches_with_stale_token_are_auth_expired() {
    let (url, _backend) = spawn_backend().await;
    let gateway = gateway(&url);
    let stale = credential("tok-revoked");

    assert_eq!(
        gateway.fetch_profile(&stale).await.unwrap_err(),
        ClientError::AuthExpired
    );
    assert_eq!(
        gateway.fetch_tasks(&stale).await.unwrap_err(),
        ClientError::AuthExpired
    );
}

#[tokio::test]
async fn malformed_task_list_is_auth_expired() {
    let (url, backend) = spawn_backend().await;
    *backend.tasks_body.lock().await = r#"{"tasks": []}"#.to_string();

    let err = gateway(&url)
        .fetch_tasks(&credential(VALID_TOKEN))
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::AuthExpired);
}

#[tokio::test]
async fn duplicate_task_ids_are_rejected() {
    let (url, backend) = spawn_backend().await;
    *backend.tasks_body.lock().await =
        r#"[{"id": 1, "description": "a"}, {"id": 1, "description": "b"}]"#.to_string();

    let err = gateway(&url)
        .fetch_tasks(&credential(VALID_TOKEN))
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::AuthExpired);
}

#[tokio::test]
async fn stateless_analysis_uploads_multipart_file() {
    let (url, backend) = spawn_backend().await;

    let result = gateway(&url)
        .analyze(recording(), &AnalysisTarget::Stateless)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(result.minutes.as_deref(), Some("Discussed roadmap."));
    assert_eq!(result.tasks.len(), 1);
    assert_eq!(result.tasks[0].assignee, "Priya");

    let uploads = backend.uploads.lock().await.clone();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].path, PROCESS_AUDIO_PATH);
    assert_eq!(uploads[0].field, "file");
    assert_eq!(uploads[0].file_name.as_deref(), Some("standup.wav"));
    assert_eq!(uploads[0].content_type.as_deref(), Some("audio/wav"));
    assert_eq!(uploads[0].len, 16);
    assert!(uploads[0].authorization.is_none());
}

#[tokio::test]
async fn meeting_analysis_sends_bearer_token() {
    let (url, backend) = spawn_backend().await;
    *backend.analysis_body.lock().await = r#"{"message": "Meeting processed"}"#.to_string();

    let result = gateway(&url)
        .analyze(recording(), &AnalysisTarget::Meeting(credential(VALID_TOKEN)))
        .await
        .unwrap();
    assert!(result.is_none());

    let uploads = backend.uploads.lock().await.clone();
    assert_eq!(uploads[0].path, PROCESS_MEETING_PATH);
    assert_eq!(
        uploads[0].authorization.as_deref(),
        Some("Bearer tok-priya")
    );
}

#[tokio::test]
async fn meeting_analysis_with_stale_token_is_upload_failed() {
    let (url, _backend) = spawn_backend().await;

    let err = gateway(&url)
        .analyze(recording(), &AnalysisTarget::Meeting(credential("tok-revoked")))
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::UploadFailed);
}

#[tokio::test]
async fn analysis_server_error_is_upload_failed() {
    let (url, backend) = spawn_backend().await;
    *backend.analysis_status.lock().await = StatusCode::INTERNAL_SERVER_ERROR;
    *backend.analysis_body.lock().await =
        r#"{"detail": "An error occurred: quota exceeded"}"#.to_string();

    let err = gateway(&url)
        .analyze(recording(), &AnalysisTarget::Stateless)
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::UploadFailed);
    assert!(!err.to_string().contains("quota"));
}

#[tokio::test]
async fn analysis_shape_mismatch_is_upload_failed() {
    let (url, backend) = spawn_backend().await;
    *backend.analysis_body.lock().await = r#"{"minutes": "no envelope"}"#.to_string();

    let err = gateway(&url)
        .analyze(recording(), &AnalysisTarget::Stateless)
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::UploadFailed);
}

#[tokio::test]
async fn analysis_timeout_is_upload_failed() {
    let (url, backend) = spawn_backend().await;
    *backend.analysis_delay.lock().await = Duration::from_secs(3);

    let gateway = HttpGateway::new(&url, Duration::from_secs(5), Duration::from_millis(200));
    let err = gateway
        .analyze(recording(), &AnalysisTarget::Stateless)
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::UploadFailed);
}
