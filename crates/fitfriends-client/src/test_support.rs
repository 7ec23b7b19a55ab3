//! Mock FitFriends API and token helpers shared by the unit tests

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use fitfriends_auth::{TokenStore, unix_now_millis};
use serde_json::{Value, json};

use crate::client::{ApiClient, ClientConfig};

static NONCE: AtomicU64 = AtomicU64::new(0);

/// Unsigned compact JWT carrying `claims`.
pub fn token_with_claims(claims: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

/// Token whose `exp` lies `secs` from now (negative for the past).
pub fn token_expiring_in(secs: i64) -> String {
    let exp = (unix_now_millis() / 1000) as i64 + secs;
    token_with_claims(json!({
        "exp": exp,
        "sub": 1,
        "jti": NONCE.fetch_add(1, Ordering::Relaxed),
    }))
}

pub fn token_without_exp() -> String {
    token_with_claims(json!({"sub": 1, "jti": NONCE.fetch_add(1, Ordering::Relaxed)}))
}

/// Status codes and delays the mock answers with.
#[derive(Debug, Clone)]
pub struct MockOptions {
    pub refresh_status: u16,
    pub refresh_delay: Duration,
    pub register_status: u16,
    pub login_status: u16,
    pub check_status: u16,
    pub update_status: u16,
    pub upload_status: u16,
    pub logout_status: u16,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            refresh_status: 200,
            refresh_delay: Duration::ZERO,
            register_status: 201,
            login_status: 200,
            check_status: 200,
            update_status: 200,
            upload_status: 201,
            logout_status: 204,
        }
    }
}

/// Headers seen by `GET /echo`.
#[derive(Debug, Clone, Default)]
pub struct EchoSeen {
    pub authorization: Option<String>,
    pub request_id: Option<String>,
    pub client_header: Option<String>,
}

pub struct MockState {
    pub options: MockOptions,
    /// Pair handed out by a successful refresh
    pub fresh_access: String,
    pub fresh_refresh: String,
    pub refresh_calls: AtomicUsize,
    pub register_calls: AtomicUsize,
    pub login_calls: AtomicUsize,
    pub check_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub register_body: Mutex<Option<Value>>,
    pub update_body: Mutex<Option<Value>>,
    pub upload_content_type: Mutex<String>,
    pub last_echo: Mutex<Option<EchoSeen>>,
    /// Role of the last registered user; the profile endpoints answer with it
    role: Mutex<String>,
}

pub struct MockApi {
    pub url: String,
    pub state: Arc<MockState>,
}

impl MockApi {
    pub async fn start(options: MockOptions) -> Self {
        let state = Arc::new(MockState {
            options,
            fresh_access: token_expiring_in(3600),
            fresh_refresh: token_expiring_in(7200),
            refresh_calls: AtomicUsize::new(0),
            register_calls: AtomicUsize::new(0),
            login_calls: AtomicUsize::new(0),
            check_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            register_body: Mutex::new(None),
            update_body: Mutex::new(None),
            upload_content_type: Mutex::new(String::new()),
            last_echo: Mutex::new(None),
            role: Mutex::new(String::from("пользователь")),
        });

        let app = axum::Router::new()
            .route("/auth/refresh", post(refresh))
            .route("/auth/register", post(register))
            .route("/auth/login", post(login))
            .route("/auth/check", get(check))
            .route("/auth/logout", post(logout))
            .route("/users/update", patch(update_user))
            .route("/files/upload/img", post(upload))
            .route("/echo", get(echo))
            .route("/slow", get(slow))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}"),
            state,
        }
    }

    /// Config pointing at this mock with a generous timeout.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.url.clone(),
            timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }
}

/// Client over an in-memory store talking to `api`.
pub fn test_client(api: &MockApi) -> ApiClient {
    ApiClient::connect(api.client_config(), Arc::new(TokenStore::in_memory())).unwrap()
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap()
}

fn rejected(code: u16) -> Response {
    (status(code), Json(json!({"message": "rejected"}))).into_response()
}

fn user_json(state: &MockState, avatar: Option<&str>) -> Value {
    let role = state.role.lock().unwrap().clone();
    let mut user = json!({
        "id": 1,
        "name": "Анна",
        "email": "anna@fit.ru",
        "role": role,
    });
    if let Some(avatar) = avatar {
        user["avatar"] = json!(avatar);
    }
    user
}

fn logged_user_json(state: &MockState) -> Value {
    let mut user = user_json(state, None);
    user["access_token"] = json!(token_expiring_in(3600));
    user["refresh_token"] = json!(token_expiring_in(7200));
    user
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

async fn refresh(State(state): State<Arc<MockState>>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(state.options.refresh_delay).await;
    if state.options.refresh_status != 200 {
        return rejected(state.options.refresh_status);
    }
    Json(json!({
        "access_token": state.fresh_access,
        "refresh_token": state.fresh_refresh,
    }))
    .into_response()
}

async fn register(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.register_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(role) = body["role"].as_str() {
        *state.role.lock().unwrap() = role.to_owned();
    }
    *state.register_body.lock().unwrap() = Some(body);
    if !(200..300).contains(&state.options.register_status) {
        return rejected(state.options.register_status);
    }
    (
        status(state.options.register_status),
        Json(logged_user_json(&state)),
    )
        .into_response()
}

async fn login(State(state): State<Arc<MockState>>) -> Response {
    state.login_calls.fetch_add(1, Ordering::SeqCst);
    if state.options.login_status != 200 {
        return rejected(state.options.login_status);
    }
    Json(logged_user_json(&state)).into_response()
}

async fn check(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.check_calls.fetch_add(1, Ordering::SeqCst);
    let has_bearer = header(&headers, "authorization").is_some_and(|v| v.starts_with("Bearer "));
    if !has_bearer {
        return rejected(401);
    }
    if state.options.check_status != 200 {
        return rejected(state.options.check_status);
    }
    Json(user_json(&state, None)).into_response()
}

async fn logout(State(state): State<Arc<MockState>>) -> Response {
    state.logout_calls.fetch_add(1, Ordering::SeqCst);
    if !(200..300).contains(&state.options.logout_status) {
        return rejected(state.options.logout_status);
    }
    status(state.options.logout_status).into_response()
}

async fn update_user(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.update_calls.fetch_add(1, Ordering::SeqCst);
    let avatar = body["avatar"].as_str().map(str::to_owned);
    *state.update_body.lock().unwrap() = Some(body);
    if state.options.update_status != 200 {
        return rejected(state.options.update_status);
    }
    Json(user_json(&state, avatar.as_deref())).into_response()
}

async fn upload(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    state.upload_calls.fetch_add(1, Ordering::SeqCst);
    *state.upload_content_type.lock().unwrap() =
        header(&headers, "content-type").unwrap_or_default();

    let mut file_name = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            file_name = field.file_name().map(str::to_owned);
        }
    }
    if !(200..300).contains(&state.options.upload_status) {
        return rejected(state.options.upload_status);
    }
    match file_name {
        Some(name) => (
            status(state.options.upload_status),
            Json(json!({"path": format!("/upload/{name}")})),
        )
            .into_response(),
        None => rejected(400),
    }
}

async fn echo(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Json<Value> {
    *state.last_echo.lock().unwrap() = Some(EchoSeen {
        authorization: header(&headers, "authorization"),
        request_id: header(&headers, "x-request-id"),
        client_header: header(&headers, "x-client"),
    });
    Json(json!({"ok": true}))
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_millis(500)).await;
    "late"
}
