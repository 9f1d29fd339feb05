//! Common test utilities for client integration tests
//!
//! [`MockBackend`] serves the fileshare REST contract from memory on a local
//! port, records every request, and can hold back chosen responses to
//! exercise out-of-order completion.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::extract::{Multipart, Path, Query, Request, State};
use axum::http::header::{AUTHORIZATION, CONTENT_DISPOSITION};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use fileshare_client::{
    Api, Config, EventBus, Gateway, InMemoryStore, KeyValueStore, MemorySink, SessionMachine,
};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const EMPLOYEE_EMAIL: &str = "employee@example.com";
pub const PASSWORD: &str = "password123";

/// Search debounce used by integration tests
pub const DEBOUNCE_MS: u64 = 50;

#[derive(Debug, Clone)]
pub struct MockFile {
    pub id: String,
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct MockUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub account_type: String,
    pub needs_sensitive_storage: bool,
    pub created_date: String,
    pub profile_pic: Option<String>,
    pub email_notifications: bool,
    pub files: Vec<MockFile>,
}

impl MockUser {
    fn to_json(&self) -> Value {
        let gallery: Vec<Value> = self
            .files
            .iter()
            .map(|f| json!({ "id": f.id, "filename": f.filename }))
            .collect();
        json!({
            "id": self.id,
            "name": self.name,
            "email": self.email,
            "role": self.role,
            "account_type": self.account_type,
            "profile_pic": self.profile_pic,
            "created_date": self.created_date,
            "needs_sensitive_storage": self.needs_sensitive_storage,
            "email_notifications": self.email_notifications,
            "gallery": gallery,
        })
    }
}

/// One request as the backend saw it
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub auth: Option<String>,
}

#[derive(Default)]
struct Data {
    users: Vec<MockUser>,
    requests: Vec<Recorded>,
    bodies: Vec<(String, Value)>,
    next_id: u64,
    path_delays: HashMap<String, Duration>,
    page_delays: HashMap<u32, Duration>,
    path_failures: HashMap<String, String>,
}

#[derive(Default)]
pub struct MockState {
    data: Mutex<Data>,
}

impl MockState {
    fn data(&self) -> MutexGuard<'_, Data> {
        self.data.lock().unwrap()
    }

    fn next_id(&self) -> u64 {
        let mut data = self.data();
        data.next_id += 1;
        data.next_id
    }

    /// Add an account; returns its id
    pub fn add_user(
        &self,
        name: &str,
        email: &str,
        role: &str,
        account_type: &str,
        needs_sensitive_storage: bool,
        created_date: &str,
    ) -> String {
        let id = self.next_id().to_string();
        self.data().users.push(MockUser {
            id: id.clone(),
            name: name.to_string(),
            email: email.to_string(),
            password: PASSWORD.to_string(),
            role: role.to_string(),
            account_type: account_type.to_string(),
            needs_sensitive_storage,
            created_date: created_date.to_string(),
            profile_pic: None,
            email_notifications: false,
            files: Vec::new(),
        });
        id
    }

    /// Add a file to a user's gallery; returns the file id
    pub fn add_file(&self, user_id: &str, filename: &str, bytes: &[u8]) -> String {
        let id = format!("f{}", self.next_id());
        let mut data = self.data();
        let user = data.users.iter_mut().find(|u| u.id == user_id).unwrap();
        user.files.push(MockFile {
            id: id.clone(),
            filename: filename.to_string(),
            bytes: bytes.to_vec(),
        });
        id
    }

    pub fn user(&self, id: &str) -> Option<MockUser> {
        self.data().users.iter().find(|u| u.id == id).cloned()
    }

    pub fn user_by_email(&self, email: &str) -> Option<MockUser> {
        self.data().users.iter().find(|u| u.email == email).cloned()
    }

    pub fn token_for(&self, email: &str) -> String {
        token(&self.user_by_email(email).unwrap().id)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.data().requests.clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    /// Every `GET /users` query, oldest first
    pub fn user_queries(&self) -> Vec<HashMap<String, String>> {
        self.requests_to("GET", "/users")
            .into_iter()
            .map(|r| r.query)
            .collect()
    }

    pub fn last_body(&self, path: &str) -> Option<Value> {
        self.data()
            .bodies
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .map(|(_, body)| body.clone())
    }

    /// Hold back every response for a path
    pub fn delay_path(&self, path: &str, delay: Duration) {
        self.data().path_delays.insert(path.to_string(), delay);
    }

    /// Answer every request to a path with a 500 and this message
    pub fn fail_path(&self, path: &str, message: &str) {
        self.data()
            .path_failures
            .insert(path.to_string(), message.to_string());
    }

    /// Hold back `GET /users` responses for one page
    pub fn delay_users_page(&self, page: u32, delay: Duration) {
        self.data().page_delays.insert(page, delay);
    }

    fn record_body(&self, path: &str, body: Value) {
        self.data().bodies.push((path.to_string(), body));
    }

    fn viewer(&self, headers: &HeaderMap) -> Option<MockUser> {
        let id = headers
            .get(AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer token-")?
            .to_string();
        self.user(&id)
    }
}

fn token(id: &str) -> String {
    format!("token-{}", id)
}

fn reply(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn fail(status: StatusCode, message: &str) -> Response {
    reply(status, json!({ "message": message }))
}

fn unauthorized() -> Response {
    fail(StatusCode::UNAUTHORIZED, "Invalid or expired token")
}

/// Resolve the viewer or return the rejection response
macro_rules! viewer {
    ($state:expr, $headers:expr) => {
        match $state.viewer(&$headers) {
            Some(user) => user,
            None => return unauthorized(),
        }
    };
}

macro_rules! admin {
    ($state:expr, $headers:expr) => {{
        let viewer = viewer!($state, $headers);
        if viewer.role != "admin" {
            return fail(StatusCode::FORBIDDEN, "Admin access required");
        }
        viewer
    }};
}

struct Parsed {
    fields: HashMap<String, String>,
    files: Vec<(String, String, Vec<u8>)>,
}

impl Parsed {
    fn to_json(&self) -> Value {
        let files: Vec<Value> = self
            .files
            .iter()
            .map(|(name, filename, _)| json!([name, filename]))
            .collect();
        let mut body = json!(self.fields);
        body["files"] = json!(files);
        body
    }

    fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or_default()
    }
}

async fn parse(mut multipart: Multipart) -> Parsed {
    let mut fields = HashMap::new();
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(filename) => {
                let bytes = field.bytes().await.unwrap().to_vec();
                files.push((name, filename, bytes));
            }
            None => {
                fields.insert(name, field.text().await.unwrap());
            }
        }
    }
    Parsed { fields, files }
}

fn validate(name: &str, email: &str) -> Option<Response> {
    let mut problems = Vec::new();
    if name.trim().is_empty() {
        problems.push("Name is required");
    }
    if !email.contains('@') {
        problems.push("A valid email is required");
    }
    (!problems.is_empty()).then(|| fail(StatusCode::BAD_REQUEST, &problems.join("\n")))
}

async fn record(State(state): State<Arc<MockState>>, request: Request, next: Next) -> Response {
    let query = Query::<HashMap<String, String>>::try_from_uri(request.uri())
        .map(|q| q.0)
        .unwrap_or_default();
    let path = request.uri().path().to_string();
    let auth = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let (delay, failure) = {
        let mut data = state.data();
        data.requests.push(Recorded {
            method: request.method().to_string(),
            path: path.clone(),
            query: query.clone(),
            auth,
        });
        let page_delay = match path.as_str() {
            "/users" => query
                .get("page")
                .and_then(|p| p.parse::<u32>().ok())
                .and_then(|p| data.page_delays.get(&p).copied()),
            _ => None,
        };
        (
            page_delay.or_else(|| data.path_delays.get(&path).copied()),
            data.path_failures.get(&path).cloned(),
        )
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    if let Some(message) = failure {
        return fail(StatusCode::INTERNAL_SERVER_ERROR, &message);
    }

    next.run(request).await
}

async fn login(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    match state.user_by_email(email) {
        Some(user) if user.password == password => reply(
            StatusCode::OK,
            json!({ "token": token(&user.id), "role": user.role, "message": "Login successful" }),
        ),
        _ => fail(StatusCode::UNAUTHORIZED, "Invalid credentials"),
    }
}

async fn register(State(state): State<Arc<MockState>>, multipart: Multipart) -> Response {
    let form = parse(multipart).await;
    state.record_body("/register", form.to_json());
    if let Some(rejection) = validate(form.field("name"), form.field("email")) {
        return rejection;
    }
    if state.user_by_email(form.field("email")).is_some() {
        return fail(StatusCode::BAD_REQUEST, "Email already registered");
    }

    let id = state.add_user(
        form.field("name"),
        form.field("email"),
        "user",
        form.field("account_type"),
        form.field("needs_sensitive_storage") == "true",
        "2024-06-01T12:00:00",
    );
    reply(
        StatusCode::CREATED,
        json!({ "token": token(&id), "role": "user", "message": "Registered" }),
    )
}

async fn me(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    let viewer = viewer!(state, headers);
    reply(StatusCode::OK, viewer.to_json())
}

fn csv(value: Option<&String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

async fn list_users(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let viewer = viewer!(state, headers);
    if viewer.role == "user" {
        return fail(StatusCode::FORBIDDEN, "Staff access required");
    }

    let page: usize = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let limit: usize = query.get("limit").and_then(|l| l.parse().ok()).unwrap_or(10);
    let search = query.get("search").cloned().unwrap_or_default().to_lowercase();
    let roles = csv(query.get("roles"));
    let account_types = csv(query.get("account_types"));
    let sensitivity = query.get("sensitivity").cloned().unwrap_or_else(|| "all".into());
    let start = query.get("start_date").cloned().unwrap_or_default();
    let end = query.get("end_date").cloned().unwrap_or_default();

    let mut rows: Vec<MockUser> = state
        .data()
        .users
        .iter()
        .filter(|u| roles.is_empty() || roles.contains(&u.role))
        .filter(|u| account_types.is_empty() || account_types.contains(&u.account_type))
        .filter(|u| match sensitivity.as_str() {
            "true" => u.needs_sensitive_storage,
            "false" => !u.needs_sensitive_storage,
            _ => true,
        })
        .filter(|u| {
            search.is_empty()
                || u.name.to_lowercase().contains(&search)
                || u.email.to_lowercase().contains(&search)
        })
        .filter(|u| {
            let day = &u.created_date[..10];
            (start.is_empty() || day >= start.as_str()) && (end.is_empty() || day <= end.as_str())
        })
        .cloned()
        .collect();

    let sort_by = query.get("sort_by").map(String::as_str).unwrap_or("name");
    rows.sort_by(|a, b| {
        let ord = match sort_by {
            "role" => a.role.cmp(&b.role),
            "created_date" => a.created_date.cmp(&b.created_date),
            _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        };
        ord.then_with(|| a.id.cmp(&b.id))
    });
    if query.get("sort_order").map(String::as_str) == Some("desc") {
        rows.reverse();
    }

    let total = rows.len();
    let total_pages = total.div_ceil(limit.max(1));
    let users: Vec<Value> = rows
        .iter()
        .skip((page.max(1) - 1) * limit)
        .take(limit)
        .map(MockUser::to_json)
        .collect();

    reply(
        StatusCode::OK,
        json!({
            "users": users,
            "total_pages": total_pages,
            "total_users": total,
            "current_page": page,
        }),
    )
}

async fn upload(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let viewer = viewer!(state, headers);
    let form = parse(multipart).await;
    state.record_body("/upload", form.to_json());

    let uploads: Vec<_> = form
        .files
        .iter()
        .filter(|(name, _, _)| name == "files_to_upload")
        .collect();
    if uploads.is_empty() {
        return fail(StatusCode::BAD_REQUEST, "No files were uploaded");
    }
    for (_, filename, bytes) in &uploads {
        state.add_file(&viewer.id, filename, bytes);
    }
    reply(
        StatusCode::OK,
        json!({ "message": format!("{} file(s) uploaded successfully", uploads.len()) }),
    )
}

async fn my_files(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    let viewer = viewer!(state, headers);
    reply(StatusCode::OK, viewer.to_json()["gallery"].clone())
}

async fn update_my_profile(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let viewer = viewer!(state, headers);
    state.record_body("/my-profile", body.clone());

    let mut data = state.data();
    let Some(user) = data.users.iter_mut().find(|u| u.id == viewer.id) else {
        return fail(StatusCode::NOT_FOUND, "User not found");
    };
    if let Some(name) = body["name"].as_str() {
        user.name = name.to_string();
    }
    if let Some(email) = body["email"].as_str() {
        user.email = email.to_string();
    }
    if let Some(notify) = body["email_notifications"].as_bool() {
        user.email_notifications = notify;
    }
    if let Some(password) = body["password"].as_str() {
        user.password = password.to_string();
    }
    reply(StatusCode::OK, user.to_json())
}

async fn update_my_profile_pic(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let viewer = viewer!(state, headers);
    let form = parse(multipart).await;
    state.record_body("/my-profile/pic", form.to_json());

    let Some((_, filename, bytes)) = form.files.iter().find(|(n, _, _)| n == "profile_pic") else {
        return fail(StatusCode::BAD_REQUEST, "No picture uploaded");
    };
    if bytes.is_empty() {
        return fail(StatusCode::BAD_REQUEST, "Invalid image");
    }

    let mut data = state.data();
    let Some(user) = data.users.iter_mut().find(|u| u.id == viewer.id) else {
        return fail(StatusCode::NOT_FOUND, "User not found");
    };
    user.profile_pic = Some(format!("/uploads/{}", filename));
    reply(StatusCode::OK, user.to_json())
}

async fn download(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(file_id): Path<String>,
) -> Response {
    viewer!(state, headers);
    let file = state
        .data()
        .users
        .iter()
        .flat_map(|u| u.files.iter())
        .find(|f| f.id == file_id)
        .cloned();
    let Some(file) = file else {
        return fail(StatusCode::NOT_FOUND, "File not found");
    };

    let mut response = file.bytes.into_response();
    if !file.filename.is_empty() {
        let disposition = format!("attachment; filename=\"{}\"", file.filename);
        response
            .headers_mut()
            .insert(CONTENT_DISPOSITION, HeaderValue::from_str(&disposition).unwrap());
    }
    response
}

async fn create_staff(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    admin!(state, headers);
    state.record_body("/users", body.clone());

    let name = body["name"].as_str().unwrap_or_default();
    let email = body["email"].as_str().unwrap_or_default();
    if let Some(rejection) = validate(name, email) {
        return rejection;
    }
    let role = body["role"].as_str().unwrap_or("employee");
    let id = state.add_user(name, email, role, "personal", false, "2024-06-01T12:00:00");
    reply(StatusCode::CREATED, state.user(&id).unwrap().to_json())
}

async fn update_staff(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    admin!(state, headers);
    state.record_body(&format!("/users/{}", id), body.clone());

    let mut data = state.data();
    let Some(user) = data.users.iter_mut().find(|u| u.id == id) else {
        return fail(StatusCode::NOT_FOUND, "User not found");
    };
    if let Some(name) = body["name"].as_str() {
        user.name = name.to_string();
    }
    if let Some(role) = body["role"].as_str() {
        user.role = role.to_string();
    }
    if let Some(password) = body["password"].as_str() {
        user.password = password.to_string();
    }
    reply(StatusCode::OK, user.to_json())
}

fn remove_user(state: &MockState, id: &str) -> Response {
    let mut data = state.data();
    let before = data.users.len();
    data.users.retain(|u| u.id != id);
    if data.users.len() == before {
        return fail(StatusCode::NOT_FOUND, "User not found");
    }
    reply(StatusCode::OK, json!({ "message": "User deleted successfully" }))
}

async fn delete_user(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    admin!(state, headers);
    remove_user(&state, &id)
}

async fn delete_staff(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    admin!(state, headers);
    remove_user(&state, &id)
}

async fn admin_create_user(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    admin!(state, headers);
    let form = parse(multipart).await;
    state.record_body("/admin/create-user", form.to_json());
    if let Some(rejection) = validate(form.field("name"), form.field("email")) {
        return rejection;
    }

    let id = state.add_user(
        form.field("name"),
        form.field("email"),
        "user",
        form.field("account_type"),
        form.field("needs_sensitive_storage") == "true",
        "2024-06-01T12:00:00",
    );
    reply(StatusCode::CREATED, state.user(&id).unwrap().to_json())
}

async fn admin_update_user(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Response {
    admin!(state, headers);
    let form = parse(multipart).await;
    state.record_body(&format!("/admin/update-user/{}", id), form.to_json());

    let mut data = state.data();
    let Some(user) = data.users.iter_mut().find(|u| u.id == id) else {
        return fail(StatusCode::NOT_FOUND, "User not found");
    };
    user.name = form.field("name").to_string();
    user.email = form.field("email").to_string();
    user.account_type = form.field("account_type").to_string();
    user.needs_sensitive_storage = form.field("needs_sensitive_storage") == "true";
    if let Some(password) = form.fields.get("password") {
        user.password = password.clone();
    }
    reply(StatusCode::OK, user.to_json())
}

async fn admin_add_file(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    multipart: Multipart,
) -> Response {
    admin!(state, headers);
    let form = parse(multipart).await;
    if state.user(&user_id).is_none() {
        return fail(StatusCode::NOT_FOUND, "User not found");
    }
    let Some((_, filename, bytes)) = form.files.iter().find(|(n, _, _)| n == "file") else {
        return fail(StatusCode::BAD_REQUEST, "No file uploaded");
    };

    let id = state.add_file(&user_id, filename, bytes);
    reply(
        StatusCode::CREATED,
        json!({ "message": "File added", "file": { "id": id, "filename": filename } }),
    )
}

async fn admin_delete_file(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(file_id): Path<String>,
) -> Response {
    admin!(state, headers);
    let mut data = state.data();
    let owner = data
        .users
        .iter_mut()
        .find(|u| u.files.iter().any(|f| f.id == file_id));
    let Some(owner) = owner else {
        return fail(StatusCode::NOT_FOUND, "File not found");
    };
    owner.files.retain(|f| f.id != file_id);
    reply(StatusCode::OK, json!({ "message": "File deleted successfully" }))
}

fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/me", get(me))
        .route("/users", get(list_users).post(create_staff))
        .route("/users/:id", put(update_staff).delete(delete_user))
        .route("/staff/:id", delete(delete_staff))
        .route("/upload", post(upload))
        .route("/my-files", get(my_files))
        .route("/my-profile", put(update_my_profile))
        .route("/my-profile/pic", post(update_my_profile_pic))
        .route("/file/:id", get(download))
        .route("/admin/create-user", post(admin_create_user))
        .route("/admin/update-user/:id", post(admin_update_user))
        .route("/admin/user/:id/file", post(admin_add_file))
        .route("/admin/user/file/:id", delete(admin_delete_file))
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state)
}

/// In-memory backend listening on a local port
pub struct MockBackend {
    pub url: String,
    pub state: Arc<MockState>,
}

impl MockBackend {
    /// Start a backend seeded with one admin and one employee
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        state.add_user("Alice Admin", ADMIN_EMAIL, "admin", "personal", false, "2023-01-01T09:00:00");
        state.add_user("Evan Employee", EMPLOYEE_EMAIL, "employee", "personal", false, "2023-02-01T09:00:00");

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            state,
        }
    }

    /// Seed `count` user accounts named "User 01", "User 02", ...
    ///
    /// Account types cycle through personal, professional, academic and
    /// management; every third user needs sensitive storage; each joined on
    /// a different day of 2024.
    pub fn seed_users(&self, count: usize) -> Vec<String> {
        const TYPES: [&str; 4] = ["personal", "professional", "academic", "management"];
        (1..=count)
            .map(|n| {
                self.state.add_user(
                    &format!("User {:02}", n),
                    &format!("user{:02}@example.com", n),
                    "user",
                    TYPES[(n - 1) % TYPES.len()],
                    n % 3 == 0,
                    &format!("2024-01-{:02}T10:00:00", n.min(28)),
                )
            })
            .collect()
    }
}

/// A client wired against a mock backend
pub struct TestClient {
    pub backend: MockBackend,
    pub config: Config,
    pub events: EventBus,
    pub sink: Arc<MemorySink>,
    pub store: Arc<InMemoryStore>,
    pub api: Arc<Api>,
    pub session: Arc<SessionMachine>,
}

impl TestClient {
    pub async fn start() -> Self {
        Self::with_backend(MockBackend::start().await)
    }

    pub fn with_backend(backend: MockBackend) -> Self {
        let config = Config {
            api_base_url: backend.url.clone(),
            request_timeout_secs: 5,
            search_debounce_ms: DEBOUNCE_MS,
            ..Config::default()
        };
        let events = EventBus::new();
        let sink = Arc::new(MemorySink::new());
        let store = Arc::new(InMemoryStore::new());
        let gateway = Gateway::new(&config, events.clone(), sink.clone()).unwrap();
        let api = Arc::new(Api::new(gateway));
        let session = Arc::new(SessionMachine::new(api.clone(), store.clone()));

        Self {
            backend,
            config,
            events,
            sink,
            store,
            api,
            session,
        }
    }

    /// A second client process sharing this one's persisted store
    pub fn reload(&self) -> Arc<SessionMachine> {
        let store: Arc<dyn KeyValueStore> = self.store.clone();
        Arc::new(SessionMachine::new(self.api.clone(), store))
    }

    pub fn state(&self) -> &MockState {
        &self.backend.state
    }
}

/// Poll a condition until it holds or a second passes
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
