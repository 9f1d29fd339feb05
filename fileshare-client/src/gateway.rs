//! Request gateway
//!
//! Every network call goes through [`Gateway::send`]. It attaches the bearer
//! token, encodes JSON or multipart bodies, hands binary downloads to the
//! download sink, and maps every failure onto [`ClientError`]. An
//! unauthorized response to a request that carried a token publishes
//! [`AppEvent::AuthInvalid`] before failing with `SessionExpired`.

use std::sync::Arc;

use fileshare_core::{ClientError, FormData, Result};
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;

use crate::config::Config;
use crate::download::{filename_from_disposition, DownloadSink};
use crate::events::{AppEvent, EventBus};

/// Request body
#[derive(Debug, Clone, Default)]
pub enum Body {
    #[default]
    Empty,
    Json(Value),
    Multipart(FormData),
}

/// One call through the gateway
#[derive(Debug, Clone)]
pub struct Request<'a> {
    pub method: Method,
    pub query: Vec<(&'static str, String)>,
    pub body: Body,
    pub token: Option<&'a str>,
    pub expect_binary: bool,
}

impl<'a> Request<'a> {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            query: Vec::new(),
            body: Body::Empty,
            token: None,
            expect_binary: false,
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Body::Json(body);
        self
    }

    pub fn multipart(mut self, form: FormData) -> Self {
        self.body = Body::Multipart(form);
        self
    }

    pub fn query(mut self, pairs: Vec<(&'static str, String)>) -> Self {
        self.query = pairs;
        self
    }

    pub fn token(mut self, token: &'a str) -> Self {
        self.token = Some(token);
        self
    }

    /// Expect a file in the response instead of JSON
    pub fn binary(mut self) -> Self {
        self.expect_binary = true;
        self
    }
}

/// Successful gateway result
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    /// A binary response was handed to the download sink
    Saved { filename: String },
}

pub struct Gateway {
    client: Client,
    base_url: String,
    events: EventBus,
    sink: Arc<dyn DownloadSink>,
}

impl Gateway {
    pub fn new(config: &Config, events: EventBus, sink: Arc<dyn DownloadSink>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ClientError::TransportFailure(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            events,
            sink,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Send a request and translate the response
    pub async fn send(&self, endpoint: &str, request: Request<'_>) -> Result<Payload> {
        let method = request.method.clone();
        let result = self.dispatch(endpoint, request).await;

        match &result {
            // Already surfaced through the auth-invalid notification
            Err(ClientError::SessionExpired) => {}
            Err(e) => tracing::error!(%method, endpoint, error = %e, "API request failed"),
            Ok(_) => tracing::debug!(%method, endpoint, "API request succeeded"),
        }

        result
    }

    async fn dispatch(&self, endpoint: &str, request: Request<'_>) -> Result<Payload> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut builder = self.client.request(request.method, &url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = request.token {
            builder = builder.bearer_auth(token);
        }

        // Multipart bodies get their content type (with boundary) from reqwest
        builder = match request.body {
            Body::Multipart(form) => builder.multipart(into_multipart(form)?),
            Body::Json(value) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(value.to_string()),
            Body::Empty => builder.header(CONTENT_TYPE, "application/json"),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::TransportFailure(format!("Request failed: {}", e)))?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED && request.token.is_some() {
            self.events.publish(AppEvent::AuthInvalid);
            return Err(ClientError::SessionExpired);
        }

        if request.expect_binary {
            if !status.is_success() {
                let message = response
                    .json::<Value>()
                    .await
                    .ok()
                    .and_then(|body| message_of(&body))
                    .unwrap_or_else(|| "File download failed".to_string());
                return Err(ClientError::RequestFailed(message));
            }

            let filename = filename_from_disposition(
                response
                    .headers()
                    .get(CONTENT_DISPOSITION)
                    .and_then(|v| v.to_str().ok()),
            );
            let bytes = response
                .bytes()
                .await
                .map_err(|e| ClientError::TransportFailure(format!("Download interrupted: {}", e)))?;
            self.sink.save(&filename, &bytes)?;
            return Ok(Payload::Saved { filename });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::TransportFailure(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<Value>(&bytes)
                .ok()
                .and_then(|body| message_of(&body));
            return Err(status_error(status, message));
        }

        serde_json::from_slice(&bytes)
            .map(Payload::Json)
            .map_err(|e| ClientError::TransportFailure(format!("Invalid JSON response: {}", e)))
    }
}

/// Map a non-success status and optional backend message to an error
pub fn status_error(status: StatusCode, message: Option<String>) -> ClientError {
    match message {
        Some(message) if status == StatusCode::BAD_REQUEST => ClientError::validation(&message),
        Some(message) => ClientError::RequestFailed(message),
        None => ClientError::RequestFailed(format!("HTTP error status {}", status.as_u16())),
    }
}

fn message_of(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

fn into_multipart(form: FormData) -> Result<Form> {
    let (fields, files) = form.into_parts();
    let mut multipart = Form::new();

    for (name, value) in fields {
        multipart = multipart.text(name, value);
    }
    for (name, file) in files {
        let mut part = Part::bytes(file.bytes).file_name(file.filename);
        if let Some(mime) = file.mime {
            part = part
                .mime_str(&mime)
                .map_err(|e| ClientError::TransportFailure(format!("Invalid MIME type: {}", e)))?;
        }
        multipart = multipart.part(name, part);
    }

    Ok(multipart)
}
