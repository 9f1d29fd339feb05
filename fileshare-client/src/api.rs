//! Typed backend operations over the request gateway

use fileshare_core::{
    CanonicalQuery, ClientError, Credentials, FormData, Identity, PageResult, Result, StoredFile,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::events::EventBus;
use crate::gateway::{Gateway, Payload, Request};

/// Plain `{ "message": ... }` acknowledgement
#[derive(Debug, Deserialize)]
struct Ack {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct AddedFile {
    file: StoredFile,
}

fn decode<T: DeserializeOwned>(payload: Payload) -> Result<T> {
    match payload {
        Payload::Json(value) => {
            serde_json::from_value(value).map_err(|e| ClientError::InvalidResponse(e.to_string()))
        }
        Payload::Saved { filename } => Err(ClientError::InvalidResponse(format!(
            "expected JSON, got file '{}'",
            filename
        ))),
    }
}

fn message(payload: Payload) -> Result<String> {
    decode::<Ack>(payload).map(|ack| ack.message)
}

/// The backend contract, one method per endpoint
pub struct Api {
    gateway: Gateway,
}

impl Api {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub fn base_url(&self) -> &str {
        self.gateway.base_url()
    }

    pub fn events(&self) -> &EventBus {
        self.gateway.events()
    }

    /// POST /login
    pub async fn login(&self, email: &str, password: &str) -> Result<Credentials> {
        let body = json!({ "email": email, "password": password });
        decode(self.gateway.send("/login", Request::post().json(body)).await?)
    }

    /// POST /register
    pub async fn register(&self, form: FormData) -> Result<Credentials> {
        decode(self.gateway.send("/register", Request::post().multipart(form)).await?)
    }

    /// GET /me
    pub async fn me(&self, token: &str) -> Result<Identity> {
        decode(self.gateway.send("/me", Request::get().token(token)).await?)
    }

    /// GET /users with the canonical query
    pub async fn list_users(&self, query: &CanonicalQuery, token: &str) -> Result<PageResult> {
        let request = Request::get().query(query.to_pairs()).token(token);
        decode(self.gateway.send("/users", request).await?)
    }

    /// POST /upload, every file under `files_to_upload`
    pub async fn upload_files(&self, form: FormData, token: &str) -> Result<String> {
        message(
            self.gateway
                .send("/upload", Request::post().multipart(form).token(token))
                .await?,
        )
    }

    /// GET /my-files
    pub async fn my_files(&self, token: &str) -> Result<Vec<StoredFile>> {
        decode(self.gateway.send("/my-files", Request::get().token(token)).await?)
    }

    /// PUT /my-profile
    pub async fn update_my_profile(&self, body: Value, token: &str) -> Result<Identity> {
        decode(
            self.gateway
                .send("/my-profile", Request::put().json(body).token(token))
                .await?,
        )
    }

    /// POST /my-profile/pic
    pub async fn update_my_profile_pic(&self, form: FormData, token: &str) -> Result<Identity> {
        decode(
            self.gateway
                .send("/my-profile/pic", Request::post().multipart(form).token(token))
                .await?,
        )
    }

    /// GET /file/{id}; returns the saved filename
    pub async fn download_file(&self, file_id: &str, token: &str) -> Result<String> {
        let endpoint = format!("/file/{}", file_id);
        match self
            .gateway
            .send(&endpoint, Request::get().token(token).binary())
            .await?
        {
            Payload::Saved { filename } => Ok(filename),
            Payload::Json(_) => Err(ClientError::InvalidResponse(
                "expected a file download".to_string(),
            )),
        }
    }

    /// POST /users (staff roles only)
    pub async fn create_staff(&self, body: Value, token: &str) -> Result<Identity> {
        decode(
            self.gateway
                .send("/users", Request::post().json(body).token(token))
                .await?,
        )
    }

    /// PUT /users/{id}
    pub async fn update_staff(&self, id: &str, body: Value, token: &str) -> Result<Identity> {
        let endpoint = format!("/users/{}", id);
        decode(
            self.gateway
                .send(&endpoint, Request::put().json(body).token(token))
                .await?,
        )
    }

    /// DELETE /staff/{id}
    pub async fn delete_staff(&self, id: &str, token: &str) -> Result<String> {
        let endpoint = format!("/staff/{}", id);
        message(self.gateway.send(&endpoint, Request::delete().token(token)).await?)
    }

    /// POST /admin/create-user
    pub async fn admin_create_user(&self, form: FormData, token: &str) -> Result<Identity> {
        decode(
            self.gateway
                .send("/admin/create-user", Request::post().multipart(form).token(token))
                .await?,
        )
    }

    /// POST /admin/update-user/{id}
    pub async fn admin_update_user(&self, id: &str, form: FormData, token: &str) -> Result<Identity> {
        let endpoint = format!("/admin/update-user/{}", id);
        decode(
            self.gateway
                .send(&endpoint, Request::post().multipart(form).token(token))
                .await?,
        )
    }

    /// DELETE /users/{id}
    pub async fn delete_user(&self, id: &str, token: &str) -> Result<String> {
        let endpoint = format!("/users/{}", id);
        message(self.gateway.send(&endpoint, Request::delete().token(token)).await?)
    }

    /// POST /admin/user/{id}/file, single file under `file`
    pub async fn admin_add_file(&self, user_id: &str, form: FormData, token: &str) -> Result<StoredFile> {
        let endpoint = format!("/admin/user/{}/file", user_id);
        let added: AddedFile = decode(
            self.gateway
                .send(&endpoint, Request::post().multipart(form).token(token))
                .await?,
        )?;
        Ok(added.file)
    }

    /// DELETE /admin/user/file/{id}
    pub async fn admin_delete_file(&self, file_id: &str, token: &str) -> Result<String> {
        let endpoint = format!("/admin/user/file/{}", file_id);
        message(self.gateway.send(&endpoint, Request::delete().token(token)).await?)
    }
}
