//! Mutation coordinator
//!
//! Runs admin create/update/delete operations for users, staff and files
//! against the backend, then brings the table back in line with the server:
//! creations reset the view (the new row may not match the current filters),
//! edits and deletions refetch under the unchanged query so the affected row
//! stays where the admin was looking.

use std::sync::Arc;

use fileshare_core::{FilePart, FormData, Result, StaffForm, StoredFile, UserForm};

use crate::dashboard::{Dashboard, ErrorArea};

pub const DELETE_USER_PROMPT: &str = "Are you sure you want to delete this user? This will also delete all their uploaded files and profile picture.";

pub const DELETE_STAFF_PROMPT: &str = "Are you sure you want to delete this staff account?";

/// Prompt shown before deleting a file from a user's gallery
pub fn delete_file_prompt(filename: &str) -> String {
    format!("Are you sure you want to delete this file?\n\n{}", filename)
}

/// Asks the person at the keyboard to confirm a destructive action
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Result of an operation guarded by a confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Cancelled,
}

pub struct MutationCoordinator {
    dashboard: Arc<Dashboard>,
    confirm: Arc<dyn Confirm>,
}

impl MutationCoordinator {
    pub fn new(dashboard: Arc<Dashboard>, confirm: Arc<dyn Confirm>) -> Self {
        Self { dashboard, confirm }
    }

    pub fn dashboard(&self) -> &Arc<Dashboard> {
        &self.dashboard
    }

    /// Create a staff account (`editing` is `None`) or update one
    pub async fn save_staff(&self, editing: Option<&str>, form: &StaffForm) -> Result<()> {
        self.dashboard.clear_error(ErrorArea::StaffForm);
        let api = self.dashboard.api();
        let token = self.dashboard.token();
        let body = form.to_json(editing.is_some());

        let result = match editing {
            None => api.create_staff(body, token).await,
            Some(id) => api.update_staff(id, body, token).await,
        };
        if let Err(e) = result {
            self.dashboard.report(ErrorArea::StaffForm, &e, None);
            return Err(e);
        }

        tracing::info!(id = editing, role = %form.role, "Staff account saved");
        self.after_save(editing.is_none()).await;
        Ok(())
    }

    /// Create a `user` account or update one, with an optional new picture
    pub async fn save_user(
        &self,
        editing: Option<&str>,
        form: &UserForm,
        profile_pic: Option<FilePart>,
    ) -> Result<()> {
        self.dashboard.clear_error(ErrorArea::UserForm);
        let api = self.dashboard.api();
        let token = self.dashboard.token();
        let data = form.to_form_data(editing.is_some(), profile_pic);

        let result = match editing {
            None => api.admin_create_user(data, token).await,
            Some(id) => api.admin_update_user(id, data, token).await,
        };
        if let Err(e) = result {
            self.dashboard.report(ErrorArea::UserForm, &e, None);
            return Err(e);
        }

        tracing::info!(id = editing, "User account saved");
        self.after_save(editing.is_none()).await;
        Ok(())
    }

    /// Delete a user together with their files and profile picture
    pub async fn delete_user(&self, id: &str) -> Result<Outcome> {
        if !self.confirm.confirm(DELETE_USER_PROMPT) {
            return Ok(Outcome::Cancelled);
        }

        let api = self.dashboard.api();
        if let Err(e) = api.delete_user(id, self.dashboard.token()).await {
            self.dashboard
                .report(ErrorArea::Table, &e, Some("Error deleting user"));
            return Err(e);
        }

        tracing::info!(id, "User deleted");
        self.refetch().await;
        Ok(Outcome::Done)
    }

    pub async fn delete_staff(&self, id: &str) -> Result<Outcome> {
        if !self.confirm.confirm(DELETE_STAFF_PROMPT) {
            return Ok(Outcome::Cancelled);
        }

        let api = self.dashboard.api();
        if let Err(e) = api.delete_staff(id, self.dashboard.token()).await {
            self.dashboard
                .report(ErrorArea::Table, &e, Some("Error deleting staff"));
            return Err(e);
        }

        tracing::info!(id, "Staff account deleted");
        self.refetch().await;
        Ok(Outcome::Done)
    }

    /// Add one file to a user's gallery; the table refetches either way
    pub async fn add_file(&self, user_id: &str, file: FilePart) -> Result<StoredFile> {
        self.dashboard.clear_error(ErrorArea::Files);
        let form = FormData::new().file("file", file);

        let result = self
            .dashboard
            .api()
            .admin_add_file(user_id, form, self.dashboard.token())
            .await;
        if let Err(e) = &result {
            self.dashboard
                .report(ErrorArea::Files, e, Some("Failed to upload file"));
        }

        self.refetch().await;
        result
    }

    /// Delete one file from a user's gallery; the table refetches either way
    pub async fn delete_file(&self, file_id: &str, filename: &str) -> Result<Outcome> {
        if !self.confirm.confirm(&delete_file_prompt(filename)) {
            return Ok(Outcome::Cancelled);
        }
        self.dashboard.clear_error(ErrorArea::Files);

        let result = self
            .dashboard
            .api()
            .admin_delete_file(file_id, self.dashboard.token())
            .await;
        if let Err(e) = &result {
            self.dashboard
                .report(ErrorArea::Files, e, Some("Failed to delete file"));
        }

        self.refetch().await;
        result.map(|_| Outcome::Done)
    }

    async fn after_save(&self, created: bool) {
        if created {
            if let Err(e) = self.dashboard.reset_filters_and_fetch().await {
                tracing::warn!(error = %e, "Refetch after create failed");
            }
        } else {
            self.refetch().await;
        }
    }

    /// Refetch under the current query; failures land in the table error area
    async fn refetch(&self) {
        if let Err(e) = self.dashboard.fetch_users().await {
            tracing::warn!(error = %e, "Refetch after mutation failed");
        }
    }
}
