//! Self-service workspace for `user` accounts
//!
//! Lists the signed-in user's files, uploads new ones, downloads them and
//! edits the user's own profile.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fileshare_core::{ClientError, FilePart, FormData, ProfileForm, Result, Role, StoredFile};

use crate::api::Api;
use crate::events::AppEvent;
use crate::session::SessionMachine;

pub const EMPTY_UPLOAD_MESSAGE: &str = "Please select one or more files to upload.";

pub const PROFILE_UPDATED_MESSAGE: &str = "Profile updated!";

/// Outcome message shown next to a form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(Vec<String>),
}

impl Notice {
    fn from_error(error: &ClientError) -> Option<Self> {
        // Expired sessions end in a logout, not a local message
        (!error.is_session_expired()).then(|| Notice::Error(error.lines()))
    }
}

#[derive(Default)]
struct Inner {
    files: Vec<StoredFile>,
    loading: bool,
    /// Shared by uploads, the listing and downloads
    upload: Option<Notice>,
    profile: Option<Notice>,
    /// Bumped whenever a listing fetch starts
    generation: u64,
}

pub struct Workspace {
    api: Arc<Api>,
    token: String,
    inner: Mutex<Inner>,
}

impl Workspace {
    pub fn new(api: Arc<Api>, token: String) -> Self {
        Self {
            api,
            token,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Open the workspace for an authenticated `user` session
    pub fn for_session(session: &SessionMachine) -> Option<Self> {
        let snapshot = session.session();
        let (token, identity) = (snapshot.token?, snapshot.identity?);
        if identity.role != Role::User {
            return None;
        }
        Some(Self::new(session.api().clone(), token))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn files(&self) -> Vec<StoredFile> {
        self.lock().files.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    pub fn upload_notice(&self) -> Option<Notice> {
        self.lock().upload.clone()
    }

    pub fn profile_notice(&self) -> Option<Notice> {
        self.lock().profile.clone()
    }

    /// Replace the listing with the backend's; only the newest fetch applies
    pub async fn fetch_my_files(&self) -> Result<()> {
        let generation = {
            let mut inner = self.lock();
            inner.generation += 1;
            inner.loading = true;
            inner.generation
        };

        let result = self.api.my_files(&self.token).await;

        let mut inner = self.lock();
        if inner.generation != generation {
            tracing::debug!(generation, "Discarding superseded file listing");
            return Ok(());
        }
        inner.loading = false;
        match result {
            Ok(files) => {
                tracing::debug!(count = files.len(), "Loaded own files");
                inner.files = files;
                Ok(())
            }
            Err(e) => {
                if let Some(notice) = Notice::from_error(&e) {
                    inner.upload = Some(notice);
                }
                Err(e)
            }
        }
    }

    /// Upload every selected file in one request, then refresh the listing
    pub async fn upload_files(&self, files: Vec<FilePart>) -> Result<String> {
        if files.is_empty() {
            let error = ClientError::validation(EMPTY_UPLOAD_MESSAGE);
            self.lock().upload = Notice::from_error(&error);
            return Err(error);
        }
        self.lock().upload = None;

        let count = files.len();
        let form = files
            .into_iter()
            .fold(FormData::new(), |form, file| form.file("files_to_upload", file));

        match self.api.upload_files(form, &self.token).await {
            Ok(message) => {
                tracing::info!(count, "Uploaded files");
                self.lock().upload = Some(Notice::Success(message.clone()));
                if let Err(e) = self.fetch_my_files().await {
                    tracing::warn!(error = %e, "Refetch after upload failed");
                }
                Ok(message)
            }
            Err(e) => {
                self.lock().upload = Notice::from_error(&e);
                Err(e)
            }
        }
    }

    /// Download one of the user's files; returns the saved filename
    pub async fn download(&self, file_id: &str) -> Result<String> {
        {
            let mut inner = self.lock();
            if matches!(inner.upload, Some(Notice::Error(_))) {
                inner.upload = None;
            }
        }
        let result = self.api.download_file(file_id, &self.token).await;
        if let Err(e) = &result {
            if let Some(notice) = Notice::from_error(e) {
                self.lock().upload = Some(notice);
            }
        }
        result
    }

    /// Save profile fields, then the new picture if one was chosen
    ///
    /// The session is told to refresh the identity only after every call
    /// succeeded.
    pub async fn update_profile(&self, form: &ProfileForm, picture: Option<FilePart>) -> Result<()> {
        self.lock().profile = None;

        let result = self.save_profile(form, picture).await;
        let notice = match &result {
            Ok(()) => {
                self.api.events().publish(AppEvent::ProfileUpdated);
                tracing::info!("Profile updated");
                Some(Notice::Success(PROFILE_UPDATED_MESSAGE.to_string()))
            }
            Err(e) => Notice::from_error(e),
        };
        self.lock().profile = notice;
        result
    }

    async fn save_profile(&self, form: &ProfileForm, picture: Option<FilePart>) -> Result<()> {
        self.api.update_my_profile(form.to_json(), &self.token).await?;
        if let Some(picture) = picture {
            let form = FormData::new().file("profile_pic", picture);
            self.api.update_my_profile_pic(form, &self.token).await?;
        }
        Ok(())
    }
}
