//! Session state machine
//!
//! Owns the bearer token and the identity resolved with it. Boot, login,
//! logout, the auth-invalid notification and identity refreshes all go
//! through the named transitions below, so ordering is decided in one place.
//!
//! Identity fetches are tagged with the token epoch and a fetch sequence
//! number. A result is applied only if no logout or login happened and no
//! newer fetch started while it was in flight.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fileshare_core::{ClientError, Credentials, FilePart, Identity, RegistrationForm, Result, Role};
use tokio::sync::broadcast;

use crate::api::Api;
use crate::events::{AppEvent, EventBus};
use crate::store::{KeyValueStore, TOKEN_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Checking the persisted token
    Booting,
    Anonymous,
    /// A token is held but its identity is not resolved yet
    Authenticating,
    Authenticated(Role),
}

/// Entry form shown to an anonymous visitor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EntryForm {
    #[default]
    Login,
    Register,
}

/// Top-level view the session grants access to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Loading,
    Login,
    Register,
    /// Admin and employee table; only admins may create accounts
    Dashboard { can_manage: bool },
    /// A user's own files
    Upload,
}

/// Snapshot of the current session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub token: Option<String>,
    pub identity: Option<Identity>,
    pub loading: bool,
}

struct Inner {
    session: Session,
    state: SessionState,
    entry: EntryForm,
    /// Bumped whenever the held token changes
    epoch: u64,
    /// Bumped whenever an identity fetch starts
    fetch_seq: u64,
}

/// Identifies one in-flight identity fetch
struct FetchTicket {
    token: String,
    epoch: u64,
    seq: u64,
}

pub struct SessionMachine {
    api: Arc<Api>,
    store: Arc<dyn KeyValueStore>,
    inner: Mutex<Inner>,
}

impl SessionMachine {
    pub fn new(api: Arc<Api>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            api,
            store,
            inner: Mutex::new(Inner {
                session: Session {
                    token: None,
                    identity: None,
                    loading: true,
                },
                state: SessionState::Booting,
                entry: EntryForm::Login,
                epoch: 0,
                fetch_seq: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn session(&self) -> Session {
        self.lock().session.clone()
    }

    /// Read-only copy of the held token
    pub fn token(&self) -> Option<String> {
        self.lock().session.token.clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.lock().session.identity.clone()
    }

    pub fn api(&self) -> &Arc<Api> {
        &self.api
    }

    pub fn events(&self) -> &EventBus {
        self.api.events()
    }

    /// Which view the current session may see
    pub fn view(&self) -> View {
        let inner = self.lock();
        match inner.state {
            SessionState::Booting => View::Loading,
            SessionState::Authenticated(Role::Admin) => View::Dashboard { can_manage: true },
            SessionState::Authenticated(Role::Employee) => View::Dashboard { can_manage: false },
            SessionState::Authenticated(Role::User) => View::Upload,
            SessionState::Anonymous | SessionState::Authenticating => match inner.entry {
                EntryForm::Login => View::Login,
                EntryForm::Register => View::Register,
            },
        }
    }

    pub fn show_login(&self) {
        self.lock().entry = EntryForm::Login;
    }

    pub fn show_register(&self) {
        self.lock().entry = EntryForm::Register;
    }

    /// Booting: validate the persisted token, if any
    ///
    /// Only `user` sessions survive a restart; any other role found behind a
    /// persisted token is purged.
    pub async fn boot(&self) -> SessionState {
        let persisted = match self.store.get(TOKEN_KEY) {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read persisted token");
                None
            }
        };

        let ticket = {
            let mut inner = self.lock();
            if inner.state != SessionState::Booting {
                return inner.state;
            }
            match persisted {
                Some(token) => {
                    inner.session.token = Some(token);
                    Self::begin_fetch(&mut inner)
                }
                None => {
                    tracing::debug!("No persisted token");
                    Self::enter_anonymous(&mut inner);
                    return inner.state;
                }
            }
        };
        let Some(ticket) = ticket else {
            return self.state();
        };

        let result = self.api.me(&ticket.token).await;

        let mut inner = self.lock();
        inner.session.loading = false;
        if !Self::is_current(&inner, &ticket) {
            tracing::debug!("Discarding superseded boot identity");
            if inner.state == SessionState::Booting {
                self.clear(&mut inner);
            }
            return inner.state;
        }

        match result {
            Ok(identity) if identity.role == Role::User => {
                tracing::info!(user_id = %identity.id, "Restored persisted session");
                inner.session.identity = Some(identity);
                inner.state = SessionState::Authenticated(Role::User);
            }
            Ok(identity) => {
                tracing::info!(role = %identity.role, "Purging persisted staff token");
                self.clear(&mut inner);
            }
            Err(e) => {
                tracing::info!(error = %e, "Persisted token rejected");
                self.clear(&mut inner);
            }
        }
        inner.state
    }

    /// Log in and resolve the identity
    pub async fn login(&self, email: &str, password: &str) -> Result<Role> {
        let credentials = self.api.login(email, password).await?;
        self.accept_credentials(&credentials);
        self.resolve_identity().await
    }

    /// Register a `user` account; success signs the new user in
    pub async fn register(&self, form: &RegistrationForm, profile_pic: Option<FilePart>) -> Result<Role> {
        let credentials = self.api.register(form.to_form_data(profile_pic)).await?;
        self.accept_credentials(&credentials);
        self.resolve_identity().await
    }

    /// Login or registration succeeded: hold the token, persist it for users
    pub fn accept_credentials(&self, credentials: &Credentials) {
        let persisted = if credentials.role == Role::User {
            self.store.set(TOKEN_KEY, &credentials.token)
        } else {
            // Staff sessions are memory-only
            self.store.remove(TOKEN_KEY)
        };
        if let Err(e) = persisted {
            tracing::warn!(error = %e, "Failed to update persisted token");
        }

        let mut inner = self.lock();
        inner.epoch += 1;
        inner.session.token = Some(credentials.token.clone());
        inner.session.identity = None;
        inner.session.loading = false;
        inner.state = SessionState::Authenticating;
        tracing::info!(role = %credentials.role, "Credentials accepted");
    }

    /// Authenticating → Authenticated, or back to anonymous if the token is bad
    pub async fn resolve_identity(&self) -> Result<Role> {
        let ticket = {
            let mut inner = self.lock();
            match inner.state {
                SessionState::Authenticated(role) => return Ok(role),
                SessionState::Authenticating => Self::begin_fetch(&mut inner),
                _ => None,
            }
        };
        let Some(ticket) = ticket else {
            return Err(ClientError::SessionExpired);
        };

        let result = self.api.me(&ticket.token).await;

        let mut inner = self.lock();
        if !Self::is_current(&inner, &ticket) {
            tracing::debug!("Discarding superseded identity");
            return match inner.state {
                SessionState::Authenticated(role) => Ok(role),
                _ => Err(ClientError::SessionExpired),
            };
        }

        match result {
            Ok(identity) => {
                let role = identity.role;
                tracing::info!(user_id = %identity.id, %role, "Session authenticated");
                inner.session.identity = Some(identity);
                inner.state = SessionState::Authenticated(role);
                Ok(role)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Identity fetch failed after login");
                self.clear(&mut inner);
                Err(e)
            }
        }
    }

    /// Refetch the identity for the held token; failure logs out
    ///
    /// Only an authenticated session is refreshed. While booting or
    /// authenticating, the fetch already in flight decides the outcome.
    pub async fn refresh_identity(&self) -> Result<()> {
        let ticket = {
            let mut inner = self.lock();
            if !matches!(inner.state, SessionState::Authenticated(_)) {
                tracing::debug!(state = ?inner.state, "Skipping identity refresh");
                return Ok(());
            }
            Self::begin_fetch(&mut inner)
        };
        let Some(ticket) = ticket else {
            return Ok(());
        };

        let result = self.api.me(&ticket.token).await;

        let mut inner = self.lock();
        if !Self::is_current(&inner, &ticket) {
            tracing::debug!("Discarding superseded identity refresh");
            return Ok(());
        }

        match result {
            Ok(identity) => {
                inner.state = SessionState::Authenticated(identity.role);
                inner.session.identity = Some(identity);
                Ok(())
            }
            Err(e) => {
                tracing::info!(error = %e, "Identity refresh failed, logging out");
                self.clear(&mut inner);
                Err(e)
            }
        }
    }

    /// Explicit logout
    pub fn logout(&self) {
        let mut inner = self.lock();
        self.clear(&mut inner);
        tracing::info!("Logged out");
    }

    /// Apply one bus notification
    pub async fn handle_event(&self, event: AppEvent) {
        match event {
            AppEvent::AuthInvalid => {
                tracing::info!("Auth error detected, logging out");
                self.logout();
            }
            AppEvent::ProfileUpdated => {
                // Failure already ended the session
                let _ = self.refresh_identity().await;
            }
        }
    }

    /// Consume notifications until the bus closes
    pub async fn listen(self: Arc<Self>, mut events: broadcast::Receiver<AppEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => self.handle_event(event).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Session listener lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    fn begin_fetch(inner: &mut Inner) -> Option<FetchTicket> {
        let token = inner.session.token.clone()?;
        inner.fetch_seq += 1;
        Some(FetchTicket {
            token,
            epoch: inner.epoch,
            seq: inner.fetch_seq,
        })
    }

    fn is_current(inner: &Inner, ticket: &FetchTicket) -> bool {
        inner.epoch == ticket.epoch
            && inner.fetch_seq == ticket.seq
            && inner.session.token.as_deref() == Some(ticket.token.as_str())
    }

    fn enter_anonymous(inner: &mut Inner) {
        inner.session.token = None;
        inner.session.identity = None;
        inner.session.loading = false;
        inner.state = SessionState::Anonymous;
    }

    /// Drop token and identity, purge the persisted value, go anonymous
    fn clear(&self, inner: &mut Inner) {
        inner.epoch += 1;
        Self::enter_anonymous(inner);
        if inner.entry != EntryForm::Register {
            inner.entry = EntryForm::Login;
        }
        if let Err(e) = self.store.remove(TOKEN_KEY) {
            tracing::warn!(error = %e, "Failed to purge persisted token");
        }
    }
}
