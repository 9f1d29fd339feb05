//! Dashboard query engine
//!
//! Owns the admin/employee listing: the query state, the debounced search,
//! the last fetched page and the error areas shown around the table. Any
//! change to the canonical query triggers a refetch. Fetches are numbered
//! and only the newest one may write rows, so a slow response for an older
//! query never overwrites a newer page.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use fileshare_core::{
    AccountType, CanonicalQuery, ClientError, Identity, QueryState, Result, Role, Sensitivity,
    SortField,
};
use tokio::time::Instant;

use crate::api::Api;
use crate::config::Config;
use crate::debounce::Debouncer;
use crate::session::SessionMachine;

/// Where an error is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorArea {
    /// Above the table: listing, download and delete-user failures
    Table,
    /// Inside an expanded row: admin file add/delete failures
    Files,
    StaffForm,
    UserForm,
}

/// Error lines per area; empty means no error
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorAreas {
    pub table: Vec<String>,
    pub files: Vec<String>,
    pub staff_form: Vec<String>,
    pub user_form: Vec<String>,
}

impl ErrorAreas {
    pub fn get(&self, area: ErrorArea) -> &[String] {
        match area {
            ErrorArea::Table => &self.table,
            ErrorArea::Files => &self.files,
            ErrorArea::StaffForm => &self.staff_form,
            ErrorArea::UserForm => &self.user_form,
        }
    }

    fn slot(&mut self, area: ErrorArea) -> &mut Vec<String> {
        match area {
            ErrorArea::Table => &mut self.table,
            ErrorArea::Files => &mut self.files,
            ErrorArea::StaffForm => &mut self.staff_form,
            ErrorArea::UserForm => &mut self.user_form,
        }
    }
}

/// Everything the table view renders
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSnapshot {
    pub query: QueryState,
    pub rows: Vec<Identity>,
    pub total_pages: u32,
    pub loading: bool,
    pub errors: ErrorAreas,
    pub expanded_row: Option<String>,
}

struct Inner {
    query: QueryState,
    search: Debouncer<String>,
    rows: Vec<Identity>,
    total_pages: u32,
    loading: bool,
    errors: ErrorAreas,
    expanded_row: Option<String>,
    generation: u64,
    last_requested: Option<CanonicalQuery>,
    /// A background task is waiting out the search debounce
    settling: bool,
}

pub struct Dashboard {
    api: Arc<Api>,
    token: String,
    viewer: Identity,
    inner: Mutex<Inner>,
}

impl Dashboard {
    pub fn new(api: Arc<Api>, token: String, viewer: Identity, config: &Config) -> Self {
        Self {
            api,
            token,
            viewer,
            inner: Mutex::new(Inner {
                query: QueryState::new(config.page_size),
                search: Debouncer::new(config.search_debounce()),
                rows: Vec::new(),
                total_pages: 0,
                loading: false,
                errors: ErrorAreas::default(),
                expanded_row: None,
                generation: 0,
                last_requested: None,
                settling: false,
            }),
        }
    }

    /// Open the dashboard for an authenticated admin or employee session
    pub fn for_session(session: &SessionMachine, config: &Config) -> Option<Self> {
        let snapshot = session.session();
        let (token, viewer) = (snapshot.token?, snapshot.identity?);
        if !viewer.role.is_staff() {
            return None;
        }
        Some(Self::new(session.api().clone(), token, viewer, config))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn api(&self) -> &Api {
        &self.api
    }

    pub(crate) fn token(&self) -> &str {
        &self.token
    }

    pub fn viewer(&self) -> &Identity {
        &self.viewer
    }

    /// Only admins may create, edit and delete accounts and files
    pub fn can_manage(&self) -> bool {
        self.viewer.role == Role::Admin
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        let inner = self.lock();
        DashboardSnapshot {
            query: inner.query.clone(),
            rows: inner.rows.clone(),
            total_pages: inner.total_pages,
            loading: inner.loading,
            errors: inner.errors.clone(),
            expanded_row: inner.expanded_row.clone(),
        }
    }

    pub fn query(&self) -> QueryState {
        self.lock().query.clone()
    }

    pub fn rows(&self) -> Vec<Identity> {
        self.lock().rows.clone()
    }

    pub fn errors(&self) -> ErrorAreas {
        self.lock().errors.clone()
    }

    /// Fetch the page for the current query
    pub async fn fetch_users(&self) -> Result<()> {
        let (query, generation) = {
            let mut inner = self.lock();
            inner.generation += 1;
            inner.loading = true;
            inner.errors.table.clear();
            let query = inner.query.canonical();
            inner.last_requested = Some(query.clone());
            if query.matches_nothing() {
                inner.loading = false;
                inner.rows.clear();
                inner.total_pages = 0;
                tracing::debug!(%query, generation = inner.generation, "Empty selection, skipping fetch");
                return Ok(());
            }
            (query, inner.generation)
        };
        tracing::debug!(%query, generation, "Fetching users");

        let result = self.api.list_users(&query, &self.token).await;

        let mut inner = self.lock();
        if inner.generation != generation {
            tracing::debug!(generation, latest = inner.generation, "Discarding superseded page");
            return Ok(());
        }
        inner.loading = false;

        match result {
            Ok(page) => {
                inner.rows = page.rows;
                inner.total_pages = page.total_pages;
                Ok(())
            }
            Err(e) => {
                if !e.is_session_expired() {
                    inner.errors.table = e.lines();
                }
                Err(e)
            }
        }
    }

    /// Refetch only if the canonical query moved since the last request
    async fn refresh_if_changed(&self) -> Result<()> {
        let changed = {
            let inner = self.lock();
            inner.last_requested.as_ref() != Some(&inner.query.canonical())
        };
        if changed {
            self.fetch_users().await
        } else {
            Ok(())
        }
    }

    async fn update(&self, mutate: impl FnOnce(&mut QueryState)) -> Result<()> {
        {
            let mut inner = self.lock();
            mutate(&mut inner.query);
        }
        self.refresh_if_changed().await
    }

    /// Record typed search text and schedule it to settle
    pub async fn set_search_text(&self, text: &str) -> Result<()> {
        {
            let mut inner = self.lock();
            inner.query.set_search_text(text);
            inner.search.schedule(text.to_string(), Instant::now());
        }
        self.refresh_if_changed().await
    }

    /// Record typed search text and refetch by itself once typing stops
    ///
    /// At most one background task waits on the debounce; later keystrokes
    /// only push its deadline back.
    pub async fn type_search_text(self: &Arc<Self>, text: &str) -> Result<()> {
        let result = self.set_search_text(text).await;
        let spawn = !std::mem::replace(&mut self.lock().settling, true);
        if spawn {
            tokio::spawn(Arc::clone(self).settle_in_background());
        }
        result
    }

    async fn settle_in_background(self: Arc<Self>) {
        loop {
            let deadline = {
                let mut inner = self.lock();
                match inner.search.deadline() {
                    Some(deadline) => deadline,
                    None => {
                        inner.settling = false;
                        return;
                    }
                }
            };
            tokio::time::sleep_until(deadline).await;

            let changed = {
                let mut inner = self.lock();
                inner.search.take_due(Instant::now()).is_some() && inner.query.settle_search()
            };
            if changed {
                if let Err(e) = self.refresh_if_changed().await {
                    tracing::warn!(error = %e, "Search refetch failed");
                }
            }
        }
    }

    /// When the pending search text settles, if any is pending
    pub fn search_deadline(&self) -> Option<Instant> {
        self.lock().search.deadline()
    }

    /// Wait for pending search text to settle, then refetch
    ///
    /// Typing while waiting pushes the deadline back. Returns whether the
    /// debounced search changed.
    pub async fn settle_search(&self) -> Result<bool> {
        loop {
            let Some(deadline) = self.search_deadline() else {
                return Ok(false);
            };
            tokio::time::sleep_until(deadline).await;

            let changed = {
                let mut inner = self.lock();
                match inner.search.take_due(Instant::now()) {
                    Some(_) => inner.query.settle_search(),
                    None => continue,
                }
            };
            if changed {
                self.refresh_if_changed().await?;
            }
            return Ok(changed);
        }
    }

    pub async fn toggle_sort(&self, field: SortField) -> Result<()> {
        self.update(|q| q.toggle_sort(field)).await
    }

    pub async fn toggle_role(&self, role: Role) -> Result<()> {
        self.update(|q| q.toggle_role(role)).await
    }

    pub async fn toggle_account_type(&self, account_type: AccountType) -> Result<()> {
        self.update(|q| q.toggle_account_type(account_type)).await
    }

    pub async fn set_sensitivity(&self, sensitivity: Sensitivity) -> Result<()> {
        self.update(|q| q.set_sensitivity(sensitivity)).await
    }

    pub async fn set_date_from(&self, date: Option<NaiveDate>) -> Result<()> {
        self.update(|q| q.set_date_from(date)).await
    }

    pub async fn set_date_to(&self, date: Option<NaiveDate>) -> Result<()> {
        self.update(|q| q.set_date_to(date)).await
    }

    /// Jump to a page, clamped to the known page count
    pub async fn go_to_page(&self, page: u32) -> Result<()> {
        {
            let mut inner = self.lock();
            let last = inner.total_pages.max(1);
            inner.query.set_page(page.clamp(1, last));
        }
        self.refresh_if_changed().await
    }

    pub async fn next_page(&self) -> Result<()> {
        let page = self.lock().query.page();
        self.go_to_page(page.saturating_add(1)).await
    }

    pub async fn previous_page(&self) -> Result<()> {
        let page = self.lock().query.page();
        self.go_to_page(page.saturating_sub(1)).await
    }

    /// Reset every filter and the search in one update
    pub async fn clear_filters(&self) -> Result<()> {
        {
            let mut inner = self.lock();
            inner.query.clear_filters();
            inner.search.cancel();
        }
        self.refresh_if_changed().await
    }

    /// Back to the default view and fetch, whether or not the query moved
    pub async fn reset_filters_and_fetch(&self) -> Result<()> {
        {
            let mut inner = self.lock();
            inner.query.reset_view();
            inner.search.cancel();
        }
        self.fetch_users().await
    }

    /// Expand a row to show its gallery, or collapse it
    pub fn toggle_row(&self, user_id: &str) {
        let mut inner = self.lock();
        inner.errors.files.clear();
        if inner.expanded_row.as_deref() == Some(user_id) {
            inner.expanded_row = None;
        } else {
            inner.expanded_row = Some(user_id.to_string());
        }
    }

    /// Download a file from any gallery; returns the saved filename
    pub async fn download(&self, file_id: &str, filename: &str) -> Result<String> {
        self.clear_error(ErrorArea::Table);
        match self.api.download_file(file_id, &self.token).await {
            Ok(saved) => Ok(saved),
            Err(e) => {
                self.report(ErrorArea::Table, &e, Some(&format!("Failed to download {}", filename)));
                Err(e)
            }
        }
    }

    /// Show an error in an area; expired sessions are handled globally instead
    pub(crate) fn report(&self, area: ErrorArea, error: &ClientError, context: Option<&str>) {
        if error.is_session_expired() {
            return;
        }
        let lines = match context {
            Some(context) => {
                let mut lines = error.lines();
                match lines.first_mut() {
                    Some(first) => *first = format!("{}: {}", context, first),
                    None => lines.push(context.to_string()),
                }
                lines
            }
            None => error.lines(),
        };
        *self.lock().errors.slot(area) = lines;
    }

    pub(crate) fn clear_error(&self, area: ErrorArea) {
        self.lock().errors.slot(area).clear();
    }
}
