//! Fileshare Client
//!
//! Session handling and the admin dashboard engine for the fileshare
//! service: users register and manage their own files, admins and
//! employees manage accounts and per-user galleries.

pub mod api;
pub mod config;
pub mod dashboard;
pub mod debounce;
pub mod download;
pub mod events;
pub mod gateway;
pub mod mutations;
pub mod session;
pub mod store;
pub mod workspace;

pub use api::Api;
pub use config::Config;
pub use dashboard::{Dashboard, DashboardSnapshot, ErrorArea, ErrorAreas};
pub use debounce::Debouncer;
pub use download::{DirectorySink, DownloadSink, MemorySink};
pub use events::{AppEvent, EventBus};
pub use gateway::{Body, Gateway, Payload, Request};
pub use mutations::{Confirm, MutationCoordinator, Outcome};
pub use session::{EntryForm, Session, SessionMachine, SessionState, View};
pub use store::{InMemoryStore, KeyValueStore, SqliteStore, Theme};
pub use workspace::{Notice, Workspace};
