//! Persisted key-value storage
//!
//! The client persists two values: the bearer token of a `user` session and
//! the light/dark preference.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

use fileshare_core::ClientError;

/// Key holding the persisted bearer token
pub const TOKEN_KEY: &str = "authToken";

/// Key holding the theme preference
pub const THEME_KEY: &str = "theme";

/// Result type for store operations
pub type StoreResult<T> = Result<T, ClientError>;

/// Trait for string key-value storage
pub trait KeyValueStore: Send + Sync {
    /// Get the value stored under a key
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Store a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Remove a key; removing a missing key succeeds
    fn remove(&self, key: &str) -> StoreResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Stored preference first, otherwise the system preference
    pub fn load(store: &dyn KeyValueStore, system_prefers_dark: bool) -> Self {
        match store.get(THEME_KEY) {
            Ok(Some(v)) if v == "dark" => Theme::Dark,
            Ok(Some(v)) if v == "light" => Theme::Light,
            Ok(_) => Self::from_system(system_prefers_dark),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read theme preference");
                Self::from_system(system_prefers_dark)
            }
        }
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> StoreResult<()> {
        store.set(THEME_KEY, self.as_str())
    }

    fn from_system(prefers_dark: bool) -> Self {
        if prefers_dark {
            Theme::Dark
        } else {
            Theme::Light
        }
    }
}
