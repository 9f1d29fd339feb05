//! Fileshare Core Library
//!
//! Plain data shared by every part of the fileshare client:
//! - Identities, roles, account types and the files in a user's gallery
//! - The admin dashboard's query state and the canonical query derived from it
//! - Form payloads sent to the backend
//! - The client-wide error taxonomy

pub mod error;
pub mod form;
pub mod model;
pub mod query;

pub use error::ClientError;
pub use form::{FilePart, FormData, ProfileForm, RegistrationForm, StaffForm, UserForm};
pub use model::{
    resolve_asset_url, AccountType, Credentials, Identity, PageResult, Role, StoredFile,
};
pub use query::{CanonicalQuery, QueryState, Sensitivity, SortField, SortOrder};

/// Result type for fileshare operations
pub type Result<T> = std::result::Result<T, ClientError>;
