//! Identity and file models returned by the backend

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Avatar shown when an identity has no profile picture
pub const PLACEHOLDER_AVATAR: &str = "https://placehold.co/150x150/E2D9FF/6842FF?text=U";

/// Access role of an identity. Roles only change server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Admin,
    Employee,
    User,
}

impl Role {
    /// All roles, in the order the dashboard lists them
    pub const ALL: [Role; 3] = [Role::Admin, Role::Employee, Role::User];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Employee => "employee",
            Role::User => "user",
        }
    }

    /// Staff roles see the dashboard; only users upload their own files
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Employee)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "employee" => Ok(Role::Employee),
            "user" => Ok(Role::User),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Kind of account a user registered with. Staff always report `Management`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccountType {
    #[default]
    Personal,
    Professional,
    Academic,
    Management,
}

impl AccountType {
    /// All account types, in the order the dashboard lists them
    pub const ALL: [AccountType; 4] = [
        AccountType::Personal,
        AccountType::Professional,
        AccountType::Academic,
        AccountType::Management,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Personal => "personal",
            AccountType::Professional => "professional",
            AccountType::Academic => "academic",
            AccountType::Management => "management",
        }
    }
}

impl FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "personal" => Ok(AccountType::Personal),
            "professional" => Ok(AccountType::Professional),
            "academic" => Ok(AccountType::Academic),
            "management" => Ok(AccountType::Management),
            other => Err(format!("unknown account type '{}'", other)),
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AccountType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AccountType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = Option::<String>::deserialize(deserializer)?;
        match s {
            Some(s) => s.parse().map_err(serde::de::Error::custom),
            None => Ok(AccountType::default()),
        }
    }
}

/// A file in a user's gallery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: String,
    pub filename: String,
}

/// The resolved user or staff record for a session, or one dashboard row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,

    #[serde(default, deserialize_with = "nullable")]
    pub name: String,

    /// Omitted by endpoints that do not expose addresses
    #[serde(default)]
    pub email: Option<String>,

    pub role: Role,

    #[serde(default)]
    pub account_type: AccountType,

    #[serde(rename = "profile_pic", default)]
    pub profile_pic_url: Option<String>,

    #[serde(
        rename = "created_date",
        default,
        deserialize_with = "timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub joined_at: Option<NaiveDateTime>,

    #[serde(default, deserialize_with = "nullable")]
    pub needs_sensitive_storage: bool,

    #[serde(default)]
    pub selected_date: Option<String>,

    #[serde(default)]
    pub agreed_to_terms: Option<bool>,

    #[serde(default)]
    pub email_notifications: Option<bool>,

    #[serde(default, deserialize_with = "nullable")]
    pub gallery: Vec<StoredFile>,
}

impl Identity {
    /// Profile picture URL, resolved against the API base
    pub fn profile_pic(&self, base_url: &str) -> String {
        resolve_asset_url(base_url, self.profile_pic_url.as_deref())
    }

    /// Look up a file in this identity's gallery
    pub fn file(&self, file_id: &str) -> Option<&StoredFile> {
        self.gallery.iter().find(|f| f.id == file_id)
    }
}

/// Token and role returned by login and registration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub token: String,
    pub role: Role,
    #[serde(default)]
    pub message: Option<String>,
}

/// One page of the user listing. Recomputed on every fetch.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PageResult {
    #[serde(rename = "users", default)]
    pub rows: Vec<Identity>,

    #[serde(default)]
    pub total_pages: u32,

    #[serde(default)]
    pub total_users: Option<u64>,
}

/// Resolve a backend-relative asset URL
///
/// Absolute and `blob:` URLs are returned unchanged; a missing URL resolves
/// to the placeholder avatar.
pub fn resolve_asset_url(base_url: &str, url: Option<&str>) -> String {
    match url {
        None | Some("") => PLACEHOLDER_AVATAR.to_string(),
        Some(u) if u.starts_with("http") || u.starts_with("blob:") => u.to_string(),
        Some(u) => format!("{}{}", base_url.trim_end_matches('/'), u),
    }
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Ok(naive) = raw.parse::<NaiveDateTime>() {
        return Ok(Some(naive));
    }
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| Some(dt.naive_utc()))
        .map_err(serde::de::Error::custom)
}
