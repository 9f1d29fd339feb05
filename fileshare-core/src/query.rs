//! Dashboard query state
//!
//! Holds every control of the admin dashboard (search, sort, filters, date
//! range, page) and derives the single canonical query sent to `GET /users`.
//! All mutators that change what is being listed reset the page to 1, so a
//! page number never refers to an older result set.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::model::{AccountType, Role};

/// Rows per page requested from the backend
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Date format used by the date range filter
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Column the listing is sorted by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortField {
    #[default]
    Name,
    Role,
    CreatedDate,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::Role => "role",
            SortField::CreatedDate => "created_date",
        }
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(SortField::Name),
            "role" => Ok(SortField::Role),
            "created_date" => Ok(SortField::CreatedDate),
            other => Err(format!("unknown sort field '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

/// Filter on the "needs sensitive storage" flag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Sensitivity {
    #[default]
    All,
    /// Only accounts that requested sensitive storage
    Required,
    /// Only accounts that did not
    NotRequired,
}

impl Sensitivity {
    pub const ALL: [Sensitivity; 3] =
        [Sensitivity::All, Sensitivity::Required, Sensitivity::NotRequired];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sensitivity::All => "all",
            Sensitivity::Required => "true",
            Sensitivity::NotRequired => "false",
        }
    }
}

impl FromStr for Sensitivity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Sensitivity::All),
            "true" => Ok(Sensitivity::Required),
            "false" => Ok(Sensitivity::NotRequired),
            other => Err(format!("unknown sensitivity '{}'", other)),
        }
    }
}

/// The normalized parameters of one `GET /users` request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalQuery {
    pub page: u32,
    pub limit: u32,
    pub search: String,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub roles: Vec<Role>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub account_types: Vec<AccountType>,
    pub sensitivity: Sensitivity,
}

impl CanonicalQuery {
    /// True when every role or every account type is deselected
    ///
    /// The backend reads an empty set as "no constraint", so such a query
    /// must never be sent.
    pub fn matches_nothing(&self) -> bool {
        self.roles.is_empty() || self.account_types.is_empty()
    }

    /// Query string pairs, in the order the backend documents them
    ///
    /// Every key is always present; empty values mean "no constraint".
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
            ("search", self.search.clone()),
            ("sort_by", self.sort_by.as_str().to_string()),
            ("sort_order", self.sort_order.as_str().to_string()),
            ("roles", join(self.roles.iter().map(Role::as_str))),
            ("start_date", format_date(self.start_date)),
            ("end_date", format_date(self.end_date)),
            (
                "account_types",
                join(self.account_types.iter().map(AccountType::as_str)),
            ),
            ("sensitivity", self.sensitivity.as_str().to_string()),
        ]
    }
}

impl fmt::Display for CanonicalQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .to_pairs()
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        f.write_str(&pairs.join("&"))
    }
}

fn join<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items.collect::<Vec<_>>().join(",")
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

/// Parse a date range input; empty input clears the bound
pub fn parse_date(input: &str) -> Result<Option<NaiveDate>, chrono::ParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(input, DATE_FORMAT).map(Some)
}

/// Every control of the dashboard listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    search_text: String,
    debounced_search_text: String,
    sort_field: SortField,
    sort_order: SortOrder,
    selected_roles: BTreeSet<Role>,
    selected_account_types: BTreeSet<AccountType>,
    sensitivity: Sensitivity,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
    page: u32,
    limit: u32,
}

impl Default for QueryState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl QueryState {
    pub fn new(limit: u32) -> Self {
        Self {
            search_text: String::new(),
            debounced_search_text: String::new(),
            sort_field: SortField::default(),
            sort_order: SortOrder::default(),
            selected_roles: Role::ALL.into_iter().collect(),
            selected_account_types: AccountType::ALL.into_iter().collect(),
            sensitivity: Sensitivity::All,
            date_from: None,
            date_to: None,
            page: 1,
            limit: limit.max(1),
        }
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn debounced_search_text(&self) -> &str {
        &self.debounced_search_text
    }

    pub fn sort(&self) -> (SortField, SortOrder) {
        (self.sort_field, self.sort_order)
    }

    pub fn selected_roles(&self) -> &BTreeSet<Role> {
        &self.selected_roles
    }

    pub fn selected_account_types(&self) -> &BTreeSet<AccountType> {
        &self.selected_account_types
    }

    pub fn sensitivity(&self) -> Sensitivity {
        self.sensitivity
    }

    pub fn date_range(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        (self.date_from, self.date_to)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Record typed search text. It joins the query only once settled.
    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.search_text = text.into();
        self.page = 1;
    }

    /// Promote the typed search text to the debounced value.
    ///
    /// Returns whether the debounced value changed.
    pub fn settle_search(&mut self) -> bool {
        if self.debounced_search_text == self.search_text {
            return false;
        }
        self.debounced_search_text = self.search_text.clone();
        self.page = 1;
        true
    }

    /// Clicking the active column flips direction; another column sorts ascending
    pub fn toggle_sort(&mut self, field: SortField) {
        if field == self.sort_field {
            self.sort_order = self.sort_order.flipped();
        } else {
            self.sort_field = field;
            self.sort_order = SortOrder::Asc;
        }
        self.page = 1;
    }

    pub fn toggle_role(&mut self, role: Role) {
        if !self.selected_roles.remove(&role) {
            self.selected_roles.insert(role);
        }
        self.page = 1;
    }

    pub fn toggle_account_type(&mut self, account_type: AccountType) {
        if !self.selected_account_types.remove(&account_type) {
            self.selected_account_types.insert(account_type);
        }
        self.page = 1;
    }

    pub fn set_sensitivity(&mut self, sensitivity: Sensitivity) {
        self.sensitivity = sensitivity;
        self.page = 1;
    }

    pub fn set_date_from(&mut self, date: Option<NaiveDate>) {
        self.date_from = date;
        self.page = 1;
    }

    pub fn set_date_to(&mut self, date: Option<NaiveDate>) {
        self.date_to = date;
        self.page = 1;
    }

    /// Move to a page; pages start at 1
    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    /// Reset every filter dimension and the search in one update
    pub fn clear_filters(&mut self) {
        self.selected_roles = Role::ALL.into_iter().collect();
        self.selected_account_types = AccountType::ALL.into_iter().collect();
        self.sensitivity = Sensitivity::All;
        self.date_from = None;
        self.date_to = None;
        self.search_text.clear();
        self.debounced_search_text.clear();
        self.page = 1;
    }

    /// Back to the default view: no filters, no search, default sort, page 1
    pub fn reset_view(&mut self) {
        self.clear_filters();
        self.sort_field = SortField::default();
        self.sort_order = SortOrder::default();
    }

    /// Derive the query sent to the backend
    pub fn canonical(&self) -> CanonicalQuery {
        CanonicalQuery {
            page: self.page,
            limit: self.limit,
            search: self.debounced_search_text.clone(),
            sort_by: self.sort_field,
            sort_order: self.sort_order,
            roles: self.selected_roles.iter().copied().collect(),
            start_date: self.date_from,
            end_date: self.date_to,
            account_types: self.selected_account_types.iter().copied().collect(),
            sensitivity: self.sensitivity,
        }
    }
}
