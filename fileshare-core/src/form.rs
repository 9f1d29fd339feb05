//! Form payloads
//!
//! Forms are plain data: the presentation layer fills them in and the client
//! turns them into JSON bodies or multipart form data.

use serde_json::{json, Value};

use crate::model::{AccountType, Identity, Role};

/// A file selected for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
}

impl FilePart {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
            mime: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

/// An ordered multipart body: text fields and file parts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    fields: Vec<(String, String)>,
    files: Vec<(String, FilePart)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Append a file part; repeating a name sends several files under it
    pub fn file(mut self, name: impl Into<String>, part: FilePart) -> Self {
        self.files.push((name.into(), part));
        self
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn files(&self) -> &[(String, FilePart)] {
        &self.files
    }

    /// First value of a text field
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn into_parts(self) -> (Vec<(String, String)>, Vec<(String, FilePart)>) {
        (self.fields, self.files)
    }
}

/// Add the password unless it is blank and may be left out
fn with_password(mut body: Value, password: &str, omit_blank: bool) -> Value {
    if !(omit_blank && password.is_empty()) {
        body["password"] = Value::from(password);
    }
    body
}

/// Admin or employee account, sent as JSON
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub selected_date: String,
}

impl Default for StaffForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            password: String::new(),
            role: Role::Employee,
            selected_date: String::new(),
        }
    }
}

impl StaffForm {
    /// JSON body; a blank password is left out when editing
    pub fn to_json(&self, editing: bool) -> Value {
        let body = json!({
            "name": self.name,
            "email": self.email,
            "role": self.role.as_str(),
            "selected_date": self.selected_date,
        });
        with_password(body, &self.password, editing)
    }
}

/// A `user` account managed by an admin, sent as multipart
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub selected_date: String,
    pub account_type: AccountType,
    pub needs_sensitive_storage: bool,
}

impl UserForm {
    /// Multipart body; a blank password is left out when editing
    pub fn to_form_data(&self, editing: bool, profile_pic: Option<FilePart>) -> FormData {
        let mut form = FormData::new()
            .text("name", &self.name)
            .text("email", &self.email);
        if !(editing && self.password.is_empty()) {
            form = form.text("password", &self.password);
        }
        form = form
            .text("role", Role::User.as_str())
            .text("selected_date", &self.selected_date)
            .text("account_type", self.account_type.as_str())
            .text(
                "needs_sensitive_storage",
                self.needs_sensitive_storage.to_string(),
            );
        match profile_pic {
            Some(pic) => form.file("profile_pic", pic),
            None => form,
        }
    }
}

/// Self-registration of a `user` account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationForm {
    pub user: UserForm,
    pub agreed_to_terms: bool,
    pub email_notifications: bool,
}

impl Default for RegistrationForm {
    fn default() -> Self {
        Self {
            user: UserForm::default(),
            agreed_to_terms: false,
            email_notifications: true,
        }
    }
}

impl RegistrationForm {
    pub fn to_form_data(&self, profile_pic: Option<FilePart>) -> FormData {
        let (mut fields, files) = self.user.to_form_data(false, None).into_parts();
        fields.push(("agreed_to_terms".into(), self.agreed_to_terms.to_string()));
        fields.push((
            "email_notifications".into(),
            self.email_notifications.to_string(),
        ));
        let mut form = FormData { fields, files };
        if let Some(pic) = profile_pic {
            form = form.file("profile_pic", pic);
        }
        form
    }
}

/// The signed-in user's own profile, sent as JSON
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub selected_date: String,
    pub email_notifications: bool,
}

impl ProfileForm {
    /// Prefill from the current identity; the password always starts blank
    pub fn from_identity(identity: &Identity) -> Self {
        let selected_date = identity
            .selected_date
            .as_deref()
            .map(|d| d.split('T').next().unwrap_or_default().to_string())
            .unwrap_or_default();
        Self {
            name: identity.name.clone(),
            email: identity.email.clone().unwrap_or_default(),
            password: String::new(),
            selected_date,
            email_notifications: identity.email_notifications.unwrap_or(false),
        }
    }

    /// JSON body; a blank password means "keep the current one"
    pub fn to_json(&self) -> Value {
        let body = json!({
            "name": self.name,
            "email": self.email,
            "selected_date": self.selected_date,
            "email_notifications": self.email_notifications,
        });
        with_password(body, &self.password, true)
    }
}
