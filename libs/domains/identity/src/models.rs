use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Account status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    #[default]
    Active,
    Inactive,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Active => write!(f, "ACTIVE"),
            Status::Inactive => write!(f, "INACTIVE"),
        }
    }
}

/// A user as held by the directory.
///
/// `id`, `create_date` and `update_date` are owned by the store: they are
/// assigned on save and never taken from callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Process-unique identifier, assigned in save order
    pub id: u64,
    /// Unique, case-insensitive login name
    #[serde(rename = "userName")]
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Stored and returned as plain text
    pub password: String,
    pub status: Status,
    pub create_date: DateTime<Utc>,
    pub update_date: DateTime<Utc>,
}

/// Default email derived from a username.
pub fn default_email(username: &str) -> String {
    format!("{}@identityservice.com", username)
}

/// Input for creating a user
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    #[serde(rename = "userName")]
    #[validate(length(min = 1, message = "userName is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "firstName is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "lastName is required"))]
    pub last_name: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
    /// Defaults to `{userName}@identityservice.com`
    #[serde(default)]
    pub email: Option<String>,
    /// Defaults to ACTIVE
    #[serde(default)]
    pub status: Option<Status>,
}

impl NewUser {
    pub fn new(username: &str, first_name: &str, last_name: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            password: password.to_string(),
            email: None,
            status: None,
        }
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }
}

/// Partial update: present fields overwrite the stored values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[validate(length(min = 1))]
    pub first_name: Option<String>,
    #[validate(length(min = 1))]
    pub last_name: Option<String>,
    #[validate(length(min = 1))]
    pub email: Option<String>,
    #[validate(length(min = 1))]
    pub password: Option<String>,
    pub status: Option<Status>,
}

impl UserRecord {
    /// Overwrite the fields present in `patch`. Timestamps are left to the store.
    pub fn apply_patch(&mut self, patch: UserPatch) {
        if let Some(first_name) = patch.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            self.last_name = last_name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(password) = patch.password {
            self.password = password;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_json_uses_source_field_names() {
        let input: NewUser = serde_json::from_str(
            r#"{"userName":"jdoe","firstName":"john","lastName":"doe","password":"pw"}"#,
        )
        .unwrap();

        assert_eq!(input, NewUser::new("jdoe", "john", "doe", "pw"));
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_new_user_rejects_empty_fields() {
        let input = NewUser::new("", "john", "", "pw");
        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("last_name"));
        assert!(!fields.contains_key("first_name"));
    }

    #[test]
    fn test_status_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Status::Inactive).unwrap(), "\"INACTIVE\"");
        let parsed: Status = serde_json::from_str("\"ACTIVE\"").unwrap();
        assert_eq!(parsed, Status::Active);
    }

    #[test]
    fn test_apply_patch_only_touches_present_fields() {
        let now = Utc::now();
        let mut record = UserRecord {
            id: 7,
            username: "jdoe".to_string(),
            first_name: "john".to_string(),
            last_name: "doe".to_string(),
            email: default_email("jdoe"),
            password: "pw".to_string(),
            status: Status::Active,
            create_date: now,
            update_date: now,
        };

        record.apply_patch(UserPatch {
            last_name: Some("roe".to_string()),
            status: Some(Status::Inactive),
            ..Default::default()
        });

        assert_eq!(record.first_name, "john");
        assert_eq!(record.last_name, "roe");
        assert_eq!(record.email, "jdoe@identityservice.com");
        assert!(!record.is_active());
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let now = Utc::now();
        let record = UserRecord {
            id: 1,
            username: "admin".to_string(),
            first_name: "admin".to_string(),
            last_name: "admin".to_string(),
            email: default_email("admin"),
            password: "admin".to_string(),
            status: Status::Active,
            create_date: now,
            update_date: now,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["userName"], "admin");
        assert_eq!(json["firstName"], "admin");
        assert_eq!(json["status"], "ACTIVE");
        assert!(json.get("createDate").is_some());
    }
}
