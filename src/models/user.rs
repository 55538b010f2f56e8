use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A link between a local account and an identity at an external provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalLogin {
    pub provider: String,
    pub provider_key: String,
    pub display_name: Option<String>,
}

/// An application user as held by the credential store.
///
/// `password_hash` is `None` for accounts created through a first external
/// login; such accounts can only sign in through a linked provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub normalized_email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub email_confirmed: bool,
    /// Rotated whenever credentials change; tokens issued under an old stamp stop validating.
    #[serde(skip_serializing)]
    pub security_stamp: String,
    pub city: Option<String>,
    pub roles: Vec<String>,
    pub logins: Vec<ExternalLogin>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Creates an unconfirmed user whose username is the email address.
    pub fn new(email: &str, city: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: email.to_string(),
            email: email.to_string(),
            normalized_email: normalize_email(email),
            password_hash: None,
            email_confirmed: false,
            security_stamp: new_security_stamp(),
            city,
            roles: Vec::new(),
            logins: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn is_in_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn new_security_stamp() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_defaults() {
        let user = User::new("Mary@Example.com ", Some("Paris".into()));
        assert_eq!(user.username, user.email);
        assert_eq!(user.normalized_email, "mary@example.com");
        assert!(!user.email_confirmed);
        assert!(user.password_hash.is_none());
        assert_eq!(user.city.as_deref(), Some("Paris"));
    }

    #[test]
    fn test_serialized_user_hides_credentials() {
        let mut user = User::new("john@example.com", None);
        user.password_hash = Some("$2b$12$hash".into());
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("security_stamp").is_none());
        assert_eq!(json["email"], "john@example.com");
    }

    #[test]
    fn test_role_check_ignores_case() {
        let mut user = User::new("admin@example.com", None);
        user.roles.push("Admin".into());
        assert!(user.is_in_role("admin"));
        assert!(!user.is_in_role("User"));
    }
}
