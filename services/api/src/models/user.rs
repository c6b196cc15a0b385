//! User and payment profile models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::strip_at;

/// A stored user
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub venmo: Option<String>,
    pub paypal: Option<String>,
    pub avatar_url: Option<String>,
    pub rep_score: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a user created on first reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

impl NewUser {
    /// Derive placeholder profile fields from a participant name
    pub fn placeholder(id: &str, name: Option<&str>) -> Self {
        let clean = strip_at(name.unwrap_or(id));
        let clean = if clean.is_empty() { id } else { clean };

        let mut chars = clean.chars();
        let display_name = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => id.to_string(),
        };

        Self {
            id: id.to_string(),
            username: clean.to_lowercase(),
            display_name,
            email: format!("{}@temp.com", clean),
            avatar_url: Some(format!(
                "https://api.dicebear.com/7.x/avataaars/svg?seed={}",
                clean
            )),
        }
    }
}

/// Request to create or update a user profile
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub user_id: Option<String>,
    pub display_name: Option<String>,
    pub handle: Option<String>,
    pub venmo: Option<String>,
    pub paypal: Option<String>,
    pub avatar_url: Option<String>,
}

/// Validated profile update; `None` fields keep their stored value
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub user_id: String,
    pub display_name: Option<String>,
    pub username: Option<String>,
    pub venmo: Option<String>,
    pub paypal: Option<String>,
    pub avatar_url: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ProfileUpdate {
    pub fn new(user_id: String, request: UpdateProfileRequest) -> Self {
        Self {
            user_id,
            display_name: non_blank(request.display_name),
            username: non_blank(request.handle.map(|h| strip_at(&h).to_string())),
            venmo: non_blank(request.venmo),
            paypal: non_blank(request.paypal),
            avatar_url: non_blank(request.avatar_url),
        }
    }
}

/// Response for profile operations
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: String,
    pub display_name: String,
    pub username: String,
    pub handle: String,
    pub venmo: Option<String>,
    pub paypal: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        Self {
            handle: format!("@{}", user.username),
            id: user.id,
            display_name: user.display_name,
            username: user.username,
            venmo: user.venmo,
            paypal: user.paypal,
            avatar_url: user.avatar_url,
        }
    }
}

/// Request to change stored payment handles
#[derive(Debug, Deserialize)]
pub struct UpdatePaymentProfileRequest {
    pub venmo: Option<String>,
    pub paypal: Option<String>,
}

/// Payment handles of a user
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentProfileResponse {
    pub user_id: String,
    pub user_name: String,
    pub venmo: Option<String>,
    pub paypal: Option<String>,
}

impl From<User> for PaymentProfileResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            user_name: user.display_name,
            venmo: user.venmo,
            paypal: user.paypal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_from_name() {
        let user = NewUser::placeholder("u-42", Some("@sarah"));
        assert_eq!(user.username, "sarah");
        assert_eq!(user.display_name, "Sarah");
        assert_eq!(user.email, "sarah@temp.com");
    }

    #[test]
    fn test_placeholder_without_name_uses_id() {
        let user = NewUser::placeholder("bob", None);
        assert_eq!(user.display_name, "Bob");
        assert_eq!(user.username, "bob");
    }

    #[test]
    fn test_profile_update_strips_handle() {
        let update = ProfileUpdate::new(
            "u1".into(),
            UpdateProfileRequest {
                user_id: Some("u1".into()),
                display_name: Some("  ".into()),
                handle: Some("@alice".into()),
                venmo: None,
                paypal: Some("alice-pp".into()),
                avatar_url: None,
            },
        );
        assert_eq!(update.username.as_deref(), Some("alice"));
        assert_eq!(update.display_name, None);
        assert_eq!(update.paypal.as_deref(), Some("alice-pp"));
    }
}
