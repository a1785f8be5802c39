//! User profile model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Preferred color theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

/// User profile stored in Firestore.
///
/// Stored at: `artifacts/{app_id}/users/{uid}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Identity provider user ID (also used as document ID)
    #[serde(alias = "_firestore_id", default)]
    pub uid: String,
    /// Chosen username (may be blank for profiles created at first login)
    #[serde(default)]
    pub username: String,
    /// Email address ("N/A" when the provider did not share one)
    #[serde(default)]
    pub email: String,
    /// When the profile was created (ISO 8601)
    #[serde(default)]
    pub created_at: String,
    /// Whether a PIN has been configured
    #[serde(default)]
    pub has_pin_setup: bool,
    /// Salted SHA-256 hash of the PIN (hex)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    /// Theme preference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
}

impl UserProfile {
    /// Profile created for an account that has no document yet.
    pub fn new_default(uid: &str, email: Option<&str>, created_at: String) -> Self {
        Self {
            uid: uid.to_string(),
            username: email
                .and_then(|e| e.split('@').next())
                .filter(|local| !local.is_empty())
                .unwrap_or("New User")
                .to_string(),
            email: email.unwrap_or("N/A").to_string(),
            created_at,
            has_pin_setup: false,
            pin: None,
            theme: None,
        }
    }

    /// Name shown in the greeting: username, else the email local part.
    pub fn display_name(&self) -> String {
        let username = self.username.trim();
        if !username.is_empty() {
            return username.to_string();
        }
        self.email
            .split('@')
            .next()
            .filter(|local| !local.is_empty() && self.email.contains('@'))
            .unwrap_or("User")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_uses_email_local_part() {
        let profile = UserProfile::new_default("u1", Some("jane@example.com"), "now".into());
        assert_eq!(profile.username, "jane");
        assert_eq!(profile.email, "jane@example.com");
        assert!(!profile.has_pin_setup);

        let anonymous = UserProfile::new_default("u2", None, "now".into());
        assert_eq!(anonymous.username, "New User");
        assert_eq!(anonymous.email, "N/A");
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let mut profile = UserProfile::new_default("u1", Some("jane@example.com"), "now".into());
        profile.username = "  Jane D  ".to_string();
        assert_eq!(profile.display_name(), "Jane D");

        profile.username = "   ".to_string();
        assert_eq!(profile.display_name(), "jane");

        profile.email = "N/A".to_string();
        assert_eq!(profile.display_name(), "User");
    }

    #[test]
    fn test_reads_documents_written_by_web_client() {
        let doc = serde_json::json!({
            "username": "jane",
            "email": "jane@example.com",
            "createdAt": "2025-01-01T00:00:00.000Z",
            "hasPinSetup": true,
            "pin": "abc123"
        });
        let profile: UserProfile = serde_json::from_value(doc).unwrap();
        assert!(profile.has_pin_setup);
        assert_eq!(profile.pin.as_deref(), Some("abc123"));
        assert_eq!(profile.theme, None);
    }
}
