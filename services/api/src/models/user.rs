//! User model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub auth_id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub profile: Profile,
    pub friends: Vec<Uuid>,
    pub kyc: Kyc,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Public view of this user (id + profile, no account fields)
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            profile: self.profile.clone(),
        }
    }
}

/// User profile sub-document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub profile_picture_url: Option<String>,
    #[serde(default)]
    pub cover_photo_url: Option<String>,
    #[serde(default)]
    pub uploads: Vec<UploadRecord>,
}

impl Profile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Postal address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "US".to_string()
}

/// Record of a file uploaded by the user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRecord {
    #[serde(rename = "type")]
    pub kind: UploadKind,
    pub url: Option<String>,
    pub filename: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadKind {
    Avatar,
    Cover,
    Post,
    Kyc,
    Message,
}

/// KYC sub-document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Kyc {
    #[serde(default)]
    pub status: KycStatus,
    #[serde(default)]
    pub documents: KycDocuments,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    #[default]
    NotStarted,
    Pending,
    Approved,
    Rejected,
    RequiresResubmission,
}

/// The three KYC document slots
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KycDocuments {
    #[serde(default)]
    pub identity: Option<KycDocument>,
    #[serde(default)]
    pub address: Option<KycDocument>,
    #[serde(default)]
    pub income: Option<KycDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KycDocument {
    pub filename: Option<String>,
    pub original_name: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub status: DocumentStatus,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    pub uploaded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// Public view of a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub profile: Profile,
}

/// New user creation payload
#[derive(Debug, Clone)]
pub struct NewUser {
    pub auth_id: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub profile: Profile,
}

/// Request for user registration
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// Request for user login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Allow-listed profile fields accepted by `PUT /users/me`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub phone_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<Address>,
    pub interests: Option<Vec<String>>,
    pub profile_picture_url: Option<String>,
}

impl UpdateProfileRequest {
    /// True when no updatable field is present
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.username.is_none()
            && self.bio.is_none()
            && self.phone_number.is_none()
            && self.date_of_birth.is_none()
            && self.address.is_none()
            && self.interests.is_none()
            && self.profile_picture_url.is_none()
    }

    /// Merge the present fields into an existing profile
    pub fn apply(&self, profile: &mut Profile) {
        if let Some(v) = &self.first_name {
            profile.first_name = v.trim().to_string();
        }
        if let Some(v) = &self.last_name {
            profile.last_name = v.trim().to_string();
        }
        if let Some(v) = &self.username {
            profile.username = Some(v.trim().to_lowercase());
        }
        if let Some(v) = &self.bio {
            profile.bio = v.clone();
        }
        if let Some(v) = &self.phone_number {
            profile.phone_number = Some(v.trim().to_string());
        }
        if let Some(v) = self.date_of_birth {
            profile.date_of_birth = Some(v);
        }
        if let Some(v) = &self.address {
            profile.address = Some(v.clone());
        }
        if let Some(v) = &self.interests {
            profile.interests = v.clone();
        }
        if let Some(v) = &self.profile_picture_url {
            profile.profile_picture_url = Some(v.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_emptiness() {
        let req = UpdateProfileRequest::default();
        assert!(req.is_empty());

        let req = UpdateProfileRequest {
            bio: Some("hello".to_string()),
            ..Default::default()
        };
        assert!(!req.is_empty());
    }

    #[test]
    fn test_update_request_apply_merges_fields() {
        let mut profile = Profile {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            bio: "old bio".to_string(),
            ..Default::default()
        };

        let req = UpdateProfileRequest {
            username: Some("  Ada_L ".to_string()),
            bio: Some("new bio".to_string()),
            interests: Some(vec!["math".to_string()]),
            ..Default::default()
        };
        req.apply(&mut profile);

        assert_eq!(profile.first_name, "Ada");
        assert_eq!(profile.username.as_deref(), Some("ada_l"));
        assert_eq!(profile.bio, "new bio");
        assert_eq!(profile.interests, vec!["math".to_string()]);
    }

    #[test]
    fn test_profile_defaults_tolerate_sparse_documents() {
        let profile: Profile =
            serde_json::from_str(r#"{"first_name":"Ada","last_name":"Lovelace"}"#).unwrap();
        assert!(profile.interests.is_empty());
        assert!(profile.address.is_none());
        assert_eq!(profile.full_name(), "Ada Lovelace");
    }
}
