use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::travel_request::Traveler;
use super::user::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Gender {
    #[serde(rename = "男")]
    Male,
    #[serde(rename = "女")]
    Female,
}

/// An identity document kept on file for quick booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdentityDocument {
    /// 身份证, 护照, ...
    #[serde(rename = "type")]
    pub doc_type: String,
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
}

/// ✅ **Traveller profile** stored next to the account. `chinese_name` doubles as
/// the account's display name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub chinese_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub english_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_place: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub documents: Vec<IdentityDocument>,
    /// Frequent fellow travellers.
    #[serde(default)]
    pub contacts: Vec<Traveler>,
}

impl UserProfile {
    /// The stored profile with blanks filled in from the account row.
    pub fn for_user(user: &User, stored: Option<UserProfile>) -> Self {
        let mut profile = stored.unwrap_or_default();
        if profile.chinese_name.trim().is_empty() {
            profile.chinese_name = user.name.clone();
        }
        if profile.email.is_none() {
            profile.email = Some(user.email.clone());
        }
        profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::user::Role;
    use chrono::Utc;
    use serde_json::json;

    fn user() -> User {
        User {
            id: "U-1".into(),
            name: "Wang".into(),
            email: "wang@corp.example".into(),
            role: Role::User,
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn account_fields_fill_an_empty_profile() {
        let profile = UserProfile::for_user(&user(), None);
        assert_eq!(profile.chinese_name, "Wang");
        assert_eq!(profile.email.as_deref(), Some("wang@corp.example"));
        assert!(profile.documents.is_empty());
        assert!(profile.contacts.is_empty());
    }

    #[test]
    fn stored_values_win() {
        let stored: UserProfile = serde_json::from_value(json!({
            "chineseName": "王伟",
            "gender": "男",
            "email": "private@example.com",
            "documents": [{ "type": "护照", "number": "E1234", "expiryDate": "2030-01-01" }]
        }))
        .unwrap();

        let profile = UserProfile::for_user(&user(), Some(stored));
        assert_eq!(profile.chinese_name, "王伟");
        assert_eq!(profile.gender, Some(Gender::Male));
        assert_eq!(profile.email.as_deref(), Some("private@example.com"));
        assert_eq!(profile.documents[0].doc_type, "护照");

        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["documents"][0]["type"], "护照");
        assert_eq!(value["gender"], "男");
    }
}
