use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Doctor,
    Admin,
}

impl Role {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "patient" | "user" => Some(Role::Patient),
            "doctor" => Some(Role::Doctor),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Authenticated principal placed in request extensions by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn principal_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.id).ok()
    }

    pub fn principal_role(&self) -> Option<Role> {
        self.role.as_deref().and_then(Role::parse)
    }

    pub fn is_admin(&self) -> bool {
        self.principal_role() == Some(Role::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing() {
        assert_eq!(Role::parse("doctor"), Some(Role::Doctor));
        assert_eq!(Role::parse("user"), Some(Role::Patient));
        assert_eq!(Role::parse("superuser"), None);
    }

    #[test]
    fn principal_id_requires_uuid() {
        let user = User {
            id: "not-a-uuid".to_string(),
            email: None,
            role: Some("admin".to_string()),
            metadata: None,
            created_at: None,
        };
        assert!(user.principal_id().is_none());
        assert!(user.is_admin());
    }
}
