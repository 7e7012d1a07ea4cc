use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::claims::{validate_jwt, Claims, ClaimsError};
use super::roles::SUPER_ADMIN;

/// Current user as supplied by the identity provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identity {
    pub tenant: String,
    pub user: String,
    pub role: Option<String>,
    pub is_super_admin: bool,
    pub session_id: Uuid,
    /// When the credential behind this identity stops being accepted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Identity {
    pub fn new(tenant: impl Into<String>, user: impl Into<String>, role: Option<&str>) -> Self {
        Self {
            tenant: tenant.into(),
            user: user.into(),
            role: role.map(str::to_string),
            is_super_admin: role.is_some_and(|r| r.eq_ignore_ascii_case(SUPER_ADMIN)),
            session_id: Uuid::new_v4(),
            expires_at: None,
        }
    }

    pub fn with_session(mut self, session_id: Uuid) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Same person in the same session; a refreshed token differs only in expiry
    pub fn same_principal(&self, other: &Identity) -> bool {
        self.session_id == other.session_id
            && self.tenant == other.tenant
            && self.user == other.user
            && self.role == other.role
            && self.is_super_admin == other.is_super_admin
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        let is_super_admin = claims.super_admin
            || claims
                .role
                .as_deref()
                .is_some_and(|r| r.eq_ignore_ascii_case(SUPER_ADMIN));
        Self {
            tenant: claims.tenant,
            user: claims.user,
            role: claims.role,
            is_super_admin,
            session_id: claims.sid,
            expires_at: Utc.timestamp_opt(claims.exp, 0).single(),
        }
    }
}

/// Turns a bearer credential into an identity
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn identify(&self, token: &str) -> Result<Identity, ClaimsError>;
}

/// Verifies HS256 session tokens locally
#[derive(Debug, Clone)]
pub struct JwtIdentityProvider {
    secret: String,
}

impl JwtIdentityProvider {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn identify(&self, token: &str) -> Result<Identity, ClaimsError> {
        let claims = validate_jwt(token, &self.secret)?;
        Ok(Identity::from(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::generate_jwt;

    #[test]
    fn test_super_admin_from_role_name() {
        assert!(Identity::new("t", "root", Some("super_admin")).is_super_admin);
        assert!(!Identity::new("t", "ana", Some("OWNER")).is_super_admin);
        assert!(!Identity::new("t", "ghost", None).is_super_admin);
    }

    #[tokio::test]
    async fn test_jwt_provider_identifies() {
        let sid = Uuid::new_v4();
        let claims = Claims::new("bistro".into(), "sam".into(), Some("STAFF".into()), true, sid, 1);
        let token = generate_jwt(&claims, "s3cret").unwrap();

        let identity = JwtIdentityProvider::new("s3cret").identify(&token).await.unwrap();
        assert_eq!(identity.user, "sam");
        assert_eq!(identity.session_id, sid);
        assert!(identity.is_super_admin);
        assert_eq!(identity.expires_at.map(|at| at.timestamp()), Some(claims.exp));
    }

    #[tokio::test]
    async fn test_jwt_provider_rejects_garbage() {
        let result = JwtIdentityProvider::new("s3cret").identify("not-a-token").await;
        assert!(result.is_err());
    }
}
