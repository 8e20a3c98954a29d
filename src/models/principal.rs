//! Authorization context: the verified caller of an operation

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Staff,
    Member,
}

/// JWT claims issued by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub sub: String,
    pub role: Role,
    /// Member profile of the caller, if any
    pub member_id: Option<i32>,
    pub exp: i64,
    pub iat: i64,
}

impl Principal {
    /// Parse and verify a JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    /// Encode as a JWT token (used by tooling and tests)
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    pub fn staff(sub: impl Into<String>) -> Self {
        Self::new(sub.into(), Role::Staff, None)
    }

    pub fn member(sub: impl Into<String>, member_id: i32) -> Self {
        Self::new(sub.into(), Role::Member, Some(member_id))
    }

    fn new(sub: String, role: Role, member_id: Option<i32>) -> Self {
        let iat = Utc::now().timestamp();
        Self {
            sub,
            role,
            member_id,
            exp: iat + 3600,
            iat,
        }
    }

    pub fn is_staff(&self) -> bool {
        self.role == Role::Staff
    }

    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Authorization("Staff rights required".to_string()))
        }
    }

    /// Staff may act for any member; members only for themselves
    pub fn require_member_access(&self, member_id: i32) -> Result<(), AppError> {
        if self.is_staff() || self.member_id == Some(member_id) {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Cannot act on behalf of another member".to_string(),
            ))
        }
    }

    /// Member targeted by a request: the explicit one, or the caller's own
    pub fn resolve_member(&self, requested: Option<i32>) -> Result<i32, AppError> {
        let member_id = requested
            .or(self.member_id)
            .ok_or_else(|| AppError::Validation("member_id is required".to_string()))?;
        self.require_member_access(member_id)?;
        Ok(member_id)
    }
}
