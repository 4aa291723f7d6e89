//! Caller identity claims
//!
//! The identity provider is an external collaborator; this module only
//! validates and decodes the bearer token it issued. Roles are trusted as
//! presented.

use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::enums::{BorrowerType, Role};
use crate::error::{AppError, AppResult};

/// Claims carried in the bearer token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserClaims {
    /// Identity reference (student/faculty id or guest tag)
    pub sub: String,
    pub name: String,
    pub role: Role,
    pub email: Option<String>,
    pub exp: i64,
}

impl UserClaims {
    /// Decode and validate a bearer token
    pub fn from_token(token: &str, secret: &str) -> AppResult<Self> {
        let data = decode::<UserClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| AppError::Authentication(format!("Invalid token: {}", e)))?;
        Ok(data.claims)
    }

    /// Borrower category corresponding to the caller's role
    pub fn borrower_type(&self) -> BorrowerType {
        match self.role {
            Role::Student => BorrowerType::Student,
            Role::Faculty => BorrowerType::Faculty,
            Role::Admin => BorrowerType::Faculty,
        }
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(AppError::Authorization("Admin role required".to_string()))
        }
    }

    /// Admins may act on any reservation; everyone else only on their own
    pub fn require_owner(&self, borrower_ref: &str) -> AppResult<()> {
        if self.role == Role::Admin || self.sub == borrower_ref {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Reservation belongs to another borrower".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: &str, role: Role) -> UserClaims {
        UserClaims {
            sub: sub.to_string(),
            name: sub.to_string(),
            role,
            email: None,
            exp: 0,
        }
    }

    #[test]
    fn owner_check_rejects_other_borrowers() {
        let student = claims("s-1001", Role::Student);
        assert!(student.require_owner("s-1001").is_ok());
        assert!(matches!(
            student.require_owner("s-2002"),
            Err(AppError::Authorization(_))
        ));
    }

    #[test]
    fn admins_may_act_on_any_reservation() {
        let admin = claims("admin", Role::Admin);
        assert!(admin.require_owner("s-1001").is_ok());
        assert!(claims("prof", Role::Faculty).require_owner("s-1001").is_err());
    }

    #[test]
    fn role_gate() {
        assert!(claims("admin", Role::Admin).require_admin().is_ok());
        assert!(claims("s-1001", Role::Student).require_admin().is_err());
    }
}
