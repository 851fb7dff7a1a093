//! User model, roles and JWT claims

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
    Moderator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
            Role::Moderator => "MODERATOR",
        }
    }

    /// Admins and moderators review borrow requests
    pub fn is_reviewer(&self) -> bool {
        matches!(self, Role::Admin | Role::Moderator)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            "MODERATOR" => Ok(Role::Moderator),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

super::text_enum_sqlx!(Role);

/// Full user model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub display_name: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Public profile, resolved from a token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: i32,
    pub email: String,
    pub display_name: String,
    pub role: Role,
}

impl From<User> for UserProfile {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            display_name: u.display_name,
            role: u.role,
        }
    }
}

/// Register request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterUser {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 255, message = "Display name must be 1 to 255 characters"))]
    pub display_name: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub password: String,
}

/// Update role request (admin only)
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRole {
    pub role: Role,
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    /// User email
    pub sub: String,
    pub user_id: i32,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_reviewer(&self) -> bool {
        self.role.is_reviewer()
    }

    /// Require admin privileges
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator privileges required".to_string()))
        }
    }

    /// Require admin or moderator privileges
    pub fn require_reviewer(&self) -> Result<(), AppError> {
        if self.is_reviewer() {
            Ok(())
        } else {
            Err(AppError::Authorization("Reviewer privileges required".to_string()))
        }
    }

    /// Allow the owner of a resource, or any reviewer
    pub fn require_owner_or_reviewer(&self, owner_id: i32) -> Result<(), AppError> {
        if self.user_id == owner_id || self.is_reviewer() {
            Ok(())
        } else {
            Err(AppError::Authorization("Not allowed to access this request".to_string()))
        }
    }

    /// Replace the token's role with the account's current one.
    ///
    /// Role changes take effect on the next request, not at token expiry.
    pub fn with_current_role(mut self, user: &User) -> Result<Self, AppError> {
        if user.id != self.user_id {
            return Err(AppError::Authentication("Token does not match account".to_string()));
        }
        self.role = user.role;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: Role) -> UserClaims {
        let now = Utc::now().timestamp();
        UserClaims {
            sub: "kim@example.org".to_string(),
            user_id: 42,
            role,
            exp: now + 3600,
            iat: now,
        }
    }

    #[test]
    fn test_token_round_trip() {
        let token = claims(Role::Moderator).create_token("secret").unwrap();
        let decoded = UserClaims::from_token(&token, "secret").unwrap();
        assert_eq!(decoded.user_id, 42);
        assert_eq!(decoded.role, Role::Moderator);
        assert!(UserClaims::from_token(&token, "other").is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let mut c = claims(Role::User);
        c.exp = Utc::now().timestamp() - 3600;
        let token = c.create_token("secret").unwrap();
        assert!(UserClaims::from_token(&token, "secret").is_err());
    }

    #[test]
    fn test_role_checks() {
        assert!(claims(Role::Admin).require_admin().is_ok());
        assert!(claims(Role::Moderator).require_admin().is_err());
        assert!(claims(Role::Moderator).require_reviewer().is_ok());
        assert!(claims(Role::User).require_reviewer().is_err());
        assert!(claims(Role::User).require_owner_or_reviewer(42).is_ok());
        assert!(claims(Role::User).require_owner_or_reviewer(7).is_err());
    }

    fn account(id: i32, role: Role) -> User {
        User {
            id,
            email: "kim@example.org".to_string(),
            display_name: "Kim".to_string(),
            password: String::new(),
            role,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_demoted_token_loses_review_rights() {
        let token = claims(Role::Moderator).create_token("secret").unwrap();
        let decoded = UserClaims::from_token(&token, "secret").unwrap();
        assert!(decoded.require_reviewer().is_ok());

        let current = decoded.with_current_role(&account(42, Role::User)).unwrap();
        assert_eq!(current.role, Role::User);
        assert!(current.require_reviewer().is_err());
        assert!(current.require_admin().is_err());
    }

    #[test]
    fn test_promoted_token_gains_rights() {
        let current = claims(Role::User)
            .with_current_role(&account(42, Role::Admin))
            .unwrap();
        assert!(current.require_admin().is_ok());
    }

    #[test]
    fn test_current_role_requires_same_account() {
        let err = claims(Role::Admin)
            .with_current_role(&account(7, Role::Admin))
            .unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&Role::Moderator).unwrap(), "\"MODERATOR\"");
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
    }

    #[test]
    fn test_register_validation() {
        let req = RegisterUser {
            email: "not-an-email".to_string(),
            password: "longenough".to_string(),
            display_name: "Kim".to_string(),
        };
        assert!(req.validate().is_err());
    }
}
