//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{LoginRequest, RegisterUser, Role, User, UserClaims, UserProfile},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Create an account; USER unless the email is the configured admin email
    pub async fn register(&self, data: RegisterUser) -> AppResult<User> {
        data.validate()?;

        let email = data.email.trim();
        if self.repository.users.email_exists(email).await? {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let role = initial_role(email, self.config.admin_email.as_deref());
        let hash = self.hash_password(&data.password)?;
        let user = self.repository.users.create(&data, &hash, role).await?;
        tracing::info!(user_id = user.id, role = %user.role, "User registered");
        Ok(user)
    }

    /// Check credentials and return a JWT with the user
    pub async fn authenticate(&self, data: LoginRequest) -> AppResult<(String, User)> {
        data.validate()?;

        let user = self
            .repository
            .users
            .get_by_email(data.email.trim())
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !self.verify_password(&user, &data.password)? {
            tracing::warn!(user_id = user.id, "Failed login attempt");
            return Err(AppError::Authentication("Invalid email or password".to_string()));
        }

        let token = self.create_token_for_user(&user)?;
        Ok((token, user))
    }

    /// Reload the account behind a validated token and apply its current role.
    ///
    /// A deleted account is an authentication failure.
    pub async fn current_claims(&self, claims: UserClaims) -> AppResult<UserClaims> {
        let user = match self.repository.users.get_by_id(claims.user_id).await {
            Ok(user) => user,
            Err(AppError::NotFound(_)) => {
                return Err(AppError::Authentication("Account no longer exists".to_string()))
            }
            Err(e) => return Err(e),
        };
        claims.with_current_role(&user)
    }

    /// Resolve the profile behind a validated token
    pub async fn profile(&self, claims: &UserClaims) -> AppResult<UserProfile> {
        let user = self.repository.users.get_by_id(claims.user_id).await?;
        Ok(user.into())
    }

    pub async fn list(&self) -> AppResult<Vec<UserProfile>> {
        let users = self.repository.users.list().await?;
        Ok(users.into_iter().map(UserProfile::from).collect())
    }

    /// Change a user's role (admin only). Admins cannot demote themselves.
    pub async fn update_role(&self, claims: &UserClaims, user_id: i32, role: Role) -> AppResult<UserProfile> {
        claims.require_admin()?;
        if claims.user_id == user_id && role != Role::Admin {
            return Err(AppError::BusinessRule(
                "Administrators cannot remove their own admin role".to_string(),
            ));
        }

        let user = self.repository.users.update_role(user_id, role).await?;
        tracing::info!(user_id, role = %role, by = claims.user_id, "User role changed");
        Ok(user.into())
    }

    fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.email.clone(),
            user_id: user.id,
            role: user.role,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }
}

fn initial_role(email: &str, admin_email: Option<&str>) -> Role {
    match admin_email {
        Some(admin) if admin.trim().eq_ignore_ascii_case(email) => Role::Admin,
        _ => Role::User,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_role() {
        assert_eq!(initial_role("ops@time2use.org", None), Role::User);
        assert_eq!(
            initial_role("Ops@Time2Use.org", Some("ops@time2use.org")),
            Role::Admin
        );
        assert_eq!(
            initial_role("someone@time2use.org", Some("ops@time2use.org")),
            Role::User
        );
    }
}
