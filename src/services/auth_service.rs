use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use password_hash::rand_core::OsRng;
use sqlx::FromRow;
use validator::Validate;

use crate::{
    audit::{AuditAction, record},
    dto::auth::{Claims, LoginRequest, LoginResponse, RegisterRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Role, User},
    state::{AppState, AuthSettings},
};

#[derive(FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> AppResult<User> {
        let role = self
            .role
            .parse::<Role>()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("user {} has role {}", self.id, self.role)))?;
        Ok(User {
            id: self.id,
            username: self.username,
            email: self.email,
            role,
            created_at: self.created_at,
        })
    }
}

pub async fn register_user(state: &AppState, payload: RegisterRequest) -> AppResult<User> {
    payload.validate()?;
    let RegisterRequest {
        username,
        email,
        password,
    } = payload;

    let exist: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(email.as_str())
        .fetch_optional(&state.pool)
        .await?;

    if exist.is_some() {
        return Err(AppError::Validation("Email is already registered".to_string()));
    }

    let password_hash = hash_password(&password)?;

    // Registration always yields a plain user; admins come from the seed binary.
    let row: UserRow = sqlx::query_as(
        r#"
        INSERT INTO users (username, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        RETURNING id, username, email, password_hash, role, created_at
        "#,
    )
    .bind(username.as_str())
    .bind(email.as_str())
    .bind(password_hash)
    .bind(Role::User.as_str())
    .fetch_one(&state.pool)
    .await
    .map_err(|err| match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Validation("Email is already registered".to_string())
        }
        other => AppError::DbError(other),
    })?;
    let user = row.into_user()?;

    tracing::info!(user_id = user.id, "user registered");

    record(
        &state.pool,
        Some(user.id),
        AuditAction::UserRegister,
        serde_json::json!({ "user_id": user.id }),
    )
    .await;
    Ok(user)
}

pub async fn login_user(state: &AppState, payload: LoginRequest) -> AppResult<LoginResponse> {
    payload.validate()?;
    let LoginRequest { email, password } = payload;
    let row: Option<UserRow> = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, email, password_hash, role, created_at FROM users WHERE email = $1",
    )
    .bind(email.as_str())
    .fetch_optional(&state.pool)
    .await?;

    let row = match row {
        Some(u) => u,
        None => return Err(AppError::Validation("Invalid email or password".into())),
    };

    let parsed_hash = PasswordHash::new(&row.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;

    let argon2 = Argon2::default();
    if argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::Validation("Invalid email or password".into()));
    }

    let user = row.into_user()?;
    let token = issue_token(user.id, user.role, &state.auth)?;

    record(
        &state.pool,
        Some(user.id),
        AuditAction::UserLogin,
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(LoginResponse {
        message: "Login successful".into(),
        token,
        user,
    })
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

/// Sign an HS256 token carrying the user id and role.
pub fn issue_token(user_id: i64, role: Role, auth: &AuthSettings) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(auth.token_ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        role: role.as_str().to_string(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn verify_token(token: &str, auth: &AuthSettings) -> AppResult<AuthUser> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(auth.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    let user_id = decoded
        .claims
        .sub
        .parse::<i64>()
        .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;
    let role = decoded.claims.role.parse::<Role>()?;

    Ok(AuthUser { user_id, role })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn settings(secret: &str) -> AuthSettings {
        AuthSettings {
            jwt_secret: Arc::from(secret),
            token_ttl_hours: 1,
        }
    }

    #[test]
    fn issued_token_verifies_back_to_identity() {
        let auth = settings("test-secret");
        let token = issue_token(42, Role::Admin, &auth).unwrap();
        let user = verify_token(&token, &auth).unwrap();
        assert_eq!(user.user_id, 42);
        assert_eq!(user.role, Role::Admin);
    }

    #[test]
    fn token_signed_with_other_secret_is_unauthorized() {
        let token = issue_token(7, Role::User, &settings("one")).unwrap();
        let err = verify_token(&token, &settings("two")).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn expired_token_is_unauthorized() {
        let auth = settings("test-secret");
        let claims = Claims {
            sub: "7".into(),
            role: "user".into(),
            exp: (Utc::now() - Duration::hours(2)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        assert!(matches!(
            verify_token(&token, &auth),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn garbage_token_is_unauthorized() {
        assert!(matches!(
            verify_token("not-a-jwt", &settings("s")),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("hunter22").unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(
            Argon2::default()
                .verify_password(b"hunter22", &parsed)
                .is_ok()
        );
        assert!(Argon2::default().verify_password(b"wrong", &parsed).is_err());
    }
}
