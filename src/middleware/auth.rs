// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT session middleware and token helpers.
//!
//! A session token is issued at sign-in and re-issued with `pin_unlocked`
//! set once the user passes the PIN gate. Reminder callbacks from Cloud
//! Tasks carry a separate token scoped to the `reminder` audience.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub const SESSION_COOKIE: &str = "pulse_session";
pub const REMINDER_AUDIENCE: &str = "reminder";
const SESSION_TTL_SECS: usize = 30 * 24 * 60 * 60; // 30 days

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (identity provider uid)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    /// Whether the PIN gate has been passed in this session
    #[serde(default)]
    pub pin_unlocked: bool,
}

/// Claims of a reminder callback token.
#[derive(Debug, Serialize, Deserialize)]
struct ReminderClaims {
    sub: String,
    aud: String,
    exp: usize,
    iat: usize,
    /// Name of the queued task this token was minted for.
    task: String,
}

/// Verified contents of a reminder callback token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderGrant {
    pub uid: String,
    pub task: String,
}

/// Authenticated user extracted from JWT.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: String,
    pub pin_unlocked: bool,
}

fn now_secs() -> Result<usize, AppError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_secs() as usize)
}

/// Session token from the cookie, else from an `Authorization: Bearer` header.
pub fn session_token(jar: &CookieJar, headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.to_string())
}

/// Decode and validate a session token.
pub fn verify_session_jwt(token: &str, signing_key: &[u8]) -> Result<AuthUser, AppError> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);

    let data = decode::<Claims>(token, &key, &validation).map_err(|_| AppError::InvalidToken)?;
    if data.claims.sub.is_empty() {
        return Err(AppError::InvalidToken);
    }
    Ok(AuthUser {
        uid: data.claims.sub,
        pin_unlocked: data.claims.pin_unlocked,
    })
}

/// Middleware that requires a valid session.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = session_token(&jar, request.headers()).ok_or(AppError::Unauthorized)?;
    let auth_user = verify_session_jwt(&token, &state.config.jwt_signing_key)?;

    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

/// Middleware that additionally requires the PIN gate to be unlocked.
///
/// Must run after [`require_auth`].
pub async fn require_pin_unlocked(request: Request, next: Next) -> Result<Response, AppError> {
    let unlocked = request
        .extensions()
        .get::<AuthUser>()
        .map(|user| user.pin_unlocked)
        .ok_or(AppError::Unauthorized)?;

    if !unlocked {
        return Err(AppError::PinRequired);
    }
    Ok(next.run(request).await)
}

/// Create a JWT for a user session.
pub fn create_session_jwt(
    uid: &str,
    pin_unlocked: bool,
    signing_key: &[u8],
) -> anyhow::Result<String> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: uid.to_string(),
        iat: now,
        exp: now + SESSION_TTL_SECS,
        pin_unlocked,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

/// Session cookie carrying `token`.
pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::seconds(SESSION_TTL_SECS as i64))
        .build()
}

/// Expired session cookie with the same attributes, for sign-out.
pub fn removal_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::ZERO)
        .build()
}

/// Token authorizing the callback of reminder task `task` for `uid`.
pub fn create_reminder_token(
    uid: &str,
    task: &str,
    signing_key: &[u8],
    expires_at: DateTime<Utc>,
) -> Result<String, AppError> {
    let claims = ReminderClaims {
        sub: uid.to_string(),
        aud: REMINDER_AUDIENCE.to_string(),
        exp: expires_at.timestamp().max(0) as usize,
        iat: now_secs()?,
        task: task.to_string(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))
}

/// Validate a reminder callback token.
pub fn verify_reminder_token(token: &str, signing_key: &[u8]) -> Result<ReminderGrant, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[REMINDER_AUDIENCE]);

    let data = decode::<ReminderClaims>(token, &DecodingKey::from_secret(signing_key), &validation)
        .map_err(|e| {
            tracing::warn!(error = %e, "Rejected reminder token");
            AppError::InvalidToken
        })?;
    Ok(ReminderGrant {
        uid: data.claims.sub,
        task: data.claims.task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"test_jwt_key_32_bytes_minimum!!";

    #[test]
    fn test_session_round_trip() {
        let token = create_session_jwt("user-1", true, KEY).unwrap();
        let user = verify_session_jwt(&token, KEY).unwrap();
        assert_eq!(user.uid, "user-1");
        assert!(user.pin_unlocked);

        assert!(verify_session_jwt(&token, b"another_key_that_is_long_enough").is_err());
    }

    #[test]
    fn test_reminder_token_is_not_a_session() {
        let reminder = create_reminder_token(
            "user-1",
            "queues/q/tasks/t1",
            KEY,
            Utc::now() + chrono::Duration::hours(1),
        )
        .unwrap();
        let grant = verify_reminder_token(&reminder, KEY).unwrap();
        assert_eq!(grant.uid, "user-1");
        assert_eq!(grant.task, "queues/q/tasks/t1");
        assert!(verify_session_jwt(&reminder, KEY).is_err());

        let session = create_session_jwt("user-1", true, KEY).unwrap();
        assert!(verify_reminder_token(&session, KEY).is_err());
    }

    #[test]
    fn test_expired_reminder_token_rejected() {
        let token =
            create_reminder_token("user-1", "t1", KEY, Utc::now() - chrono::Duration::hours(2))
                .unwrap();
        assert!(verify_reminder_token(&token, KEY).is_err());
    }

    #[test]
    fn test_cookie_attributes() {
        let cookie = session_cookie("abc".to_string(), true).to_string();
        assert!(cookie.starts_with("pulse_session=abc"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("Path=/"));

        let removal = removal_cookie(false).to_string();
        assert!(removal.contains("Max-Age=0"));
        assert!(!removal.contains("Secure"));
    }
}
