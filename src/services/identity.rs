// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider client (email + password accounts).
//!
//! Production uses the Firebase Auth REST API:
//! - `accounts:signUp` to create an account
//! - `accounts:signInWithPassword` to sign in or re-authenticate
//!
//! Set FIREBASE_AUTH_EMULATOR_HOST to talk to the local Auth emulator.

use crate::error::AppError;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Account returned by a successful sign-up or sign-in.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AppError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AppError>;
}

/// Firebase Auth REST client.
#[derive(Clone)]
pub struct FirebaseIdentity {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl FirebaseIdentity {
    pub fn new(api_key: &str) -> Self {
        let base_url = match std::env::var("FIREBASE_AUTH_EMULATOR_HOST") {
            Ok(host) => format!("http://{}/identitytoolkit.googleapis.com/v1", host),
            Err(_) => "https://identitytoolkit.googleapis.com/v1".to_string(),
        };
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key: api_key.to_string(),
        }
    }

    async fn call(&self, method: &str, email: &str, password: &str) -> Result<Identity, AppError> {
        let url = format!("{}/accounts:{}", self.base_url, method);
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Identity(format!("Identity provider unreachable: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let code = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("HTTP {}", status));
            tracing::warn!(method, code = %code, "Identity provider rejected request");
            return Err(AppError::Identity(describe_error(&code).to_string()));
        }

        let auth: AuthResponse = response
            .json()
            .await
            .map_err(|e| AppError::Identity(format!("Malformed identity response: {}", e)))?;

        Ok(Identity {
            uid: auth.local_id,
            email: auth.email.filter(|e| !e.is_empty()),
        })
    }
}

/// Human-readable text for Firebase Auth error codes.
///
/// Codes can carry a suffix (`WEAK_PASSWORD : Password should be ...`).
fn describe_error(code: &str) -> &str {
    let key = code.split(" : ").next().unwrap_or(code).trim();
    match key {
        "EMAIL_EXISTS" => "The email address is already in use by another account.",
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            "Invalid email or password."
        }
        "INVALID_EMAIL" => "The email address is badly formatted.",
        "WEAK_PASSWORD" => "Password should be at least 6 characters.",
        "USER_DISABLED" => "This account has been disabled.",
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "Too many attempts. Please try again later.",
        _ => code,
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        self.call("signUp", email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        self.call("signInWithPassword", email, password).await
    }
}

/// In-process account registry for tests and offline runs.
#[derive(Default)]
pub struct MemoryIdentity {
    /// email -> (uid, password)
    accounts: DashMap<String, (String, String)>,
    next_id: AtomicU64,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        if password.len() < 6 {
            return Err(AppError::Identity(describe_error("WEAK_PASSWORD").to_string()));
        }
        let key = email.to_lowercase();
        match self.accounts.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(AppError::Identity(
                describe_error("EMAIL_EXISTS").to_string(),
            )),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let uid = format!("user-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
                slot.insert((uid.clone(), password.to_string()));
                Ok(Identity {
                    uid,
                    email: Some(email.to_string()),
                })
            }
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        match self.accounts.get(&email.to_lowercase()) {
            Some(account) if account.1 == password => Ok(Identity {
                uid: account.0.clone(),
                email: Some(email.to_string()),
            }),
            _ => Err(AppError::Identity(
                describe_error("INVALID_LOGIN_CREDENTIALS").to_string(),
            )),
        }
    }
}
