//! Opaque bearer-token sessions.
//!
//! Usernames are claims, not accounts: opening a session needs nothing but
//! a plausible username, and handlers trust the identity fields inside
//! request bodies. What the tokens gate is the write surface as a whole,
//! so the client-side refresh flow has something real to exercise.
//!
//! Access tokens expire after a configurable TTL; refresh tokens live
//! until used and are rotated on every refresh. Everything is in memory,
//! so a restart signs everyone out.

use axum::http::HeaderMap;
use rand::RngCore;
use soapbox::api::SessionData;
use soapbox::board::constants::MAX_USERNAME_SIZE;
use soapbox::{Result, SoapboxError};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const TOKEN_BYTES: usize = 32;

/// Access-entry count that triggers a sweep of expired entries.
const SWEEP_THRESHOLD: usize = 1024;

#[derive(Debug, Clone)]
struct AccessEntry {
    username: String,
    expires_at: Instant,
}

/// In-memory issuer and verifier of session tokens.
#[derive(Debug)]
pub struct TokenStore {
    /// Access token -> who it belongs to and until when.
    access: Mutex<HashMap<String, AccessEntry>>,
    /// Refresh token -> username.
    refresh: Mutex<HashMap<String, String>>,
    access_ttl: Duration,
}

impl TokenStore {
    pub fn new(access_ttl: Duration) -> Self {
        TokenStore {
            access: Mutex::new(HashMap::new()),
            refresh: Mutex::new(HashMap::new()),
            access_ttl,
        }
    }

    fn access_lock(&self) -> MutexGuard<'_, HashMap<String, AccessEntry>> {
        self.access.lock().unwrap_or_else(|poisoned| {
            warn!("access token map was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn refresh_lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.refresh.lock().unwrap_or_else(|poisoned| {
            warn!("refresh token map was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Opens a session for `username` and issues both tokens.
    pub fn open_session(&self, username: &str) -> Result<SessionData> {
        let username = username.trim();
        if username.is_empty() {
            return Err(SoapboxError::unauthenticated("a username is required"));
        }
        if username.len() > MAX_USERNAME_SIZE {
            return Err(SoapboxError::validation(format!(
                "username exceeds {} bytes",
                MAX_USERNAME_SIZE
            )));
        }

        info!(username, "session opened");
        Ok(self.issue(username.to_string()))
    }

    /// Exchanges a refresh token for a fresh token pair.
    ///
    /// The spent refresh token dies here; the new pair replaces it.
    pub fn refresh(&self, refresh_token: &str) -> Option<SessionData> {
        let username = self.refresh_lock().remove(refresh_token)?;
        debug!(username = %username, "access token refreshed");
        Some(self.issue(username))
    }

    /// Resolves an access token to its username, or `None` when the token
    /// is unknown or expired. Expired entries are dropped on the spot.
    pub fn verify(&self, token: &str) -> Option<String> {
        let mut access = self.access_lock();
        match access.get(token) {
            Some(entry) if Instant::now() < entry.expires_at => Some(entry.username.clone()),
            Some(_) => {
                access.remove(token);
                None
            }
            None => None,
        }
    }

    fn issue(&self, username: String) -> SessionData {
        let access_token = random_token();
        let refresh_token = random_token();

        {
            let mut access = self.access_lock();
            if access.len() >= SWEEP_THRESHOLD {
                let now = Instant::now();
                access.retain(|_, entry| now < entry.expires_at);
            }
            access.insert(
                access_token.clone(),
                AccessEntry {
                    username: username.clone(),
                    expires_at: Instant::now() + self.access_ttl,
                },
            );
        }
        self.refresh_lock()
            .insert(refresh_token.clone(), username.clone());

        SessionData {
            username,
            access_token,
            refresh_token,
            expires_in_secs: self.access_ttl.as_secs(),
        }
    }
}

fn random_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Pulls the bearer token out of an Authorization header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
