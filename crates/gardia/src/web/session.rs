//! Admin sessions.
//!
//! Sessions live in memory only; restarting the server logs everyone out.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use axum::http::{header, HeaderMap};
use tracing::debug;

use crate::config::AdminConfig;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "admin_session";

#[derive(Debug, Clone)]
struct Session {
    username: String,
    created: Instant,
}

/// In-memory store of admin sessions, keyed by session id.
///
/// A session expires `timeout` after its creation, matching the cookie's
/// `Max-Age`.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a session for `username` and return its id.
    pub fn create(&self, username: &str) -> String {
        let id = new_session_id();
        self.sessions().insert(
            id.clone(),
            Session {
                username: username.to_string(),
                created: Instant::now(),
            },
        );
        id
    }

    /// Whether `id` names a live session. Expired sessions are removed first.
    pub fn validate(&self, id: &str, timeout: Duration) -> bool {
        let mut sessions = self.sessions();
        let before = sessions.len();
        sessions.retain(|_, session| session.created.elapsed() < timeout);
        if sessions.len() < before {
            debug!("Expired {} admin session(s)", before - sessions.len());
        }

        sessions.contains_key(id)
    }

    /// User owning session `id`, if it exists.
    #[must_use]
    pub fn username(&self, id: &str) -> Option<String> {
        self.sessions().get(id).map(|s| s.username.clone())
    }

    /// Time left before session `id` expires under `timeout`.
    #[must_use]
    pub fn expires_in(&self, id: &str, timeout: Duration) -> Option<Duration> {
        self.sessions()
            .get(id)
            .map(|s| timeout.saturating_sub(s.created.elapsed()))
    }

    /// Close session `id`. Returns whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        self.sessions().remove(id).is_some()
    }

    /// Number of sessions, including expired ones not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions().is_empty()
    }
}

/// 64 hex chars: BLAKE3 over fresh random bytes and the current time.
fn new_session_id() -> String {
    let entropy: [u8; 32] = rand::random();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos());

    let mut hasher = blake3::Hasher::new();
    hasher.update(&entropy);
    hasher.update(&nanos.to_le_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Compare submitted credentials with the configured ones. Both fields are
/// always compared, through BLAKE3 digests whose equality is constant-time.
#[must_use]
pub fn credentials_match(username: &str, password: &str, admin: &AdminConfig) -> bool {
    let user_ok = blake3::hash(username.as_bytes()) == blake3::hash(admin.username.as_bytes());
    let pass_ok = blake3::hash(password.as_bytes()) == blake3::hash(admin.password.as_bytes());
    user_ok & pass_ok
}

/// The session id carried by the request's cookies, if any.
#[must_use]
pub fn session_id_from(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value opening a session.
#[must_use]
pub fn session_cookie(id: &str, timeout: Duration) -> String {
    format!(
        "{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Strict; Max-Age={}",
        timeout.as_secs()
    )
}

/// `Set-Cookie` value clearing the session cookie.
#[must_use]
pub fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0")
}
