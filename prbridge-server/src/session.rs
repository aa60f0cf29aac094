//! Cookie sessions and CSRF verification.
//!
//! Sessions are opaque server-side tokens delivered as an HttpOnly cookie.
//! The CSRF token is derived from the session token with HMAC-SHA256 and
//! delivered in a readable cookie; state-changing requests must echo it in
//! the `x-csrf-token` header (double submit). Expired sessions produce a
//! 401 carrying `token_expired: true` so clients refresh and retry once.

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use prbridge_core::Actor;

use crate::error::ApiError;
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "session";
pub const CSRF_COOKIE: &str = "csrf";
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Which side of the marketplace a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    Brand,
    Creator,
}

impl PartyRole {
    pub fn actor(self) -> Actor {
        match self {
            Self::Brand => Actor::Brand,
            Self::Creator => Actor::Creator,
        }
    }
}

/// A live session record.
#[derive(Debug, Clone)]
pub struct Session {
    pub party_id: Uuid,
    pub role: PartyRole,
    pub expires_at: DateTime<Utc>,
}

/// The authenticated party, inserted into request extensions by the
/// middleware for handlers to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthedParty {
    pub party_id: Uuid,
    pub role: PartyRole,
}

/// A freshly issued (or rotated) session, returned to the client.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedSession {
    pub session_token: String,
    pub csrf_token: String,
    pub party_id: Uuid,
    pub role: PartyRole,
    pub expires_at: DateTime<Utc>,
}

/// Why authentication failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    Unknown,
    Expired,
}

/// In-memory session store with HMAC-derived CSRF tokens.
pub struct SessionStore {
    secret: String,
    ttl: Duration,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new(secret: impl Into<String>, ttl_minutes: i64) -> Self {
        Self {
            secret: secret.into(),
            ttl: Duration::minutes(ttl_minutes),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Issue a new session for a party.
    pub async fn issue(&self, party_id: Uuid, role: PartyRole) -> IssuedSession {
        let session_token = Uuid::new_v4().simple().to_string();
        let csrf_token = self.csrf_for(&session_token);
        let expires_at = Utc::now() + self.ttl;

        let mut sessions = self.sessions.write().await;
        sessions.insert(
            session_token.clone(),
            Session {
                party_id,
                role,
                expires_at,
            },
        );

        IssuedSession {
            session_token,
            csrf_token,
            party_id,
            role,
            expires_at,
        }
    }

    /// Derive the CSRF token for a session token.
    pub fn csrf_for(&self, session_token: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts keys of any size");
        mac.update(session_token.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time check of a provided CSRF token against the session.
    pub fn verify_csrf(&self, session_token: &str, provided: &str) -> bool {
        let provided_bytes = match hex::decode(provided) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        let mut mac = match HmacSha256::new_from_slice(self.secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return false,
        };
        mac.update(session_token.as_bytes());
        mac.verify_slice(&provided_bytes).is_ok()
    }

    /// Look up a session token, rejecting unknown and expired tokens.
    pub async fn authenticate(&self, session_token: &str) -> Result<Session, AuthFailure> {
        let sessions = self.sessions.read().await;
        match sessions.get(session_token) {
            None => Err(AuthFailure::Unknown),
            Some(session) if session.expires_at <= Utc::now() => Err(AuthFailure::Expired),
            Some(session) => Ok(session.clone()),
        }
    }

    /// Rotate a session: the old token (expired or not) is invalidated and a
    /// fresh one issued for the same party. Unknown tokens are rejected.
    pub async fn refresh(&self, session_token: &str) -> Result<IssuedSession, AuthFailure> {
        let old = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(session_token).ok_or(AuthFailure::Unknown)?
        };
        Ok(self.issue(old.party_id, old.role).await)
    }
}

/// Read a cookie value out of the Cookie header.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    let prefix = format!("{}=", name);
    cookies
        .split(';')
        .map(|cookie| cookie.trim())
        .find_map(|cookie| cookie.strip_prefix(prefix.as_str()))
        .map(|value| value.to_string())
}

/// Middleware guarding all party-scoped routes.
///
/// Verifies the session cookie, enforces the CSRF echo on state-changing
/// methods, and inserts `AuthedParty` into request extensions.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = cookie_value(request.headers(), SESSION_COOKIE).ok_or(
        ApiError::Unauthenticated {
            token_expired: false,
        },
    )?;

    let session = state
        .sessions
        .authenticate(&token)
        .await
        .map_err(|failure| ApiError::Unauthenticated {
            token_expired: failure == AuthFailure::Expired,
        })?;

    if !request.method().is_safe() {
        let provided = request
            .headers()
            .get(CSRF_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Forbidden("missing csrf token".to_string()))?;
        if !state.sessions.verify_csrf(&token, provided) {
            return Err(ApiError::Forbidden("csrf token mismatch".to_string()));
        }
    }

    request.extensions_mut().insert(AuthedParty {
        party_id: session.party_id,
        role: session.role,
    });

    Ok(next.run(request).await)
}
