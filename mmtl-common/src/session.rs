//! Admin session tokens
//!
//! The `admin_auth` cookie carries `<expiry>.<signature>` where `expiry` is a
//! Unix timestamp in seconds and `signature` is the hex HMAC-SHA256 of
//! `admin_auth:<expiry>` under a server secret. Possession of an unexpired,
//! correctly signed token is the whole session; there is no server-side
//! session table, so logging out only clears the browser's copy.
//!
//! This module contains pure functions only; HTTP wiring lives in the gateway.

use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Cookie name
pub const SESSION_COOKIE: &str = "admin_auth";

/// Cookie lifetime (24 hours)
pub const SESSION_MAX_AGE_SECS: i64 = 24 * 60 * 60;

/// Session token verification errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Malformed session token")]
    Malformed,

    #[error("Session token signature mismatch")]
    BadSignature,

    #[error("Session expired at {0}")]
    Expired(DateTime<Utc>),

    #[error("Invalid session key")]
    Key,
}

/// A freshly issued token
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies signed session tokens
#[derive(Clone)]
pub struct SessionSigner {
    secret: Vec<u8>,
    ttl: Duration,
}

impl std::fmt::Debug for SessionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSigner")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionSigner {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            ttl: Duration::seconds(SESSION_MAX_AGE_SECS),
        }
    }

    /// Signer with a random 32-byte secret; tokens die with the process
    pub fn random() -> Self {
        let mut secret = vec![0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        Self::new(secret)
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl.num_seconds()
    }

    fn mac_for(&self, expiry: i64) -> Result<HmacSha256, SessionError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).map_err(|_| SessionError::Key)?;
        mac.update(format!("{}:{}", SESSION_COOKIE, expiry).as_bytes());
        Ok(mac)
    }

    /// Issue a token valid for the signer's TTL from `now`
    pub fn issue(&self, now: DateTime<Utc>) -> Result<SessionToken, SessionError> {
        let expires_at = now + self.ttl;
        let expiry = expires_at.timestamp();
        let signature = hex::encode(self.mac_for(expiry)?.finalize().into_bytes());

        Ok(SessionToken {
            value: format!("{}.{}", expiry, signature),
            expires_at,
        })
    }

    /// Verify a token, returning its expiry
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::Utc;
    /// use mmtl_common::session::SessionSigner;
    ///
    /// let signer = SessionSigner::new("secret");
    /// let token = signer.issue(Utc::now()).unwrap();
    /// assert!(signer.verify(&token.value, Utc::now()).is_ok());
    /// assert!(signer.verify("true", Utc::now()).is_err());
    /// ```
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, SessionError> {
        let (expiry, signature) = token.split_once('.').ok_or(SessionError::Malformed)?;
        let expiry: i64 = expiry.parse().map_err(|_| SessionError::Malformed)?;
        let signature = hex::decode(signature).map_err(|_| SessionError::Malformed)?;

        self.mac_for(expiry)?
            .verify_slice(&signature)
            .map_err(|_| SessionError::BadSignature)?;

        let expires_at = Utc
            .timestamp_opt(expiry, 0)
            .single()
            .ok_or(SessionError::Malformed)?;
        if expires_at <= now {
            return Err(SessionError::Expired(expires_at));
        }
        Ok(expires_at)
    }
}

/// `Set-Cookie` value establishing a session
pub fn session_cookie(token: &str, max_age_secs: i64, http_only: bool) -> String {
    let mut cookie = format!(
        "{}={}; Max-Age={}; Path=/; SameSite=Lax",
        SESSION_COOKIE, token, max_age_secs
    );
    if http_only {
        cookie.push_str("; HttpOnly");
    }
    cookie
}

/// `Set-Cookie` value clearing the session
pub fn cleared_session_cookie() -> String {
    format!("{}=; Max-Age=0; Path=/; SameSite=Lax", SESSION_COOKIE)
}

/// Find a cookie value in a `Cookie` request header
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key.trim() == name).then(|| value.trim())
    })
}
