//! Login sessions backing the HTTP adapter's bearer tokens.
//!
//! Sessions are in-memory only; a restart logs everyone out. Tokens map to
//! account ids, not accounts, so privilege is always read fresh from the
//! directory.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::identity::Account;

struct SessionEntry {
    account_id: String,
    expires_at: Instant,
}

/// Token → account-id registry with a fixed time-to-live.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    ttl: Duration,
}

impl SessionRegistry {
    /// Empty registry whose sessions live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Start a session for `account` and return its bearer token.
    pub async fn open(&self, account: &Account) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let now = Instant::now();
        let entry = SessionEntry {
            account_id: account.id.clone(),
            // An unrepresentable expiry degrades to an already-expired session.
            expires_at: now.checked_add(self.ttl).unwrap_or(now),
        };
        self.sessions.write().await.insert(token.clone(), entry);
        debug!(identity = %account.identity, "session opened");
        token
    }

    /// Account id behind `token`, if the session is live.
    ///
    /// Expired sessions are dropped on lookup.
    pub async fn resolve(&self, token: &str) -> Option<String> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Some(entry.account_id.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        let mut sessions = self.sessions.write().await;
        if sessions
            .get(token)
            .is_some_and(|entry| entry.expires_at <= Instant::now())
        {
            sessions.remove(token);
            debug!("expired session dropped");
        }
        None
    }

    /// End the session for `token`. Returns whether one existed.
    pub async fn close(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    /// Drop every expired session, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.expires_at > now);
        before.saturating_sub(sessions.len())
    }

    /// Number of tracked sessions, including not-yet-purged expired ones.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no sessions are tracked.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
