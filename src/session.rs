//! Session Store module for per-user conversational state
//!
//! The store maps Telegram user ids to a locked per-user entry. Handlers
//! hold the entry's lock for the whole of one update's processing, so two
//! near-simultaneous messages from the same user cannot race on the same
//! session. Flow state expires after an idle timeout; authentication state
//! survives flow completion and expiry.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::flow::FlowKind;

/// Per-user flow state: the active flow kind, the current step index and
/// the fields collected so far.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub kind: FlowKind,
    pub step: usize,
    pub fields: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl Session {
    pub(crate) fn new(kind: FlowKind) -> Self {
        let now = Utc::now();
        Self {
            kind,
            step: 0,
            fields: HashMap::new(),
            created_at: now,
            last_active_at: now,
        }
    }

    fn is_expired(&self, idle_timeout: Duration) -> bool {
        Utc::now() - self.last_active_at > idle_timeout
    }
}

/// Authentication state recorded outside any flow. Set by a successful
/// login (`token`) and by `/setid` (`library_user_id`); borrowing requires
/// the latter.
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub token: Option<String>,
    pub library_user_id: Option<String>,
}

impl AuthState {
    fn is_empty(&self) -> bool {
        self.token.is_none() && self.library_user_id.is_none()
    }
}

/// Everything the store keeps for one user
#[derive(Debug, Default)]
pub struct UserEntry {
    flow: Option<Session>,
    pub auth: AuthState,
    /// Telegram language code seen on the user's most recent update, so
    /// out-of-band notices (expiry) speak the user's language
    pub language_code: Option<String>,
}

impl UserEntry {
    /// The active flow, with the idle timeout applied: an expired flow is
    /// cleared and reported as absent.
    pub fn flow(&mut self, idle_timeout: Duration) -> Option<&mut Session> {
        if let Some(session) = &self.flow {
            if session.is_expired(idle_timeout) {
                debug!(kind = ?session.kind, "Discarding expired flow session");
                self.flow = None;
            }
        }
        self.flow.as_mut()
    }

    /// Get or create the flow for `kind`. A flow of a different kind is
    /// superseded (fields discarded, step reset); re-issuing the command
    /// for the kind already in progress keeps the collected fields.
    pub fn get_or_create_flow(&mut self, kind: FlowKind, idle_timeout: Duration) -> &mut Session {
        let keep = matches!(self.flow(idle_timeout), Some(session) if session.kind == kind);
        if !keep {
            self.flow = Some(Session::new(kind));
        }
        self.flow.as_mut().expect("flow was just ensured")
    }

    /// Clear the active flow (completion or cancellation)
    pub fn clear_flow(&mut self) {
        self.flow = None;
    }

    /// Mark the entry as recently active
    pub fn touch(&mut self) {
        if let Some(session) = &mut self.flow {
            session.last_active_at = Utc::now();
        }
    }

    fn is_empty(&self) -> bool {
        self.flow.is_none() && self.auth.is_empty()
    }
}

/// Process-wide session store keyed by Telegram user id
pub struct SessionStore {
    idle_timeout: Duration,
    inner: Mutex<HashMap<u64, Arc<Mutex<UserEntry>>>>,
}

impl SessionStore {
    pub fn new(idle_timeout_secs: u64) -> Self {
        Self {
            idle_timeout: Duration::seconds(idle_timeout_secs as i64),
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Lock the entry for one user, creating it on first interaction.
    ///
    /// The returned guard serializes all processing for that user; the
    /// store-level lock is released before the per-user lock is awaited so
    /// different users never block each other.
    pub async fn entry(&self, user_id: u64) -> OwnedMutexGuard<UserEntry> {
        let slot = {
            let mut map = self.inner.lock().await;
            Arc::clone(map.entry(user_id).or_default())
        };
        slot.lock_owned().await
    }

    /// Drop expired flows, returning the ids of users whose flow was
    /// discarded along with their last seen language code. Entries with
    /// no remaining state are removed entirely.
    pub async fn sweep_expired(&self) -> Vec<(u64, Option<String>)> {
        let mut expired = Vec::new();
        let mut map = self.inner.lock().await;

        let mut empty_keys = Vec::new();
        for (user_id, slot) in map.iter() {
            // A busy entry is skipped; the expiry check also runs on lookup
            let Ok(mut entry) = slot.clone().try_lock_owned() else {
                continue;
            };
            let had_flow = entry.flow.is_some();
            if entry.flow(self.idle_timeout).is_none() {
                if had_flow {
                    expired.push((*user_id, entry.language_code.clone()));
                }
                if entry.is_empty() {
                    empty_keys.push(*user_id);
                }
            }
        }
        for key in empty_keys {
            map.remove(&key);
        }

        expired
    }
}
