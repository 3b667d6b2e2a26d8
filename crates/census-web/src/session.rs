//! Cookie sessions and flash messages (census mode only).
//!
//! Sessions are held in memory keyed by a random UUID carried in the
//! `census.sid` cookie. Each session stores the logged-in user and two
//! flash queues. Flash messages are read-once: loading a session for a
//! request drains its queues, so a message queued before a redirect shows
//! on exactly one following page. A session is only stored once a
//! handler writes to it, and idle sessions expire.
//!
//! In readonly deployments this module's layer is never installed; the
//! request-context pipeline synthesizes a logged-out session instead.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, Request, header};
use axum::middleware::Next;
use axum::response::Response;
use census_types::User;
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::cookies;
use crate::state::AppState;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "census.sid";

/// Which flash queue a message goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlashKind {
    /// Shown as an error alert.
    Error,
    /// Shown as an informational alert.
    Info,
}

/// The two flash queues.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlashQueues {
    /// Error messages, oldest first.
    pub error: Vec<String>,
    /// Info messages, oldest first.
    pub info: Vec<String>,
}

impl FlashQueues {
    /// Append a message.
    pub fn push(&mut self, kind: FlashKind, message: impl Into<String>) {
        self.queue_mut(kind).push(message.into());
    }

    /// Take every queued message of `kind`, leaving the queue empty.
    pub fn take(&mut self, kind: FlashKind) -> Vec<String> {
        std::mem::take(self.queue_mut(kind))
    }

    const fn queue_mut(&mut self, kind: FlashKind) -> &mut Vec<String> {
        match kind {
            FlashKind::Error => &mut self.error,
            FlashKind::Info => &mut self.info,
        }
    }
}

#[derive(Debug, Clone)]
struct SessionData {
    user: Option<User>,
    flash: FlashQueues,
    last_seen: Instant,
}

impl SessionData {
    fn new() -> Self {
        Self {
            user: None,
            flash: FlashQueues::default(),
            last_seen: Instant::now(),
        }
    }

    fn expired(&self, ttl: Duration) -> bool {
        self.last_seen.elapsed() >= ttl
    }
}

/// What a request sees of its session, attached to request extensions by
/// [`session_layer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Session id.
    pub id: Uuid,
    /// Logged-in user, if any.
    pub user: Option<User>,
    /// Flash messages drained for this request.
    pub flash: FlashQueues,
}

/// In-memory session store.
///
/// Entries exist only once something was written to them (a flash or a
/// login) and are dropped after `ttl` without a request.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionData>>>,
    ttl: Duration,
}

impl SessionStore {
    /// Create an empty store whose sessions expire after `ttl` idle.
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            ttl,
        }
    }

    /// Load a session for a request, draining its flash queues. `None`
    /// if the id is unknown or has expired.
    pub async fn load(&self, id: Uuid) -> Option<SessionSnapshot> {
        let mut sessions = self.sessions.write().await;
        if sessions.get(&id)?.expired(self.ttl) {
            sessions.remove(&id);
            tracing::debug!(session = %id, "session expired");
            return None;
        }
        let data = sessions.get_mut(&id)?;
        data.last_seen = Instant::now();
        Some(SessionSnapshot {
            id,
            user: data.user.clone(),
            flash: std::mem::take(&mut data.flash),
        })
    }

    /// Set the logged-in user, creating the session if needed.
    pub async fn set_user(&self, id: Uuid, user: User) {
        self.write(id, |data| data.user = Some(user)).await;
    }

    /// Queue a flash message for the session's next page, creating the
    /// session if needed.
    pub async fn flash(&self, id: Uuid, kind: FlashKind, message: impl Into<String>) {
        self.write(id, |data| data.flash.push(kind, message)).await;
    }

    /// Drop a session and everything in it.
    pub async fn end(&self, id: Uuid) {
        self.sessions.write().await.remove(&id);
    }

    /// Whether `id` names a stored session.
    pub async fn contains(&self, id: Uuid) -> bool {
        self.sessions.read().await.contains_key(&id)
    }

    /// Number of stored sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no session is stored.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    async fn write(&self, id: Uuid, apply: impl FnOnce(&mut SessionData)) {
        let mut sessions = self.sessions.write().await;
        if !sessions.contains_key(&id) {
            let before = sessions.len();
            sessions.retain(|_, data| !data.expired(self.ttl));
            let evicted = before.saturating_sub(sessions.len());
            if evicted > 0 {
                tracing::debug!(evicted, "expired sessions dropped");
            }
            tracing::debug!(session = %id, "session started");
        }
        let data = sessions.entry(id).or_insert_with(SessionData::new);
        data.last_seen = Instant::now();
        apply(data);
    }
}

/// Load the request's session and attach a [`SessionSnapshot`] to its
/// extensions.
///
/// Requests without a live session get a fresh id that is only stored,
/// and only sent back as a `Set-Cookie`, if the handler wrote to it.
pub async fn session_layer(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let existing = cookies::get(request.headers(), SESSION_COOKIE)
        .and_then(|value| Uuid::parse_str(&value).ok());

    let mut snapshot = None;
    if let Some(id) = existing {
        snapshot = state.sessions.load(id).await;
    }

    let is_new = snapshot.is_none();
    let snapshot = snapshot.unwrap_or_else(|| SessionSnapshot {
        id: Uuid::new_v4(),
        user: None,
        flash: FlashQueues::default(),
    });
    let id = snapshot.id;
    request.extensions_mut().insert(snapshot);

    let mut response = next.run(request).await;
    if is_new && state.sessions.contains(id).await {
        let cookie = format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax");
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flash_queues_are_read_once() {
        let mut flash = FlashQueues::default();
        flash.push(FlashKind::Error, "first");
        flash.push(FlashKind::Error, "second");
        flash.push(FlashKind::Info, "saved");

        assert_eq!(flash.take(FlashKind::Error), vec!["first", "second"]);
        assert!(flash.take(FlashKind::Error).is_empty());
        assert_eq!(flash.take(FlashKind::Info), vec!["saved"]);
        assert_eq!(flash, FlashQueues::default());
    }

    fn store() -> SessionStore {
        SessionStore::new(Duration::from_secs(60))
    }

    #[tokio::test]
    async fn store_drains_flash_on_load() {
        let store = store();
        let id = Uuid::new_v4();
        store.flash(id, FlashKind::Info, "Thanks!").await;

        let first = store.load(id).await.map(|s| s.flash.info);
        assert_eq!(first, Some(vec![String::from("Thanks!")]));
        let second = store.load(id).await.map(|s| s.flash.info);
        assert_eq!(second, Some(Vec::new()));
    }

    #[tokio::test]
    async fn loading_unknown_ids_stores_nothing() {
        let store = store();
        for _ in 0..10 {
            assert!(store.load(Uuid::new_v4()).await.is_none());
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn end_removes_the_session() {
        let store = store();
        let id = Uuid::new_v4();
        store.flash(id, FlashKind::Info, "hello").await;
        assert!(store.contains(id).await);

        store.end(id).await;
        assert!(!store.contains(id).await);
        assert!(store.load(id).await.is_none());
    }

    #[tokio::test]
    async fn idle_sessions_expire() {
        let store = SessionStore::new(Duration::ZERO);
        let stale = Uuid::new_v4();
        store.flash(stale, FlashKind::Info, "old").await;
        assert!(store.load(stale).await.is_none());
        assert!(store.is_empty().await);

        let first = Uuid::new_v4();
        store.flash(first, FlashKind::Info, "a").await;
        let second = Uuid::new_v4();
        store.flash(second, FlashKind::Info, "b").await;
        // Starting `second` swept the idle `first`.
        assert!(!store.contains(first).await);
        assert_eq!(store.len().await, 1);
    }
}
