//! Server-side sessions
//!
//! A session is keyed by the UUID in the `ctm_session` cookie and holds the
//! access mode, pending flash messages, unsaved CLO drafts and the courses
//! whose CLO editor was unlocked with the CLO password. Sessions live in
//! memory and are lost on restart.
//!
//! A session is only stored once a handler writes to it; plain page views
//! never allocate one. Sessions idle longer than the store's timeout are
//! dropped when they are next presented or when a new session is stored.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use ctm_common::clo_editor::CloDraft;
use ctm_common::AccessMode;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::{ApiError, AppState};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "ctm_session";

/// Severity of a flash message, also its CSS class suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl FlashLevel {
    pub fn css_class(self) -> &'static str {
        match self {
            FlashLevel::Success => "flash-success",
            FlashLevel::Info => "flash-info",
            FlashLevel::Warning => "flash-warning",
            FlashLevel::Error => "flash-error",
        }
    }
}

/// One-shot message shown on the next rendered page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

/// (curriculum id, course id)
pub type CourseKey = (i64, i64);

#[derive(Debug, Clone, Default)]
pub struct Session {
    pub mode: AccessMode,
    pub flashes: Vec<Flash>,
    pub clo_drafts: HashMap<CourseKey, CloDraft>,
    pub clo_unlocked: HashSet<CourseKey>,
}

/// Idle time after which a session is dropped
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(8 * 60 * 60);

struct Slot {
    session: Session,
    last_seen: Instant,
}

/// In-process session map
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, Slot>>>,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
        }
    }

    /// Id of a live session, or a fresh unstored id when `presented` is
    /// unknown or has expired
    ///
    /// Returns the id and whether it is new.
    pub async fn resolve(&self, presented: Option<Uuid>) -> (Uuid, bool) {
        if let Some(id) = presented {
            let mut sessions = self.inner.write().await;
            let live = sessions
                .get(&id)
                .map(|slot| slot.last_seen.elapsed() < self.idle_timeout);
            match live {
                Some(true) => {
                    if let Some(slot) = sessions.get_mut(&id) {
                        slot.last_seen = Instant::now();
                    }
                    return (id, false);
                }
                Some(false) => {
                    sessions.remove(&id);
                    debug!("Expired session {}", id);
                }
                None => {}
            }
        }
        (Uuid::new_v4(), true)
    }

    /// Whether a session is stored under `id`
    pub async fn contains(&self, id: Uuid) -> bool {
        self.inner.read().await.contains_key(&id)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    async fn read<T>(&self, id: Uuid, f: impl FnOnce(&Session) -> T) -> T {
        let sessions = self.inner.read().await;
        match sessions.get(&id) {
            Some(slot) => f(&slot.session),
            None => f(&Session::default()),
        }
    }

    /// Run `f` on the session, storing a new one when absent
    async fn write<T>(&self, id: Uuid, f: impl FnOnce(&mut Session) -> T) -> T {
        let mut sessions = self.inner.write().await;
        if !sessions.contains_key(&id) {
            let timeout = self.idle_timeout;
            let before = sessions.len();
            sessions.retain(|_, slot| slot.last_seen.elapsed() < timeout);
            if sessions.len() < before {
                debug!("Dropped {} idle sessions", before - sessions.len());
            }
            debug!("Created session {}", id);
        }
        let slot = sessions.entry(id).or_insert_with(|| Slot {
            session: Session::default(),
            last_seen: Instant::now(),
        });
        slot.last_seen = Instant::now();
        f(&mut slot.session)
    }

    /// Run `f` on a stored session only
    async fn update<T: Default>(&self, id: Uuid, f: impl FnOnce(&mut Session) -> T) -> T {
        let mut sessions = self.inner.write().await;
        match sessions.get_mut(&id) {
            Some(slot) => f(&mut slot.session),
            None => T::default(),
        }
    }
}

/// Session id placed in request extensions by [`session_middleware`]
#[derive(Debug, Clone, Copy)]
pub struct SessionId(pub Uuid);

/// Attach a session id to every request, issuing the cookie once a new
/// session has been stored
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let presented = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok());
    let (id, is_new) = state.sessions.resolve(presented).await;
    request.extensions_mut().insert(SessionId(id));

    let response = next.run(request).await;
    if !is_new || !state.sessions.contains(id).await {
        return response;
    }

    let cookie = Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    (jar.add(cookie), response).into_response()
}

/// Handle on the current request's session
#[derive(Clone)]
pub struct SessionHandle {
    id: Uuid,
    store: SessionStore,
}

#[async_trait]
impl FromRequestParts<AppState> for SessionHandle {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let SessionId(id) = parts
            .extensions
            .get::<SessionId>()
            .copied()
            .ok_or_else(|| ApiError::Internal("Session middleware is not installed".to_string()))?;
        Ok(Self {
            id,
            store: state.sessions.clone(),
        })
    }
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn mode(&self) -> AccessMode {
        self.store.read(self.id, |s| s.mode).await
    }

    pub async fn set_mode(&self, mode: AccessMode) {
        self.store.write(self.id, |s| s.mode = mode).await
    }

    pub async fn flash(&self, level: FlashLevel, message: impl Into<String>) {
        let message = message.into();
        self.store
            .write(self.id, |s| s.flashes.push(Flash { level, message }))
            .await
    }

    /// Pending flash messages, cleared once taken
    pub async fn take_flashes(&self) -> Vec<Flash> {
        self.store.update(self.id, |s| std::mem::take(&mut s.flashes)).await
    }

    pub async fn draft(&self, key: CourseKey) -> Option<CloDraft> {
        self.store.read(self.id, |s| s.clo_drafts.get(&key).cloned()).await
    }

    pub async fn store_draft(&self, key: CourseKey, draft: CloDraft) {
        self.store
            .write(self.id, |s| {
                s.clo_drafts.insert(key, draft);
            })
            .await
    }

    pub async fn clear_draft(&self, key: CourseKey) {
        self.store
            .update(self.id, |s| {
                s.clo_drafts.remove(&key);
            })
            .await
    }

    pub async fn unlock_clos(&self, key: CourseKey) {
        self.store
            .write(self.id, |s| {
                s.clo_unlocked.insert(key);
            })
            .await
    }

    pub async fn clos_unlocked(&self, key: CourseKey) -> bool {
        self.store.read(self.id, |s| s.clo_unlocked.contains(&key)).await
    }

    /// Forget the draft and unlock of one course
    pub async fn forget_clo_state(&self, key: CourseKey) {
        self.store
            .update(self.id, |s| {
                s.clo_drafts.remove(&key);
                s.clo_unlocked.remove(&key);
            })
            .await
    }
}
