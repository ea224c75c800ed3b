//! Server side sessions.
//!
//! A [`Session`] is a cheap handle: clones share the same attributes, so the
//! copy held by a request and the one held by a [`SessionStore`] always
//! agree.

use std::{collections::HashMap, fmt, sync::Arc};

use parking_lot::RwLock;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::mutant::Mutant;

#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

struct Inner {
    id: String,
    created_at: OffsetDateTime,
    accessed_at: RwLock<OffsetDateTime>,
    attributes: RwLock<HashMap<String, String>>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Session {
            inner: Arc::new(Inner {
                id: id.into(),
                created_at: now,
                accessed_at: RwLock::new(now),
                attributes: Default::default(),
            }),
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    #[inline]
    pub fn created_at(&self) -> OffsetDateTime {
        self.inner.created_at
    }

    pub fn accessed_at(&self) -> OffsetDateTime {
        *self.inner.accessed_at.read()
    }

    pub(crate) fn touch(&self) {
        *self.inner.accessed_at.write() = OffsetDateTime::now_utc();
    }

    /// Attribute value, empty when unset
    pub fn get(&self, name: &str) -> Mutant {
        match self.inner.attributes.read().get(name) {
            Some(value) => Mutant::new(name, vec![value.clone()]),
            None => Mutant::empty(name),
        }
    }

    pub fn set(&self, name: impl Into<String>, value: impl ToString) -> &Self {
        self.inner.attributes.write().insert(name.into(), value.to_string());
        self
    }

    pub fn unset(&self, name: &str) -> Option<String> {
        self.inner.attributes.write().remove(name)
    }

    pub fn attributes(&self) -> HashMap<String, String> {
        self.inner.attributes.read().clone()
    }

    pub fn clear(&self) {
        self.inner.attributes.write().clear();
    }

    /// True when both handles point to the same session
    pub fn ptr_eq(&self, other: &Session) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("created_at", &self.inner.created_at)
            .field("attributes", &self.inner.attributes.read().len())
            .finish()
    }
}

/// Storage backend for sessions
pub trait SessionStore: Send + Sync {
    fn get(&self, id: &str) -> Option<Session>;

    fn save(&self, session: &Session);

    fn delete(&self, id: &str);

    fn generate_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Sessions kept in process memory
#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, id: &str) -> Option<Session> {
        self.sessions.read().get(id).cloned()
    }

    fn save(&self, session: &Session) {
        self.sessions.write().insert(session.id().to_string(), session.clone());
    }

    fn delete(&self, id: &str) {
        if self.sessions.write().remove(id).is_some() {
            trace!("Session {} deleted", id);
        }
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore").field("sessions", &self.len()).finish()
    }
}
