//! # Session Store
//!
//! In-memory map of live screening sessions, keyed by a sequential id.
//! Nothing is persisted; a restart of the server forgets every session.

use crate::error::AppError;
use std::collections::BTreeMap;
use talkstart_core::ScreeningSession;

/// Maximum number of live sessions held by one server.
pub const MAX_SESSIONS: usize = 10_000;

#[derive(Debug)]
pub struct SessionStore {
    next_id: u64,
    capacity: usize,
    sessions: BTreeMap<u64, ScreeningSession>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_capacity(MAX_SESSIONS)
    }
}

impl SessionStore {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            next_id: 1,
            capacity,
            sessions: BTreeMap::new(),
        }
    }

    /// Store a session and return its id.
    pub fn insert(&mut self, session: ScreeningSession) -> Result<u64, AppError> {
        if self.sessions.len() >= self.capacity {
            return Err(AppError::SessionLimit(self.capacity));
        }
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        self.sessions.insert(id, session);
        Ok(id)
    }

    #[must_use]
    pub fn get(&self, id: u64) -> Option<&ScreeningSession> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut ScreeningSession> {
        self.sessions.get_mut(&id)
    }

    pub fn remove(&mut self, id: u64) -> Option<ScreeningSession> {
        self.sessions.remove(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential_and_not_reused() {
        let mut store = SessionStore::default();
        let a = store.insert(ScreeningSession::default()).expect("insert");
        let b = store.insert(ScreeningSession::default()).expect("insert");
        assert_eq!((a, b), (1, 2));

        store.remove(a);
        let c = store.insert(ScreeningSession::default()).expect("insert");
        assert_eq!(c, 3);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn capacity_is_enforced() {
        let mut store = SessionStore::with_capacity(1);
        store.insert(ScreeningSession::default()).expect("insert");
        assert!(matches!(
            store.insert(ScreeningSession::default()),
            Err(AppError::SessionLimit(1))
        ));
    }
}
