use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use super::{Session, SessionSummary};
use crate::error::{Result, SchemaError};

/// All live sessions, keyed by id.
///
/// The map lock is only held long enough to look up, insert or remove an
/// entry. Work on a session happens under that session's own mutex, so
/// different sessions proceed in parallel while operations on the same
/// session are serialized.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh session with a random id. It is not registered until passed
    /// to [`insert`](Self::insert).
    pub fn new_session() -> Session {
        Session::new(Uuid::new_v4().to_string())
    }

    /// Registers a session, replacing any previous one with the same id.
    pub async fn insert(&self, session: Session) -> Arc<Mutex<Session>> {
        let id = session.session_id.clone();
        let shared = session.shared();
        self.sessions.write().await.insert(id.clone(), shared.clone());
        info!(session = %id, "Session created");
        shared
    }

    pub async fn get(&self, session_id: &str) -> Result<Arc<Mutex<Session>>> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| SchemaError::SessionNotFound(session_id.to_string()))
    }

    pub async fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    pub async fn remove(&self, session_id: &str) -> Result<()> {
        self.sessions
            .write()
            .await
            .remove(session_id)
            .map(|_| info!(session = %session_id, "Session removed"))
            .ok_or_else(|| SchemaError::SessionNotFound(session_id.to_string()))
    }

    /// Drops every session. Returns how many were removed.
    pub async fn clear(&self) -> Result<usize> {
        let mut sessions = self.sessions.write().await;
        if sessions.is_empty() {
            return Err(SchemaError::NoActiveSessions);
        }
        let count = sessions.len();
        sessions.clear();
        info!(count, "All sessions removed");
        Ok(count)
    }

    /// Summaries ordered by creation time.
    pub async fn list(&self) -> Vec<SessionSummary> {
        let handles: Vec<_> = self.sessions.read().await.values().cloned().collect();
        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            summaries.push(handle.lock().await.summary());
        }
        summaries.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        debug!(count = summaries.len(), "Listed sessions");
        summaries
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
