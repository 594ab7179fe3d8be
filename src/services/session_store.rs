// src/services/session_store.rs
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{Duration, Utc};
use log::info;
use uuid::Uuid;

use crate::errors::StudioError;
use crate::services::generation_client::GenerationClient;
use crate::services::studio::Studio;

/// In-memory registry of studio sessions, evicted after `ttl` of inactivity.
pub struct SessionStore {
    client: Arc<GenerationClient>,
    ttl: Duration,
    sessions: RwLock<HashMap<Uuid, Arc<Studio>>>,
}

impl SessionStore {
    pub fn new(client: Arc<GenerationClient>, ttl: Duration) -> Self {
        Self {
            client,
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn create(&self) -> Arc<Studio> {
        self.purge_expired();

        let studio = Arc::new(Studio::new(self.client.clone()));
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(studio.id(), studio.clone());
        info!("Created session {}", studio.id());
        studio
    }

    pub fn get(&self, id: &Uuid) -> Result<Arc<Studio>, StudioError> {
        let studio = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| StudioError::NotFound(format!("Session {} not found", id)))?;
        studio.touch();
        Ok(studio)
    }

    /// Drops idle sessions. A session with work in flight is never evicted.
    pub fn purge_expired(&self) -> usize {
        let cutoff = Utc::now() - self.ttl;
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, studio| studio.is_busy() || studio.last_seen() > cutoff);
        let removed = before - sessions.len();
        if removed > 0 {
            info!("Evicted {} idle sessions", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
