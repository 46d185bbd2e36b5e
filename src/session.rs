//! Admin session guard.
//!
//! The guard compares a password against one shared secret supplied through
//! configuration. That is a gate, not authorization: anyone holding the secret
//! is admin, and nothing verifies identity server-side.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::AppError;

/// Session-scoped marker written on successful login.
pub const AUTH_FLAG_KEY: &str = "isAdminAuthenticated";

/// Key/value storage scoped to one session id.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<String>, AppError>;
    async fn set(&self, session_id: &str, key: &str, value: &str) -> Result<(), AppError>;
    async fn remove(&self, session_id: &str, key: &str) -> Result<(), AppError>;

    /// Drops entries past the store's lifetime. Returns how many were removed.
    async fn prune_expired(&self) -> Result<u64, AppError> {
        Ok(0)
    }
}

/// Session storage that lives as long as the process. Entries never expire.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<(String, String), String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str, key: &str) -> Result<Option<String>, AppError> {
        let entries = self.entries.lock().map_err(|_| AppError::InternalServerError)?;
        Ok(entries
            .get(&(session_id.to_string(), key.to_string()))
            .cloned())
    }

    async fn set(&self, session_id: &str, key: &str, value: &str) -> Result<(), AppError> {
        let mut entries = self.entries.lock().map_err(|_| AppError::InternalServerError)?;
        entries.insert((session_id.to_string(), key.to_string()), value.to_string());
        Ok(())
    }

    async fn remove(&self, session_id: &str, key: &str) -> Result<(), AppError> {
        let mut entries = self.entries.lock().map_err(|_| AppError::InternalServerError)?;
        entries.remove(&(session_id.to_string(), key.to_string()));
        Ok(())
    }
}

pub struct AdminSession {
    session_id: String,
    store: Arc<dyn SessionStore>,
    secret: Arc<str>,
    authenticated: bool,
}

impl AdminSession {
    /// Rebuilds the session flag from whatever the store kept for `session_id`.
    pub async fn restore(
        session_id: impl Into<String>,
        store: Arc<dyn SessionStore>,
        secret: Arc<str>,
    ) -> Result<Self, AppError> {
        let session_id = session_id.into();
        let authenticated = store
            .get(&session_id, AUTH_FLAG_KEY)
            .await?
            .is_some_and(|value| value == "true");

        Ok(Self {
            session_id,
            store,
            secret,
            authenticated,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.authenticated {
            Ok(())
        } else {
            Err(AppError::Unauthorized)
        }
    }

    /// Returns whether `password` matched. A mismatch leaves the session as it was.
    pub async fn login(&mut self, password: &str) -> Result<bool, AppError> {
        if password != &*self.secret {
            warn!("admin login rejected for session {}", self.session_id);
            return Ok(false);
        }

        self.store.set(&self.session_id, AUTH_FLAG_KEY, "true").await?;
        self.authenticated = true;
        info!("admin session {} authenticated", self.session_id);
        Ok(true)
    }

    pub async fn logout(&mut self) -> Result<(), AppError> {
        self.authenticated = false;
        self.store.remove(&self.session_id, AUTH_FLAG_KEY).await?;
        info!("admin session {} logged out", self.session_id);
        Ok(())
    }
}
