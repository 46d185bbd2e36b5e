use std::sync::Arc;

use crate::error::AppError;
use crate::remote::RemoteTables;
use crate::session::{AdminSession, SessionStore};

#[derive(Clone)]
pub struct AppState {
    pub remote: Arc<dyn RemoteTables>,
    pub sessions: Arc<dyn SessionStore>,
    pub admin_secret: Arc<str>,
}

impl AppState {
    pub async fn session(&self, session_id: &str) -> Result<AdminSession, AppError> {
        AdminSession::restore(session_id, self.sessions.clone(), self.admin_secret.clone()).await
    }
}
