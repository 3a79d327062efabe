use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    domain::UserId,
    errors::Error,
    session::{Session, SessionPatch, SessionStore},
    Result,
};

/// Volatile store; sessions are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<UserId, Session>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, user: &UserId) -> Result<Option<Session>> {
        Ok(self.sessions.lock().await.get(user).cloned())
    }

    async fn create(&self, user: &UserId) -> Result<Session> {
        let session = Session::new(user.clone());
        self.sessions
            .lock()
            .await
            .insert(user.clone(), session.clone());
        Ok(session)
    }

    async fn update(&self, user: &UserId, patch: SessionPatch) -> Result<Session> {
        let mut map = self.sessions.lock().await;
        let session = map
            .get_mut(user)
            .ok_or_else(|| Error::SessionNotFound(user.to_string()))?;
        session.apply(patch)?;
        Ok(session.clone())
    }

    async fn delete(&self, user: &UserId) -> Result<bool> {
        Ok(self.sessions.lock().await.remove(user).is_some())
    }

    async fn list_all(&self) -> Result<Vec<Session>> {
        let map = self.sessions.lock().await;
        let mut out: Vec<Session> = map.values().cloned().collect();
        out.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn crud_roundtrip() {
        let store = MemoryStore::new();
        let u = UserId::new("42");

        assert!(store.get(&u).await.unwrap().is_none());
        store.create(&u).await.unwrap();
        let s = store
            .update(&u, SessionPatch::target("https://clinic.example/q"))
            .await
            .unwrap();
        assert_eq!(s.target_url.as_deref(), Some("https://clinic.example/q"));

        assert_eq!(store.list_all().await.unwrap().len(), 1);
        assert!(store.delete(&u).await.unwrap());
        assert!(!store.delete(&u).await.unwrap());
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_unknown_user_fails() {
        let store = MemoryStore::new();
        let err = store
            .update(&UserId::new("nobody"), SessionPatch::notified(true))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn create_overwrites_existing_session() {
        let store = MemoryStore::new();
        let u = UserId::new("42");
        store.create(&u).await.unwrap();
        store
            .update(&u, SessionPatch::target("https://clinic.example/q"))
            .await
            .unwrap();

        let fresh = store.create(&u).await.unwrap();
        assert!(fresh.target_url.is_none());
        assert!(store.get(&u).await.unwrap().unwrap().target_url.is_none());
    }
}
