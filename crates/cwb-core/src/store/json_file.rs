use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
    domain::UserId,
    errors::Error,
    session::{Session, SessionPatch, SessionStore},
    Result,
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFileData {
    sessions: Vec<Session>,
}

/// Session store persisted as a single JSON document.
///
/// Every mutation rewrites the whole file (temp file + rename), which is fine
/// for the handful of users a single polling process serves. The in-memory
/// view only changes once the file write has succeeded.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    sessions: Mutex<HashMap<UserId, Session>>,
}

impl JsonFileStore {
    /// Open the store at `path`, loading any previously saved sessions.
    ///
    /// A missing or empty file starts an empty store. An unreadable or corrupt
    /// file is an error: the bot cannot serve anyone without its sessions.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let sessions = load_store_file(&path)
            .await?
            .map(|data| {
                data.sessions
                    .into_iter()
                    .map(|s| (s.user_id.clone(), s))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            path,
            sessions: Mutex::new(sessions),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

async fn load_store_file(path: &Path) -> Result<Option<StoreFileData>> {
    let txt = match tokio::fs::read_to_string(path).await {
        Ok(txt) => txt,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::Io(e)),
    };
    if txt.trim().is_empty() {
        return Ok(None);
    }
    let data: StoreFileData = serde_json::from_str(&txt)?;
    Ok(Some(data))
}

async fn save_store_file(path: &Path, sessions: &HashMap<UserId, Session>) -> Result<()> {
    let mut list: Vec<Session> = sessions.values().cloned().collect();
    list.sort_by(|a, b| a.user_id.cmp(&b.user_id));
    let txt = serde_json::to_string_pretty(&StoreFileData { sessions: list })?;

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, txt).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl SessionStore for JsonFileStore {
    async fn get(&self, user: &UserId) -> Result<Option<Session>> {
        Ok(self.sessions.lock().await.get(user).cloned())
    }

    async fn create(&self, user: &UserId) -> Result<Session> {
        let mut map = self.sessions.lock().await;
        let session = Session::new(user.clone());
        let mut next = map.clone();
        next.insert(user.clone(), session.clone());
        save_store_file(&self.path, &next).await?;
        *map = next;
        Ok(session)
    }

    async fn update(&self, user: &UserId, patch: SessionPatch) -> Result<Session> {
        let mut map = self.sessions.lock().await;
        let mut session = map
            .get(user)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound(user.to_string()))?;
        session.apply(patch)?;
        let mut next = map.clone();
        next.insert(user.clone(), session.clone());
        save_store_file(&self.path, &next).await?;
        *map = next;
        Ok(session)
    }

    async fn delete(&self, user: &UserId) -> Result<bool> {
        let mut map = self.sessions.lock().await;
        if !map.contains_key(user) {
            return Ok(false);
        }
        let mut next = map.clone();
        next.remove(user);
        save_store_file(&self.path, &next).await?;
        *map = next;
        Ok(true)
    }

    async fn list_all(&self) -> Result<Vec<Session>> {
        let map = self.sessions.lock().await;
        let mut out: Vec<Session> = map.values().cloned().collect();
        out.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(out)
    }
}
