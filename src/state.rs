use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, path::PathBuf, sync::Arc};
use tokio::fs;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct FileState {
    version: u32,
    chats: BTreeSet<i64>,
}

/// Все чаты, от которых приходили события. Нужны только для /broadcast.
/// Без пути живут в памяти до рестарта; с путём: снапшот в JSON.
#[derive(Clone)]
pub struct KnownChats {
    inner: Arc<RwLock<FileState>>,
    path: Option<PathBuf>,
    /// одна запись файла за раз: иначе старый снапшот может лечь поверх нового
    flush_lock: Arc<Mutex<()>>,
}

impl KnownChats {
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(RwLock::new(FileState { version: 1, ..Default::default() })),
            path: None,
            flush_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let state = if fs::try_exists(&path).await.unwrap_or(false) {
            let data = fs::read(&path).await?;
            match serde_json::from_slice::<FileState>(&data) {
                Ok(mut s) => { if s.version == 0 { s.version = 1; } s }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "broken chats snapshot, starting empty");
                    FileState { version: 1, ..Default::default() }
                }
            }
        } else {
            FileState { version: 1, ..Default::default() }
        };
        Ok(Self { inner: Arc::new(RwLock::new(state)), path: Some(path), flush_lock: Arc::new(Mutex::new(())) })
    }

    /// Идемпотентно. true: если чат новый.
    pub async fn insert(&self, chat_id: i64) -> bool {
        let added = self.inner.write().await.chats.insert(chat_id);
        if added {
            if let Err(e) = self.flush().await {
                tracing::warn!(chat_id, error = %e, "failed to save known chats");
            }
        }
        added
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.chats.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Копия для обхода без удержания лока на время рассылки.
    pub async fn snapshot(&self) -> Vec<i64> {
        self.inner.read().await.chats.iter().copied().collect()
    }

    async fn flush(&self) -> anyhow::Result<()> {
        let Some(path) = &self.path else { return Ok(()) };
        let _flushing = self.flush_lock.lock().await;
        // снапшот берём уже под flush_lock, так что последним пишется самый свежий
        let snapshot = {
            let guard = self.inner.read().await;
            serde_json::to_vec_pretty(&*guard)?
        };
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &snapshot).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }
}
