//! Durable persistence of the multi-room queue state.
//!
//! Every mutation requests a save of the entire room map. Writes are
//! atomic (temp file, then rename over the target) and coalesced: while a
//! write is in flight, further requests collapse into a single pending
//! follow-up write, so burst load never queues writes unboundedly.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::Room;

/// Persistence seam for the queue state.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Load the persisted room map. A missing or corrupt file yields an
    /// empty map, never an error.
    async fn load(&self) -> HashMap<String, Room>;

    /// Request a durable write of the given snapshot. Returns immediately;
    /// the write happens on a background task.
    async fn request_save(&self, snapshot: String);

    /// Wait until no write is in flight or pending.
    async fn flush(&self);
}

/// Write-path state machine: at most one write in flight, at most one
/// pending snapshot behind it.
#[derive(Debug, Default)]
enum WriteState {
    #[default]
    Idle,
    Writing,
    WritingWithPending(String),
}

/// File-backed store writing the whole state as one JSON object keyed by
/// room name.
pub struct FileStore {
    path: PathBuf,
    state: Arc<Mutex<WriteState>>,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            state: Arc::new(Mutex::new(WriteState::Idle)),
        }
    }

    fn spawn_writer(&self, snapshot: String) {
        let path = self.path.clone();
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let mut next = Some(snapshot);
            while let Some(json) = next.take() {
                if let Err(e) = write_atomic(&path, json.as_bytes()).await {
                    tracing::error!("Failed to persist queue state to {:?}: {}", path, e);
                }
                let mut guard = state.lock().await;
                match std::mem::replace(&mut *guard, WriteState::Idle) {
                    WriteState::WritingWithPending(pending) => {
                        *guard = WriteState::Writing;
                        next = Some(pending);
                    }
                    _ => {}
                }
            }
        });
    }
}

#[async_trait]
impl QueueStore for FileStore {
    async fn load(&self) -> HashMap<String, Room> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No state file at {:?}, starting empty", self.path);
                return HashMap::new();
            }
            Err(e) => {
                tracing::warn!("Could not read state file {:?}: {}", self.path, e);
                return HashMap::new();
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(rooms) => rooms,
            Err(e) => {
                tracing::warn!("Corrupt state file {:?}, starting empty: {}", self.path, e);
                HashMap::new()
            }
        }
    }

    async fn request_save(&self, snapshot: String) {
        let mut guard = self.state.lock().await;
        match &*guard {
            WriteState::Idle => {
                *guard = WriteState::Writing;
                drop(guard);
                self.spawn_writer(snapshot);
            }
            WriteState::Writing | WriteState::WritingWithPending(_) => {
                // Coalesce: only the latest snapshot matters.
                *guard = WriteState::WritingWithPending(snapshot);
            }
        }
    }

    async fn flush(&self) {
        loop {
            {
                let guard = self.state.lock().await;
                if matches!(*guard, WriteState::Idle) {
                    return;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    }
}

/// Write data to a temp file in the target's directory, then rename over
/// the target. Rename is atomic on the same filesystem, so readers never
/// observe a partial file.
async fn write_atomic(dest: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = dest.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    let file_name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "state".to_string());
    let temp_path = dest.with_file_name(format!(".{}.tmp-{}", file_name, Uuid::new_v4()));

    tokio::fs::write(&temp_path, data).await?;
    tokio::fs::rename(&temp_path, dest).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Entry, StudentId, UserId};

    fn temp_file(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("handraise-store-{tag}-{}.json", Uuid::new_v4()))
    }

    fn sample_rooms() -> HashMap<String, Room> {
        let mut room = Room::default();
        room.join(Entry::new_marking(
            "alice".to_string(),
            StudentId::new("1234".to_string()).unwrap(),
            Some("a@example.com".to_string()),
            UserId::new("u1".to_string()).unwrap(),
        ))
        .unwrap();
        room.password = Some("pw".to_string());
        HashMap::from([("lab-1".to_string(), room)])
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips() {
        let path = temp_file("roundtrip");
        let store = FileStore::new(path.clone());
        let rooms = sample_rooms();

        store
            .request_save(serde_json::to_string(&rooms).unwrap())
            .await;
        store.flush().await;

        let loaded = store.load().await;
        assert_eq!(loaded.len(), 1);
        let room = &loaded["lab-1"];
        assert_eq!(room.marking, rooms["lab-1"].marking);
        assert_eq!(room.password.as_deref(), Some("pw"));

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_reload_survives_process_restart() {
        // A second store instance on the same path sees the last
        // completed write, byte-for-byte structurally equal.
        let path = temp_file("restart");
        let rooms = sample_rooms();

        {
            let store = FileStore::new(path.clone());
            store
                .request_save(serde_json::to_string(&rooms).unwrap())
                .await;
            store.flush().await;
        }

        let reopened = FileStore::new(path.clone());
        let loaded = reopened.load().await;
        assert_eq!(
            serde_json::to_value(&loaded).unwrap(),
            serde_json::to_value(&rooms).unwrap()
        );

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_load_missing_file_yields_empty_state() {
        let store = FileStore::new(temp_file("missing"));

        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_corrupt_file_yields_empty_state() {
        let path = temp_file("corrupt");
        tokio::fs::write(&path, b"{not json").await.unwrap();
        let store = FileStore::new(path.clone());

        assert!(store.load().await.is_empty());

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_burst_saves_coalesce_to_latest_snapshot() {
        let path = temp_file("coalesce");
        let store = FileStore::new(path.clone());

        for i in 0..50 {
            let rooms =
                HashMap::from([(format!("room-{i}"), Room::default())]);
            store
                .request_save(serde_json::to_string(&rooms).unwrap())
                .await;
        }
        store.flush().await;

        // The last requested snapshot won.
        let loaded = store.load().await;
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains_key("room-49"));

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let path = temp_file("tmpclean");
        let store = FileStore::new(path.clone());
        store
            .request_save(serde_json::to_string(&sample_rooms()).unwrap())
            .await;
        store.flush().await;

        let dir = path.parent().unwrap();
        let stem = path.file_name().unwrap().to_string_lossy().into_owned();
        let leftovers: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                name.contains(&stem) && name.contains(".tmp-")
            })
            .collect();
        assert!(leftovers.is_empty());

        let _ = std::fs::remove_file(path);
    }
}
