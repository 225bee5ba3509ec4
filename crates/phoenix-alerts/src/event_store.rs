//! Security event persistence.

use std::path::{Path, PathBuf};
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use phoenix_models::SecurityEvent;

use crate::error::{AlertError, AlertResult};

/// Where fired alerts are recorded.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn record(&self, event: &SecurityEvent) -> AlertResult<()>;

    /// Newest events first.
    async fn recent(&self, limit: usize) -> AlertResult<Vec<SecurityEvent>>;
}

/// Append-only JSON lines file, one event per line.
#[derive(Debug)]
pub struct JsonlEventStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlEventStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl EventStore for JsonlEventStore {
    async fn record(&self, event: &SecurityEvent) -> AlertResult<()> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;

        debug!(event_id = %event.id, path = %self.path.display(), "Event recorded");
        Ok(())
    }

    async fn recent(&self, limit: usize) -> AlertResult<Vec<SecurityEvent>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut events = Vec::new();
        for (number, line) in content.lines().enumerate().filter(|(_, l)| !l.trim().is_empty()) {
            match serde_json::from_str::<SecurityEvent>(line) {
                Ok(event) => events.push(event),
                Err(e) => warn!(line = number + 1, error = %e, "Skipping malformed event line"),
            }
        }

        events.reverse();
        events.truncate(limit);
        Ok(events)
    }
}

/// In-process store, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    events: StdMutex<Vec<SecurityEvent>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every recorded event, oldest first.
    pub fn events(&self) -> Vec<SecurityEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn record(&self, event: &SecurityEvent) -> AlertResult<()> {
        self.events
            .lock()
            .map_err(|_| AlertError::store("event list lock poisoned"))?
            .push(event.clone());
        Ok(())
    }

    async fn recent(&self, limit: usize) -> AlertResult<Vec<SecurityEvent>> {
        let events = self
            .events
            .lock()
            .map_err(|_| AlertError::store("event list lock poisoned"))?;
        Ok(events.iter().rev().take(limit).cloned().collect())
    }
}
