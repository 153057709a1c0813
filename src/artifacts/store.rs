//! Artifact Store
//!
//! Writes transform outputs into the storage directory and keeps an
//! in-memory index of when each one was created. Files found on disk without
//! an index entry (for example, left behind by a previous process) are aged
//! by their filesystem timestamps instead.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::types::{is_expired, ArtifactError, ArtifactRecord, SweepReport};
use crate::transform::Operation;

// ============================================================================
// Artifact Store
// ============================================================================

/// Transient artifact storage
#[derive(Clone)]
pub struct ArtifactStore {
    inner: Arc<ArtifactStoreInner>,
}

struct ArtifactStoreInner {
    /// Directory holding the artifact files
    base_path: PathBuf,

    /// How long an artifact is kept
    retention: chrono::Duration,

    /// Known artifacts indexed by file name
    index: RwLock<HashMap<String, ArtifactRecord>>,
}

impl ArtifactStore {
    pub fn new(base_path: PathBuf, retention: std::time::Duration) -> Self {
        let retention = chrono::Duration::from_std(retention)
            .unwrap_or_else(|_| chrono::Duration::days(365 * 100));
        Self {
            inner: Arc::new(ArtifactStoreInner {
                base_path,
                retention,
                index: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Create the storage directory if it does not exist yet
    pub async fn init(&self) -> Result<(), ArtifactError> {
        tokio::fs::create_dir_all(&self.inner.base_path).await?;
        Ok(())
    }

    pub fn base_path(&self) -> &Path {
        &self.inner.base_path
    }

    pub fn retention(&self) -> chrono::Duration {
        self.inner.retention
    }

    // ========================================================================
    // Read / Write
    // ========================================================================

    /// Store the output of `operation` under a fresh random name
    pub async fn save(
        &self,
        operation: Operation,
        extension: &str,
        data: &[u8],
    ) -> Result<ArtifactRecord, ArtifactError> {
        let file_name = format!(
            "{}-{}.{}",
            operation.file_prefix(),
            Uuid::new_v4().simple(),
            extension
        );
        let path = self.inner.base_path.join(&file_name);

        tokio::fs::write(&path, data).await?;

        let record = ArtifactRecord {
            file_name: file_name.clone(),
            operation,
            size: data.len() as u64,
            created_at: Utc::now(),
        };

        {
            let mut index = self.inner.index.write().await;
            index.insert(file_name, record.clone());
        }

        tracing::debug!(
            file_name = %record.file_name,
            operation = %operation,
            size = record.size,
            "Stored artifact"
        );

        Ok(record)
    }

    /// Read an artifact's bytes by file name
    pub async fn read(&self, file_name: &str) -> Result<Vec<u8>, ArtifactError> {
        let path = self.resolve(file_name)?;

        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ArtifactError::NotFound(file_name.to_string()))
            }
            Err(e) => Err(ArtifactError::Io(e)),
        }
    }

    /// Look up an artifact's metadata
    pub async fn get(&self, file_name: &str) -> Option<ArtifactRecord> {
        let index = self.inner.index.read().await;
        index.get(file_name).cloned()
    }

    /// Number of artifacts in the index
    pub async fn len(&self) -> usize {
        let index = self.inner.index.read().await;
        index.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Map a client-supplied name to a path inside the storage directory.
    ///
    /// Only plain file names are accepted.
    fn resolve(&self, file_name: &str) -> Result<PathBuf, ArtifactError> {
        let valid = !file_name.is_empty()
            && !file_name.starts_with('.')
            && !file_name.contains(['/', '\\', '\0', '"'])
            && !file_name.contains("..");

        if !valid {
            return Err(ArtifactError::InvalidName(file_name.to_string()));
        }

        Ok(self.inner.base_path.join(file_name))
    }

    // ========================================================================
    // Cleanup
    // ========================================================================

    /// Delete every artifact older than the retention window
    pub async fn sweep(&self) -> Result<SweepReport, ArtifactError> {
        self.sweep_at(Utc::now()).await
    }

    /// Sweep as if the current time were `now`.
    ///
    /// Per-file failures are logged and counted; they never abort the sweep.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport, ArtifactError> {
        let mut report = SweepReport::default();
        let mut entries = tokio::fs::read_dir(&self.inner.base_path).await?;

        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name().to_string_lossy().to_string();

            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::warn!(file_name = %file_name, error = %e, "Failed to stat artifact");
                    report.failed += 1;
                    continue;
                }
            };

            if !metadata.is_file() {
                continue;
            }
            report.scanned += 1;

            let created_at = match self.get(&file_name).await {
                Some(record) => record.created_at,
                None => match filesystem_time(&metadata) {
                    Some(time) => time,
                    None => {
                        tracing::warn!(file_name = %file_name, "No timestamp available for artifact");
                        report.failed += 1;
                        continue;
                    }
                },
            };

            if !is_expired(created_at, now, self.inner.retention) {
                continue;
            }

            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => {
                    report.removed += 1;
                    tracing::debug!(file_name = %file_name, "Deleted expired artifact");
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(file_name = %file_name, error = %e, "Failed to delete artifact");
                    continue;
                }
            }

            let mut index = self.inner.index.write().await;
            index.remove(&file_name);
        }

        self.prune_index().await;

        if report.removed > 0 || report.failed > 0 {
            tracing::info!(
                scanned = report.scanned,
                removed = report.removed,
                failed = report.failed,
                "Artifact sweep complete"
            );
        }

        Ok(report)
    }

    /// Drop index entries whose files are gone
    async fn prune_index(&self) {
        let names: Vec<String> = {
            let index = self.inner.index.read().await;
            index.keys().cloned().collect()
        };

        let mut missing = Vec::new();
        for name in names {
            let exists = tokio::fs::try_exists(self.inner.base_path.join(&name))
                .await
                .unwrap_or(true);
            if !exists {
                missing.push(name);
            }
        }

        if !missing.is_empty() {
            let mut index = self.inner.index.write().await;
            for name in missing {
                index.remove(&name);
            }
        }
    }

    /// Start background sweep task
    pub fn start_sweep_task(self, period: std::time::Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);

            loop {
                interval.tick().await;
                if let Err(e) = self.sweep().await {
                    tracing::error!(error = %e, "Artifact sweep failed");
                }
            }
        })
    }
}

/// Creation time from the filesystem, falling back to modification time
fn filesystem_time(metadata: &std::fs::Metadata) -> Option<DateTime<Utc>> {
    metadata
        .created()
        .or_else(|_| metadata.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}

// ============================================================================
// Tests
// ============================================================================
