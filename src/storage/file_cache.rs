use sha2::{Digest, Sha256};
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Distinguishes temp files written concurrently by this process.
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Temp files older than this are leftovers of cancelled writes.
const STALE_TEMP_AGE: Duration = Duration::from_secs(600);

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to create cache directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write cache entry '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to remove cache entry '{path}': {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Cache file name for a source URL: `iptv.<sha256-hex>.txt`.
///
/// ```
/// use iptv_catalog::storage::cache_key;
///
/// let key = cache_key("https://example.com/live.m3u");
/// assert!(key.starts_with("iptv.") && key.ends_with(".txt"));
/// assert_eq!(key, cache_key("https://example.com/live.m3u"));
/// ```
pub fn cache_key(source_url: &str) -> String {
    let hash = Sha256::digest(source_url.as_bytes());
    format!("iptv.{:x}.txt", hash)
}

/// Raw-text cache stored as one file per key.
///
/// The stored payload is exactly the text that was written, with no framing.
/// Freshness is judged from the file's modification time.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// Returns the cached text for `key` if it was written at most `max_age` ago.
    ///
    /// A `max_age` of zero never hits. Missing, unreadable, or corrupt entries
    /// are treated as misses.
    pub async fn read_fresh(&self, key: &str, max_age: Duration) -> Option<String> {
        if max_age.is_zero() {
            return None;
        }

        let path = self.path_for(key);
        let modified = match fs::metadata(&path).await.and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to stat cache entry");
                return None;
            }
        };

        // An mtime in the future (clock adjustment) counts as just written
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        if age > max_age {
            tracing::debug!(key = %key, age_secs = age.as_secs(), "Cache entry expired");
            return None;
        }

        match fs::read_to_string(&path).await {
            Ok(content) => Some(content),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read cache entry");
                None
            }
        }
    }

    /// Stores `content` under `key`, replacing any previous entry atomically.
    ///
    /// Writes to a uniquely named temp file in the cache directory, syncs it,
    /// then renames it over the entry. Readers never observe a partial entry,
    /// and concurrent writers resolve as last-rename-wins.
    pub async fn write(&self, key: &str, content: &str) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| CacheError::CreateDir {
                path: self.dir.clone(),
                source,
            })?;
        self.sweep_stale_temps(key).await;

        let path = self.path_for(key);
        let temp_path = self.temp_path_for(key);

        if let Err(source) = write_synced(&temp_path, content).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(CacheError::Write { path, source });
        }

        // On Windows, rename fails if destination exists, so remove it first
        #[cfg(windows)]
        {
            let _ = fs::remove_file(&path).await;
        }

        if let Err(source) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(CacheError::Write { path, source });
        }

        Ok(())
    }

    /// Deletes the entry for `key`. A missing entry is not an error.
    pub async fn remove(&self, key: &str) -> Result<(), CacheError> {
        let path = self.path_for(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CacheError::Remove { path, source }),
        }
    }

    /// Returns fresh cached text for `key`, or runs `supplier` and caches its output.
    ///
    /// - Hit (entry written within `max_age`): the supplier is not invoked
    /// - Miss: the supplier runs once; on success its text is stored and returned
    /// - Supplier failure: the error is returned and the cache is left untouched
    ///
    /// A failure to store the fresh text is logged but does not fail the call.
    /// Concurrent misses for the same key may each run the supplier.
    pub async fn get_or_refresh<F, Fut, E>(
        &self,
        key: &str,
        max_age: Duration,
        supplier: F,
    ) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        if let Some(cached) = self.read_fresh(key, max_age).await {
            tracing::debug!(key = %key, bytes = cached.len(), "Cache hit");
            return Ok(cached);
        }

        tracing::debug!(key = %key, "Cache miss, refreshing");
        let content = supplier().await?;

        if let Err(e) = self.write(key, &content).await {
            tracing::warn!(key = %key, error = %e, "Failed to store cache entry");
        }

        Ok(content)
    }

    /// Best-effort removal of temp files for `key` that a cancelled write left behind.
    ///
    /// Recent temp files are kept since they may belong to a write in progress.
    async fn sweep_stale_temps(&self, key: &str) {
        let prefix = format!(".{key}.tmp.");
        let Ok(mut entries) = fs::read_dir(&self.dir).await else {
            return;
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let is_temp = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(&prefix));
            if !is_temp {
                continue;
            }

            let stale = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => SystemTime::now()
                    .duration_since(modified)
                    .is_ok_and(|age| age > STALE_TEMP_AGE),
                Err(_) => false,
            };
            if !stale {
                continue;
            }

            let path = entry.path();
            match fs::remove_file(&path).await {
                Ok(()) => tracing::debug!(path = %path.display(), "Removed stale cache temp file"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove stale cache temp file")
                }
            }
        }
    }

    fn temp_path_for(&self, key: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!(
            ".{key}.tmp.{}.{nanos:x}.{seq}",
            std::process::id()
        ))
    }
}

async fn write_synced(path: &Path, content: &str) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(content.as_bytes()).await?;
    file.sync_all().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use tempfile::TempDir;

    const KEY: &str = "iptv.test.txt";

    /// Pushes the entry's mtime `age` into the past.
    fn backdate(cache: &FileCache, key: &str, age: Duration) {
        let file = std::fs::OpenOptions::new()
            .write(true)
            .open(cache.path_for(key))
            .unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[test]
    fn test_cache_key_is_stable_and_distinct() {
        let a = cache_key("https://example.com/a.m3u");
        assert_eq!(a, cache_key("https://example.com/a.m3u"));
        assert_ne!(a, cache_key("https://example.com/b.m3u"));
        // "iptv." + 64 hex chars + ".txt"
        assert_eq!(a.len(), 5 + 64 + 4);
        assert!(a[5..69].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_write_then_read_fresh() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path());

        cache.write(KEY, "#EXTM3U\n").await.unwrap();

        let cached = cache.read_fresh(KEY, Duration::from_secs(60)).await;
        assert_eq!(cached.as_deref(), Some("#EXTM3U\n"));

        // Payload on disk is exactly the text, no framing
        let raw = std::fs::read_to_string(cache.path_for(KEY)).unwrap();
        assert_eq!(raw, "#EXTM3U\n");
    }

    #[tokio::test]
    async fn test_write_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path().join("nested").join("cache"));

        cache.write(KEY, "data").await.unwrap();
        assert!(cache.path_for(KEY).exists());
    }

    #[tokio::test]
    async fn test_missing_entry_is_miss() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path());
        assert!(cache.read_fresh(KEY, Duration::from_secs(60)).await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_miss() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path());
        cache.write(KEY, "old").await.unwrap();
        backdate(&cache, KEY, Duration::from_secs(120));

        assert!(cache.read_fresh(KEY, Duration::from_secs(60)).await.is_none());
        assert_eq!(
            cache.read_fresh(KEY, Duration::from_secs(600)).await.as_deref(),
            Some("old")
        );
    }

    #[tokio::test]
    async fn test_zero_max_age_never_hits() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path());
        cache.write(KEY, "data").await.unwrap();

        assert!(cache.read_fresh(KEY, Duration::ZERO).await.is_none());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_and_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path());

        cache.write(KEY, "first").await.unwrap();
        cache.write(KEY, "second").await.unwrap();

        assert_eq!(
            cache.read_fresh(KEY, Duration::from_secs(60)).await.as_deref(),
            Some("second")
        );
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_write_sweeps_stale_temp_files() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path());

        let orphan = dir.path().join(format!(".{KEY}.tmp.1.abc.0"));
        std::fs::write(&orphan, "partial").unwrap();
        std::fs::OpenOptions::new()
            .write(true)
            .open(&orphan)
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(3600))
            .unwrap();
        let in_progress = dir.path().join(format!(".{KEY}.tmp.2.def.0"));
        std::fs::write(&in_progress, "partial").unwrap();
        let other_key = dir.path().join(".iptv.other.txt.tmp.1.abc.0");
        std::fs::write(&other_key, "partial").unwrap();

        cache.write(KEY, "data").await.unwrap();

        assert!(!orphan.exists());
        assert!(in_progress.exists());
        assert!(other_key.exists());
        assert_eq!(std::fs::read_to_string(cache.path_for(KEY)).unwrap(), "data");
    }

    #[tokio::test]
    async fn test_cancelled_refresh_leaves_entry_untouched() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path());
        cache.write(KEY, "good").await.unwrap();

        let pending = cache.get_or_refresh(KEY, Duration::ZERO, || async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, String>("fresh".to_string())
        });
        assert!(tokio::time::timeout(Duration::from_millis(50), pending)
            .await
            .is_err());

        assert_eq!(
            std::fs::read_to_string(cache.path_for(KEY)).unwrap(),
            "good"
        );
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path());
        cache.write(KEY, "data").await.unwrap();

        cache.remove(KEY).await.unwrap();
        cache.remove(KEY).await.unwrap();
        assert!(!cache.path_for(KEY).exists());
    }

    #[tokio::test]
    async fn test_get_or_refresh_hit_skips_supplier() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path());
        cache.write(KEY, "cached").await.unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let result: Result<String, String> = cache
            .get_or_refresh(KEY, Duration::from_secs(60), || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok("fresh".to_string())
            })
            .await;

        assert_eq!(result.unwrap(), "cached");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_get_or_refresh_miss_runs_supplier_once_and_stores() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path());
        cache.write(KEY, "stale").await.unwrap();
        backdate(&cache, KEY, Duration::from_secs(3600));

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let result: Result<String, String> = cache
            .get_or_refresh(KEY, Duration::from_secs(60), || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok("fresh".to_string())
            })
            .await;

        assert_eq!(result.unwrap(), "fresh");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            std::fs::read_to_string(cache.path_for(KEY)).unwrap(),
            "fresh"
        );
    }

    #[tokio::test]
    async fn test_supplier_error_leaves_cache_untouched() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path());
        cache.write(KEY, "good").await.unwrap();

        let result: Result<String, String> = cache
            .get_or_refresh(KEY, Duration::ZERO, || async { Err("offline".to_string()) })
            .await;

        assert_eq!(result.unwrap_err(), "offline");
        assert_eq!(
            std::fs::read_to_string(cache.path_for(KEY)).unwrap(),
            "good"
        );
    }

    #[tokio::test]
    async fn test_store_failure_still_returns_content() {
        let dir = TempDir::new().unwrap();
        // A regular file where the cache directory should be
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();
        let cache = FileCache::new(&blocker);

        let result: Result<String, String> = cache
            .get_or_refresh(KEY, Duration::from_secs(60), || async {
                Ok("fresh".to_string())
            })
            .await;

        assert_eq!(result.unwrap(), "fresh");
    }

    #[tokio::test]
    async fn test_concurrent_writes_last_writer_wins() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path());

        let writes: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.write(KEY, &format!("payload-{i}")).await })
            })
            .collect();
        for handle in writes {
            handle.await.unwrap().unwrap();
        }

        let content = cache
            .read_fresh(KEY, Duration::from_secs(60))
            .await
            .unwrap();
        assert!(content.starts_with("payload-"));
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
