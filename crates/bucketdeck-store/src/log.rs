use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::SyncMode;
use crate::error::{StoreError, StoreResult};
use crate::traits::{Connector, KvStore};

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// File extension of a space log.
const LOG_EXTENSION: &str = "log";

/// A single mutation recorded in a space log.
///
/// On-disk framing:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized LogEntry)]
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogEntry {
    Put { key: String, value: Vec<u8> },
    Delete { key: String },
}

/// One space: its append log plus the live index rebuilt from it.
struct SpaceLog {
    path: PathBuf,
    /// Opened in append mode; each frame goes out in a single unbuffered write.
    file: File,
    /// Current end of the valid log, in bytes.
    offset: u64,
    entries: BTreeMap<String, Vec<u8>>,
    /// Set when a failed append could not be cut back off the file.
    poisoned: bool,
    #[cfg(test)]
    fail_next_write: bool,
}

impl SpaceLog {
    /// Open (or create) a space log and replay it.
    ///
    /// A torn tail left by a crash is cut off so later appends stay readable.
    fn open(path: &Path) -> StoreResult<Self> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        let (entries, valid_len) = replay(&bytes);

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        if valid_len < bytes.len() as u64 {
            warn!(
                path = %path.display(),
                valid_len,
                file_len = bytes.len(),
                "discarding torn log tail"
            );
            file.set_len(valid_len)?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
            offset: valid_len,
            entries,
            poisoned: false,
            #[cfg(test)]
            fail_next_write: false,
        })
    }

    /// Append one entry. On failure the file is cut back to the previous
    /// valid end, so a rejected entry never resurfaces on replay.
    fn append(&mut self, entry: &LogEntry, sync: &SyncMode) -> StoreResult<()> {
        if self.poisoned {
            return Err(StoreError::StorageUnavailable(format!(
                "log {} has an unrecoverable partial write",
                self.path.display()
            )));
        }

        let frame = encode_frame(entry)?;
        if let Err(e) = self.write_frame(&frame, sync) {
            self.rollback();
            return Err(e.into());
        }
        self.offset += frame.len() as u64;
        Ok(())
    }

    fn write_frame(&mut self, frame: &[u8], sync: &SyncMode) -> std::io::Result<()> {
        #[cfg(test)]
        let fail = std::mem::take(&mut self.fail_next_write);
        #[cfg(not(test))]
        let fail = false;
        if fail {
            self.file.write_all(&frame[..frame.len() / 2])?;
            return Err(std::io::Error::other("injected write failure"));
        }

        self.file.write_all(frame)?;
        if matches!(sync, SyncMode::EveryWrite) {
            self.file.sync_all()?;
        }
        Ok(())
    }

    fn rollback(&mut self) {
        if let Err(e) = self.file.set_len(self.offset) {
            error!(
                path = %self.path.display(),
                offset = self.offset,
                error = %e,
                "cannot cut failed append off log; refusing further writes"
            );
            self.poisoned = true;
        }
    }

    /// Rewrite the log so it holds one `Put` per live entry.
    fn compact(&mut self, sync: &SyncMode) -> StoreResult<()> {
        let tmp_path = self.path.with_extension("log.tmp");
        let mut offset = 0u64;
        {
            let mut tmp = BufWriter::new(File::create(&tmp_path)?);
            for (key, value) in &self.entries {
                let frame = encode_frame(&LogEntry::Put {
                    key: key.clone(),
                    value: value.clone(),
                })?;
                tmp.write_all(&frame)?;
                offset += frame.len() as u64;
            }
            tmp.flush()?;
            tmp.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        let file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        if matches!(sync, SyncMode::EveryWrite) {
            file.sync_all()?;
        }
        self.file = file;
        self.offset = offset;
        self.poisoned = false;
        Ok(())
    }
}

fn encode_frame(entry: &LogEntry) -> StoreResult<Vec<u8>> {
    let payload =
        bincode::serialize(entry).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let length = payload.len() as u32;
    let crc = crc32fast::hash(&payload);

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&crc.to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Rebuild the live index from raw log bytes.
///
/// Returns the index and the length of the valid prefix. Entries failing the
/// CRC check are skipped; an impossible length or a truncated payload ends
/// replay there.
fn replay(bytes: &[u8]) -> (BTreeMap<String, Vec<u8>>, u64) {
    let mut entries = BTreeMap::new();
    let mut offset = 0usize;

    while offset + HEADER_SIZE <= bytes.len() {
        let header = &bytes[offset..offset + HEADER_SIZE];
        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        let end = offset + HEADER_SIZE + length;
        if length == 0 || end > bytes.len() {
            warn!(offset, length, "invalid log entry length; stopping replay");
            break;
        }

        let payload = &bytes[offset + HEADER_SIZE..end];
        let actual_crc = crc32fast::hash(payload);
        if actual_crc != expected_crc {
            warn!(
                offset,
                expected = expected_crc,
                actual = actual_crc,
                "CRC mismatch; skipping log entry"
            );
            offset = end;
            continue;
        }

        match bincode::deserialize::<LogEntry>(payload) {
            Ok(LogEntry::Put { key, value }) => {
                entries.insert(key, value);
            }
            Ok(LogEntry::Delete { key }) => {
                entries.remove(&key);
            }
            Err(e) => {
                warn!(offset, error = %e, "failed to decode log entry; skipping");
            }
        }
        offset = end;
    }

    (entries, offset as u64)
}

/// Space names become file names, so they are kept to `[a-z0-9_-]`.
fn validate_space_name(space: &str) -> StoreResult<()> {
    let ok = !space.is_empty()
        && space
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidSpaceName(space.to_string()))
    }
}

/// Durable key-value store with one append-only log per space.
///
/// Every `add` and `delete` is appended to the space's log before the
/// in-memory index changes. Opening the store replays each `<space>.log` in
/// the data directory.
///
/// File I/O (including `fsync` under [`SyncMode::EveryWrite`]) runs on the
/// blocking thread pool, so the `KvStore` methods never stall a runtime
/// worker. [`LogKvStore::open`] and [`LogKvStore::log_size`] are synchronous.
pub struct LogKvStore {
    inner: Arc<LogInner>,
}

struct LogInner {
    dir: PathBuf,
    sync: SyncMode,
    spaces: Mutex<HashMap<String, SpaceLog>>,
}

impl LogInner {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, SpaceLog>> {
        self.spaces.lock().expect("log store lock poisoned")
    }

    fn space_path(&self, space: &str) -> PathBuf {
        self.dir.join(format!("{space}.{LOG_EXTENSION}"))
    }

    fn create_space(&self, space: &str) -> StoreResult<bool> {
        validate_space_name(space)?;
        let mut spaces = self.lock();
        if spaces.contains_key(space) {
            return Ok(false);
        }
        let log = SpaceLog::open(&self.space_path(space))?;
        spaces.insert(space.to_string(), log);
        debug!(space, "space created");
        Ok(true)
    }

    fn add(&self, space: &str, key: String, value: Vec<u8>) -> StoreResult<()> {
        let mut spaces = self.lock();
        let log = spaces
            .get_mut(space)
            .ok_or_else(|| StoreError::UnknownSpace(space.to_string()))?;
        if log.entries.contains_key(&key) {
            return Err(StoreError::DuplicateKey {
                space: space.to_string(),
                key,
            });
        }
        let entry = LogEntry::Put { key, value };
        log.append(&entry, &self.sync)?;
        if let LogEntry::Put { key, value } = entry {
            log.entries.insert(key, value);
        }
        Ok(())
    }

    fn delete(&self, space: &str, key: String) -> StoreResult<bool> {
        let mut spaces = self.lock();
        let log = spaces
            .get_mut(space)
            .ok_or_else(|| StoreError::UnknownSpace(space.to_string()))?;
        if !log.entries.contains_key(&key) {
            return Ok(false);
        }
        log.append(&LogEntry::Delete { key: key.clone() }, &self.sync)?;
        log.entries.remove(&key);
        Ok(true)
    }

    fn compact(&self, space: &str) -> StoreResult<()> {
        let mut spaces = self.lock();
        let log = spaces
            .get_mut(space)
            .ok_or_else(|| StoreError::UnknownSpace(space.to_string()))?;
        let before = log.offset;
        log.compact(&self.sync)?;
        debug!(space, before, after = log.offset, "space log compacted");
        Ok(())
    }

    fn with_space<T>(&self, space: &str, f: impl FnOnce(&SpaceLog) -> T) -> StoreResult<T> {
        let spaces = self.lock();
        spaces
            .get(space)
            .map(f)
            .ok_or_else(|| StoreError::UnknownSpace(space.to_string()))
    }
}

impl LogKvStore {
    /// Open (or create) a store in `dir`, replaying any existing logs.
    pub fn open(dir: &Path, sync: SyncMode) -> StoreResult<Self> {
        fs::create_dir_all(dir)?;

        let mut spaces = HashMap::new();
        for dirent in fs::read_dir(dir)? {
            let path = dirent?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(LOG_EXTENSION) {
                continue;
            }
            let Some(space) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if validate_space_name(space).is_err() {
                warn!(path = %path.display(), "ignoring log with invalid space name");
                continue;
            }
            let log = SpaceLog::open(&path)?;
            debug!(space, entries = log.entries.len(), "space log replayed");
            spaces.insert(space.to_string(), log);
        }

        info!(dir = %dir.display(), spaces = spaces.len(), "log store opened");
        Ok(Self {
            inner: Arc::new(LogInner {
                dir: dir.to_path_buf(),
                sync,
                spaces: Mutex::new(spaces),
            }),
        })
    }

    /// Data directory of this store.
    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    /// Size in bytes of a space's log.
    pub fn log_size(&self, space: &str) -> StoreResult<u64> {
        self.inner.with_space(space, |log| log.offset)
    }

    /// Rewrite a space's log, dropping deleted entries.
    pub async fn compact(&self, space: &str) -> StoreResult<()> {
        let space = space.to_string();
        self.blocking(move |inner| inner.compact(&space)).await
    }

    /// Run `op` against the shared state on the blocking thread pool.
    async fn blocking<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&LogInner) -> StoreResult<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || op(&inner))
            .await
            .map_err(|e| StoreError::StorageUnavailable(format!("log task failed: {e}")))?
    }
}

#[async_trait]
impl KvStore for LogKvStore {
    async fn create_space(&self, space: &str) -> StoreResult<bool> {
        let space = space.to_string();
        self.blocking(move |inner| inner.create_space(&space)).await
    }

    async fn spaces(&self) -> StoreResult<Vec<String>> {
        self.blocking(|inner| {
            let mut names: Vec<String> = inner.lock().keys().cloned().collect();
            names.sort();
            Ok(names)
        })
        .await
    }

    async fn get_all(&self, space: &str) -> StoreResult<Vec<(String, Vec<u8>)>> {
        let space = space.to_string();
        self.blocking(move |inner| {
            inner.with_space(&space, |log| {
                log.entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
        })
        .await
    }

    async fn get(&self, space: &str, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let (space, key) = (space.to_string(), key.to_string());
        self.blocking(move |inner| inner.with_space(&space, |log| log.entries.get(&key).cloned()))
            .await
    }

    async fn add(&self, space: &str, key: &str, value: Vec<u8>) -> StoreResult<()> {
        let (space, key) = (space.to_string(), key.to_string());
        self.blocking(move |inner| inner.add(&space, key, value)).await
    }

    async fn delete(&self, space: &str, key: &str) -> StoreResult<bool> {
        let (space, key) = (space.to_string(), key.to_string());
        self.blocking(move |inner| inner.delete(&space, key)).await
    }

    async fn count(&self, space: &str) -> StoreResult<usize> {
        let space = space.to_string();
        self.blocking(move |inner| inner.with_space(&space, |log| log.entries.len()))
            .await
    }
}

impl std::fmt::Debug for LogKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogKvStore")
            .field("dir", &self.inner.dir)
            .field("sync", &self.inner.sync)
            .finish()
    }
}

/// Connector opening a [`LogKvStore`] in a data directory.
#[derive(Clone, Debug)]
pub struct LogConnector {
    dir: PathBuf,
    sync: SyncMode,
}

impl LogConnector {
    pub fn new(dir: impl Into<PathBuf>, sync: SyncMode) -> Self {
        Self {
            dir: dir.into(),
            sync,
        }
    }
}

#[async_trait]
impl Connector for LogConnector {
    async fn connect(&self) -> StoreResult<Arc<dyn KvStore>> {
        let dir = self.dir.clone();
        let sync = self.sync.clone();
        let store = tokio::task::spawn_blocking(move || LogKvStore::open(&dir, sync))
            .await
            .map_err(|e| StoreError::StorageUnavailable(format!("open task failed: {e}")))?
            .map_err(|e| {
                StoreError::StorageUnavailable(format!(
                    "cannot open log store at {}: {e}",
                    self.dir.display()
                ))
            })?;
        let store: Arc<dyn KvStore> = Arc::new(store);
        Ok(store)
    }
}
