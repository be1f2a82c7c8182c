//! File backend
//!
//! Each namespace is one file, loaded fully on open and rewritten on every
//! mutation.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (10 bytes)                                       │
//! │   Magic: "CALS" (4) | Version: u16 (2) | Count: u32 (4) │
//! ├─────────────────────────────────────────────────────────┤
//! │ Data Block (variable)                                   │
//! │   [KeyLen: u16][ValLen: u32][Key][bincode(StoredValue)] │
//! │   ... repeated for each entry, sorted by key ...        │
//! ├─────────────────────────────────────────────────────────┤
//! │ Footer (4 bytes)                                        │
//! │   DataCRC: u32                                          │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Writes go to `<namespace>.cal.tmp`, are fsynced, then renamed over
//! `<namespace>.cal`.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::batch::Operation;
use crate::error::{CalibrationError, Result};
use crate::validation::validate_key;

use super::{KvBackend, StoredValue, ValueType, DEFAULT_MAX_ENTRIES};

/// Magic bytes identifying a calstore namespace file
const MAGIC: &[u8; 4] = b"CALS";

/// Current file format version
const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + EntryCount (4) = 10 bytes
const HEADER_SIZE: usize = 10;

/// Footer size: DataCRC (4)
const FOOTER_SIZE: usize = 4;

/// Record prefix: KeyLen (2) + ValLen (4)
const RECORD_PREFIX: usize = 6;

const FILE_EXT: &str = "cal";

/// Durable backend storing namespaces as files in a directory
#[derive(Debug)]
pub struct FileBackend {
    /// Directory holding one file per namespace
    data_dir: PathBuf,
    /// Entry budget per namespace
    max_entries: usize,
    /// Name of the open namespace
    namespace: Option<String>,
    /// Contents of the open namespace
    entries: BTreeMap<String, StoredValue>,
}

impl FileBackend {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            max_entries: DEFAULT_MAX_ENTRIES,
            namespace: None,
            entries: BTreeMap::new(),
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the file backing `namespace`
    pub fn namespace_path(&self, namespace: &str) -> PathBuf {
        self.data_dir.join(format!("{}.{}", namespace, FILE_EXT))
    }

    fn open_namespace(&self) -> Result<&str> {
        self.namespace
            .as_deref()
            .ok_or(CalibrationError::NotInitialized)
    }

    /// Persist `next` and adopt it as the in-memory view
    fn commit(&mut self, next: BTreeMap<String, StoredValue>) -> Result<()> {
        let namespace = self.open_namespace()?;
        let path = self.namespace_path(namespace);
        write_atomic(&path, &encode(&next)?)?;
        self.entries = next;
        Ok(())
    }

    fn put_into(
        entries: &mut BTreeMap<String, StoredValue>,
        max_entries: usize,
        key: &str,
        value: StoredValue,
    ) -> Result<()> {
        if key.len() > u16::MAX as usize {
            return Err(CalibrationError::InvalidParam(format!(
                "key of {} bytes cannot be stored",
                key.len()
            )));
        }
        if !entries.contains_key(key) && entries.len() >= max_entries {
            return Err(CalibrationError::Write(format!(
                "namespace full ({} entries)",
                max_entries
            )));
        }
        entries.insert(key.to_string(), value);
        Ok(())
    }
}

impl KvBackend for FileBackend {
    fn open(&mut self, namespace: &str) -> Result<()> {
        // The namespace becomes a file name
        if !validate_key(namespace) {
            return Err(CalibrationError::InvalidParam(format!(
                "invalid namespace name '{}'",
                namespace
            )));
        }

        self.close();
        fs::create_dir_all(&self.data_dir)?;

        let path = self.namespace_path(namespace);
        let entries = if path.exists() {
            decode(&fs::read(&path)?)?
        } else {
            BTreeMap::new()
        };

        tracing::debug!(
            namespace,
            entries = entries.len(),
            path = %path.display(),
            "namespace loaded"
        );

        self.entries = entries;
        self.namespace = Some(namespace.to_string());
        Ok(())
    }

    fn close(&mut self) {
        self.namespace = None;
        self.entries.clear();
    }

    fn put(&mut self, key: &str, value: StoredValue) -> Result<()> {
        self.open_namespace()?;
        let mut next = self.entries.clone();
        Self::put_into(&mut next, self.max_entries, key, value)?;
        self.commit(next)
    }

    fn get(&self, key: &str) -> Result<Option<StoredValue>> {
        self.open_namespace()?;
        Ok(self.entries.get(key).cloned())
    }

    fn exists(&self, key: &str) -> bool {
        self.namespace.is_some() && self.entries.contains_key(key)
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        self.open_namespace()?;
        if !self.entries.contains_key(key) {
            return Ok(false);
        }
        let mut next = self.entries.clone();
        next.remove(key);
        self.commit(next)?;
        Ok(true)
    }

    fn clear(&mut self) -> Result<()> {
        self.open_namespace()?;
        self.commit(BTreeMap::new())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn type_of(&self, key: &str) -> Option<ValueType> {
        self.entries.get(key).map(StoredValue::value_type)
    }

    fn free_entries(&self) -> usize {
        if self.namespace.is_none() {
            return 0;
        }
        self.max_entries.saturating_sub(self.entries.len())
    }

    fn used_entries(&self) -> usize {
        self.entries.len()
    }

    /// Applies `ops` to a copy and persists it with a single rename.
    fn apply(&mut self, ops: &[Operation]) -> Result<()> {
        self.open_namespace()?;
        let mut next = self.entries.clone();
        for op in ops {
            match op {
                Operation::Put { key, value } => {
                    Self::put_into(&mut next, self.max_entries, key, value.clone())?
                }
                Operation::Remove { key } => {
                    next.remove(key);
                }
                Operation::Clear => next.clear(),
            }
        }
        self.commit(next)
    }
}

// =============================================================================
// Encoding
// =============================================================================

fn encode(entries: &BTreeMap<String, StoredValue>) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    for (key, value) in entries {
        let value_bytes = bincode::serialize(value)
            .map_err(|e| CalibrationError::Write(format!("encode '{}' failed: {}", key, e)))?;
        data.extend_from_slice(&(key.len() as u16).to_le_bytes());
        data.extend_from_slice(&(value_bytes.len() as u32).to_le_bytes());
        data.extend_from_slice(key.as_bytes());
        data.extend_from_slice(&value_bytes);
    }

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&data);
    let crc = hasher.finalize();

    let mut out = Vec::with_capacity(HEADER_SIZE + data.len() + FOOTER_SIZE);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&(entries.len() as u32).to_le_bytes());
    out.extend_from_slice(&data);
    out.extend_from_slice(&crc.to_le_bytes());
    Ok(out)
}

fn decode(bytes: &[u8]) -> Result<BTreeMap<String, StoredValue>> {
    if bytes.len() < HEADER_SIZE + FOOTER_SIZE {
        return Err(CalibrationError::Read(format!(
            "namespace file truncated: {} bytes",
            bytes.len()
        )));
    }

    if &bytes[0..4] != MAGIC {
        return Err(CalibrationError::Read(format!(
            "Invalid namespace magic: expected CALS, got {:?}",
            &bytes[0..4]
        )));
    }

    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != VERSION {
        return Err(CalibrationError::Read(format!(
            "Unsupported namespace file version: {}",
            version
        )));
    }

    let count = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]) as usize;

    let footer_start = bytes.len() - FOOTER_SIZE;
    let data = &bytes[HEADER_SIZE..footer_start];
    let stored_crc = u32::from_le_bytes([
        bytes[footer_start],
        bytes[footer_start + 1],
        bytes[footer_start + 2],
        bytes[footer_start + 3],
    ]);
    if crc32fast::hash(data) != stored_crc {
        return Err(CalibrationError::Read("namespace checksum mismatch".to_string()));
    }

    let mut entries = BTreeMap::new();
    let mut pos = 0;
    for _ in 0..count {
        if pos + RECORD_PREFIX > data.len() {
            return Err(CalibrationError::Read("record header truncated".to_string()));
        }
        let key_len = u16::from_le_bytes([data[pos], data[pos + 1]]) as usize;
        let val_len =
            u32::from_le_bytes([data[pos + 2], data[pos + 3], data[pos + 4], data[pos + 5]])
                as usize;
        pos += RECORD_PREFIX;

        if pos + key_len + val_len > data.len() {
            return Err(CalibrationError::Read("record body truncated".to_string()));
        }
        let key = std::str::from_utf8(&data[pos..pos + key_len])
            .map_err(|_| CalibrationError::Read("key is not UTF-8".to_string()))?
            .to_string();
        pos += key_len;

        let value: StoredValue = bincode::deserialize(&data[pos..pos + val_len])?;
        pos += val_len;

        entries.insert(key, value);
    }

    if pos != data.len() {
        return Err(CalibrationError::Read(format!(
            "{} trailing bytes after {} records",
            data.len() - pos,
            count
        )));
    }

    Ok(entries)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension(format!("{}.tmp", FILE_EXT));
    {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
