//! In-memory backend
//!
//! BTreeMap partitions behind a shared Mutex. Clones of a `MemoryBackend`
//! see the same partitions, which is how tests model a device restarting
//! over the same flash.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::batch::Operation;
use crate::error::{CalibrationError, Result};

use super::{KvBackend, StoredValue, ValueType, DEFAULT_MAX_ENTRIES};

type Partition = BTreeMap<String, StoredValue>;

/// Volatile backend with the same contract as flash
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    /// All partitions, shared between clones
    partitions: Arc<Mutex<HashMap<String, Partition>>>,
    /// Name of the open partition
    namespace: Option<String>,
    /// Entry budget per partition
    max_entries: usize,
    /// When set, every mutation fails with a write error
    fail_writes: Arc<AtomicBool>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            partitions: Arc::new(Mutex::new(HashMap::new())),
            namespace: None,
            max_entries,
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make every subsequent mutation fail (shared with clones)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Names of all partitions ever opened
    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.partitions.lock().keys().cloned().collect();
        names.sort();
        names
    }

    fn check_writable(&self) -> Result<&str> {
        let namespace = self
            .namespace
            .as_deref()
            .ok_or(CalibrationError::NotInitialized)?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CalibrationError::Write(format!(
                "flash write rejected in namespace '{}'",
                namespace
            )));
        }
        Ok(namespace)
    }

    fn with_partition<T>(&self, f: impl FnOnce(&Partition) -> T) -> Option<T> {
        let namespace = self.namespace.as_deref()?;
        let partitions = self.partitions.lock();
        partitions.get(namespace).map(f)
    }

    fn put_into(
        partition: &mut Partition,
        max_entries: usize,
        key: &str,
        value: StoredValue,
    ) -> Result<()> {
        if !partition.contains_key(key) && partition.len() >= max_entries {
            return Err(CalibrationError::Write(format!(
                "namespace full ({} entries)",
                max_entries
            )));
        }
        partition.insert(key.to_string(), value);
        Ok(())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl KvBackend for MemoryBackend {
    fn open(&mut self, namespace: &str) -> Result<()> {
        if namespace.is_empty() {
            return Err(CalibrationError::InvalidParam(
                "namespace must not be empty".to_string(),
            ));
        }
        self.partitions
            .lock()
            .entry(namespace.to_string())
            .or_default();
        self.namespace = Some(namespace.to_string());
        Ok(())
    }

    fn close(&mut self) {
        self.namespace = None;
    }

    fn put(&mut self, key: &str, value: StoredValue) -> Result<()> {
        let namespace = self.check_writable()?;
        let mut partitions = self.partitions.lock();
        let partition = partitions.entry(namespace.to_string()).or_default();
        Self::put_into(partition, self.max_entries, key, value)
    }

    fn get(&self, key: &str) -> Result<Option<StoredValue>> {
        self.with_partition(|p| p.get(key).cloned())
            .ok_or(CalibrationError::NotInitialized)
    }

    fn exists(&self, key: &str) -> bool {
        self.with_partition(|p| p.contains_key(key))
            .unwrap_or(false)
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        let namespace = self.check_writable()?;
        let mut partitions = self.partitions.lock();
        Ok(partitions
            .get_mut(namespace)
            .map(|p| p.remove(key).is_some())
            .unwrap_or(false))
    }

    fn clear(&mut self) -> Result<()> {
        let namespace = self.check_writable()?;
        let mut partitions = self.partitions.lock();
        if let Some(partition) = partitions.get_mut(namespace) {
            partition.clear();
        }
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.with_partition(|p| p.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn type_of(&self, key: &str) -> Option<ValueType> {
        self.with_partition(|p| p.get(key).map(StoredValue::value_type))
            .flatten()
    }

    fn free_entries(&self) -> usize {
        self.with_partition(|p| self.max_entries.saturating_sub(p.len()))
            .unwrap_or(0)
    }

    fn used_entries(&self) -> usize {
        self.with_partition(|p| p.len()).unwrap_or(0)
    }

    /// Applies `ops` to a scratch copy and swaps it in only if all succeed.
    fn apply(&mut self, ops: &[Operation]) -> Result<()> {
        let namespace = self.check_writable()?;
        let mut partitions = self.partitions.lock();
        let mut scratch = partitions.get(namespace).cloned().unwrap_or_default();

        for op in ops {
            match op {
                Operation::Put { key, value } => {
                    Self::put_into(&mut scratch, self.max_entries, key, value.clone())?
                }
                Operation::Remove { key } => {
                    scratch.remove(key);
                }
                Operation::Clear => scratch.clear(),
            }
        }

        partitions.insert(namespace.to_string(), scratch);
        Ok(())
    }
}
